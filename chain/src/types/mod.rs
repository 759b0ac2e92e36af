//! Domain types shared across the protocol: users and transactions.
//!
//! Cryptographic primitives (`Hash256`, `PublicKey`, `Signature`, `KeyPair`)
//! live in [`crate::crypto`]; this module builds the user-facing value types
//! on top of them.

use serde::{Deserialize, Serialize};

use crate::crypto::{Hash256, KeyPair, PublicKey};

/// A participant able to send and receive transactions.
///
/// In contrast to real blockchain networks, a `User`'s behaviour is driven
/// externally by the transaction generator; users themselves hold no
/// protocol logic, only identity and balance bookkeeping.
pub struct User {
    pub name: String,
    pub balance: f64,
    pub public_key: PublicKey,
    keypair: KeyPair,
}

impl User {
    pub fn new(name: impl Into<String>, balance: f64) -> Self {
        let keypair = KeyPair::generate();
        let public_key = keypair.public_key();
        User {
            name: name.into(),
            balance,
            public_key,
            keypair,
        }
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    /// Creates a transaction transferring `amount` from `self` to `receiver`.
    pub fn create_transaction(
        &self,
        amount: f64,
        receiver: &User,
        employee_name: Option<String>,
        timestamp: u64,
    ) -> Transaction {
        Transaction::new(self, amount, receiver, employee_name, timestamp)
    }
}

/// A special sender used once per wrapped block to pay the block reward.
///
/// `CoinbaseUser` is not a network participant: it is instantiated locally
/// by the Roy stakeholder when building a wrapped block and is never
/// broadcast as a `User` in its own right.
pub struct CoinbaseUser {
    inner: User,
    block_index: u64,
}

impl CoinbaseUser {
    pub fn new(block_index: u64) -> Self {
        CoinbaseUser {
            inner: User::new("Coinbase User", 0.0),
            block_index,
        }
    }

    /// `1000 - 999 * sqrt(n) / (sqrt(n) + 10)`, where `n` is the new block's
    /// index. Approaches `1` as `n` grows and equals `1000` at `n = 0`.
    pub fn coinbase_reward(block_index: u64) -> f64 {
        let n = block_index as f64;
        1000.0 - 999.0 * (n.sqrt() / (n.sqrt() + 10.0))
    }

    /// Builds the coinbase transaction rewarding `receiver`.
    pub fn create_transaction(&self, receiver: &User, timestamp: u64) -> Transaction {
        let amount = Self::coinbase_reward(self.block_index);
        self.inner
            .create_transaction(amount, receiver, Some(receiver.name.clone()), timestamp)
    }
}

/// A node's own user identity, always the receiver of its own coinbase.
pub struct EmployeeUser {
    pub inner: User,
}

impl EmployeeUser {
    pub fn new(employee_name: impl Into<String>) -> Self {
        EmployeeUser {
            inner: User::new(employee_name, 0.0),
        }
    }

    pub fn create_transaction(&self, amount: f64, receiver: &User, timestamp: u64) -> Transaction {
        self.inner
            .create_transaction(amount, receiver, Some(self.inner.name.clone()), timestamp)
    }
}

/// A lightweight, serializable snapshot of a sender/receiver identity.
///
/// Transactions do not embed live `User` handles (those own key material);
/// they embed this structural identity instead.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub name: String,
    pub public_key: PublicKey,
}

impl UserRef {
    pub fn of(user: &User) -> Self {
        UserRef {
            name: user.name.clone(),
            public_key: user.public_key.clone(),
        }
    }
}

/// A value transfer between two users.
///
/// `id` is computed once at construction from sender/amount/receiver/
/// timestamp and never changes afterwards, even when `employee_name` is
/// later stamped in by the node that includes the transaction in a block.
/// This stability is intentional: it lets nodes diff pending-pool copies by
/// `id` after stamping.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub sender: UserRef,
    pub receiver: UserRef,
    pub amount: f64,
    pub employee_name: Option<String>,
    pub timestamp: u64,
}

impl Transaction {
    pub fn new(
        sender: &User,
        amount: f64,
        receiver: &User,
        employee_name: Option<String>,
        timestamp: u64,
    ) -> Self {
        let sender_ref = UserRef::of(sender);
        let receiver_ref = UserRef::of(receiver);
        let id = Self::compute_id(&sender_ref, amount, &receiver_ref, timestamp);
        Transaction {
            id,
            sender: sender_ref,
            receiver: receiver_ref,
            amount,
            employee_name,
            timestamp,
        }
    }

    fn compute_id(sender: &UserRef, amount: f64, receiver: &UserRef, timestamp: u64) -> String {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(sender.name.as_bytes());
        bytes.extend_from_slice(&amount.to_bits().to_be_bytes());
        bytes.extend_from_slice(receiver.name.as_bytes());
        bytes.extend_from_slice(&timestamp.to_be_bytes());
        hex::encode(Hash256::compute(&bytes).as_bytes())
    }

    /// Stamps the producing node's name onto this transaction without
    /// altering its `id`. Callers must clone the transaction first if the
    /// original (unstamped) copy must remain observable elsewhere.
    pub fn set_employee_name(&mut self, employee_name: impl Into<String>) {
        self.employee_name = Some(employee_name.into());
    }
}
