//! Transaction-traffic generator: the external collaborator that emits
//! user-to-user transfers into the broadcast fabric.
//!
//! Grounded on the reference implementation's `UsersPuppeteer`: it samples
//! two distinct users, transfers a small random amount between them, sleeps
//! a random sub-second interval, and repeats until `max_transactions_num`
//! transfers have been sent. It carries no protocol logic of its own; the
//! node state machine only ever sees the resulting `Transaction` values.

use rand::Rng;
use rand::seq::SliceRandom;
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};

use crate::fabric::FabricMessage;
use crate::types::User;

/// Emits randomized transfers between a fixed pool of users.
pub struct TransactionGenerator {
    users: Vec<User>,
    max_transactions_num: usize,
    to_fabric: mpsc::UnboundedSender<FabricMessage>,
}

impl TransactionGenerator {
    pub fn new(
        users_num: usize,
        max_transactions_num: usize,
        to_fabric: mpsc::UnboundedSender<FabricMessage>,
    ) -> Self {
        let mut rng = rand::thread_rng();
        let users = (0..users_num)
            .map(|i| User::new(format!("User-{i}"), rng.gen_range(10..=100) as f64))
            .collect();
        TransactionGenerator {
            users,
            max_transactions_num,
            to_fabric,
        }
    }

    /// Runs until `max_transactions_num` transfers have been emitted.
    pub async fn run(self) {
        let mut rng = rand::thread_rng();
        for _ in 0..self.max_transactions_num {
            let wait_ms = rng.gen_range(0..1000);
            sleep(Duration::from_millis(wait_ms)).await;

            let mut pair: Vec<&User> = self.users.iter().collect();
            pair.shuffle(&mut rng);
            let (sender, receiver) = (pair[0], pair[1]);

            let amount = rng.gen_range(1..=10) as f64;
            let tx = sender.create_transaction(amount, receiver, None, now());
            if self.to_fabric.send(FabricMessage::Transaction(tx)).is_err() {
                break;
            }
        }
        tracing::info!(sent = self.max_transactions_num, "transaction generator finished");
    }
}

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is after the epoch")
        .as_secs()
}
