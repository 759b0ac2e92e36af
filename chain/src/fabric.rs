//! Broadcast fabric: the artificial party that relays messages between
//! nodes (Employee-Employee) and from the transaction generator to every
//! node, without taking part in consensus itself.
//!
//! Built on `tokio::sync::mpsc` in place of the one-`multiprocessing.Pipe`-
//! per-peer wiring this is grounded on: one unbounded channel per node for
//! fabric-to-node delivery, and a single shared channel, tagged with the
//! sending node's index, for node-to-fabric delivery. Delivery is FIFO per
//! sender; there is no guaranteed order across distinct senders.

use std::collections::HashSet;

use tokio::sync::mpsc;

use crate::chain::Block;
use crate::poa::{StakeholderSignature, WrappedBlock};
use crate::pos::{BlockHeader, TrainingDeclaration};
use crate::types::Transaction;

/// Every payload kind the fabric relays.
#[derive(Clone, Debug)]
pub enum FabricMessage {
    Transaction(Transaction),
    TrainingDeclaration(TrainingDeclaration),
    BlockHeader(BlockHeader),
    StakeholderSignature(StakeholderSignature),
    WrappedBlock(WrappedBlock),
    /// A node announcing it is still alive and participating.
    EmployeeAlive { name: String },
    /// A node announcing it has reached the target chain length. Absorbed
    /// by the fabric rather than relayed; see [`Fabric::run`].
    EmployeeFinished { name: String },
    /// A node's final local chain snapshot, forwarded once to the
    /// simulation sink rather than broadcast to peers.
    ResultLocalBlockchain(Vec<Block>),
}

/// The node-facing half of a fabric connection.
pub struct NodeHandle {
    pub id: usize,
    inbox: mpsc::UnboundedReceiver<FabricMessage>,
    outbox: mpsc::UnboundedSender<(usize, FabricMessage)>,
}

impl NodeHandle {
    pub async fn recv(&mut self) -> Option<FabricMessage> {
        self.inbox.recv().await
    }

    /// Non-blocking drain primitive used by a node's message-collection
    /// loop: returns `None` once no message is immediately ready.
    pub fn try_recv(&mut self) -> Option<FabricMessage> {
        self.inbox.try_recv().ok()
    }

    pub fn send(&self, message: FabricMessage) {
        let _ = self.outbox.send((self.id, message));
    }
}

/// The fabric's own handle, used to drive the relay loop.
pub struct Fabric {
    employees_num: usize,
    to_nodes: Vec<mpsc::UnboundedSender<FabricMessage>>,
    from_nodes_tx: mpsc::UnboundedSender<(usize, FabricMessage)>,
    from_nodes_rx: mpsc::UnboundedReceiver<(usize, FabricMessage)>,
    from_tx_generator: mpsc::UnboundedReceiver<FabricMessage>,
    to_sink: mpsc::UnboundedSender<Vec<Block>>,
}

impl Fabric {
    /// Wires up `employees_num` node handles, a transaction-generator
    /// sender, and a sink receiver for the final blockchain snapshot.
    pub fn new(
        employees_num: usize,
    ) -> (
        Fabric,
        Vec<NodeHandle>,
        mpsc::UnboundedSender<FabricMessage>,
        mpsc::UnboundedReceiver<Vec<Block>>,
    ) {
        let (from_nodes_tx, from_nodes_rx) = mpsc::unbounded_channel();
        let (tx_gen_tx, tx_gen_rx) = mpsc::unbounded_channel();
        let (sink_tx, sink_rx) = mpsc::unbounded_channel();

        let mut to_nodes = Vec::with_capacity(employees_num);
        let mut handles = Vec::with_capacity(employees_num);
        for id in 0..employees_num {
            let (tx, rx) = mpsc::unbounded_channel();
            to_nodes.push(tx);
            handles.push(NodeHandle {
                id,
                inbox: rx,
                outbox: from_nodes_tx.clone(),
            });
        }

        let fabric = Fabric {
            employees_num,
            to_nodes,
            from_nodes_tx,
            from_nodes_rx,
            from_tx_generator: tx_gen_rx,
            to_sink: sink_tx,
        };
        (fabric, handles, tx_gen_tx, sink_rx)
    }

    fn broadcast(&self, message: FabricMessage, excluded: Option<usize>) {
        for (id, sender) in self.to_nodes.iter().enumerate() {
            if Some(id) == excluded {
                continue;
            }
            let _ = sender.send(message.clone());
        }
    }

    /// Runs the relay loop until every employee has reported
    /// `EMPLOYEE_FINISHED`.
    pub async fn run(mut self) {
        let mut finished: HashSet<usize> = HashSet::new();
        let mut result_sent = false;

        loop {
            if finished.len() >= self.employees_num {
                break;
            }

            tokio::select! {
                biased;

                Some((sender_id, message)) = self.from_nodes_rx.recv() => {
                    match message {
                        FabricMessage::EmployeeFinished { .. } => {
                            finished.insert(sender_id);
                            tracing::info!(
                                finished = finished.len(),
                                total = self.employees_num,
                                "fabric registered a finished node",
                            );
                        }
                        FabricMessage::ResultLocalBlockchain(blocks) => {
                            if !result_sent {
                                let _ = self.to_sink.send(blocks);
                                result_sent = true;
                            }
                        }
                        other => self.broadcast(other, Some(sender_id)),
                    }
                }
                Some(message) = self.from_tx_generator.recv() => {
                    self.broadcast(message, None);
                }
                else => break,
            }
        }
    }

    /// A sender any component can use to feed the fabric as if it were a
    /// node (used by tests that want to inject messages directly).
    pub fn node_sender(&self) -> mpsc::UnboundedSender<(usize, FabricMessage)> {
        self.from_nodes_tx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn dummy_alive(name: &str) -> FabricMessage {
        FabricMessage::EmployeeAlive { name: name.to_string() }
    }

    #[tokio::test]
    async fn broadcast_excludes_the_sending_node() {
        let (fabric, mut handles, _tx_gen, _sink) = Fabric::new(3);
        let fabric_task = tokio::spawn(fabric.run());

        handles[0].send(dummy_alive("n0"));

        let msg1 = handles[1].recv().await;
        let msg2 = handles[2].recv().await;
        assert!(matches!(msg1, Some(FabricMessage::EmployeeAlive { .. })));
        assert!(matches!(msg2, Some(FabricMessage::EmployeeAlive { .. })));

        for h in &handles {
            h.send(FabricMessage::EmployeeFinished { name: "x".into() });
        }
        fabric_task.await.unwrap();
    }

    #[tokio::test]
    async fn tx_generator_messages_reach_every_node() {
        let (fabric, mut handles, tx_gen, _sink) = Fabric::new(2);
        let fabric_task = tokio::spawn(fabric.run());

        let kp = KeyPair::generate();
        let alice = crate::types::User::new("Alice", 10.0);
        let bob = crate::types::User::new("Bob", 0.0);
        let tx = alice.create_transaction(1.0, &bob, None, 0);
        let _ = kp; // keypair unused beyond constructing alice/bob's own pairs internally

        tx_gen.send(FabricMessage::Transaction(tx)).unwrap();

        assert!(matches!(handles[0].recv().await, Some(FabricMessage::Transaction(_))));
        assert!(matches!(handles[1].recv().await, Some(FabricMessage::Transaction(_))));

        for h in &handles {
            h.send(FabricMessage::EmployeeFinished { name: "x".into() });
        }
        fabric_task.await.unwrap();
    }

    #[tokio::test]
    async fn result_local_blockchain_is_forwarded_once() {
        let (fabric, handles, _tx_gen, mut sink) = Fabric::new(1);
        let fabric_task = tokio::spawn(fabric.run());

        handles[0].send(FabricMessage::ResultLocalBlockchain(vec![]));
        handles[0].send(FabricMessage::ResultLocalBlockchain(vec![]));
        handles[0].send(FabricMessage::EmployeeFinished { name: "x".into() });

        fabric_task.await.unwrap();
        assert!(sink.recv().await.is_some());
        assert!(sink.try_recv().is_err(), "second snapshot must not be forwarded");
    }
}
