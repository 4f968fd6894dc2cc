//! The running node: a [`Simulation`] behind one lock, two periodic tasks
//! driving it, and the wallet store kept in step with the active wallet.

use crate::blockchain::Block;
use crate::config::Config;
use crate::crypto::Address;
use crate::error::{ChainError, Outcome};
use crate::persistence::WalletStore;
use crate::simulation::{NetworkStats, Simulation};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Booting,
    Running,
    Stopped,
}

#[derive(Clone)]
pub struct Node {
    simulation: Arc<RwLock<Simulation>>,
    store: Arc<dyn WalletStore>,
    state: Arc<RwLock<NodeState>>,
    block_interval: Duration,
    reward_interval: Duration,
}

/// Stops the periodic tasks started by [`Node::start`].
pub struct NodeHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    state: Arc<RwLock<NodeState>>,
}

impl NodeHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                error!("Node task ended abnormally: {}", e);
            }
        }
        *self.state.write().await = NodeState::Stopped;
        info!("Node stopped");
    }
}

impl Node {
    /// Builds the simulation and re-activates the stored wallet, if any.
    ///
    /// A record that cannot be restored is cleared rather than failing startup.
    pub fn new(config: &Config, store: Arc<dyn WalletStore>) -> Result<Self, ChainError> {
        let mut simulation = Simulation::new(config)?;

        match store.load() {
            Ok(Some(record)) => {
                if let Err(e) = simulation.restore_wallet(&record) {
                    warn!("Stored wallet could not be restored: {}", e);
                    store.clear()?;
                }
            }
            Ok(None) => debug!("No stored wallet"),
            Err(e) => warn!("Failed to read stored wallet: {}", e),
        }

        Ok(Node {
            simulation: Arc::new(RwLock::new(simulation)),
            store,
            state: Arc::new(RwLock::new(NodeState::Booting)),
            block_interval: Duration::from_secs(config.simulation.block_interval_secs),
            reward_interval: Duration::from_secs(config.simulation.reward_interval_secs),
        })
    }

    pub async fn state(&self) -> NodeState {
        *self.state.read().await
    }

    /// Spawns the block production and reward accrual tasks.
    ///
    /// Both fire one full interval after start. Every tick takes the write
    /// lock, so ticks and submissions never interleave.
    pub async fn start(&self) -> NodeHandle {
        let (shutdown, _) = watch::channel(false);

        let block_node = self.clone();
        let mut block_stop = shutdown.subscribe();
        let block_task = tokio::spawn(async move {
            let period = block_node.block_interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = block_node.tick_block().await {
                            error!("Block production failed: {}", e);
                        }
                    }
                    _ = block_stop.changed() => break,
                }
            }
        });

        let reward_node = self.clone();
        let mut reward_stop = shutdown.subscribe();
        let reward_task = tokio::spawn(async move {
            let period = reward_node.reward_interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        reward_node.tick_rewards().await;
                    }
                    _ = reward_stop.changed() => break,
                }
            }
        });

        *self.state.write().await = NodeState::Running;
        info!(
            "Node running (blocks every {:?}, rewards every {:?})",
            self.block_interval, self.reward_interval
        );

        NodeHandle {
            shutdown,
            tasks: vec![block_task, reward_task],
            state: self.state.clone(),
        }
    }

    /// One block production cycle.
    pub async fn tick_block(&self) -> Result<Option<Block>, ChainError> {
        let mut simulation = self.simulation.write().await;
        let block = simulation.produce_block()?;
        if block.is_some() {
            self.persist(&simulation);
        }
        Ok(block)
    }

    /// One reward accrual cycle.
    pub async fn tick_rewards(&self) -> usize {
        let mut simulation = self.simulation.write().await;
        let accrued = simulation.accrue_rewards();
        if accrued > 0 {
            self.persist(&simulation);
        }
        accrued
    }

    fn persist(&self, simulation: &Simulation) {
        let result = match simulation.wallet_record() {
            Some(record) => self.store.save(&record),
            None => self.store.clear(),
        };
        if let Err(e) = result {
            warn!("Failed to persist wallet: {}", e);
        }
    }

    // ========================================================================
    // External interface
    // ========================================================================

    pub async fn create_wallet(&self) -> Address {
        let mut simulation = self.simulation.write().await;
        let address = simulation.create_wallet();
        self.persist(&simulation);
        address
    }

    pub async fn submit_transfer(&self, recipient: &str, amount: f64) -> Outcome {
        let mut simulation = self.simulation.write().await;
        let result = simulation.submit_transfer(recipient, amount);
        if let Err(e) = &result {
            debug!("Transfer refused: {}", e);
        }
        Outcome::from(result)
    }

    pub async fn submit_stake(&self, validator: &str, amount: f64) -> Outcome {
        let mut simulation = self.simulation.write().await;
        let result = simulation.submit_stake(validator, amount);
        if let Err(e) = &result {
            debug!("Stake refused: {}", e);
        }
        Outcome::from(result)
    }

    pub async fn claim_rewards(&self) -> Outcome {
        let mut simulation = self.simulation.write().await;
        match simulation.claim_rewards() {
            Ok(claimed) if claimed > 0.0 => {
                self.persist(&simulation);
                Outcome::ok(format!("Rewards claimed successfully! (+{:.8} AN)", claimed))
            }
            Ok(_) => Outcome::failed("No rewards to claim."),
            Err(e) => Outcome::failed(format!("Error: {}", e)),
        }
    }

    /// Runs `f` against a consistent view of the simulation.
    pub async fn read<R>(&self, f: impl FnOnce(&Simulation) -> R) -> R {
        let simulation = self.simulation.read().await;
        f(&simulation)
    }

    pub async fn network_stats(&self) -> NetworkStats {
        self.read(Simulation::network_stats).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryWalletStore;

    fn config() -> Config {
        let mut config = Config::default();
        config.simulation.seed = Some(3);
        config
    }

    #[tokio::test]
    async fn test_restores_stored_wallet() {
        let store: Arc<dyn WalletStore> = Arc::new(MemoryWalletStore::new());
        let first = Node::new(&config(), store.clone()).unwrap();
        let address = first.create_wallet().await;
        assert!(store.load().unwrap().is_some());

        let second = Node::new(&config(), store).unwrap();
        assert_eq!(second.read(Simulation::wallet_address).await, Some(address));
    }

    #[tokio::test]
    async fn test_outcomes() {
        let node = Node::new(&config(), Arc::new(MemoryWalletStore::new())).unwrap();

        let outcome = node.submit_transfer("external-recipient-wallet", 5.0).await;
        assert_eq!(outcome, Outcome::failed("Error: No active wallet."));

        node.create_wallet().await;
        let outcome = node.submit_transfer("external-recipient-wallet", 5.0).await;
        assert_eq!(outcome, Outcome::ok("Transaction submitted to mempool."));

        let outcome = node.submit_stake("unknown-validator", 5.0).await;
        assert_eq!(outcome, Outcome::failed("Error: Validator not found."));

        let outcome = node.claim_rewards().await;
        assert_eq!(outcome, Outcome::failed("No rewards to claim."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_tasks() {
        let store = Arc::new(MemoryWalletStore::new());
        let node = Node::new(&config(), store.clone()).unwrap();
        node.create_wallet().await;
        let validator = node.read(|sim| sim.validators()[0].public_key.clone()).await;
        assert!(node.submit_stake(&validator, 100.0).await.success);

        let handle = node.start().await;
        assert_eq!(node.state().await, NodeState::Running);

        // Nothing happens before the first interval elapses.
        tokio::time::sleep(Duration::from_millis(2_900)).await;
        assert_eq!(node.network_stats().await.block_height, 0);

        tokio::time::sleep(Duration::from_millis(3_200)).await;
        let stats = node.network_stats().await;
        assert_eq!(stats.block_height, 1);
        assert_eq!(stats.mempool_size, 0);

        let record = store.load().unwrap().unwrap();
        assert_eq!(record.balance, 900.0);
        assert_eq!(record.stakes.len(), 1);

        handle.shutdown().await;
        assert_eq!(node.state().await, NodeState::Stopped);
    }
}
