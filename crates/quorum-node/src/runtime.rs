// quorum-node/src/runtime.rs
use crate::config::Config;
use crate::mocks::{SimulatedChain, SimulatedQuorums, SimulatedRegistry, SimulatedTxPool};
use blockchain_crypto::KeyPair;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::{interval, Duration};
use vote_handler::Handler;

/// Drives the vote handler against a simulated chain: advances a toy chain
/// one block per tick, lets the handler's quorum driver decide what votes
/// to cast, and feeds those votes back through `handle_vote` — exercising
/// the same path a real daemon's block-added hook would.
pub struct Daemon {
    config: Config,
    handler: Handler,
    chain: SimulatedChain,
    quorums: SimulatedQuorums,
    registry: SimulatedRegistry,
    tx_pool: SimulatedTxPool,
    start_time: u64,
}

impl Daemon {
    pub fn new(config: Config) -> Self {
        tracing::info!("Initializing quorum-node components");

        let start_time = unix_timestamp();
        let hf = config.handler.checkpointing_hard_fork;

        let validators: Vec<KeyPair> = (0..config.validator_count).map(|_| KeyPair::generate()).collect();
        let workers: Vec<KeyPair> = (0..config.worker_count).map(|_| KeyPair::generate()).collect();
        let validator_keys = validators.iter().map(|kp| kp.public_key().clone()).collect();
        let worker_keys: Vec<_> = workers.iter().map(|kp| kp.public_key().clone()).collect();

        let our_keys = if config.run_as_validator {
            validators.into_iter().next()
        } else {
            None
        };

        let chain = SimulatedChain::new(hf);
        let quorums = SimulatedQuorums::new(validator_keys, worker_keys.clone());
        let registry = SimulatedRegistry::new(&worker_keys, our_keys, 0);
        let tx_pool = SimulatedTxPool::new();
        let handler = Handler::init(config.to_handler_config(), start_time);

        tracing::info!(
            validators = config.validator_count,
            workers = config.worker_count,
            "✓ Simulated quorums initialized"
        );

        Self {
            config,
            handler,
            chain,
            quorums,
            registry,
            tx_pool,
            start_time,
        }
    }

    /// Run `ticks` blocks, or forever if `ticks` is `None`.
    pub async fn run(self: Arc<Self>, ticks: Option<u64>) -> anyhow::Result<()> {
        tracing::info!("Starting quorum-node daemon");
        let mut ticker = interval(Duration::from_secs(self.config.tick_interval_seconds.max(1)));
        let mut produced = 0u64;

        loop {
            ticker.tick().await;
            self.tick();
            produced += 1;
            if let Some(limit) = ticks {
                if produced >= limit {
                    break;
                }
            }
        }

        tracing::info!(blocks = produced, "Daemon run complete");
        Ok(())
    }

    fn tick(&self) {
        let now = unix_timestamp();
        let block = self.chain.advance(now);
        let uptime = now.saturating_sub(self.start_time);

        self.handler.block_added(
            block.clone(),
            &[],
            block.height,
            block.height,
            uptime,
            &self.chain,
            &self.quorums,
            &self.registry,
            &self.tx_pool,
        );

        tracing::debug!(
            height = block.height,
            hash = %block.hash,
            last_checkpointed = self.handler.last_checkpointed_height(),
            "block processed"
        );
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
