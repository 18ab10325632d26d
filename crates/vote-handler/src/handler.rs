// vote-handler/src/handler.rs
//
// §4.9 handler façade, and the owner of the two height cursors
// (spec.md §3 "Handler state", §5 "last_checkpointed_height,
// obligations_height: guarded by the handler's own lock").

use crate::checkpoint::aggregate_checkpoint_vote;
use crate::config::HandlerConfig;
use crate::driver::{finalize_driver_votes, process_quorums};
use crate::pool::VotePool;
use crate::reorg::blockchain_detached as reorg_blockchain_detached;
use crate::state_change::aggregate_state_change_vote;
use crate::traits::{Blockchain, CommittedStateChange, QuorumProvider, ServiceNodeRegistry, TxPool};
use crate::verifier::Verifier;
use crate::vote::Vote;
use std::sync::Mutex;

/// The two monotonic-except-on-reorg cursors the driver and reorg
/// coordinator advance (spec.md §3).
#[derive(Debug, Clone, Copy)]
struct Cursors {
    last_checkpointed_height: u64,
    obligations_height: u64,
}

/// The vote handler. Owns the pool and the two height cursors; everything
/// else (blockchain, quorum provider, registry, tx pool) is passed in by
/// the caller on each operation, per spec.md §6's external-interface
/// framing — this struct does not own or construct any of them.
pub struct Handler {
    config: HandlerConfig,
    pool: VotePool,
    cursors: Mutex<Cursors>,
    daemon_start_time: u64,
    /// Caller-registered hook fired after each `block_added`'s core work.
    /// Models the original's stray service-node-list-updater call as an
    /// injected callback rather than embedded logic (spec.md §9).
    on_block_added: Mutex<Option<Box<dyn FnMut(u64) + Send>>>,
}

impl Handler {
    /// `init()` (spec.md §6). `daemon_start_time` is a Unix-seconds
    /// timestamp used to gate the obligations catch-up loop's "did we
    /// observe this vote live" bookkeeping (spec.md §4.7 step 1).
    pub fn init(config: HandlerConfig, daemon_start_time: u64) -> Self {
        Self {
            config,
            pool: VotePool::new(),
            cursors: Mutex::new(Cursors {
                last_checkpointed_height: 0,
                obligations_height: 0,
            }),
            daemon_start_time,
            on_block_added: Mutex::new(None),
        }
    }

    /// Register the block-added hook (spec.md §9).
    pub fn set_on_block_added(&self, hook: Box<dyn FnMut(u64) + Send>) {
        *self.on_block_added.lock().expect("handler lock poisoned") = Some(hook);
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn last_checkpointed_height(&self) -> u64 {
        self.cursors.lock().expect("handler lock poisoned").last_checkpointed_height
    }

    pub fn obligations_height(&self) -> u64 {
        self.cursors.lock().expect("handler lock poisoned").obligations_height
    }

    pub fn pool(&self) -> &VotePool {
        &self.pool
    }

    /// `handle_vote(vote, &mut vvc) -> bool` (spec.md §4.9, §6).
    ///
    /// Returns `Ok(true)` on success (including the "already in pool"
    /// non-failure case, spec.md §7), `Ok(false)` is never returned by this
    /// façade — verifier failures are surfaced as `Err` so the caller can
    /// log the specific discriminant; aggregator threshold-unmet and tx
    /// rejection are folded into `Ok(true)` per spec.md §7's propagation
    /// policy ("Aggregator threshold-unmet -> return true, leave in pool").
    pub fn handle_vote(
        &self,
        vote: Vote,
        chain_height: u64,
        blockchain: &dyn Blockchain,
        quorum_provider: &dyn QuorumProvider,
        registry: &dyn ServiceNodeRegistry,
        tx_pool: &dyn TxPool,
    ) -> crate::error::VoteHandlerResult<bool> {
        let verifier = Verifier::new(&self.config);
        verifier.verify(&vote, chain_height, quorum_provider)?;

        let height = vote.block_height();
        let discriminator = vote.discriminator();
        let (added, collected) = self.pool.add_if_unique(vote.clone());
        if !added {
            tracing::debug!(height, voter_index = vote.voter_index(), "duplicate vote, not pooled again");
            return Ok(true);
        }

        match discriminator {
            crate::vote::Discriminator::BlockHash(block_hash) => {
                let outcome = aggregate_checkpoint_vote(height, block_hash, &collected, blockchain, &self.config);
                tracing::debug!(height, ?outcome, "checkpoint aggregation");
            }
            crate::vote::Discriminator::Target(target_index, new_state) => {
                let infos = registry.list_state(&quorum_provider
                    .get_quorum(crate::vote::QuorumType::Obligations, height)
                    .map(|q| q.workers)
                    .unwrap_or_default());
                let Some(info) = infos.into_iter().nth(target_index as usize) else {
                    return Ok(true);
                };
                let outcome = aggregate_state_change_vote(
                    height,
                    target_index,
                    new_state,
                    &collected,
                    &info,
                    tx_pool,
                    &self.config,
                );
                tracing::debug!(height, target_index, ?outcome, "state-change aggregation");
            }
        }

        Ok(true)
    }

    /// `block_added(block, txs, checkpoint?)` (spec.md §4.7, §6). Idempotent
    /// per block (R2): driven entirely by the monotonic cursors, so a
    /// repeated call for the same block advances nothing further.
    #[allow(clippy::too_many_arguments)]
    pub fn block_added(
        &self,
        block: crate::traits::BlockView,
        committed: &[CommittedStateChange],
        chain_height: u64,
        target_height: u64,
        daemon_uptime_seconds: u64,
        blockchain: &dyn Blockchain,
        quorum_provider: &dyn QuorumProvider,
        registry: &dyn ServiceNodeRegistry,
        tx_pool: &dyn TxPool,
    ) {
        let (obligations_height, last_checkpointed_height) = {
            let cursors = self.cursors.lock().expect("handler lock poisoned");
            (cursors.obligations_height, cursors.last_checkpointed_height)
        };

        let (driver_output, new_obligations_height, new_checkpoint_height) = process_quorums(
            &block,
            chain_height,
            target_height,
            obligations_height,
            last_checkpointed_height,
            self.daemon_start_time,
            daemon_uptime_seconds,
            blockchain,
            quorum_provider,
            registry,
            &self.pool,
            &self.config,
        );

        {
            let mut cursors = self.cursors.lock().expect("handler lock poisoned");
            cursors.obligations_height = new_obligations_height;
            cursors.last_checkpointed_height = new_checkpoint_height;
        }

        if let Some(keys) = registry.keys() {
            let votes = finalize_driver_votes(driver_output, blockchain, &keys);
            for vote in votes {
                let _ = self.handle_vote(vote, block.height, blockchain, quorum_provider, registry, tx_pool);
            }
        }

        self.pool.remove_expired(block.height + 1, &self.config);
        self.pool.remove_used(committed);

        if let Some(hook) = self.on_block_added.lock().expect("handler lock poisoned").as_mut() {
            hook(block.height);
        }
    }

    /// `blockchain_detached(height, by_pop)` (spec.md §4.8).
    pub fn blockchain_detached(&self, height: u64, by_pop_blocks: bool, blockchain: &dyn Blockchain) {
        let hf_version = blockchain.hard_fork_version(height);
        let last_checkpointed_height = {
            let cursors = self.cursors.lock().expect("handler lock poisoned");
            cursors.last_checkpointed_height
        };

        let (new_height, buffer_violated) = reorg_blockchain_detached(
            height,
            by_pop_blocks,
            last_checkpointed_height,
            hf_version,
            &self.pool,
            &self.config,
        );

        if buffer_violated {
            tracing::error!(
                height,
                last_checkpointed_height,
                "reorg deeper than safety buffer; should be impossible in normal operation"
            );
        }

        let mut cursors = self.cursors.lock().expect("handler lock poisoned");
        cursors.last_checkpointed_height = new_height;
    }

    /// `get_relayable_votes(current_height, hf, quorum_relay) -> [Vote]` (spec.md §6).
    pub fn get_relayable_votes(&self, current_height: u64, now: u64, quorum_relay: bool) -> Vec<Vote> {
        self.pool.relayable_votes(current_height, now, quorum_relay, &self.config)
    }

    /// `set_votes_relayed(votes)` (spec.md §6).
    pub fn set_votes_relayed(&self, votes: &[Vote], height: u64, now: u64) {
        self.pool.set_relayed(votes, height, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{BlockView, Checkpoint, NodeInfo, NodeKeys, NodeState, Quorum, TestResult};
    use blockchain_crypto::{Hash, KeyPair};
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    struct MockBlockchain {
        checkpoints: StdMutex<HashMap<u64, Checkpoint>>,
        hashes: HashMap<u64, Hash>,
        hf_version: u8,
    }

    impl Blockchain for MockBlockchain {
        fn current_height(&self) -> u64 {
            0
        }
        fn target_height(&self) -> u64 {
            0
        }
        fn hard_fork_version(&self, _height: u64) -> u8 {
            self.hf_version
        }
        fn block_id_by_height(&self, height: u64) -> Option<Hash> {
            self.hashes.get(&height).copied()
        }
        fn block_view(&self, _height: u64) -> Option<BlockView> {
            None
        }
        fn get_checkpoint(&self, height: u64) -> Option<Checkpoint> {
            self.checkpoints.lock().unwrap().get(&height).cloned()
        }
        fn with_checkpoint_lock(&self, height: u64, f: &mut dyn FnMut(Option<Checkpoint>) -> Option<Checkpoint>) {
            let mut checkpoints = self.checkpoints.lock().unwrap();
            let existing = checkpoints.get(&height).cloned();
            if let Some(new_cp) = f(existing) {
                checkpoints.insert(height, new_cp);
            }
        }
    }

    struct MockQuorums {
        checkpointing: HashMap<u64, Quorum>,
        obligations: HashMap<u64, Quorum>,
    }

    impl QuorumProvider for MockQuorums {
        fn get_quorum(&self, quorum_type: crate::vote::QuorumType, height: u64) -> Option<Quorum> {
            match quorum_type {
                crate::vote::QuorumType::Checkpointing => self.checkpointing.get(&height).cloned(),
                crate::vote::QuorumType::Obligations => self.obligations.get(&height).cloned(),
            }
        }
    }

    struct MockRegistry {
        infos: HashMap<Vec<u8>, NodeInfo>,
    }

    impl ServiceNodeRegistry for MockRegistry {
        fn list_state(&self, keys: &[blockchain_crypto::PublicKey]) -> Vec<NodeInfo> {
            keys.iter().filter_map(|k| self.infos.get(&k.to_bytes()).copied()).collect()
        }
        fn is_active(&self, _key: &blockchain_crypto::PublicKey) -> bool {
            false
        }
        fn keys(&self) -> Option<NodeKeys> {
            None
        }
        fn record_checkpoint_vote(&self, _voter_key: &blockchain_crypto::PublicKey, _height: u64, _present: bool) {}
        fn check_service_node(&self, _hf: u8, _key: &blockchain_crypto::PublicKey, _info: &NodeInfo) -> TestResult {
            TestResult {
                passed: true,
                single_ip: true,
                uptime_proved: true,
                why: String::new(),
            }
        }
    }

    struct MockTxPool {
        accepts: bool,
    }

    impl TxPool for MockTxPool {
        fn handle_incoming_tx(&self, _blob: Vec<u8>, _height: u64, _target_index: u32) -> bool {
            self.accepts
        }
    }

    fn quorum_of(n: usize) -> (Quorum, Vec<KeyPair>) {
        let keypairs: Vec<KeyPair> = (0..n).map(|_| KeyPair::generate()).collect();
        let validators = keypairs.iter().map(|kp| kp.public_key().clone()).collect();
        (Quorum::new(validators, vec![]), keypairs)
    }

    #[test]
    fn test_scenario_happy_path_checkpoint_through_handler() {
        let config = HandlerConfig::default();
        let (quorum, keypairs) = quorum_of(10);
        let hash = Hash::new([9u8; 32]);

        let mut checkpointing = HashMap::new();
        checkpointing.insert(96, quorum);
        let quorums = MockQuorums { checkpointing, obligations: HashMap::new() };

        let chain = MockBlockchain {
            checkpoints: StdMutex::new(HashMap::new()),
            hashes: HashMap::new(),
            hf_version: config.checkpointing_hard_fork,
        };
        let registry = MockRegistry { infos: HashMap::new() };
        let tx_pool = MockTxPool { accepts: true };

        let handler = Handler::init(config, 0);

        for idx in 0..6u32 {
            let vote = Vote::sign_checkpoint(96, hash, idx, &keypairs[idx as usize]);
            handler.handle_vote(vote, 100, &chain, &quorums, &registry, &tx_pool).unwrap();
        }
        assert!(chain.get_checkpoint(96).is_none());

        let vote = Vote::sign_checkpoint(96, hash, 6, &keypairs[6]);
        handler.handle_vote(vote, 100, &chain, &quorums, &registry, &tx_pool).unwrap();

        let cp = chain.get_checkpoint(96).unwrap();
        assert_eq!(cp.signatures.len(), 7);
    }

    #[test]
    fn test_r1_duplicate_vote_is_idempotent() {
        let config = HandlerConfig::default();
        let (quorum, keypairs) = quorum_of(10);
        let hash = Hash::new([9u8; 32]);

        let mut checkpointing = HashMap::new();
        checkpointing.insert(96, quorum);
        let quorums = MockQuorums { checkpointing, obligations: HashMap::new() };

        let chain = MockBlockchain {
            checkpoints: StdMutex::new(HashMap::new()),
            hashes: HashMap::new(),
            hf_version: config.checkpointing_hard_fork,
        };
        let registry = MockRegistry { infos: HashMap::new() };
        let tx_pool = MockTxPool { accepts: true };
        let handler = Handler::init(config, 0);

        let vote = Vote::sign_checkpoint(96, hash, 0, &keypairs[0]);
        let r1 = handler.handle_vote(vote.clone(), 100, &chain, &quorums, &registry, &tx_pool).unwrap();
        let r2 = handler.handle_vote(vote, 100, &chain, &quorums, &registry, &tx_pool).unwrap();
        assert!(r1);
        assert!(r2);
    }

    #[test]
    fn test_scenario_reorg_within_buffer() {
        let config = HandlerConfig::default();
        let handler = Handler::init(config.clone(), 0);
        // Force last_checkpointed_height to 100 by running checkpoints up there
        // is unnecessary for this unit test: we can drive the cursor directly
        // via a checkpoint scenario, but simpler to just assert via the
        // public blockchain_detached behavior using the reorg module's
        // semantics (covered in reorg.rs). Here we only check wiring: no
        // panic, and the cursor is queryable before/after.
        let chain = MockBlockchain {
            checkpoints: StdMutex::new(HashMap::new()),
            hashes: HashMap::new(),
            hf_version: config.checkpointing_hard_fork,
        };
        handler.blockchain_detached(95, false, &chain);
        assert_eq!(handler.last_checkpointed_height(), 0);
    }
}
