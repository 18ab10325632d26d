// quorum-node/src/mocks.rs
//
// In-memory stand-ins for the blockchain, quorum construction, service-node
// registry, and transaction pool — the subsystems `vote-handler` reaches
// only through traits (spec.md §6). These exist solely to drive the demo
// daemon loop; none of them is a production implementation.

use blockchain_crypto::{Hash, KeyPair, PublicKey};
use std::collections::HashMap;
use std::sync::Mutex;
use vote_handler::{
    BlockView, Blockchain, Checkpoint, NodeInfo, NodeKeys, NodeState, Quorum, QuorumProvider,
    QuorumType, ServiceNodeRegistry, TestResult, TxPool,
};

/// A toy chain: monotonically increasing height, one hash per block, and
/// the checkpoint store the handler commits into.
pub struct SimulatedChain {
    height: Mutex<u64>,
    hashes: Mutex<HashMap<u64, Hash>>,
    timestamps: Mutex<HashMap<u64, u64>>,
    checkpoints: Mutex<HashMap<u64, Checkpoint>>,
    hf_version: u8,
}

impl SimulatedChain {
    pub fn new(hf_version: u8) -> Self {
        let mut hashes = HashMap::new();
        hashes.insert(0, Hash::zero());
        let mut timestamps = HashMap::new();
        timestamps.insert(0, 0);
        Self {
            height: Mutex::new(0),
            hashes: Mutex::new(hashes),
            timestamps: Mutex::new(timestamps),
            checkpoints: Mutex::new(HashMap::new()),
            hf_version,
        }
    }

    /// Advance the chain by one block, deriving its hash from the previous
    /// one. Returns the new block's view.
    pub fn advance(&self, timestamp: u64) -> BlockView {
        let mut height = self.height.lock().expect("chain lock poisoned");
        *height += 1;
        let new_height = *height;
        drop(height);

        let mut hashes = self.hashes.lock().expect("chain lock poisoned");
        let parent = *hashes.get(&(new_height - 1)).unwrap_or(&Hash::zero());
        let mut buf = parent.to_bytes().to_vec();
        buf.extend_from_slice(&new_height.to_le_bytes());
        let hash = blockchain_crypto::double_hash(&buf);
        hashes.insert(new_height, hash);
        self.timestamps.lock().expect("chain lock poisoned").insert(new_height, timestamp);

        BlockView {
            height: new_height,
            hash,
            timestamp,
            major_version: self.hf_version,
        }
    }
}

impl Blockchain for SimulatedChain {
    fn current_height(&self) -> u64 {
        *self.height.lock().expect("chain lock poisoned")
    }

    fn target_height(&self) -> u64 {
        self.current_height()
    }

    fn hard_fork_version(&self, _height: u64) -> u8 {
        self.hf_version
    }

    fn block_id_by_height(&self, height: u64) -> Option<Hash> {
        self.hashes.lock().expect("chain lock poisoned").get(&height).copied()
    }

    fn block_view(&self, height: u64) -> Option<BlockView> {
        let hash = self.block_id_by_height(height)?;
        let timestamp = *self.timestamps.lock().expect("chain lock poisoned").get(&height)?;
        Some(BlockView {
            height,
            hash,
            timestamp,
            major_version: self.hf_version,
        })
    }

    fn get_checkpoint(&self, height: u64) -> Option<Checkpoint> {
        self.checkpoints.lock().expect("chain lock poisoned").get(&height).cloned()
    }

    fn with_checkpoint_lock(&self, height: u64, f: &mut dyn FnMut(Option<Checkpoint>) -> Option<Checkpoint>) {
        let mut checkpoints = self.checkpoints.lock().expect("chain lock poisoned");
        let existing = checkpoints.get(&height).cloned();
        if let Some(new_cp) = f(existing) {
            checkpoints.insert(height, new_cp);
        }
    }
}

/// Hands out the same validator/worker set at every height: quorum
/// rotation is out of scope for this demo (spec.md §1).
pub struct SimulatedQuorums {
    validators: Vec<PublicKey>,
    workers: Vec<PublicKey>,
}

impl SimulatedQuorums {
    pub fn new(validators: Vec<PublicKey>, workers: Vec<PublicKey>) -> Self {
        Self { validators, workers }
    }
}

impl QuorumProvider for SimulatedQuorums {
    fn get_quorum(&self, quorum_type: QuorumType, _height: u64) -> Option<Quorum> {
        match quorum_type {
            QuorumType::Checkpointing => Some(Quorum::new(self.validators.clone(), vec![])),
            QuorumType::Obligations => Some(Quorum::new(self.validators.clone(), self.workers.clone())),
        }
    }
}

/// A service-node registry holding every worker in `Active` state, plus
/// this daemon's own keys if it is configured to run as a validator.
pub struct SimulatedRegistry {
    infos: Mutex<HashMap<Vec<u8>, NodeInfo>>,
    our_keys: Option<KeyPair>,
    observed: Mutex<u64>,
}

impl SimulatedRegistry {
    pub fn new(workers: &[PublicKey], our_keys: Option<KeyPair>, start_height: i64) -> Self {
        let mut infos = HashMap::new();
        for key in workers {
            infos.insert(
                key.to_bytes(),
                NodeInfo {
                    active_since_height: start_height,
                    last_decommission_height: 0,
                    decommission_count: 0,
                    is_fully_funded: true,
                    state: NodeState::Active,
                },
            );
        }
        Self {
            infos: Mutex::new(infos),
            our_keys,
            observed: Mutex::new(0),
        }
    }

    pub fn observed_votes(&self) -> u64 {
        *self.observed.lock().expect("registry lock poisoned")
    }
}

impl ServiceNodeRegistry for SimulatedRegistry {
    fn list_state(&self, keys: &[PublicKey]) -> Vec<NodeInfo> {
        let infos = self.infos.lock().expect("registry lock poisoned");
        keys.iter().filter_map(|k| infos.get(&k.to_bytes()).copied()).collect()
    }

    fn is_active(&self, key: &PublicKey) -> bool {
        self.infos
            .lock()
            .expect("registry lock poisoned")
            .get(&key.to_bytes())
            .map(|info| info.is_active())
            .unwrap_or(false)
    }

    fn keys(&self) -> Option<NodeKeys> {
        self.our_keys.as_ref().map(|kp| NodeKeys {
            public: kp.public_key().clone(),
            secret: blockchain_crypto::SecretKey::new(kp.secret_key().as_bytes().to_vec()),
        })
    }

    fn record_checkpoint_vote(&self, _voter_key: &PublicKey, _height: u64, present: bool) {
        if present {
            *self.observed.lock().expect("registry lock poisoned") += 1;
        }
    }

    fn check_service_node(&self, _hf_version: u8, _key: &PublicKey, _info: &NodeInfo) -> TestResult {
        // Every simulated worker behaves; there is no real uptime proof or
        // IP observation to check against (spec.md §1 Non-goals).
        TestResult {
            passed: true,
            single_ip: true,
            uptime_proved: true,
            why: String::new(),
        }
    }
}

/// Accepts every state-change transaction handed to it and logs it.
#[derive(Default)]
pub struct SimulatedTxPool {
    accepted: Mutex<u64>,
}

impl SimulatedTxPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepted_count(&self) -> u64 {
        *self.accepted.lock().expect("tx pool lock poisoned")
    }
}

impl TxPool for SimulatedTxPool {
    fn handle_incoming_tx(&self, _blob: Vec<u8>, height: u64, target_index: u32) -> bool {
        *self.accepted.lock().expect("tx pool lock poisoned") += 1;
        tracing::info!(height, target_index, "state-change transaction accepted into mempool");
        true
    }
}
