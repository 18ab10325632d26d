// vote-handler/src/traits.rs
//
// External collaborator interfaces (spec.md §6). Everything the handler
// needs from block production, the mempool, the storage engine, the
// hard-fork schedule, the service-node registry, and quorum construction is
// reached only through these traits — none of those subsystems are
// implemented in this crate.

use crate::vote::{NewState, QuorumType};
use blockchain_crypto::{Hash, PublicKey, SecretKey, Signature};
use serde::{Deserialize, Serialize};

/// A quorum: an ordered subset of service nodes chosen deterministically at
/// a given height (spec.md §3, GLOSSARY). Opaque to this subsystem beyond
/// its two ordered key lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quorum {
    /// Validators: quorum members that cast votes.
    pub validators: Vec<PublicKey>,
    /// Workers: nodes being tested (empty for the checkpointing quorum).
    pub workers: Vec<PublicKey>,
}

impl Quorum {
    pub fn new(validators: Vec<PublicKey>, workers: Vec<PublicKey>) -> Self {
        Self { validators, workers }
    }
}

/// A multi-signed commitment to a block hash at a height (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub block_height: u64,
    pub block_hash: Hash,
    /// Ordered by `voter_index`, no duplicates (spec.md invariant 5).
    pub signatures: Vec<(u32, Signature)>,
}

impl Checkpoint {
    pub fn new(block_height: u64, block_hash: Hash) -> Self {
        Self {
            block_height,
            block_hash,
            signatures: Vec::new(),
        }
    }

    /// Insert a `(voter_index, signature)` pair, keeping `signatures`
    /// sorted by `voter_index` and free of duplicate voter indices.
    /// Returns whether anything changed.
    pub fn merge_signature(&mut self, voter_index: u32, signature: Signature) -> bool {
        match self
            .signatures
            .binary_search_by_key(&voter_index, |(idx, _)| *idx)
        {
            Ok(_) => false,
            Err(pos) => {
                self.signatures.insert(pos, (voter_index, signature));
                true
            }
        }
    }
}

/// Minimal read-only view of a block, enough for the quorum driver and
/// reorg coordinator — block validation and construction are out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockView {
    pub height: u64,
    pub hash: Hash,
    pub timestamp: u64,
    pub major_version: u8,
}

/// A decoded state-change record, as found embedded in a block's
/// transactions (spec.md §4.2 `remove_used`). Decoding the wire transaction
/// format is out of scope; the caller hands these in pre-decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedStateChange {
    pub block_height: u64,
    pub target_index: u32,
    pub new_state: NewState,
}

/// Service-node info projection used by the credit accountant and the
/// quorum driver (spec.md §3). `active_since_height` is signed: negative
/// values encode the node's pre-decommission start height, matching the
/// original registry's convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub active_since_height: i64,
    pub last_decommission_height: u64,
    pub decommission_count: u32,
    pub is_fully_funded: bool,
    pub state: NodeState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    Active,
    Decommissioned,
    Deregistered,
}

impl NodeInfo {
    pub fn is_decommissioned(&self) -> bool {
        self.state == NodeState::Decommissioned
    }

    pub fn is_active(&self) -> bool {
        self.state == NodeState::Active
    }

    /// Whether this node may still legally transition to `new_state`
    /// at `height` (spec.md §4.5 re-check). Out of scope to model the full
    /// state machine (registry internals); this crate only needs: a
    /// deregistered node cannot transition to anything else, and a node
    /// cannot "recommission" unless currently decommissioned, nor
    /// "decommission"/"ip_change_penalty" unless currently active.
    pub fn can_transition_to_state(&self, new_state: NewState) -> bool {
        if self.state == NodeState::Deregistered {
            return false;
        }
        match new_state {
            NewState::Recommission => self.state == NodeState::Decommissioned,
            NewState::Decommission | NewState::IpChangePenalty => self.state == NodeState::Active,
            NewState::Deregister => true,
        }
    }
}

/// Outcome of testing a worker's liveness/behavior (spec.md §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub passed: bool,
    pub single_ip: bool,
    pub uptime_proved: bool,
    /// Human-readable reason, surfaced in logs when a worker fails.
    pub why: String,
}

/// Our node's signing identity, when we participate as a service node
/// (spec.md §6 `ServiceNodeRegistry::keys()`).
pub struct NodeKeys {
    pub public: PublicKey,
    pub secret: SecretKey,
}

/// The blockchain layer: block/height queries and the checkpoint store.
/// Lockable for the checkpoint read-decide-write critical section
/// (spec.md §4.4, §5, §9).
pub trait Blockchain {
    fn current_height(&self) -> u64;
    fn target_height(&self) -> u64;
    fn hard_fork_version(&self, height: u64) -> u8;
    fn block_id_by_height(&self, height: u64) -> Option<Hash>;
    fn block_view(&self, height: u64) -> Option<BlockView>;

    fn get_checkpoint(&self, height: u64) -> Option<Checkpoint>;

    /// Run `f` with exclusive access to the checkpoint store, covering both
    /// the read of the current checkpoint and any write `f` performs. The
    /// lock scope must span the whole read-decide-write decision (spec.md
    /// §4.4): per-write atomicity alone is not sufficient.
    fn with_checkpoint_lock(
        &self,
        height: u64,
        f: &mut dyn FnMut(Option<Checkpoint>) -> Option<Checkpoint>,
    );
}

/// Supplies finished quorums; constructing them from the service-node set
/// is out of scope (spec.md §1).
pub trait QuorumProvider {
    fn get_quorum(&self, quorum_type: QuorumType, height: u64) -> Option<Quorum>;
}

/// The service-node registry: uptime proofs, staking, and IP observation
/// are out of scope; this crate only consumes the projection below
/// (spec.md §6).
pub trait ServiceNodeRegistry {
    fn list_state(&self, keys: &[PublicKey]) -> Vec<NodeInfo>;
    fn is_active(&self, key: &PublicKey) -> bool;
    /// Our own signing keys, if this daemon is running as a service node.
    fn keys(&self) -> Option<NodeKeys>;
    /// Credit another validator for having cast an observed checkpoint
    /// vote at `height` (spec.md §4.7 step 1, §C.2 of SPEC_FULL.md).
    fn record_checkpoint_vote(&self, voter_key: &PublicKey, height: u64, present: bool);
    /// Test a worker's liveness/behavior for the obligations quorum.
    fn check_service_node(&self, hf_version: u8, key: &PublicKey, info: &NodeInfo) -> TestResult;
}

/// The transaction pool / mempool: accepts constructed state-change
/// transactions for normal propagation. Mempool internals are out of scope.
pub trait TxPool {
    fn handle_incoming_tx(&self, blob: Vec<u8>, height: u64, target_index: u32) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockchain_crypto::KeyPair;

    #[test]
    fn test_checkpoint_merge_signature_sorted_no_duplicates() {
        let mut cp = Checkpoint::new(96, Hash::zero());
        let kp = KeyPair::generate();
        let sig = kp.sign(b"x");

        assert!(cp.merge_signature(3, sig.clone()));
        assert!(cp.merge_signature(1, sig.clone()));
        assert!(!cp.merge_signature(1, sig.clone())); // duplicate voter_index
        assert!(cp.merge_signature(2, sig));

        let indices: Vec<u32> = cp.signatures.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_can_transition_to_state() {
        let active = NodeInfo {
            active_since_height: 10,
            last_decommission_height: 0,
            decommission_count: 0,
            is_fully_funded: true,
            state: NodeState::Active,
        };
        assert!(active.can_transition_to_state(NewState::Decommission));
        assert!(!active.can_transition_to_state(NewState::Recommission));

        let deregistered = NodeInfo {
            state: NodeState::Deregistered,
            ..active
        };
        assert!(!deregistered.can_transition_to_state(NewState::Deregister));
    }
}
