// vote-handler/src/vote.rs
//
// C1 — vote model: typed vote records, fingerprinting, signing/verification
// primitives (spec.md §4.1).

use blockchain_crypto::{double_hash, Hash, KeyPair, PublicKey, Signature};
use serde::{Deserialize, Serialize};

/// Which quorum a vote belongs to. Implicit in a vote's shape (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuorumType {
    Obligations,
    Checkpointing,
}

/// Target state a service-node-state vote proposes to move a worker into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NewState {
    Deregister,
    Decommission,
    Recommission,
    IpChangePenalty,
}

/// A signed quorum vote. Tagged variant rather than an inheritance
/// hierarchy: the two aggregation paths (C4, C5) do not share code beyond
/// the pool (spec.md §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Vote {
    Checkpoint {
        block_height: u64,
        block_hash: Hash,
        voter_index: u32,
        signature: Signature,
    },
    StateChange {
        block_height: u64,
        voter_index: u32,
        target_index: u32,
        new_state: NewState,
        signature: Signature,
    },
}

impl Vote {
    /// Which quorum this vote was cast in.
    pub fn quorum_type(&self) -> QuorumType {
        match self {
            Vote::Checkpoint { .. } => QuorumType::Checkpointing,
            Vote::StateChange { .. } => QuorumType::Obligations,
        }
    }

    pub fn block_height(&self) -> u64 {
        match self {
            Vote::Checkpoint { block_height, .. } => *block_height,
            Vote::StateChange { block_height, .. } => *block_height,
        }
    }

    pub fn voter_index(&self) -> u32 {
        match self {
            Vote::Checkpoint { voter_index, .. } => *voter_index,
            Vote::StateChange { voter_index, .. } => *voter_index,
        }
    }

    pub fn signature(&self) -> &Signature {
        match self {
            Vote::Checkpoint { signature, .. } => signature,
            Vote::StateChange { signature, .. } => signature,
        }
    }

    /// The discriminator that partitions votes at the same
    /// `(quorum_type, block_height)` into distinct aggregation targets
    /// (spec.md §4.2): the block hash for checkpoint votes, or
    /// `(target_index, new_state)` for state-change votes.
    pub fn discriminator(&self) -> Discriminator {
        match self {
            Vote::Checkpoint { block_hash, .. } => Discriminator::BlockHash(*block_hash),
            Vote::StateChange {
                target_index,
                new_state,
                ..
            } => Discriminator::Target(*target_index, *new_state),
        }
    }

    /// The signing digest (spec.md §4.1): a domain-separated hash of the
    /// vote's fields excluding `voter_index` and `signature`, which are
    /// transport fields, not signed.
    pub fn signing_digest(&self) -> Hash {
        match self {
            Vote::Checkpoint {
                block_height,
                block_hash,
                ..
            } => checkpoint_digest(*block_height, block_hash),
            Vote::StateChange {
                block_height,
                target_index,
                new_state,
                ..
            } => state_change_digest(*block_height, *target_index, *new_state),
        }
    }

    /// Verify the vote's signature against the given validator public key.
    pub fn verify_signature(&self, validator_key: &PublicKey) -> blockchain_crypto::CryptoResult<bool> {
        let digest = self.signing_digest();
        validator_key.verify(digest.as_bytes(), self.signature())
    }

    /// Build and sign a checkpoint vote.
    pub fn sign_checkpoint(
        block_height: u64,
        block_hash: Hash,
        voter_index: u32,
        keys: &KeyPair,
    ) -> Self {
        let digest = checkpoint_digest(block_height, &block_hash);
        let signature = keys.sign(digest.as_bytes());
        Vote::Checkpoint {
            block_height,
            block_hash,
            voter_index,
            signature,
        }
    }

    /// Build and sign a state-change vote.
    pub fn sign_state_change(
        block_height: u64,
        target_index: u32,
        new_state: NewState,
        voter_index: u32,
        keys: &KeyPair,
    ) -> Self {
        let digest = state_change_digest(block_height, target_index, new_state);
        let signature = keys.sign(digest.as_bytes());
        Vote::StateChange {
            block_height,
            voter_index,
            target_index,
            new_state,
            signature,
        }
    }
}

fn checkpoint_digest(block_height: u64, block_hash: &Hash) -> Hash {
    let mut buf = Vec::with_capacity(15 + 8 + 32);
    buf.extend_from_slice(b"checkpoint-vote");
    buf.extend_from_slice(&block_height.to_le_bytes());
    buf.extend_from_slice(block_hash.as_bytes());
    double_hash(&buf)
}

fn state_change_digest(block_height: u64, target_index: u32, new_state: NewState) -> Hash {
    let mut buf = Vec::with_capacity(18 + 8 + 4 + 1);
    buf.extend_from_slice(b"state-change-vote");
    buf.extend_from_slice(&block_height.to_le_bytes());
    buf.extend_from_slice(&target_index.to_le_bytes());
    buf.push(new_state as u8);
    double_hash(&buf)
}

/// Identifies a distinct aggregation target at a given
/// `(quorum_type, block_height)` (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Discriminator {
    BlockHash(Hash),
    Target(u32, NewState),
}
