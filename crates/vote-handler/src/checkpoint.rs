// vote-handler/src/checkpoint.rs
//
// C4 — checkpoint aggregator: threshold detection, idempotent checkpoint
// commit under concurrent writers (spec.md §4.4).

use crate::config::HandlerConfig;
use crate::traits::{Blockchain, Checkpoint};
use crate::vote::Vote;
use blockchain_crypto::Hash;

/// Result of an aggregation attempt, for logging/testing visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointOutcome {
    /// Fewer than `checkpoint_min_votes` collected; no-op.
    BelowThreshold,
    /// A checkpoint for this height already commits a different block
    /// hash; this is a fork, resolved by the blockchain's own policy.
    ForkMismatch,
    /// No existing checkpoint at this height; a fresh one was committed.
    Created,
    /// An existing checkpoint for the same hash gained new signatures.
    Augmented,
    /// An existing checkpoint for the same hash already had every
    /// signature we collected; nothing written.
    Unchanged,
}

/// Aggregate a new checkpoint vote collection for `(checkpointing, height, block_hash)`.
///
/// `votes` must all share the same `height`/`block_hash` (the caller is
/// `Handler::handle_vote`, which collects exactly this group from the
/// pool). The read-decide-write runs under the blockchain's own lock: the
/// decision to overwrite depends on the prior value, so per-write atomicity
/// alone would not be linearizable (spec.md §4.4, §9).
pub fn aggregate_checkpoint_vote(
    height: u64,
    block_hash: Hash,
    votes: &[Vote],
    blockchain: &dyn Blockchain,
    config: &HandlerConfig,
) -> CheckpointOutcome {
    if votes.len() < config.checkpoint_min_votes as usize {
        return CheckpointOutcome::BelowThreshold;
    }

    let mut outcome = CheckpointOutcome::BelowThreshold;
    blockchain.with_checkpoint_lock(height, &mut |existing| match existing {
        Some(mut cp) if cp.block_hash == block_hash => {
            let mut changed = false;
            for vote in votes {
                if let Vote::Checkpoint { voter_index, signature, .. } = vote {
                    changed |= cp.merge_signature(*voter_index, signature.clone());
                }
            }
            outcome = if changed {
                CheckpointOutcome::Augmented
            } else {
                CheckpointOutcome::Unchanged
            };
            if changed {
                Some(cp)
            } else {
                None
            }
        }
        Some(cp) => {
            // Different block_hash at the same height: a fork. Do not
            // overwrite; resolution is the blockchain's own policy.
            outcome = CheckpointOutcome::ForkMismatch;
            let _ = cp;
            None
        }
        None => {
            let mut cp = Checkpoint::new(height, block_hash);
            for vote in votes {
                if let Vote::Checkpoint { voter_index, signature, .. } = vote {
                    cp.merge_signature(*voter_index, signature.clone());
                }
            }
            outcome = CheckpointOutcome::Created;
            Some(cp)
        }
    });

    outcome
}
