// vote-handler/src/state_change.rs
//
// C5 — state-change aggregator: threshold detection, state-change
// transaction construction, submission (spec.md §4.5).

use crate::config::HandlerConfig;
use crate::traits::{NodeInfo, TxPool};
use crate::vote::{NewState, Vote};

/// Result of an aggregation attempt, for logging/testing visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChangeOutcome {
    /// Fewer than `state_change_min_votes` collected; no-op.
    BelowThreshold,
    /// The worker can no longer legally transition to this state (it may
    /// have already been acted on by a concurrent path); votes stay
    /// pooled until they expire or are pruned by `remove_used`.
    NoLongerEligible,
    /// Transaction built and accepted by the tx pool.
    Submitted,
    /// Transaction built but the tx pool rejected it; votes remain for
    /// another attempt.
    Rejected,
}

/// Encodes a state-change transaction's extra field
/// (spec.md §4.5: `(new_state, h, target_index, [(signature, voter_index), ...])`).
#[derive(Debug, Clone)]
pub struct StateChangeTx {
    pub block_height: u64,
    pub target_index: u32,
    pub new_state: NewState,
    pub signatures: Vec<(u32, blockchain_crypto::Signature)>,
}

impl StateChangeTx {
    /// Serialize for handoff to the transaction pool. The wire format
    /// itself is out of scope (spec.md §1); this is a stable JSON encoding
    /// sufficient to round-trip through the `TxPool` boundary.
    pub fn to_blob(&self) -> Vec<u8> {
        #[derive(serde::Serialize)]
        struct Wire<'a> {
            block_height: u64,
            target_index: u32,
            new_state: NewState,
            signatures: &'a [(u32, blockchain_crypto::Signature)],
        }
        serde_json::to_vec(&Wire {
            block_height: self.block_height,
            target_index: self.target_index,
            new_state: self.new_state,
            signatures: &self.signatures,
        })
        .expect("state-change tx always serializes")
    }
}

/// Aggregate a new obligations vote collection for
/// `(obligations, h, target_index, new_state)`.
pub fn aggregate_state_change_vote(
    height: u64,
    target_index: u32,
    new_state: NewState,
    votes: &[Vote],
    target_info: &NodeInfo,
    tx_pool: &dyn TxPool,
    config: &HandlerConfig,
) -> StateChangeOutcome {
    if votes.len() < config.state_change_min_votes as usize {
        return StateChangeOutcome::BelowThreshold;
    }

    if !target_info.can_transition_to_state(new_state) {
        return StateChangeOutcome::NoLongerEligible;
    }

    let signatures = votes
        .iter()
        .filter_map(|v| match v {
            Vote::StateChange {
                voter_index,
                signature,
                ..
            } => Some((*voter_index, signature.clone())),
            _ => None,
        })
        .collect();

    let tx = StateChangeTx {
        block_height: height,
        target_index,
        new_state,
        signatures,
    };

    if tx_pool.handle_incoming_tx(tx.to_blob(), height, target_index) {
        StateChangeOutcome::Submitted
    } else {
        tracing::warn!(
            height,
            target_index,
            ?new_state,
            "tx pool rejected state-change transaction"
        );
        StateChangeOutcome::Rejected
    }
}
