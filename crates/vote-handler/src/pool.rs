// vote-handler/src/pool.rs
//
// C2 — vote pool: deduplication, expiry, relay bookkeeping, "used" pruning
// (spec.md §4.2). Guarded by its own internal lock; fine-grained per group
// is acceptable (spec.md §5).

use crate::config::HandlerConfig;
use crate::traits::CommittedStateChange;
use crate::vote::{Discriminator, QuorumType, Vote};
use std::collections::HashMap;
use std::sync::Mutex;

/// A pooled vote plus its relay bookkeeping (spec.md §3).
#[derive(Debug, Clone)]
pub struct PoolVote {
    pub vote: Vote,
    /// Unix seconds of the last general-peer relay, 0 if never relayed.
    pub time_last_sent_p2p: u64,
    /// Chain height at which this vote was last relayed.
    pub last_sent_height: u64,
}

/// Identity key for a pool group: every vote sharing this key is a distinct
/// candidate toward the *same* aggregation threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GroupKey {
    quorum_type: QuorumType,
    block_height: u64,
    discriminator: Discriminator,
}

/// Identity key for a single voter's entry within a group
/// (spec.md invariant 1: at most one entry per `(quorum_type, height, voter_index)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VoterKey {
    group: GroupKey,
    voter_index: u32,
}

/// The vote pool. Process-local: rebuilt from peer relay on startup
/// (spec.md §6 "Persisted state").
pub struct VotePool {
    entries: Mutex<HashMap<VoterKey, PoolVote>>,
}

impl Default for VotePool {
    fn default() -> Self {
        Self::new()
    }
}

impl VotePool {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn voter_key(vote: &Vote) -> VoterKey {
        VoterKey {
            group: GroupKey {
                quorum_type: vote.quorum_type(),
                block_height: vote.block_height(),
                discriminator: vote.discriminator(),
            },
            voter_index: vote.voter_index(),
        }
    }

    /// Insert `vote` iff no entry with the same
    /// `(quorum_type, block_height, voter_index, discriminator)` exists.
    /// Returns whether it was added and the full current list for that
    /// aggregation target, in insertion order (spec.md §4.2).
    pub fn add_if_unique(&self, vote: Vote) -> (bool, Vec<Vote>) {
        let key = Self::voter_key(&vote);
        let mut entries = self.entries.lock().expect("vote pool lock poisoned");

        let added = if entries.contains_key(&key) {
            false
        } else {
            entries.insert(
                key,
                PoolVote {
                    vote,
                    time_last_sent_p2p: 0,
                    last_sent_height: 0,
                },
            );
            true
        };

        let collected = Self::collect_group(&entries, key.group);
        (added, collected)
    }

    fn collect_group(entries: &HashMap<VoterKey, PoolVote>, group: GroupKey) -> Vec<Vote> {
        // HashMap has no stable iteration order; sort by voter_index so
        // "insertion order" is reproduced deterministically. Threshold
        // checks only rely on size (spec.md §4.2 "Fairness/ordering"), but
        // deterministic output makes the aggregator's checkpoint
        // construction order reproducible for tests.
        let mut group_entries: Vec<&PoolVote> = entries
            .iter()
            .filter(|(k, _)| k.group == group)
            .map(|(_, v)| v)
            .collect();
        group_entries.sort_by_key(|pv| pv.vote.voter_index());
        group_entries.into_iter().map(|pv| pv.vote.clone()).collect()
    }

    /// Drop every group whose height has aged past `VOTE_LIFETIME`
    /// (spec.md §4.2, invariant 3).
    pub fn remove_expired(&self, current_height: u64, config: &HandlerConfig) {
        let mut entries = self.entries.lock().expect("vote pool lock poisoned");
        entries.retain(|key, _| key.group.block_height + config.vote_lifetime > current_height);
    }

    /// Drop pool entries matching state-change records now committed
    /// on-chain (spec.md §4.2).
    pub fn remove_used(&self, committed: &[CommittedStateChange]) {
        if committed.is_empty() {
            return;
        }
        let mut entries = self.entries.lock().expect("vote pool lock poisoned");
        entries.retain(|key, _| {
            !committed.iter().any(|c| {
                key.group.quorum_type == QuorumType::Obligations
                    && key.group.block_height == c.block_height
                    && key.group.discriminator == Discriminator::Target(c.target_index, c.new_state)
            })
        });
    }

    /// Mark `votes` as relayed at `height` (spec.md §4.2 `set_relayed`).
    pub fn set_relayed(&self, votes: &[Vote], height: u64, now: u64) {
        let mut entries = self.entries.lock().expect("vote pool lock poisoned");
        for vote in votes {
            let key = Self::voter_key(vote);
            if let Some(entry) = entries.get_mut(&key) {
                entry.time_last_sent_p2p = now;
                entry.last_sent_height = height;
            }
        }
    }

    /// Votes eligible for relay: not relayed within `relay_interval` (or
    /// `quorum_relay_interval` if `quorum_relay`), and at least one block
    /// has passed since the previous relay (spec.md §4.2).
    pub fn relayable_votes(
        &self,
        current_height: u64,
        now: u64,
        quorum_relay: bool,
        config: &HandlerConfig,
    ) -> Vec<Vote> {
        let interval = if quorum_relay {
            config.quorum_relay_interval
        } else {
            config.relay_interval
        };
        let entries = self.entries.lock().expect("vote pool lock poisoned");
        entries
            .values()
            .filter(|pv| {
                let time_elapsed = pv.time_last_sent_p2p == 0 || now.saturating_sub(pv.time_last_sent_p2p) >= interval;
                let height_elapsed = pv.last_sent_height == 0 || current_height > pv.last_sent_height;
                time_elapsed && height_elapsed
            })
            .map(|pv| pv.vote.clone())
            .collect()
    }

    /// Whether a checkpoint vote from `voter_index` at `height` has been
    /// observed (spec.md §4.2, used by the statistics path).
    pub fn received_checkpoint_vote(&self, height: u64, voter_index: u32) -> bool {
        let entries = self.entries.lock().expect("vote pool lock poisoned");
        entries.keys().any(|key| {
            key.group.quorum_type == QuorumType::Checkpointing
                && key.group.block_height == height
                && key.voter_index == voter_index
        })
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().expect("vote pool lock poisoned").len()
    }
}
