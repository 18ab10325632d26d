// vote-handler/src/config.rs

use serde::{Deserialize, Serialize};

/// Policy constants for the vote handler (spec.md §6 "Configuration constants").
///
/// These are ordinary runtime values, not compiled-in `const`s: the demo
/// daemon (`quorum-node`) loads them from a config file and converts into
/// this struct, but the defaults below match the literal values used in the
/// worked scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Blocks after which a pool entry expires.
    pub vote_lifetime: u64,
    /// How far ahead of the chain tip a vote's height may be before it is
    /// rejected as `future_block_height`.
    pub vote_lookahead: u64,
    /// Checkpoints are only formed at heights that are multiples of this.
    pub checkpoint_interval: u64,
    /// Minimum signatures to commit/augment a checkpoint.
    pub checkpoint_min_votes: u32,
    /// Size of a checkpoint quorum's validator list.
    pub checkpoint_quorum_size: u32,
    /// Minimum votes to build and submit a state-change transaction.
    pub state_change_min_votes: u32,
    /// Reorg safety buffer (blocks) before `CHECKPOINTING_HARD_FORK`.
    pub reorg_safety_buffer_pre_hf: u64,
    /// Reorg safety buffer (blocks) from `CHECKPOINTING_HARD_FORK` onward.
    pub reorg_safety_buffer_post_hf: u64,
    /// Hard-fork version at/after which `reorg_safety_buffer_post_hf` applies.
    ///
    /// Unifies the two inconsistent hard-fork constants found in the
    /// original source (`network_version_18_checkpointing` in the reorg
    /// path, `network_version_12_checkpointing` in the quorum-driver path)
    /// into a single knob. See DESIGN.md, Open Question (i).
    pub checkpointing_hard_fork: u8,
    /// Minimum daemon uptime (seconds) before we cast (not just observe)
    /// obligations/checkpoint votes.
    pub min_uptime_before_voting: u64,
    /// Decommission credit accrual rate: credit earned per `blocks_per_day`
    /// blocks of active service.
    pub credit_per_day: i64,
    /// Blocks expected in a 24-hour period, used to convert `blocks_up` into
    /// credit days.
    pub blocks_per_day: i64,
    /// Credit granted on a node's first decommission.
    pub initial_credit: i64,
    /// Credit cap.
    pub max_credit: i64,
    /// Minimum credit required to decommission (vs. deregister) a failing
    /// active node.
    pub decommission_minimum: i64,
    /// Minimum seconds between relaying the same vote to general peers.
    pub relay_interval: u64,
    /// Minimum seconds between relaying the same vote among quorum peers
    /// (tighter than `relay_interval`; spec.md §4.2 "quorum_relay=true").
    pub quorum_relay_interval: u64,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            vote_lifetime: 60,
            vote_lookahead: 10,
            checkpoint_interval: 4,
            checkpoint_min_votes: 7,
            checkpoint_quorum_size: 10,
            state_change_min_votes: 7,
            reorg_safety_buffer_pre_hf: 21,
            reorg_safety_buffer_post_hf: 12,
            checkpointing_hard_fork: 12,
            min_uptime_before_voting: 7200, // 2 hours
            credit_per_day: 1,
            blocks_per_day: 720,
            initial_credit: 2,
            max_credit: 4,
            decommission_minimum: 0,
            relay_interval: 60,
            quorum_relay_interval: 10,
        }
    }
}

impl HandlerConfig {
    /// Reorg safety buffer in effect at a given hard-fork version
    /// (spec.md §4.7, §4.8).
    pub fn safety_buffer(&self, hf_version: u8) -> u64 {
        if hf_version >= self.checkpointing_hard_fork {
            self.reorg_safety_buffer_post_hf
        } else {
            self.reorg_safety_buffer_pre_hf
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_spec_scenarios() {
        let cfg = HandlerConfig::default();
        assert_eq!(cfg.checkpoint_min_votes, 7);
        assert_eq!(cfg.checkpoint_quorum_size, 10);
        assert_eq!(cfg.checkpoint_interval, 4);
        assert_eq!(cfg.vote_lifetime, 60);
        assert_eq!(cfg.state_change_min_votes, 7);
    }

    #[test]
    fn test_safety_buffer_selection() {
        let cfg = HandlerConfig::default();
        assert_eq!(cfg.safety_buffer(cfg.checkpointing_hard_fork - 1), cfg.reorg_safety_buffer_pre_hf);
        assert_eq!(cfg.safety_buffer(cfg.checkpointing_hard_fork), cfg.reorg_safety_buffer_post_hf);
    }
}
