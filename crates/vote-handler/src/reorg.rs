// vote-handler/src/reorg.rs
//
// C8 — reorg coordinator: roll back the checkpoint high-water mark and
// evict stale pool entries on detach (spec.md §4.8).

use crate::config::HandlerConfig;
use crate::pool::VotePool;

/// `blockchain_detached(height, by_pop_blocks)` (spec.md §4.8).
///
/// Returns the new `last_checkpointed_height` the caller should store, and
/// whether a safety-buffer violation was detected (the caller logs an
/// error for this unless `by_pop_blocks`).
pub fn blockchain_detached(
    height: u64,
    by_pop_blocks: bool,
    last_checkpointed_height: u64,
    hf_version: u8,
    pool: &VotePool,
    config: &HandlerConfig,
) -> (u64, bool) {
    let safety = config.safety_buffer(hf_version);

    let (new_height, buffer_violated) = if last_checkpointed_height >= height + safety {
        let rewound = height - (height % config.checkpoint_interval);
        (rewound, !by_pop_blocks)
    } else {
        (last_checkpointed_height, false)
    };

    pool.remove_expired(height, config);

    (new_height, buffer_violated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_reorg_within_buffer_no_rewind() {
        let config = HandlerConfig::default();
        let pool = VotePool::new();
        // last_checkpointed_height = 100, SAFETY = 12 (post-HF).
        let (new_height, violated) =
            blockchain_detached(95, false, 100, config.checkpointing_hard_fork, &pool, &config);
        // 100 < 95 + 12 = 107 -> no rewind
        assert_eq!(new_height, 100);
        assert!(!violated);
    }

    #[test]
    fn test_scenario_reorg_past_buffer_rewinds_and_logs() {
        let config = HandlerConfig::default();
        let pool = VotePool::new();
        // 100 >= 88 + 12 = 100 -> rewind
        let (new_height, violated) =
            blockchain_detached(88, false, 100, config.checkpointing_hard_fork, &pool, &config);
        assert_eq!(new_height, 88 - (88 % config.checkpoint_interval));
        assert!(violated); // by_pop_blocks=false -> error logged
    }

    #[test]
    fn test_by_pop_blocks_suppresses_violation_flag() {
        let config = HandlerConfig::default();
        let pool = VotePool::new();
        let (new_height, violated) =
            blockchain_detached(88, true, 100, config.checkpointing_hard_fork, &pool, &config);
        assert_eq!(new_height, 88 - (88 % config.checkpoint_interval));
        assert!(!violated); // by_pop_blocks=true -> no error, even though rewound
    }

    #[test]
    fn test_boundary_exactly_at_safety_buffer_rewinds() {
        let config = HandlerConfig::default();
        let pool = VotePool::new();
        let safety = config.reorg_safety_buffer_post_hf;
        let h = 100 - safety; // last_checkpointed_height == h + SAFETY
        let (new_height, _) = blockchain_detached(h, false, 100, config.checkpointing_hard_fork, &pool, &config);
        assert_eq!(new_height, h - (h % config.checkpoint_interval));
    }

    #[test]
    fn test_boundary_one_below_safety_buffer_does_not_rewind() {
        let config = HandlerConfig::default();
        let pool = VotePool::new();
        let safety = config.reorg_safety_buffer_post_hf;
        let h = 100 - safety + 1; // last_checkpointed_height == h + SAFETY - 1
        let (new_height, _) = blockchain_detached(h, false, 100, config.checkpointing_hard_fork, &pool, &config);
        assert_eq!(new_height, 100);
    }

    #[test]
    fn test_property_p4_rewound_height_is_multiple_of_interval() {
        let config = HandlerConfig::default();
        for h in 0u64..200 {
            let pool = VotePool::new();
            let (new_height, _) = blockchain_detached(h, false, u64::MAX / 2, config.checkpointing_hard_fork, &pool, &config);
            assert_eq!(new_height % config.checkpoint_interval, 0);
        }
    }
}
