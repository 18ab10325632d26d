//! Checkpoint and service-node-state vote handler for a proof-of-service
//! blockchain daemon.
//!
//! Receives signed quorum votes, deduplicates and ages them in a pool,
//! aggregates them into block checkpoints and service-node state-change
//! transactions, and drives a per-block catch-up voting loop — all while
//! tolerating chain reorganizations up to a bounded safety buffer.
//!
//! This crate is synchronous: verification and aggregation are CPU-bound and
//! short, and are expected to run on whichever thread (network thread,
//! blockchain worker thread) invokes them. Async scheduling belongs to the
//! daemon that embeds this crate, not to the crate itself.

pub mod checkpoint;
pub mod config;
pub mod credit;
pub mod driver;
pub mod error;
pub mod handler;
pub mod pool;
pub mod reorg;
pub mod state_change;
pub mod traits;
pub mod verifier;
pub mod vote;

pub use config::HandlerConfig;
pub use error::{VoteHandlerError, VoteHandlerResult};
pub use handler::Handler;
pub use pool::{PoolVote, VotePool};
pub use traits::{
    BlockView, Blockchain, Checkpoint, CommittedStateChange, NodeInfo, NodeKeys, NodeState,
    Quorum, QuorumProvider, ServiceNodeRegistry, TestResult, TxPool,
};
pub use vote::{NewState, QuorumType, Vote};
