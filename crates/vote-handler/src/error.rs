// vote-handler/src/error.rs

/// Result type for vote-handler operations
pub type VoteHandlerResult<T> = Result<T, VoteHandlerError>;

/// Errors surfaced by the vote handler.
///
/// `already_in_pool` (spec.md §7) is deliberately absent here: it is not a
/// failure, it is signalled by `Handler::handle_vote` returning `Ok(true)`
/// without re-running aggregation.
#[derive(Debug, thiserror::Error)]
pub enum VoteHandlerError {
    /// Vote's `block_height` is outside the acceptable window relative to
    /// the chain tip (too old or, for quorum lookups, simply unknown).
    #[error("invalid block height {height} at chain height {chain_height}")]
    InvalidBlockHeight { height: u64, chain_height: u64 },

    /// Vote's `block_height` is further ahead of the chain tip than
    /// `VOTE_LOOKAHEAD` permits.
    #[error("vote for future block height {height} (chain height {chain_height})")]
    FutureBlockHeight { height: u64, chain_height: u64 },

    /// Signature did not verify against the quorum's validator key.
    #[error("signature invalid for voter index {voter_index}")]
    SignatureInvalid { voter_index: u32 },

    /// `voter_index` did not name a seat in the quorum's validator list.
    #[error("voter index {voter_index} out of range (quorum has {validator_count} validators)")]
    NotInQuorum {
        voter_index: u32,
        validator_count: usize,
    },

    /// `target_index` (state-change votes only) did not name a seat in the
    /// quorum's worker list.
    #[error("worker index {target_index} out of range (quorum has {worker_count} workers)")]
    WorkerIndexOutOfBounds {
        target_index: u32,
        worker_count: usize,
    },

    #[error("crypto error: {0}")]
    Crypto(#[from] blockchain_crypto::CryptoError),
}
