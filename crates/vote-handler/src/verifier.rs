// vote-handler/src/verifier.rs
//
// C3 — verifier: age, quorum-membership, and signature checks
// (spec.md §4.3). Pure and re-entrant: must not mutate handler state.

use crate::config::HandlerConfig;
use crate::error::{VoteHandlerError, VoteHandlerResult};
use crate::traits::QuorumProvider;
use crate::vote::Vote;

/// Runs the four-stage verification pipeline against a freshly-fetched
/// quorum. Returns the quorum's validator (and, for state-change votes,
/// the worker) count are already checked; on success the caller may trust
/// the vote's signature and index bounds.
pub struct Verifier<'a> {
    config: &'a HandlerConfig,
}

impl<'a> Verifier<'a> {
    pub fn new(config: &'a HandlerConfig) -> Self {
        Self { config }
    }

    /// `verify(vote, chain_height)` (spec.md §4.3). Short-circuits on the
    /// first failing stage.
    pub fn verify(
        &self,
        vote: &Vote,
        chain_height: u64,
        quorum_provider: &dyn QuorumProvider,
    ) -> VoteHandlerResult<()> {
        self.check_age(vote, chain_height)?;

        let quorum = quorum_provider
            .get_quorum(vote.quorum_type(), vote.block_height())
            .ok_or(VoteHandlerError::InvalidBlockHeight {
                height: vote.block_height(),
                chain_height,
            })?;

        let voter_index = vote.voter_index();
        if voter_index as usize >= quorum.validators.len() {
            return Err(VoteHandlerError::NotInQuorum {
                voter_index,
                validator_count: quorum.validators.len(),
            });
        }

        if let Vote::StateChange { target_index, .. } = vote {
            if *target_index as usize >= quorum.workers.len() {
                return Err(VoteHandlerError::WorkerIndexOutOfBounds {
                    target_index: *target_index,
                    worker_count: quorum.workers.len(),
                });
            }
        }

        let validator_key = &quorum.validators[voter_index as usize];
        let ok = vote.verify_signature(validator_key)?;
        if !ok {
            return Err(VoteHandlerError::SignatureInvalid { voter_index });
        }

        Ok(())
    }

    fn check_age(&self, vote: &Vote, chain_height: u64) -> VoteHandlerResult<()> {
        let height = vote.block_height();
        if height + self.config.vote_lifetime <= chain_height {
            return Err(VoteHandlerError::InvalidBlockHeight { height, chain_height });
        }
        if height > chain_height + self.config.vote_lookahead {
            return Err(VoteHandlerError::FutureBlockHeight { height, chain_height });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Quorum;
    use crate::vote::NewState;
    use blockchain_crypto::{Hash, KeyPair};
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct MockQuorums {
        quorums: RefCell<HashMap<(crate::vote::QuorumType, u64), Quorum>>,
    }

    impl QuorumProvider for MockQuorums {
        fn get_quorum(&self, quorum_type: crate::vote::QuorumType, height: u64) -> Option<Quorum> {
            self.quorums.borrow().get(&(quorum_type, height)).cloned()
        }
    }

    fn one_validator_quorum(quorum_type: crate::vote::QuorumType, height: u64, key: blockchain_crypto::PublicKey) -> MockQuorums {
        let mut quorums = HashMap::new();
        quorums.insert((quorum_type, height), Quorum::new(vec![key], vec![]));
        MockQuorums {
            quorums: RefCell::new(quorums),
        }
    }

    #[test]
    fn test_boundary_age_accepts_exactly_at_window_edge() {
        let cfg = HandlerConfig::default();
        let keys = KeyPair::generate();
        let chain_height = 100;
        // height + VOTE_LIFETIME == chain_height + 1, the earliest accepted height
        let height = chain_height - cfg.vote_lifetime + 1;
        let vote = Vote::sign_checkpoint(height, Hash::zero(), 0, &keys);
        let provider = one_validator_quorum(vote.quorum_type(), height, keys.public_key().clone());

        let verifier = Verifier::new(&cfg);
        assert!(verifier.verify(&vote, chain_height, &provider).is_ok());
    }

    #[test]
    fn test_boundary_age_rejects_one_lower() {
        let cfg = HandlerConfig::default();
        let keys = KeyPair::generate();
        let chain_height = 100;
        let height = chain_height - cfg.vote_lifetime; // one block too old
        let vote = Vote::sign_checkpoint(height, Hash::zero(), 0, &keys);
        let provider = one_validator_quorum(vote.quorum_type(), height, keys.public_key().clone());

        let verifier = Verifier::new(&cfg);
        let err = verifier.verify(&vote, chain_height, &provider).unwrap_err();
        assert!(matches!(err, VoteHandlerError::InvalidBlockHeight { .. }));
    }

    #[test]
    fn test_future_height_rejected() {
        let cfg = HandlerConfig::default();
        let keys = KeyPair::generate();
        let chain_height = 100;
        let height = chain_height + cfg.vote_lookahead + 1;
        let vote = Vote::sign_checkpoint(height, Hash::zero(), 0, &keys);
        let provider = one_validator_quorum(vote.quorum_type(), height, keys.public_key().clone());

        let verifier = Verifier::new(&cfg);
        let err = verifier.verify(&vote, chain_height, &provider).unwrap_err();
        assert!(matches!(err, VoteHandlerError::FutureBlockHeight { .. }));
    }

    #[test]
    fn test_voter_index_out_of_range() {
        let cfg = HandlerConfig::default();
        let keys = KeyPair::generate();
        let height = 96;
        let vote = Vote::sign_checkpoint(height, Hash::zero(), 5, &keys);
        let provider = one_validator_quorum(vote.quorum_type(), height, keys.public_key().clone());

        let verifier = Verifier::new(&cfg);
        let err = verifier.verify(&vote, 100, &provider).unwrap_err();
        assert!(matches!(err, VoteHandlerError::NotInQuorum { .. }));
    }

    #[test]
    fn test_worker_index_out_of_range() {
        let cfg = HandlerConfig::default();
        let keys = KeyPair::generate();
        let height = 200;
        let vote = Vote::sign_state_change(height, 9, NewState::Decommission, 0, &keys);
        let provider = one_validator_quorum(vote.quorum_type(), height, keys.public_key().clone());

        let verifier = Verifier::new(&cfg);
        let err = verifier.verify(&vote, 200, &provider).unwrap_err();
        assert!(matches!(err, VoteHandlerError::WorkerIndexOutOfBounds { .. }));
    }

    #[test]
    fn test_signature_invalid_rejected() {
        let cfg = HandlerConfig::default();
        let signer = KeyPair::generate();
        let other = KeyPair::generate();
        let height = 96;
        let vote = Vote::sign_checkpoint(height, Hash::zero(), 0, &signer);
        // Quorum lists a different key at voter_index 0 than the one that signed.
        let provider = one_validator_quorum(vote.quorum_type(), height, other.public_key().clone());

        let verifier = Verifier::new(&cfg);
        let err = verifier.verify(&vote, 100, &provider).unwrap_err();
        assert!(matches!(err, VoteHandlerError::SignatureInvalid { .. }));
    }

    #[test]
    fn test_missing_quorum_rejected() {
        let cfg = HandlerConfig::default();
        let keys = KeyPair::generate();
        let vote = Vote::sign_checkpoint(96, Hash::zero(), 0, &keys);
        let provider = MockQuorums {
            quorums: RefCell::new(HashMap::new()),
        };

        let verifier = Verifier::new(&cfg);
        let err = verifier.verify(&vote, 100, &provider).unwrap_err();
        assert!(matches!(err, VoteHandlerError::InvalidBlockHeight { .. }));
    }
}
