// blockchain-crypto/src/lib.rs

//! Cryptographic primitives used by the checkpoint and service-node-state
//! vote handler.
//!
//! This crate provides:
//! - Hashing (SHA-256, plus a double-hash helper for vote signing digests)
//! - Ed25519 digital signatures
//! - Key pair generation and management

pub mod hash;
pub mod keypair;
pub mod signature;

pub use hash::{double_hash, Hash, Hashable};
pub use keypair::{KeyPair, PublicKey, SecretKey};
pub use signature::Signature;

/// Result type for cryptographic operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid secret key")]
    InvalidSecretKey,

    #[error("Invalid hash")]
    InvalidHash,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Random number generation failed")]
    RngError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_basics() {
        let keypair = KeyPair::generate();
        let message = b"Hello, blockchain!";
        let signature = keypair.sign(message);
        assert!(keypair.public_key().verify(message, &signature).unwrap());
    }
}
