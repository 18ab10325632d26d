// blockchain-crypto/src/hash.rs

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hash output size in bytes
pub const HASH_SIZE: usize = 32;

/// A 32-byte SHA-256 hash value
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Create a new hash from bytes
    pub fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create a hash from a slice (returns error if wrong length)
    pub fn from_slice(slice: &[u8]) -> Result<Self, crate::CryptoError> {
        if slice.len() != HASH_SIZE {
            return Err(crate::CryptoError::InvalidHash);
        }
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Get the hash as a byte slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the hash as a fixed-size array
    pub fn to_bytes(&self) -> [u8; HASH_SIZE] {
        self.0
    }

    /// Sentinel value for "no checkpoint yet" / unset fields
    pub fn zero() -> Self {
        Self([0u8; HASH_SIZE])
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self, crate::CryptoError> {
        let bytes = hex::decode(s)
            .map_err(|e| crate::CryptoError::DeserializationError(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Hash({}...{})",
            hex::encode(&self.0[..4]),
            hex::encode(&self.0[28..])
        )
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Default for Hash {
    fn default() -> Self {
        Self::zero()
    }
}

/// Trait for types that can be hashed into a domain digest
pub trait Hashable {
    fn hash(&self) -> Hash;
}

impl Hashable for [u8] {
    fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self);
        Hash::new(hasher.finalize().into())
    }
}

impl Hashable for Vec<u8> {
    fn hash(&self) -> Hash {
        self.as_slice().hash()
    }
}

impl Hashable for &str {
    fn hash(&self) -> Hash {
        self.as_bytes().hash()
    }
}

/// Double hash (hash of hash), used for the vote signing digest
pub fn double_hash(data: &[u8]) -> Hash {
    let first = data.hash();
    first.as_bytes().hash()
}
