// blockchain-crypto/src/keypair.rs

use crate::{CryptoError, CryptoResult, Signature};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An Ed25519 public key
#[derive(Clone, Serialize, Deserialize)]
pub struct PublicKey {
    bytes: Vec<u8>,
}

impl PublicKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::DeserializationError(e.to_string()))?;
        Ok(Self::new(bytes))
    }

    /// Verify a signature against this key
    pub fn verify(&self, message: &[u8], signature: &Signature) -> CryptoResult<bool> {
        signature.verify(message, self)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}...)", hex::encode(&self.bytes[..8.min(self.bytes.len())]))
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for PublicKey {}

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

/// An Ed25519 secret key. Key material is zeroed on drop.
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl SecretKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::DeserializationError(e.to_string()))?;
        Ok(Self::new(bytes))
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.bytes.iter_mut().for_each(|b| *b = 0);
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}

/// A validator's signing identity: public key plus the secret key that controls it
pub struct KeyPair {
    public_key: PublicKey,
    secret_key: SecretKey,
}

impl KeyPair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        use ed25519_dalek::{SigningKey, VerifyingKey};
        use rand::rngs::OsRng;

        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let verifying_key: VerifyingKey = (&signing_key).into();

        Self {
            public_key: PublicKey::new(verifying_key.to_bytes().to_vec()),
            secret_key: SecretKey::new(signing_key.to_bytes().to_vec()),
        }
    }

    /// Construct a keypair from existing public/secret key material
    pub fn from_keys(public_key: PublicKey, secret_key: SecretKey) -> Self {
        Self { public_key, secret_key }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    /// Sign a message, producing an Ed25519 signature
    pub fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::{Signature as Ed25519Sig, Signer, SigningKey};

        let signing_key = SigningKey::from_bytes(
            self.secret_key
                .as_bytes()
                .try_into()
                .expect("secret key material is always 32 bytes"),
        );

        let signature: Ed25519Sig = signing_key.sign(message);
        Signature::new(signature.to_bytes().to_vec())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}
