// blockchain-crypto/src/signature.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// An Ed25519 signature
#[derive(Clone, Serialize, Deserialize)]
pub struct Signature {
    bytes: Vec<u8>,
}

impl Signature {
    /// Create a new signature from raw bytes
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

    pub fn from_hex(s: &str) -> Result<Self, crate::CryptoError> {
        let bytes = hex::decode(s)
            .map_err(|e| crate::CryptoError::DeserializationError(e.to_string()))?;
        Ok(Self::new(bytes))
    }

    /// Verify this signature is valid for the given message and public key
    pub fn verify(
        &self,
        message: &[u8],
        public_key: &crate::PublicKey,
    ) -> Result<bool, crate::CryptoError> {
        use ed25519_dalek::{Signature as Ed25519Sig, Verifier, VerifyingKey};

        let sig = Ed25519Sig::from_slice(&self.bytes)
            .map_err(|_| crate::CryptoError::InvalidSignature)?;

        let pk = VerifyingKey::from_bytes(
            public_key
                .as_bytes()
                .try_into()
                .map_err(|_| crate::CryptoError::InvalidPublicKey)?,
        )
        .map_err(|_| crate::CryptoError::InvalidPublicKey)?;

        Ok(pk.verify(message, &sig).is_ok())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Signature({}...)",
            hex::encode(&self.bytes[..8.min(self.bytes.len())])
        )
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Signature {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;

    #[test]
    fn test_signature_verifies_own_message() {
        let keypair = KeyPair::generate();
        let message = b"Test message";

        let signature = keypair.sign(message);
        assert!(signature.verify(message, keypair.public_key()).unwrap());
    }

    #[test]
    fn test_signature_rejects_tampered_message() {
        let keypair = KeyPair::generate();
        let signature = keypair.sign(b"Test message");

        assert!(!signature.verify(b"Wrong message", keypair.public_key()).unwrap());
    }

    #[test]
    fn test_signature_hex_roundtrip() {
        let keypair = KeyPair::generate();
        let sig = keypair.sign(b"Test");

        let parsed = Signature::from_hex(&sig.to_hex()).unwrap();
        assert_eq!(sig, parsed);
    }
}
