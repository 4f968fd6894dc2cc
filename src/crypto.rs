//! Cryptographic primitives for Aetherium Nova
//!
//! Ed25519 detached signatures over the raw bytes of a hex digest. Keys and
//! signatures cross module boundaries as hex strings; the public key doubles
//! as the account identifier.

use crate::error::ChainError;
use ed25519_dalek::{
    Signature, Signer, SigningKey, Verifier, VerifyingKey, KEYPAIR_LENGTH, PUBLIC_KEY_LENGTH,
    SIGNATURE_LENGTH,
};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use std::fmt;

/// Hex-encoded public key; used as the account and validator identifier.
pub type Address = String;

/// Hex length of a public key (32 bytes).
pub const PUBLIC_KEY_HEX_LEN: usize = PUBLIC_KEY_LENGTH * 2;
/// Hex length of a secret key (64 bytes: seed followed by public key).
pub const SECRET_KEY_HEX_LEN: usize = KEYPAIR_LENGTH * 2;
/// Hex length of a signature (64 bytes).
pub const SIGNATURE_HEX_LEN: usize = SIGNATURE_LENGTH * 2;

/// The all-zero signature carried by the genesis sentinel.
pub fn zero_signature() -> String {
    "0".repeat(SIGNATURE_HEX_LEN)
}

/// Signing capability for one account or validator.
///
/// Held apart from the public account records so display code never needs it.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        KeyPair {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Draws a KeyPair from a caller-supplied CSPRNG, e.g. a seeded `StdRng`.
    pub fn from_rng<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        KeyPair {
            signing_key: SigningKey::generate(rng),
        }
    }

    /// Restores a KeyPair from its 64-byte hex secret key.
    ///
    /// The embedded public half must match the one derived from the seed.
    pub fn from_secret_hex(secret_key_hex: &str) -> Result<Self, ChainError> {
        let bytes = hex::decode(secret_key_hex)
            .map_err(|e| ChainError::CryptoError(format!("Invalid hex secret key: {}", e)))?;
        let bytes: [u8; KEYPAIR_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
            ChainError::CryptoError(format!(
                "Secret key must be {} bytes, got {}",
                KEYPAIR_LENGTH,
                bytes.len()
            ))
        })?;
        let signing_key = SigningKey::from_keypair_bytes(&bytes)
            .map_err(|e| ChainError::CryptoError(format!("Invalid secret key bytes: {}", e)))?;
        Ok(KeyPair { signing_key })
    }

    pub fn public_key_hex(&self) -> Address {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_keypair_bytes())
    }

    /// Signs the raw bytes behind a hex digest.
    pub fn sign_hash(&self, message_hash_hex: &str) -> Result<String, ChainError> {
        let message = hex::decode(message_hash_hex)
            .map_err(|e| ChainError::CryptoError(format!("Invalid hex message hash: {}", e)))?;
        Ok(hex::encode(self.signing_key.sign(&message).to_bytes()))
    }
}

/// Produces a fresh key pair.
pub fn generate_keypair() -> KeyPair {
    KeyPair::generate()
}

/// Signs `message_hash_hex` with a hex secret key and returns the hex signature.
pub fn sign(message_hash_hex: &str, secret_key_hex: &str) -> Result<String, ChainError> {
    KeyPair::from_secret_hex(secret_key_hex)?.sign_hash(message_hash_hex)
}

/// Checks a hex signature over the raw bytes of a hex digest.
///
/// Malformed hex, wrong lengths and invalid curve points all yield `false`.
pub fn verify(message_hash_hex: &str, signature_hex: &str, public_key_hex: &str) -> bool {
    verify_detached(message_hash_hex, signature_hex, public_key_hex).is_ok()
}

fn verify_detached(
    message_hash_hex: &str,
    signature_hex: &str,
    public_key_hex: &str,
) -> Result<(), ChainError> {
    let message = hex::decode(message_hash_hex)
        .map_err(|e| ChainError::CryptoError(format!("Invalid hex message hash: {}", e)))?;

    let mut public_key = [0u8; PUBLIC_KEY_LENGTH];
    hex::decode_to_slice(public_key_hex, &mut public_key)
        .map_err(|e| ChainError::CryptoError(format!("Invalid public key: {}", e)))?;
    let verifying_key = VerifyingKey::from_bytes(&public_key)
        .map_err(|e| ChainError::CryptoError(format!("Invalid public key: {}", e)))?;

    let mut signature = [0u8; SIGNATURE_LENGTH];
    hex::decode_to_slice(signature_hex, &mut signature)
        .map_err(|e| ChainError::CryptoError(format!("Invalid signature: {}", e)))?;
    let signature = Signature::from_bytes(&signature);

    verifying_key
        .verify(&message, &signature)
        .map_err(|_| ChainError::CryptoError("Signature verification failed".to_string()))
}
