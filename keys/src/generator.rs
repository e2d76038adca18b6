//! secp256k1 keypair generation.
//!
//! The curve context is built by the caller and owned by the generator, so there is
//! no process-wide curve state and tests can pair it with a seeded RNG.

use std::fmt;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use secp256k1::{PublicKey, Secp256k1, SecretKey, SignOnly};

use crate::error::KeyError;

/// Length of a serialized secp256k1 secret scalar.
pub const PRIVATE_KEY_LENGTH: usize = 32;

/// Length of a compressed secp256k1 public key.
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// A node's consensus identity, both halves lowercase hex.
///
/// The public key is the compressed SEC1 point (33 bytes, `02`/`03` prefix).
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    public_key: String,
    private_key: String,
}

impl KeyPair {
    fn from_secret(curve: &Secp256k1<SignOnly>, secret: &SecretKey) -> Self {
        let public = PublicKey::from_secret_key(curve, secret);
        Self {
            public_key: hex::encode(public.serialize()),
            private_key: hex::encode(secret.secret_bytes()),
        }
    }

    /// Rebuild a pair from a hex-encoded private key, recomputing the public half.
    pub fn from_private_hex(curve: &Secp256k1<SignOnly>, private_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(private_key)
            .map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))?;
        let secret = SecretKey::from_slice(&bytes)
            .map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_secret(curve, &secret))
    }

    /// Compressed public key, lowercase hex.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Private scalar, lowercase hex.
    pub fn private_key(&self) -> &str {
        &self.private_key
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Generates independent secp256k1 keypairs.
///
/// Each call to [`generate`](Self::generate) draws fresh randomness; nothing is
/// derived from a shared seed, so no two nodes can end up with related keys.
pub struct KeyGenerator<R> {
    curve: Secp256k1<SignOnly>,
    rng: R,
}

impl KeyGenerator<OsRng> {
    /// Generator backed by the operating system's entropy source.
    pub fn from_os_rng() -> Self {
        Self::new(Secp256k1::signing_only(), OsRng)
    }
}

impl<R: RngCore + CryptoRng> KeyGenerator<R> {
    /// Create a generator from an explicit curve context and randomness source.
    pub fn new(curve: Secp256k1<SignOnly>, rng: R) -> Self {
        Self { curve, rng }
    }

    /// The curve context used to derive public keys.
    pub fn curve(&self) -> &Secp256k1<SignOnly> {
        &self.curve
    }

    /// Generate a new keypair.
    ///
    /// Fails only if the randomness source fails. Candidates outside the curve
    /// order (probability ~2^-128) are redrawn.
    pub fn generate(&mut self) -> Result<KeyPair, KeyError> {
        let mut bytes = [0u8; PRIVATE_KEY_LENGTH];
        loop {
            self.rng.try_fill_bytes(&mut bytes)?;
            if let Ok(secret) = SecretKey::from_slice(&bytes) {
                return Ok(KeyPair::from_secret(&self.curve, &secret));
            }
        }
    }
}
