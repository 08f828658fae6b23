//! SSH key secret type implementation.

use ed25519_dalek::pkcs8::EncodePrivateKey;
use rsa::pkcs8::LineEnding;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use ssh_key::public::{Ed25519PublicKey, KeyData, RsaPublicKey};
use ssh_key::{Mpint, PublicKey};
use toolbox_types::{Generator, KeyAlgorithm, Result, SecretKind, SecretRecord, ToolboxError};

use super::{PRIVATE_KEY_FIELD, PUBLIC_KEY_FIELD};

/// Modulus size of generated RSA keys.
pub const RSA_BITS: usize = 4096;

/// SSH keypair secret.
#[derive(Debug, Clone)]
pub struct SshSecret {
    algorithm: KeyAlgorithm,
}

impl SshSecret {
    /// Create a generator for `algorithm` keys.
    pub fn new(algorithm: KeyAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Algorithm of the generated keys.
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    fn ed25519() -> Result<(String, String)> {
        let key = SigningKey::generate(&mut OsRng);
        let private_pem = key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| ToolboxError::Generation(format!("Failed to encode private key: {}", e)))?;
        let public = ed25519_authorized_key(&key)?;
        Ok((private_pem.to_string(), public))
    }

    fn rsa() -> Result<(String, String)> {
        let key = RsaPrivateKey::new(&mut OsRng, RSA_BITS)
            .map_err(|e| ToolboxError::Generation(format!("Failed to generate RSA key: {}", e)))?;
        let private_pem = key
            .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
            .map_err(|e| ToolboxError::Generation(format!("Failed to encode private key: {}", e)))?;
        let public = rsa_authorized_key(&key)?;
        Ok((private_pem.to_string(), public))
    }
}

impl Generator for SshSecret {
    fn kind(&self) -> SecretKind {
        SecretKind::Ssh
    }

    fn generate(&self) -> Result<SecretRecord> {
        let (private_key, public_key) = match self.algorithm {
            KeyAlgorithm::Ed25519 => Self::ed25519()?,
            KeyAlgorithm::Rsa => Self::rsa()?,
        };

        let mut result = SecretRecord::new();
        result.insert(PRIVATE_KEY_FIELD.to_string(), private_key);
        result.insert(PUBLIC_KEY_FIELD.to_string(), public_key);
        Ok(result)
    }
}

fn ed25519_authorized_key(key: &SigningKey) -> Result<String> {
    let data = KeyData::Ed25519(Ed25519PublicKey(key.verifying_key().to_bytes()));
    authorized_key(data)
}

fn rsa_authorized_key(key: &RsaPrivateKey) -> Result<String> {
    let mpint = |bytes: Vec<u8>| {
        Mpint::from_positive_bytes(&bytes)
            .map_err(|e| ToolboxError::Generation(format!("Failed to encode RSA public key: {}", e)))
    };
    let data = KeyData::Rsa(RsaPublicKey {
        e: mpint(key.e().to_bytes_be())?,
        n: mpint(key.n().to_bytes_be())?,
    });
    authorized_key(data)
}

/// Render public key data as an `authorized_keys` line without a comment.
fn authorized_key(data: KeyData) -> Result<String> {
    PublicKey::new(data, "")
        .to_openssh()
        .map_err(|e| ToolboxError::Generation(format!("Failed to encode public key: {}", e)))
}
