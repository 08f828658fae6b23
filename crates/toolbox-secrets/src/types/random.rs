//! Random alphanumeric secret type implementation.

use rand::rngs::OsRng;
use rand::RngCore;
use toolbox_types::{Generator, Result, SecretKind, SecretRecord, ToolboxError};

use super::VALUE_FIELD;

/// Characters random values are drawn from.
pub const ALPHABET: &[u8; 62] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length used when the entry gives none, or gives 0.
pub const DEFAULT_LENGTH: usize = 32;

/// Random alphanumeric string.
///
/// Each byte from the OS generator is reduced modulo 62, so the first
/// eight characters of the alphabet are slightly more likely than the
/// rest.
#[derive(Debug, Clone)]
pub struct RandomSecret {
    length: usize,
}

impl RandomSecret {
    /// Create a generator producing `length` characters.
    ///
    /// A missing or zero length means [`DEFAULT_LENGTH`].
    pub fn new(length: Option<usize>) -> Self {
        let length = match length {
            None | Some(0) => DEFAULT_LENGTH,
            Some(n) => n,
        };
        Self { length }
    }

    /// Number of characters produced.
    pub fn length(&self) -> usize {
        self.length
    }

    fn random_string(&self) -> Result<String> {
        let mut bytes = vec![0u8; self.length];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| ToolboxError::Generation(format!("read OS random source: {}", e)))?;

        Ok(bytes
            .into_iter()
            .map(|b| ALPHABET[usize::from(b) % ALPHABET.len()] as char)
            .collect())
    }
}

impl Generator for RandomSecret {
    fn kind(&self) -> SecretKind {
        SecretKind::Random
    }

    fn generate(&self) -> Result<SecretRecord> {
        let mut result = SecretRecord::new();
        result.insert(VALUE_FIELD.to_string(), self.random_string()?);
        Ok(result)
    }
}
