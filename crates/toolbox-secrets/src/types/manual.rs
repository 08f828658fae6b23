//! Operator-supplied secret type implementation.

use std::fmt;
use std::sync::Arc;
use toolbox_types::{Generator, Prompt, Result, SecretKind, SecretPath, SecretRecord, ToolboxError};

use super::VALUE_FIELD;

/// Secret typed in by the operator at a masked prompt.
#[derive(Clone)]
pub struct ManualSecret {
    path: String,
    message: String,
    prompt: Arc<dyn Prompt>,
}

impl fmt::Debug for ManualSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualSecret")
            .field("path", &self.path)
            .field("message", &self.message)
            .finish()
    }
}

impl ManualSecret {
    /// Ask with `description`, or `Enter value for <path>` when absent.
    pub fn new(path: &SecretPath, description: Option<String>, prompt: Arc<dyn Prompt>) -> Self {
        let path = path.to_string();
        let message = description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("Enter value for {}", path));
        Self {
            path,
            message,
            prompt,
        }
    }

    /// Text shown to the operator.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Generator for ManualSecret {
    fn kind(&self) -> SecretKind {
        SecretKind::Manual
    }

    fn generate(&self) -> Result<SecretRecord> {
        let value = self.prompt.secret(&self.message)?;
        if value.is_empty() {
            return Err(ToolboxError::EmptyInput(self.path.clone()));
        }

        let mut result = SecretRecord::new();
        result.insert(VALUE_FIELD.to_string(), value);
        Ok(result)
    }
}
