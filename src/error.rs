#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("duplicate tool declaration: {0}")]
    DuplicateDeclaration(String),
    #[error("tool not declared in session config: {0}")]
    Undeclared(String),
}

/// Why a lookup did not produce a result. Carries the human-readable
/// message that ends up in the failure envelope sent back to the model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct LookupError(String);

impl LookupError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}
