// LogDigest - platform/secrets.rs
//
// Secret lookup behind a trait so credentials are injected rather than
// compiled in. Secret values are never logged.

use std::collections::HashMap;

/// Source of named secrets (e.g. the SMTP password).
pub trait SecretProvider {
    /// Return the secret called `name`, or `None` if it is unset or empty.
    fn secret(&self, name: &str) -> Option<String>;
}

/// Reads secrets from process environment variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretProvider;

impl SecretProvider for EnvSecretProvider {
    fn secret(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}

/// Fixed in-memory secrets, for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct StaticSecretProvider {
    values: HashMap<String, String>,
}

impl StaticSecretProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl SecretProvider for StaticSecretProvider {
    fn secret(&self, name: &str) -> Option<String> {
        self.values.get(name).filter(|v| !v.is_empty()).cloned()
    }
}
