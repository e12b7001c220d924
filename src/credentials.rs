use std::{collections::HashMap, env};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("credential {0} is not set")]
    Missing(String),

    #[error("credential {0} is empty")]
    Empty(String),
}

/// Resolves secrets by name.
pub trait CredentialProvider: Send + Sync {
    fn get_credential(&self, name: &str) -> Result<String, CredentialError>;
}

/// Reads credentials from process environment variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentialProvider;

impl CredentialProvider for EnvCredentialProvider {
    fn get_credential(&self, name: &str) -> Result<String, CredentialError> {
        let value = env::var(name).map_err(|_| CredentialError::Missing(name.to_owned()))?;
        non_empty(name, value)
    }
}

/// Reads credentials from the `[credentials]` settings table and falls back
/// to another provider, the environment by default, for names the table does
/// not carry.
pub struct SettingsCredentialProvider {
    credentials: HashMap<String, String>,
    fallback: Box<dyn CredentialProvider>,
}

impl SettingsCredentialProvider {
    pub fn new(credentials: HashMap<String, String>) -> Self {
        Self {
            credentials,
            fallback: Box::new(EnvCredentialProvider),
        }
    }

    pub fn with_fallback(mut self, fallback: impl CredentialProvider + 'static) -> Self {
        self.fallback = Box::new(fallback);
        self
    }
}

impl Default for SettingsCredentialProvider {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

impl CredentialProvider for SettingsCredentialProvider {
    fn get_credential(&self, name: &str) -> Result<String, CredentialError> {
        let configured = self
            .credentials
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name));

        match configured {
            Some((_, value)) => non_empty(name, value.clone()),
            None => {
                log::warn!(
                    "Credential not found in settings, using fallback provider. [name = {}]",
                    name
                );
                self.fallback.get_credential(name)
            }
        }
    }
}

fn non_empty(name: &str, value: String) -> Result<String, CredentialError> {
    if value.trim().is_empty() {
        Err(CredentialError::Empty(name.to_owned()))
    } else {
        Ok(value)
    }
}
