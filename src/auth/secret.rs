//! Signing secret sources

use crate::{config::SecurityConfig, error::AppError};
use secrecy::{ExposeSecret, Secret};

/// Supplies the token signing secret once at startup.
pub trait SecretProvider: Send + Sync {
    fn signing_secret(&self) -> Result<Secret<String>, AppError>;
}

/// Secret loaded through the regular config layer (`AUTH_SECURITY__JWT_SECRET`)
impl SecretProvider for SecurityConfig {
    fn signing_secret(&self) -> Result<Secret<String>, AppError> {
        Ok(Secret::new(self.jwt_secret.expose_secret().clone()))
    }
}

/// A secret that is already in hand
impl SecretProvider for Secret<String> {
    fn signing_secret(&self) -> Result<Secret<String>, AppError> {
        Ok(Secret::new(self.expose_secret().clone()))
    }
}

/// Secret read from a single environment variable, for deployments that inject
/// it from a secret store separately from the rest of the config
pub struct EnvSecretProvider {
    var: String,
}

impl EnvSecretProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl SecretProvider for EnvSecretProvider {
    fn signing_secret(&self) -> Result<Secret<String>, AppError> {
        std::env::var(&self.var)
            .map(Secret::new)
            .map_err(|_| AppError::Config(format!("Signing secret variable {} is not set", self.var)))
    }
}
