//! Runtime configuration: defaults overridable from the environment.

use std::net::SocketAddr;

use thiserror::Error;

pub const BIND_ADDR_VAR: &str = "LEDGER_BIND_ADDR";
pub const PASSPHRASE_VAR: &str = "LEDGER_DISPLAY_PASSPHRASE";

const DEFAULT_PASSPHRASE: &str = "clave_secreta";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var}: {value:?}")]
    InvalidAddr { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Passphrase for sealing buyer ids in responses.
    pub display_passphrase: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            display_passphrase: DEFAULT_PASSPHRASE.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Some(value) = lookup(BIND_ADDR_VAR) {
            cfg.bind_addr = value.parse().map_err(|_| ConfigError::InvalidAddr {
                var: BIND_ADDR_VAR,
                value,
            })?;
        }
        if let Some(passphrase) = lookup(PASSPHRASE_VAR).filter(|p| !p.is_empty()) {
            cfg.display_passphrase = passphrase;
        }
        Ok(cfg)
    }
}
