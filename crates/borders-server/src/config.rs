//! Server configuration from environment variables.

use borders_core::{AllegianceRules, RulesError};
use std::net::SocketAddr;
use thiserror::Error;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_RENDER_WORKERS: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error(transparent)]
    Rules(#[from] RulesError),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (`SERVER_ADDR`)
    pub addr: SocketAddr,
    /// Concurrent border renders (`BORDERS_RENDER_WORKERS`)
    pub render_workers: usize,
    /// Normalization table for loaded worlds (`BORDERS_ALLEGIANCE_RULES`)
    pub rules: AllegianceRules,
    /// Drop hole loops from extracted borders (`BORDERS_FILTER_HOLES`)
    pub filter_holes: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let invalid = |name: &'static str, value: &str| ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        };

        let addr_value = lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_ADDR.into());
        let addr: SocketAddr = addr_value
            .parse()
            .map_err(|_| invalid("SERVER_ADDR", &addr_value))?;

        let render_workers = match lookup("BORDERS_RENDER_WORKERS") {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => return Err(invalid("BORDERS_RENDER_WORKERS", &value)),
            },
            None => DEFAULT_RENDER_WORKERS,
        };

        let rules = match lookup("BORDERS_ALLEGIANCE_RULES") {
            Some(path) => AllegianceRules::load(&path)?,
            None => AllegianceRules::default(),
        };

        let filter_holes = match lookup("BORDERS_FILTER_HOLES") {
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return Err(invalid("BORDERS_FILTER_HOLES", &value)),
            },
            None => false,
        };

        Ok(Self {
            addr,
            render_workers,
            rules,
            filter_holes,
        })
    }
}
