use std::{env, net::SocketAddr};

use thiserror::Error;
use tracing::{info, warn};

use crate::identity::Identity;
use crate::video::MuxConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Identities allowed to create and delete courses. Empty means anyone
    /// with an identity may author.
    pub teacher_ids: Vec<String>,
    pub mux: Option<MuxConfig>,
}

impl Config {
    pub fn new_from_env() -> Result<Self, ConfigError> {
        let database_url = var_or("DATABASE_URL", "sqlite://coursecraft.db");

        let raw_addr = var_or("BIND_ADDR", "127.0.0.1:3000");
        let bind_addr = raw_addr.parse().map_err(|_| ConfigError::Invalid {
            key: "BIND_ADDR",
            value: raw_addr.clone(),
        })?;

        let teacher_ids = parse_teacher_ids(&env::var("TEACHER_IDS").unwrap_or_default());
        if teacher_ids.is_empty() {
            warn!("TEACHER_IDS not set, every identified user may author courses");
        }

        let mux = MuxConfig::new_from_env();
        if mux.is_none() {
            warn!("MUX_TOKEN_ID/MUX_TOKEN_SECRET not set, video assets will not be cleaned up");
        }

        Ok(Self {
            database_url,
            bind_addr,
            teacher_ids,
            mux,
        })
    }

    pub fn is_teacher(&self, identity: &Identity) -> bool {
        self.teacher_ids.is_empty() || self.teacher_ids.iter().any(|id| id == identity.user_id())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            teacher_ids: Vec::new(),
            mux: None,
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse_teacher_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_teacher_ids_skips_blanks() {
        assert_eq!(
            parse_teacher_ids(" user_a, ,user_b,"),
            vec!["user_a".to_string(), "user_b".to_string()]
        );
        assert!(parse_teacher_ids("").is_empty());
    }

    #[test]
    fn test_is_teacher_with_allowlist() {
        let config = Config {
            teacher_ids: vec!["user_a".to_string()],
            ..Config::default()
        };
        assert!(config.is_teacher(&Identity::new("user_a")));
        assert!(!config.is_teacher(&Identity::new("user_b")));
    }

    #[test]
    fn test_empty_allowlist_admits_everyone() {
        let config = Config::default();
        assert!(config.is_teacher(&Identity::new("anyone")));
    }
}
