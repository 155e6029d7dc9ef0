use dashmap::DashMap;
use std::env;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

/// Selects development or production behaviour (`development` / anything else).
pub const ENV_KEY: &str = "ARBOR_ENV";
/// Default mount root when the builder is not given one.
pub const ROOT_KEY: &str = "ARBOR_ROOT";

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Seeded from the process environment.
    pub fn new() -> Self {
        let service = Self::empty();
        for (key, value) in env::vars_os() {
            if let (Some(key), Some(value)) = (key.to_str(), value.to_str()) {
                service.set(key, value);
            }
        }
        service
    }

    /// A service that ignores the process environment.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    pub fn environment(&self) -> Environment {
        self.get(ENV_KEY)
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    pub fn root_path(&self) -> Option<String> {
        self.get(ROOT_KEY)
    }
}

/// Runtime mode. Development exposes error details and index pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}
