use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use dirs_next::home_dir;
use remex_domain::PermissionPolicy;
use serde::{Deserialize, Serialize};

pub const STORE_PATH_ENV: &str = "REMEX_STORE_PATH";
pub const STORE_BACKEND_ENV: &str = "REMEX_STORE";
pub const PERMISSION_POLICY_ENV: &str = "REMEX_PERMISSION_POLICY";

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

impl StoreBackend {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocation {
    pub path: PathBuf,
    /// Where the path came from.
    pub source: &'static str,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub location: StoreLocation,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) store: StoreConfig,
    pub(crate) policy: PermissionPolicy,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    ///
    /// # Errors
    /// Returns an error if an environment value is invalid or the default
    /// store location cannot be resolved.
    pub fn from_env() -> Result<Self> {
        let snapshot = EnvSnapshot::capture();
        Self::from_snapshot(&snapshot)
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Result<Self> {
        let backend = match snapshot.var(STORE_BACKEND_ENV) {
            Some(value) => value
                .parse::<StoreBackend>()
                .map_err(|err| anyhow!(err))
                .with_context(|| format!("invalid {STORE_BACKEND_ENV}"))?,
            None => StoreBackend::default(),
        };
        let policy = match snapshot.var(PERMISSION_POLICY_ENV) {
            Some(value) => value
                .parse::<PermissionPolicy>()
                .map_err(|err| anyhow!(err))
                .with_context(|| format!("invalid {PERMISSION_POLICY_ENV}"))?,
            None => PermissionPolicy::default(),
        };
        let location = match snapshot.var(STORE_PATH_ENV) {
            Some(path) => StoreLocation {
                path: absolutize(PathBuf::from(path))?,
                source: STORE_PATH_ENV,
            },
            None => default_location()?,
        };
        Ok(Self {
            store: StoreConfig { backend, location },
            policy,
        })
    }

    /// Point the store at `path`, taking precedence over the environment.
    ///
    /// # Errors
    /// Returns an error if a relative path cannot be resolved.
    pub fn with_store_path(mut self, path: PathBuf) -> Result<Self> {
        self.store.location = StoreLocation {
            path: absolutize(path)?,
            source: "--store",
        };
        Ok(self)
    }

    #[must_use]
    pub fn store(&self) -> &StoreConfig {
        &self.store
    }

    #[must_use]
    pub fn policy(&self) -> PermissionPolicy {
        self.policy
    }
}

fn default_location() -> Result<StoreLocation> {
    let home = home_dir().ok_or_else(|| anyhow!("home directory not found"))?;
    Ok(StoreLocation {
        path: home.join(".remex").join("store"),
        source: "default",
    })
}

fn absolutize(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(env::current_dir()
            .with_context(|| format!("failed to resolve {STORE_PATH_ENV}"))?
            .join(path))
    }
}
