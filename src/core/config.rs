

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::{EnumString, IntoStaticStr};

use super::error::Result;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeploymentMode {
    /// Only the target and its parent are affected.
    Managed,
    /// Full reference-aware ancestor cleanup.
    #[default]
    Interactive,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PurgeConfig {
    pub mode: DeploymentMode,
    pub collapse_empty_parents: bool,
    pub locked_objects_key: String,
    pub permission_title: String,
    pub permission_body: String,
    pub log_filter: String,
}

impl PurgeConfig {
    pub fn new(mode: DeploymentMode) -> Self {
        Self {
            mode,
            collapse_empty_parents: true,
            locked_objects_key: crate::LOCKED_OBJECTS_KEY.to_string(),
            permission_title: "Permission issues".to_string(),
            permission_body: "You are missing the permissions needed to release the affected elements."
                .to_string(),
            log_filter: "content_purge=info".to_string(),
        }
    }

    pub fn managed() -> Self {
        Self::new(DeploymentMode::Managed)
    }

    pub fn interactive() -> Self {
        Self::new(DeploymentMode::Interactive)
    }

    /// Defaults, then the optional file at `path`, then `PURGE_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let settings = builder
            .add_source(Environment::with_prefix("PURGE").try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Defaults overridden by `PURGE_*` variables only.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self::new(DeploymentMode::default())
    }
}
