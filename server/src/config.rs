//! Server configuration loaded from YAML.
//!
//! Every field is optional. Without a config file the service listens on `0.0.0.0:8000` and
//! accepts batches of any size.

use std::{net::SocketAddr, num::NonZeroUsize, path::Path};

use anyhow::Context;
use serde::Deserialize;

use crate::model::BatchLimits;

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
/// Top-level server configuration.
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    /// Address the server listens on.
    pub listen_addr: SocketAddr,

    #[serde(default)]
    /// Maximum accepted request body size. Larger bodies are rejected with 400.
    pub max_body_bytes: Option<NonZeroUsize>,

    #[serde(default)]
    /// Maximum number of sub-arrays per request.
    pub max_batch_len: Option<NonZeroUsize>,

    #[serde(default)]
    /// Maximum number of integers in any single sub-array.
    pub max_sub_array_len: Option<NonZeroUsize>,

    #[serde(default)]
    /// Maximum number of sort workers running at once for one `/process-concurrent` request.
    pub max_parallel_workers: Option<NonZeroUsize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_body_bytes: None,
            max_batch_len: None,
            max_sub_array_len: None,
            max_parallel_workers: None,
        }
    }
}

impl ServerConfig {
    /// Parse a YAML server config from bytes.
    pub fn from_yaml_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_slice(bytes)?)
    }

    /// Read and parse a YAML config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read config {}", path.display()))?;
        Self::from_yaml_bytes(&bytes).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn batch_limits(&self) -> BatchLimits {
        BatchLimits {
            max_batch_len: self.max_batch_len.map(NonZeroUsize::get),
            max_sub_array_len: self.max_sub_array_len.map(NonZeroUsize::get),
        }
    }
}
