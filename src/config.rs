//! Purpose: Validate the bridge's process configuration before startup.
//! Exports: `BridgeConfig`.
//! Role: Gate the core on a reachable-looking broker url and a mounted manifest.
//! Invariants: A missing manifest is fatal; nothing else at this layer is.

use std::path::PathBuf;

use ykbridge::core::error::{Error, ErrorKind};
use ykbridge::transport::broker::broker_addr;

#[derive(Clone, Debug)]
pub struct BridgeConfig {
    pub broker_url: String,
    pub manifest: PathBuf,
}

impl BridgeConfig {
    pub fn load(broker_url: String, manifest: PathBuf) -> Result<Self, Error> {
        broker_addr(&broker_url)?;
        if !manifest.exists() {
            return Err(Error::new(ErrorKind::NotFound)
                .with_message(format!("{} not found", manifest.display()))
                .with_hint(format!(
                    "Mount the platform manifest, e.g. -v /path/to/{0}:/app/{0}.",
                    manifest
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "root-manifest.json".to_string()),
                )));
        }
        Ok(Self {
            broker_url,
            manifest,
        })
    }
}
