//! Client config loader (strict parsing).

pub mod schema;

use std::fs;

use dycast_core::error::{DyCastError, Result};

pub use schema::{DyCastConfig, RoomSection, SessionSection};

pub fn load_from_file(path: &str) -> Result<DyCastConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| DyCastError::BadConfig(format!("read {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<DyCastConfig> {
    let cfg: DyCastConfig = serde_yaml::from_str(s)
        .map_err(|e| DyCastError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
