use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::embedded::{combine_init_flags, InitFlag, InitFlags};
use crate::surface::{ColorMask, Rect};

/// Portrait placement of the overlay, as the plugin has always drawn it.
pub const DEFAULT_OVERLAY_RECT: Rect = Rect {
    x: 0,
    y: 0,
    width: 200,
    height: 320,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Command-line style arguments handed to the engine's init.
    pub engine_args: Vec<String>,
    pub init_flags: Vec<InitFlag>,
    pub overlay_rect: Rect,
    pub overlay_color_mask: ColorMask,
    /// Bridge commands executed once the first map has loaded.
    pub startup_commands: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            engine_args: Vec::new(),
            init_flags: vec![InitFlag::MenuDarkenBg],
            overlay_rect: DEFAULT_OVERLAY_RECT,
            overlay_color_mask: ColorMask::OPAQUE_WHITE,
            startup_commands: Vec::new(),
        }
    }
}

impl BridgeConfig {
    pub fn init_flags(&self) -> InitFlags {
        combine_init_flags(&self.init_flags)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {} at {field}: {source}", path.display())]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_json(&raw).map_err(|(field, source)| ConfigError::Parse {
        path: path.to_path_buf(),
        field,
        source,
    })
}

/// Parses `raw`, reporting the JSON path of the first failing field (`.` for
/// the document root).
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, (String, serde_json::Error)> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let field = error.path().to_string();
        (field, error.into_inner())
    })
}
