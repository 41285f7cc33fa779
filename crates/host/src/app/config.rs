use std::path::{Path, PathBuf};
use std::time::Duration;

use hellgate::{load_json, BridgeConfig, ConfigError};
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV_VAR: &str = "HELLGATE_CONFIG";
pub const DEFAULT_SCREEN_PATH: &str = "ui\\hellgate\\screen";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextureConfig {
    /// Resource path the bridge looks the texture up by.
    pub path: String,
    pub width: u32,
    pub height: u32,
    /// Optional PNG decoded into the texture when it is realized.
    #[serde(default)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta_ms: u64,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval_ms: u64,
    /// Map announced through a map-load event right after startup.
    pub initial_map: String,
    pub textures: Vec<TextureConfig>,
    pub bridge: BridgeConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            window_title: "Hellgate Host".to_string(),
            window_width: 1280,
            window_height: 720,
            // Native tic rate of the embedded engine.
            target_tps: 35,
            max_frame_delta_ms: 250,
            max_ticks_per_frame: 5,
            metrics_log_interval_ms: 1000,
            initial_map: "levels\\hellgate\\lobby".to_string(),
            textures: vec![TextureConfig {
                path: DEFAULT_SCREEN_PATH.to_string(),
                width: hellgate::FRAME_WIDTH,
                height: hellgate::FRAME_HEIGHT,
                source: None,
            }],
            bridge: BridgeConfig {
                startup_commands: vec![
                    format!("set_screen_bitmap \"{DEFAULT_SCREEN_PATH}\""),
                    "render_on_screen true".to_string(),
                    "resume".to_string(),
                    "capture_input true".to_string(),
                ],
                ..BridgeConfig::default()
            },
        }
    }
}

impl HostConfig {
    pub fn max_frame_delta(&self) -> Duration {
        Duration::from_millis(self.max_frame_delta_ms)
    }

    pub fn metrics_log_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_log_interval_ms)
    }

    /// Reads the config file named by `HELLGATE_CONFIG`, or the defaults when
    /// the variable is unset or empty.
    pub fn load_from_env() -> Result<(Self, Option<PathBuf>), ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(raw) if !raw.is_empty() => {
                let path = PathBuf::from(raw);
                let config = Self::load_from_path(&path)?;
                Ok((config, Some(path)))
            }
            _ => Ok((Self::default(), None)),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = load_json(path)?;
        if let Some(base_dir) = path.parent() {
            config.resolve_sources_relative_to(base_dir);
        }
        Ok(config)
    }

    fn resolve_sources_relative_to(&mut self, base_dir: &Path) {
        for texture in &mut self.textures {
            if let Some(source) = texture.source.as_mut() {
                if source.is_relative() {
                    *source = base_dir.join(&*source);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use hellgate::config::parse_json;

    use super::*;

    #[test]
    fn defaults_declare_native_sized_screen_and_startup_script() {
        let config = HostConfig::default();

        assert_eq!(config.textures.len(), 1);
        assert_eq!(config.textures[0].path, DEFAULT_SCREEN_PATH);
        assert_eq!(
            (config.textures[0].width, config.textures[0].height),
            (320, 200)
        );
        assert_eq!(
            config.bridge.startup_commands[0],
            "set_screen_bitmap \"ui\\hellgate\\screen\""
        );
        assert_eq!(config.max_frame_delta(), Duration::from_millis(250));
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config: HostConfig =
            parse_json(r#"{"window_title": "demo", "target_tps": 70}"#).expect("parse");

        assert_eq!(config.window_title, "demo");
        assert_eq!(config.target_tps, 70);
        assert_eq!(config.textures, HostConfig::default().textures);
        assert_eq!(config.bridge, HostConfig::default().bridge);
    }

    #[test]
    fn texture_entries_require_dimensions() {
        let (field, _) =
            parse_json::<HostConfig>(r#"{"textures": [{"path": "ui\\a", "width": 320}]}"#)
                .expect_err("must fail");

        assert_eq!(field, "textures[0]");
    }

    #[test]
    fn relative_sources_resolve_against_config_dir() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("host.json");
        std::fs::write(
            &path,
            r#"{
                "textures": [
                    {"path": "ui\\a", "width": 4, "height": 4, "source": "art/a.png"},
                    {"path": "ui\\b", "width": 4, "height": 4, "source": "/abs/b.png"},
                    {"path": "ui\\c", "width": 4, "height": 4}
                ]
            }"#,
        )
        .expect("write");

        let config = HostConfig::load_from_path(&path).expect("load");

        assert_eq!(
            config.textures[0].source.as_deref(),
            Some(dir.path().join("art/a.png").as_path())
        );
        assert_eq!(
            config.textures[1].source.as_deref(),
            Some(Path::new("/abs/b.png"))
        );
        assert_eq!(config.textures[2].source, None);
    }
}
