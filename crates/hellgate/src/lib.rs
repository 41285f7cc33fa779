//! Embeds a PureDOOM engine instance in a host's tick, render and input
//! loop as a toggleable overlay surface.

pub mod commands;
pub mod config;
pub mod embedded;
pub mod frame_bridge;
pub mod framebuffer;
pub mod input_buffer;
pub mod keys;
pub mod plugin;
pub mod session;
pub mod surface;

#[cfg(test)]
mod test_support;

pub use commands::{BridgeCommand, CommandError, CommandRegistry};
pub use config::{load_json, BridgeConfig, ConfigError};
pub use embedded::{EmbeddedEngine, EngineError, InitFlags};
pub use framebuffer::{ChannelLayout, FramebufferView, FRAME_HEIGHT, FRAME_WIDTH};
pub use plugin::{
    BridgeStats, EventPriority, EventTime, Hellgate, HostEvent, HostEventKind, InputDevice,
};
pub use session::SessionState;
pub use surface::{ColorMask, Rect, SurfaceHost, SurfaceInfo, TextureHandle};
