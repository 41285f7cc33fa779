use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::framebuffer::ChannelLayout;

/// Opaque handle to a realized host texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Host metadata for an image resource looked up by path. The bridge never
/// owns the resource; `texture` is `None` until the host realizes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceInfo {
    pub width: u32,
    pub height: u32,
    pub layout: ChannelLayout,
    pub texture: Option<TextureHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Per-channel multiplier applied by the host when drawing; 255 leaves a
/// channel untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorMask {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorMask {
    pub const OPAQUE_WHITE: Self = Self {
        a: 255,
        r: 255,
        g: 255,
        b: 255,
    };
}

impl Default for ColorMask {
    fn default() -> Self {
        Self::OPAQUE_WHITE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("unknown texture handle {0:?}")]
    UnknownTexture(TextureHandle),
}

/// The slice of the host the frame bridge talks to: resource lookup, texture
/// realization, scoped pixel writes and the UI draw primitive.
pub trait SurfaceHost {
    fn lookup_surface(&self, path: &str) -> Option<SurfaceInfo>;

    /// Asks the host to (re)create the backing texture for `path`. The
    /// texture may only become available on a later frame.
    fn materialize_texture(&mut self, path: &str);

    /// Runs `write` with exclusive access to the texture's pixel storage. The
    /// host's renderer cannot read the texture until `write` returns.
    fn write_texture(
        &mut self,
        texture: TextureHandle,
        write: &mut dyn FnMut(&mut [u8]),
    ) -> Result<(), SurfaceError>;

    fn draw_texture(&mut self, texture: TextureHandle, dest: Rect, mask: ColorMask);
}
