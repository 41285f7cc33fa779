use std::sync::Arc;

use hellgate::{ColorMask, Rect};
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::debug;
use winit::window::Window;

use super::textures::{DrawRequest, TexturePixels, TextureStore};

const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];

/// Window-sized RGBA UI layer. Each frame is cleared, then every queued
/// texture draw is composited in order.
pub(crate) struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    width: u32,
    height: u32,
}

impl Renderer {
    pub(crate) fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            width: size.width,
            height: size.height,
        })
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render(&mut self, draws: &[DrawRequest], store: &TextureStore) -> Result<(), Error> {
        let (width, height) = (self.width, self.height);
        let frame = self.pixels.frame_mut();
        for pixel in frame.chunks_exact_mut(4) {
            pixel.copy_from_slice(&CLEAR_COLOR);
        }

        for draw in draws {
            let drawn = store.with_pixels(draw.texture, |texture| {
                blit_bgra_scaled(frame, width, height, texture, draw.dest, draw.mask);
            });
            if drawn.is_none() {
                debug!(texture = draw.texture.0, "renderer_texture_missing");
            }
        }

        self.pixels.render()
    }
}

/// Nearest-neighbor scales a BGRA texture into `dest` on an RGBA frame,
/// clipped to the frame. Each channel is multiplied by the mask; the result
/// is alpha-blended over what is already there.
pub(crate) fn blit_bgra_scaled(
    frame: &mut [u8],
    width: u32,
    height: u32,
    texture: &TexturePixels,
    dest: Rect,
    mask: ColorMask,
) {
    if texture.width == 0 || texture.height == 0 || dest.width == 0 || dest.height == 0 {
        return;
    }
    let expected_len = texture.width as usize * texture.height as usize * 4;
    if texture.bgra.len() < expected_len || frame.len() < width as usize * height as usize * 4 {
        return;
    }

    let left = i64::from(dest.x);
    let top = i64::from(dest.y);
    let right = left + i64::from(dest.width);
    let bottom = top + i64::from(dest.height);

    let draw_left = left.max(0);
    let draw_top = top.max(0);
    let draw_right = right.min(i64::from(width));
    let draw_bottom = bottom.min(i64::from(height));
    if draw_left >= draw_right || draw_top >= draw_bottom {
        return;
    }

    let scale_x = f64::from(texture.width) / f64::from(dest.width);
    let scale_y = f64::from(texture.height) / f64::from(dest.height);
    let frame_width = width as usize;
    let texture_width = texture.width as usize;

    for out_y in draw_top..draw_bottom {
        let dy = (out_y - top) as f64;
        let src_y = ((dy * scale_y).floor() as u32).min(texture.height - 1) as usize;
        let src_row_offset = src_y * texture_width * 4;
        let dst_row_offset = out_y as usize * frame_width * 4;

        for out_x in draw_left..draw_right {
            let dx = (out_x - left) as f64;
            let src_x = ((dx * scale_x).floor() as u32).min(texture.width - 1) as usize;
            let src = &texture.bgra[src_row_offset + src_x * 4..src_row_offset + src_x * 4 + 4];
            let rgba = [
                modulate(src[2], mask.r),
                modulate(src[1], mask.g),
                modulate(src[0], mask.b),
                modulate(src[3], mask.a),
            ];
            let dst_offset = dst_row_offset + out_x as usize * 4;
            blend_over(&mut frame[dst_offset..dst_offset + 4], rgba);
        }
    }
}

fn modulate(channel: u8, mask: u8) -> u8 {
    ((u16::from(channel) * u16::from(mask) + 127) / 255) as u8
}

fn blend_over(dst: &mut [u8], src: [u8; 4]) {
    match src[3] {
        0 => {}
        255 => dst.copy_from_slice(&src),
        alpha => {
            let alpha = u16::from(alpha);
            for channel in 0..3 {
                let blended =
                    (u16::from(src[channel]) * alpha + u16::from(dst[channel]) * (255 - alpha) + 127)
                        / 255;
                dst[channel] = blended as u8;
            }
            dst[3] = 255;
        }
    }
}
