use thiserror::Error;

pub const FRAME_WIDTH: u32 = 320;
pub const FRAME_HEIGHT: u32 = 200;
pub const FRAME_PIXELS: usize = FRAME_WIDTH as usize * FRAME_HEIGHT as usize;
pub const BYTES_PER_PIXEL: usize = 4;
pub const FRAME_BYTES: usize = FRAME_PIXELS * BYTES_PER_PIXEL;

/// Byte order of a four-channel pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelLayout {
    Rgba,
    Bgra,
}

impl ChannelLayout {
    /// Channel count requested from the engine for this layout.
    pub const fn channels(self) -> u8 {
        4
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramebufferError {
    #[error("framebuffer has {actual} bytes, expected {expected}")]
    SourceLength { expected: usize, actual: usize },
    #[error("destination has {actual} bytes, expected {expected}")]
    DestinationLength { expected: usize, actual: usize },
}

/// Borrowed, length-checked view over the engine's 320x200 framebuffer.
#[derive(Debug, Clone, Copy)]
pub struct FramebufferView<'a> {
    bytes: &'a [u8],
    layout: ChannelLayout,
}

impl<'a> FramebufferView<'a> {
    pub fn new(bytes: &'a [u8], layout: ChannelLayout) -> Result<Self, FramebufferError> {
        if bytes.len() != FRAME_BYTES {
            return Err(FramebufferError::SourceLength {
                expected: FRAME_BYTES,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes, layout })
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn pixel(&self, index: usize) -> Option<[u8; 4]> {
        let start = index.checked_mul(BYTES_PER_PIXEL)?;
        let end = start.checked_add(BYTES_PER_PIXEL)?;
        let chunk = self.bytes.get(start..end)?;
        Some([chunk[0], chunk[1], chunk[2], chunk[3]])
    }

    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + 'a {
        self.bytes
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|chunk| [chunk[0], chunk[1], chunk[2], chunk[3]])
    }

    /// Copies every pixel into `dst`, reordering channels to `dst_layout`.
    /// Alpha is copied straight; nothing is blended or resampled.
    pub fn copy_into(
        &self,
        dst: &mut [u8],
        dst_layout: ChannelLayout,
    ) -> Result<(), FramebufferError> {
        if dst.len() != FRAME_BYTES {
            return Err(FramebufferError::DestinationLength {
                expected: FRAME_BYTES,
                actual: dst.len(),
            });
        }

        if self.layout == dst_layout {
            dst.copy_from_slice(self.bytes);
            return Ok(());
        }

        for (out, [c0, c1, c2, alpha]) in dst
            .chunks_exact_mut(BYTES_PER_PIXEL)
            .zip(self.pixels())
        {
            out.copy_from_slice(&[c2, c1, c0, alpha]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterned_frame() -> Vec<u8> {
        (0..FRAME_BYTES).map(|i| (i * 7 % 251) as u8).collect()
    }

    #[test]
    fn rejects_wrong_source_length() {
        let short = vec![0u8; FRAME_BYTES - 4];
        assert_eq!(
            FramebufferView::new(&short, ChannelLayout::Rgba).unwrap_err(),
            FramebufferError::SourceLength {
                expected: FRAME_BYTES,
                actual: FRAME_BYTES - 4,
            }
        );
    }

    #[test]
    fn rgba_to_bgra_swaps_red_and_blue_for_every_pixel() {
        let src = patterned_frame();
        let view = FramebufferView::new(&src, ChannelLayout::Rgba).expect("view");
        let mut dst = vec![0u8; FRAME_BYTES];

        view.copy_into(&mut dst, ChannelLayout::Bgra).expect("copy");

        for p in 0..FRAME_PIXELS {
            let d = &dst[p * 4..p * 4 + 4];
            assert_eq!(
                d,
                &[src[p * 4 + 2], src[p * 4 + 1], src[p * 4], src[p * 4 + 3]],
                "pixel={p}"
            );
        }
    }

    #[test]
    fn matching_layout_copies_bytes_unchanged() {
        let src = patterned_frame();
        let view = FramebufferView::new(&src, ChannelLayout::Bgra).expect("view");
        let mut dst = vec![0u8; FRAME_BYTES];

        view.copy_into(&mut dst, ChannelLayout::Bgra).expect("copy");

        assert_eq!(dst, src);
    }

    #[test]
    fn destination_size_mismatch_writes_nothing() {
        let src = patterned_frame();
        let view = FramebufferView::new(&src, ChannelLayout::Rgba).expect("view");
        let mut dst = vec![9u8; 640 * 400 * 4];

        let result = view.copy_into(&mut dst, ChannelLayout::Bgra);

        assert!(matches!(
            result,
            Err(FramebufferError::DestinationLength { .. })
        ));
        assert!(dst.iter().all(|byte| *byte == 9));
    }

    #[test]
    fn pixel_accessor_is_bounds_checked() {
        let src = patterned_frame();
        let view = FramebufferView::new(&src, ChannelLayout::Rgba).expect("view");

        assert_eq!(view.pixel(1), Some([src[4], src[5], src[6], src[7]]));
        assert_eq!(view.pixel(FRAME_PIXELS), None);
        assert_eq!(view.pixel(usize::MAX), None);
        assert_eq!(view.pixels().count(), FRAME_PIXELS);
    }
}
