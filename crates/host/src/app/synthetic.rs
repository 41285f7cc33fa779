use hellgate::embedded::{EmbeddedEngine, EngineError, ExitSink, InitFlags, PrintSink};
use hellgate::framebuffer::{FramebufferView, FRAME_BYTES, FRAME_WIDTH};
use hellgate::input_buffer::KeySink;
use hellgate::keys::DoomKey;
use hellgate::ChannelLayout;
use tracing::debug;

const MENU_DARKEN_SHIFT: u8 = 1;

/// Stand-in engine used when the native library is not linked. Renders a
/// scrolling test pattern, opens a "menu" (dimmed frame) on Escape, and
/// reports through the same print/exit sinks as the real binding.
pub(crate) struct SyntheticEngine {
    frame: Vec<u8>,
    tic: u64,
    menu_open: bool,
    held_keys: Vec<DoomKey>,
    flags: InitFlags,
    initialized: bool,
    print_sink: Option<PrintSink>,
    exit_sink: Option<ExitSink>,
}

impl SyntheticEngine {
    pub(crate) fn new() -> Self {
        Self {
            frame: vec![0; FRAME_BYTES],
            tic: 0,
            menu_open: true,
            held_keys: Vec::new(),
            flags: InitFlags::NONE,
            initialized: false,
            print_sink: None,
            exit_sink: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn tic(&self) -> u64 {
        self.tic
    }

    #[cfg(test)]
    pub(crate) fn menu_open(&self) -> bool {
        self.menu_open
    }

    fn print(&mut self, text: &str) {
        if let Some(sink) = self.print_sink.as_mut() {
            sink(text);
        }
    }

    fn step(&mut self) {
        self.tic = self.tic.wrapping_add(1);
        self.redraw();
    }

    fn redraw(&mut self) {
        let offset = self.tic as usize;
        let darken = self.menu_open && self.flags.contains(InitFlags::MENU_DARKEN_BG);
        let held = self.held_keys.len() as u8;
        for (index, pixel) in self.frame.chunks_exact_mut(4).enumerate() {
            let x = index % FRAME_WIDTH as usize;
            let y = index / FRAME_WIDTH as usize;
            let mut rgba = [
                ((x + offset) % 256) as u8,
                ((y * 2 + offset / 2) % 256) as u8,
                (((x ^ y) as u8) & 0xf0).wrapping_add(held.wrapping_mul(32)),
                255,
            ];
            if darken {
                for channel in &mut rgba[..3] {
                    *channel >>= MENU_DARKEN_SHIFT;
                }
            }
            pixel.copy_from_slice(&rgba);
        }
    }
}

impl KeySink for SyntheticEngine {
    fn key_down(&mut self, key: DoomKey) {
        debug!(key = key.code(), "synthetic_key_down");
        if key == DoomKey::Escape {
            self.menu_open = !self.menu_open;
        }
        if !self.held_keys.contains(&key) {
            self.held_keys.push(key);
        }
    }

    fn key_up(&mut self, key: DoomKey) {
        debug!(key = key.code(), "synthetic_key_up");
        self.held_keys.retain(|held| *held != key);
    }
}

impl EmbeddedEngine for SyntheticEngine {
    fn set_print_sink(&mut self, sink: PrintSink) {
        self.print_sink = Some(sink);
    }

    fn set_exit_sink(&mut self, sink: ExitSink) {
        self.exit_sink = Some(sink);
    }

    fn init(&mut self, args: &[String], flags: InitFlags) -> Result<(), EngineError> {
        if self.initialized {
            return Err(EngineError::Init("already initialized".to_string()));
        }
        self.flags = flags;
        self.print("synthetic engine v0.1\n");
        self.print(&format!("args: {}\nflags: {:#x}\n", args.join(" "), flags.bits()));
        self.print("framebuffer: 320x200 rgba\nready");
        self.initialized = true;
        self.redraw();
        Ok(())
    }

    fn set_resolution(&mut self, width: u32, height: u32) {
        // The pattern is always produced at the native size.
        debug!(width, height, "synthetic_resolution_ignored");
    }

    fn update(&mut self) {
        if self.initialized {
            self.step();
        }
    }

    fn force_update(&mut self) {
        if self.initialized {
            self.step();
        }
    }

    fn framebuffer(&mut self) -> Option<FramebufferView<'_>> {
        if !self.initialized {
            return None;
        }
        FramebufferView::new(&self.frame, ChannelLayout::Rgba).ok()
    }
}

impl Drop for SyntheticEngine {
    fn drop(&mut self) {
        if let Some(sink) = self.exit_sink.as_mut() {
            sink(0);
        }
    }
}
