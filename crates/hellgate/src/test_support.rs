use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::embedded::{EmbeddedEngine, EngineError, ExitSink, InitFlags, PrintSink};
use crate::framebuffer::{ChannelLayout, FramebufferView, FRAME_BYTES};
use crate::input_buffer::KeySink;
use crate::keys::DoomKey;
use crate::surface::{ColorMask, Rect, SurfaceError, SurfaceHost, SurfaceInfo, TextureHandle};

/// Every boundary call made by the bridge, engine and host sides interleaved
/// in one log so ordering across both can be asserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Init(Vec<String>, u32),
    SetResolution(u32, u32),
    Update,
    ForceUpdate,
    KeyDown(DoomKey),
    KeyUp(DoomKey),
    Lookup(String),
    Materialize(String),
    Write(TextureHandle),
    Draw(TextureHandle, Rect, ColorMask),
}

pub(crate) type CallLog = Rc<RefCell<Vec<Call>>>;

pub(crate) fn new_call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub(crate) struct RecordingEngine {
    log: CallLog,
    frame: Vec<u8>,
    print_sink: Option<PrintSink>,
    exit_sink: Option<ExitSink>,
    fail_init: bool,
}

impl RecordingEngine {
    pub(crate) fn new(log: CallLog) -> Self {
        // Distinct value in every channel so a swap or offset shows up.
        let frame = (0..FRAME_BYTES)
            .map(|index| (index.wrapping_mul(31) % 251) as u8)
            .collect();
        Self {
            log,
            frame,
            print_sink: None,
            exit_sink: None,
            fail_init: false,
        }
    }

    pub(crate) fn failing_init(log: CallLog) -> Self {
        Self {
            fail_init: true,
            ..Self::new(log)
        }
    }

    pub(crate) fn frame_bytes(&self) -> &[u8] {
        &self.frame
    }

    pub(crate) fn has_sinks(&self) -> bool {
        self.print_sink.is_some() && self.exit_sink.is_some()
    }

    pub(crate) fn print(&mut self, text: &str) {
        if let Some(sink) = self.print_sink.as_mut() {
            sink(text);
        }
    }

    pub(crate) fn exit(&mut self, code: i32) {
        if let Some(sink) = self.exit_sink.as_mut() {
            sink(code);
        }
    }
}

impl KeySink for RecordingEngine {
    fn key_down(&mut self, key: DoomKey) {
        self.log.borrow_mut().push(Call::KeyDown(key));
    }

    fn key_up(&mut self, key: DoomKey) {
        self.log.borrow_mut().push(Call::KeyUp(key));
    }
}

impl EmbeddedEngine for RecordingEngine {
    fn set_print_sink(&mut self, sink: PrintSink) {
        self.print_sink = Some(sink);
    }

    fn set_exit_sink(&mut self, sink: ExitSink) {
        self.exit_sink = Some(sink);
    }

    fn init(&mut self, args: &[String], flags: InitFlags) -> Result<(), EngineError> {
        self.log
            .borrow_mut()
            .push(Call::Init(args.to_vec(), flags.bits()));
        if self.fail_init {
            return Err(EngineError::Init("no IWAD found".to_string()));
        }
        Ok(())
    }

    fn set_resolution(&mut self, width: u32, height: u32) {
        self.log
            .borrow_mut()
            .push(Call::SetResolution(width, height));
    }

    fn update(&mut self) {
        self.log.borrow_mut().push(Call::Update);
    }

    fn force_update(&mut self) {
        self.log.borrow_mut().push(Call::ForceUpdate);
    }

    fn framebuffer(&mut self) -> Option<FramebufferView<'_>> {
        FramebufferView::new(&self.frame, ChannelLayout::Rgba).ok()
    }
}

struct FakeSurface {
    width: u32,
    height: u32,
    layout: ChannelLayout,
    texture: Option<TextureHandle>,
}

#[derive(Default)]
pub(crate) struct FakeSurfaceHost {
    log: CallLog,
    surfaces: HashMap<String, FakeSurface>,
    textures: HashMap<TextureHandle, Vec<u8>>,
    next_handle: u32,
}

impl FakeSurfaceHost {
    pub(crate) fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub(crate) fn add_surface(
        &mut self,
        path: &str,
        width: u32,
        height: u32,
        layout: ChannelLayout,
        realized: bool,
    ) {
        self.surfaces.insert(
            path.to_string(),
            FakeSurface {
                width,
                height,
                layout,
                texture: None,
            },
        );
        if realized {
            self.realize(path);
        }
    }

    pub(crate) fn pixels(&self, path: &str) -> Option<&[u8]> {
        let texture = self.surfaces.get(path)?.texture?;
        self.textures.get(&texture).map(Vec::as_slice)
    }

    fn realize(&mut self, path: &str) {
        let Some(surface) = self.surfaces.get_mut(path) else {
            return;
        };
        if surface.texture.is_some() {
            return;
        }
        self.next_handle += 1;
        let handle = TextureHandle(self.next_handle);
        let len = surface.width as usize * surface.height as usize * 4;
        surface.texture = Some(handle);
        self.textures.insert(handle, vec![0; len]);
    }
}

impl SurfaceHost for FakeSurfaceHost {
    fn lookup_surface(&self, path: &str) -> Option<SurfaceInfo> {
        self.log.borrow_mut().push(Call::Lookup(path.to_string()));
        self.surfaces.get(path).map(|surface| SurfaceInfo {
            width: surface.width,
            height: surface.height,
            layout: surface.layout,
            texture: surface.texture,
        })
    }

    fn materialize_texture(&mut self, path: &str) {
        self.log
            .borrow_mut()
            .push(Call::Materialize(path.to_string()));
        self.realize(path);
    }

    fn write_texture(
        &mut self,
        texture: TextureHandle,
        write: &mut dyn FnMut(&mut [u8]),
    ) -> Result<(), SurfaceError> {
        self.log.borrow_mut().push(Call::Write(texture));
        let pixels = self
            .textures
            .get_mut(&texture)
            .ok_or(SurfaceError::UnknownTexture(texture))?;
        write(pixels);
        Ok(())
    }

    fn draw_texture(&mut self, texture: TextureHandle, dest: Rect, mask: ColorMask) {
        self.log
            .borrow_mut()
            .push(Call::Draw(texture, dest, mask));
    }
}
