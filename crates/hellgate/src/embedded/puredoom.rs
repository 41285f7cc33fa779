use std::ffi::{c_char, c_int, c_uchar, CStr, CString};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::info;

use super::{EmbeddedEngine, EngineError, ExitSink, InitFlags, PrintSink};
use crate::framebuffer::{ChannelLayout, FramebufferView, FRAME_BYTES};
use crate::input_buffer::KeySink;
use crate::keys::DoomKey;

#[link(name = "PureDOOM")]
extern "C" {
    fn doom_set_print(print_fn: extern "C" fn(*const c_char));
    fn doom_set_exit(exit_fn: extern "C" fn(c_int));
    fn doom_init(argc: c_int, argv: *mut *mut c_char, flags: c_int);
    fn doom_set_resolution(width: c_int, height: c_int);
    fn doom_update();
    fn doom_force_update();
    fn doom_get_framebuffer(channels: c_int) -> *const c_uchar;
    fn doom_key_down(key: c_int);
    fn doom_key_up(key: c_int);
}

// The native callbacks carry no user data, so the installed sinks live in
// process-wide slots. Only one `PureDoom` can exist.
static PRINT_SINK: Mutex<Option<PrintSink>> = Mutex::new(None);
static EXIT_SINK: Mutex<Option<ExitSink>> = Mutex::new(None);
static INSTANCE_ACQUIRED: AtomicBool = AtomicBool::new(false);

extern "C" fn print_trampoline(message: *const c_char) {
    if message.is_null() {
        return;
    }
    // SAFETY: the engine hands us a NUL-terminated string that stays valid
    // for the duration of the callback.
    let text = unsafe { CStr::from_ptr(message) }.to_string_lossy();
    let mut slot = PRINT_SINK.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(sink) = slot.as_mut() {
        sink(&text);
    }
}

extern "C" fn exit_trampoline(code: c_int) {
    let mut slot = EXIT_SINK.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(sink) = slot.as_mut() {
        sink(code);
    }
}

/// Binding to the native PureDOOM library.
pub struct PureDoom {
    // The engine keeps pointers into argv after init.
    args: Vec<CString>,
    argv: Vec<*mut c_char>,
    initialized: bool,
    _main_thread_only: PhantomData<*const ()>,
}

impl PureDoom {
    pub fn acquire() -> Result<Self, EngineError> {
        if INSTANCE_ACQUIRED.swap(true, Ordering::AcqRel) {
            return Err(EngineError::AlreadyAcquired);
        }
        Ok(Self {
            args: Vec::new(),
            argv: Vec::new(),
            initialized: false,
            _main_thread_only: PhantomData,
        })
    }
}

impl KeySink for PureDoom {
    fn key_down(&mut self, key: DoomKey) {
        // SAFETY: plain value call into the initialized engine.
        unsafe { doom_key_down(key.code()) }
    }

    fn key_up(&mut self, key: DoomKey) {
        // SAFETY: plain value call into the initialized engine.
        unsafe { doom_key_up(key.code()) }
    }
}

impl EmbeddedEngine for PureDoom {
    fn set_print_sink(&mut self, sink: PrintSink) {
        *PRINT_SINK.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);
        // SAFETY: the trampoline is a valid `extern "C"` fn for the process lifetime.
        unsafe { doom_set_print(print_trampoline) }
    }

    fn set_exit_sink(&mut self, sink: ExitSink) {
        *EXIT_SINK.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);
        // SAFETY: the trampoline is a valid `extern "C"` fn for the process lifetime.
        unsafe { doom_set_exit(exit_trampoline) }
    }

    fn init(&mut self, args: &[String], flags: InitFlags) -> Result<(), EngineError> {
        if self.initialized {
            return Err(EngineError::Init("already initialized".to_string()));
        }
        self.args = args
            .iter()
            .map(|arg| {
                CString::new(arg.as_str()).map_err(|_| EngineError::InvalidArgument(arg.clone()))
            })
            .collect::<Result<_, _>>()?;
        self.argv = self
            .args
            .iter()
            .map(|arg| arg.as_ptr().cast_mut())
            .collect();
        self.argv.push(std::ptr::null_mut());

        let argc = c_int::try_from(self.args.len())
            .map_err(|_| EngineError::Init("too many arguments".to_string()))?;
        let argv = if self.args.is_empty() {
            std::ptr::null_mut()
        } else {
            self.argv.as_mut_ptr()
        };
        info!(argc, flags = flags.bits(), "doom_init");
        // SAFETY: `argv` points into `self.argv`/`self.args`, both kept alive
        // for the lifetime of `self`.
        unsafe { doom_init(argc, argv, flags.bits() as c_int) };
        self.initialized = true;
        Ok(())
    }

    fn set_resolution(&mut self, width: u32, height: u32) {
        let width = c_int::try_from(width).unwrap_or(c_int::MAX);
        let height = c_int::try_from(height).unwrap_or(c_int::MAX);
        // SAFETY: plain value call.
        unsafe { doom_set_resolution(width, height) }
    }

    fn update(&mut self) {
        // SAFETY: plain call into the initialized engine.
        unsafe { doom_update() }
    }

    fn force_update(&mut self) {
        // SAFETY: plain call into the initialized engine.
        unsafe { doom_force_update() }
    }

    fn framebuffer(&mut self) -> Option<FramebufferView<'_>> {
        if !self.initialized {
            return None;
        }
        // SAFETY: the engine returns either null or a pointer to its
        // internal 320x200 buffer of `channels` bytes per pixel, which stays
        // valid until the next engine call; the returned view borrows `self`
        // mutably so no engine call can happen while it is alive.
        let bytes = unsafe {
            let ptr = doom_get_framebuffer(c_int::from(ChannelLayout::Rgba.channels()));
            if ptr.is_null() {
                return None;
            }
            std::slice::from_raw_parts(ptr, FRAME_BYTES)
        };
        FramebufferView::new(bytes, ChannelLayout::Rgba).ok()
    }
}
