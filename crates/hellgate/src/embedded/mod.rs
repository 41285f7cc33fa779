//! Boundary to the embedded engine library and the text/exit sinks it
//! reports through.

#[cfg(feature = "puredoom")]
mod puredoom;

use std::ops::BitOr;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::framebuffer::FramebufferView;
use crate::input_buffer::KeySink;

#[cfg(feature = "puredoom")]
pub use puredoom::PureDoom;

pub const DOOM_LOG_TARGET: &str = "hellgate::doom";

pub type PrintSink = Box<dyn FnMut(&str) + Send>;
pub type ExitSink = Box<dyn FnMut(i32) + Send>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine argument contains an interior NUL byte: {0:?}")]
    InvalidArgument(String),
    #[error("engine instance already acquired; the native library is process-wide")]
    AlreadyAcquired,
    #[error("engine initialization failed: {0}")]
    Init(String),
}

/// The narrow call surface of the embedded engine. Everything is invoked
/// from the host's main thread.
pub trait EmbeddedEngine: KeySink {
    fn set_print_sink(&mut self, sink: PrintSink);
    fn set_exit_sink(&mut self, sink: ExitSink);
    /// Must run once before any other call except the sink setters.
    fn init(&mut self, args: &[String], flags: InitFlags) -> Result<(), EngineError>;
    fn set_resolution(&mut self, width: u32, height: u32);
    fn update(&mut self);
    /// Steps the simulation even when `update` would short-circuit.
    fn force_update(&mut self);
    /// Current 320x200 frame in the engine's native channel order.
    fn framebuffer(&mut self) -> Option<FramebufferView<'_>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitFlags(u32);

impl InitFlags {
    pub const NONE: Self = Self(0);
    pub const HIDE_MOUSE_OPTIONS: Self = Self(1);
    pub const HIDE_SOUND_OPTIONS: Self = Self(2);
    pub const HIDE_MUSIC_OPTIONS: Self = Self(4);
    pub const MENU_DARKEN_BG: Self = Self(8);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for InitFlags {
    fn default() -> Self {
        Self::MENU_DARKEN_BG
    }
}

impl BitOr for InitFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitFlag {
    HideMouseOptions,
    HideSoundOptions,
    HideMusicOptions,
    MenuDarkenBg,
}

impl InitFlag {
    pub fn to_flags(self) -> InitFlags {
        match self {
            InitFlag::HideMouseOptions => InitFlags::HIDE_MOUSE_OPTIONS,
            InitFlag::HideSoundOptions => InitFlags::HIDE_SOUND_OPTIONS,
            InitFlag::HideMusicOptions => InitFlags::HIDE_MUSIC_OPTIONS,
            InitFlag::MenuDarkenBg => InitFlags::MENU_DARKEN_BG,
        }
    }
}

pub fn combine_init_flags(flags: &[InitFlag]) -> InitFlags {
    flags
        .iter()
        .fold(InitFlags::NONE, |acc, flag| acc | flag.to_flags())
}

/// Accumulates engine text output and hands back complete lines. A trailing
/// fragment without a newline is held until the next push or `flush`.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    pub fn push(&mut self, text: &str, mut emit: impl FnMut(&str)) {
        for ch in text.chars() {
            match ch {
                '\n' => {
                    emit(&self.pending);
                    self.pending.clear();
                }
                '\r' => {}
                _ => self.pending.push(ch),
            }
        }
    }

    pub fn flush(&mut self, mut emit: impl FnMut(&str)) {
        if !self.pending.is_empty() {
            emit(&self.pending);
            self.pending.clear();
        }
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }
}

/// Sinks that route engine output into the log, one record per line. The
/// exit sink flushes any unterminated output first.
pub fn logging_sinks() -> (PrintSink, ExitSink) {
    let buffer = Arc::new(Mutex::new(LineBuffer::default()));
    let print_buffer = Arc::clone(&buffer);

    let print: PrintSink = Box::new(move |text: &str| {
        let mut buffer = print_buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.push(text, log_engine_line);
    });
    let exit: ExitSink = Box::new(move |code: i32| {
        let mut buffer = buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.flush(log_engine_line);
        debug!(code, "doom_exited");
    });
    (print, exit)
}

fn log_engine_line(line: &str) {
    info!(target: DOOM_LOG_TARGET, "{line}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(buffer: &mut LineBuffer, text: &str) -> Vec<String> {
        let mut lines = Vec::new();
        buffer.push(text, |line| lines.push(line.to_string()));
        lines
    }

    #[test]
    fn multi_line_output_splits_into_discrete_lines() {
        let mut buffer = LineBuffer::default();
        let lines = collect(&mut buffer, "Z_Init: Init zone memory\nW_Init: Init WADfiles\n");

        assert_eq!(lines, vec!["Z_Init: Init zone memory", "W_Init: Init WADfiles"]);
        assert_eq!(buffer.pending(), "");
    }

    #[test]
    fn unterminated_fragment_carries_into_next_push() {
        let mut buffer = LineBuffer::default();
        assert!(collect(&mut buffer, "R_Init: ").is_empty());
        assert_eq!(collect(&mut buffer, "done\r\n"), vec!["R_Init: done"]);
    }

    #[test]
    fn flush_emits_tail_once() {
        let mut buffer = LineBuffer::default();
        collect(&mut buffer, "tail");

        let mut flushed = Vec::new();
        buffer.flush(|line| flushed.push(line.to_string()));
        buffer.flush(|line| flushed.push(line.to_string()));

        assert_eq!(flushed, vec!["tail"]);
    }

    #[test]
    fn empty_lines_are_preserved() {
        let mut buffer = LineBuffer::default();
        assert_eq!(collect(&mut buffer, "\n\n"), vec!["", ""]);
    }

    #[test]
    fn init_flags_combine_from_config_names() {
        let flags = combine_init_flags(&[InitFlag::MenuDarkenBg, InitFlag::HideSoundOptions]);
        assert_eq!(flags.bits(), 10);
        assert!(flags.contains(InitFlags::MENU_DARKEN_BG));
        assert!(!flags.contains(InitFlags::HIDE_MOUSE_OPTIONS));
        assert_eq!(combine_init_flags(&[]), InitFlags::NONE);
        assert_eq!(InitFlags::default(), InitFlags::MENU_DARKEN_BG);
    }
}
