use std::collections::HashMap;

use winit::keyboard::KeyCode;

use crate::keys::{translate, DoomKey};

/// Receiver of edge-triggered key events in the engine's key space.
pub trait KeySink {
    fn key_down(&mut self, key: DoomKey);
    fn key_up(&mut self, key: DoomKey);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeldState {
    /// Pressed, down-edge not delivered yet.
    Unprocessed,
    /// Down-edge delivered; must be re-asserted every tick to stay held.
    Processed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub down_edges: u32,
    pub up_edges: u32,
}

#[derive(Debug, Clone, Copy)]
struct KeyBufferState {
    pressed: bool,
    processed: bool,
}

/// Turns "key seen pressed this tick" observations into one down-edge per
/// hold and one up-edge on the first tick the key is not seen again.
#[derive(Debug, Default)]
pub struct InputBuffer {
    entries: HashMap<KeyCode, KeyBufferState>,
    released: Vec<KeyCode>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_press(&mut self, key: KeyCode) {
        self.entries
            .entry(key)
            .and_modify(|state| state.pressed = true)
            .or_insert(KeyBufferState {
                pressed: true,
                processed: false,
            });
    }

    /// Delivers pending edges to `sink`. No ordering is guaranteed between
    /// edges of distinct keys.
    pub fn drain<S: KeySink + ?Sized>(&mut self, sink: &mut S) -> DrainSummary {
        let mut summary = DrainSummary::default();

        for (key, state) in self.entries.iter_mut() {
            let doom_key = translate(*key);
            if state.pressed {
                if !state.processed {
                    sink.key_down(doom_key);
                    state.processed = true;
                    summary.down_edges += 1;
                }
                state.pressed = false;
            } else {
                sink.key_up(doom_key);
                summary.up_edges += 1;
                self.released.push(*key);
            }
        }

        for key in self.released.drain(..) {
            self.entries.remove(&key);
        }

        summary
    }

    pub fn state(&self, key: KeyCode) -> Option<HeldState> {
        self.entries.get(&key).map(|state| {
            if state.processed {
                HeldState::Processed
            } else {
                HeldState::Unprocessed
            }
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
