//! Host-facing adapter: owns the session state and routes phased host events
//! and operator commands into the input buffer, frame bridge and engine.

use tracing::{debug, info};
use winit::keyboard::KeyCode;

use crate::commands::{BridgeCommand, CommandError, CommandRegistry};
use crate::config::BridgeConfig;
use crate::embedded::{logging_sinks, EmbeddedEngine, EngineError};
use crate::frame_bridge::{FrameBridge, SimulationStep, UploadOutcome};
use crate::input_buffer::InputBuffer;
use crate::keys::DoomKey;
use crate::session::SessionState;
use crate::surface::SurfaceHost;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputDevice {
    Keyboard(KeyCode),
    Mouse(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent<'a> {
    GameInput { time: EventTime, device: InputDevice },
    Tick { time: EventTime },
    Frame { time: EventTime },
    UiRender { time: EventTime },
    MapLoad { time: EventTime, map: &'a str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEventKind {
    GameInput,
    Tick,
    Frame,
    UiRender,
    MapLoad,
}

impl HostEvent<'_> {
    pub fn kind(&self) -> HostEventKind {
        match self {
            HostEvent::GameInput { .. } => HostEventKind::GameInput,
            HostEvent::Tick { .. } => HostEventKind::Tick,
            HostEvent::Frame { .. } => HostEventKind::Frame,
            HostEvent::UiRender { .. } => HostEventKind::UiRender,
            HostEvent::MapLoad { .. } => HostEventKind::MapLoad,
        }
    }

    pub fn time(&self) -> EventTime {
        match *self {
            HostEvent::GameInput { time, .. }
            | HostEvent::Tick { time }
            | HostEvent::Frame { time }
            | HostEvent::UiRender { time }
            | HostEvent::MapLoad { time, .. } => time,
        }
    }
}

/// Subscriber ordering; higher runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventPriority {
    Lowest,
    Low,
    Default,
    High,
    Highest,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub frames_uploaded: u64,
    pub warmup_frames: u64,
    pub down_edges: u64,
    pub up_edges: u64,
    pub overlay_draws: u64,
}

pub struct Hellgate<E: EmbeddedEngine> {
    engine: E,
    session: SessionState,
    input: InputBuffer,
    frames: FrameBridge,
    commands: CommandRegistry,
    stats: BridgeStats,
}

impl<E: EmbeddedEngine> Hellgate<E> {
    /// Routes engine output into the log and initializes the engine. The
    /// session starts fully disabled.
    pub fn initialize(mut engine: E, config: &BridgeConfig) -> Result<Self, EngineError> {
        let (print, exit) = logging_sinks();
        engine.set_print_sink(print);
        engine.set_exit_sink(exit);

        let flags = config.init_flags();
        engine.init(&config.engine_args, flags)?;
        info!(
            args = config.engine_args.len(),
            flags = flags.bits(),
            "hellgate_initialized"
        );

        Ok(Self {
            engine,
            session: SessionState::default(),
            input: InputBuffer::new(),
            frames: FrameBridge::new(config.overlay_rect, config.overlay_color_mask),
            commands: CommandRegistry::with_bridge_builtins(),
            stats: BridgeStats::default(),
        })
    }

    /// Map-load handling must see the event before other subscribers so no
    /// later reaction touches a stale surface.
    pub fn priority(kind: HostEventKind) -> EventPriority {
        match kind {
            HostEventKind::MapLoad => EventPriority::Highest,
            _ => EventPriority::Default,
        }
    }

    pub fn handle_event<H: SurfaceHost + ?Sized>(&mut self, event: &HostEvent<'_>, host: &mut H) {
        match *event {
            HostEvent::GameInput {
                time: EventTime::Before,
                device: InputDevice::Keyboard(key),
            } => {
                if self.session.enabled && self.session.capture_input {
                    self.input.observe_press(key);
                }
            }
            HostEvent::Tick {
                time: EventTime::After,
            } => {
                if self.session.enabled {
                    let summary = self.input.drain(&mut self.engine);
                    self.stats.down_edges += u64::from(summary.down_edges);
                    self.stats.up_edges += u64::from(summary.up_edges);
                }
            }
            HostEvent::Frame {
                time: EventTime::Before,
            } => {
                if self.session.enabled {
                    let outcome = self.frames.upload_frame(
                        &self.session,
                        &mut self.engine,
                        host,
                        SimulationStep::Regular,
                    );
                    self.record_upload(outcome);
                }
            }
            HostEvent::UiRender {
                time: EventTime::Before,
            } => {
                if self.session.render_on_overlay && self.frames.render_overlay(&self.session, host)
                {
                    self.stats.overlay_draws += 1;
                }
            }
            HostEvent::MapLoad {
                time: EventTime::After,
                map,
            } => {
                self.session.reset_for_map_load();
                info!(map, "hellgate_map_load_reset");
            }
            _ => {}
        }
    }

    /// Parses and applies one operator command, returning the lines to show
    /// the operator.
    pub fn execute_command<H: SurfaceHost + ?Sized>(
        &mut self,
        line: &str,
        host: &mut H,
    ) -> Result<Vec<String>, CommandError> {
        match self.commands.parse_line(line)? {
            Some(command) => Ok(self.apply_command(command, host)),
            None => Ok(Vec::new()),
        }
    }

    pub fn apply_command<H: SurfaceHost + ?Sized>(
        &mut self,
        command: BridgeCommand,
        host: &mut H,
    ) -> Vec<String> {
        match command {
            BridgeCommand::RenderOnScreen(Some(value)) => {
                self.session.render_on_overlay = value;
                info!(enabled = value, "hellgate_render_on_screen_set");
                Vec::new()
            }
            BridgeCommand::RenderOnScreen(None) => {
                vec![format!("render_on_screen: {}", self.session.render_on_overlay)]
            }
            BridgeCommand::SetScreenBitmap(Some(path)) => {
                self.set_surface_path(path, host);
                Vec::new()
            }
            BridgeCommand::SetScreenBitmap(None) => {
                vec![format!("set_screen_bitmap: \"{}\"", self.session.surface_path)]
            }
            BridgeCommand::Resume => {
                self.resume();
                Vec::new()
            }
            BridgeCommand::Pause => {
                self.pause(host);
                Vec::new()
            }
            BridgeCommand::CaptureInput(Some(value)) => {
                self.session.capture_input = value;
                info!(enabled = value, "hellgate_capture_input_set");
                Vec::new()
            }
            BridgeCommand::CaptureInput(None) => {
                vec![format!("capture_input: {}", self.session.capture_input)]
            }
            BridgeCommand::Help => self.commands.help_lines(),
        }
    }

    pub fn set_surface_path<H: SurfaceHost + ?Sized>(&mut self, path: String, host: &mut H) {
        self.session.surface_path = path;
        if self
            .frames
            .sync_resolution(&self.session, &mut self.engine, host)
            .is_none()
        {
            debug!(
                path = self.session.surface_path.as_str(),
                "hellgate_surface_unresolved"
            );
        }
    }

    /// Starts the simulation and dismisses the engine menu. Keyboard capture
    /// stays off until requested.
    pub fn resume(&mut self) {
        self.session.enabled = true;
        self.session.capture_input = false;
        self.tap_escape();
        info!("hellgate_resumed");
    }

    /// Stops the simulation after opening the engine menu and pushing one
    /// last frame, so the surface shows the paused state.
    pub fn pause<H: SurfaceHost + ?Sized>(&mut self, host: &mut H) {
        self.session.enabled = false;
        self.session.capture_input = false;
        self.tap_escape();
        self.engine.force_update();
        let outcome = self.frames.upload_frame(
            &self.session,
            &mut self.engine,
            host,
            SimulationStep::AlreadyStepped,
        );
        self.record_upload(outcome);
        info!(?outcome, "hellgate_paused");
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    pub fn input_buffer(&self) -> &InputBuffer {
        &self.input
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    fn tap_escape(&mut self) {
        self.engine.key_down(DoomKey::Escape);
        self.engine.key_up(DoomKey::Escape);
    }

    fn record_upload(&mut self, outcome: UploadOutcome) {
        match outcome {
            UploadOutcome::Uploaded => self.stats.frames_uploaded += 1,
            UploadOutcome::WarmingUp => self.stats.warmup_frames += 1,
            UploadOutcome::NoSurface | UploadOutcome::Skipped => {}
        }
    }
}
