use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hellgate::{EmbeddedEngine, EngineError, EventTime, Hellgate, HostEvent, InputDevice};
use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use super::bootstrap::AppWiring;
use super::config::HostConfig;
use super::events::{dispatch, MapLoadLogger};
use super::metrics::MetricsAccumulator;
use super::renderer::Renderer;
use super::stdin_commands::{parse_host_command, CommandInbox, HostCommand};
use super::textures::{DrawRequest, TextureRegistry};

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let result = acquire_engine().and_then(|engine| run_with_engine(app.config, engine));
    if let Err(err) = result {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

#[cfg(feature = "puredoom")]
fn acquire_engine() -> Result<hellgate::embedded::PureDoom, AppError> {
    Ok(hellgate::embedded::PureDoom::acquire()?)
}

#[cfg(not(feature = "puredoom"))]
fn acquire_engine() -> Result<super::synthetic::SyntheticEngine, AppError> {
    Ok(super::synthetic::SyntheticEngine::new())
}

/// The bridge plus everything it reacts alongside: other event subscribers
/// and the host's texture resources.
struct HostState<E: EmbeddedEngine> {
    hellgate: Hellgate<E>,
    map_logger: MapLoadLogger,
    textures: TextureRegistry,
}

impl<E: EmbeddedEngine> HostState<E> {
    fn fire(&mut self, event: HostEvent<'_>) {
        dispatch(
            &event,
            &mut self.textures,
            &mut [&mut self.hellgate, &mut self.map_logger],
        );
    }

    fn fire_phases(&mut self, make: impl Fn(EventTime) -> HostEvent<'static>) {
        self.fire(make(EventTime::Before));
        self.fire(make(EventTime::After));
    }

    /// Simulates a level transition: host resources go away first, then the
    /// map-load events fire.
    fn load_map(&mut self, map: &str) {
        self.textures.unload_all();
        for time in [EventTime::Before, EventTime::After] {
            self.fire(HostEvent::MapLoad { time, map });
        }
    }

    fn run_bridge_command(&mut self, line: &str) {
        match self.hellgate.execute_command(line, &mut self.textures) {
            Ok(output) => {
                for output_line in output {
                    info!(line = output_line.as_str(), "command_output");
                }
            }
            Err(err) => warn!(command = line, error = %err, "command_failed"),
        }
    }

    /// Returns `true` when the operator asked to quit.
    fn run_operator_line(&mut self, line: &str) -> bool {
        match parse_host_command(line) {
            None => false,
            Some(HostCommand::Quit) => true,
            Some(HostCommand::MapLoad(map)) => {
                self.load_map(&map);
                false
            }
            Some(HostCommand::Bridge(command)) => {
                self.run_bridge_command(&command);
                false
            }
        }
    }

    fn run_tick(&mut self, pressed: &[InputDevice]) {
        for device in pressed {
            self.fire_phases(|time| HostEvent::GameInput {
                time,
                device: *device,
            });
        }
        self.fire_phases(|time| HostEvent::Tick { time });
    }
}

fn run_with_engine<E: EmbeddedEngine>(config: HostConfig, engine: E) -> Result<(), AppError> {
    let hellgate = Hellgate::initialize(engine, &config.bridge)?;
    let mut state = HostState {
        hellgate,
        map_logger: MapLoadLogger::default(),
        textures: TextureRegistry::from_config(&config.textures),
    };

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta(), Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval(), Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        "loop_config"
    );

    state.load_map(&config.initial_map);
    for command in &config.bridge.startup_commands {
        state.run_bridge_command(command);
    }

    let mut input_collector = InputCollector::default();
    let mut inbox = CommandInbox::spawn_stdin();
    let mut operator_lines = Vec::new();
    let mut draw_requests: Vec<DrawRequest> = Vec::new();
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    input_collector.mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::Focused(false) => {
                    input_collector.release_all();
                }
                WindowEvent::MouseInput {
                    state: button_state,
                    button,
                    ..
                } => {
                    input_collector.handle_mouse_input(button, button_state);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_keyboard_input(&event);
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    inbox.drain_into(&mut operator_lines);
                    for line in operator_lines.drain(..) {
                        if state.run_operator_line(&line) {
                            input_collector.mark_quit_requested();
                            info!(reason = "operator_quit", "shutdown_requested");
                            window_target.exit();
                        }
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                    accumulator = accumulator.saturating_add(clamped_frame_dt);

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        state.run_tick(input_collector.snapshot_for_tick());
                        metrics_accumulator.record_tick();
                    }
                    accumulator = step_plan.remaining_accumulator;

                    if step_plan.dropped_backlog > Duration::ZERO {
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    state.fire_phases(|time| HostEvent::Frame { time });
                    state.fire_phases(|time| HostEvent::UiRender { time });

                    state.textures.drain_draw_requests_into(&mut draw_requests);
                    if let Err(error) = renderer.render(&draw_requests, state.textures.store()) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    draw_requests.clear();
                    state.textures.realize_pending();
                    metrics_accumulator.record_frame(raw_frame_dt);

                    if let Some(snapshot) =
                        metrics_accumulator.maybe_snapshot(now, state.hellgate.stats())
                    {
                        snapshot.log();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                info!(maps_loaded = state.map_logger.loads(), "shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Host buttons reported to the bridge once per tick: everything still held
/// plus anything pressed since the previous tick, so a tap released between
/// two ticks is still seen once.
#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    held: Vec<InputDevice>,
    pressed_since_last_tick: Vec<InputDevice>,
    tick_devices: Vec<InputDevice>,
}

impl InputCollector {
    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        self.handle_key_state(key_event.physical_key, key_event.state);
    }

    fn handle_key_state(&mut self, key: PhysicalKey, state: ElementState) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        // Escape belongs to the host.
        if code == KeyCode::Escape {
            if state == ElementState::Pressed {
                self.quit_requested = true;
            }
            return;
        }
        self.handle_device_state(InputDevice::Keyboard(code), state);
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        self.handle_device_state(InputDevice::Mouse(mouse_button_index(button)), state);
    }

    fn handle_device_state(&mut self, device: InputDevice, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.held.contains(&device) {
                    self.held.push(device);
                }
                if !self.pressed_since_last_tick.contains(&device) {
                    self.pressed_since_last_tick.push(device);
                }
            }
            ElementState::Released => self.held.retain(|held| *held != device),
        }
    }

    /// Focus loss swallows release events, so everything counts as released.
    fn release_all(&mut self) {
        self.held.clear();
        self.pressed_since_last_tick.clear();
    }

    /// Devices to report for the tick about to run. Consumes the presses
    /// latched since the previous tick.
    fn snapshot_for_tick(&mut self) -> &[InputDevice] {
        self.tick_devices.clear();
        self.tick_devices.extend_from_slice(&self.held);
        for device in self.pressed_since_last_tick.drain(..) {
            if !self.tick_devices.contains(&device) {
                self.tick_devices.push(device);
            }
        }
        &self.tick_devices
    }
}

fn mouse_button_index(button: MouseButton) -> u16 {
    match button {
        MouseButton::Left => 0,
        MouseButton::Right => 1,
        MouseButton::Middle => 2,
        MouseButton::Back => 3,
        MouseButton::Forward => 4,
        MouseButton::Other(index) => index,
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
