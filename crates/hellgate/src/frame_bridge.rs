use tracing::{debug, info};

use crate::embedded::EmbeddedEngine;
use crate::session::SessionState;
use crate::surface::{ColorMask, Rect, SurfaceHost, SurfaceInfo};

/// Whether `upload_frame` advances the simulation before copying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationStep {
    Regular,
    /// The caller already stepped the engine (forced update on pause).
    AlreadyStepped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Path unset or not resolvable this frame.
    NoSurface,
    /// Surface resolved but its texture is not realized yet.
    WarmingUp,
    /// The engine had no frame or the copy was rejected.
    Skipped,
    Uploaded,
}

/// Moves engine frames into the host surface and draws that surface into
/// the host UI.
#[derive(Debug, Clone)]
pub struct FrameBridge {
    overlay_rect: Rect,
    overlay_mask: ColorMask,
}

impl FrameBridge {
    pub fn new(overlay_rect: Rect, overlay_mask: ColorMask) -> Self {
        Self {
            overlay_rect,
            overlay_mask,
        }
    }

    pub fn overlay_rect(&self) -> Rect {
        self.overlay_rect
    }

    pub fn resolve_surface<H: SurfaceHost + ?Sized>(
        &self,
        session: &SessionState,
        host: &H,
    ) -> Option<SurfaceInfo> {
        if session.surface_path.is_empty() {
            return None;
        }
        host.lookup_surface(&session.surface_path)
    }

    /// Tells the engine to render at the surface's declared size. Returns the
    /// size applied, if the surface resolved.
    pub fn sync_resolution<E, H>(
        &self,
        session: &SessionState,
        engine: &mut E,
        host: &H,
    ) -> Option<(u32, u32)>
    where
        E: EmbeddedEngine + ?Sized,
        H: SurfaceHost + ?Sized,
    {
        let surface = self.resolve_surface(session, host)?;
        engine.set_resolution(surface.width, surface.height);
        info!(
            path = session.surface_path.as_str(),
            width = surface.width,
            height = surface.height,
            "hellgate_resolution_synced"
        );
        Some((surface.width, surface.height))
    }

    pub fn upload_frame<E, H>(
        &self,
        session: &SessionState,
        engine: &mut E,
        host: &mut H,
        step: SimulationStep,
    ) -> UploadOutcome
    where
        E: EmbeddedEngine + ?Sized,
        H: SurfaceHost + ?Sized,
    {
        let Some(surface) = self.resolve_surface(session, host) else {
            return UploadOutcome::NoSurface;
        };
        let Some(texture) = surface.texture else {
            host.materialize_texture(&session.surface_path);
            debug!(
                path = session.surface_path.as_str(),
                "hellgate_surface_materialize_requested"
            );
            return UploadOutcome::WarmingUp;
        };

        if step == SimulationStep::Regular {
            engine.update();
        }

        let Some(frame) = engine.framebuffer() else {
            debug!("hellgate_framebuffer_unavailable");
            return UploadOutcome::Skipped;
        };

        let mut copy_result = Ok(());
        let write_result = host.write_texture(texture, &mut |pixels| {
            copy_result = frame.copy_into(pixels, surface.layout);
        });

        match (write_result, copy_result) {
            (Ok(()), Ok(())) => UploadOutcome::Uploaded,
            (Err(error), _) => {
                debug!(error = %error, "hellgate_surface_write_failed");
                UploadOutcome::Skipped
            }
            (_, Err(error)) => {
                debug!(error = %error, "hellgate_frame_copy_rejected");
                UploadOutcome::Skipped
            }
        }
    }

    /// Draws the surface into the host UI. Returns whether a draw was issued.
    pub fn render_overlay<H: SurfaceHost + ?Sized>(
        &self,
        session: &SessionState,
        host: &mut H,
    ) -> bool {
        let Some(texture) = self
            .resolve_surface(session, host)
            .and_then(|surface| surface.texture)
        else {
            return false;
        };
        host.draw_texture(texture, self.overlay_rect, self.overlay_mask);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::{ChannelLayout, FRAME_BYTES, FRAME_HEIGHT, FRAME_PIXELS, FRAME_WIDTH};
    use crate::test_support::{new_call_log, Call, FakeSurfaceHost, RecordingEngine};

    const SCREEN: &str = "ui\\hellgate\\screen";

    fn bridge() -> FrameBridge {
        FrameBridge::new(
            Rect {
                x: 0,
                y: 0,
                width: 200,
                height: 320,
            },
            ColorMask::OPAQUE_WHITE,
        )
    }

    fn session_with_path(path: &str) -> SessionState {
        SessionState {
            enabled: true,
            render_on_overlay: true,
            surface_path: path.to_string(),
            ..SessionState::default()
        }
    }

    #[test]
    fn empty_path_performs_no_writes_or_draws() {
        let log = new_call_log();
        let mut engine = RecordingEngine::new(log.clone());
        let mut host = FakeSurfaceHost::new(log.clone());
        host.add_surface(SCREEN, FRAME_WIDTH, FRAME_HEIGHT, ChannelLayout::Bgra, true);
        let session = session_with_path("");

        let outcome = bridge().upload_frame(&session, &mut engine, &mut host, SimulationStep::Regular);
        let drew = bridge().render_overlay(&session, &mut host);

        assert_eq!(outcome, UploadOutcome::NoSurface);
        assert!(!drew);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn unresolved_path_is_silent_and_retried() {
        let log = new_call_log();
        let mut engine = RecordingEngine::new(log.clone());
        let mut host = FakeSurfaceHost::new(log.clone());
        let session = session_with_path("ui\\missing");

        for _ in 0..2 {
            let outcome =
                bridge().upload_frame(&session, &mut engine, &mut host, SimulationStep::Regular);
            assert_eq!(outcome, UploadOutcome::NoSurface);
        }

        assert_eq!(
            *log.borrow(),
            vec![
                Call::Lookup("ui\\missing".to_string()),
                Call::Lookup("ui\\missing".to_string()),
            ]
        );
    }

    #[test]
    fn unrealized_texture_triggers_materialization_then_uploads_next_frame() {
        let log = new_call_log();
        let mut engine = RecordingEngine::new(log.clone());
        let mut host = FakeSurfaceHost::new(log.clone());
        host.add_surface(SCREEN, FRAME_WIDTH, FRAME_HEIGHT, ChannelLayout::Bgra, false);
        let session = session_with_path(SCREEN);

        let first = bridge().upload_frame(&session, &mut engine, &mut host, SimulationStep::Regular);
        assert_eq!(first, UploadOutcome::WarmingUp);
        assert!(!log.borrow().contains(&Call::Update));

        let second =
            bridge().upload_frame(&session, &mut engine, &mut host, SimulationStep::Regular);
        assert_eq!(second, UploadOutcome::Uploaded);

        let calls = log.borrow();
        assert_eq!(
            calls.iter().filter(|call| **call == Call::Update).count(),
            1
        );
        assert!(calls.contains(&Call::Materialize(SCREEN.to_string())));
    }

    #[test]
    fn upload_swaps_red_and_blue_into_the_surface() {
        let log = new_call_log();
        let mut engine = RecordingEngine::new(log.clone());
        let mut host = FakeSurfaceHost::new(log.clone());
        host.add_surface(SCREEN, FRAME_WIDTH, FRAME_HEIGHT, ChannelLayout::Bgra, true);
        let session = session_with_path(SCREEN);

        let outcome = bridge().upload_frame(&session, &mut engine, &mut host, SimulationStep::Regular);

        assert_eq!(outcome, UploadOutcome::Uploaded);
        let src = engine.frame_bytes().to_vec();
        let dst = host.pixels(SCREEN).expect("surface pixels");
        assert_eq!(dst.len(), FRAME_BYTES);
        for p in 0..FRAME_PIXELS {
            assert_eq!(
                &dst[p * 4..p * 4 + 4],
                &[src[p * 4 + 2], src[p * 4 + 1], src[p * 4], src[p * 4 + 3]],
                "pixel={p}"
            );
        }
    }

    #[test]
    fn mis_sized_surface_is_left_untouched() {
        let log = new_call_log();
        let mut engine = RecordingEngine::new(log.clone());
        let mut host = FakeSurfaceHost::new(log.clone());
        host.add_surface(SCREEN, 640, 400, ChannelLayout::Bgra, true);
        let session = session_with_path(SCREEN);

        let outcome = bridge().upload_frame(&session, &mut engine, &mut host, SimulationStep::Regular);

        assert_eq!(outcome, UploadOutcome::Skipped);
        assert!(host
            .pixels(SCREEN)
            .expect("surface pixels")
            .iter()
            .all(|byte| *byte == 0));
    }

    #[test]
    fn already_stepped_upload_does_not_step_again() {
        let log = new_call_log();
        let mut engine = RecordingEngine::new(log.clone());
        let mut host = FakeSurfaceHost::new(log.clone());
        host.add_surface(SCREEN, FRAME_WIDTH, FRAME_HEIGHT, ChannelLayout::Bgra, true);
        let session = session_with_path(SCREEN);

        bridge().upload_frame(&session, &mut engine, &mut host, SimulationStep::AlreadyStepped);

        assert!(!log.borrow().contains(&Call::Update));
    }

    #[test]
    fn sync_resolution_uses_declared_surface_size() {
        let log = new_call_log();
        let mut engine = RecordingEngine::new(log.clone());
        let mut host = FakeSurfaceHost::new(log.clone());
        host.add_surface(SCREEN, 256, 160, ChannelLayout::Bgra, false);

        let applied = bridge().sync_resolution(&session_with_path(SCREEN), &mut engine, &host);
        let missing = bridge().sync_resolution(&session_with_path(""), &mut engine, &host);

        assert_eq!(applied, Some((256, 160)));
        assert_eq!(missing, None);
        assert!(log.borrow().contains(&Call::SetResolution(256, 160)));
    }

    #[test]
    fn overlay_draws_into_configured_rect_when_realized() {
        let log = new_call_log();
        let mut host = FakeSurfaceHost::new(log.clone());
        host.add_surface(SCREEN, FRAME_WIDTH, FRAME_HEIGHT, ChannelLayout::Bgra, true);
        let texture = host
            .lookup_surface(SCREEN)
            .and_then(|surface| surface.texture)
            .expect("texture");

        assert!(bridge().render_overlay(&session_with_path(SCREEN), &mut host));
        assert!(log.borrow().contains(&Call::Draw(
            texture,
            bridge().overlay_rect(),
            ColorMask::OPAQUE_WHITE
        )));
    }

    #[test]
    fn overlay_skips_unrealized_texture() {
        let log = new_call_log();
        let mut host = FakeSurfaceHost::new(log.clone());
        host.add_surface(SCREEN, FRAME_WIDTH, FRAME_HEIGHT, ChannelLayout::Bgra, false);

        assert!(!bridge().render_overlay(&session_with_path(SCREEN), &mut host));
        assert!(!log
            .borrow()
            .iter()
            .any(|call| matches!(call, Call::Draw(..) | Call::Materialize(_))));
    }
}
