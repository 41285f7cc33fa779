use std::time::{Duration, Instant};

use hellgate::BridgeStats;
use tracing::info;

/// Loop rates over one interval plus how far the bridge counters moved in it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct LoopMetricsSnapshot {
    pub(crate) fps: f32,
    pub(crate) tps: f32,
    pub(crate) frame_time_ms: f32,
    pub(crate) bridge: BridgeStats,
}

impl LoopMetricsSnapshot {
    pub(crate) fn log(&self) {
        info!(
            fps = self.fps,
            tps = self.tps,
            frame_time_ms = self.frame_time_ms,
            frames_uploaded = self.bridge.frames_uploaded,
            warmup_frames = self.bridge.warmup_frames,
            down_edges = self.bridge.down_edges,
            up_edges = self.bridge.up_edges,
            overlay_draws = self.bridge.overlay_draws,
            "loop_metrics"
        );
    }
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    ticks: u32,
    frame_time_sum: Duration,
    bridge_at_interval_start: BridgeStats,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval_start: Instant::now(),
            interval,
            frames: 0,
            ticks: 0,
            frame_time_sum: Duration::ZERO,
            bridge_at_interval_start: BridgeStats::default(),
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
    }

    pub(crate) fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    /// Closes the interval once it has elapsed. `bridge` is the bridge's
    /// running total; the snapshot carries only its growth since the last
    /// snapshot.
    pub(crate) fn maybe_snapshot(
        &mut self,
        now: Instant,
        bridge: BridgeStats,
    ) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = match self.frames {
            0 => 0.0,
            frames => self.frame_time_sum.as_secs_f32() * 1000.0 / frames as f32,
        };
        let previous = std::mem::replace(&mut self.bridge_at_interval_start, bridge);

        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / seconds,
            tps: self.ticks as f32 / seconds,
            frame_time_ms,
            bridge: stats_growth(previous, bridge),
        };

        self.interval_start = now;
        self.frames = 0;
        self.ticks = 0;
        self.frame_time_sum = Duration::ZERO;

        Some(snapshot)
    }
}

fn stats_growth(previous: BridgeStats, current: BridgeStats) -> BridgeStats {
    BridgeStats {
        frames_uploaded: current.frames_uploaded.saturating_sub(previous.frames_uploaded),
        warmup_frames: current.warmup_frames.saturating_sub(previous.warmup_frames),
        down_edges: current.down_edges.saturating_sub(previous.down_edges),
        up_edges: current.up_edges.saturating_sub(previous.up_edges),
        overlay_draws: current.overlay_draws.saturating_sub(previous.overlay_draws),
    }
}
