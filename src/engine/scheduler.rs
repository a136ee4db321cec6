use std::future::Future;
use std::time::Instant;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::RuntimeError;

use super::runtime::Runtime;

/// Drives frames: input, then tick phase, then render phase.
#[derive(Debug, Default)]
pub struct Scheduler {
    last: Option<Instant>,
    frames: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// One frame at wall-clock time `now`. The first frame sees zero elapsed time.
    pub fn frame_at(&mut self, rt: &Runtime, now: Instant) -> Result<(), RuntimeError> {
        let dt = self
            .last
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f64());
        self.last = Some(now);
        self.step(rt, dt)
    }

    /// One frame with an explicit elapsed time in seconds.
    pub fn step(&mut self, rt: &Runtime, dt: f64) -> Result<(), RuntimeError> {
        let dt = rt.config().clamp_delta(dt);
        rt.pump_input();
        rt.tick_phase(dt)?;
        rt.render_phase()?;
        self.frames += 1;
        debug!(frame = self.frames, dt, entities = rt.entity_count(), "frame");
        Ok(())
    }

    /// `frames` fixed steps of `dt` seconds; the first step gets zero.
    pub fn run_fixed(&mut self, rt: &Runtime, frames: u64, dt: f64) -> Result<(), RuntimeError> {
        for i in 0..frames {
            let elapsed = if i == 0 && self.frames == 0 { 0.0 } else { dt };
            self.step(rt, elapsed)?;
        }
        Ok(())
    }

    /// Real-time loop at the configured frame rate until `cancel` resolves
    /// or a frame fails. Returns the number of frames run.
    pub async fn run_until<F>(&mut self, rt: &Runtime, cancel: F) -> Result<u64, RuntimeError>
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(rt.config().frame_period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(cancel);

        loop {
            tokio::select! {
                () = &mut cancel => {
                    info!(frames = self.frames, "frame loop cancelled");
                    return Ok(self.frames);
                }
                instant = interval.tick() => {
                    self.frame_at(rt, instant.into_std())?;
                }
            }
        }
    }
}
