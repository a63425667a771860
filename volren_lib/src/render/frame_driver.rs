//! Single frame rendering and camera orbit animation.
//!
//! The driver is a small state machine:
//! `Idle -> Rendering -> Idle` for a single frame and
//! `Idle -> Animating { step, total } -> Idle` for an animation driven by [`FrameDriver::tick`].
//!
//! Animation can be cancelled through a [`StopHandle`] from any thread. The flag is only
//! checked between frames, a frame in progress is always finished.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};

use super::{render_frame, Framebuffer, RenderSettings, Scene};
use crate::{
    camera::Camera,
    error::{Error, Result},
    volumetric::Volume,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Rendering,
    Animating { step: usize, total: usize },
}

/// Camera motion applied before every animation frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationPlan {
    pub steps: usize,
    /// Degrees per step
    pub azimuth: f32,
    /// Degrees per step
    pub elevation: f32,
}

impl Default for AnimationPlan {
    fn default() -> Self {
        Self {
            steps: 50,
            azimuth: -2.0,
            elevation: -2.0,
        }
    }
}

/// Outcome of one [`FrameDriver::tick`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// Nothing to do
    Idle,
    /// Frame `step` (1 based) of `total` rendered
    Rendered { step: usize, total: usize, elapsed: Duration },
    /// Last frame rendered, driver is idle again
    Finished { mean: Duration },
    /// Stop was requested, no frame rendered
    Cancelled { rendered: usize },
}

/// Requests the animation to stop before its next frame
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Human readable timing lines
#[derive(Debug, Clone, Default)]
pub struct TimingLog {
    lines: Vec<String>,
}

impl TimingLog {
    pub fn push(&mut self, line: String) {
        tracing::info!("{line}");
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

pub struct FrameDriver {
    state: DriverState,
    plan: AnimationPlan,
    stop: Arc<AtomicBool>,
    log: TimingLog,
    frames_rendered: usize,
    animation_time: Duration,
}

impl FrameDriver {
    pub fn new() -> FrameDriver {
        FrameDriver {
            state: DriverState::Idle,
            plan: AnimationPlan::default(),
            stop: Arc::new(AtomicBool::new(false)),
            log: TimingLog::default(),
            frames_rendered: 0,
            animation_time: Duration::ZERO,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == DriverState::Idle
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.stop.clone())
    }

    pub fn timing_log(&self) -> &TimingLog {
        &self.log
    }

    /// Forget previous frames, next frame is logged as the first one again
    pub fn reset_log(&mut self) {
        self.log.clear();
        self.frames_rendered = 0;
    }

    /// Render one frame with the current camera
    pub fn render_once<V>(
        &mut self,
        scene: &Scene<V>,
        settings: &RenderSettings,
        camera: &Camera,
        framebuffer: &mut Framebuffer,
    ) -> Result<Duration>
    where
        V: Volume + Sync,
    {
        if !self.is_idle() {
            return Err(Error::InvalidState("render requested while not idle"));
        }

        self.state = DriverState::Rendering;
        let res = self.timed_frame(scene, settings, camera, framebuffer);
        self.state = DriverState::Idle;
        let elapsed = res?;

        if self.frames_rendered == 1 {
            self.log
                .push(format!("First Render Time: {:.0} ms", millis(elapsed)));
        } else {
            self.log
                .push(format!("Render Time: {:.0} ms", millis(elapsed)));
        }
        Ok(elapsed)
    }

    /// Enter animation, frames are then produced by [`FrameDriver::tick`]
    pub fn start_animation(&mut self, plan: AnimationPlan) -> Result<()> {
        if !self.is_idle() {
            return Err(Error::InvalidState("animation started while not idle"));
        }
        if plan.steps == 0 {
            return Err(Error::configuration("animation needs at least one step"));
        }

        self.stop.store(false, Ordering::SeqCst);
        self.plan = plan;
        self.animation_time = Duration::ZERO;
        self.state = DriverState::Animating {
            step: 0,
            total: plan.steps,
        };
        tracing::debug!("Animation started, {} steps", plan.steps);
        Ok(())
    }

    /// Advance the animation by one frame.
    ///
    /// The stop flag is checked first, then the camera moves and a full frame is rendered.
    pub fn tick<V>(
        &mut self,
        scene: &Scene<V>,
        settings: &RenderSettings,
        camera: &mut Camera,
        framebuffer: &mut Framebuffer,
    ) -> Result<Tick>
    where
        V: Volume + Sync,
    {
        let (step, total) = match self.state {
            DriverState::Idle => return Ok(Tick::Idle),
            DriverState::Rendering => {
                return Err(Error::InvalidState("tick while rendering"));
            }
            DriverState::Animating { step, total } => (step, total),
        };

        if self.stop.swap(false, Ordering::SeqCst) {
            self.state = DriverState::Idle;
            tracing::info!("Animation stopped after {step} of {total} frames");
            return Ok(Tick::Cancelled { rendered: step });
        }

        camera.azimuth(self.plan.azimuth);
        camera.elevation(self.plan.elevation);
        camera.orthogonalize_view_up();
        camera.reset_clipping_range(&scene.volume.get_bound_box());

        let elapsed = match self.timed_frame(scene, settings, camera, framebuffer) {
            Ok(elapsed) => elapsed,
            Err(e) => {
                self.state = DriverState::Idle;
                return Err(e);
            }
        };
        self.animation_time += elapsed;

        let step = step + 1;
        tracing::debug!("Animation frame {step}/{total} in {:.1} ms", millis(elapsed));

        if step == total {
            self.state = DriverState::Idle;
            let mean = mean_duration(self.animation_time, total);
            self.log.push(format!(
                "Interactive Render Time: {:.1} ms",
                millis(mean)
            ));
            Ok(Tick::Finished { mean })
        } else {
            self.state = DriverState::Animating { step, total };
            Ok(Tick::Rendered {
                step,
                total,
                elapsed,
            })
        }
    }

    fn timed_frame<V>(
        &mut self,
        scene: &Scene<V>,
        settings: &RenderSettings,
        camera: &Camera,
        framebuffer: &mut Framebuffer,
    ) -> Result<Duration>
    where
        V: Volume + Sync,
    {
        let start = Instant::now();
        render_frame(scene, camera, settings, framebuffer)?;
        self.frames_rendered += 1;
        Ok(start.elapsed())
    }
}

/// Mean of `count` frames taking `sum` in total
fn mean_duration(sum: Duration, count: usize) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(sum.as_secs_f64() / count as f64)
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::test_helpers::*;

    fn small_settings() -> RenderSettings {
        RenderSettings::builder()
            .resolution((8, 8))
            .sample_distance(0.5)
            .build()
            .unwrap()
    }

    #[test]
    fn render_once_logs_first_frame() {
        let scene = uniform_scene(0.5, 1.0);
        let camera = camera_looking_at(&scene.volume);
        let mut fb = Framebuffer::new((8, 8));
        let mut driver = FrameDriver::new();

        driver
            .render_once(&scene, &small_settings(), &camera, &mut fb)
            .unwrap();
        assert!(driver.is_idle());
        assert!(driver.timing_log().lines()[0].starts_with("First Render Time: "));

        driver
            .render_once(&scene, &small_settings(), &camera, &mut fb)
            .unwrap();
        assert_eq!(driver.timing_log().lines().len(), 2);
    }

    #[test]
    fn animation_runs_to_completion() {
        let scene = uniform_scene(0.5, 1.0);
        let mut camera = camera_looking_at(&scene.volume);
        let settings = small_settings();
        let mut fb = Framebuffer::new((8, 8));
        let mut driver = FrameDriver::new();

        let plan = AnimationPlan {
            steps: 3,
            ..Default::default()
        };
        driver.start_animation(plan).unwrap();
        assert_eq!(driver.state(), DriverState::Animating { step: 0, total: 3 });

        // busy driver refuses new work
        assert!(matches!(
            driver.start_animation(plan),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            driver.render_once(&scene, &settings, &camera, &mut fb),
            Err(Error::InvalidState(_))
        ));

        let t1 = driver.tick(&scene, &settings, &mut camera, &mut fb).unwrap();
        assert!(matches!(t1, Tick::Rendered { step: 1, total: 3, .. }));
        let t2 = driver.tick(&scene, &settings, &mut camera, &mut fb).unwrap();
        assert!(matches!(t2, Tick::Rendered { step: 2, total: 3, .. }));
        let t3 = driver.tick(&scene, &settings, &mut camera, &mut fb).unwrap();
        assert!(matches!(t3, Tick::Finished { .. }));

        assert!(driver.is_idle());
        assert_eq!(
            driver.tick(&scene, &settings, &mut camera, &mut fb).unwrap(),
            Tick::Idle
        );
        let last = driver.timing_log().lines().last().unwrap();
        assert!(last.starts_with("Interactive Render Time: "));
    }

    #[test]
    fn stop_before_next_frame() {
        let scene = uniform_scene(0.5, 1.0);
        let mut camera = camera_looking_at(&scene.volume);
        let settings = small_settings();
        let mut fb = Framebuffer::new((8, 8));
        let mut driver = FrameDriver::new();

        driver
            .start_animation(AnimationPlan {
                steps: 10,
                ..Default::default()
            })
            .unwrap();
        driver.tick(&scene, &settings, &mut camera, &mut fb).unwrap();

        let position = camera.position();
        driver.stop_handle().stop();

        let tick = driver.tick(&scene, &settings, &mut camera, &mut fb).unwrap();
        assert_eq!(tick, Tick::Cancelled { rendered: 1 });
        assert!(driver.is_idle());
        // no camera motion after stop
        assert_eq!(camera.position(), position);
    }

    #[test]
    fn zero_step_plan_rejected() {
        let mut driver = FrameDriver::new();
        let plan = AnimationPlan {
            steps: 0,
            ..Default::default()
        };
        assert!(matches!(
            driver.start_animation(plan),
            Err(Error::Configuration(_))
        ));
        assert!(driver.is_idle());
    }

    #[test]
    fn mean_frame_time() {
        let close = |d: Duration, secs: f64| (d.as_secs_f64() - secs).abs() < 1e-8;

        assert!(close(mean_duration(Duration::from_millis(30), 3), 0.01));
        assert!(close(mean_duration(Duration::from_millis(10), 4), 0.0025));
        assert_eq!(mean_duration(Duration::from_secs(1), 0), Duration::ZERO);

        let huge = (u32::MAX as u64 + 1) as usize;
        let mean = mean_duration(Duration::from_secs(1 << 32), huge);
        assert!(close(mean, 1.0));
    }
}
