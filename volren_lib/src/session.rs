//! Single handle over everything needed to render a volume.
//!
//! A [`Session`] owns the immutable scene (volume, transfer function, material, light),
//! the render settings, the camera and the framebuffer. It is built from a [`Preset`]:
//!
//! * sample distance is `factor * |spacing| / 2`
//! * opacity unit distance defaults to `diagonal / max(dims)`
//! * gradient opacity ramps over 5 % of the scalar range
//! * light and camera are placed at offsets from the volume center
//!
//! Frames are rendered on the calling thread, use [`Session::into_render_thread`]
//! to move rendering to a [`RendererFront`](crate::render::RendererFront).

use std::time::Duration;

use nalgebra::{vector, Vector3};

use crate::{
    camera::Camera,
    color::RGB,
    common::BoundBox,
    error::{Error, Result},
    premade::{CameraPreset, Preset},
    render::{
        render_frame, sample_distance_for, AnimationPlan, DriverState, FrameDriver, Framebuffer,
        RenderSettings, RenderThread, Scene, StopHandle, Tick, TimingLog,
    },
    shading::Light,
    volumetric::{GradientOpacity, ScalarVolume, Volume},
};

fn to_vector(v: [f32; 3]) -> Vector3<f32> {
    vector![v[0], v[1], v[2]]
}

pub struct Session<V = ScalarVolume>
where
    V: Volume,
{
    scene: Scene<V>,
    settings: RenderSettings,
    camera: Camera,
    pose: CameraPreset,
    plan: AnimationPlan,
    driver: FrameDriver,
    framebuffer: Framebuffer,
}

impl<V> Session<V>
where
    V: Volume + Sync,
{
    pub fn new(volume: V, preset: &Preset) -> Result<Session<V>> {
        let bounds = volume.get_bound_box();
        if bounds.is_degenerate() {
            return Err(Error::Geometry(format!(
                "volume bounds {:?} - {:?} have no extent",
                bounds.lower, bounds.upper
            )));
        }
        let center = bounds.center();

        let render = &preset.render;
        let background: RGB = to_vector(render.background);
        let mut builder = RenderSettings::builder()
            .resolution(render.resolution)
            .sample_distance(sample_distance_for(&volume, render.sample_distance_factor))
            .global_illumination_reach(render.global_illumination_reach)
            .volumetric_scattering_blending(render.volumetric_scattering_blending)
            .shadow_sampling_distance_factor(render.shadow_sampling_distance_factor)
            .two_sided_lighting(render.two_sided_lighting)
            .background(background)
            .early_ray_termination(false);
        if let Some(threshold) = render.early_ray_termination {
            builder = builder.termination_threshold(threshold);
        }
        let settings = builder.build()?;

        // Value range of the gradient opacity ramp follows the data
        let span = volume.get_scalar_range().span();
        let mut material = preset.material.clone();
        material.gradient_opacity = GradientOpacity {
            enabled: material.gradient_opacity.enabled,
            min_opacity: material.gradient_opacity.min_opacity,
            max_opacity: material.gradient_opacity.max_opacity,
            ..GradientOpacity::for_range_span(span)
        };

        let mut light = Light::scene_light(center + to_vector(preset.light.offset), center);
        light.intensity = preset.light.intensity;

        let camera = Camera::new(
            center + to_vector(preset.camera.offset),
            center,
            to_vector(preset.camera.view_up),
        )?;

        let scene = Scene::new(volume, preset.transfer_function.clone(), material, light)?;

        tracing::info!(
            "Session '{}': sample distance {}, unit distance {}",
            preset.name,
            settings.sample_distance,
            scene.unit_distance()
        );

        let mut session = Session {
            framebuffer: Framebuffer::new(settings.resolution),
            scene,
            settings,
            camera,
            pose: preset.camera.clone(),
            plan: preset.animation,
            driver: FrameDriver::new(),
        };
        session.place_camera()?;
        Ok(session)
    }

    /// Fit camera to the volume, then move it to the preset pose
    fn place_camera(&mut self) -> Result<()> {
        let bounds = self.bounds();
        let center = bounds.center();

        self.camera.reset_camera(&bounds)?;
        self.camera.set_focal_point(center)?;
        self.camera
            .set_position(center + to_vector(self.pose.offset))?;
        self.camera.set_view_up(to_vector(self.pose.view_up))?;
        self.camera.reset_clipping_range(&bounds);
        Ok(())
    }

    fn bounds(&self) -> BoundBox {
        self.scene.volume.get_bound_box()
    }

    /// Render a frame with the current camera
    pub fn render(&mut self) -> Result<Duration> {
        self.driver.render_once(
            &self.scene,
            &self.settings,
            &self.camera,
            &mut self.framebuffer,
        )
    }

    /// Restore the preset camera pose and render.
    /// The timing log starts over, the frame is logged as the first one.
    pub fn reset_view(&mut self) -> Result<Duration> {
        if !self.driver.is_idle() {
            return Err(Error::InvalidState("view reset while not idle"));
        }
        self.place_camera()?;
        self.driver.reset_log();
        self.render()
    }

    /// Run the preset animation to its end or until stopped.
    ///
    /// `on_frame` sees every finished frame as `(step, total, framebuffer)`.
    /// Returns the last tick, [`Tick::Finished`] or [`Tick::Cancelled`].
    pub fn animate<F>(&mut self, mut on_frame: F) -> Result<Tick>
    where
        F: FnMut(usize, usize, &Framebuffer),
    {
        self.animate_with(self.plan, &mut on_frame)
    }

    pub fn animate_with<F>(&mut self, plan: AnimationPlan, mut on_frame: F) -> Result<Tick>
    where
        F: FnMut(usize, usize, &Framebuffer),
    {
        self.driver.start_animation(plan)?;

        loop {
            let tick = self.driver.tick(
                &self.scene,
                &self.settings,
                &mut self.camera,
                &mut self.framebuffer,
            )?;
            match tick {
                Tick::Rendered { step, total, .. } => on_frame(step, total, &self.framebuffer),
                Tick::Finished { .. } => {
                    on_frame(plan.steps, plan.steps, &self.framebuffer);
                    return Ok(tick);
                }
                Tick::Cancelled { .. } | Tick::Idle => return Ok(tick),
            }
        }
    }

    /// Handle to cancel a running animation from another thread
    pub fn stop_handle(&self) -> StopHandle {
        self.driver.stop_handle()
    }

    pub fn state(&self) -> DriverState {
        self.driver.state()
    }

    pub fn timing_log(&self) -> &TimingLog {
        self.driver.timing_log()
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Pose changes are allowed, clipping range should be reset afterwards
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn scene(&self) -> &Scene<V> {
        &self.scene
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn animation_plan(&self) -> AnimationPlan {
        self.plan
    }

    /// Render into a caller provided buffer, the session framebuffer is untouched
    pub fn render_into(&self, framebuffer: &mut Framebuffer) -> Result<()> {
        render_frame(&self.scene, &self.camera, &self.settings, framebuffer)
    }
}

impl<V> Session<V>
where
    V: Volume + Send + Sync + 'static,
{
    /// Move scene, settings and camera to a background renderer
    pub fn into_render_thread(self) -> RenderThread<V> {
        RenderThread::new(self.scene, self.settings, self.camera)
    }
}
