use nalgebra::vector;
use serde::{Deserialize, Serialize};

use crate::{
    color::RGB,
    error::{Error, Result},
    volumetric::Volume,
};

/// Default early ray termination threshold
pub const DEFAULT_TERMINATION: f32 = 0.995;

/// Order in which samples along a ray are composited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompositeOrder {
    FrontToBack,
    /// Never terminates early
    BackToFront,
}

/// Per session render settings, immutable during rendering
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    /// Framebuffer size `(width, height)`
    pub resolution: (usize, usize),
    /// Ray marching step in world units
    pub sample_distance: f32,
    /// Fraction of the volume diagonal searched for shadowing, `<0;1>`
    pub global_illumination_reach: f32,
    /// Volumetric scattering blending, `<0;1>`, 0 is surface shading only
    pub volumetric_scattering_blending: f32,
    /// Shadow rays step `sample_distance * factor`, at least 1
    pub shadow_sampling_distance_factor: f32,
    /// Stop marching once accumulated opacity exceeds threshold, `None` to disable
    pub early_ray_termination: Option<f32>,
    pub composite_order: CompositeOrder,
    pub two_sided_lighting: bool,
    pub background: RGB,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            resolution: (500, 500),
            sample_distance: 1.0,
            global_illumination_reach: 0.0,
            volumetric_scattering_blending: 0.0,
            shadow_sampling_distance_factor: 1.0,
            early_ray_termination: Some(DEFAULT_TERMINATION),
            composite_order: CompositeOrder::FrontToBack,
            two_sided_lighting: false,
            background: vector![0.0, 0.0, 0.0],
        }
    }
}

impl RenderSettings {
    pub fn builder() -> RenderSettingsBuilder {
        RenderSettingsBuilder::default()
    }

    /// Check ranges of all settings
    pub fn validate(&self) -> Result<()> {
        let (w, h) = self.resolution;
        if w == 0 || h == 0 {
            return Err(Error::configuration(format!(
                "resolution {w}x{h} has no pixels"
            )));
        }
        if !self.sample_distance.is_finite() || self.sample_distance <= 0.0 {
            return Err(Error::configuration(format!(
                "sample distance {} must be positive",
                self.sample_distance
            )));
        }
        check_unit("global illumination reach", self.global_illumination_reach)?;
        check_unit(
            "volumetric scattering blending",
            self.volumetric_scattering_blending,
        )?;
        if !self.shadow_sampling_distance_factor.is_finite()
            || self.shadow_sampling_distance_factor < 1.0
        {
            return Err(Error::configuration(format!(
                "shadow sampling distance factor {} must be at least 1",
                self.shadow_sampling_distance_factor
            )));
        }
        if let Some(threshold) = self.early_ray_termination {
            if !(threshold > 0.0 && threshold <= 1.0) {
                return Err(Error::configuration(format!(
                    "early ray termination threshold {threshold} outside of (0;1>"
                )));
            }
        }
        Ok(())
    }

    /// Shadow marching step
    pub fn shadow_step(&self) -> f32 {
        self.sample_distance * self.shadow_sampling_distance_factor
    }

    /// Whether any shadow rays are cast
    pub fn casts_shadows(&self) -> bool {
        self.global_illumination_reach > 0.0 && self.volumetric_scattering_blending > 0.0
    }
}

/// Sample distance derived from voxel spacing, `factor * |spacing| / 2`
pub fn sample_distance_for<V>(volume: &V, factor: f32) -> f32
where
    V: Volume + ?Sized,
{
    factor * volume.get_spacing().magnitude() / 2.0
}

fn check_unit(name: &str, val: f32) -> Result<()> {
    if (0.0..=1.0).contains(&val) {
        Ok(())
    } else {
        Err(Error::configuration(format!(
            "{name} {val} outside of <0;1>"
        )))
    }
}

#[derive(Default)]
pub struct RenderSettingsBuilder {
    settings: RenderSettings,
}

impl RenderSettingsBuilder {
    pub fn resolution(mut self, resolution: (usize, usize)) -> Self {
        self.settings.resolution = resolution;
        self
    }

    pub fn sample_distance(mut self, sample_distance: f32) -> Self {
        self.settings.sample_distance = sample_distance;
        self
    }

    pub fn global_illumination_reach(mut self, reach: f32) -> Self {
        self.settings.global_illumination_reach = reach;
        self
    }

    pub fn volumetric_scattering_blending(mut self, blending: f32) -> Self {
        self.settings.volumetric_scattering_blending = blending;
        self
    }

    pub fn shadow_sampling_distance_factor(mut self, factor: f32) -> Self {
        self.settings.shadow_sampling_distance_factor = factor;
        self
    }

    /// Enable termination with the default threshold, or disable it
    pub fn early_ray_termination(mut self, enabled: bool) -> Self {
        self.settings.early_ray_termination = enabled.then(|| DEFAULT_TERMINATION);
        self
    }

    pub fn termination_threshold(mut self, threshold: f32) -> Self {
        self.settings.early_ray_termination = Some(threshold);
        self
    }

    pub fn composite_order(mut self, order: CompositeOrder) -> Self {
        self.settings.composite_order = order;
        self
    }

    pub fn two_sided_lighting(mut self, two_sided: bool) -> Self {
        self.settings.two_sided_lighting = two_sided;
        self
    }

    pub fn background(mut self, background: RGB) -> Self {
        self.settings.background = background;
        self
    }

    pub fn build(self) -> Result<RenderSettings> {
        self.settings.validate()?;
        Ok(self.settings)
    }

    /// Skips validation
    pub fn build_unchecked(self) -> RenderSettings {
        self.settings
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn defaults() {
        let settings = RenderSettings::builder().build().unwrap();
        assert_eq!(settings.resolution, (500, 500));
        assert_eq!(settings.early_ray_termination, Some(0.995));
        assert!(!settings.casts_shadows());
    }

    #[test]
    fn invalid_settings() {
        assert!(RenderSettings::builder().resolution((0, 10)).build().is_err());
        assert!(RenderSettings::builder().sample_distance(0.0).build().is_err());
        assert!(RenderSettings::builder()
            .volumetric_scattering_blending(1.5)
            .build()
            .is_err());
        assert!(RenderSettings::builder()
            .shadow_sampling_distance_factor(0.5)
            .build()
            .is_err());

        // unchecked lets anything through
        let settings = RenderSettings::builder()
            .sample_distance(-1.0)
            .build_unchecked();
        assert_eq!(settings.sample_distance, -1.0);
    }

    #[test]
    fn sample_distance_from_spacing() {
        let volume = uniform_volume(1.0);
        // spacing (1,1,1)
        compare_float(sample_distance_for(&volume, 0.7), 0.7 * 3f32.sqrt() / 2.0);
    }
}
