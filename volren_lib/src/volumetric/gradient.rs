//! Gradient estimation by central differences and gradient opacity.

use nalgebra::{vector, Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use super::Volume;

/// Gradient of the scalar field at world position `pos`.
pub fn gradient_at<V>(volume: &V, pos: Point3<f32>) -> Vector3<f32>
where
    V: Volume + ?Sized,
{
    gradient_of(|p| volume.sample_at(p), pos, volume.get_spacing())
}

/// Gradient of any field sampled with the grid spacing, for example the opacity field.
///
/// One step of `spacing` to each side, divided by `2 * spacing`.
/// Borders are handled by the field itself (volumes clamp).
pub fn gradient_of<F>(field: F, pos: Point3<f32>, spacing: Vector3<f32>) -> Vector3<f32>
where
    F: Fn(Point3<f32>) -> f32,
{
    let dx = vector![spacing.x, 0.0, 0.0];
    let dy = vector![0.0, spacing.y, 0.0];
    let dz = vector![0.0, 0.0, spacing.z];

    let diff = vector![
        field(pos + dx) - field(pos - dx),
        field(pos + dy) - field(pos - dy),
        field(pos + dz) - field(pos - dz)
    ];

    diff.component_div(&(2.0 * spacing))
}

/// Surface normal, pointing against the gradient (out of dense regions).
/// Zero gradient has no normal.
pub fn normal_from_gradient(gradient: &Vector3<f32>) -> Option<Unit<Vector3<f32>>> {
    Unit::try_new(-gradient, f32::EPSILON)
}

/// Maps gradient magnitude to an opacity multiplier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientOpacity {
    pub enabled: bool,
    pub min_value: f32,
    pub max_value: f32,
    pub min_opacity: f32,
    pub max_opacity: f32,
}

impl Default for GradientOpacity {
    fn default() -> Self {
        Self {
            enabled: false,
            min_value: 0.0,
            max_value: 1.0,
            min_opacity: 0.0,
            max_opacity: 1.0,
        }
    }
}

impl GradientOpacity {
    /// Typical setup for a volume: ramp up to 5 % of the scalar range span.
    pub fn for_range_span(span: f32) -> GradientOpacity {
        GradientOpacity {
            max_value: span * 0.05,
            ..Default::default()
        }
    }

    /// Multiplier for gradient magnitude, 1 when disabled
    pub fn multiplier(&self, magnitude: f32) -> f32 {
        if !self.enabled {
            return 1.0;
        }

        if self.max_value <= self.min_value {
            return if magnitude < self.min_value {
                self.min_opacity
            } else {
                self.max_opacity
            };
        }

        let t = ((magnitude - self.min_value) / (self.max_value - self.min_value)).clamp(0.0, 1.0);
        self.min_opacity + t * (self.max_opacity - self.min_opacity)
    }
}
