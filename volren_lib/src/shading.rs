//! Local illumination of volume samples.
//!
//! Each sample mixes two terms:
//! * surface: Phong style ambient, diffuse and specular with the gradient as normal
//! * volumetric: ambient plus light attenuated by the volume between sample and light
//!
//! The `blending` parameter moves between them, 0 is pure surface shading.

use nalgebra::{vector, Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use crate::{color::RGB, volumetric::GradientOpacity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightKind {
    /// Point (or spot) light at `position`
    Positional,
    /// Parallel rays from `position` towards `focal_point`
    Directional,
}

/// Single scene light.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub position: Point3<f32>,
    pub focal_point: Point3<f32>,
    pub kind: LightKind,
    pub color: RGB,
    pub intensity: f32,
    /// Spot cone half angle in degrees, 90 and more means no cone
    pub cone_angle: f32,
    /// Spot falloff exponent
    pub exponent: f32,
}

impl Light {
    /// White positional light without a cone
    pub fn scene_light(position: Point3<f32>, focal_point: Point3<f32>) -> Light {
        Light {
            position,
            focal_point,
            kind: LightKind::Positional,
            color: vector![1.0, 1.0, 1.0],
            intensity: 1.0,
            cone_angle: 90.0,
            exponent: 1.0,
        }
    }

    /// Unit direction from `pos` towards the light.
    /// `None` if the sample lies at the light position.
    pub fn direction_to_light(&self, pos: &Point3<f32>) -> Option<Unit<Vector3<f32>>> {
        let dir = match self.kind {
            LightKind::Positional => self.position - pos,
            LightKind::Directional => self.position - self.focal_point,
        };
        Unit::try_new(dir, f32::EPSILON)
    }

    /// Distance the light travels to `pos`, infinite for directional lights
    pub fn distance_to(&self, pos: &Point3<f32>) -> f32 {
        match self.kind {
            LightKind::Positional => (self.position - pos).magnitude(),
            LightKind::Directional => f32::INFINITY,
        }
    }

    /// Spot attenuation at `pos`, 1 when the light has no cone
    pub fn cone_factor(&self, pos: &Point3<f32>) -> f32 {
        if self.kind == LightKind::Directional || self.cone_angle >= 90.0 {
            return 1.0;
        }

        let axis = match Unit::try_new(self.focal_point - self.position, f32::EPSILON) {
            Some(axis) => axis,
            None => return 1.0,
        };
        let to_pos = match Unit::try_new(pos - self.position, f32::EPSILON) {
            Some(dir) => dir,
            None => return 1.0,
        };

        let cos_angle = axis.dot(&to_pos);
        if cos_angle < self.cone_angle.to_radians().cos() {
            0.0
        } else {
            cos_angle.powf(self.exponent)
        }
    }

    /// Color scaled by intensity
    pub fn radiance(&self) -> RGB {
        self.color * self.intensity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    Nearest,
    Linear,
}

/// Field the normals are derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalSource {
    Scalars,
    /// Gradient of opacity after classification
    Opacity,
}

/// Optical properties of the volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialProperty {
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub specular_power: f32,
    /// Without shading, samples keep their transfer function color
    pub shade: bool,
    pub interpolation: Interpolation,
    pub normal_source: NormalSource,
    /// World distance for which the transfer function opacity is defined.
    /// `None` takes the volume default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scalar_opacity_unit_distance: Option<f32>,
    pub gradient_opacity: GradientOpacity,
}

impl Default for MaterialProperty {
    fn default() -> Self {
        Self {
            ambient: 0.1,
            diffuse: 0.9,
            specular: 0.2,
            specular_power: 10.0,
            shade: true,
            interpolation: Interpolation::Linear,
            normal_source: NormalSource::Scalars,
            gradient_opacity: GradientOpacity::default(),
            scalar_opacity_unit_distance: None,
        }
    }
}

/// Everything needed to shade a single sample
pub struct ShadingInput<'a> {
    /// Transfer function color
    pub base: RGB,
    pub normal: Option<Unit<Vector3<f32>>>,
    pub to_light: Unit<Vector3<f32>>,
    pub to_eye: Unit<Vector3<f32>>,
    pub light: &'a Light,
    /// Spot attenuation for this sample
    pub cone: f32,
    pub material: &'a MaterialProperty,
    /// Fraction of light reaching the sample
    pub transmittance: f32,
    /// Volumetric scattering blending, `<0;1>`
    pub blending: f32,
    pub two_sided: bool,
}

/// Shaded color of a sample
pub fn shade(input: &ShadingInput) -> RGB {
    let material = input.material;
    if !material.shade {
        return input.base;
    }

    let light = input.light.radiance() * input.cone;
    let ambient = Vector3::repeat(material.ambient);

    let surface = match input.normal {
        Some(normal) => surface_term(input, &normal, &light, &ambient),
        None => input.base,
    };

    if input.blending <= 0.0 {
        return surface;
    }

    let volumetric = input
        .base
        .component_mul(&(ambient + light * input.transmittance));

    surface.lerp(&volumetric, input.blending.min(1.0))
}

fn surface_term(
    input: &ShadingInput,
    normal: &Unit<Vector3<f32>>,
    light: &RGB,
    ambient: &RGB,
) -> RGB {
    let material = input.material;
    let facing = |cos: f32| {
        if input.two_sided {
            cos.abs()
        } else {
            cos.max(0.0)
        }
    };

    let n_dot_l = facing(normal.dot(&input.to_light));
    let diffuse = light * (material.diffuse * n_dot_l);
    let mut color = input.base.component_mul(&(ambient + diffuse));

    if material.specular > 0.0 {
        let half = Unit::try_new(input.to_light.as_ref() + input.to_eye.as_ref(), f32::EPSILON);
        if let Some(half) = half {
            let n_dot_h = facing(normal.dot(&half));
            color += light * (material.specular * n_dot_h.powf(material.specular_power));
        }
    }

    color
}

/// Fraction of light that reaches `start` through the volume.
///
/// Marches from `start` along `to_light` for `max_distance` in steps of `step`,
/// attenuating by the opacity field. Opacity is corrected for the step length
/// the same way as in the compositor.
pub fn shadow_transmittance<F>(
    start: Point3<f32>,
    to_light: &Unit<Vector3<f32>>,
    max_distance: f32,
    step: f32,
    unit_distance: f32,
    opacity_at: F,
) -> f32
where
    F: Fn(Point3<f32>) -> f32,
{
    if !max_distance.is_finite() || max_distance <= 0.0 || step.is_nan() || step <= 0.0 {
        return 1.0;
    }

    let n_of_segments = (max_distance / step).ceil() as usize;

    let mut transmittance = 1.0;
    for i in 0..n_of_segments {
        let t = i as f32 * step;
        let segment = step.min(max_distance - t);
        if segment <= 0.0 {
            break;
        }
        let pos = start + to_light.as_ref() * (t + 0.5 * segment);

        let opacity = opacity_at(pos);
        if opacity > 0.0 {
            let corrected = correct_opacity(opacity, segment, unit_distance);
            transmittance *= 1.0 - corrected;
            if transmittance < 0.005 {
                return 0.0;
            }
        }
    }
    transmittance
}

/// Opacity of a segment of length `segment`, given opacity defined per `unit_distance`.
pub fn correct_opacity(opacity: f32, segment: f32, unit_distance: f32) -> f32 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity >= 1.0 {
        return 1.0;
    }
    1.0 - (1.0 - opacity).powf(segment / unit_distance)
}

#[cfg(test)]
mod test {

    use nalgebra::point;

    use super::*;
    use crate::test_helpers::*;

    fn material() -> MaterialProperty {
        MaterialProperty {
            ambient: 0.2,
            diffuse: 0.5,
            specular: 0.0,
            specular_power: 0.0,
            ..Default::default()
        }
    }

    fn input<'a>(
        material: &'a MaterialProperty,
        light: &'a Light,
        normal: Option<Unit<Vector3<f32>>>,
    ) -> ShadingInput<'a> {
        ShadingInput {
            base: vector![1.0, 0.5, 0.0],
            normal,
            to_light: Vector3::z_axis(),
            to_eye: Vector3::z_axis(),
            light,
            cone: 1.0,
            material,
            transmittance: 1.0,
            blending: 0.0,
            two_sided: false,
        }
    }

    #[test]
    fn diffuse_facing_light() {
        let material = material();
        let light = Light::scene_light(point![0.0, 0.0, 10.0], point![0.0, 0.0, 0.0]);
        let color = shade(&input(&material, &light, Some(Vector3::z_axis())));

        // ambient 0.2 + diffuse 0.5
        compare_float(color.x, 0.7);
        compare_float(color.y, 0.35);
        compare_float(color.z, 0.0);
    }

    #[test]
    fn back_facing_only_ambient() {
        let material = material();
        let light = Light::scene_light(point![0.0, 0.0, 10.0], point![0.0, 0.0, 0.0]);
        let normal = Some(-Vector3::z_axis());

        let color = shade(&input(&material, &light, normal));
        compare_float(color.x, 0.2);

        let mut two_sided = input(&material, &light, normal);
        two_sided.two_sided = true;
        compare_float(shade(&two_sided).x, 0.7);
    }

    #[test]
    fn no_normal_keeps_base() {
        let material = material();
        let light = Light::scene_light(point![0.0, 0.0, 10.0], point![0.0, 0.0, 0.0]);
        let color = shade(&input(&material, &light, None));
        assert_eq!(color, vector![1.0, 0.5, 0.0]);
    }

    #[test]
    fn volumetric_blend() {
        let material = material();
        let light = Light::scene_light(point![0.0, 0.0, 10.0], point![0.0, 0.0, 0.0]);
        let mut inp = input(&material, &light, Some(Vector3::z_axis()));
        inp.blending = 1.0;
        inp.transmittance = 0.5;

        // ambient 0.2 + transmittance 0.5
        compare_float(shade(&inp).x, 0.7);

        inp.transmittance = 0.0;
        compare_float(shade(&inp).x, 0.2);
    }

    #[test]
    fn spot_cone() {
        let mut light = Light::scene_light(point![0.0, 0.0, 0.0], point![0.0, 0.0, 1.0]);
        compare_float(light.cone_factor(&point![5.0, 0.0, 0.1]), 1.0);

        light.cone_angle = 30.0;
        compare_float(light.cone_factor(&point![0.0, 0.0, 5.0]), 1.0);
        compare_float(light.cone_factor(&point![5.0, 0.0, 0.1]), 0.0);
    }

    #[test]
    fn transmittance_through_uniform() {
        // opacity 0.5 per unit, 2 units of material
        let t = shadow_transmittance(
            point![0.0, 0.0, 0.0],
            &Vector3::x_axis(),
            2.0,
            0.3,
            1.0,
            |_| 0.5,
        );
        compare_float(t, 0.25);

        let none = shadow_transmittance(point![0.0, 0.0, 0.0], &Vector3::x_axis(), 0.0, 0.3, 1.0, |_| 0.5);
        compare_float(none, 1.0);
    }

    #[test]
    fn transmittance_far_light_terminates() {
        // Past 2^24 adding 1.0 no longer changes an f32
        let t = shadow_transmittance(
            point![0.0, 0.0, 0.0],
            &Vector3::x_axis(),
            2.0e7,
            1.0,
            1.0,
            |_| 0.0,
        );
        compare_float(t, 1.0);
    }

    #[test]
    fn opacity_correction() {
        compare_float(correct_opacity(0.5, 1.0, 1.0), 0.5);
        compare_float(correct_opacity(0.5, 2.0, 1.0), 0.75);
        compare_float(correct_opacity(1.0, 0.1, 1.0), 1.0);
        compare_float(correct_opacity(0.0, 3.0, 1.0), 0.0);
    }
}
