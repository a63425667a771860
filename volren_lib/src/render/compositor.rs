//! Marching a single ray through the volume.

use nalgebra::{vector, Point3, Unit, Vector3};

use super::{CompositeOrder, RenderSettings, Scene};
use crate::{
    color::{RGB, RGBA},
    common::Ray,
    shading::{correct_opacity, shade, shadow_transmittance, Interpolation, NormalSource, ShadingInput},
    volumetric::{gradient_at, gradient_of, normal_from_gradient, Volume},
};

/// Color and opacity gathered along a ray.
/// Color is premultiplied by opacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayResult {
    pub color: RGB,
    pub opacity: f32,
}

impl RayResult {
    pub fn zero() -> RayResult {
        RayResult {
            color: vector![0.0, 0.0, 0.0],
            opacity: 0.0,
        }
    }

    /// Composite over `background`
    pub fn over(&self, background: &RGB) -> RGBA {
        let c = self.color + background * (1.0 - self.opacity);
        vector![c.x, c.y, c.z, 1.0]
    }
}

/// Front to back accumulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accumulator {
    pub color: RGB,
    pub opacity: f32,
}

impl Accumulator {
    pub fn new() -> Accumulator {
        Accumulator::with(vector![0.0, 0.0, 0.0], 0.0)
    }

    /// Continue accumulation from a partial result
    pub fn with(color: RGB, opacity: f32) -> Accumulator {
        Accumulator { color, opacity }
    }

    /// `color += (1-A)*a*c; A += (1-A)*a`
    pub fn add_sample(&mut self, color: &RGB, alpha: f32) {
        let weight = (1.0 - self.opacity) * alpha;
        self.color += color * weight;
        self.opacity += weight;
    }

    pub fn result(&self) -> RayResult {
        RayResult {
            color: self.color,
            opacity: self.opacity,
        }
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// One shaded sample with opacity corrected for its segment
struct Sample {
    color: RGB,
    alpha: f32,
}

/// Marches `ray` between `t_min` and `t_max`, limited to the volume bounds.
///
/// Segments are `sample_distance` long, the last one is shortened to end exactly at
/// `t_max`. Each segment is sampled in its middle.
pub fn trace_ray<V>(
    scene: &Scene<V>,
    settings: &RenderSettings,
    ray: &Ray,
    t_min: f32,
    t_max: f32,
) -> RayResult
where
    V: Volume,
{
    let (t_min, t_max) = match scene.volume.intersect(ray) {
        Some((b0, b1)) => (t_min.max(b0), t_max.min(b1)),
        None => return RayResult::zero(),
    };

    let step = settings.sample_distance;
    if t_max.is_nan() || t_max <= t_min || step.is_nan() || step <= 0.0 {
        return RayResult::zero();
    }

    let n_of_segments = ((t_max - t_min) / step).ceil() as usize;

    let segment_sample = |i: usize| -> Option<Sample> {
        let t_start = t_min + i as f32 * step;
        let segment = step.min(t_max - t_start);
        if segment <= 0.0 {
            return None;
        }
        let pos = ray.point_from_t(t_start + 0.5 * segment);
        sample_segment(scene, settings, ray, pos, segment)
    };

    match settings.composite_order {
        CompositeOrder::FrontToBack => {
            let mut acc = Accumulator::new();
            for i in 0..n_of_segments {
                if let Some(sample) = segment_sample(i) {
                    acc.add_sample(&sample.color, sample.alpha);

                    if let Some(threshold) = settings.early_ray_termination {
                        if acc.opacity > threshold {
                            break;
                        }
                    }
                }
            }
            acc.result()
        }
        CompositeOrder::BackToFront => {
            let mut res = RayResult::zero();
            for i in (0..n_of_segments).rev() {
                if let Some(sample) = segment_sample(i) {
                    res.color = sample.color * sample.alpha + res.color * (1.0 - sample.alpha);
                    res.opacity = sample.alpha + res.opacity * (1.0 - sample.alpha);
                }
            }
            res
        }
    }
}

fn sample_segment<V>(
    scene: &Scene<V>,
    settings: &RenderSettings,
    ray: &Ray,
    pos: Point3<f32>,
    segment: f32,
) -> Option<Sample>
where
    V: Volume,
{
    let material = &scene.material;

    let scalar = match material.interpolation {
        Interpolation::Linear => scene.volume.sample_at(pos),
        Interpolation::Nearest => scene.volume.sample_nearest(pos),
    };

    let mut opacity = scene.transfer_function.opacity_at(scalar);
    if opacity <= 0.0 {
        return None;
    }
    let base = scene.transfer_function.color_at(scalar);

    let needs_scalar_gradient = material.gradient_opacity.enabled
        || (material.shade && material.normal_source == NormalSource::Scalars);
    let scalar_gradient = needs_scalar_gradient.then(|| gradient_at(&scene.volume, pos));

    if let Some(gradient) = &scalar_gradient {
        opacity *= material.gradient_opacity.multiplier(gradient.magnitude());
        if opacity <= 0.0 {
            return None;
        }
    }

    let color = if material.shade {
        let gradient = match material.normal_source {
            NormalSource::Scalars => scalar_gradient.unwrap_or_else(Vector3::zeros),
            NormalSource::Opacity => gradient_of(
                |p| scene.transfer_function.opacity_at(scene.volume.sample_at(p)),
                pos,
                scene.volume.get_spacing(),
            ),
        };
        shade_sample(scene, settings, ray, pos, base, &gradient)
    } else {
        base
    };

    Some(Sample {
        color,
        alpha: correct_opacity(opacity, segment, scene.unit_distance()),
    })
}

fn shade_sample<V>(
    scene: &Scene<V>,
    settings: &RenderSettings,
    ray: &Ray,
    pos: Point3<f32>,
    base: RGB,
    gradient: &Vector3<f32>,
) -> RGB
where
    V: Volume,
{
    let light = &scene.light;
    let to_eye = Unit::new_normalize(-ray.direction);
    let to_light = match light.direction_to_light(&pos) {
        Some(dir) => dir,
        // sample at the light position, lit head on
        None => to_eye,
    };

    let transmittance = if settings.casts_shadows() {
        let reach = settings.global_illumination_reach * scene.volume.get_bound_box().diagonal();
        let exit = scene
            .volume
            .intersect(&Ray::from_unit(pos, to_light))
            .map(|(_, t1)| t1)
            .unwrap_or(0.0);
        let max_distance = reach.min(exit).min(light.distance_to(&pos));

        shadow_transmittance(
            pos,
            &to_light,
            max_distance,
            settings.shadow_step(),
            scene.unit_distance(),
            |p| scene.opacity_at(p),
        )
    } else {
        1.0
    };

    let input = ShadingInput {
        base,
        normal: normal_from_gradient(gradient),
        to_light,
        to_eye,
        light,
        cone: light.cone_factor(&pos),
        material: &scene.material,
        transmittance,
        blending: settings.volumetric_scattering_blending,
        two_sided: settings.two_sided_lighting,
    };

    shade(&input)
}

#[cfg(test)]
mod test {

    use nalgebra::point;

    use super::*;
    use crate::test_helpers::*;

    // Crosses the uniform test volume along x, 4 units inside
    fn ray_through(volume_len: f32) -> (Ray, f32, f32) {
        let mid = 0.5 * volume_len;
        let ray = Ray::new(point![-5.0, mid, mid], vector![1.0, 0.0, 0.0]);
        (ray, 0.0, 1000.0)
    }

    #[test]
    fn no_op_law() {
        let mut acc = Accumulator::with(vector![0.3, 0.2, 0.1], 0.4);
        let before = acc;
        acc.add_sample(&vector![1.0, 1.0, 1.0], 0.0);
        assert_eq!(acc, before);

        // transparent volume adds nothing
        let scene = uniform_scene(0.0, 1.0);
        let settings = settings_with_step(0.5);
        let (ray, t0, t1) = ray_through(4.0);
        assert_eq!(trace_ray(&scene, &settings, &ray, t0, t1), RayResult::zero());
    }

    #[test]
    fn ray_missing_volume() {
        let scene = uniform_scene(0.5, 1.0);
        let settings = settings_with_step(0.5);
        let ray = Ray::new(point![-5.0, 50.0, 50.0], vector![1.0, 0.0, 0.0]);
        assert_eq!(trace_ray(&scene, &settings, &ray, 0.0, 1000.0), RayResult::zero());

        // empty interval
        let (ray, _, _) = ray_through(4.0);
        assert_eq!(trace_ray(&scene, &settings, &ray, 7.0, 6.0), RayResult::zero());
    }

    #[test]
    fn sampling_invariance() {
        // 4 units through uniform opacity 0.3 per unit
        let scene = uniform_scene(0.3, 1.0);
        let expected = 1.0 - 0.7f32.powf(4.0);

        for step in [0.1, 0.25, 0.3, 0.7, 1.0, 3.0] {
            let settings = RenderSettings::builder()
                .sample_distance(step)
                .early_ray_termination(false)
                .build()
                .unwrap();
            let (ray, t0, t1) = ray_through(4.0);
            let res = trace_ray(&scene, &settings, &ray, t0, t1);
            compare_float(res.opacity, expected);
        }
    }

    #[test]
    fn uniform_red() {
        let scene = uniform_scene(0.5, 1.0);
        let settings = settings_with_step(0.25);
        let (ray, t0, t1) = ray_through(4.0);
        let res = trace_ray(&scene, &settings, &ray, t0, t1);

        assert!(res.opacity > 0.9);
        compare_float(res.color.x, res.opacity);
        compare_float(res.color.y, 0.0);
        compare_float(res.color.z, 0.0);
    }

    #[test]
    fn uniform_red_grows_with_length() {
        let scene = uniform_scene(0.5, 1.0);
        let settings = RenderSettings::builder()
            .sample_distance(0.25)
            .early_ray_termination(false)
            .build()
            .unwrap();

        // Ray enters the volume at t = 5
        let (ray, _, _) = ray_through(4.0);
        let mut previous = 0.0;
        for length in [0.5, 1.0, 2.0, 4.0] {
            let res = trace_ray(&scene, &settings, &ray, 0.0, 5.0 + length);

            assert!(res.opacity > previous, "{length}: {} <= {previous}", res.opacity);
            assert!(res.opacity < 1.0);
            compare_float(res.opacity, 1.0 - 0.5f32.powf(length));
            compare_float(res.color.x, res.opacity);
            assert_eq!((res.color.y, res.color.z), (0.0, 0.0));
            previous = res.opacity;
        }
        assert!(1.0 - previous < 0.07);
    }

    #[test]
    fn early_termination() {
        let scene = uniform_scene(1.0, 1.0);
        let settings = settings_with_step(0.5);
        let (ray, t0, t1) = ray_through(4.0);
        let res = trace_ray(&scene, &settings, &ray, t0, t1);
        compare_float(res.opacity, 1.0);
    }

    #[test]
    fn back_to_front_matches() {
        let scene = ramp_scene();
        let ray = Ray::new(point![-5.0, 2.0, 3.0], vector![1.0, 0.0, 0.0]);
        let (t0, t1) = (0.0, 1000.0);

        let front = RenderSettings::builder()
            .sample_distance(0.05)
            .early_ray_termination(false)
            .build_unchecked();
        let back = RenderSettings {
            composite_order: CompositeOrder::BackToFront,
            ..front.clone()
        };

        let a = trace_ray(&scene, &front, &ray, t0, t1);
        let b = trace_ray(&scene, &back, &ray, t0, t1);
        compare_float(a.opacity, b.opacity);
        compare_float(a.color.x, b.color.x);
        compare_float(a.color.y, b.color.y);
    }

    #[test]
    fn shaded_uniform_keeps_base() {
        // Uniform field has no gradient, shading leaves the color
        let scene = uniform_scene_shaded(0.5);
        let settings = settings_with_step(0.25);
        let (ray, t0, t1) = ray_through(4.0);
        let res = trace_ray(&scene, &settings, &ray, t0, t1);

        compare_float(res.color.x, res.opacity);
        compare_float(res.color.y, 0.0);
    }

    #[test]
    fn result_over_background() {
        let res = RayResult {
            color: vector![0.5, 0.0, 0.0],
            opacity: 0.5,
        };
        let pixel = res.over(&vector![0.0, 0.0, 1.0]);
        assert_eq!(pixel, vector![0.5, 0.0, 0.5, 1.0]);
    }
}
