use nalgebra::Point3;

use super::{compositor::trace_ray, RenderSettings};
use crate::{
    camera::Camera,
    color,
    error::{Error, Result},
    shading::{Interpolation, Light, MaterialProperty},
    transfer_function::TransferFunction,
    volumetric::{ScalarVolume, Volume},
};

/// Immutable part of the rendered scene, shared by all render threads
pub struct Scene<V = ScalarVolume>
where
    V: Volume,
{
    pub volume: V,
    pub transfer_function: TransferFunction,
    pub material: MaterialProperty,
    pub light: Light,
    unit_distance: f32,
}

impl<V> Scene<V>
where
    V: Volume,
{
    /// Opacity unit distance is taken from the material, or `diagonal / max(dims)` of the volume.
    pub fn new(
        volume: V,
        transfer_function: TransferFunction,
        material: MaterialProperty,
        light: Light,
    ) -> Result<Scene<V>> {
        let unit_distance = match material.scalar_opacity_unit_distance {
            Some(d) => d,
            None => {
                let max_dim = volume.get_size().max().max(1) as f32;
                volume.get_bound_box().diagonal() / max_dim
            }
        };

        if !unit_distance.is_finite() || unit_distance <= 0.0 {
            return Err(Error::configuration(format!(
                "opacity unit distance {unit_distance} must be positive"
            )));
        }

        Ok(Scene {
            volume,
            transfer_function,
            material,
            light,
            unit_distance,
        })
    }

    pub fn unit_distance(&self) -> f32 {
        self.unit_distance
    }

    /// Classified opacity at world position, zero outside the volume
    pub fn opacity_at(&self, pos: Point3<f32>) -> f32 {
        if !self.volume.is_in(&pos) {
            return 0.0;
        }
        let scalar = match self.material.interpolation {
            Interpolation::Linear => self.volume.sample_at(pos),
            Interpolation::Nearest => self.volume.sample_nearest(pos),
        };
        self.transfer_function.opacity_at(scalar)
    }
}

/// RGBA8 image, row 0 is the top row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Framebuffer {
    pub fn new(resolution: (usize, usize)) -> Framebuffer {
        let (width, height) = resolution;
        Framebuffer {
            width,
            height,
            data: vec![0; width * height * 4],
        }
    }

    pub fn resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (x + y * self.width) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Change size, content is cleared if the size differs
    pub fn resize(&mut self, resolution: (usize, usize)) {
        if resolution != self.resolution() {
            *self = Framebuffer::new(resolution);
        }
    }
}

/// Renders the scene into `framebuffer` as seen by `camera`.
///
/// Image is split into horizontal bands, each rendered by its own thread.
/// Framebuffer is resized to the settings resolution.
pub fn render_frame<V>(
    scene: &Scene<V>,
    camera: &Camera,
    settings: &RenderSettings,
    framebuffer: &mut Framebuffer,
) -> Result<()>
where
    V: Volume + Sync,
{
    framebuffer.resize(settings.resolution);
    let (width, height) = settings.resolution;
    if width == 0 || height == 0 {
        return Ok(());
    }

    let n_of_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let band_rows = height.div_ceil(n_of_threads);
    let band_len = band_rows * width * 4;

    // Scope assures threads will be joined before exiting the scope
    let spawned = crossbeam::scope(|s| {
        let mut spawned = true;
        for (band_id, band) in framebuffer.data.chunks_mut(band_len).enumerate() {
            let res = s
                .builder()
                .name(format!("Band{band_id}"))
                .spawn(move |_| {
                    render_band(scene, camera, settings, band, band_id * band_rows);
                });
            if let Err(e) = res {
                tracing::error!("Could not spawn band thread {band_id}: {e}");
                spawned = false;
                break;
            }
        }
        spawned
    })
    .map_err(|_| Error::InvalidState("render thread panicked"))?;

    // A missing band would leave pixels of the previous frame
    if !spawned {
        return Err(Error::InvalidState("cannot spawn band thread"));
    }
    Ok(())
}

/// Renders rows starting at `first_row` into `band`
fn render_band<V>(
    scene: &Scene<V>,
    camera: &Camera,
    settings: &RenderSettings,
    band: &mut [u8],
    first_row: usize,
) where
    V: Volume,
{
    let (width, _) = settings.resolution;

    for (i, pixel) in band.chunks_exact_mut(4).enumerate() {
        let x = i % width;
        let y = first_row + i / width;

        let ray = camera.ray_for_pixel(x, y, settings.resolution);
        let (t_near, t_far) = camera.clip_interval(&ray);
        let result = trace_ray(scene, settings, &ray, t_near.max(0.0), t_far);

        pixel.copy_from_slice(&color::to_rgba8(result.over(&settings.background)));
    }
}

#[cfg(test)]
mod test {

    use nalgebra::{point, vector};

    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn unit_distance_default() {
        let scene = uniform_scene(0.5, 1.0);
        compare_float(scene.unit_distance(), 1.0);

        // 5x5x5 samples, spacing 1
        let scene = Scene::new(
            uniform_volume(1.0),
            red_tf(0.5),
            MaterialProperty::default(),
            Light::scene_light(point![0.0, 0.0, 0.0], point![1.0, 1.0, 1.0]),
        )
        .unwrap();
        compare_float(scene.unit_distance(), 48f32.sqrt() / 5.0);
    }

    #[test]
    fn opacity_outside_is_zero() {
        let scene = uniform_scene(0.5, 1.0);
        compare_float(scene.opacity_at(point![2.0, 2.0, 2.0]), 0.5);
        compare_float(scene.opacity_at(point![-2.0, 2.0, 2.0]), 0.0);
    }

    #[test]
    fn every_band_overwrites_old_pixels() {
        let scene = uniform_scene(0.0, 1.0);
        let camera = camera_looking_at(&scene.volume);
        let settings = RenderSettings::builder()
            .resolution((5, 37))
            .background(vector![0.0, 1.0, 0.0])
            .build()
            .unwrap();

        let mut fb = Framebuffer::new((5, 37));
        fb.data.fill(7);
        render_frame(&scene, &camera, &settings, &mut fb).unwrap();

        for y in 0..37 {
            for x in 0..5 {
                assert_eq!(fb.pixel(x, y), [0, 255, 0, 255], "pixel {x} {y}");
            }
        }
    }

    #[test]
    fn empty_scene_shows_background() {
        let scene = uniform_scene(0.0, 1.0);
        let camera = camera_looking_at(&scene.volume);
        let settings = RenderSettings::builder()
            .resolution((8, 6))
            .background(vector![0.0, 0.0, 1.0])
            .build()
            .unwrap();

        let mut fb = Framebuffer::new((1, 1));
        render_frame(&scene, &camera, &settings, &mut fb).unwrap();

        assert_eq!(fb.resolution(), (8, 6));
        for y in 0..6 {
            for x in 0..8 {
                assert_eq!(fb.pixel(x, y), [0, 0, 255, 255]);
            }
        }
    }

    #[test]
    fn framebuffer_resize() {
        let mut fb = Framebuffer::new((2, 2));
        assert_eq!(fb.as_bytes().len(), 16);
        fb.resize((3, 1));
        assert_eq!(fb.width(), 3);
        assert_eq!(fb.height(), 1);
        assert_eq!(fb.into_bytes().len(), 12);
    }
}
