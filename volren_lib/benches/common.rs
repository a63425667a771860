pub use criterion::Criterion;

pub use nalgebra::{point, vector};
pub use volren_lib::{
    premade::Preset, render::Framebuffer, session::Session, volumetric::ScalarVolume,
};

pub const RESOLUTION: (usize, usize) = (256, 256);
pub const SIDE: usize = 64;

/// Sphere of dense material in 8 bit range, soft edge
pub fn sphere_volume() -> ScalarVolume {
    let mut data = Vec::with_capacity(SIDE * SIDE * SIDE);
    let c = (SIDE - 1) as f32 / 2.0;
    for z in 0..SIDE {
        for y in 0..SIDE {
            for x in 0..SIDE {
                let d = vector![x as f32 - c, y as f32 - c, z as f32 - c].magnitude();
                let v = (255.0 * (1.0 - d / c)).clamp(0.0, 255.0);
                data.push(v);
            }
        }
    }
    ScalarVolume::new(
        vector![SIDE, SIDE, SIDE],
        vector![1.0, 1.0, 1.0],
        point![0.0, 0.0, 0.0],
        "sphere",
        data,
    )
    .unwrap()
}

/// Fetal ultrasound preset scaled to the sphere volume
pub fn bench_preset(shadows: bool) -> Preset {
    let mut preset = Preset::fetal_ultrasound();
    preset.render.resolution = RESOLUTION;
    preset.camera.offset = [0.0, 0.0, -150.0];
    preset.light.offset = [0.0, 0.0, -40.0];
    if !shadows {
        preset.render.global_illumination_reach = 0.0;
    }
    preset
}

pub fn bench_session(shadows: bool, early_termination: bool) -> Session {
    let mut preset = bench_preset(shadows);
    if !early_termination {
        preset.render.early_ray_termination = None;
    }
    Session::new(sphere_volume(), &preset).unwrap()
}
