//! Module with helper functions
//! Saves repetition in unit tests

use nalgebra::{point, vector};

use crate::{
    camera::Camera,
    render::{RenderSettings, Scene},
    shading::{Light, MaterialProperty},
    transfer_function::{ColorTransferFunction, PiecewiseFunction, TransferFunction},
    volumetric::{DataType, ScalarArray, ScalarVolume, StructuredGrid, Volume},
};

/// Asserts floats are equal up to a small relative error
#[track_caller]
pub fn compare_float(actual: f32, expected: f32) {
    let err = f32::abs(actual - expected);
    let tolerance = 1e-4 * f32::max(expected.abs(), 1.0);
    assert!(err <= tolerance, "{actual} != {expected}");
}

/// 3x2x2 samples, values rise by 10 along x: 0, 10, 20.
/// Spacing `(1,2,4)`, origin `(1,1,1)`.
pub fn ramp_volume() -> ScalarVolume {
    let mut data = Vec::with_capacity(12);
    for _z in 0..2 {
        for _y in 0..2 {
            for x in 0..3 {
                data.push(x as f32 * 10.0);
            }
        }
    }
    ScalarVolume::new(
        vector![3, 2, 2],
        vector![1.0, 2.0, 4.0],
        point![1.0, 1.0, 1.0],
        "ramp",
        data,
    )
    .unwrap()
}

/// 5x5x5 samples of `value`, spacing 1, spanning `<0;4>` on every axis
pub fn uniform_volume(value: f32) -> ScalarVolume {
    ScalarVolume::new(
        vector![5, 5, 5],
        vector![1.0, 1.0, 1.0],
        point![0.0, 0.0, 0.0],
        "uniform",
        vec![value; 125],
    )
    .unwrap()
}

/// Pure red, constant `opacity` for every scalar
pub fn red_tf(opacity: f32) -> TransferFunction {
    TransferFunction::new(
        ColorTransferFunction::new(vec![(0.0, [1.0, 0.0, 0.0])]).unwrap(),
        PiecewiseFunction::new(vec![(0.0, opacity)]).unwrap(),
    )
}

pub fn unshaded_material(unit_distance: f32) -> MaterialProperty {
    MaterialProperty {
        shade: false,
        scalar_opacity_unit_distance: Some(unit_distance),
        ..Default::default()
    }
}

fn light_for(volume: &ScalarVolume) -> Light {
    let center = volume.get_bound_box().center();
    Light::scene_light(center + vector![0.0, -40.0, 1.0], center)
}

/// Uniform red volume, no shading
pub fn uniform_scene(opacity: f32, unit_distance: f32) -> Scene {
    let volume = uniform_volume(1.0);
    let light = light_for(&volume);
    Scene::new(volume, red_tf(opacity), unshaded_material(unit_distance), light).unwrap()
}

/// Uniform red volume with shading enabled, unit distance 1
pub fn uniform_scene_shaded(opacity: f32) -> Scene {
    let volume = uniform_volume(1.0);
    let light = light_for(&volume);
    let material = MaterialProperty {
        scalar_opacity_unit_distance: Some(1.0),
        ..Default::default()
    };
    Scene::new(volume, red_tf(opacity), material, light).unwrap()
}

/// Ramp volume, opacity and color both change with the scalar
pub fn ramp_scene() -> Scene {
    let volume = ramp_volume();
    let light = light_for(&volume);
    let tf = TransferFunction::new(
        ColorTransferFunction::new(vec![(0.0, [0.0, 0.0, 1.0]), (20.0, [1.0, 1.0, 0.0])])
            .unwrap(),
        PiecewiseFunction::new(vec![(0.0, 0.0), (20.0, 0.8)]).unwrap(),
    );
    Scene::new(volume, tf, unshaded_material(1.0), light).unwrap()
}

pub fn settings_with_step(step: f32) -> RenderSettings {
    RenderSettings::builder()
        .sample_distance(step)
        .build()
        .unwrap()
}

/// Camera looking at the volume along +z, fitted to its bounds
pub fn camera_looking_at<V: Volume>(volume: &V) -> Camera {
    let bounds = volume.get_bound_box();
    let center = bounds.center();
    let mut camera = Camera::new(center - vector![0.0, 0.0, 10.0], center, vector![0.0, 1.0, 0.0])
        .unwrap();
    camera.reset_camera(&bounds).unwrap();
    camera
}

/// Grid with one array of bytes, values `0..n`
pub fn byte_grid(dims: (usize, usize, usize)) -> StructuredGrid {
    let n = dims.0 * dims.1 * dims.2;
    StructuredGrid {
        dims: vector![dims.0, dims.1, dims.2],
        spacing: vector![1.0, 1.0, 1.0],
        origin: point![0.0, 0.0, 0.0],
        arrays: vec![ScalarArray {
            name: "bytes".into(),
            data_type: DataType::U8,
            values: (0..n).map(|v| (v % 256) as f32).collect(),
        }],
    }
}
