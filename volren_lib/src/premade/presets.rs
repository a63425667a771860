/*
    volren_lib
    Author: Michal Majer
    Date: 2022-05-05
*/

//! Scene parameters of the two demo datasets.
//!
//! Light and camera are given as offsets from the volume center, so a preset
//! works for any volume of similar content.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    render::AnimationPlan,
    shading::{Interpolation, MaterialProperty, NormalSource},
    transfer_function::{ColorTransferFunction, PiecewiseFunction, TransferFunction},
    volumetric::GradientOpacity,
};

/// Camera pose relative to the volume center
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraPreset {
    /// Position is `center + offset`, focal point is the center
    pub offset: [f32; 3],
    pub view_up: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightPreset {
    /// Position is `center + offset`, light points at the center
    pub offset: [f32; 3],
    #[serde(default = "unit_intensity")]
    pub intensity: f32,
}

fn unit_intensity() -> f32 {
    1.0
}

/// Session render settings of a preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderPreset {
    pub resolution: (usize, usize),
    /// Sample distance is `factor * |spacing| / 2`
    pub sample_distance_factor: f32,
    pub global_illumination_reach: f32,
    pub volumetric_scattering_blending: f32,
    pub shadow_sampling_distance_factor: f32,
    pub two_sided_lighting: bool,
    /// Early ray termination threshold, termination is off when missing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub early_ray_termination: Option<f32>,
    pub background: [f32; 3],
}

impl Default for RenderPreset {
    fn default() -> Self {
        Self {
            resolution: (500, 500),
            sample_distance_factor: 0.7,
            global_illumination_reach: 0.0,
            volumetric_scattering_blending: 0.0,
            shadow_sampling_distance_factor: 1.0,
            two_sided_lighting: false,
            early_ray_termination: Some(crate::render::DEFAULT_TERMINATION),
            background: [0.0, 0.0, 0.0],
        }
    }
}

/// Everything a session needs besides the volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    /// Scalar array to render, first array when missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array: Option<String>,
    pub render: RenderPreset,
    pub camera: CameraPreset,
    pub light: LightPreset,
    pub material: MaterialProperty,
    pub transfer_function: TransferFunction,
    #[serde(default)]
    pub animation: AnimationPlan,
}

impl Preset {
    /// Chest CT in Hounsfield units, bone and soft tissue bands
    pub fn chest_ct() -> Preset {
        let opacity = PiecewiseFunction::from_points_unchecked(vec![
            (-1024.0, 0.0),
            (67.4682, 0.0),
            (67.469, 0.65),
            (85.0, 0.65),
            (85.0031, 0.0),
            (200.0031, 0.0),
            (200.2970, 0.626),
            (408.2970, 0.626),
            (3532.0, 0.556),
        ]);
        let color = ColorTransferFunction::from_points_unchecked(vec![
            (-1024.0, [0.937254, 0.937254, 0.937254]),
            (4.0927, [0.709019, 0.337254, 0.262745]),
            (98.8057, [0.601372, 0.290196, 0.247058]),
            (100.0, [0.881, 0.836078, 0.773333]),
            (1000.0, [0.881, 0.836078, 0.773333]),
            (3532.0, [0.91, 0.826078, 0.783333]),
        ]);

        Preset {
            name: "chest_ct".into(),
            array: None,
            render: RenderPreset {
                global_illumination_reach: 1.0,
                volumetric_scattering_blending: 1.0,
                ..Default::default()
            },
            camera: CameraPreset {
                offset: [0.0, -1000.0, 10.0],
                view_up: [0.0, 0.0, 1.0],
            },
            light: LightPreset {
                offset: [0.0, -400.0, 10.0],
                intensity: 1.0,
            },
            material: demo_material(NormalSource::Scalars),
            transfer_function: TransferFunction::new(color, opacity),
            animation: AnimationPlan::default(),
        }
    }

    /// 3D ultrasound of a fetus, 8 bit samples
    pub fn fetal_ultrasound() -> Preset {
        let opacity = PiecewiseFunction::from_points_unchecked(vec![
            (0.0, 0.0),
            (15.7754, 0.0),
            (29.662, 0.510938),
            (33.2502, 0.111328),
            (55.4967, 0.205078),
            (82.049, 0.0),
            (101.425, 0.505859),
            (150.941, 0.55859),
            (254.993, 0.0),
        ]);
        let color = ColorTransferFunction::from_points_unchecked(vec![
            (0.0, [0.0, 0.0, 0.0]),
            (13.4479, [0.901961, 0.0, 0.0]),
            (39.8265, [0.901961, 0.564706, 0.0]),
            (188.066, [1.0, 1.0, 0.745098]),
            (254.993, [1.0, 1.0, 1.0]),
        ]);

        Preset {
            name: "fetal_ultrasound".into(),
            array: None,
            render: RenderPreset {
                global_illumination_reach: 0.1,
                volumetric_scattering_blending: 0.5,
                ..Default::default()
            },
            camera: CameraPreset {
                offset: [0.0, 0.0, -450.0],
                view_up: [1.0, 0.0, 0.0],
            },
            light: LightPreset {
                offset: [0.0, 0.0, -100.0],
                intensity: 1.0,
            },
            material: demo_material(NormalSource::Opacity),
            transfer_function: TransferFunction::new(color, opacity),
            animation: AnimationPlan::default(),
        }
    }

    /// Looks up a built-in preset
    pub fn by_name(name: &str) -> Option<Preset> {
        match name {
            "chest_ct" | "chest" => Some(Preset::chest_ct()),
            "fetal_ultrasound" | "fetus" => Some(Preset::fetal_ultrasound()),
            _ => None,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Preset> {
        toml::from_str(text).map_err(|e| Error::configuration(format!("preset: {e}")))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::configuration(format!("preset: {e}")))
    }

    pub fn from_file<P>(path: P) -> Result<Preset>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path.as_ref())?;
        tracing::info!("Preset loaded from {}", path.as_ref().display());
        Preset::from_toml_str(&text)
    }
}

/// Both demos: diffuse only, shaded, linear interpolation
fn demo_material(normal_source: NormalSource) -> MaterialProperty {
    MaterialProperty {
        ambient: 0.0,
        diffuse: 3.0,
        specular: 0.0,
        specular_power: 0.0,
        shade: true,
        interpolation: Interpolation::Linear,
        normal_source,
        scalar_opacity_unit_distance: None,
        gradient_opacity: GradientOpacity::default(),
    }
}
