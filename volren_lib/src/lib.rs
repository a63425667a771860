/*
    volren_lib
    Author: Michal Majer
    Date: 2022-05-05
*/

//! Volume ray marching renderer.
//!
//! Scalar volumes are classified by piecewise linear transfer functions, shaded with
//! gradient normals and volumetric shadows, and composited along camera rays.
//! [`session::Session`] bundles a loaded volume with a [`premade::Preset`],
//! [`render::RendererFront`] runs rendering on a background thread.

pub mod camera;
pub mod color;
pub mod common;
pub mod error;
pub mod loading;
pub mod premade;
pub mod render;
pub mod session;
pub mod shading;
pub mod test_helpers;
pub mod transfer_function;
pub mod volumetric;

pub use error::{Error, Result};
pub use premade::Preset;
pub use session::Session;
