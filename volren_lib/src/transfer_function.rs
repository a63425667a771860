/*
    volren_lib
    Author: Michal Majer
    Date: 2022-05-05
*/

//! Piecewise linear transfer functions.
//!
//! Scalars outside of the point range take the value of the nearest boundary point.
//! Two points very close to each other carve a sharp band.

use nalgebra::vector;
use serde::{Deserialize, Serialize};

use crate::{
    color::{RGB, RGBA},
    error::{Error, Result},
};

/// Scalar to opacity mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f32, f32)>", into = "Vec<(f32, f32)>")]
pub struct PiecewiseFunction {
    points: Vec<(f32, f32)>,
}

impl PiecewiseFunction {
    /// Points are `(scalar, opacity)`, scalars strictly increasing, opacities in `<0;1>`
    pub fn new(points: Vec<(f32, f32)>) -> Result<PiecewiseFunction> {
        check_scalars(points.iter().map(|p| p.0))?;
        if let Some((x, a)) = points
            .iter()
            .find(|(_, a)| !a.is_finite() || !(0.0..=1.0).contains(a))
        {
            return Err(Error::configuration(format!(
                "opacity {a} at scalar {x} outside of <0;1>"
            )));
        }
        Ok(PiecewiseFunction { points })
    }

    /// Built-in tables, points are not checked
    pub(crate) fn from_points_unchecked(points: Vec<(f32, f32)>) -> PiecewiseFunction {
        PiecewiseFunction { points }
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }

    pub fn value_at(&self, scalar: f32) -> f32 {
        match bracket(&self.points, |p| p.0, scalar) {
            Bracket::Single(i) => self.points[i].1,
            Bracket::Between(i, t) => lerp(self.points[i].1, self.points[i + 1].1, t),
        }
    }
}

impl TryFrom<Vec<(f32, f32)>> for PiecewiseFunction {
    type Error = Error;

    fn try_from(points: Vec<(f32, f32)>) -> Result<Self> {
        PiecewiseFunction::new(points)
    }
}

impl From<PiecewiseFunction> for Vec<(f32, f32)> {
    fn from(f: PiecewiseFunction) -> Self {
        f.points
    }
}

/// Scalar to RGB mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f32, [f32; 3])>", into = "Vec<(f32, [f32; 3])>")]
pub struct ColorTransferFunction {
    points: Vec<(f32, [f32; 3])>,
}

impl ColorTransferFunction {
    /// Points are `(scalar, [r, g, b])`, scalars strictly increasing, channels in `<0;1>`
    pub fn new(points: Vec<(f32, [f32; 3])>) -> Result<ColorTransferFunction> {
        check_scalars(points.iter().map(|p| p.0))?;
        if let Some((x, c)) = points
            .iter()
            .find(|(_, c)| c.iter().any(|v| !v.is_finite() || !(0.0..=1.0).contains(v)))
        {
            return Err(Error::configuration(format!(
                "color {c:?} at scalar {x} outside of <0;1>"
            )));
        }
        Ok(ColorTransferFunction { points })
    }

    pub(crate) fn from_points_unchecked(points: Vec<(f32, [f32; 3])>) -> ColorTransferFunction {
        ColorTransferFunction { points }
    }

    pub fn points(&self) -> &[(f32, [f32; 3])] {
        &self.points
    }

    pub fn color_at(&self, scalar: f32) -> RGB {
        let rgb = |i: usize| {
            let c = self.points[i].1;
            vector![c[0], c[1], c[2]]
        };
        match bracket(&self.points, |p| p.0, scalar) {
            Bracket::Single(i) => rgb(i),
            Bracket::Between(i, t) => rgb(i).lerp(&rgb(i + 1), t),
        }
    }
}

impl TryFrom<Vec<(f32, [f32; 3])>> for ColorTransferFunction {
    type Error = Error;

    fn try_from(points: Vec<(f32, [f32; 3])>) -> Result<Self> {
        ColorTransferFunction::new(points)
    }
}

impl From<ColorTransferFunction> for Vec<(f32, [f32; 3])> {
    fn from(f: ColorTransferFunction) -> Self {
        f.points
    }
}

/// Color and opacity transfer function pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferFunction {
    pub color: ColorTransferFunction,
    pub opacity: PiecewiseFunction,
}

impl TransferFunction {
    pub fn new(color: ColorTransferFunction, opacity: PiecewiseFunction) -> TransferFunction {
        TransferFunction { color, opacity }
    }

    pub fn color_at(&self, scalar: f32) -> RGB {
        self.color.color_at(scalar)
    }

    pub fn opacity_at(&self, scalar: f32) -> f32 {
        self.opacity.value_at(scalar)
    }

    /// Color with opacity in the last channel
    pub fn classify(&self, scalar: f32) -> RGBA {
        let c = self.color_at(scalar);
        vector![c.x, c.y, c.z, self.opacity_at(scalar)]
    }
}

fn check_scalars(scalars: impl Iterator<Item = f32>) -> Result<()> {
    let mut prev: Option<f32> = None;
    let mut n = 0;
    for x in scalars {
        if !x.is_finite() {
            return Err(Error::configuration(format!("scalar {x} is not finite")));
        }
        if let Some(p) = prev {
            if x <= p {
                return Err(Error::configuration(format!(
                    "scalars not strictly increasing ({p} then {x})"
                )));
            }
        }
        prev = Some(x);
        n += 1;
    }
    if n == 0 {
        return Err(Error::configuration("transfer function has no points"));
    }
    Ok(())
}

enum Bracket {
    Single(usize),
    // index of the lower point and interpolation parameter
    Between(usize, f32),
}

fn bracket<T>(points: &[T], x: impl Fn(&T) -> f32, scalar: f32) -> Bracket {
    let last = points.len() - 1;
    if scalar.is_nan() || scalar <= x(&points[0]) {
        return Bracket::Single(0);
    }
    if scalar >= x(&points[last]) {
        return Bracket::Single(last);
    }

    // first index with x > scalar, lies in 1..=last
    let upper = points.partition_point(|p| x(p) <= scalar);
    let lower = upper - 1;
    let (x0, x1) = (x(&points[lower]), x(&points[upper]));
    Bracket::Between(lower, (scalar - x0) / (x1 - x0))
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
