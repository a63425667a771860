/*
    volren_lib
    Author: Michal Majer
    Date: 2022-05-05
*/

//! Colors are stored as floating point channels in range `<0;1>`.

use nalgebra::{Vector3, Vector4};

pub type RGB = Vector3<f32>;
pub type RGBA = Vector4<f32>;

/// Convert a channel in range `<0;1>` to a byte, clamping out of range values
pub fn channel_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Convert a color to 8 bit RGBA pixel
pub fn to_rgba8(color: RGBA) -> [u8; 4] {
    [
        channel_to_u8(color.x),
        channel_to_u8(color.y),
        channel_to_u8(color.z),
        channel_to_u8(color.w),
    ]
}

#[cfg(test)]
mod test {

    use nalgebra::vector;

    use super::*;

    #[test]
    fn channel_conversion_clamps() {
        assert_eq!(channel_to_u8(-0.5), 0);
        assert_eq!(channel_to_u8(0.0), 0);
        assert_eq!(channel_to_u8(1.0), 255);
        assert_eq!(channel_to_u8(3.0), 255);
        assert_eq!(to_rgba8(vector![1.0, 0.0, 0.5, 1.0]), [255, 0, 128, 255]);
    }
}
