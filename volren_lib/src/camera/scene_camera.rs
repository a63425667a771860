/*
    volren_lib
    Author: Michal Majer
    Date: 2022-05-05
*/

use nalgebra::{vector, Point3, Rotation3, Unit, Vector2, Vector3};

use crate::{
    common::{BoundBox, Ray},
    error::{Error, Result},
};

/// Default vertical view angle in degrees
pub const DEFAULT_VIEW_ANGLE: f32 = 30.0;

/// Camera orbiting a focal point.
///
/// Pixel `[0,0]` is the upper left corner, in line with buffer convention.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Position of the camera in world coordinates
    position: Point3<f32>,
    /// Point the camera looks at, center of rotations
    focal_point: Point3<f32>,
    /// Requested up direction, not necessarily orthogonal to view direction
    view_up: Vector3<f32>,
    /// Vertical view angle in degrees
    view_angle: f32,
    parallel: bool,
    /// Half of the viewport height in world units, parallel projection only
    parallel_scale: f32,
    clipping_range: (f32, f32),
    /// Unit direction of camera
    direction: Vector3<f32>,
    /// Unit right direction from the camera's perspective
    right: Vector3<f32>,
    /// Unit up direction, orthogonal to `direction`
    up: Vector3<f32>,
    /// Size of image plane at distance 1, for aspect ratio 1
    img_plane_size: Vector2<f32>,
    /// Horizontal span of the image plane
    du: Vector3<f32>,
    /// Vertical span of the image plane, pointing down
    dv: Vector3<f32>,
}

impl Camera {
    /// Construct new camera looking from `position` at `focal_point`.
    ///
    /// Fails if the points coincide or `view_up` is parallel to the view direction.
    pub fn new(
        position: Point3<f32>,
        focal_point: Point3<f32>,
        view_up: Vector3<f32>,
    ) -> Result<Camera> {
        let mut camera = Camera {
            position,
            focal_point,
            view_up,
            view_angle: DEFAULT_VIEW_ANGLE,
            parallel: false,
            parallel_scale: 1.0,
            clipping_range: (0.01, 1000.01),
            direction: vector![0.0, 0.0, -1.0],
            right: vector![1.0, 0.0, 0.0],
            up: vector![0.0, 1.0, 0.0],
            img_plane_size: vector![1.0, 1.0],
            du: vector![1.0, 0.0, 0.0],
            dv: vector![0.0, -1.0, 0.0],
        };

        camera.recalc_plane_size();
        camera.recalc_plane()?;
        Ok(camera)
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn focal_point(&self) -> Point3<f32> {
        self.focal_point
    }

    pub fn view_up(&self) -> Vector3<f32> {
        self.view_up
    }

    /// Unit view direction
    pub fn direction(&self) -> Vector3<f32> {
        self.direction
    }

    /// Unit up direction of the image plane
    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    pub fn view_angle(&self) -> f32 {
        self.view_angle
    }

    pub fn clipping_range(&self) -> (f32, f32) {
        self.clipping_range
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn parallel_scale(&self) -> f32 {
        self.parallel_scale
    }

    /// Distance between position and focal point
    pub fn distance(&self) -> f32 {
        (self.focal_point - self.position).magnitude()
    }

    pub fn set_position(&mut self, position: Point3<f32>) -> Result<()> {
        let old = self.position;
        self.position = position;
        self.recalc_plane().map_err(|e| {
            self.position = old;
            e
        })
    }

    pub fn set_focal_point(&mut self, focal_point: Point3<f32>) -> Result<()> {
        let old = self.focal_point;
        self.focal_point = focal_point;
        self.recalc_plane().map_err(|e| {
            self.focal_point = old;
            e
        })
    }

    pub fn set_view_up(&mut self, view_up: Vector3<f32>) -> Result<()> {
        let old = self.view_up;
        self.view_up = view_up;
        self.recalc_plane().map_err(|e| {
            self.view_up = old;
            e
        })
    }

    /// Change vertical view angle, in degrees
    pub fn set_view_angle(&mut self, view_angle: f32) -> Result<()> {
        if !(view_angle > 0.0 && view_angle < 180.0) {
            return Err(Error::configuration(format!(
                "view angle {view_angle} outside of (0;180)"
            )));
        }
        self.view_angle = view_angle;
        self.recalc_plane_size();
        self.recalc_dudv();
        Ok(())
    }

    pub fn set_parallel_projection(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    pub fn set_parallel_scale(&mut self, scale: f32) {
        self.parallel_scale = scale;
    }

    pub fn set_clipping_range(&mut self, near: f32, far: f32) -> Result<()> {
        if !(near > 0.0 && near < far) {
            return Err(Error::configuration(format!(
                "clipping range ({near}, {far}) must satisfy 0 < near < far"
            )));
        }
        self.clipping_range = (near, far);
        Ok(())
    }

    /// Rotate the camera about the view up vector centered at the focal point.
    pub fn azimuth(&mut self, angle_deg: f32) {
        if let Some(axis) = Unit::try_new(self.view_up, f32::EPSILON) {
            self.orbit(axis, angle_deg);
        }
    }

    /// Rotate the camera about the right vector centered at the focal point.
    /// Positive angle moves the camera up. View up is left as is.
    pub fn elevation(&mut self, angle_deg: f32) {
        let axis = Unit::new_normalize(-self.right);
        self.orbit(axis, angle_deg);
    }

    fn orbit(&mut self, axis: Unit<Vector3<f32>>, angle_deg: f32) {
        let rotation = Rotation3::from_axis_angle(&axis, angle_deg.to_radians());
        let new_position = self.focal_point + rotation * (self.position - self.focal_point);

        let old = self.position;
        self.position = new_position;
        if self.recalc_plane().is_err() {
            // View up became parallel with view direction, take the rotated image up instead
            self.view_up = rotation * self.up;
            if self.recalc_plane().is_err() {
                self.position = old;
                // Old pose was valid
                let _ = self.recalc_plane();
            }
        }
    }

    /// Make view up orthogonal to the view direction, removing drift after rotations.
    pub fn orthogonalize_view_up(&mut self) {
        self.view_up = self.up;
    }

    /// Place the camera so the whole `bounds` is visible.
    ///
    /// View direction is kept, focal point moves to the box center and the distance
    /// is chosen so the bounding sphere fits the view angle. Clipping range is reset.
    pub fn reset_camera(&mut self, bounds: &BoundBox) -> Result<()> {
        if bounds.is_degenerate() {
            return Err(Error::Geometry(format!(
                "cannot fit camera to bounds {:?} - {:?}",
                bounds.lower, bounds.upper
            )));
        }

        let center = bounds.center();
        let radius = 0.5 * bounds.diagonal();
        let half_angle = (0.5 * self.view_angle).to_radians();
        let distance = radius / half_angle.sin();

        // Keep view up usable for the current direction
        if self.view_up.cross(&self.direction).magnitude() <= 1e-3 * self.view_up.magnitude() {
            self.view_up = self.up;
        }

        self.focal_point = center;
        self.position = center - self.direction * distance;
        self.parallel_scale = radius;
        self.recalc_plane()?;

        tracing::debug!(
            "Camera reset, position {:?} distance {distance}",
            self.position
        );

        self.reset_clipping_range(bounds);
        Ok(())
    }

    /// Set clipping range so that every corner of `bounds` in front of the camera lies inside.
    pub fn reset_clipping_range(&mut self, bounds: &BoundBox) {
        let (min, max) = bounds
            .into_iter()
            .map(|corner| (corner - self.position).dot(&self.direction))
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), d| {
                (lo.min(d), hi.max(d))
            });

        let far_limit = if max > 0.0 { max } else { 1.0 };
        let margin = 0.01 * (max - min).max(0.0) + 1e-3 * far_limit;

        let far = far_limit + margin;
        let near = (min - margin).max(far * 1e-3);

        self.clipping_range = if near < far {
            (near, far)
        } else {
            (far * 1e-3, far)
        };
    }

    /// Ray through the center of pixel `(px, py)` of an image with resolution `(w, h)`.
    pub fn ray_for_pixel(&self, px: usize, py: usize, resolution: (usize, usize)) -> Ray {
        let (w, h) = resolution;
        let aspect = w as f32 / h as f32;

        // <-0.5;0.5> image plane coordinates
        let u = (px as f32 + 0.5) / w as f32 - 0.5;
        let v = (py as f32 + 0.5) / h as f32 - 0.5;

        if self.parallel {
            let offset = self.right * (2.0 * self.parallel_scale * aspect * u)
                - self.up * (2.0 * self.parallel_scale * v);
            Ray::new(self.position + offset, self.direction)
        } else {
            let dir = self.direction + self.du * (u * aspect) + self.dv * v;
            Ray::new(self.position, dir)
        }
    }

    /// Parameters of `ray` where it crosses the near and far clipping planes
    pub fn clip_interval(&self, ray: &Ray) -> (f32, f32) {
        let (near, far) = self.clipping_range;
        let cos = ray.direction.dot(&self.direction);
        if cos <= f32::EPSILON {
            return (0.0, 0.0);
        }

        // Parallel rays start on the camera plane, same depth formula applies
        let start_depth = (ray.origin - self.position).dot(&self.direction);
        ((near - start_depth) / cos, (far - start_depth) / cos)
    }

    // Call when camera pose changed
    fn recalc_plane(&mut self) -> Result<()> {
        let direction = Unit::try_new(self.focal_point - self.position, f32::EPSILON)
            .ok_or_else(|| Error::Geometry("camera position equals focal point".into()))?;
        let right = Unit::try_new(direction.cross(&self.view_up), 1e-6)
            .ok_or_else(|| Error::Geometry("view up is parallel to view direction".into()))?;

        self.direction = direction.into_inner();
        self.right = right.into_inner();
        self.up = self.right.cross(&self.direction);
        self.recalc_dudv();
        Ok(())
    }

    // Call when view angle changed
    fn recalc_plane_size(&mut self) {
        let height = 2.0 * f32::tan(f32::to_radians(0.5 * self.view_angle));
        self.img_plane_size = vector![height, height];
    }

    // Call when direction changed
    fn recalc_dudv(&mut self) {
        self.du = self.img_plane_size.x * self.right;
        self.dv = -self.img_plane_size.y * self.up; // Notice '-' sign
    }
}
