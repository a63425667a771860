use nalgebra::{point, Point3, Vector3};

use super::Ray;

/// Axis aligned box in world coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundBox {
    pub lower: Point3<f32>,
    pub upper: Point3<f32>,
}

impl BoundBox {
    pub fn new(lower: Point3<f32>, upper: Point3<f32>) -> BoundBox {
        BoundBox { lower, upper }
    }

    pub fn from_position_dims(position: Point3<f32>, dimensions: Vector3<f32>) -> BoundBox {
        BoundBox {
            lower: position,
            upper: position + dimensions,
        }
    }

    pub fn dims(&self) -> Vector3<f32> {
        self.upper - self.lower
    }

    pub fn center(&self) -> Point3<f32> {
        self.lower + 0.5 * self.dims()
    }

    /// Length of the main diagonal
    pub fn diagonal(&self) -> f32 {
        self.dims().magnitude()
    }

    /// Box with no extent in any direction (a single point) or with non-finite corners
    pub fn is_degenerate(&self) -> bool {
        let diagonal = self.diagonal();
        !diagonal.is_finite() || diagonal <= f32::EPSILON
    }

    /// Point is inside or on the boundary
    pub fn contains(&self, pos: &Point3<f32>) -> bool {
        self.upper.x >= pos.x
            && self.upper.y >= pos.y
            && self.upper.z >= pos.z
            && pos.x >= self.lower.x
            && pos.y >= self.lower.y
            && pos.z >= self.lower.z
    }

    /// Returns `t` parameters of entry and exit points.
    /// Entry parameter can be negative if the ray origin is inside the box.
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, f32)> {
        // Source: An Efficient and Robust Ray–Box Intersection Algorithm. Amy Williams et al. 2004.
        // http://citeseerx.ist.psu.edu/viewdoc/summary?doi=10.1.1.64.7663

        // t value of intersection with the 6 planes of a bounding box
        let t0 = (self.lower - ray.origin).component_div(&ray.direction);
        let t1 = (self.upper - ray.origin).component_div(&ray.direction);

        // [ (min,max) , (min,max) , (min,max) ]
        // NaN appears for zero direction component with origin on the plane, treat as unbounded
        let t_minmax = t0.zip_map(&t1, |t0, t1| {
            if t0.is_nan() || t1.is_nan() {
                (f32::NEG_INFINITY, f32::INFINITY)
            } else if t0 < t1 {
                (t0, t1)
            } else {
                (t1, t0)
            }
        });

        let tmin = f32::max(f32::max(t_minmax.x.0, t_minmax.y.0), t_minmax.z.0);
        let tmax = f32::min(f32::min(t_minmax.x.1, t_minmax.y.1), t_minmax.z.1);

        // if tmax < 0, ray is intersecting AABB, but the whole AABB is behind us
        if tmax.is_sign_negative() {
            return None;
        }

        // if tmin > tmax, ray doesn't intersect AABB
        if tmin > tmax {
            return None;
        }

        Some((tmin, tmax))
    }
}

/// Iterates the 8 corners of a box
pub struct BoundBoxIterator {
    pub lower: Point3<f32>,
    pub upper: Point3<f32>,
    state: u8,
}

impl Iterator for BoundBoxIterator {
    type Item = Point3<f32>;

    fn next(&mut self) -> Option<Self::Item> {
        let p = match self.state {
            0 => self.lower,
            1 => point![self.upper.x, self.lower.y, self.lower.z],
            2 => point![self.upper.x, self.upper.y, self.lower.z],
            3 => point![self.lower.x, self.upper.y, self.lower.z],
            4 => point![self.lower.x, self.lower.y, self.upper.z],
            5 => point![self.upper.x, self.lower.y, self.upper.z],
            6 => self.upper,
            7 => point![self.lower.x, self.upper.y, self.upper.z],
            _ => return None,
        };
        self.state += 1;
        Some(p)
    }
}

impl IntoIterator for BoundBox {
    type Item = Point3<f32>;

    type IntoIter = BoundBoxIterator;

    fn into_iter(self) -> Self::IntoIter {
        BoundBoxIterator {
            lower: self.lower,
            upper: self.upper,
            state: 0,
        }
    }
}

#[cfg(test)]
mod test {

    use nalgebra::vector;

    use super::*;

    fn unit_box() -> BoundBox {
        BoundBox::new(point![0.0, 0.0, 0.0], point![1.0, 1.0, 1.0])
    }

    #[test]
    fn intersect_through_center() {
        let ray = Ray::new(point![-1.0, 0.5, 0.5], vector![1.0, 0.0, 0.0]);
        let (t0, t1) = unit_box().intersect(&ray).unwrap();
        assert!((t0 - 1.0).abs() < f32::EPSILON);
        assert!((t1 - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn origin_inside() {
        let ray = Ray::new(point![0.5, 0.5, 0.5], vector![0.0, 0.0, 1.0]);
        let (t0, t1) = unit_box().intersect(&ray).unwrap();
        assert!(t0 < 0.0);
        assert!((t1 - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn not_intersecting() {
        let ray = Ray::new(point![200.0, 200.0, 200.0], vector![1.0, 0.0, 0.0]);
        assert!(unit_box().intersect(&ray).is_none());

        // Box behind the ray
        let ray = Ray::new(point![2.0, 0.5, 0.5], vector![1.0, 0.0, 0.0]);
        assert!(unit_box().intersect(&ray).is_none());
    }

    #[test]
    fn corners_and_center() {
        let bbox = BoundBox::from_position_dims(point![1.0, 2.0, 3.0], vector![2.0, 2.0, 2.0]);
        assert_eq!(bbox.center(), point![2.0, 3.0, 4.0]);
        assert_eq!(bbox.into_iter().count(), 8);
        assert!(bbox.into_iter().all(|corner| bbox.contains(&corner)));
        assert!((bbox.diagonal() - f32::sqrt(12.0)).abs() < 1e-6);
    }

    #[test]
    fn degenerate_box() {
        let p = point![4.0, 4.0, 4.0];
        assert!(BoundBox::new(p, p).is_degenerate());
        assert!(!unit_box().is_degenerate());
    }
}
