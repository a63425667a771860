use nalgebra::{Point3, Unit, Vector3};

/// Ray cast by camera.
/// Main usecase is getting intersections with volumes ([`super::BoundBox::intersect`]),
/// then iterating over the intersected line segment in steps.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3<f32>,
    /// Unit vector
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Construct new ray using `origin` and `direction`.
    /// `direction` gets normalized.
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Ray {
        Ray {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Construct ray from already normalized direction
    pub fn from_unit(origin: Point3<f32>, direction: Unit<Vector3<f32>>) -> Ray {
        Ray {
            origin,
            direction: direction.into_inner(),
        }
    }

    /// Returns point `t` units far from ray origin in ray direction
    pub fn point_from_t(&self, t: f32) -> Point3<f32> {
        self.origin + t * self.direction
    }
}

#[cfg(test)]
mod test {

    use nalgebra::{point, vector};

    use super::*;

    #[test]
    fn direction_is_normalized() {
        let ray = Ray::new(point![0.0, 0.0, 0.0], vector![3.0, 0.0, 4.0]);
        assert!((ray.direction.magnitude() - 1.0).abs() < f32::EPSILON);
        assert_eq!(ray.point_from_t(5.0), point![3.0, 0.0, 4.0]);
    }
}
