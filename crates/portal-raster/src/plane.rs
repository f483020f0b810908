//! Splitting planes and bounding boxes for the level BSP.

use nalgebra::{Point3, Vector3};

use crate::Fixed;

/// Points within this distance of a plane are considered "on" the plane.
pub const PLANE_EPSILON: Fixed = Fixed::from_bits(1 << 24);

/// Which side of a plane a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// Point is in front of the plane (positive side of normal)
    Front,
    /// Point is behind the plane (negative side of normal)
    Back,
    /// Point lies on the plane (within epsilon tolerance)
    OnPlane,
}

/// Coordinate axis, used to build axis-aligned planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// A BSP splitting plane, `normal · point = distance`.
///
/// The normal is stored in fixed point and is expected to be of unit length;
/// level loaders that start from floats use [`BspPlane::from_f32`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BspPlane {
    normal: Vector3<Fixed>,
    distance: Fixed,
}

impl BspPlane {
    pub fn new(normal: Vector3<Fixed>, distance: Fixed) -> Self {
        Self { normal, distance }
    }

    /// Creates a plane from a float normal and distance.
    /// The normal will be normalized automatically.
    ///
    /// # Panics
    /// Panics if the normal vector has zero length.
    pub fn from_f32(normal: Vector3<f32>, distance: f32) -> Self {
        let norm = normal.norm();
        assert!(norm > f32::EPSILON, "Plane normal cannot be zero");
        let unit = normal / norm;
        Self {
            normal: Vector3::new(
                Fixed::from_num(unit.x),
                Fixed::from_num(unit.y),
                Fixed::from_num(unit.z),
            ),
            distance: Fixed::from_num(distance / norm),
        }
    }

    /// An axis-aligned plane whose front side is the positive half of `axis`.
    pub fn axial(axis: Axis, distance: i32) -> Self {
        let (x, y, z) = match axis {
            Axis::X => (Fixed::ONE, Fixed::ZERO, Fixed::ZERO),
            Axis::Y => (Fixed::ZERO, Fixed::ONE, Fixed::ZERO),
            Axis::Z => (Fixed::ZERO, Fixed::ZERO, Fixed::ONE),
        };
        Self {
            normal: Vector3::new(x, y, z),
            distance: Fixed::from_num(distance),
        }
    }

    #[inline]
    pub fn normal(&self) -> Vector3<Fixed> {
        self.normal
    }

    #[inline]
    pub fn distance(&self) -> Fixed {
        self.distance
    }

    /// Computes the signed distance from a point to the plane.
    /// - Positive: point is in front (same side as normal)
    /// - Negative: point is behind (opposite side from normal)
    #[inline]
    pub fn signed_distance(&self, point: Point3<i32>) -> Fixed {
        self.normal.x * Fixed::from_num(point.x)
            + self.normal.y * Fixed::from_num(point.y)
            + self.normal.z * Fixed::from_num(point.z)
            - self.distance
    }

    /// Classifies which side of the plane a point lies on.
    pub fn classify_point(&self, point: Point3<i32>) -> PlaneSide {
        let dist = self.signed_distance(point);
        if dist > PLANE_EPSILON {
            PlaneSide::Front
        } else if dist < -PLANE_EPSILON {
            PlaneSide::Back
        } else {
            PlaneSide::OnPlane
        }
    }

    /// Returns a new plane with the normal flipped (facing the opposite direction).
    #[inline]
    pub fn flipped(&self) -> Self {
        Self {
            normal: Vector3::new(-self.normal.x, -self.normal.y, -self.normal.z),
            distance: -self.distance,
        }
    }
}

/// An axis-aligned box in integer world units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min: Point3<i32>,
    pub max: Point3<i32>,
}

impl BoundingBox {
    /// Creates a box from two opposite corners in any order.
    pub fn new(a: Point3<i32>, b: Point3<i32>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Smallest box enclosing all points, or `None` for no points.
    pub fn enclosing<'a>(points: impl IntoIterator<Item = &'a Point3<i32>>) -> Option<Self> {
        points.into_iter().fold(None, |bounds, p| {
            Some(match bounds {
                None => BoundingBox::new(*p, *p),
                Some(b) => b.union(&BoundingBox::new(*p, *p)),
            })
        })
    }

    pub fn union(&self, other: &BoundingBox) -> Self {
        Self {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    pub fn contains(&self, point: Point3<i32>) -> bool {
        (self.min.x..=self.max.x).contains(&point.x)
            && (self.min.y..=self.max.y).contains(&point.y)
            && (self.min.z..=self.max.z).contains(&point.z)
    }

    /// The eight corners of the box.
    pub fn corners(&self) -> [Point3<i32>; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Point3::new(lo.x, lo.y, lo.z),
            Point3::new(hi.x, lo.y, lo.z),
            Point3::new(hi.x, hi.y, lo.z),
            Point3::new(lo.x, hi.y, lo.z),
            Point3::new(lo.x, lo.y, hi.z),
            Point3::new(hi.x, lo.y, hi.z),
            Point3::new(hi.x, hi.y, hi.z),
            Point3::new(lo.x, hi.y, hi.z),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axial_plane_classifies_points() {
        let plane = BspPlane::axial(Axis::X, 64);
        assert_eq!(plane.classify_point(Point3::new(100, 0, 0)), PlaneSide::Front);
        assert_eq!(plane.classify_point(Point3::new(10, 0, 0)), PlaneSide::Back);
        assert_eq!(plane.classify_point(Point3::new(64, 5, -5)), PlaneSide::OnPlane);
    }

    #[test]
    fn signed_distance_along_normal() {
        let plane = BspPlane::axial(Axis::Z, -10);
        assert_eq!(plane.signed_distance(Point3::new(3, 4, 0)), Fixed::from_num(10));
        assert_eq!(plane.signed_distance(Point3::new(0, 0, -15)), Fixed::from_num(-5));
    }

    #[test]
    fn from_f32_normalizes() {
        let plane = BspPlane::from_f32(Vector3::new(0.0, 2.0, 0.0), 8.0);
        assert_eq!(plane.normal().y, Fixed::ONE);
        assert_eq!(plane.distance(), Fixed::from_num(4));
    }

    #[test]
    fn flipped_swaps_sides() {
        let plane = BspPlane::axial(Axis::Y, 0);
        let flipped = plane.flipped();
        let p = Point3::new(0, 5, 0);
        assert_eq!(plane.classify_point(p), PlaneSide::Front);
        assert_eq!(flipped.classify_point(p), PlaneSide::Back);
    }

    #[test]
    fn bounding_box_union_and_contains() {
        let a = BoundingBox::new(Point3::new(0, 0, 0), Point3::new(10, 10, 10));
        let b = BoundingBox::new(Point3::new(20, -5, 3), Point3::new(5, 0, 4));
        let u = a.union(&b);
        assert_eq!(u.min, Point3::new(0, -5, 0));
        assert_eq!(u.max, Point3::new(20, 10, 10));
        assert!(u.contains(Point3::new(15, -1, 9)));
        assert!(!a.contains(Point3::new(15, -1, 9)));
    }

    #[test]
    fn enclosing_points() {
        let points = [Point3::new(1, 2, 3), Point3::new(-1, 5, 0)];
        let bounds = BoundingBox::enclosing(&points).unwrap();
        assert_eq!(bounds.min, Point3::new(-1, 2, 0));
        assert_eq!(bounds.max, Point3::new(1, 5, 3));
        assert!(BoundingBox::enclosing(std::iter::empty()).is_none());
    }
}
