//! Camera transform and perspective projection.
//!
//! The visibility core only needs three things from the camera: view-space
//! positions (to find the near plane), projected screen points, and the
//! per-vertex perspective scale `focal / depth`.

use nalgebra::{Point3, Vector3};

use crate::math::{Fixed, SCREEN_COORD_LIMIT, ScreenRect, ScreenSize, Vertex2D};
use crate::plane::BoundingBox;

/// A vertex ready for rasterization: view-space position, projected screen
/// point and perspective scale.
///
/// `screen` is only meaningful when the vertex lies at or beyond the near
/// plane; vertices behind it are projected as if they sat on the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipVertex {
    pub view: Vector3<Fixed>,
    pub screen: Vertex2D,
    pub scale: Fixed,
}

impl ClipVertex {
    /// Distance along the view axis.
    #[inline]
    pub fn depth(&self) -> Fixed {
        self.view.z
    }
}

/// Perspective projection onto a screen with the origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    screen: ScreenSize,
    center: Vertex2D,
    focal: Fixed,
    near: Fixed,
}

impl Projection {
    /// # Panics
    /// Panics if `near` is not positive.
    pub fn new(screen: ScreenSize, focal: Fixed, near: Fixed) -> Self {
        assert!(near > Fixed::ZERO, "near plane must lie in front of the eye");
        Self {
            screen,
            center: Vertex2D::new(screen.width as i32 / 2, screen.height as i32 / 2),
            focal,
            near,
        }
    }

    /// Builds a projection from a horizontal field of view in degrees.
    pub fn from_fov(screen: ScreenSize, fov_degrees: f32, near: f32) -> Self {
        let half_width = screen.width as f32 / 2.0;
        let focal = half_width / (fov_degrees.to_radians() / 2.0).tan();
        Self::new(screen, Fixed::from_num(focal), Fixed::from_num(near))
    }

    #[inline]
    pub fn screen(&self) -> ScreenSize {
        self.screen
    }

    #[inline]
    pub fn focal(&self) -> Fixed {
        self.focal
    }

    /// Depth of the near plane.
    #[inline]
    pub fn near(&self) -> Fixed {
        self.near
    }

    /// Projects a view-space point. Depths closer than the near plane are
    /// clamped to it and the result saturates at [`SCREEN_COORD_LIMIT`].
    pub fn project(&self, view: &Vector3<Fixed>) -> Vertex2D {
        let inv = self.scale_at(view.z);
        let limit = Fixed::from_num(SCREEN_COORD_LIMIT);
        let x = view.x.saturating_mul(inv).clamp(-limit, limit);
        let y = view.y.saturating_mul(inv).clamp(-limit, limit);
        Vertex2D::new(
            self.center.x + x.round().to_num::<i32>(),
            self.center.y - y.round().to_num::<i32>(),
        )
    }

    /// Perspective scale factor `focal / depth`.
    #[inline]
    pub fn scale_at(&self, depth: Fixed) -> Fixed {
        self.focal.saturating_div(depth.max(self.near))
    }

    pub fn clip_vertex(&self, view: Vector3<Fixed>) -> ClipVertex {
        ClipVertex {
            screen: self.project(&view),
            scale: self.scale_at(view.z),
            view,
        }
    }
}

/// How a world-space box lands on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxProjection {
    /// Every corner lies behind the near plane.
    Behind,
    /// Some corners are on each side of the near plane; the box may cover
    /// any part of the screen.
    Straddles,
    /// Every corner projects; the rectangle encloses them.
    Rect(ScreenRect),
}

/// A camera with an integer world position and a fixed-point basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    position: Point3<i32>,
    right: Vector3<Fixed>,
    up: Vector3<Fixed>,
    forward: Vector3<Fixed>,
    projection: Projection,
}

impl Camera {
    /// Creates a camera looking along `+z` when `yaw` and `pitch` are zero.
    /// `yaw` turns toward `+x`, `pitch` toward `+y` (radians).
    pub fn new(position: Point3<i32>, yaw: f32, pitch: f32, projection: Projection) -> Self {
        let forward = Vector3::new(
            yaw.sin() * pitch.cos(),
            pitch.sin(),
            yaw.cos() * pitch.cos(),
        );
        let right = Vector3::new(yaw.cos(), 0.0, -yaw.sin());
        let up = forward.cross(&right);

        Self {
            position,
            right: to_fixed(&right),
            up: to_fixed(&up),
            forward: to_fixed(&forward),
            projection,
        }
    }

    #[inline]
    pub fn position(&self) -> Point3<i32> {
        self.position
    }

    #[inline]
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    #[inline]
    pub fn screen(&self) -> ScreenSize {
        self.projection.screen
    }

    /// Transforms a world point into view space (`x` right, `y` up, `z` forward).
    pub fn to_view(&self, point: Point3<i32>) -> Vector3<Fixed> {
        let d = point - self.position;
        let d = Vector3::new(Fixed::from_num(d.x), Fixed::from_num(d.y), Fixed::from_num(d.z));
        Vector3::new(dot(&d, &self.right), dot(&d, &self.up), dot(&d, &self.forward))
    }

    pub fn clip_vertex(&self, point: Point3<i32>) -> ClipVertex {
        self.projection.clip_vertex(self.to_view(point))
    }

    /// Projects the eight corners of a box.
    pub fn project_box(&self, bounds: &BoundingBox) -> BoxProjection {
        let near = self.projection.near;
        let views = bounds.corners().map(|c| self.to_view(c));
        let behind = views.iter().filter(|v| v.z < near).count();

        if behind == views.len() {
            BoxProjection::Behind
        } else if behind > 0 {
            BoxProjection::Straddles
        } else {
            let rect = ScreenRect::enclosing(views.iter().map(|v| self.projection.project(v)));
            // Eight corners always yield a rectangle.
            rect.map_or(BoxProjection::Straddles, BoxProjection::Rect)
        }
    }
}

#[inline]
fn dot(a: &Vector3<Fixed>, b: &Vector3<Fixed>) -> Fixed {
    a.x * b.x + a.y * b.y + a.z * b.z
}

fn to_fixed(v: &Vector3<f32>) -> Vector3<Fixed> {
    Vector3::new(Fixed::from_num(v.x), Fixed::from_num(v.y), Fixed::from_num(v.z))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_projection() -> Projection {
        Projection::new(ScreenSize::new(160, 128), Fixed::from_num(80), Fixed::from_num(1))
    }

    #[test]
    fn view_transform_identity_basis() {
        let camera = Camera::new(Point3::new(10, 20, 30), 0.0, 0.0, make_projection());
        let view = camera.to_view(Point3::new(11, 18, 40));
        assert_eq!(view, Vector3::new(Fixed::from_num(1), Fixed::from_num(-2), Fixed::from_num(10)));
    }

    #[test]
    fn project_centers_points_on_axis() {
        let projection = make_projection();
        let on_axis = Vector3::new(Fixed::ZERO, Fixed::ZERO, Fixed::from_num(50));
        assert_eq!(projection.project(&on_axis), Vertex2D::new(80, 64));

        // x = 80 + 10 * 80 / 20, y = 64 - 5 * 80 / 20
        let off_axis = Vector3::new(Fixed::from_num(10), Fixed::from_num(5), Fixed::from_num(20));
        assert_eq!(projection.project(&off_axis), Vertex2D::new(120, 44));
    }

    #[test]
    fn scale_is_focal_over_depth() {
        let projection = make_projection();
        assert_eq!(projection.scale_at(Fixed::from_num(40)), Fixed::from_num(2));
        // Depths in front of the near plane clamp to it.
        assert_eq!(projection.scale_at(Fixed::from_num(-3)), Fixed::from_num(80));
    }

    #[test]
    fn project_saturates_huge_coordinates() {
        let projection = make_projection();
        let far_out = Vector3::new(Fixed::from_num(1_000_000), Fixed::ZERO, Fixed::from_num(1));
        assert_eq!(projection.project(&far_out).x, 80 + SCREEN_COORD_LIMIT);
    }

    #[test]
    fn box_projection_cases() {
        let camera = Camera::new(Point3::new(0, 0, 0), 0.0, 0.0, make_projection());

        let ahead = BoundingBox::new(Point3::new(-10, -10, 20), Point3::new(10, 10, 40));
        // Widest at the near face z = 20: 80 +- 10 * 4.
        assert_eq!(
            camera.project_box(&ahead),
            BoxProjection::Rect(ScreenRect::new(40, 24, 120, 104))
        );

        let behind = BoundingBox::new(Point3::new(-10, -10, -40), Point3::new(10, 10, -20));
        assert_eq!(camera.project_box(&behind), BoxProjection::Behind);

        let around = BoundingBox::new(Point3::new(-10, -10, -10), Point3::new(10, 10, 10));
        assert_eq!(camera.project_box(&around), BoxProjection::Straddles);
    }

    #[test]
    fn yaw_turns_toward_positive_x() {
        let camera = Camera::new(
            Point3::new(0, 0, 0),
            std::f32::consts::FRAC_PI_2,
            0.0,
            make_projection(),
        );
        let view = camera.to_view(Point3::new(100, 0, 0));
        assert!(view.z > Fixed::from_num(99));
        assert!(view.x.abs() < Fixed::from_num(0.01));
    }
}
