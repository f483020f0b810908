//! Shared visualization utilities for the portal raster demos.

use std::hash::{Hash, Hasher};

use macroquad::prelude::*;
use nalgebra::Point3;
use portal_raster::bsp::{LeafIndex, VisibilityVisitor, VisibleLeaf};
use portal_raster::{Camera, RenderContext, ScreenSize, Span};

pub mod demo;

/// Generates a deterministic color for a leaf using hashing, so a room keeps
/// its color from frame to frame.
pub fn leaf_color(leaf: LeafIndex) -> Color {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    leaf.0.hash(&mut hasher);
    let hash = hasher.finish();

    let r = ((hash >> 16) & 0xFF) as u8;
    let g = ((hash >> 8) & 0xFF) as u8;
    let b = (hash & 0xFF) as u8;

    // Keep colors away from the black background.
    Color::from_rgba(r.max(40), g.max(40), b.max(40), 255)
}

/// A CPU framebuffer that visible leaves paint their spans into.
///
/// Leaves arrive nearest first and each is clipped to the portals in front
/// of it, so painting them in order leaves every room showing through the
/// doorways of the rooms before it.
pub struct SpanCanvas {
    image: Image,
    background: Color,
    painted: usize,
}

impl SpanCanvas {
    pub fn new(screen: ScreenSize, background: Color) -> Self {
        Self {
            image: Image::gen_image_color(screen.width as u16, screen.height as u16, background),
            background,
            painted: 0,
        }
    }

    /// Resets every pixel to the background.
    pub fn clear(&mut self) {
        let rgba: [u8; 4] = self.background.into();
        for pixel in self.image.bytes.chunks_exact_mut(4) {
            pixel.copy_from_slice(&rgba);
        }
        self.painted = 0;
    }

    /// Fills the pixels `span` covers on row `y`, clamped to the image.
    pub fn fill_span(&mut self, y: i32, span: Span, color: Color) {
        let (width, height) = (self.image.width as i32, self.image.height as i32);
        if y < 0 || y >= height {
            return;
        }
        let left = span.left.max(0);
        let right = span.right.min(width - 1);
        if left > right {
            return;
        }

        let rgba: [u8; 4] = color.into();
        let row = (y * width) as usize * 4;
        let pixels = &mut self.image.bytes[row + left as usize * 4..row + (right as usize + 1) * 4];
        for pixel in pixels.chunks_exact_mut(4) {
            pixel.copy_from_slice(&rgba);
        }
        self.painted += Span::new(left, right).width();
    }

    pub fn paint_leaf(&mut self, leaf: &VisibleLeaf<'_>) {
        let color = leaf_color(leaf.leaf);
        for (y, span) in leaf.region.spans() {
            self.fill_span(y, span, color);
        }
    }

    /// Pixels written since the last [`clear`](Self::clear), overdraw included.
    pub fn painted(&self) -> usize {
        self.painted
    }

    pub fn image(&self) -> &Image {
        &self.image
    }
}

impl VisibilityVisitor for SpanCanvas {
    fn visit_leaf(&mut self, leaf: VisibleLeaf<'_>) {
        self.paint_leaf(&leaf);
    }
}

/// Simple first-person camera for walking through a level.
pub struct FlyCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    /// World units per second
    pub move_speed: f32,
    /// Radians per second for keyboard turning
    pub turn_speed: f32,
}

impl FlyCamera {
    pub fn new(position: Point3<i32>, yaw: f32) -> Self {
        Self {
            position: vec3(position.x as f32, position.y as f32, position.z as f32),
            yaw,
            pitch: 0.0,
            move_speed: 192.0,
            turn_speed: 1.5,
        }
    }

    /// Sets movement and turning speeds.
    pub fn with_speed(mut self, move_speed: f32, turn_speed: f32) -> Self {
        self.move_speed = move_speed;
        self.turn_speed = turn_speed;
        self
    }

    /// Horizontal unit vector the camera faces.
    pub fn forward(&self) -> Vec3 {
        vec3(self.yaw.sin(), 0.0, self.yaw.cos())
    }

    pub fn right(&self) -> Vec3 {
        vec3(self.yaw.cos(), 0.0, -self.yaw.sin())
    }

    /// Advances the camera by `dt` seconds of keyboard and mouse input.
    ///
    /// WASD moves, Q/E sinks and rises, arrow keys or a left drag turn.
    pub fn update(&mut self, dt: f32) {
        if is_mouse_button_down(MouseButton::Left) {
            let delta = mouse_delta_position();
            self.yaw -= delta.x * 2.0;
            self.pitch += delta.y * 2.0;
        }

        let turn = self.turn_speed * dt;
        if is_key_down(KeyCode::Left) {
            self.yaw -= turn;
        }
        if is_key_down(KeyCode::Right) {
            self.yaw += turn;
        }
        if is_key_down(KeyCode::Up) {
            self.pitch += turn;
        }
        if is_key_down(KeyCode::Down) {
            self.pitch -= turn;
        }
        self.pitch = self.pitch.clamp(-1.5, 1.5);

        let mut motion = Vec3::ZERO;
        if is_key_down(KeyCode::W) {
            motion += self.forward();
        }
        if is_key_down(KeyCode::S) {
            motion -= self.forward();
        }
        if is_key_down(KeyCode::D) {
            motion += self.right();
        }
        if is_key_down(KeyCode::A) {
            motion -= self.right();
        }
        if is_key_down(KeyCode::E) {
            motion.y += 1.0;
        }
        if is_key_down(KeyCode::Q) {
            motion.y -= 1.0;
        }
        self.position += motion.normalize_or_zero() * self.move_speed * dt;
    }

    /// The camera position snapped to the integer world grid.
    pub fn eye_point(&self) -> Point3<i32> {
        Point3::new(
            self.position.x.round() as i32,
            self.position.y.round() as i32,
            self.position.z.round() as i32,
        )
    }

    /// Builds a traversal camera using the context's projection.
    pub fn to_camera(&self, ctx: &RenderContext) -> Camera {
        ctx.camera(self.eye_point(), self.yaw, self.pitch)
    }
}
