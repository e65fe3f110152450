//! Cameras are used to view scenes from any point in the world.
//!
//! The avatar view uses a single perspective camera looking down -Z from the
//! origin, with the live video on a plane far behind the avatar.

use cgmath::{perspective as cgmath_perspective, Deg};
use mint;

use object::Base;

use std::ops;

/// Generic trait for different graphics projections.
pub trait Projection {
    /// Represents projection as projection matrix.
    fn get_matrix(&self, aspect: f32) -> mint::ColumnMatrix4<f32>;
}

/// Perspective projection parameters.
/// See [`Perspective projection`](https://en.wikipedia.org/wiki/3D_projection#Perspective_projection).
#[derive(Clone, Debug, PartialEq)]
pub struct Perspective {
    /// Vertical field of view in degrees.
    ///Note: the horizontal FOV is computed based on the aspect.
    pub fov_y: f32,
    /// Distance to the near clipping plane.
    pub near: f32,
    /// Distance to the far clipping plane.
    pub far: f32,
}

impl Perspective {
    /// Range of depths that are not clipped.
    pub fn zrange(&self) -> ops::Range<f32> {
        self.near .. self.far
    }

    /// Size of the visible rectangle at `depth` along the view axis, as
    /// `(width, height)`.
    pub fn viewport_size_at_depth(&self, aspect: f32, depth: f32) -> (f32, f32) {
        let height = 2.0 * depth * (0.5 * self.fov_y).to_radians().tan();
        (height * aspect, height)
    }
}

impl Projection for Perspective {
    fn get_matrix(&self, aspect: f32) -> mint::ColumnMatrix4<f32> {
        cgmath_perspective(Deg(self.fov_y), aspect, self.near, self.far).into()
    }
}

/// Camera is used to render Scene with specific [`Projection`].
///
/// [`Projection`]: trait.Projection.html
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub(crate) object: Base,
    projection: Perspective,
    aspect: f32,
    matrix: mint::ColumnMatrix4<f32>,
}
mimic_object!(Camera::object);

impl Camera {
    pub(crate) fn new(object: Base, projection: Perspective, aspect: f32) -> Self {
        let matrix = projection.get_matrix(aspect);
        Camera { object, projection, aspect, matrix }
    }

    /// Returns the projection parameters.
    pub fn projection(&self) -> &Perspective {
        &self.projection
    }

    /// Current width / height ratio.
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Changes the aspect ratio and recomputes the projection matrix.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_projection_matrix();
    }

    /// Recomputes the projection matrix from the current parameters.
    pub fn update_projection_matrix(&mut self) {
        self.matrix = self.projection.get_matrix(self.aspect);
    }

    /// Projection matrix as of the last update.
    pub fn projection_matrix(&self) -> mint::ColumnMatrix4<f32> {
        self.matrix
    }

    /// Size of the visible rectangle at `depth` along the view axis.
    pub fn viewport_size_at_depth(&self, depth: f32) -> (f32, f32) {
        self.projection.viewport_size_at_depth(self.aspect, depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_at_depth_follows_fov() {
        let proj = Perspective { fov_y: 90.0, near: 0.1, far: 10.0 };
        let (w, h) = proj.viewport_size_at_depth(2.0, 1.0);
        assert!((h - 2.0).abs() < 1e-5);
        assert!((w - 4.0).abs() < 1e-5);
    }

    #[test]
    fn viewport_scales_linearly_with_depth() {
        let proj = Perspective { fov_y: 60.0, near: 0.01, far: 5000.0 };
        let (w1, h1) = proj.viewport_size_at_depth(16.0 / 9.0, 1.0);
        let (w2, h2) = proj.viewport_size_at_depth(16.0 / 9.0, 500.0);
        assert!((w2 - 500.0 * w1).abs() < 1e-2);
        assert!((h2 - 500.0 * h1).abs() < 1e-2);
    }
}
