//! Projection between screen-space detection rectangles and 3D world positions

use crate::object_type::ObjectType;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center of the rectangle in pixel coordinates
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Frame-invariant camera context: frame size in pixels, horizontal and
/// vertical field of view in radians, and the camera's elevation angle above
/// horizontal in radians.
///
/// World coordinates are x = right, y = forward, z = up, with the camera at
/// the origin. Screen pixels grow down; world z grows up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CameraModel {
    pub frame_size: (u32, u32),
    pub fov: (f32, f32),
    pub elevation: f32,
}

impl CameraModel {
    pub fn new(frame_size: (u32, u32), fov: (f32, f32), elevation: f32) -> Self {
        Self {
            frame_size,
            fov,
            elevation,
        }
    }

    /// Project a detection rectangle plus measured depth to a 3D world
    /// position.
    ///
    /// The rect center's offset from the frame center is treated as an
    /// angular offset (fraction of the frame size times the field of view),
    /// then (depth, azimuth, inclination) is converted from spherical to
    /// Cartesian coordinates.
    pub fn screen_to_world(&self, rect: Rect, depth: f32) -> Vector3<f32> {
        let frame_w = self.frame_size.0 as f32;
        let frame_h = self.frame_size.1 as f32;

        let (center_x, center_y) = rect.center();
        let dist_x = center_x - frame_w / 2.0;
        let dist_y = -center_y + frame_h / 2.0;

        let azimuth = dist_x / frame_w * self.fov.0;
        let inclination = dist_y / frame_h * self.fov.1 - self.elevation;

        Vector3::new(
            depth * inclination.cos() * azimuth.sin(),
            depth * inclination.cos() * azimuth.cos(),
            depth * inclination.sin(),
        )
    }

    /// Project a 3D world position back to the screen rectangle an object of
    /// the given type would occupy there.
    ///
    /// The apparent rectangle size comes from the object's real width and
    /// height via the angular size relation 2*atan2(dim, 2r).
    pub fn world_to_screen(&self, position: Vector3<f32>, object_type: &ObjectType) -> Rect {
        let frame_w = self.frame_size.0 as f32;
        let frame_h = self.frame_size.1 as f32;

        let r = position.norm();
        let horiz = position.x.hypot(position.y);
        // Straight above/below the camera has no defined azimuth; pin it
        // forward instead of dividing by zero
        let azimuth = if horiz > f32::EPSILON {
            (position.x / horiz).clamp(-1.0, 1.0).asin()
        } else {
            0.0
        };
        let inclination = if r > f32::EPSILON {
            (position.z / r).clamp(-1.0, 1.0).asin() + self.elevation
        } else {
            self.elevation
        };

        let dist_x = azimuth / self.fov.0 * frame_w;
        let dist_y = inclination / self.fov.1 * frame_h;
        let center_x = dist_x + frame_w / 2.0;
        let center_y = -dist_y + frame_h / 2.0;

        let angular_w = 2.0 * object_type.width().atan2(2.0 * r);
        let angular_h = 2.0 * object_type.height().atan2(2.0 * r);
        let screen_w = angular_w * frame_w / self.fov.0;
        let screen_h = angular_h * frame_h / self.fov.1;

        Rect::new(
            (center_x - screen_w / 2.0).round() as i32,
            (center_y - screen_h / 2.0).round() as i32,
            screen_w.round() as i32,
            screen_h.round() as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_camera() -> CameraModel {
        CameraModel::new((1280, 720), (1.22, 0.75), 0.0)
    }

    #[test]
    fn test_forward_projection() {
        let camera = test_camera();
        // Dead-center rect projects straight ahead
        let rect = Rect::new(630, 350, 20, 20);
        let pos = camera.screen_to_world(rect, 3.0);
        assert!(pos.x.abs() < 1e-3);
        assert!((pos.y - 3.0).abs() < 1e-3);
        assert!(pos.z.abs() < 1e-3);
    }

    #[test]
    fn test_round_trip_within_one_pixel() {
        let camera = test_camera();
        let ball = ObjectType::ball();

        for &(x, y) in &[(100, 100), (400, 200), (900, 500), (1100, 80)] {
            let rect = Rect::new(x, y, 24, 24);
            let pos = camera.screen_to_world(rect, 2.5);
            let back = camera.world_to_screen(pos, &ball);
            let (cx, cy) = rect.center();
            let (bx, by) = back.center();
            assert!(
                (cx - bx).abs() <= 1.0 && (cy - by).abs() <= 1.0,
                "round trip drifted: {rect} -> {back}"
            );
        }
    }

    #[test]
    fn test_elevation_shifts_inclination() {
        let elevated = CameraModel::new((1280, 720), (1.22, 0.75), 0.2);
        let rect = Rect::new(630, 350, 20, 20);
        let pos = elevated.screen_to_world(rect, 3.0);
        // Camera tilted up means a centered detection sits below the
        // camera axis in world space
        assert!(pos.z < 0.0);

        let back = elevated.world_to_screen(pos, &ObjectType::ball());
        let (bx, by) = back.center();
        assert!((bx - 640.0).abs() <= 1.0);
        assert!((by - 360.0).abs() <= 1.0);
    }

    #[test]
    fn test_degenerate_positions_do_not_produce_nan() {
        let camera = test_camera();
        let ball = ObjectType::ball();

        // Straight overhead: azimuth is 0/0, must pin to frame center
        let overhead = camera.world_to_screen(Vector3::new(0.0, 0.0, 2.0), &ball);
        let (cx, _) = overhead.center();
        assert!((cx - 640.0).abs() <= 1.0);

        let origin = camera.world_to_screen(Vector3::zeros(), &ball);
        let (cx, cy) = origin.center();
        assert!((cx - 640.0).abs() <= 1.0 && (cy - 360.0).abs() <= 1.0);
    }
}
