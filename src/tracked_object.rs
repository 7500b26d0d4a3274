//! Individual track state: identity, motion filter, detection history and
//! lifecycle queries

use crate::geometry::{CameraModel, Rect};
use crate::kalman::PositionKalmanFilter;
use crate::object_type::ObjectType;
use anyhow::Result;
use nalgebra::{Matrix3, Vector3};
use std::sync::Arc;

/// Confidence floor for unproven or recently lost tracks
const FLOOR_RATIO: f64 = 0.01;
/// Lowest confidence a ramping young track is displayed at
const MIN_DISPLAY_RATIO: f64 = 0.3;

/// Fixed-capacity ring buffer; pushing past capacity overwrites the oldest
/// entry
#[derive(Debug, Clone)]
struct History<T> {
    buf: Vec<T>,
    capacity: usize,
    head: usize,
}

impl<T: Copy> History<T> {
    fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be non-zero");
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        }
    }

    fn push(&mut self, value: T) {
        if self.buf.len() < self.capacity {
            self.buf.push(value);
        } else {
            self.buf[self.head] = value;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    fn len(&self) -> usize {
        self.buf.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest
    fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.buf[self.head..].iter().chain(self.buf[..self.head].iter())
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        let (wrapped, ordered) = self.buf.split_at_mut(self.head);
        ordered.iter_mut().chain(wrapped.iter_mut())
    }
}

/// Label a track id as base-26 letters: 0 -> "A", 25 -> "Z", 26 -> "AA"
fn id_label(mut id: u32) -> String {
    let mut label = String::new();
    loop {
        label.push((b'A' + (id % 26) as u8) as char);
        id /= 26;
        if id == 0 {
            break;
        }
        id -= 1;
    }
    label.chars().rev().collect()
}

/// One tracked physical object
#[derive(Debug, Clone)]
pub struct TrackedObject {
    /// Persistent letter label, assigned at creation
    id: String,
    object_type: Arc<ObjectType>,
    /// Current 3D world position estimate (meters)
    position: Vector3<f32>,
    position_history: History<Vector3<f32>>,
    /// Whether the track was matched to a detection, frame by frame
    detect_history: History<bool>,
    /// Consecutive frames without a matching detection
    missed_frame_count: u32,
    filter: PositionKalmanFilter,
}

impl TrackedObject {
    /// Start a track from its first detection
    pub fn new(
        id: u32,
        object_type: Arc<ObjectType>,
        rect: Rect,
        depth: f32,
        camera: &CameraModel,
        dt: f32,
        accel_noise_mag: f32,
        history_len: usize,
    ) -> Self {
        let position = camera.screen_to_world(rect, depth);
        let mut track = Self {
            id: id_label(id),
            object_type,
            position,
            position_history: History::new(history_len),
            detect_history: History::new(history_len),
            missed_frame_count: 0,
            filter: PositionKalmanFilter::new(position, dt, accel_noise_mag),
        };
        track.set_position(position);
        track.set_detected();
        track
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn object_type(&self) -> &Arc<ObjectType> {
        &self.object_type
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn missed_frame_count(&self) -> u32 {
        self.missed_frame_count
    }

    /// Mark the track as matched this frame
    pub fn set_detected(&mut self) {
        self.detect_history.push(true);
        self.missed_frame_count = 0;
    }

    /// Mark the track as unmatched this frame
    pub fn clear_detected(&mut self) {
        self.detect_history.push(false);
        self.missed_frame_count += 1;
    }

    /// Set the position estimate directly, recording it in the history
    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
        self.position_history.push(position);
    }

    /// Set the position from a screen rect plus measured depth
    pub fn set_position_from_screen(&mut self, rect: Rect, depth: f32, camera: &CameraModel) {
        self.set_position(camera.screen_to_world(rect, depth));
    }

    /// Advance the motion filter one step; returns the predicted position
    pub fn predict(&mut self) -> Vector3<f32> {
        self.filter.predict()
    }

    /// Correct the motion filter with an observed position
    pub fn update(&mut self, observed: Vector3<f32>) -> Result<Vector3<f32>> {
        self.filter.update(observed)
    }

    /// Reproject the current and historical positions through a screen-space
    /// transform measured from camera motion, then shift the motion filter by
    /// the resulting delta.
    ///
    /// `depth` is reused for every reprojected point: camera rotation moves
    /// objects across the screen but barely changes their range.
    pub fn adjust_for_ego_motion(
        &mut self,
        transform: &Matrix3<f32>,
        depth: f32,
        camera: &CameraModel,
    ) {
        let old_position = self.position;

        let rect = camera.world_to_screen(self.position, &self.object_type);
        self.set_position_from_screen(apply_screen_transform(rect, transform), depth, camera);

        let object_type = Arc::clone(&self.object_type);
        for point in self.position_history.iter_mut() {
            let rect = camera.world_to_screen(*point, &object_type);
            *point = camera.screen_to_world(apply_screen_transform(rect, transform), depth);
        }

        self.filter.nudge(self.position - old_position);
    }

    /// Where this track sits on screen right now
    pub fn screen_position(&self, camera: &CameraModel) -> Rect {
        camera.world_to_screen(self.position, &self.object_type)
    }

    /// Projected center points of the position history, oldest first
    pub fn screen_position_history(&self, camera: &CameraModel) -> Vec<(i32, i32)> {
        self.position_history
            .iter()
            .map(|point| {
                let rect = camera.world_to_screen(*point, &self.object_type);
                let (x, y) = rect.center();
                (x.round() as i32, y.round() as i32)
            })
            .collect()
    }

    /// The object's real contour scaled into its current screen rectangle
    /// (square pixels)
    pub fn contour_area(&self, camera: &CameraModel) -> f64 {
        let rect = self.screen_position(camera);
        let scale_x = rect.width as f32 / self.object_type.width();
        let scale_y = rect.height as f32 / self.object_type.height();
        let scale = scale_x.min(scale_y);
        (scale * scale * self.object_type.area()) as f64
    }

    /// Detection confidence in [0.01, 1.0].
    ///
    /// Young tracks must be near-perfect to show at all, then ramp linearly
    /// from `MIN_DISPLAY_RATIO` as the history buffer fills; a full buffer
    /// reports the plain hit fraction. Anything missing for 3+ consecutive
    /// frames drops to the floor regardless of its record.
    pub fn detected_ratio(&self) -> f64 {
        let len = self.detect_history.len();

        // Need at least 2 frames to believe there's something real
        if len <= 1 {
            return FLOOR_RATIO;
        }
        if self.missed_frame_count >= 3 {
            return FLOOR_RATIO;
        }

        let capacity = self.detect_history.capacity();
        let detect_count = self.detect_history.iter().filter(|&&hit| hit).count();

        if len < capacity / 2 {
            // At most one miss while the first quarter of the buffer fills,
            // at most two up to the half mark
            if detect_count < len - 2 {
                return FLOOR_RATIO;
            }
            if len <= capacity / 4 && detect_count < len - 1 {
                return FLOOR_RATIO;
            }

            let end_ratio =
                (capacity as f64 / 2.0 - (len - detect_count) as f64) / capacity as f64;
            return MIN_DISPLAY_RATIO
                + (len as f64 - 2.0) * (end_ratio - MIN_DISPLAY_RATIO)
                    / (capacity as f64 / 2.0 - 2.0);
        }

        detect_count as f64 / capacity as f64
    }

    /// Retention policy: drop after too many consecutive misses, and be more
    /// aggressive about dropping young tracks that were rarely seen.
    pub fn too_many_missed_frames(&self, max_missed_frames: u32) -> bool {
        if self.missed_frame_count > max_missed_frames {
            return true;
        }

        let len = self.detect_history.len();
        if len <= 10 {
            let detect_count = self.detect_history.iter().filter(|&&hit| hit).count();
            if detect_count as f64 / len as f64 <= 0.34 {
                return true;
            }
        }
        false
    }
}

/// Push a rect's center through a 2D homogeneous screen transform, keeping
/// the size
fn apply_screen_transform(rect: Rect, transform: &Matrix3<f32>) -> Rect {
    let (cx, cy) = rect.center();
    let moved = transform * Vector3::new(cx, cy, 1.0);
    Rect::new(
        (moved.x - rect.width as f32 / 2.0).round() as i32,
        (moved.y - rect.height as f32 / 2.0).round() as i32,
        rect.width,
        rect.height,
    )
}
