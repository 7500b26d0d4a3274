//! Track collection and the per-frame association/update/prune cycle

use crate::error::{Result, TrackError};
use crate::geometry::{CameraModel, Rect};
use crate::hungarian::AssignmentSolver;
use crate::object_type::ObjectType;
use crate::tracked_object::TrackedObject;
use nalgebra::{Matrix3, Vector3};
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Tracker tuning knobs, fixed at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Maximum world distance (meters) between a track and a detection for a
    /// match to stand
    pub dist_thresh: f32,
    /// Consecutive missed frames after which a track is dropped
    pub max_missed_frames: u32,
    /// Depth of the per-track detection/position history buffers
    pub history_len: usize,
    /// Motion filter time step (seconds)
    pub dt: f32,
    /// Motion filter process noise magnitude
    pub accel_noise_mag: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            dist_thresh: 1.0,
            max_missed_frames: 10,
            history_len: 20,
            dt: 0.1,
            accel_noise_mag: 0.5,
        }
    }
}

/// Per-track display record emitted each frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedObjectDisplay {
    pub id: String,
    /// World position (meters)
    pub position: Vector3<f32>,
    /// Projected screen rectangle
    pub rect: Rect,
    /// Detection confidence in [0.01, 1.0]
    pub ratio: f64,
}

/// Owns all live tracks and runs the frame cycle: project detections,
/// associate, update motion filters, spawn and prune tracks.
#[derive(Debug, Clone)]
pub struct TrackedObjectList {
    tracks: Vec<TrackedObject>,
    next_id: u32,
    camera: CameraModel,
    config: TrackerConfig,
}

impl TrackedObjectList {
    pub fn new(camera: CameraModel, config: TrackerConfig) -> Self {
        log::info!(
            "Creating TrackedObjectList: frame={}x{}, fov=({:.3}, {:.3}), elevation={:.3}, dist_thresh={:.2}, max_missed_frames={}",
            camera.frame_size.0,
            camera.frame_size.1,
            camera.fov.0,
            camera.fov.1,
            camera.elevation,
            config.dist_thresh,
            config.max_missed_frames
        );
        Self {
            tracks: Vec::new(),
            next_id: 0,
            camera,
            config,
        }
    }

    /// Process one frame of detections.
    ///
    /// `rects`, `depths` and `types` are parallel arrays describing the
    /// detector output. Matched tracks get a Kalman correct against the
    /// detection, unmatched tracks self-correct toward their own prediction,
    /// unmatched detections start new tracks, and stale tracks are dropped.
    pub fn process_detections(
        &mut self,
        rects: &[Rect],
        depths: &[f32],
        types: &[Arc<ObjectType>],
    ) -> Result<()> {
        if rects.len() != depths.len() || rects.len() != types.len() {
            return Err(TrackError::LengthMismatch {
                rects: rects.len(),
                depths: depths.len(),
                types: types.len(),
            });
        }

        log::debug!(
            "process_detections: {} detections, {} live tracks",
            rects.len(),
            self.tracks.len()
        );

        let positions: Vec<Vector3<f32>> = rects
            .iter()
            .zip(depths)
            .map(|(rect, depth)| self.camera.screen_to_world(*rect, *depth))
            .collect();
        for (i, (rect, position)) in rects.iter().zip(&positions).enumerate() {
            log::debug!(
                "detection[{i}]: {rect} depth={:.2} -> ({:.2}, {:.2}, {:.2})",
                depths[i],
                position.x,
                position.y,
                position.z
            );
        }

        let assignment = if self.tracks.is_empty() || positions.is_empty() {
            vec![None; self.tracks.len()]
        } else {
            let cost = self.cost_matrix(&positions, types);
            let result = AssignmentSolver::solve(cost.view(), self.config.dist_thresh);
            for (t, slot) in result.assignment.iter().enumerate() {
                log::debug!("assignment: track {} -> {:?}", self.tracks[t].id(), slot);
            }
            result.assignment
        };

        // Start a track for every detection no existing track claimed
        let mut new_tracks = Vec::new();
        for d in 0..positions.len() {
            if !assignment.iter().any(|slot| *slot == Some(d)) {
                let track = TrackedObject::new(
                    self.next_id,
                    Arc::clone(&types[d]),
                    rects[d],
                    depths[d],
                    &self.camera,
                    self.config.dt,
                    self.config.accel_noise_mag,
                    self.config.history_len,
                );
                log::debug!("new track {} from detection {d}", track.id());
                self.next_id += 1;
                new_tracks.push(track);
            }
        }

        // Predict every pre-existing track, then correct it with its matched
        // detection, or with its own prediction when unmatched
        for (track, slot) in self.tracks.iter_mut().zip(&assignment) {
            let prediction = track.predict();
            match slot {
                Some(d) => {
                    let corrected = track.update(positions[*d])?;
                    track.set_position(corrected);
                    track.set_detected();
                }
                None => {
                    let corrected = track.update(prediction)?;
                    track.set_position(corrected);
                    track.clear_detected();
                }
            }
        }

        self.tracks.append(&mut new_tracks);

        self.tracks.retain(|track| {
            let drop = track.too_many_missed_frames(self.config.max_missed_frames);
            if drop {
                log::debug!("dropping track {}", track.id());
            }
            !drop
        });

        Ok(())
    }

    /// Euclidean distance cost between every track and detection;
    /// type-incompatible pairs can never match
    fn cost_matrix(&self, positions: &[Vector3<f32>], types: &[Arc<ObjectType>]) -> Array2<f32> {
        let num_tracks = self.tracks.len();
        let num_detections = positions.len();

        let data: Vec<f32> = self
            .tracks
            .par_iter()
            .flat_map_iter(|track| {
                positions.iter().zip(types).map(move |(position, ty)| {
                    if **ty == **track.object_type() {
                        (track.position() - position).norm()
                    } else {
                        f32::INFINITY
                    }
                })
            })
            .collect();

        Array2::from_shape_vec((num_tracks, num_detections), data)
            .unwrap_or_else(|_| Array2::zeros((num_tracks, num_detections)))
    }

    /// Compensate every track for camera motion measured between frames
    /// (e.g. by optical flow), given as a screen-space transform.
    ///
    /// Applied once per frame before `process_detections`. Each track's range
    /// is reused as its depth, assuming camera motion leaves range roughly
    /// unchanged.
    pub fn adjust_location(&mut self, transform: &Matrix3<f32>) {
        for track in &mut self.tracks {
            let depth = track.position().norm();
            track.adjust_for_ego_motion(transform, depth, &self.camera);
        }
    }

    /// Display snapshot of all surviving tracks
    pub fn display(&self) -> Vec<TrackedObjectDisplay> {
        self.tracks
            .iter()
            .map(|track| TrackedObjectDisplay {
                id: track.id().to_string(),
                position: track.position(),
                rect: track.screen_position(&self.camera),
                ratio: track.detected_ratio(),
            })
            .collect()
    }

    /// Projected position-history polylines, one per track
    pub fn screen_position_histories(&self) -> Vec<Vec<(i32, i32)>> {
        self.tracks
            .iter()
            .map(|track| track.screen_position_history(&self.camera))
            .collect()
    }

    /// Debug dump of id and position for every track
    pub fn print(&self) {
        for track in &self.tracks {
            let position = track.position();
            log::debug!(
                "{} location ({:.3}, {:.3}, {:.3})",
                track.id(),
                position.x,
                position.y,
                position.z
            );
        }
    }

    pub fn tracks(&self) -> &[TrackedObject] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
