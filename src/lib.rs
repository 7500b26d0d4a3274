//! Pure Rust 3D multi-object tracking library
//!
//! This crate turns noisy per-frame detections (screen rectangle + depth +
//! object type) into stable, identity-persistent 3D tracks with confidence
//! scores. It is the estimation core of a real-time robotics vision
//! pipeline: detector output goes in, a displayable track list comes out.
//!
//! # Frame cycle
//!
//! ```rust,ignore
//! use worldtrack::{CameraModel, ObjectType, Rect, TrackedObjectList, TrackerConfig};
//! use std::sync::Arc;
//!
//! let camera = CameraModel::new((1280, 720), (1.22, 0.75), 0.0);
//! let mut tracker = TrackedObjectList::new(camera, TrackerConfig::default());
//!
//! let ball = Arc::new(ObjectType::ball());
//! tracker.process_detections(&[Rect::new(100, 100, 20, 20)], &[2.0], &[ball])?;
//! for record in tracker.display() {
//!     println!("{} at {:?} ({:.0}%)", record.id, record.position, record.ratio * 100.0);
//! }
//! ```

pub mod error;
pub mod geometry;
pub mod hungarian; // Hungarian algorithm for optimal assignment
pub mod kalman;
pub mod object_type;
pub mod tracked_object;
pub mod tracker;

pub use error::{Result, TrackError};
pub use geometry::{CameraModel, Rect};
pub use hungarian::{AssignmentResult, AssignmentSolver};
pub use kalman::PositionKalmanFilter;
pub use object_type::ObjectType;
pub use tracked_object::TrackedObject;
pub use tracker::{TrackedObjectDisplay, TrackedObjectList, TrackerConfig};
