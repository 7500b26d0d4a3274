//! Constant-acceleration Kalman filter for 3D position estimation

use anyhow::Result;
use nalgebra::{Matrix3, SMatrix, Vector3};

type StateVector = SMatrix<f32, 9, 1>;
type StateMatrix = SMatrix<f32, 9, 9>;
type ObservationMatrix = SMatrix<f32, 3, 9>;

const MEASUREMENT_VARIANCE: f32 = 0.1;

/// Per-track motion filter.
///
/// State is [x y z, vx vy vz, ax ay az] advanced with a fixed time step;
/// only the position is observed. `predict` advances the state one step and
/// `update` runs the correct step against an observed position, so a full
/// frame cycle is one `predict` followed by one `update`.
#[derive(Debug, Clone)]
pub struct PositionKalmanFilter {
    /// State vector: position, velocity, acceleration
    state: StateVector,
    /// State covariance matrix
    covariance: StateMatrix,
    /// State transition matrix
    transition: StateMatrix,
    /// Observation matrix (position only)
    observation: ObservationMatrix,
    /// Process noise covariance
    process_noise: StateMatrix,
    /// Observation noise covariance
    measurement_noise: Matrix3<f32>,
}

impl PositionKalmanFilter {
    /// Create a filter at `initial` position with zero velocity and
    /// acceleration.
    ///
    /// `accel_noise_mag` scales the process noise: larger values let the
    /// filter chase fast direction changes at the cost of jitter.
    pub fn new(initial: Vector3<f32>, dt: f32, accel_noise_mag: f32) -> Self {
        let mut state = StateVector::zeros();
        state[0] = initial.x;
        state[1] = initial.y;
        state[2] = initial.z;

        // Position certain from the first observation, derivatives unknown
        let mut covariance = StateMatrix::identity() * 10.0;
        for i in 3..9 {
            covariance[(i, i)] = 100.0;
        }

        let mut transition = StateMatrix::identity();
        for axis in 0..3 {
            transition[(axis, axis + 3)] = dt;
            transition[(axis, axis + 6)] = dt * dt / 2.0;
            transition[(axis + 3, axis + 6)] = dt;
        }

        let mut observation = ObservationMatrix::zeros();
        for axis in 0..3 {
            observation[(axis, axis)] = 1.0;
        }

        // Discrete white-noise-acceleration covariance per axis
        let dt2 = dt * dt;
        let q_block = [
            [dt2 * dt2 / 4.0, dt2 * dt / 2.0, dt2 / 2.0],
            [dt2 * dt / 2.0, dt2, dt],
            [dt2 / 2.0, dt, 1.0],
        ];
        let mut process_noise = StateMatrix::zeros();
        for axis in 0..3 {
            for (i, row) in q_block.iter().enumerate() {
                for (j, q) in row.iter().enumerate() {
                    process_noise[(axis + 3 * i, axis + 3 * j)] = q * accel_noise_mag;
                }
            }
        }

        Self {
            state,
            covariance,
            transition,
            observation,
            process_noise,
            measurement_noise: Matrix3::identity() * MEASUREMENT_VARIANCE,
        }
    }

    /// Advance the state one time step and return the predicted position
    pub fn predict(&mut self) -> Vector3<f32> {
        // x = F * x
        self.state = self.transition * self.state;

        // P = F * P * F^T + Q
        self.covariance =
            self.transition * self.covariance * self.transition.transpose() + self.process_noise;

        self.position()
    }

    /// Correct the state with an observed position and return the new
    /// estimate
    pub fn update(&mut self, observed: Vector3<f32>) -> Result<Vector3<f32>> {
        // Residual: y = z - H * x
        let residual = observed - self.observation * self.state;

        // Innovation covariance: S = H * P * H^T + R
        let innovation =
            self.observation * self.covariance * self.observation.transpose()
                + self.measurement_noise;

        // Kalman gain: K = P * H^T * S^-1
        let innovation_inv = innovation
            .try_inverse()
            .ok_or_else(|| anyhow::anyhow!("failed to invert innovation covariance matrix"))?;
        let gain = self.covariance * self.observation.transpose() * innovation_inv;

        // x = x + K * y
        self.state += gain * residual;

        // P = (I - K * H) * P
        self.covariance = (StateMatrix::identity() - gain * self.observation) * self.covariance;

        Ok(self.position())
    }

    /// Translate the position estimate without touching velocity or
    /// acceleration.
    ///
    /// Used to fold externally measured camera ego-motion into the track
    /// between frames.
    pub fn nudge(&mut self, delta: Vector3<f32>) {
        self.state[0] += delta.x;
        self.state[1] += delta.y;
        self.state[2] += delta.z;
    }

    /// Current position estimate
    pub fn position(&self) -> Vector3<f32> {
        Vector3::new(self.state[0], self.state[1], self.state[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_initial_state() {
        let kf = PositionKalmanFilter::new(Vector3::new(1.0, 2.0, 3.0), 0.1, 0.5);
        assert_abs_diff_eq!(kf.position().x, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(kf.position().y, 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(kf.position().z, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_predict_holds_still_without_velocity() {
        let mut kf = PositionKalmanFilter::new(Vector3::new(1.0, 1.0, 0.0), 0.1, 0.5);
        let predicted = kf.predict();
        assert_abs_diff_eq!(predicted.x, 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(predicted.y, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_update_pulls_toward_measurement() {
        let mut kf = PositionKalmanFilter::new(Vector3::zeros(), 0.1, 0.5);
        kf.predict();
        let corrected = kf.update(Vector3::new(1.0, 0.0, 0.0)).unwrap();

        // High initial uncertainty, so the estimate lands near the
        // measurement
        assert!(corrected.x > 0.8 && corrected.x <= 1.0);
        assert_abs_diff_eq!(corrected.y, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_velocity_is_learned_across_updates() {
        let mut kf = PositionKalmanFilter::new(Vector3::zeros(), 1.0, 0.5);
        for i in 1..=20 {
            kf.predict();
            kf.update(Vector3::new(i as f32, 0.0, 0.0)).unwrap();
        }
        // With a settled velocity estimate, prediction keeps moving forward
        let before = kf.position().x;
        let predicted = kf.predict();
        assert!(predicted.x > before + 0.5);
    }

    #[test]
    fn test_nudge_shifts_position_only() {
        let mut kf = PositionKalmanFilter::new(Vector3::new(1.0, 1.0, 1.0), 0.1, 0.5);
        kf.nudge(Vector3::new(0.5, -0.5, 0.0));
        assert_abs_diff_eq!(kf.position().x, 1.5, epsilon = 1e-6);
        assert_abs_diff_eq!(kf.position().y, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(kf.position().z, 1.0, epsilon = 1e-6);

        // A nudged filter predicts from the shifted position with unchanged
        // derivatives
        let predicted = kf.predict();
        assert_abs_diff_eq!(predicted.x, 1.5, epsilon = 1e-4);
    }
}
