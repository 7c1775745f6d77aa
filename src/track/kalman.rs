use kfilter::{
    measurement::LinearMeasurement, system::LinearNoInputSystem, Kalman1M, KalmanPredict,
};
use nalgebra::{SMatrix, SVector};

use super::bbox::BBox;

/// Constant-velocity Kalman filter over the (cx, cy, area, aspect) observation
/// of a box. State is 7-dimensional: the observation plus velocities for
/// center and area; aspect is modelled as constant.
pub struct KalmanBoxFilter {
    filter: Kalman1M<f64, 7, 0, 4, LinearNoInputSystem<f64, 7>, LinearMeasurement<f64, 7, 4>>,
}

impl KalmanBoxFilter {
    pub fn new(bbox: BBox) -> Self {
        let z = bbox.to_observation();

        let mut f = SMatrix::<f64, 7, 7>::identity();
        f[(0, 4)] = 1.0;
        f[(1, 5)] = 1.0;
        f[(2, 6)] = 1.0;
        let q_diag = SVector::<f64, 7>::from_vec(vec![1.0, 1.0, 1.0, 0.01, 0.01, 0.01, 0.0001]);
        let q = SMatrix::<f64, 7, 7>::from_diagonal(&q_diag);
        let mut x_initial = SVector::<f64, 7>::zeros();
        x_initial.fixed_rows_mut::<4>(0).copy_from(&z);
        let system = LinearNoInputSystem::new(f, q, x_initial);

        // High uncertainty on the unobserved velocities.
        let p_diag =
            SVector::<f64, 7>::from_vec(vec![10.0, 10.0, 10.0, 10.0, 10000.0, 10000.0, 10000.0]);
        let p = SMatrix::<f64, 7, 7>::from_diagonal(&p_diag);

        let h = SMatrix::<f64, 4, 7>::identity();
        let r_diag = SVector::<f64, 4>::new(1.0, 1.0, 10.0, 10.0);
        let r = SMatrix::from_diagonal(&r_diag);
        let measurement = LinearMeasurement::new(h, r, z);

        Self {
            filter: Kalman1M::new_custom(system, p, measurement),
        }
    }

    /// Advances the filter one frame and returns the predicted box.
    pub fn predict(&mut self) -> BBox {
        let predicted = self.filter.predict().fixed_rows::<4>(0).clone_owned();
        BBox::from_observation(predicted)
    }

    pub fn update(&mut self, bbox: BBox) {
        self.filter.update(bbox.to_observation());
    }
}
