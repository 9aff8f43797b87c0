//! Planar multilateration from range estimates
//!
//! Primary solver is weighted Gauss-Newton with Levenberg-Marquardt damping
//! and an optional pull toward the previously tracked position. Linear
//! least squares and a weighted centroid back it up.

use crate::core::{AnchorId, AnchorPosition, ConditionedReading, SolveMethod, MIN_ANCHORS_2D};
use crate::utils::stats::{mean, median};
use crate::validation::error::{PositioningError, PositioningResult};
use crate::validation::quality::geometric_factor;
use nalgebra::{DMatrix, DVector, Matrix2, Vector2};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Solver parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Anchors kept per solve (3..=6)
    pub max_anchors: usize,
    pub max_iterations: usize,
    /// Step norm (meters) below which the solver stops
    pub step_tolerance: f64,
    pub initial_lambda: f64,
    /// Strength of the pull toward the prior position
    pub prior_weight: f64,
    /// Guard for the Jacobian when the estimate sits on an anchor
    pub jacobian_epsilon: f64,
    /// Anchor spread (meters) below which the layout is a single point
    pub coincident_tolerance_m: f64,
    /// Smallest/largest scatter eigenvalue ratio that counts as a line
    pub collinear_ratio: f64,
    /// Relative determinant below which the linear system is singular
    pub singular_tolerance: f64,
    /// Scale each anchor's weight by the angular spread of the others
    pub geometric_weighting: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_anchors: 4,
            max_iterations: 30,
            step_tolerance: 1e-4,
            initial_lambda: 1e-3,
            prior_weight: 0.1,
            jacobian_epsilon: 1e-9,
            coincident_tolerance_m: 1e-3,
            collinear_ratio: 1e-3,
            singular_tolerance: 1e-9,
            geometric_weighting: true,
        }
    }
}

/// One anchor's contribution to a solve
#[derive(Debug, Clone, PartialEq)]
pub struct SolverInput {
    pub anchor_id: AnchorId,
    pub position: Vector2<f64>,
    pub distance: f64,
    pub weight: f64,
    /// Conditioned RSSI, used to break selection ties
    pub rssi: f64,
}

impl SolverInput {
    pub fn new(anchor: &AnchorPosition, distance: f64, weight: f64, rssi: f64) -> Self {
        Self {
            anchor_id: anchor.id.clone(),
            position: Vector2::new(anchor.x, anchor.y),
            distance,
            weight,
            rssi,
        }
    }

    pub fn from_reading(reading: &ConditionedReading, anchor: &AnchorPosition) -> Self {
        Self::new(anchor, reading.distance, reading.weight, reading.rssi)
    }

    fn is_usable(&self) -> bool {
        self.distance.is_finite()
            && self.distance > 0.0
            && self.weight.is_finite()
            && self.position.iter().all(|c| c.is_finite())
    }
}

/// Shape of the selected anchor layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    Coincident,
    Collinear,
    Spread,
}

/// Raw solver result
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub position: Vector2<f64>,
    /// Whether the primary solver met its step tolerance
    pub converged: bool,
    /// `||p - a_i|| - d_i` for each anchor used, in `anchor_ids` order
    pub residuals: Vec<f64>,
    pub method: SolveMethod,
    pub iterations: usize,
    /// Weighted sum of squared residuals
    pub cost: f64,
    pub anchor_ids: Vec<AnchorId>,
}

#[derive(Debug, Clone, Default)]
pub struct GeometrySolver {
    pub config: SolverConfig,
}

impl GeometrySolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Keep the `max_anchors` closest usable anchors.
    ///
    /// Ties on distance go to the stronger RSSI, then to the smaller id.
    /// When the closest anchors all share one position, the farthest kept
    /// anchor gives way to the closest one standing elsewhere.
    pub fn select_anchors(&self, inputs: &[SolverInput]) -> Vec<SolverInput> {
        let mut usable: Vec<SolverInput> = inputs.iter().filter(|i| i.is_usable()).cloned().collect();
        usable.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| b.rssi.total_cmp(&a.rssi))
                .then_with(|| a.anchor_id.cmp(&b.anchor_id))
        });

        let keep = self.config.max_anchors.max(MIN_ANCHORS_2D);
        if usable.len() <= keep {
            return usable;
        }
        let mut rest = usable.split_off(keep);
        if self.classify_geometry(&usable) == Geometry::Coincident {
            let mut trial = usable.clone();
            let last = trial.len() - 1;
            let replacement = rest.iter().position(|candidate| {
                trial[last] = candidate.clone();
                self.classify_geometry(&trial) != Geometry::Coincident
            });
            if let Some(index) = replacement {
                let replacement = rest.remove(index);
                debug!(anchor = %replacement.anchor_id, "closest anchors coincide, widening selection");
                usable[last] = replacement;
            }
        }
        usable
    }

    /// Classify the layout from the eigenvalues of its scatter matrix
    pub fn classify_geometry(&self, inputs: &[SolverInput]) -> Geometry {
        if inputs.is_empty() {
            return Geometry::Coincident;
        }
        let n = inputs.len() as f64;
        let center = inputs.iter().map(|i| i.position).sum::<Vector2<f64>>() / n;
        let scatter = inputs.iter().fold(Matrix2::zeros(), |acc, i| {
            let d = i.position - center;
            acc + d * d.transpose()
        }) / n;

        let eigenvalues = scatter.symmetric_eigen().eigenvalues;
        let largest = eigenvalues[0].max(eigenvalues[1]);
        let smallest = eigenvalues[0].min(eigenvalues[1]).max(0.0);

        if largest <= self.config.coincident_tolerance_m.powi(2) {
            Geometry::Coincident
        } else if smallest / largest < self.config.collinear_ratio {
            Geometry::Collinear
        } else {
            Geometry::Spread
        }
    }

    /// Estimate a position from at least three anchors.
    ///
    /// `prior` is the previously tracked position; it seeds the iteration
    /// and regularizes it.
    pub fn solve(&self, inputs: &[SolverInput], prior: Option<Vector2<f64>>) -> PositioningResult<SolveOutcome> {
        let mut selected = self.select_anchors(inputs);
        if selected.len() < MIN_ANCHORS_2D {
            return Err(PositioningError::InsufficientAnchors {
                available: selected.len(),
                required: MIN_ANCHORS_2D,
            });
        }

        let geometry = self.classify_geometry(&selected);
        if geometry == Geometry::Coincident {
            return Err(PositioningError::DegenerateGeometry {
                reason: format!("{} anchors share one position", selected.len()),
            });
        }
        if self.config.geometric_weighting {
            apply_geometric_factors(&mut selected);
        }
        normalize_weights(&mut selected);

        let prior = prior.filter(|p| p.iter().all(|c| c.is_finite()));
        let mut attempt = None;
        if geometry == Geometry::Spread || prior.is_some() {
            attempt = self
                .levenberg_marquardt(&selected, prior)
                .filter(|(p, _, _)| p.iter().all(|c| c.is_finite()))
                .map(|(p, converged, iterations)| (p, SolveMethod::LevenbergMarquardt, converged, iterations));
        } else {
            debug!(anchors = selected.len(), "collinear anchors without prior, skipping iterative solve");
        }

        let (position, method, converged, iterations) = match attempt {
            Some(found) => found,
            None => match self.linear_least_squares(&selected) {
                Some(p) => (p, SolveMethod::LinearLeastSquares, false, 0),
                None => (weighted_centroid(&selected), SolveMethod::WeightedCentroid, false, 0),
            },
        };

        let residuals: Vec<f64> = selected.iter().map(|i| (position - i.position).norm() - i.distance).collect();
        let cost: f64 = selected.iter().zip(&residuals).map(|(i, r)| i.weight * r * r).sum();
        trace!(?method, converged, iterations, cost, "solve finished");

        Ok(SolveOutcome {
            position,
            converged,
            residuals,
            method,
            iterations,
            cost,
            anchor_ids: selected.into_iter().map(|i| i.anchor_id).collect(),
        })
    }

    /// Starting points for the iterative solve: the prior, the
    /// inverse-distance centroid, and the coordinate-wise median and mean of
    /// the anchors. Points closer than the step tolerance to an earlier one
    /// are dropped.
    pub fn initial_points(&self, inputs: &[SolverInput], prior: Option<Vector2<f64>>) -> Vec<Vector2<f64>> {
        let xs: Vec<f64> = inputs.iter().map(|i| i.position.x).collect();
        let ys: Vec<f64> = inputs.iter().map(|i| i.position.y).collect();
        let candidates = [
            prior,
            (!inputs.is_empty()).then(|| weighted_centroid(inputs)),
            median(&xs).zip(median(&ys)).map(|(x, y)| Vector2::new(x, y)),
            mean(&xs).zip(mean(&ys)).map(|(x, y)| Vector2::new(x, y)),
        ];

        let mut points: Vec<Vector2<f64>> = Vec::with_capacity(candidates.len());
        for point in candidates.into_iter().flatten() {
            let distinct = points.iter().all(|p| (p - point).norm() >= self.config.step_tolerance);
            if point.iter().all(|c| c.is_finite()) && distinct {
                points.push(point);
            }
        }
        points
    }

    /// Multi-start damped Gauss-Newton. Keeps the run with the lowest
    /// objective; an earlier start wins unless a later one improves on it.
    /// Returns the estimate, whether the step tolerance was met, and the
    /// iteration count of the kept run.
    fn levenberg_marquardt(
        &self,
        inputs: &[SolverInput],
        prior: Option<Vector2<f64>>,
    ) -> Option<(Vector2<f64>, bool, usize)> {
        let mut best: Option<(f64, (Vector2<f64>, bool, usize))> = None;
        for start in self.initial_points(inputs, prior) {
            let run = self.refine(inputs, start, prior);
            if !run.0.iter().all(|c| c.is_finite()) {
                continue;
            }
            let cost = self.objective(inputs, &run.0, prior);
            trace!(start_x = start.x, start_y = start.y, cost, "start refined");
            match &best {
                Some((best_cost, _)) if cost >= best_cost - 1e-12 => {}
                _ => best = Some((cost, run)),
            }
        }
        best.map(|(_, run)| run)
    }

    /// One damped Gauss-Newton run from `start`
    fn refine(
        &self,
        inputs: &[SolverInput],
        start: Vector2<f64>,
        prior: Option<Vector2<f64>>,
    ) -> (Vector2<f64>, bool, usize) {
        let cfg = &self.config;
        let mut estimate = start;
        let mut cost = self.objective(inputs, &estimate, prior);
        let mut lambda = cfg.initial_lambda;

        for iteration in 1..=cfg.max_iterations {
            let (residuals, jacobian) = self.residuals_and_jacobian(inputs, &estimate);

            let mut normal = Matrix2::zeros();
            let mut gradient = Vector2::zeros();
            for (i, input) in inputs.iter().enumerate() {
                let row = Vector2::new(jacobian[(i, 0)], jacobian[(i, 1)]);
                normal += row * row.transpose() * input.weight;
                gradient += row * (input.weight * residuals[i]);
            }
            if let Some(anchor) = prior {
                normal += Matrix2::identity() * cfg.prior_weight;
                gradient += (estimate - anchor) * cfg.prior_weight;
            }

            let damped = normal + Matrix2::identity() * lambda;
            let step = match damped.try_inverse() {
                Some(inverse) => -(inverse * gradient),
                None => {
                    lambda *= 10.0;
                    continue;
                }
            };

            let candidate = estimate + step;
            let candidate_cost = self.objective(inputs, &candidate, prior);
            if candidate_cost <= cost {
                estimate = candidate;
                cost = candidate_cost;
                lambda = (lambda / 10.0).max(1e-12);
            } else {
                lambda = (lambda * 10.0).min(1e12);
            }

            if step.norm() < cfg.step_tolerance {
                return (estimate, true, iteration);
            }
        }

        (estimate, false, cfg.max_iterations)
    }

    /// Weighted squared range error plus the prior penalty
    fn objective(&self, inputs: &[SolverInput], estimate: &Vector2<f64>, prior: Option<Vector2<f64>>) -> f64 {
        let ranges: f64 = inputs
            .iter()
            .map(|i| i.weight * ((estimate - i.position).norm() - i.distance).powi(2))
            .sum();
        let penalty = prior.map_or(0.0, |p| self.config.prior_weight * (estimate - p).norm_squared());
        ranges + penalty
    }

    fn residuals_and_jacobian(&self, inputs: &[SolverInput], estimate: &Vector2<f64>) -> (DVector<f64>, DMatrix<f64>) {
        let n = inputs.len();
        let mut residuals = DVector::zeros(n);
        let mut jacobian = DMatrix::zeros(n, 2);

        for (i, input) in inputs.iter().enumerate() {
            let diff = estimate - input.position;
            let range = diff.norm();
            residuals[i] = range - input.distance;

            if range > self.config.jacobian_epsilon {
                jacobian[(i, 0)] = diff.x / range;
                jacobian[(i, 1)] = diff.y / range;
            }
        }

        (residuals, jacobian)
    }

    /// Subtract the first (closest) anchor's circle equation from the
    /// others and solve the weighted normal equations.
    pub fn linear_least_squares(&self, inputs: &[SolverInput]) -> Option<Vector2<f64>> {
        let (reference, rest) = inputs.split_first()?;
        if rest.len() < 2 {
            return None;
        }

        let mut normal = Matrix2::zeros();
        let mut rhs = Vector2::zeros();
        for input in rest {
            let row = (input.position - reference.position) * 2.0;
            let b = reference.distance.powi(2) - input.distance.powi(2) + input.position.norm_squared()
                - reference.position.norm_squared();
            normal += row * row.transpose() * input.weight;
            rhs += row * (input.weight * b);
        }

        let scale = normal.trace().powi(2);
        if scale <= 0.0 || normal.determinant().abs() <= self.config.singular_tolerance * scale {
            debug!("linear system is singular");
            return None;
        }
        let solution = normal.try_inverse()? * rhs;
        solution.iter().all(|c| c.is_finite()).then_some(solution)
    }
}

/// Centroid weighted by inverse distance
pub fn weighted_centroid(inputs: &[SolverInput]) -> Vector2<f64> {
    let mut total = 0.0;
    let mut sum = Vector2::zeros();
    for input in inputs {
        let w = 1.0 / input.distance.max(f64::EPSILON);
        sum += input.position * w;
        total += w;
    }
    if total > 0.0 {
        sum / total
    } else {
        Vector2::zeros()
    }
}

/// Multiply each weight by its anchor's angular-spread factor
fn apply_geometric_factors(inputs: &mut [SolverInput]) {
    let positions: Vec<Vector2<f64>> = inputs.iter().map(|i| i.position).collect();
    for (index, input) in inputs.iter_mut().enumerate() {
        input.weight *= geometric_factor(index, &positions);
    }
}

/// Scale weights to mean 1; non-positive or non-finite sets become uniform
fn normalize_weights(inputs: &mut [SolverInput]) {
    let mean = inputs.iter().map(|i| i.weight).sum::<f64>() / inputs.len() as f64;
    let valid = mean.is_finite() && mean > 0.0 && inputs.iter().all(|i| i.weight >= 0.0);
    for input in inputs.iter_mut() {
        input.weight = if valid { input.weight / mean } else { 1.0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn input(id: &str, x: f64, y: f64, distance: f64) -> SolverInput {
        SolverInput::new(&AnchorPosition::new(id, x, y), distance, 1.0 / distance.powi(2), -60.0)
    }

    fn exact_inputs(anchors: &[(&str, f64, f64)], target: (f64, f64)) -> Vec<SolverInput> {
        anchors
            .iter()
            .map(|(id, x, y)| input(id, *x, *y, (x - target.0).hypot(y - target.1)))
            .collect()
    }

    #[test]
    fn test_exact_trilateration() {
        let inputs = exact_inputs(&[("A", 0.0, 0.0), ("B", 10.0, 0.0), ("C", 0.0, 10.0)], (3.0, 4.0));
        let outcome = GeometrySolver::default().solve(&inputs, None).unwrap();

        assert_eq!(outcome.method, SolveMethod::LevenbergMarquardt);
        assert!(outcome.converged);
        assert_abs_diff_eq!(outcome.position.x, 3.0, epsilon = 1e-3);
        assert_abs_diff_eq!(outcome.position.y, 4.0, epsilon = 1e-3);
        assert!(outcome.residuals.iter().all(|r| r.abs() < 1e-3));
    }

    #[test]
    fn test_linear_least_squares_exact() {
        let solver = GeometrySolver::default();
        let mut inputs = exact_inputs(
            &[("A", 0.0, 0.0), ("B", 10.0, 0.0), ("C", 0.0, 10.0), ("D", 10.0, 10.0)],
            (6.0, 2.5),
        );
        normalize_weights(&mut inputs);
        let p = solver.linear_least_squares(&inputs).unwrap();
        assert_abs_diff_eq!(p.x, 6.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 2.5, epsilon = 1e-9);
    }

    #[test]
    fn test_collinear_without_prior_falls_back() {
        let inputs = vec![input("A", 0.0, 0.0, 5.0), input("B", 5.0, 0.0, 3.0), input("C", 10.0, 0.0, 5.0)];
        let solver = GeometrySolver::default();
        assert_eq!(solver.classify_geometry(&inputs), Geometry::Collinear);

        let outcome = solver.solve(&inputs, None).unwrap();
        assert_eq!(outcome.method, SolveMethod::WeightedCentroid);
        assert!(!outcome.converged);
        assert!(outcome.position.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_collinear_with_prior_picks_prior_side() {
        let inputs = exact_inputs(&[("A", 0.0, 0.0), ("B", 5.0, 0.0), ("C", 10.0, 0.0)], (5.0, 4.0));
        let outcome = GeometrySolver::default().solve(&inputs, Some(Vector2::new(5.0, 3.0))).unwrap();
        assert_eq!(outcome.method, SolveMethod::LevenbergMarquardt);
        assert!(outcome.position.y > 2.0);
    }

    #[test]
    fn test_coincident_anchors_rejected() {
        let inputs = vec![input("A", 1.0, 1.0, 2.0), input("B", 1.0, 1.0, 2.5), input("C", 1.0, 1.0, 3.0)];
        let err = GeometrySolver::default().solve(&inputs, None).unwrap_err();
        assert!(matches!(err, PositioningError::DegenerateGeometry { .. }));
    }

    #[test]
    fn test_coincident_nearest_anchors_widen_selection() {
        let near = 2f64.sqrt();
        let inputs = vec![
            input("A", 0.0, 0.0, near),
            input("B", 0.0, 0.0, near),
            input("C", 0.0, 0.0, near),
            input("D", 0.0, 0.0, near),
            input("E", 10.0, 0.0, 9f64.hypot(1.0)),
        ];
        let solver = GeometrySolver::default();
        let ids: Vec<_> = solver.select_anchors(&inputs).into_iter().map(|i| i.anchor_id).collect();
        assert_eq!(ids, vec![AnchorId::from("A"), AnchorId::from("B"), AnchorId::from("C"), AnchorId::from("E")]);

        let outcome = solver.solve(&inputs, None).unwrap();
        assert!(outcome.position.iter().all(|c| c.is_finite()));
        assert!(outcome.anchor_ids.contains(&AnchorId::from("E")));
        assert!(!outcome.converged);
    }

    #[test]
    fn test_all_coincident_anchors_rejected() {
        let inputs: Vec<_> = ["A", "B", "C", "D", "E"]
            .iter()
            .enumerate()
            .map(|(k, id)| input(id, 3.0, 3.0, 1.0 + k as f64))
            .collect();
        let err = GeometrySolver::default().solve(&inputs, None).unwrap_err();
        assert!(matches!(err, PositioningError::DegenerateGeometry { .. }));
    }

    #[test]
    fn test_initial_points_are_distinct() {
        let solver = GeometrySolver::default();
        let square = exact_inputs(
            &[("A", 0.0, 0.0), ("B", 10.0, 0.0), ("C", 10.0, 10.0), ("D", 0.0, 10.0)],
            (5.0, 5.0),
        );
        let points = solver.initial_points(&square, None);
        assert_eq!(points.len(), 1);
        assert_abs_diff_eq!(points[0].x, 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(points[0].y, 5.0, epsilon = 1e-9);

        let with_prior = solver.initial_points(&square, Some(Vector2::new(1.0, 2.0)));
        assert_eq!(with_prior.len(), 2);
        assert_eq!(with_prior[0], Vector2::new(1.0, 2.0));

        let triangle = exact_inputs(&[("A", 0.0, 0.0), ("B", 10.0, 0.0), ("C", 0.0, 10.0)], (2.0, 7.0));
        assert_eq!(solver.initial_points(&triangle, None).len(), 3);
    }

    #[test]
    fn test_multi_start_never_worse_than_centroid_start() {
        let solver = GeometrySolver::default();
        let mut inputs = exact_inputs(&[("A", 0.0, 0.0), ("B", 10.0, 0.0), ("C", 0.0, 10.0)], (8.0, 8.0));
        inputs[0].distance += 1.5;
        inputs[1].distance -= 1.0;
        normalize_weights(&mut inputs);

        let (single, _, _) = solver.refine(&inputs, weighted_centroid(&inputs), None);
        let (multi, _, _) = solver.levenberg_marquardt(&inputs, None).unwrap();
        assert!(solver.objective(&inputs, &multi, None) <= solver.objective(&inputs, &single, None) + 1e-12);
    }

    #[test]
    fn test_geometric_factors_scale_weights() {
        let mut inputs = vec![input("A", 0.0, 0.0, 1.0), input("B", 5.0, 0.0, 1.0), input("C", 10.0, 0.0, 1.0)];
        apply_geometric_factors(&mut inputs);
        let weights: Vec<f64> = inputs.iter().map(|i| i.weight).collect();
        assert_eq!(weights, vec![0.7, 1.2, 0.7]);
    }

    #[test]
    fn test_insufficient_anchors() {
        let mut inputs = vec![input("A", 0.0, 0.0, 2.0), input("B", 4.0, 0.0, 2.0)];
        inputs.push(input("C", 0.0, 4.0, f64::NAN));
        let err = GeometrySolver::default().solve(&inputs, None).unwrap_err();
        assert_eq!(err, PositioningError::InsufficientAnchors { available: 2, required: 3 });
    }

    #[test]
    fn test_selection_keeps_closest_with_tie_breaks() {
        let mut inputs = vec![
            input("E", 0.0, 0.0, 9.0),
            input("D", 1.0, 0.0, 2.0),
            input("C", 2.0, 0.0, 2.0),
            input("B", 3.0, 0.0, 1.0),
            input("A", 4.0, 0.0, 3.0),
        ];
        inputs[1].rssi = -70.0;
        inputs[2].rssi = -70.0;
        let solver = GeometrySolver::new(SolverConfig { max_anchors: 3, ..Default::default() });
        let ids: Vec<_> = solver.select_anchors(&inputs).into_iter().map(|i| i.anchor_id).collect();
        assert_eq!(ids, vec![AnchorId::from("B"), AnchorId::from("C"), AnchorId::from("D")]);

        inputs[1].rssi = -50.0;
        let ids: Vec<_> = solver.select_anchors(&inputs).into_iter().map(|i| i.anchor_id).collect();
        assert_eq!(ids, vec![AnchorId::from("B"), AnchorId::from("D"), AnchorId::from("C")]);
    }

    #[test]
    fn test_noisy_ranges_stay_close() {
        let mut inputs = exact_inputs(
            &[("A", 0.0, 0.0), ("B", 12.0, 0.0), ("C", 12.0, 9.0), ("D", 0.0, 9.0)],
            (4.0, 5.0),
        );
        for (i, offset) in [0.3, -0.2, 0.25, -0.15].iter().enumerate() {
            inputs[i].distance += offset;
        }
        let outcome = GeometrySolver::default().solve(&inputs, None).unwrap();
        assert!((outcome.position - Vector2::new(4.0, 5.0)).norm() < 0.6);
        assert!(outcome.cost > 0.0);
    }

    #[test]
    fn test_weights_normalized_to_mean_one() {
        let mut inputs = vec![input("A", 0.0, 0.0, 1.0), input("B", 1.0, 0.0, 2.0), input("C", 0.0, 1.0, 4.0)];
        normalize_weights(&mut inputs);
        let mean: f64 = inputs.iter().map(|i| i.weight).sum::<f64>() / 3.0;
        assert_abs_diff_eq!(mean, 1.0, epsilon = 1e-12);
        assert!(inputs[0].weight > inputs[2].weight);
    }
}
