//! Constrained least-distance search for mixing ratios.
//!
//! The ratios of the candidate paints live on the probability simplex: each in
//! `[0, 1]`, summing to exactly one. The search is spectral projected
//! gradient: each Barzilai-Borwein step is projected onto the simplex and
//! backtracked under an Armijo condition. It minimizes the squared Lab
//! distance of the unrounded composite, with central-difference gradients.
//!
//! The subtractive model has local minima, so the search runs from the uniform
//! mix and from every single-paint vertex, and keeps whichever result mixes
//! closest to the target once rounded. Single paints are finalists too, so an
//! optimized mix never loses to the nearest candidate on its own.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Paint;
use crate::color::{Perceptual, distance, perceptual_from_channels, to_perceptual};
use crate::error::ConfigError;
use crate::mix::{MixRatio, composite, subtractive_channels};

const GRADIENT_STEP: f64 = 1e-7;
const ARMIJO: f64 = 1e-4;
const INITIAL_STEP: f64 = 1.0;
const MIN_STEP: f64 = 1e-10;
const MAX_STEP: f64 = 1e10;
const MIN_BACKTRACK: f64 = 1e-12;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Gradient steps per start before giving up.
    pub max_iterations: usize,
    /// A step that moves no ratio by more than `step_tolerance` and improves
    /// the distance by less than this ends the search.
    pub tolerance: f64,
    /// Stationary once the projected gradient moves no ratio by more.
    pub step_tolerance: f64,
    /// Ratios below this are dropped from the result.
    pub negligible_ratio: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-6,
            step_tolerance: 1e-7,
            negligible_ratio: 0.01,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("tolerance", self.tolerance),
            ("step_tolerance", self.step_tolerance),
            ("negligible_ratio", self.negligible_ratio),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Optimizer { field, value });
            }
        }
        Ok(())
    }
}

/// Why the optimizer produced no ratios. The caller is expected to fall back
/// to the heuristic mix.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum Infeasible {
    #[error("no candidate paints to mix")]
    NoCandidates,

    #[error("did not converge within {0} iterations")]
    IterationLimit(usize),

    #[error("objective became non-finite")]
    NonFinite,

    #[error("every ratio fell below the negligible threshold")]
    AllNegligible,
}

/// Find the ratios of `candidates` whose mix lands closest to `target`.
///
/// On success the ratios are all at least `negligible_ratio` (before
/// renormalization) and sum to one. Fails only when no start converges; the
/// reason is the one from the uniform start.
pub fn optimize<'p>(
    target: Perceptual,
    candidates: &[&'p Paint],
    config: &OptimizerConfig,
) -> Result<MixRatio<'p>, Infeasible> {
    if candidates.is_empty() {
        return Err(Infeasible::NoCandidates);
    }

    let objective = Objective { target, candidates };
    let n = candidates.len();
    let mut starts = vec![vec![1.0 / n as f64; n]];
    if n > 1 {
        starts.extend((0..n).map(|i| vertex(n, i)));
    }

    let mut best: Option<(f64, MixRatio<'p>)> = None;
    let mut failure = None;
    for start in starts {
        let solved = descend(&objective, start, config)
            .and_then(|ratios| postprocess(candidates, &ratios, config.negligible_ratio));
        match solved {
            Ok(ratios) => {
                let found = scored(target, ratios);
                if best.as_ref().is_none_or(|(d, _)| found.0 < *d) {
                    best = Some(found);
                }
            }
            Err(reason) => {
                failure.get_or_insert(reason);
            }
        }
    }

    let Some(mut best) = best else {
        return Err(failure.unwrap_or(Infeasible::NoCandidates));
    };
    for &paint in candidates {
        let single = scored(target, MixRatio::single(paint));
        if single.0 < best.0 {
            best = single;
        }
    }

    tracing::debug!(recipe = %best.1, distance = best.0, "optimized mix");
    Ok(best.1)
}

fn vertex(n: usize, i: usize) -> Vec<f64> {
    let mut x = vec![0.0; n];
    x[i] = 1.0;
    x
}

/// Pair a mix with the distance of its rounded composite to `target`.
fn scored(target: Perceptual, ratios: MixRatio<'_>) -> (f64, MixRatio<'_>) {
    (distance(to_perceptual(composite(&ratios)), target), ratios)
}

struct Objective<'a, 'p> {
    target: Perceptual,
    candidates: &'a [&'p Paint],
}

impl Objective<'_, '_> {
    /// Squared distance of the unrounded composite to the target.
    fn eval(&self, ratios: &[f64]) -> f64 {
        let entries: Vec<(&Paint, f64)> = self
            .candidates
            .iter()
            .copied()
            .zip(ratios.iter().copied())
            .collect();
        let mixed = subtractive_channels(&entries).map(|c| c * 255.0);
        let d = distance(perceptual_from_channels(mixed), self.target);
        d * d
    }

    fn gradient(&self, ratios: &[f64]) -> Vec<f64> {
        let mut probe = ratios.to_vec();
        (0..ratios.len())
            .map(|i| {
                probe[i] = ratios[i] + GRADIENT_STEP;
                let up = self.eval(&probe);
                probe[i] = ratios[i] - GRADIENT_STEP;
                let down = self.eval(&probe);
                probe[i] = ratios[i];
                (up - down) / (2.0 * GRADIENT_STEP)
            })
            .collect()
    }
}

fn dot(x: &[f64], y: &[f64]) -> f64 {
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}

fn max_abs(x: &[f64]) -> f64 {
    x.iter().map(|v| v.abs()).fold(0.0, f64::max)
}

/// `project(x - step * gradient) - x`
fn projected_direction(x: &[f64], gradient: &[f64], step: f64) -> Vec<f64> {
    let moved: Vec<f64> = x
        .iter()
        .zip(gradient)
        .map(|(xi, gi)| xi - step * gi)
        .collect();
    project_onto_simplex(&moved)
        .iter()
        .zip(x)
        .map(|(pi, xi)| pi - xi)
        .collect()
}

fn descend(
    objective: &Objective<'_, '_>,
    start: Vec<f64>,
    config: &OptimizerConfig,
) -> Result<Vec<f64>, Infeasible> {
    let mut x = start;
    let mut fx = objective.eval(&x);
    let mut gradient = objective.gradient(&x);
    let mut step = INITIAL_STEP;

    for iteration in 0..config.max_iterations {
        if !fx.is_finite() || gradient.iter().any(|g| !g.is_finite()) {
            return Err(Infeasible::NonFinite);
        }
        if fx <= f64::EPSILON {
            tracing::debug!(iteration, "exact match");
            return Ok(x);
        }
        if max_abs(&projected_direction(&x, &gradient, 1.0)) <= config.step_tolerance {
            tracing::debug!(iteration, distance = fx.sqrt(), "stationary");
            return Ok(x);
        }

        let direction = projected_direction(&x, &gradient, step);
        let slope = dot(&gradient, &direction);
        let mut lambda = 1.0;
        let (next, f_next) = loop {
            let trial: Vec<f64> = x
                .iter()
                .zip(&direction)
                .map(|(xi, di)| xi + lambda * di)
                .collect();
            let f_trial = objective.eval(&trial);
            if f_trial <= fx + ARMIJO * lambda * slope {
                break (trial, f_trial);
            }
            lambda *= 0.5;
            if lambda < MIN_BACKTRACK {
                tracing::debug!(iteration, distance = fx.sqrt(), "no descent direction left");
                return Ok(x);
            }
        };

        let next_gradient = objective.gradient(&next);
        let s: Vec<f64> = next.iter().zip(&x).map(|(a, b)| a - b).collect();
        let y: Vec<f64> = next_gradient
            .iter()
            .zip(&gradient)
            .map(|(a, b)| a - b)
            .collect();
        let curvature = dot(&s, &y);
        step = if curvature > 0.0 {
            (dot(&s, &s) / curvature).clamp(MIN_STEP, MAX_STEP)
        } else {
            MAX_STEP
        };

        let improvement = fx.sqrt() - f_next.sqrt();
        x = next;
        fx = f_next;
        gradient = next_gradient;

        if max_abs(&s) <= config.step_tolerance && improvement <= config.tolerance {
            tracing::debug!(iteration, distance = fx.sqrt(), "optimizer converged");
            return Ok(x);
        }
    }

    Err(Infeasible::IterationLimit(config.max_iterations))
}

/// Drop negligible ratios and renormalize the rest to sum to one.
fn postprocess<'p>(
    candidates: &[&'p Paint],
    ratios: &[f64],
    negligible: f64,
) -> Result<MixRatio<'p>, Infeasible> {
    let kept: Vec<f64> = ratios
        .iter()
        .map(|&r| if r < negligible { 0.0 } else { r })
        .collect();
    let total: f64 = kept.iter().sum();
    if total <= 0.0 {
        return Err(Infeasible::AllNegligible);
    }

    Ok(candidates
        .iter()
        .copied()
        .zip(kept)
        .map(|(paint, ratio)| (paint, ratio / total))
        .collect())
}

/// Euclidean projection onto `{x : x_i >= 0, Σ x_i = 1}`.
///
/// Sort descending, find the largest prefix whose shifted values stay
/// positive, and subtract that shift from everything.
pub(crate) fn project_onto_simplex(v: &[f64]) -> Vec<f64> {
    let mut sorted = v.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let mut cumulative = 0.0;
    let mut theta = 0.0;
    for (j, &u) in sorted.iter().enumerate() {
        cumulative += u;
        let shift = (cumulative - 1.0) / (j + 1) as f64;
        if u - shift > 0.0 {
            theta = shift;
        }
    }

    v.iter().map(|&x| (x - theta).max(0.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Palette;
    use crate::color::{DeviceColor, to_perceptual};
    use crate::mix::composite;
    use crate::select::select_candidates;

    fn assert_on_simplex(x: &[f64]) {
        assert!(x.iter().all(|&xi| (0.0..=1.0).contains(&xi)), "{x:?}");
        assert!((x.iter().sum::<f64>() - 1.0).abs() < 1e-12, "{x:?}");
    }

    #[test]
    fn projection_lands_on_the_simplex() {
        for v in [
            vec![0.25, 0.25, 0.25, 0.25],
            vec![3.0, -1.0, 0.5],
            vec![-2.0, -3.0],
            vec![0.9, 0.9, 0.9],
            vec![7.0],
        ] {
            assert_on_simplex(&project_onto_simplex(&v));
        }
    }

    #[test]
    fn projection_keeps_points_already_inside() {
        let v = [0.5, 0.3, 0.2];
        let projected = project_onto_simplex(&v);
        for (a, b) in v.iter().zip(&projected) {
            assert!((a - b).abs() < 1e-12);
        }
        assert_eq!(project_onto_simplex(&[3.0, -1.0]), vec![1.0, 0.0]);
    }

    #[test]
    fn exact_catalog_color_resolves_to_that_paint() {
        let palette = Palette::standard().unwrap();
        let target = to_perceptual(DeviceColor::new(16, 8, 1, 1.0));
        let candidates = select_candidates(&palette, target, 4);

        let ratios = optimize(target, &candidates, &OptimizerConfig::default()).unwrap();
        let mixed = to_perceptual(composite(&ratios));
        assert!(distance(mixed, target) < 1.0, "{ratios}");

        let dominant = ratios
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(paint, _)| paint.name());
        assert_eq!(dominant, Some("Mars Black"));
    }

    #[test]
    fn ratios_sum_to_one_and_skip_negligible_paints() {
        let palette = Palette::standard().unwrap();
        let config = OptimizerConfig::default();
        for color in [
            DeviceColor::new(120, 40, 30, 1.0),
            DeviceColor::new(200, 150, 100, 1.0),
            DeviceColor::new(30, 90, 200, 1.0),
        ] {
            let target = to_perceptual(color);
            let candidates = select_candidates(&palette, target, 4);
            let ratios = optimize(target, &candidates, &config).unwrap();

            assert!(!ratios.is_empty());
            assert!((ratios.total() - 1.0).abs() < 1e-9);
            assert!(ratios.iter().all(|(_, r)| r >= config.negligible_ratio));
            assert!(ratios.len() <= candidates.len());
        }
    }

    #[test]
    fn mixing_beats_the_uniform_starting_point() {
        let palette = Palette::standard().unwrap();
        let target = to_perceptual(DeviceColor::new(120, 40, 30, 1.0));
        let candidates = select_candidates(&palette, target, 4);

        let uniform: MixRatio = candidates.iter().map(|&paint| (paint, 0.25)).collect();
        let optimized = optimize(target, &candidates, &OptimizerConfig::default()).unwrap();

        let before = distance(to_perceptual(composite(&uniform)), target);
        let after = distance(to_perceptual(composite(&optimized)), target);
        assert!(after < before, "{after} >= {before}");
    }

    #[test]
    fn uniform_start_settles_on_greys() {
        let palette = Palette::standard().unwrap();
        let config = OptimizerConfig::default();
        for level in [51, 102, 128, 153, 204] {
            let target = to_perceptual(DeviceColor::new(level, level, level, 1.0));
            let candidates = select_candidates(&palette, target, 4);
            let objective = Objective {
                target,
                candidates: &candidates,
            };
            let uniform = vec![0.25; candidates.len()];
            assert!(
                descend(&objective, uniform, &config).is_ok(),
                "grey {level} did not settle"
            );
        }
    }

    #[test]
    fn mid_grey_mixes_black_and_white() {
        let palette = Palette::standard().unwrap();
        let target = to_perceptual(DeviceColor::new(102, 102, 102, 1.0));
        let candidates = select_candidates(&palette, target, 4);

        let ratios = optimize(target, &candidates, &OptimizerConfig::default()).unwrap();
        let mixed = to_perceptual(composite(&ratios));
        assert!(distance(mixed, target) < 1.0, "{ratios}");
        assert!(ratios.contains("Mars Black"), "{ratios}");
        assert!(ratios.contains("Titanium White"), "{ratios}");
    }

    #[test]
    fn never_loses_to_a_single_candidate() {
        let palette = Palette::standard().unwrap();
        let config = OptimizerConfig::default();
        for color in [
            DeviceColor::new(255, 153, 0, 1.0),
            DeviceColor::new(255, 0, 0, 1.0),
            DeviceColor::new(153, 255, 51, 1.0),
            DeviceColor::new(255, 204, 0, 1.0),
            DeviceColor::new(102, 102, 102, 1.0),
        ] {
            let target = to_perceptual(color);
            let candidates = select_candidates(&palette, target, 4);
            let ratios = optimize(target, &candidates, &config).unwrap();
            let mixed = distance(to_perceptual(composite(&ratios)), target);

            for paint in &candidates {
                let alone = distance(paint.perceptual(), target);
                assert!(
                    mixed <= alone + 1e-9,
                    "{color}: {ratios} at {mixed} loses to {} at {alone}",
                    paint.name()
                );
            }
        }
    }

    #[test]
    fn single_candidate_takes_everything() {
        let palette = Palette::standard().unwrap();
        let ultramarine = palette.get("Ultramarine").unwrap();
        let target = to_perceptual(DeviceColor::new(30, 90, 200, 1.0));

        let ratios = optimize(target, &[ultramarine], &OptimizerConfig::default()).unwrap();
        assert_eq!(ratios, MixRatio::single(ultramarine));
    }

    #[test]
    fn reports_infeasible_instead_of_panicking() {
        let palette = Palette::standard().unwrap();
        let target = to_perceptual(DeviceColor::new(120, 40, 30, 1.0));
        let candidates = select_candidates(&palette, target, 4);

        assert_eq!(
            optimize(target, &[], &OptimizerConfig::default()),
            Err(Infeasible::NoCandidates)
        );

        let exhausted = OptimizerConfig {
            max_iterations: 0,
            ..OptimizerConfig::default()
        };
        assert_eq!(
            optimize(target, &candidates, &exhausted),
            Err(Infeasible::IterationLimit(0))
        );

        let everything_negligible = OptimizerConfig {
            negligible_ratio: 2.0,
            ..OptimizerConfig::default()
        };
        assert_eq!(
            optimize(target, &candidates, &everything_negligible),
            Err(Infeasible::AllNegligible)
        );
    }

    #[test]
    fn rejects_bad_settings() {
        let config = OptimizerConfig {
            tolerance: f64::NAN,
            ..OptimizerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Optimizer {
                field: "tolerance",
                ..
            })
        ));
        assert_eq!(OptimizerConfig::default().validate(), Ok(()));
    }
}
