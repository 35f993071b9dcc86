// ─────────────────────────────────────────────────────────────────────
// Enrichment Cascade Core — Nelder-Mead Simplex Minimiser
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Derivative-free Nelder-Mead minimiser on fixed-size parameter vectors.
//!
//! Standard coefficients: reflection 1, expansion 2, contraction 1/2,
//! shrink 1/2. NaN objective values are treated as +inf, so callers can
//! encode box constraints by returning `f64::INFINITY` outside the domain.

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct NelderMeadConfig {
    /// Hard cap on simplex iterations.
    pub max_iters: usize,
    /// Stop as soon as the best value is at or below this.
    pub f_target: f64,
    /// Stop once every vertex is within this distance (max-norm) of the best.
    pub x_tol: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iters: 200,
            f_target: f64::NEG_INFINITY,
            x_tol: 1e-12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    TargetReached,
    SimplexCollapsed,
    MaxIterations,
}

#[derive(Debug, Clone)]
pub struct MinimizeResult<const N: usize> {
    pub x: [f64; N],
    pub value: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
}

impl<const N: usize> MinimizeResult<N> {
    /// True unless the iteration cap was hit.
    pub fn converged(&self) -> bool {
        self.termination != Termination::MaxIterations
    }
}

struct Counted<F> {
    f: F,
    evaluations: usize,
}

impl<F> Counted<F> {
    fn eval<const N: usize>(&mut self, x: &[f64; N]) -> f64
    where
        F: FnMut(&[f64; N]) -> f64,
    {
        self.evaluations += 1;
        let v = (self.f)(x);
        if v.is_nan() {
            f64::INFINITY
        } else {
            v
        }
    }
}

fn lerp<const N: usize>(from: &[f64; N], to: &[f64; N], t: f64) -> [f64; N] {
    let mut out = [0.0; N];
    for i in 0..N {
        out[i] = from[i] + t * (to[i] - from[i]);
    }
    out
}

fn diameter<const N: usize>(simplex: &[[f64; N]], best: usize) -> f64 {
    simplex
        .iter()
        .flat_map(|v| v.iter().zip(simplex[best].iter()).map(|(a, b)| (a - b).abs()))
        .fold(0.0_f64, f64::max)
}

/// Minimise `f` starting from `x0`. The initial simplex is `x0` plus one
/// vertex per axis displaced by `step[i]`.
pub fn nelder_mead<const N: usize, F>(
    f: F,
    x0: [f64; N],
    step: [f64; N],
    config: NelderMeadConfig,
) -> MinimizeResult<N>
where
    F: FnMut(&[f64; N]) -> f64,
{
    let mut obj = Counted { f, evaluations: 0 };

    let mut simplex: Vec<[f64; N]> = Vec::with_capacity(N + 1);
    simplex.push(x0);
    for i in 0..N {
        let mut v = x0;
        v[i] += step[i];
        simplex.push(v);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| obj.eval(v)).collect();
    let mut order: Vec<usize> = (0..=N).collect();
    let mut iterations = 0usize;

    let termination = loop {
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        let best = order[0];
        let worst = order[N];
        let second_worst = order[N.saturating_sub(1)];

        if values[best] <= config.f_target {
            break Termination::TargetReached;
        }
        if diameter(&simplex, best) <= config.x_tol {
            break Termination::SimplexCollapsed;
        }
        if iterations >= config.max_iters {
            break Termination::MaxIterations;
        }
        iterations += 1;

        let mut centroid = [0.0; N];
        for &idx in order.iter().take(N) {
            for (c, x) in centroid.iter_mut().zip(simplex[idx].iter()) {
                *c += x / N as f64;
            }
        }

        let reflected = lerp(&centroid, &simplex[worst], -REFLECTION);
        let f_reflected = obj.eval(&reflected);

        if f_reflected < values[best] {
            let expanded = lerp(&centroid, &simplex[worst], -EXPANSION);
            let f_expanded = obj.eval(&expanded);
            if f_expanded < f_reflected {
                simplex[worst] = expanded;
                values[worst] = f_expanded;
            } else {
                simplex[worst] = reflected;
                values[worst] = f_reflected;
            }
            continue;
        }
        if f_reflected < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = f_reflected;
            continue;
        }

        // Outside contraction if the reflection improved on the worst
        // vertex, inside contraction otherwise.
        let (contracted, bound) = if f_reflected < values[worst] {
            (lerp(&centroid, &reflected, CONTRACTION), f_reflected)
        } else {
            (lerp(&centroid, &simplex[worst], CONTRACTION), values[worst])
        };
        let f_contracted = obj.eval(&contracted);
        if f_contracted < bound {
            simplex[worst] = contracted;
            values[worst] = f_contracted;
            continue;
        }

        let anchor = simplex[best];
        for &idx in order.iter().skip(1) {
            simplex[idx] = lerp(&anchor, &simplex[idx], SHRINK);
            values[idx] = obj.eval(&simplex[idx]);
        }
    };

    let best = order[0];
    MinimizeResult {
        x: simplex[best],
        value: values[best],
        iterations,
        evaluations: obj.evaluations,
        termination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rosenbrock(x: &[f64; 2]) -> f64 {
        (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
    }

    #[test]
    fn test_quadratic_bowl() {
        let result = nelder_mead(
            |x: &[f64; 2]| (x[0] - 3.0).powi(2) + 2.0 * (x[1] + 1.0).powi(2),
            [0.0, 0.0],
            [0.5, 0.5],
            NelderMeadConfig {
                max_iters: 500,
                f_target: 1e-16,
                x_tol: 1e-14,
            },
        );
        assert!(result.converged(), "{:?}", result.termination);
        assert!((result.x[0] - 3.0).abs() < 1e-6, "x0 = {}", result.x[0]);
        assert!((result.x[1] + 1.0).abs() < 1e-6, "x1 = {}", result.x[1]);
    }

    #[test]
    fn test_rosenbrock() {
        let result = nelder_mead(
            rosenbrock,
            [-1.2, 1.0],
            [0.1, 0.1],
            NelderMeadConfig {
                max_iters: 2000,
                f_target: 1e-12,
                x_tol: 0.0,
            },
        );
        assert_eq!(result.termination, Termination::TargetReached);
        assert!((result.x[0] - 1.0).abs() < 1e-4, "x = {:?}", result.x);
    }

    #[test]
    fn test_iteration_cap_reported() {
        let result = nelder_mead(
            rosenbrock,
            [-1.2, 1.0],
            [0.1, 0.1],
            NelderMeadConfig {
                max_iters: 5,
                f_target: 1e-12,
                x_tol: 0.0,
            },
        );
        assert_eq!(result.termination, Termination::MaxIterations);
        assert_eq!(result.iterations, 5);
        assert!(!result.converged());
    }

    #[test]
    fn test_infinite_wall_respected() {
        // Minimum of the unconstrained parabola is at -2, outside the domain.
        let result = nelder_mead(
            |x: &[f64; 1]| {
                if x[0] <= 0.0 {
                    f64::INFINITY
                } else {
                    (x[0] + 2.0).powi(2)
                }
            },
            [1.0],
            [0.5],
            NelderMeadConfig::default(),
        );
        assert!(result.x[0] > 0.0, "left the domain: {:?}", result.x);
        assert!(result.x[0] < 1e-6, "should hug the wall: {:?}", result.x);
    }

    #[test]
    fn test_nan_treated_as_infinite() {
        let result = nelder_mead(
            |x: &[f64; 1]| if x[0] < 0.0 { f64::NAN } else { (x[0] - 1.0).powi(2) },
            [2.0],
            [0.5],
            NelderMeadConfig::default(),
        );
        assert!(result.value.is_finite());
        assert!((result.x[0] - 1.0).abs() < 1e-6);
    }
}
