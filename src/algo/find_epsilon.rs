//! Epsilon search: find the welding threshold for a target reduction rate.
//!
//! The welder treats epsilon as an input; this driver inverts it. Given a
//! target vertex reduction rate `r = 1 - new_count / old_count`, it first
//! walks epsilon upward in fixed steps until two consecutive probes bracket
//! the target, then bisects the bracket. Every probe welds a fresh copy of
//! the mesh (welding is destructive) against the shared spatial index.
//!
//! Reduction rate is a step function of epsilon on any finite mesh, so the
//! search can terminate two ways: it finds an epsilon whose rate is within
//! [`EpsilonSearchOptions::rate_tolerance`] of the target, or it narrows the
//! bracket below [`EpsilonSearchOptions::epsilon_tolerance`] around a jump
//! of the step function and returns the midpoint.
//!
//! # Example
//!
//! ```no_run
//! use smelt::algo::find_epsilon::{find_epsilon, EpsilonSearchOptions};
//! use smelt::mesh::TriangleMesh;
//! use smelt::spatial::SpatialIndex;
//!
//! # fn demo(mesh: TriangleMesh) -> smelt::error::Result<()> {
//! let index = SpatialIndex::build(&mesh.vertices);
//! let options = EpsilonSearchOptions::default();
//! let eps = find_epsilon(&mesh, &index, 0.5, &options)?;
//! println!("weld at epsilon = {eps}");
//! # Ok(())
//! # }
//! ```

use crate::algo::progress::{ProgressSink, Silent};
use crate::algo::weld::weld_forward;
use crate::error::{MeshError, Result};
use crate::mesh::TriangleMesh;
use crate::spatial::SpatialIndex;

/// Options for the epsilon search.
#[derive(Debug, Clone)]
pub struct EpsilonSearchOptions {
    /// Step width of the linear bracket phase.
    pub step_size: f64,

    /// Hard cap on the linear phase. Probing large epsilons is expensive;
    /// if no bracket is found below the cap the search fails with
    /// [`MeshError::EpsilonOutOfRange`].
    pub max_epsilon: f64,

    /// Absolute tolerance for accepting a probed reduction rate as equal to
    /// the target.
    pub rate_tolerance: f64,

    /// Smallest bracket width worth bisecting further.
    pub epsilon_tolerance: f64,
}

impl Default for EpsilonSearchOptions {
    fn default() -> Self {
        Self {
            step_size: 0.01,
            max_epsilon: 10.0,
            rate_tolerance: 1e-5,
            epsilon_tolerance: 1e-7,
        }
    }
}

impl EpsilonSearchOptions {
    /// Set the linear phase step width.
    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    /// Set the linear phase cap.
    pub fn with_max_epsilon(mut self, max_epsilon: f64) -> Self {
        self.max_epsilon = max_epsilon;
        self
    }

    /// Set the reduction rate tolerance.
    pub fn with_rate_tolerance(mut self, rate_tolerance: f64) -> Self {
        self.rate_tolerance = rate_tolerance;
        self
    }

    /// Set the epsilon bracket tolerance.
    pub fn with_epsilon_tolerance(mut self, epsilon_tolerance: f64) -> Self {
        self.epsilon_tolerance = epsilon_tolerance;
        self
    }
}

/// One bisection state: an epsilon interval and the reduction rates welded
/// at its endpoints.
#[derive(Debug, Clone, Copy)]
struct Bracket {
    epsilon_lo: f64,
    epsilon_hi: f64,
    rate_lo: f64,
    rate_hi: f64,
}

/// Find an epsilon whose forward-weld reduction rate matches `target_rate`.
///
/// `target_rate` must lie in `(0, 1)`. Returns the epsilon, or an error if
/// the rate is unreachable below [`EpsilonSearchOptions::max_epsilon`].
pub fn find_epsilon(
    mesh: &TriangleMesh,
    index: &SpatialIndex,
    target_rate: f64,
    options: &EpsilonSearchOptions,
) -> Result<f64> {
    find_epsilon_with_progress(mesh, index, target_rate, options, &Silent)
}

/// [`find_epsilon`] with progress reporting; each probe reports its epsilon.
pub fn find_epsilon_with_progress(
    mesh: &TriangleMesh,
    index: &SpatialIndex,
    target_rate: f64,
    options: &EpsilonSearchOptions,
    progress: &dyn ProgressSink,
) -> Result<f64> {
    if mesh.is_empty() {
        return Err(MeshError::EmptyMesh);
    }
    if !(target_rate > 0.0 && target_rate < 1.0) {
        return Err(MeshError::invalid_param(
            "target_rate",
            target_rate,
            "must lie in (0, 1)",
        ));
    }
    if !(options.step_size > 0.0) {
        return Err(MeshError::invalid_param(
            "step_size",
            options.step_size,
            "must be positive",
        ));
    }

    let mut probes = Probes {
        mesh,
        index,
        progress,
        done: 0,
        estimated: estimated_probes(options),
    };

    let bracket = bracket_by_linear_search(&mut probes, target_rate, options)?;
    Ok(refine_by_bisection(&mut probes, target_rate, options, bracket))
}

/// Welding probe runner; counts probes for progress reporting.
struct Probes<'a> {
    mesh: &'a TriangleMesh,
    index: &'a SpatialIndex,
    progress: &'a dyn ProgressSink,
    done: usize,
    estimated: usize,
}

impl Probes<'_> {
    /// Reduction rate of a forward weld at `epsilon` on a fresh mesh copy.
    fn reduction_rate(&mut self, epsilon: f64) -> f64 {
        self.progress.update(
            &format!("Testing epsilon {epsilon:.7}"),
            self.done,
            self.estimated,
        );
        self.done += 1;

        let mut probe = self.mesh.clone();
        let initial = probe.num_vertices();
        weld_forward(&mut probe, self.index, epsilon);
        (initial - probe.num_vertices()) as f64 / initial as f64
    }
}

/// Upper bound on the number of probes both phases together can issue.
fn estimated_probes(options: &EpsilonSearchOptions) -> usize {
    let linear = (options.max_epsilon / options.step_size).ceil() as usize;
    let bisect = (options.step_size / options.epsilon_tolerance.max(f64::MIN_POSITIVE))
        .log2()
        .ceil()
        .max(1.0) as usize;
    linear + bisect
}

/// Walk epsilon upward in fixed steps until the target rate is bracketed.
fn bracket_by_linear_search(
    probes: &mut Probes<'_>,
    target_rate: f64,
    options: &EpsilonSearchOptions,
) -> Result<Bracket> {
    let mut prev_rate = 0.0;
    let mut epsilon = options.step_size;

    while epsilon < options.max_epsilon {
        let rate = probes.reduction_rate(epsilon);
        if rate >= target_rate {
            return Ok(Bracket {
                epsilon_lo: epsilon - options.step_size,
                epsilon_hi: epsilon,
                rate_lo: prev_rate,
                rate_hi: rate,
            });
        }
        prev_rate = rate;
        epsilon += options.step_size;
    }

    Err(MeshError::EpsilonOutOfRange {
        target: target_rate,
        max_epsilon: options.max_epsilon,
    })
}

/// Bisect the bracket until the rate or the bracket width converges.
fn refine_by_bisection(
    probes: &mut Probes<'_>,
    target_rate: f64,
    options: &EpsilonSearchOptions,
    mut bracket: Bracket,
) -> f64 {
    loop {
        let midpoint = bracket.epsilon_lo + (bracket.epsilon_hi - bracket.epsilon_lo) / 2.0;

        if bracket.epsilon_hi - bracket.epsilon_lo <= options.epsilon_tolerance {
            return midpoint;
        }
        if bracket.rate_hi - bracket.rate_lo < options.rate_tolerance {
            return midpoint;
        }

        let rate_mid = probes.reduction_rate(midpoint);
        if rate_mid <= target_rate {
            if target_rate - rate_mid < options.rate_tolerance {
                return midpoint;
            }
            bracket.epsilon_lo = midpoint;
            bracket.rate_lo = rate_mid;
        } else {
            if rate_mid - target_rate < options.rate_tolerance {
                return midpoint;
            }
            bracket.epsilon_hi = midpoint;
            bracket.rate_hi = rate_mid;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn line_mesh(count: usize, spacing: f64) -> TriangleMesh {
        let vertices = (0..count)
            .map(|i| Point3::new(i as f64 * spacing, 0.0, 0.0))
            .collect();
        TriangleMesh::from_vertices_and_triangles(vertices, vec![]).unwrap()
    }

    #[test]
    fn test_grid_with_half_reduction_target() {
        // A line at spacing 0.01 welds into pairs (rate exactly 0.5) as soon
        // as epsilon clears the spacing, and the rate is 0 below it. The
        // search either lands inside the plateau, where the rate matches the
        // target within tolerance, or converges onto the jump at 0.01.
        let mesh = line_mesh(1000, 0.01);
        let index = SpatialIndex::build(&mesh.vertices);
        let options = EpsilonSearchOptions::default();

        let eps = find_epsilon(&mesh, &index, 0.5, &options).unwrap();
        assert!(
            eps > 0.0099 && eps < 0.0201,
            "epsilon out of expected interval: {eps}"
        );

        let mut probe = mesh.clone();
        weld_forward(&mut probe, &index, eps);
        let rate =
            (mesh.num_vertices() - probe.num_vertices()) as f64 / mesh.num_vertices() as f64;
        let on_jump = (eps - 0.01).abs() < options.epsilon_tolerance;
        assert!(
            (rate - 0.5).abs() < options.rate_tolerance || on_jump,
            "rate {rate} at epsilon {eps} neither matches the target nor sits on the jump"
        );

        // Nudging past the jump always yields the pair welding.
        let mut probe = mesh.clone();
        weld_forward(&mut probe, &index, eps + 2e-6);
        assert_eq!(probe.num_vertices(), 500);
    }

    #[test]
    fn test_graded_line_converges_near_target() {
        // Spacings grow linearly, so the reduction rate climbs gradually
        // with epsilon and the search has a genuine bracket to bisect.
        let mut vertices = Vec::new();
        let mut x = 0.0;
        for i in 0..200 {
            vertices.push(Point3::new(x, 0.0, 0.0));
            x += 0.002 * (i + 1) as f64;
        }
        let mesh = TriangleMesh::from_vertices_and_triangles(vertices, vec![]).unwrap();
        let index = SpatialIndex::build(&mesh.vertices);
        let options = EpsilonSearchOptions::default();

        let target = 0.25;
        let eps = find_epsilon(&mesh, &index, target, &options).unwrap();

        let mut probe = mesh.clone();
        weld_forward(&mut probe, &index, eps);
        let rate = (mesh.num_vertices() - probe.num_vertices()) as f64
            / mesh.num_vertices() as f64;
        // The rate is a step function with jumps of a few clusters; the
        // returned epsilon sits within epsilon_tolerance of a jump across
        // the target.
        assert!(
            (rate - target).abs() <= 0.05,
            "rate {rate} too far from target {target} at epsilon {eps}"
        );
    }

    #[test]
    fn test_unreachable_target_reports_out_of_range() {
        let mesh = line_mesh(2, 1.0);
        let index = SpatialIndex::build(&mesh.vertices);
        let options = EpsilonSearchOptions::default()
            .with_step_size(0.1)
            .with_max_epsilon(0.5);

        let err = find_epsilon(&mesh, &index, 0.5, &options).unwrap_err();
        match err {
            MeshError::EpsilonOutOfRange { target, max_epsilon } => {
                assert_eq!(target, 0.5);
                assert_eq!(max_epsilon, 0.5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let mesh = line_mesh(4, 1.0);
        let index = SpatialIndex::build(&mesh.vertices);
        let options = EpsilonSearchOptions::default();

        assert!(matches!(
            find_epsilon(&mesh, &index, 0.0, &options),
            Err(MeshError::InvalidParameter { .. })
        ));
        assert!(matches!(
            find_epsilon(&mesh, &index, 1.0, &options),
            Err(MeshError::InvalidParameter { .. })
        ));
        assert!(matches!(
            find_epsilon(&mesh, &index, f64::NAN, &options),
            Err(MeshError::InvalidParameter { .. })
        ));

        let bad_step = EpsilonSearchOptions::default().with_step_size(0.0);
        assert!(matches!(
            find_epsilon(&mesh, &index, 0.5, &bad_step),
            Err(MeshError::InvalidParameter { .. })
        ));

        let empty = TriangleMesh::new();
        let empty_index = SpatialIndex::build(&empty.vertices);
        assert!(matches!(
            find_epsilon(&empty, &empty_index, 0.5, &options),
            Err(MeshError::EmptyMesh)
        ));
    }
}
