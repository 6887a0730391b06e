//! Parallel vertex welding.
//!
//! Welding collapses every cluster of vertices lying within a distance
//! threshold `eps` of one another into a single representative vertex at the
//! cluster's mean position, then rewrites all triangles to reference the
//! collapsed vertices. Triangles are never removed: a triangle whose corners
//! collapse together survives as a degenerate triangle.
//!
//! # Variants
//!
//! - [`weld_forward`]: the synchronous parallel algorithm. Vertices emit in
//!   waves; a vertex becomes an *active source* in the wave after all of its
//!   smaller-id neighbors have emitted, and, if still its own cluster
//!   representative at that moment, claims its still-pending larger-id
//!   neighbors with a lock-free minimum-write on their parent pointers.
//!   Cluster compaction afterwards is a single sequential scan.
//! - [`weld_forward_async`]: the same wavefront, but cluster compaction is
//!   parallelized by assigning compacted ids per contiguous id chunk with a
//!   prefix sum over per-chunk centroid counts.
//! - [`weld_sequential`]: the single-threaded greedy baseline that absorbs
//!   all unclaimed in-range neighbors of each vertex in ascending id order.
//!   Its clusters legitimately differ from the parallel variants'.
//!
//! The parallel variants produce deterministic cluster memberships: parent
//! pointers only ever decrease, so the smallest claimant wins independently
//! of thread interleaving. The clustering is a greedy claim by the smallest
//! emitted neighbor, **not** the transitive closure of the `eps`-proximity
//! graph: two vertices within `eps` of each other may land in different
//! clusters when neither is the other's smallest neighbor.
//!
//! # Example
//!
//! ```
//! use smelt::algo::weld::weld_forward;
//! use smelt::mesh::TriangleMesh;
//! use smelt::spatial::SpatialIndex;
//! use nalgebra::Point3;
//!
//! let mut mesh = TriangleMesh::from_vertices_and_triangles(
//!     vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.5, 0.0, 0.0)],
//!     vec![[0, 0, 1]],
//! )
//! .unwrap();
//!
//! let index = SpatialIndex::build(&mesh.vertices);
//! weld_forward(&mut mesh, &index, 1.0);
//!
//! assert_eq!(mesh.num_vertices(), 1);
//! assert_eq!(mesh.vertices[0], Point3::new(0.25, 0.0, 0.0));
//! assert_eq!(mesh.triangles[0], [0, 0, 0]);
//! ```

pub mod forward;
pub mod forward_async;
mod reduce;
pub mod sequential;

pub use forward::{weld_forward, weld_forward_with_progress};
pub use forward_async::{weld_forward_async, weld_forward_async_with_progress};
pub use sequential::weld_sequential;

use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};

use nalgebra::Point3;
use rayon::prelude::*;

use crate::algo::progress::ProgressSink;
use crate::spatial::SpatialIndex;

/// Shared state of one welding call.
///
/// For each vertex `i`:
/// - `parent[i]` is the id of the vertex `i` currently points to, with the
///   invariants `parent[i] <= i` at all times and `parent[i] == i` exactly
///   when `i` is a cluster representative (a *centroid*);
/// - `remaining[i]` counts the in-range neighbors with ids `< i` that have
///   not yet emitted; `0` means ready, negative means emitted;
/// - `bigger[i]` lists the in-range neighbors with ids `> i`, sorted, fixed
///   after construction.
pub(crate) struct Wavefront {
    parent: Vec<AtomicUsize>,
    remaining: Vec<AtomicIsize>,
    bigger: Vec<Vec<usize>>,
}

impl Wavefront {
    /// Query the spatial index for every vertex in parallel and set up the
    /// parent and counter arrays.
    pub(crate) fn build(vertices: &[Point3<f64>], index: &SpatialIndex, eps: f64) -> Self {
        let (remaining, bigger): (Vec<_>, Vec<_>) = vertices
            .par_iter()
            .enumerate()
            .map(|(i, v)| {
                let (num_not_greater, bigger) = index.search_radius_split(v, eps, i);
                // The query point itself is counted among the not-greater ids.
                (AtomicIsize::new(num_not_greater as isize - 1), bigger)
            })
            .unzip();
        let parent = (0..vertices.len()).map(AtomicUsize::new).collect();
        Self {
            parent,
            remaining,
            bigger,
        }
    }

    /// Run emission waves until no pending vertices remain.
    ///
    /// Each wave is one parallel pass over all vertices; the pass's implicit
    /// join is the wave barrier. A vertex whose counter reads zero emits:
    /// only its own loop iteration may take it negative, so the ready →
    /// emitted transition happens exactly once per vertex. An emitting
    /// centroid claims each still-pending bigger neighbor `j` by writing its
    /// id into `parent[j]`, but only while its id undercuts the value
    /// already there, so parent pointers decrease monotonically and the
    /// smallest claimant wins regardless of interleaving.
    ///
    /// Progress is guaranteed: the minimum pending id has no pending smaller
    /// neighbors, so every wave emits at least one vertex.
    ///
    /// Returns the number of waves executed.
    pub(crate) fn run_waves(&self, progress: &dyn ProgressSink) -> usize {
        let num_vertices = self.parent.len();
        let should_continue = AtomicBool::new(true);
        let emitted = AtomicUsize::new(0);
        let mut waves = 0;

        // The swap both reads the previous wave's verdict and resets the
        // flag for the next one; the par_iter join orders the two.
        while should_continue.swap(false, Ordering::Relaxed) {
            waves += 1;
            (0..num_vertices).into_par_iter().for_each(|i| {
                if self.remaining[i].load(Ordering::Acquire) != 0 {
                    return; // pending or already emitted
                }
                self.remaining[i].fetch_sub(1, Ordering::AcqRel);
                emitted.fetch_add(1, Ordering::Relaxed);

                // All smaller in-range neighbors have emitted, so no claim
                // on i can still arrive: its parent is final.
                let is_centroid = self.parent[i].load(Ordering::Acquire) == i;

                for &j in &self.bigger[i] {
                    if is_centroid && self.remaining[j].load(Ordering::Acquire) > 0 {
                        claim_with_smaller(&self.parent[j], i);
                    }
                    if self.remaining[j].fetch_sub(1, Ordering::AcqRel) >= 1 {
                        should_continue.store(true, Ordering::Relaxed);
                    }
                }
            });
            progress.update(
                "Welding vertices",
                emitted.load(Ordering::Relaxed),
                num_vertices,
            );
        }

        waves
    }

    /// Tear down the atomics and hand back the final parent array.
    pub(crate) fn into_parents(self) -> Vec<usize> {
        self.parent.into_iter().map(|p| p.into_inner()).collect()
    }
}

/// Lock-free minimum-write: install `candidate` into `parent` unless the
/// value already there is smaller or equal. Retries on contention, gives up
/// as soon as the observed value no longer exceeds the candidate.
fn claim_with_smaller(parent: &AtomicUsize, candidate: usize) {
    let mut current = parent.load(Ordering::Acquire);
    while candidate < current {
        match parent.compare_exchange_weak(
            current,
            candidate,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => return,
            Err(observed) => current = observed,
        }
    }
}
