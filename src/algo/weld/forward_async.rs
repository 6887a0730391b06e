//! Asynchronous parallel welding.
//!
//! Runs the same emission waves as the synchronous variant but replaces its
//! single sequential compaction scan with a chunked parallel one: the id
//! space is split into contiguous chunks, centroids are counted per chunk,
//! and a prefix sum over the counts gives every chunk a disjoint range of
//! compacted ids to assign in parallel. Only the follower averaging stays
//! single-threaded: running-mean updates do not commute, so interleaving
//! them across threads would change the result.

use nalgebra::Point3;
use rayon::prelude::*;

use crate::algo::progress::{ProgressSink, Silent};
use crate::algo::weld::Wavefront;
use crate::mesh::TriangleMesh;
use crate::spatial::SpatialIndex;

/// Weld all vertex clusters within `eps` of one another, compacting clusters
/// without a sequential centroid scan.
///
/// Cluster memberships are identical to [`weld_forward`]'s; compacted vertex
/// numbering is assigned per id chunk and may in general be a permutation of
/// the synchronous variant's. Normals and colors are discarded, as with
/// [`weld_forward`].
///
/// `index` must have been built over exactly `mesh.vertices`.
///
/// [`weld_forward`]: crate::algo::weld::weld_forward
pub fn weld_forward_async(mesh: &mut TriangleMesh, index: &SpatialIndex, eps: f64) {
    weld_forward_async_with_progress(mesh, index, eps, &Silent);
}

/// [`weld_forward_async`] with progress reporting.
pub fn weld_forward_async_with_progress(
    mesh: &mut TriangleMesh,
    index: &SpatialIndex,
    eps: f64,
    progress: &dyn ProgressSink,
) {
    let num_vertices = mesh.vertices.len();
    if num_vertices == 0 {
        return;
    }

    let wavefront = Wavefront::build(&mesh.vertices, index, eps);
    wavefront.run_waves(progress);
    let parents = wavefront.into_parents();

    let chunk_len = num_vertices.div_ceil(rayon::current_num_threads().max(1));

    // Per-chunk centroid tallies, then an exclusive prefix sum to give each
    // chunk its own disjoint range of compacted cluster ids.
    let counts: Vec<usize> = parents
        .par_chunks(chunk_len)
        .enumerate()
        .map(|(c, chunk)| {
            let base = c * chunk_len;
            chunk
                .iter()
                .enumerate()
                .filter(|&(k, &p)| p == base + k)
                .count()
        })
        .collect();
    let mut offsets = vec![0usize; counts.len() + 1];
    for (c, &count) in counts.iter().enumerate() {
        offsets[c + 1] = offsets[c] + count;
    }
    let num_clusters = offsets[counts.len()];

    // Assign compacted ids chunk by chunk; every chunk writes only its own
    // slice of the new vertex list and its own slice of the id map.
    let vertices = &mesh.vertices;
    let mut pid2ccid = vec![0usize; num_vertices];
    let mut new_vertices = vec![Point3::origin(); num_clusters];

    let mut vertex_slots: Vec<&mut [Point3<f64>]> = Vec::with_capacity(counts.len());
    let mut rest = new_vertices.as_mut_slice();
    for &count in &counts {
        let (slot, tail) = rest.split_at_mut(count);
        vertex_slots.push(slot);
        rest = tail;
    }

    pid2ccid
        .par_chunks_mut(chunk_len)
        .zip(parents.par_chunks(chunk_len))
        .zip(vertex_slots.into_par_iter())
        .enumerate()
        .for_each(|(c, ((ccid_chunk, parent_chunk), slot))| {
            let base = c * chunk_len;
            let offset = offsets[c];
            let mut local = 0;
            for (k, &p) in parent_chunk.iter().enumerate() {
                if p == base + k {
                    slot[local] = vertices[base + k];
                    ccid_chunk[k] = offset + local;
                    local += 1;
                }
            }
        });

    // Follower aggregation stays sequential: the running mean is order
    // sensitive.
    let mut cluster_sizes = vec![1usize; num_clusters];
    for (i, &p) in parents.iter().enumerate() {
        if p != i {
            let ccid = pid2ccid[p];
            let n = cluster_sizes[ccid] as f64;
            let prev = new_vertices[ccid];
            new_vertices[ccid] = prev + (vertices[i] - prev) / (n + 1.0);
            cluster_sizes[ccid] += 1;
        }
    }

    // Follower slots of pid2ccid were never filled; route every triangle
    // corner through its parent instead.
    mesh.triangles.par_iter_mut().for_each(|triangle| {
        for id in triangle.iter_mut() {
            *id = pid2ccid[parents[*id]];
        }
    });

    mesh.vertices = new_vertices;
    mesh.normals = None;
    mesh.colors = None;
}
