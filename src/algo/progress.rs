//! Progress reporting for long-running operations.
//!
//! Welding a scan-sized mesh can take a while, and how progress should be
//! surfaced depends on the caller: the CLI draws a bar, tests want nothing,
//! a service might forward counts to its own telemetry. The library stays
//! out of that decision by reporting through the [`ProgressSink`] trait;
//! algorithms take a `&dyn ProgressSink` and callers pick the sink.
//!
//! A shareable closure of the right shape already is a sink:
//!
//! ```
//! use smelt::algo::progress::ProgressSink;
//!
//! let log_updates = |stage: &str, completed: usize, total: usize| {
//!     eprintln!("{stage}: {completed}/{total}");
//! };
//! log_updates.update("welding", 3, 10);
//! ```

/// Receives updates from long-running operations.
///
/// The welders report once per emission wave with the number of vertices
/// emitted so far out of the vertex total; the epsilon search reports once
/// per welding probe. Within one operation `completed` never decreases,
/// though the same value may be reported more than once. Sinks may be
/// shared across threads.
pub trait ProgressSink: Send + Sync {
    /// Record that `completed` of `total` units of `stage` are done.
    fn update(&self, stage: &str, completed: usize, total: usize);
}

/// The sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl ProgressSink for Silent {
    fn update(&self, _stage: &str, _completed: usize, _total: usize) {}
}

impl<F> ProgressSink for F
where
    F: Fn(&str, usize, usize) + Send + Sync,
{
    fn update(&self, stage: &str, completed: usize, total: usize) {
        self(stage, completed, total)
    }
}
