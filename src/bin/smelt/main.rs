//! Smelt CLI - parallel vertex welding for triangle meshes.
//!
//! Usage: smelt <COMMAND> [ARGS]
//!
//! Run `smelt --help` for available commands.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};

use smelt::algo::find_epsilon::{find_epsilon_with_progress, EpsilonSearchOptions};
use smelt::algo::progress::ProgressSink;
use smelt::algo::weld::{
    weld_forward_async_with_progress, weld_forward_with_progress, weld_sequential,
};
use smelt::error::MeshError;
use smelt::io;
use smelt::spatial::SpatialIndex;

#[derive(Parser)]
#[command(name = "smelt")]
#[command(author, version, about = "Parallel vertex welding CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Weld all vertex clusters closer than a distance threshold
    Weld {
        /// Welding distance threshold
        eps: f64,

        /// Algorithm version: 0 = sequential, 1 = forward, 2 = forward-async
        #[arg(value_enum)]
        version: WeldVersion,

        /// Input mesh file (.ply)
        input: PathBuf,

        /// Number of worker threads
        #[arg(default_value = "1")]
        num_threads: usize,

        /// Output mesh file (.ply); the welded mesh is discarded when absent
        output: Option<PathBuf>,
    },

    /// Find the epsilon that removes a target percentage of vertices
    FindEps {
        /// Input mesh file (.ply)
        input: PathBuf,

        /// Percentage of vertices to remove, in [0, 100]
        reduction_percent: f64,

        /// Number of worker threads
        num_threads: usize,
    },

    /// Display mesh information
    Info {
        /// Input mesh file (.ply)
        input: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum WeldVersion {
    /// Single-threaded greedy baseline
    #[value(name = "0")]
    Sequential,
    /// Parallel emission waves, sequential cluster compaction
    #[value(name = "1")]
    Forward,
    /// Parallel emission waves, parallel cluster compaction
    #[value(name = "2")]
    ForwardAsync,
}

impl WeldVersion {
    fn label(self) -> &'static str {
        match self {
            WeldVersion::Sequential => "sequential",
            WeldVersion::Forward => "forward",
            WeldVersion::ForwardAsync => "forward-async",
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Weld {
            eps,
            version,
            input,
            num_threads,
            output,
        } => {
            cmd_weld(eps, version, &input, num_threads, output.as_deref())?;
        }

        Commands::FindEps {
            input,
            reduction_percent,
            num_threads,
        } => {
            cmd_find_eps(&input, reduction_percent, num_threads)?;
        }

        Commands::Info { input } => {
            cmd_info(&input)?;
        }
    }

    Ok(())
}

fn configure_thread_pool(num_threads: usize) -> Result<(), Box<dyn std::error::Error>> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;
    Ok(())
}

/// In-place terminal progress bar.
///
/// Redraws only when the whole-percent value advances, so duplicate reports
/// and updates arriving out of order cannot walk the bar backwards or make
/// it flicker.
struct TerminalBar {
    shown_percent: AtomicUsize,
}

impl TerminalBar {
    const WIDTH: usize = 24;

    fn new() -> Self {
        Self {
            shown_percent: AtomicUsize::new(0),
        }
    }
}

impl ProgressSink for TerminalBar {
    fn update(&self, stage: &str, completed: usize, total: usize) {
        if total == 0 {
            return;
        }
        let percent = completed.min(total) * 100 / total;
        if self.shown_percent.fetch_max(percent, Ordering::Relaxed) >= percent {
            return; // already drawn at least this far
        }

        let filled = Self::WIDTH * percent / 100;
        let mut bar = String::with_capacity(Self::WIDTH);
        for cell in 0..Self::WIDTH {
            bar.push(if cell < filled { '#' } else { '-' });
        }

        // Overwrite the current line; pad the stage so a shorter message
        // clears the remains of a longer one.
        eprint!("\r{percent:3}% [{bar}] {stage:<32}");
        let _ = std::io::stderr().flush();

        if percent == 100 {
            eprintln!();
        }
    }
}

fn cmd_weld(
    eps: f64,
    version: WeldVersion,
    input: &std::path::Path,
    num_threads: usize,
    output: Option<&std::path::Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !(eps >= 0.0) {
        return Err(MeshError::invalid_param("eps", eps, "must be non-negative").into());
    }
    configure_thread_pool(num_threads)?;

    let mut mesh = io::load(input)?;

    println!("Configuration:");
    println!("\t-eps: {}", eps);
    println!("\t-program: {}", version.label());
    println!("\t-path to dataset: {}", input.display());
    println!("\t-number of threads: {}", num_threads);
    println!("number of original vertices: {}", mesh.num_vertices());
    println!("number of original triangles: {}", mesh.num_triangles());

    let index = SpatialIndex::build(&mesh.vertices);
    let progress = TerminalBar::new();

    let start = Instant::now();
    match version {
        WeldVersion::Sequential => weld_sequential(&mut mesh, &index, eps),
        WeldVersion::Forward => weld_forward_with_progress(&mut mesh, &index, eps, &progress),
        WeldVersion::ForwardAsync => {
            weld_forward_async_with_progress(&mut mesh, &index, eps, &progress)
        }
    }
    let elapsed = start.elapsed();

    println!("number of vertices after clustering: {}", mesh.num_vertices());
    println!("number of triangles after clustering: {}", mesh.num_triangles());
    println!("welded in {:.2?}", elapsed);

    if let Some(output) = output {
        println!("Writing the simplified mesh to: {}", output.display());
        io::save(&mesh, output)?;
    }

    Ok(())
}

fn cmd_find_eps(
    input: &std::path::Path,
    reduction_percent: f64,
    num_threads: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=100.0).contains(&reduction_percent) {
        return Err(MeshError::invalid_param(
            "reduction_percent",
            reduction_percent,
            "must lie in [0, 100]",
        )
        .into());
    }
    configure_thread_pool(num_threads)?;

    let mesh = io::load(input)?;

    println!("Configuration:");
    println!("\t-path to dataset: {}", input.display());
    println!("\t-reduction rate: {}%", reduction_percent);
    println!("\t-number of threads: {}", num_threads);

    let index = SpatialIndex::build(&mesh.vertices);
    let options = EpsilonSearchOptions::default();
    let progress = TerminalBar::new();

    let result = find_epsilon_with_progress(
        &mesh,
        &index,
        reduction_percent / 100.0,
        &options,
        &progress,
    );
    eprintln!(); // terminate the progress bar line

    println!("Epsilon: {}", result?);
    Ok(())
}

fn cmd_info(input: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = io::load(input)?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Triangles: {}", mesh.num_triangles());
    println!("Normals: {}", if mesh.normals.is_some() { "yes" } else { "no" });
    println!("Colors: {}", if mesh.colors.is_some() { "yes" } else { "no" });

    if let Some((min, max)) = mesh.bounding_box() {
        let extent = max - min;
        println!(
            "Bounding box: [{:.4}, {:.4}, {:.4}] .. [{:.4}, {:.4}, {:.4}]",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        println!(
            "Extent: {:.4} x {:.4} x {:.4}",
            extent.x, extent.y, extent.z
        );
    }

    Ok(())
}
