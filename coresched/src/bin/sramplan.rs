use anyhow::{anyhow, bail, Result};
use clap::Parser;
use coresched::io::rows_to_items;
use coresched::utils::*;

/// Assigns scratchpad offsets to a CSV of buffer lifetimes.
#[derive(Parser, Debug)]
struct Arg {
    /// Path to an `id,start,end,size` CSV (header line included)
    #[arg(short, long, value_parser = clap::value_parser!(std::path::PathBuf))]
    input: std::path::PathBuf,

    /// Total scratchpad bytes
    #[arg(short, long, value_parser = clap::value_parser!(Bytes))]
    capacity: Bytes,

    /// Concurrent workers sharing the scratchpad
    #[arg(short, long, default_value_t = 1)]
    workers: usize,

    /// Subdivide the capacity evenly among the workers
    #[arg(long)]
    split: bool,

    /// Run the solver portfolio on all cores
    #[arg(short, long)]
    parallel: bool,

    /// Wall-clock budget, in seconds
    #[arg(short, long, default_value_t = 10.0)]
    timeout_secs: f64,

    /// Stop after this many feasible packings
    #[arg(long, default_value_t = coresched::DEFAULT_SOLUTION_CAP)]
    solution_cap: u32,

    /// Write the placement timeline to this path
    #[arg(short, long, value_parser = clap::value_parser!(std::path::PathBuf))]
    emit: Option<std::path::PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Arg::parse();

    let rows = coresched::LivenessCsv::new(cli.input)
        .read_rows()
        .map_err(|e| anyhow!("{e}"))?;
    if rows.is_empty() {
        bail!("no buffers in input");
    }

    let mut arena = BufferArena::new();
    let items = rows_to_items(rows, &mut arena);

    let capacity = CapacityModel::new(cli.capacity, cli.workers).usable_bytes(cli.split);
    let mut problem = Problem::new(items, capacity)?;
    problem.parallel = cli.parallel;
    problem.timeout = Duration::from_secs_f64(cli.timeout_secs);
    problem.solution_cap = cli.solution_cap;

    let start = Instant::now();
    match schedule(&problem) {
        Ok(assignment) => {
            println!(
                "Scheduled {} buffers in {} microseconds.",
                assignment.len(),
                start.elapsed().as_micros()
            );
            println!(
                "Peak address:\t{} bytes\nCapacity:\t{} bytes",
                assignment.peak_address(),
                capacity
            );
            if let Some(path) = cli.emit {
                std::fs::write(&path, assignment.render_timeline(&arena))?;
                println!("Timeline written to {}.", path.display());
            }

            Ok(())
        }
        Err(failure) => bail!("scheduling failed: {failure}"),
    }
}
