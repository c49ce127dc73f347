use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use log::debug;
use structopt::StructOpt;

use pardiff::solver::{solve, SolveOptions};
use pardiff::utils::read_tokens;
use pardiff::xputils::{peak_memory_mb, print_edit_script, print_resolution, Args, PhaseTimings};

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::from_args();

    let mut timings = PhaseTimings::default();

    let input_start = Instant::now();
    let a = read_tokens(Path::new(&args.file_1))?;
    let b = read_tokens(Path::new(&args.file_2))?;
    timings.read_input = input_start.elapsed();

    let opts = SolveOptions {
        num_workers: args.threads.unwrap_or_else(num_cpus::get),
        compute_script: args.edit_script || args.edit_script_path.is_some(),
        min_entries: args.min_entries,
        ..SolveOptions::default()
    };
    let solution = solve(&a, &b, &opts)?;
    timings.solution = solution.solution_time;
    timings.edit_script = solution.script_time;

    if let Some(script) = &solution.script {
        match &args.edit_script_path {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("could not open edit script file {path}"))?;
                print_edit_script(&mut BufWriter::new(file), script)?;
            }
            None => print_edit_script(&mut std::io::stdout().lock(), script)?,
        }
    }

    let mut stdout = std::io::stdout().lock();
    print_resolution(&mut stdout, solution.edit_len, &timings)?;
    stdout.flush()?;

    debug!("peak memory usage: {:.2} MB", peak_memory_mb());
    Ok(())
}
