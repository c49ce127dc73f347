//! Command-line plumbing and result reporting for the `pardiff` binary.

use std::io::Write;
use std::time::Duration;

use peak_alloc::PeakAlloc;
use structopt::StructOpt;

use crate::backtrace::EditStep;

#[global_allocator]
static PEAK_ALLOC: PeakAlloc = PeakAlloc;

/// Compare two whitespace-separated integer token files and report the
/// minimum edit distance, optionally with the full edit script.
#[derive(Debug, StructOpt)]
pub struct Args {
    /// Path of the first input file
    pub file_1: String,
    /// Path of the second input file
    pub file_2: String,
    /// Write the edit script to this file (and compute it at all)
    pub edit_script_path: Option<String>,
    /// Growth threshold of the retired growth-phase partitioning scheme;
    /// accepted for compatibility, ignored by the round-robin engine
    #[structopt(long = "min_entries")]
    pub min_entries: Option<usize>,
    /// Number of workers; defaults to the number of hardware threads
    #[structopt(short = "T", long)]
    pub threads: Option<usize>,
    /// Compute and print the edit script to stdout even without a file
    #[structopt(short, long)]
    pub edit_script: bool,
}

/// Wall-clock phases reported next to the result.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhaseTimings {
    pub read_input: Duration,
    pub precompute: Duration,
    pub solution: Duration,
    pub edit_script: Duration,
}

/// The result block printed by rank 0, one key-value pair per line.
pub fn print_resolution(out: &mut impl Write, edit_len: i32, timings: &PhaseTimings) -> std::io::Result<()> {
    writeln!(out, "min edit length {edit_len}")?;
    writeln!(out, "Read Input [μs]: \t{}", timings.read_input.as_micros())?;
    writeln!(out, "Precompute [μs]: \t{}", timings.precompute.as_micros())?;
    writeln!(out, "Solution [μs]:   \t{}", timings.solution.as_micros())?;
    writeln!(out, "Edit Script [μs]: \t{}", timings.edit_script.as_micros())?;
    Ok(())
}

/// One edit step per line, in backtrace order.
pub fn print_edit_script(out: &mut impl Write, script: &[EditStep]) -> std::io::Result<()> {
    for step in script {
        writeln!(out, "{step}")?;
    }
    Ok(())
}

/// Peak RAM of the whole process, for the debug report after a run.
pub fn peak_memory_mb() -> f32 {
    PEAK_ALLOC.peak_usage_as_mb()
}
