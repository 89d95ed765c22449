//! CLI argument definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::export::ExportFormat;
use crate::profiling::SamplerConfig;

#[derive(Parser)]
#[command(
    name = "stackscope",
    version,
    about = "Sample call stacks into per-thread flame-graph trees",
    after_help = "\
EXAMPLES:
    stackscope replay stacks.folded                  Lay out recorded folded stacks
    stackscope --export out.json demo --threads 4    Sample an instrumented demo workload
    sudo stackscope attach my-app --duration 10      Sample kernel stacks of a live process"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Milliseconds between two samples
    #[arg(long, value_name = "MS", default_value = "1", global = true)]
    pub interval_ms: u64,

    /// Width of each thread's root interval (10000 = 100.00%)
    #[arg(long, value_name = "N", default_value = "10000", global = true)]
    pub max_scale: u64,

    /// Write the laid-out forest to a file
    #[arg(long, value_name = "FILE", global = true)]
    pub export: Option<PathBuf>,

    /// Export format
    #[arg(long, value_enum, default_value_t = FormatArg::Json, global = true)]
    pub format: FormatArg,

    /// Number of hot methods to print
    #[arg(long, default_value = "10", global = true)]
    pub top: usize,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replay a folded-stack file through a sampling session
    Replay {
        /// Folded stacks: `thread;outer;...;inner count` per line
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Sample an instrumented in-process demo workload
    Demo {
        /// Worker threads to spawn
        #[arg(long, default_value = "4")]
        threads: usize,

        /// How long to sample, in milliseconds
        #[arg(long, value_name = "MS", default_value = "500")]
        duration_ms: u64,
    },

    /// Sample kernel stacks of a running process through /proc (Linux, root)
    Attach {
        /// Process name (auto-detects the PID)
        #[arg(value_name = "PROCESS")]
        process: Option<String>,

        /// Process ID to sample
        #[arg(short, long)]
        pid: Option<u32>,

        /// Stop after N seconds (0 = until Ctrl+C or process exit)
        #[arg(long, default_value = "0")]
        duration: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    Folded,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Folded => ExportFormat::Folded,
        }
    }
}

impl Args {
    /// Sampler settings from the global flags.
    #[must_use]
    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            interval: Duration::from_millis(self.interval_ms.max(1)),
            max_scale: self.max_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["stackscope", "replay", "stacks.folded"]).unwrap();
        assert_eq!(args.sampler_config(), SamplerConfig::default());
        assert_eq!(args.format, FormatArg::Json);
        assert!(matches!(args.command, Command::Replay { .. }));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "stackscope",
            "demo",
            "--threads",
            "2",
            "--format",
            "folded",
            "--max-scale",
            "100",
        ])
        .unwrap();
        assert_eq!(args.max_scale, 100);
        assert_eq!(ExportFormat::from(args.format), ExportFormat::Folded);
        assert!(matches!(args.command, Command::Demo { threads: 2, duration_ms: 500 }));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let args =
            Args::try_parse_from(["stackscope", "--interval-ms", "0", "attach", "--pid", "1"])
                .unwrap();
        assert_eq!(args.sampler_config().interval, Duration::from_millis(1));
    }
}
