//! # stackscope - Main Entry Point
//!
//! Three ways to feed the sampler:
//! - **Replay** (`stackscope replay stacks.folded`): recorded folded stacks
//! - **Demo** (`stackscope demo`): instrumented in-process worker threads
//! - **Attach** (`sudo stackscope attach <PROCESS>`): kernel stacks via /proc
//!
//! Every mode ends the same way: stop the sampler, print a per-thread summary
//! and the hottest methods, and optionally export the laid-out forest.

// Percentages and durations are formatted for display only
#![allow(clippy::cast_precision_loss)]

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use std::path::Path;
use std::time::{Duration, Instant};

use stackscope::analysis::top_n;
use stackscope::cli::{Args, Command};
use stackscope::domain::Pid;
use stackscope::export::export_to_path;
use stackscope::preflight::run_preflight_checks;
use stackscope::process_lookup::find_process_by_name;
use stackscope::profiling::proc_stacks::process_exists;
use stackscope::profiling::{
    ProcStackProvider, ReplayProvider, Sampler, SamplerConfig, SamplerStats, ShadowStacks,
};
use stackscope::tree::ThreadForest;
use stackscope::workload::DemoWorkload;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

/// How often the main loop checks exit conditions.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = err.to_string().to_lowercase();
    if msg.contains("permission denied") || msg.contains("requires root") {
        EXIT_NOPERM
    } else if msg.contains("missing required argument") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

/// Outcome of one sampling session.
struct SessionResult {
    forest: ThreadForest,
    stats: SamplerStats,
    elapsed: Duration,
    exit_reason: &'static str,
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let config = args.sampler_config();
    let quiet = args.quiet;

    if !quiet {
        println!("stackscope v{}", env!("CARGO_PKG_VERSION"));
        println!("interval: {:?}", config.interval);
    }

    let session = match &args.command {
        Command::Replay { file } => run_replay(file, config, quiet).await?,
        Command::Demo { threads, duration_ms } => {
            run_demo(*threads, Duration::from_millis(*duration_ms), config, quiet).await?
        }
        Command::Attach { process, pid, duration } => {
            let pid = resolve_pid(process.as_deref(), *pid)?;
            let limit = (*duration > 0).then(|| Duration::from_secs(*duration));
            run_attach(pid, limit, config, quiet).await?
        }
    };

    if !quiet {
        print_summary(&session, args.top);
    }

    if let Some(ref export_path) = args.export {
        export_to_path(&session.forest, config.max_scale, args.format.into(), export_path)
            .context("Failed to export forest")?;
        if !quiet {
            println!("saved: {}", export_path.display());
        }
    }

    Ok(())
}

/// Resolve the attach target from a process name or an explicit PID.
fn resolve_pid(process: Option<&str>, pid: Option<u32>) -> Result<Pid> {
    match (process, pid) {
        (Some(_), Some(_)) => bail!(
            "Cannot use PROCESS argument with --pid.\n\n\
             Use either:\n  \
             stackscope attach my-app       (auto-detect)\n  \
             stackscope attach --pid 1234   (explicit PID)"
        ),
        (Some(name), None) => Ok(find_process_by_name(name)?.pid),
        (None, Some(pid)) => Ok(Pid(pid)),
        (None, None) => bail!(
            "Missing required argument: PROCESS or --pid\n\n\
             Usage:\n  \
             stackscope attach my-app       Auto-detect PID\n  \
             stackscope attach --pid 1234   Explicit PID\n\n\
             Run 'stackscope attach --help' for more options"
        ),
    }
}

/// Feed a folded-stack file through a sampler until every line is consumed.
async fn run_replay(file: &Path, config: SamplerConfig, quiet: bool) -> Result<SessionResult> {
    let provider = ReplayProvider::from_file(file)
        .with_context(|| format!("Failed to load folded stacks from {}", file.display()))?;
    let expected = provider.remaining();
    if !quiet {
        println!("replay: {} ({expected} samples)", file.display());
    }

    let mut sampler = Sampler::with_config(provider, config);
    sample(&mut sampler, |s| (s.stats().ticks >= expected).then_some("replay finished")).await
}

/// Sample a demo workload of instrumented worker threads.
async fn run_demo(
    threads: usize,
    duration: Duration,
    config: SamplerConfig,
    quiet: bool,
) -> Result<SessionResult> {
    let stacks = ShadowStacks::new();
    let workload = DemoWorkload::spawn(&stacks, threads).context("Failed to spawn demo workers")?;
    if !quiet {
        println!("demo: {threads} workers for {}ms", duration.as_millis());
    }

    let mut sampler = Sampler::with_config(stacks, config);
    let started = Instant::now();
    let result =
        sample(&mut sampler, |_| (started.elapsed() >= duration).then_some("duration reached"))
            .await;

    let rounds = workload.stop();
    info!("Demo workers completed {rounds} rounds");
    result
}

/// Sample kernel stacks of a live process.
async fn run_attach(
    pid: Pid,
    limit: Option<Duration>,
    config: SamplerConfig,
    quiet: bool,
) -> Result<SessionResult> {
    run_preflight_checks(pid)?;
    if !quiet {
        println!("pid: {}", pid.0);
    }

    let proc_root = Path::new("/proc");
    let mut sampler = Sampler::with_config(ProcStackProvider::new(pid), config);
    let started = Instant::now();
    sample(&mut sampler, |_| {
        if limit.is_some_and(|limit| started.elapsed() >= limit) {
            Some("duration limit reached")
        } else if !process_exists(proc_root, pid) {
            Some("process exited")
        } else {
            None
        }
    })
    .await
}

/// Run one session: start, poll `check` until it yields an exit reason (or
/// Ctrl+C arrives), then stop and collect the laid-out forest.
async fn sample(
    sampler: &mut Sampler,
    mut check: impl FnMut(&Sampler) -> Option<&'static str>,
) -> Result<SessionResult> {
    sampler.start().context("Failed to start sampler")?;
    let started = Instant::now();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let exit_reason = loop {
        if let Some(reason) = check(sampler) {
            break reason;
        }
        tokio::select! {
            () = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = &mut ctrl_c => break "interrupted",
        }
    };

    sampler.stop().context("Failed to stop sampler")?;
    Ok(SessionResult {
        forest: sampler.snapshot(),
        stats: sampler.stats(),
        elapsed: started.elapsed(),
        exit_reason,
    })
}

fn print_summary(session: &SessionResult, top: usize) {
    let stats = &session.stats;
    eprintln!(
        "\n{}: {:.1}s, {} ticks ({} skipped, {} interrupted waits)",
        session.exit_reason,
        session.elapsed.as_secs_f64(),
        stats.ticks,
        stats.skipped_ticks,
        stats.interrupted_waits,
    );

    println!("threads: {}", session.forest.len());
    for (name, root) in session.forest.threads() {
        let samples: u64 = root.children().iter().map(|c| c.usage.invocation_count).sum();
        println!("  {name:<24} {samples:>8} samples {:>6} nodes", root.node_count() - 1);
    }

    let hot = top_n(&session.forest, top);
    if hot.is_empty() {
        return;
    }
    println!("hot methods:");
    for method in hot {
        let qualified = if method.namespace.is_empty() {
            method.name
        } else {
            format!("{}::{}", method.namespace, method.name)
        };
        println!(
            "  {:>5.1}%  {:>8} / {:<8} {qualified}",
            method.percentage, method.self_count, method.total_count
        );
    }
}
