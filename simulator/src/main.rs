use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WorkflowConfig;
use workflow::runner::{ReportWriter, Runner, RunSummary};

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Offline driver for the time-of-flight ranging core")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Number of frames to feed to every channel
    #[arg(long)]
    frames: Option<usize>,
    /// Detection algorithm id (0 = MaxPeak .. 6 = MUSIC)
    #[arg(long)]
    detection: Option<usize>,
    /// Tracking algorithm id (0 = none, 1 = alpha-beta, 2 = linear regression)
    #[arg(long, allow_negative_numbers = true)]
    tracking: Option<i64>,
    /// Pace frames at the configured frame rate until done or Ctrl+C
    #[arg(long, default_value_t = false)]
    realtime: bool,
    /// Append a JSON-lines obstacle report to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let base = match &args.workflow {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    };
    let config = base.apply_args(
        args.frames,
        args.detection,
        args.tracking,
        args.realtime,
        args.report,
    )?;

    let mut runner = Runner::new(&config)?;
    let mut writer = config
        .report
        .as_deref()
        .map(ReportWriter::create)
        .transpose()?;

    let summary = if config.realtime {
        let period = Duration::from_secs_f32(config.sensor.frame_period());
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for paced run")?;
        runtime.block_on(run_paced(&mut runner, config.frames, period, writer.as_mut()))?
    } else {
        runner.execute(config.frames, writer.as_mut())?
    };

    if let Some(writer) = writer {
        writer.finish()?;
    }

    println!(
        "frames={} obstacle_ids={:?} detections={} tracks_created={} dropped={}",
        summary.frames,
        summary.obstacle_ids,
        summary.metrics.detections_emitted,
        summary.metrics.tracks_created,
        summary.metrics.detections_dropped
    );
    Ok(())
}

/// Steps one frame per tick until `frames` are done or Ctrl+C arrives.
async fn run_paced(
    runner: &mut Runner,
    frames: usize,
    period: Duration,
    mut writer: Option<&mut ReportWriter>,
) -> anyhow::Result<RunSummary> {
    let mut ticker = tokio::time::interval(period);
    let mut done = 0;
    let mut ids = Vec::new();
    while done < frames {
        tokio::select! {
            _ = ticker.tick() => {
                let report = runner.step()?;
                for obstacle in &report.obstacles {
                    if !ids.contains(&obstacle.id) {
                        ids.push(obstacle.id);
                    }
                }
                if let Some(writer) = writer.as_deref_mut() {
                    writer.write(&report)?;
                }
                done += 1;
            }
            result = signal::ctrl_c() => {
                result.context("awaiting Ctrl+C")?;
                log::info!("interrupted after {} frames", done);
                break;
            }
        }
    }
    Ok(RunSummary {
        frames: done,
        obstacle_ids: ids,
        metrics: runner.core().metrics(),
    })
}
