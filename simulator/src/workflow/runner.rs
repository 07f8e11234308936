use crate::generator::profile::ProfileGenerator;
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tofcore::prelude::{FrameSummary, Obstacle};
use tofcore::telemetry::MetricsSnapshot;
use tofcore::SensorCore;

/// One line of the JSON-lines report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameReport {
    pub frame: usize,
    pub summaries: Vec<FrameSummary>,
    pub obstacles: Vec<Obstacle>,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub frames: usize,
    pub obstacle_ids: Vec<u32>,
    pub metrics: MetricsSnapshot,
}

pub struct ReportWriter {
    out: BufWriter<File>,
}

impl ReportWriter {
    pub fn create(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating report directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening report {}", path.display()))?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    pub fn write(&mut self, report: &FrameReport) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.out, report).context("serializing frame report")?;
        self.out.write_all(b"\n").context("writing frame report")?;
        Ok(())
    }

    pub fn finish(mut self) -> anyhow::Result<()> {
        self.out.flush().context("flushing report")
    }
}

pub struct Runner {
    core: SensorCore,
    generator: ProfileGenerator,
    frame: usize,
}

impl Runner {
    pub fn new(config: &WorkflowConfig) -> anyhow::Result<Self> {
        let mut core = SensorCore::new(config.sensor.clone(), config.parameters.clone())
            .context("building sensor core")?;
        if let Some(id) = config.detection_algorithm {
            core.set_detection_algorithm(id);
        }
        if let Some(raw) = config.tracking_algorithm {
            core.set_tracking_algorithm_index(raw);
        }
        for item in &config.overrides {
            if !core.set_parameter(item.target, item.index, item.value) {
                log::warn!("override {:?}[{}] ignored", item.target, item.index);
            }
        }
        Ok(Self {
            generator: ProfileGenerator::new(config.scenario.clone(), core.config()),
            core,
            frame: 0,
        })
    }

    pub fn core(&self) -> &SensorCore {
        &self.core
    }

    /// Feeds one frame to every channel, then projects obstacles.
    pub fn step(&mut self) -> anyhow::Result<FrameReport> {
        let channels = self.core.config().channel_count;
        let mut summaries = Vec::with_capacity(channels);
        for channel in 0..channels {
            let samples = self.generator.frame(channel, self.frame);
            let summary = self
                .core
                .process_frame(channel, &samples)
                .with_context(|| format!("processing frame {} channel {}", self.frame, channel))?;
            summaries.push(summary);
        }
        let report = FrameReport {
            frame: self.frame,
            summaries,
            obstacles: self
                .core
                .obstacles()
                .into_iter()
                .filter(|o| !o.is_none())
                .collect(),
        };
        self.frame += 1;
        Ok(report)
    }

    pub fn execute(
        &mut self,
        frames: usize,
        mut report: Option<&mut ReportWriter>,
    ) -> anyhow::Result<RunSummary> {
        let mut summary = RunSummary::default();
        for _ in 0..frames {
            let frame = self.step()?;
            for obstacle in &frame.obstacles {
                if !summary.obstacle_ids.contains(&obstacle.id) {
                    summary.obstacle_ids.push(obstacle.id);
                }
            }
            if let Some(writer) = report.as_deref_mut() {
                writer.write(&frame)?;
            }
            summary.frames += 1;
        }
        summary.metrics = self.core.metrics();
        info!(
            "ran {} frames: {} obstacle ids, {} detections",
            summary.frames,
            summary.obstacle_ids.len(),
            summary.metrics.detections_emitted
        );
        Ok(summary)
    }
}
