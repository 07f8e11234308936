use crate::generator::profile::ScenarioConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tofcore::config::SensorConfig;
use tofcore::params::{AlgorithmParameterSet, DetectionAlgorithmId};
use tofcore::ParameterTarget;

/// A single parameter write applied before the run starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterOverride {
    pub target: ParameterTarget,
    pub index: usize,
    pub value: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub sensor: SensorConfig,
    pub parameters: AlgorithmParameterSet,
    pub detection_algorithm: Option<DetectionAlgorithmId>,
    /// Raw protocol value; clamped by the core.
    pub tracking_algorithm: Option<i64>,
    pub overrides: Vec<ParameterOverride>,
    pub frames: usize,
    pub realtime: bool,
    pub report: Option<PathBuf>,
    pub scenario: ScenarioConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            parameters: AlgorithmParameterSet::default(),
            detection_algorithm: None,
            tracking_algorithm: None,
            overrides: Vec::new(),
            frames: 100,
            realtime: false,
            report: None,
            scenario: ScenarioConfig::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Command-line values take precedence over the file.
    pub fn apply_args(
        mut self,
        frames: Option<usize>,
        detection: Option<usize>,
        tracking: Option<i64>,
        realtime: bool,
        report: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        if let Some(frames) = frames {
            self.frames = frames;
        }
        if let Some(index) = detection {
            let id = DetectionAlgorithmId::from_index(index)
                .with_context(|| format!("unknown detection algorithm {}", index))?;
            self.detection_algorithm = Some(id);
        }
        if tracking.is_some() {
            self.tracking_algorithm = tracking;
        }
        self.realtime |= realtime;
        if report.is_some() {
            self.report = report;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"frames: 12\n\
sensor:\n  channel_count: 4\n  dead_zone: 2\n\
detection_algorithm: MatchedFilter\n\
tracking_algorithm: 2\n\
overrides:\n  - target: !Detection MatchedFilter\n    index: 3\n    value: 5.0\n\
scenario:\n  noise: 1.5\n  targets:\n    - channel: 1\n      start_distance_m: 90.0\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.frames, 12);
        assert_eq!(cfg.sensor.channel_count, 4);
        assert_eq!(cfg.sensor.samples_per_frame, 1024);
        assert_eq!(cfg.detection_algorithm, Some(DetectionAlgorithmId::MatchedFilter));
        assert_eq!(cfg.tracking_algorithm, Some(2));
        assert_eq!(
            cfg.overrides[0].target,
            ParameterTarget::Detection(DetectionAlgorithmId::MatchedFilter)
        );
        assert_eq!(cfg.scenario.targets[0].channel, 1);
        assert_eq!(cfg.scenario.targets[0].amplitude, 2000.0);
    }

    #[test]
    fn args_override_the_file() {
        let cfg = WorkflowConfig::default()
            .apply_args(Some(3), Some(6), Some(0), true, None)
            .unwrap();
        assert_eq!(cfg.frames, 3);
        assert_eq!(cfg.detection_algorithm, Some(DetectionAlgorithmId::Music));
        assert_eq!(cfg.tracking_algorithm, Some(0));
        assert!(cfg.realtime);
    }

    #[test]
    fn unknown_detection_index_is_an_error() {
        assert!(WorkflowConfig::default()
            .apply_args(None, Some(11), None, false, None)
            .is_err());
    }
}
