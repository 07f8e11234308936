use crate::math::kernel::KernelHelper;
use crate::math::snr::SnrHelper;
use crate::math::stats::StatsHelper;
use crate::params::{row_value, DetectionAlgorithmId};
use crate::processing::derivative::clamp_order;
use crate::processing::{DetectionInput, Detector, DetectorState};
use crate::sensor_interface::DetectionSet;
use log::warn;

pub const MIN_SOURCE_WIDTH: usize = 3;
pub const MAX_SOURCE_WIDTH: usize = 9;
pub const DEFAULT_SOURCE_WIDTH: usize = 7;
/// Row index of `sourceWidth`.
pub const SOURCE_WIDTH_INDEX: usize = 3;

/// The seven unit-energy pulse templates, one per source half-width 3..=9.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateBank {
    damping: f32,
    templates: Vec<Vec<f32>>,
}

impl TemplateBank {
    pub fn new(damping: f32) -> Self {
        let templates = (MIN_SOURCE_WIDTH..=MAX_SOURCE_WIDTH)
            .map(|width| KernelHelper::gaussian_pulse(width, damping * width as f32, 0.0))
            .collect();
        Self { damping, templates }
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub fn template(&self, source_width: usize) -> &[f32] {
        let index = source_width.clamp(MIN_SOURCE_WIDTH, MAX_SOURCE_WIDTH) - MIN_SOURCE_WIDTH;
        &self.templates[index]
    }
}

/// Correlation against a precomputed pulse template.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedFilter {
    pub std_factor: f32,
    pub damping: f32,
    pub source_width: usize,
    pub derivative_width: usize,
    pub snr_min: f32,
    /// Set when the configured source width was out of range and reset.
    pub source_width_reset: bool,
}

impl MatchedFilter {
    pub fn from_row(row: &[f32]) -> Self {
        let defaults = DetectionAlgorithmId::MatchedFilter.default_row();
        let raw_width = row_value(row, SOURCE_WIDTH_INDEX, defaults[SOURCE_WIDTH_INDEX]);
        let in_range = raw_width >= MIN_SOURCE_WIDTH as f32 && raw_width <= MAX_SOURCE_WIDTH as f32;
        let source_width = if in_range {
            raw_width.round() as usize
        } else {
            warn!(
                "matched filter source width {} outside [{}, {}], using {}",
                raw_width, MIN_SOURCE_WIDTH, MAX_SOURCE_WIDTH, DEFAULT_SOURCE_WIDTH
            );
            DEFAULT_SOURCE_WIDTH
        };
        Self {
            std_factor: row_value(row, 1, defaults[1]).clamp(0.0, 1.0),
            damping: row_value(row, 2, defaults[2]).clamp(0.05, 5.0),
            source_width,
            derivative_width: clamp_order(row_value(row, 4, defaults[4])),
            snr_min: row_value(row, 5, defaults[5]),
            source_width_reset: !in_range,
        }
    }
}

impl Default for MatchedFilter {
    fn default() -> Self {
        Self::from_row(DetectionAlgorithmId::MatchedFilter.default_row())
    }
}

impl Detector for MatchedFilter {
    fn detect(
        &self,
        input: &DetectionInput<'_>,
        state: &mut DetectorState,
        out: &mut DetectionSet,
    ) -> usize {
        out.clear();
        if state
            .templates
            .as_ref()
            .map_or(true, |bank| bank.damping() != self.damping)
        {
            state.templates = Some(TemplateBank::new(self.damping));
        }
        let Some(bank) = state.templates.as_ref() else {
            return 0;
        };

        let region = input.region();
        let width = self.source_width;
        let correlation = KernelHelper::convolution(region, bank.template(width));
        let noise_mean = StatsHelper::mean(&correlation);
        let peak_max = StatsHelper::max(&correlation);
        let threshold = noise_mean + self.std_factor * (peak_max - noise_mean);

        let slope = KernelHelper::convolution(
            &correlation,
            &KernelHelper::derivative_step_kernel(self.derivative_width),
        );
        let delay = (self.derivative_width + width) as f32;
        let noise = input.noise_floor();

        let mut hits = Vec::new();
        for n in (2 * (self.derivative_width + width)).max(1)..slope.len() {
            if !(slope[n - 1] < 0.0 && slope[n] >= 0.0) {
                continue;
            }
            let before = if n >= 2 { slope[n - 2] } else { slope[n - 1] };
            let after = slope.get(n + 1).copied().unwrap_or(slope[n]);
            let t = SnrHelper::interpolate_crossing(before, slope[n - 1], slope[n], after);
            let position = (n - 1) as f32 + t - delay;
            if position < 0.0 {
                continue;
            }
            let index = position.round() as usize;
            let score = correlation.get(index + width).copied().unwrap_or(0.0);
            if score < threshold {
                continue;
            }
            let snr = SnrHelper::snr_at_detection(region, index, width, noise);
            if snr >= self.snr_min {
                hits.push((score, position, snr));
            }
        }

        hits.sort_by(|a, b| b.0.total_cmp(&a.0));
        for (_, position, snr) in hits {
            if !out.push(input.detection(position, snr)) {
                break;
            }
        }
        out.count()
    }
}
