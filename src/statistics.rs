use std::io::Write;

use itertools::Itertools;
use serde::Serialize;
use strum::EnumCount;

use crate::timeline::{Timeline, Workload};

pub trait Mean {
    /// Arithmetic mean, `None` for an empty slice.
    fn mean(&self) -> Option<f64>;
}

impl Mean for [i64] {
    fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let sum: i128 = self.iter().copied().map(i128::from).sum();
        Some(sum as f64 / self.len() as f64)
    }
}

impl Mean for [f64] {
    fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.iter().sum::<f64>() / self.len() as f64)
    }
}

/// Smallest and largest element, `None` for an empty slice.
pub fn min_max(elements: &[i64]) -> Option<(i64, i64)> {
    elements.iter().copied().minmax().into_option()
}

/// Per-process samples of one workload taken outside the baseline phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkloadSamples {
    pub total_cs: Vec<i64>,
    pub involuntary_cs: Vec<i64>,
    pub voluntary_cs: Vec<i64>,
    /// Runtime in seconds.
    pub runtime: Vec<f64>,
}

impl WorkloadSamples {
    pub fn len(&self) -> usize {
        self.total_cs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_cs.is_empty()
    }
}

/// Aggregated scheduling metrics of one workload.
///
/// Means of a workload without samples are zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadSummary {
    pub workload: Workload,
    pub samples: usize,
    pub mean_total_cs: f64,
    pub mean_involuntary_cs: f64,
    pub mean_voluntary_cs: f64,
    pub mean_runtime_s: f64,
    /// Mean involuntary context switches as a percentage of mean total context switches.
    pub involuntary_ratio_pct: f64,
    pub min_total_cs: Option<i64>,
    pub max_total_cs: Option<i64>,
}

/// Returns `involuntary / total` in percent, or 0 when `total` is not positive.
pub fn involuntary_ratio(mean_involuntary: f64, mean_total: f64) -> f64 {
    if mean_total > 0.0 {
        mean_involuntary / mean_total * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkloadMetrics {
    samples: [WorkloadSamples; Workload::COUNT],
}

impl WorkloadMetrics {
    /// Collects samples of the known workloads from all phases except the baseline.
    pub fn from_timeline(timeline: &Timeline<'_>) -> Self {
        let mut metrics = Self::default();

        for (_, entry) in timeline.test_phase_entries() {
            let Some(workload) = entry.workload() else {
                continue;
            };
            let record = entry.record;
            let samples = &mut metrics.samples[workload.index()];
            samples.total_cs.push(record.total_cs());
            samples.involuntary_cs.push(record.involuntary_cs());
            samples.voluntary_cs.push(record.voluntary_cs());
            samples.runtime.push(record.runtime_ms() as f64 / 1000.0);
        }

        metrics
    }

    pub fn samples(&self, workload: Workload) -> &WorkloadSamples {
        &self.samples[workload.index()]
    }

    pub fn summary(&self, workload: Workload) -> WorkloadSummary {
        let samples = self.samples(workload);

        let mean_total_cs = samples.total_cs.mean().unwrap_or(0.0);
        let mean_involuntary_cs = samples.involuntary_cs.mean().unwrap_or(0.0);
        let total_range = min_max(&samples.total_cs);

        WorkloadSummary {
            workload,
            samples: samples.len(),
            mean_total_cs,
            mean_involuntary_cs,
            mean_voluntary_cs: samples.voluntary_cs.mean().unwrap_or(0.0),
            mean_runtime_s: samples.runtime.mean().unwrap_or(0.0),
            involuntary_ratio_pct: if samples.is_empty() {
                0.0
            } else {
                involuntary_ratio(mean_involuntary_cs, mean_total_cs)
            },
            min_total_cs: total_range.map(|(min, _)| min),
            max_total_cs: total_range.map(|(_, max)| max),
        }
    }

    pub fn summaries(&self) -> Vec<WorkloadSummary> {
        Workload::all().map(|workload| self.summary(workload)).collect()
    }

    pub fn write_json(&self, writer: &mut impl Write) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, &self.summaries())
    }

    pub fn write_stats(&self, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(
            out,
            "{:<24} {:>7} {:>10} {:>10} {:>10} {:>11} {:>8} {:>9}",
            "Workload",
            "Samples",
            "Avg CS",
            "Avg Invol",
            "Avg Vol",
            "Avg Runtime",
            "Invol %",
            "CS range"
        )?;

        for summary in self.summaries() {
            let range = match (summary.min_total_cs, summary.max_total_cs) {
                (Some(min), Some(max)) => format!("{min}-{max}"),
                _ => "-".to_owned(),
            };
            writeln!(
                out,
                "{:<24} {:>7} {:>10.1} {:>10.1} {:>10.1} {:>10.2}s {:>7.1}% {:>9}",
                summary.workload.long_name(),
                summary.samples,
                summary.mean_total_cs,
                summary.mean_involuntary_cs,
                summary.mean_voluntary_cs,
                summary.mean_runtime_s,
                summary.involuntary_ratio_pct,
                range
            )?;
        }

        Ok(())
    }
}
