use derive_more::Display;
use serde::Serialize;
use strum::{AsRefStr, EnumCount, EnumIter, EnumString, IntoEnumIterator};

use crate::results::{PerPhase, Phase, ProcessRecord, ResultsRun};

/// Command name prefix shared by all test workload processes.
pub const TEST_PREFIX: &str = "test_";

/// Synthetic benchmark workload, identified by its exact command name.
#[derive(
    Debug,
    Display,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    EnumCount,
    EnumString,
    AsRefStr,
    Serialize,
)]
pub enum Workload {
    #[display("CPU-Bound")]
    #[strum(serialize = "test_cpu")]
    #[serde(rename = "test_cpu")]
    Cpu,
    #[display("I/O-Bound")]
    #[strum(serialize = "test_io")]
    #[serde(rename = "test_io")]
    Io,
    #[display("Mixed")]
    #[strum(serialize = "test_mixed")]
    #[serde(rename = "test_mixed")]
    Mixed,
}

impl Workload {
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    /// Returns the workload run by `command`, if any.
    pub fn from_command(command: &str) -> Option<Self> {
        command.parse().ok()
    }

    pub fn command(self) -> &'static str {
        match self {
            Self::Cpu => "test_cpu",
            Self::Io => "test_io",
            Self::Mixed => "test_mixed",
        }
    }

    /// Label combining the workload kind and its command, e.g. `CPU-Bound (test_cpu)`.
    pub fn long_name(self) -> String {
        format!("{self} ({})", self.command())
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

/// Test process sampled in one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEntry<'a> {
    pub command: &'a str,
    pub record: &'a ProcessRecord,
}

impl TimelineEntry<'_> {
    pub fn workload(&self) -> Option<Workload> {
        Workload::from_command(self.command)
    }
}

/// Test processes of a run grouped by phase.
#[derive(Debug, Clone)]
pub struct Timeline<'a> {
    phases: PerPhase<Vec<TimelineEntry<'a>>>,
}

impl<'a> Timeline<'a> {
    /// Keeps the records whose command starts with [`TEST_PREFIX`].
    ///
    /// Every phase is present in the result. Entries follow the snapshot order.
    pub fn extract(run: &'a ResultsRun) -> Self {
        let mut phases: PerPhase<Vec<TimelineEntry<'a>>> = Default::default();

        for (phase, snapshot) in run.snapshots() {
            phases[phase.index()] = snapshot
                .records()
                .filter(|record| record.command().starts_with(TEST_PREFIX))
                .map(|record| TimelineEntry {
                    command: record.command(),
                    record,
                })
                .collect();
        }

        Self { phases }
    }

    pub fn phase(&self, phase: Phase) -> &[TimelineEntry<'a>] {
        &self.phases[phase.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Phase, &[TimelineEntry<'a>])> {
        Phase::all().map(|phase| (phase, self.phase(phase)))
    }

    /// Entries of all phases after the baseline, which is taken before any test runs.
    pub fn test_phase_entries(&self) -> impl Iterator<Item = (Phase, &TimelineEntry<'a>)> {
        self.iter()
            .filter(|(phase, _)| *phase != Phase::Baseline)
            .flat_map(|(phase, entries)| entries.iter().map(move |entry| (phase, entry)))
    }

    pub fn total_instances(&self) -> usize {
        self.phases.iter().map(Vec::len).sum()
    }
}
