use std::path::PathBuf;

use derive_more::{Deref, Display};
use indexmap::IndexMap;
use strum::{EnumCount, EnumIter, IntoEnumIterator};
use thiserror::Error;

mod loader;
mod parser;

pub use loader::{ResultsRun, RunTimestamp, TimestampSelection};

#[derive(Error, Debug)]
pub enum ResultsError {
    #[error("Failed to read stats file `{}`", path.display())]
    ReadStatsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to scan results directory `{}`", path.display())]
    ScanDirectory {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Stage of the scheduler experiment during which a stats snapshot was taken.
///
/// Variants are declared in experiment order.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, EnumCount,
)]
pub enum Phase {
    #[display("baseline")]
    Baseline,
    #[display("during_cpu")]
    DuringCpu,
    #[display("during_io")]
    DuringIo,
    #[display("during_mixed")]
    DuringMixed,
    #[display("during_concurrent")]
    DuringConcurrent,
    #[display("final")]
    Final,
}

impl Phase {
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    /// Prefix of the stats file written for this phase.
    ///
    /// Same as the display name except for [`Phase::Final`].
    pub const fn file_stem(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::DuringCpu => "during_cpu",
            Self::DuringIo => "during_io",
            Self::DuringMixed => "during_mixed",
            Self::DuringConcurrent => "during_concurrent",
            Self::Final => "final_stats",
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

/// Statistics of one process as sampled by the scheduler monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pid: i64,
    command: String,
    total_cs: i64,
    voluntary_cs: i64,
    involuntary_cs: i64,
    runtime_ms: i64,
    priority: i64,
    nice: i64,
}

impl ProcessRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pid: i64,
        command: impl Into<String>,
        total_cs: i64,
        voluntary_cs: i64,
        involuntary_cs: i64,
        runtime_ms: i64,
        priority: i64,
        nice: i64,
    ) -> Self {
        Self {
            pid,
            command: command.into(),
            total_cs,
            voluntary_cs,
            involuntary_cs,
            runtime_ms,
            priority,
            nice,
        }
    }

    pub const fn pid(&self) -> i64 {
        self.pid
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub const fn total_cs(&self) -> i64 {
        self.total_cs
    }

    pub const fn voluntary_cs(&self) -> i64 {
        self.voluntary_cs
    }

    pub const fn involuntary_cs(&self) -> i64 {
        self.involuntary_cs
    }

    pub const fn runtime_ms(&self) -> i64 {
        self.runtime_ms
    }
}

/// Process records of one phase keyed by PID.
///
/// Iteration follows the order in which PIDs first appeared in the stats file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref)]
pub struct PhaseSnapshot(IndexMap<i64, ProcessRecord>);

impl PhaseSnapshot {
    /// Inserts the record, replacing the values of an already present PID
    /// while keeping its original position.
    pub fn insert(&mut self, record: ProcessRecord) {
        self.0.insert(record.pid(), record);
    }

    pub fn records(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.0.values()
    }
}

impl FromIterator<ProcessRecord> for PhaseSnapshot {
    fn from_iter<T: IntoIterator<Item = ProcessRecord>>(iter: T) -> Self {
        let mut snapshot = Self::default();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

pub(crate) type PerPhase<T> = [T; Phase::COUNT];

/// Writes `files` into a fresh temporary directory and loads the run found there.
#[cfg(test)]
pub(crate) fn load_test_run(files: &[(&str, &str)]) -> (tempfile::TempDir, ResultsRun) {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).unwrap();
    }
    let run = ResultsRun::load(dir.path(), TimestampSelection::First)
        .unwrap()
        .unwrap();
    (dir, run)
}
