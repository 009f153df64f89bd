use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use derive_more::Display;
use itertools::Itertools;
use regex::Regex;
use walkdir::WalkDir;

use super::parser::parse_stats_file;
use super::{PerPhase, Phase, PhaseSnapshot, ResultsError};

static TIMESTAMP_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_(\d{8}_\d{6})\.txt$").expect("Timestamp pattern should be a valid regex")
});

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `YYYYMMDD_HHMMSS` suffix shared by all stats files of one experiment run.
///
/// The fixed-width format makes the lexicographic order chronological.
#[derive(Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunTimestamp(String);

impl RunTimestamp {
    /// Extracts the timestamp from a stats file name such as `baseline_20240101_120000.txt`.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        TIMESTAMP_SUFFIX
            .captures(file_name)
            .map(|captures| Self(captures[1].to_owned()))
    }

    /// Returns `None` if the digits do not form a valid calendar date and time.
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.0, TIMESTAMP_FORMAT).ok()
    }

    pub fn phase_file_name(&self, phase: Phase) -> String {
        format!("{}_{}.txt", phase.file_stem(), self.0)
    }
}

/// Which timestamp to load when a directory holds files of several runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampSelection {
    /// Timestamp of the first stats file in file name order.
    #[default]
    First,
    /// Newest timestamp present.
    Latest,
}

/// Returns the distinct run timestamps found in `dir`, in file name order.
///
/// Only files directly inside `dir` are considered.
pub fn find_timestamps(dir: &Path) -> Result<Vec<RunTimestamp>, ResultsError> {
    let mut timestamps = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ResultsError::ScanDirectory {
            path: dir.to_path_buf(),
            source,
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            log::debug!("Skipping non UTF-8 file name {:?}", entry.file_name());
            continue;
        };

        if let Some(timestamp) = RunTimestamp::from_file_name(file_name) {
            timestamps.push(timestamp);
        }
    }

    Ok(timestamps.into_iter().unique().collect())
}

/// Selects the run timestamp of the stats files in `dir`.
///
/// Returns `Ok(None)` when no file name carries a timestamp.
pub fn find_timestamp(
    dir: &Path,
    selection: TimestampSelection,
) -> Result<Option<RunTimestamp>, ResultsError> {
    let timestamps = find_timestamps(dir)?;

    let selected = match selection {
        TimestampSelection::First => timestamps.first().cloned(),
        TimestampSelection::Latest => timestamps.iter().max().cloned(),
    };

    if timestamps.len() > 1 {
        if let Some(selected) = &selected {
            log::warn!(
                "Found results of {} runs ({}), using {selected}",
                timestamps.len(),
                timestamps.iter().join(", ")
            );
        }
    }

    Ok(selected)
}

/// Stats snapshots of all phases of one experiment run.
#[derive(Debug, Clone)]
pub struct ResultsRun {
    timestamp: RunTimestamp,
    snapshots: PerPhase<PhaseSnapshot>,
}

impl ResultsRun {
    /// Loads the run found in `dir`.
    ///
    /// Returns `Ok(None)` if no run timestamp can be determined from the file names.
    /// Stats files missing for some phases result in empty snapshots.
    pub fn load(dir: &Path, selection: TimestampSelection) -> Result<Option<Self>, ResultsError> {
        let Some(timestamp) = find_timestamp(dir, selection)? else {
            log::warn!("Could not determine timestamp from files in `{}`", dir.display());
            return Ok(None);
        };

        Self::load_timestamp(dir, timestamp).map(Some)
    }

    /// Loads the phase files of the run identified by `timestamp`.
    pub fn load_timestamp(dir: &Path, timestamp: RunTimestamp) -> Result<Self, ResultsError> {
        let mut snapshots: PerPhase<PhaseSnapshot> = Default::default();
        for phase in Phase::all() {
            let path = dir.join(timestamp.phase_file_name(phase));
            snapshots[phase.index()] = parse_stats_file(&path)?;
        }

        Ok(Self {
            timestamp,
            snapshots,
        })
    }

    pub fn timestamp(&self) -> &RunTimestamp {
        &self.timestamp
    }

    pub fn snapshot(&self, phase: Phase) -> &PhaseSnapshot {
        &self.snapshots[phase.index()]
    }

    pub fn snapshots(&self) -> impl Iterator<Item = (Phase, &PhaseSnapshot)> {
        Phase::all().map(|phase| (phase, self.snapshot(phase)))
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;

    const SEPARATOR_ONLY: &str = "PID Command TotalCS VoluntaryCS InvoluntCS Runtime(ms) Priority Nice\n\
                                  ------------------------------------------------------------\n";

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_timestamp_from_file_name() {
        let timestamp = RunTimestamp::from_file_name("during_cpu_20240315_093000.txt").unwrap();
        assert_eq!(timestamp.to_string(), "20240315_093000");
        assert_eq!(
            timestamp.datetime().unwrap().to_string(),
            "2024-03-15 09:30:00"
        );
        assert_eq!(
            timestamp.phase_file_name(Phase::Final),
            "final_stats_20240315_093000.txt"
        );

        assert_eq!(RunTimestamp::from_file_name("baseline_20240315.txt"), None);
        assert_eq!(RunTimestamp::from_file_name("baseline_20240315_093000.log"), None);
        assert_eq!(RunTimestamp::from_file_name("20240315_093000.txt"), None);
        assert_eq!(RunTimestamp::from_file_name("x_2024031_0930001.txt"), None);
    }

    #[test]
    fn test_timestamp_with_invalid_date_is_still_a_timestamp() {
        let timestamp = RunTimestamp::from_file_name("baseline_20241399_999999.txt").unwrap();
        assert_eq!(timestamp.datetime(), None);
    }

    #[test]
    fn test_no_matching_files_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "notes.txt", "nothing here");
        write(dir.path(), "baseline.txt", SEPARATOR_ONLY);

        let run = ResultsRun::load(dir.path(), TimestampSelection::First).unwrap();
        assert!(run.is_none());
    }

    #[test]
    fn test_empty_directory_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ResultsRun::load(dir.path(), TimestampSelection::Latest)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = find_timestamps(&dir.path().join("does_not_exist"));
        assert!(matches!(result, Err(ResultsError::ScanDirectory { .. })));
    }

    #[test]
    fn test_load_with_missing_phase_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "baseline_20240101_120000.txt", SEPARATOR_ONLY);
        write(
            dir.path(),
            "during_cpu_20240101_120000.txt",
            &format!("{SEPARATOR_ONLY}1234 test_cpu 50 30 20 9500 20 0\n"),
        );

        let run = ResultsRun::load(dir.path(), TimestampSelection::First)
            .unwrap()
            .unwrap();

        assert_eq!(run.timestamp().to_string(), "20240101_120000");
        assert!(run.snapshot(Phase::Baseline).is_empty());

        let during_cpu = run.snapshot(Phase::DuringCpu);
        assert_eq!(during_cpu.len(), 1);
        let record = &during_cpu[&1234];
        assert_eq!(record.total_cs(), 50);
        assert_eq!(record.involuntary_cs(), 20);

        for phase in [
            Phase::DuringIo,
            Phase::DuringMixed,
            Phase::DuringConcurrent,
            Phase::Final,
        ] {
            assert!(run.snapshot(phase).is_empty(), "{phase}");
        }
        assert_eq!(run.snapshots().count(), 6);
    }

    #[test]
    fn test_final_phase_uses_final_stats_file() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "final_stats_20240101_120000.txt",
            "---\n7 test_io 1 1 0 1 20 0\n",
        );

        let run = ResultsRun::load(dir.path(), TimestampSelection::First)
            .unwrap()
            .unwrap();
        assert_eq!(run.snapshot(Phase::Final).len(), 1);
    }

    #[test]
    fn test_timestamp_selection() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "baseline_20240101_120000.txt", "---\n1 test_cpu 1 1 0 1 20 0\n");
        write(dir.path(), "baseline_20240301_080000.txt", "---\n2 test_cpu 1 1 0 1 20 0\n");
        write(dir.path(), "during_io_20240201_000000.txt", "---\n3 test_io 1 1 0 1 20 0\n");
        fs::create_dir(dir.path().join("nested_20250101_000000.txt")).unwrap();

        let timestamps = find_timestamps(dir.path()).unwrap();
        let timestamps: Vec<_> = timestamps.iter().map(ToString::to_string).collect();
        assert_eq!(
            timestamps,
            ["20240101_120000", "20240301_080000", "20240201_000000"]
        );

        let first = find_timestamp(dir.path(), TimestampSelection::First)
            .unwrap()
            .unwrap();
        assert_eq!(first.to_string(), "20240101_120000");

        let latest = ResultsRun::load(dir.path(), TimestampSelection::Latest)
            .unwrap()
            .unwrap();
        assert_eq!(latest.timestamp().to_string(), "20240301_080000");
        assert!(latest.snapshot(Phase::Baseline).contains_key(&2));
    }
}
