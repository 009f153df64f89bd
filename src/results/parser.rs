use std::io::ErrorKind;
use std::num::ParseIntError;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use super::{PhaseSnapshot, ProcessRecord, ResultsError};

/// Lines up to and including the first line starting with this marker are header.
const HEADER_SEPARATOR: &str = "---";

/// Data lines starting with this marker are decoration, not records.
const DECORATION_MARKER: char = '=';

const RECORD_FIELDS: usize = 8;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseRecordError {
    #[error("Expected at least 8 fields, found {0}")]
    TooFewFields(usize),
    #[error("Invalid {field} value `{value}`: {source}")]
    InvalidInteger {
        field: &'static str,
        value: String,
        source: ParseIntError,
    },
}

fn parse_field(
    fields: &[&str],
    index: usize,
    field: &'static str,
) -> Result<i64, ParseRecordError> {
    let value = fields[index];
    value
        .parse()
        .map_err(|source| ParseRecordError::InvalidInteger {
            field,
            value: value.to_owned(),
            source,
        })
}

impl FromStr for ProcessRecord {
    type Err = ParseRecordError;

    /// Parses `pid command total_cs vol_cs invol_cs runtime_ms priority nice`.
    ///
    /// Fields beyond the eighth are ignored.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < RECORD_FIELDS {
            return Err(ParseRecordError::TooFewFields(fields.len()));
        }

        Ok(Self::new(
            parse_field(&fields, 0, "pid")?,
            fields[1],
            parse_field(&fields, 2, "total context switches")?,
            parse_field(&fields, 3, "voluntary context switches")?,
            parse_field(&fields, 4, "involuntary context switches")?,
            parse_field(&fields, 5, "runtime")?,
            parse_field(&fields, 6, "priority")?,
            parse_field(&fields, 7, "nice")?,
        ))
    }
}

/// Parses the content of a stats file.
///
/// Malformed data lines are skipped. If the header separator is missing,
/// every line is treated as a data line.
pub fn parse_stats(content: &str) -> PhaseSnapshot {
    let lines: Vec<&str> = content.lines().collect();
    let data_start = lines
        .iter()
        .position(|line| line.starts_with(HEADER_SEPARATOR))
        .map_or(0, |separator| separator + 1);

    let mut snapshot = PhaseSnapshot::default();
    let mut skipped = 0usize;

    for (line_no, line) in lines.iter().enumerate().skip(data_start) {
        let line = line.trim();
        if line.is_empty() || line.starts_with(DECORATION_MARKER) {
            continue;
        }

        match line.parse::<ProcessRecord>() {
            Ok(record) => snapshot.insert(record),
            Err(err) => {
                log::debug!(
                    target: "stats_parser",
                    "Skipping line {}: {err}: `{line}`",
                    line_no + 1
                );
                skipped += 1;
            }
        }
    }

    log::debug!(target: "stats_parser",
        "Parsed {} records, skipped {skipped} malformed lines",
        snapshot.len()
    );

    snapshot
}

/// Parses one stats file.
///
/// A file that does not exist yields an empty snapshot.
pub fn parse_stats_file(path: &Path) -> Result<PhaseSnapshot, ResultsError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            log::info!("Stats file `{}` not found, using empty snapshot", path.display());
            return Ok(PhaseSnapshot::default());
        }
        Err(source) => {
            return Err(ResultsError::ReadStatsFile {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    log::debug!("Parsing stats file `{}`", path.display());
    Ok(parse_stats(&content))
}

#[cfg(test)]
mod test {
    use super::*;

    const HEADER: &str = "\
=== CPU Scheduler Monitoring Statistics ===

Monitoring Duration: 42 seconds
Sampling Interval: 1000 ms
PID      Command              TotalCS      VoluntaryCS  InvoluntCS   Runtime(ms)  Priority Nice
-----------------------------------------------------------------------------------------------
";

    #[test]
    fn test_parse_record_line() {
        let record: ProcessRecord = "1234 test_cpu 50 30 20 9500 20 0".parse().unwrap();

        assert_eq!(record.pid(), 1234);
        assert_eq!(record.command(), "test_cpu");
        assert_eq!(record.total_cs(), 50);
        assert_eq!(record.voluntary_cs(), 30);
        assert_eq!(record.involuntary_cs(), 20);
        assert_eq!(record.runtime_ms(), 9500);
        assert_eq!(record.priority, 20);
        assert_eq!(record.nice, 0);
    }

    #[test]
    fn test_parse_record_ignores_extra_fields() {
        let record: ProcessRecord = "7 kworker/0:1 1 1 0 3 120 -5 extra".parse().unwrap();
        assert_eq!(record.command(), "kworker/0:1");
        assert_eq!(record.nice, -5);
    }

    #[test]
    fn test_parse_record_errors() {
        assert_eq!(
            "1 test_cpu 2 3".parse::<ProcessRecord>(),
            Err(ParseRecordError::TooFewFields(4))
        );

        let err = "1 test_cpu 2 x 4 5 6 7".parse::<ProcessRecord>().unwrap_err();
        assert!(matches!(
            err,
            ParseRecordError::InvalidInteger {
                field: "voluntary context switches",
                ..
            }
        ));

        assert!("pid test_cpu 2 3 4 5 6 7".parse::<ProcessRecord>().is_err());
    }

    #[test]
    fn test_parse_skips_header_and_malformed_lines() {
        let content = format!(
            "{HEADER}\
1234 test_cpu 50 30 20 9500 20 0
garbage line
5 short 1 2

===========
1235 test_io 900 850 50 120 20 0
1236 test_mixed 10 abc 5 10 20 0
1237 bash 3 3 0 1 20 0

NOTE: Priority values (Linux kernel):
  0-99: Real-time priorities (higher value = higher priority)
"
        );

        let snapshot = parse_stats(&content);

        assert_eq!(snapshot.len(), 3);
        let pids: Vec<_> = snapshot.keys().copied().collect();
        assert_eq!(pids, [1234, 1235, 1237]);
    }

    #[test]
    fn test_malformed_lines_do_not_change_valid_count() {
        let valid = [
            "1 test_cpu 1 1 0 1 20 0",
            "2 test_io 2 2 0 2 20 0",
            "3 test_mixed 3 2 1 3 20 0",
        ];
        let malformed = ["x y z", "4 test_cpu a b c d e f", "5 only three", ""];

        let in_order = format!("---\n{}\n{}\n", valid.join("\n"), malformed.join("\n"));
        let interleaved = format!(
            "---\n{}\n{}\n{}\n{}\n{}\n",
            malformed[0], valid[0], malformed[1], valid[1], valid[2]
        );
        let malformed_first = format!("---\n{}\n{}\n", malformed.join("\n"), valid.join("\n"));

        for content in [in_order, interleaved, malformed_first] {
            assert_eq!(parse_stats(&content).len(), valid.len(), "{content}");
        }
    }

    #[test]
    fn test_header_lines_are_not_data() {
        // Lines before the separator look like records but belong to the header.
        let content = "99 test_cpu 1 1 1 1 1 1\n----\n1 test_io 1 1 0 1 20 0\n";
        let snapshot = parse_stats(content);
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key(&1));
    }

    #[test]
    fn test_missing_separator_parses_whole_file() {
        let content = "1 test_cpu 1 1 0 1 20 0\n2 test_io 2 2 0 2 20 0\n";
        assert_eq!(parse_stats(content).len(), 2);
    }

    #[test]
    fn test_only_header_gives_empty_snapshot() {
        assert!(parse_stats(HEADER).is_empty());
        assert!(parse_stats("").is_empty());
    }

    #[test]
    fn test_nonexistent_file_gives_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = parse_stats_file(&dir.path().join("missing_20240101_000000.txt")).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("during_cpu_20240101_120000.txt");
        std::fs::write(&path, format!("{HEADER}1234 test_cpu 50 30 20 9500 20 0\n")).unwrap();

        let snapshot = parse_stats_file(&path).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[&1234].involuntary_cs(), 20);
    }
}
