pub mod aggregate;
pub mod extract;
pub mod rank;

pub use aggregate::{aggregate, FailureCounts};
pub use extract::{extract_addresses, LineMatcher, RegexLineMatcher};
pub use rank::{rank, FailureRecord};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AuthLogError {
    #[error("unable to read `{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to compile auth log pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("auth log pattern `{pattern}' has no named group `addr'")]
    MissingAddrGroup { pattern: String },
}

/// Reads a whole auth log snapshot and turns it into ranked failure records.
pub struct AuthLogAnalyzer {
    path: PathBuf,
    matcher: Box<dyn LineMatcher + Send + Sync>,
    limit: Option<usize>,
}

impl AuthLogAnalyzer {
    pub fn new(
        path: impl Into<PathBuf>,
        matcher: Box<dyn LineMatcher + Send + Sync>,
        limit: Option<usize>,
    ) -> Self {
        Self {
            path: path.into(),
            matcher,
            limit,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn analyze(&self) -> Result<Vec<FailureRecord>, AuthLogError> {
        let bytes = fs::read(&self.path).map_err(|source| AuthLogError::Read {
            path: self.path.display().to_string(),
            source,
        })?;
        // syslog may leave stray non-UTF-8 bytes; they only spoil their own line.
        let records = self.analyze_text(&String::from_utf8_lossy(&bytes));
        debug!(
            path = %self.path.display(),
            sources = records.len(),
            "auth log analyzed"
        );
        Ok(records)
    }

    pub fn analyze_text(&self, text: &str) -> Vec<FailureRecord> {
        let mut records = rank(aggregate(extract_addresses(text, self.matcher.as_ref())));
        if let Some(limit) = self.limit {
            records.truncate(limit);
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Write;

    const SAMPLE: &str = "\
Feb 10 03:12:01 web sshd[100]: Failed password for root from 10.0.0.5 port 4100 ssh2
Feb 10 03:12:04 web sshd[100]: Failed password for root from 10.0.0.5 port 4101 ssh2
Feb 10 03:12:09 web sshd[101]: Failed password for invalid user test from 10.0.0.9 port 4200 ssh2
Feb 10 03:12:10 web sshd[102]: Accepted password for deploy from 10.0.0.2 port 4300 ssh2
Feb 10 03:12:12 web sshd[100]: Failed password for root from 10.0.0.5 port 4102 ssh2
";

    fn analyzer(path: impl Into<PathBuf>, limit: Option<usize>) -> AuthLogAnalyzer {
        let matcher = RegexLineMatcher::failed_password().expect("default pattern compiles");
        AuthLogAnalyzer::new(path, Box::new(matcher), limit)
    }

    fn write_log(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(text.as_bytes()).expect("write log");
        file
    }

    #[test]
    fn analyzes_log_file() {
        let file = write_log(SAMPLE);
        let records = analyzer(file.path(), None).analyze().expect("readable log");
        assert_eq!(
            records,
            vec![
                FailureRecord {
                    source_address: "10.0.0.5".to_string(),
                    attempt_count: 3,
                },
                FailureRecord {
                    source_address: "10.0.0.9".to_string(),
                    attempt_count: 1,
                },
            ]
        );
    }

    #[test]
    fn empty_log_is_not_an_error() {
        let file = write_log("");
        let records = analyzer(file.path(), None).analyze().expect("empty log");
        assert!(records.is_empty());
    }

    #[test]
    fn unreadable_log_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("auth.log");
        let err = analyzer(&missing, None).analyze().unwrap_err();
        match err {
            AuthLogError::Read { path, .. } => assert!(path.ends_with("auth.log")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn repeated_runs_give_the_same_records() {
        let text = "\
sshd: Failed password for a from 1.1.1.1 port 1
sshd: Failed password for a from 2.2.2.2 port 1
sshd: Failed password for a from 3.3.3.3 port 1
sshd: Failed password for a from 1.1.1.1 port 1
";
        let file = write_log(text);
        let a = analyzer(file.path(), None);
        let first: HashSet<FailureRecord> = a.analyze().unwrap().into_iter().collect();
        let second: HashSet<FailureRecord> = a.analyze().unwrap().into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn invalid_utf8_line_does_not_drop_the_log() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"sshd[1]: Failed password for root from 10.0.0.5 port 22 ssh2\n");
        bytes.extend_from_slice(b"kernel: junk \xff\xfe\n");
        bytes.extend_from_slice(b"sshd[2]: Failed password for root from 10.0.0.5 port 22 ssh2\n");
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&bytes).expect("write log");

        let records = analyzer(file.path(), None).analyze().expect("log is still readable");
        assert_eq!(
            records,
            vec![FailureRecord {
                source_address: "10.0.0.5".to_string(),
                attempt_count: 2,
            }]
        );
    }

    #[test]
    fn limit_keeps_top_records() {
        let records = analyzer("unused", Some(1)).analyze_text(SAMPLE);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_address, "10.0.0.5");
    }
}
