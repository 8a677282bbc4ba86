//! Audit log files.
//!
//! Each audit run is appended to `<dir>/<prefix>_<host>_<day of year>.log`,
//! preceded by a header line naming the time and device.

use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::audit::AuditReport;
use crate::error::Result;

/// Default file name prefix
pub const DEFAULT_AUDIT_PREFIX: &str = "cis";

/// Writes audit reports to per-device, per-day log files.
#[derive(Debug, Clone)]
pub struct AuditLogWriter {
    dir: PathBuf,
    prefix: String,
}

impl AuditLogWriter {
    /// Create a writer for `dir`; a trailing `/` is ignored.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let raw = dir.as_ref().to_string_lossy();
        let trimmed = match raw.trim_end_matches('/') {
            "" => "/",
            other => other,
        };
        Self {
            dir: PathBuf::from(trimmed),
            prefix: DEFAULT_AUDIT_PREFIX.to_string(),
        }
    }

    /// Use a different file name prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Directory files are written to
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Log file path for a host on a given day.
    pub fn path_for(&self, host: &str, when: DateTime<Local>) -> PathBuf {
        self.dir.join(format!(
            "{}_{}_{}.log",
            self.prefix,
            host,
            when.format("%j")
        ))
    }

    /// Header line written before each run's output.
    pub fn header(hostname: &str, when: DateTime<Local>) -> String {
        format!(
            " ### {} {} ###\r\n",
            when.format("%a %b %e %H:%M:%S %Y"),
            hostname
        )
    }

    /// Append a report to its log file, creating the directory if needed.
    pub fn write(&self, report: &AuditReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(&report.host, report.started_at);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

        file.write_all(Self::header(report.display_name(), report.started_at).as_bytes())?;
        for result in &report.results {
            file.write_all(result.output.as_bytes())?;
        }
        file.flush()?;

        debug!(host = %report.host, path = %path.display(), "Wrote audit log");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn when() -> DateTime<Local> {
        Local.with_ymd_and_hms(2015, 12, 13, 8, 5, 9).unwrap()
    }

    #[test]
    fn test_path_naming() {
        let writer = AuditLogWriter::new("/tmp");
        assert_eq!(
            writer.path_for("10.255.138.120", when()),
            PathBuf::from("/tmp/cis_10.255.138.120_347.log")
        );
    }

    #[test]
    fn test_trailing_slash_and_prefix() {
        let writer = AuditLogWriter::new("/var/audit/").with_prefix("core");
        assert_eq!(writer.dir(), Path::new("/var/audit"));
        let jan = Local.with_ymd_and_hms(2016, 1, 5, 0, 0, 0).unwrap();
        assert_eq!(
            writer.path_for("r1", jan),
            PathBuf::from("/var/audit/core_r1_005.log")
        );
    }

    #[test]
    fn test_root_dir_kept() {
        assert_eq!(AuditLogWriter::new("/").dir(), Path::new("/"));
    }

    #[test]
    fn test_header_format() {
        assert_eq!(
            AuditLogWriter::header("isr-2911-a", when()),
            " ### Sun Dec 13 08:05:09 2015 isr-2911-a ###\r\n"
        );
    }
}
