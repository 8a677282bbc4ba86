//! Output formatting module for iosctl
//!
//! Per-host status lines, a recap, and JSON documents for scripting.

use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::{Duration, Instant};

/// Outcome of a sequence on one host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    /// Sequence completed without changing the device
    Ok,
    /// Sequence completed and changed the device
    Changed,
    /// A step failed
    Failed,
    /// Connection or login failed
    Unreachable,
}

impl HostStatus {
    /// Get the colored string representation
    pub fn colored_string(&self) -> String {
        match self {
            HostStatus::Ok => "ok".green().to_string(),
            HostStatus::Changed => "changed".yellow().to_string(),
            HostStatus::Failed => "failed".red().bold().to_string(),
            HostStatus::Unreachable => "unreachable".red().bold().to_string(),
        }
    }

    /// Get the plain string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            HostStatus::Ok => "ok",
            HostStatus::Changed => "changed",
            HostStatus::Failed => "failed",
            HostStatus::Unreachable => "unreachable",
        }
    }
}

/// Output formatter for different output modes
pub struct OutputFormatter {
    use_color: bool,
    json_mode: bool,
    verbosity: u8,
    start_time: Instant,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();
        if !use_color {
            colored::control::set_override(false);
        }

        Self {
            use_color,
            json_mode,
            verbosity,
            start_time: Instant::now(),
        }
    }

    /// Returns true in JSON mode
    pub fn is_json(&self) -> bool {
        self.json_mode
    }

    /// Print a banner/header
    pub fn banner(&self, title: &str) {
        if self.json_mode {
            return;
        }

        let header = format!("{} ", title);
        let stars = "*".repeat(80_usize.saturating_sub(header.len()));
        if self.use_color {
            println!("\n{}{}", header.bright_white().bold(), stars.bright_black());
        } else {
            println!("\n{}{}", header, stars);
        }
    }

    /// Print the result line for a host
    pub fn host_result(&self, host: &str, status: HostStatus, message: Option<&str>) {
        if self.json_mode {
            return;
        }

        let (status_str, host_str) = if self.use_color {
            (status.colored_string(), host.bright_white().bold().to_string())
        } else {
            (status.as_str().to_string(), host.to_string())
        };

        match message {
            Some(msg) => println!("{}: [{}] => {}", status_str, host_str, msg),
            None => println!("{}: [{}]", status_str, host_str),
        }
    }

    /// Print captured device text, indented (verbose only)
    pub fn device_text(&self, label: &str, text: &str) {
        if self.json_mode || self.verbosity < 1 || text.trim().is_empty() {
            return;
        }

        if self.use_color {
            println!("    {}", label.bright_black());
        } else {
            println!("    {}", label);
        }
        for line in text.lines() {
            println!("      {}", line.trim_end_matches('\r'));
        }
    }

    /// Print a JSON document to stdout
    pub fn json<T: Serialize>(&self, value: &T) -> serde_json::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print a recap summary
    pub fn recap(&self, stats: &RecapStats) {
        if self.json_mode {
            return;
        }

        let header = "RECAP ";
        let stars = "*".repeat(80 - header.len());
        if self.use_color {
            println!("\n{}{}", header.bright_white().bold(), stars.bright_black());
        } else {
            println!("\n{}{}", header, stars);
        }

        for (host, host_stats) in &stats.hosts {
            if self.use_color {
                let host_colored = if host_stats.failed > 0 || host_stats.unreachable > 0 {
                    host.red().bold()
                } else if host_stats.changed > 0 {
                    host.yellow()
                } else {
                    host.green()
                };

                // Dim if zero, colored if non-zero
                let fmt_stat = |label: &str, value: u32, color: colored::Color| -> String {
                    if value > 0 {
                        format!("{}={:<4}", label.color(color), value)
                    } else {
                        format!("{}={:<4}", label, value).dimmed().to_string()
                    }
                };

                println!(
                    "{:<30} : {} {} {} {}",
                    host_colored,
                    fmt_stat("ok", host_stats.ok, colored::Color::Green),
                    fmt_stat("changed", host_stats.changed, colored::Color::Yellow),
                    fmt_stat("unreachable", host_stats.unreachable, colored::Color::Red),
                    fmt_stat("failed", host_stats.failed, colored::Color::Red),
                );
            } else {
                println!(
                    "{:<30} : ok={:<4} changed={:<4} unreachable={:<4} failed={:<4}",
                    host,
                    host_stats.ok,
                    host_stats.changed,
                    host_stats.unreachable,
                    host_stats.failed
                );
            }
        }

        let duration_str = format_duration(self.start_time.elapsed());
        if self.use_color {
            println!("\n{} {}", "Run took".bright_black(), duration_str.bright_white());
        } else {
            println!("\nRun took {}", duration_str);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.json_mode {
            let warn = serde_json::json!({ "type": "warning", "message": message });
            eprintln!("{}", warn);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "WARNING:".yellow().bold(), message);
        } else {
            eprintln!("WARNING: {}", message);
        }
    }


    /// Flush stdout
    pub fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

/// Statistics for a single host
#[derive(Debug, Clone, Default, Serialize)]
pub struct HostStats {
    pub ok: u32,
    pub changed: u32,
    pub unreachable: u32,
    pub failed: u32,
}

impl HostStats {
    /// Record a host status
    pub fn record(&mut self, status: HostStatus) {
        match status {
            HostStatus::Ok => self.ok += 1,
            HostStatus::Changed => self.changed += 1,
            HostStatus::Failed => self.failed += 1,
            HostStatus::Unreachable => self.unreachable += 1,
        }
    }
}

/// Recap statistics for all hosts
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecapStats {
    pub hosts: BTreeMap<String, HostStats>,
}

impl RecapStats {
    /// Create new empty recap stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome for a host
    pub fn record(&mut self, host: &str, status: HostStatus) {
        self.hosts.entry(host.to_string()).or_default().record(status);
    }

    /// Process exit code: 3 if any host was unreachable, else 2 if any failed.
    pub fn exit_code(&self) -> i32 {
        if self.hosts.values().any(|h| h.unreachable > 0) {
            3
        } else if self.hosts.values().any(|h| h.failed > 0) {
            2
        } else {
            0
        }
    }
}

/// Format a duration as a human-readable string
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}.{:03}s", secs, millis)
    } else {
        format!("{}ms", millis)
    }
}
