//! Output formatting for multiple formats
//!
//! Renders the configuration banner and the end-of-run summary as JSON, YAML
//! or human-readable text.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::SimulationConfig;
use crate::simulation::SimulationReport;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Formatter for simulation banners and reports
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the configuration printed before a run starts
    pub fn format_config(&self, config: &SimulationConfig) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(config).context("Failed to serialize config to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(config).context("Failed to serialize config to YAML")
            }
            OutputFormat::Human => Ok(format!("{}\n{}\n{}", "Simulation", RULE, config)),
        }
    }

    /// Formats the summary of a finished run
    pub fn format_report(&self, report: &SimulationReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report)
                .context("Failed to serialize report to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(report).context("Failed to serialize report to YAML")
            }
            OutputFormat::Human => Ok(self.format_report_human(report)),
        }
    }

    /// Formats the result of a stand-alone sweep
    pub fn format_sweep(&self, dir: &Path, removed: usize) -> Result<String> {
        let output = serde_json::json!({
            "directory": dir,
            "removed": removed,
        });
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&output)
                .context("Failed to serialize sweep result to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&output).context("Failed to serialize sweep result to YAML")
            }
            OutputFormat::Human => Ok(format!(
                "Removed {} file(s) from {}",
                removed,
                dir.display()
            )),
        }
    }

    fn format_report_human(&self, report: &SimulationReport) -> String {
        let ops = &report.operations;
        let mut output = String::new();

        output.push_str(&format!("Simulation started at: {}\n", report.started_at));
        output.push_str(&format!("Simulation ended at: {}\n", report.ended_at));
        output.push_str(&format!(
            "Simulation ran for {} seconds ({}).\n",
            report.elapsed_secs(),
            report.stop_reason
        ));

        output.push_str("\nOperations:\n");
        output.push_str(&format!(
            "  Created: {} ({} failed)\n",
            ops.created, ops.create_failures
        ));
        output.push_str(&format!("  Deleted: {}\n", ops.deleted));
        output.push_str(&format!("  Metadata changed: {}\n", ops.metadata_changed));
        output.push_str(&format!(
            "  Reads: {} ({} bytes, {} failed)\n",
            ops.reads, ops.bytes_read, ops.read_failures
        ));
        output.push_str(&format!(
            "  Writes: {} ({} failed)\n",
            ops.writes, ops.write_failures
        ));
        output.push_str(&format!("  Bytes written: {}\n", ops.bytes_written));
        output.push_str(&format!("  Retired: {}\n", ops.retired));
        output.push_str(&format!("  Idle cycles: {}\n", ops.idle_cycles));

        output.push_str("\nTeardown:\n");
        output.push_str(&format!(
            "  Tracked files: {} ({} removed)\n",
            report.teardown.drained, report.teardown.removed_tracked
        ));
        output.push_str(&format!("  Swept: {}\n", report.teardown.swept));

        if report.failed_actors > 0 {
            output.push_str(&format!(
                "\n\u{26a0} {} actor(s) terminated early\n",
                report.failed_actors
            ));
        }

        output
    }
}
