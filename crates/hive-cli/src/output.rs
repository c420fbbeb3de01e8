//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use hive_alerts::{AlertEvent, EvaluationResult, ThresholdProfile};
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write one value per line: compact JSON, or the table form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_line<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => value.write_table(writer)?,
        }
        writer.flush()?;
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

impl TableDisplay for EvaluationResult {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Threshold Check")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Status:           {}", self.status())?;
        writeln!(writer, "Hives examined:   {}", self.hives_examined)?;
        writeln!(writer, "Hives failed:     {}", self.failures.len())?;
        writeln!(writer, "Alerts created:   {}", self.alerts_created.len())?;
        writeln!(writer, "Suppressed:       {}", self.suppressed)?;
        let elapsed = self.completed_at - self.started_at;
        writeln!(writer, "Duration:         {} ms", elapsed.num_milliseconds())?;

        if !self.alerts_created.is_empty() {
            writeln!(writer)?;
            writeln!(
                writer,
                "{:<24}  {:<12}  {:<8}  MESSAGE",
                "HIVE", "TYPE", "SEVERITY"
            )?;
            writeln!(writer, "{}", "─".repeat(96))?;
            for alert in &self.alerts_created {
                writeln!(
                    writer,
                    "{:<24}  {:<12}  {:<8}  {}",
                    truncate(alert.hive_id.as_str(), 24),
                    alert.alert_type.to_string(),
                    alert.severity.to_string(),
                    alert.message
                )?;
            }
        }

        if !self.failures.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "Failures")?;
            for failure in &self.failures {
                writeln!(writer, "  {}: {}", failure.hive_id, failure.reason)?;
            }
        }
        Ok(())
    }
}

impl TableDisplay for ThresholdProfile {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let limits = &self.limits;
        writeln!(writer, "Threshold Profile")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Scope:            {}", self.scope)?;
        writeln!(writer, "Updated:          {}", self.updated_at.to_rfc3339())?;
        writeln!(writer)?;
        writeln!(
            writer,
            "Temperature:      {} to {} °C",
            limits.temperature_min, limits.temperature_max
        )?;
        writeln!(
            writer,
            "Humidity:         {} to {} %",
            limits.humidity_min, limits.humidity_max
        )?;
        writeln!(writer, "Weight change:    ±{} kg", limits.weight_change_threshold)?;
        writeln!(writer, "Sound level:      {} dB", limits.sound_level_threshold)?;
        writeln!(writer, "Battery warning:  {} %", limits.battery_warning_level)?;
        writeln!(writer, "Inspection every: {} days", limits.inspection_reminder_days)?;
        Ok(())
    }
}

impl TableDisplay for AlertEvent {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let alert = self.alert();
        writeln!(
            writer,
            "{}  {:<8}  {}  {}",
            alert.created_at.format("%Y-%m-%d %H:%M:%S"),
            self.kind(),
            self,
            alert.message
        )?;
        Ok(())
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
