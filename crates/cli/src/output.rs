//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format an intensity value for display
pub fn format_intensity(g_per_kwh: f64) -> String {
    format!("{:.1} gCO2/kWh", g_per_kwh)
}

/// Format an energy value as joules or kilojoules
pub fn format_energy(joules: f64) -> String {
    if joules >= 1000.0 {
        format!("{:.2} kJ", joules / 1000.0)
    } else {
        format!("{:.0} J", joules)
    }
}

/// Format a unix timestamp for display
pub fn format_timestamp(ts: i64) -> String {
    match chrono::DateTime::from_timestamp(ts, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => ts.to_string(),
    }
}

/// Color a decision kind based on how disruptive it is
pub fn color_decision(decision: &str) -> String {
    match decision {
        "run_now" => decision.green().to_string(),
        "defer" => decision.yellow().to_string(),
        "relocate" => decision.blue().to_string(),
        _ => decision.to_string(),
    }
}

/// Color a regression severity
pub fn color_severity(severity: &str) -> String {
    match severity {
        "none" => severity.green().to_string(),
        "minor" => severity.yellow().to_string(),
        "major" => severity.red().to_string(),
        "critical" => severity.red().bold().to_string(),
        _ => severity.to_string(),
    }
}

/// Color a savings percentage (higher is better)
pub fn color_savings(percent: f64) -> String {
    let formatted = format!("{:.1}%", percent);
    if percent >= 30.0 {
        formatted.green().to_string()
    } else if percent > 0.0 {
        formatted.yellow().to_string()
    } else {
        formatted.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_energy_units() {
        assert_eq!(format_energy(500.0), "500 J");
        assert_eq!(format_energy(12_500.0), "12.50 kJ");
    }

    #[test]
    fn test_format_intensity() {
        assert_eq!(format_intensity(436.0), "436.0 gCO2/kWh");
    }

    #[test]
    fn test_format_timestamp_valid() {
        let formatted = format_timestamp(1_700_000_000);
        assert!(formatted.contains("2023"));
    }
}
