//! Energy measurement commands

use anyhow::{Context, Result};
use std::path::Path;
use tabled::Tabled;

use crate::client::{ApiClient, Baseline, MeasurementOutcome};
use crate::output::{
    color_severity, format_energy, format_timestamp, print_success, print_warning, OutputFormat,
};

/// Row for the hotspot table
#[derive(Tabled)]
struct HotspotRow {
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Energy")]
    energy: String,
    #[tabled(rename = "Share")]
    share: String,
}

/// Submit a measurement file for evaluation
pub async fn evaluate_measurement(
    client: &ApiClient,
    file: &Path,
    format: OutputFormat,
) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read measurement file {}", file.display()))?;
    let measurement: serde_json::Value =
        serde_json::from_str(&raw).context("Measurement file is not valid JSON")?;

    let outcome: MeasurementOutcome = client.post("api/v1/measurements", &measurement).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&outcome)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!(
                "Workload:  {} ({} @ {})",
                outcome.workload, outcome.branch, outcome.commit_sha
            );
            println!("Energy:    {}", format_energy(outcome.total_energy_j));
            println!("Baseline:  {}", format_energy(outcome.baseline_energy_j));
            println!(
                "Delta:     {:+.1}%  severity: {}",
                outcome.delta_percent,
                color_severity(&outcome.severity)
            );
            println!(
                "CO2:       {:.3} g (≈ {:.1} phone charges, {:.2} miles driven, {:.1}h streaming)",
                outcome.co2_grams,
                outcome.equivalents.phone_charges,
                outcome.equivalents.miles_driven,
                outcome.equivalents.streaming_hours
            );

            if outcome.hotspots.is_empty() {
                print_success("No phase hotspots");
            } else {
                print_warning(&format!("{} phase hotspot(s)", outcome.hotspots.len()));
                let rows: Vec<HotspotRow> = outcome
                    .hotspots
                    .iter()
                    .map(|h| HotspotRow {
                        phase: h.phase.clone(),
                        energy: format_energy(h.energy_j),
                        share: format!("{:.1}%", h.percent_of_total),
                    })
                    .collect();
                let table = tabled::Table::new(rows)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("{}", table);
            }
        }
    }

    Ok(())
}

/// Show the stored baseline for a (branch, workload) series
pub async fn show_baseline(
    client: &ApiClient,
    branch: &str,
    workload: &str,
    format: OutputFormat,
) -> Result<()> {
    let path = format!("api/v1/baselines/{}/{}", branch, workload);
    let baseline: Baseline = client.get(&path).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&baseline)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("Series:   {}/{}", baseline.branch, baseline.workload);
            println!("Baseline: {}", format_energy(baseline.baseline_energy_j));
            println!(
                "Samples:  {} total, {} in window",
                baseline.sample_count,
                baseline.window.len()
            );
            println!("Updated:  {}", format_timestamp(baseline.last_updated));
        }
    }

    Ok(())
}
