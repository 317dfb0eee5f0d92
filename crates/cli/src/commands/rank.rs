//! Region ranking command

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, RankRequest, RegionScore};
use crate::output::{format_intensity, print_warning, OutputFormat};

/// Row for the region ranking table
#[derive(Tabled)]
struct RankRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Rank Value")]
    rank_value: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Forecast")]
    forecast: String,
    #[tabled(rename = "Efficiency")]
    efficiency: String,
}

/// Rank regions by expected carbon cost
pub async fn rank_regions(
    client: &ApiClient,
    regions: Vec<String>,
    schedule_weight: f64,
    format: OutputFormat,
) -> Result<()> {
    let request = RankRequest {
        regions,
        schedule_weight,
    };
    let scores: Vec<RegionScore> = client.post("api/v1/rank", &request).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&scores)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if scores.is_empty() {
                print_warning("No regions ranked");
                return Ok(());
            }

            let rows: Vec<RankRow> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| RankRow {
                    position: i + 1,
                    region: s.region.clone(),
                    rank_value: format!("{:.2}", s.rank_value),
                    current: format_intensity(s.components.cfp),
                    forecast: format_intensity(s.components.forecasted_cfp),
                    efficiency: format!("{:.2}", s.components.efficiency_ratio),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTop pick: {}", scores[0].region);
        }
    }

    Ok(())
}
