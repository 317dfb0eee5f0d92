//! Scheduling decision command

use anyhow::{bail, Context, Result};

use crate::client::{ApiClient, ScheduleDecision, ScheduleRequest};
use crate::output::{
    color_decision, color_savings, format_intensity, format_timestamp, print_success,
    OutputFormat,
};

/// Request a scheduling decision
#[allow(clippy::too_many_arguments)]
pub async fn schedule_workload(
    client: &ApiClient,
    candidates: Vec<String>,
    duration_minutes: u32,
    deadline: &str,
    current_region: String,
    portable: bool,
    format: OutputFormat,
) -> Result<()> {
    let deadline = parse_deadline(deadline, chrono::Utc::now().timestamp())?;
    let request = ScheduleRequest {
        candidates,
        duration_minutes,
        deadline,
        current_region,
        portable,
    };
    let decision: ScheduleDecision = client.post("api/v1/schedule", &request).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&decision)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            print_success(&format!(
                "Decision: {} in {}",
                color_decision(&decision.decision),
                decision.chosen_region
            ));
            println!("Start:    {}", format_timestamp(decision.chosen_start_time));
            println!(
                "Expected: {}",
                format_intensity(decision.expected_intensity)
            );
            println!(
                "Savings:  {}",
                color_savings(decision.expected_savings_percent)
            );
            println!("Reason:   {}", decision.reason);
        }
    }

    Ok(())
}

/// Parse a deadline given either as RFC3339 or as a relative offset
/// like `+3h`, `+90m`, or `+2d`.
pub fn parse_deadline(input: &str, now: i64) -> Result<i64> {
    if let Some(offset) = input.strip_prefix('+') {
        let (digits, unit) = offset.split_at(offset.len().saturating_sub(1));
        let amount: i64 = digits
            .parse()
            .with_context(|| format!("Invalid deadline offset: {input}"))?;
        let seconds = match unit {
            "m" => amount * 60,
            "h" => amount * 3600,
            "d" => amount * 86400,
            _ => bail!("Deadline offset must end in m, h, or d: {input}"),
        };
        if seconds <= 0 {
            bail!("Deadline offset must be in the future: {input}");
        }
        return Ok(now + seconds);
    }

    let dt = chrono::DateTime::parse_from_rfc3339(input)
        .with_context(|| format!("Deadline must be RFC3339 or a +offset: {input}"))?;
    Ok(dt.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_parse_relative_deadlines() {
        assert_eq!(parse_deadline("+90m", NOW).unwrap(), NOW + 90 * 60);
        assert_eq!(parse_deadline("+3h", NOW).unwrap(), NOW + 3 * 3600);
        assert_eq!(parse_deadline("+2d", NOW).unwrap(), NOW + 2 * 86400);
    }

    #[test]
    fn test_parse_rfc3339_deadline() {
        let deadline = parse_deadline("2023-11-14T22:13:20+00:00", NOW).unwrap();
        assert_eq!(deadline, NOW);
    }

    #[test]
    fn test_reject_malformed_deadlines() {
        assert!(parse_deadline("+3x", NOW).is_err());
        assert!(parse_deadline("+h", NOW).is_err());
        assert!(parse_deadline("-3h", NOW).is_err());
        assert!(parse_deadline("tomorrow", NOW).is_err());
        assert!(parse_deadline("+0h", NOW).is_err());
    }
}
