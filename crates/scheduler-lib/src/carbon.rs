//! Energy-to-CO2 conversion
//!
//! Pure helpers shared by the ranker, optimizer, and regression detector
//! wherever an (energy, intensity) pair needs collapsing to a single
//! comparable mass.

use serde::{Deserialize, Serialize};

/// Joules per kilowatt-hour.
pub const JOULES_PER_KWH: f64 = 3_600_000.0;

/// World-average grid intensity used for display conversions, gCO2/kWh.
pub const GLOBAL_AVERAGE_INTENSITY: f64 = 436.0;

/// CO2 per full smartphone charge (EPA equivalency), grams.
const GRAMS_PER_PHONE_CHARGE: f64 = 8.22;

/// CO2 per passenger-vehicle mile (EPA equivalency), grams.
const GRAMS_PER_MILE_DRIVEN: f64 = 404.0;

/// CO2 per hour of video streaming (IEA estimate), grams.
const GRAMS_PER_STREAMING_HOUR: f64 = 36.0;

/// Convert energy in joules at a given intensity to grams of CO2.
pub fn to_co2_grams(energy_j: f64, intensity_g_per_kwh: f64) -> f64 {
    (energy_j / JOULES_PER_KWH) * intensity_g_per_kwh
}

/// Everyday-scale equivalents of a CO2 mass. Purely presentational;
/// never feeds back into a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equivalents {
    pub phone_charges: f64,
    pub miles_driven: f64,
    pub streaming_hours: f64,
}

/// Express grams of CO2 as published everyday equivalents.
pub fn to_equivalents(grams: f64) -> Equivalents {
    Equivalents {
        phone_charges: grams / GRAMS_PER_PHONE_CHARGE,
        miles_driven: grams / GRAMS_PER_MILE_DRIVEN,
        streaming_hours: grams / GRAMS_PER_STREAMING_HOUR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_average_scenario() {
        // 12,500 J at the 436 gCO2/kWh world average.
        let grams = to_co2_grams(12_500.0, GLOBAL_AVERAGE_INTENSITY);
        assert!((grams - 1.512).abs() < 0.005, "got {grams}");
    }

    #[test]
    fn test_round_trip_recovers_energy() {
        let energy_j = 987_654.3;
        let intensity = 312.5;
        let grams = to_co2_grams(energy_j, intensity);
        let recovered = grams / intensity * JOULES_PER_KWH;
        assert!((recovered - energy_j).abs() < 1e-6);
    }

    #[test]
    fn test_zero_energy_is_zero_mass() {
        assert_eq!(to_co2_grams(0.0, 500.0), 0.0);
    }

    #[test]
    fn test_equivalents_scale_linearly() {
        let eq = to_equivalents(82.2);
        assert!((eq.phone_charges - 10.0).abs() < 1e-9);

        let eq = to_equivalents(404.0);
        assert!((eq.miles_driven - 1.0).abs() < 1e-9);

        let eq = to_equivalents(72.0);
        assert!((eq.streaming_hours - 2.0).abs() < 1e-9);
    }
}
