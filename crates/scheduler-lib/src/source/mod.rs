//! Carbon-intensity source adapters and resolution
//!
//! This module defines the uniform adapter interface every intensity
//! provider implements, the read-only region profile registry, and the
//! resolver that merges adapter outputs into one authoritative signal
//! per region. Transport concerns (HTTP, auth, retries, rate limits)
//! live in the adapter implementations, outside this crate.

mod resolver;

pub use resolver::{IntensityResolver, ResolverConfig};

use crate::models::{ForecastPoint, IntensityReading, RegionProfile};
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

pub use async_trait::async_trait;

/// Uniform interface over one carbon-intensity data provider.
///
/// Each adapter declares its region coverage and a static priority rank
/// per geography; a national-grid adapter is priority 1 for its own
/// country and deprioritized elsewhere. A failed call is a single
/// terminal signal to the resolver; retry policy belongs to the adapter.
#[async_trait]
pub trait IntensitySource: Send + Sync {
    /// Stable identifier reported on readings from this source.
    fn id(&self) -> &str;

    /// Whether this source publishes data for the given region.
    fn covers(&self, region: &str) -> bool;

    /// Priority rank for the region; lower numbers are tried first.
    fn priority(&self, region: &str) -> u8;

    /// Fetch the current intensity for a region.
    async fn current(&self, region: &str) -> Result<IntensityReading>;

    /// Fetch the forecast curve for a region, bounded to `horizon_hours`,
    /// ordered by timestamp.
    async fn forecast(&self, region: &str, horizon_hours: u32) -> Result<Vec<ForecastPoint>>;
}

/// Read-only table of region profiles, loaded once per process lifetime.
#[derive(Debug, Clone, Default)]
pub struct RegionRegistry {
    profiles: HashMap<String, RegionProfile>,
}

impl RegionRegistry {
    pub fn new(profiles: Vec<RegionProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.region.clone(), p))
                .collect(),
        }
    }

    /// Load profiles from a JSON array on disk.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let profiles: Vec<RegionProfile> = serde_json::from_str(&raw)?;
        Ok(Self::new(profiles))
    }

    /// Built-in profile table used when no region file is configured.
    ///
    /// Static fallback intensities are annual grid averages; PUE and
    /// renewable share are representative facility figures.
    pub fn with_defaults() -> Self {
        Self::new(vec![
            RegionProfile {
                region: "us-east".to_string(),
                code: "us-east".to_string(),
                location: "Virginia, US".to_string(),
                pue: 1.2,
                renewable_pct: 0.35,
                static_intensity_fallback: 379.0,
            },
            RegionProfile {
                region: "us-west".to_string(),
                code: "us-west".to_string(),
                location: "Oregon, US".to_string(),
                pue: 1.15,
                renewable_pct: 0.65,
                static_intensity_fallback: 215.0,
            },
            RegionProfile {
                region: "eu-west".to_string(),
                code: "eu-west".to_string(),
                location: "Dublin, IE".to_string(),
                pue: 1.2,
                renewable_pct: 0.45,
                static_intensity_fallback: 296.0,
            },
            RegionProfile {
                region: "eu-north".to_string(),
                code: "eu-north".to_string(),
                location: "Stockholm, SE".to_string(),
                pue: 1.1,
                renewable_pct: 0.92,
                static_intensity_fallback: 45.0,
            },
            RegionProfile {
                region: "ap-south".to_string(),
                code: "ap-south".to_string(),
                location: "Mumbai, IN".to_string(),
                pue: 1.3,
                renewable_pct: 0.22,
                static_intensity_fallback: 632.0,
            },
        ])
    }

    pub fn get(&self, region: &str) -> Option<&RegionProfile> {
        self.profiles.get(region)
    }

    pub fn contains(&self, region: &str) -> bool {
        self.profiles.contains_key(region)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Region codes in lexical order.
    pub fn regions(&self) -> Vec<String> {
        let mut regions: Vec<String> = self.profiles.keys().cloned().collect();
        regions.sort();
        regions
    }
}
