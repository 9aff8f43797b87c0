use crate::core::{AnchorId, Registry, RssiSample, Timestamp, MAD_TO_SIGMA};
use crate::utils::stats::{mean, median, median_of_sorted};
use crate::validation::error::{PositioningError, PositioningResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, trace};

/// Which samples of an anchor take part in a cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPolicy {
    /// Newest `n` samples per anchor
    LastSamples(usize),
    /// Samples no older than this many milliseconds before the cycle time
    LastMillis(u64),
}

/// Central estimate reported for a filtered window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralEstimate {
    Median,
    TrimmedMean,
}

/// RSSI conditioning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionerConfig {
    pub window: WindowPolicy,
    /// Outlier cut in robust standard deviations
    pub mad_threshold: f64,
    /// Fraction trimmed from each end after outlier rejection
    pub trim_fraction: f64,
    /// Samples required per anchor, before and after filtering
    pub min_samples: usize,
    pub estimate: CentralEstimate,
    /// Physical RSSI range; anything outside is an invalid sample
    pub rssi_floor_dbm: f64,
    pub rssi_ceiling_dbm: f64,
    /// Layer the per-anchor scalar Kalman smoother on top
    pub smoothing: bool,
    pub smoother_process_noise: f64,
    pub smoother_measurement_noise: f64,
    /// Silence after which an anchor's smoother restarts
    pub smoother_timeout_ms: u64,
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        Self {
            window: WindowPolicy::LastMillis(3_000),
            mad_threshold: 3.5,
            trim_fraction: 0.1,
            min_samples: 4,
            estimate: CentralEstimate::Median,
            rssi_floor_dbm: -120.0,
            rssi_ceiling_dbm: 0.0,
            smoothing: false,
            smoother_process_noise: 0.5,
            smoother_measurement_noise: 4.0,
            smoother_timeout_ms: 5_000,
        }
    }
}

/// Why an anchor produced no conditioned value this cycle
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error("insufficient data: {available} samples, {required} required")]
    InsufficientData { available: usize, required: usize },
}

/// Conditioned RSSI for one anchor window
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionedRssi {
    pub value: f64,
    /// Median of the raw window
    pub raw_median: f64,
    /// Raw MAD of the window
    pub mad: f64,
    /// Samples surviving outlier rejection and trimming
    pub kept: usize,
    pub rejected: usize,
}

/// Samples grouped by anchor for one cycle
#[derive(Debug, Clone, Default)]
pub struct SampleWindows {
    /// Cycle timestamp: the newest valid sample
    pub now: Timestamp,
    /// Windowed RSSI values per registered anchor, oldest first
    pub per_anchor: BTreeMap<AnchorId, Vec<f64>>,
    pub dropped_invalid: usize,
    pub dropped_unknown: usize,
}

/// Per-anchor robust denoising of raw RSSI windows
#[derive(Debug, Clone, Default)]
pub struct RssiConditioner {
    pub config: ConditionerConfig,
}

impl RssiConditioner {
    pub fn new(config: ConditionerConfig) -> Self {
        Self { config }
    }

    /// Reject non-finite or physically impossible RSSI
    pub fn validate_sample(&self, sample: &RssiSample) -> PositioningResult<()> {
        let rssi = sample.rssi;
        if !rssi.is_finite() || rssi < self.config.rssi_floor_dbm || rssi > self.config.rssi_ceiling_dbm {
            return Err(PositioningError::InvalidSample {
                anchor_id: sample.anchor_id.clone(),
                rssi,
            });
        }
        Ok(())
    }

    /// Validate samples, drop unknown anchors and apply the window policy
    pub fn collect_windows(&self, samples: &[RssiSample], registry: &Registry) -> SampleWindows {
        let mut windows = SampleWindows::default();
        let mut grouped: BTreeMap<AnchorId, Vec<(Timestamp, f64)>> = BTreeMap::new();

        for sample in samples {
            if let Err(err) = self.validate_sample(sample) {
                trace!(%err, "dropping sample");
                windows.dropped_invalid += 1;
                continue;
            }
            if !registry.contains(&sample.anchor_id) {
                windows.dropped_unknown += 1;
                continue;
            }
            windows.now = windows.now.max(sample.t);
            grouped.entry(sample.anchor_id.clone()).or_default().push((sample.t, sample.rssi));
        }

        let now = windows.now;
        for (anchor_id, mut entries) in grouped {
            entries.sort_by_key(|(t, _)| *t);
            let values: Vec<f64> = match self.config.window {
                WindowPolicy::LastSamples(n) => {
                    let start = entries.len().saturating_sub(n);
                    entries[start..].iter().map(|(_, rssi)| *rssi).collect()
                }
                WindowPolicy::LastMillis(span) => {
                    let oldest = now.saturating_sub(span);
                    entries.iter().filter(|(t, _)| *t >= oldest).map(|(_, rssi)| *rssi).collect()
                }
            };
            if !values.is_empty() {
                windows.per_anchor.insert(anchor_id, values);
            }
        }

        if windows.dropped_invalid > 0 || windows.dropped_unknown > 0 {
            debug!(
                invalid = windows.dropped_invalid,
                unknown = windows.dropped_unknown,
                "samples dropped before conditioning"
            );
        }
        windows
    }

    /// MAD outlier rejection, symmetric trim, central estimate
    pub fn condition(&self, window: &[f64]) -> Result<ConditionedRssi, ConditionError> {
        let required = self.config.min_samples.max(1);
        if window.len() < required {
            return Err(ConditionError::InsufficientData { available: window.len(), required });
        }

        let mut sorted = window.to_vec();
        sorted.sort_by(f64::total_cmp);
        let raw_median = median_of_sorted(&sorted);
        let deviations: Vec<f64> = sorted.iter().map(|v| (v - raw_median).abs()).collect();
        let mad = median(&deviations).unwrap_or(0.0);

        let mut kept: Vec<f64> = if mad > 0.0 {
            let threshold = self.config.mad_threshold * MAD_TO_SIGMA * mad;
            sorted.iter().copied().filter(|v| (v - raw_median).abs() <= threshold).collect()
        } else {
            sorted.clone()
        };
        let rejected = window.len() - kept.len();

        if kept.len() < required {
            return Err(ConditionError::InsufficientData { available: kept.len(), required });
        }

        let cut = (kept.len() as f64 * self.config.trim_fraction).floor() as usize;
        if cut > 0 && kept.len() - 2 * cut >= required {
            kept = kept[cut..kept.len() - cut].to_vec();
        }

        let value = match self.config.estimate {
            CentralEstimate::Median => median_of_sorted(&kept),
            CentralEstimate::TrimmedMean => mean(&kept).unwrap_or(raw_median),
        };

        Ok(ConditionedRssi {
            value,
            raw_median,
            mad,
            kept: kept.len(),
            rejected,
        })
    }
}

/// 1-D Kalman filter over a scalar signal with fixed noise
#[derive(Debug, Clone)]
pub struct ScalarKalman {
    estimate: f64,
    variance: f64,
    process_noise: f64,
    measurement_noise: f64,
}

impl ScalarKalman {
    pub fn new(initial: f64, process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            estimate: initial,
            variance: measurement_noise,
            process_noise,
            measurement_noise,
        }
    }

    pub fn update(&mut self, measurement: f64) -> f64 {
        // Random-walk predict, then correct
        self.variance += self.process_noise;
        let gain = self.variance / (self.variance + self.measurement_noise);
        self.estimate += gain * (measurement - self.estimate);
        self.variance *= 1.0 - gain;
        self.estimate
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }
}

#[derive(Debug, Clone)]
struct SmootherEntry {
    filter: ScalarKalman,
    last_seen: Timestamp,
}

/// Per-anchor scalar smoothers for one device
#[derive(Debug, Clone, Default)]
pub struct RssiSmoother {
    entries: HashMap<AnchorId, SmootherEntry>,
}

impl RssiSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Smooth a conditioned value, restarting the anchor's filter after a
    /// silence longer than `smoother_timeout_ms`
    pub fn smooth(&mut self, anchor_id: &AnchorId, value: f64, now: Timestamp, config: &ConditionerConfig) -> f64 {
        let timeout = config.smoother_timeout_ms;
        let fresh = || SmootherEntry {
            filter: ScalarKalman::new(value, config.smoother_process_noise, config.smoother_measurement_noise),
            last_seen: now,
        };

        match self.entries.get_mut(anchor_id) {
            Some(entry) if now.saturating_sub(entry.last_seen) <= timeout => {
                entry.last_seen = now;
                entry.filter.update(value)
            }
            _ => {
                self.entries.insert(anchor_id.clone(), fresh());
                value
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
