//! Temporal Heatmap
//!
//! (integration x hour-of-day) grid. Cells accumulate count and total risk;
//! exposed score per cell is mean risk, intensity is score relative to the
//! grid maximum. The reconstruction model can optionally boost cells whose
//! hour-column count pattern reconstructs poorly.

use serde::{Deserialize, Serialize};

use crate::logic::anomaly::autoencoder::{Autoencoder, TrainConfig};
use crate::logic::schema::types::{CanonicalActivity, Integration, INTEGRATION_COUNT};

pub const HOURS: usize = 24;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub count: u64,
    pub total_risk: f64,
    /// total_risk / count; 0 when the cell is empty
    pub score: f64,
    /// score / max score across the grid, in [0, 1]
    pub intensity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalHeatmap {
    /// Rows indexed by `Integration::index()`, columns by hour 0-23
    pub cells: Vec<Vec<HeatmapCell>>,
    pub max_score: f64,
    /// True when the reconstruction boost was applied
    pub boosted: bool,
}

impl TemporalHeatmap {
    /// Accumulate the grid and derive per-cell score/intensity.
    /// Empty input yields an all-zero grid.
    pub fn build(activities: &[CanonicalActivity]) -> Self {
        let mut cells = vec![vec![HeatmapCell::default(); HOURS]; INTEGRATION_COUNT];

        for activity in activities {
            let row = activity.integration.index();
            let col = usize::from(activity.hour.min(23));
            let cell = &mut cells[row][col];
            cell.count += 1;
            cell.total_risk += activity.risk_score;
        }

        let mut max_score = 0.0f64;
        for row in &mut cells {
            for cell in row.iter_mut() {
                cell.score = if cell.count > 0 {
                    cell.total_risk / cell.count as f64
                } else {
                    0.0
                };
                max_score = max_score.max(cell.score);
            }
        }
        for row in &mut cells {
            for cell in row.iter_mut() {
                cell.intensity = if max_score > 0.0 {
                    cell.score / max_score
                } else {
                    0.0
                };
            }
        }

        Self {
            cells,
            max_score,
            boosted: false,
        }
    }

    pub fn cell(&self, integration: Integration, hour: u8) -> &HeatmapCell {
        &self.cells[integration.index()][usize::from(hour.min(23))]
    }

    /// Boost the intensity of cells in hour columns whose count pattern
    /// reconstructs poorly (anomalous time/integration combinations).
    /// Intensity stays capped at 1.0. No-op when the grid is empty or the
    /// model cannot train.
    pub fn apply_reconstruction_boost(&mut self, config: &TrainConfig) {
        let max_count = self
            .cells
            .iter()
            .flatten()
            .map(|c| c.count)
            .max()
            .unwrap_or(0);
        if max_count == 0 {
            return;
        }

        // One sample per hour column: the normalized per-integration counts
        let samples: Vec<Vec<f64>> = (0..HOURS)
            .map(|hour| {
                (0..INTEGRATION_COUNT)
                    .map(|row| self.cells[row][hour].count as f64 / max_count as f64)
                    .collect()
            })
            .collect();

        let model = match Autoencoder::train(&samples, config) {
            Ok(model) => model,
            Err(e) => {
                log::debug!("heatmap boost skipped: {}", e);
                return;
            }
        };

        for (hour, sample) in samples.iter().enumerate() {
            if model.reconstruction_error(sample) > model.threshold() {
                for row in 0..INTEGRATION_COUNT {
                    let cell = &mut self.cells[row][hour];
                    if cell.count > 0 {
                        cell.intensity = (cell.intensity * 1.5).min(1.0);
                    }
                }
            }
        }
        self.boosted = true;
    }
}
