//! Trend plus day-of-year seasonality, fitted on a daily series.

use crate::forecast::TrendMode;
use chrono::{Datelike, NaiveDate};

const SEASON_SLOTS: usize = 365;
/// Half-width, in days, of the circular smoothing applied to the seasonal profile.
const SMOOTHING_HALF_WIDTH: usize = 7;

/// `level + slope * t`, `t` being days since the first observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Trend {
    pub level: f64,
    pub slope: f64,
}

impl Trend {
    pub fn fit(mode: TrendMode, t: &[f64], values: &[f64]) -> Trend {
        let n = values.len() as f64;
        let mean_v = values.iter().sum::<f64>() / n;
        match mode {
            TrendMode::Flat => Trend {
                level: mean_v,
                slope: 0.0,
            },
            TrendMode::Linear => {
                let mean_t = t.iter().sum::<f64>() / n;
                let (mut covariance, mut variance) = (0.0, 0.0);
                for (ti, vi) in t.iter().zip(values) {
                    covariance += (ti - mean_t) * (vi - mean_v);
                    variance += (ti - mean_t) * (ti - mean_t);
                }
                let slope = if variance > 0.0 {
                    covariance / variance
                } else {
                    0.0
                };
                Trend {
                    level: mean_v - slope * mean_t,
                    slope,
                }
            }
        }
    }

    pub fn at(&self, t: f64) -> f64 {
        self.level + self.slope * t
    }
}

/// Mean deviation from the trend for every day of the year.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SeasonalProfile {
    offsets: Vec<f64>,
}

impl SeasonalProfile {
    pub fn fit(dates: &[NaiveDate], residuals: &[f64]) -> SeasonalProfile {
        let mut sums = vec![0.0; SEASON_SLOTS];
        let mut counts = vec![0usize; SEASON_SLOTS];
        for (date, r) in dates.iter().zip(residuals) {
            let slot = slot(*date);
            sums[slot] += r;
            counts[slot] += 1;
        }

        let means: Vec<Option<f64>> = sums
            .iter()
            .zip(&counts)
            .map(|(s, c)| (*c > 0).then(|| s / *c as f64))
            .collect();
        let filled = fill_gaps(&means);
        let mut offsets = circular_smooth(&filled, SMOOTHING_HALF_WIDTH);

        // The trend carries the level; the profile only shapes the year.
        let centre = offsets.iter().sum::<f64>() / SEASON_SLOTS as f64;
        offsets.iter_mut().for_each(|o| *o -= centre);
        SeasonalProfile { offsets }
    }

    pub fn at(&self, date: NaiveDate) -> f64 {
        self.offsets[slot(date)]
    }
}

/// Day-of-year slot; 31 December of a leap year shares the slot of 30 December.
fn slot(date: NaiveDate) -> usize {
    (date.ordinal0() as usize).min(SEASON_SLOTS - 1)
}

/// Replaces every empty slot with the value of the nearest populated one, wrapping around the year.
fn fill_gaps(means: &[Option<f64>]) -> Vec<f64> {
    let len = means.len();
    (0..len)
        .map(|i| {
            (0..=len / 2)
                .find_map(|d| means[(i + d) % len].or(means[(i + len - d) % len]))
                .unwrap_or(0.0)
        })
        .collect()
}

fn circular_smooth(values: &[f64], half_width: usize) -> Vec<f64> {
    let len = values.len();
    let width = 2 * half_width + 1;
    (0..len)
        .map(|i| {
            (0..width)
                .map(|k| values[(i + len + k - half_width) % len])
                .sum::<f64>()
                / width as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_trend_recovers_line() {
        let t: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let v: Vec<f64> = t.iter().map(|t| 3.0 + 0.5 * t).collect();
        let trend = Trend::fit(TrendMode::Linear, &t, &v);
        assert!((trend.slope - 0.5).abs() < 1e-9);
        assert!((trend.level - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_trend_is_mean() {
        let t = [0.0, 1.0, 2.0];
        let trend = Trend::fit(TrendMode::Flat, &t, &[1.0, 2.0, 6.0]);
        assert_eq!(trend, Trend { level: 3.0, slope: 0.0 });
    }

    #[test]
    fn test_fill_gaps_wraps_around() {
        let mut means = vec![None; 10];
        means[1] = Some(1.0);
        means[8] = Some(8.0);
        let filled = fill_gaps(&means);
        assert_eq!(filled[0], 1.0);
        assert_eq!(filled[9], 8.0);
        assert_eq!(filled[4], 1.0);
        assert_eq!(filled[6], 8.0);
    }

    #[test]
    fn test_smoothing_keeps_constant() {
        let smoothed = circular_smooth(&[2.0; 20], 3);
        assert!(smoothed.iter().all(|v| (*v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_leap_day_slots() {
        let dec31 = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let dec30 = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        assert_eq!(slot(dec31), slot(dec30));
        assert_eq!(slot(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()), 364);
    }
}
