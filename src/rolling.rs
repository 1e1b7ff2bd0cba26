//! Trailing moving averages used to decorate temperature plots.

use std::fmt;

/// The rolling averages offered as plot options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollingWindow {
    /// Seven trailing days.
    Weekly,
    /// Thirty trailing days.
    Monthly,
}

impl RollingWindow {
    pub fn size(&self) -> usize {
        match self {
            RollingWindow::Weekly => 7,
            RollingWindow::Monthly => 30,
        }
    }

    /// Column name used for this average in plot frames.
    pub fn column_name(&self) -> &'static str {
        match self {
            RollingWindow::Weekly => "weekly_avg",
            RollingWindow::Monthly => "monthly_avg",
        }
    }
}

impl fmt::Display for RollingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollingWindow::Weekly => write!(f, "Weekly Rolling Average"),
            RollingWindow::Monthly => write!(f, "Monthly Rolling Average"),
        }
    }
}

/// Mean of the `window` values ending at each index.
///
/// The output has the same length as `values`; the first `window - 1` entries
/// are `None` because not enough history exists yet. A zero window yields only
/// `None`.
///
/// ```
/// use heatpump_counter::trailing_mean;
///
/// let avg = trailing_mean(&[1.0, 2.0, 3.0, 4.0], 2);
/// assert_eq!(avg, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
/// ```
pub fn trailing_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 || window > values.len() {
        return vec![None; values.len()];
    }
    let mut averages = vec![None; window - 1];
    averages.extend(
        values
            .windows(window)
            .map(|w| Some(w.iter().sum::<f64>() / window as f64)),
    );
    averages
}
