//! Interval generation: split `[from, to)` into equal windows.
//!
//! The boundaries start one window before `from`, so window `i` spans
//! `[boundary[i-1], boundary[i])` and a snapshot recorded exactly at `from`
//! lands in window 2 instead of falling on an excluded edge.

use vpower_types::Timestamp;

use crate::PowerError;

/// The `datapoints + 1` boundaries of a windowed range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Intervals {
    boundaries: Vec<Timestamp>,
    width_nanos: i128,
}

impl Intervals {
    /// Generate boundaries for `datapoints` windows of width `(to - from) / datapoints`.
    ///
    /// `boundary[0] = from - width` and `boundary[i] = from + (i - 1) * width`.
    /// Offsets are computed from `from` for every boundary, so rounding never
    /// accumulates beyond one nanosecond.
    pub fn generate(from: Timestamp, to: Timestamp, datapoints: usize) -> Result<Self, PowerError> {
        if datapoints == 0 {
            return Err(PowerError::InvalidRange(
                "datapoints must be at least 1".into(),
            ));
        }
        if to <= from {
            return Err(PowerError::InvalidRange(format!(
                "`to` ({to}) must be after `from` ({from})"
            )));
        }

        let origin = from.unix_nanos();
        let span = to.unix_nanos() - origin;
        let points = datapoints as i128;
        let width_nanos = span / points;
        if width_nanos == 0 {
            return Err(PowerError::InvalidRange(format!(
                "{datapoints} windows over {span}ns are narrower than one nanosecond"
            )));
        }

        let boundaries = (0..=points)
            .map(|i| {
                let offset = ((i - 1) * span).div_euclid(points);
                Timestamp::from_unix_nanos(origin + offset).ok_or_else(|| {
                    PowerError::InvalidRange("window boundary out of representable range".into())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            boundaries,
            width_nanos,
        })
    }

    pub fn boundaries(&self) -> &[Timestamp] {
        &self.boundaries
    }

    /// Number of windows (`datapoints`).
    pub fn len(&self) -> usize {
        self.boundaries.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nominal window width in nanoseconds (floor of the exact width).
    pub fn width_nanos(&self) -> i128 {
        self.width_nanos
    }

    /// The half-open windows `[boundary[i-1], boundary[i])` in order.
    pub fn windows(&self) -> impl Iterator<Item = (Timestamp, Timestamp)> + '_ {
        self.boundaries.windows(2).map(|pair| (pair[0], pair[1]))
    }
}
