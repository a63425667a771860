use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Range of scalar values, such as the scalar range of a volume.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct ValueRange {
    /// Lower bound
    pub low: f32,
    /// Upper bound
    pub high: f32,
}

impl ValueRange {
    /// Constructs new, empty range.
    pub fn empty() -> ValueRange {
        ValueRange {
            low: f32::NAN,
            high: f32::NAN,
        }
    }

    /// Constructs minimal range containing all samples.
    /// NaN samples are skipped.
    pub fn from_samples(samples: impl IntoIterator<Item = f32>) -> ValueRange {
        let mut range = ValueRange::empty();
        for val in samples {
            range.extend(val);
        }
        range
    }

    /// Extend the range with new value.
    pub fn extend(&mut self, val: f32) {
        if val.is_nan() {
            return;
        }

        if self.is_empty() {
            self.low = val;
            self.high = val;
            return;
        }

        self.high = f32::max(self.high, val);
        self.low = f32::min(self.low, val);
    }

    /// No value was added yet
    pub fn is_empty(&self) -> bool {
        self.low.is_nan() || self.high.is_nan()
    }

    /// Distance between bounds, zero for empty range
    pub fn span(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.high - self.low
        }
    }

    /// Check if value is inside the range.
    pub fn contains(&self, val: f32) -> bool {
        self.low <= val && val <= self.high
    }
}

impl Default for ValueRange {
    fn default() -> Self {
        Self::empty()
    }
}

/// Conversion from standard library type.
/// Unlocks simple syntax:
/// ```
/// # use volren_lib::common::ValueRange;
/// let range: ValueRange = (0.0..45.5).into();
/// ```
impl From<Range<f32>> for ValueRange {
    fn from(range: Range<f32>) -> Self {
        ValueRange {
            low: range.start,
            high: range.end,
        }
    }
}
