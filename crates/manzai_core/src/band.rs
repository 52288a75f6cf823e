//! Character-count band policy.
//!
//! The acceptable band around a requested length is a product decision, so
//! the formula is a configurable [`TolerancePolicy`] rather than a constant.
//! All arithmetic is integral to keep band edges stable across platforms.

use serde::{Deserialize, Serialize};

/// How the `[min, max]` band is derived from a target length.
///
/// # Examples
///
/// ```
/// use manzai_core::TolerancePolicy;
///
/// let policy = TolerancePolicy::Symmetric { percent: 10 };
/// assert_eq!(policy.bounds(350), (315, 385));
///
/// let policy = TolerancePolicy::FloorWithCeiling { ceiling_percent: 150 };
/// assert_eq!(policy.bounds(400), (400, 600));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TolerancePolicy {
    /// `target ± percent`
    Symmetric {
        /// Tolerance on both sides, in percent
        percent: u32,
    },
    /// `target - below_percent` .. `target + above_percent`
    Asymmetric {
        /// Allowed shortfall, in percent
        below_percent: u32,
        /// Allowed overshoot, in percent
        above_percent: u32,
    },
    /// Target is the floor; ceiling is `target * ceiling_percent / 100`
    FloorWithCeiling {
        /// Ceiling as a percentage of the target
        ceiling_percent: u32,
    },
}

impl Default for TolerancePolicy {
    fn default() -> Self {
        TolerancePolicy::Symmetric { percent: 10 }
    }
}

impl TolerancePolicy {
    /// Raw `(min, max)` for a target, before any floor is applied.
    pub fn bounds(&self, target: u32) -> (u32, u32) {
        let t = u64::from(target);
        let (min, max) = match *self {
            TolerancePolicy::Symmetric { percent } => {
                let p = u64::from(percent.min(100));
                (t * (100 - p) / 100, (t * (100 + p)).div_ceil(100))
            }
            TolerancePolicy::Asymmetric {
                below_percent,
                above_percent,
            } => {
                let below = u64::from(below_percent.min(100));
                let above = u64::from(above_percent);
                (t * (100 - below) / 100, (t * (100 + above)).div_ceil(100))
            }
            TolerancePolicy::FloorWithCeiling { ceiling_percent } => {
                let ceiling = u64::from(ceiling_percent.max(100));
                (t, (t * ceiling).div_ceil(100))
            }
        };
        (saturate(min), saturate(max))
    }
}

fn saturate(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// The inclusive character-count range a finished body must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LengthBand {
    /// Requested length after clamping
    pub target: u32,
    /// Lower bound (inclusive)
    pub min: u32,
    /// Upper bound (inclusive)
    pub max: u32,
}

impl LengthBand {
    /// Whether `len` lies inside the band.
    pub fn contains(&self, len: usize) -> bool {
        len >= self.min as usize && len <= self.max as usize
    }
}

/// Length settings: defaults, clamps, and the tolerance policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LengthSettings {
    /// Target used when the request carries none
    pub default_target: u32,
    /// Upper clamp for requested targets
    pub max_target: u32,
    /// The band minimum never drops below this
    pub min_floor: u32,
    /// Band formula
    pub policy: TolerancePolicy,
}

impl Default for LengthSettings {
    fn default() -> Self {
        Self {
            default_target: 350,
            max_target: 2000,
            min_floor: 100,
            policy: TolerancePolicy::default(),
        }
    }
}

impl LengthSettings {
    /// Resolve a requested length: missing or zero falls back to the
    /// default, anything larger than the clamp is clamped.
    ///
    /// # Examples
    ///
    /// ```
    /// use manzai_core::LengthSettings;
    ///
    /// let settings = LengthSettings::default();
    /// assert_eq!(settings.clamp_target(None), 350);
    /// assert_eq!(settings.clamp_target(Some(0)), 350);
    /// assert_eq!(settings.clamp_target(Some(9999)), 2000);
    /// ```
    pub fn clamp_target(&self, requested: Option<u64>) -> u32 {
        match requested {
            Some(0) | None => self.default_target.min(self.max_target),
            Some(value) => saturate(value).min(self.max_target),
        }
    }

    /// Band for a (clamped) target.
    ///
    /// # Examples
    ///
    /// ```
    /// use manzai_core::LengthSettings;
    ///
    /// let band = LengthSettings::default().band_for(350);
    /// assert_eq!((band.min, band.max), (315, 385));
    ///
    /// // The floor applies to short targets.
    /// let band = LengthSettings::default().band_for(50);
    /// assert_eq!((band.min, band.max), (100, 100));
    /// ```
    pub fn band_for(&self, target: u32) -> LengthBand {
        let (min, max) = self.policy.bounds(target);
        let min = min.max(self.min_floor);
        LengthBand {
            target,
            min,
            max: max.max(min),
        }
    }
}
