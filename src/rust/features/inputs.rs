use std::fmt;
use std::str::FromStr;

use super::error::FeatureError;

/// The five attributes a user supplies for one prediction.
///
/// Every constructor clamps into the field bounds, so an `AppInputs` value is
/// always inside the ranges listed by [`FormField::bounds`]. Non-finite floats
/// clamp to the lower bound of their field.
#[derive(Debug, Clone, PartialEq)]
pub struct AppInputs {
    pub developer_id: u64,
    pub size_mb: f64,
    pub average_user_rating: f64,
    pub ios_version: f64,
    pub time_gap_days: u32,
}

impl AppInputs {
    pub const MIN_RATING: f64 = 0.0;
    pub const MAX_RATING: f64 = 5.0;
    pub const MIN_IOS_VERSION: f64 = 1.0;
    pub const MAX_IOS_VERSION: f64 = 20.0;

    /// Creates a clamped input tuple.
    ///
    /// # Example
    /// ```
    /// use appcat::AppInputs;
    ///
    /// let inputs = AppInputs::new(500_000_000, 150.0, 7.0, 13.0, 120);
    /// assert_eq!(inputs.average_user_rating, 5.0);
    /// ```
    pub fn new(
        developer_id: u64,
        size_mb: f64,
        average_user_rating: f64,
        ios_version: f64,
        time_gap_days: u32,
    ) -> Self {
        Self {
            developer_id,
            size_mb: clamp_finite(size_mb, 0.0, f64::MAX),
            average_user_rating: clamp_finite(average_user_rating, Self::MIN_RATING, Self::MAX_RATING),
            ios_version: clamp_finite(ios_version, Self::MIN_IOS_VERSION, Self::MAX_IOS_VERSION),
            time_gap_days,
        }
    }

    /// The `Required_IOS_Version` cell in its categorical string form.
    ///
    /// The version is rounded to one decimal (the form's step) and always
    /// carries a fractional digit: `13.0` renders as `"13.0"`, `12.1` as `"12.1"`.
    pub fn ios_version_label(&self) -> String {
        format_version(self.ios_version)
    }
}

impl Default for AppInputs {
    fn default() -> Self {
        Self::new(500_000_000, 150.0, 4.5, 13.0, 120)
    }
}

fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        min
    }
}

pub(crate) fn format_version(version: f64) -> String {
    let rounded = (version * 10.0).round() / 10.0;
    let text = rounded.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

/// One editable field of the input form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    DeveloperId,
    SizeMb,
    AverageUserRating,
    IosVersion,
    TimeGapDays,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        FormField::DeveloperId,
        FormField::SizeMb,
        FormField::AverageUserRating,
        FormField::IosVersion,
        FormField::TimeGapDays,
    ];

    /// Short name used on the command line and in the interactive form.
    pub fn key(&self) -> &'static str {
        match self {
            Self::DeveloperId => "developer-id",
            Self::SizeMb => "size-mb",
            Self::AverageUserRating => "rating",
            Self::IosVersion => "ios-version",
            Self::TimeGapDays => "time-gap",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::DeveloperId => "Developer ID",
            Self::SizeMb => "App Size (MB)",
            Self::AverageUserRating => "Average User Rating",
            Self::IosVersion => "Required iOS Version",
            Self::TimeGapDays => "Time Gap (Days)",
        }
    }

    /// Inclusive lower and upper bound of the field.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Self::DeveloperId => (0.0, u64::MAX as f64),
            Self::SizeMb => (0.0, f64::MAX),
            Self::AverageUserRating => (AppInputs::MIN_RATING, AppInputs::MAX_RATING),
            Self::IosVersion => (AppInputs::MIN_IOS_VERSION, AppInputs::MAX_IOS_VERSION),
            Self::TimeGapDays => (0.0, u32::MAX as f64),
        }
    }

    /// Parses `raw` and stores the clamped value into `inputs`.
    ///
    /// Integer fields reject fractional input; negative integers clamp to zero.
    pub fn apply(&self, inputs: &mut AppInputs, raw: &str) -> Result<(), FeatureError> {
        let raw = raw.trim();
        let invalid = || FeatureError::InvalidInput {
            field: self.key(),
            value: raw.to_string(),
        };
        match self {
            Self::DeveloperId => {
                let value = i128::from_str(raw).map_err(|_| invalid())?;
                inputs.developer_id = value.clamp(0, u64::MAX as i128) as u64;
            }
            Self::TimeGapDays => {
                let value = i64::from_str(raw).map_err(|_| invalid())?;
                inputs.time_gap_days = value.clamp(0, u32::MAX as i64) as u32;
            }
            Self::SizeMb | Self::AverageUserRating | Self::IosVersion => {
                let value = f64::from_str(raw).map_err(|_| invalid())?;
                if value.is_nan() {
                    return Err(invalid());
                }
                let (min, max) = self.bounds();
                let value = value.clamp(min, max);
                match self {
                    Self::SizeMb => inputs.size_mb = value,
                    Self::AverageUserRating => inputs.average_user_rating = value,
                    _ => inputs.ios_version = value,
                }
            }
        }
        Ok(())
    }

    /// Current value of this field, formatted for display.
    pub fn display_value(&self, inputs: &AppInputs) -> String {
        match self {
            Self::DeveloperId => inputs.developer_id.to_string(),
            Self::SizeMb => format!("{:.1}", inputs.size_mb),
            Self::AverageUserRating => format!("{:.1}", inputs.average_user_rating),
            Self::IosVersion => inputs.ios_version_label(),
            Self::TimeGapDays => inputs.time_gap_days.to_string(),
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FormField {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.key() == wanted)
            .ok_or_else(|| FeatureError::UnknownField(s.to_string()))
    }
}
