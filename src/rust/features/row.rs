use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use log::warn;

use super::error::FeatureError;
use super::inputs::AppInputs;
use crate::encoder::{Encoded, LabelEncoder};

pub const DEVELOPER_ID: &str = "DeveloperId";
pub const SIZE_MB: &str = "Size_MB";
pub const AVERAGE_USER_RATING: &str = "Average_User_Rating";
pub const REQUIRED_IOS_VERSION: &str = "Required_IOS_Version";
pub const TIME_GAP_DAYS: &str = "Time_Gap_Days";
pub const CONTENT_RATING: &str = "Content_Rating";
pub const RELEASE_YEAR: &str = "Release_Year";
pub const UPDATED_YEAR: &str = "Updated_Year";
pub const UPDATED_MONTH: &str = "Updated_Month";
pub const RELEASE_MONTH: &str = "Release_Month";

/// Column order of the trained category model. Rows are always projected onto
/// this list; the model artifacts are checked against it at load time.
pub const COLUMNS: [&str; 10] = [
    DEVELOPER_ID,
    SIZE_MB,
    AVERAGE_USER_RATING,
    REQUIRED_IOS_VERSION,
    TIME_GAP_DAYS,
    CONTENT_RATING,
    RELEASE_YEAR,
    UPDATED_YEAR,
    UPDATED_MONTH,
    RELEASE_MONTH,
];

/// A single typed cell of a feature row.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl FeatureValue {
    /// Numeric view of the cell. Strings are parsed, so `"13.0"` is `13.0`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Str(s) => s.trim().parse().ok(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// App Store age ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentRating {
    FourPlus,
    NinePlus,
    TwelvePlus,
    SeventeenPlus,
}

impl ContentRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FourPlus => "4+",
            Self::NinePlus => "9+",
            Self::TwelvePlus => "12+",
            Self::SeventeenPlus => "17+",
        }
    }

    /// Position in ascending age order, used by models without string support.
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::FourPlus => 0,
            Self::NinePlus => 1,
            Self::TwelvePlus => 2,
            Self::SeventeenPlus => 3,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Self::FourPlus),
            1 => Some(Self::NinePlus),
            2 => Some(Self::TwelvePlus),
            3 => Some(Self::SeventeenPlus),
            _ => None,
        }
    }
}

impl fmt::Display for ContentRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentRating {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "4+" => Ok(Self::FourPlus),
            "9+" => Ok(Self::NinePlus),
            "12+" => Ok(Self::TwelvePlus),
            "17+" => Ok(Self::SeventeenPlus),
            other => Err(FeatureError::UnknownContentRating(other.to_string())),
        }
    }
}

/// Values for the columns the form does not collect.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultBundle {
    pub content_rating: ContentRating,
    pub release_year: i32,
    pub updated_year: i32,
    pub updated_month: u8,
    pub release_month: u8,
}

impl Default for DefaultBundle {
    fn default() -> Self {
        Self {
            content_rating: ContentRating::FourPlus,
            release_year: 2023,
            updated_year: 2024,
            updated_month: 6,
            release_month: 8,
        }
    }
}

impl DefaultBundle {
    /// Builds a bundle from user-supplied advanced fields.
    pub fn new(
        content_rating: ContentRating,
        release_year: i32,
        updated_year: i32,
        updated_month: u8,
        release_month: u8,
    ) -> Result<Self, FeatureError> {
        for (name, month) in [(UPDATED_MONTH, updated_month), (RELEASE_MONTH, release_month)] {
            if !(1..=12).contains(&month) {
                return Err(FeatureError::InvalidDefaults(format!(
                    "{} must be between 1 and 12, got {}",
                    name, month
                )));
            }
        }
        Ok(Self {
            content_rating,
            release_year,
            updated_year,
            updated_month,
            release_month,
        })
    }
}

/// A single-row table whose columns follow [`COLUMNS`] exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    values: Vec<FeatureValue>,
}

impl FeatureRow {
    /// Projects a name-to-value mapping onto the fixed column order.
    ///
    /// Extra keys are ignored; a missing column is an error.
    pub fn from_map(mut cells: HashMap<&'static str, FeatureValue>) -> Result<Self, FeatureError> {
        let values = COLUMNS
            .iter()
            .map(|&column| cells.remove(column).ok_or(FeatureError::MissingColumn(column)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { values })
    }

    pub fn columns(&self) -> &'static [&'static str] {
        &COLUMNS
    }

    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        COLUMNS
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.values.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FeatureValue)> {
        COLUMNS.iter().copied().zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// How `Required_IOS_Version` enters the row. One mode per deployment.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum IosVersionMode {
    /// The version string is passed through as a categorical level.
    #[default]
    Raw,
    /// The version string is encoded to an integer with a fitted encoder.
    Encoded(LabelEncoder),
}

/// An unseen categorical value that was replaced to keep prediction going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingFallback {
    pub column: &'static str,
    pub requested: String,
    pub substituted: String,
}

impl fmt::Display for EncodingFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} value {:?} was not seen during training; {:?} was used instead",
            self.column, self.requested, self.substituted
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltRow {
    pub row: FeatureRow,
    pub fallback: Option<EncodingFallback>,
}

/// Assembles feature rows from form inputs plus the default bundle.
#[derive(Debug, Clone, Default)]
pub struct RowBuilder {
    defaults: DefaultBundle,
    mode: IosVersionMode,
}

impl RowBuilder {
    pub fn new(defaults: DefaultBundle, mode: IosVersionMode) -> Result<Self, FeatureError> {
        if let IosVersionMode::Encoded(encoder) = &mode {
            if encoder.is_empty() {
                return Err(FeatureError::EmptyEncoder);
            }
        }
        Ok(Self { defaults, mode })
    }

    pub fn defaults(&self) -> &DefaultBundle {
        &self.defaults
    }

    pub fn mode(&self) -> &IosVersionMode {
        &self.mode
    }

    pub fn build(&self, inputs: &AppInputs) -> Result<BuiltRow, FeatureError> {
        let ios_label = inputs.ios_version_label();
        let (ios_value, fallback) = match &self.mode {
            IosVersionMode::Raw => (FeatureValue::Str(ios_label), None),
            IosVersionMode::Encoded(encoder) => {
                match encoder.transform_or_max(&ios_label).ok_or(FeatureError::EmptyEncoder)? {
                    Encoded::Known(index) => (FeatureValue::Int(index as i64), None),
                    Encoded::Substituted { index, substitute } => {
                        warn!(
                            "Unseen {} {:?}, substituting {:?}",
                            REQUIRED_IOS_VERSION, ios_label, substitute
                        );
                        let fallback = EncodingFallback {
                            column: REQUIRED_IOS_VERSION,
                            requested: ios_label,
                            substituted: substitute,
                        };
                        (FeatureValue::Int(index as i64), Some(fallback))
                    }
                }
            }
        };

        let defaults = &self.defaults;
        let cells = HashMap::from([
            (DEVELOPER_ID, FeatureValue::Int(inputs.developer_id.min(i64::MAX as u64) as i64)),
            (SIZE_MB, FeatureValue::Float(inputs.size_mb)),
            (AVERAGE_USER_RATING, FeatureValue::Float(inputs.average_user_rating)),
            (REQUIRED_IOS_VERSION, ios_value),
            (TIME_GAP_DAYS, FeatureValue::Int(inputs.time_gap_days as i64)),
            (CONTENT_RATING, FeatureValue::Str(defaults.content_rating.as_str().to_string())),
            (RELEASE_YEAR, FeatureValue::Int(defaults.release_year as i64)),
            (UPDATED_YEAR, FeatureValue::Int(defaults.updated_year as i64)),
            (UPDATED_MONTH, FeatureValue::Int(defaults.updated_month as i64)),
            (RELEASE_MONTH, FeatureValue::Int(defaults.release_month as i64)),
        ]);

        Ok(BuiltRow {
            row: FeatureRow::from_map(cells)?,
            fallback,
        })
    }
}
