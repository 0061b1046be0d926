use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Raster plane handed from the image reader to the archive (rows x columns)
pub type SkyImage = ndarray::Array2<f32>;

/// LOFAR Sky Image group types, ref. LOFAR-USG-ICD-004, Table 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupType {
    Root,
    Syslog,
    Image,
    Coordinates,
    SkyData,
    Source,
    ProcessHist,
}

impl GroupType {
    /// Every group type, in archive construction order
    pub const ALL: [GroupType; 7] = [
        GroupType::Root,
        GroupType::Syslog,
        GroupType::Image,
        GroupType::SkyData,
        GroupType::Coordinates,
        GroupType::Source,
        GroupType::ProcessHist,
    ];

    /// Canonical ICD tag
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Root => "Root",
            GroupType::Syslog => "Syslog",
            GroupType::Image => "Image",
            GroupType::Coordinates => "Coordinates",
            GroupType::SkyData => "skyData",
            GroupType::Source => "Source",
            GroupType::ProcessHist => "ProcessHist",
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupType {
    type Err = SkimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GroupType::ALL
            .iter()
            .find(|group| group.as_str() == s)
            .copied()
            .ok_or_else(|| SkimError::UnknownGroupType(s.to_string()))
    }
}

/// Permissible values of the root ANTENNA_SET attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AntennaSet {
    LbaInner,
    LbaOuter,
    LbaSparse,
    LbaX,
    LbaY,
    HbaOne,
    HbaTwo,
    HbaBoth,
}

impl AntennaSet {
    pub const ALL: [AntennaSet; 8] = [
        AntennaSet::LbaInner,
        AntennaSet::LbaOuter,
        AntennaSet::LbaSparse,
        AntennaSet::LbaX,
        AntennaSet::LbaY,
        AntennaSet::HbaOne,
        AntennaSet::HbaTwo,
        AntennaSet::HbaBoth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AntennaSet::LbaInner => "LBA_INNER",
            AntennaSet::LbaOuter => "LBA_OUTER",
            AntennaSet::LbaSparse => "LBA_SPARSE",
            AntennaSet::LbaX => "LBA_X",
            AntennaSet::LbaY => "LBA_Y",
            AntennaSet::HbaOne => "HBA_ONE",
            AntennaSet::HbaTwo => "HBA_TWO",
            AntennaSet::HbaBoth => "HBA_BOTH",
        }
    }
}

impl fmt::Display for AntennaSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AntennaSet {
    type Err = SkimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AntennaSet::ALL
            .iter()
            .find(|set| set.as_str() == s)
            .copied()
            .ok_or_else(|| SkimError::InvalidEnumValue {
                key: "ANTENNA_SET".to_string(),
                value: s.to_string(),
            })
    }
}

/// Permissible values of the root FILTER_SELECTION attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterSelection {
    #[serde(rename = "LBH_10_80")]
    Lbh10To80,
    #[serde(rename = "LBH_30_80")]
    Lbh30To80,
    #[serde(rename = "HB_100_190")]
    Hb100To190,
    #[serde(rename = "HB_170_230")]
    Hb170To230,
    #[serde(rename = "HB_210_240")]
    Hb210To240,
}

impl FilterSelection {
    pub const ALL: [FilterSelection; 5] = [
        FilterSelection::Lbh10To80,
        FilterSelection::Lbh30To80,
        FilterSelection::Hb100To190,
        FilterSelection::Hb170To230,
        FilterSelection::Hb210To240,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterSelection::Lbh10To80 => "LBH_10_80",
            FilterSelection::Lbh30To80 => "LBH_30_80",
            FilterSelection::Hb100To190 => "HB_100_190",
            FilterSelection::Hb170To230 => "HB_170_230",
            FilterSelection::Hb210To240 => "HB_210_240",
        }
    }
}

impl fmt::Display for FilterSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterSelection {
    type Err = SkimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterSelection::ALL
            .iter()
            .find(|filter| filter.as_str() == s)
            .copied()
            .ok_or_else(|| SkimError::InvalidEnumValue {
                key: "FILTER_SELECTION".to_string(),
                value: s.to_string(),
            })
    }
}

/// Attribute value held in a group template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Text(String),
    Integer(i64),
    Float(f64),
    /// Known attribute with no value yet; written as an empty string
    Null,
}

impl AttrValue {
    pub fn text<S: Into<String>>(s: S) -> Self {
        AttrValue::Text(s.into())
    }

    pub fn empty() -> Self {
        AttrValue::Text(String::new())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(s) => write!(f, "{}", s),
            AttrValue::Integer(i) => write!(f, "{}", i),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Null => Ok(()),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Integer(i)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

/// One raw header entry as found in the source image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderCard {
    pub key: String,
    pub value: String,
}

impl HeaderCard {
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Group names for one sub-band image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubBandRecord {
    /// Zero-padded three digit sub-band identifier, e.g. "007"
    pub id: String,
    pub sub_band_group: String,
    pub image_group: String,
    pub title: String,
    pub data_group: String,
    pub coordinates_group: String,
    pub source_group: String,
    pub process_hist_group: String,
    /// File name to open under the results directory
    pub source_file: String,
}

impl SubBandRecord {
    /// The record in ICD tuple order:
    /// (SB<id>, Image<id>, "Sub-band <id>", skyData, Coordinates, Source, ProcessHist, file)
    pub fn as_tuple(&self) -> [&str; 8] {
        [
            &self.sub_band_group,
            &self.image_group,
            &self.title,
            &self.data_group,
            &self.coordinates_group,
            &self.source_group,
            &self.process_hist_group,
            &self.source_file,
        ]
    }

    /// Name of the image dataset under the skyData group
    pub fn dataset_name(&self) -> String {
        format!("ImageDataArray_{}", self.sub_band_group)
    }
}

/// Numeric element type of an archive dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
    Float32,
}

/// Run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkimConfig {
    pub telescope: String,
    pub project_id: String,
    pub project_title: String,
    pub observer: String,
    pub observation_timesys: String,
    pub file_type: String,
    pub antenna_set: Option<AntennaSet>,
    pub filter_selection: Option<FilterSelection>,
    /// Extension of the sub-band images under the results directory
    pub image_extension: String,
    /// Substring marking the averaged image among the results
    pub average_marker: String,
    pub archive_title: String,
}

impl Default for SkimConfig {
    fn default() -> Self {
        Self {
            telescope: "LOFAR".to_string(),
            project_id: "Sky Image Dev".to_string(),
            project_title: "HDF5 Skim Test".to_string(),
            observer: "The Krell".to_string(),
            observation_timesys: "UTC".to_string(),
            file_type: "sky".to_string(),
            antenna_set: None,
            filter_selection: None,
            image_extension: "fits".to_string(),
            average_marker: "ave".to_string(),
            archive_title: "LOFAR Sky Image".to_string(),
        }
    }
}

/// Error types for sky image construction
#[derive(Debug, thiserror::Error)]
pub enum SkimError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "Group type '{0}' undefined. Permissible values: \
         Root, Syslog, Image, Coordinates, skyData, Source, ProcessHist (LOFAR-USG-ICD-004)"
    )]
    UnknownGroupType(String),

    #[error("Malformed observation name '{0}': expected <prefix>_<obsid>[_...]")]
    MalformedObservationName(String),

    #[error("No parseable sub-band id found in file name '{0}'")]
    NoSubBandIdFound(String),

    #[error("Sub-band id {id} derived from both '{first}' and '{second}'")]
    DuplicateSubBandId {
        id: String,
        first: String,
        second: String,
    },

    #[error("Invalid value '{value}' for {key}")]
    InvalidEnumValue { key: String, value: String },

    #[error("Cannot read source image {path}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("Archive not writable: {0}")]
    WriteTargetUnavailable(String),

    #[error("Archive write failed: {0}")]
    ArchiveWrite(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sky image operations
pub type SkimResult<T> = Result<T, SkimError>;
