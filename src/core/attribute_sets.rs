//! LOFAR Sky Image group attributes, ref. LOFAR-USG-ICD-004, v0.9.
//!
//! Each group type owns a template (an unordered key/value map) and a fixed
//! ordered key list. Templates are filled with `init_header`, adjusted with
//! `set_attr`/`del_attr`, and read back through `ordered_attributes`, which
//! always yields exactly the ICD key list in ICD order.

use crate::types::{
    AntennaSet, AttrValue, FilterSelection, GroupType, HeaderCard, SkimConfig, SkimError,
    SkimResult,
};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

const ROOT_KEYS: &[&str] = &[
    "GROUPTYPE",
    "FILENAME",
    "FILETYPE",
    "TELESCOPE",
    "PROJECT_ID",
    "PROJECT_TITLE",
    "OBSERVER",
    "OBSERVATION_ID",
    "OBSERVATION_TIMESYS",
    "OBSERVATION_DATE_START",
    "OBSERVATION_DATE_END",
    "ANTENNA_SET",
    "FILTER_SELECTION",
    "CLOCK_FREQUENCY",
    "TARGET",
    "SYSTEM_VERSION",
    "PIPELINE_NAME",
    "NOF_STATIONS",
    "STATIONS_LIST",
    "IMGROUPS",
    "NOF_IMAGES",
    "ORIGFILE",
    "NOTES",
];

const SYSLOG_KEYS: &[&str] = &["GROUPTYPE"];

const IMAGE_KEYS: &[&str] = &[
    "GROUPTYPE",
    "COORDINATESGROUP",
    "DATAGROUP",
    "SOURCEGROUP",
    "PROCESSHISTGROUP",
];

const COORDINATES_KEYS: &[&str] = &[
    "GROUPTYPE",
    "EQUINOX",
    "SYSTEM_RADEC",
    "REF_LOCATION_VALUE",
    "REF_LOCATION_UNIT",
    "REF_LOCATION_FRAME",
    "NOF_COORDINATES",
    "NOF_AXES",
    "COORDINATE_TYPES",
];

const SKY_DATA_KEYS: &[&str] = &["GROUPTYPE", "DATASET", "DATASETNAME", "WCSINFO"];

const SOURCE_KEYS: &[&str] = &["GROUPTYPE", "DATASET", "NSOURCES"];

const PROCESS_HIST_KEYS: &[&str] = &["GROUPTYPE"];

/// ICD-mandated attribute order for a group type
pub fn ordered_keys(group: GroupType) -> &'static [&'static str] {
    match group {
        GroupType::Root => ROOT_KEYS,
        GroupType::Syslog => SYSLOG_KEYS,
        GroupType::Image => IMAGE_KEYS,
        GroupType::Coordinates => COORDINATES_KEYS,
        GroupType::SkyData => SKY_DATA_KEYS,
        GroupType::Source => SOURCE_KEYS,
        GroupType::ProcessHist => PROCESS_HIST_KEYS,
    }
}

/// Context passed to `init_header`; only Root needs it
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupContext<'a> {
    /// Observation name or directory, e.g. "L2009_13591_8"
    pub observation: Option<&'a str>,
    /// Number of sub-band images in the observation
    pub nimages: Option<usize>,
}

impl<'a> GroupContext<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn root(observation: &'a str, nimages: usize) -> Self {
        Self {
            observation: Some(observation),
            nimages: Some(nimages),
        }
    }
}

/// Unordered attribute values for one group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeTemplate {
    values: HashMap<String, AttrValue>,
}

impl AttributeTemplate {
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.values.get(key)
    }

    pub fn insert<V: Into<AttrValue>>(&mut self, key: &str, value: V) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.values.remove(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Attribute templates for every group of one sky image build.
///
/// Usual flow:
///
/// ```
/// use skim::core::{AttributeSets, GroupContext};
/// use skim::types::{GroupType, SkimConfig};
///
/// let mut atts = AttributeSets::new(SkimConfig::default());
/// atts.init_header(GroupType::Root, &GroupContext::root("L2009_13591_8", 2)).unwrap();
/// let header = atts.ordered_attributes(GroupType::Root);
/// assert_eq!(header[0].0, "GROUPTYPE");
/// ```
#[derive(Debug, Clone)]
pub struct AttributeSets {
    config: SkimConfig,
    templates: HashMap<GroupType, AttributeTemplate>,
}

impl AttributeSets {
    /// Create empty templates for all seven group types
    pub fn new(config: SkimConfig) -> Self {
        let templates = GroupType::ALL
            .iter()
            .map(|group| (*group, AttributeTemplate::default()))
            .collect();
        Self { config, templates }
    }

    pub fn config(&self) -> &SkimConfig {
        &self.config
    }

    /// Reset and populate the template of `group`
    pub fn init_header(&mut self, group: GroupType, context: &GroupContext<'_>) -> SkimResult<()> {
        log::debug!("Initializing {} header", group);

        // Root is validated before its template is touched
        let root_values = match group {
            GroupType::Root => Some(self.root_values(context)?),
            _ => None,
        };

        let template = self.template_mut(group);
        template.clear();

        match group {
            GroupType::Root => {
                for (key, value) in root_values.unwrap_or_default() {
                    template.insert(key, value);
                }
            }
            GroupType::Syslog => {
                template.insert("GROUPTYPE", "Syslog");
            }
            GroupType::Image => {
                template.insert("GROUPTYPE", "Image");
                template.insert("COORDINATESGROUP", "Coordinates");
                template.insert("DATAGROUP", "skyData");
                template.insert("SOURCEGROUP", "Source");
                template.insert("PROCESSHISTGROUP", "ProcessHist");
            }
            GroupType::Coordinates => {
                template.insert("GROUPTYPE", "Coordinates");
                template.insert("EQUINOX", "J2000");
                template.insert("SYSTEM_RADEC", "FK5");
                template.insert("REF_LOCATION_VALUE", AttrValue::Null);
                template.insert("REF_LOCATION_UNIT", "");
                template.insert("REF_LOCATION_FRAME", "");
                template.insert("NOF_COORDINATES", AttrValue::Null);
                template.insert("NOF_AXES", 4i64);
                template.insert("COORDINATE_TYPES", AttrValue::Null);
            }
            GroupType::SkyData => {
                template.insert("GROUPTYPE", "skyData");
                template.insert("DATASET", "true");
                template.insert("DATASETNAME", "");
                template.insert("WCSINFO", "../Coordinates");
            }
            GroupType::Source => {
                template.insert("GROUPTYPE", "Source");
                template.insert("DATASET", "Source List");
                template.insert("NSOURCES", "");
            }
            GroupType::ProcessHist => {
                template.insert("GROUPTYPE", "ProcessHist");
            }
        }

        Ok(())
    }

    /// `init_header` for a group given by its ICD tag
    pub fn init_header_by_name(&mut self, group: &str, context: &GroupContext<'_>) -> SkimResult<()> {
        let group = GroupType::from_str(group)?;
        self.init_header(group, context)
    }

    fn root_values(&self, context: &GroupContext<'_>) -> SkimResult<Vec<(&'static str, AttrValue)>> {
        let (observation, nimages) = match (context.observation, context.nimages) {
            (Some(observation), Some(nimages)) => (observation, nimages),
            _ => {
                return Err(SkimError::InvalidArgument(
                    "Root header requires an observation name and an image count".to_string(),
                ))
            }
        };

        let orig_file = observation_base_name(observation);
        let obs_id = observation_id(observation)?;
        let nimages = i64::try_from(nimages)
            .map_err(|_| SkimError::InvalidArgument(format!("Image count {} out of range", nimages)))?;

        let mut values = vec![
            ("GROUPTYPE", AttrValue::text("Root")),
            ("FILENAME", AttrValue::Text(format!("L{}_sky.h5", obs_id))),
            ("FILETYPE", AttrValue::text(self.config.file_type.as_str())),
            ("TELESCOPE", AttrValue::text(self.config.telescope.as_str())),
            ("PROJECT_ID", AttrValue::text(self.config.project_id.as_str())),
            ("PROJECT_TITLE", AttrValue::text(self.config.project_title.as_str())),
            ("OBSERVER", AttrValue::text(self.config.observer.as_str())),
            ("OBSERVATION_ID", AttrValue::Text(obs_id)),
            ("OBSERVATION_TIMESYS", AttrValue::text(self.config.observation_timesys.as_str())),
            ("SYSTEM_VERSION", AttrValue::text(env!("CARGO_PKG_VERSION"))),
            ("IMGROUPS", AttrValue::text("true")),
            ("NOF_IMAGES", AttrValue::Integer(nimages)),
            ("ORIGFILE", AttrValue::text(orig_file)),
        ];
        if let Some(antenna_set) = self.config.antenna_set {
            values.push(("ANTENNA_SET", AttrValue::text(antenna_set.as_str())));
        }
        if let Some(filter) = self.config.filter_selection {
            values.push(("FILTER_SELECTION", AttrValue::text(filter.as_str())));
        }
        Ok(values)
    }

    /// Ordered (key, value) pairs for `group`.
    ///
    /// Keys that are absent from the template, or hold `Null`, come out as
    /// empty strings; the result always has `ordered_keys(group).len()` entries.
    pub fn ordered_attributes(&self, group: GroupType) -> Vec<(String, AttrValue)> {
        let template = self.template(group);
        ordered_keys(group)
            .iter()
            .map(|key| {
                let value = match template.get(key) {
                    Some(AttrValue::Null) | None => AttrValue::empty(),
                    Some(value) => value.clone(),
                };
                (key.to_string(), value)
            })
            .collect()
    }

    /// `ordered_attributes` for a group given by its ICD tag
    pub fn ordered_attributes_by_name(&self, group: &str) -> SkimResult<Vec<(String, AttrValue)>> {
        let group = GroupType::from_str(group)?;
        Ok(self.ordered_attributes(group))
    }

    pub fn template(&self, group: GroupType) -> &AttributeTemplate {
        // Every group type is inserted by `new`
        &self.templates[&group]
    }

    fn template_mut(&mut self, group: GroupType) -> &mut AttributeTemplate {
        self.templates.entry(group).or_default()
    }

    /// Set or override one attribute. Enumerated root attributes are validated.
    pub fn set_attr<V: Into<AttrValue>>(&mut self, group: GroupType, key: &str, value: V) -> SkimResult<()> {
        let value = value.into();
        validate_enumerated(key, &value)?;
        log::debug!("{}: {} = {}", group, key, value);
        self.template_mut(group).insert(key, value);
        Ok(())
    }

    pub fn get_attr(&self, group: GroupType, key: &str) -> Option<&AttrValue> {
        self.template(group).get(key)
    }

    pub fn del_attr(&mut self, group: GroupType, key: &str) -> Option<AttrValue> {
        self.template_mut(group).remove(key)
    }

    /// Fill Coordinates attributes from the raw header of a sub-band image.
    ///
    /// NAXIS gives NOF_AXES, the CTYPEn cards give COORDINATE_TYPES (comma
    /// separated, axis order) and EQUINOX/EPOCH the equinox. Cards that are
    /// missing leave the template defaults in place.
    pub fn apply_image_header(&mut self, cards: &[HeaderCard]) {
        let lookup: HashMap<&str, &str> = cards
            .iter()
            .map(|card| (card.key.trim(), clean_header_value(&card.value)))
            .collect();

        let template = self.template_mut(GroupType::Coordinates);

        let naxis = lookup.get("NAXIS").and_then(|v| v.parse::<i64>().ok());
        if let Some(naxis) = naxis {
            template.insert("NOF_AXES", naxis);
        }

        let ctype = |axis: i64| lookup.get(format!("CTYPE{}", axis).as_str()).copied();
        let types: Vec<&str> = match naxis {
            Some(naxis) => (1..=naxis).filter_map(ctype).collect(),
            // No NAXIS card: take CTYPE1.. up to the first gap
            None => (1..).map(ctype).take_while(Option::is_some).flatten().collect(),
        };
        if !types.is_empty() {
            template.insert("COORDINATE_TYPES", types.join(","));
        }

        if let Some(equinox) = lookup.get("EQUINOX").or_else(|| lookup.get("EPOCH")) {
            let equinox = match equinox.parse::<f64>() {
                Ok(year) => format!("J{:.0}", year),
                Err(_) => equinox.to_string(),
            };
            template.insert("EQUINOX", equinox);
        }
    }
}

fn validate_enumerated(key: &str, value: &AttrValue) -> SkimResult<()> {
    let check = |parse: fn(&str) -> SkimResult<()>| match value {
        AttrValue::Text(s) if s.is_empty() => Ok(()),
        AttrValue::Text(s) => parse(s),
        AttrValue::Null => Ok(()),
        other => Err(SkimError::InvalidEnumValue {
            key: key.to_string(),
            value: other.to_string(),
        }),
    };

    match key {
        "ANTENNA_SET" => check(|s| AntennaSet::from_str(s).map(|_| ())),
        "FILTER_SELECTION" => check(|s| FilterSelection::from_str(s).map(|_| ())),
        _ => Ok(()),
    }
}

fn clean_header_value(value: &str) -> &str {
    value.trim().trim_matches('\'').trim()
}

fn observation_base_name(observation: &str) -> &str {
    Path::new(observation)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(observation)
}

/// Observation id from an observation name or directory: "L2009_13591_8" -> "13591"
pub fn observation_id(observation: &str) -> SkimResult<String> {
    let base = observation_base_name(observation);
    match base.split('_').nth(1) {
        Some(id) if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) => Ok(id.to_string()),
        _ => Err(SkimError::MalformedObservationName(observation.to_string())),
    }
}

/// Canonical archive file name for an observation: "L2009_13591_8" -> "L13591_sky.h5"
pub fn sky_file_name(observation: &str) -> SkimResult<String> {
    Ok(format!("L{}_sky.h5", observation_id(observation)?))
}
