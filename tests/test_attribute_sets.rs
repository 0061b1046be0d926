use skim::core::{ordered_keys, sky_file_name, AttributeSets, GroupContext};
use skim::types::{AntennaSet, AttrValue, FilterSelection, GroupType, SkimConfig, SkimError};

#[test]
fn test_every_group_in_icd_order() {
    let mut atts = AttributeSets::new(SkimConfig::default());

    for group in GroupType::ALL {
        atts.init_header(group, &GroupContext::root("L2009_13591_8", 4)).unwrap();
        let attrs = atts.ordered_attributes(group);

        let keys: Vec<&str> = attrs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ordered_keys(group), "key order for {}", group);

        for (key, value) in &attrs {
            assert_ne!(*value, AttrValue::Null, "{}/{} must not be null", group, key);
        }

        // Same answer without intervening mutation
        assert_eq!(attrs, atts.ordered_attributes(group));
    }
}

#[test]
fn test_root_attributes() {
    let config = SkimConfig {
        antenna_set: Some(AntennaSet::HbaBoth),
        filter_selection: Some(FilterSelection::Hb100To190),
        ..SkimConfig::default()
    };
    let mut atts = AttributeSets::new(config);
    atts.init_header(GroupType::Root, &GroupContext::root("L2009_13591_8", 2)).unwrap();
    let attrs = atts.ordered_attributes(GroupType::Root);

    let value = |key: &str| {
        attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.to_string())
            .unwrap()
    };
    assert_eq!(value("GROUPTYPE"), "Root");
    assert_eq!(value("OBSERVATION_ID"), "13591");
    assert_eq!(value("FILENAME"), "L13591_sky.h5");
    assert_eq!(value("TELESCOPE"), "LOFAR");
    assert_eq!(value("ANTENNA_SET"), "HBA_BOTH");
    assert_eq!(value("FILTER_SELECTION"), "HB_100_190");
    assert_eq!(value("NOF_IMAGES"), "2");
    assert_eq!(value("OBSERVATION_DATE_START"), "");
    assert_eq!(value("NOTES"), "");
}

#[test]
fn test_malformed_observation_name() {
    assert_eq!(sky_file_name("L2009_13591_8").unwrap(), "L13591_sky.h5");
    assert!(matches!(
        sky_file_name("L200913591"),
        Err(SkimError::MalformedObservationName(_))
    ));

    let mut atts = AttributeSets::new(SkimConfig::default());
    assert!(matches!(
        atts.init_header(GroupType::Root, &GroupContext::root("L200913591", 1)),
        Err(SkimError::MalformedObservationName(_))
    ));
}

#[test]
fn test_late_bound_dataset_name() {
    let mut atts = AttributeSets::new(SkimConfig::default());
    atts.init_header(GroupType::SkyData, &GroupContext::none()).unwrap();
    atts.set_attr(GroupType::SkyData, "DATASETNAME", "ImageDataArray_SB007").unwrap();

    let attrs = atts.ordered_attributes(GroupType::SkyData);
    assert_eq!(
        attrs,
        vec![
            ("GROUPTYPE".to_string(), AttrValue::text("skyData")),
            ("DATASET".to_string(), AttrValue::text("true")),
            ("DATASETNAME".to_string(), AttrValue::text("ImageDataArray_SB007")),
            ("WCSINFO".to_string(), AttrValue::text("../Coordinates")),
        ]
    );
}

#[test]
fn test_group_tags() {
    for group in GroupType::ALL {
        assert_eq!(group.as_str().parse::<GroupType>().unwrap(), group);
    }
    assert!(matches!("Data".parse::<GroupType>(), Err(SkimError::UnknownGroupType(_))));
}
