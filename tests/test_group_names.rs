use skim::core::{sub_band_id, GroupNames};
use skim::types::SkimError;

#[test]
fn test_sub_band_ids_from_pipeline_names() {
    let images = ["im7.fits", "im021.fits", "im000.fits"];

    let ids: Vec<String> = images.iter().map(|f| sub_band_id(f).unwrap()).collect();
    assert_eq!(ids, vec!["007", "021", "000"]);

    // Derivation is idempotent
    let again: Vec<String> = images.iter().map(|f| sub_band_id(f).unwrap()).collect();
    assert_eq!(ids, again);

    let names = GroupNames::new(&images);
    assert_eq!(names.sub_band_list().unwrap(), vec!["000", "007", "021"]);
}

#[test]
fn test_group_names_for_all_orders() {
    let images = ["SB10.fits", "SB0.fits", "SB2.fits", "SB243.fits"];
    let expected = GroupNames::new(&images).make_group_names().unwrap();

    let mut shuffled = images.to_vec();
    for _ in 0..images.len() {
        shuffled.rotate_left(1);
        assert_eq!(GroupNames::new(&shuffled).make_group_names().unwrap(), expected);
    }

    let groups: Vec<&str> = expected.iter().map(|r| r.image_group.as_str()).collect();
    assert_eq!(groups, vec!["Image000", "Image002", "Image010", "Image243"]);

    let files: Vec<&str> = expected.iter().map(|r| r.source_file.as_str()).collect();
    assert_eq!(files, vec!["SB0.fits", "SB2.fits", "SB10.fits", "SB243.fits"]);
}

#[test]
fn test_primary_sub_band_file() {
    let records = GroupNames::new(&["first_image000.fits"]).make_group_names().unwrap();
    assert_eq!(records[0].id, "000");
    assert_eq!(records[0].source_file, "SB0.fits");

    let records = GroupNames::new(&["im042.fits"]).make_group_names().unwrap();
    assert_eq!(records[0].source_file, "im42.fits");
    assert_eq!(records[0].title, "Sub-band 042");
}

#[test]
fn test_file_without_sub_band_number() {
    let result = GroupNames::new(&["SB1.fits", "average.fits"]).make_group_names();
    match result {
        Err(SkimError::NoSubBandIdFound(name)) => assert_eq!(name, "average.fits"),
        other => panic!("expected NoSubBandIdFound, got {:?}", other),
    }
}

#[test]
fn test_duplicate_sub_band_number() {
    let result = GroupNames::new(&["SB3.fits", "SB003.fits"]).sub_band_list();
    assert!(matches!(result, Err(SkimError::DuplicateSubBandId { id, .. }) if id == "003"));
}
