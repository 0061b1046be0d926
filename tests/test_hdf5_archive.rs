#![cfg(feature = "hdf5")]

use hdf5::types::VarLenUnicode;
use ndarray::Array2;
use skim::core::{build_sky_image, ordered_keys, SkimPlan};
use skim::io::{ArchiveWriter, Hdf5Archive, MemoryImageReader};
use skim::types::{AttrValue, ElementType, GroupType, HeaderCard, SkimConfig, SkimError};
use tempfile::TempDir;

fn read_str(location: &hdf5::Location, name: &str) -> String {
    location
        .attr(name)
        .and_then(|attr| attr.read_scalar::<VarLenUnicode>())
        .unwrap_or_else(|e| panic!("Failed to read attribute {}: {}", name, e))
        .as_str()
        .to_string()
}

#[test]
fn test_sky_image_written_to_hdf5() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let observation = temp_dir.path().join("L2010_00042");
    let config = SkimConfig::default();

    let mut plan = SkimPlan::from_image_list(
        &observation.to_string_lossy(),
        "2010-01-01T12:00:00",
        &["SB1.fits", "SB2.fits"],
        &config,
    )
    .expect("Failed to plan");
    // Write next to the temp dir instead of into a results tree
    plan.output_path = temp_dir.path().join("L00042_sky.h5");

    let mut reader = MemoryImageReader::new();
    for (i, file) in ["SB1.fits", "SB2.fits"].iter().enumerate() {
        reader.insert(
            plan.image_path(file),
            Array2::from_elem((8, 6), i as f32 + 1.0),
            vec![HeaderCard::new("NAXIS", "2")],
        );
    }

    let mut archive = Hdf5Archive::create(&plan.output_path, &config.archive_title)
        .expect("Failed to create archive");
    build_sky_image(&plan, &config, &reader, &mut archive).expect("Build failed");
    assert!(!archive.is_open());

    let file = hdf5::File::open(&plan.output_path).expect("Failed to reopen archive");
    assert_eq!(read_str(&file, "TITLE"), "LOFAR Sky Image");
    assert_eq!(read_str(&file, "GROUPTYPE"), "Root");
    assert_eq!(read_str(&file, "FILENAME"), "L00042_sky.h5");
    assert_eq!(read_str(&file, "NOTES"), "");
    let nimages = file
        .attr("NOF_IMAGES")
        .and_then(|attr| attr.read_scalar::<i64>())
        .expect("Failed to read NOF_IMAGES");
    assert_eq!(nimages, 2);

    let syslog = file.group("SysLog").expect("No SysLog group");
    assert_eq!(read_str(&syslog, "GROUPTYPE"), "Syslog");
    assert!(file.group("AverageImages").is_err());

    for (i, id) in ["001", "002"].iter().enumerate() {
        let image = file.group(&format!("Image{}", id)).expect("No image group");
        assert_eq!(read_str(&image, "TITLE"), format!("Sub-band {}", id));
        assert_eq!(read_str(&image, "DATAGROUP"), "skyData");

        let sky_data = image.group("skyData").expect("No skyData group");
        assert_eq!(read_str(&sky_data, "DATASETNAME"), format!("ImageDataArray_SB{}", id));

        let dataset = sky_data
            .dataset(&format!("ImageDataArray_SB{}", id))
            .expect("No image dataset");
        assert_eq!(dataset.shape(), vec![8, 6]);
        let data = dataset.read_2d::<f32>().expect("Failed to read dataset");
        assert!(data.iter().all(|v| *v == i as f32 + 1.0));

        let coords = image.group("Coordinates").expect("No Coordinates group");
        // Every ICD key is on disk (listed by name, not creation order)
        let mut names = coords.attr_names().expect("Failed to list attributes");
        names.retain(|name| name != "TITLE");
        names.sort();
        let mut expected: Vec<String> = ordered_keys(GroupType::Coordinates)
            .iter()
            .map(|key| key.to_string())
            .collect();
        expected.sort();
        assert_eq!(names, expected);
        assert_eq!(read_str(&coords, "SYSTEM_RADEC"), "FK5");
        assert!(coords.group("LinearCoord").is_ok());
        assert!(image.group("Source").is_ok());
        assert!(image.group("ProcessHist").is_ok());
    }
}

#[test]
fn test_closed_archive_rejects_writes() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut archive = Hdf5Archive::create(temp_dir.path().join("L1_sky.h5"), "LOFAR Sky Image")
        .expect("Failed to create archive");
    let root = archive.root();
    archive.create_group(&root, "SysLog", "Root System Log").unwrap();
    archive.close().unwrap();

    assert!(matches!(
        archive.create_group(&root, "Image001", "Sub-band 001"),
        Err(SkimError::WriteTargetUnavailable(_))
    ));
    assert!(matches!(
        archive.create_dataset(&root, "d", ElementType::Float32, (2, 2), "d"),
        Err(SkimError::WriteTargetUnavailable(_))
    ));
    assert!(matches!(
        archive.set_attribute(&root, "NOTES", &AttrValue::text("x")),
        Err(SkimError::WriteTargetUnavailable(_))
    ));
}

#[test]
fn test_unwritable_target() {
    let result = Hdf5Archive::create("/nonexistent/dir/L1_sky.h5", "LOFAR Sky Image");
    assert!(matches!(result, Err(SkimError::WriteTargetUnavailable(_))));
}

#[test]
fn test_failed_build_removes_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config = SkimConfig::default();
    let mut plan = SkimPlan::from_image_list(
        &temp_dir.path().join("L2010_00042").to_string_lossy(),
        "2010-01-01T12:00:00",
        &["SB1.fits", "SB2.fits"],
        &config,
    )
    .expect("Failed to plan");
    plan.output_path = temp_dir.path().join("L00042_sky.h5");

    // SB2 cannot be read
    let mut reader = MemoryImageReader::new();
    reader.insert(plan.image_path("SB1.fits"), Array2::zeros((4, 4)), Vec::new());

    let result = skim::skim_plan(&plan, &config, &reader);
    assert!(matches!(result, Err(SkimError::SourceUnreadable { .. })));
    assert!(!plan.output_path.exists());
}
