//! Observation directory layout.
//!
//! Pipeline output for an observation lives under
//!
//! ```text
//! OBS/logs/
//! OBS/parsets/
//! OBS/results/<run label>/   <- sub-band images, one directory per pipeline run
//! OBS/vds/
//! ```
//!
//! and the sky image is written next to the images it was built from.

use crate::core::attribute_sets::sky_file_name;
use crate::core::group_names::GroupNames;
use crate::types::{SkimConfig, SkimError, SkimResult, SubBandRecord};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything needed to build one sky image
#[derive(Debug, Clone)]
pub struct SkimPlan {
    /// Observation name or directory, e.g. "/jobs/L2009_13591_8"
    pub observation: String,
    pub run_label: String,
    pub results_path: PathBuf,
    pub output_path: PathBuf,
    /// Averaged image found among the results, if any
    pub average_image: Option<String>,
    /// Sub-band image file names, without the averaged image
    pub image_list: Vec<String>,
    pub records: Vec<SubBandRecord>,
}

impl SkimPlan {
    /// Build a plan from an already discovered list of image file names
    pub fn from_image_list<S: AsRef<str>>(
        observation: &str,
        run_label: &str,
        images: &[S],
        config: &SkimConfig,
    ) -> SkimResult<Self> {
        let results_path = results_path(Path::new(observation), run_label);
        let output_path = results_path.join(sky_file_name(observation)?);

        let images: Vec<String> = images.iter().map(|s| s.as_ref().to_string()).collect();
        let (average_image, image_list) = split_average_image(images, &config.average_marker);
        let records = GroupNames::new(&image_list).make_group_names()?;

        Ok(Self {
            observation: observation.to_string(),
            run_label: run_label.to_string(),
            results_path,
            output_path,
            average_image,
            image_list,
            records,
        })
    }

    pub fn nimages(&self) -> usize {
        self.image_list.len()
    }

    /// Full path of an image under the results directory
    pub fn image_path(&self, file_name: &str) -> PathBuf {
        self.results_path.join(file_name)
    }
}

/// `<obs>/results/<run label>`
pub fn results_path(observation: &Path, run_label: &str) -> PathBuf {
    observation.join("results").join(run_label)
}

/// `<obs>/results/<run label>/L<obsid>_sky.h5`
pub fn output_path(observation: &Path, run_label: &str) -> SkimResult<PathBuf> {
    let name = sky_file_name(&observation.to_string_lossy())?;
    Ok(results_path(observation, run_label).join(name))
}

/// Image file names with `extension` directly under `dir`, sorted
pub fn list_images(dir: &Path, extension: &str) -> SkimResult<Vec<String>> {
    let mut images = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            images.push(name.to_string());
        }
    }
    images.sort();
    Ok(images)
}

/// Pop the first image whose name contains `marker` out of the list
pub fn split_average_image(mut images: Vec<String>, marker: &str) -> (Option<String>, Vec<String>) {
    let average = images
        .iter()
        .position(|name| name.contains(marker))
        .map(|pos| images.remove(pos));
    (average, images)
}

/// Locate a pipeline run's results and derive the plan for its sky image
pub fn initialize(observation: &Path, run_label: &str, config: &SkimConfig) -> SkimResult<SkimPlan> {
    let results = results_path(observation, run_label);
    if !results.is_dir() {
        return Err(SkimError::InvalidArgument(format!(
            "Path to directory {} not found",
            results.display()
        )));
    }

    let images = list_images(&results, &config.image_extension)?;
    log::info!("Found {} images under {}", images.len(), results.display());

    let plan = SkimPlan::from_image_list(&observation.to_string_lossy(), run_label, &images, config)?;
    if let Some(average) = &plan.average_image {
        log::info!("Found average image {}", average);
    }
    log::info!("Sky image will be written to {}", plan.output_path.display());
    Ok(plan)
}
