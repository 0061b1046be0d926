//! skim: LOFAR Sky Image builder
//!
//! Collects the sub-band images written by one imaging pipeline run and stores
//! them, with the group attributes required by LOFAR-USG-ICD-004, in a single
//! HDF5 sky image file.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    AntennaSet, AttrValue, FilterSelection, GroupType, HeaderCard, SkimConfig, SkimError,
    SkimResult, SkyImage, SubBandRecord,
};

pub use crate::core::{AttributeSets, BuildSummary, GroupContext, GroupNames, SkimPlan};
pub use io::{ArchiveWriter, FitsImageReader, ImageReader, MemoryArchive, MemoryImageReader};
#[cfg(feature = "gdal")]
pub use io::GdalImageReader;
#[cfg(feature = "hdf5")]
pub use io::Hdf5Archive;

/// Build the sky image of one pipeline run: `<obs>/results/<run>/L<obsid>_sky.h5`
///
/// A failed build leaves no file behind.
#[cfg(feature = "hdf5")]
pub fn skim_observation<P: AsRef<std::path::Path>>(
    observation: P,
    run_label: &str,
    config: &SkimConfig,
) -> SkimResult<BuildSummary> {
    let plan = crate::core::initialize(observation.as_ref(), run_label, config)?;
    skim_plan(&plan, config, &FitsImageReader::new())
}

/// Build the sky image described by `plan` into an HDF5 file, reading images with `reader`
#[cfg(feature = "hdf5")]
pub fn skim_plan<R: ImageReader>(plan: &SkimPlan, config: &SkimConfig, reader: &R) -> SkimResult<BuildSummary> {
    let mut archive = Hdf5Archive::create(&plan.output_path, &config.archive_title)?;
    let result = crate::core::build_sky_image(plan, config, reader, &mut archive);
    if result.is_err() {
        match std::fs::remove_file(&plan.output_path) {
            Ok(()) => log::info!("Removed incomplete {}", plan.output_path.display()),
            Err(e) => log::warn!("Failed to remove incomplete {}: {}", plan.output_path.display(), e),
        }
    }
    result
}

#[cfg(feature = "python")]
mod python {
    use crate::{AttributeSets, GroupContext, GroupNames, GroupType, SkimConfig, SkimError};
    #[cfg(feature = "hdf5")]
    use crate::skim_observation;
    use pyo3::prelude::*;
    use std::str::FromStr;

    type NameTuple = (String, String, String, String, String, String, String, String);

    fn to_py_err(e: SkimError) -> PyErr {
        match e {
            SkimError::InvalidArgument(_)
            | SkimError::UnknownGroupType(_)
            | SkimError::MalformedObservationName(_)
            | SkimError::NoSubBandIdFound(_)
            | SkimError::DuplicateSubBandId { .. }
            | SkimError::InvalidEnumValue { .. } => {
                PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e))
            }
            _ => PyErr::new::<pyo3::exceptions::PyIOError, _>(format!("{}", e)),
        }
    }

    /// Python module definition
    #[pymodule]
    fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_class::<PyGroupNames>()?;
        m.add_class::<PyAttributeSets>()?;
        #[cfg(feature = "hdf5")]
        m.add_function(wrap_pyfunction!(build_sky_image, m)?)?;
        Ok(())
    }

    /// Python wrapper for GroupNames
    #[pyclass(name = "GroupNames")]
    struct PyGroupNames {
        inner: GroupNames,
    }

    #[pymethods]
    impl PyGroupNames {
        #[new]
        fn new(image_list: Vec<String>) -> Self {
            PyGroupNames {
                inner: GroupNames::new(&image_list),
            }
        }

        fn sub_band_list(&self) -> PyResult<Vec<String>> {
            self.inner.sub_band_list().map_err(to_py_err)
        }

        fn make_group_names(&self) -> PyResult<Vec<NameTuple>> {
            let records = self.inner.make_group_names().map_err(to_py_err)?;
            Ok(records
                .into_iter()
                .map(|r| {
                    (
                        r.sub_band_group,
                        r.image_group,
                        r.title,
                        r.data_group,
                        r.coordinates_group,
                        r.source_group,
                        r.process_hist_group,
                        r.source_file,
                    )
                })
                .collect())
        }
    }

    /// Python wrapper for AttributeSets
    #[pyclass(name = "AttributeSets")]
    struct PyAttributeSets {
        inner: AttributeSets,
    }

    #[pymethods]
    impl PyAttributeSets {
        #[new]
        fn new() -> Self {
            PyAttributeSets {
                inner: AttributeSets::new(SkimConfig::default()),
            }
        }

        #[pyo3(signature = (group, obs=None, nimages=None))]
        fn init_header(&mut self, group: &str, obs: Option<String>, nimages: Option<usize>) -> PyResult<()> {
            let context = GroupContext {
                observation: obs.as_deref(),
                nimages,
            };
            self.inner.init_header_by_name(group, &context).map_err(to_py_err)
        }

        fn attribute_set(&self, group: &str) -> PyResult<Vec<(String, String)>> {
            let attrs = self.inner.ordered_attributes_by_name(group).map_err(to_py_err)?;
            Ok(attrs.into_iter().map(|(k, v)| (k, v.to_string())).collect())
        }

        fn set_attr(&mut self, group: &str, key: &str, value: String) -> PyResult<()> {
            let group = GroupType::from_str(group).map_err(to_py_err)?;
            self.inner.set_attr(group, key, value).map_err(to_py_err)
        }

        fn get_attr(&self, group: &str, key: &str) -> PyResult<Option<String>> {
            let group = GroupType::from_str(group).map_err(to_py_err)?;
            Ok(self.inner.get_attr(group, key).map(|v| v.to_string()))
        }

        fn del_attr(&mut self, group: &str, key: &str) -> PyResult<()> {
            let group = GroupType::from_str(group).map_err(to_py_err)?;
            self.inner.del_attr(group, key);
            Ok(())
        }

        fn __repr__(&self) -> String {
            "AttributeSets(LOFAR-USG-ICD-004)".to_string()
        }
    }

    /// Build the sky image for a pipeline run and return its path
    #[cfg(feature = "hdf5")]
    #[pyfunction]
    fn build_sky_image(observation: String, run: String) -> PyResult<String> {
        let summary = skim_observation(&observation, &run, &SkimConfig::default()).map_err(to_py_err)?;
        Ok(summary.output_path.display().to_string())
    }
}
