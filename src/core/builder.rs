use crate::core::attribute_sets::{AttributeSets, GroupContext};
use crate::core::layout::SkimPlan;
use crate::io::archive::{ArchiveWriter, NodePath};
use crate::io::image_reader::ImageReader;
use crate::types::{AttrValue, ElementType, GroupType, SkimConfig, SkimResult, SkyImage, SubBandRecord};
use std::fmt;
use std::path::{Path, PathBuf};

pub const SYSLOG_GROUP: &str = "SysLog";
pub const AVERAGE_GROUP: &str = "AverageImages";
pub const AVERAGE_DATASET: &str = "averageImage";
pub const LINEAR_COORD_GROUP: &str = "LinearCoord";

/// What a finished build wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub output_path: PathBuf,
    pub sub_bands: usize,
    pub groups: usize,
    pub datasets: usize,
    pub average_image: bool,
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} sub-band image group(s), {} group(s), {} dataset(s){}",
            self.output_path.display(),
            self.sub_bands,
            self.groups,
            self.datasets,
            if self.average_image { ", with average image" } else { "" }
        )
    }
}

/// Writes the groups of one sky image in ICD order:
/// Root, SysLog, AverageImages (optional), then one Image group per sub-band
/// with its skyData, Coordinates, Source and ProcessHist children.
pub struct SkimBuilder<'a, R: ImageReader, W: ArchiveWriter> {
    reader: &'a R,
    archive: &'a mut W,
    groups: usize,
    datasets: usize,
}

impl<'a, R: ImageReader, W: ArchiveWriter> SkimBuilder<'a, R, W> {
    pub fn new(reader: &'a R, archive: &'a mut W) -> Self {
        Self {
            reader,
            archive,
            groups: 0,
            datasets: 0,
        }
    }

    /// Run every construction step. Stops at the first error.
    pub fn build(mut self, attributes: &mut AttributeSets, plan: &SkimPlan) -> SkimResult<BuildSummary> {
        log::info!(
            "Building sky image for {} ({} sub-band images)",
            plan.observation,
            plan.nimages()
        );

        self.build_root(attributes, plan)?;
        self.build_syslog(attributes)?;
        self.build_average_image(plan)?;

        log::info!("Root built, attaching image groups");
        for record in &plan.records {
            self.build_image_group(attributes, plan, record)?;
        }

        Ok(BuildSummary {
            output_path: plan.output_path.clone(),
            sub_bands: plan.records.len(),
            groups: self.groups,
            datasets: self.datasets,
            average_image: plan.average_image.is_some(),
        })
    }

    fn write_attributes(&mut self, node: &NodePath, attributes: &[(String, AttrValue)]) -> SkimResult<()> {
        for (key, value) in attributes {
            self.archive.set_attribute(node, key, value)?;
        }
        log::debug!("{}: {} attribute(s) written", node, attributes.len());
        Ok(())
    }

    fn create_group(&mut self, parent: &NodePath, name: &str, title: &str) -> SkimResult<NodePath> {
        let node = self.archive.create_group(parent, name, title)?;
        self.groups += 1;
        Ok(node)
    }

    fn read_image(&self, source: &Path) -> SkimResult<SkyImage> {
        let image = self.reader.read_raster(source)?;
        log::debug!("Read {} ({:?})", source.display(), image.dim());
        Ok(image)
    }

    fn create_image_dataset(
        &mut self,
        parent: &NodePath,
        name: &str,
        image: &SkyImage,
        title: &str,
    ) -> SkimResult<NodePath> {
        let dataset = self
            .archive
            .create_dataset(parent, name, ElementType::Float32, image.dim(), title)?;
        self.archive.write_dataset(&dataset, image)?;
        self.datasets += 1;
        Ok(dataset)
    }

    fn build_root(&mut self, attributes: &mut AttributeSets, plan: &SkimPlan) -> SkimResult<()> {
        attributes.init_header(
            GroupType::Root,
            &GroupContext::root(&plan.observation, plan.nimages()),
        )?;
        let root = self.archive.root();
        self.write_attributes(&root, &attributes.ordered_attributes(GroupType::Root))
    }

    fn build_syslog(&mut self, attributes: &mut AttributeSets) -> SkimResult<()> {
        attributes.init_header(GroupType::Syslog, &GroupContext::none())?;
        let root = self.archive.root();
        let syslog = self.create_group(&root, SYSLOG_GROUP, "Root System Log")?;
        self.write_attributes(&syslog, &attributes.ordered_attributes(GroupType::Syslog))
    }

    fn build_average_image(&mut self, plan: &SkimPlan) -> SkimResult<()> {
        let average = match &plan.average_image {
            Some(average) => average,
            None => return Ok(()),
        };
        log::info!("Got average image {}, handling", average);
        let image = self.read_image(&plan.image_path(average))?;

        let root = self.archive.root();
        let group = self.create_group(&root, AVERAGE_GROUP, "Image Sums")?;
        self.create_image_dataset(&group, AVERAGE_DATASET, &image, "Incoherent Sum Image")?;
        Ok(())
    }

    fn build_image_group(
        &mut self,
        attributes: &mut AttributeSets,
        plan: &SkimPlan,
        record: &SubBandRecord,
    ) -> SkimResult<()> {
        let source = plan.image_path(&record.source_file);
        log::info!("Attaching {} from {}", record.image_group, source.display());

        // Sources are read up front so a bad image leaves no partial groups behind
        let raster = self.read_image(&source)?;
        let header = self.reader.read_header(&source)?;

        let root = self.archive.root();
        attributes.init_header(GroupType::Image, &GroupContext::none())?;
        let image = self.create_group(&root, &record.image_group, &record.title)?;
        self.write_attributes(&image, &attributes.ordered_attributes(GroupType::Image))?;

        // skyData
        let dataset_name = record.dataset_name();
        attributes.init_header(GroupType::SkyData, &GroupContext::none())?;
        attributes.set_attr(GroupType::SkyData, "DATASETNAME", dataset_name.as_str())?;
        let data = self.create_group(&image, &record.data_group, &record.data_group)?;
        self.write_attributes(&data, &attributes.ordered_attributes(GroupType::SkyData))?;
        self.create_image_dataset(&data, &dataset_name, &raster, &record.data_group)?;

        // Coordinates
        attributes.init_header(GroupType::Coordinates, &GroupContext::none())?;
        attributes.apply_image_header(&header);
        let coords = self.create_group(&image, &record.coordinates_group, &record.coordinates_group)?;
        self.write_attributes(&coords, &attributes.ordered_attributes(GroupType::Coordinates))?;
        self.create_group(
            &coords,
            LINEAR_COORD_GROUP,
            &format!("Linear Coordinates, Subband {}", record.id),
        )?;

        // Source
        attributes.init_header(GroupType::Source, &GroupContext::none())?;
        let source_group = self.create_group(&image, &record.source_group, &record.source_group)?;
        self.write_attributes(&source_group, &attributes.ordered_attributes(GroupType::Source))?;

        // ProcessHist
        attributes.init_header(GroupType::ProcessHist, &GroupContext::none())?;
        let hist = self.create_group(&image, &record.process_hist_group, &record.process_hist_group)?;
        self.write_attributes(&hist, &attributes.ordered_attributes(GroupType::ProcessHist))?;

        Ok(())
    }
}

/// Build a complete sky image into `archive` and close it.
///
/// The archive is closed exactly once, whether the build succeeded or not;
/// the build error takes precedence over a close error.
pub fn build_sky_image<R: ImageReader, W: ArchiveWriter>(
    plan: &SkimPlan,
    config: &SkimConfig,
    reader: &R,
    archive: &mut W,
) -> SkimResult<BuildSummary> {
    let mut attributes = AttributeSets::new(config.clone());
    let result = SkimBuilder::new(reader, archive).build(&mut attributes, plan);

    if let Ok(summary) = &result {
        log::info!("Processing complete. LOFAR Sky Image file form: {}", summary);
    }

    let closed = archive.close();
    match result {
        Ok(summary) => closed.map(|_| summary),
        Err(e) => {
            if let Err(close_error) = closed {
                log::warn!("Failed to close archive after error: {}", close_error);
            }
            log::error!("Sky image build aborted: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::archive::MemoryArchive;
    use crate::io::image_reader::MemoryImageReader;
    use crate::types::{HeaderCard, SkimError};
    use ndarray::Array2;

    fn plan(images: &[&str]) -> SkimPlan {
        SkimPlan::from_image_list("/obs/L2010_00042", "2010-01-01T00:00:00", images, &SkimConfig::default())
            .unwrap()
    }

    fn reader_for(plan: &SkimPlan, files: &[&str]) -> MemoryImageReader {
        let mut reader = MemoryImageReader::new();
        for file in files {
            reader.insert(
                plan.image_path(file),
                Array2::from_elem((8, 8), 1.0),
                vec![HeaderCard::new("NAXIS", "4")],
            );
        }
        reader
    }

    #[test]
    fn test_build_order_and_counts() {
        let plan = plan(&["SB2.fits", "SB1.fits", "SB_ave.fits"]);
        let reader = reader_for(&plan, &["SB1.fits", "SB2.fits", "SB_ave.fits"]);
        let mut archive = MemoryArchive::new("LOFAR Sky Image");

        let summary = build_sky_image(&plan, &SkimConfig::default(), &reader, &mut archive).unwrap();

        assert_eq!(summary.sub_bands, 2);
        assert!(summary.average_image);
        // SysLog + AverageImages + 2 x (Image + 4 children + LinearCoord)
        assert_eq!(summary.groups, 14);
        assert_eq!(summary.datasets, 3);
        assert!(archive.node("/AverageImages/averageImage").is_some());
        assert!(!archive.is_open());
    }

    #[test]
    fn test_missing_source_aborts_and_closes() {
        let plan = plan(&["SB1.fits", "SB2.fits"]);
        let reader = reader_for(&plan, &["SB1.fits"]);
        let mut archive = MemoryArchive::new("LOFAR Sky Image");

        let result = build_sky_image(&plan, &SkimConfig::default(), &reader, &mut archive);

        assert!(matches!(result, Err(SkimError::SourceUnreadable { .. })));
        assert!(!archive.is_open());
        assert!(archive.node("/Image001/skyData/ImageDataArray_SB001").is_some());
        assert!(archive.node("/Image002").is_none());
        assert!(archive.children("/").iter().all(|child| child.as_str() != "/Image002"));
    }

    #[test]
    fn test_missing_average_image_leaves_no_group() {
        let plan = plan(&["SB1.fits", "SB_ave.fits"]);
        let reader = reader_for(&plan, &["SB1.fits"]);
        let mut archive = MemoryArchive::new("LOFAR Sky Image");

        let result = build_sky_image(&plan, &SkimConfig::default(), &reader, &mut archive);

        assert!(matches!(result, Err(SkimError::SourceUnreadable { .. })));
        assert!(archive.node("/AverageImages").is_none());
    }
}
