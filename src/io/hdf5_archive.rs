use crate::io::archive::{ArchiveWriter, NodePath};
use crate::types::{AttrValue, ElementType, SkimError, SkimResult, SkyImage};
use hdf5::types::VarLenUnicode;
use hdf5::{File, Group, Location};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Attribute holding a node's human readable title, as PyTables writes it
pub const TITLE_ATTR: &str = "TITLE";

fn write_failed(e: hdf5::Error) -> SkimError {
    SkimError::ArchiveWrite(e.to_string())
}

fn to_var_len_unicode(value: &str) -> SkimResult<VarLenUnicode> {
    value
        .parse::<VarLenUnicode>()
        .map_err(|e| SkimError::ArchiveWrite(format!("invalid string attribute '{}': {}", value, e)))
}

fn write_attr(location: &Location, key: &str, value: &AttrValue) -> SkimResult<()> {
    match value {
        AttrValue::Text(s) => {
            let s = to_var_len_unicode(s)?;
            location
                .new_attr::<VarLenUnicode>()
                .create(key)
                .and_then(|attr| attr.write_scalar(&s))
                .map_err(write_failed)
        }
        AttrValue::Null => write_attr(location, key, &AttrValue::empty()),
        AttrValue::Integer(i) => location
            .new_attr::<i64>()
            .create(key)
            .and_then(|attr| attr.write_scalar(i))
            .map_err(write_failed),
        AttrValue::Float(v) => location
            .new_attr::<f64>()
            .create(key)
            .and_then(|attr| attr.write_scalar(v))
            .map_err(write_failed),
    }
}

/// Sky image archive backed by an HDF5 file.
///
/// Attributes are written in the order they are set, but the file does not
/// track attribute creation order, so HDF5 readers list them by name. The
/// ICD order is carried by the writer, not by the file.
pub struct Hdf5Archive {
    path: PathBuf,
    file: Option<File>,
    datasets: HashSet<NodePath>,
}

impl Hdf5Archive {
    /// Create (truncate) the archive file and title its root group
    pub fn create<P: AsRef<Path>>(path: P, title: &str) -> SkimResult<Self> {
        let path = path.as_ref().to_path_buf();
        log::info!("Creating sky image {}", path.display());

        let file = File::create(&path).map_err(|e| {
            SkimError::WriteTargetUnavailable(format!("cannot create {}: {}", path.display(), e))
        })?;
        write_attr(&file, TITLE_ATTR, &AttrValue::text(title))?;

        Ok(Self {
            path,
            file: Some(file),
            datasets: HashSet::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&self) -> SkimResult<&File> {
        self.file.as_ref().ok_or_else(|| {
            SkimError::WriteTargetUnavailable(format!("{} is closed", self.path.display()))
        })
    }

    fn group(&self, node: &NodePath) -> SkimResult<Group> {
        self.file()?.group(node.as_str()).map_err(write_failed)
    }
}

impl ArchiveWriter for Hdf5Archive {
    fn create_group(&mut self, parent: &NodePath, name: &str, title: &str) -> SkimResult<NodePath> {
        let group = self.group(parent)?.create_group(name).map_err(write_failed)?;
        write_attr(&group, TITLE_ATTR, &AttrValue::text(title))?;
        Ok(parent.child(name))
    }

    fn create_dataset(
        &mut self,
        parent: &NodePath,
        name: &str,
        element: ElementType,
        shape: (usize, usize),
        title: &str,
    ) -> SkimResult<NodePath> {
        let group = self.group(parent)?;
        let dataset = match element {
            ElementType::Float32 => group.new_dataset::<f32>().shape(shape).create(name),
        }
        .map_err(write_failed)?;
        write_attr(&dataset, TITLE_ATTR, &AttrValue::text(title))?;

        let path = parent.child(name);
        self.datasets.insert(path.clone());
        Ok(path)
    }

    fn write_dataset(&mut self, dataset: &NodePath, data: &SkyImage) -> SkimResult<()> {
        let dataset = self.file()?.dataset(dataset.as_str()).map_err(write_failed)?;
        dataset.write(data).map_err(write_failed)
    }

    fn set_attribute(&mut self, node: &NodePath, key: &str, value: &AttrValue) -> SkimResult<()> {
        let file = self.file()?;
        if self.datasets.contains(node) {
            let dataset = file.dataset(node.as_str()).map_err(write_failed)?;
            write_attr(&dataset, key, value)
        } else {
            let group = file.group(node.as_str()).map_err(write_failed)?;
            write_attr(&group, key, value)
        }
    }

    fn close(&mut self) -> SkimResult<()> {
        match self.file.take() {
            Some(file) => {
                file.flush().map_err(write_failed)?;
                drop(file);
                log::debug!("Closed {}", self.path.display());
                Ok(())
            }
            None => Err(SkimError::WriteTargetUnavailable(format!(
                "{} is already closed",
                self.path.display()
            ))),
        }
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }
}
