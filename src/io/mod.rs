//! I/O modules for reading sub-band images and writing sky image archives

pub mod image_reader;
pub mod archive;
#[cfg(feature = "hdf5")]
pub mod hdf5_archive;

pub use image_reader::{FitsImageReader, ImageReader, MemoryImageReader};
#[cfg(feature = "gdal")]
pub use image_reader::GdalImageReader;
pub use archive::{ArchiveWriter, MemoryArchive, MemoryNode, MemoryNodeKind, NodePath};
#[cfg(feature = "hdf5")]
pub use hdf5_archive::Hdf5Archive;
