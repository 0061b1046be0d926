use crate::types::{HeaderCard, SkimError, SkimResult, SkyImage};
use fitrs::{Fits, FitsData, HeaderValue, Hdu};
use ndarray::Array2;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Source of sub-band raster data and headers.
///
/// Implementations open the image on every call and release it before
/// returning, whether or not anything was read.
pub trait ImageReader {
    /// First 2-D plane of the image (rows x columns)
    fn read_raster(&self, path: &Path) -> SkimResult<SkyImage>;

    /// Header entries of the image
    fn read_header(&self, path: &Path) -> SkimResult<Vec<HeaderCard>>;
}

fn unreadable<E: std::fmt::Display>(path: &Path) -> impl FnOnce(E) -> SkimError + '_ {
    move |e| SkimError::SourceUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

const FITS_BLOCK: usize = 2880;

/// Per-axis keywords copied into the header, in card order
const AXIS_KEYWORDS: &[&str] = &["NAXIS", "CTYPE", "CRVAL", "CDELT", "CRPIX", "CROTA", "CUNIT"];

/// Image-wide keywords copied into the header when present
const IMAGE_KEYWORDS: &[&str] = &[
    "BSCALE", "BZERO", "BUNIT", "EQUINOX", "EPOCH", "RADESYS", "OBJECT", "TELESCOP", "INSTRUME",
    "OBSERVER", "DATE-OBS", "RESTFREQ", "BMAJ", "BMIN", "BPA",
];

/// Reader for the primary HDU of pipeline FITS images.
///
/// Pipeline images are 1x1xNxM cubes (Stokes, frequency, declination, right
/// ascension); the raster is the `[0, 0, :, :]` plane, i.e. the first
/// NAXIS1 x NAXIS2 values of the data unit. 2-D and 3-D images work the same.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitsImageReader;

impl FitsImageReader {
    pub fn new() -> Self {
        Self
    }

    fn primary_hdu(path: &Path) -> SkimResult<Hdu> {
        check_fits_signature(path)?;
        let fits = Fits::open(path).map_err(unreadable(path))?;
        fits.get(0).ok_or_else(|| SkimError::SourceUnreadable {
            path: path.to_path_buf(),
            reason: "no primary HDU".to_string(),
        })
    }
}

/// A FITS file starts with a full 2880-byte block whose first card is SIMPLE
fn check_fits_signature(path: &Path) -> SkimResult<()> {
    let mut block = [0u8; FITS_BLOCK];
    File::open(path)
        .and_then(|mut file| file.read_exact(&mut block))
        .map_err(unreadable(path))?;
    if !block.starts_with(b"SIMPLE  =") {
        return Err(SkimError::SourceUnreadable {
            path: path.to_path_buf(),
            reason: "not a FITS file".to_string(),
        });
    }
    Ok(())
}

fn header_text(value: &HeaderValue) -> String {
    match value {
        HeaderValue::CharacterString(s) => s.trim_end().to_string(),
        HeaderValue::Logical(b) => if *b { "T" } else { "F" }.to_string(),
        HeaderValue::IntegerNumber(i) => i.to_string(),
        HeaderValue::RealFloatingNumber(v) => v.to_string(),
        other => format!("{:?}", other),
    }
}

fn integer_card(hdu: &Hdu, key: &str) -> Option<usize> {
    match hdu.value(key) {
        Some(HeaderValue::IntegerNumber(n)) if *n >= 0 => Some(*n as usize),
        _ => None,
    }
}

fn naxis(hdu: &Hdu) -> usize {
    integer_card(hdu, "NAXIS").unwrap_or(0)
}

fn axis_length(hdu: &Hdu, axis: usize) -> Option<usize> {
    integer_card(hdu, &format!("NAXIS{}", axis))
}

/// First `rows x cols` plane of a FITS data unit (NAXIS1 varies fastest)
fn first_plane<T: Copy>(
    path: &Path,
    (rows, cols): (usize, usize),
    data: &[T],
    to_f32: impl Fn(T) -> f32,
) -> SkimResult<SkyImage> {
    let len = rows * cols;
    if data.len() < len {
        return Err(SkimError::SourceUnreadable {
            path: path.to_path_buf(),
            reason: format!("data unit holds {} values, plane needs {}", data.len(), len),
        });
    }
    let plane = data[..len].iter().map(|v| to_f32(*v)).collect();
    Array2::from_shape_vec((rows, cols), plane).map_err(unreadable(path))
}

impl ImageReader for FitsImageReader {
    fn read_raster(&self, path: &Path) -> SkimResult<SkyImage> {
        log::debug!("Reading raster from: {}", path.display());

        let hdu = Self::primary_hdu(path)?;
        let naxis = naxis(&hdu);
        let shape = match (axis_length(&hdu, 1), axis_length(&hdu, 2)) {
            (Some(cols), Some(rows)) if naxis >= 2 => (rows, cols),
            _ => {
                return Err(SkimError::SourceUnreadable {
                    path: path.to_path_buf(),
                    reason: format!("primary HDU is not an image (NAXIS = {})", naxis),
                })
            }
        };
        log::debug!("Image size: {}x{}, {} axes", shape.1, shape.0, naxis);

        let image = match hdu.read_data() {
            FitsData::FloatingPoint32(array) => first_plane(path, shape, &array.data, |v| v),
            FitsData::FloatingPoint64(array) => first_plane(path, shape, &array.data, |v| v as f32),
            FitsData::IntegersI32(array) => {
                first_plane(path, shape, &array.data, |v| v.map_or(f32::NAN, |v| v as f32))
            }
            _ => Err(SkimError::SourceUnreadable {
                path: path.to_path_buf(),
                reason: "unsupported BITPIX".to_string(),
            }),
        }?;
        // file handle is released with the HDU here
        Ok(image)
    }

    fn read_header(&self, path: &Path) -> SkimResult<Vec<HeaderCard>> {
        log::debug!("Reading header from: {}", path.display());

        let hdu = Self::primary_hdu(path)?;
        let naxis = naxis(&hdu);
        let mut cards = Vec::new();
        let mut push = |key: String| {
            if let Some(value) = hdu.value(&key) {
                cards.push(HeaderCard::new(key, header_text(value)));
            }
        };

        push("BITPIX".to_string());
        push("NAXIS".to_string());
        for prefix in AXIS_KEYWORDS {
            for axis in 1..=naxis {
                push(format!("{}{}", prefix, axis));
            }
        }
        for key in IMAGE_KEYWORDS {
            push(key.to_string());
        }
        Ok(cards)
    }
}

/// Reader for any 2-D or 3-D raster GDAL can open (GeoTIFF, 2-D FITS, ...).
/// Band 1 is the raster. GDAL's FITS driver rejects 4-D cubes, so pipeline
/// images go through [`FitsImageReader`].
#[cfg(feature = "gdal")]
#[derive(Debug, Clone, Copy, Default)]
pub struct GdalImageReader;

#[cfg(feature = "gdal")]
impl GdalImageReader {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "gdal")]
impl ImageReader for GdalImageReader {
    fn read_raster(&self, path: &Path) -> SkimResult<SkyImage> {
        use gdal::Dataset;

        log::debug!("Reading raster from: {}", path.display());

        let dataset = Dataset::open(path).map_err(unreadable(path))?;
        let (width, height) = dataset.raster_size();
        log::debug!("Image size: {}x{}, {} band(s)", width, height, dataset.raster_count());

        let band = dataset.rasterband(1).map_err(unreadable(path))?;
        let buffer = band
            .read_as::<f32>((0, 0), (width, height), (width, height), None)
            .map_err(unreadable(path))?;

        let image = Array2::from_shape_vec((height, width), buffer.data).map_err(unreadable(path))?;
        // dataset is dropped (closed) here
        Ok(image)
    }

    fn read_header(&self, path: &Path) -> SkimResult<Vec<HeaderCard>> {
        use gdal::{Dataset, Metadata};

        log::debug!("Reading header from: {}", path.display());

        let dataset = Dataset::open(path).map_err(unreadable(path))?;
        let cards = dataset
            .metadata_domain("")
            .unwrap_or_default()
            .iter()
            .filter_map(|entry| entry.split_once('='))
            .map(|(key, value)| HeaderCard::new(key.trim(), value.trim()))
            .collect();
        Ok(cards)
    }
}

/// Images held in memory, keyed by path. Used for tests and for callers that
/// already have their data loaded.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageReader {
    images: HashMap<PathBuf, (SkyImage, Vec<HeaderCard>)>,
}

impl MemoryImageReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: Into<PathBuf>>(&mut self, path: P, image: SkyImage, header: Vec<HeaderCard>) {
        self.images.insert(path.into(), (image, header));
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    fn lookup(&self, path: &Path) -> SkimResult<&(SkyImage, Vec<HeaderCard>)> {
        self.images.get(path).ok_or_else(|| SkimError::SourceUnreadable {
            path: path.to_path_buf(),
            reason: "no such image".to_string(),
        })
    }
}

impl ImageReader for MemoryImageReader {
    fn read_raster(&self, path: &Path) -> SkimResult<SkyImage> {
        Ok(self.lookup(path)?.0.clone())
    }

    fn read_header(&self, path: &Path) -> SkimResult<Vec<HeaderCard>> {
        Ok(self.lookup(path)?.1.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_reader_missing_file() {
        let reader = FitsImageReader::new();
        let result = reader.read_raster(Path::new("/nonexistent/SB1.fits"));
        assert!(matches!(result, Err(SkimError::SourceUnreadable { .. })));

        let result = reader.read_header(Path::new("/nonexistent/SB1.fits"));
        assert!(matches!(result, Err(SkimError::SourceUnreadable { .. })));
    }

    #[test]
    fn test_header_text() {
        assert_eq!(header_text(&HeaderValue::CharacterString("RA---SIN  ".to_string())), "RA---SIN");
        assert_eq!(header_text(&HeaderValue::IntegerNumber(4)), "4");
        assert_eq!(header_text(&HeaderValue::Logical(true)), "T");
    }

    #[test]
    fn test_first_plane_of_cube() {
        // 2 planes of 2 rows x 3 columns
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let plane = first_plane(Path::new("cube.fits"), (2, 3), &data, |v| v).unwrap();
        assert_eq!(plane.dim(), (2, 3));
        assert_eq!(plane[[1, 0]], 3.0);
        assert_eq!(plane[[1, 2]], 5.0);

        let short = first_plane(Path::new("cube.fits"), (4, 4), &data, |v| v);
        assert!(matches!(short, Err(SkimError::SourceUnreadable { .. })));
    }

    #[cfg(feature = "gdal")]
    #[test]
    fn test_gdal_reader_missing_file() {
        let reader = GdalImageReader::new();
        let result = reader.read_raster(Path::new("/nonexistent/SB1.tif"));
        assert!(matches!(result, Err(SkimError::SourceUnreadable { .. })));
    }

    #[test]
    fn test_memory_reader() {
        let mut reader = MemoryImageReader::new();
        reader.insert(
            "/results/SB1.fits",
            Array2::from_elem((4, 3), 1.5),
            vec![HeaderCard::new("NAXIS", "2")],
        );

        let image = reader.read_raster(Path::new("/results/SB1.fits")).unwrap();
        assert_eq!(image.dim(), (4, 3));
        let header = reader.read_header(Path::new("/results/SB1.fits")).unwrap();
        assert_eq!(header[0].key, "NAXIS");
        assert!(matches!(
            reader.read_raster(Path::new("/results/SB2.fits")),
            Err(SkimError::SourceUnreadable { .. })
        ));
    }
}
