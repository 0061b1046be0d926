use crate::types::{SkimError, SkimResult, SubBandRecord};
use std::path::Path;

/// File name recorded for sub-band 000, the pipeline's un-numbered primary image
pub const PRIMARY_SUB_BAND_FILE: &str = "SB0.fits";

/// Builds the group names of every sub-band image in a sky image file.
///
/// Pipeline images are named like `SB0.fits`, `SB09.fits`, `SB243.fits`. Their
/// trailing digits are zero-filled to three characters (`000`, `009`, `243`) so
/// that the sub-band groups sort and iterate in numeric order.
#[derive(Debug, Clone)]
pub struct GroupNames {
    image_list: Vec<String>,
}

impl GroupNames {
    pub fn new<S: AsRef<str>>(image_list: &[S]) -> Self {
        Self {
            image_list: image_list.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    pub fn nimages(&self) -> usize {
        self.image_list.len()
    }

    /// Sub-band ids sorted ascending, each paired with the file it came from
    fn sorted_ids(&self) -> SkimResult<Vec<(String, &str)>> {
        let mut ids = self
            .image_list
            .iter()
            .map(|file| Ok((sub_band_id(file)?, file.as_str())))
            .collect::<SkimResult<Vec<_>>>()?;
        ids.sort();

        if let Some(pair) = ids.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(SkimError::DuplicateSubBandId {
                id: pair[0].0.clone(),
                first: pair[0].1.to_string(),
                second: pair[1].1.to_string(),
            });
        }

        Ok(ids)
    }

    /// Sorted, zero-filled sub-band ids ("000", "007", "021", ...)
    pub fn sub_band_list(&self) -> SkimResult<Vec<String>> {
        Ok(self.sorted_ids()?.into_iter().map(|(id, _)| id).collect())
    }

    /// Group name records for all sub-bands, in sub-band order
    pub fn make_group_names(&self) -> SkimResult<Vec<SubBandRecord>> {
        let records: Vec<SubBandRecord> = self
            .sorted_ids()?
            .into_iter()
            .map(|(id, file)| sub_band_record(&id, file))
            .collect();

        log::debug!(
            "Derived {} sub-band groups: {:?}",
            records.len(),
            records.iter().map(|r| r.sub_band_group.as_str()).collect::<Vec<_>>()
        );
        Ok(records)
    }
}

/// Zero-filled three digit sub-band id from an image file name.
///
/// The extension is dropped and the last three characters of the remaining
/// name are examined; the digits among them are kept in order. The final
/// character must be a digit.
pub fn sub_band_id(file_name: &str) -> SkimResult<String> {
    let stem = file_stem(file_name);
    let tail: Vec<char> = {
        let mut last: Vec<char> = stem.chars().rev().take(3).collect();
        last.reverse();
        last
    };

    match tail.last() {
        Some(c) if c.is_ascii_digit() => {}
        _ => return Err(SkimError::NoSubBandIdFound(file_name.to_string())),
    }

    let digits: String = tail.iter().filter(|c| c.is_ascii_digit()).collect();
    Ok(format!("{:0>3}", digits))
}

/// Name of the image to open for a sub-band: `SB0.fits` for sub-band 000,
/// otherwise the discovered name with the zero fill removed from its number
pub fn source_file_name(id: &str, file_name: &str) -> String {
    if id == "000" {
        PRIMARY_SUB_BAND_FILE.to_string()
    } else {
        strip_sub_band_zeros(file_name)
    }
}

/// Remove leading zeros from the trailing number of a file name: `im042.fits` -> `im42.fits`
pub fn strip_sub_band_zeros(file_name: &str) -> String {
    let base = base_name(file_name);
    let (stem, extension) = match base.find('.') {
        Some(pos) => base.split_at(pos),
        None => (base, ""),
    };

    let prefix = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    let number = &stem[prefix.len()..];
    let stripped = number.trim_start_matches('0');
    let stripped = if stripped.is_empty() && !number.is_empty() {
        "0"
    } else {
        stripped
    };

    format!("{}{}{}", prefix, stripped, extension)
}

fn sub_band_record(id: &str, file_name: &str) -> SubBandRecord {
    SubBandRecord {
        id: id.to_string(),
        sub_band_group: format!("SB{}", id),
        image_group: format!("Image{}", id),
        title: format!("Sub-band {}", id),
        data_group: "skyData".to_string(),
        coordinates_group: "Coordinates".to_string(),
        source_group: "Source".to_string(),
        process_hist_group: "ProcessHist".to_string(),
        source_file: source_file_name(id, file_name),
    }
}

fn base_name(file_name: &str) -> &str {
    Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file_name)
}

fn file_stem(file_name: &str) -> &str {
    let base = base_name(file_name);
    base.split('.').next().unwrap_or(base)
}
