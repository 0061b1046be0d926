//! Sky image schema, naming and construction

pub mod attribute_sets;
pub mod group_names;
pub mod layout;
pub mod builder;

// Re-export main types
pub use attribute_sets::{AttributeSets, AttributeTemplate, GroupContext, ordered_keys, observation_id, sky_file_name};
pub use group_names::{GroupNames, sub_band_id, strip_sub_band_zeros};
pub use layout::{SkimPlan, initialize, list_images, output_path, results_path, split_average_image};
pub use builder::{SkimBuilder, BuildSummary, build_sky_image};
