mod find_source_map_url;
mod mapping;
mod mapping_line;
mod merge;
mod source_map;
mod sourcemap_error;
mod vlq_utils;

pub use find_source_map_url::strip_sourcemap_url;
pub use mapping::{Mapping, OriginalLocation};
pub use merge::merge;
pub use source_map::SourceMap;
pub use sourcemap_error::{SourceMapError, SourceMapErrorType};
