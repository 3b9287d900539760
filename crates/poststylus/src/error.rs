use poststylus_sourcemap::SourceMapError;
use thiserror::Error;

pub type PostStylusResult<T> = std::result::Result<T, PostStylusError>;

#[derive(Error, Debug)]
pub enum PostStylusError {
  /// A plugin given by name could not be turned into a transform
  #[error("Failed to load plugin '{specifier}': {source}")]
  ModuleResolution {
    specifier: String,
    #[source]
    source: anyhow::Error,
  },

  /// The stylus run failed before any postcss processing happened
  #[error(transparent)]
  Upstream(anyhow::Error),

  /// A postcss plugin failed, the cause chain ends at the plugin's own error
  #[error("postcss processing failed")]
  Downstream(#[source] anyhow::Error),

  #[error("Failed to parse source map")]
  MapParse(#[source] SourceMapError),

  #[error("Failed to combine source maps")]
  MapCompose(#[source] SourceMapError),
}

impl PostStylusError {
  pub fn is_upstream(&self) -> bool {
    matches!(self, PostStylusError::Upstream(_))
  }
}
