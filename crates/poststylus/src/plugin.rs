use std::fmt::{self, Debug};
use std::sync::Arc;

use poststylus_sourcemap::SourceMap;

use crate::error::PostStylusError;
use crate::options::ProcessOptions;
use crate::plugin_resolver::PluginResolver;
use crate::warning::Warning;

pub type TransformRef = Arc<dyn Transform>;

#[derive(Debug, Default)]
pub struct TransformOutput {
  pub css: String,
  pub warnings: Vec<Warning>,
  /// Maps `css` back to the css the transform received
  pub map: Option<SourceMap>,
}

impl TransformOutput {
  pub fn new(css: impl Into<String>) -> Self {
    TransformOutput {
      css: css.into(),
      ..TransformOutput::default()
    }
  }

  pub fn warn(mut self, warning: Warning) -> Self {
    self.warnings.push(warning);
    self
  }

  pub fn with_map(mut self, map: SourceMap) -> Self {
    self.map = Some(map);
    self
  }
}

/// A single postcss plugin
///
/// Transforms receive the css produced by the previous transform (or by stylus
/// for the first one) and return the rewritten css. A transform that moves
/// content around should return a map from its output back to its input,
/// otherwise positions are assumed to be unchanged.
pub trait Transform: Debug + Send + Sync {
  fn name(&self) -> &str;

  fn transform(&self, css: &str, options: &ProcessOptions) -> anyhow::Result<TransformOutput>;
}

type TransformCallback = dyn Fn(&str, &ProcessOptions) -> anyhow::Result<TransformOutput> + Send + Sync;

pub struct FnTransform {
  name: String,
  callback: Box<TransformCallback>,
}

impl Debug for FnTransform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FnTransform").field("name", &self.name).finish()
  }
}

impl Transform for FnTransform {
  fn name(&self) -> &str {
    &self.name
  }

  fn transform(&self, css: &str, options: &ProcessOptions) -> anyhow::Result<TransformOutput> {
    (self.callback)(css, options)
  }
}

/// Builds a transform from a closure
pub fn transform_fn<F>(name: impl Into<String>, callback: F) -> TransformRef
where
  F: Fn(&str, &ProcessOptions) -> anyhow::Result<TransformOutput> + Send + Sync + 'static,
{
  Arc::new(FnTransform {
    name: name.into(),
    callback: Box::new(callback),
  })
}

#[derive(Clone, Debug)]
pub enum PluginEntry {
  Transform(TransformRef),
  /// The name of a plugin that the resolver knows how to construct
  Module(String),
}

impl From<TransformRef> for PluginEntry {
  fn from(transform: TransformRef) -> Self {
    PluginEntry::Transform(transform)
  }
}

impl From<&str> for PluginEntry {
  fn from(specifier: &str) -> Self {
    PluginEntry::Module(specifier.to_string())
  }
}

impl From<String> for PluginEntry {
  fn from(specifier: String) -> Self {
    PluginEntry::Module(specifier)
  }
}

/// The plugins to run, either a single one or an ordered list
#[derive(Clone, Debug)]
pub enum PluginSpec {
  Single(PluginEntry),
  Many(Vec<PluginEntry>),
}

impl Default for PluginSpec {
  fn default() -> Self {
    PluginSpec::Many(Vec::new())
  }
}

impl PluginSpec {
  pub fn len(&self) -> usize {
    match self {
      PluginSpec::Single(_) => 1,
      PluginSpec::Many(entries) => entries.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl From<PluginEntry> for PluginSpec {
  fn from(entry: PluginEntry) -> Self {
    PluginSpec::Single(entry)
  }
}

impl From<TransformRef> for PluginSpec {
  fn from(transform: TransformRef) -> Self {
    PluginSpec::Single(PluginEntry::Transform(transform))
  }
}

/// An empty name means no plugins at all
impl From<&str> for PluginSpec {
  fn from(specifier: &str) -> Self {
    if specifier.is_empty() {
      PluginSpec::default()
    } else {
      PluginSpec::Single(PluginEntry::from(specifier))
    }
  }
}

impl<T: Into<PluginEntry>> From<Vec<T>> for PluginSpec {
  fn from(entries: Vec<T>) -> Self {
    PluginSpec::Many(entries.into_iter().map(Into::into).collect())
  }
}

impl<T: Into<PluginSpec>> From<Option<T>> for PluginSpec {
  fn from(spec: Option<T>) -> Self {
    spec.map(Into::into).unwrap_or_default()
  }
}

/// Turns every entry of `spec` into a ready to run transform, keeping the order
pub fn normalize(
  spec: PluginSpec,
  resolver: &dyn PluginResolver,
) -> Result<Vec<TransformRef>, PostStylusError> {
  match spec {
    PluginSpec::Single(entry) => Ok(vec![load_plugin(entry, resolver)?]),
    PluginSpec::Many(entries) => entries
      .into_iter()
      .map(|entry| load_plugin(entry, resolver))
      .collect(),
  }
}

fn load_plugin(
  entry: PluginEntry,
  resolver: &dyn PluginResolver,
) -> Result<TransformRef, PostStylusError> {
  match entry {
    PluginEntry::Transform(transform) => Ok(transform),
    PluginEntry::Module(specifier) => {
      let factory =
        resolver
          .resolve(&specifier)
          .map_err(|source| PostStylusError::ModuleResolution {
            specifier: specifier.clone(),
            source,
          })?;

      let transform = factory().map_err(|source| PostStylusError::ModuleResolution {
        specifier: specifier.clone(),
        source,
      })?;

      tracing::debug!("Loaded plugin '{}' as {}", specifier, transform.name());
      Ok(transform)
    }
  }
}
