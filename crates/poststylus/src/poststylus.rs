use std::fmt;
use std::path::Path;
use std::sync::Arc;

use poststylus_sourcemap::{merge, SourceMap};
use serde_json::Value;

use crate::error::{PostStylusError, PostStylusResult};
use crate::options::{MapOptions, MapSetting, ProcessOptions};
use crate::plugin::{normalize, PluginSpec, TransformRef};
use crate::plugin_resolver::PluginResolver;
use crate::processor::{Postprocessor, SequentialProcessor};
use crate::stylus::{EndEvent, EndHandler, StylusRun};
use crate::warning::{default_warning_sink, WarningSink};

/// Hooks a postcss pipeline onto the end of stylus runs
///
/// The plugins are resolved once, when the adapter is created. The adapter
/// itself can then be applied to any number of runs.
#[derive(Clone)]
pub struct PostStylus {
  transforms: Arc<[TransformRef]>,
  warn: WarningSink,
  processor: Arc<dyn Postprocessor>,
}

impl fmt::Debug for PostStylus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PostStylus")
      .field("transforms", &self.transforms)
      .finish_non_exhaustive()
  }
}

impl PostStylus {
  pub fn new(
    spec: impl Into<PluginSpec>,
    resolver: &dyn PluginResolver,
  ) -> PostStylusResult<Self> {
    let transforms = normalize(spec.into(), resolver)?;

    Ok(PostStylus {
      transforms: transforms.into(),
      warn: default_warning_sink(),
      processor: Arc::new(SequentialProcessor),
    })
  }

  pub fn with_warning_sink(mut self, warn: WarningSink) -> Self {
    self.warn = warn;
    self
  }

  /// Replaces the postcss runner, mostly useful to observe what it receives
  pub fn with_processor(mut self, processor: Arc<dyn Postprocessor>) -> Self {
    self.processor = processor;
    self
  }

  pub fn transforms(&self) -> &[TransformRef] {
    &self.transforms
  }

  /// Registers the postcss step on `run`
  pub fn apply(&self, run: &mut dyn StylusRun) {
    let adapter = self.clone();
    let filename = run.filename().to_path_buf();

    run.on_end(EndHandler::new(move |event| {
      adapter.handle_end(&filename, event)
    }));
  }

  #[tracing::instrument(level = "debug", skip_all, fields(filename = %filename.display()))]
  fn handle_end(&self, filename: &Path, event: EndEvent<'_>) -> PostStylusResult<String> {
    let EndEvent {
      error,
      css,
      sourcemap,
    } = event;

    if let Some(error) = error {
      return Err(PostStylusError::Upstream(error));
    }

    let map = if sourcemap.is_some() {
      MapSetting::Enabled(MapOptions {
        annotation: false,
        sources_content: true,
      })
    } else {
      MapSetting::Disabled
    };

    let options = ProcessOptions::for_file(filename).map(map);
    let result = self
      .processor
      .process(&self.transforms, &css, &options)
      .map_err(PostStylusError::Downstream)?;

    let merged = match (sourcemap.as_ref(), result.map.as_ref()) {
      (Some(upstream), Some(downstream)) => Some(merge_source_maps(upstream, downstream)?),
      _ => None,
    };

    if let Some(merged) = merged {
      *sourcemap = Some(merged);
    }

    tracing::debug!("Delivering {} warnings", result.warnings().len());
    for warning in result.warnings() {
      (self.warn)(warning);
    }

    Ok(result.css)
  }
}

/// Creates an adapter that logs warnings through `tracing` unless a sink is given
pub fn poststylus(
  spec: impl Into<PluginSpec>,
  resolver: &dyn PluginResolver,
  warn: Option<WarningSink>,
) -> PostStylusResult<PostStylus> {
  let adapter = PostStylus::new(spec, resolver)?;

  Ok(match warn {
    Some(warn) => adapter.with_warning_sink(warn),
    None => adapter,
  })
}

/// Chains the map of a stylus run with the map of the postcss pass over its
/// output, so the result points straight at the `.styl` source
pub fn merge_source_maps(upstream: &Value, downstream: &SourceMap) -> PostStylusResult<Value> {
  let upstream = SourceMap::from_json_value(upstream).map_err(PostStylusError::MapParse)?;

  compose(&upstream, downstream)
}

fn compose(upstream: &SourceMap, downstream: &SourceMap) -> PostStylusResult<Value> {
  let mut merged = merge(upstream, downstream).map_err(PostStylusError::MapCompose)?;

  merged.to_json_value().map_err(PostStylusError::MapCompose)
}
