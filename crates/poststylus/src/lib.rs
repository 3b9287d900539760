//! Runs the css produced by stylus through a chain of postcss plugins and
//! merges the source maps of both passes.

mod config;
mod error;
mod options;
mod plugin;
mod plugin_resolver;
mod poststylus;
mod processor;
mod stylus;
mod warning;

pub use config::{PluginConfig, PostStylusConfig};
pub use error::{PostStylusError, PostStylusResult};
pub use options::{MapOptions, MapSetting, ProcessOptions};
pub use plugin::{normalize, transform_fn, PluginEntry, PluginSpec, Transform, TransformOutput, TransformRef};
pub use plugin_resolver::{MockPluginResolver, PluginFactory, PluginRegistry, PluginResolver};
pub use poststylus::{merge_source_maps, poststylus, PostStylus};
pub use processor::{MockPostprocessor, Postprocessor, ProcessResult, SequentialProcessor};
pub use stylus::{EndEvent, EndHandler, StylusRun};
pub use warning::{default_warning_sink, Warning, WarningSink};

pub use poststylus_sourcemap as sourcemap;
