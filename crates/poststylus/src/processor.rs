use std::path::Path;

use anyhow::Context;
use mockall::automock;
use pathdiff::diff_paths;
use poststylus_sourcemap::{merge, strip_sourcemap_url, SourceMap};

use crate::options::ProcessOptions;
use crate::plugin::TransformRef;
use crate::warning::Warning;

#[derive(Debug, Default)]
pub struct ProcessResult {
  pub css: String,
  pub warnings: Vec<Warning>,
  /// Maps `css` back to the css that was processed, only set when the options
  /// asked for a map
  pub map: Option<SourceMap>,
}

impl ProcessResult {
  pub fn warnings(&self) -> &[Warning] {
    &self.warnings
  }
}

/// The second stage, runs a list of transforms over a stylesheet
#[automock]
pub trait Postprocessor: Send + Sync {
  fn process(
    &self,
    transforms: &[TransformRef],
    css: &str,
    options: &ProcessOptions,
  ) -> anyhow::Result<ProcessResult>;
}

/// Runs each transform over the output of the previous one and chains their
/// source maps
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialProcessor;

impl Postprocessor for SequentialProcessor {
  #[tracing::instrument(level = "debug", skip_all, fields(from = %options.from.display()))]
  fn process(
    &self,
    transforms: &[TransformRef],
    css: &str,
    options: &ProcessOptions,
  ) -> anyhow::Result<ProcessResult> {
    let annotate = options.map.options().is_some_and(|o| o.annotation);
    // Only an annotation of our own may replace the one already there
    let input = if annotate {
      strip_sourcemap_url(css)
    } else {
      css
    };
    let source = source_path(&options.from, &options.to);

    let mut map = match options.map.options() {
      Some(map_options) => {
        let mut map = SourceMap::new();
        let index = map.add_identity_map(&source, input);
        if map_options.sources_content {
          map.set_source_content(index as usize, Some(input))?;
        }
        Some(map)
      }
      None => None,
    };

    let mut code = input.to_string();
    let mut warnings = Vec::new();

    for transform in transforms {
      tracing::trace!("Running {}", transform.name());

      let output = transform
        .transform(&code, options)
        .with_context(|| format!("Plugin '{}' failed", transform.name()))?;

      warnings.extend(output.warnings.into_iter().map(|warning| {
        if warning.plugin.is_none() {
          warning.plugin(transform.name())
        } else {
          warning
        }
      }));

      if let Some(current) = map.as_mut() {
        let step = match output.map {
          Some(step) => Some(step),
          None if output.css == code => None,
          None => Some(SourceMap::identity(&source, &output.css)),
        };

        if let Some(step) = step {
          *current = merge(current, &step)
            .with_context(|| format!("Plugin '{}' returned an invalid map", transform.name()))?;
        }
      }

      code = output.css;
    }

    if let Some(map) = map.as_mut() {
      let file = options
        .to
        .file_name()
        .map(|name| name.to_string_lossy().to_string());

      if annotate {
        if let Some(file) = &file {
          code.push_str(&format!("\n/*# sourceMappingURL={}.map */", file));
        }
      }

      map.set_file(file);
    }

    Ok(ProcessResult {
      css: code,
      warnings,
      map,
    })
  }
}

/// `from` relative to the directory the css will be written to
fn source_path(from: &Path, to: &Path) -> String {
  let base = to.parent().unwrap_or(Path::new(""));
  diff_paths(from, base)
    .unwrap_or_else(|| from.to_path_buf())
    .to_string_lossy()
    .replace('\\', "/")
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use anyhow::anyhow;
  use indoc::indoc;
  use poststylus_sourcemap::{Mapping, OriginalLocation};
  use pretty_assertions::assert_eq;

  use crate::options::{MapOptions, MapSetting};
  use crate::plugin::{transform_fn, TransformOutput};

  use super::*;

  const CSS: &str = indoc! {"
    .button {
      color: red;
    }
  "};

  fn options(map: MapSetting) -> ProcessOptions {
    ProcessOptions::for_file(Path::new("/project/styles/button.styl")).map(map)
  }

  fn no_annotation() -> MapSetting {
    MapSetting::Enabled(MapOptions {
      annotation: false,
      ..MapOptions::default()
    })
  }

  #[test]
  fn passes_css_through_without_transforms() -> anyhow::Result<()> {
    let result = SequentialProcessor.process(&[], CSS, &options(MapSetting::Disabled))?;

    assert_eq!(result.css, CSS);
    assert!(result.warnings().is_empty());
    assert!(result.map.is_none());

    Ok(())
  }

  #[test]
  fn emits_an_identity_map_without_transforms() -> anyhow::Result<()> {
    let result = SequentialProcessor.process(&[], CSS, &options(no_annotation()))?;
    let map = result.map.expect("map was requested");

    assert_eq!(result.css, CSS);
    assert_eq!(map.file(), Some("button.css"));
    assert_eq!(map.get_sources(), &vec![String::from("button.styl")]);
    assert_eq!(map.get_source_content(0)?, Some(CSS));
    assert_eq!(map.get_mappings(), SourceMap::identity("button.styl", CSS).get_mappings());

    Ok(())
  }

  #[test]
  fn runs_transforms_in_order() -> anyhow::Result<()> {
    let transforms = vec![
      transform_fn("first", |css, _options| Ok(TransformOutput::new(format!("{css}/* first */")))),
      transform_fn("second", |css, _options| {
        Ok(TransformOutput::new(format!("{css}/* second */")))
      }),
    ];

    let result = SequentialProcessor.process(&transforms, "a{}", &options(MapSetting::Disabled))?;

    assert_eq!(result.css, "a{}/* first *//* second */");

    Ok(())
  }

  #[test]
  fn collects_warnings_in_order() -> anyhow::Result<()> {
    let transforms = vec![
      transform_fn("lint", |css, _options| {
        Ok(
          TransformOutput::new(css)
            .warn(Warning::new("first"))
            .warn(Warning::new("second").plugin("custom")),
        )
      }),
      transform_fn("other", |css, _options| {
        Ok(TransformOutput::new(css).warn(Warning::new("third")))
      }),
    ];

    let result = SequentialProcessor.process(&transforms, CSS, &options(MapSetting::Disabled))?;

    assert_eq!(
      result.warnings(),
      &[
        Warning::new("first").plugin("lint"),
        Warning::new("second").plugin("custom"),
        Warning::new("third").plugin("other"),
      ]
    );

    Ok(())
  }

  #[test]
  fn composes_transform_maps() -> anyhow::Result<()> {
    let banner = transform_fn("banner", |css, options| {
      let mut map = SourceMap::new();
      let source = map.add_source(&options.from.to_string_lossy());
      for (line, _) in css.lines().enumerate() {
        map.add_mapping(
          line as u32 + 1,
          0,
          Some(OriginalLocation::new(line as u32, 0, source, None)),
        );
      }
      Ok(TransformOutput::new(format!("/* banner */\n{css}")).with_map(map))
    });

    let result = SequentialProcessor.process(&[banner], CSS, &options(no_annotation()))?;
    let mut map = result.map.expect("map was requested");

    assert_eq!(result.css, format!("/* banner */\n{CSS}"));
    assert_eq!(map.find_closest_mapping(0, 0), None);
    assert_eq!(
      map.find_closest_mapping(1, 3),
      Some(Mapping {
        generated_line: 1,
        generated_column: 0,
        original: Some(OriginalLocation::new(0, 0, 0, None)),
      })
    );
    assert_eq!(
      map.find_closest_mapping(3, 0),
      Some(Mapping {
        generated_line: 3,
        generated_column: 0,
        original: Some(OriginalLocation::new(2, 0, 0, None)),
      })
    );

    Ok(())
  }

  #[test]
  fn appends_an_annotation_when_asked() -> anyhow::Result<()> {
    let result = SequentialProcessor.process(
      &[],
      "a{}",
      &options(MapSetting::Enabled(MapOptions::default())),
    )?;

    assert_eq!(result.css, "a{}\n/*# sourceMappingURL=button.css.map */");

    Ok(())
  }

  #[test]
  fn keeps_an_existing_annotation_without_transforms() -> anyhow::Result<()> {
    let css = "a{}\n/*# sourceMappingURL=old.css.map */\n";

    let without_map = SequentialProcessor.process(&[], css, &options(MapSetting::Disabled))?;
    let without_annotation = SequentialProcessor.process(&[], css, &options(no_annotation()))?;

    assert_eq!(without_map.css, css);
    assert_eq!(without_annotation.css, css);

    Ok(())
  }

  #[test]
  fn replaces_an_existing_annotation_when_annotating() -> anyhow::Result<()> {
    let result = SequentialProcessor.process(
      &[],
      "a{}\n/*# sourceMappingURL=old.css.map */\n",
      &options(MapSetting::Enabled(MapOptions::default())),
    )?;

    assert_eq!(result.css, "a{}\n/*# sourceMappingURL=button.css.map */");

    Ok(())
  }

  #[test]
  fn fails_when_a_transform_fails() {
    let broken = transform_fn("broken", |_css, _options| Err(anyhow!("unexpected token")));

    let error = SequentialProcessor
      .process(&[broken], CSS, &options(MapSetting::Disabled))
      .unwrap_err();

    assert_eq!(error.to_string(), "Plugin 'broken' failed");
    assert_eq!(error.root_cause().to_string(), "unexpected token");
  }

  #[test]
  fn resolves_sources_relative_to_the_output() {
    assert_eq!(
      source_path(
        &PathBuf::from("/project/styles/button.styl"),
        &PathBuf::from("/project/styles/button.css")
      ),
      "button.styl"
    );
    assert_eq!(
      source_path(&PathBuf::from("button.styl"), &PathBuf::from("button.css")),
      "button.styl"
    );
  }
}
