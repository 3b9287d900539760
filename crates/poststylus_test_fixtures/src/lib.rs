use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use poststylus::{
  transform_fn, EndEvent, EndHandler, PluginRegistry, PostStylusError, PostStylusResult,
  StylusRun, TransformOutput, TransformRef, Warning,
};
use poststylus_sourcemap::{OriginalLocation, SourceMap};
use serde_json::Value;

// Re-export indoc for convenience in tests
pub use indoc::indoc;

/// The name `registry()` knows the uppercase selector plugin by
pub const MOCK_MODULE: &str = "mock-module";

/// Text raised by the `warn(true)` plugin
pub const MOCK_WARNING: &str = "Something went wrong";

/// Reads fixture files from a directory
#[derive(Clone, Debug)]
pub struct Fixtures {
  dirname: PathBuf,
}

impl Fixtures {
  pub fn new(dirname: impl Into<PathBuf>) -> Self {
    Fixtures {
      dirname: dirname.into(),
    }
  }

  pub fn path(&self, name: &str) -> PathBuf {
    self.dirname.join(name)
  }

  pub fn read(&self, name: &str) -> anyhow::Result<String> {
    let path = self.path(name);
    fs::read_to_string(&path).with_context(|| format!("Failed to read fixture {}", path.display()))
  }

  /// A renderer for the `.styl` fixture `name`
  pub fn renderer(&self, name: &str) -> anyhow::Result<Renderer> {
    Ok(Renderer::new(self.read(name)?, self.path(name)))
  }
}

/// The css and map produced by the stub renderer alone
#[derive(Debug)]
pub struct Compiled {
  pub css: String,
  pub map: SourceMap,
}

/// The final result of a render, after every end handler ran
#[derive(Debug)]
pub struct Rendered {
  pub css: String,
  pub sourcemap: Option<Value>,
}

/// A stand in for a stylus render
///
/// Understands a tiny subset of the indented syntax: selectors start at the
/// first column, properties are indented and separated from their value by
/// whitespace. Lines starting with `//` are ignored.
///
/// ```text
/// .button
///   color red
/// ```
///
/// renders to
///
/// ```text
/// .button {
///   color: red;
/// }
/// ```
#[derive(Debug)]
pub struct Renderer {
  source: String,
  filename: PathBuf,
  sourcemap: bool,
  handlers: Vec<EndHandler>,
}

impl Renderer {
  pub fn new(source: impl Into<String>, filename: impl Into<PathBuf>) -> Self {
    Renderer {
      source: source.into(),
      filename: filename.into(),
      sourcemap: false,
      handlers: Vec::new(),
    }
  }

  /// Makes the render produce a source map, like stylus' `sourcemap` option
  pub fn with_sourcemap(mut self) -> Self {
    self.sourcemap = true;
    self
  }

  pub fn compile(&self) -> anyhow::Result<Compiled> {
    let source_name = self
      .filename
      .file_name()
      .map(|name| name.to_string_lossy().to_string())
      .unwrap_or_default();

    let mut map = SourceMap::new();
    let source = map.add_source(&source_name);
    map.set_source_content(source as usize, Some(self.source.as_str()))?;
    map.set_file(Some(Path::new(&source_name).with_extension("css").to_string_lossy().to_string()));

    let mut css = String::new();
    let mut output_line = 0;
    let mut rule: Option<Rule> = None;

    for (line_index, line) in self.source.lines().enumerate() {
      let line_index = line_index as u32;
      let trimmed = line.trim();

      if trimmed.is_empty() || trimmed.starts_with("//") {
        continue;
      }

      let indent = line.chars().count() - line.trim_start().chars().count();
      if indent == 0 {
        if let Some(rule) = rule.take() {
          rule.write(&mut css, &mut map, &mut output_line, source);
        }
        rule = Some(Rule::new(trimmed, line_index));
        continue;
      }

      let Some(current) = rule.as_mut() else {
        return Err(self.syntax_error(line_index, "expected selector, got indent"));
      };

      let (property, rest) = trimmed
        .split_once(char::is_whitespace)
        .ok_or_else(|| self.syntax_error(line_index, "expected value"))?;
      let value = rest.trim_start();
      let value_column = (line.trim_end().chars().count() - value.chars().count()) as u32;

      current.declarations.push(Declaration {
        property: property.to_string(),
        value: value.to_string(),
        line: line_index,
        column: indent as u32,
        value_column,
      });
    }

    if let Some(rule) = rule.take() {
      rule.write(&mut css, &mut map, &mut output_line, source);
    }

    Ok(Compiled { css, map })
  }

  fn syntax_error(&self, line_index: u32, message: &str) -> anyhow::Error {
    anyhow!("{}:{}: {}", self.filename.display(), line_index + 1, message)
  }

  fn first_stage(&self) -> anyhow::Result<(String, Option<Value>)> {
    let Compiled { css, mut map } = self.compile()?;
    let sourcemap = if self.sourcemap {
      Some(map.to_json_value()?)
    } else {
      None
    };

    Ok((css, sourcemap))
  }

  /// Compiles the source and hands the result to every end handler in turn
  pub fn render(self) -> PostStylusResult<Rendered> {
    let (mut error, mut css, mut sourcemap) = match self.first_stage() {
      Ok((css, sourcemap)) => (None, css, sourcemap),
      Err(error) => (Some(error), String::new(), None),
    };

    for handler in self.handlers {
      css = handler.call(EndEvent {
        error: error.take(),
        css,
        sourcemap: &mut sourcemap,
      })?;
    }

    if let Some(error) = error {
      return Err(PostStylusError::Upstream(error));
    }

    Ok(Rendered { css, sourcemap })
  }
}

impl StylusRun for Renderer {
  fn filename(&self) -> &Path {
    &self.filename
  }

  fn on_end(&mut self, handler: EndHandler) {
    self.handlers.push(handler);
  }
}

#[derive(Debug)]
struct Declaration {
  property: String,
  value: String,
  line: u32,
  column: u32,
  value_column: u32,
}

#[derive(Debug)]
struct Rule {
  selector: String,
  line: u32,
  declarations: Vec<Declaration>,
}

impl Rule {
  fn new(selector: &str, line: u32) -> Self {
    Rule {
      selector: selector.to_string(),
      line,
      declarations: Vec::new(),
    }
  }

  fn write(self, css: &mut String, map: &mut SourceMap, output_line: &mut u32, source: u32) {
    // Rules without declarations produce no output
    if self.declarations.is_empty() {
      return;
    }

    map.add_mapping(
      *output_line,
      0,
      Some(OriginalLocation::new(self.line, 0, source, None)),
    );
    css.push_str(&format!("{} {{\n", self.selector));
    *output_line += 1;

    for declaration in self.declarations {
      map.add_mapping(
        *output_line,
        2,
        Some(OriginalLocation::new(declaration.line, declaration.column, source, None)),
      );
      map.add_mapping(
        *output_line,
        declaration.property.chars().count() as u32 + 4,
        Some(OriginalLocation::new(declaration.line, declaration.value_column, source, None)),
      );
      css.push_str(&format!("  {}: {};\n", declaration.property, declaration.value));
      *output_line += 1;
    }

    css.push_str("}\n");
    *output_line += 1;
  }
}

/// Uppercases every selector, keeping all positions intact
pub fn uppercase_selectors() -> TransformRef {
  transform_fn("mock-uppercase-selectors", |css, _options| {
    let output = css
      .split_inclusive('\n')
      .map(|line| match line.split_once('{') {
        Some((selector, rest)) if !line.starts_with(char::is_whitespace) => {
          format!("{}{{{}", selector.to_uppercase(), rest)
        }
        _ => line.to_string(),
      })
      .collect::<String>();

    Ok(TransformOutput::new(output))
  })
}

/// Leaves the css alone and raises a warning when `raise` is set
pub fn warn(raise: bool) -> TransformRef {
  transform_fn("mock-warn", move |css, _options| {
    let output = TransformOutput::new(css);
    if raise {
      Ok(output.warn(Warning::new(MOCK_WARNING).at(1, 1)))
    } else {
      Ok(output)
    }
  })
}

/// Inserts a comment line above the css and maps the shifted content back
pub fn banner(text: &'static str) -> TransformRef {
  transform_fn("mock-banner", move |css, _options| {
    let mut map = SourceMap::new();
    let source = map.add_source("input.css");

    for mapping in SourceMap::identity("input.css", css).get_mappings() {
      if let Some(original) = mapping.original {
        map.add_mapping(
          mapping.generated_line + 1,
          mapping.generated_column,
          Some(OriginalLocation::new(
            original.original_line,
            original.original_column,
            source,
            None,
          )),
        );
      }
    }

    Ok(TransformOutput::new(format!("/* {} */\n{}", text, css)).with_map(map))
  })
}

/// Always fails, like a plugin choking on its input
pub fn broken() -> TransformRef {
  transform_fn("mock-broken", |_css, _options| Err(anyhow!("Unknown word")))
}

/// A resolver that knows `MOCK_MODULE`
pub fn registry() -> PluginRegistry {
  let mut registry = PluginRegistry::new();
  registry.register(MOCK_MODULE, || Ok(uppercase_selectors()));
  registry
}
