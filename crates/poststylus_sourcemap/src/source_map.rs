use std::io;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mapping::{Mapping, OriginalLocation};
use crate::mapping_line::MappingLine;
use crate::sourcemap_error::{SourceMapError, SourceMapErrorType};
use crate::vlq_utils::{is_mapping_separator, read_relative_vlq};

/// A version 3 source map held in decoded form.
///
/// Mappings are grouped per generated line and every position is 0 based, the
/// same way they are encoded in the `mappings` field.
#[derive(Clone, Debug, Default)]
pub struct SourceMap {
  file: Option<String>,
  sources: Vec<String>,
  sources_content: Vec<Option<String>>,
  names: Vec<String>,
  mapping_lines: Vec<MappingLine>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonSourceMapInput {
  #[serde(default)]
  file: Option<String>,
  mappings: String,
  sources: Vec<String>,
  #[serde(default)]
  sources_content: Vec<Option<String>>,
  #[serde(default)]
  names: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSourceMapOutput<'a> {
  version: u8,
  #[serde(skip_serializing_if = "Option::is_none")]
  file: Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  source_root: Option<&'a str>,
  sources: &'a [String],
  sources_content: &'a [Option<String>],
  names: &'a [String],
  mappings: &'a str,
}

impl SourceMap {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn file(&self) -> Option<&str> {
    self.file.as_deref()
  }

  pub fn set_file(&mut self, file: Option<String>) {
    self.file = file;
  }

  fn ensure_lines(&mut self, generated_line: usize) {
    if self.mapping_lines.len() <= generated_line {
      self
        .mapping_lines
        .resize_with(generated_line + 1, MappingLine::new);
    }
  }

  pub fn add_mapping(
    &mut self,
    generated_line: u32,
    generated_column: u32,
    original: Option<OriginalLocation>,
  ) {
    self.ensure_lines(generated_line as usize);
    self.mapping_lines[generated_line as usize].add_mapping(generated_column, original);
  }

  /// Looks up the mapping that covers a generated position.
  ///
  /// Only mappings on the same generated line are considered and the one with
  /// the greatest column that is lower than or equal to `generated_column`
  /// wins.
  pub fn find_closest_mapping(
    &mut self,
    generated_line: u32,
    generated_column: u32,
  ) -> Option<Mapping> {
    let line = self.mapping_lines.get_mut(generated_line as usize)?;
    let line_mapping = line.find_closest_mapping(generated_column)?;

    Some(Mapping {
      generated_line,
      generated_column: line_mapping.generated_column,
      original: line_mapping.original,
    })
  }

  pub fn get_mappings(&self) -> Vec<Mapping> {
    let mut mappings = Vec::new();
    for (generated_line, mapping_line) in self.mapping_lines.iter().enumerate() {
      let mut line = mapping_line.mappings.clone();
      line.sort_by_key(|m| m.generated_column);
      for mapping in line {
        mappings.push(Mapping {
          generated_line: generated_line as u32,
          generated_column: mapping.generated_column,
          original: mapping.original,
        });
      }
    }
    mappings
  }

  pub fn add_source(&mut self, source: &str) -> u32 {
    match self.sources.iter().position(|s| source == s) {
      Some(i) => i as u32,
      None => {
        self.sources.push(String::from(source));
        (self.sources.len() - 1) as u32
      }
    }
  }

  pub fn get_sources(&self) -> &Vec<String> {
    &self.sources
  }

  pub fn add_name(&mut self, name: &str) -> u32 {
    match self.names.iter().position(|n| name == n) {
      Some(i) => i as u32,
      None => {
        self.names.push(String::from(name));
        (self.names.len() - 1) as u32
      }
    }
  }

  pub fn get_names(&self) -> &Vec<String> {
    &self.names
  }

  pub fn set_source_content(
    &mut self,
    source_index: usize,
    source_content: Option<&str>,
  ) -> Result<(), SourceMapError> {
    if source_index >= self.sources.len() {
      return Err(SourceMapError::new(SourceMapErrorType::SourceOutOfRange));
    }

    if self.sources_content.len() <= source_index {
      self.sources_content.resize(source_index + 1, None);
    }

    self.sources_content[source_index] = source_content.map(String::from);
    Ok(())
  }

  pub fn get_source_content(&self, index: u32) -> Result<Option<&str>, SourceMapError> {
    if index as usize >= self.sources.len() {
      return Err(SourceMapError::new(SourceMapErrorType::SourceOutOfRange));
    }

    Ok(
      self
        .sources_content
        .get(index as usize)
        .and_then(|content| content.as_deref()),
    )
  }

  /// Maps `content` onto itself: every token start in the generated output
  /// points at the same line and column in `source`.
  pub fn add_identity_map(&mut self, source: &str, content: &str) -> u32 {
    let source_index = self.add_source(source);

    for (line_index, line) in content.split('\n').enumerate() {
      let mut previous: Option<char> = None;
      for (column, ch) in line.chars().enumerate() {
        if is_token_start(previous, ch) {
          self.add_mapping(
            line_index as u32,
            column as u32,
            Some(OriginalLocation::new(
              line_index as u32,
              column as u32,
              source_index,
              None,
            )),
          );
        }
        previous = Some(ch);
      }
    }

    source_index
  }

  pub fn identity(source: &str, content: &str) -> Self {
    let mut source_map = Self::new();
    source_map.add_identity_map(source, content);
    source_map
  }

  pub fn write_vlq<W>(&mut self, output: &mut W) -> Result<(), SourceMapError>
  where
    W: io::Write,
  {
    let mut last_generated_line: u32 = 0;
    let mut previous_source: i64 = 0;
    let mut previous_original_line: i64 = 0;
    let mut previous_original_column: i64 = 0;
    let mut previous_name: i64 = 0;

    for (generated_line, line_content) in self.mapping_lines.iter_mut().enumerate() {
      let generated_line = generated_line as u32;
      if generated_line > 0 {
        output.write_all(&b";".repeat((generated_line - last_generated_line) as usize))?;
      }

      line_content.ensure_sorted();

      let mut previous_generated_column: u32 = 0;
      for (index, mapping) in line_content.mappings.iter().enumerate() {
        if index > 0 {
          output.write_all(b",")?;
        }

        vlq::encode(
          mapping.generated_column as i64 - previous_generated_column as i64,
          output,
        )?;
        previous_generated_column = mapping.generated_column;

        if let Some(original) = &mapping.original {
          let original_source = original.source as i64;
          vlq::encode(original_source - previous_source, output)?;
          previous_source = original_source;

          let original_line = original.original_line as i64;
          vlq::encode(original_line - previous_original_line, output)?;
          previous_original_line = original_line;

          let original_column = original.original_column as i64;
          vlq::encode(original_column - previous_original_column, output)?;
          previous_original_column = original_column;

          if let Some(name) = original.name {
            let original_name = name as i64;
            vlq::encode(original_name - previous_name, output)?;
            previous_name = original_name;
          }
        }
      }

      last_generated_line = generated_line;
    }

    Ok(())
  }

  /// Decodes a `mappings` string and appends it, remapping source and name
  /// indices into this map's tables
  pub fn add_vlq_map<I: AsRef<str>>(
    &mut self,
    input: &[u8],
    sources: &[I],
    sources_content: &[Option<I>],
    names: &[I],
  ) -> Result<(), SourceMapError> {
    let mut generated_line: i64 = 0;
    let mut generated_column: i64 = 0;
    let mut original_line = 0;
    let mut original_column = 0;
    let mut source = 0;
    let mut name = 0;

    let source_indexes: Vec<u32> = sources
      .iter()
      .map(|s| self.add_source(s.as_ref()))
      .collect();
    let name_indexes: Vec<u32> = names.iter().map(|n| self.add_name(n.as_ref())).collect();

    for (i, source_content) in sources_content.iter().enumerate() {
      if let Some(source_index) = source_indexes.get(i) {
        self.set_source_content(
          *source_index as usize,
          source_content.as_ref().map(|c| c.as_ref()),
        )?;
      }
    }

    let mut input = input.iter().copied().peekable();
    while let Some(byte) = input.peek().copied() {
      match byte {
        b';' => {
          generated_line += 1;
          generated_column = 0;
          input.next();
        }
        b',' => {
          input.next();
        }
        _ => {
          read_relative_vlq(&mut generated_column, &mut input)?;

          let original = if input.peek().copied().map_or(true, is_mapping_separator) {
            None
          } else {
            read_relative_vlq(&mut source, &mut input)?;
            read_relative_vlq(&mut original_line, &mut input)?;
            read_relative_vlq(&mut original_column, &mut input)?;

            let source_index = *source_indexes
              .get(source as usize)
              .ok_or_else(|| SourceMapError::new(SourceMapErrorType::SourceOutOfRange))?;

            let name_index = if input.peek().copied().map_or(true, is_mapping_separator) {
              None
            } else {
              read_relative_vlq(&mut name, &mut input)?;
              Some(
                *name_indexes
                  .get(name as usize)
                  .ok_or_else(|| SourceMapError::new(SourceMapErrorType::NameOutOfRange))?,
              )
            };

            Some(OriginalLocation::new(
              original_line as u32,
              original_column as u32,
              source_index,
              name_index,
            ))
          };

          self.add_mapping(generated_line as u32, generated_column as u32, original);
        }
      }
    }

    Ok(())
  }

  pub fn from_json(input: &str) -> Result<Self, SourceMapError> {
    let json: JsonSourceMapInput = serde_json::from_str(input)?;
    Self::from_input(json)
  }

  pub fn from_json_value(value: &Value) -> Result<Self, SourceMapError> {
    let json = JsonSourceMapInput::deserialize(value)?;
    Self::from_input(json)
  }

  fn from_input(json: JsonSourceMapInput) -> Result<Self, SourceMapError> {
    let mut source_map = Self::new();
    source_map.file = json.file;
    source_map.add_vlq_map(
      json.mappings.as_bytes(),
      &json.sources,
      &json.sources_content,
      &json.names,
    )?;
    Ok(source_map)
  }

  pub fn to_json(&mut self, source_root: Option<&str>) -> Result<String, SourceMapError> {
    let mut vlq_output: Vec<u8> = Vec::new();
    self.write_vlq(&mut vlq_output)?;

    // The VLQ writer only ever emits base64 characters and separators
    let mappings = String::from_utf8_lossy(&vlq_output);

    let mut sources_content = self.sources_content.clone();
    sources_content.resize(self.sources.len(), None);

    let json = JsonSourceMapOutput {
      version: 3,
      file: self.file.as_deref(),
      source_root,
      sources: &self.sources,
      sources_content: &sources_content,
      names: &self.names,
      mappings: &mappings,
    };

    Ok(serde_json::to_string(&json)?)
  }

  pub fn to_json_value(&mut self) -> Result<Value, SourceMapError> {
    let json = self.to_json(None)?;
    Ok(serde_json::from_str(&json)?)
  }

  pub fn from_data_url(data_url: &str) -> Result<Self, SourceMapError> {
    let (header, data) = data_url
      .strip_prefix("data:")
      .and_then(|rest| rest.split_once(','))
      .ok_or_else(|| SourceMapError::new(SourceMapErrorType::DataUrlError))?;

    let mut parameters = header.split(';');
    if parameters.next() != Some("application/json") {
      return Err(SourceMapError::new_with_reason(
        SourceMapErrorType::DataUrlError,
        "expected an application/json data url",
      ));
    }

    if !parameters.any(|parameter| parameter == "base64") {
      return Self::from_json(data);
    }

    let decoded = BASE64
      .decode(data.trim())
      .map_err(|err| SourceMapError::new_with_reason(SourceMapErrorType::DataUrlError, &err.to_string()))?;
    let input = String::from_utf8(decoded)
      .map_err(|err| SourceMapError::new_with_reason(SourceMapErrorType::DataUrlError, &err.to_string()))?;

    Self::from_json(&input)
  }

  pub fn to_data_url(&mut self, source_root: Option<&str>) -> Result<String, SourceMapError> {
    let buf = self.to_json(source_root)?;
    Ok(format!(
      "data:application/json;charset=utf-8;base64,{}",
      BASE64.encode(buf.as_bytes())
    ))
  }
}

impl PartialEq for SourceMap {
  fn eq(&self, other: &Self) -> bool {
    self.file == other.file
      && self.sources == other.sources
      && self.names == other.names
      && self.get_mappings() == other.get_mappings()
  }
}

fn is_punctuation(ch: char) -> bool {
  matches!(ch, '{' | '}' | '(' | ')' | ';' | ':' | ',')
}

fn is_token_start(previous: Option<char>, ch: char) -> bool {
  if ch.is_whitespace() {
    return false;
  }

  match previous {
    None => true,
    Some(previous) => previous.is_whitespace() || is_punctuation(previous) || is_punctuation(ch),
  }
}
