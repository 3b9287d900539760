use crate::mapping::OriginalLocation;
use crate::source_map::SourceMap;
use crate::sourcemap_error::{SourceMapError, SourceMapErrorType};

const INTERMEDIATE_SOURCE: u32 = 0;

/// Composes two source maps into one.
///
/// `upstream` maps an intermediate file back to the original sources and
/// `downstream` maps the final output back to that intermediate file. The
/// result maps the final output straight to the original sources.
///
/// Positions in the final output that cannot be traced through both maps are
/// left out of the result rather than being mapped to a guessed location.
///
/// `downstream` describes a single intermediate file, its first source. Mappings
/// into any other source belong to a different coordinate space and are skipped.
pub fn merge(upstream: &SourceMap, downstream: &SourceMap) -> Result<SourceMap, SourceMapError> {
  let mut upstream = upstream.clone();
  let mut composed = SourceMap::new();
  composed.set_file(downstream.file().map(String::from));

  let mut source_indexes = Vec::with_capacity(upstream.get_sources().len());
  for (index, source) in upstream.get_sources().iter().enumerate() {
    let source_index = composed.add_source(source);
    composed.set_source_content(
      source_index as usize,
      upstream.get_source_content(index as u32)?,
    )?;
    source_indexes.push(source_index);
  }

  let name_indexes: Vec<u32> = upstream
    .get_names()
    .iter()
    .map(|name| composed.add_name(name))
    .collect();

  for mapping in downstream.get_mappings() {
    let Some(intermediate) = mapping.original else {
      continue;
    };

    if intermediate.source != INTERMEDIATE_SOURCE {
      continue;
    }

    let Some(upstream_mapping) =
      upstream.find_closest_mapping(intermediate.original_line, intermediate.original_column)
    else {
      continue;
    };

    let Some(original) = upstream_mapping.original else {
      continue;
    };

    let source = *source_indexes
      .get(original.source as usize)
      .ok_or_else(|| SourceMapError::new(SourceMapErrorType::SourceOutOfRange))?;

    let name = match original.name {
      Some(name) => Some(
        *name_indexes
          .get(name as usize)
          .ok_or_else(|| SourceMapError::new(SourceMapErrorType::NameOutOfRange))?,
      ),
      None => None,
    };

    composed.add_mapping(
      mapping.generated_line,
      mapping.generated_column,
      Some(OriginalLocation::new(
        original.original_line,
        original.original_column,
        source,
        name,
      )),
    );
  }

  Ok(composed)
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use crate::mapping::Mapping;

  use super::*;

  const STYLUS: &str = ".a\n  color red\n";
  const CSS: &str = ".a {\n  color: red;\n}\n";

  fn mapped(
    generated_line: u32,
    generated_column: u32,
    original_line: u32,
    original_column: u32,
  ) -> Mapping {
    Mapping {
      generated_line,
      generated_column,
      original: Some(OriginalLocation::new(
        original_line,
        original_column,
        0,
        None,
      )),
    }
  }

  #[test]
  fn merging_identity_maps_is_identity() -> anyhow::Result<()> {
    let upstream = SourceMap::identity("a.styl", CSS);
    let downstream = SourceMap::identity("a.css", CSS);

    let composed = merge(&upstream, &downstream)?;

    assert_eq!(composed.get_mappings(), upstream.get_mappings());
    assert_eq!(composed.get_sources(), &vec![String::from("a.styl")]);

    Ok(())
  }

  #[test]
  fn maps_final_positions_to_original_positions() -> anyhow::Result<()> {
    // .a          -> .a {
    //   color red ->   color: red;
    let mut upstream = SourceMap::new();
    let source = upstream.add_source("a.styl");
    upstream.set_source_content(source as usize, Some(STYLUS))?;
    upstream.add_mapping(0, 0, Some(OriginalLocation::new(0, 0, source, None)));
    upstream.add_mapping(1, 2, Some(OriginalLocation::new(1, 2, source, None)));
    upstream.add_mapping(1, 9, Some(OriginalLocation::new(1, 8, source, None)));

    // A banner line was inserted above everything
    let mut downstream = SourceMap::new();
    downstream.set_file(Some(String::from("a.css")));
    let intermediate = downstream.add_source("a.styl");
    downstream.add_mapping(0, 0, None);
    downstream.add_mapping(1, 0, Some(OriginalLocation::new(0, 0, intermediate, None)));
    downstream.add_mapping(2, 2, Some(OriginalLocation::new(1, 2, intermediate, None)));
    downstream.add_mapping(2, 9, Some(OriginalLocation::new(1, 9, intermediate, None)));

    let composed = merge(&upstream, &downstream)?;

    assert_eq!(
      composed.get_mappings(),
      vec![mapped(1, 0, 0, 0), mapped(2, 2, 1, 2), mapped(2, 9, 1, 8)]
    );
    assert_eq!(composed.file(), Some("a.css"));
    assert_eq!(composed.get_source_content(0)?, Some(STYLUS));

    Ok(())
  }

  #[test]
  fn drops_positions_without_an_upstream_origin() -> anyhow::Result<()> {
    let mut upstream = SourceMap::new();
    let source = upstream.add_source("a.styl");
    upstream.add_mapping(0, 4, Some(OriginalLocation::new(0, 0, source, None)));
    upstream.add_mapping(1, 0, None);

    let mut downstream = SourceMap::new();
    let intermediate = downstream.add_source("a.css");
    // Before the first upstream mapping on the line
    downstream.add_mapping(0, 0, Some(OriginalLocation::new(0, 2, intermediate, None)));
    // Upstream mapping without an original location
    downstream.add_mapping(1, 0, Some(OriginalLocation::new(1, 3, intermediate, None)));
    // Line the upstream map knows nothing about
    downstream.add_mapping(2, 0, Some(OriginalLocation::new(7, 0, intermediate, None)));
    downstream.add_mapping(3, 0, Some(OriginalLocation::new(0, 6, intermediate, None)));

    let composed = merge(&upstream, &downstream)?;

    assert_eq!(composed.get_mappings(), vec![mapped(3, 0, 0, 0)]);

    Ok(())
  }

  #[test]
  fn carries_upstream_names() -> anyhow::Result<()> {
    let mut upstream = SourceMap::new();
    let source = upstream.add_source("a.styl");
    let name = upstream.add_name("primary");
    upstream.add_mapping(0, 0, Some(OriginalLocation::new(3, 1, source, Some(name))));

    let mut downstream = SourceMap::new();
    let intermediate = downstream.add_source("a.css");
    downstream.add_mapping(0, 5, Some(OriginalLocation::new(0, 0, intermediate, None)));

    let composed = merge(&upstream, &downstream)?;

    assert_eq!(composed.get_names(), &vec![String::from("primary")]);
    assert_eq!(
      composed.get_mappings(),
      vec![Mapping {
        generated_line: 0,
        generated_column: 5,
        original: Some(OriginalLocation::new(3, 1, 0, Some(0))),
      }]
    );

    Ok(())
  }

  #[test]
  fn skips_mappings_into_other_downstream_sources() -> anyhow::Result<()> {
    let upstream = SourceMap::identity("a.styl", CSS);

    let mut downstream = SourceMap::new();
    let intermediate = downstream.add_source("a.css");
    let imported = downstream.add_source("imported.css");
    downstream.add_mapping(0, 0, Some(OriginalLocation::new(0, 0, intermediate, None)));
    downstream.add_mapping(1, 0, Some(OriginalLocation::new(1, 2, imported, None)));

    let composed = merge(&upstream, &downstream)?;

    assert_eq!(composed.get_mappings(), vec![mapped(0, 0, 0, 0)]);

    Ok(())
  }

  #[test]
  fn fails_on_sources_missing_from_upstream() {
    let mut upstream = SourceMap::new();
    upstream.add_mapping(0, 0, Some(OriginalLocation::new(0, 0, 3, None)));

    let downstream = SourceMap::identity("a.css", CSS);

    let error = merge(&upstream, &downstream).unwrap_err();

    assert_eq!(error.error_type, SourceMapErrorType::SourceOutOfRange);
  }

  #[test]
  fn fails_on_names_missing_from_upstream() {
    let mut upstream = SourceMap::new();
    let source = upstream.add_source("a.styl");
    upstream.add_mapping(0, 0, Some(OriginalLocation::new(0, 0, source, Some(4))));

    let downstream = SourceMap::identity("a.css", CSS);

    let error = merge(&upstream, &downstream).unwrap_err();

    assert_eq!(error.error_type, SourceMapErrorType::NameOutOfRange);
  }
}
