use crate::mapping::OriginalLocation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineMapping {
  pub generated_column: u32,
  pub original: Option<OriginalLocation>,
}

/// All mappings that start on a single generated line
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MappingLine {
  pub mappings: Vec<LineMapping>,
  is_sorted: bool,
}

impl MappingLine {
  pub fn new() -> Self {
    Self {
      mappings: Vec::new(),
      is_sorted: true,
    }
  }

  pub fn add_mapping(&mut self, generated_column: u32, original: Option<OriginalLocation>) {
    let status = match self.mappings.last() {
      Some(last) => last.generated_column <= generated_column,
      None => true,
    };

    self.is_sorted &= status;
    self.mappings.push(LineMapping {
      generated_column,
      original,
    });
  }

  pub fn ensure_sorted(&mut self) {
    if !self.is_sorted {
      self.mappings.sort_by_key(|m| m.generated_column);
      self.is_sorted = true;
    }
  }

  /// Finds the mapping with the greatest generated column that is lower than
  /// or equal to `generated_column`
  pub fn find_closest_mapping(&mut self, generated_column: u32) -> Option<LineMapping> {
    self.ensure_sorted();

    let index = self
      .mappings
      .partition_point(|m| m.generated_column <= generated_column);

    if index == 0 {
      return None;
    }

    self.mappings.get(index - 1).copied()
  }
}
