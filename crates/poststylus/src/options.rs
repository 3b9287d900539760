use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapOptions {
  /// Append a `/*# sourceMappingURL=... */` comment to the output
  pub annotation: bool,
  /// Embed the processed css in the map's `sourcesContent`
  pub sources_content: bool,
}

impl Default for MapOptions {
  fn default() -> Self {
    MapOptions {
      annotation: true,
      sources_content: true,
    }
  }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum MapSetting {
  #[default]
  Disabled,
  Enabled(MapOptions),
}

impl MapSetting {
  pub fn is_enabled(&self) -> bool {
    matches!(self, MapSetting::Enabled(_))
  }

  pub fn options(&self) -> Option<&MapOptions> {
    match self {
      MapSetting::Enabled(options) => Some(options),
      MapSetting::Disabled => None,
    }
  }
}

/// Options handed to the second stage for a single run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessOptions {
  pub from: PathBuf,
  pub to: PathBuf,
  pub map: MapSetting,
}

impl ProcessOptions {
  /// Options for processing the output of `filename`, written next to it
  /// with a `.css` extension
  pub fn for_file(filename: &Path) -> Self {
    ProcessOptions {
      from: filename.to_path_buf(),
      to: css_output_path(filename),
      map: MapSetting::Disabled,
    }
  }

  pub fn map(mut self, setting: MapSetting) -> Self {
    self.map = setting;
    self
  }

  pub fn wants_source_map(&self) -> bool {
    self.map.is_enabled()
  }
}

fn css_output_path(filename: &Path) -> PathBuf {
  let dir = filename.parent().unwrap_or(Path::new(""));
  let mut file_name = filename
    .file_stem()
    .map(|stem| stem.to_os_string())
    .unwrap_or_default();
  file_name.push(".css");

  dir.join(file_name)
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn derives_css_output_next_to_the_input() {
    let options = ProcessOptions::for_file(Path::new("styles/theme/plugin.styl"));

    assert_eq!(options.from, PathBuf::from("styles/theme/plugin.styl"));
    assert_eq!(options.to, PathBuf::from("styles/theme/plugin.css"));
    assert!(!options.wants_source_map());
  }

  #[test]
  fn only_strips_the_last_extension() {
    let options = ProcessOptions::for_file(Path::new("/app/main.theme.styl"));

    assert_eq!(options.to, PathBuf::from("/app/main.theme.css"));
  }

  #[test]
  fn handles_bare_file_names() {
    assert_eq!(
      ProcessOptions::for_file(Path::new("index.styl")).to,
      PathBuf::from("index.css")
    );
    assert_eq!(
      ProcessOptions::for_file(Path::new("Makefile")).to,
      PathBuf::from("Makefile.css")
    );
  }
}
