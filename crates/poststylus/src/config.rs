use serde::Deserialize;

use crate::plugin::{PluginEntry, PluginSpec};

/// Plugins given by name, either one or a list
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PluginConfig {
  One(String),
  List(Vec<String>),
}

impl From<PluginConfig> for PluginSpec {
  fn from(config: PluginConfig) -> Self {
    match config {
      PluginConfig::One(specifier) => PluginSpec::from(specifier.as_str()),
      PluginConfig::List(specifiers) => {
        PluginSpec::Many(specifiers.into_iter().map(PluginEntry::from).collect())
      }
    }
  }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostStylusConfig {
  pub plugins: Option<PluginConfig>,
}

#[derive(Deserialize)]
struct PackageJson {
  #[serde(rename = "poststylus")]
  config: Option<PostStylusConfig>,
}

impl PostStylusConfig {
  pub fn from_json(input: &str) -> anyhow::Result<Self> {
    Ok(serde_json::from_str(input)?)
  }

  /// Reads the `poststylus` key of a package.json, no key means no plugins
  pub fn from_package_json(input: &str) -> anyhow::Result<Self> {
    let package_json: PackageJson = serde_json::from_str(input)?;

    Ok(package_json.config.unwrap_or_default())
  }

  pub fn plugin_spec(&self) -> PluginSpec {
    PluginSpec::from(self.plugins.clone())
  }
}

impl From<PostStylusConfig> for PluginSpec {
  fn from(config: PostStylusConfig) -> Self {
    PluginSpec::from(config.plugins)
  }
}
