use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use mockall::automock;

use crate::plugin::TransformRef;

/// Creates a fresh transform, the equivalent of calling a plugin module's
/// default export with no options
pub type PluginFactory = Arc<dyn Fn() -> anyhow::Result<TransformRef> + Send + Sync>;

/// Looks up plugins that were given by name
#[automock]
pub trait PluginResolver {
  fn resolve(&self, specifier: &str) -> anyhow::Result<PluginFactory>;
}

/// Resolves plugins from factories registered up front
#[derive(Clone, Default)]
pub struct PluginRegistry {
  factories: HashMap<String, PluginFactory>,
}

impl PluginRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register<F>(&mut self, specifier: impl Into<String>, factory: F) -> &mut Self
  where
    F: Fn() -> anyhow::Result<TransformRef> + Send + Sync + 'static,
  {
    self.factories.insert(specifier.into(), Arc::new(factory));
    self
  }

  pub fn contains(&self, specifier: &str) -> bool {
    self.factories.contains_key(specifier)
  }
}

impl fmt::Debug for PluginRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut specifiers: Vec<&String> = self.factories.keys().collect();
    specifiers.sort();
    f.debug_struct("PluginRegistry")
      .field("specifiers", &specifiers)
      .finish()
  }
}

impl PluginResolver for PluginRegistry {
  fn resolve(&self, specifier: &str) -> anyhow::Result<PluginFactory> {
    self
      .factories
      .get(specifier)
      .cloned()
      .ok_or_else(|| anyhow!("Cannot find module '{}'", specifier))
  }
}
