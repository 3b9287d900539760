use std::fmt;
use std::sync::Arc;

/// Receives every warning raised by the postcss plugins, in the order they were raised
pub type WarningSink = Arc<dyn Fn(&Warning) + Send + Sync>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Warning {
  pub text: String,
  pub plugin: Option<String>,
  pub line: Option<u32>,
  pub column: Option<u32>,
}

impl Warning {
  pub fn new(text: impl Into<String>) -> Self {
    Warning {
      text: text.into(),
      ..Warning::default()
    }
  }

  pub fn plugin(mut self, plugin: impl Into<String>) -> Self {
    self.plugin = Some(plugin.into());
    self
  }

  pub fn at(mut self, line: u32, column: u32) -> Self {
    self.line = Some(line);
    self.column = Some(column);
    self
  }
}

impl fmt::Display for Warning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(plugin) = &self.plugin {
      write!(f, "{}: ", plugin)?;
    }

    write!(f, "{}", self.text)?;

    if let (Some(line), Some(column)) = (self.line, self.column) {
      write!(f, " ({}:{})", line, column)?;
    }

    Ok(())
  }
}

/// Writes warnings to the `tracing` log
///
/// This crate installs no subscriber. Unless the application sets one up,
/// warnings reaching this sink are discarded.
pub fn default_warning_sink() -> WarningSink {
  Arc::new(|warning: &Warning| {
    tracing::warn!("{}", warning);
  })
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use tracing_test::traced_test;

  use super::*;

  #[test]
  fn displays_plugin_and_position() {
    assert_eq!(Warning::new("Bad colour").to_string(), "Bad colour");
    assert_eq!(
      Warning::new("Bad colour").plugin("lint").at(3, 5).to_string(),
      "lint: Bad colour (3:5)"
    );
  }

  #[test]
  #[traced_test]
  fn default_sink_logs_warnings() {
    let sink = default_warning_sink();

    sink(&Warning::new("Unknown property").plugin("lint"));

    assert!(logs_contain("lint: Unknown property"));
  }

  #[test]
  fn default_sink_is_silent_without_a_subscriber() {
    let sink = default_warning_sink();

    tracing::subscriber::with_default(tracing::subscriber::NoSubscriber::default(), || {
      sink(&Warning::new("Unknown property"));
    });
  }
}
