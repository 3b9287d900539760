use std::fmt;
use std::path::Path;

use serde_json::Value;

use crate::error::PostStylusError;

/// What a stylus run hands to its end handlers once rendering finished
pub struct EndEvent<'a> {
  /// Set when rendering failed, `css` is meaningless in that case
  pub error: Option<anyhow::Error>,
  pub css: String,
  /// The run's source map as a v3 JSON document, `None` when the run was not
  /// asked to produce one. Handlers may replace it.
  pub sourcemap: &'a mut Option<Value>,
}

impl fmt::Debug for EndEvent<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EndEvent")
      .field("error", &self.error)
      .field("css_len", &self.css.len())
      .field("has_sourcemap", &self.sourcemap.is_some())
      .finish()
  }
}

type EndCallback = dyn for<'a> FnOnce(EndEvent<'a>) -> Result<String, PostStylusError> + Send;

/// A callback that runs exactly once, when the run it was registered on ends
pub struct EndHandler(Box<EndCallback>);

impl EndHandler {
  pub fn new<F>(callback: F) -> Self
  where
    F: for<'a> FnOnce(EndEvent<'a>) -> Result<String, PostStylusError> + Send + 'static,
  {
    EndHandler(Box::new(callback))
  }

  /// Runs the handler, the returned css replaces the run's output
  pub fn call(self, event: EndEvent<'_>) -> Result<String, PostStylusError> {
    (self.0)(event)
  }
}

impl fmt::Debug for EndHandler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("EndHandler")
  }
}

/// A single stylus render
///
/// Implementations call every registered handler once, in registration
/// order, feeding each one the css returned by the previous handler.
pub trait StylusRun {
  /// The `.styl` file being rendered
  fn filename(&self) -> &Path;

  fn on_end(&mut self, handler: EndHandler);
}
