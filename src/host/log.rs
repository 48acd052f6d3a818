//! Injected diagnostic logging.

use tracing::Level;

/// Diagnostic log handed to the pipeline by the host.
pub trait DiagnosticLog: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }
}

/// Forwards to `tracing`, tagging every event with the module name.
#[derive(Debug, Clone)]
pub struct TracingLog {
    module: String,
}

impl TracingLog {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
        }
    }
}

impl Default for TracingLog {
    fn default() -> Self {
        Self::new("Parse Windows Chrome")
    }
}

impl DiagnosticLog for TracingLog {
    fn log(&self, level: Level, message: &str) {
        let module = self.module.as_str();
        match level {
            Level::ERROR => tracing::error!(module = %module, "{}", message),
            Level::WARN => tracing::warn!(module = %module, "{}", message),
            Level::INFO => tracing::info!(module = %module, "{}", message),
            Level::DEBUG => tracing::debug!(module = %module, "{}", message),
            _ => tracing::trace!(module = %module, "{}", message),
        }
    }
}
