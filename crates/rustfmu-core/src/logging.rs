//! FMU-visible logging.
//!
//! Slaves log through a [`LogQueue`]. Messages are buffered per instance and drained by the
//! ABI bridge after every call, which forwards the ones admitted by the current
//! [`LoggerSettings`] to the master's logger callback. Every message is also mirrored to
//! `tracing` so the same output is visible when a slave runs outside a master.

use crate::status::Fmi2Status;
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Catch-all category.
pub const LOG_ALL: &str = "logAll";

/// Name -> description table of declared log categories.
pub type LogCategories = IndexMap<String, String>;

/// The categories every slave declares unless it provides its own.
pub fn default_log_categories() -> LogCategories {
    [
        ("logStatusWarning", "Log messages with fmi2Warning status."),
        ("logStatusDiscard", "Log messages with fmi2Discard status."),
        ("logStatusError", "Log messages with fmi2Error status."),
        ("logStatusFatal", "Log messages with fmi2Fatal status."),
        (LOG_ALL, "Log all messages."),
    ]
    .into_iter()
    .map(|(name, description)| (name.to_string(), description.to_string()))
    .collect()
}

/// Pick the category for a message that did not name one.
///
/// Uses `logStatus<Status>` when that category is declared, `logAll` otherwise.
pub fn derive_category(status: Fmi2Status, declared: &LogCategories) -> String {
    let category = status.log_category();
    if declared.contains_key(&category) {
        category
    } else {
        LOG_ALL.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogMessage {
    pub status: Fmi2Status,
    pub category: String,
    pub message: String,
}

/// Shared, per-instance buffer of log messages.
///
/// Cloning the queue yields another handle to the same buffer, so the slave and its
/// instance can both hold one.
#[derive(Debug, Clone, Default)]
pub struct LogQueue {
    messages: Arc<Mutex<VecDeque<LogMessage>>>,
    categories: Arc<LogCategories>,
}

impl LogQueue {
    pub fn new(categories: LogCategories) -> Self {
        Self {
            messages: Arc::default(),
            categories: Arc::new(categories),
        }
    }

    pub fn categories(&self) -> &LogCategories {
        &self.categories
    }

    /// Queue a message, deriving the category from `status` when none is given.
    pub fn log(&self, message: impl Into<String>, status: Fmi2Status, category: Option<&str>) {
        let message = message.into();
        let category = match category {
            Some(category) => category.to_string(),
            None => derive_category(status, &self.categories),
        };

        match status {
            Fmi2Status::Ok | Fmi2Status::Pending => debug!(%category, "{}", message),
            Fmi2Status::Discard => info!(%category, "{}", message),
            Fmi2Status::Warning => warn!(%category, "{}", message),
            Fmi2Status::Error | Fmi2Status::Fatal => error!(%category, %status, "{}", message),
        }

        self.lock().push_back(LogMessage {
            status,
            category,
            message,
        });
    }

    /// Take every queued message, oldest first.
    pub fn drain(&self) -> Vec<LogMessage> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<LogMessage>> {
        // Poisoning is ignored, push and drain are single operations.
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Settings controlled by `fmi2SetDebugLogging`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoggerSettings {
    enabled: bool,
    categories: Vec<String>,
}

impl LoggerSettings {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            categories: Vec::new(),
        }
    }

    /// Replace the logging flag and category filter.
    ///
    /// An empty category list admits every category.
    pub fn configure(&mut self, enabled: bool, categories: Vec<String>) {
        self.enabled = enabled;
        self.categories = categories;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn admits(&self, message: &LogMessage) -> bool {
        self.enabled
            && (self.categories.is_empty() || self.categories.contains(&message.category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_categories() {
        let categories = default_log_categories();
        assert_eq!(
            categories.keys().collect::<Vec<_>>(),
            vec![
                "logStatusWarning",
                "logStatusDiscard",
                "logStatusError",
                "logStatusFatal",
                "logAll"
            ]
        );
        assert_eq!(categories["logAll"], "Log all messages.");
    }

    #[test]
    fn test_category_derivation() {
        let declared = default_log_categories();
        assert_eq!(
            derive_category(Fmi2Status::Warning, &declared),
            "logStatusWarning"
        );
        // No logStatusOk category is declared
        assert_eq!(derive_category(Fmi2Status::Ok, &declared), "logAll");
        assert_eq!(
            derive_category(Fmi2Status::Fatal, &LogCategories::new()),
            "logAll"
        );
    }

    #[test]
    fn test_queue_is_shared_between_clones() {
        let queue = LogQueue::new(default_log_categories());
        let handle = queue.clone();

        handle.log("careful", Fmi2Status::Warning, None);
        handle.log("custom", Fmi2Status::Ok, Some("logEvents"));
        assert_eq!(queue.len(), 2);

        let messages = queue.drain();
        assert_eq!(messages[0].category, "logStatusWarning");
        assert_eq!(messages[1].category, "logEvents");
        assert!(handle.is_empty());
    }

    #[test]
    fn test_settings_filter() {
        let message = LogMessage {
            status: Fmi2Status::Error,
            category: "logStatusError".to_string(),
            message: "boom".to_string(),
        };

        let mut settings = LoggerSettings::default();
        assert!(!settings.admits(&message));

        settings.configure(true, Vec::new());
        assert!(settings.admits(&message));

        settings.configure(true, vec!["logAll".to_string()]);
        assert!(!settings.admits(&message));

        settings.configure(true, vec!["logStatusError".to_string()]);
        assert!(settings.admits(&message));
    }
}
