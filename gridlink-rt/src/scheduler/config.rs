//! Scheduler configuration.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::util::default_registration_id;

/// Default period between registry cleanup passes.
pub const DEFAULT_CLEANUP_PERIOD: Duration = Duration::from_secs(10);

/// Static configuration of one scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Node name; also the address under which peers reach this scheduler.
    pub name: String,
    /// Key used when registering at a central directory. Defaults to
    /// `<name>_<pid>`.
    pub registration_id: Option<String>,
    /// Central directory for role resolution, if any.
    pub directory_addr: Option<String>,
    /// Fallback dispatcher for unresolvable messages, if any.
    pub dispatcher: Option<String>,
    /// Period between registry cleanup passes.
    pub cleanup_period: Duration,
    /// Serialize every envelope movement into the log.
    pub log_messages: bool,
    /// Report per-request handling latency.
    pub log_proc_time: bool,
}

impl SchedulerConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registration_id: None,
            directory_addr: None,
            dispatcher: None,
            cleanup_period: DEFAULT_CLEANUP_PERIOD,
            log_messages: false,
            log_proc_time: false,
        }
    }

    pub fn with_directory(mut self, address: impl Into<String>) -> Self {
        self.directory_addr = Some(address.into());
        self
    }

    pub fn with_dispatcher(mut self, address: impl Into<String>) -> Self {
        self.dispatcher = Some(address.into());
        self
    }

    pub fn with_message_logging(mut self) -> Self {
        self.log_messages = true;
        self
    }

    pub fn with_proc_time_logging(mut self) -> Self {
        self.log_proc_time = true;
        self
    }

    /// The effective directory registration key.
    pub fn effective_registration_id(&self) -> String {
        self.registration_id
            .clone()
            .unwrap_or_else(|| default_registration_id(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::named("alpha");
        assert_eq!(config.name, "alpha");
        assert!(config.directory_addr.is_none());
        assert!(config.dispatcher.is_none());
        assert_eq!(config.cleanup_period, DEFAULT_CLEANUP_PERIOD);
        assert!(!config.log_messages);
    }

    #[test]
    fn test_effective_registration_id_defaults_to_name_pid() {
        let config = SchedulerConfig::named("alpha");
        assert!(config.effective_registration_id().starts_with("alpha_"));

        let fixed = SchedulerConfig {
            registration_id: Some("custom".into()),
            ..SchedulerConfig::named("alpha")
        };
        assert_eq!(fixed.effective_registration_id(), "custom");
    }
}
