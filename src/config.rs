/// Rendering options used when a staged error is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Print the `source()` chain below the error.
    pub show_sources: bool,
    /// Prefix the report with the state it was staged at.
    pub show_state: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            show_sources: true,
            show_state: true,
        }
    }
}

/// Settings for an [`ExceptionRegistry`](crate::ExceptionRegistry).
///
/// # Examples
///
/// ```rust
/// use exc_registry::{ExceptionRegistry, RegistryConfig};
///
/// let registry = ExceptionRegistry::with_config(
///     RegistryConfig::default()
///         .with_name("workers")
///         .with_capture_panics(false),
/// );
/// assert_eq!(registry.config().name, "workers");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Name attached to every log event of the registry.
    pub name: &'static str,
    /// Whether `call`/`rcall` also capture panics, not only `Err` results.
    pub capture_panics: bool,
    /// How `print` renders a staged error.
    pub report: ReportOptions,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            name: "global",
            capture_panics: true,
            report: ReportOptions::default(),
        }
    }
}

impl RegistryConfig {
    /// Sets the name attached to this registry's log events.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Sets whether `call` and `rcall` capture panics as well as `Err` results.
    pub fn with_capture_panics(mut self, capture_panics: bool) -> Self {
        self.capture_panics = capture_panics;
        self
    }

    /// Sets how `print` renders staged errors.
    pub fn with_report(mut self, report: ReportOptions) -> Self {
        self.report = report;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.name, "global");
        assert!(config.capture_panics);
        assert!(config.report.show_sources);
        assert!(config.report.show_state);
    }

    #[test]
    fn test_builder_setters() {
        let report = ReportOptions {
            show_sources: false,
            show_state: true,
        };
        let config = RegistryConfig::default()
            .with_name("jobs")
            .with_capture_panics(false)
            .with_report(report);

        assert_eq!(config.name, "jobs");
        assert!(!config.capture_panics);
        assert_eq!(config.report, report);
    }
}
