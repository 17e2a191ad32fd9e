use crate::cli::VerbosityLevel;
use crate::config::ConfigError;
use crate::error::ValidationError;

/// Reports start-up failures (configuration, client construction) on stderr
pub struct ErrorReporter {
    verbosity: VerbosityLevel,
    show_timestamps: bool,
}

impl ErrorReporter {
    /// Verbose reporters prefix every message with the local time
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_timestamps: verbosity == VerbosityLevel::Verbose,
        }
    }

    /// Report a configuration error
    pub fn report_config_error(&self, error: &ConfigError) {
        eprintln!("{}", self.format_config_error(error));
    }

    /// Report an error that prevented validation from starting
    pub fn report_startup_error(&self, error: &ValidationError) {
        eprintln!("{}", self.format_startup_error(error));
    }

    pub fn format_config_error(&self, error: &ConfigError) -> String {
        match self.verbosity {
            VerbosityLevel::Quiet => format!("{}Config error: {}", self.timestamp(), error),
            VerbosityLevel::Normal => format!(
                "{}Configuration Error: {}\n{}",
                self.timestamp(),
                error,
                self.get_config_help(error)
            ),
            VerbosityLevel::Verbose => format!(
                "{}Configuration Error: {}\nDebug: {:?}\n{}",
                self.timestamp(),
                error,
                error,
                self.get_config_help(error)
            ),
        }
    }

    pub fn format_startup_error(&self, error: &ValidationError) -> String {
        let mut output = format!("{}{}", self.timestamp(), error);

        if self.verbosity == VerbosityLevel::Verbose {
            if matches!(error, ValidationError::Http(_)) {
                output.push_str("\nSuggestion: Check the TLS setup and proxy environment variables");
            }

            let mut current_error: &dyn std::error::Error = error;
            let mut level = 0;
            while let Some(source) = current_error.source() {
                output.push_str(&format!("\n  {}: {}", level + 1, source));
                current_error = source;
                level += 1;
            }
        }

        output
    }

    fn timestamp(&self) -> String {
        if self.show_timestamps {
            format!("[{}] ", chrono::Local::now().format("%H:%M:%S"))
        } else {
            String::new()
        }
    }

    /// Get helpful suggestions for configuration errors
    fn get_config_help(&self, error: &ConfigError) -> String {
        match error {
            ConfigError::Io(_) => "Check that the configuration file exists and is readable".to_string(),
            ConfigError::TomlParsing(_) | ConfigError::JsonParsing(_) => {
                "Check the configuration file syntax (TOML/JSON format expected)".to_string()
            }
            ConfigError::UnsupportedFormat(_) => {
                "Use a .toml or .json configuration file".to_string()
            }
            ConfigError::Environment(_) => {
                "Fix or unset the IPXACT_VALIDATE_* environment variable".to_string()
            }
            ConfigError::Validation(_) => {
                "Resolve conflicting configuration values between file, environment, and CLI"
                    .to_string()
            }
        }
    }
}
