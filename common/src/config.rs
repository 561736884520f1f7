//! Configuration types for output and logging settings

/// Output and logging configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Suppress error output
    pub quiet: bool,
    /// Verbosity level: 0=ERROR, 1=INFO, 2=DEBUG, 3=TRACE
    pub verbose: u8,
}

impl OutputConfig {
    /// Default log filter directive for this configuration
    pub fn filter_directive(&self) -> &'static str {
        if self.quiet {
            return "off";
        }
        match self.verbose {
            0 => "error",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Tracing configuration for debugging
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Debug log file path, receives trace-level output regardless of verbosity
    pub debug_log_file: Option<String>,
}
