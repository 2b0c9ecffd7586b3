use tracing::Level;

/// How the relay writes its logs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Filter directives, e.g. `warn,relay=debug`. See
    /// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
    pub(crate) filter: String,
    /// Events at this level or more verbose go to stdout, more severe ones to
    /// stderr. Everything goes to stdout if unset.
    pub(crate) stderr_threshold: Option<Level>,
    pub(crate) format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human readable lines, colored when stdout is a terminal.
    Text,
    /// One JSON object per event, for log aggregation.
    Json,
}

impl Config {
    pub fn new(filter: &str, stderr_threshold: Option<Level>, use_json_format: bool) -> Self {
        Self {
            filter: filter.to_owned(),
            stderr_threshold,
            format: if use_json_format {
                Format::Json
            } else {
                Format::Text
            },
        }
    }
}
