use std::ops::Range;
use std::path::PathBuf;

/// Source information for where a diagnostic came from
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub file_path: PathBuf,
    pub content: String,
}

/// A diagnostic message that can be either a warning or an error
#[derive(Debug, Clone)]
pub enum Diagnostic {
    Warning(Warning),
    Error(Error),
}

/// Warning messages that don't prevent config loading
#[derive(Debug, Clone)]
pub enum Warning {
    EmptyConfig { file_path: PathBuf },
    DuplicateDevice { id: String, count: usize },
    MalformedMac { id: String, mac: String },
}

/// Error messages that indicate problems with the config
#[derive(Debug, Clone)]
pub enum Error {
    Parse(ParseError),
    Validation(ValidationError),
}

/// YAML syntax or type error, located in the source when possible
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Option<Range<usize>>,
    pub source: SourceInfo,
}

/// Error type for validation failures
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field_path: String,
    pub message: String,
}

impl Diagnostic {
    /// Returns true if this diagnostic is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Diagnostic::Error(_))
    }

    /// Returns true if this diagnostic is a warning
    pub fn is_warning(&self) -> bool {
        matches!(self, Diagnostic::Warning(_))
    }
}

impl ParseError {
    pub fn from_yaml(error: &serde_yaml::Error, source: SourceInfo) -> Self {
        // ariadne spans count chars, not bytes
        let span = error.location().map(|loc| {
            let len = source.content.chars().count();
            let start = loc.index().min(len.saturating_sub(1));
            start..(start + 1).min(len)
        });

        Self {
            message: error.to_string(),
            span,
            source,
        }
    }
}

/// Format all diagnostics for display using Ariadne
pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let mut output = Vec::new();

    for diagnostic in diagnostics {
        match diagnostic {
            Diagnostic::Warning(warning) => {
                let warning_msg = match warning {
                    Warning::EmptyConfig { file_path } => format!(
                        "Warning: Config file '{}' is empty and has no effect\n",
                        file_path.display()
                    ),
                    Warning::DuplicateDevice { id, count } => format!(
                        "Warning: Device '{}' is configured {} times; the last entry wins\n",
                        id, count
                    ),
                    Warning::MalformedMac { id, mac } => format!(
                        "Warning: Device '{}' has malformed MAC '{}'; lookup will likely fail\n",
                        id, mac
                    ),
                };
                output.extend_from_slice(warning_msg.as_bytes());
            }
            Diagnostic::Error(Error::Parse(parse_error)) => {
                let file_id = parse_error.source.file_path.to_string_lossy().to_string();
                match &parse_error.span {
                    Some(span) => {
                        Report::build(ReportKind::Error, (file_id.clone(), span.clone()))
                            .with_message("Failed to parse config")
                            .with_label(
                                Label::new((file_id.clone(), span.clone()))
                                    .with_message(&parse_error.message)
                                    .with_color(Color::Red),
                            )
                            .with_note(&parse_error.message)
                            .finish()
                            .write(
                                (file_id, Source::from(&parse_error.source.content)),
                                &mut output,
                            )
                            .ok();
                    }
                    None => {
                        let error_msg = format!(
                            "Failed to parse config '{}': {}\n",
                            file_id, parse_error.message
                        );
                        output.extend_from_slice(error_msg.as_bytes());
                    }
                }
            }
            Diagnostic::Error(Error::Validation(validation_error)) => {
                let error_msg = format!(
                    "Validation error in '{}': {}\n",
                    validation_error.field_path, validation_error.message
                );
                output.extend_from_slice(error_msg.as_bytes());
            }
        }
    }

    String::from_utf8_lossy(&output).to_string()
}
