#[allow(clippy::module_inception)]
mod config;
mod diagnostics;

pub use config::*;
pub use diagnostics::{
    Diagnostic, Error as DiagnosticError, ParseError, SourceInfo, ValidationError, Warning,
    format_diagnostics,
};
