//! rispl_diagnostics: diagnostic messages and error reporting infrastructure.
//!
//! Diagnostics carry a message, an optional source span, a numeric code,
//! and a severity. The lexer and parser accumulate them in a
//! [`DiagnosticCollection`]; a severity of [`DiagnosticSeverity::FatalError`]
//! aborts the surrounding form while plain errors permit recovery at the
//! next top-level form.

use rispl_core::text::TextSpan;
use std::fmt;

/// Diagnostic severity.
///
/// `FatalError` is fatal to the form being parsed; `Error` allows recovery
/// at the next top-level form boundary; `Warning` never affects the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    Warning,
    Error,
    FatalError,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::FatalError => write!(f, "fatal error"),
        }
    }
}

/// A diagnostic message template with a code and severity.
#[derive(Debug, Clone)]
pub struct DiagnosticMessage {
    /// The diagnostic code (e.g. 100, 200, 1000).
    pub code: u32,
    /// The severity of this diagnostic.
    pub severity: DiagnosticSeverity,
    /// The message template string. May contain `{0}`, `{1}`, etc.
    pub message: &'static str,
}

/// A realized diagnostic with location information and resolved message text.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// The source span where this diagnostic occurred, if any.
    pub span: Option<TextSpan>,
    /// The resolved message text.
    pub message_text: String,
    /// The diagnostic code.
    pub code: u32,
    /// The severity.
    pub severity: DiagnosticSeverity,
}

impl Diagnostic {
    /// Create a new diagnostic without location info.
    pub fn new(message: &DiagnosticMessage, args: &[&str]) -> Self {
        Self {
            span: None,
            message_text: format_message(message.message, args),
            code: message.code,
            severity: message.severity,
        }
    }

    /// Create a new diagnostic with span info.
    pub fn with_span(span: TextSpan, message: &DiagnosticMessage, args: &[&str]) -> Self {
        Self {
            span: Some(span),
            message_text: format_message(message.message, args),
            code: message.code,
            severity: message.severity,
        }
    }

    /// Whether this is an error or fatal-error diagnostic.
    pub fn is_error(&self) -> bool {
        self.severity >= DiagnosticSeverity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = self.span {
            write!(f, "({}): ", span.start)?;
        }
        write!(f, "{} R{}: {}", self.severity, self.code, self.message_text)
    }
}

/// Format a diagnostic message template by replacing `{0}`, `{1}`, etc.
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut result = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{}}}", i), arg);
    }
    result
}

/// How far the input got: used by interactive hosts to decide whether to
/// prompt for more input instead of reporting a malformed program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodeProperties {
    /// Input parsed to completion (possibly with errors inside forms).
    #[default]
    Complete,
    /// Input contained no expressions at all.
    Empty,
    /// Input ended in the middle of a form; more text could complete it.
    IncompleteInput,
}

/// A collection of diagnostics accumulated during a pipeline stage.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollection {
    diagnostics: Vec<Diagnostic>,
    properties: CodeProperties,
}

impl DiagnosticCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn extend(&mut self, other: DiagnosticCollection) {
        self.diagnostics.extend(other.diagnostics);
        // An incomplete marker survives merging with a later complete stage.
        if self.properties == CodeProperties::Complete {
            self.properties = other.properties;
        }
    }

    /// The incomplete/empty-input marker for this unit.
    pub fn properties(&self) -> CodeProperties {
        self.properties
    }

    pub fn set_properties(&mut self, properties: CodeProperties) {
        self.properties = properties;
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }

    /// Sort diagnostics by source position.
    pub fn sort(&mut self) {
        self.diagnostics.sort_by_key(|d| d.span.map(|s| s.start).unwrap_or(0));
    }
}

// ============================================================================
// Diagnostic messages
// ============================================================================

pub mod messages {
    use super::*;

    macro_rules! diag {
        ($code:expr, Warning, $msg:expr) => {
            DiagnosticMessage { code: $code, severity: DiagnosticSeverity::Warning, message: $msg }
        };
        ($code:expr, Error, $msg:expr) => {
            DiagnosticMessage { code: $code, severity: DiagnosticSeverity::Error, message: $msg }
        };
        ($code:expr, FatalError, $msg:expr) => {
            DiagnosticMessage { code: $code, severity: DiagnosticSeverity::FatalError, message: $msg }
        };
    }

    // ========================================================================
    // Parser errors (100-199)
    // ========================================================================
    pub const KEYWORD_CANNOT_BE_IDENTIFIER: DiagnosticMessage = diag!(100, FatalError, "Keyword cannot be an identifier.");
    pub const INVALID_NUMERIC_LITERAL: DiagnosticMessage = diag!(101, FatalError, "Invalid numeric literal.");
    pub const UNEXPECTED_EOF_IN_STRING: DiagnosticMessage = diag!(102, FatalError, "Unexpected EOF in string literal.");
    pub const UNEXPECTED_NEWLINE_IN_STRING: DiagnosticMessage = diag!(103, FatalError, "Unexpected newline in string literal.");
    pub const INVALID_STRING_ESCAPE: DiagnosticMessage = diag!(104, FatalError, "Invalid escape sequence '\\{0}' in string literal.");
    pub const UNEXPECTED_CHARACTER: DiagnosticMessage = diag!(105, FatalError, "Unexpected character '{0}'.");
    pub const PARAMS_MUST_BE_IDS: DiagnosticMessage = diag!(110, FatalError, "{0} params must be valid IDs.");
    pub const LET_BINDING_MALFORMED: DiagnosticMessage = diag!(111, FatalError, "Let binding must be (<id> <expression>).");
    pub const IF_ARITY: DiagnosticMessage = diag!(112, FatalError, "If must be (if <test> <consequent> [<alternative>]).");
    pub const IMPORT_RENAMES_MISMATCH: DiagnosticMessage = diag!(113, FatalError, "Import as-names must be same form as member names.");
    pub const IMPORT_TARGETS_MUST_BE_IDS: DiagnosticMessage = diag!(114, FatalError, "Import targets must be dotted identifiers.");
    pub const IMPORT_NAMES_MUST_BE_IDS: DiagnosticMessage = diag!(115, FatalError, "Import {0} must be valid IDs.");
    pub const DOTTED_MUST_BE_IDS_OR_CALLS: DiagnosticMessage = diag!(116, FatalError, "Dotted expressions must be identifiers or function calls with identifiers as the function value.");
    pub const DOTTED_CALL_MUST_END_WITH_ID: DiagnosticMessage = diag!(117, FatalError, "Function call with dotted expression for function must end with ID expression, not member invoke.");
    pub const QUOTED_EXPRESSION_FORM: DiagnosticMessage = diag!(118, FatalError, "Quoted expression can only be list, ID/Symbol, or literal.");
    pub const DOTTED_SYNTAX_IN_LIST: DiagnosticMessage = diag!(119, FatalError, "Can't have dotted syntax in {0}.");
    pub const UNEXPECTED_TOKEN_IN_LIST: DiagnosticMessage = diag!(120, FatalError, "Unexpected token in list -- {0}.");
    pub const UNEXPECTED_EOF_IN_LIST: DiagnosticMessage = diag!(121, Error, "Unexpected EOF encountered while parsing list.");
    pub const UNSUPPORTED_KEYWORD_FORM: DiagnosticMessage = diag!(122, FatalError, "The '{0}' form is not supported.");

    // ========================================================================
    // Lexer warnings (200-299)
    // ========================================================================
    pub const LET_PROBABLY_MEANT_LET_STAR: DiagnosticMessage = diag!(200, Warning, "Using 'let'? You probably meant 'let*'.");

    // ========================================================================
    // Token-expected errors (1000-1099)
    // ========================================================================
    pub const TOKEN_EXPECTED: DiagnosticMessage = diag!(1000, FatalError, "{0} expected.");
    pub const TOKEN_EXPECTED_AT_EOF: DiagnosticMessage = diag!(1001, Error, "{0} expected.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message() {
        assert_eq!(format_message("'{0}' and '{1}'", &["a", "b"]), "'a' and 'b'");
    }

    #[test]
    fn test_collection_errors() {
        let mut diags = DiagnosticCollection::new();
        assert!(!diags.has_errors());
        diags.add(Diagnostic::new(&messages::LET_PROBABLY_MEANT_LET_STAR, &[]));
        assert!(!diags.has_errors());
        diags.add(Diagnostic::new(&messages::KEYWORD_CANNOT_BE_IDENTIFIER, &[]));
        assert!(diags.has_errors());
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn test_properties_survive_extend() {
        let mut a = DiagnosticCollection::new();
        let mut b = DiagnosticCollection::new();
        b.set_properties(CodeProperties::IncompleteInput);
        a.extend(b);
        assert_eq!(a.properties(), CodeProperties::IncompleteInput);
    }
}
