//! The lexer.

use rispl_ast::token::{KeywordKind, SyntaxKind, Token, TokenKind};
use rispl_core::text::TextSpan;
use rispl_diagnostics::{messages, Diagnostic, DiagnosticCollection};

/// The lexer converts source text into tokens.
pub struct Lexer {
    /// The source text being scanned.
    text: Vec<char>,
    /// Current position in the text.
    pos: usize,
    /// Start of the current token (after leading trivia).
    token_start: usize,
    /// A pushed-back token, returned before scanning resumes.
    pending: Option<Token>,
    /// Accumulated diagnostics.
    diagnostics: DiagnosticCollection,
}

impl Lexer {
    /// Create a new lexer for the given source text.
    pub fn new(text: &str) -> Self {
        Self {
            text: text.chars().collect(),
            pos: 0,
            token_start: 0,
            pending: None,
            diagnostics: DiagnosticCollection::new(),
        }
    }

    /// Push a token back so the next [`next_token`](Self::next_token) call
    /// returns it. At most one token may be pending.
    pub fn push_back(&mut self, token: Token) {
        debug_assert!(self.pending.is_none(), "more than one pushed-back token");
        self.pending = Some(token);
    }

    /// Get the accumulated diagnostics.
    pub fn diagnostics(&self) -> &DiagnosticCollection {
        &self.diagnostics
    }

    /// Take the accumulated diagnostics, leaving an empty collection.
    pub fn take_diagnostics(&mut self) -> DiagnosticCollection {
        std::mem::take(&mut self.diagnostics)
    }

    /// Returns any pushed-back token, else skips trivia and scans the next
    /// token from the input.
    pub fn next_token(&mut self) -> Token {
        if let Some(token) = self.pending.take() {
            return token;
        }

        self.skip_trivia();
        self.token_start = self.pos;

        let ch = match self.current_char() {
            Some(ch) => ch,
            None => return self.make_token(TokenKind::Syntax(SyntaxKind::Eof)),
        };

        match ch {
            '(' => {
                self.pos += 1;
                self.make_token(TokenKind::Syntax(SyntaxKind::OpenParen))
            }
            ')' => {
                self.pos += 1;
                self.make_token(TokenKind::Syntax(SyntaxKind::CloseParen))
            }
            '.' => {
                self.pos += 1;
                self.make_token(TokenKind::Syntax(SyntaxKind::Dot))
            }
            '\'' => {
                self.pos += 1;
                self.make_token(TokenKind::Syntax(SyntaxKind::Quote))
            }
            '"' => self.scan_string(),
            '0'..='9' => self.scan_number(false),
            '-' => self.scan_minus(),
            _ if starts_id(ch) => self.scan_id_or_keyword(),
            _ => {
                self.pos += 1;
                self.report(messages::UNEXPECTED_CHARACTER, &[&ch.to_string()]);
                // Skip the stray character and carry on with the next token.
                self.next_token()
            }
        }
    }

    // ========================================================================
    // Character helpers
    // ========================================================================

    #[inline]
    fn current_char(&self) -> Option<char> {
        self.text.get(self.pos).copied()
    }

    #[inline]
    fn char_at(&self, offset: usize) -> Option<char> {
        self.text.get(self.pos + offset).copied()
    }

    #[inline]
    fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Skip whitespace and `;` line comments.
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch == ';' {
                while !self.is_eof() && self.text[self.pos] != '\n' {
                    self.pos += 1;
                }
            } else if ch <= ' ' {
                self.pos += 1;
            } else {
                return;
            }
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.token_span())
    }

    fn token_span(&self) -> TextSpan {
        TextSpan::from_bounds(self.token_start as u32, self.pos as u32)
    }

    fn report(&mut self, message: rispl_diagnostics::DiagnosticMessage, args: &[&str]) {
        self.diagnostics
            .add(Diagnostic::with_span(self.token_span(), &message, args));
    }

    // ========================================================================
    // Token-specific scanning
    // ========================================================================

    /// A `-` may begin a negative number, the `-` operator keyword, or an
    /// identifier that happens to start with a hyphen.
    fn scan_minus(&mut self) -> Token {
        self.pos += 1;
        match self.current_char() {
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.scan_number(true),
            Some(ch) if !is_id_terminator(ch) => self.scan_id_tail(false),
            _ => self.finish_id(false),
        }
    }

    /// Scans digits and dots; integers parse before floats.
    fn scan_number(&mut self, negative: bool) -> Token {
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() || ch == '.' {
                self.pos += 1;
            } else {
                break;
            }
        }

        let digits_start = self.token_start + usize::from(negative);
        let text: String = self.text[digits_start..self.pos].iter().collect();
        let sign = if negative { -1.0 } else { 1.0 };

        if let Ok(int) = text.parse::<i64>() {
            let int = if negative { -int } else { int };
            self.make_token(TokenKind::Int(int))
        } else if let Ok(float) = text.parse::<f64>() {
            self.make_token(TokenKind::Float(sign * float))
        } else {
            self.report(messages::INVALID_NUMERIC_LITERAL, &[]);
            self.make_token(TokenKind::Int(0))
        }
    }

    /// Scans a double-quoted string with `\n \t \r \" \\` escapes. An
    /// unterminated string or a raw newline inside one is fatal.
    fn scan_string(&mut self) -> Token {
        self.pos += 1; // opening quote
        let mut value = String::new();

        loop {
            let ch = match self.current_char() {
                Some(ch) => ch,
                None => {
                    self.report(messages::UNEXPECTED_EOF_IN_STRING, &[]);
                    break;
                }
            };

            match ch {
                '"' => {
                    self.pos += 1;
                    break;
                }
                '\n' | '\r' => {
                    self.report(messages::UNEXPECTED_NEWLINE_IN_STRING, &[]);
                    break;
                }
                '\\' => {
                    self.pos += 1;
                    match self.current_char() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some(other) => {
                            self.report(messages::INVALID_STRING_ESCAPE, &[&other.to_string()]);
                            value.push(other);
                        }
                        None => {
                            self.report(messages::UNEXPECTED_EOF_IN_STRING, &[]);
                            break;
                        }
                    }
                    self.pos += 1;
                }
                _ => {
                    value.push(ch);
                    self.pos += 1;
                }
            }
        }

        self.make_token(TokenKind::Str(value))
    }

    /// Scans an identifier or keyword. A leading `\` escapes keyword
    /// classification; the backslash is not part of the name.
    fn scan_id_or_keyword(&mut self) -> Token {
        let escaped = self.current_char() == Some('\\');
        if escaped {
            self.pos += 1;
            self.token_start = self.pos;
            if self.current_char().map_or(true, is_id_terminator) {
                self.report(messages::UNEXPECTED_CHARACTER, &["\\"]);
                return self.next_token();
            }
        }
        self.pos += 1;
        self.scan_id_tail(escaped)
    }

    fn scan_id_tail(&mut self, escaped: bool) -> Token {
        while let Some(ch) = self.current_char() {
            if is_id_terminator(ch) {
                break;
            }
            self.pos += 1;
        }
        self.finish_id(escaped)
    }

    fn finish_id(&mut self, escaped: bool) -> Token {
        let name: String = self.text[self.token_start..self.pos].iter().collect();
        let keyword = if escaped { None } else { KeywordKind::from_name(&name) };

        if keyword.is_none() && name.eq_ignore_ascii_case("let") {
            self.report(messages::LET_PROBABLY_MEANT_LET_STAR, &[]);
        }

        self.make_token(TokenKind::IdOrKeyword { name, keyword })
    }
}

/// Whether a character terminates an identifier: whitespace and control
/// characters, or one of `( ) " ; , ' .`.
#[inline]
fn is_id_terminator(c: char) -> bool {
    c <= ' ' || matches!(c, '(' | ')' | '"' | ';' | ',' | '\'' | '.')
}

/// Whether a character can start an identifier. `\` starts an escaped one.
#[inline]
fn starts_id(c: char) -> bool {
    c == '\\' || !is_id_terminator(c)
}
