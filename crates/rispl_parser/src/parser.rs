//! The recursive-descent parser.

use rispl_ast::expr::{BinaryOp, Expr, IdToken, LetBinding, ListItem, Literal, QuoteForm, UnaryOp};
use rispl_ast::token::{KeywordKind, SyntaxKind, Token, TokenKind};
use rispl_core::text::TextSpan;
use rispl_diagnostics::{messages, CodeProperties, Diagnostic, DiagnosticCollection, DiagnosticMessage};
use rispl_lexer::Lexer;

/// The result of parsing a unit: top-level expressions plus diagnostics
/// (including the complete/empty/incomplete marker).
#[derive(Debug)]
pub struct ParseOutput {
    pub exprs: Vec<Expr>,
    pub diagnostics: DiagnosticCollection,
}

impl ParseOutput {
    /// Whether the unit parsed without errors.
    pub fn is_ok(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

/// Parse a full program: a sequence of top-level expressions.
pub fn parse_program(text: &str) -> ParseOutput {
    Parser::new(text).parse_program()
}

/// Parse a single expression, as for interactive input.
pub fn parse_one(text: &str) -> ParseOutput {
    Parser::new(text).parse_one()
}

/// Marker for a form that could not be parsed; the caller recovers at the
/// next top-level form boundary.
struct FormAbort;

type ParseResult<T> = Result<T, FormAbort>;

/// The parser. Owns the lexer and accumulates diagnostics from both.
pub struct Parser {
    lexer: Lexer,
    current: Token,
    peeked: Option<Token>,
    /// Unbalanced open parens among consumed tokens; zero whenever the
    /// parser sits at a top-level form boundary.
    depth: usize,
    diagnostics: DiagnosticCollection,
}

impl Parser {
    pub fn new(text: &str) -> Self {
        let mut lexer = Lexer::new(text);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            peeked: None,
            depth: 0,
            diagnostics: DiagnosticCollection::new(),
        }
    }

    /// Parse all top-level expressions until end of input.
    pub fn parse_program(mut self) -> ParseOutput {
        let mut exprs = Vec::new();

        while !self.current.is_eof() {
            match self.parse_expression() {
                Ok(expr) => exprs.push(expr),
                Err(FormAbort) => self.recover_to_top_level(),
            }
        }

        if exprs.is_empty() && self.diagnostics.properties() == CodeProperties::Complete {
            self.diagnostics.set_properties(CodeProperties::Empty);
        }

        self.finish(exprs)
    }

    /// Parse a single expression.
    pub fn parse_one(mut self) -> ParseOutput {
        let exprs = match self.parse_expression() {
            Ok(expr) => vec![expr],
            Err(FormAbort) => Vec::new(),
        };
        self.finish(exprs)
    }

    fn finish(mut self, exprs: Vec<Expr>) -> ParseOutput {
        let mut diagnostics = self.lexer.take_diagnostics();
        diagnostics.extend(std::mem::take(&mut self.diagnostics));
        diagnostics.sort();
        ParseOutput { exprs, diagnostics }
    }

    // ========================================================================
    // Token plumbing
    // ========================================================================

    /// Consume the current token and return it.
    fn next_token(&mut self) -> Token {
        match self.current.kind {
            TokenKind::Syntax(SyntaxKind::OpenParen) => self.depth += 1,
            TokenKind::Syntax(SyntaxKind::CloseParen) => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        let next = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token(),
        };
        std::mem::replace(&mut self.current, next)
    }

    /// Look at the token after the current one.
    fn peek(&mut self) -> &Token {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token());
        }
        self.peeked.as_ref().expect("peeked token just filled")
    }

    fn report(&mut self, message: &DiagnosticMessage, span: TextSpan, args: &[&str]) {
        self.diagnostics.add(Diagnostic::with_span(span, message, args));
    }

    /// Report "X expected". At end of input this is a recoverable error and
    /// marks the unit incomplete; elsewhere it is fatal to the form.
    fn report_expected(&mut self, what: &str) {
        let span = self.current.span;
        if self.current.is_eof() {
            self.diagnostics.set_properties(CodeProperties::IncompleteInput);
            self.report(&messages::TOKEN_EXPECTED_AT_EOF, span, &[what]);
        } else {
            self.report(&messages::TOKEN_EXPECTED, span, &[what]);
        }
    }

    fn expect_syntax(&mut self, kind: SyntaxKind) -> ParseResult<Token> {
        if self.current.is_syntax(kind) {
            Ok(self.next_token())
        } else {
            self.report_expected(kind.description());
            Err(FormAbort)
        }
    }

    fn expect_keyword(&mut self, kind: KeywordKind) -> ParseResult<Token> {
        if self.current.is_keyword(kind) {
            Ok(self.next_token())
        } else {
            self.report_expected(&format!("'{}'", kind.as_str()));
            Err(FormAbort)
        }
    }

    /// Expect an identifier. Keywords qualify only when `allow_keywords`.
    fn expect_identifier(&mut self, allow_keywords: bool) -> ParseResult<IdToken> {
        match &self.current.kind {
            TokenKind::IdOrKeyword { keyword, .. }
                if allow_keywords || keyword.is_none() =>
            {
                let token = self.next_token();
                Ok(id_token(token))
            }
            _ => {
                self.report_expected("identifier");
                Err(FormAbort)
            }
        }
    }

    /// Skip to the next top-level form boundary: drain the remainder of
    /// any unbalanced form, then any stray non-form tokens. If the broken
    /// form was already fully consumed when the error was reported, the
    /// following forms are untouched.
    fn recover_to_top_level(&mut self) {
        loop {
            if self.current.is_eof() {
                return;
            }
            if self.depth > 0 {
                self.next_token();
                continue;
            }
            match &self.current.kind {
                // A fresh form: recovery is done.
                TokenKind::Syntax(SyntaxKind::OpenParen) => return,
                // Stray close parens, dots, atoms: skip them.
                _ => {
                    self.next_token();
                }
            }
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Parses one expression, including any dotted postfix chain.
    fn parse_expression(&mut self) -> ParseResult<Expr> {
        let res = match &self.current.kind {
            TokenKind::Syntax(SyntaxKind::Quote) => self.parse_quote()?,
            TokenKind::Syntax(SyntaxKind::OpenParen) => self.parse_parenthetic_form()?,
            TokenKind::IdOrKeyword { keyword: Some(k), .. } if !k.is_constant() => {
                let span = self.current.span;
                self.report(&messages::KEYWORD_CANNOT_BE_IDENTIFIER, span, &[]);
                return Err(FormAbort);
            }
            TokenKind::IdOrKeyword { .. } => {
                let token = self.next_token();
                Expr::Identifier(id_token(token))
            }
            TokenKind::Int(_) | TokenKind::Float(_) | TokenKind::Str(_) => {
                let token = self.next_token();
                literal_expr(token)
            }
            TokenKind::Syntax(SyntaxKind::Eof) => {
                // An empty unit reads as nil; interactive hosts check the
                // Empty marker instead of the value.
                self.diagnostics.set_properties(CodeProperties::Empty);
                let span = self.current.span;
                Expr::Identifier(IdToken::new("nil", Some(KeywordKind::Nil), span))
            }
            TokenKind::Syntax(_) => {
                self.report_expected("expression");
                return Err(FormAbort);
            }
        };

        if self.current.is_syntax(SyntaxKind::Dot) {
            self.parse_dotted_expression(res)
        } else {
            Ok(res)
        }
    }

    /// Parses a parenthetic form. A keyword after `(` is a built-in form;
    /// anything else is a function call.
    fn parse_parenthetic_form(&mut self) -> ParseResult<Expr> {
        match self.peek().keyword() {
            Some(kind) => self.parse_keyword_form(kind),
            None => self.parse_function_call(),
        }
    }

    fn parse_keyword_form(&mut self, kind: KeywordKind) -> ParseResult<Expr> {
        if kind.is_binary_operator() {
            return self.parse_binary_expression();
        }
        match kind {
            KeywordKind::Import => self.parse_import(),
            KeywordKind::Defun => self.parse_defun(),
            KeywordKind::Lambda => self.parse_lambda(),
            KeywordKind::Set => self.parse_set(),
            KeywordKind::LetStar => self.parse_let_star(),
            KeywordKind::Block => self.parse_block(),
            KeywordKind::Eq => self.parse_eq(),
            KeywordKind::Cons => self.parse_cons(),
            KeywordKind::List => self.parse_list_call(),
            KeywordKind::If => self.parse_if(),
            KeywordKind::New => self.parse_new(),
            KeywordKind::Loop => self.parse_loop(),
            KeywordKind::Break => self.parse_break(),
            KeywordKind::Elt => self.parse_elt(),
            KeywordKind::Not => self.parse_unary_expression(),
            other => {
                let span = self.peek().span;
                self.report(&messages::UNSUPPORTED_KEYWORD_FORM, span, &[other.as_str()]);
                self.skip_current_form();
                Err(FormAbort)
            }
        }
    }

    /// Consume the whole parenthesized form starting at the current open
    /// paren, so recovery resumes after it.
    fn skip_current_form(&mut self) {
        let base = self.depth;
        self.next_token();
        while self.depth > base && !self.current.is_eof() {
            self.next_token();
        }
    }

    /// Parses a sequence of expressions up to the close paren, which is
    /// gobbled too. Returns the body and the close paren's span.
    fn parse_body(&mut self) -> ParseResult<(Vec<Expr>, TextSpan)> {
        let mut body = Vec::new();

        while !self.current.is_eof() && !self.current.is_syntax(SyntaxKind::CloseParen) {
            body.push(self.parse_expression()?);
        }

        let close = self.expect_syntax(SyntaxKind::CloseParen)?;
        Ok((body, close.span))
    }

    fn parse_defun(&mut self) -> ParseResult<Expr> {
        let open = self.expect_syntax(SyntaxKind::OpenParen)?;
        self.expect_keyword(KeywordKind::Defun)?;

        let name = self.expect_identifier(false)?;
        let params = self.parse_params("Defun")?;
        let (body, close) = self.parse_body()?;

        Ok(Expr::Defun {
            name,
            params,
            body,
            span: open.span.union(&close),
        })
    }

    fn parse_lambda(&mut self) -> ParseResult<Expr> {
        let open = self.expect_syntax(SyntaxKind::OpenParen)?;
        self.expect_keyword(KeywordKind::Lambda)?;

        let params = self.parse_params("Lambda")?;
        let (body, close) = self.parse_body()?;

        Ok(Expr::Lambda {
            params,
            body,
            span: open.span.union(&close),
        })
    }

    /// Parses the flat parameter list of a defun or lambda. Keywords are
    /// rejected as parameter names.
    fn parse_params(&mut self, definer: &str) -> ParseResult<Vec<IdToken>> {
        let items = self.parse_list("param list")?;
        self.ensure_list_of_ids(items, false, &messages::PARAMS_MUST_BE_IDS, definer)
    }

    /// Validates that every raw list item is an identifier, rejecting
    /// keywords unless allowed, and converts to id tokens.
    fn ensure_list_of_ids(
        &mut self,
        items: Vec<ListItem>,
        allow_keywords: bool,
        message: &DiagnosticMessage,
        arg: &str,
    ) -> ParseResult<Vec<IdToken>> {
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            match item {
                ListItem::Id(id) if allow_keywords || id.keyword.is_none() => ids.push(id),
                other => {
                    let span = other.span();
                    self.report(message, span, &[arg]);
                    return Err(FormAbort);
                }
            }
        }
        Ok(ids)
    }

    // (import id[.id]* [{id | (id [id]*)} [{id | (id [id]*)}]])
    fn parse_import(&mut self) -> ParseResult<Expr> {
        let open = self.expect_syntax(SyntaxKind::OpenParen)?;
        self.expect_keyword(KeywordKind::Import)?;

        let namespaces = self.parse_import_name_or_module()?;
        let members = self.parse_import_names("member names", true)?;
        let renames = self.parse_import_names("renames", false)?;

        let close = self.expect_syntax(SyntaxKind::CloseParen)?;
        let span = open.span.union(&close.span);

        if members.len() != renames.len() && !renames.is_empty() {
            self.report(&messages::IMPORT_RENAMES_MISMATCH, span, &[]);
            return Err(FormAbort);
        }

        Ok(Expr::Import {
            namespaces,
            members,
            renames,
            span,
        })
    }

    /// Parses the dotted namespace-or-module path of an import. Keywords
    /// are fine after the first dot.
    fn parse_import_name_or_module(&mut self) -> ParseResult<Vec<IdToken>> {
        let first = self.expect_identifier(false)?;
        let mut names = vec![first];

        while self.current.is_syntax(SyntaxKind::Dot) {
            self.next_token();
            match self.expect_identifier(true) {
                Ok(id) => names.push(id),
                Err(abort) => {
                    let span = self.current.span;
                    self.report(&messages::IMPORT_TARGETS_MUST_BE_IDS, span, &[]);
                    return Err(abort);
                }
            }
        }

        Ok(names)
    }

    /// Parses a member-name (or rename) position: absent, a single id, or a
    /// parenthesized list of ids.
    fn parse_import_names(&mut self, name_kinds: &str, allow_keywords: bool) -> ParseResult<Vec<IdToken>> {
        match &self.current.kind {
            TokenKind::Syntax(SyntaxKind::OpenParen) => {
                let items = self.parse_list(name_kinds)?;
                self.ensure_list_of_ids(items, allow_keywords, &messages::IMPORT_NAMES_MUST_BE_IDS, name_kinds)
            }
            TokenKind::Syntax(SyntaxKind::CloseParen) => Ok(Vec::new()),
            _ => Ok(vec![self.expect_identifier(false)?]),
        }
    }

    /// Gathers infix dotted member-access segments: `a.b.(c 3).d`. Segments
    /// must be identifiers or calls whose function is an identifier; member
    /// names may be keywords.
    fn parse_dotted_expression(&mut self, target: Expr) -> ParseResult<Expr> {
        let mut segments = Vec::new();

        while self.current.is_syntax(SyntaxKind::Dot) {
            self.next_token();
            let segment = match &self.current.kind {
                TokenKind::IdOrKeyword { .. } => {
                    let token = self.next_token();
                    Expr::Identifier(id_token(token))
                }
                _ => {
                    let form = self.parse_parenthetic_form()?;
                    let well_formed = match &form {
                        Expr::Identifier(_) => true,
                        Expr::Call { function, .. } => function.is_identifier(),
                        _ => false,
                    };
                    if !well_formed {
                        let span = form.span();
                        self.report(&messages::DOTTED_MUST_BE_IDS_OR_CALLS, span, &[]);
                        return Err(FormAbort);
                    }
                    form
                }
            };
            segments.push(segment);
        }

        let span = target.span().union(&segments.last().map(Expr::span).unwrap_or_else(|| target.span()));
        Ok(Expr::Dot {
            target: Box::new(target),
            segments,
            span,
        })
    }

    fn parse_set(&mut self) -> ParseResult<Expr> {
        let open = self.expect_syntax(SyntaxKind::OpenParen)?;
        self.expect_keyword(KeywordKind::Set)?;

        let target = self.parse_expression()?;
        let value = self.parse_expression()?;

        let close = self.expect_syntax(SyntaxKind::CloseParen)?;
        Ok(Expr::Set {
            target: Box::new(target),
            value: Box::new(value),
            span: open.span.union(&close.span),
        })
    }

    /// Parses `(let* ((id value)...) body...)`. Bindings are sequential;
    /// each may refer to the ones before it.
    fn parse_let_star(&mut self) -> ParseResult<Expr> {
        let open = self.expect_syntax(SyntaxKind::OpenParen)?;
        self.expect_keyword(KeywordKind::LetStar)?;

        self.expect_syntax(SyntaxKind::OpenParen)?;
        let mut bindings = Vec::new();

        while self.current.is_syntax(SyntaxKind::OpenParen) {
            let binding_open = self.next_token();
            let name = match self.expect_identifier(false) {
                Ok(name) => name,
                Err(abort) => {
                    let span = binding_open.span.union(&self.current.span);
                    self.report(&messages::LET_BINDING_MALFORMED, span, &[]);
                    return Err(abort);
                }
            };
            let value = self.parse_expression()?;
            if !self.current.is_syntax(SyntaxKind::CloseParen) {
                let span = binding_open.span.union(&self.current.span);
                self.report(&messages::LET_BINDING_MALFORMED, span, &[]);
                return Err(FormAbort);
            }
            self.next_token();
            bindings.push(LetBinding { name, value });
        }

        self.expect_syntax(SyntaxKind::CloseParen)?;
        let (body, close) = self.parse_body()?;

        Ok(Expr::LetStar {
            bindings,
            body,
            span: open.span.union(&close),
        })
    }

    /// Parses a block expression, a sequence of exprs to execute in order,
    /// returning the last expression's value.
    fn parse_block(&mut self) -> ParseResult<Expr> {
        let open = self.expect_syntax(SyntaxKind::OpenParen)?;
        self.expect_keyword(KeywordKind::Block)?;

        let (body, close) = self.parse_body()?;
        Ok(Expr::Block {
            body,
            span: open.span.union(&close),
        })
    }

    fn parse_eq(&mut self) -> ParseResult<Expr> {
        let open = self.expect_syntax(SyntaxKind::OpenParen)?;
        self.expect_keyword(KeywordKind::Eq)?;

        let (left, right, close) = self.parse_binary_runtime_call()?;
        Ok(Expr::Eq {
            left: Box::new(left),
            right: Box::new(right),
            span: open.span.union(&close),
        })
    }

    fn parse_cons(&mut self) -> ParseResult<Expr> {
        let open = self.expect_syntax(SyntaxKind::OpenParen)?;
        self.expect_keyword(KeywordKind::Cons)?;

        let (left, right, close) = self.parse_binary_runtime_call()?;
        Ok(Expr::Cons {
            left: Box::new(left),
            right: Box::new(right),
            span: open.span.union(&close),
        })
    }

    /// Parses two exprs and a close paren.
    fn parse_binary_runtime_call(&mut self) -> ParseResult<(Expr, Expr, TextSpan)> {
        let left = self.parse_expression()?;
        let right = self.parse_expression()?;
        let close = self.expect_syntax(SyntaxKind::CloseParen)?;
        Ok((left, right, close.span))
    }

    /// Parses the `list` built-in form, which takes any number of args.
    fn parse_list_call(&mut self) -> ParseResult<Expr> {
        let open = self.expect_syntax(SyntaxKind::OpenParen)?;
        self.expect_keyword(KeywordKind::List)?;

        let (elements, close) = self.parse_body()?;
        Ok(Expr::ListCall {
            elements,
            span: open.span.union(&close),
        })
    }

    fn parse_if(&mut self) -> ParseResult<Expr> {
        let open = self.expect_syntax(SyntaxKind::OpenParen)?;
        self.expect_keyword(KeywordKind::If)?;

        let (mut args, close) = self.parse_body()?;
        let span = open.span.union(&close);

        if args.len() != 2 && args.len() != 3 {
            self.report(&messages::IF_ARITY, span, &[]);
            return Err(FormAbort);
        }

        let alternative = if args.len() == 3 {
            Some(Box::new(args.pop().expect("three if args")))
        } else {
            None
        };
        let consequent = args.pop().expect("if consequent");
        let test = args.pop().expect("if test");

        Ok(Expr::If {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternative,
            span,
        })
    }

    /// Parses a loop expression, a sequence of exprs to execute in order,
    /// forever. See `break` for returning a value.
    fn parse_loop(&mut self) -> ParseResult<Expr> {
        let open = self.expect_syntax(SyntaxKind::OpenParen)?;
        self.expect_keyword(KeywordKind::Loop)?;

        let (body, close) = self.parse_body()?;
        Ok(Expr::Loop {
            body,
            span: open.span.union(&close),
        })
    }

    /// Parses a break expression, whose optional value becomes the
    /// enclosing loop expression's value.
    fn parse_break(&mut self) -> ParseResult<Expr> {
        let open = self.expect_syntax(SyntaxKind::OpenParen)?;
        self.expect_keyword(KeywordKind::Break)?;

        let value = if self.current.is_syntax(SyntaxKind::CloseParen) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        let close = self.expect_syntax(SyntaxKind::CloseParen)?;
        Ok(Expr::Break {
            value,
            span: open.span.union(&close.span),
        })
    }

    /// Parses a `new` form for creating instances of types. The sub
    /// expression after the keyword evals to a type.
    fn parse_new(&mut self) -> ParseResult<Expr> {
        let open = self.expect_syntax(SyntaxKind::OpenParen)?;
        self.expect_keyword(KeywordKind::New)?;

        let type_expr = self.parse_expression()?;
        let (args, close) = self.parse_body()?;

        Ok(Expr::New {
            type_expr: Box::new(type_expr),
            args,
            span: open.span.union(&close),
        })
    }

    fn parse_elt(&mut self) -> ParseResult<Expr> {
        let open = self.expect_syntax(SyntaxKind::OpenParen)?;
        self.expect_keyword(KeywordKind::Elt)?;

        let target = self.parse_expression()?;
        let (indexes, close) = self.parse_body()?;

        Ok(Expr::Elt {
            target: Box::new(target),
            indexes,
            span: open.span.union(&close),
        })
    }

    /// A parenthesized form whose head is not a keyword: a function call,
    /// or a member invocation when the head is a dotted expression.
    fn parse_function_call(&mut self) -> ParseResult<Expr> {
        let open = self.expect_syntax(SyntaxKind::OpenParen)?;

        // First sub expression is a callable object or invoke-member target.
        let function = self.parse_expression()?;
        if let Expr::Dot { segments, .. } = &function {
            if !segments.last().map_or(false, Expr::is_identifier) {
                let span = open.span.union(&function.span());
                self.report(&messages::DOTTED_CALL_MUST_END_WITH_ID, span, &[]);
                return Err(FormAbort);
            }
        }

        let (args, close) = self.parse_body()?;
        Ok(Expr::Call {
            function: Box::new(function),
            args,
            span: open.span.union(&close),
        })
    }

    /// Parses a quoted list, id/keyword, or literal.
    fn parse_quote(&mut self) -> ParseResult<Expr> {
        let quote = self.expect_syntax(SyntaxKind::Quote)?;

        let form = match &self.current.kind {
            TokenKind::Syntax(SyntaxKind::OpenParen) => {
                let span_start = self.current.span;
                let items = self.parse_list("quoted list")?;
                let span = span_start.union(&self.current.span);
                QuoteForm::List(items, span)
            }
            TokenKind::IdOrKeyword { .. } => {
                let token = self.next_token();
                QuoteForm::Id(id_token(token))
            }
            TokenKind::Int(_) | TokenKind::Float(_) | TokenKind::Str(_) => {
                let token = self.next_token();
                let span = token.span;
                QuoteForm::Literal(literal_of(token), span)
            }
            _ => {
                let span = self.current.span;
                self.report(&messages::QUOTED_EXPRESSION_FORM, span, &[]);
                return Err(FormAbort);
            }
        };

        let span = quote.span.union(&form_span(&form));
        Ok(Expr::Quote { form, span })
    }

    /// Parses pure list and atom structure: ids, strings, and numbers.
    /// Used for import names, defun/lambda params, and quoted lists.
    fn parse_list(&mut self, err_str: &str) -> ParseResult<Vec<ListItem>> {
        self.expect_syntax(SyntaxKind::OpenParen)?;

        let mut items = Vec::new();
        loop {
            match &self.current.kind {
                TokenKind::Syntax(SyntaxKind::Eof) => {
                    let span = self.current.span;
                    self.diagnostics.set_properties(CodeProperties::IncompleteInput);
                    self.report(&messages::UNEXPECTED_EOF_IN_LIST, span, &[]);
                    return Err(FormAbort);
                }
                TokenKind::Syntax(SyntaxKind::CloseParen) => break,
                TokenKind::Syntax(SyntaxKind::OpenParen) => {
                    let start = self.current.span;
                    let nested = self.parse_list(err_str)?;
                    let span = start.union(&self.current.span);
                    items.push(ListItem::List(nested, span));
                }
                TokenKind::IdOrKeyword { .. } => {
                    let token = self.next_token();
                    items.push(ListItem::Id(id_token(token)));
                }
                TokenKind::Int(_) | TokenKind::Float(_) | TokenKind::Str(_) => {
                    let token = self.next_token();
                    let span = token.span;
                    items.push(ListItem::Literal(literal_of(token), span));
                }
                TokenKind::Syntax(SyntaxKind::Dot) => {
                    let span = self.current.span;
                    self.report(&messages::DOTTED_SYNTAX_IN_LIST, span, &[err_str]);
                    return Err(FormAbort);
                }
                TokenKind::Syntax(SyntaxKind::Quote) => {
                    let span = self.current.span;
                    let desc = self.current.kind.description();
                    self.report(&messages::UNEXPECTED_TOKEN_IN_LIST, span, &[&desc]);
                    return Err(FormAbort);
                }
            }
        }

        self.expect_syntax(SyntaxKind::CloseParen)?;
        Ok(items)
    }

    /// Parses a binary operator form: `(+ a b)` and friends.
    fn parse_binary_expression(&mut self) -> ParseResult<Expr> {
        let open = self.expect_syntax(SyntaxKind::OpenParen)?;
        let keyword = self.next_token();
        let op = keyword
            .keyword()
            .and_then(BinaryOp::from_keyword)
            .ok_or(FormAbort)?;

        let (left, right, close) = self.parse_binary_runtime_call()?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span: open.span.union(&close),
        })
    }

    /// Parses a unary operator form: `(not x)`.
    fn parse_unary_expression(&mut self) -> ParseResult<Expr> {
        let open = self.expect_syntax(SyntaxKind::OpenParen)?;
        self.expect_keyword(KeywordKind::Not)?;

        let operand = self.parse_expression()?;
        let close = self.expect_syntax(SyntaxKind::CloseParen)?;

        Ok(Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
            span: open.span.union(&close.span),
        })
    }
}

// ============================================================================
// Token-to-node helpers
// ============================================================================

fn id_token(token: Token) -> IdToken {
    match token.kind {
        TokenKind::IdOrKeyword { name, keyword } => IdToken::new(name, keyword, token.span),
        other => unreachable!("id_token on non-identifier token {:?}", other),
    }
}

fn literal_of(token: Token) -> Literal {
    match token.kind {
        TokenKind::Int(n) => Literal::Int(n),
        TokenKind::Float(n) => Literal::Float(n),
        TokenKind::Str(s) => Literal::Str(s),
        other => unreachable!("literal_of on non-literal token {:?}", other),
    }
}

fn literal_expr(token: Token) -> Expr {
    let span = token.span;
    Expr::Literal {
        value: literal_of(token),
        span,
    }
}

fn form_span(form: &QuoteForm) -> TextSpan {
    match form {
        QuoteForm::List(_, span) => *span,
        QuoteForm::Id(id) => id.span,
        QuoteForm::Literal(_, span) => *span,
    }
}
