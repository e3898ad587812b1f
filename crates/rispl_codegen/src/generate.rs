//! The code generator: AST to executable `Code`.

use crate::code::{Code, Executable, LambdaDef};
use crate::error::AnalysisError;
use crate::scope::{ScopeArena, ScopeId};
use rispl_ast::expr::{BinaryOp, Expr, IdToken, LetBinding, ListItem, Literal, QuoteForm, UnaryOp};
use rispl_ast::token::KeywordKind;
use rispl_binder::{CallSite, CallSiteKey, ExecutionContext};
use rispl_binder::site::DEFAULT_SITE_CACHE;
use rispl_core::text::TextSpan;
use rispl_runtime::{Cons, Value};
use std::sync::Arc;

/// Generate an executable for a full program. A program evaluates to nil;
/// its effects live in the module namespace.
pub fn generate_program(
    ctx: &ExecutionContext,
    exprs: &[Expr],
) -> Result<Executable, AnalysisError> {
    Generator::new(ctx).program(exprs)
}

/// Generate an executable for a single expression, which evaluates to the
/// expression's value.
pub fn generate_expression(
    ctx: &ExecutionContext,
    expr: &Expr,
) -> Result<Executable, AnalysisError> {
    Generator::new(ctx).expression(expr)
}

/// Walks the AST once, threading a scope chain, and emits `Code`.
pub struct Generator<'a> {
    ctx: &'a ExecutionContext,
    scopes: ScopeArena,
    temp_counter: usize,
    site_cache: usize,
}

impl<'a> Generator<'a> {
    pub fn new(ctx: &'a ExecutionContext) -> Self {
        Self::with_site_cache(ctx, DEFAULT_SITE_CACHE)
    }

    /// A generator whose emitted sites carry an explicit inline-cache
    /// bound.
    pub fn with_site_cache(ctx: &'a ExecutionContext, site_cache: usize) -> Self {
        Self {
            ctx,
            scopes: ScopeArena::new(),
            temp_counter: 0,
            site_cache,
        }
    }

    /// Generate a full program.
    pub fn program(mut self, exprs: &[Expr]) -> Result<Executable, AnalysisError> {
        let module = self.scopes.push_module();
        let mut body = Vec::with_capacity(exprs.len() + 1);
        for expr in exprs {
            body.push(self.generate(expr, module)?);
        }
        body.push(Code::Const(Value::Nil));
        Ok(Executable::new(body))
    }

    /// Generate a single expression.
    pub fn expression(mut self, expr: &Expr) -> Result<Executable, AnalysisError> {
        let module = self.scopes.push_module();
        let code = self.generate(expr, module)?;
        Ok(Executable::new(vec![code]))
    }

    fn site(&self, key: CallSiteKey) -> Arc<CallSite> {
        Arc::new(self.ctx.call_site_with_bound(key, self.site_cache))
    }

    fn fresh_temp(&mut self, span: TextSpan) -> IdToken {
        self.temp_counter += 1;
        IdToken::new(format!("__tmpLetVariable{}", self.temp_counter), None, span)
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    fn generate(&mut self, expr: &Expr, scope: ScopeId) -> Result<Code, AnalysisError> {
        match expr {
            Expr::Import {
                namespaces,
                members,
                renames,
                span,
            } => self.generate_import(namespaces, members, renames, *span, scope),
            Expr::Call { function, args, .. } => self.generate_call(function, args, scope),
            Expr::Defun {
                name,
                params,
                body,
                span,
            } => self.generate_defun(name, params, body, *span, scope),
            Expr::Lambda { params, body, .. } => self.generate_function(None, params, body, scope),
            Expr::Identifier(id) => Ok(self.generate_identifier(id, scope)),
            Expr::Quote { form, .. } => Ok(Code::Const(self.quote_value(form))),
            Expr::Literal { value, .. } => Ok(Code::Const(literal_value(value))),
            Expr::Set { target, value, span } => self.generate_assignment(target, value, *span, scope),
            Expr::LetStar { bindings, body, .. } => self.generate_let_star(bindings, body, scope),
            Expr::Block { body, .. } => {
                let body = self.generate_all(body, scope)?;
                Ok(Code::Block(body))
            }
            Expr::Eq { left, right, .. } => Ok(Code::Eq {
                left: Box::new(self.generate(left, scope)?),
                right: Box::new(self.generate(right, scope)?),
            }),
            Expr::Cons { left, right, .. } => Ok(Code::ConsCell {
                left: Box::new(self.generate(left, scope)?),
                right: Box::new(self.generate(right, scope)?),
            }),
            Expr::ListCall { elements, .. } => {
                let elements = self.generate_all(elements, scope)?;
                Ok(Code::ListCall(elements))
            }
            Expr::If {
                test,
                consequent,
                alternative,
                ..
            } => {
                let alternative = match alternative {
                    Some(alternative) => self.generate(alternative, scope)?,
                    None => Code::Const(Value::Bool(false)),
                };
                Ok(Code::If {
                    test: Box::new(Code::Truthy(Box::new(self.generate(test, scope)?))),
                    consequent: Box::new(self.generate(consequent, scope)?),
                    alternative: Box::new(alternative),
                })
            }
            Expr::Dot { target, segments, .. } => self.generate_dot(target, segments, scope),
            Expr::New { type_expr, args, .. } => {
                let mut operands = Vec::with_capacity(args.len() + 1);
                operands.push(self.generate(type_expr, scope)?);
                for arg in args {
                    operands.push(self.generate(arg, scope)?);
                }
                Ok(Code::Dynamic {
                    site: self.site(CallSiteKey::create_instance(args.len())),
                    operands,
                })
            }
            Expr::Loop { body, .. } => {
                let loop_scope = self.scopes.push_loop(scope);
                let body = self.generate_all(body, loop_scope)?;
                Ok(Code::Loop(body))
            }
            Expr::Break { value, span } => {
                if self.scopes.find_loop(scope).is_none() {
                    return Err(AnalysisError::BreakOutsideLoop { span: *span });
                }
                let value = match value {
                    Some(value) => Some(Box::new(self.generate(value, scope)?)),
                    None => None,
                };
                Ok(Code::Break(value))
            }
            Expr::Elt { target, indexes, .. } => {
                let mut operands = Vec::with_capacity(indexes.len() + 1);
                operands.push(self.generate(target, scope)?);
                for index in indexes {
                    operands.push(self.generate(index, scope)?);
                }
                Ok(Code::Dynamic {
                    site: self.site(CallSiteKey::get_index(indexes.len())),
                    operands,
                })
            }
            Expr::Binary {
                op, left, right, span, ..
            } => self.generate_binary(*op, left, right, *span, scope),
            Expr::Unary { op, operand, .. } => match op {
                UnaryOp::Not => Ok(Code::Not(Box::new(self.generate(operand, scope)?))),
            },
        }
    }

    fn generate_all(&mut self, exprs: &[Expr], scope: ScopeId) -> Result<Vec<Code>, AnalysisError> {
        exprs.iter().map(|e| self.generate(e, scope)).collect()
    }

    // ========================================================================
    // Identifiers and assignment
    // ========================================================================

    /// A name reference is a lexical slot when the scope chain has one,
    /// else a late-bound, case-insensitive lookup on the module namespace:
    /// the language has no fixed global declarations.
    fn generate_identifier(&mut self, id: &IdToken, scope: ScopeId) -> Code {
        match id.keyword {
            Some(KeywordKind::Nil) => return Code::Const(Value::Nil),
            Some(KeywordKind::True) => return Code::Const(Value::Bool(true)),
            Some(KeywordKind::False) => return Code::Const(Value::Bool(false)),
            _ => {}
        }

        match self.scopes.resolve(scope, &id.name) {
            Some(slot) => Code::Local(slot),
            None => Code::Dynamic {
                site: self.site(CallSiteKey::get_member(&id.name)),
                operands: vec![Code::Module],
            },
        }
    }

    fn generate_assignment(
        &mut self,
        target: &Expr,
        value: &Expr,
        span: TextSpan,
        scope: ScopeId,
    ) -> Result<Code, AnalysisError> {
        match target {
            Expr::Identifier(id) => {
                let value = self.generate(value, scope)?;
                match self.scopes.resolve(scope, &id.name) {
                    // A slot write evaluates to the stored value.
                    Some(slot) => Ok(Code::AssignLocal(slot, Box::new(value))),
                    // No lexical binding: a late-bound module set, which
                    // also evaluates to the stored value.
                    None => Ok(Code::Dynamic {
                        site: self.site(CallSiteKey::set_member(&id.name)),
                        operands: vec![Code::Module, value],
                    }),
                }
            }
            Expr::Elt { target, indexes, .. } => {
                let mut operands = Vec::with_capacity(indexes.len() + 2);
                operands.push(self.generate(target, scope)?);
                for index in indexes {
                    operands.push(self.generate(index, scope)?);
                }
                operands.push(self.generate(value, scope)?);
                Ok(Code::Dynamic {
                    site: self.site(CallSiteKey::set_index(indexes.len())),
                    operands,
                })
            }
            Expr::Dot { target, segments, .. } => {
                if segments.len() > 1 {
                    return Err(AnalysisError::MultiDotAssignment { span });
                }
                let member = match segments.first() {
                    Some(Expr::Identifier(id)) => id.name.clone(),
                    _ => return Err(AnalysisError::InvalidAssignmentTarget { span }),
                };
                let object = self.generate(target, scope)?;
                let value = self.generate(value, scope)?;
                Ok(Code::Dynamic {
                    site: self.site(CallSiteKey::set_member(&member)),
                    operands: vec![object, value],
                })
            }
            _ => Err(AnalysisError::InvalidAssignmentTarget { span }),
        }
    }

    // ========================================================================
    // Functions and calls
    // ========================================================================

    /// `defun` requires the module scope and performs a late-bound set of
    /// the function value into the module namespace. No local binding is
    /// created: recursive self-reference resolves through the late global
    /// lookup.
    fn generate_defun(
        &mut self,
        name: &IdToken,
        params: &[IdToken],
        body: &[Expr],
        span: TextSpan,
        scope: ScopeId,
    ) -> Result<Code, AnalysisError> {
        if !self.scopes.is_module(scope) {
            return Err(AnalysisError::DefunOutsideModule { span });
        }
        let lambda = self.generate_function(Some(name.name.clone()), params, body, scope)?;
        Ok(Code::Dynamic {
            site: self.site(CallSiteKey::set_member(&name.name)),
            operands: vec![Code::Module, lambda],
        })
    }

    fn generate_function(
        &mut self,
        name: Option<String>,
        params: &[IdToken],
        body: &[Expr],
        scope: ScopeId,
    ) -> Result<Code, AnalysisError> {
        let fun_scope = self.scopes.push_lambda(scope);
        for param in params {
            self.scopes.declare(fun_scope, &param.name);
        }
        let body = self.generate_all(body, fun_scope)?;
        Ok(Code::Lambda(Arc::new(LambdaDef {
            name,
            params: params.len(),
            body,
        })))
    }

    /// A call is a member invocation when the callee is dotted (the
    /// receiver is the dotted prefix without the final name), otherwise an
    /// invocation of a first-class callable.
    fn generate_call(
        &mut self,
        function: &Expr,
        args: &[Expr],
        scope: ScopeId,
    ) -> Result<Code, AnalysisError> {
        let mut operands = Vec::with_capacity(args.len() + 1);

        let site = match function {
            Expr::Dot { target, segments, .. } => {
                let name = match segments.last() {
                    Some(Expr::Identifier(id)) => id.name.clone(),
                    _ => unreachable!("the parser rejects dotted calls not ending in an identifier"),
                };
                let receiver = if segments.len() > 1 {
                    self.generate_dot(target, &segments[..segments.len() - 1], scope)?
                } else {
                    self.generate(target, scope)?
                };
                operands.push(receiver);
                self.site(CallSiteKey::invoke_member(&name, args.len()))
            }
            _ => {
                operands.push(self.generate(function, scope)?);
                self.site(CallSiteKey::invoke(args.len()))
            }
        };

        for arg in args {
            operands.push(self.generate(arg, scope)?);
        }
        Ok(Code::Dynamic { site, operands })
    }

    /// A dotted chain is a cascade of get-member and invoke-member sites.
    fn generate_dot(
        &mut self,
        target: &Expr,
        segments: &[Expr],
        scope: ScopeId,
    ) -> Result<Code, AnalysisError> {
        let mut current = self.generate(target, scope)?;
        for segment in segments {
            current = match segment {
                Expr::Identifier(id) => Code::Dynamic {
                    site: self.site(CallSiteKey::get_member(&id.name)),
                    operands: vec![current],
                },
                Expr::Call { function, args, .. } => {
                    let name = match function.as_ref() {
                        Expr::Identifier(id) => id.name.clone(),
                        _ => unreachable!("the parser rejects non-identifier invoke segments"),
                    };
                    let mut operands = Vec::with_capacity(args.len() + 1);
                    operands.push(current);
                    for arg in args {
                        operands.push(self.generate(arg, scope)?);
                    }
                    Code::Dynamic {
                        site: self.site(CallSiteKey::invoke_member(&name, args.len())),
                        operands,
                    }
                }
                _ => unreachable!("the parser rejects other dotted segments"),
            };
        }
        Ok(current)
    }

    // ========================================================================
    // Binding forms
    // ========================================================================

    /// Each binding's initializer is generated before the binding's own
    /// name is declared, so an initializer never sees its own
    /// half-initialized variable while still seeing all prior bindings.
    fn generate_let_star(
        &mut self,
        bindings: &[LetBinding],
        body: &[Expr],
        scope: ScopeId,
    ) -> Result<Code, AnalysisError> {
        let let_scope = self.scopes.push_let(scope);
        let mut code = Vec::with_capacity(bindings.len() + body.len());

        for binding in bindings {
            let init = self.generate(&binding.value, let_scope)?;
            let index = self.scopes.declare(let_scope, &binding.name.name);
            code.push(Code::AssignLocal(
                crate::scope::SlotRef { up: 0, index },
                Box::new(init),
            ));
        }

        for expr in body {
            code.push(self.generate(expr, let_scope)?);
        }

        Ok(Code::LetStar {
            slots: self.scopes.slot_count(let_scope),
            body: code,
        })
    }

    // ========================================================================
    // Operators
    // ========================================================================

    /// `and`/`or` lower to conditionals so each operand is evaluated at
    /// most once; other operators become dynamic operator sites.
    fn generate_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        span: TextSpan,
        scope: ScopeId,
    ) -> Result<Code, AnalysisError> {
        match op {
            // (and l r) is (if l r false).
            BinaryOp::And => Ok(Code::If {
                test: Box::new(Code::Truthy(Box::new(self.generate(left, scope)?))),
                consequent: Box::new(self.generate(right, scope)?),
                alternative: Box::new(Code::Const(Value::Bool(false))),
            }),
            // (or l r) is (let* ((t1 l)) (if t1 t1 (let* ((t2 r)) (if t2 t2)))),
            // with fresh temporaries so neither operand is evaluated twice.
            BinaryOp::Or => {
                let t1 = self.fresh_temp(span);
                let t2 = self.fresh_temp(span);

                let inner_if = Expr::If {
                    test: Box::new(Expr::Identifier(t2.clone())),
                    consequent: Box::new(Expr::Identifier(t2.clone())),
                    alternative: None,
                    span,
                };
                let inner = Expr::LetStar {
                    bindings: vec![LetBinding {
                        name: t2,
                        value: right.clone(),
                    }],
                    body: vec![inner_if],
                    span,
                };
                let outer_if = Expr::If {
                    test: Box::new(Expr::Identifier(t1.clone())),
                    consequent: Box::new(Expr::Identifier(t1.clone())),
                    alternative: Some(Box::new(inner)),
                    span,
                };
                let outer = Expr::LetStar {
                    bindings: vec![LetBinding {
                        name: t1,
                        value: left.clone(),
                    }],
                    body: vec![outer_if],
                    span,
                };
                self.generate(&outer, scope)
            }
            _ => {
                let left = self.generate(left, scope)?;
                let right = self.generate(right, scope)?;
                Ok(Code::Dynamic {
                    site: self.site(CallSiteKey::binary(op)),
                    operands: vec![left, right],
                })
            }
        }
    }

    // ========================================================================
    // Import and quote
    // ========================================================================

    fn generate_import(
        &mut self,
        namespaces: &[IdToken],
        members: &[IdToken],
        renames: &[IdToken],
        span: TextSpan,
        scope: ScopeId,
    ) -> Result<Code, AnalysisError> {
        if !self.scopes.is_module(scope) {
            return Err(AnalysisError::ImportOutsideModule { span });
        }
        Ok(Code::Import {
            namespaces: namespaces.iter().map(|id| id.name.clone()).collect(),
            members: members.iter().map(|id| id.name.clone()).collect(),
            renames: renames.iter().map(|id| id.name.clone()).collect(),
        })
    }

    /// Quoted data becomes a constant at generation time: lists become
    /// cons chains, identifiers become interned symbols, literals are
    /// themselves.
    fn quote_value(&self, form: &QuoteForm) -> Value {
        match form {
            QuoteForm::List(items, _) => self.quote_list(items),
            QuoteForm::Id(id) => Value::Symbol(self.ctx.intern(&id.name)),
            QuoteForm::Literal(lit, _) => literal_value(lit),
        }
    }

    fn quote_list(&self, items: &[ListItem]) -> Value {
        let values: Vec<Value> = items.iter().map(|item| self.quote_item(item)).collect();
        Cons::list(&values)
    }

    fn quote_item(&self, item: &ListItem) -> Value {
        match item {
            ListItem::List(items, _) => self.quote_list(items),
            ListItem::Id(id) => Value::Symbol(self.ctx.intern(&id.name)),
            ListItem::Literal(lit, _) => literal_value(lit),
        }
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(n) => Value::Double(*n),
        Literal::Str(s) => Value::str(s.clone()),
    }
}
