//! rispl_compiler: engine orchestration.
//!
//! Ties the pipeline together: source text is parsed, scope-resolved, and
//! generated into an executable unit of shape `(execution context, module
//! namespace) -> value`. The engine owns the execution context, so every
//! unit compiled through it shares the symbol table, host type table, and
//! canonical binders.

use rispl_binder::ExecutionContext;
use rispl_codegen::{AnalysisError, Executable, Generator};
use rispl_diagnostics::{CodeProperties, DiagnosticCollection};
use rispl_eval::execute;
use rispl_runtime::{Namespace, RuntimeError, Symbol, Value};
use std::sync::Arc;
use thiserror::Error;

/// Compilation options.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Whether warning diagnostics are kept on compiled units.
    pub show_warnings: bool,
    /// Bound for each dynamic site's inline rule cache.
    pub max_site_cache: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            show_warnings: true,
            max_site_cache: rispl_binder::site::DEFAULT_SITE_CACHE,
        }
    }
}

/// Why a unit failed to compile.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Lexing or parsing reported errors.
    #[error("parse failed with {} error(s)", diagnostics.error_count())]
    Parse { diagnostics: DiagnosticCollection },

    /// Code generation found a structural error.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl CompileError {
    /// Whether the input looked truncated rather than malformed, so an
    /// interactive host should prompt for more.
    pub fn is_incomplete_input(&self) -> bool {
        match self {
            CompileError::Parse { diagnostics } => {
                diagnostics.properties() == CodeProperties::IncompleteInput
            }
            CompileError::Analysis(_) => false,
        }
    }

    /// The parse diagnostics, when parsing is what failed.
    pub fn diagnostics(&self) -> Option<&DiagnosticCollection> {
        match self {
            CompileError::Parse { diagnostics } => Some(diagnostics),
            CompileError::Analysis(_) => None,
        }
    }
}

/// A compile-or-run failure, for the convenience entry points.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// A compiled unit plus any warnings produced on the way.
#[derive(Debug)]
pub struct CompiledUnit {
    executable: Executable,
    pub diagnostics: DiagnosticCollection,
}

impl CompiledUnit {
    /// Run the unit against an execution context and module namespace.
    pub fn execute(
        &self,
        ctx: &Arc<ExecutionContext>,
        module: &Arc<Namespace>,
    ) -> Result<Value, RuntimeError> {
        execute(&self.executable, ctx, module)
    }
}

/// The compilation engine.
pub struct Engine {
    context: Arc<ExecutionContext>,
    options: CompilerOptions,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_options(CompilerOptions::default())
    }

    pub fn with_options(options: CompilerOptions) -> Self {
        Self {
            context: ExecutionContext::new(),
            options,
        }
    }

    /// The engine's execution context: globals, symbols, host types,
    /// binders.
    pub fn context(&self) -> &Arc<ExecutionContext> {
        &self.context
    }

    /// Intern a symbol; exposed so hosts can compare sentinel values.
    pub fn intern(&self, name: &str) -> Arc<Symbol> {
        self.context.intern(name)
    }

    /// Create a fresh module namespace to run units in.
    pub fn make_module(&self) -> Arc<Namespace> {
        self.context.make_module()
    }

    /// Compile a full program: a sequence of top-level expressions. A
    /// program evaluates to nil; its effects live in the module namespace.
    pub fn compile_program(&self, source: &str) -> Result<CompiledUnit, CompileError> {
        let out = rispl_parser::parse_program(source);
        let diagnostics = self.check_parse(out.diagnostics)?;
        let generator = Generator::with_site_cache(&self.context, self.options.max_site_cache);
        let executable = generator.program(&out.exprs)?;
        Ok(CompiledUnit {
            executable,
            diagnostics,
        })
    }

    /// Compile a single expression, as for interactive input. The unit
    /// evaluates to the expression's value.
    pub fn compile_expression(&self, source: &str) -> Result<CompiledUnit, CompileError> {
        let out = rispl_parser::parse_one(source);
        let diagnostics = self.check_parse(out.diagnostics)?;
        let generator = Generator::with_site_cache(&self.context, self.options.max_site_cache);
        let executable = match out.exprs.first() {
            Some(expr) => generator.expression(expr)?,
            None => Executable::new(Vec::new()),
        };
        Ok(CompiledUnit {
            executable,
            diagnostics,
        })
    }

    fn check_parse(
        &self,
        mut diagnostics: DiagnosticCollection,
    ) -> Result<DiagnosticCollection, CompileError> {
        if diagnostics.has_errors() {
            return Err(CompileError::Parse { diagnostics });
        }
        if !self.options.show_warnings {
            diagnostics.clear();
        }
        Ok(diagnostics)
    }

    /// Compile and run a program in the module namespace.
    pub fn run(&self, source: &str, module: &Arc<Namespace>) -> Result<Value, EngineError> {
        let unit = self.compile_program(source)?;
        Ok(unit.execute(&self.context, module)?)
    }

    /// Compile and evaluate a single expression in the module namespace.
    pub fn eval(&self, source: &str, module: &Arc<Namespace>) -> Result<Value, EngineError> {
        let unit = self.compile_expression(source)?;
        Ok(unit.execute(&self.context, module)?)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
