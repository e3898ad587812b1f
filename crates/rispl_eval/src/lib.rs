//! rispl_eval: the tree-walking evaluator.
//!
//! Runs an [`Executable`] against an `(execution context, module
//! namespace)` pair. Lexical slots live in chained environment records;
//! lambdas close over the environment current when the `Lambda` node is
//! evaluated. Dynamic nodes evaluate their operands left to right and
//! hand them to the embedded call site.

pub mod env;

use env::Env;
use rispl_binder::ExecutionContext;
use rispl_codegen::{Code, Executable, LambdaDef};
use rispl_runtime::{Cons, Function, Namespace, RuntimeError, Value};
use std::sync::Arc;

/// Execute a compiled unit. The result is the last expression's value.
pub fn execute(
    executable: &Executable,
    ctx: &Arc<ExecutionContext>,
    module: &Arc<Namespace>,
) -> Result<Value, RuntimeError> {
    let interp = Interp {
        ctx: Arc::clone(ctx),
        module: Arc::clone(module),
    };
    match interp.eval_body(&executable.body, &None)? {
        Flow::Value(value) => Ok(value),
        // A break that unwinds out of the unit has no loop to stop at.
        Flow::Break(_) => Err(RuntimeError::BreakOutsideLoop),
    }
}

/// Evaluation outcome: an ordinary value, or a break unwinding to the
/// nearest enclosing loop.
enum Flow {
    Value(Value),
    Break(Value),
}

/// Propagate a break outward, like `?` for values.
macro_rules! value_of {
    ($flow:expr) => {
        match $flow {
            Flow::Value(value) => value,
            Flow::Break(value) => return Ok(Flow::Break(value)),
        }
    };
}

struct Interp {
    ctx: Arc<ExecutionContext>,
    module: Arc<Namespace>,
}

impl Interp {
    fn eval_body(&self, body: &[Code], env: &Option<Arc<Env>>) -> Result<Flow, RuntimeError> {
        let mut result = Value::Nil;
        for code in body {
            result = value_of!(self.eval(code, env)?);
        }
        Ok(Flow::Value(result))
    }

    fn eval(&self, code: &Code, env: &Option<Arc<Env>>) -> Result<Flow, RuntimeError> {
        match code {
            Code::Const(value) => Ok(Flow::Value(value.clone())),

            Code::Local(slot) => Ok(Flow::Value(Env::get(env, slot.up, slot.index))),

            Code::AssignLocal(slot, value) => {
                let value = value_of!(self.eval(value, env)?);
                Env::set(env, slot.up, slot.index, value.clone());
                Ok(Flow::Value(value))
            }

            Code::Module => Ok(Flow::Value(Value::Namespace(Arc::clone(&self.module)))),

            Code::Dynamic { site, operands } => {
                let mut values = Vec::with_capacity(operands.len());
                for operand in operands {
                    values.push(value_of!(self.eval(operand, env)?));
                }
                site.execute(self.ctx.type_info(), &values).map(Flow::Value)
            }

            Code::Block(body) => self.eval_body(body, env),

            Code::LetStar { slots, body } => {
                let inner = Env::push(env, *slots);
                self.eval_body(body, &inner)
            }

            Code::If {
                test,
                consequent,
                alternative,
            } => {
                let test = value_of!(self.eval(test, env)?);
                if test.is_truthy() {
                    self.eval(consequent, env)
                } else {
                    self.eval(alternative, env)
                }
            }

            Code::Truthy(operand) => {
                let value = value_of!(self.eval(operand, env)?);
                Ok(Flow::Value(Value::Bool(value.is_truthy())))
            }

            Code::Not(operand) => {
                let value = value_of!(self.eval(operand, env)?);
                Ok(Flow::Value(Value::Bool(!value.is_truthy())))
            }

            Code::Loop(body) => loop {
                for code in body {
                    if let Flow::Break(value) = self.eval(code, env)? {
                        return Ok(Flow::Value(value));
                    }
                }
            },

            Code::Break(value) => {
                let value = match value {
                    Some(value) => value_of!(self.eval(value, env)?),
                    None => Value::Nil,
                };
                Ok(Flow::Break(value))
            }

            Code::Lambda(def) => Ok(Flow::Value(self.make_closure(def, env))),

            Code::Eq { left, right } => {
                let left = value_of!(self.eval(left, env)?);
                let right = value_of!(self.eval(right, env)?);
                Ok(Flow::Value(Value::Bool(left.eq_value(&right))))
            }

            Code::ConsCell { left, right } => {
                let left = value_of!(self.eval(left, env)?);
                let right = value_of!(self.eval(right, env)?);
                Ok(Flow::Value(Value::Cons(Cons::new(left, right))))
            }

            Code::ListCall(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(value_of!(self.eval(element, env)?));
                }
                Ok(Flow::Value(Cons::list(&values)))
            }

            Code::Import {
                namespaces,
                members,
                renames,
            } => self
                .ctx
                .import(&self.module, namespaces, members, renames)
                .map(Flow::Value),
        }
    }

    /// Build a first-class callable that runs the lambda body in a fresh
    /// environment chained onto the captured one. A break escaping the
    /// body has no enclosing loop in the callee.
    fn make_closure(&self, def: &Arc<LambdaDef>, env: &Option<Arc<Env>>) -> Value {
        let def = Arc::clone(def);
        let captured = env.clone();
        let interp = Interp {
            ctx: Arc::clone(&self.ctx),
            module: Arc::clone(&self.module),
        };

        Value::Function(Arc::new(Function::new(
            def.name.clone(),
            def.params,
            move |args| {
                let frame = Env::push_with(&captured, def.params, args);
                match interp.eval_body(&def.body, &frame)? {
                    Flow::Value(value) => Ok(value),
                    Flow::Break(_) => Err(RuntimeError::BreakOutsideLoop),
                }
            },
        )))
    }
}
