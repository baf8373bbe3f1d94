//! Parameter bindings and pluggable comparison/function strategies.

use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::builtins;
use crate::dsl::CompareOp;
use crate::resource::Attributed;
use crate::value::Value;

/// Semantics of one comparison operator.
pub trait Comparison: Send + Sync {
    /// Both operands are present; missing operands never reach a strategy.
    fn compare(&self, left: &Value, right: &Value) -> bool;

    /// Called once at compile time when the right operand is a constant.
    ///
    /// A strategy may return a replacement specialised for that operand
    /// (a precompiled pattern, say) or reject the operand outright.
    fn specialize(&self, _right: &Value) -> Result<Option<Arc<dyn Comparison>>, String> {
        Ok(None)
    }
}

impl<F> Comparison for F
where
    F: Fn(&Value, &Value) -> bool + Send + Sync,
{
    fn compare(&self, left: &Value, right: &Value) -> bool {
        self(left, right)
    }
}

/// A function callable from an expression, e.g. `name()`.
pub trait Function: Send + Sync {
    /// Accepted argument counts, checked at compile time.
    fn arity(&self) -> RangeInclusive<usize> {
        0..=usize::MAX
    }

    /// `None` means "no value"; any comparison using it is false.
    fn call(&self, node: &dyn Attributed, args: &[Value]) -> Option<Value>;
}

impl<F> Function for F
where
    F: Fn(&dyn Attributed, &[Value]) -> Option<Value> + Send + Sync,
{
    fn call(&self, node: &dyn Attributed, args: &[Value]) -> Option<Value> {
        self(node, args)
    }
}

/// Registry consulted while compiling one filter.
///
/// Parameters are read at compile time: rebinding after a filter has been
/// compiled does not change that filter. A context is cheap to clone; clone
/// one per thread rather than sharing it mutably.
#[derive(Clone)]
pub struct Context {
    arguments: HashMap<String, Value>,
    comparisons: HashMap<CompareOp, Arc<dyn Comparison>>,
    functions: HashMap<String, Arc<dyn Function>>,
}

impl Context {
    /// An empty context: no parameters, no operators, no functions.
    pub fn new() -> Self {
        Self {
            arguments: HashMap::new(),
            comparisons: HashMap::new(),
            functions: HashMap::new(),
        }
    }

    /// A context with every built-in operator and `name()`, `path()`, `date()`.
    pub fn standard() -> Self {
        let mut context = Self::new();
        builtins::register_comparisons(&mut context);
        builtins::register_functions(&mut context);
        context
    }

    /// Bind `$name`. Binding the same name again replaces the value.
    pub fn add_argument(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub fn add_arguments<I, K, V>(&mut self, arguments: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in arguments {
            self.add_argument(name, value);
        }
        self
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    pub fn register_comparison(
        &mut self,
        op: CompareOp,
        strategy: impl Comparison + 'static,
    ) -> &mut Self {
        self.comparisons.insert(op, Arc::new(strategy));
        self
    }

    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        strategy: impl Function + 'static,
    ) -> &mut Self {
        self.functions.insert(name.into(), Arc::new(strategy));
        self
    }

    pub fn comparison(&self, op: CompareOp) -> Option<&Arc<dyn Comparison>> {
        self.comparisons.get(&op)
    }

    pub fn function(&self, name: &str) -> Option<&Arc<dyn Function>> {
        self.functions.get(name)
    }
}

impl Default for Context {
    /// Same as [`Context::standard`].
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ops: Vec<_> = self.comparisons.keys().map(CompareOp::symbol).collect();
        ops.sort_unstable();
        let mut functions: Vec<_> = self.functions.keys().map(String::as_str).collect();
        functions.sort_unstable();
        f.debug_struct("Context")
            .field("arguments", &self.arguments)
            .field("comparisons", &ops)
            .field("functions", &functions)
            .finish()
    }
}
