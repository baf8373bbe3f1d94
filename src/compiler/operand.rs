use std::borrow::Cow;
use std::sync::Arc;

use tracing::trace;

use super::{Predicate, compile, predicate};
use crate::context::{Context, Function};
use crate::dsl::{CompareOp, Node};
use crate::error::FilterError;
use crate::resource::Attributed;
use crate::value::Value;

/// A compiled comparison operand, resolved per node.
pub(crate) enum Operand {
    Constant(Value),
    Path(String),
    Call {
        function: Arc<dyn Function>,
        args: Vec<Operand>,
    },
    Condition(Predicate),
}

impl Operand {
    /// `None` when the node has no such value. Null properties count as missing.
    pub(crate) fn resolve(&self, node: &dyn Attributed) -> Option<Cow<'_, Value>> {
        match self {
            Operand::Constant(Value::Null) => None,
            Operand::Constant(value) => Some(Cow::Borrowed(value)),
            Operand::Path(path) => match node.resolve(path)? {
                Value::Null => None,
                value => Some(Cow::Owned(value)),
            },
            Operand::Call { function, args } => {
                let args = args
                    .iter()
                    .map(|arg| arg.resolve(node).map(Cow::into_owned))
                    .collect::<Option<Vec<_>>>()?;
                function.call(node, &args).map(Cow::Owned)
            }
            Operand::Condition(test) => Some(Cow::Owned(Value::Boolean(test(node)))),
        }
    }
}

pub(crate) fn compile_operand(node: &Node, context: &Context) -> Result<Operand, FilterError> {
    match node {
        Node::Literal(value) => Ok(Operand::Constant(value.clone())),
        Node::Parameter(name) => context
            .argument(name)
            .cloned()
            .map(Operand::Constant)
            .ok_or_else(|| FilterError::UnboundParameter(name.clone())),
        Node::Path { segments } => Ok(Operand::Path(segments.join("/"))),
        Node::Function { name, args } => {
            let function = context
                .function(name)
                .ok_or_else(|| FilterError::UnknownFunction(name.clone()))?
                .clone();
            let arity = function.arity();
            if !arity.contains(&args.len()) {
                let expected = if arity.start() == arity.end() {
                    arity.start().to_string()
                } else {
                    format!("{} to {}", arity.start(), arity.end())
                };
                return Err(FilterError::Arity {
                    name: name.clone(),
                    expected,
                    actual: args.len(),
                });
            }
            let args = args
                .iter()
                .map(|arg| compile_operand(arg, context))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Operand::Call { function, args })
        }
        Node::Logic { .. } | Node::Comparison { .. } => Ok(Operand::Condition(compile(node, context)?)),
    }
}

pub(crate) fn compile_comparison(
    op: CompareOp,
    left: &Node,
    right: &Node,
    context: &Context,
) -> Result<Predicate, FilterError> {
    let mut strategy = context
        .comparison(op)
        .ok_or(FilterError::UnknownOperator(op))?
        .clone();
    let left = compile_operand(left, context)?;
    let right = compile_operand(right, context)?;

    if let Operand::Constant(value) = &right {
        let specialized = strategy
            .specialize(value)
            .map_err(|message| FilterError::InvalidArgument {
                operator: op.to_string(),
                message,
            })?;
        if let Some(specialized) = specialized {
            strategy = specialized;
        }
    }

    Ok(predicate(move |node| {
        let Some(l) = left.resolve(node) else {
            trace!(path = %node.path(), %op, "left operand missing");
            return false;
        };
        let Some(r) = right.resolve(node) else {
            trace!(path = %node.path(), %op, "right operand missing");
            return false;
        };
        strategy.compare(&l, &r)
    }))
}
