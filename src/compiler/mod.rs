//! Turns a parsed filter into a reusable predicate.
//!
//! All lookups against the [`Context`] happen here, once. The resulting
//! predicate owns everything it needs and only reads the node it is given,
//! so it can be shared across threads and evaluated any number of times.

mod operand;

use std::sync::Arc;

use tracing::debug;

use crate::context::Context;
use crate::dsl::{LogicOp, Node};
use crate::error::FilterError;
use crate::resource::Attributed;

/// A compiled filter.
pub type Predicate = Arc<dyn Fn(&dyn Attributed) -> bool + Send + Sync>;

pub(crate) fn predicate(test: impl Fn(&dyn Attributed) -> bool + Send + Sync + 'static) -> Predicate {
    Arc::new(test)
}

/// Compile `node` against `context`.
///
/// Fails on unbound parameters, unknown operators or functions, wrong
/// argument counts, and constant operands an operator rejects.
pub fn compile(node: &Node, context: &Context) -> Result<Predicate, FilterError> {
    match node {
        Node::Logic { op, children } => {
            let children = children
                .iter()
                .map(|child| compile(child, context))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(match op {
                LogicOp::And => predicate(move |n| children.iter().all(|c| c(n))),
                LogicOp::Or => predicate(move |n| children.iter().any(|c| c(n))),
                // Always a single child from the parser; several are negated as a conjunction.
                LogicOp::Not => predicate(move |n| !children.iter().all(|c| c(n))),
            })
        }
        Node::Comparison { op, left, right } => operand::compile_comparison(*op, left, right, context),
        other => {
            let operand = operand::compile_operand(other, context)?;
            Ok(predicate(move |n| operand.resolve(n).is_some_and(|v| v.is_truthy())))
        }
    }
}

/// Compile a whole expression, logging the result.
pub(crate) fn compile_root(node: &Node, context: &Context) -> Result<Predicate, FilterError> {
    let compiled = compile(node, context)?;
    debug!(filter = %node, "compiled filter");
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::dsl::{CompareOp, parse_filter};
    use crate::value::Value;

    struct Props(HashMap<&'static str, Value>);

    impl Attributed for Props {
        fn name(&self) -> Cow<'_, str> {
            Cow::Borrowed("node")
        }

        fn path(&self) -> Cow<'_, str> {
            Cow::Borrowed("/node")
        }

        fn resolve(&self, path: &str) -> Option<Value> {
            self.0.get(path).cloned()
        }
    }

    fn props(pairs: &[(&'static str, Value)]) -> Props {
        Props(pairs.iter().cloned().collect())
    }

    fn check(expr: &str, node: &Props) -> bool {
        let ast = parse_filter(expr).unwrap();
        compile(&ast, &Context::standard()).unwrap()(node)
    }

    #[test]
    fn missing_values_make_comparisons_false() {
        let node = props(&[("a", Value::from("x"))]);
        assert!(!check("[b] == 'x'", &node));
        assert!(!check("[b] != 'x'", &node));
        assert!(!check("[b] like 'x'", &node));
        assert!(check("not [b] == 'x'", &node));
    }

    #[test]
    fn null_properties_count_as_missing() {
        let node = props(&[("a", Value::Null)]);
        assert!(!check("[a] != 'x'", &node));
        assert!(!check("[a]", &node));
    }

    #[test]
    fn bare_operands_use_truthiness() {
        let node = props(&[("flag", Value::Boolean(true)), ("empty", Value::from(""))]);
        assert!(check("([flag]) and name() == 'node'", &node));
        assert!(!check("([empty]) or ([missing])", &node));
    }

    #[test]
    fn unbound_parameter_is_rejected() {
        let ast = parse_filter("[a] == $lang").unwrap();
        let err = compile(&ast, &Context::standard()).err();
        assert_eq!(err, Some(FilterError::UnboundParameter("lang".into())));
    }

    #[test]
    fn unknown_function_and_arity() {
        let ctx = Context::standard();
        let ast = parse_filter("shout() == 'x'").unwrap();
        assert_eq!(compile(&ast, &ctx).err(), Some(FilterError::UnknownFunction("shout".into())));

        let ast = parse_filter("name('x') == 'x'").unwrap();
        assert_eq!(
            compile(&ast, &ctx).err(),
            Some(FilterError::Arity { name: "name".into(), expected: "0".into(), actual: 1 })
        );
        let ast = parse_filter("date() == 'x'").unwrap();
        assert_eq!(
            compile(&ast, &ctx).err(),
            Some(FilterError::Arity { name: "date".into(), expected: "1 to 2".into(), actual: 0 })
        );
    }

    #[test]
    fn unknown_operator_without_strategy() {
        let ast = parse_filter("[a] == 'x'").unwrap();
        assert_eq!(
            compile(&ast, &Context::new()).err(),
            Some(FilterError::UnknownOperator(CompareOp::Eq))
        );
    }

    #[test]
    fn invalid_constant_pattern_fails_compilation() {
        let ast = parse_filter("name() like '(unclosed'").unwrap();
        match compile(&ast, &Context::standard()) {
            Err(FilterError::InvalidArgument { operator, .. }) => assert_eq!(operator, "like"),
            other => panic!("unexpected {:?}", other.err()),
        }
    }

    #[test]
    fn and_short_circuits() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let mut ctx = Context::standard();
        ctx.register_function("count", |_: &dyn Attributed, _: &[Value]| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Some(Value::Boolean(true))
        });
        let ast = parse_filter("[a] == 'no' and count() == true").unwrap();
        let test = compile(&ast, &ctx).unwrap();
        let node = props(&[("a", Value::from("yes"))]);
        assert!(!test(&node));
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);

        let ast = parse_filter("[a] == 'yes' or count() == true").unwrap();
        assert!(compile(&ast, &ctx).unwrap()(&node));
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn custom_comparison_replaces_builtin() {
        let mut ctx = Context::standard();
        ctx.register_comparison(CompareOp::Eq, |l: &Value, r: &Value| {
            l.to_string().eq_ignore_ascii_case(&r.to_string())
        });
        let ast = parse_filter("[a] == 'MONGOLIAN'").unwrap();
        let node = props(&[("a", Value::from("Mongolian"))]);
        assert!(compile(&ast, &ctx).unwrap()(&node));
    }
}
