//! AST types for the filter language.

use std::fmt;

use crate::value::Value;

/// Root filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `and` / `or` over two or more children, `not` over exactly one.
    Logic { op: LogicOp, children: Vec<Node> },

    /// `left op right`, e.g. `[jcr:title] == $lang`
    Comparison {
        op: CompareOp,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// `name()`, `date([created], 'yyyy')`
    Function { name: String, args: Vec<Node> },

    /// `[jcr:content/jcr:title]`
    Path { segments: Vec<String> },

    /// String, number, date, boolean or null constant.
    Literal(Value),

    /// `$name`
    Parameter(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicOp {
    And,
    Or,
    Not,
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,             // ==
    Ne,             // !=
    Gt,             // >
    Ge,             // >=
    Lt,             // <
    Le,             // <=
    Like,           // like
    NotLike,        // like not
    Contains,       // contains
    NotContains,    // contains not
    ContainsAny,    // contains any
    NotContainsAny, // contains not any
    In,             // in
    NotIn,          // not in
}

impl CompareOp {
    pub const ALL: [CompareOp; 14] = [
        CompareOp::Eq,
        CompareOp::Ne,
        CompareOp::Gt,
        CompareOp::Ge,
        CompareOp::Lt,
        CompareOp::Le,
        CompareOp::Like,
        CompareOp::NotLike,
        CompareOp::Contains,
        CompareOp::NotContains,
        CompareOp::ContainsAny,
        CompareOp::NotContainsAny,
        CompareOp::In,
        CompareOp::NotIn,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Like => "like",
            CompareOp::NotLike => "like not",
            CompareOp::Contains => "contains",
            CompareOp::NotContains => "contains not",
            CompareOp::ContainsAny => "contains any",
            CompareOp::NotContainsAny => "contains not any",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl Node {
    pub fn and(children: Vec<Node>) -> Self {
        Node::Logic {
            op: LogicOp::And,
            children,
        }
    }

    pub fn or(children: Vec<Node>) -> Self {
        Node::Logic {
            op: LogicOp::Or,
            children,
        }
    }

    pub fn not(inner: Node) -> Self {
        Node::Logic {
            op: LogicOp::Not,
            children: vec![inner],
        }
    }

    pub fn compare(left: Node, op: CompareOp, right: Node) -> Self {
        Node::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn path(path: &str) -> Self {
        Node::Path {
            segments: path.split('/').map(str::to_string).collect(),
        }
    }

    /// Flatten directly nested `and`/`or` of the same kind.
    pub fn simplify(self) -> Self {
        match self {
            Node::Logic { op, children } if op != LogicOp::Not => {
                let mut flat = Vec::with_capacity(children.len());
                for child in children {
                    match child.simplify() {
                        Node::Logic {
                            op: inner_op,
                            children: inner,
                        } if inner_op == op => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                Node::Logic { op, children: flat }
            }
            Node::Logic { op, children } => Node::Logic {
                op,
                children: children.into_iter().map(Node::simplify).collect(),
            },
            other => other,
        }
    }
}

impl fmt::Display for Node {
    /// Fully parenthesized rendering, useful to check precedence.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Logic {
                op: LogicOp::Not,
                children,
            } => {
                write!(f, "(not")?;
                for child in children {
                    write!(f, " {}", child)?;
                }
                write!(f, ")")
            }
            Node::Logic { op, children } => {
                let sep = if *op == LogicOp::And { " and " } else { " or " };
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", sep)?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
            Node::Comparison { op, left, right } => write!(f, "{} {} {}", left, op, right),
            Node::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Node::Path { segments } => write!(f, "[{}]", segments.join("/")),
            Node::Literal(Value::String(s)) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Node::Literal(value) => write!(f, "{}", value),
            Node::Parameter(name) => write!(f, "${}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplify_flattens_same_kind_only() {
        let a = Node::path("a");
        let b = Node::path("b");
        let c = Node::path("c");
        let nested = Node::and(vec![Node::and(vec![a.clone(), b.clone()]), c.clone()]);
        assert_eq!(nested.simplify(), Node::and(vec![a.clone(), b.clone(), c.clone()]));

        let mixed = Node::or(vec![Node::and(vec![a.clone(), b.clone()]), c.clone()]);
        assert_eq!(mixed.clone().simplify(), mixed);
    }

    #[test]
    fn display_is_fully_parenthesized() {
        let node = Node::or(vec![
            Node::compare(Node::path("a"), CompareOp::Eq, Node::Literal(Value::Long(1))),
            Node::not(Node::compare(
                Node::Function {
                    name: "name".into(),
                    args: vec![],
                },
                CompareOp::Like,
                Node::Parameter("re".into()),
            )),
        ]);
        assert_eq!(node.to_string(), "([a] == 1 or (not name() like $re))");
    }
}
