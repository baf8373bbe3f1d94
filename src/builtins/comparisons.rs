use std::cmp::Ordering;
use std::sync::Arc;

use regex::Regex;

use crate::context::Comparison;
use crate::value::Value;

/// `==`, `!=`, `<`, `<=`, `>`, `>=` over coerced scalars.
#[derive(Debug, Clone, Copy)]
pub struct Ordered {
    accept: fn(Ordering) -> bool,
}

impl Ordered {
    pub const EQ: Ordered = Ordered { accept: Ordering::is_eq };
    pub const NE: Ordered = Ordered { accept: Ordering::is_ne };
    pub const GT: Ordered = Ordered { accept: Ordering::is_gt };
    pub const GE: Ordered = Ordered { accept: Ordering::is_ge };
    pub const LT: Ordered = Ordered { accept: Ordering::is_lt };
    pub const LE: Ordered = Ordered { accept: Ordering::is_le };
}

impl Comparison for Ordered {
    fn compare(&self, left: &Value, right: &Value) -> bool {
        // Incomparable operands fail every operator, `!=` included.
        left.compare(right).is_some_and(self.accept)
    }
}

fn full_match(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}

fn any_matches(regex: &Regex, left: &Value) -> bool {
    left.elements().iter().any(|item| regex.is_match(&item.to_string()))
}

/// `like` and `like not`. The right operand is a regular expression that
/// must match the whole string form of the left operand.
#[derive(Debug, Clone, Copy)]
pub struct Like {
    pub negate: bool,
}

impl Comparison for Like {
    fn compare(&self, left: &Value, right: &Value) -> bool {
        // A pattern only known at evaluation time that fails to compile
        // cannot be decided either way.
        match full_match(&right.to_string()) {
            Ok(regex) => any_matches(&regex, left) != self.negate,
            Err(_) => false,
        }
    }

    fn specialize(&self, right: &Value) -> Result<Option<Arc<dyn Comparison>>, String> {
        let regex = full_match(&right.to_string()).map_err(|e| e.to_string())?;
        Ok(Some(Arc::new(CompiledLike { regex, negate: self.negate })))
    }
}

#[derive(Debug)]
struct CompiledLike {
    regex: Regex,
    negate: bool,
}

impl Comparison for CompiledLike {
    fn compare(&self, left: &Value, _right: &Value) -> bool {
        any_matches(&self.regex, left) != self.negate
    }
}

/// `contains`, `contains not`, `contains any`, `contains not any`.
///
/// A list on the left must hold the right element (every element when the
/// right is a list, at least one for `any`); text on the left must contain
/// it as a substring.
#[derive(Debug, Clone, Copy)]
pub struct Contains {
    pub any: bool,
    pub negate: bool,
}

impl Contains {
    fn holds(left: &Value, wanted: &Value) -> bool {
        match left {
            Value::String(text) => match wanted {
                Value::String(part) => text.contains(part.as_str()),
                other => text.contains(&other.to_string()),
            },
            other => other.elements().iter().any(|item| item.loosely_equals(wanted)),
        }
    }

    fn decide(&self, left: &Value, right: &Value) -> Option<bool> {
        if matches!(left, Value::Null) || matches!(right, Value::Null) {
            return None;
        }
        let wanted = right.elements();
        Some(if self.any {
            wanted.iter().any(|w| Self::holds(left, w))
        } else {
            wanted.iter().all(|w| Self::holds(left, w))
        })
    }
}

impl Comparison for Contains {
    fn compare(&self, left: &Value, right: &Value) -> bool {
        self.decide(left, right).is_some_and(|found| found != self.negate)
    }
}

/// `in` and `not in`: the scalar on the left is one of the right elements.
#[derive(Debug, Clone, Copy)]
pub struct In {
    pub negate: bool,
}

impl Comparison for In {
    fn compare(&self, left: &Value, right: &Value) -> bool {
        if matches!(left, Value::List(_) | Value::Null) {
            return false;
        }
        let found = right.elements().iter().any(|item| left.loosely_equals(item));
        found != self.negate
    }
}
