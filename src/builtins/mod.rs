//! Standard operator and function strategies.

mod comparisons;
mod functions;

pub use comparisons::{Contains, In, Like, Ordered};
pub use functions::{DateOf, Name, Path};

use crate::context::Context;
use crate::dsl::CompareOp;

pub fn register_comparisons(context: &mut Context) {
    context
        .register_comparison(CompareOp::Eq, Ordered::EQ)
        .register_comparison(CompareOp::Ne, Ordered::NE)
        .register_comparison(CompareOp::Gt, Ordered::GT)
        .register_comparison(CompareOp::Ge, Ordered::GE)
        .register_comparison(CompareOp::Lt, Ordered::LT)
        .register_comparison(CompareOp::Le, Ordered::LE)
        .register_comparison(CompareOp::Like, Like { negate: false })
        .register_comparison(CompareOp::NotLike, Like { negate: true })
        .register_comparison(CompareOp::Contains, Contains { any: false, negate: false })
        .register_comparison(CompareOp::NotContains, Contains { any: false, negate: true })
        .register_comparison(CompareOp::ContainsAny, Contains { any: true, negate: false })
        .register_comparison(CompareOp::NotContainsAny, Contains { any: true, negate: true })
        .register_comparison(CompareOp::In, In { negate: false })
        .register_comparison(CompareOp::NotIn, In { negate: true });
}

pub fn register_functions(context: &mut Context) {
    context
        .register_function("name", Name)
        .register_function("path", Path)
        .register_function("date", DateOf);
}
