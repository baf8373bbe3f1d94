//! Filter expressions over hierarchical resources.
//!
//! An expression such as `[jcr:content/created] < $date and name() like 'page.*'`
//! is parsed, compiled against a [`Context`] once, and then evaluated as a
//! plain predicate on any number of nodes. [`ResourceFilterStream`] walks a
//! tree lazily through a branch selector and a child selector.

pub mod builtins;
pub mod compiler;
pub mod config;
pub mod content;
pub mod context;
pub mod dsl;
pub mod error;
pub mod filter;
pub mod resource;
pub mod stream;
pub mod value;

pub use compiler::Predicate;
pub use content::{ContentError, ContentNode, ContentTree};
pub use context::{Comparison, Context, Function};
pub use error::{FilterError, LexError, ParseError};
pub use filter::{FilterBuilder, ResourceFilter};
pub use resource::{Attributed, Resource};
pub use stream::{Descendants, ResourceFilterStream, ResourceStream};
pub use value::Value;
