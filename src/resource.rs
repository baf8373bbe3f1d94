//! The node abstraction filters are evaluated against.
//!
//! The compiler only needs [`Attributed`], which is object safe, so one
//! compiled predicate serves every resource type. Traversal additionally
//! needs [`Resource::children`].

use std::borrow::Cow;

use crate::value::Value;

/// Read access to a node's identity and properties.
pub trait Attributed {
    /// Last segment of the node's path.
    fn name(&self) -> Cow<'_, str>;

    /// Absolute path of the node.
    fn path(&self) -> Cow<'_, str>;

    /// Resolve a relative, slash separated property path such as
    /// `jcr:content/jcr:title`. `None` when any segment is missing.
    fn resolve(&self, path: &str) -> Option<Value>;
}

/// A node in a tree that can enumerate its children.
///
/// The children iterator must not borrow from `self`, so that a traversal can
/// hold the iterators of several levels at once. Handle types such as
/// `&'a Node` or `Rc<Node>` satisfy this naturally.
pub trait Resource: Attributed + Sized {
    type Children: Iterator<Item = Self>;

    /// Direct children in their natural order.
    fn children(&self) -> Self::Children;
}

impl<T: Attributed + ?Sized> Attributed for &T {
    fn name(&self) -> Cow<'_, str> {
        (**self).name()
    }

    fn path(&self) -> Cow<'_, str> {
        (**self).path()
    }

    fn resolve(&self, path: &str) -> Option<Value> {
        (**self).resolve(path)
    }
}
