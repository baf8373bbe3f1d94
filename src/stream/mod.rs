//! Lazy tree traversal.
//!
//! Traversal is depth first, pre-order, with siblings in their natural order.
//! Nothing is read ahead: the next node is produced only when asked for, so a
//! consumer can stop early on an arbitrarily large tree.

mod filtered;

pub use filtered::ResourceFilterStream;

use tracing::trace;

use crate::resource::Resource;

/// Depth-first iterator over a resource and its descendants.
///
/// The branch selector decides, for every node below the start, whether its
/// children are visited. A node that fails the selector is still yielded; only
/// its subtree is skipped.
pub struct Descendants<R: Resource, B> {
    next_root: Option<R>,
    stack: Vec<R::Children>,
    branch: B,
}

impl<R, B> Descendants<R, B>
where
    R: Resource,
    B: FnMut(&R) -> bool,
{
    /// Start at `root`, which is yielded first and always expanded.
    pub fn new(root: R, branch: B) -> Self {
        Self {
            next_root: Some(root),
            stack: Vec::new(),
            branch,
        }
    }

    /// Start below `root`, yielding its descendants but not `root` itself.
    pub fn below(root: &R, branch: B) -> Self {
        Self {
            next_root: None,
            stack: vec![root.children()],
            branch,
        }
    }
}

impl<R, B> Iterator for Descendants<R, B>
where
    R: Resource,
    B: FnMut(&R) -> bool,
{
    type Item = R;

    fn next(&mut self) -> Option<R> {
        if let Some(root) = self.next_root.take() {
            self.stack.push(root.children());
            return Some(root);
        }
        loop {
            let children = self.stack.last_mut()?;
            match children.next() {
                Some(child) => {
                    trace!(path = %child.path(), depth = self.stack.len(), "visit");
                    if (self.branch)(&child) {
                        self.stack.push(child.children());
                    }
                    return Some(child);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Direct children of a resource that pass a selector.
pub struct ListChildren<R: Resource, P> {
    children: R::Children,
    selector: P,
}

impl<R, P> Iterator for ListChildren<R, P>
where
    R: Resource,
    P: FnMut(&R) -> bool,
{
    type Item = R;

    fn next(&mut self) -> Option<R> {
        let selector = &mut self.selector;
        self.children.find(|child| selector(child))
    }
}

/// Traversal helpers rooted at one resource.
#[derive(Debug, Clone)]
pub struct ResourceStream<R> {
    root: R,
}

impl<R: Resource> ResourceStream<R> {
    pub fn new(root: R) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &R {
        &self.root
    }

    /// The root followed by its descendants, descending into a child only
    /// when `branch_selector` accepts it.
    pub fn stream<B>(self, branch_selector: B) -> Descendants<R, B>
    where
        B: FnMut(&R) -> bool,
    {
        Descendants::new(self.root, branch_selector)
    }

    /// Direct children of the root accepted by `child_selector`.
    pub fn list_children<P>(&self, child_selector: P) -> ListChildren<R, P>
    where
        P: FnMut(&R) -> bool,
    {
        ListChildren {
            children: self.root.children(),
            selector: child_selector,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentNode, ContentTree};

    fn tree() -> ContentTree {
        ContentTree::new(
            "/r",
            ContentNode::new("r")
                .with_child(
                    ContentNode::new("a")
                        .with_child(ContentNode::new("a1"))
                        .with_child(ContentNode::new("a2").with_child(ContentNode::new("a2x"))),
                )
                .with_child(ContentNode::new("b").with_child(ContentNode::new("b1"))),
        )
    }

    fn paths<'a>(nodes: impl Iterator<Item = &'a ContentNode>) -> Vec<String> {
        nodes.map(|n| n.path().to_string()).collect()
    }

    #[test]
    fn pre_order_with_root_first() {
        let tree = tree();
        let all = ResourceStream::new(tree.root()).stream(|_| true);
        assert_eq!(
            paths(all),
            ["/r", "/r/a", "/r/a/a1", "/r/a/a2", "/r/a/a2/a2x", "/r/b", "/r/b/b1"]
        );
    }

    #[test]
    fn branch_selector_prunes_subtrees_but_keeps_the_node() {
        let tree = tree();
        let stream = ResourceStream::new(tree.root()).stream(|n: &&ContentNode| n.name() != "a");
        assert_eq!(paths(stream), ["/r", "/r/a", "/r/b", "/r/b/b1"]);
    }

    #[test]
    fn root_is_expanded_even_when_rejected() {
        let tree = tree();
        let stream = ResourceStream::new(tree.root()).stream(|_| false);
        assert_eq!(paths(stream), ["/r", "/r/a", "/r/b"]);
    }

    #[test]
    fn below_skips_the_root() {
        let tree = tree();
        let below = Descendants::below(&tree.root(), |_: &&ContentNode| true);
        assert_eq!(paths(below).len(), 6);
    }

    #[test]
    fn traversal_is_lazy() {
        let tree = tree();
        let mut visited = 0;
        let first_two: Vec<_> = ResourceStream::new(tree.root())
            .stream(|_| {
                visited += 1;
                true
            })
            .take(2)
            .collect();
        assert_eq!(first_two.len(), 2);
        assert_eq!(visited, 1);
    }

    #[test]
    fn list_children_filters_direct_children() {
        let tree = tree();
        let stream = ResourceStream::new(tree.root());
        assert_eq!(paths(stream.list_children(|n| n.name() == "b")), ["/r/b"]);
        assert_eq!(paths(stream.list_children(|_| true)), ["/r/a", "/r/b"]);
    }
}
