use tracing::debug;

use super::ResourceStream;
use crate::context::Context;
use crate::error::FilterError;
use crate::filter::ResourceFilter;
use crate::resource::Resource;
use crate::value::Value;

/// Streams a tree through branch and child selectors, given as text or as
/// encoded bytes.
///
/// Parameters are shared by both selectors. Without a branch selector every
/// node is descended into; without a child selector every node is returned.
///
/// ```
/// use resource_filter::{ContentTree, ResourceFilterStream};
///
/// let tree = ContentTree::from_json_str("/", r#"{"a": {"lang": "mn"}, "b": {}}"#).unwrap();
/// let found: Vec<_> = ResourceFilterStream::new(tree.root())
///     .set_child_selector("[lang] == $lang")
///     .add_param("lang", "mn")
///     .stream()
///     .unwrap()
///     .collect();
/// assert_eq!(found.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ResourceFilterStream<R> {
    root: R,
    context: Context,
    branch_selector: Option<Selector>,
    child_selector: Option<Selector>,
    limit: Option<usize>,
}

/// Selector source, decoded and compiled when the stream starts.
#[derive(Debug, Clone)]
enum Selector {
    Text(String),
    Encoded {
        bytes: Vec<u8>,
        encoding: Option<String>,
    },
}

impl Selector {
    fn compile(&self, context: &Context) -> Result<ResourceFilter, FilterError> {
        match self {
            Selector::Text(expr) => ResourceFilter::compile_with(expr, context.clone()),
            Selector::Encoded { bytes, encoding } => {
                ResourceFilter::compile_bytes_with(bytes, encoding.as_deref(), context.clone())
            }
        }
    }

    fn describe(selector: Option<&Selector>) -> &str {
        match selector {
            None => "*",
            Some(Selector::Text(expr)) => expr,
            Some(Selector::Encoded { .. }) => "<encoded>",
        }
    }
}

impl<R: Resource> ResourceFilterStream<R> {
    pub fn new(root: R) -> Self {
        Self::with_context(root, Context::standard())
    }

    pub fn with_context(root: R, context: Context) -> Self {
        Self {
            root,
            context,
            branch_selector: None,
            child_selector: None,
            limit: None,
        }
    }

    /// Children of a node are visited only if the node matches this.
    pub fn set_branch_selector(mut self, expression: impl Into<String>) -> Self {
        self.branch_selector = Some(Selector::Text(expression.into()));
        self
    }

    /// Branch selector given as raw bytes in `encoding` (UTF-8 when `None`).
    pub fn set_branch_selector_bytes(mut self, bytes: impl Into<Vec<u8>>, encoding: Option<&str>) -> Self {
        self.branch_selector = Some(Selector::Encoded {
            bytes: bytes.into(),
            encoding: encoding.map(str::to_string),
        });
        self
    }

    /// Only nodes matching this are returned.
    pub fn set_child_selector(mut self, expression: impl Into<String>) -> Self {
        self.child_selector = Some(Selector::Text(expression.into()));
        self
    }

    /// Child selector given as raw bytes in `encoding` (UTF-8 when `None`).
    pub fn set_child_selector_bytes(mut self, bytes: impl Into<Vec<u8>>, encoding: Option<&str>) -> Self {
        self.child_selector = Some(Selector::Encoded {
            bytes: bytes.into(),
            encoding: encoding.map(str::to_string),
        });
        self
    }

    pub fn add_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.add_argument(name, value);
        self
    }

    pub fn add_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.context.add_arguments(params);
        self
    }

    /// Stop after this many returned nodes.
    pub fn set_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn selector(&self, selector: Option<&Selector>) -> Result<Option<ResourceFilter>, FilterError> {
        selector.map(|s| s.compile(&self.context)).transpose()
    }

    /// The root and its descendants, depth first.
    ///
    /// Both selectors are compiled before the first node is read.
    pub fn stream(self) -> Result<impl Iterator<Item = R> + use<R>, FilterError> {
        let branch = self.selector(self.branch_selector.as_ref())?;
        let child = self.selector(self.child_selector.as_ref())?;
        debug!(
            root = %self.root.path(),
            branch = Selector::describe(self.branch_selector.as_ref()),
            child = Selector::describe(self.child_selector.as_ref()),
            limit = ?self.limit,
            "streaming resources"
        );

        Ok(ResourceStream::new(self.root)
            .stream(move |node: &R| branch.as_ref().is_none_or(|f| f.test(node)))
            .filter(move |node| child.as_ref().is_none_or(|f| f.test(node)))
            .take(self.limit.unwrap_or(usize::MAX)))
    }

    /// Direct children of the root that match the child selector.
    pub fn list_children(self) -> Result<impl Iterator<Item = R> + use<R>, FilterError> {
        let child = self.selector(self.child_selector.as_ref())?;
        let children = ResourceStream::new(self.root)
            .list_children(move |node: &R| child.as_ref().is_none_or(|f| f.test(node)));
        Ok(children.take(self.limit.unwrap_or(usize::MAX)))
    }
}
