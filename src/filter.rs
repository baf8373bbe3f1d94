//! Compiled resource filters.

use std::fmt;

use crate::compiler::{self, Predicate};
use crate::context::Context;
use crate::dsl::{self, parse_filter};
use crate::error::FilterError;
use crate::resource::{Attributed, Resource};
use crate::stream::Descendants;
use crate::value::Value;

/// A filter expression compiled against a [`Context`].
///
/// ```
/// use resource_filter::{ContentTree, ResourceFilter};
///
/// let tree = ContentTree::from_json_str("/content", r#"{"a": {"title": "x"}}"#).unwrap();
/// let filter = ResourceFilter::compile("[title] == 'x'").unwrap();
/// let hits: Vec<_> = filter.select_children(&tree.root()).collect();
/// assert_eq!(hits.len(), 1);
/// ```
#[derive(Clone)]
pub struct ResourceFilter {
    source: String,
    context: Context,
    predicate: Predicate,
}

impl ResourceFilter {
    /// Compile with the standard operators and functions and no parameters.
    pub fn compile(expression: &str) -> Result<Self, FilterError> {
        Self::compile_with(expression, Context::standard())
    }

    pub fn compile_with(expression: &str, context: Context) -> Result<Self, FilterError> {
        let ast = parse_filter(expression)?;
        let predicate = compiler::compile_root(&ast, &context)?;
        Ok(Self {
            source: expression.to_string(),
            context,
            predicate,
        })
    }

    /// Compile an expression stored as bytes. `None` means UTF-8.
    pub fn compile_bytes(bytes: &[u8], encoding: Option<&str>) -> Result<Self, FilterError> {
        Self::compile_bytes_with(bytes, encoding, Context::standard())
    }

    pub fn compile_bytes_with(
        bytes: &[u8],
        encoding: Option<&str>,
        context: Context,
    ) -> Result<Self, FilterError> {
        let text = dsl::decode(bytes, encoding)?;
        Self::compile_with(&text, context)
    }

    pub fn builder() -> FilterBuilder {
        FilterBuilder::default()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The compiled predicate, for use outside this type.
    pub fn predicate(&self) -> Predicate {
        self.predicate.clone()
    }

    pub fn test<R: Attributed>(&self, node: &R) -> bool {
        (self.predicate)(node)
    }

    /// A new filter with `$name` rebound. `self` is unchanged.
    pub fn bind(&self, name: &str, value: impl Into<Value>) -> Result<Self, FilterError> {
        let mut context = self.context.clone();
        context.add_argument(name, value);
        Self::compile_with(&self.source, context)
    }

    /// Direct children of `root` that match.
    pub fn select_children<R: Resource>(&self, root: &R) -> impl Iterator<Item = R> + use<R> {
        let predicate = self.predicate();
        root.children().filter(move |child| predicate(child))
    }

    /// Matching descendants of `root`, excluding `root`, in pre-order.
    pub fn select_descendants<R: Resource>(&self, root: &R) -> impl Iterator<Item = R> + use<R> {
        let predicate = self.predicate();
        Descendants::below(root, |_: &R| true).filter(move |node| predicate(node))
    }

    /// `root` and its descendants that match, in pre-order.
    pub fn select_subtree<R: Resource>(&self, root: R) -> impl Iterator<Item = R> + use<R> {
        let predicate = self.predicate();
        Descendants::new(root, |_: &R| true).filter(move |node| predicate(node))
    }
}

impl fmt::Debug for ResourceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceFilter")
            .field("source", &self.source)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Collects parameters before compiling.
#[derive(Debug, Default)]
pub struct FilterBuilder {
    context: Option<Context>,
    params: Vec<(String, Value)>,
}

impl FilterBuilder {
    /// Start from `context` instead of [`Context::standard`].
    pub fn context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    fn into_context(self) -> Context {
        let mut context = self.context.unwrap_or_default();
        context.add_arguments(self.params);
        context
    }

    pub fn build(self, expression: &str) -> Result<ResourceFilter, FilterError> {
        ResourceFilter::compile_with(expression, self.into_context())
    }

    pub fn build_bytes(self, bytes: &[u8], encoding: Option<&str>) -> Result<ResourceFilter, FilterError> {
        ResourceFilter::compile_bytes_with(bytes, encoding, self.into_context())
    }
}
