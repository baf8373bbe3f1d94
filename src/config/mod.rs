use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::FilterError;
use crate::filter::ResourceFilter;
use crate::resource::Resource;
use crate::stream::ResourceFilterStream;
use crate::value::Value;

/// A stored query: selectors, their parameters and a result limit.
///
/// ```yaml
/// child_selector: "[jcr:content/jcr:title] == $lang"
/// branch_selector: "name() != 'archive'"
/// params:
///   lang: Mongolian
/// limit: 10
/// ```
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct QueryConfig {
    #[serde(default)]
    pub branch_selector: Option<String>,
    #[serde(default)]
    pub child_selector: Option<String>,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub limit: Option<usize>,
    /// Encoding of expression files given alongside this query.
    #[serde(default)]
    pub encoding: Option<String>,
}

impl QueryConfig {
    /// Load from any format the `config` crate understands (YAML, JSON, TOML).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn parameters(&self) -> impl Iterator<Item = (String, Value)> + '_ {
        self.params
            .iter()
            .map(|(name, value)| (name.clone(), Value::from_json(value)))
    }

    fn compile(&self, selector: Option<&str>) -> Result<Option<ResourceFilter>, FilterError> {
        selector
            .map(|expr| ResourceFilter::builder().params(self.parameters()).build(expr))
            .transpose()
    }

    /// The child selector compiled on its own, with this query's parameters.
    pub fn child_filter(&self) -> Result<Option<ResourceFilter>, FilterError> {
        self.compile(self.child_selector.as_deref())
    }

    /// The branch selector compiled on its own, with this query's parameters.
    pub fn branch_filter(&self) -> Result<Option<ResourceFilter>, FilterError> {
        self.compile(self.branch_selector.as_deref())
    }

    /// A stream over `root` configured by this query.
    pub fn stream_from<R: Resource>(&self, root: R) -> ResourceFilterStream<R> {
        let mut stream = ResourceFilterStream::new(root).add_params(self.parameters());
        if let Some(branch) = &self.branch_selector {
            stream = stream.set_branch_selector(branch.as_str());
        }
        if let Some(child) = &self.child_selector {
            stream = stream.set_child_selector(child.as_str());
        }
        if let Some(limit) = self.limit {
            stream = stream.set_limit(limit);
        }
        stream
    }
}
