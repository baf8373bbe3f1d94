//! In-memory resource trees loaded from JSON or YAML documents.
//!
//! Every object becomes a child resource, named by its key, in document
//! order. Any other value becomes a property of the enclosing resource:
//! arrays are multi-valued properties, and strings holding a date with an
//! explicit offset (RFC 3339 or `Thu Aug 07 2013 16:32:59 GMT+0200`) become
//! dates.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::resource::{Attributed, Resource};
use crate::value::{Value, parse_zoned_date};

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON content: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML content: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("content root must be an object, found {0}")]
    NotAnObject(&'static str),

    #[error("unknown content format for {0} (expected .json, .yaml or .yml)")]
    UnknownFormat(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentNode {
    name: String,
    path: String,
    properties: BTreeMap<String, Value>,
    children: Vec<ContentNode>,
}

impl ContentNode {
    /// A detached node. Its path is assigned once it is placed in a [`ContentTree`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: ContentNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    pub fn child_nodes(&self) -> &[ContentNode] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&ContentNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// `{"name", "path", "properties"}` for line-oriented output.
    pub fn to_json(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::json!({
            "name": self.name,
            "path": self.path,
            "properties": properties,
        })
    }

    fn from_json_object(name: &str, object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut node = ContentNode::new(name);
        for (key, value) in object {
            match value {
                serde_json::Value::Object(child) => {
                    node.children.push(ContentNode::from_json_object(key, child));
                }
                other => {
                    node.properties.insert(key.clone(), typed_property(other));
                }
            }
        }
        node
    }

    fn place(&mut self, path: String) {
        for child in &mut self.children {
            let child_path = if path == "/" {
                format!("/{}", child.name)
            } else {
                format!("{}/{}", path, child.name)
            };
            child.place(child_path);
        }
        self.path = path;
    }
}

fn typed_property(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::String(s) => match parse_zoned_date(s) {
            Some(date) => Value::Date(date),
            None => Value::String(s.clone()),
        },
        serde_json::Value::Array(items) => Value::List(items.iter().map(typed_property).collect()),
        other => Value::from_json(other),
    }
}

impl Attributed for ContentNode {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn path(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.path)
    }

    fn resolve(&self, path: &str) -> Option<Value> {
        let segments: Vec<&str> = path
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        let (property, parents) = segments.split_last()?;
        let mut node = self;
        for segment in parents {
            node = node.child(segment)?;
        }
        node.property(property).cloned()
    }
}

impl<'a> Resource for &'a ContentNode {
    type Children = std::slice::Iter<'a, ContentNode>;

    fn children(&self) -> Self::Children {
        let node: &'a ContentNode = *self;
        node.children.iter()
    }
}

/// A content tree mounted at an absolute path.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentTree {
    root: ContentNode,
}

fn normalize_mount(mount: &str) -> String {
    let trimmed = mount.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

impl ContentTree {
    /// Mount `root` at `mount`. The root takes the last segment of the mount
    /// path as its name; descendants get their paths from their names.
    pub fn new(mount: &str, mut root: ContentNode) -> Self {
        let mount = normalize_mount(mount);
        root.name = mount.rsplit('/').next().unwrap_or_default().to_string();
        root.place(mount);
        Self { root }
    }

    pub fn from_json_value(mount: &str, json: &serde_json::Value) -> Result<Self, ContentError> {
        match json {
            serde_json::Value::Object(object) => {
                Ok(Self::new(mount, ContentNode::from_json_object("", object)))
            }
            serde_json::Value::Null => Err(ContentError::NotAnObject("null")),
            serde_json::Value::Bool(_) => Err(ContentError::NotAnObject("a boolean")),
            serde_json::Value::Number(_) => Err(ContentError::NotAnObject("a number")),
            serde_json::Value::String(_) => Err(ContentError::NotAnObject("a string")),
            serde_json::Value::Array(_) => Err(ContentError::NotAnObject("an array")),
        }
    }

    pub fn from_json_str(mount: &str, text: &str) -> Result<Self, ContentError> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json_value(mount, &json)
    }

    pub fn from_yaml_str(mount: &str, text: &str) -> Result<Self, ContentError> {
        let json: serde_json::Value = serde_yaml::from_str(text)?;
        Self::from_json_value(mount, &json)
    }

    /// Load a `.json`, `.yaml` or `.yml` file.
    pub fn load(path: &Path, mount: &str) -> Result<Self, ContentError> {
        let text = fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let tree = match extension.as_deref() {
            Some("json") => Self::from_json_str(mount, &text)?,
            Some("yaml" | "yml") => Self::from_yaml_str(mount, &text)?,
            _ => return Err(ContentError::UnknownFormat(path.to_path_buf())),
        };
        debug!(path = %path.display(), mount = tree.root.path(), "loaded content");
        Ok(tree)
    }

    pub fn root(&self) -> &ContentNode {
        &self.root
    }

    /// Look up a resource by absolute path.
    pub fn get(&self, path: &str) -> Option<&ContentNode> {
        let path = normalize_mount(path);
        let root = self.root.path();
        let rest = if path == root {
            ""
        } else if root == "/" {
            &path[1..]
        } else {
            path.strip_prefix(root)?.strip_prefix('/')?
        };
        let mut node = &self.root;
        for segment in rest.split('/').filter(|s| !s.is_empty()) {
            node = node.child(segment)?;
        }
        Some(node)
    }
}
