use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::PathBuf;

use resource_filter::config::QueryConfig;
use resource_filter::{ContentNode, ContentTree, Descendants, dsl};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Content tree to filter (.json, .yaml, .yml)
    #[arg(short, long)]
    pub content: PathBuf,

    /// Path the content is mounted at
    #[arg(long, default_value = "/")]
    pub mount: String,

    /// Resource to start from (default: the mount path)
    #[arg(short, long)]
    pub root: Option<String>,

    /// Query file with selectors, params and limit (YAML, JSON or TOML)
    #[arg(short, long)]
    pub query: Option<PathBuf>,

    /// Child selector; only matching resources are printed
    #[arg(long)]
    pub child: Option<String>,

    /// Read the child selector from a file, decoded with --encoding
    #[arg(long, conflicts_with = "child")]
    pub expression_file: Option<PathBuf>,

    /// Branch selector; only matching resources are descended into
    #[arg(long)]
    pub branch: Option<String>,

    /// Bind a parameter, e.g. --param lang=Mongolian (JSON values are typed)
    #[arg(short, long = "param", value_parser = parse_param)]
    pub params: Vec<(String, serde_json::Value)>,

    /// Stop after this many resources
    #[arg(long)]
    pub limit: Option<usize>,

    /// Encoding of --expression-file (default: utf-8)
    #[arg(long)]
    pub encoding: Option<String>,

    #[arg(long, value_enum, default_value_t = Mode::Stream)]
    pub mode: Mode,

    #[arg(long, value_enum, default_value_t = OutputFormat::Paths)]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum Mode {
    /// The root and its descendants, through both selectors
    Stream,
    /// Direct children of the root matching the child selector
    Children,
    /// Descendants of the root matching the child selector
    Descendants,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum OutputFormat {
    /// One path per line
    Paths,
    /// One JSON object per line
    Json,
}

/// `name=value`. Values that parse as JSON scalars or arrays keep their
/// type; anything else is a string.
pub fn parse_param(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim().trim_start_matches('$');
    if name.is_empty() {
        return Err(format!("missing parameter name in '{raw}'"));
    }
    let value = match serde_json::from_str::<serde_json::Value>(value) {
        Ok(serde_json::Value::Object(_)) | Err(_) => serde_json::Value::String(value.to_string()),
        Ok(json) => json,
    };
    Ok((name.to_string(), value))
}

/// The query file, if any, with command line flags taking precedence.
pub fn build_query(cli: &Cli) -> Result<QueryConfig> {
    let mut query = match &cli.query {
        Some(path) => QueryConfig::load(path)
            .with_context(|| format!("Config: Failed to load query {}", path.display()))?,
        None => QueryConfig::default(),
    };

    if cli.branch.is_some() {
        query.branch_selector = cli.branch.clone();
    }
    if cli.encoding.is_some() {
        query.encoding = cli.encoding.clone();
    }
    if let Some(path) = &cli.expression_file {
        let bytes = std::fs::read(path)
            .with_context(|| format!("CLI: Failed to read {}", path.display()))?;
        let text = dsl::decode(&bytes, query.encoding.as_deref())
            .with_context(|| format!("CLI: Failed to decode {}", path.display()))?;
        query.child_selector = Some(text.into_owned());
    } else if cli.child.is_some() {
        query.child_selector = cli.child.clone();
    }
    if cli.limit.is_some() {
        query.limit = cli.limit;
    }
    for (name, value) in &cli.params {
        query.params.insert(name.clone(), value.clone());
    }
    Ok(query)
}

fn write_nodes<'a, W: Write>(
    out: &mut W,
    format: OutputFormat,
    nodes: impl Iterator<Item = &'a ContentNode>,
) -> Result<usize> {
    let mut count = 0;
    for node in nodes {
        match format {
            OutputFormat::Paths => writeln!(out, "{}", node.path())?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut *out, &node.to_json())?;
                writeln!(out)?;
            }
        }
        count += 1;
    }
    Ok(count)
}

/// Run the query and print matches to `out`. Returns the number printed.
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<usize> {
    let tree = ContentTree::load(&cli.content, &cli.mount)
        .with_context(|| format!("CLI: Failed to load content {}", cli.content.display()))?;
    let root = match &cli.root {
        Some(path) => tree
            .get(path)
            .with_context(|| format!("CLI: No resource at {path}"))?,
        None => tree.root(),
    };
    let query = build_query(cli)?;
    tracing::info!(
        "Query: mode {:?}, child {:?}, branch {:?}, {} params",
        cli.mode,
        query.child_selector,
        query.branch_selector,
        query.params.len()
    );

    let count = match cli.mode {
        Mode::Stream => {
            let nodes = query.stream_from(root).stream().context("Query: Invalid selector")?;
            write_nodes(out, cli.format, nodes)?
        }
        Mode::Children => {
            let nodes = query
                .stream_from(root)
                .list_children()
                .context("Query: Invalid selector")?;
            write_nodes(out, cli.format, nodes)?
        }
        Mode::Descendants => {
            let branch = query.branch_filter().context("Query: Invalid selector")?;
            let child = query.child_filter().context("Query: Invalid selector")?;
            let nodes = Descendants::below(&root, |node: &&ContentNode| {
                branch.as_ref().is_none_or(|f| f.test(node))
            })
            .filter(|node| child.as_ref().is_none_or(|f| f.test(node)))
            .take(query.limit.unwrap_or(usize::MAX));
            write_nodes(out, cli.format, nodes)?
        }
    };
    out.flush()?;
    Ok(count)
}
