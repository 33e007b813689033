use std::collections::{HashSet, VecDeque};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::ast::{SchemaPart, Script, TablePath};
use crate::error::LineageError;
use crate::parser::parse_script;

/// Naming rules that classify a table reference as transient working
/// storage or exclude it from lineage output altogether. Externally
/// configurable (TOML) so deployments with different naming conventions
/// can override the defaults. Matching is case-insensitive.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LineageRules {
    /// Suffixes marking staging/work tables, e.g. `CUST_STG`.
    pub staging_suffixes: Vec<String>,
    /// Prefixes marking volatile tables, e.g. `VT_CUST`.
    pub volatile_prefixes: Vec<String>,
    /// Schemas (or schema placeholders) holding only transient tables.
    pub staging_schemas: Vec<String>,
    /// Suffixes of tables excluded from output, e.g. key tables.
    pub excluded_suffixes: Vec<String>,
    /// Exact table names excluded from output, e.g. audit control tables.
    pub excluded_tables: Vec<String>,
    /// Schemas (or schema placeholders) whose tables are all excluded.
    pub audit_schemas: Vec<String>,
}

impl Default for LineageRules {
    fn default() -> Self {
        Self {
            staging_suffixes: vec!["_STG".to_owned(), "_WORK".to_owned()],
            volatile_prefixes: vec!["VT_".to_owned()],
            staging_schemas: vec![],
            excluded_suffixes: vec!["_KEY".to_owned(), "KEYSYS_ID".to_owned()],
            excluded_tables: vec![
                "AUDIT1".to_owned(),
                "AUDIT2".to_owned(),
                "AUDIT3".to_owned(),
                "AUDIT4".to_owned(),
            ],
            audit_schemas: vec!["AUDIT_DB".to_owned()],
        }
    }
}

impl LineageRules {
    /// Whether a reference denotes transient working storage. A pure
    /// function of the reference; graph context plays no part.
    pub fn is_transient(&self, path: &TablePath) -> bool {
        let table = path.table.to_uppercase();
        if self
            .staging_suffixes
            .iter()
            .any(|suffix| table.ends_with(&suffix.to_uppercase()))
        {
            return true;
        }
        if self
            .volatile_prefixes
            .iter()
            .any(|prefix| table.starts_with(&prefix.to_uppercase()))
        {
            return true;
        }
        if let Some(schema) = &path.schema {
            let schema = schema.name().to_uppercase();
            if self
                .staging_schemas
                .iter()
                .any(|s| s.to_uppercase() == schema)
            {
                return true;
            }
        }
        false
    }

    /// Whether a persistent reference must be dropped from lineage output
    /// (audit/control/key tables). Excluded tables are terminal: traversal
    /// does not continue past them.
    pub fn is_excluded(&self, path: &TablePath) -> bool {
        let table = path.table.to_uppercase();
        if self
            .excluded_suffixes
            .iter()
            .any(|suffix| table.ends_with(&suffix.to_uppercase()))
        {
            return true;
        }
        if self
            .excluded_tables
            .iter()
            .any(|name| name.to_uppercase() == table)
        {
            return true;
        }
        if let Some(schema) = &path.schema {
            let schema = schema.name().to_uppercase();
            if self
                .audit_schemas
                .iter()
                .any(|s| s.to_uppercase() == schema)
            {
                return true;
            }
        }
        false
    }
}

/// Case-insensitive identity of a table reference within one script.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    schema: Option<String>,
    table: String,
}

impl NodeKey {
    fn of(path: &TablePath) -> Self {
        Self {
            schema: path.schema.as_ref().map(|s| s.name().to_uppercase()),
            table: path.table.to_uppercase(),
        }
    }
}

/// A table as referenced in the script, classified at construction time.
#[derive(Debug, Clone, Serialize)]
pub struct TableReference {
    pub path: TablePath,
    pub transient: bool,
    pub excluded: bool,
}

impl TableReference {
    pub fn new(path: TablePath, rules: &LineageRules) -> Self {
        let transient = rules.is_transient(&path);
        let excluded = rules.is_excluded(&path);
        Self {
            path,
            transient,
            excluded,
        }
    }

    /// The verbatim parameterized form, e.g. `${EDW_DB}.SALES_FCT`.
    pub fn parameterized(&self) -> String {
        self.path.to_string()
    }
}

/// Directed provenance among the tables of a single script: an edge
/// (source -> target) for every statement that writes target reading
/// source. Built fresh per script and discarded after resolution.
#[derive(Debug, Clone)]
pub struct ProvenanceGraph {
    nodes: IndexMap<NodeKey, TableReference>,
    // (source, target) pairs, deduplicated, in statement order.
    edges: Vec<(NodeKey, NodeKey)>,
}

impl ProvenanceGraph {
    pub fn build(script: &Script, rules: &LineageRules) -> Self {
        let mut graph = Self {
            nodes: IndexMap::new(),
            edges: vec![],
        };
        let mut seen_edges = HashSet::new();

        for statement in &script.statements {
            let Some(target) = statement.write_target() else {
                continue;
            };
            let target_key = graph.intern(target, rules);
            for source in statement.read_sources() {
                let source_key = graph.intern(source, rules);
                if source_key == target_key {
                    // Self-feeding statement (e.g. UPDATE t FROM t); no edge.
                    continue;
                }
                let edge = (source_key, target_key.clone());
                if seen_edges.insert(edge.clone()) {
                    graph.edges.push(edge);
                }
            }
        }

        graph
    }

    fn intern(&mut self, path: &TablePath, rules: &LineageRules) -> NodeKey {
        let key = NodeKey::of(path);
        self.nodes
            .entry(key.clone())
            .or_insert_with(|| TableReference::new(path.clone(), rules));
        key
    }

    pub fn node(&self, key: &NodeKey) -> Option<&TableReference> {
        self.nodes.get(key)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TableReference> {
        self.nodes.values()
    }

    /// Keys of the tables feeding `target`, in edge order.
    pub fn sources_of<'a>(&'a self, target: &'a NodeKey) -> impl Iterator<Item = &'a NodeKey> {
        self.edges
            .iter()
            .filter(move |(_, t)| t == target)
            .map(|(s, _)| s)
    }

    fn roots_for(&self, target_table: &str) -> Vec<NodeKey> {
        let target_table = target_table.to_uppercase();
        self.nodes
            .keys()
            .filter(|key| key.table == target_table)
            .cloned()
            .collect()
    }
}

/// Walk the graph backward from `target_table` (bare or `schema.table`)
/// and return the persistent, non-excluded base sources in first-discovery
/// order. Transient nodes are collapsed through; excluded nodes are
/// terminal drops; cycles are bounded by the visited set.
pub fn resolve_sources(graph: &ProvenanceGraph, target_table: &str) -> Vec<TableReference> {
    let bare_target = target_table
        .rsplit_once('.')
        .map_or(target_table, |(_, table)| table);

    let roots = graph.roots_for(bare_target);
    let mut visited: HashSet<NodeKey> = roots.iter().cloned().collect();
    let mut queue: VecDeque<NodeKey> = VecDeque::new();
    for root in &roots {
        for source in graph.sources_of(root) {
            queue.push_back(source.clone());
        }
    }

    let mut resolved: IndexSet<NodeKey> = IndexSet::new();
    while let Some(key) = queue.pop_front() {
        if !visited.insert(key.clone()) {
            continue;
        }
        let Some(node) = graph.node(&key) else {
            continue;
        };
        if node.transient {
            // Collapse through the intermediate; a transient table with no
            // upstream edge in this script is dropped silently.
            for source in graph.sources_of(&key) {
                queue.push_back(source.clone());
            }
            log::debug!("Expanding transient table {}", node.parameterized());
        } else if node.excluded {
            log::debug!("Dropping excluded table {}", node.parameterized());
        } else {
            resolved.insert(key);
        }
    }

    resolved
        .into_iter()
        .map(|key| graph.nodes[&key].clone())
        .collect()
}

/// Placeholder-name to concrete-schema mapping for one environment.
/// Immutable for a run; missing keys resolve to the placeholder itself.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvMap(IndexMap<String, String>);

impl EnvMap {
    pub fn new(map: IndexMap<String, String>) -> Self {
        Self(map)
    }

    /// Lenient lookup: an unmapped placeholder is returned unchanged so it
    /// surfaces visibly in output instead of blocking the run.
    pub fn resolve<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.0
            .get(placeholder)
            .map_or(placeholder, |schema| schema.as_str())
    }

    fn resolve_part<'a>(&'a self, part: &'a SchemaPart) -> &'a str {
        match part {
            SchemaPart::Placeholder(name) => {
                let resolved = self.resolve(name);
                if resolved == name {
                    log::warn!(
                        "No environment mapping for schema placeholder `{}`; keeping it verbatim",
                        name
                    );
                }
                resolved
            }
            SchemaPart::Named(name) => self.resolve(name),
        }
    }
}

impl FromIterator<(String, String)> for EnvMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The final target -> base sources record, schemas resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageRecord {
    pub target_table: String,
    pub base_sources: Vec<String>,
}

/// Combine resolved base sources with the environment mapping into the
/// final record. The record is produced even when `base_sources` is empty:
/// a target with no recoverable lineage from this script is legitimate.
pub fn map_lineage(
    target_schema: &str,
    target_table: &str,
    base_sources: &[TableReference],
    env: &EnvMap,
) -> LineageRecord {
    let mut mapped: IndexSet<String> = IndexSet::new();
    for source in base_sources {
        let full_source = match &source.path.schema {
            Some(part) => format!("{}.{}", env.resolve_part(part), source.path.table),
            None => source.path.table.clone(),
        };
        mapped.insert(full_source);
    }
    LineageRecord {
        target_table: format!("{}.{}", target_schema, target_table),
        base_sources: mapped.into_iter().collect(),
    }
}

/// Normalize a raw `${VAR}.table`, `{VAR}.table` or `schema.table` token
/// into its schema part and table name. Splits on the first `.` only.
pub fn split_reference(raw: &str) -> Result<(SchemaPart, String), LineageError> {
    let (schema, table) = raw
        .split_once('.')
        .ok_or_else(|| LineageError::MalformedReference(raw.to_owned()))?;
    let part = if let Some(inner) = schema.strip_prefix("${") {
        SchemaPart::Placeholder(inner.strip_suffix('}').unwrap_or(inner).to_owned())
    } else if let Some(inner) = schema.strip_prefix('{') {
        SchemaPart::Placeholder(inner.strip_suffix('}').unwrap_or(inner).to_owned())
    } else {
        SchemaPart::Named(schema.to_owned())
    };
    Ok((part, table.to_owned()))
}

/// End-to-end resolution for one (script, target) request: parse the
/// script, build its provenance graph, collapse to base sources and map
/// schemas. `target_table` must be `schema.table`.
pub fn extract_lineage(
    sql: &str,
    target_table: &str,
    env: &EnvMap,
    rules: &LineageRules,
) -> anyhow::Result<LineageRecord> {
    let (target_schema, bare_target) = target_table
        .split_once('.')
        .ok_or_else(|| LineageError::MalformedTarget(target_table.to_owned()))?;

    let script = parse_script(sql)?;
    let graph = ProvenanceGraph::build(&script, rules);
    let base_sources = resolve_sources(&graph, bare_target);
    Ok(map_lineage(target_schema, bare_target, &base_sources, env))
}
