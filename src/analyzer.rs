use serde::{Deserialize, Serialize};

use crate::ast::TablePath;
use crate::error::LineageError;
use crate::lineage::{
    EnvMap, LineageRecord, LineageRules, ProvenanceGraph, TableReference, map_lineage,
    resolve_sources, split_reference,
};
use crate::parser::parse_script;

/// The shape a script analyzer returns: the bare target table name and its
/// base sources in verbatim parameterized form (`${SCHEMA}.table`). Matches
/// the JSON contract of an external oracle-based analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerLineage {
    pub target: String,
    pub sources: Vec<String>,
}

/// Pluggable seam between the batch driver and whatever resolves a single
/// script. The deterministic engine implements it; an external oracle call
/// can be swapped in behind the same contract.
pub trait ScriptAnalyzer {
    fn analyze(&self, script: &str, target_table: &str) -> Result<AnalyzerLineage, LineageError>;
}

/// The deterministic analyzer: scanner + parser + provenance graph +
/// recursive source resolution, all in-process.
#[derive(Debug, Clone, Default)]
pub struct EngineAnalyzer {
    rules: LineageRules,
}

impl EngineAnalyzer {
    pub fn new(rules: LineageRules) -> Self {
        Self { rules }
    }
}

impl ScriptAnalyzer for EngineAnalyzer {
    fn analyze(&self, script: &str, target_table: &str) -> Result<AnalyzerLineage, LineageError> {
        let parsed =
            parse_script(script).map_err(|err| LineageError::AnalyzerUnavailable {
                target: target_table.to_owned(),
                reason: err.to_string(),
            })?;
        let graph = ProvenanceGraph::build(&parsed, &self.rules);
        let base_sources = resolve_sources(&graph, target_table);
        Ok(AnalyzerLineage {
            target: target_table
                .rsplit_once('.')
                .map_or(target_table, |(_, table)| table)
                .to_owned(),
            sources: base_sources
                .iter()
                .map(|source| source.parameterized())
                .collect(),
        })
    }
}

/// Turn an analyzer's output into the final record. Malformed source
/// entries are skipped with a warning; the transience/exclusion invariant
/// is enforced on this path too, since an external analyzer is not trusted
/// to have applied it.
pub fn lineage_from_analyzer(
    analyzed: &AnalyzerLineage,
    target_schema: &str,
    env: &EnvMap,
    rules: &LineageRules,
) -> LineageRecord {
    let mut base_sources = vec![];
    for raw in &analyzed.sources {
        let (schema, table) = match split_reference(raw) {
            Ok(parts) => parts,
            Err(err) => {
                log::warn!("Skipping source entry: {}", err);
                continue;
            }
        };
        let reference = TableReference::new(
            TablePath {
                schema: Some(schema),
                table,
            },
            rules,
        );
        if reference.transient || reference.excluded {
            log::warn!(
                "Dropping analyzer source {}: transient or excluded by rules",
                reference.parameterized()
            );
            continue;
        }
        base_sources.push(reference);
    }
    map_lineage(target_schema, &analyzed.target, &base_sources, env)
}
