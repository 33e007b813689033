use rayon::prelude::*;
use serde::Deserialize;

use crate::analyzer::{ScriptAnalyzer, lineage_from_analyzer};
use crate::error::LineageError;
use crate::lineage::{EnvMap, LineageRecord, LineageRules};

/// One catalog entry: a target table and the BTEQ script that populates it.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkItem {
    /// Fully qualified `schema.table` target.
    pub target_table: String,
    /// Script path, relative to the configured scripts root.
    pub script_path: String,
}

/// Per-item result. Failures are recorded, never propagated: a failing
/// target must not abort the rest of the batch.
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    Resolved {
        item: WorkItem,
        record: LineageRecord,
    },
    Failed {
        item: WorkItem,
        error: String,
    },
}

fn resolve_work_item<A, L>(
    item: &WorkItem,
    loader: &L,
    analyzer: &A,
    env: &EnvMap,
    rules: &LineageRules,
) -> Result<LineageRecord, String>
where
    A: ScriptAnalyzer,
    L: Fn(&str) -> anyhow::Result<String>,
{
    let (target_schema, bare_target) = item
        .target_table
        .split_once('.')
        .ok_or_else(|| LineageError::MalformedTarget(item.target_table.clone()).to_string())?;

    let script = loader(&item.script_path)
        .map_err(|err| format!("Cannot load script `{}`: {}", item.script_path, err))?;

    let analyzed = analyzer
        .analyze(&script, bare_target)
        .map_err(|err| err.to_string())?;

    Ok(lineage_from_analyzer(&analyzed, target_schema, env, rules))
}

/// Iterate the catalog and resolve every work item. Each item builds its
/// own isolated graph, so the parallel path needs no coordination; catalog
/// order is preserved either way.
pub fn run_batch<A, L>(
    items: &[WorkItem],
    loader: &L,
    analyzer: &A,
    env: &EnvMap,
    rules: &LineageRules,
    parallel: bool,
) -> Vec<BatchOutcome>
where
    A: ScriptAnalyzer + Sync,
    L: Fn(&str) -> anyhow::Result<String> + Sync,
{
    let resolve = |item: &WorkItem| -> BatchOutcome {
        log::info!("Processing {} ({})", item.target_table, item.script_path);
        match resolve_work_item(item, loader, analyzer, env, rules) {
            Ok(record) => BatchOutcome::Resolved {
                item: item.clone(),
                record,
            },
            Err(error) => {
                log::warn!("Lineage failed for {}: {}", item.target_table, error);
                BatchOutcome::Failed {
                    item: item.clone(),
                    error,
                }
            }
        }
    };

    if parallel {
        items.par_iter().map(resolve).collect()
    } else {
        items.iter().map(resolve).collect()
    }
}

/// Serialize outcomes as the tabular report: one row per resolved source,
/// sequence number shared by all rows of a target and incremented once per
/// resolved target (targets that failed outright consume no number).
pub fn write_report<W: std::io::Write>(outcomes: &[BatchOutcome], writer: W) -> anyhow::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["SL", "DWL_Table_Name", "Underlying_Source_Tables"])?;

    let mut sequence: u32 = 1;
    for outcome in outcomes {
        if let BatchOutcome::Resolved { record, .. } = outcome {
            for source in &record.base_sources {
                csv_writer.write_record([&sequence.to_string(), &record.target_table, source])?;
            }
            sequence += 1;
        }
    }
    csv_writer.flush()?;
    Ok(())
}
