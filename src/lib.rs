//! # btlin
//!
//! A library for parsing Teradata BTEQ batch scripts and extracting
//! table-level lineage: the ultimate, persistent base source tables that
//! feed a given target table.
//!
//! # Features
//!
//! - Parse a BTEQ script's statement sequence (INSERT/SELECT, UPDATE,
//!   CREATE TABLE AS, MERGE), skipping control directives and statements
//!   that cannot be classified.
//! - Build a per-script provenance graph and recursively collapse
//!   staging/volatile/work intermediates back to persistent sources.
//! - Apply configurable exclusion rules (audit tables, key tables, staging
//!   schemas) so control-plane tables never pollute lineage output.
//! - Resolve `${SCHEMA}` placeholders to concrete environment schemas,
//!   keeping unmapped placeholders visible verbatim.
//! - Drive a whole catalog of (target, script) pairs and emit the tabular
//!   lineage report.
//!
//! # Example
//!
//! ```rust,no_run
//! use btlin::lineage::{EnvMap, LineageRules, extract_lineage};
//!
//! fn main() -> anyhow::Result<()> {
//!     env_logger::init();
//!
//!     let sql = r#"
//!         .LOGON tdprod/batch_user,pwd;
//!
//!         INSERT INTO ${EDW_DB}.SALES_STG
//!         SELECT * FROM ${RAW_DB}.ORDERS o
//!         INNER JOIN ${RAW_DB}.CUSTOMERS c ON o.cust_id = c.cust_id;
//!
//!         INSERT INTO ${EDW_DB}.SALES_FCT
//!         SELECT * FROM ${EDW_DB}.SALES_STG;
//!
//!         .IF ERRORCODE <> 0 THEN .QUIT 1;
//!     "#;
//!
//!     let env = EnvMap::from_iter([
//!         ("RAW_DB".to_owned(), "PRD_RAW".to_owned()),
//!         ("EDW_DB".to_owned(), "PRD_EDW".to_owned()),
//!     ]);
//!     let record = extract_lineage(sql, "PRD_EDW.SALES_FCT", &env, &LineageRules::default())?;
//!
//!     // SALES_STG is collapsed through; sources are the persistent tables.
//!     println!("{} <- {:?}", record.target_table, record.base_sources);
//!     Ok(())
//! }
//! ```
pub mod analyzer;
pub mod ast;
pub mod batch;
pub mod error;
pub mod lineage;
pub mod parser;
pub mod scanner;
pub mod test_utils;
