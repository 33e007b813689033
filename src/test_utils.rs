use indexmap::IndexMap;
use serde::Deserialize;

pub const PARSING_TESTS_FILE: &str = "tests/parsing_tests.toml";
pub const LINEAGE_TESTS_FILE: &str = "tests/lineage_tests.toml";

#[derive(Deserialize, Debug, Clone)]
pub struct TestParsing {
    pub sql: String,
    /// Number of statements the parser must classify from the script.
    pub statements: usize,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TestParsingData {
    pub tests: Vec<TestParsing>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TestLineage {
    pub sql: String,
    /// `schema.table` target the scenario resolves.
    pub target: String,
    #[serde(default)]
    pub env_params: IndexMap<String, String>,
    /// Expected fully mapped sources, in first-discovery order.
    pub expected_sources: Vec<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TestLineageData {
    pub tests: Vec<TestLineage>,
}
