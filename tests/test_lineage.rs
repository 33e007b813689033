use btlin::analyzer::{AnalyzerLineage, EngineAnalyzer, ScriptAnalyzer, lineage_from_analyzer};
use btlin::lineage::{EnvMap, LineageRules, extract_lineage, split_reference};
use btlin::test_utils::{LINEAGE_TESTS_FILE, TestLineageData};

#[test]
fn test_lineage() {
    let lineage_data_file =
        std::fs::read_to_string(LINEAGE_TESTS_FILE).expect("Cannot open lineage test cases");
    let test_lineage_data: TestLineageData =
        toml::from_str(&lineage_data_file).expect("Cannot parse test cases defined in toml");

    let rules = LineageRules::default();
    for test in test_lineage_data.tests {
        println!("Testing lineage for SQL: {}", &test.sql);
        let env: EnvMap = test.env_params.clone().into_iter().collect();

        let record = extract_lineage(&test.sql, &test.target, &env, &rules)
            .unwrap_or_else(|err| panic!("Could not extract lineage due to: {:?}", &err));

        assert_eq!(record.target_table, test.target);
        assert_eq!(record.base_sources, test.expected_sources);

        // Resolution is idempotent: a re-run yields the identical ordered result.
        let record_again = extract_lineage(&test.sql, &test.target, &env, &rules).unwrap();
        assert_eq!(record, record_again);
    }
}

#[test]
fn test_exclusion_invariant() {
    // No resolved source may ever carry a transient or excluded name,
    // whatever the script shape.
    let lineage_data_file =
        std::fs::read_to_string(LINEAGE_TESTS_FILE).expect("Cannot open lineage test cases");
    let test_lineage_data: TestLineageData =
        toml::from_str(&lineage_data_file).expect("Cannot parse test cases defined in toml");

    let rules = LineageRules::default();
    for test in test_lineage_data.tests {
        let env: EnvMap = test.env_params.clone().into_iter().collect();
        let record = extract_lineage(&test.sql, &test.target, &env, &rules).unwrap();
        for source in &record.base_sources {
            let table = source.rsplit_once('.').map_or(source.as_str(), |(_, t)| t);
            let table = table.to_uppercase();
            assert!(!table.starts_with("VT_"));
            assert!(!table.ends_with("_STG"));
            assert!(!table.ends_with("_WORK"));
            assert!(!table.ends_with("_KEY"));
            assert!(!table.ends_with("KEYSYS_ID"));
            assert!(!matches!(
                table.as_str(),
                "AUDIT1" | "AUDIT2" | "AUDIT3" | "AUDIT4"
            ));
            assert_ne!(*source, test.target);
        }
    }
}

#[test]
fn test_env_map_round_trip() {
    let env = EnvMap::from_iter([("RAW_DB".to_owned(), "PRD_RAW".to_owned())]);
    assert_eq!(env.resolve("RAW_DB"), "PRD_RAW");
    assert_eq!(env.resolve("NOT_THERE"), "NOT_THERE");
}

#[test]
fn test_split_reference() {
    assert_eq!(
        split_reference("${RAW_DB}.ORDERS").unwrap().1,
        "ORDERS".to_owned()
    );
    assert_eq!(
        split_reference("{RAW_DB}.ORDERS").unwrap().0.name(),
        "RAW_DB"
    );
    assert_eq!(
        split_reference("PRD_RAW.ORDERS").unwrap().0.name(),
        "PRD_RAW"
    );
    // Table names must not contain `.`: split happens on the first one only.
    let (schema, table) = split_reference("${A}.B.C").unwrap();
    assert_eq!(schema.name(), "A");
    assert_eq!(table, "B.C");
    assert!(split_reference("NO_SEPARATOR").is_err());
}

#[test]
fn test_engine_analyzer_emits_parameterized_sources() {
    let sql = r#"
        INSERT INTO ${EDW_DB}.SALES_FCT
        SELECT * FROM ${RAW_DB}.ORDERS;
    "#;
    let analyzer = EngineAnalyzer::new(LineageRules::default());
    let analyzed = analyzer.analyze(sql, "SALES_FCT").unwrap();
    assert_eq!(analyzed.target, "SALES_FCT");
    assert_eq!(analyzed.sources, vec!["${RAW_DB}.ORDERS".to_owned()]);
}

#[test]
fn test_lineage_from_analyzer_shape() {
    // The engine accepts the external analyzer's output shape as an
    // alternative input; malformed entries are skipped, exclusions
    // enforced, schemas mapped.
    let analyzed = AnalyzerLineage {
        target: "SALES_FCT".to_owned(),
        sources: vec![
            "${RAW_DB}.ORDERS".to_owned(),
            "not-a-reference".to_owned(),
            "${RAW_DB}.AUDIT2".to_owned(),
            "${RAW_DB}.ORDERS".to_owned(),
        ],
    };
    let env = EnvMap::from_iter([("RAW_DB".to_owned(), "PRD_RAW".to_owned())]);
    let record = lineage_from_analyzer(&analyzed, "PRD_EDW", &env, &LineageRules::default());
    assert_eq!(record.target_table, "PRD_EDW.SALES_FCT");
    assert_eq!(record.base_sources, vec!["PRD_RAW.ORDERS".to_owned()]);
}

#[test]
fn test_custom_rules_override_defaults() {
    // Deployments with different naming conventions can swap the rule set.
    let rules: LineageRules = toml::from_str(
        r#"
        staging_suffixes = ["_TMP"]
        volatile_prefixes = []
        excluded_tables = ["RUN_LOG"]
        "#,
    )
    .unwrap();
    let sql = r#"
        INSERT INTO ORDERS_TMP SELECT * FROM ${RAW_DB}.ORDERS JOIN ${RAW_DB}.RUN_LOG;
        INSERT INTO ${EDW_DB}.ORDERS_FCT SELECT * FROM ORDERS_TMP;
    "#;
    let env = EnvMap::from_iter([
        ("RAW_DB".to_owned(), "PRD_RAW".to_owned()),
        ("EDW_DB".to_owned(), "PRD_EDW".to_owned()),
    ]);
    let record = extract_lineage(sql, "PRD_EDW.ORDERS_FCT", &env, &rules).unwrap();
    assert_eq!(record.base_sources, vec!["PRD_RAW.ORDERS".to_owned()]);
}
