use btlin::parser::parse_script;
use btlin::test_utils::{PARSING_TESTS_FILE, TestParsingData};

fn test_sql(sql: &str, expected_statements: usize) {
    let script = parse_script(sql);
    if let Err(err) = &script {
        println!("{}", err)
    }
    assert!(script.is_ok());
    assert_eq!(script.unwrap().statements.len(), expected_statements);
}

#[test]
fn test_should_parse() {
    let parsing_test_file =
        std::fs::read_to_string(PARSING_TESTS_FILE).expect("Cannot open parsing test cases");
    let test_parsing_data: TestParsingData =
        toml::from_str(&parsing_test_file).expect("Cannot parse test cases defined in toml");

    for test in test_parsing_data.tests {
        let sql = &test.sql;
        println!("Testing parsing for SQL: {}", sql);
        test_sql(sql, test.statements);
        test_sql(&sql.to_uppercase(), test.statements);
        test_sql(&sql.to_lowercase(), test.statements);
    }
}

#[test]
fn test_should_not_scan() {
    let sqls = [
        // Unterminated string
        r#"
        INSERT INTO ${EDW_DB}.T SELECT * FROM ${RAW_DB}.S WHERE x = 'oops;
        "#,
        // Unterminated block comment
        r#"
        /* no closing marker
        INSERT INTO ${EDW_DB}.T SELECT * FROM ${RAW_DB}.S;
        "#,
        // Unterminated schema placeholder
        r#"
        INSERT INTO ${EDW_DB.T SELECT * FROM ${RAW_DB}.S;
        "#,
        // Unterminated placeholder with another `}` later on the line:
        // the name stops at the first non-identifier character.
        r#"
        INSERT INTO ${EDW DB}.T SELECT * FROM ${RAW_DB}.S;
        "#,
        // Empty schema placeholder
        r#"
        INSERT INTO ${}.T SELECT * FROM ${RAW_DB}.S;
        "#,
        // Unterminated quoted identifier
        r#"
        INSERT INTO "My Table SELECT * FROM ${RAW_DB}.S;
        "#,
    ];
    for sql in sqls {
        println!("Testing scan error for SQL: {}", sql);
        assert!(parse_script(sql).is_err())
    }
}

#[test]
fn test_qualified_name_split_across_lines() {
    // A continuation line opening with `.` is part of the statement; only
    // a recognized BTEQ command after the dot starts a directive.
    let sql = "INSERT INTO PRD_EDW\n.SALES_FCT\nSELECT * FROM ${RAW_DB}.ORDERS;";
    let script = parse_script(sql).unwrap();
    assert_eq!(script.statements.len(), 1);
    let target = script.statements[0].write_target().unwrap();
    assert_eq!(target.table, "SALES_FCT");
    let sources = script.statements[0].read_sources();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].table, "ORDERS");
}

#[test]
fn test_scan_error_columns_track_two_char_operators() {
    // `<>` consumes two characters; the reported column of the error on
    // the lone `|` must account for both.
    let err = parse_script("a <> |").unwrap_err();
    assert!(err.to_string().contains("[line: 1, col: 7]"));
}

#[test]
fn test_unclassifiable_statements_are_skipped() {
    // COLLECT STATISTICS and BT/ET are not lineage-bearing forms; they are
    // skipped, the INSERT still parses.
    let sql = r#"
        BT;
        COLLECT STATISTICS ON ${EDW_DB}.T COLUMN x;
        INSERT INTO ${EDW_DB}.T SELECT * FROM ${RAW_DB}.S;
        ET;
    "#;
    let script = parse_script(sql).unwrap();
    assert_eq!(script.statements.len(), 1);
}

#[test]
fn test_insert_values_has_no_sources() {
    let sql = r#"
        INSERT INTO ${EDW_DB}.AUDIT1 (run_dt, step_nm) VALUES (DATE, 'load start');
    "#;
    let script = parse_script(sql).unwrap();
    assert_eq!(script.statements.len(), 1);
    assert!(script.statements[0].read_sources().is_empty());
}

#[test]
fn test_expression_from_is_not_a_source() {
    // EXTRACT(YEAR FROM ...) and SUBSTRING(x FROM 1) must not produce
    // phantom source tables.
    let sql = r#"
        INSERT INTO ${EDW_DB}.T
        SELECT EXTRACT(YEAR FROM order_dt), SUBSTRING(cust_nm FROM 1 FOR 3)
        FROM ${RAW_DB}.ORDERS;
    "#;
    let script = parse_script(sql).unwrap();
    let sources = script.statements[0].read_sources();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].table, "ORDERS");
}
