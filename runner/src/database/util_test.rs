use super::util::{first_line, render_function, render_statement, Placement};
use crate::workload::{FunctionDef, Statement};

#[test]
pub fn renders_top_level_and_body_statements() {
    assert_eq!(
        render_statement(&Statement::call("ff1"), Placement::TopLevel),
        "SELECT * FROM ff1()"
    );
    assert_eq!(
        render_statement(&Statement::call("ff1"), Placement::FunctionBody),
        "PERFORM ff1();"
    );
    assert_eq!(
        render_statement(&Statement::sleep_ms(10), Placement::FunctionBody),
        "PERFORM pg_sleep(0.01);"
    );
    assert_eq!(
        render_statement(&Statement::insert_series("tt1", 100), Placement::TopLevel),
        "INSERT INTO tt1 SELECT * FROM generate_series(1, 100)"
    );
    assert_eq!(
        render_statement(&Statement::Raw("SELECT 1;".to_owned()), Placement::TopLevel),
        "SELECT 1"
    );
}

#[test]
pub fn renders_plpgsql_function() {
    let sql = render_function(&FunctionDef::new("ff2", [Statement::call("ff1")]));

    assert!(sql.starts_with("CREATE OR REPLACE FUNCTION ff2() RETURNS void AS"));
    assert!(sql.contains("BEGIN\nPERFORM ff1();\nEND"));
    assert!(sql.ends_with("LANGUAGE plpgsql"));
    assert_eq!(first_line(&sql), "CREATE OR REPLACE FUNCTION ff2() RETURNS void AS");
}

#[test]
pub fn empty_body_is_null() {
    let sql = render_function(&FunctionDef::new("ff0", Vec::<Statement>::new()));

    assert!(sql.contains("BEGIN\nNULL;\nEND"));
}
