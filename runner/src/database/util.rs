use crate::workload::{FunctionDef, Statement};
use std::time::Duration;

/// where a statement is rendered, plpgsql bodies need `PERFORM` instead of `SELECT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    TopLevel,
    FunctionBody,
}

fn seconds(duration: &Duration) -> String {
    format!("{}", duration.as_secs_f64())
}

pub fn render_statement(statement: &Statement, placement: Placement) -> String {
    let sql = match (statement, placement) {
        (Statement::Null, Placement::TopLevel) => "SELECT NULL".to_owned(),
        (Statement::Null, Placement::FunctionBody) => "NULL".to_owned(),
        (Statement::Sleep(duration), Placement::TopLevel) => {
            format!("SELECT pg_sleep({})", seconds(duration))
        }
        (Statement::Sleep(duration), Placement::FunctionBody) => {
            format!("PERFORM pg_sleep({})", seconds(duration))
        }
        (Statement::Call(function), Placement::TopLevel) => format!("SELECT * FROM {function}()"),
        (Statement::Call(function), Placement::FunctionBody) => format!("PERFORM {function}()"),
        (Statement::InsertSeries { table, rows }, _) => {
            format!("INSERT INTO {table} SELECT * FROM generate_series(1, {rows})")
        }
        (Statement::CountRows { table }, Placement::TopLevel) => {
            format!("SELECT count(*) FROM {table}")
        }
        (Statement::CountRows { table }, Placement::FunctionBody) => {
            format!("PERFORM count(*) FROM {table}")
        }
        (Statement::Raw(sql), _) => sql.trim_end_matches(';').to_owned(),
    };

    match placement {
        Placement::TopLevel => sql,
        Placement::FunctionBody => sql + ";",
    }
}

pub fn render_function(function: &FunctionDef) -> String {
    let body = if function.body.is_empty() {
        render_statement(&Statement::Null, Placement::FunctionBody)
    } else {
        function
            .body
            .iter()
            .map(|statement| render_statement(statement, Placement::FunctionBody))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "CREATE OR REPLACE FUNCTION {}() RETURNS void AS
$$
BEGIN
{body}
END
$$ LANGUAGE plpgsql",
        function.name
    )
}

pub fn render_table(name: &str) -> String {
    format!("DROP TABLE IF EXISTS {name};\nCREATE TABLE {name} (id integer)")
}

/// first line of a statement, used for logging
pub fn first_line(sql: &str) -> &str {
    sql.trim_start().lines().next().unwrap_or("")
}
