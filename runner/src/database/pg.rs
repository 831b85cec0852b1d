use super::{
    util::{first_line, render_function, render_statement, render_table, Placement},
    ConnectionError, RawUsage, RawValue,
};
use crate::{config::ConnectionConfig, usage::Oid, workload::{FunctionDef, Statement}};
use postgres::{types::Type, Client, NoTls, Row};
use std::fmt;
use tracing::{debug, error, info, trace, warn};

impl From<postgres::Error> for ConnectionError {
    fn from(error: postgres::Error) -> Self {
        ConnectionError::Database(Box::new(error))
    }
}

/// Session on a PostgreSQL server with the usage extension loaded
pub struct PgConnection {
    client: Client,
    view: String,
    reset_function: String,
}

impl fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConnection")
            .field("view", &self.view)
            .field("reset_function", &self.reset_function)
            .finish_non_exhaustive()
    }
}

impl PgConnection {
    pub fn load(config: &ConnectionConfig) -> Result<Self, ConnectionError> {
        match config {
            ConnectionConfig::Postgres {
                dsn,
                extension,
                view,
                reset_function,
            } => {
                let client = match Client::connect(dsn, NoTls) {
                    Ok(client) => client,
                    Err(error) => {
                        error!(error = ?error, "Failed to connect to PostgreSQL: {error}");

                        return Err(error.into());
                    }
                };

                let mut connection = Self {
                    client,
                    view: view.clone(),
                    reset_function: reset_function.clone(),
                };

                connection.run_sql("SET track_functions = 'all'")?;
                if let Some(extension) = extension {
                    connection.run_sql(&format!("LOAD '{extension}'"))?;
                }

                info!(view = %view, "Connected to PostgreSQL");

                Ok(connection)
            }
            _ => Err(ConnectionError::ConfigError(
                "expected a postgres connection config".to_owned(),
            )),
        }
    }

    fn run_sql(&mut self, sql: &str) -> Result<(), ConnectionError> {
        debug!("running sql: {}", first_line(sql));

        self.client.batch_execute(sql).map_err(ConnectionError::from)
    }

    fn run_query(&mut self, sql: &str) -> Result<Vec<Row>, ConnectionError> {
        debug!("running sql: {}", first_line(sql));

        self.client.query(sql, &[]).map_err(ConnectionError::from)
    }

    /// look up the oid of a named object, namespaces are ignored
    fn retrieve_oid(&mut self, query: &str, name: &str) -> Result<Oid, ConnectionError> {
        let rows = self.client.query(query, &[&name])?;

        match rows.first() {
            Some(row) => Ok(row.try_get::<_, Oid>(0)?),
            None => Err(ConnectionError::UnknownObject(name.to_owned())),
        }
    }

    pub fn execute(&mut self, statement: &Statement) -> Result<(), ConnectionError> {
        let sql = render_statement(statement, Placement::TopLevel);

        self.run_query(&sql).map(|_| ())
    }

    pub fn reset(&mut self) -> Result<(), ConnectionError> {
        let sql = format!("SELECT * FROM {}()", self.reset_function);

        self.run_query(&sql).map(|_| ())
    }

    pub fn fetch_usage(&mut self) -> Result<RawUsage, ConnectionError> {
        let sql = format!("SELECT * FROM {}", self.view);
        let statement = self.client.prepare(&sql)?;
        for column in statement.columns() {
            if !is_supported(column.type_()) {
                warn!(
                    column = column.name(),
                    column_type = %column.type_(),
                    "Usage column has an unsupported type, its values are ignored"
                );
            }
        }
        let columns = statement
            .columns()
            .iter()
            .map(|column| column.name().to_owned())
            .collect::<Vec<_>>();

        debug!("running sql: {sql}");
        let rows = self
            .client
            .query(&statement, &[])?
            .iter()
            .map(|row| {
                (0..row.len())
                    .map(|index| decode_value(row, index))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        trace!(columns = ?columns, rows = rows.len(), "Fetched usage rows");

        Ok(RawUsage { columns, rows })
    }

    pub fn create_function(&mut self, function: &FunctionDef) -> Result<Oid, ConnectionError> {
        self.run_sql(&render_function(function))?;

        self.retrieve_oid("SELECT oid FROM pg_proc WHERE proname = $1", &function.name)
    }

    pub fn create_table(&mut self, name: &str) -> Result<Oid, ConnectionError> {
        self.run_sql(&render_table(name))?;

        self.retrieve_oid(
            "SELECT oid FROM pg_class WHERE relname = $1 AND relkind = 'r'",
            name,
        )
    }
}

const INT_TYPES: [Type; 4] = [Type::INT8, Type::INT4, Type::INT2, Type::OID];
const FLOAT_TYPES: [Type; 2] = [Type::FLOAT8, Type::FLOAT4];
const TEXT_TYPES: [Type; 5] = [Type::CHAR, Type::TEXT, Type::VARCHAR, Type::NAME, Type::BPCHAR];

/// types `decode_value` understands, everything else is read as NULL
pub(crate) fn is_supported(column_type: &Type) -> bool {
    INT_TYPES.contains(column_type)
        || FLOAT_TYPES.contains(column_type)
        || TEXT_TYPES.contains(column_type)
}

fn decode_value(row: &Row, index: usize) -> Result<RawValue, postgres::Error> {
    let column_type = row.columns()[index].type_();

    let value = if *column_type == Type::INT8 {
        row.try_get::<_, Option<i64>>(index)?.map(RawValue::Int)
    } else if *column_type == Type::INT4 {
        row.try_get::<_, Option<i32>>(index)?
            .map(|value| RawValue::Int(value.into()))
    } else if *column_type == Type::INT2 {
        row.try_get::<_, Option<i16>>(index)?
            .map(|value| RawValue::Int(value.into()))
    } else if *column_type == Type::OID {
        row.try_get::<_, Option<u32>>(index)?
            .map(|value| RawValue::Int(value.into()))
    } else if *column_type == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(index)?.map(RawValue::Float)
    } else if *column_type == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(index)?
            .map(|value| RawValue::Float(value.into()))
    } else if *column_type == Type::CHAR {
        // the single byte "char" type
        row.try_get::<_, Option<i8>>(index)?
            .map(|value| RawValue::Text(char::from(value as u8).to_string()))
    } else if [Type::TEXT, Type::VARCHAR, Type::NAME, Type::BPCHAR].contains(column_type) {
        row.try_get::<_, Option<String>>(index)?.map(RawValue::Text)
    } else {
        None
    };

    Ok(value.unwrap_or(RawValue::Null))
}
