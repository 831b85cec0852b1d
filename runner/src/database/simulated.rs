use super::{ConnectionError, RawUsage, RawValue};
use crate::{
    usage::{Oid, ROOT},
    workload::{FunctionDef, Statement},
};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// first oid handed out to user objects
pub const FIRST_NORMAL_OID: Oid = 16384;
pub const MAX_STACK_DEPTH: usize = 64;
pub const DEFAULT_CALL_OVERHEAD_US: u64 = 20;
pub const DEFAULT_TUPLE_COST_US: u64 = 1;

const SCHEMA: &str = "public";

const COLUMNS: [&str; 13] = [
    "object_oid",
    "parent_oid",
    "object_type",
    "object_schema",
    "object_name",
    "num_calls",
    "num_scans",
    "total_time",
    "self_time",
    "n_tup_ins",
    "n_tup_upd",
    "n_tup_del",
    "n_tup_ret",
];

#[derive(Debug, Clone)]
struct Function {
    oid: Oid,
    body: Vec<Statement>,
}

#[derive(Debug, Clone)]
struct Table {
    oid: Oid,
    rows: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Function,
    Table,
}

#[derive(Debug, Clone)]
struct Counters {
    kind: Kind,
    name: String,
    num_calls: u64,
    num_scans: u64,
    // microseconds
    total_time: u64,
    self_time: u64,
    tup_inserted: u64,
    tup_returned: u64,
}

impl Counters {
    fn new(kind: Kind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_owned(),
            num_calls: 0,
            num_scans: 0,
            total_time: 0,
            self_time: 0,
            tup_inserted: 0,
            tup_returned: 0,
        }
    }

    fn is_zero(&self) -> bool {
        self.num_calls == 0
            && self.num_scans == 0
            && self.total_time == 0
            && self.self_time == 0
            && self.tup_inserted == 0
            && self.tup_returned == 0
    }
}

/// In-process model of the usage instrumentation on a virtual microsecond clock.
/// Table access is counted under the running function.
#[derive(Debug, Clone)]
pub struct SimulatedConnection {
    functions: BTreeMap<String, Function>,
    tables: BTreeMap<String, Table>,
    counters: BTreeMap<(Oid, Oid), Counters>,
    next_oid: Oid,
    clock: u64,
    call_stack: Vec<Oid>,
    call_overhead_us: u64,
    tuple_cost_us: u64,
}

impl Default for SimulatedConnection {
    fn default() -> Self {
        Self::new(DEFAULT_CALL_OVERHEAD_US, DEFAULT_TUPLE_COST_US)
    }
}

impl SimulatedConnection {
    pub fn new(call_overhead_us: u64, tuple_cost_us: u64) -> Self {
        Self {
            functions: BTreeMap::new(),
            tables: BTreeMap::new(),
            counters: BTreeMap::new(),
            next_oid: FIRST_NORMAL_OID,
            clock: 0,
            call_stack: Vec::new(),
            call_overhead_us,
            tuple_cost_us,
        }
    }

    fn allocate_oid(&mut self) -> Oid {
        let oid = self.next_oid;
        self.next_oid += 1;

        oid
    }

    fn current_parent(&self) -> Oid {
        self.call_stack.last().copied().unwrap_or(ROOT)
    }

    /// virtual time in microseconds since the connection was opened
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// `CREATE OR REPLACE` semantics, a replaced function keeps its oid
    pub fn create_function(&mut self, function: &FunctionDef) -> Oid {
        let oid = match self.functions.get(&function.name) {
            Some(existing) => existing.oid,
            None => self.allocate_oid(),
        };

        debug!(name = %function.name, oid = oid, "Created simulated function");
        self.functions.insert(
            function.name.clone(),
            Function {
                oid,
                body: function.body.clone(),
            },
        );

        oid
    }

    /// drop and recreate semantics, the new table is empty and gets a fresh oid
    pub fn create_table(&mut self, name: &str) -> Oid {
        let oid = self.allocate_oid();

        debug!(name = name, oid = oid, "Created simulated table");
        self.tables.insert(name.to_owned(), Table { oid, rows: 0 });

        oid
    }

    pub fn reset(&mut self) {
        trace!(entries = self.counters.len(), "Resetting simulated counters");
        self.counters.clear();
    }

    pub fn execute(&mut self, statement: &Statement) -> Result<(), ConnectionError> {
        self.run(statement).map(|_| ())
    }

    /// run a statement and return the time spent in nested function calls
    fn run(&mut self, statement: &Statement) -> Result<u64, ConnectionError> {
        match statement {
            Statement::Null => Ok(0),
            Statement::Sleep(duration) => {
                self.clock += duration.as_micros() as u64;

                Ok(0)
            }
            Statement::Call(name) => self.call(name),
            Statement::InsertSeries { table, rows } => {
                let (oid, _) = self.table(table)?;
                let rows = u64::from(*rows);
                let parent = self.current_parent();

                self.clock += rows * self.tuple_cost_us;
                if let Some(table) = self.tables.get_mut(table) {
                    table.rows += rows;
                }
                self.counters_for(oid, parent, Kind::Table, table)
                    .tup_inserted += rows;

                Ok(0)
            }
            Statement::CountRows { table } => {
                let (oid, rows) = self.table(table)?;
                let parent = self.current_parent();

                self.clock += rows * self.tuple_cost_us;
                let counters = self.counters_for(oid, parent, Kind::Table, table);
                counters.num_scans += 1;
                counters.tup_returned += rows;

                Ok(0)
            }
            Statement::Raw(sql) => Err(ConnectionError::Unsupported(sql.clone())),
        }
    }

    fn table(&self, name: &str) -> Result<(Oid, u64), ConnectionError> {
        self.tables
            .get(name)
            .map(|table| (table.oid, table.rows))
            .ok_or_else(|| ConnectionError::UnknownObject(name.to_owned()))
    }

    fn counters_for(&mut self, oid: Oid, parent: Oid, kind: Kind, name: &str) -> &mut Counters {
        self.counters
            .entry((oid, parent))
            .or_insert_with(|| Counters::new(kind, name))
    }

    fn call(&mut self, name: &str) -> Result<u64, ConnectionError> {
        let function = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| ConnectionError::UnknownObject(name.to_owned()))?;

        if self.call_stack.len() >= MAX_STACK_DEPTH {
            return Err(ConnectionError::StackDepthExceeded(MAX_STACK_DEPTH));
        }

        let parent = self.current_parent();
        let start = self.clock;
        self.clock += self.call_overhead_us;
        self.call_stack.push(function.oid);

        let mut nested = 0;
        let mut result = Ok(());
        for statement in function.body.iter() {
            match self.run(statement) {
                Ok(time) => nested += time,
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }

        self.call_stack.pop();
        result?;

        let elapsed = self.clock - start;
        // calls that failed are not counted
        let counters = self.counters_for(function.oid, parent, Kind::Function, name);
        counters.num_calls += 1;
        counters.total_time += elapsed;
        counters.self_time += elapsed - nested;

        Ok(elapsed)
    }

    /// usage rows of every (object, parent) pair with non-zero counters
    pub fn fetch_usage(&self) -> RawUsage {
        let rows = self
            .counters
            .iter()
            .filter(|(_, counters)| !counters.is_zero())
            .map(|((oid, parent), counters)| {
                let int = |value: u64| RawValue::Int(value as i64);

                vec![
                    RawValue::Int(i64::from(*oid)),
                    RawValue::Int(i64::from(*parent)),
                    RawValue::Text(
                        match counters.kind {
                            Kind::Function => "F",
                            Kind::Table => "r",
                        }
                        .to_owned(),
                    ),
                    RawValue::Text(SCHEMA.to_owned()),
                    RawValue::Text(counters.name.clone()),
                    int(counters.num_calls),
                    int(counters.num_scans),
                    int(counters.total_time),
                    int(counters.self_time),
                    int(counters.tup_inserted),
                    int(0),
                    int(0),
                    int(counters.tup_returned),
                ]
            })
            .collect();

        RawUsage {
            columns: COLUMNS.iter().map(|column| column.to_string()).collect(),
            rows,
        }
    }
}
