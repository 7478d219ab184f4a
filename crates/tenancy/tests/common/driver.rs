//! In-memory database driver double.
//!
//! Implements the driver seam over a shared in-memory store so the pool
//! manager, enforcer, and unit of work can be exercised end to end. The
//! statement interpreter covers exactly the shapes the statement builder
//! produces: `SELECT * FROM`, `INSERT INTO ... VALUES`, `UPDATE ... SET`,
//! and `DELETE FROM`, each with an optional conjunction of `col = $n`
//! predicates.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use tessera_tenancy::error::DriverError;
use tessera_tenancy::pool::{ConnectInfo, Connection, DatabaseDriver, Row};

type Table = Vec<Row>;
type Database = HashMap<String, Table>;

/// Shared storage behind all connections of one driver.
#[derive(Default)]
struct MemoryServer {
    databases: Mutex<HashMap<String, Database>>,
}

/// In-memory [`DatabaseDriver`] with failure injection.
pub struct MemoryDriver {
    server: Arc<MemoryServer>,
    connect_count: AtomicUsize,
    query_count: Arc<AtomicUsize>,
    fail_connects: AtomicUsize,
    reject_credentials: AtomicBool,
}

impl MemoryDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            server: Arc::new(MemoryServer::default()),
            connect_count: AtomicUsize::new(0),
            query_count: Arc::new(AtomicUsize::new(0)),
            fail_connects: AtomicUsize::new(0),
            reject_credentials: AtomicBool::new(false),
        })
    }

    /// Seeds rows into a table of the given database.
    pub fn seed(&self, database: &str, table: &str, rows: Vec<Row>) {
        let mut databases = self.server.databases.lock();
        databases
            .entry(database.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Returns a snapshot of a table's rows.
    pub fn rows(&self, database: &str, table: &str) -> Vec<Row> {
        let databases = self.server.databases.lock();
        databases
            .get(database)
            .and_then(|db| db.get(table))
            .cloned()
            .unwrap_or_default()
    }

    /// Makes the next `n` connection attempts fail operationally.
    pub fn fail_next_connects(&self, n: usize) {
        self.fail_connects.store(n, Ordering::SeqCst);
    }

    /// Makes every connection attempt fail as a credential rejection.
    pub fn reject_credentials(&self, reject: bool) {
        self.reject_credentials.store(reject, Ordering::SeqCst);
    }

    /// Returns how many connections were successfully opened.
    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// Returns how many statements were executed.
    pub fn statement_count(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseDriver for MemoryDriver {
    async fn connect(&self, info: &ConnectInfo) -> Result<Box<dyn Connection>, DriverError> {
        if self.reject_credentials.load(Ordering::SeqCst) {
            return Err(DriverError::Credentials("password rejected".to_string()));
        }
        let remaining = self.fail_connects.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_connects.store(remaining - 1, Ordering::SeqCst);
            return Err(DriverError::Connect("connection refused".to_string()));
        }
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryConnection {
            server: Arc::clone(&self.server),
            database: info.database.clone(),
            query_count: Arc::clone(&self.query_count),
            snapshot: None,
        }))
    }
}

struct MemoryConnection {
    server: Arc<MemoryServer>,
    database: String,
    query_count: Arc<AtomicUsize>,
    /// Database snapshot taken at BEGIN; present while a transaction is
    /// open, restored on rollback.
    snapshot: Option<Database>,
}

fn parse_index(placeholder: &str) -> Result<usize, DriverError> {
    placeholder
        .trim()
        .strip_prefix('$')
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|n| *n >= 1)
        .ok_or_else(|| DriverError::Statement(format!("bad placeholder: {placeholder}")))
}

fn parse_assignments(
    fragment: &str,
    params: &[Value],
) -> Result<Vec<(String, Value)>, DriverError> {
    fragment
        .split(", ")
        .map(|assignment| {
            let (column, placeholder) = assignment
                .split_once(" = ")
                .ok_or_else(|| DriverError::Statement(format!("bad fragment: {assignment}")))?;
            let index = parse_index(placeholder)?;
            let value = params
                .get(index - 1)
                .cloned()
                .ok_or_else(|| DriverError::Statement(format!("missing param ${index}")))?;
            Ok((column.trim().to_string(), value))
        })
        .collect()
}

fn parse_conditions(
    clause: &str,
    params: &[Value],
) -> Result<Vec<(String, Value)>, DriverError> {
    clause
        .split(" AND ")
        .map(|condition| {
            let (column, placeholder) = condition
                .split_once(" = ")
                .ok_or_else(|| DriverError::Statement(format!("bad condition: {condition}")))?;
            let index = parse_index(placeholder)?;
            let value = params
                .get(index - 1)
                .cloned()
                .ok_or_else(|| DriverError::Statement(format!("missing param ${index}")))?;
            Ok((column.trim().to_string(), value))
        })
        .collect()
}

fn row_matches(row: &Row, conditions: &[(String, Value)]) -> bool {
    conditions
        .iter()
        .all(|(column, value)| row.get(column) == Some(value))
}

impl MemoryConnection {
    fn with_database<R>(&self, f: impl FnOnce(&mut Database) -> R) -> R {
        let mut databases = self.server.databases.lock();
        let db = databases.entry(self.database.clone()).or_default();
        f(db)
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DriverError> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        let sql = sql.trim();
        let rest = sql
            .strip_prefix("SELECT * FROM ")
            .ok_or_else(|| DriverError::Statement(format!("unsupported query: {sql}")))?;
        let (table, conditions) = match rest.split_once(" WHERE ") {
            Some((table, clause)) => (table.trim(), parse_conditions(clause, params)?),
            None => (rest.trim(), Vec::new()),
        };
        Ok(self.with_database(|db| {
            db.get(table)
                .map(|rows| {
                    rows.iter()
                        .filter(|row| row_matches(row, &conditions))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        }))
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, DriverError> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        let sql = sql.trim();

        if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            let (table, rest) = rest
                .split_once(" (")
                .ok_or_else(|| DriverError::Statement(format!("bad insert: {sql}")))?;
            let (columns, _) = rest
                .split_once(") VALUES (")
                .ok_or_else(|| DriverError::Statement(format!("bad insert: {sql}")))?;
            let columns: Vec<&str> = columns.split(", ").collect();
            if columns.len() != params.len() {
                return Err(DriverError::Statement("column/param mismatch".to_string()));
            }
            let mut row = Row::new();
            for (column, value) in columns.iter().zip(params.iter()) {
                row.insert(column.trim().to_string(), value.clone());
            }
            self.with_database(|db| {
                db.entry(table.trim().to_string()).or_default().push(row);
            });
            return Ok(1);
        }

        if let Some(rest) = sql.strip_prefix("UPDATE ") {
            let (table, rest) = rest
                .split_once(" SET ")
                .ok_or_else(|| DriverError::Statement(format!("bad update: {sql}")))?;
            let (assignments, conditions) = match rest.split_once(" WHERE ") {
                Some((set, clause)) => (
                    parse_assignments(set, params)?,
                    parse_conditions(clause, params)?,
                ),
                None => (parse_assignments(rest, params)?, Vec::new()),
            };
            let affected = self.with_database(|db| {
                let rows = db.entry(table.trim().to_string()).or_default();
                let mut affected = 0u64;
                for row in rows.iter_mut() {
                    if row_matches(row, &conditions) {
                        for (column, value) in &assignments {
                            row.insert(column.clone(), value.clone());
                        }
                        affected += 1;
                    }
                }
                affected
            });
            return Ok(affected);
        }

        if let Some(rest) = sql.strip_prefix("DELETE FROM ") {
            let (table, conditions) = match rest.split_once(" WHERE ") {
                Some((table, clause)) => (table.trim(), parse_conditions(clause, params)?),
                None => (rest.trim(), Vec::new()),
            };
            let affected = self.with_database(|db| {
                let rows = db.entry(table.to_string()).or_default();
                let before = rows.len();
                rows.retain(|row| !row_matches(row, &conditions));
                (before - rows.len()) as u64
            });
            return Ok(affected);
        }

        Err(DriverError::Statement(format!(
            "unsupported statement: {sql}"
        )))
    }

    async fn begin(&mut self) -> Result<(), DriverError> {
        if self.snapshot.is_some() {
            return Err(DriverError::Statement(
                "transaction already open".to_string(),
            ));
        }
        let databases = self.server.databases.lock();
        self.snapshot = Some(databases.get(&self.database).cloned().unwrap_or_default());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        if self.snapshot.take().is_none() {
            return Err(DriverError::Statement("no open transaction".to_string()));
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| DriverError::Statement("no open transaction".to_string()))?;
        let mut databases = self.server.databases.lock();
        databases.insert(self.database.clone(), snapshot);
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    async fn ping(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}
