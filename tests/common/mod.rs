#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use legacy_sql_bridge::error::BoxError;
use legacy_sql_bridge::pool::managed::{self, Metrics, RecycleResult};
use legacy_sql_bridge::prelude::*;

/// Records every statement and answers from a queue of canned results.
#[derive(Default)]
pub struct RecordingExecutor {
    pub calls: Mutex<Vec<(String, Vec<RowValues>)>>,
    responses: Mutex<VecDeque<Result<NativeResult, String>>>,
    closed: std::sync::atomic::AtomicBool,
}

impl RecordingExecutor {
    pub fn respond(&self, native: NativeResult) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(native));
        self
    }

    pub fn fail(&self, message: &str) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn last_call(&self) -> (String, Vec<RowValues>) {
        self.calls.lock().unwrap().last().cloned().unwrap()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatementExecutor for RecordingExecutor {
    async fn execute(&self, sql: &str, params: &[RowValues]) -> Result<NativeResult, BridgeError> {
        if self.is_closed() {
            return Err(BridgeError::PoolClosed);
        }
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(native)) => Ok(native),
            Some(Err(message)) => Err(BridgeError::Execution {
                source: message.into(),
                sql: sql.to_string(),
                params: params.to_vec(),
            }),
            None => Ok(NativeResult::default()),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub fn rows(columns: &[&str], rows: Vec<Vec<RowValues>>) -> NativeResult {
    let rows_affected = rows.len() as u64;
    NativeResult {
        columns: columns.iter().map(|c| (*c).to_string()).collect(),
        rows,
        rows_affected,
    }
}

pub fn affected(n: u64) -> NativeResult {
    NativeResult {
        rows_affected: n,
        ..NativeResult::default()
    }
}

/// In-memory deadpool manager; connections answer with their own id.
#[derive(Clone, Debug, Default)]
pub struct FakeManager {
    pub created: Arc<AtomicUsize>,
}

impl FakeManager {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct FakeConnection {
    pub id: usize,
    broken: bool,
}

impl managed::Manager for FakeManager {
    type Type = FakeConnection;
    type Error = std::io::Error;

    async fn create(&self) -> Result<FakeConnection, std::io::Error> {
        let id = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(FakeConnection { id, broken: false })
    }

    async fn recycle(&self, _conn: &mut FakeConnection, _: &Metrics) -> RecycleResult<std::io::Error> {
        Ok(())
    }
}

/// Statements understood by `FakeConnection`:
/// `FAIL` errors, `BREAK` errors and marks the connection broken, `SLEEP <ms>` stalls,
/// anything else returns one row `{ conn_id }`.
#[async_trait]
impl EngineConnection for FakeConnection {
    async fn run(&mut self, sql: &str, _params: &[RowValues]) -> Result<NativeResult, BoxError> {
        if sql == "FAIL" {
            return Err("syntax error at or near \"FAIL\"".into());
        }
        if sql == "BREAK" {
            self.broken = true;
            return Err("connection reset by peer".into());
        }
        if let Some(ms) = sql.strip_prefix("SLEEP ") {
            tokio::time::sleep(Duration::from_millis(ms.parse()?)).await;
        }
        #[allow(clippy::cast_possible_wrap)]
        let id = self.id as i64;
        Ok(rows(&["conn_id"], vec![vec![RowValues::Int(id)]]))
    }

    fn is_broken(&self) -> bool {
        self.broken
    }
}

pub fn fake_pool(options: PoolOptions) -> (ConnectionPool<FakeManager>, FakeManager) {
    let manager = FakeManager::default();
    let pool = ConnectionPool::new(manager.clone(), options).unwrap();
    (pool, manager)
}

pub fn options(max_connections: usize, connect_timeout_ms: u64) -> PoolOptions {
    PoolOptions {
        max_connections,
        idle_timeout: None,
        connect_timeout: Duration::from_millis(connect_timeout_ms),
        statement_timeout: None,
    }
}
