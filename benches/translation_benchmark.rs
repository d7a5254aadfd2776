//! Criterion benchmark for the legacy request path without an engine: rebinding named
//! parameters plus T-SQL rewriting, measured per statement shape.

use std::hint::black_box;

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use legacy_sql_bridge::prelude::*;
use tokio::runtime::Runtime;

const STATEMENTS: &[(&str, &str)] = &[
    ("plain", "SELECT id, name FROM clients WHERE id = @id"),
    (
        "top_order_by",
        "SELECT TOP 10 id, title, due_date FROM tasks WHERE project_id = @project ORDER BY due_date DESC",
    ),
    (
        "insert_output",
        "INSERT INTO time_entries (task_id, minutes, note, logged_at) OUTPUT INSERTED.* \
         VALUES (@task, @minutes, @note, GETDATE())",
    ),
    (
        "literals_and_comments",
        "SELECT ISNULL(note, 'n/a -- GETDATE()') /* TOP 5 */ FROM invoices WHERE client = @client -- trailing",
    ),
    (
        "create_table",
        "CREATE TABLE invoices (id INT IDENTITY(1,1) PRIMARY KEY, ref UNIQUEIDENTIFIER, \
         title NVARCHAR(200), body NVARCHAR(MAX), paid BIT DEFAULT 0, issued DATETIME2)",
    ),
];

struct Discard;

#[async_trait]
impl StatementExecutor for Discard {
    async fn execute(&self, sql: &str, params: &[RowValues]) -> Result<NativeResult, BridgeError> {
        black_box((sql, params));
        Ok(NativeResult::default())
    }
}

fn bench_rewrite(c: &mut Criterion) {
    let mut group = c.benchmark_group("rewrite");
    for (label, sql) in STATEMENTS {
        group.throughput(Throughput::Bytes(sql.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label), sql, |b, sql| {
            b.iter(|| rewrite(black_box(sql)));
        });
    }
    group.finish();
}

fn bench_request(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let db = Database::new(Discard);
    let db = &db;
    let mut group = c.benchmark_group("request_execute");
    for (label, sql) in STATEMENTS {
        group.bench_with_input(BenchmarkId::from_parameter(label), sql, |b, sql| {
            b.to_async(&rt).iter(|| async move {
                db.new_request()
                    .bind("id", SqlType::Int, 1)
                    .bind("project", SqlType::Int, 2)
                    .bind("task", SqlType::Int, 3)
                    .bind("minutes", SqlType::Int, 45)
                    .bind("note", SqlType::NVarChar, "standup")
                    .bind("client", SqlType::Int, 4)
                    .execute(black_box(sql))
                    .await
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rewrite, bench_request);
criterion_main!(benches);
