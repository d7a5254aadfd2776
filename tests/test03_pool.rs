mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{fake_pool, options};
use legacy_sql_bridge::prelude::*;
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exhausted_pool_times_out() {
    let (pool, _) = fake_pool(options(1, 100));
    let held = pool.acquire().await.unwrap();

    let started = Instant::now();
    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(err, BridgeError::PoolTimeout { waited } if waited == Duration::from_millis(100)));
    assert!(started.elapsed() >= Duration::from_millis(90));

    ConnectionPool::release(held);
    assert!(pool.acquire().await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn waiter_gets_connection_on_release() {
    let (pool, manager) = fake_pool(options(1, 2_000));
    let pool = Arc::new(pool);
    let held = pool.acquire().await.unwrap();
    let held_id = held.id;

    let waiter = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.acquire().await.map(|conn| conn.id) })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    ConnectionPool::release(held);
    let got = waiter.await.unwrap().unwrap();
    assert_eq!(got, held_id);
    assert_eq!(manager.created(), 1);
}

#[tokio::test]
async fn cancelled_acquire_does_not_leak_a_slot() {
    let (pool, _) = fake_pool(options(1, 5_000));
    let held = pool.acquire().await.unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });
    let err = pool.acquire_until(&cancel).await.unwrap_err();
    assert!(matches!(err, BridgeError::Cancelled));

    drop(held);
    let again = tokio::time::timeout(Duration::from_millis(500), pool.acquire())
        .await
        .expect("slot was leaked");
    assert!(again.is_ok());
    assert_eq!(pool.status().max_size, 1);
}

#[tokio::test]
async fn panicking_holder_still_releases() {
    let (pool, _) = fake_pool(options(1, 500));
    let pool = Arc::new(pool);

    let task = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            let _conn = pool.acquire().await.unwrap();
            panic!("route handler blew up");
        })
    };
    assert!(task.await.is_err());
    assert!(pool.acquire().await.is_ok());
}

#[tokio::test]
async fn engine_error_keeps_healthy_connection() {
    let (pool, manager) = fake_pool(options(1, 500));

    let err = pool.execute("FAIL", &[]).await.unwrap_err();
    assert!(matches!(err, BridgeError::Execution { .. }));
    assert!(err.native_error().unwrap().to_string().contains("syntax error"));

    let native = pool.execute("SELECT 1", &[]).await.unwrap();
    assert_eq!(native.rows[0][0], RowValues::Int(1));
    assert_eq!(manager.created(), 1);
}

#[tokio::test]
async fn broken_connection_is_evicted() {
    let (pool, manager) = fake_pool(options(1, 500));

    assert!(pool.execute("BREAK", &[]).await.is_err());
    let native = pool.execute("SELECT 1", &[]).await.unwrap();
    assert_eq!(native.rows[0][0], RowValues::Int(2));
    assert_eq!(manager.created(), 2);
}

#[tokio::test]
async fn statement_timeout_evicts() {
    let (pool, manager) = fake_pool(PoolOptions {
        statement_timeout: Some(Duration::from_millis(20)),
        ..options(1, 500)
    });

    let err = pool.execute("SLEEP 500", &[]).await.unwrap_err();
    assert!(matches!(err, BridgeError::StatementTimeout(d) if d == Duration::from_millis(20)));

    let native = pool.execute("SELECT 1", &[]).await.unwrap();
    assert_eq!(native.rows[0][0], RowValues::Int(2));
    assert_eq!(manager.created(), 2);
}

#[tokio::test]
async fn explicit_evict_frees_the_slot() {
    let (pool, manager) = fake_pool(options(1, 200));
    let conn = pool.acquire().await.unwrap();
    ConnectionPool::evict(conn);
    assert_eq!(pool.status().size, 0);

    let conn = pool.acquire().await.unwrap();
    assert_eq!(conn.id, 2);
    assert_eq!(manager.created(), 2);
}

#[tokio::test]
async fn idle_connections_are_reaped() {
    let (pool, _) = fake_pool(PoolOptions {
        idle_timeout: Some(Duration::from_millis(50)),
        ..options(2, 500)
    });
    let a = pool.acquire().await.unwrap();
    let b = pool.acquire().await.unwrap();
    drop((a, b));
    assert_eq!(pool.status().size, 2);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(pool.status().size, 0);
}

#[tokio::test]
async fn closed_pool_rejects_acquire() {
    let (pool, _) = fake_pool(options(2, 200));
    pool.close();
    assert!(pool.is_closed());
    assert!(matches!(pool.acquire().await, Err(BridgeError::PoolClosed)));
    assert!(matches!(
        pool.execute("SELECT 1", &[]).await,
        Err(BridgeError::PoolClosed)
    ));
}

#[tokio::test]
async fn zero_sized_pool_is_rejected() {
    let manager = common::FakeManager::default();
    let err = ConnectionPool::new(manager, options(0, 100)).unwrap_err();
    assert!(matches!(err, BridgeError::ConfigError(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_bounded_pool() {
    let (pool, manager) = fake_pool(options(3, 2_000));
    let db = Arc::new(Database::new(pool));

    let mut tasks = Vec::new();
    for _ in 0..24 {
        let db = Arc::clone(&db);
        tasks.push(tokio::spawn(async move {
            db.query("SLEEP 5", &[]).await.map(|r| r.row_count)
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), 1);
    }
    assert!(manager.created() <= 3);
    let status = db.executor().status();
    assert_eq!(status.available, status.size);
}
