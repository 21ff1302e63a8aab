use std::sync::Arc;

use shardsql_commons::test_helpers::{CallKind, RecordingExecutor};
use shardsql_commons::{QueryRows, ShardSqlError, SqlExecutor, Value};
use shardsql_router::{LastQuery, ReplicaSet, ShardingBuilder, ShardingConnPool};
use shardsql_sharding::{PrimaryKeyKind, SequenceDialect, ShardConfig};

async fn router_with(config: ShardConfig, pool: &RecordingExecutor) -> ShardingConnPool {
    ShardingBuilder::new()
        .register(config, ["orders"])
        .initialize(Arc::new(pool.clone()))
        .await
        .expect("router initializes")
}

#[tokio::test]
async fn executes_shard_query_on_default_pool() {
    let pool = RecordingExecutor::new("main");
    let router = router_with(ShardConfig::new("user_id", 4), &pool).await;

    router
        .execute("UPDATE orders SET product = 'x' WHERE user_id = ?", &[Value::Int(100)])
        .await
        .unwrap();

    let calls = pool.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].sql, "UPDATE orders_0 SET product = 'x' WHERE user_id = ?");
    assert_eq!(calls[0].args, vec![Value::Int(100)]);
}

#[tokio::test]
async fn resolution_errors_execute_nothing() {
    let pool = RecordingExecutor::new("main");
    let router = router_with(ShardConfig::new("user_id", 4), &pool).await;

    let err = router
        .execute("DELETE FROM orders WHERE product = 'iPad'", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ShardSqlError::MissingShardingKey));

    let err = router
        .execute("INSERT INTO orders (user_id) VALUES (100), (101)", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ShardSqlError::InsertSuffixMismatch { .. }));

    assert!(pool.calls().is_empty());
}

#[tokio::test]
async fn double_write_runs_logical_then_shard() {
    let pool = RecordingExecutor::new("main");
    let router = router_with(ShardConfig::new("user_id", 4).double_write(true), &pool).await;

    router
        .execute("INSERT INTO orders (user_id, product) VALUES (100, 'iPhone')", &[])
        .await
        .unwrap();

    let statements = pool.statements();
    assert_eq!(statements.len(), 2);
    assert!(statements[0].starts_with("INSERT INTO orders (user_id, product, id)"));
    assert!(statements[1].starts_with("INSERT INTO orders_0 (user_id, product, id)"));

    // Same generated id in both writes
    let id_of = |sql: &str| sql.rsplit(", ").next().unwrap().to_string();
    assert_eq!(id_of(&statements[0]), id_of(&statements[1]));
}

#[tokio::test]
async fn double_write_skips_reads() {
    let pool = RecordingExecutor::new("main");
    let router = router_with(ShardConfig::new("user_id", 4).double_write(true), &pool).await;

    router
        .query("SELECT * FROM orders WHERE user_id = 101", &[])
        .await
        .unwrap();
    assert_eq!(pool.statements(), vec!["SELECT * FROM orders_1 WHERE user_id = 101"]);
}

#[tokio::test]
async fn double_write_failure_is_not_fatal() {
    let pool = RecordingExecutor::new("main");
    pool.fail_on("DELETE FROM orders WHERE");
    let router = router_with(ShardConfig::new("user_id", 4).double_write(true), &pool).await;

    let result = router
        .execute("DELETE FROM orders WHERE user_id = 102", &[])
        .await
        .unwrap();
    assert_eq!(result.rows_affected, 1);
    assert_eq!(
        pool.statements(),
        vec![
            "DELETE FROM orders WHERE user_id = 102",
            "DELETE FROM orders_2 WHERE user_id = 102"
        ]
    );
}

#[tokio::test]
async fn shard_write_error_propagates() {
    let pool = RecordingExecutor::new("main");
    pool.fail_on("orders_3");
    let router = router_with(ShardConfig::new("user_id", 4), &pool).await;

    let err = router
        .execute("DELETE FROM orders WHERE user_id = 3", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ShardSqlError::Datastore(_)));
}

#[tokio::test]
async fn replicas_split_reads_and_writes() {
    let pool = RecordingExecutor::new("main");
    let reader = pool.fork("reader");
    let writer = pool.fork("writer");

    let router = ShardingBuilder::new()
        .register(ShardConfig::new("user_id", 4), ["orders"])
        .replicas(
            "orders",
            ReplicaSet::new()
                .read(Arc::new(reader.clone()))
                .write(Arc::new(writer.clone())),
        )
        .initialize(Arc::new(pool.clone()))
        .await
        .unwrap();

    router
        .query("SELECT * FROM orders WHERE user_id = 1", &[])
        .await
        .unwrap();
    router
        .execute("UPDATE orders SET product = 'x' WHERE user_id = 1", &[])
        .await
        .unwrap();
    router.query("SELECT * FROM users", &[]).await.unwrap();

    assert_eq!(pool.statements_for("reader"), vec!["SELECT * FROM orders_1 WHERE user_id = 1"]);
    assert_eq!(
        pool.statements_for("writer"),
        vec!["UPDATE orders_1 SET product = 'x' WHERE user_id = 1"]
    );
    assert_eq!(pool.statements_for("main"), vec!["SELECT * FROM users"]);
}

#[tokio::test]
async fn missing_replica_side_falls_back_to_default_pool() {
    let pool = RecordingExecutor::new("main");
    let reader = pool.fork("reader");

    let router = ShardingBuilder::new()
        .register(ShardConfig::new("user_id", 4), ["orders"])
        .replicas("orders", ReplicaSet::new().read(Arc::new(reader)))
        .initialize(Arc::new(pool.clone()))
        .await
        .unwrap();

    router
        .execute("DELETE FROM orders WHERE user_id = 2", &[])
        .await
        .unwrap();
    assert_eq!(pool.statements_for("main"), vec!["DELETE FROM orders_2 WHERE user_id = 2"]);
}

#[tokio::test]
async fn last_query_observer() {
    let pool = RecordingExecutor::new("main");
    let last = Arc::new(LastQuery::new());
    let router = ShardingBuilder::new()
        .register(ShardConfig::new("user_id", 4), ["orders"])
        .observer(last.clone())
        .initialize(Arc::new(pool))
        .await
        .unwrap();

    router
        .query("SELECT * FROM orders WHERE user_id = 101", &[])
        .await
        .unwrap();
    assert_eq!(last.get().as_deref(), Some("SELECT * FROM orders_1 WHERE user_id = 101"));

    router.query("SELECT * FROM users", &[]).await.unwrap();
    assert_eq!(last.get().as_deref(), Some("SELECT * FROM users"));
}

#[tokio::test]
async fn query_row_returns_first_row() {
    let pool = RecordingExecutor::new("main");
    pool.set_rows(QueryRows::single("product", Value::from("iPhone")));
    let router = router_with(ShardConfig::new("user_id", 4), &pool).await;

    let row = router
        .query_row("SELECT product FROM orders WHERE user_id = 100", &[])
        .await
        .unwrap();
    assert_eq!(row, Some(vec![Value::from("iPhone")]));
}

#[tokio::test]
async fn transactions_stay_sharded() {
    let pool = RecordingExecutor::transactional("main");
    let router = router_with(ShardConfig::new("user_id", 4), &pool).await;

    let tx = router.begin().await.unwrap().expect("transaction handle");
    tx.execute("UPDATE orders SET product = 'x' WHERE user_id = 5", &[])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let calls = pool.calls();
    let kinds: Vec<CallKind> = calls.iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![CallKind::Begin, CallKind::Execute, CallKind::Commit]);
    assert_eq!(calls[1].executor, "main:tx");
    assert_eq!(calls[1].sql, "UPDATE orders_1 SET product = 'x' WHERE user_id = 5");
}

#[tokio::test]
async fn begin_without_transaction_support_is_a_no_op() {
    let pool = RecordingExecutor::new("main");
    let router = router_with(ShardConfig::new("user_id", 4), &pool).await;

    let tx = router.begin().await.unwrap().expect("router handle");
    tx.execute("DELETE FROM orders WHERE user_id = 1", &[])
        .await
        .unwrap();
    assert_eq!(pool.statements_for("main"), vec!["DELETE FROM orders_1 WHERE user_id = 1"]);
}

#[tokio::test]
async fn unsharded_bypasses_resolution() {
    let pool = RecordingExecutor::new("main");
    let router = router_with(ShardConfig::new("user_id", 4), &pool).await;

    router
        .unsharded()
        .execute("DELETE FROM orders", &[])
        .await
        .unwrap();
    assert_eq!(pool.statements(), vec!["DELETE FROM orders"]);
}

#[tokio::test]
async fn initialize_bootstraps_sequences_on_the_pool() {
    let pool = RecordingExecutor::new("main");
    let config = ShardConfig::new("user_id", 4)
        .primary_key(PrimaryKeyKind::Sequence(SequenceDialect::MySql));
    let router = router_with(config, &pool).await;

    assert_eq!(pool.statements().len(), 2);
    pool.clear();

    router
        .execute("INSERT INTO orders (user_id) VALUES (7)", &[])
        .await
        .unwrap();
    assert_eq!(
        pool.statements(),
        vec![
            "UPDATE `shardsql_orders_id_seq` SET id = LAST_INSERT_ID(id + 1)",
            "INSERT INTO orders_3 (user_id, id) VALUES (7, 1)",
        ]
    );
}

#[tokio::test]
async fn concurrent_callers() {
    let pool = RecordingExecutor::new("main");
    let router = Arc::new(router_with(ShardConfig::new("user_id", 4), &pool).await);

    let mut handles = Vec::new();
    for user_id in 0..32i64 {
        let router = Arc::clone(&router);
        handles.push(tokio::spawn(async move {
            router
                .execute("INSERT INTO orders (user_id) VALUES (?)", &[Value::Int(user_id)])
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let statements = pool.statements();
    assert_eq!(statements.len(), 32);
    for shard in 0..4 {
        let prefix = format!("INSERT INTO orders_{} ", shard);
        assert_eq!(statements.iter().filter(|s| s.starts_with(&prefix)).count(), 8);
    }
}

#[tokio::test]
async fn nested_begin_joins_the_open_transaction() {
    let pool = RecordingExecutor::transactional("main");
    let router = router_with(ShardConfig::new("user_id", 4), &pool).await;

    let tx = router.begin().await.unwrap().expect("transaction handle");
    let nested = tx.begin().await.unwrap().expect("nested handle");
    nested
        .execute("DELETE FROM orders WHERE user_id = 2", &[])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let kinds: Vec<CallKind> = pool.calls().iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![CallKind::Begin, CallKind::Execute, CallKind::Commit]);
    assert_eq!(pool.calls()[1].executor, "main:tx");
}
