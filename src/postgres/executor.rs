use async_trait::async_trait;
use deadpool_postgres::ClientWrapper;
use futures_util::{TryStreamExt, pin_mut};
use tokio_postgres::types::ToSql;
use tracing::trace;

use super::query::postgres_extract_value;
use crate::error::BoxError;
use crate::pool::EngineConnection;
use crate::results::NativeResult;
use crate::types::RowValues;

#[async_trait]
impl EngineConnection for ClientWrapper {
    async fn run(&mut self, sql: &str, params: &[RowValues]) -> Result<NativeResult, BoxError> {
        let stmt = self.prepare_cached(sql).await?;
        let columns: Vec<String> = stmt
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect();

        let stream = self
            .query_raw(&stmt, params.iter().map(|p| p as &(dyn ToSql + Sync)))
            .await?;
        pin_mut!(stream);

        let mut rows = Vec::new();
        while let Some(row) = stream.try_next().await? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(postgres_extract_value(&row, idx)?);
            }
            rows.push(values);
        }

        let rows_affected = stream
            .rows_affected()
            .unwrap_or_else(|| rows.len() as u64);
        trace!(rows = rows.len(), rows_affected, "postgres statement complete");

        Ok(NativeResult {
            columns,
            rows,
            rows_affected,
        })
    }

    fn is_broken(&self) -> bool {
        self.is_closed()
    }
}
