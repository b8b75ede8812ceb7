//! Arbitrary read-only queries, the store side of the query cache.

use async_trait::async_trait;
use tokio_rusqlite::rusqlite::params_from_iter;

use super::connection::PageDb;
use crate::Error;
use crate::query_cache::{QueryStore, ResultSet, SqlValue};

#[async_trait]
impl QueryStore for PageDb {
    /// Run `signature` with positional `params`.
    ///
    /// Statements that could write are rejected before any row is read.
    async fn read(&self, signature: &str, params: &[SqlValue]) -> Result<ResultSet, Error> {
        let sql = signature.to_string();
        let params = params.to_vec();

        self.conn
            .call(move |conn| -> Result<ResultSet, Error> {
                let mut stmt = conn.prepare(&sql)?;
                if !stmt.readonly() {
                    return Err(Error::InvalidInput("query cache only accepts read-only statements".into()));
                }

                let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
                let width = columns.len();

                let mut rows = stmt.query(params_from_iter(params.iter()))?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    let values = (0..width)
                        .map(|idx| row.get::<_, SqlValue>(idx))
                        .collect::<Result<Vec<_>, _>>()?;
                    out.push(values);
                }

                Ok(ResultSet::new(columns, out))
            })
            .await
            .map_err(Error::from)
    }
}
