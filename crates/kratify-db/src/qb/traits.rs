//! Trait definitions for statement builders.

use crate::client::GenericClient;
use crate::error::DbResult;
use crate::qb::param::Param;
use crate::row::FromRow;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// The result of building a statement: SQL text plus its arguments in
/// placeholder order (`params[i]` binds `$i+1`).
#[derive(Debug, Clone)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Param>,
    /// Monitoring tag forwarded to the client's `*_tagged` calls.
    pub tag: Option<String>,
}

impl BuiltQuery {
    /// Create a new built query.
    pub fn new(sql: String, params: Vec<Param>) -> Self {
        Self {
            sql,
            params,
            tag: None,
        }
    }

    /// Attach a monitoring tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Get parameters as references for tokio-postgres.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }

    /// Run the statement and return all rows.
    pub async fn query(&self, conn: &impl GenericClient) -> DbResult<Vec<Row>> {
        let params = self.params_ref();
        match &self.tag {
            Some(tag) => conn.query_tagged(tag, &self.sql, &params).await,
            None => conn.query(&self.sql, &params).await,
        }
    }

    /// Run the statement and return the first row, if any.
    pub async fn query_opt(&self, conn: &impl GenericClient) -> DbResult<Option<Row>> {
        Ok(self.query(conn).await?.into_iter().next())
    }

    /// Run the statement and return the first row; zero rows is `NotFound`.
    pub async fn query_one(&self, conn: &impl GenericClient) -> DbResult<Row> {
        self.query_opt(conn)
            .await?
            .ok_or_else(|| crate::error::DbError::not_found("Expected one row, got none"))
    }

    /// Run the statement and return the number of affected rows.
    pub async fn execute(&self, conn: &impl GenericClient) -> DbResult<u64> {
        let params = self.params_ref();
        match &self.tag {
            Some(tag) => conn.execute_tagged(tag, &self.sql, &params).await,
            None => conn.execute(&self.sql, &params).await,
        }
    }
}

/// Base trait for all statement builders.
///
/// Builders are single-use: every terminal method takes `self`.
pub trait SqlQb: Sized + Send {
    /// Render the SQL text and argument list.
    fn build(self) -> BuiltQuery;

    /// Validate builder state before execution.
    fn validate(&self) -> DbResult<()> {
        Ok(())
    }

    /// Execute and return all rows.
    fn query(
        self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = DbResult<Vec<Row>>> + Send {
        async move {
            self.validate()?;
            self.build().query(conn).await
        }
    }

    /// Execute and return at most one row.
    fn query_opt(
        self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = DbResult<Option<Row>>> + Send {
        async move {
            self.validate()?;
            self.build().query_opt(conn).await
        }
    }

    /// Execute and return the first row; zero rows is `NotFound`.
    fn query_one(
        self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = DbResult<Row>> + Send {
        async move {
            self.validate()?;
            self.build().query_one(conn).await
        }
    }

    /// Execute and map all rows to `T`.
    fn fetch_all<T: FromRow>(
        self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = DbResult<Vec<T>>> + Send {
        async move {
            let rows = self.query(conn).await?;
            rows.iter().map(T::from_row).collect()
        }
    }

    /// Execute and map at most one row to `T`.
    fn fetch_opt<T: FromRow>(
        self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = DbResult<Option<T>>> + Send {
        async move {
            let row = self.query_opt(conn).await?;
            row.as_ref().map(T::from_row).transpose()
        }
    }

    /// Execute and map the first row to `T`.
    fn fetch_one<T: FromRow>(
        self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = DbResult<T>> + Send {
        async move {
            let row = self.query_one(conn).await?;
            T::from_row(&row)
        }
    }
}

/// Trait for mutation builders whose result is a row count.
pub trait MutationQb: SqlQb {
    /// Execute and return affected row count.
    fn execute(
        self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = DbResult<u64>> + Send {
        async move {
            self.validate()?;
            self.build().execute(conn).await
        }
    }
}
