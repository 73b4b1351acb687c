use sqlx::postgres::{PgArguments, PgConnection, PgRow};
use sqlx::query::{Query, QueryAs};
use sqlx::{FromRow, Postgres, Row};

use crate::filter::{Filter, FilterValue, SqlResult};

/// Runs a filter's SELECT on `conn`.
pub async fn select_all<T>(conn: &mut PgConnection, filter: &Filter) -> Result<Vec<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let sql_result = filter.to_sql();
    tracing::debug!(query = %sql_result.query, "select");
    let mut q = sqlx::query_as::<_, T>(&sql_result.query);
    for p in sql_result.params.iter() {
        q = bind_param_query_as(q, p);
    }
    q.fetch_all(conn).await
}

pub async fn count(conn: &mut PgConnection, filter: &Filter) -> Result<i64, sqlx::Error> {
    let SqlResult { query, params } = filter.to_count_sql();
    let mut q = sqlx::query(&query);
    for p in params.iter() {
        q = bind_param_query(q, p);
    }
    let row = q.fetch_one(conn).await?;
    row.try_get("count")
}

fn bind_param_query<'q>(q: Query<'q, Postgres, PgArguments>, v: &FilterValue) -> Query<'q, Postgres, PgArguments> {
    match v {
        FilterValue::Bool(b) => q.bind(*b),
        FilterValue::Text(s) => q.bind(s.clone()),
        FilterValue::Uuid(u) => q.bind(*u),
        FilterValue::Timestamp(t) => q.bind(*t),
    }
}

fn bind_param_query_as<'q, O>(
    q: QueryAs<'q, Postgres, O, PgArguments>,
    v: &FilterValue,
) -> QueryAs<'q, Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        FilterValue::Bool(b) => q.bind(*b),
        FilterValue::Text(s) => q.bind(s.clone()),
        FilterValue::Uuid(u) => q.bind(*u),
        FilterValue::Timestamp(t) => q.bind(*t),
    }
}
