use std::slice::Chunks;

use async_trait::async_trait;
use log::debug;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{Connection, Executor, MySql, QueryBuilder};

use super::{LoadError, LoadStep, TableSession};
use crate::normalize::row::{Column, FieldValue, NormalizedRow};

/// MySQL caps a prepared statement at 65535 placeholders.
const MAX_PLACEHOLDERS: usize = 65_535;
const MAX_ROWS_PER_STATEMENT: usize = 1_000;

/// One MySQL connection with autocommit turned off.
///
/// MySQL commits implicitly around `DROP TABLE` and `CREATE TABLE`. With
/// autocommit off, the server opens a new transaction right after each DDL
/// statement, so the inserts that follow are committed or rolled back together
/// and a failed load leaves the weekly table empty rather than half filled.
pub struct MySqlSession {
    conn: MySqlConnection,
}

impl MySqlSession {
    pub async fn connect(options: &MySqlConnectOptions) -> Result<MySqlSession, LoadError> {
        let mut conn = MySqlConnection::connect_with(options).await.map_err(LoadError::Connect)?;
        conn.execute("SET autocommit = 0").await.map_err(LoadError::Connect)?;

        Ok(MySqlSession { conn })
    }

    pub async fn close(self) -> Result<(), LoadError> {
        self.conn.close().await.map_err(LoadError::Connect)
    }
}

fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn rows_per_statement(columns: usize) -> usize {
    (MAX_PLACEHOLDERS / columns.max(1)).clamp(1, MAX_ROWS_PER_STATEMENT)
}

fn batches<'a>(columns: &[Column], rows: &'a [NormalizedRow]) -> Chunks<'a, NormalizedRow> {
    rows.chunks(rows_per_statement(columns.len()))
}

/// One multi-row `INSERT` with a placeholder per cell.
fn insert_statement(table: &str, columns: &[Column], chunk: &[NormalizedRow]) -> QueryBuilder<'static, MySql> {
    let column_list = columns
        .iter()
        .map(|column| quote_identifier(column.name()))
        .collect::<Vec<_>>()
        .join(", ");

    let mut builder = QueryBuilder::new(format!("INSERT INTO {} ({}) ", quote_identifier(table), column_list));
    builder.push_values(chunk, |mut values, row| {
        for column in columns {
            match row.value(*column) {
                FieldValue::Text(text) => {
                    values.push_bind(text);
                },
                FieldValue::Decimal(number) => {
                    values.push_bind(number);
                },
            }
        }
    });

    builder
}

#[async_trait]
impl TableSession for MySqlSession {
    async fn drop_table(&mut self, table: &str) -> Result<(), LoadError> {
        let sql = format!("DROP TABLE IF EXISTS {}", quote_identifier(table));
        self.conn
            .execute(sql.as_str())
            .await
            .map_err(|source| LoadError::statement(LoadStep::Drop, table, source))?;

        Ok(())
    }

    async fn create_table_like(&mut self, table: &str, template: &str) -> Result<(), LoadError> {
        let sql = format!("CREATE TABLE {} LIKE {}", quote_identifier(table), quote_identifier(template));
        self.conn
            .execute(sql.as_str())
            .await
            .map_err(|source| LoadError::statement(LoadStep::Create, table, source))?;

        Ok(())
    }

    async fn insert_rows(&mut self, table: &str, columns: &[Column], rows: &[NormalizedRow]) -> Result<u64, LoadError> {
        let mut inserted = 0;
        for chunk in batches(columns, rows) {
            let result = insert_statement(table, columns, chunk)
                .build()
                .execute(&mut self.conn)
                .await
                .map_err(|source| LoadError::statement(LoadStep::Insert, table, source))?;
            inserted += result.rows_affected();
            debug!("inserted batch of {} rows into {}", chunk.len(), table);
        }

        Ok(inserted)
    }

    async fn commit(&mut self) -> Result<(), LoadError> {
        self.conn
            .execute("COMMIT")
            .await
            .map_err(|source| LoadError::Transaction { step: LoadStep::Commit, source })?;

        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), LoadError> {
        self.conn
            .execute("ROLLBACK")
            .await
            .map_err(|source| LoadError::Transaction { step: LoadStep::Rollback, source })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_rows_per_statement_stays_under_placeholder_limit() {
        assert_eq!(rows_per_statement(17), 1_000);
        assert_eq!(rows_per_statement(100), 655);
        assert_eq!(rows_per_statement(0), 1_000);
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("portfolio_week_3"), "`portfolio_week_3`");
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_insert_statement_sql() {
        let mut apple = NormalizedRow::new("AAPL");
        apple.holding_value = Some(dec!(1905));
        let royal = NormalizedRow::new("RY");
        let rows = vec![apple, royal];

        let builder = insert_statement("portfolio_week_2", &[Column::Ticker, Column::HoldingValue], &rows);

        assert_eq!(
            builder.sql(),
            "INSERT INTO `portfolio_week_2` (`ticker`, `holding_value`) VALUES (?, ?), (?, ?)"
        );
    }

    #[test]
    fn test_batches_split_large_loads() {
        let rows: Vec<NormalizedRow> = (0..1_001).map(|i| NormalizedRow::new(format!("T{i}"))).collect();

        let sizes: Vec<usize> = batches(&Column::ALL, &rows).map(<[NormalizedRow]>::len).collect();

        assert_eq!(sizes, vec![1_000, 1]);
    }

    #[test]
    fn test_batches_empty_load() {
        assert_eq!(batches(&Column::ALL, &[]).count(), 0);
    }
}
