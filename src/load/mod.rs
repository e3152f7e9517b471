use std::fmt;

use async_trait::async_trait;
use log::{debug, info, warn};
use thiserror::Error;

pub mod mysql;


use crate::normalize::row::{Column, NormalizedRow};
use crate::normalize::NormalizedTable;

/// Externally maintained table whose schema every weekly table copies.
pub const TEMPLATE_TABLE: &str = "portfolio_template";

/// Number of weekly tables kept before a slot is reused.
pub const ROTATION_SLOTS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadStep {
    Drop,
    Create,
    Insert,
    Commit,
    Rollback,
}

impl fmt::Display for LoadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            LoadStep::Drop => "drop table",
            LoadStep::Create => "create table",
            LoadStep::Insert => "insert rows",
            LoadStep::Commit => "commit",
            LoadStep::Rollback => "rollback",
        };
        f.write_str(step)
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to connect to the database: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("week {0} is not an ISO week number")]
    InvalidWeek(u32),
    #[error("{step} failed on '{table}': {source}")]
    Statement {
        step: LoadStep,
        table: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("{step} failed: {source}")]
    Transaction {
        step: LoadStep,
        #[source]
        source: sqlx::Error,
    },
}

impl LoadError {
    pub fn statement(step: LoadStep, table: &str, source: sqlx::Error) -> LoadError {
        LoadError::Statement {
            step,
            table: table.to_string(),
            source,
        }
    }
}

/// The weekly table a run replaces: `portfolio_week_<slot>`, slot in `1..=12`.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetTable {
    slot: u32,
    name: String,
}

impl TargetTable {
    pub fn for_week(week: u32) -> Result<TargetTable, LoadError> {
        if !(1..=53).contains(&week) {
            return Err(LoadError::InvalidWeek(week));
        }

        let slot = ((week - 1) % ROTATION_SLOTS) + 1;
        Ok(TargetTable {
            slot,
            name: format!("portfolio_week_{slot}"),
        })
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TargetTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The statements the loader needs from one database connection.
///
/// Everything issued between opening the session and `commit` belongs to one
/// unit of work; `rollback` discards whatever of it the backend can undo.
#[async_trait]
pub trait TableSession: Send {
    async fn drop_table(&mut self, table: &str) -> Result<(), LoadError>;

    async fn create_table_like(&mut self, table: &str, template: &str) -> Result<(), LoadError>;

    /// Inserts every row with the same column list. Returns the rows written.
    async fn insert_rows(&mut self, table: &str, columns: &[Column], rows: &[NormalizedRow]) -> Result<u64, LoadError>;

    async fn commit(&mut self) -> Result<(), LoadError>;

    async fn rollback(&mut self) -> Result<(), LoadError>;
}

/// Replaces the week's table with `table`'s rows. On failure the session is
/// rolled back and the original error returned.
pub async fn load<S: TableSession>(session: &mut S, table: &NormalizedTable, week: u32) -> Result<u64, LoadError> {
    let target = TargetTable::for_week(week)?;
    info!("preparing update of table {}", target);

    match replace_contents(session, &target, table).await {
        Ok(inserted) => {
            info!("{} rows inserted into table '{}'", inserted, target);
            Ok(inserted)
        },
        Err(err) => {
            if let Err(rollback_err) = session.rollback().await {
                warn!("rollback after failed load also failed, err={}", rollback_err);
            }
            Err(err)
        },
    }
}

async fn replace_contents<S: TableSession>(session: &mut S, target: &TargetTable, table: &NormalizedTable) -> Result<u64, LoadError> {
    session.drop_table(target.name()).await?;
    session.create_table_like(target.name(), TEMPLATE_TABLE).await?;

    let inserted = if table.is_empty() {
        debug!("no rows to insert into {}", target);
        0
    } else {
        session.insert_rows(target.name(), &table.columns, &table.rows).await?
    };

    session.commit().await?;

    Ok(inserted)
}
