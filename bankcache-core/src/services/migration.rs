//! Schema migrations
//!
//! Each embedded migration runs inside its own transaction together with the
//! row that records it in `sys_migrations`, so a failed migration leaves no
//! trace and is retried on the next open.

use duckdb::Connection;

use crate::domain::result::Result;
use crate::migrations::{BOOTSTRAP_MIGRATION, MIGRATIONS};

/// Outcome of a migration run
#[derive(Debug, Default)]
pub struct MigrationReport {
    /// Migrations applied by this run, in order
    pub applied: Vec<String>,
    /// Migrations that were already recorded before this run
    pub already_applied: usize,
}

pub struct MigrationService<'a> {
    conn: &'a mut Connection,
}

impl<'a> MigrationService<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Self { conn }
    }

    /// Apply every migration that is not yet recorded
    pub fn run_pending(&mut self) -> Result<MigrationReport> {
        let mut report = MigrationReport::default();

        if !self.bootstrapped()? {
            self.apply(BOOTSTRAP_MIGRATION)?;
            report.applied.push(BOOTSTRAP_MIGRATION.to_string());
        }

        let recorded = self.get_applied()?;
        report.already_applied = recorded.len() - report.applied.len();

        for (name, _) in MIGRATIONS.iter().filter(|(name, _)| *name != BOOTSTRAP_MIGRATION) {
            if recorded.iter().any(|r| r == name) {
                continue;
            }
            self.apply(name)?;
            report.applied.push(name.to_string());
        }

        if !report.applied.is_empty() {
            tracing::info!(applied = ?report.applied, "applied schema migrations");
        }
        Ok(report)
    }

    /// Names of recorded migrations, sorted
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Names of embedded migrations that have not been recorded
    pub fn get_pending(&self) -> Result<Vec<String>> {
        let applied = if self.bootstrapped()? {
            self.get_applied()?
        } else {
            Vec::new()
        };
        Ok(MIGRATIONS
            .iter()
            .map(|(name, _)| name.to_string())
            .filter(|name| !applied.contains(name))
            .collect())
    }

    fn bootstrapped(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn apply(&mut self, name: &str) -> Result<()> {
        let Some((_, sql)) = MIGRATIONS.iter().find(|(n, _)| *n == name) else {
            return Err(crate::Error::storage(format!("unknown migration {name}")));
        };

        tracing::debug!(migration = name, "applying migration");
        let tx = self.conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])?;
        tx.commit()?;
        Ok(())
    }
}
