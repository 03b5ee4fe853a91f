//! Database migrations - embedded SQL files
//!
//! Migrations are compiled into the binary with include_str! and applied in
//! order by [`MigrationService`](crate::services::MigrationService).
//!
//! When adding a migration, create `NNN_description.sql` next to this file
//! and append it here.

/// All migrations, embedded at compile time, as (filename, sql_content).
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];

/// The migration that creates `sys_migrations` itself
pub const BOOTSTRAP_MIGRATION: &str = "000_migrations.sql";
