use rusqlite::{Connection, OptionalExtension, Result, params};
use sha2::{Digest, Sha256};
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

impl Migration {
    pub fn new(version: u32, name: &'static str, sql: &'static str) -> Self {
        Self { version, name, sql }
    }

    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.sql.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

pub struct MigrationRunner {
    migrations: Vec<Migration>,
}

impl MigrationRunner {
    pub fn new() -> Self {
        Self {
            migrations: Self::collect_migrations(),
        }
    }

    fn collect_migrations() -> Vec<Migration> {
        vec![
            Migration::new(0, "bootstrap", include_str!("migrations/000_bootstrap.sql")),
            Migration::new(
                1,
                "initial_schema",
                include_str!("migrations/001_initial_schema.sql"),
            ),
            Migration::new(
                2,
                "add_trade_notes",
                include_str!("migrations/002_add_trade_notes.sql"),
            ),
        ]
    }

    pub fn get_current_version(&self, conn: &Connection) -> Result<Option<u32>> {
        if !self.has_schema_migrations_table(conn)? {
            return Ok(None);
        }
        conn.query_row(
            "SELECT MAX(version) FROM schema_migrations",
            [],
            |row| row.get::<_, Option<u32>>(0),
        )
        .optional()
        .map(|v| v.flatten())
    }

    fn has_schema_migrations_table(&self, conn: &Connection) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn run_pending_migrations(&self, conn: &Connection) -> Result<usize> {
        let current_version = self.get_current_version(conn)?;

        let pending: Vec<&Migration> = self
            .migrations
            .iter()
            .filter(|m| match current_version {
                Some(v) => m.version > v,
                None => true,
            })
            .collect();

        if pending.is_empty() {
            return Ok(0);
        }

        log::info!("Found {} pending migrations", pending.len());

        let mut applied = 0;
        for migration in pending {
            match self.apply_migration(conn, migration) {
                Ok(_) => {
                    applied += 1;
                    log::info!("Applied migration {}: {}", migration.version, migration.name);
                }
                Err(e) => {
                    log::error!(
                        "Migration {} ({}) failed: {}",
                        migration.version,
                        migration.name,
                        e
                    );
                    return Err(e);
                }
            }
        }

        Ok(applied)
    }

    fn apply_migration(&self, conn: &Connection, migration: &Migration) -> Result<()> {
        let start = SystemTime::now();

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql)?;

        let now = chrono::Utc::now().timestamp();
        let execution_time = start.elapsed().map(|d| d.as_millis() as i64).unwrap_or(0);

        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at, checksum, execution_time_ms)
             VALUES (?, ?, ?, ?, ?)",
            params![
                migration.version,
                migration.name,
                now,
                migration.checksum(),
                execution_time
            ],
        )?;

        tx.commit()
    }

    /// Compare stored checksums against the embedded SQL. A mismatch means
    /// a migration file changed after it was applied.
    pub fn verify_migrations(&self, conn: &Connection) -> Result<()> {
        for migration in &self.migrations {
            let stored: Option<String> = conn
                .query_row(
                    "SELECT checksum FROM schema_migrations WHERE version = ?",
                    params![migration.version],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(stored) = stored {
                if stored != migration.checksum() {
                    log::error!(
                        "Checksum mismatch for migration {} ({})",
                        migration.version,
                        migration.name
                    );
                    return Err(rusqlite::Error::InvalidQuery);
                }
            }
        }
        Ok(())
    }
}

impl Default for MigrationRunner {
    fn default() -> Self {
        Self::new()
    }
}
