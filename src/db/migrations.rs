use anyhow::{bail, Context, Result};
use log::info;
use rusqlite::Connection;

/// Ordered schema steps; entry `n` upgrades `user_version` from `n` to `n + 1`.
const MIGRATIONS: &[(&str, &str)] = &[
    ("leads and activities", include_str!("schemas/schema_v1.sql")),
    ("stage and activity indexes", include_str!("schemas/schema_v2.sql")),
];

const CURRENT_SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;

    if version > CURRENT_SCHEMA_VERSION {
        bail!(
            "database schema v{version} is newer than this build supports (v{CURRENT_SCHEMA_VERSION})"
        );
    }
    if version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;

    for (index, (label, sql)) in MIGRATIONS.iter().enumerate().skip(version as usize) {
        let target = index as i32 + 1;
        tx.execute_batch(sql)
            .with_context(|| format!("migration to v{target} ({label}) failed"))?;
        info!("Applied schema v{target}: {label}");
    }

    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")?;

    Ok(())
}
