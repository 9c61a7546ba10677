//! Schema bootstrap for the roster tables
//!
//! Idempotent `CREATE ... IF NOT EXISTS` statements, run at startup and by
//! `roster migrate`.

use sqlx::PgPool;

use super::StoreError;

/// Create tables and indexes if they don't exist yet
pub async fn run(pool: &PgPool) -> Result<(), StoreError> {
    tracing::info!("Running roster migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS student_groups (
            id SERIAL PRIMARY KEY,
            group_number TEXT NOT NULL UNIQUE,
            course_number INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // No ON DELETE action: deleting a referenced group must fail
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            group_id INTEGER NOT NULL REFERENCES student_groups(id),
            status BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_students_group_id ON students(group_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_students_created_at ON students(created_at)")
        .execute(pool)
        .await?;

    tracing::info!("Roster migrations complete");
    Ok(())
}
