//! PostgreSQL store
//!
//! - listing: single JOIN query per page, plus one COUNT with the same predicate
//! - writes: rely on FK/UNIQUE constraints and translate violations
//! - import: one transaction for the whole batch

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use roster_core::{
    Group, GroupDraft, GroupNumber, RecordId, SortDirection, SortKey, Student, StudentDraft,
    StudentPredicate, StudentQuery, StudentWithGroup,
};

use super::store::{Store, StoreError, StudentUpsert, UpsertSummary};

const JOINED_SELECT: &str = r#"
    SELECT
        s.id, s.name, s.group_id, s.status, s.created_at, s.updated_at,
        g.group_number, g.course_number
    FROM students s
    JOIN student_groups g ON g.id = s.group_id
"#;

const JOINED_COUNT: &str = r#"
    SELECT COUNT(*)
    FROM students s
    JOIN student_groups g ON g.id = s.group_id
"#;

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn group_from_row(row: &PgRow) -> Group {
    Group {
        id: row.get("id"),
        group_number: row.get("group_number"),
        course_number: row.get("course_number"),
    }
}

fn student_from_row(row: &PgRow) -> Student {
    Student {
        id: row.get("id"),
        name: row.get("name"),
        group_id: row.get("group_id"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn joined_from_row(row: &PgRow) -> StudentWithGroup {
    let student = student_from_row(row);
    let group = Group {
        id: student.group_id,
        group_number: row.get("group_number"),
        course_number: row.get("course_number"),
    };
    StudentWithGroup::join(student, group)
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Student writes: a dangling group_id means the group doesn't exist.
fn student_write_error(err: sqlx::Error) -> StoreError {
    if is_foreign_key_violation(&err) {
        StoreError::MissingReference { resource: "Group" }
    } else {
        StoreError::Sqlx(err)
    }
}

fn group_write_error(err: sqlx::Error, number: &GroupNumber) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Conflict(format!("group '{}' already exists", number.as_str()))
    } else {
        StoreError::Sqlx(err)
    }
}

/// Column expression for a sort key. Names sort bytewise so the order
/// doesn't depend on the database locale.
fn sort_column(key: SortKey) -> &'static str {
    match key {
        SortKey::Id => "s.id",
        SortKey::Name => r#"s.name COLLATE "C""#,
        SortKey::Status => "s.status",
        SortKey::GroupId => "s.group_id",
        SortKey::CreatedAt => "s.created_at",
    }
}

fn sort_direction(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => " ASC",
        SortDirection::Desc => " DESC",
    }
}

/// Append `WHERE ...` for the predicate. Unset fields add nothing.
fn push_predicate(builder: &mut QueryBuilder<'_, Postgres>, predicate: &StudentPredicate) {
    builder.push(" WHERE TRUE");
    if let Some(name) = &predicate.name_contains {
        // strpos is case-sensitive and needs no LIKE escaping
        builder.push(" AND strpos(s.name, ");
        builder.push_bind(name.clone());
        builder.push(") > 0");
    }
    if let Some(group_id) = predicate.group_id {
        builder.push(" AND s.group_id = ");
        builder.push_bind(group_id);
    }
    if let Some(course_number) = predicate.course_number {
        builder.push(" AND g.course_number = ");
        builder.push_bind(course_number);
    }
    if let Some(status) = predicate.status {
        builder.push(" AND s.status = ");
        builder.push_bind(status);
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_group(&self, draft: GroupDraft) -> Result<Group, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO student_groups (group_number, course_number)
            VALUES ($1, $2)
            RETURNING id, group_number, course_number
            "#,
        )
        .bind(draft.group_number.as_str())
        .bind(draft.course_number)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| group_write_error(e, &draft.group_number))?;

        Ok(group_from_row(&row))
    }

    async fn find_group(&self, id: RecordId) -> Result<Group, StoreError> {
        let row = sqlx::query(
            "SELECT id, group_number, course_number FROM student_groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound { resource: "Group", id })?;

        Ok(group_from_row(&row))
    }

    async fn find_group_by_number(&self, number: &GroupNumber) -> Result<Option<Group>, StoreError> {
        let row = sqlx::query(
            "SELECT id, group_number, course_number FROM student_groups WHERE group_number = $1",
        )
        .bind(number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(group_from_row))
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, group_number, course_number
            FROM student_groups
            ORDER BY group_number COLLATE "C" ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(group_from_row).collect())
    }

    async fn update_group(&self, id: RecordId, draft: GroupDraft) -> Result<Group, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE student_groups
            SET group_number = $1, course_number = $2
            WHERE id = $3
            RETURNING id, group_number, course_number
            "#,
        )
        .bind(draft.group_number.as_str())
        .bind(draft.course_number)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| group_write_error(e, &draft.group_number))?
        .ok_or(StoreError::NotFound { resource: "Group", id })?;

        Ok(group_from_row(&row))
    }

    async fn delete_group(&self, id: RecordId) -> Result<Group, StoreError> {
        let row = sqlx::query(
            "DELETE FROM student_groups WHERE id = $1 RETURNING id, group_number, course_number",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::Conflict(format!("group {} still has students", id))
            } else {
                StoreError::Sqlx(e)
            }
        })?
        .ok_or(StoreError::NotFound { resource: "Group", id })?;

        Ok(group_from_row(&row))
    }

    async fn create_student(&self, draft: StudentDraft) -> Result<Student, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO students (name, group_id, status)
            VALUES ($1, $2, $3)
            RETURNING id, name, group_id, status, created_at, updated_at
            "#,
        )
        .bind(draft.name.as_str())
        .bind(draft.group_id)
        .bind(draft.status)
        .fetch_one(&self.pool)
        .await
        .map_err(student_write_error)?;

        Ok(student_from_row(&row))
    }

    async fn find_student(&self, id: RecordId) -> Result<Student, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, group_id, status, created_at, updated_at
            FROM students
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound { resource: "Student", id })?;

        Ok(student_from_row(&row))
    }

    async fn find_students(&self, query: &StudentQuery) -> Result<Vec<StudentWithGroup>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(JOINED_SELECT);
        push_predicate(&mut builder, &query.predicate);
        builder.push(" ORDER BY ");
        builder.push(sort_column(query.sort.key));
        builder.push(sort_direction(query.sort.direction));
        builder.push(", s.id ASC");
        builder.push(" LIMIT ");
        builder.push_bind(query.take);
        builder.push(" OFFSET ");
        builder.push_bind(query.skip);

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(joined_from_row).collect())
    }

    async fn count_students(&self, predicate: &StudentPredicate) -> Result<i64, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(JOINED_COUNT);
        push_predicate(&mut builder, predicate);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn update_student(&self, id: RecordId, draft: StudentDraft) -> Result<Student, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE students
            SET name = $1, group_id = $2, status = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING id, name, group_id, status, created_at, updated_at
            "#,
        )
        .bind(draft.name.as_str())
        .bind(draft.group_id)
        .bind(draft.status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(student_write_error)?
        .ok_or(StoreError::NotFound { resource: "Student", id })?;

        Ok(student_from_row(&row))
    }

    async fn set_student_status(&self, id: RecordId, status: bool) -> Result<Student, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE students
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, name, group_id, status, created_at, updated_at
            "#,
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound { resource: "Student", id })?;

        Ok(student_from_row(&row))
    }

    async fn delete_student(&self, id: RecordId) -> Result<Student, StoreError> {
        let row = sqlx::query(
            r#"
            DELETE FROM students
            WHERE id = $1
            RETURNING id, name, group_id, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound { resource: "Student", id })?;

        Ok(student_from_row(&row))
    }

    async fn upsert_students(&self, batch: Vec<StudentUpsert>) -> Result<UpsertSummary, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut summary = UpsertSummary::default();

        for item in batch {
            if let Some(id) = item.id {
                let updated = sqlx::query(
                    r#"
                    UPDATE students
                    SET name = $1, group_id = $2, status = $3, updated_at = NOW()
                    WHERE id = $4
                    "#,
                )
                .bind(item.draft.name.as_str())
                .bind(item.draft.group_id)
                .bind(item.draft.status)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(student_write_error)?;

                if updated.rows_affected() > 0 {
                    summary.updated += 1;
                    continue;
                }
            }

            let row = sqlx::query(
                r#"
                INSERT INTO students (name, group_id, status)
                VALUES ($1, $2, $3)
                RETURNING id
                "#,
            )
            .bind(item.draft.name.as_str())
            .bind(item.draft.group_id)
            .bind(item.draft.status)
            .fetch_one(&mut *tx)
            .await
            .map_err(student_write_error)?;

            let assigned: RecordId = row.get("id");
            if let Some(requested) = item.id {
                tracing::warn!(
                    requested_id = requested,
                    assigned_id = assigned,
                    "import row referenced an unknown student id; created a new record"
                );
            }
            summary.created += 1;
        }

        // Dropping `tx` on an early return above rolls the batch back
        tx.commit().await?;
        Ok(summary)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, migrations};
    use roster_core::{StudentFilter, StudentName};

    // Integration tests - run with DATABASE_URL set against a scratch database
    // cargo test -p roster-server -- --ignored

    async fn store() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url).await.expect("pool creation failed");
        migrations::run(&pool).await.expect("migrations failed");
        PgStore::new(pool)
    }

    fn unique_number(prefix: &str) -> GroupNumber {
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        GroupNumber::new(&format!("{}-{}", prefix, nanos % 1_000_000_000)).unwrap()
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn student_with_missing_group_is_rejected() {
        let store = store().await;
        let draft = StudentDraft {
            name: StudentName::new("Nobody").unwrap(),
            group_id: -42,
            status: true,
        };
        let err = store.create_student(draft).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference { resource: "Group" }));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn duplicate_group_number_conflicts() {
        let store = store().await;
        let number = unique_number("DUP");
        let draft = GroupDraft { group_number: number, course_number: 1 };
        store.create_group(draft.clone()).await.unwrap();
        let err = store.create_group(draft).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn failed_batch_rolls_back() {
        let store = store().await;
        let group = store
            .create_group(GroupDraft { group_number: unique_number("TX"), course_number: 1 })
            .await
            .unwrap();

        let good = StudentUpsert {
            id: None,
            draft: StudentDraft {
                name: StudentName::new("Kept Out").unwrap(),
                group_id: group.id,
                status: true,
            },
        };
        let bad = StudentUpsert {
            id: None,
            draft: StudentDraft {
                name: StudentName::new("Dangling").unwrap(),
                group_id: -1,
                status: true,
            },
        };
        assert!(store.upsert_students(vec![good, bad]).await.is_err());

        let query = StudentFilter { group_id: Some(group.id), ..Default::default() }
            .into_query()
            .unwrap();
        assert_eq!(store.count_students(&query.predicate).await.unwrap(), 0);
    }
}
