//! Store trait and its error type

use async_trait::async_trait;
use roster_core::{
    Group, GroupDraft, GroupNumber, RecordId, Student, StudentDraft, StudentPredicate,
    StudentQuery, StudentWithGroup,
};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: RecordId },

    /// A write referenced a row that doesn't exist (e.g. student -> group)
    #[error("{resource} not found")]
    MissingReference { resource: &'static str },

    #[error("conflict: {0}")]
    Conflict(String),
}

/// One row of an import batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentUpsert {
    /// Existing record to update. `None`, or an id with no record, creates
    /// a new student with a store-assigned id.
    pub id: Option<RecordId>,
    pub draft: StudentDraft,
}

/// Outcome of an import batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub created: usize,
    pub updated: usize,
}

/// Storage for groups and students (testable)
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_group(&self, draft: GroupDraft) -> Result<Group, StoreError>;

    async fn find_group(&self, id: RecordId) -> Result<Group, StoreError>;

    /// Exact match on the stored (upper-case) group number.
    async fn find_group_by_number(&self, number: &GroupNumber) -> Result<Option<Group>, StoreError>;

    /// All groups, ascending by group number.
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

    async fn update_group(&self, id: RecordId, draft: GroupDraft) -> Result<Group, StoreError>;

    /// Fails with `Conflict` while students still reference the group.
    async fn delete_group(&self, id: RecordId) -> Result<Group, StoreError>;

    /// Fails with `MissingReference` if the group doesn't exist.
    async fn create_student(&self, draft: StudentDraft) -> Result<Student, StoreError>;

    async fn find_student(&self, id: RecordId) -> Result<Student, StoreError>;

    /// One page of students joined with their group.
    async fn find_students(&self, query: &StudentQuery) -> Result<Vec<StudentWithGroup>, StoreError>;

    async fn count_students(&self, predicate: &StudentPredicate) -> Result<i64, StoreError>;

    async fn update_student(&self, id: RecordId, draft: StudentDraft) -> Result<Student, StoreError>;

    async fn set_student_status(&self, id: RecordId, status: bool) -> Result<Student, StoreError>;

    async fn delete_student(&self, id: RecordId) -> Result<Student, StoreError>;

    /// Apply every upsert or none of them.
    async fn upsert_students(&self, batch: Vec<StudentUpsert>) -> Result<UpsertSummary, StoreError>;

    /// Cheap liveness check of the backing storage.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Release underlying resources. Called once after the server stops.
    async fn close(&self) {}
}
