//! In-memory store for tests and `--in-memory` runs
//!
//! Mirrors the constraints PostgreSQL enforces in `PgStore`: unique group
//! numbers, student -> group references, and no deleting a referenced group.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use roster_core::{
    Group, GroupDraft, GroupNumber, RecordId, Student, StudentDraft, StudentPredicate,
    StudentQuery, StudentWithGroup,
};

use super::store::{Store, StoreError, StudentUpsert, UpsertSummary};

#[derive(Debug, Clone, Default)]
struct Tables {
    groups: BTreeMap<RecordId, Group>,
    students: BTreeMap<RecordId, Student>,
    next_group_id: RecordId,
    next_student_id: RecordId,
}

impl Tables {
    fn group(&self, id: RecordId) -> Result<&Group, StoreError> {
        self.groups
            .get(&id)
            .ok_or(StoreError::NotFound { resource: "Group", id })
    }

    fn ensure_group_exists(&self, id: RecordId) -> Result<(), StoreError> {
        if self.groups.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::MissingReference { resource: "Group" })
        }
    }

    fn ensure_number_free(&self, number: &GroupNumber, except: Option<RecordId>) -> Result<(), StoreError> {
        let taken = self
            .groups
            .values()
            .any(|g| g.group_number == number.as_str() && Some(g.id) != except);
        if taken {
            return Err(StoreError::Conflict(format!(
                "group '{}' already exists",
                number.as_str()
            )));
        }
        Ok(())
    }

    fn insert_student(&mut self, draft: StudentDraft) -> Result<Student, StoreError> {
        self.ensure_group_exists(draft.group_id)?;
        self.next_student_id += 1;
        let now = Utc::now();
        let student = Student {
            id: self.next_student_id,
            name: draft.name.as_str().to_owned(),
            group_id: draft.group_id,
            status: draft.status,
            created_at: now,
            updated_at: now,
        };
        self.students.insert(student.id, student.clone());
        Ok(student)
    }

    /// Returns `Ok(None)` when no student has this id.
    fn replace_student(&mut self, id: RecordId, draft: StudentDraft) -> Result<Option<Student>, StoreError> {
        if !self.students.contains_key(&id) {
            return Ok(None);
        }
        self.ensure_group_exists(draft.group_id)?;
        let Some(student) = self.students.get_mut(&id) else {
            return Ok(None);
        };
        student.name = draft.name.as_str().to_owned();
        student.group_id = draft.group_id;
        student.status = draft.status;
        student.updated_at = Utc::now();
        Ok(Some(student.clone()))
    }

    /// Students matching the predicate, joined with their group, unsorted.
    fn matching(&self, predicate: &StudentPredicate) -> Vec<(&Student, &Group)> {
        self.students
            .values()
            .filter_map(|s| self.groups.get(&s.group_id).map(|g| (s, g)))
            .filter(|(s, g)| predicate.matches(s, g))
            .collect()
    }
}

/// Store holding everything in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_group(&self, draft: GroupDraft) -> Result<Group, StoreError> {
        let mut tables = self.tables.write().await;
        tables.ensure_number_free(&draft.group_number, None)?;
        tables.next_group_id += 1;
        let group = Group {
            id: tables.next_group_id,
            group_number: draft.group_number.into_string(),
            course_number: draft.course_number,
        };
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn find_group(&self, id: RecordId) -> Result<Group, StoreError> {
        let tables = self.tables.read().await;
        tables.group(id).cloned()
    }

    async fn find_group_by_number(&self, number: &GroupNumber) -> Result<Option<Group>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .groups
            .values()
            .find(|g| g.group_number == number.as_str())
            .cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let tables = self.tables.read().await;
        let mut groups: Vec<Group> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.group_number.cmp(&b.group_number).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn update_group(&self, id: RecordId, draft: GroupDraft) -> Result<Group, StoreError> {
        let mut tables = self.tables.write().await;
        tables.group(id)?;
        tables.ensure_number_free(&draft.group_number, Some(id))?;
        let group = Group {
            id,
            group_number: draft.group_number.into_string(),
            course_number: draft.course_number,
        };
        tables.groups.insert(id, group.clone());
        Ok(group)
    }

    async fn delete_group(&self, id: RecordId) -> Result<Group, StoreError> {
        let mut tables = self.tables.write().await;
        tables.group(id)?;
        if tables.students.values().any(|s| s.group_id == id) {
            return Err(StoreError::Conflict(format!("group {} still has students", id)));
        }
        tables
            .groups
            .remove(&id)
            .ok_or(StoreError::NotFound { resource: "Group", id })
    }

    async fn create_student(&self, draft: StudentDraft) -> Result<Student, StoreError> {
        let mut tables = self.tables.write().await;
        tables.insert_student(draft)
    }

    async fn find_student(&self, id: RecordId) -> Result<Student, StoreError> {
        let tables = self.tables.read().await;
        tables
            .students
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { resource: "Student", id })
    }

    async fn find_students(&self, query: &StudentQuery) -> Result<Vec<StudentWithGroup>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows = tables.matching(&query.predicate);
        rows.sort_by(|(a, _), (b, _)| query.sort.compare(a, b));

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let take = usize::try_from(query.take).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|(s, g)| StudentWithGroup::join(s.clone(), g.clone()))
            .collect())
    }

    async fn count_students(&self, predicate: &StudentPredicate) -> Result<i64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.matching(predicate).len() as i64)
    }

    async fn update_student(&self, id: RecordId, draft: StudentDraft) -> Result<Student, StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .replace_student(id, draft)?
            .ok_or(StoreError::NotFound { resource: "Student", id })
    }

    async fn set_student_status(&self, id: RecordId, status: bool) -> Result<Student, StoreError> {
        let mut tables = self.tables.write().await;
        let student = tables
            .students
            .get_mut(&id)
            .ok_or(StoreError::NotFound { resource: "Student", id })?;
        student.status = status;
        student.updated_at = Utc::now();
        Ok(student.clone())
    }

    async fn delete_student(&self, id: RecordId) -> Result<Student, StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .students
            .remove(&id)
            .ok_or(StoreError::NotFound { resource: "Student", id })
    }

    async fn upsert_students(&self, batch: Vec<StudentUpsert>) -> Result<UpsertSummary, StoreError> {
        let mut tables = self.tables.write().await;
        // Work on a copy; swap it in only if every row applied
        let mut staged = tables.clone();
        let mut summary = UpsertSummary::default();

        for item in batch {
            if let Some(id) = item.id {
                if staged.replace_student(id, item.draft.clone())?.is_some() {
                    summary.updated += 1;
                    continue;
                }
            }

            let created = staged.insert_student(item.draft)?;
            if let Some(requested) = item.id {
                tracing::warn!(
                    requested_id = requested,
                    assigned_id = created.id,
                    "import row referenced an unknown student id; created a new record"
                );
            }
            summary.created += 1;
        }

        *tables = staged;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::{SortDirection, SortKey, SortSpec, StudentFilter, StudentName};

    fn group_draft(number: &str, course: i32) -> GroupDraft {
        GroupDraft {
            group_number: GroupNumber::new(number).unwrap(),
            course_number: course,
        }
    }

    fn student_draft(name: &str, group_id: RecordId, status: bool) -> StudentDraft {
        StudentDraft {
            name: StudentName::new(name).unwrap(),
            group_id,
            status,
        }
    }

    #[tokio::test]
    async fn ids_start_at_one() {
        let store = MemoryStore::new();
        let group = store.create_group(group_draft("a1", 1)).await.unwrap();
        assert_eq!(group.id, 1);
        let student = store.create_student(student_draft("Anna", group.id, true)).await.unwrap();
        assert_eq!(student.id, 1);
        assert_eq!(student.created_at, student.updated_at);
    }

    #[tokio::test]
    async fn duplicate_group_number_conflicts() {
        let store = MemoryStore::new();
        store.create_group(group_draft("a1", 1)).await.unwrap();
        let err = store.create_group(group_draft("A1", 2)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn group_can_keep_its_own_number_on_update() {
        let store = MemoryStore::new();
        let group = store.create_group(group_draft("a1", 1)).await.unwrap();
        let updated = store.update_group(group.id, group_draft("a1", 4)).await.unwrap();
        assert_eq!(updated.course_number, 4);
    }

    #[tokio::test]
    async fn student_requires_existing_group() {
        let store = MemoryStore::new();
        let err = store.create_student(student_draft("Anna", 9, true)).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference { resource: "Group" }));
        assert_eq!(store.count_students(&StudentPredicate::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn referenced_group_cannot_be_deleted() {
        let store = MemoryStore::new();
        let group = store.create_group(group_draft("a1", 1)).await.unwrap();
        let student = store.create_student(student_draft("Anna", group.id, true)).await.unwrap();

        let err = store.delete_group(group.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        store.delete_student(student.id).await.unwrap();
        store.delete_group(group.id).await.unwrap();
        assert!(matches!(
            store.find_group(group.id).await.unwrap_err(),
            StoreError::NotFound { resource: "Group", .. }
        ));
    }

    #[tokio::test]
    async fn status_change_touches_updated_at() {
        let store = MemoryStore::new();
        let group = store.create_group(group_draft("a1", 1)).await.unwrap();
        let student = store.create_student(student_draft("Anna", group.id, true)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;

        let changed = store.set_student_status(student.id, false).await.unwrap();
        assert!(!changed.status);
        assert!(changed.updated_at > student.updated_at);
        assert_eq!(changed.created_at, student.created_at);
    }

    #[tokio::test]
    async fn find_students_sorts_and_pages() {
        let store = MemoryStore::new();
        let group = store.create_group(group_draft("a1", 1)).await.unwrap();
        for name in ["Cleo", "Anna", "Boris", "Anna"] {
            store.create_student(student_draft(name, group.id, true)).await.unwrap();
        }

        let query = StudentFilter {
            skip: 1,
            take: 2,
            order: Some(SortSpec { by: SortKey::Name, direction: SortDirection::Asc }),
            ..Default::default()
        }
        .into_query()
        .unwrap();

        let page = store.find_students(&query).await.unwrap();
        let got: Vec<_> = page.iter().map(|s| (s.id, s.name.as_str())).collect();
        assert_eq!(got, vec![(4, "Anna"), (3, "Boris")]);
        assert_eq!(page[0].group.group_number, "A1");
    }

    #[tokio::test]
    async fn upsert_updates_known_ids_and_creates_the_rest() {
        let store = MemoryStore::new();
        let group = store.create_group(group_draft("a1", 1)).await.unwrap();
        let existing = store.create_student(student_draft("Anna", group.id, true)).await.unwrap();

        let summary = store
            .upsert_students(vec![
                StudentUpsert { id: Some(existing.id), draft: student_draft("Anna K", group.id, false) },
                StudentUpsert { id: None, draft: student_draft("Boris", group.id, true) },
                StudentUpsert { id: Some(77), draft: student_draft("Cleo", group.id, true) },
            ])
            .await
            .unwrap();

        assert_eq!(summary, UpsertSummary { created: 2, updated: 1 });
        let anna = store.find_student(existing.id).await.unwrap();
        assert_eq!(anna.name, "Anna K");
        assert!(!anna.status);
        // unknown id 77 is not reused
        assert!(store.find_student(77).await.is_err());
    }

    #[tokio::test]
    async fn failed_upsert_leaves_store_untouched() {
        let store = MemoryStore::new();
        let group = store.create_group(group_draft("a1", 1)).await.unwrap();

        let err = store
            .upsert_students(vec![
                StudentUpsert { id: None, draft: student_draft("Anna", group.id, true) },
                StudentUpsert { id: None, draft: student_draft("Ghost", 99, true) },
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingReference { .. }));
        assert_eq!(store.count_students(&StudentPredicate::default()).await.unwrap(), 0);

        // the rolled-back insert did not consume an id
        let next = store.create_student(student_draft("Boris", group.id, true)).await.unwrap();
        assert_eq!(next.id, 1);
    }
}
