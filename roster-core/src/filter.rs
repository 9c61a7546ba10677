//! Student filter translation
//!
//! `StudentFilter` is the flat body of `POST /students/filter` and
//! `POST /students/export`. `StudentFilter::into_query` turns it into a
//! `StudentQuery`: a predicate with one optional field per filterable
//! attribute, a single sort key and an offset/limit window. Unset fields are
//! left out of the predicate entirely.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::{Group, RecordId, Student};
use crate::validation::ValidationError;

/// Page size when the request doesn't name one
pub const DEFAULT_TAKE: i64 = 20;

/// Sortable student columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Id,
    Name,
    Status,
    GroupId,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Client-facing sort spec: `{"by": "name", "direction": "desc"}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub by: SortKey,
    pub direction: SortDirection,
}

/// Filter request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentFilter {
    pub skip: i64,
    pub take: i64,
    /// Case-sensitive substring of the student name
    pub name: Option<String>,
    pub group_id: Option<RecordId>,
    /// Matched against the student's group
    pub course_number: Option<i32>,
    pub status: Option<bool>,
    pub order: Option<SortSpec>,
}

impl Default for StudentFilter {
    fn default() -> Self {
        Self {
            skip: 0,
            take: DEFAULT_TAKE,
            name: None,
            group_id: None,
            course_number: None,
            status: None,
            order: None,
        }
    }
}

impl StudentFilter {
    /// Translate into a store query, validating the window.
    pub fn into_query(self) -> Result<StudentQuery, ValidationError> {
        if self.skip < 0 {
            return Err(ValidationError::TooSmall { field: "skip", min: 0 });
        }
        if self.take < 1 {
            return Err(ValidationError::TooSmall { field: "take", min: 1 });
        }

        let sort = self.order.map(Sort::from).unwrap_or_default();

        Ok(StudentQuery {
            predicate: StudentPredicate {
                name_contains: self.name,
                group_id: self.group_id,
                course_number: self.course_number,
                status: self.status,
            },
            sort,
            skip: self.skip,
            take: self.take,
        })
    }
}

/// Equality/contains predicate over students and their group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentPredicate {
    pub name_contains: Option<String>,
    pub group_id: Option<RecordId>,
    pub course_number: Option<i32>,
    pub status: Option<bool>,
}

impl StudentPredicate {
    /// Evaluate against a student and the group it belongs to.
    pub fn matches(&self, student: &Student, group: &Group) -> bool {
        if let Some(needle) = &self.name_contains {
            if !student.name.contains(needle.as_str()) {
                return false;
            }
        }
        if self.group_id.is_some_and(|id| id != student.group_id) {
            return false;
        }
        if self.course_number.is_some_and(|n| n != group.course_number) {
            return false;
        }
        if self.status.is_some_and(|s| s != student.status) {
            return false;
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Resolved sort order. Ties are always broken by ascending id so that
/// offset/limit pages never overlap or skip rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sort {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl From<SortSpec> for Sort {
    fn from(spec: SortSpec) -> Self {
        Self {
            key: spec.by,
            direction: spec.direction,
        }
    }
}

impl Sort {
    /// Total order over students consistent with the SQL `ORDER BY`.
    pub fn compare(&self, a: &Student, b: &Student) -> Ordering {
        let primary = match self.key {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Status => a.status.cmp(&b.status),
            SortKey::GroupId => a.group_id.cmp(&b.group_id),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// Fully translated listing query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentQuery {
    pub predicate: StudentPredicate,
    pub sort: Sort,
    pub skip: i64,
    pub take: i64,
}
