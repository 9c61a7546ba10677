//! Group and student records
//!
//! Request bodies (`*Payload`) carry raw client input. They are validated into
//! drafts (`*Draft`) before anything reaches the store. Persisted records
//! (`Group`, `Student`) and the joined `StudentWithGroup` are what handlers
//! return.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Surrogate key used by both tables
pub type RecordId = i32;

/// Maximum length for group numbers. Group numbers double as worksheet
/// names on export, and xlsx caps sheet names at 31 characters.
pub const MAX_GROUP_NUMBER_LEN: usize = 31;

/// Characters that xlsx rejects in sheet names
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Maximum length for student names
pub const MAX_STUDENT_NAME_LEN: usize = 256;

/// Validated, upper-cased group number
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupNumber(String);

impl GroupNumber {
    /// Create a group number, trimming and upper-casing the input.
    ///
    /// # Example
    /// ```
    /// use roster_core::model::GroupNumber;
    ///
    /// assert_eq!(GroupNumber::new(" ab-12 ").unwrap().as_str(), "AB-12");
    /// assert!(GroupNumber::new("a/b").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "groupNumber" });
        }

        // Upper-casing can grow the string (ß -> SS), so measure afterwards
        let upper = trimmed.to_uppercase();
        if upper.chars().count() > MAX_GROUP_NUMBER_LEN {
            return Err(ValidationError::TooLong {
                field: "groupNumber",
                max: MAX_GROUP_NUMBER_LEN,
            });
        }

        if upper.contains(FORBIDDEN_SHEET_CHARS) {
            return Err(ValidationError::InvalidFormat {
                field: "groupNumber",
                reason: "must not contain any of [ ] : * ? / \\",
            });
        }

        if upper.starts_with('\'') || upper.ends_with('\'') {
            return Err(ValidationError::InvalidFormat {
                field: "groupNumber",
                reason: "must not start or end with an apostrophe",
            });
        }

        Ok(Self(upper))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for GroupNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validated student name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentName(String);

impl StudentName {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }

        if trimmed.chars().count() > MAX_STUDENT_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "name",
                max: MAX_STUDENT_NAME_LEN,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StudentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Group record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: RecordId,
    pub group_number: String,
    pub course_number: i32,
}

/// Create/update group request body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPayload {
    pub group_number: String,
    pub course_number: i32,
}

/// Validated group fields, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDraft {
    pub group_number: GroupNumber,
    pub course_number: i32,
}

impl TryFrom<GroupPayload> for GroupDraft {
    type Error = ValidationError;

    fn try_from(payload: GroupPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            group_number: GroupNumber::new(&payload.group_number)?,
            course_number: payload.course_number,
        })
    }
}

/// Student record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: RecordId,
    pub name: String,
    pub group_id: RecordId,
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update student request body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPayload {
    pub name: String,
    pub group_id: RecordId,
    pub status: bool,
}

/// Validated student fields, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentDraft {
    pub name: StudentName,
    pub group_id: RecordId,
    pub status: bool,
}

impl TryFrom<StudentPayload> for StudentDraft {
    type Error = ValidationError;

    fn try_from(payload: StudentPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            name: StudentName::new(&payload.name)?,
            group_id: payload.group_id,
            status: payload.status,
        })
    }
}

/// `PATCH /students/changeStatus` body
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub student_id: RecordId,
    pub status: bool,
}

/// Student joined with its group. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentWithGroup {
    pub id: RecordId,
    pub name: String,
    pub group_id: RecordId,
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub group: Group,
}

impl StudentWithGroup {
    /// Combine a student with the group it references.
    pub fn join(student: Student, group: Group) -> Self {
        debug_assert_eq!(student.group_id, group.id, "student joined with foreign group");
        Self {
            id: student.id,
            name: student.name,
            group_id: student.group_id,
            status: student.status,
            created_at: student.created_at,
            updated_at: student.updated_at,
            group,
        }
    }
}

/// `POST /students/filter` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentList {
    pub students: Vec<StudentWithGroup>,
    /// Total matching the predicate, ignoring skip/take
    pub count: i64,
    pub skip: i64,
    pub take: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn group_number_is_upper_cased() {
        let number = GroupNumber::new("ip-21").unwrap();
        assert_eq!(number.as_str(), "IP-21");
    }

    #[test]
    fn group_number_rejects_sheet_name_chars() {
        for bad in ["a:b", "a[b", "a]b", "a*b", "a?b", "a/b", "a\\b"] {
            let err = GroupNumber::new(bad).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidFormat { .. }), "{bad}");
        }
    }

    #[test]
    fn group_number_max_length() {
        assert!(GroupNumber::new(&"a".repeat(31)).is_ok());
        let err = GroupNumber::new(&"a".repeat(32)).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 31, .. }));
    }

    #[test]
    fn group_number_rejects_edge_apostrophes() {
        for bad in ["'a1", "a1'", " 'a1' "] {
            let err = GroupNumber::new(bad).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidFormat { .. }), "{bad}");
        }
        assert_eq!(GroupNumber::new("a'1").unwrap().as_str(), "A'1");
    }

    #[test]
    fn group_number_length_counts_upper_cased_form() {
        let err = GroupNumber::new(&"ß".repeat(31)).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 31, .. }));

        let number = GroupNumber::new(&"ß".repeat(15)).unwrap();
        assert_eq!(number.as_str(), "SS".repeat(15));
    }

    #[test]
    fn blank_values_rejected() {
        assert!(matches!(
            GroupNumber::new("   ").unwrap_err(),
            ValidationError::Empty { .. }
        ));
        assert!(matches!(
            StudentName::new("").unwrap_err(),
            ValidationError::Empty { field: "name" }
        ));
    }

    #[test]
    fn payloads_use_camel_case() {
        let payload: GroupPayload =
            serde_json::from_value(json!({"groupNumber": "x1", "courseNumber": 2})).unwrap();
        let draft = GroupDraft::try_from(payload).unwrap();
        assert_eq!(draft.group_number.as_str(), "X1");
        assert_eq!(draft.course_number, 2);

        let change: StatusChange =
            serde_json::from_value(json!({"studentId": 7, "status": false})).unwrap();
        assert_eq!(change.student_id, 7);
        assert!(!change.status);
    }

    #[test]
    fn join_nests_group() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        let student = Student {
            id: 4,
            name: "Anna".into(),
            group_id: 2,
            status: true,
            created_at: at,
            updated_at: at,
        };
        let group = Group {
            id: 2,
            group_number: "IP-21".into(),
            course_number: 3,
        };

        let joined = StudentWithGroup::join(student, group.clone());
        assert_eq!(joined.id, 4);
        assert_eq!(joined.group, group);

        let value = serde_json::to_value(&joined).unwrap();
        assert_eq!(value["groupId"], 2);
        assert_eq!(value["group"]["groupNumber"], "IP-21");
        assert!(value.get("createdAt").is_some());
    }
}
