//! roster-core: domain types and pure logic for the roster service
//!
//! - `model`: Group / Student records, validated drafts, the joined `StudentWithGroup`
//! - `filter`: translation of a flat `StudentFilter` request into a `StudentQuery`
//! - `spreadsheet`: xlsx export (one sheet per group) and import parsing
//!
//! Nothing in here touches the database or the network.

pub mod filter;
pub mod model;
pub mod spreadsheet;
pub mod validation;

pub use filter::{Sort, SortDirection, SortKey, SortSpec, StudentFilter, StudentPredicate, StudentQuery};
pub use model::{
    Group, GroupDraft, GroupNumber, GroupPayload, RecordId, StatusChange, Student, StudentDraft,
    StudentList, StudentName, StudentPayload, StudentWithGroup,
};
pub use spreadsheet::{ImportRow, ImportWorkbook, SpreadsheetError};
pub use validation::ValidationError;
