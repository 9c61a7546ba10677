use rust_xlsxwriter::{Format, Workbook};

use super::{SpreadsheetError, HEADER, TIMESTAMP_FORMAT};
use crate::model::StudentWithGroup;

/// Group students by `group.group_number`, keeping first-seen order of groups
/// and the incoming order of students within each group.
pub fn partition_by_group(students: &[StudentWithGroup]) -> Vec<(&str, Vec<&StudentWithGroup>)> {
    let mut partitions: Vec<(&str, Vec<&StudentWithGroup>)> = Vec::new();
    for student in students {
        let number = student.group.group_number.as_str();
        match partitions.iter_mut().find(|(name, _)| *name == number) {
            Some((_, rows)) => rows.push(student),
            None => partitions.push((number, vec![student])),
        }
    }
    partitions
}

/// Serialize students into an xlsx workbook, one sheet per group.
///
/// The list is expected to be filtered and paginated already; an empty list
/// is an error rather than an empty workbook.
pub fn export_workbook(students: &[StudentWithGroup]) -> Result<Vec<u8>, SpreadsheetError> {
    if students.is_empty() {
        return Err(SpreadsheetError::EmptyResult);
    }

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    for (group_number, rows) in partition_by_group(students) {
        let sheet = workbook.add_worksheet();
        sheet.set_name(group_number)?;

        for (col, title) in HEADER.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *title, &bold)?;
        }
        sheet.set_column_width(1, 28.0)?;
        sheet.set_column_width(3, 20.0)?;
        sheet.set_column_width(4, 20.0)?;

        for (i, student) in rows.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_number(row, 0, f64::from(student.id))?;
            sheet.write_string(row, 1, &student.name)?;
            sheet.write_boolean(row, 2, student.status)?;
            sheet.write_string(row, 3, student.created_at.format(TIMESTAMP_FORMAT).to_string())?;
            sheet.write_string(row, 4, student.updated_at.format(TIMESTAMP_FORMAT).to_string())?;
        }

        tracing::debug!(group = group_number, rows = rows.len(), "wrote export sheet");
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Group, GroupNumber};
    use crate::spreadsheet::ImportWorkbook;
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use chrono::{TimeZone, Utc};
    use std::io::Cursor;

    fn joined(id: i32, name: &str, group_id: i32, number: &str) -> StudentWithGroup {
        let at = Utc.with_ymd_and_hms(2024, 9, 1, 14, 5, 9).unwrap();
        StudentWithGroup {
            id,
            name: name.into(),
            group_id,
            status: id % 2 == 1,
            created_at: at,
            updated_at: at,
            group: Group {
                id: group_id,
                group_number: number.into(),
                course_number: 1,
            },
        }
    }

    #[test]
    fn empty_list_is_rejected() {
        assert!(matches!(export_workbook(&[]), Err(SpreadsheetError::EmptyResult)));
    }

    #[test]
    fn partitions_keep_first_seen_order() {
        let students = vec![
            joined(1, "a", 2, "B-2"),
            joined(2, "b", 1, "A-1"),
            joined(3, "c", 2, "B-2"),
        ];
        let parts = partition_by_group(&students);
        let names: Vec<_> = parts.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["B-2", "A-1"]);
        let ids: Vec<_> = parts[0].1.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn one_sheet_per_group_with_header() {
        let students = vec![
            joined(1, "Anna", 2, "IP-21"),
            joined(2, "Boris", 1, "IP-11"),
            joined(3, "Clara", 2, "IP-21"),
        ];
        let bytes = export_workbook(&students).unwrap();

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["IP-21".to_string(), "IP-11".to_string()]);

        let range = workbook.worksheet_range("IP-21").unwrap();
        assert_eq!(range.height(), 3);
        let header: Vec<String> = range.rows().next().unwrap().iter().map(|c| c.to_string()).collect();
        assert_eq!(header, HEADER.to_vec());

        let first = range.rows().nth(1).unwrap();
        assert_eq!(first[0], Data::Float(1.0));
        assert_eq!(first[1], Data::String("Anna".into()));
        assert_eq!(first[2], Data::Bool(true));
        assert_eq!(first[3], Data::String("2024-09-01 14:05:09".into()));
    }

    #[test]
    fn exported_rows_read_back() {
        let students = vec![joined(7, "Dmitri", 4, "KN-3"), joined(8, "Eva", 4, "KN-3")];
        let bytes = export_workbook(&students).unwrap();

        let mut workbook = ImportWorkbook::open(bytes).unwrap();
        let rows = workbook.rows("KN-3").unwrap();
        let parsed: Vec<_> = rows.iter().map(|r| (r.id, r.name.as_str(), r.status)).collect();
        assert_eq!(parsed, vec![(Some(7), "Dmitri", true), (Some(8), "Eva", false)]);
    }

    #[test]
    fn validated_group_numbers_are_valid_sheet_names() {
        let numbers = vec![
            "a'1".to_string(),
            "ß".repeat(15),
            "ä".repeat(31),
            "x-1 (b)".to_string(),
        ];
        let students: Vec<_> = numbers
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let number = GroupNumber::new(raw).unwrap();
                joined(i as i32 + 1, "Student", i as i32 + 1, number.as_str())
            })
            .collect();

        let bytes = export_workbook(&students).unwrap();
        let workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names().len(), numbers.len());
    }
}
