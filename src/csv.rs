//! CSV serialisation of a [`ParseReport`].
//!
//! Layout: six identity columns, five columns per subject slot
//! (`<name>_CR`, `_GR`, `_GP`, `_CxG`, `_Marks`), then four summary columns.
//! Missing values are empty cells; a real zero is `0`.
//!
//! Seat numbers and PRNs are long digit strings that spreadsheets would
//! otherwise turn into floats or scientific notation. They are written as
//! `="…"` formula literals; the CSV writer then quotes them like any other
//! cell containing `"`.

use crate::error::MarksheetError;
use crate::output::{ParseReport, StudentRecord, SubjectTuple};
use crate::semester::SubjectSlot;
use std::io;

const IDENTITY_COLUMNS: [&str; 6] = ["Seat No", "Name", "Gender", "Mother Name", "PRN", "Result"];
const SUBJECT_SUFFIXES: [&str; 5] = ["CR", "GR", "GP", "CxG", "Marks"];
const SUMMARY_COLUMNS: [&str; 4] = ["Total_CR", "Total_CxG", "SGPI", "Final_Grade"];

/// Column names for a subject list.
pub fn header(subjects: &[SubjectSlot]) -> Vec<String> {
    IDENTITY_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(subjects.iter().flat_map(|s| {
            SUBJECT_SUFFIXES
                .iter()
                .map(move |suffix| format!("{}_{}", s.name, suffix))
        }))
        .chain(SUMMARY_COLUMNS.iter().map(|c| c.to_string()))
        .collect()
}

/// Unescaped cell values for one record, padded to `slot_count` subjects.
pub fn record_cells(record: &StudentRecord, slot_count: usize) -> Vec<String> {
    let mut cells = vec![
        formula_escape(&record.seat_no),
        record.name.clone(),
        record.gender.to_string(),
        record.mother_name.clone().unwrap_or_default(),
        record.prn.as_deref().map(formula_escape).unwrap_or_default(),
        record.result.clone(),
    ];

    let empty = SubjectTuple::default();
    for i in 0..slot_count {
        let t = record.subjects.get(i).unwrap_or(&empty);
        cells.push(number(t.credits));
        cells.push(t.grade.map(String::from).unwrap_or_default());
        cells.push(number(t.grade_points));
        cells.push(number(t.credit_points));
        cells.push(t.marks.map(|m| m.to_string()).unwrap_or_default());
    }

    cells.push(record.total_credits.to_string());
    cells.push(record.total_credit_points.to_string());
    cells.push(number(record.sgpi));
    cells.push(record.final_grade.clone().unwrap_or_default());
    cells
}

/// Write the header and one row per record to `writer`.
pub fn write_csv<W: io::Write>(report: &ParseReport, writer: W) -> Result<(), MarksheetError> {
    let slot_count = report.subjects.len();
    let mut wtr = ::csv::Writer::from_writer(writer);
    wtr.write_record(header(&report.subjects))?;
    for record in &report.records {
        wtr.write_record(record_cells(record, slot_count))?;
    }
    wtr.flush().map_err(::csv::Error::from)?;
    Ok(())
}

/// Render the whole report as CSV text (header plus one row per record).
pub fn to_csv(report: &ParseReport) -> Result<String, MarksheetError> {
    let mut buf = Vec::new();
    write_csv(report, &mut buf)?;
    String::from_utf8(buf)
        .map_err(|e| MarksheetError::Internal(format!("CSV output is not UTF-8: {e}")))
}

/// Wrap a digit string as a spreadsheet text formula: `="value"`.
pub fn formula_escape(value: &str) -> String {
    format!("=\"{value}\"")
}

/// Reverse [`formula_escape`]; other values pass through unchanged.
pub fn unescape_formula(cell: &str) -> &str {
    cell.strip_prefix("=\"")
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(cell)
}

fn number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{Gender, ParseStats};
    use crate::semester::{Layout, Semester};

    fn record() -> StudentRecord {
        StudentRecord {
            seat_no: "1234567".into(),
            name: "DOE, JANE".into(),
            gender: Gender::Female,
            mother_name: None,
            prn: Some("2021016400123".into()),
            result: "P".into(),
            subjects: vec![SubjectTuple {
                credits: Some(3.0),
                grade: Some('A'),
                grade_points: Some(9.0),
                credit_points: Some(27.0),
                marks: Some(0),
            }],
            total_credits: 3.0,
            total_credit_points: 27.0,
            sgpi: Some(7.6),
            cgpi: None,
            final_grade: None,
            remark: None,
        }
    }

    fn report() -> ParseReport {
        ParseReport {
            semester: Semester::I,
            layout: Layout::PipeColumn,
            subjects: vec![SubjectSlot::new("FEC101", "Maths"), SubjectSlot::new("FEC102", "Physics")],
            records: vec![record()],
            skipped: vec![],
            stats: ParseStats::default(),
        }
    }

    #[test]
    fn header_layout() {
        let h = header(&report().subjects);
        assert_eq!(h.len(), 6 + 2 * 5 + 4);
        assert_eq!(h[0], "Seat No");
        assert_eq!(h[6], "Maths_CR");
        assert_eq!(h[10], "Maths_Marks");
        assert_eq!(h[11], "Physics_CR");
        assert_eq!(h[h.len() - 1], "Final_Grade");
    }

    #[test]
    fn rows_padded_to_header_length() {
        let r = report();
        let cells = record_cells(&r.records[0], r.subjects.len());
        assert_eq!(cells.len(), header(&r.subjects).len());
        // Physics slot is missing: five empty cells.
        assert!(cells[11..16].iter().all(String::is_empty));
    }

    #[test]
    fn zero_and_missing_are_distinct() {
        let cells = record_cells(&record(), 1);
        assert_eq!(cells[10], "0");
        assert_eq!(cells[3], "");
        assert_eq!(cells[13], "7.6");
    }

    #[test]
    fn prn_survives_formula_round_trip() {
        let cells = record_cells(&record(), 1);
        assert_eq!(cells[4], "=\"2021016400123\"");
        assert_eq!(unescape_formula(&cells[4]), "2021016400123");
        assert_eq!(unescape_formula("plain"), "plain");
    }

    #[test]
    fn cells_with_commas_and_quotes_are_quoted() {
        let mut r = report();
        r.records[0].name = "O\"BRIEN, KIRAN".into();
        r.records[0].mother_name = Some("two\nlines".into());
        let csv = to_csv(&r).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains(",\"O\"\"BRIEN, KIRAN\",Female,\"two"), "row: {row}");
    }

    #[test]
    fn writes_into_any_io_sink() {
        let mut sink = Vec::new();
        write_csv(&report(), &mut sink).unwrap();
        assert_eq!(String::from_utf8(sink).unwrap(), to_csv(&report()).unwrap());
    }

    #[test]
    fn csv_document() {
        let csv = to_csv(&report()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Seat No,Name,Gender,Mother Name,PRN,Result,Maths_CR"));
        assert!(lines[1].starts_with("\"=\"\"1234567\"\"\",\"DOE, JANE\",Female,,"));
        assert!(lines[1].ends_with(",3,27,7.6,"));
    }
}
