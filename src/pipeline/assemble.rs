//! Record assembly: validate a [`RawRecord`] and normalise it.
//!
//! This is the only place a block can be rejected after extraction. The
//! retention rule is strict: a record without a seat number, a name or a
//! result is skipped, however much subject data it carried.

use crate::error::SkipReason;
use crate::grammar::RawRecord;
use crate::output::{Gender, StudentRecord, SubjectTuple};

/// Turn raw fields into a record with exactly `slot_count` subject tuples.
pub fn assemble(raw: RawRecord, slot_count: usize) -> Result<StudentRecord, SkipReason> {
    let seat_no = required(&raw.seat_no, "seat_no")?;
    let (gender, name) = split_gender(&raw.raw_name);
    let name = required(&name, "name")?;
    let result = required(&raw.result, "result")?;

    let mut subjects = raw.subjects;
    subjects.resize(slot_count, SubjectTuple::default());

    let total_credits: f64 = subjects.iter().filter_map(|t| t.credits).sum();
    let total_credit_points: f64 = subjects.iter().filter_map(|t| t.credit_points).sum();

    Ok(StudentRecord {
        seat_no,
        name,
        gender,
        mother_name: optional(raw.mother_name),
        prn: optional(raw.prn),
        result,
        subjects,
        total_credits,
        total_credit_points,
        sgpi: raw.sgpi,
        cgpi: raw.cgpi,
        final_grade: optional(raw.final_grade),
        remark: optional(raw.remark),
    })
}

/// Read the `/` gender marker and return the name without it.
pub fn split_gender(raw_name: &str) -> (Gender, String) {
    let trimmed = raw_name.trim();
    match trimmed.strip_prefix('/') {
        Some(rest) => (Gender::Female, collapse(rest)),
        None => (Gender::Male, collapse(trimmed)),
    }
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn required(value: &str, field: &'static str) -> Result<String, SkipReason> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SkipReason::MissingField {
            field: field.to_string(),
        });
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
