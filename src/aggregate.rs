//! Reductions over gate-filtered ledger rows. Everything here is pure:
//! callers fetch the visible records first, then aggregate. Totals are always
//! computed from the rows handed in, never read from a stored counter.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::models::DemeritRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityBand {
    Good,
    Medium,
    High,
    VeryHigh,
}

impl SeverityBand {
    /// Total and deterministic over all non-negative totals: <3 good,
    /// [3,6) medium, [6,12) high, >=12 very high.
    pub fn from_points(total_points: i64) -> SeverityBand {
        if total_points >= 12 {
            SeverityBand::VeryHigh
        } else if total_points >= 6 {
            SeverityBand::High
        } else if total_points >= 3 {
            SeverityBand::Medium
        } else {
            SeverityBand::Good
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SeverityBand::Good => "good",
            SeverityBand::Medium => "medium",
            SeverityBand::High => "high",
            SeverityBand::VeryHigh => "very_high",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentSummary {
    pub student_id: i64,
    pub student_name: String,
    pub grade_level: Option<i64>,
    pub class_section: Option<String>,
    pub total_points: i64,
    pub record_count: usize,
    pub most_recent_category: Option<String>,
    pub band: SeverityBand,
}

impl StudentSummary {
    /// Zero-record summary for a student the caller knows about but the
    /// ledger slice doesn't mention.
    pub fn empty(
        student_id: i64,
        student_name: String,
        grade_level: Option<i64>,
        class_section: Option<String>,
    ) -> StudentSummary {
        StudentSummary {
            student_id,
            student_name,
            grade_level,
            class_section,
            total_points: 0,
            record_count: 0,
            most_recent_category: None,
            band: SeverityBand::Good,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category_name: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeCount {
    pub grade_level: i64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub count: i64,
}

struct SummaryAcc {
    student_name: String,
    grade_level: Option<i64>,
    class_section: Option<String>,
    total_points: i64,
    record_count: usize,
    // (date_issued, id) of the newest record seen so far, with its category.
    most_recent: (chrono::DateTime<chrono::Utc>, i64, String),
}

/// Per-student totals over the given records, highest total first. Students
/// absent from the slice get no entry. "Most recent" ties on date_issued are
/// broken by the higher record id.
pub fn summarize_by_student(records: &[DemeritRecord]) -> Vec<StudentSummary> {
    let mut by_student: HashMap<i64, SummaryAcc> = HashMap::new();

    for record in records {
        let key = (record.date_issued, record.id);
        by_student
            .entry(record.student_id)
            .and_modify(|acc| {
                acc.total_points += record.points;
                acc.record_count += 1;
                if key > (acc.most_recent.0, acc.most_recent.1) {
                    acc.most_recent = (record.date_issued, record.id, record.category_name.clone());
                }
            })
            .or_insert_with(|| SummaryAcc {
                student_name: record.student_name.clone(),
                grade_level: record.grade_level,
                class_section: record.class_section.clone(),
                total_points: record.points,
                record_count: 1,
                most_recent: (record.date_issued, record.id, record.category_name.clone()),
            });
    }

    let mut summaries: Vec<StudentSummary> = by_student
        .into_iter()
        .map(|(student_id, acc)| StudentSummary {
            student_id,
            student_name: acc.student_name,
            grade_level: acc.grade_level,
            class_section: acc.class_section,
            total_points: acc.total_points,
            record_count: acc.record_count,
            most_recent_category: Some(acc.most_recent.2),
            band: SeverityBand::from_points(acc.total_points),
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then(a.student_id.cmp(&b.student_id))
    });

    summaries
}

/// Record counts per category name, largest first.
pub fn distribution_by_category(records: &[DemeritRecord]) -> Vec<CategoryCount> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for record in records {
        *counts.entry(record.category_name.as_str()).or_default() += 1;
    }

    let mut distribution: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category_name, count)| CategoryCount {
            category_name: category_name.to_string(),
            count,
        })
        .collect();

    distribution.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(a.category_name.cmp(&b.category_name))
    });

    distribution
}

/// Record counts per grade level, ascending. Records for students without a
/// grade level are excluded, not zero-bucketed.
pub fn distribution_by_grade(records: &[DemeritRecord]) -> Vec<GradeCount> {
    let mut counts: BTreeMap<i64, i64> = BTreeMap::new();
    for record in records {
        if let Some(grade_level) = record.grade_level {
            *counts.entry(grade_level).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .map(|(grade_level, count)| GradeCount { grade_level, count })
        .collect()
}

/// Daily record counts, ascending by date. One entry per distinct day present
/// in the input; days without records are not synthesized.
pub fn trend_over_time(records: &[DemeritRecord]) -> Vec<TrendPoint> {
    let mut counts: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for record in records {
        *counts.entry(record.date_issued.date_naive()).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(date, count)| TrendPoint { date, count })
        .collect()
}
