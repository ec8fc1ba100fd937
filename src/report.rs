use std::collections::HashMap;

use serde::Serialize;

use crate::calc::{AttendanceStat, FilterCriteria, MarkMetric, StudentAggregate};
use crate::mail::{EmailMessage, MailTransport};

pub const SKIP_NOT_IN_CRITERIA: &str = "not in criteria";
pub const SKIP_NO_EMAIL: &str = "no email address";

pub const SUBJECT_ATTENDANCE_REPORT: &str = "Attendance Report";
pub const SUBJECT_MARKS_REPORT: &str = "Academic Performance Report";

/// One student's fate in a bulk send. Criteria membership is checked
/// before the email address, so a student who fails both is reported as
/// "not in criteria".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DispatchStatus {
    Success { value: f64 },
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportOutcome {
    pub student: String,
    #[serde(flatten)]
    pub status: DispatchStatus,
}

#[derive(Debug, Clone)]
pub struct ReportStudent {
    pub roll_no: String,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub results: Vec<ReportOutcome>,
    pub total_selected: usize,
    pub emails_sent: usize,
    pub total_students: usize,
}

/// A filtered per-student statistic that can be turned into a report
/// email body.
pub trait StudentReport {
    fn roll_number(&self) -> &str;
    fn reported_value(&self) -> f64;
    fn render_text(&self, student: &ReportStudent, custom_message: Option<&str>) -> String;
}

pub fn html_wrap(text: &str) -> String {
    format!("<div>{}</div>", text.replace('\n', "<br>"))
}

fn finish_letter(mut lines: Vec<String>, custom_message: Option<&str>) -> String {
    if let Some(custom) = custom_message {
        lines.push(String::new());
        lines.push(format!("Note: {}", custom));
    }
    lines.push(String::new());
    lines.push("Best regards,".to_string());
    lines.push("College Administration".to_string());
    lines.join("\n")
}

#[derive(Debug, Clone)]
pub struct AttendanceReportRow {
    pub stat: AttendanceStat,
    pub filter_note: Option<String>,
}

impl StudentReport for AttendanceReportRow {
    fn roll_number(&self) -> &str {
        &self.stat.roll_number
    }

    fn reported_value(&self) -> f64 {
        self.stat.attendance_percentage
    }

    fn render_text(&self, student: &ReportStudent, custom_message: Option<&str>) -> String {
        let mut lines = vec![
            format!("Dear {},", student.name),
            String::new(),
            "Here is your current attendance report:".to_string(),
            format!("Total Classes: {}", self.stat.total_semester_classes),
            format!("Classes Attended: {}", self.stat.attended_classes),
            format!(
                "Attendance Percentage: {}%",
                self.stat.attendance_percentage
            ),
        ];
        if let Some(note) = &self.filter_note {
            lines.push(note.clone());
        }
        finish_letter(lines, custom_message)
    }
}

#[derive(Debug, Clone)]
pub struct MarksReportRow {
    pub aggregate: StudentAggregate,
    pub metric: MarkMetric,
    pub filter_note: Option<String>,
}

impl StudentReport for MarksReportRow {
    fn roll_number(&self) -> &str {
        &self.aggregate.roll_number
    }

    fn reported_value(&self) -> f64 {
        self.metric
            .of(&self.aggregate.exam_marks, self.aggregate.total_marks)
    }

    fn render_text(&self, student: &ReportStudent, custom_message: Option<&str>) -> String {
        let mut lines = vec![
            format!("Dear {},", student.name),
            String::new(),
            "Here is your marks report:".to_string(),
        ];
        match self.metric {
            MarkMetric::Exam(exam) => {
                lines.push(format!("Exam: {}", exam.as_str().to_ascii_uppercase()));
                lines.push(format!(
                    "Marks in {}: {}",
                    exam.as_str(),
                    self.aggregate.exam_marks.get(exam)
                ));
            }
            MarkMetric::Total => {
                let m = &self.aggregate.exam_marks;
                lines.push(format!("Total Marks: {}", self.aggregate.total_marks));
                lines.push(format!("Mid1: {}", m.mid1));
                lines.push(format!("Mid2: {}", m.mid2));
                lines.push(format!("Assignment1: {}", m.assignment1));
                lines.push(format!("Assignment2: {}", m.assignment2));
                lines.push(format!("Quiz: {}", m.quiz));
                lines.push(format!("Attendance: {}", m.attendance));
                lines.push(format!(
                    "Weighted Mid Marks: {}",
                    self.aggregate.weighted_mid_marks
                ));
            }
        }
        if let Some(note) = &self.filter_note {
            lines.push(note.clone());
        }
        finish_letter(lines, custom_message)
    }
}

pub fn attendance_filter_note(criteria: &FilterCriteria) -> Option<String> {
    match criteria {
        FilterCriteria::Unfiltered => None,
        FilterCriteria::Threshold { value, direction } => Some(format!(
            "Your attendance is {} {}%",
            direction.as_str(),
            value
        )),
        FilterCriteria::Range { min, max } => Some(format!(
            "Your attendance falls between {}% and {}%",
            min, max
        )),
    }
}

pub fn marks_filter_note(criteria: &FilterCriteria) -> Option<String> {
    match criteria {
        FilterCriteria::Unfiltered => None,
        FilterCriteria::Threshold { value, direction } => {
            Some(format!("Your marks are {} {}", direction.as_str(), value))
        }
        FilterCriteria::Range { min, max } => {
            Some(format!("Your marks fall between {} and {}", min, max))
        }
    }
}

/// Walks every student in the given order and attempts one send per
/// student that passed the filter and has an address. One transport
/// failure never aborts the batch, and the outcome order always matches
/// the student order.
pub fn dispatch_reports<T: StudentReport>(
    students: &[ReportStudent],
    selected: &[T],
    subject: &str,
    custom_message: Option<&str>,
    transport: &dyn MailTransport,
) -> DispatchSummary {
    let by_roll: HashMap<&str, &T> = selected
        .iter()
        .map(|row| (row.roll_number(), row))
        .collect();

    let mut results = Vec::with_capacity(students.len());
    let mut emails_sent = 0usize;

    for student in students {
        let Some(row) = by_roll.get(student.roll_no.as_str()) else {
            results.push(ReportOutcome {
                student: student.roll_no.clone(),
                status: DispatchStatus::Skipped {
                    reason: SKIP_NOT_IN_CRITERIA.to_string(),
                },
            });
            continue;
        };

        let Some(email) = student
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
        else {
            results.push(ReportOutcome {
                student: student.roll_no.clone(),
                status: DispatchStatus::Skipped {
                    reason: SKIP_NO_EMAIL.to_string(),
                },
            });
            continue;
        };

        let text = row.render_text(student, custom_message);
        let msg = EmailMessage {
            to: vec![email.to_string()],
            subject: subject.to_string(),
            html: Some(html_wrap(&text)),
            text,
        };
        let status = match transport.send(&msg) {
            Ok(()) => {
                emails_sent += 1;
                DispatchStatus::Success {
                    value: row.reported_value(),
                }
            }
            Err(e) => DispatchStatus::Failed { error: e.message },
        };
        results.push(ReportOutcome {
            student: student.roll_no.clone(),
            status,
        });
    }

    DispatchSummary {
        results,
        total_selected: selected.len(),
        emails_sent,
        total_students: students.len(),
    }
}
