use serde_json::json;

use super::{attendance, marks};
use crate::calc::{
    filter_stats, parse_filter_params, parse_mark_metric, FilterCriteria, MarkMetric,
};
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_optional_str, get_required_str, list_students, require_db, HandlerErr, StudentRow,
};
use crate::ipc::types::{AppState, Request};
use crate::mail::{EmailMessage, MailTransport, OutboxTransport};
use crate::report::{
    attendance_filter_note, dispatch_reports, marks_filter_note, AttendanceReportRow,
    MarksReportRow, ReportStudent, SUBJECT_ATTENDANCE_REPORT, SUBJECT_MARKS_REPORT,
};

fn outbox(state: &AppState) -> Result<OutboxTransport, HandlerErr> {
    state
        .workspace
        .as_deref()
        .map(OutboxTransport::new)
        .ok_or_else(|| HandlerErr::new("no_workspace", "no workspace selected"))
}

fn parse_recipients(params: &serde_json::Value) -> Result<Vec<String>, HandlerErr> {
    let Some(raw) = params.get("to").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::new("bad_params", "missing to array"));
    };
    let mut to = Vec::with_capacity(raw.len());
    for entry in raw {
        let Some(addr) = entry.as_str().map(str::trim).filter(|a| !a.is_empty()) else {
            return Err(HandlerErr::new(
                "bad_params",
                "to must contain non-empty addresses",
            ));
        };
        to.push(addr.to_string());
    }
    if to.is_empty() {
        return Err(HandlerErr::new("bad_params", "to must not be empty"));
    }
    Ok(to)
}

fn report_students(students: &[StudentRow]) -> Vec<ReportStudent> {
    students
        .iter()
        .map(|s| ReportStudent {
            roll_no: s.roll_no.clone(),
            name: s.name.clone(),
            email: s.email.clone(),
        })
        .collect()
}

fn handle_send(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let to = parse_recipients(&req.params)?;
    let subject = get_required_str(&req.params, "subject")?;
    let text = get_required_str(&req.params, "text")?;
    let html = get_optional_str(&req.params, "html")?;

    let transport = outbox(state)?;
    let msg = EmailMessage {
        to,
        subject,
        text,
        html,
    };
    transport
        .send(&msg)
        .map_err(|e| HandlerErr::new("mail_transport_failed", e.message))?;

    Ok(ok(&req.id, json!({ "message": "Email sent successfully" })))
}

fn handle_attendance_warning(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let to = parse_recipients(&req.params)?;
    let message = get_required_str(&req.params, "message")?;

    let transport = outbox(state)?;
    let msg = EmailMessage {
        to,
        subject: "Attendance Warning".to_string(),
        html: Some(format!(
            "<div><h1>Attendance Warning</h1><p>{}</p></div>",
            message
        )),
        text: message,
    };
    transport
        .send(&msg)
        .map_err(|e| HandlerErr::new("mail_transport_failed", e.message))?;

    Ok(ok(
        &req.id,
        json!({ "message": "Warning email sent successfully" }),
    ))
}

fn handle_attendance_report(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let params = parse_filter_params(&req.params)?;
    let criteria = FilterCriteria::from_params(&params);
    let custom_message = get_optional_str(&req.params, "customMessage")?;
    let config = state.config.attendance;

    let conn = require_db(state)?;
    let students = list_students(conn)?;
    let stats = attendance::collect_attendance_stats(conn, &students, &config)?;
    let selected = filter_stats(stats, &criteria, |s| s.attendance_percentage);

    let note = attendance_filter_note(&criteria);
    let rows: Vec<AttendanceReportRow> = selected
        .into_iter()
        .map(|stat| AttendanceReportRow {
            stat,
            filter_note: note.clone(),
        })
        .collect();

    let transport = outbox(state)?;
    let summary = dispatch_reports(
        &report_students(&students),
        &rows,
        SUBJECT_ATTENDANCE_REPORT,
        custom_message.as_deref(),
        &transport,
    );

    let message = match criteria {
        FilterCriteria::Threshold { value, direction } => format!(
            "Attendance reports sent to students {} {}%",
            direction.as_str(),
            value
        ),
        FilterCriteria::Range { min, max } => format!(
            "Attendance reports sent to students between {}% and {}%",
            min, max
        ),
        FilterCriteria::Unfiltered => "Attendance reports sent to all students".to_string(),
    };

    let mut body = serde_json::to_value(&summary).unwrap_or_default();
    body["message"] = json!(message);
    Ok(ok(&req.id, body))
}

fn handle_marks_report(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let params = parse_filter_params(&req.params)?;
    let criteria = FilterCriteria::from_params(&params);
    let metric = parse_mark_metric(&req.params)?;
    let custom_message = get_optional_str(&req.params, "customMessage")?;

    let conn = require_db(state)?;
    let students = list_students(conn)?;
    let aggregates = marks::collect_student_aggregates(conn, &students)?;
    let selected = filter_stats(aggregates, &criteria, |a| {
        metric.of(&a.exam_marks, a.total_marks)
    });

    let note = marks_filter_note(&criteria);
    let rows: Vec<MarksReportRow> = selected
        .into_iter()
        .map(|aggregate| MarksReportRow {
            aggregate,
            metric,
            filter_note: note.clone(),
        })
        .collect();

    let transport = outbox(state)?;
    let summary = dispatch_reports(
        &report_students(&students),
        &rows,
        SUBJECT_MARKS_REPORT,
        custom_message.as_deref(),
        &transport,
    );

    let mut message = match criteria {
        FilterCriteria::Threshold { value, direction } => format!(
            "Marks reports sent to students with marks {} {}",
            direction.as_str(),
            value
        ),
        FilterCriteria::Range { min, max } => format!(
            "Marks reports sent to students with marks between {} and {}",
            min, max
        ),
        FilterCriteria::Unfiltered => "Marks reports sent to all students".to_string(),
    };
    if let MarkMetric::Exam(exam) = metric {
        message.push_str(&format!(" for {}", exam.as_str()));
    }

    let mut body = serde_json::to_value(&summary).unwrap_or_default();
    body["message"] = json!(message);
    Ok(ok(&req.id, body))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "mail.send" => handle_send(state, req),
        "mail.attendanceWarning" => handle_attendance_warning(state, req),
        "mail.attendanceReport" => handle_attendance_report(state, req),
        "mail.marksReport" => handle_marks_report(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}
