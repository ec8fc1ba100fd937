use serde_json::json;
use uuid::Uuid;

use crate::calc::{
    attendance_percentage, filter_stats, parse_filter_params, AttendanceConfig, AttendanceStat,
    FilterCriteria,
};
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_date_or_today, get_required_str, list_students, require_db, require_student,
    require_subject_by_name, title_case, HandlerErr, StudentRow,
};
use crate::ipc::types::{AppState, Request};

struct PeriodMark {
    period: i64,
    present: bool,
}

fn parse_periods(params: &serde_json::Value) -> Result<Vec<PeriodMark>, HandlerErr> {
    let Some(raw) = params.get("periods").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::new("bad_params", "missing periods array"));
    };
    if raw.is_empty() {
        return Err(HandlerErr::new("bad_params", "periods must not be empty"));
    }
    let mut periods = Vec::with_capacity(raw.len());
    for entry in raw {
        let period = entry.get("period").and_then(|v| v.as_i64()).ok_or_else(|| {
            HandlerErr::new("bad_params", "each period entry needs an integer period")
        })?;
        let present = entry
            .get("present")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| {
                HandlerErr::new("bad_params", "each period entry needs a boolean present")
            })?;
        periods.push(PeriodMark { period, present });
    }
    Ok(periods)
}

fn handle_record(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let roll_no = get_required_str(&req.params, "rollNo")?;
    let subject_name = title_case(&get_required_str(&req.params, "subjectName")?);
    let date = get_date_or_today(&req.params, "date")?;
    let periods = parse_periods(&req.params)?;

    let conn = require_db(state)?;
    let student = require_student(conn, &roll_no)?;
    let subject = require_subject_by_name(conn, &subject_name)?;

    // Re-marking a period for the same day overwrites the earlier entry.
    let mut records = Vec::with_capacity(periods.len());
    for mark in &periods {
        conn.execute(
            "INSERT INTO attendance(id, student_id, subject_id, date, period, present)
             VALUES(?, ?, ?, ?, ?, ?)
             ON CONFLICT(student_id, date, period)
             DO UPDATE SET present = excluded.present, subject_id = excluded.subject_id",
            (
                Uuid::new_v4().to_string(),
                &student.id,
                &subject.id,
                &date,
                mark.period,
                mark.present as i64,
            ),
        )
        .map_err(HandlerErr::db)?;
        records.push(json!({
            "period": mark.period,
            "present": mark.present,
            "subjectName": subject.name,
        }));
    }

    Ok(ok(
        &req.id,
        json!({ "rollNo": student.roll_no, "date": date, "records": records }),
    ))
}

fn handle_for_student(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let roll_no = get_required_str(&req.params, "rollNo")?;
    let date = get_date_or_today(&req.params, "date")?;

    let conn = require_db(state)?;
    let student = require_student(conn, &roll_no)?;

    let mut stmt = conn
        .prepare(
            "SELECT attendance.period, attendance.present, subjects.name
             FROM attendance
             JOIN subjects ON subjects.id = attendance.subject_id
             WHERE attendance.student_id = ? AND attendance.date = ?
             ORDER BY attendance.period",
        )
        .map_err(HandlerErr::db)?;
    let records: Vec<serde_json::Value> = stmt
        .query_map((&student.id, &date), |r| {
            let period: i64 = r.get(0)?;
            let present: i64 = r.get(1)?;
            let subject: String = r.get(2)?;
            Ok(json!({
                "date": date,
                "period": period,
                "present": present != 0,
                "subjectName": subject,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;

    Ok(ok(
        &req.id,
        json!({ "rollNo": student.roll_no, "date": date, "records": records }),
    ))
}

/// Present-class counts span the whole semester, not a single day; the
/// denominator comes from the injected config, not from rows.
pub(super) fn collect_attendance_stats(
    conn: &rusqlite::Connection,
    students: &[StudentRow],
    config: &AttendanceConfig,
) -> Result<Vec<AttendanceStat>, HandlerErr> {
    let mut stmt = conn
        .prepare("SELECT COUNT(*) FROM attendance WHERE student_id = ? AND present = 1")
        .map_err(HandlerErr::db)?;

    let total = config.total_semester_classes;
    let mut stats = Vec::with_capacity(students.len());
    for student in students {
        let attended: i64 = stmt
            .query_row([&student.id], |r| r.get(0))
            .map_err(HandlerErr::db)?;
        stats.push(AttendanceStat {
            student_id: student.id.clone(),
            roll_number: student.roll_no.clone(),
            name: student.name.clone(),
            total_semester_classes: total,
            attended_classes: attended,
            attendance_percentage: attendance_percentage(attended, total),
        });
    }
    Ok(stats)
}

fn handle_stats(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let params = parse_filter_params(&req.params)?;
    let criteria = FilterCriteria::from_params(&params);
    let config = state.config.attendance;

    let conn = require_db(state)?;
    let students = list_students(conn)?;
    let stats = collect_attendance_stats(conn, &students, &config)?;
    let kept = filter_stats(stats, &criteria, |s| s.attendance_percentage);

    let data: Vec<serde_json::Value> = kept
        .iter()
        .map(|s| serde_json::to_value(s).unwrap_or_default())
        .collect();
    Ok(ok(&req.id, json!({ "data": data })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.record" => handle_record(state, req),
        "attendance.forStudent" => handle_for_student(state, req),
        "attendance.stats" => handle_stats(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}
