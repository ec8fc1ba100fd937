use serde_json::json;
use uuid::Uuid;

use crate::calc::{
    filter_stats, parse_filter_params, parse_mark_metric, score_summary, ExamScoreSet, ExamType,
    FilterCriteria, StudentAggregate,
};
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_required_f64, get_required_str, list_students, require_db, require_student,
    require_subject_by_name, title_case, HandlerErr, StudentRow,
};
use crate::ipc::types::{AppState, Request};

fn handle_upsert(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let roll_no = get_required_str(&req.params, "rollNo")?;
    let subject_name = title_case(&get_required_str(&req.params, "subjectName")?);
    let exam_tag = get_required_str(&req.params, "examType")?;
    let score = get_required_f64(&req.params, "score")?;

    // Writes reject unknown exam types; only reads are permissive.
    let Some(exam) = ExamType::parse(&exam_tag) else {
        return Err(HandlerErr::new(
            "bad_params",
            format!("unknown examType: {}", exam_tag),
        ));
    };

    let max = state.config.scheme.max_for(exam);
    if score > max {
        return Err(HandlerErr::new(
            "validation_failed",
            format!(
                "Score cannot exceed maximum marks ({}) for {}",
                max,
                exam.as_str()
            ),
        ));
    }

    let conn = require_db(state)?;
    let student = require_student(conn, &roll_no)?;
    let subject = require_subject_by_name(conn, &subject_name)?;

    conn.execute(
        "INSERT INTO marks(id, student_id, subject_id, exam_type, score)
         VALUES(?, ?, ?, ?, ?)
         ON CONFLICT(student_id, subject_id, exam_type) DO UPDATE SET score = excluded.score",
        (
            Uuid::new_v4().to_string(),
            &student.id,
            &subject.id,
            exam.as_str(),
            score,
        ),
    )
    .map_err(HandlerErr::db)?;

    Ok(ok(
        &req.id,
        json!({
            "mark": {
                "rollNo": student.roll_no,
                "subjectName": subject.name,
                "examType": exam.as_str(),
                "score": score,
            }
        }),
    ))
}

fn handle_for_student(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let roll_no = get_required_str(&req.params, "rollNo")?;
    let conn = require_db(state)?;
    let student = require_student(conn, &roll_no)?;

    let mut stmt = conn
        .prepare(
            "SELECT subjects.id, subjects.name, marks.exam_type, marks.score
             FROM marks
             JOIN subjects ON subjects.id = marks.subject_id
             WHERE marks.student_id = ?
             ORDER BY subjects.name, marks.exam_type",
        )
        .map_err(HandlerErr::db)?;
    let rows: Vec<(String, String, String, f64)> = stmt
        .query_map([&student.id], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;

    // Group by subject; the per-subject total is the raw sum of whatever
    // marks exist, no weighting at this level.
    let mut grouped: Vec<serde_json::Value> = Vec::new();
    let mut current: Option<(String, String, serde_json::Map<String, serde_json::Value>, f64)> =
        None;
    for (subject_id, subject_name, exam_type, score) in rows {
        let flush = current
            .as_ref()
            .map(|(id, _, _, _)| *id != subject_id)
            .unwrap_or(false);
        if flush {
            if let Some((id, name, marks, total)) = current.take() {
                grouped.push(json!({
                    "subjectId": id,
                    "subjectName": name,
                    "marks": marks,
                    "total": total,
                }));
            }
        }
        let entry = current.get_or_insert_with(|| {
            (
                subject_id.clone(),
                subject_name.clone(),
                serde_json::Map::new(),
                0.0,
            )
        });
        entry.2.insert(exam_type, json!(score));
        entry.3 += score;
    }
    if let Some((id, name, marks, total)) = current.take() {
        grouped.push(json!({
            "subjectId": id,
            "subjectName": name,
            "marks": marks,
            "total": total,
        }));
    }

    Ok(ok(&req.id, json!({ "subjects": grouped })))
}

/// Per-student normalized scores plus derived weighted mid and total,
/// across every student in the workspace. Marks from all subjects land in
/// one score set per student (last row per exam type wins, matching the
/// source's aggregation).
pub(super) fn collect_student_aggregates(
    conn: &rusqlite::Connection,
    students: &[StudentRow],
) -> Result<Vec<StudentAggregate>, HandlerErr> {
    let mut stmt = conn
        .prepare("SELECT exam_type, score FROM marks WHERE student_id = ?")
        .map_err(HandlerErr::db)?;

    let mut aggregates = Vec::with_capacity(students.len());
    for student in students {
        let rows: Vec<(String, f64)> = stmt
            .query_map([&student.id], |r| Ok((r.get(0)?, r.get(1)?)))
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(HandlerErr::db)?;
        let exam_marks =
            ExamScoreSet::from_tagged(rows.iter().map(|(tag, score)| (tag.as_str(), *score)));
        let summary = score_summary(&exam_marks);
        aggregates.push(StudentAggregate {
            student_id: student.id.clone(),
            roll_number: student.roll_no.clone(),
            name: student.name.clone(),
            exam_marks,
            weighted_mid_marks: summary.weighted_mid_marks,
            total_marks: summary.total_marks,
        });
    }
    Ok(aggregates)
}

fn handle_stats(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let params = parse_filter_params(&req.params)?;
    let metric = parse_mark_metric(&req.params)?;
    let criteria = FilterCriteria::from_params(&params);

    let conn = require_db(state)?;
    let students = list_students(conn)?;
    let aggregates = collect_student_aggregates(conn, &students)?;
    let kept = filter_stats(aggregates, &criteria, |a| {
        metric.of(&a.exam_marks, a.total_marks)
    });

    let data: Vec<serde_json::Value> = kept
        .iter()
        .map(|a| serde_json::to_value(a).unwrap_or_default())
        .collect();
    Ok(ok(&req.id, json!({ "data": data })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "marks.upsert" => handle_upsert(state, req),
        "marks.forStudent" => handle_for_student(state, req),
        "marks.stats" => handle_stats(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}
