use serde_json::json;
use uuid::Uuid;

use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_date_or_today, get_required_str, require_db, require_student, HandlerErr,
};
use crate::ipc::types::{AppState, Request};

fn handle_add(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let roll_no = get_required_str(&req.params, "rollNo")?;
    let teacher = get_required_str(&req.params, "teacher")?;
    let comment = get_required_str(&req.params, "comment")?;
    let date = get_date_or_today(&req.params, "date")?;

    let conn = require_db(state)?;
    let student = require_student(conn, &roll_no)?;

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO remarks(id, student_id, date, teacher, comment) VALUES(?, ?, ?, ?, ?)",
        (&id, &student.id, &date, &teacher, &comment),
    )
    .map_err(HandlerErr::db)?;

    Ok(ok(
        &req.id,
        json!({
            "remark": {
                "id": id,
                "rollNo": student.roll_no,
                "date": date,
                "teacher": teacher,
                "comment": comment,
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
            "SELECT id, date, teacher, comment FROM remarks
             WHERE student_id = ?
             ORDER BY date DESC",
        )
        .map_err(HandlerErr::db)?;
    let remarks: Vec<serde_json::Value> = stmt
        .query_map([&student.id], |r| {
            let id: String = r.get(0)?;
            let date: String = r.get(1)?;
            let teacher: String = r.get(2)?;
            let comment: String = r.get(3)?;
            Ok(json!({
                "id": id,
                "rollNo": roll_no.clone(),
                "date": date,
                "teacher": teacher,
                "comment": comment,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;

    Ok(ok(&req.id, json!({ "remarks": remarks })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "remarks.add" => handle_add(state, req),
        "remarks.forStudent" => handle_for_student(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}
