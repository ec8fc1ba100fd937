use serde_json::json;
use uuid::Uuid;

use crate::ipc::error::ok;
use crate::ipc::helpers::{
    find_student_by_roll, get_optional_str, get_required_str, list_students, require_db,
    require_student, student_json, today_ist, HandlerErr,
};
use crate::ipc::types::{AppState, Request};

fn handle_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let roll_no = get_required_str(&req.params, "rollNo")?;
    let name = get_required_str(&req.params, "name")?;
    let class_name = get_required_str(&req.params, "className")?;
    let email = get_optional_str(&req.params, "email")?.filter(|e| !e.is_empty());

    let conn = require_db(state)?;
    if find_student_by_roll(conn, &roll_no)?.is_some() {
        return Err(HandlerErr::new(
            "conflict",
            format!("Student with roll number {} already exists", roll_no),
        ));
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(id, roll_no, name, class_name, email, created_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (&id, &roll_no, &name, &class_name, &email, today_ist()),
    )
    .map_err(HandlerErr::db)?;

    let student = require_student(conn, &roll_no)?;
    Ok(ok(&req.id, json!({ "student": student_json(&student) })))
}

fn handle_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let students = list_students(conn)?;
    let rows: Vec<serde_json::Value> = students.iter().map(student_json).collect();
    Ok(ok(&req.id, json!({ "students": rows })))
}

fn handle_get(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let roll_no = get_required_str(&req.params, "rollNo")?;
    let conn = require_db(state)?;
    let student = require_student(conn, &roll_no)?;
    Ok(ok(&req.id, json!({ "student": student_json(&student) })))
}

fn handle_update(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let roll_no = get_required_str(&req.params, "rollNo")?;
    let conn = require_db(state)?;
    let existing = require_student(conn, &roll_no)?;

    let name = get_optional_str(&req.params, "name")?.unwrap_or(existing.name);
    let class_name = get_optional_str(&req.params, "className")?.unwrap_or(existing.class_name);
    // An explicit null clears the address; an absent key keeps it.
    let email = match req.params.get("email") {
        None => existing.email,
        Some(v) if v.is_null() => None,
        Some(_) => get_optional_str(&req.params, "email")?.filter(|e| !e.is_empty()),
    };

    conn.execute(
        "UPDATE students SET name = ?, class_name = ?, email = ? WHERE roll_no = ?",
        (&name, &class_name, &email, &roll_no),
    )
    .map_err(HandlerErr::db)?;

    let student = require_student(conn, &roll_no)?;
    Ok(ok(&req.id, json!({ "student": student_json(&student) })))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let roll_no = get_required_str(&req.params, "rollNo")?;
    let conn = require_db(state)?;
    let student = require_student(conn, &roll_no)?;

    // Dependent rows first; foreign keys are enforced.
    conn.execute("DELETE FROM marks WHERE student_id = ?", [&student.id])
        .map_err(HandlerErr::db)?;
    conn.execute("DELETE FROM attendance WHERE student_id = ?", [&student.id])
        .map_err(HandlerErr::db)?;
    conn.execute("DELETE FROM remarks WHERE student_id = ?", [&student.id])
        .map_err(HandlerErr::db)?;
    conn.execute("DELETE FROM students WHERE id = ?", [&student.id])
        .map_err(HandlerErr::db)?;

    Ok(ok(&req.id, json!({ "deleted": student.roll_no })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.create" => handle_create(state, req),
        "students.list" => handle_list(state, req),
        "students.get" => handle_get(state, req),
        "students.update" => handle_update(state, req),
        "students.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}
