use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

use crate::ipc::error::ok;
use crate::ipc::helpers::{
    find_subject_by_name, get_required_str, require_db, title_case, HandlerErr,
};
use crate::ipc::types::{AppState, Request};

fn handle_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let name = title_case(&get_required_str(&req.params, "name")?);
    let conn = require_db(state)?;

    if find_subject_by_name(conn, &name)?.is_some() {
        return Err(HandlerErr::new(
            "conflict",
            format!("Subject {} already exists", name),
        ));
    }

    let id = Uuid::new_v4().to_string();
    conn.execute("INSERT INTO subjects(id, name) VALUES(?, ?)", (&id, &name))
        .map_err(HandlerErr::db)?;

    Ok(ok(&req.id, json!({ "subject": { "id": id, "name": name } })))
}

fn handle_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let mut stmt = conn
        .prepare("SELECT id, name FROM subjects ORDER BY name")
        .map_err(HandlerErr::db)?;
    let subjects: Vec<serde_json::Value> = stmt
        .query_map([], |r| {
            let id: String = r.get(0)?;
            let name: String = r.get(1)?;
            Ok(json!({ "id": id, "name": name }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;
    Ok(ok(&req.id, json!({ "subjects": subjects })))
}

fn handle_get(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = get_required_str(&req.params, "subjectId")?;
    let conn = require_db(state)?;
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT id, name FROM subjects WHERE id = ?",
            [&subject_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
        .map_err(HandlerErr::db)?;
    let Some((id, name)) = row else {
        return Err(HandlerErr::new(
            "not_found",
            format!("Subject with ID {} not found", subject_id),
        ));
    };
    Ok(ok(&req.id, json!({ "subject": { "id": id, "name": name } })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "subjects.create" => handle_create(state, req),
        "subjects.list" => handle_list(state, req),
        "subjects.get" => handle_get(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}
