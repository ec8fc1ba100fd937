use chrono::NaiveDate;
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_str, require_db, HandlerErr};
use crate::ipc::types::{AppState, Request};

const EVENT_TYPES: [&str; 3] = ["holiday", "exam", "activity"];

fn handle_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let title = get_required_str(&req.params, "title")?;
    let date = get_required_str(&req.params, "date")?;
    let kind = get_required_str(&req.params, "type")?.to_lowercase();

    NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| HandlerErr::new("bad_params", "date must be YYYY-MM-DD"))?;
    if !EVENT_TYPES.contains(&kind.as_str()) {
        return Err(HandlerErr::new(
            "bad_params",
            format!("type must be one of holiday, exam, activity (got {})", kind),
        ));
    }

    let conn = require_db(state)?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO events(id, date, title, type) VALUES(?, ?, ?, ?)",
        (&id, &date, &title, &kind),
    )
    .map_err(HandlerErr::db)?;

    Ok(ok(
        &req.id,
        json!({ "event": { "id": id, "date": date, "title": title, "type": kind } }),
    ))
}

fn handle_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let mut stmt = conn
        .prepare("SELECT id, date, title, type FROM events ORDER BY date DESC")
        .map_err(HandlerErr::db)?;
    let events: Vec<serde_json::Value> = stmt
        .query_map([], |r| {
            let id: String = r.get(0)?;
            let date: String = r.get(1)?;
            let title: String = r.get(2)?;
            let kind: String = r.get(3)?;
            Ok(json!({ "id": id, "date": date, "title": title, "type": kind }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;
    Ok(ok(&req.id, json!({ "events": events })))
}

fn handle_get(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let event_id = get_required_str(&req.params, "eventId")?;
    let conn = require_db(state)?;
    let row: Option<(String, String, String, String)> = conn
        .query_row(
            "SELECT id, date, title, type FROM events WHERE id = ?",
            [&event_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()
        .map_err(HandlerErr::db)?;
    let Some((id, date, title, kind)) = row else {
        return Err(HandlerErr::new(
            "not_found",
            format!("Event with ID {} not found", event_id),
        ));
    };
    Ok(ok(
        &req.id,
        json!({ "event": { "id": id, "date": date, "title": title, "type": kind } }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "events.create" => handle_create(state, req),
        "events.list" => handle_list(state, req),
        "events.get" => handle_get(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}
