use serde_json::json;

use crate::calc::{Config, ExamType};
use crate::db;
use crate::ipc::error::ok;
use crate::ipc::helpers::{require_db, HandlerErr};
use crate::ipc::types::{AppState, Request};

fn config_json(config: &Config) -> serde_json::Value {
    json!({
        "maxMarks": config.scheme,
        "totalSemesterClasses": config.attendance.total_semester_classes,
    })
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, config_json(&state.config))
}

fn apply_update(state: &mut AppState, params: &serde_json::Value) -> Result<Config, HandlerErr> {
    let mut config = state.config;

    match params.get("totalSemesterClasses") {
        None => {}
        Some(v) if v.is_null() => {}
        Some(v) => {
            let n = v.as_i64().filter(|n| *n > 0).ok_or_else(|| {
                HandlerErr::new("bad_params", "totalSemesterClasses must be a positive integer")
            })?;
            config.attendance.total_semester_classes = n;
        }
    }

    if let Some(maxima) = params.get("maxMarks") {
        let Some(obj) = maxima.as_object() else {
            return Err(HandlerErr::new("bad_params", "maxMarks must be an object"));
        };
        for (key, value) in obj {
            let Some(exam) = ExamType::parse(key) else {
                return Err(HandlerErr::new(
                    "bad_params",
                    format!("unknown exam type in maxMarks: {}", key),
                ));
            };
            let max = value.as_f64().filter(|m| *m > 0.0).ok_or_else(|| {
                HandlerErr::new(
                    "bad_params",
                    format!("maxMarks.{} must be a positive number", key),
                )
            })?;
            match exam {
                ExamType::Mid1 => config.scheme.mid1 = max,
                ExamType::Mid2 => config.scheme.mid2 = max,
                ExamType::Assignment1 => config.scheme.assignment1 = max,
                ExamType::Assignment2 => config.scheme.assignment2 = max,
                ExamType::Quiz => config.scheme.quiz = max,
                ExamType::Attendance => config.scheme.attendance = max,
            }
        }
    }

    {
        let conn = require_db(state)?;
        let blob = serde_json::to_value(config)
            .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
        db::settings_set_json(conn, "config", &blob)
            .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    }
    state.config = config;
    Ok(config)
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    match apply_update(state, &req.params) {
        Ok(config) => ok(&req.id, config_json(&config)),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "config.get" => Some(handle_get(state, req)),
        "config.update" => Some(handle_update(state, req)),
        _ => None,
    }
}
