use chrono::{FixedOffset, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::ipc::error::err;
use crate::ipc::types::AppState;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn db(e: rusqlite::Error) -> Self {
        Self::new("db_query_failed", e.to_string())
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message)
    }
}

impl From<crate::calc::CalcError> for HandlerErr {
    fn from(e: crate::calc::CalcError) -> Self {
        // Calc errors carry their own code; they are all request-shaped.
        let code: &'static str = match e.code.as_str() {
            "bad_params" => "bad_params",
            _ => "calc_failed",
        };
        Self::new(code, e.message)
    }
}

pub fn require_db(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "no workspace selected"))
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

/// Absent and JSON null both mean "not supplied".
pub fn get_optional_str(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.trim().to_string()))
            .ok_or_else(|| HandlerErr::new("bad_params", format!("{} must be a string", key))),
    }
}

pub fn get_required_f64(params: &serde_json::Value, key: &str) -> Result<f64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

#[derive(Debug, Clone)]
pub struct StudentRow {
    pub id: String,
    pub roll_no: String,
    pub name: String,
    pub class_name: String,
    pub email: Option<String>,
}

fn email_from_column(raw: Option<String>) -> Option<String> {
    raw.map(|e| e.trim().to_string()).filter(|e| !e.is_empty())
}

pub fn find_student_by_roll(
    conn: &Connection,
    roll_no: &str,
) -> Result<Option<StudentRow>, HandlerErr> {
    conn.query_row(
        "SELECT id, roll_no, name, class_name, email FROM students WHERE roll_no = ?",
        [roll_no],
        |r| {
            Ok(StudentRow {
                id: r.get(0)?,
                roll_no: r.get(1)?,
                name: r.get(2)?,
                class_name: r.get(3)?,
                email: email_from_column(r.get(4)?),
            })
        },
    )
    .optional()
    .map_err(HandlerErr::db)
}

pub fn require_student(conn: &Connection, roll_no: &str) -> Result<StudentRow, HandlerErr> {
    find_student_by_roll(conn, roll_no)?.ok_or_else(|| {
        HandlerErr::new(
            "not_found",
            format!("Student with roll number {} not found", roll_no),
        )
    })
}

pub fn list_students(conn: &Connection) -> Result<Vec<StudentRow>, HandlerErr> {
    let mut stmt = conn
        .prepare("SELECT id, roll_no, name, class_name, email FROM students ORDER BY roll_no")
        .map_err(HandlerErr::db)?;
    stmt.query_map([], |r| {
        Ok(StudentRow {
            id: r.get(0)?,
            roll_no: r.get(1)?,
            name: r.get(2)?,
            class_name: r.get(3)?,
            email: email_from_column(r.get(4)?),
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(HandlerErr::db)
}

pub fn student_json(s: &StudentRow) -> serde_json::Value {
    serde_json::json!({
        "id": s.id,
        "rollNo": s.roll_no,
        "name": s.name,
        "className": s.class_name,
        "email": s.email,
    })
}

#[derive(Debug, Clone)]
pub struct SubjectRow {
    pub id: String,
    pub name: String,
}

pub fn find_subject_by_name(
    conn: &Connection,
    name: &str,
) -> Result<Option<SubjectRow>, HandlerErr> {
    conn.query_row(
        "SELECT id, name FROM subjects WHERE name = ?",
        [name],
        |r| {
            Ok(SubjectRow {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        },
    )
    .optional()
    .map_err(HandlerErr::db)
}

pub fn require_subject_by_name(conn: &Connection, name: &str) -> Result<SubjectRow, HandlerErr> {
    find_subject_by_name(conn, name)?
        .ok_or_else(|| HandlerErr::new("not_found", format!("Subject {} not found", name)))
}

/// Subject names are stored title-cased ("operating systems" and
/// "Operating Systems" are the same subject).
pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The institution runs on IST; "today" is resolved in +05:30 no matter
/// where the daemon runs.
pub fn today_ist() -> String {
    let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).expect("fixed IST offset");
    Utc::now().with_timezone(&ist).date_naive().format("%Y-%m-%d").to_string()
}

/// Optional YYYY-MM-DD date param, defaulting to today (IST).
pub fn get_date_or_today(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    match get_optional_str(params, key)? {
        None => Ok(today_ist()),
        Some(raw) => {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                HandlerErr::new("bad_params", format!("{} must be YYYY-MM-DD", key))
            })?;
            Ok(raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_normalizes_each_word() {
        assert_eq!(title_case("operating systems"), "Operating Systems");
        assert_eq!(title_case("MATHEMATICS"), "Mathematics");
        assert_eq!(title_case("  data   structures "), "Data Structures");
    }

    #[test]
    fn today_ist_is_a_valid_date() {
        let today = today_ist();
        assert!(NaiveDate::parse_from_str(&today, "%Y-%m-%d").is_ok());
    }
}
