mod test_support;

use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};

use serde_json::json;
use test_support::{request_ok, seed_student, seed_subject, select_workspace, spawn_sidecar};

/// Marks `attended` periods present on a single day. With the semester
/// total overridden to 10, one call seeds any whole percentage.
fn seed_attendance(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    roll_no: &str,
    attended: i64,
) {
    let periods: Vec<serde_json::Value> = (1..=attended)
        .map(|p| json!({ "period": p, "present": true }))
        .collect();
    let _ = request_ok(
        stdin,
        reader,
        &format!("att-{}", roll_no),
        "attendance.record",
        json!({
            "rollNo": roll_no,
            "subjectName": "Mathematics",
            "date": "2026-03-02",
            "periods": periods,
        }),
    );
}

fn stats(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    params: serde_json::Value,
) -> Vec<serde_json::Value> {
    request_ok(stdin, reader, id, "attendance.stats", params)
        .get("data")
        .and_then(|v| v.as_array())
        .expect("data array")
        .clone()
}

fn rolls(data: &[serde_json::Value]) -> Vec<String> {
    data.iter()
        .filter_map(|s| s.get("rollNumber").and_then(|v| v.as_str()))
        .map(str::to_string)
        .collect()
}

fn setup(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
) {
    let _ = request_ok(
        stdin,
        reader,
        "cfg",
        "config.update",
        json!({ "totalSemesterClasses": 10 }),
    );
    seed_student(stdin, reader, "P1", "Asha", None);
    seed_student(stdin, reader, "P2", "Bala", None);
    seed_student(stdin, reader, "P3", "Charu", None);
    seed_subject(stdin, reader, "Mathematics");
    seed_attendance(stdin, reader, "P1", 3);
    seed_attendance(stdin, reader, "P2", 5);
    seed_attendance(stdin, reader, "P3", 9);
}

#[test]
fn percentages_come_from_the_configured_semester_total() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _workspace = select_workspace(&mut stdin, &mut reader, "classtrack-att-pct");
    setup(&mut stdin, &mut reader);

    let data = stats(&mut stdin, &mut reader, "1", json!({}));
    assert_eq!(rolls(&data), vec!["P1", "P2", "P3"]);

    let p1 = &data[0];
    assert_eq!(
        p1.get("totalSemesterClasses").and_then(|v| v.as_i64()),
        Some(10)
    );
    assert_eq!(p1.get("attendedClasses").and_then(|v| v.as_i64()), Some(3));
    assert_eq!(
        p1.get("attendancePercentage").and_then(|v| v.as_f64()),
        Some(30.0)
    );
    assert_eq!(
        data[2].get("attendancePercentage").and_then(|v| v.as_f64()),
        Some(90.0)
    );
}

#[test]
fn threshold_and_range_filters_apply_to_percentages() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _workspace = select_workspace(&mut stdin, &mut reader, "classtrack-att-filter");
    setup(&mut stdin, &mut reader);

    // Below is strict, so the student sitting exactly on 50% stays out.
    let data = stats(
        &mut stdin,
        &mut reader,
        "1",
        json!({ "threshold": 50, "filter": "below" }),
    );
    assert_eq!(rolls(&data), vec!["P1"]);

    // Above is inclusive.
    let data = stats(
        &mut stdin,
        &mut reader,
        "2",
        json!({ "threshold": 50, "filter": "above" }),
    );
    assert_eq!(rolls(&data), vec!["P2", "P3"]);

    let data = stats(
        &mut stdin,
        &mut reader,
        "3",
        json!({ "minThreshold": 50, "maxThreshold": 90 }),
    );
    assert_eq!(rolls(&data), vec!["P2", "P3"]);

    // A zero threshold still filters; everyone sits at or above it.
    let data = stats(
        &mut stdin,
        &mut reader,
        "4",
        json!({ "threshold": 0, "filter": "above" }),
    );
    assert_eq!(rolls(&data), vec!["P1", "P2", "P3"]);
}
