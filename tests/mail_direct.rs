mod test_support;

use serde_json::json;
use test_support::{read_outbox, request_err, request_ok, select_workspace, spawn_sidecar};

#[test]
fn send_files_a_message_in_the_workspace_outbox() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let workspace = select_workspace(&mut stdin, &mut reader, "classtrack-mail-send");

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "mail.send",
        json!({
            "to": ["asha@example.edu", "bala@example.edu"],
            "subject": "Schedule change",
            "text": "Friday classes move to Saturday.",
        }),
    );
    assert_eq!(
        result.get("message").and_then(|v| v.as_str()),
        Some("Email sent successfully")
    );

    let outbox = read_outbox(&workspace);
    assert_eq!(outbox.len(), 1);
    let msg = &outbox[0];
    assert_eq!(
        msg.get("to").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(2)
    );
    assert_eq!(msg.get("subject").and_then(|v| v.as_str()), Some("Schedule change"));
    // No html was supplied, so none is stored.
    assert!(msg.get("html").is_none());
}

#[test]
fn send_validates_recipients() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _workspace = select_workspace(&mut stdin, &mut reader, "classtrack-mail-validate");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "mail.send",
        json!({ "to": [], "subject": "s", "text": "t" }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "mail.send",
        json!({ "to": ["  "], "subject": "s", "text": "t" }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "mail.send",
        json!({ "subject": "s", "text": "t" }),
    );
    assert_eq!(code, "bad_params");
}

#[test]
fn attendance_warning_wraps_the_message_in_a_heading() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let workspace = select_workspace(&mut stdin, &mut reader, "classtrack-mail-warning");

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "mail.attendanceWarning",
        json!({
            "to": ["asha@example.edu"],
            "message": "Your attendance has dropped below the required minimum.",
        }),
    );
    assert_eq!(
        result.get("message").and_then(|v| v.as_str()),
        Some("Warning email sent successfully")
    );

    let outbox = read_outbox(&workspace);
    assert_eq!(outbox.len(), 1);
    let msg = &outbox[0];
    assert_eq!(
        msg.get("subject").and_then(|v| v.as_str()),
        Some("Attendance Warning")
    );
    let html = msg.get("html").and_then(|v| v.as_str()).expect("html body");
    assert!(html.contains("<h1>Attendance Warning</h1>"));
    assert!(html.contains("dropped below the required minimum"));
}
