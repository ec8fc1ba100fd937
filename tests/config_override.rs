mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, seed_student, seed_subject, spawn_sidecar, temp_dir};

#[test]
fn defaults_match_the_standard_scheme() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let workspace = temp_dir("classtrack-config-defaults");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let config = request_ok(&mut stdin, &mut reader, "1", "config.get", json!({}));
    assert_eq!(
        config.get("totalSemesterClasses").and_then(|v| v.as_i64()),
        Some(90)
    );
    let maxima = config.get("maxMarks").expect("maxMarks");
    assert_eq!(maxima.get("mid1").and_then(|v| v.as_f64()), Some(20.0));
    assert_eq!(maxima.get("mid2").and_then(|v| v.as_f64()), Some(20.0));
    assert_eq!(maxima.get("assignment1").and_then(|v| v.as_f64()), Some(10.0));
    assert_eq!(maxima.get("assignment2").and_then(|v| v.as_f64()), Some(10.0));
    assert_eq!(maxima.get("quiz").and_then(|v| v.as_f64()), Some(10.0));
    assert_eq!(maxima.get("attendance").and_then(|v| v.as_f64()), Some(5.0));
}

#[test]
fn updates_take_effect_and_survive_a_restart() {
    let workspace = temp_dir("classtrack-config-persist");

    {
        let (_child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "ws",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );

        let updated = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "config.update",
            json!({ "totalSemesterClasses": 120, "maxMarks": { "quiz": 20 } }),
        );
        assert_eq!(
            updated.get("totalSemesterClasses").and_then(|v| v.as_i64()),
            Some(120)
        );
        assert_eq!(
            updated
                .get("maxMarks")
                .and_then(|m| m.get("quiz"))
                .and_then(|v| v.as_f64()),
            Some(20.0)
        );

        // The raised quiz maximum admits a score the default rejects.
        seed_student(&mut stdin, &mut reader, "R1", "Student One", None);
        seed_subject(&mut stdin, &mut reader, "Mathematics");
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "marks.upsert",
            json!({ "rollNo": "R1", "subjectName": "Mathematics", "examType": "quiz", "score": 15 }),
        );
    }

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let config = request_ok(&mut stdin, &mut reader, "1", "config.get", json!({}));
    assert_eq!(
        config.get("totalSemesterClasses").and_then(|v| v.as_i64()),
        Some(120)
    );
    assert_eq!(
        config
            .get("maxMarks")
            .and_then(|m| m.get("quiz"))
            .and_then(|v| v.as_f64()),
        Some(20.0)
    );
    // Untouched maxima keep their defaults.
    assert_eq!(
        config
            .get("maxMarks")
            .and_then(|m| m.get("mid1"))
            .and_then(|v| v.as_f64()),
        Some(20.0)
    );
}

#[test]
fn update_rejects_bad_values() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let workspace = temp_dir("classtrack-config-reject");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let code = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "config.update",
        json!({ "totalSemesterClasses": 0 }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "config.update",
        json!({ "maxMarks": { "final": 50 } }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "config.update",
        json!({ "maxMarks": { "quiz": -1 } }),
    );
    assert_eq!(code, "bad_params");

    // A rejected update leaves the running config untouched.
    let config = request_ok(&mut stdin, &mut reader, "4", "config.get", json!({}));
    assert_eq!(
        config.get("totalSemesterClasses").and_then(|v| v.as_i64()),
        Some(90)
    );
}
