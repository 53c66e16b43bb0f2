mod test_support;

use serde_json::json;
use std::io::{BufRead, Write};
use test_support::{error_code, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("rosterd-router-smoke");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["workspacePath"], serde_json::Value::Null);

    let before = request(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.open",
        json!({ "classId": "402" }),
    );
    assert_eq!(error_code(&before), Some("no_workspace"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let classes = request_ok(&mut stdin, &mut reader, "4", "classes.list", json!({}));
    assert_eq!(classes["defaultClass"], json!("402"));
    assert_eq!(classes["attendanceStates"].as_array().map(|s| s.len()), Some(4));
    assert_eq!(classes["today"].as_str().map(|s| s.len()), Some(10));

    let unknown_class = request(
        &mut stdin,
        &mut reader,
        "5",
        "attendance.open",
        json!({ "classId": "999" }),
    );
    assert_eq!(error_code(&unknown_class), Some("not_found"));

    let bad_date = request(
        &mut stdin,
        &mut reader,
        "6",
        "attendance.submit",
        json!({ "classId": "402", "date": "May 1", "marks": [] }),
    );
    // No table yet, so the load fails before the date is looked at.
    assert_eq!(error_code(&bad_date), Some("load_failed"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "tables.write",
        json!({ "table": "402_attendance", "header": ["name"], "rows": [["Amy"]] }),
    );
    let bad_date = request(
        &mut stdin,
        &mut reader,
        "8",
        "attendance.open",
        json!({ "classId": "402", "date": "May 1" }),
    );
    assert_eq!(error_code(&bad_date), Some("column_invalid"));

    // Date defaults to today.
    let today = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "attendance.open",
        json!({ "classId": "402" }),
    );
    assert_eq!(today["date"], classes["today"]);
    assert_eq!(today["rows"][0]["label"], json!(".Amy"));

    let bad_table = request(
        &mut stdin,
        &mut reader,
        "10",
        "tables.write",
        json!({ "table": "x", "header": "nope" }),
    );
    assert_eq!(error_code(&bad_table), Some("bad_params"));

    let tables = request_ok(&mut stdin, &mut reader, "11", "tables.list", json!({}));
    assert_eq!(tables["tables"][0]["name"], json!("402_attendance"));
    assert_eq!(tables["tables"][0]["rows"], json!(1));

    let unknown = request(&mut stdin, &mut reader, "12", "grades.export", json!({}));
    assert_eq!(error_code(&unknown), Some("not_implemented"));

    // A malformed line still gets an answer and the loop keeps going.
    writeln!(stdin, "{{ not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json reply");
    let reply: serde_json::Value = serde_json::from_str(line.trim()).expect("reply json");
    assert_eq!(error_code(&reply), Some("bad_json"));

    let _ = request_ok(&mut stdin, &mut reader, "13", "health", json!({}));
}
