use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_lmsd");
    let mut child = Command::new(exe)
        .env_remove("LMSD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn lmsd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false), "{}", value);
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
}

fn id_of(result: &serde_json::Value, key: &str) -> i64 {
    result
        .get(key)
        .and_then(|v| v.get("id"))
        .and_then(|v| v.as_i64())
        .unwrap_or_else(|| panic!("missing {}.id in {}", key, result))
}

fn details_reason(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("details"))
        .and_then(|d| d.get("reason"))
        .and_then(|v| v.as_str())
}

#[test]
fn enrollment_submission_and_grading_flow() {
    let workspace = temp_dir("lmsd-grading-flow");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let teacher = request_ok(
        &mut stdin,
        &mut reader,
        "t",
        "users.create",
        json!({ "email": "ada@example.com", "firstName": "Ada", "lastName": "Lovelace", "role": "teacher" }),
    );
    let teacher_id = id_of(&teacher, "user");
    let student = request_ok(
        &mut stdin,
        &mut reader,
        "s",
        "users.create",
        json!({ "email": "alan@example.com", "firstName": "Alan", "lastName": "Turing", "role": "student" }),
    );
    let student_id = id_of(&student, "user");
    let outsider = request_ok(
        &mut stdin,
        &mut reader,
        "o",
        "users.create",
        json!({ "email": "grace@example.com", "firstName": "Grace", "lastName": "Hopper", "role": "student" }),
    );
    let outsider_id = id_of(&outsider, "user");

    let course = request_ok(
        &mut stdin,
        &mut reader,
        "c",
        "courses.create",
        json!({ "name": "Computation", "description": "Machines", "teacherId": teacher_id }),
    );
    let course_id = id_of(&course, "course");

    let enrollment = request_ok(
        &mut stdin,
        &mut reader,
        "e1",
        "enrollments.create",
        json!({ "studentId": student_id, "courseId": course_id }),
    );
    assert!(enrollment
        .get("enrollment")
        .and_then(|e| e.get("enrolledAt"))
        .and_then(|v| v.as_str())
        .is_some());

    let duplicate = request(
        &mut stdin,
        &mut reader,
        "e2",
        "enrollments.create",
        json!({ "studentId": student_id, "courseId": course_id }),
    );
    assert_eq!(error_code(&duplicate), "conflict");
    assert_eq!(details_reason(&duplicate), Some("already_enrolled"));

    let teacher_enroll = request(
        &mut stdin,
        &mut reader,
        "e3",
        "enrollments.create",
        json!({ "studentId": teacher_id, "courseId": course_id }),
    );
    assert_eq!(error_code(&teacher_enroll), "invalid_role");

    let assignment = request_ok(
        &mut stdin,
        &mut reader,
        "a",
        "assignments.create",
        json!({
            "courseId": course_id,
            "title": "Halting problem",
            "description": "Prove it",
            "dueDate": "2026-12-01T17:00:00Z"
        }),
    );
    let assignment_id = id_of(&assignment, "assignment");
    assert_eq!(
        assignment
            .get("assignment")
            .and_then(|a| a.get("dueDate"))
            .and_then(|v| v.as_str())
            .map(|s| s.starts_with("2026-12-01T17:00:00")),
        Some(true)
    );

    let unenrolled = request(
        &mut stdin,
        &mut reader,
        "sub-outsider",
        "submissions.create",
        json!({ "assignmentId": assignment_id, "studentId": outsider_id, "content": "hi", "fileUrl": null }),
    );
    assert_eq!(error_code(&unenrolled), "not_enrolled");

    let missing_assignment = request(
        &mut stdin,
        &mut reader,
        "sub-missing",
        "submissions.create",
        json!({ "assignmentId": 999, "studentId": student_id, "content": "hi", "fileUrl": null }),
    );
    assert_eq!(error_code(&missing_assignment), "not_found");

    let submission = request_ok(
        &mut stdin,
        &mut reader,
        "sub",
        "submissions.create",
        json!({
            "assignmentId": assignment_id,
            "studentId": student_id,
            "content": "It cannot be decided.",
            "fileUrl": "https://files.example.com/proof.pdf"
        }),
    );
    let submission_id = id_of(&submission, "submission");
    let created = submission.get("submission").cloned().unwrap_or_default();
    assert!(created.get("grade").map(|v| v.is_null()).unwrap_or(false));
    assert!(created.get("gradedAt").map(|v| v.is_null()).unwrap_or(false));

    let again = request(
        &mut stdin,
        &mut reader,
        "sub-again",
        "submissions.create",
        json!({ "assignmentId": assignment_id, "studentId": student_id, "content": "v2", "fileUrl": null }),
    );
    assert_eq!(error_code(&again), "conflict");
    assert_eq!(details_reason(&again), Some("already_submitted"));

    let graded = request_ok(
        &mut stdin,
        &mut reader,
        "grade",
        "submissions.grade",
        json!({ "id": submission_id, "grade": 92.75 }),
    );
    let graded = graded.get("submission").cloned().unwrap_or_default();
    assert_eq!(graded.get("grade").and_then(|v| v.as_f64()), Some(92.75));
    assert!(graded.get("gradedAt").and_then(|v| v.as_str()).is_some());
    assert_eq!(graded.get("content"), created.get("content"));
    assert_eq!(graded.get("submittedAt"), created.get("submittedAt"));

    let missing_grade = request(
        &mut stdin,
        &mut reader,
        "grade-missing",
        "submissions.grade",
        json!({ "id": 5150, "grade": 50 }),
    );
    assert_eq!(error_code(&missing_grade), "not_found");

    let by_student = request_ok(
        &mut stdin,
        &mut reader,
        "by-student",
        "submissions.byStudent",
        json!({ "studentId": student_id }),
    );
    let rows = by_student
        .get("submissions")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("grade").and_then(|v| v.as_f64()), Some(92.75));

    let roster = request_ok(
        &mut stdin,
        &mut reader,
        "roster",
        "enrollments.courseStudents",
        json!({ "courseId": course_id }),
    );
    let emails: Vec<&str> = roster
        .get("students")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|u| u.get("email").and_then(|v| v.as_str())).collect())
        .unwrap_or_default();
    assert_eq!(emails, vec!["alan@example.com"]);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn course_rules_check_teacher_role() {
    let workspace = temp_dir("lmsd-course-roles");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "s",
        "users.create",
        json!({ "email": "s@example.com", "firstName": "S", "lastName": "T", "role": "student" }),
    );
    let student_id = id_of(&student, "user");
    let admin = request_ok(
        &mut stdin,
        &mut reader,
        "a",
        "users.create",
        json!({ "email": "a@example.com", "firstName": "A", "lastName": "D", "role": "administrator" }),
    );
    let admin_id = id_of(&admin, "user");

    let by_student = request(
        &mut stdin,
        &mut reader,
        "c1",
        "courses.create",
        json!({ "name": "Nope", "description": null, "teacherId": student_id }),
    );
    assert_eq!(error_code(&by_student), "invalid_role");

    let missing_teacher = request(
        &mut stdin,
        &mut reader,
        "c2",
        "courses.create",
        json!({ "name": "Nope", "description": null, "teacherId": 31337 }),
    );
    assert_eq!(error_code(&missing_teacher), "not_found");

    let by_admin = request_ok(
        &mut stdin,
        &mut reader,
        "c3",
        "courses.create",
        json!({ "name": "Orientation", "description": null, "teacherId": admin_id }),
    );
    let course_id = id_of(&by_admin, "course");

    let reassign_to_student = request(
        &mut stdin,
        &mut reader,
        "u1",
        "courses.update",
        json!({ "id": course_id, "teacherId": student_id }),
    );
    assert_eq!(error_code(&reassign_to_student), "invalid_role");

    let missing_course = request(
        &mut stdin,
        &mut reader,
        "u2",
        "courses.update",
        json!({ "id": 31337, "name": "Ghost" }),
    );
    assert_eq!(error_code(&missing_course), "not_found");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
