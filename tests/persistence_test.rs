mod common;

use common::{payresume, stdout_json};
use tempfile::tempdir;

const SEPA_MANDATE: &str = r#"{"flow":"sepa_direct_debit","account_holder_name":"Jane Doe","customer_id":"cust-42","iban":"DE89370400440532013000"}"#;

#[test]
fn test_pending_request_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: launch and exit while the agent holds control
    let output1 = payresume(dir.path())
        .arg("--db-path")
        .arg(&db_path)
        .args(["launch", "--params", SEPA_MANDATE])
        .output()
        .expect("Failed to execute command");
    assert!(output1.status.success());
    let launched = stdout_json(&output1);
    assert_eq!(launched["status"], "started");

    // 2. Second run: the attempt is still there, with its original timestamp
    let output2 = payresume(dir.path())
        .arg("--db-path")
        .arg(&db_path)
        .args(["status", "--flow", "sepa_direct_debit"])
        .output()
        .expect("Failed to execute command");
    assert!(output2.status.success());
    let status = stdout_json(&output2);
    assert_eq!(status["pending"], true);
    assert_eq!(status["created_at"], launched["created_at"]);

    // 3. Third run: resuming consumes it exactly once
    let output3 = payresume(dir.path())
        .arg("--db-path")
        .arg(&db_path)
        .args(["resume", "--flow", "sepa_direct_debit"])
        .output()
        .expect("Failed to execute command");
    assert!(output3.status.success());
    assert_eq!(stdout_json(&output3)["status"], "cancel");

    let output4 = payresume(dir.path())
        .arg("--db-path")
        .arg(&db_path)
        .args(["resume", "--flow", "sepa_direct_debit"])
        .output()
        .expect("Failed to execute command");
    assert!(output4.status.success());
    assert_eq!(stdout_json(&output4)["status"], "none");
}
