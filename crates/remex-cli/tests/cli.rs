use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use ed25519_dalek::SigningKey;
use serde_json::{json, Value};

const STORE_ENV: &str = "REMEX_STORE_PATH";

fn requester_hex() -> String {
    let key = SigningKey::from_bytes(&[9; 32]).verifying_key();
    key.as_bytes().iter().map(|b| format!("{b:02x}")).collect()
}

fn write_action(dir: &Path, action: &Value) -> (String, String) {
    let json_path = dir.join("action.json");
    let bin_path = dir.join("action.bin");
    fs::write(&json_path, serde_json::to_vec_pretty(action).expect("json")).expect("write");
    (
        json_path.display().to_string(),
        bin_path.display().to_string(),
    )
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("json envelope")
}

#[test]
fn encode_then_decode_round_trips_the_action() {
    let temp = tempfile::tempdir().expect("tempdir");
    let action = json!({
        "action": "property",
        "path": "psi.ServerSetup.bits",
        "target": { "id_at_location": "6f1a3b2c-0d4e-4f50-8a61-72b3c4d5e6f7" },
        "result_id": "0e9d8c7b-6a59-4837-a625-140f3e2d1c0b",
        "kind": "get",
        "message_id": "11111111-2222-4333-8444-555555555555"
    });
    let (json_path, bin_path) = write_action(temp.path(), &action);

    cargo_bin_cmd!("remex")
        .env(STORE_ENV, temp.path().join("store"))
        .args(["action", "encode", &json_path, "-o", &bin_path])
        .assert()
        .success();
    assert!(!fs::read(&bin_path).expect("encoded").is_empty());

    let output = cargo_bin_cmd!("remex")
        .env(STORE_ENV, temp.path().join("store"))
        .args(["--json", "action", "decode", &bin_path])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let envelope = stdout_json(&output);
    assert_eq!(envelope["status"], "ok");
    let decoded = &envelope["details"]["action"];
    assert_eq!(decoded["path"], "psi.ServerSetup.bits");
    assert_eq!(decoded["kind"], "get");
    assert_eq!(decoded["result_id"], action["result_id"]);
    assert_eq!(decoded["message_id"], action["message_id"]);
}

#[test]
fn exec_runs_a_method_and_stores_the_result() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = temp.path().join("store");
    let target = "a1b2c3d4-e5f6-4789-8abc-def012345678";
    let result = "b2c3d4e5-f6a7-4890-9bcd-ef0123456789";

    cargo_bin_cmd!("remex")
        .args(["--store", &store.display().to_string()])
        .args(["object", "put", "--id", target, "--value", "\"Mixed Case\""])
        .assert()
        .success();

    let (json_path, bin_path) = write_action(
        temp.path(),
        &json!({
            "action": "method",
            "path": "str.upper",
            "target": { "id_at_location": target },
            "result_id": result,
        }),
    );
    cargo_bin_cmd!("remex")
        .args(["action", "encode", &json_path, "-o", &bin_path])
        .env(STORE_ENV, &store)
        .assert()
        .success();

    let output = cargo_bin_cmd!("remex")
        .env(STORE_ENV, &store)
        .args(["--json", "exec", &bin_path, "--requester", &requester_hex()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let envelope = stdout_json(&output);
    assert_eq!(envelope["details"]["result_id"], result);
    assert_eq!(envelope["details"]["type_tag"], "str");

    let output = cargo_bin_cmd!("remex")
        .env(STORE_ENV, &store)
        .args(["--json", "object", "get", result])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let envelope = stdout_json(&output);
    let stored = envelope["details"]["object"].to_string();
    assert!(stored.contains("MIXED CASE"), "{stored}");
}

#[test]
fn missing_targets_exit_with_user_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = temp.path().join("store");
    let (json_path, bin_path) = write_action(
        temp.path(),
        &json!({
            "action": "method",
            "path": "str.upper",
            "target": { "id_at_location": "c3d4e5f6-a7b8-4901-8cde-f01234567890" },
            "result_id": "d4e5f6a7-b8c9-4012-9def-012345678901",
        }),
    );
    cargo_bin_cmd!("remex")
        .env(STORE_ENV, &store)
        .args(["action", "encode", &json_path, "-o", &bin_path])
        .assert()
        .success();

    let output = cargo_bin_cmd!("remex")
        .env(STORE_ENV, &store)
        .args(["--json", "exec", &bin_path, "--requester", &requester_hex()])
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let envelope = stdout_json(&output);
    assert_eq!(envelope["status"], "user_error");
    assert_eq!(envelope["details"]["code"], "RX404");

    cargo_bin_cmd!("remex")
        .env(STORE_ENV, &store)
        .args(["object", "get", "d4e5f6a7-b8c9-4012-9def-012345678901"])
        .assert()
        .code(1);
}

#[test]
fn malformed_action_bytes_are_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let bin_path = temp.path().join("garbage.bin");
    fs::write(&bin_path, [0xff, 0xff, 0xff]).expect("write");

    cargo_bin_cmd!("remex")
        .env(STORE_ENV, temp.path().join("store"))
        .args(["action", "decode", &bin_path.display().to_string()])
        .assert()
        .code(1);
}
