#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::Value;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "dtxcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn dtxprims(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dtxprims"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("dtxprims should run")
}

fn json_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect()
}

#[test]
fn encode_then_decode_fragmented_capture() {
    let dir = unique_temp_dir("roundtrip");
    let capture = dir.join("capture.bin");
    let capture_arg = capture.to_str().expect("utf-8 temp path");

    let encoded = dtxprims(&[
        "encode",
        capture_arg,
        "-i",
        "42",
        "-c",
        "5",
        "-t",
        "3",
        "--expects-reply",
        "--auxiliary",
        "0a0b0c0d",
        "--payload",
        "00112233445566778899",
        "--max-fragment-body",
        "16",
    ]);
    assert!(encoded.status.success(), "encode failed: {encoded:?}");

    let decoded = dtxprims(&["--format", "json", "decode", capture_arg]);
    assert!(decoded.status.success(), "decode failed: {decoded:?}");

    let messages = json_lines(&decoded);
    assert_eq!(messages.len(), 1);
    let message = &messages[0];
    assert_eq!(message["identifier"], 42);
    assert_eq!(message["channel_code"], 5);
    assert_eq!(message["expects_reply"], true);
    assert_eq!(message["message_type_name"], "rpc_asking_reply");
    assert_eq!(message["payload"][0], "00112233445566778899");

    let raw = dtxprims(&["--format", "json", "decode", capture_arg, "--raw-fragments"]);
    assert!(raw.status.success());
    let frames = json_lines(&raw);
    assert!(frames.len() > 2);
    assert_eq!(frames[0]["fragment_index"], 0);
    assert!(frames.iter().skip(1).all(|f| f["fragment_bytes"].is_u64()));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn decode_hex_input() {
    let dir = unique_temp_dir("hex");
    let capture = dir.join("capture.hex");
    let capture_arg = capture.to_str().expect("utf-8 temp path");

    let encoded = dtxprims(&["encode", capture_arg, "--hex", "-t", "0"]);
    assert!(encoded.status.success(), "encode failed: {encoded:?}");

    let decoded = dtxprims(&["--format", "json", "decode", capture_arg, "--hex"]);
    assert!(decoded.status.success(), "decode failed: {decoded:?}");
    let messages = json_lines(&decoded);
    assert_eq!(messages[0]["message_type_name"], "Ack");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn bad_magic_exits_data_invalid() {
    let dir = unique_temp_dir("bad-magic");
    let capture = dir.join("garbage.bin");
    std::fs::write(&capture, [0xAB; 64]).expect("capture should be writable");

    let decoded = dtxprims(&["decode", capture.to_str().expect("utf-8 temp path")]);
    assert_eq!(decoded.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&decoded.stderr).contains("desynchronized"));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn missing_file_exits_failure() {
    let decoded = dtxprims(&["decode", "/nonexistent/dtxprims/capture.bin"]);
    assert_eq!(decoded.status.code(), Some(1));
}
