//! Integration tests for the vectorbeam-trace CLI.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use tracer as _;
use vectorbeam_core as _;

fn binary_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.join("vectorbeam-trace")
}

/// BIOS image that sets up a stack, calls the `Wait_Recal` address,
/// and spins after it returns.
fn synthetic_bios() -> Vec<u8> {
    let mut bios = vec![0u8; 0x2000];
    let body = [
        0x10, 0xCE, 0xCF, 0xFF, // LDS #$CFFF
        0xBD, 0xF1, 0x92, // JSR $F192
        0x20, 0xFE, // BRA *
    ];
    bios[..body.len()].copy_from_slice(&body);
    bios[0x1192] = 0x39; // RTS at $F192
    bios[0x1FFE] = 0xE0; // reset vector -> $E000
    bios[0x1FFF] = 0x00;
    bios
}

fn write_bios(dir: &std::path::Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, synthetic_bios()).unwrap();
    path
}

#[test]
fn traces_a_bios_call_with_labels() {
    let temp_dir = tempfile::tempdir().unwrap();
    let bios = write_bios(temp_dir.path(), "bios.bin");

    let result = Command::new(binary_path())
        .args([bios.to_str().unwrap()])
        .output()
        .expect("failed to run vectorbeam-trace");

    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(result.status.success(), "trace failed:\n{stdout}");
    assert!(stdout.contains("Call stack drained."));
    assert!(stdout.contains("Wait_Recal"));
    assert!(stdout.contains("F192"));
}

#[test]
fn trace_option_prints_leading_disassembly() {
    let temp_dir = tempfile::tempdir().unwrap();
    let bios = write_bios(temp_dir.path(), "bios.bin");

    let result = Command::new(binary_path())
        .args([bios.to_str().unwrap(), "--trace", "2"])
        .output()
        .expect("failed to run vectorbeam-trace");

    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(result.status.success());
    assert!(stdout.contains("E000: LDS"));
    assert!(stdout.contains("E004: JSR"));
}

#[test]
fn step_limit_is_reported() {
    let temp_dir = tempfile::tempdir().unwrap();
    let bios = write_bios(temp_dir.path(), "bios.bin");

    let result = Command::new(binary_path())
        .args([bios.to_str().unwrap(), "--limit", "1"])
        .output()
        .expect("failed to run vectorbeam-trace");

    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(result.status.success());
    assert!(stdout.contains("Step limit reached."));
}

#[test]
fn missing_file_is_an_io_error() {
    let result = Command::new(binary_path())
        .args(["/nonexistent/bios.bin"])
        .output()
        .expect("failed to run vectorbeam-trace");

    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("failed to read"));
}

#[test]
fn oversized_image_is_a_core_fault() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("huge.bin");
    fs::write(&path, vec![0u8; 0x4000]).unwrap();

    let result = Command::new(binary_path())
        .args([path.to_str().unwrap()])
        .output()
        .expect("failed to run vectorbeam-trace");

    assert_eq!(result.status.code(), Some(3));
}

#[test]
fn usage_errors_print_the_help_text() {
    let result = Command::new(binary_path())
        .args(["--frobnicate"])
        .output()
        .expect("failed to run vectorbeam-trace");

    assert_eq!(result.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("unknown option"));
    assert!(stderr.contains("Usage:"));
}

#[test]
fn help_shows_usage() {
    let result = Command::new(binary_path())
        .args(["--help"])
        .output()
        .expect("failed to run vectorbeam-trace");

    assert!(result.status.success());
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("--policy"));
}
