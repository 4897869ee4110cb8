//! The binary's exit contract: data on STDOUT, exactly one `Error:` line on
//! STDERR and exit code 1 on failure.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn jfcrypt(args: &[&str], passphrase: &str, stdin: &[u8], config_dir: &Path) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_jfcrypt"))
        .args(args)
        .env("JFCRYPT_PASSPHRASE", passphrase)
        .env("JFCRYPT_CONFIG", config_dir.join("absent.toml"))
        .env_remove("JFCRYPT_LOG")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    // the process may exit before reading its input
    let _ = child.stdin.take().unwrap().write_all(stdin);
    child.wait_with_output().unwrap()
}

fn stderr_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .map(str::to_string)
        .collect()
}

fn seal(plaintext: &[u8], config_dir: &Path) -> Vec<u8> {
    let out = jfcrypt(&["encrypt", "-m=1M", "-i=1"], "right", plaintext, config_dir);
    assert!(out.status.success(), "{:?}", stderr_lines(&out));
    assert!(out.stderr.is_empty(), "{:?}", stderr_lines(&out));
    out.stdout
}

#[test]
fn round_trip_is_quiet() {
    let dir = tempfile::tempdir().unwrap();
    let sealed = seal(b"quiet please", dir.path());

    let out = jfcrypt(&["-d"], "right", &sealed, dir.path());
    assert!(out.status.success());
    assert_eq!(out.stdout, b"quiet please");
    assert!(out.stderr.is_empty(), "{:?}", stderr_lines(&out));
}

#[test]
fn wrong_passphrase_prints_one_error_line() {
    let dir = tempfile::tempdir().unwrap();
    let sealed = seal(b"secret payload", dir.path());

    let out = jfcrypt(&["decrypt"], "wrong", &sealed, dir.path());
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert_eq!(
        stderr_lines(&out),
        ["Error: decryption failed (wrong passphrase or corrupted data?)"]
    );
}

#[test]
fn unknown_algorithm_prints_one_error_line() {
    let dir = tempfile::tempdir().unwrap();
    let forged = concat!(
        r#"{"version":"1.0.0","algorithm":"X","format":"binary","#,
        r#""kdf":{"algorithm":"argon2id","salt":"AAAAAAAAAAAAAAAAAAAAAA==","#,
        r#""time":1,"memory":1024,"threads":1,"keylen":32}}"#,
        "\n",
        "payload"
    );

    let out = jfcrypt(&["decrypt"], "right", forged.as_bytes(), dir.path());
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert_eq!(stderr_lines(&out), ["Error: unsupported algorithm: X"]);
}

#[test]
fn unknown_command_prints_usage_then_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = jfcrypt(&["bogus"], "right", b"", dir.path());
    assert_eq!(out.status.code(), Some(1));

    let lines = stderr_lines(&out);
    assert!(lines.iter().any(|l| l.starts_with("Usage:")), "{lines:?}");
    let errors: Vec<_> = lines.iter().filter(|l| l.starts_with("Error:")).collect();
    assert_eq!(errors, ["Error: unknown command: bogus"]);
    assert_eq!(lines.last().map(String::as_str), Some("Error: unknown command: bogus"));
}
