//! Structured test logging.
//!
//! Appends one JSON object per line to `target/test-logs/prox-core-<pid>.jsonl`
//! so that test traces from live-process tests can be inspected afterwards.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Path of the log file for this test process.
pub fn log_file_path() -> PathBuf {
    let target = std::env::var_os("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("../../target"));
    target
        .join("test-logs")
        .join(format!("prox-core-{}.jsonl", std::process::id()))
}

fn append(line: &str) -> std::io::Result<()> {
    let path = log_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    writeln!(file, "{}", line)
}

/// Emit a structured JSONL log entry.
///
/// Caller fields that collide with the fixed keys are stored as `extra_<key>`.
pub fn log_event(level: &str, msg: &str, file: &str, line: u32, fields: &[(&str, Value)]) {
    let mut map = Map::new();
    map.insert(
        "ts".into(),
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true).into(),
    );
    map.insert("level".into(), level.into());
    map.insert("msg".into(), msg.into());
    map.insert("file".into(), file.into());
    map.insert("line".into(), line.into());
    map.insert(
        "test".into(),
        std::thread::current().name().unwrap_or("unnamed").into(),
    );

    for (key, value) in fields {
        let key = if map.contains_key(*key) {
            format!("extra_{}", key)
        } else {
            key.to_string()
        };
        map.insert(key, value.clone());
    }

    let written = serde_json::to_string(&Value::Object(map))
        .map_err(std::io::Error::other)
        .and_then(|line| append(&line));
    if let Err(err) = written {
        eprintln!("test_log: {}: {}", log_file_path().display(), err);
    }
}

/// Log a failed equality assertion with expected/actual context.
pub fn log_assert_eq(msg: &str, expected: &str, actual: &str, file: &str, line: u32) {
    log_event(
        "ERROR",
        msg,
        file,
        line,
        &[("expected", expected.into()), ("actual", actual.into())],
    );
}

#[macro_export]
macro_rules! test_log {
    ($level:ident, $msg:expr $(, $key:ident = $val:expr )* $(,)?) => {{
        let fields = vec![
            $(
                (stringify!($key), serde_json::json!($val)),
            )*
        ];
        $crate::test_log::log_event(stringify!($level), &$msg.to_string(), file!(), line!(), &fields);
    }};
    ($($arg:tt)+) => {{
        $crate::test_log!(INFO, format!($($arg)+));
    }};
}

#[macro_export]
macro_rules! test_assert_eq {
    ($expected:expr, $actual:expr, $msg:expr $(,)?) => {{
        let expected_val = &$expected;
        let actual_val = &$actual;
        if expected_val != actual_val {
            $crate::test_log::log_assert_eq(
                $msg,
                &format!("{:?}", expected_val),
                &format!("{:?}", actual_val),
                file!(),
                line!(),
            );
            panic!(
                "assertion failed: {} (expected: {:?}, actual: {:?})",
                $msg, expected_val, actual_val
            );
        }
    }};
}
