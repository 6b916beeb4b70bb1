//! Trace files and the replay binary.

use std::fs;
use std::process::Command as Process;

use tempfile::{NamedTempFile, tempdir};
use vm_engine::io::{Command, TraceError, read_trace, write_results};

const TRACE: &str = "\
# one process, two regions
spawn 1
alloc 1 100 0
alloc 1 50 1
write 1 42 0 5
read 1 0 5
free 1 0
free 1 0        # double free
alloc 1 50 2    # reuses [0,50)
memop 1 3 5     # io-read of the byte written above
memop 1 9
read 1 7 0
exit 1
read 1 1 0
";

#[test]
fn test_read_trace_from_file() {
    let file = NamedTempFile::new().unwrap();
    fs::write(file.path(), TRACE).unwrap();

    let lines = read_trace(file.path()).unwrap();
    assert_eq!(lines.len(), 13);
    assert_eq!(lines[0].line, 2);
    assert_eq!(lines[0].command, Command::Spawn { pid: 1 });
}

#[test]
fn test_read_missing_file() {
    let dir = tempdir().unwrap();
    let err = read_trace(dir.path().join("missing.txt")).unwrap_err();
    assert!(matches!(err, TraceError::Read { .. }));
    assert!(err.to_string().contains("missing.txt"));
}

#[test]
fn test_write_results_space_separated() {
    let file = NamedTempFile::new().unwrap();
    write_results(file.path(), &[0, 512, -1, 7]).unwrap();
    assert_eq!(fs::read_to_string(file.path()).unwrap(), "0 512 -1 7");
}

#[test]
fn test_replay_binary() {
    let dir = tempdir().unwrap();
    let trace = dir.path().join("trace.txt");
    let output = dir.path().join("out.txt");
    fs::write(&trace, TRACE).unwrap();

    let status = Process::new(env!("CARGO_BIN_EXE_vm-engine"))
        .arg(&trace)
        .arg(&output)
        .args(["--ram-frames", "8", "--swap-frames", "32"])
        .status()
        .unwrap();
    assert!(status.success());

    let results = fs::read_to_string(&output).unwrap();
    assert_eq!(results, "0 0 100 0 42 0 -1 0 42 -1 -1 0 -1");
}

#[test]
fn test_replay_rejects_bad_trace() {
    let dir = tempdir().unwrap();
    let trace = dir.path().join("trace.txt");
    let output = dir.path().join("out.txt");
    fs::write(&trace, "spawn 1\nalloc 1\n").unwrap();

    let result = Process::new(env!("CARGO_BIN_EXE_vm-engine"))
        .arg(&trace)
        .arg(&output)
        .output()
        .unwrap();
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("line 2"));
    assert!(!output.exists());
}

#[test]
fn test_replay_survives_huge_sizes() {
    let dir = tempdir().unwrap();
    let trace = dir.path().join("trace.txt");
    let output = dir.path().join("out.txt");
    fs::write(
        &trace,
        "spawn 1\nalloc 1 18446744073709551615 0\nmemop 1 1 0 18446744073709551605\nalloc 1 10 0\n",
    )
    .unwrap();

    let status = Process::new(env!("CARGO_BIN_EXE_vm-engine"))
        .arg(&trace)
        .arg(&output)
        .status()
        .unwrap();
    assert!(status.success());
    assert_eq!(fs::read_to_string(&output).unwrap(), "0 -1 -1 0");
}
