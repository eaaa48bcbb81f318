// tests/script_tests.rs

use std::fs;

use ogree_cli::backend::{Backend, MemoryBackend};
use ogree_cli::output::Output;
use ogree_cli::script::{self, ScriptError};
use ogree_cli::viz::RecordingViz;
use ogree_cli::{EvalError, Session};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn session() -> Session {
    Session::new(
        Box::new(MemoryBackend::new()),
        Box::new(RecordingViz::connected()),
        Output::captured(),
    )
}

const ROOM: &str = "\
// a small room
+site:/P/S
+bd:/P/S/B@[0,0]@0@[10,10,5]
+ro:/P/S/B/R@[0,0]@0@[10,10,3]
cd /P/S/B/R
for i in 1..2 { \\
    +rk:R$i@[$i,0]@front@[60,120,42] \\
}
";

#[test]
fn test_run_script() {
    let mut s = session();
    script::run_script(&mut s, "room.ocli", ROOM).unwrap();
    assert!(s.backend.get_object("/Physical/S/B/R/R2").is_ok());
    assert_eq!(s.env.current_path, "/Physical/S/B/R");
}

#[test]
fn test_existing_objects_are_skipped() {
    let mut s = session();
    script::run_script(&mut s, "room.ocli", ROOM).unwrap();
    script::run_script(&mut s, "room.ocli", ROOM).unwrap();
}

#[test]
fn test_syntax_errors_abort_before_running() {
    let mut s = session();
    let text = ".var:a=1\n.var:=2\nprint ok\n+foo:x";
    let err = script::run_script(&mut s, "bad.ocli", text).unwrap_err();
    let EvalError::Script(ScriptError::Syntax { file, lines }) = err else {
        panic!("syntax error expected");
    };
    assert_eq!(file, "bad.ocli");
    assert_eq!(
        lines,
        vec![(2, ".var:=2".to_string()), (4, "+foo:x".to_string())]
    );
    assert!(s.env.get("a").is_none());
    assert!(s.output.lines().is_empty());
}

#[test]
fn test_runtime_failures_are_collected() {
    let mut s = session();
    let text = "print one\n.var: i = eval 10/0\nprint two\ncd /P/nowhere";
    let err = script::run_script(&mut s, "f.ocli", text).unwrap_err();
    assert_eq!(s.output.lines(), ["one", "two"]);

    let EvalError::Script(ScriptError::Runtime(failures)) = &err else {
        panic!("runtime failures expected");
    };
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].frames[0].line, 2);
    assert_eq!(failures[1].message, "/Physical/nowhere does not exist");
    assert!(err.to_string().starts_with(
        "Stack trace (most recent call last):\n  File \"f.ocli\", line 2\n    .var: i = eval 10/0\nError : cannot divide by 0"
    ));
}

#[test]
fn test_nested_scripts_report_the_call_chain() {
    let dir = TempDir::new().unwrap();
    let inner = dir.path().join("inner.ocli");
    fs::write(&inner, "print inner\nget /P/missing\n").unwrap();
    let outer = dir.path().join("outer.ocli");
    fs::write(&outer, format!("print outer\n.cmds:{}\n", inner.display())).unwrap();

    let mut s = session();
    let err = script::run_file(&mut s, &outer).unwrap_err();
    assert_eq!(s.output.lines(), ["outer", "inner"]);

    let EvalError::Script(ScriptError::Runtime(failures)) = err else {
        panic!("runtime failures expected");
    };
    let frames: Vec<(String, usize)> = failures[0]
        .frames
        .iter()
        .map(|f| (f.file.clone(), f.line))
        .collect();
    assert_eq!(
        frames,
        vec![("outer.ocli".to_string(), 2), ("inner.ocli".to_string(), 2)]
    );
}

#[test]
fn test_recursive_script_is_stopped() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("loop.ocli");
    fs::write(&file, format!(".cmds:{}\n", file.display())).unwrap();

    let mut s = session();
    let err = script::run_file(&mut s, &file).unwrap_err();
    assert!(err.to_string().contains("too many nested scripts"));
}

#[test]
fn test_dry_run_reports_without_running() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("check.ocli");
    fs::write(&file, "+site:/P/S\n.var:=2\nprint done\n").unwrap();

    let mut s = session();
    s.run(&format!(".dryrun:{}", file.display())).unwrap();
    assert_eq!(
        s.output.take(),
        [
            "####################",
            "Errors found: 1",
            "# Error 0",
            "  LINE#: 2\tCOMMAND:.var:=2",
            "  Error : variable name expected",
        ]
    );
    assert!(s.backend.get_object("/Physical/S").is_err());

    fs::write(&file, "print fine\n").unwrap();
    s.run(&format!(".dryrun:{}", file.display())).unwrap();
    assert_eq!(s.output.take(), ["####################", "Errors found: 0"]);
}

#[test]
fn test_exit_ends_the_script() {
    let mut s = session();
    script::run_script(&mut s, "f.ocli", "print a\nexit\nprint b").unwrap();
    assert_eq!(s.output.lines(), ["a"]);
}

#[test]
fn test_template_then_device() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("server.json");
    fs::write(
        &template,
        r#"{"slug": "server", "category": "device", "sizeWDHmm": [400, 600, 44]}"#,
    )
    .unwrap();

    let mut s = session();
    script::run_script(&mut s, "room.ocli", ROOM).unwrap();
    s.run(&format!(".template:{}", template.display())).unwrap();
    s.run("+dv:R1/D1@slot1@server").unwrap();
    s.output.take();

    s.run("getslot R1 slot1").unwrap();
    assert_eq!(s.output.lines(), ["D1"]);
    let device = s.backend.get_object("/Physical/S/B/R/R1/D1").unwrap();
    assert_eq!(device["attributes"]["template"], serde_json::json!("server"));
}
