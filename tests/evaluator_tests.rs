// tests/evaluator_tests.rs

use ogree_cli::backend::MemoryBackend;
use ogree_cli::cli::CliError;
use ogree_cli::output::Output;
use ogree_cli::value::Value;
use ogree_cli::viz::RecordingViz;
use ogree_cli::{EvalError, Session};
use pretty_assertions::assert_eq;

fn session() -> Session {
    Session::new(
        Box::new(MemoryBackend::new()),
        Box::new(RecordingViz::new()),
        Output::captured(),
    )
}

fn var(session: &Session, name: &str) -> Value {
    session.env.get(name).cloned().unwrap_or(Value::Null)
}

fn eval(input: &str) -> Value {
    let mut s = session();
    s.run(&format!(".var:result={}", input))
        .unwrap_or_else(|e| panic!("{} failed:\n{}", input, e));
    var(&s, "result")
}

fn eval_err(input: &str) -> EvalError {
    let mut s = session();
    match s.run(&format!(".var:result={}", input)) {
        Err(CliError::Eval(e)) => e,
        other => panic!("{} should fail to evaluate, got {:?}", input, other),
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_integer_arithmetic() {
    assert_eq!(eval("1 + 2 * 3"), Value::Int(7));
    assert_eq!(eval("(1 + 2) * 3"), Value::Int(9));
    assert_eq!(eval("7 \\ 2"), Value::Int(3));
    assert_eq!(eval("7 % 4"), Value::Int(3));
    assert_eq!(eval("-3 + 1"), Value::Int(-2));
}

#[test]
fn test_division_gives_float() {
    assert_eq!(eval("3 / 4"), Value::Float(0.75));
    assert_eq!(eval("1.5 * 2"), Value::Float(3.0));
}

#[test]
fn test_division_by_zero() {
    assert!(matches!(eval_err("eval 10/0"), EvalError::DivisionByZero));
    assert_eq!(eval_err("eval 10/0").to_string(), "cannot divide by 0");
}

#[test]
fn test_mixed_int_and_float() {
    assert_eq!(eval("3.0 + 4"), Value::Float(7.0));
}

#[test]
fn test_overflow_is_reported() {
    let mut s = session();
    s.run(".var:m=-9223372036854775807 - 1").unwrap();
    assert_eq!(var(&s, "m"), Value::Int(i64::MIN));
    for line in [".var:x=$m % -1", ".var:x=$m \\ -1", ".var:x=-$m", ".var:x=$m - 1"] {
        let err = s.run(line).unwrap_err();
        assert_eq!(err.to_string(), "Error : integer overflow", "{}", line);
    }
    assert!(s.env.get("x").is_none());
}

#[test]
fn test_comparison_and_logic() {
    assert_eq!(eval("1 < 2 && 3 >= 3"), Value::Bool(true));
    assert_eq!(eval("1 == 1.0"), Value::Bool(true));
    assert_eq!(eval("!(2 != 2) || false"), Value::Bool(true));
    assert!(matches!(eval_err("eval 1 && true"), EvalError::Type(_)));
}

#[test]
fn test_strings() {
    assert_eq!(eval("\"rack\" + 1"), Value::from("rack1"));
    assert_eq!(eval("\"a b\""), Value::from("a b"));
    assert_eq!(eval("front"), Value::from("front"));
}

#[test]
fn test_vectors() {
    assert_eq!(eval("[1, 2.5, 3]"), Value::Vector(vec![1.0, 2.5, 3.0]));
    assert_eq!(eval("[]"), Value::Vector(Vec::new()));
}

// ============================================================================
// Variables
// ============================================================================

#[test]
fn test_interpolation() {
    let mut s = session();
    s.run(".var:i=4; .var:name=R${i}-$(($i * 2))").unwrap();
    assert_eq!(var(&s, "name"), Value::from("R4-8"));
}

#[test]
fn test_array_element() {
    let mut s = session();
    s.run(".var:size=[60, 120, 42]; .var:h=$size[2]").unwrap();
    assert_eq!(var(&s, "h"), Value::Float(42.0));

    let err = s.run(".var:h=$size[3]").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error : Index out of range\nArray length : 3\nBut desired index at : 3"
    );
}

#[test]
fn test_braced_variable_in_expression() {
    let mut s = session();
    s.run(".var:r=5; .var:n=eval ${r}+1").unwrap();
    assert_eq!(var(&s, "n"), Value::Int(6));
}

#[test]
fn test_only_arrays_can_be_indexed() {
    let mut s = session();
    s.run(".var:r=5").unwrap();
    let err = s.run(".var:x=$r[0]").unwrap_err();
    assert_eq!(err.to_string(), "Error : only an array can be indexed");
}

#[test]
fn test_alias_shares_variables() {
    let mut s = session();
    s.run(".var:i=0; alias inc { .var:i = $i + 1 }").unwrap();
    s.run("inc").unwrap();
    s.run("inc").unwrap();
    assert_eq!(var(&s, "i"), Value::Int(2));
}

#[test]
fn test_undefined_variable() {
    assert!(matches!(
        eval_err("$missing"),
        EvalError::UndefinedVariable(ref name) if name == "missing"
    ));
}

#[test]
fn test_command_result_as_value() {
    let mut s = session();
    s.run(".var:here=$(pwd)").unwrap();
    assert_eq!(var(&s, "here"), Value::from("/"));
}

#[test]
fn test_len_and_unset() {
    let mut s = session();
    s.run(".var:v=[1,2,3]; len v").unwrap();
    assert_eq!(s.output.take(), ["3"]);
    s.run("unset -v v").unwrap();
    assert!(s.env.get("v").is_none());
    assert!(s.run("unset -v v").is_err());
}

#[test]
fn test_print_and_printf() {
    let mut s = session();
    s.run(".var:n=2; printf \"%d racks at %.1f%%\", $n, 12.345").unwrap();
    assert_eq!(s.output.take(), ["2 racks at 12.3%"]);
    s.run("print format(\"R%v\", $n + 1)").unwrap();
    assert_eq!(s.output.take(), ["R3"]);
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_while_loop() {
    let mut s = session();
    s.run(".var:i=0; .var:sum=0; while $i < 5 { .var:sum=$sum+$i; .var:i=$i+1 }")
        .unwrap();
    assert_eq!(var(&s, "sum"), Value::Int(10));
}

#[test]
fn test_c_style_for() {
    let mut s = session();
    s.run(".var:acc=x; for (.var:i=0; $i < 3; .var:i=$i+1) { .var:acc=$acc+$i }")
        .unwrap();
    assert_eq!(var(&s, "acc"), Value::from("x012"));
}

#[test]
fn test_range_is_inclusive() {
    let mut s = session();
    s.run(".var:count=0; for i in 1..3 { .var:count=$count+1 }").unwrap();
    assert_eq!(var(&s, "count"), Value::Int(3));
    assert_eq!(var(&s, "i"), Value::Int(3));

    let err = s.run("for i in 3..1 { print $i }").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error : start index should be lower than end index"
    );
}

#[test]
fn test_for_over_array() {
    let mut s = session();
    s.run("for v in [1,2] { print $v }").unwrap();
    assert_eq!(s.output.take(), ["1", "2"]);
}

#[test]
fn test_if_elif_else() {
    let mut s = session();
    let script = "if $n < 0 { print neg } elif $n == 0 { print zero } else { print pos }";
    for (n, expected) in [("-1", "neg"), ("0", "zero"), ("4", "pos")] {
        s.run(&format!(".var:n={}", n)).unwrap();
        s.run(script).unwrap();
        assert_eq!(s.output.take(), [expected]);
    }
}

#[test]
fn test_condition_must_be_boolean() {
    let mut s = session();
    let err = s.run("if 1 { print x }").unwrap_err();
    assert_eq!(err.to_string(), "Error : condition should be a boolean");
}

#[test]
fn test_exit_stops_sequence() {
    let mut s = session();
    s.run("print a; exit; print b").unwrap();
    assert_eq!(s.output.take(), ["a"]);
    assert!(s.exit_requested);
}

#[test]
fn test_error_keeps_earlier_effects() {
    let mut s = session();
    assert!(s.run(".var:a=1; .var:b=$nope; .var:c=3").is_err());
    assert_eq!(var(&s, "a"), Value::Int(1));
    assert_eq!(var(&s, "c"), Value::Null);
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn test_env_lists_variables_and_settings() {
    let mut s = session();
    s.run(".var:x=1; env").unwrap();
    let lines = s.output.take();
    assert_eq!(lines[0], "x = 1");
    assert!(lines.contains(&"drawLimit : 50".to_string()));
    assert!(s.run("env colour=red").is_err());
}
