// tests/parser_tests.rs

use ogree_cli::ast::{
    ArithOp, CameraCommand, CreateCommand, EntityKind, EqualityOp, LsArgs, Node, UiCommand,
};
use ogree_cli::parser::{parse, parse_expression};
use ogree_cli::value::Value;
use pretty_assertions::assert_eq;

fn int(n: i64) -> Node {
    Node::Literal(Value::Int(n))
}

fn float(n: f64) -> Node {
    Node::Literal(Value::Float(n))
}

fn sym(name: &str) -> Node {
    Node::Symbol(name.to_string())
}

fn array(items: &[i64]) -> Node {
    Node::Array(items.iter().map(|n| int(*n)).collect())
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_precedence() {
    let node = parse_expression("1 + 2 * 3").unwrap();
    assert_eq!(
        node,
        Node::Arith {
            op: ArithOp::Add,
            left: int(1).boxed(),
            right: Node::Arith {
                op: ArithOp::Mul,
                left: int(2).boxed(),
                right: int(3).boxed(),
            }
            .boxed(),
        }
    );
}

#[test]
fn test_parentheses() {
    let node = parse_expression("(1 + 2) * 3").unwrap();
    assert!(matches!(
        node,
        Node::Arith {
            op: ArithOp::Mul,
            ..
        }
    ));
}

#[test]
fn test_array_element() {
    let node = parse_expression("$size[1] * 2.5").unwrap();
    assert_eq!(
        node,
        Node::Arith {
            op: ArithOp::Mul,
            left: Node::ArrayRef {
                name: "size".to_string(),
                index: int(1).boxed(),
            }
            .boxed(),
            right: float(2.5).boxed(),
        }
    );
}

#[test]
fn test_trailing_garbage_is_an_error() {
    assert!(parse_expression("1 + 2 )").is_err());
}

// ============================================================================
// Variables and values
// ============================================================================

#[test]
fn test_sequence() {
    let node = parse(".var:a=1; .var:a=2").unwrap();
    assert_eq!(
        node,
        Node::Sequence(vec![
            Node::Assign {
                name: "a".to_string(),
                value: int(1).boxed(),
            },
            Node::Assign {
                name: "a".to_string(),
                value: int(2).boxed(),
            },
        ])
    );
}

#[test]
fn test_assign_expression() {
    let node = parse(".var:i = $i + 1").unwrap();
    assert_eq!(
        node,
        Node::Assign {
            name: "i".to_string(),
            value: Node::Arith {
                op: ArithOp::Add,
                left: sym("i").boxed(),
                right: int(1).boxed(),
            }
            .boxed(),
        }
    );
}

#[test]
fn test_value_falls_back_to_text() {
    let node = parse(".var:side=front").unwrap();
    assert_eq!(
        node,
        Node::Assign {
            name: "side".to_string(),
            value: Node::string("front").boxed(),
        }
    );

    // an expression that does not reach the end of the value is text
    let node = parse(".var:color=00ff00").unwrap();
    assert_eq!(
        node,
        Node::Assign {
            name: "color".to_string(),
            value: Node::string("00ff00").boxed(),
        }
    );
}

#[test]
fn test_interpolated_text() {
    let node = parse(".var:name=R$(($i+1))").unwrap();
    assert_eq!(
        node,
        Node::Assign {
            name: "name".to_string(),
            value: Node::Format {
                template: "R%v".to_string(),
                args: vec![Node::Arith {
                    op: ArithOp::Add,
                    left: sym("i").boxed(),
                    right: int(1).boxed(),
                }],
            }
            .boxed(),
        }
    );
}

#[test]
fn test_percent_is_escaped_in_templates() {
    let node = parse("print 50% of $n").unwrap();
    assert_eq!(
        node,
        Node::Print(
            Node::Format {
                template: "50%% of %v".to_string(),
                args: vec![sym("n")],
            }
            .boxed()
        )
    );
}

#[test]
fn test_printf() {
    let node = parse("printf \"%d racks\", $n").unwrap();
    assert_eq!(
        node,
        Node::Print(
            Node::Printf {
                format: Node::string("%d racks").boxed(),
                args: vec![sym("n")],
            }
            .boxed()
        )
    );
}

#[test]
fn test_unset_vector_element() {
    let node = parse("unset R1:separators[0]").unwrap();
    assert_eq!(
        node,
        Node::UnsetAttr {
            path: Node::path("R1").boxed(),
            attr: "separators".to_string(),
            index: Some(int(0).boxed()),
        }
    );
    assert_eq!(parse("unset -v count").unwrap(), Node::UnsetVar("count".to_string()));
}

// ============================================================================
// Navigation
// ============================================================================

#[test]
fn test_cd_with_comment() {
    let node = parse("cd /P/site // go to the site").unwrap();
    assert_eq!(node, Node::Cd(Node::path("/P/site").boxed()));
    assert_eq!(parse("cd").unwrap(), Node::Cd(Node::path("/").boxed()));
}

#[test]
fn test_ls_arguments_and_filters() {
    let node = parse("ls -s height -f name:height /P/site category=rack").unwrap();
    assert_eq!(
        node,
        Node::Ls(LsArgs {
            path: Node::path("/P/site").boxed(),
            category: None,
            sort: Some("height".to_string()),
            attrs: vec!["name".to_string(), "height".to_string()],
            filters: vec![("category".to_string(), Node::string("rack"))],
            recursive: false,
        })
    );
}

#[test]
fn test_ls_filters_only() {
    let Node::Ls(args) = parse("ls category=rack").unwrap() else {
        panic!("ls expected");
    };
    assert_eq!(*args.path, Node::path("."));
    assert_eq!(args.filters.len(), 1);
}

#[test]
fn test_category_ls() {
    let Node::Ls(args) = parse("lsrack -r /P/site").unwrap() else {
        panic!("ls expected");
    };
    assert_eq!(args.category, Some(EntityKind::Rack));
    assert!(args.recursive);
}

#[test]
fn test_keyword_must_end_at_word_boundary() {
    assert_eq!(parse("lsx").unwrap(), Node::FuncCall("lsx".to_string()));
    assert_eq!(parse("tree2").unwrap(), Node::FuncCall("tree2".to_string()));
}

#[test]
fn test_keyword_needs_a_separator() {
    for input in ["cd/P", "print\"x\"", "getu[1]"] {
        let err = parse(input).unwrap_err();
        assert_eq!(err.message, "unknown keyword", "{}", input);
        assert_eq!(err.position, 0);
    }
    assert!(parse("pwd; cd /P").is_ok());
    assert!(parse("while true { pwd }").is_ok());
}

#[test]
fn test_tree_depth() {
    let node = parse("tree /P 2").unwrap();
    assert_eq!(
        node,
        Node::Tree {
            path: Node::path("/P").boxed(),
            depth: Some(int(2).boxed()),
        }
    );
}

// ============================================================================
// Selection and mutation
// ============================================================================

#[test]
fn test_select_children() {
    let node = parse("={R1, R2}").unwrap();
    assert_eq!(
        node,
        Node::SelectChildren(vec![Node::path("R1"), Node::path("R2")])
    );
    assert_eq!(parse("=").unwrap(), Node::Select(None));
}

#[test]
fn test_delete() {
    assert_eq!(parse("-selection").unwrap(), Node::DeleteSelection);
    assert_eq!(
        parse("-R1").unwrap(),
        Node::Delete(Node::path("R1").boxed())
    );
    assert_eq!(
        parse("-selectionR").unwrap(),
        Node::Delete(Node::path("selectionR").boxed())
    );
}

#[test]
fn test_create_rack() {
    let node = parse("+rack:R1@[1,2]@front@[60,120,42]").unwrap();
    assert_eq!(
        node,
        Node::Create(Box::new(CreateCommand::Rack {
            path: Node::path("R1"),
            position: array(&[1, 2]),
            rotation: Node::string("front"),
            size_or_template: array(&[60, 120, 42]),
        }))
    );
}

#[test]
fn test_create_room_with_optional_values() {
    let node = parse("+ro:ROOM@[0,0]@0@[10,10,3]@+x+y@m").unwrap();
    let Node::Create(command) = node else {
        panic!("create expected");
    };
    let CreateCommand::Room {
        axis_orientation,
        floor_unit,
        ..
    } = *command
    else {
        panic!("room expected");
    };
    assert_eq!(axis_orientation, Some(Node::string("+x+y")));
    assert_eq!(floor_unit, Some(Node::string("m")));
}

#[test]
fn test_create_device_in_slot() {
    let node = parse("+dv:R1/D1@slot1@server-tpl").unwrap();
    assert_eq!(
        node,
        Node::Create(Box::new(CreateCommand::Device {
            path: Node::path("R1/D1"),
            pos_u_or_slot: Node::string("slot1"),
            size_u_or_template: Node::string("server-tpl"),
            side: None,
        }))
    );
}

#[test]
fn test_create_corridor_needs_two_racks() {
    let node = parse("+co:C1@{R1,R2}@cold").unwrap();
    assert!(matches!(
        node,
        Node::Create(ref c) if matches!(**c, CreateCommand::Corridor { .. })
    ));

    let err = parse("+co:C1@{R1,R2,R3}@cold").unwrap_err();
    assert_eq!(err.message, "only 2 racks expected");
}

#[test]
fn test_unknown_object_type() {
    let err = parse("+foo:x").unwrap_err();
    assert_eq!(err.message, "unknown object type");
    assert_eq!(err.position, 1);
}

#[test]
fn test_update() {
    let node = parse("R1:color=ff0000").unwrap();
    assert_eq!(
        node,
        Node::Update {
            path: Node::path("R1").boxed(),
            attr: "color".to_string(),
            values: vec![Node::string("ff0000")],
            sharp: false,
        }
    );
}

#[test]
fn test_update_with_several_values() {
    let node = parse("R1:separators+=s1@[0,0]@[1,1]@wireframe").unwrap();
    let Node::Update { attr, values, .. } = node else {
        panic!("update expected");
    };
    assert_eq!(attr, "separators+");
    assert_eq!(values.len(), 4);
    assert_eq!(values[1], array(&[0, 0]));
}

#[test]
fn test_sharp_update() {
    let node = parse("R1:label=#name").unwrap();
    assert!(matches!(node, Node::Update { sharp: true, .. }));
}

#[test]
fn test_link() {
    let node = parse("link:/Physical/Stray/D1@/P/S/B/R/R1@slot2").unwrap();
    assert_eq!(
        node,
        Node::Link {
            source: Node::path("/Physical/Stray/D1").boxed(),
            dest: Node::path("/P/S/B/R/R1").boxed(),
            slot: Some(Node::string("slot2").boxed()),
        }
    );
}

#[test]
fn test_copy() {
    let Node::Copy { source, .. } = parse("cp /L/Tags/red blue").unwrap() else {
        panic!("copy expected");
    };
    assert_eq!(*source, Node::path("/L/Tags/red"));
}

#[test]
fn test_dry_run_is_not_a_load() {
    assert!(matches!(
        parse(".dryrun:room.ocli").unwrap(),
        Node::DryRun(_)
    ));
    assert!(matches!(
        parse(".cmds:room.ocli").unwrap(),
        Node::LoadScript(_)
    ));
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_for_range() {
    let node = parse("for i in 1..3 { print $i }").unwrap();
    assert_eq!(
        node,
        Node::ForRange {
            var: "i".to_string(),
            start: int(1).boxed(),
            end: int(3).boxed(),
            body: Node::Print(
                Node::Format {
                    template: "%v".to_string(),
                    args: vec![sym("i")],
                }
                .boxed()
            )
            .boxed(),
        }
    );
}

#[test]
fn test_for_array() {
    let node = parse("for x in $list { print $x }").unwrap();
    assert!(matches!(node, Node::ForArray { ref var, .. } if var == "x"));
}

#[test]
fn test_c_style_for() {
    let node = parse("for (.var:i=0; $i < 3; .var:i=$i+1) { print $i }").unwrap();
    let Node::For { init, step, .. } = node else {
        panic!("for expected");
    };
    assert!(matches!(*init, Node::Assign { .. }));
    assert!(matches!(*step, Node::Assign { .. }));
}

#[test]
fn test_if_else() {
    let node = parse("if $a == 1 { print yes } else { print no }").unwrap();
    assert_eq!(
        node,
        Node::If {
            condition: Node::Equality {
                op: EqualityOp::Equal,
                left: sym("a").boxed(),
                right: int(1).boxed(),
            }
            .boxed(),
            body: Node::Print(Node::string("yes").boxed()).boxed(),
            otherwise: Some(Node::Print(Node::string("no").boxed()).boxed()),
        }
    );
}

#[test]
fn test_elif_chains_into_nested_if() {
    let node = parse("if $a < 0 { print neg } elif $a > 0 { print pos } else { print zero }")
        .unwrap();
    let Node::If {
        otherwise: Some(otherwise),
        ..
    } = node
    else {
        panic!("if expected");
    };
    assert!(matches!(
        *otherwise,
        Node::If {
            otherwise: Some(_),
            ..
        }
    ));
}

#[test]
fn test_alias() {
    let node = parse("alias reset { cd /; = }").unwrap();
    assert_eq!(
        node,
        Node::FuncDef {
            name: "reset".to_string(),
            body: Node::Sequence(vec![Node::Cd(Node::path("/").boxed()), Node::Select(None)])
                .boxed(),
        }
    );
}

// ============================================================================
// 3D commands
// ============================================================================

#[test]
fn test_ui_and_camera() {
    assert_eq!(
        parse("ui.delay=0.5").unwrap(),
        Node::Ui(UiCommand::Delay(float(0.5).boxed()))
    );
    assert_eq!(
        parse("camera.move=[1,2,3]@[0,90]").unwrap(),
        Node::Camera(CameraCommand::Move {
            command: "move".to_string(),
            position: array(&[1, 2, 3]).boxed(),
            rotation: array(&[0, 90]).boxed(),
        })
    );
}

#[test]
fn test_draw_force() {
    let node = parse("draw -f R1 2").unwrap();
    assert_eq!(
        node,
        Node::Draw {
            path: Node::path("R1").boxed(),
            depth: Some(int(2).boxed()),
            force: true,
        }
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_error_display() {
    let err = parse(".var:=3").unwrap_err();
    assert_eq!(
        err.to_string(),
        ".var:=3\n     ^\nparsing stack : command -> .var:\nError : variable name expected"
    );
}

#[test]
fn test_update_without_attribute_separator() {
    let err = parse("R1 color").unwrap_err();
    assert_eq!(err.message, "unknown command");
}
