use crate::ast::{ArithOp, CameraCommand, CompareOp, CreateCommand, EqualityOp, LogicOp, LsArgs, UiCommand};
use crate::value::Value;

/// A node of the abstract syntax tree.
///
/// Every command line parses into exactly one `Node`, possibly a
/// [`Node::Sequence`]. Nodes own their children and are never mutated after
/// parsing; evaluation is done by `Node::execute` in the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Empty command
    Nop,

    // Expressions
    /// Literal value: bool, int, float or plain string
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 3.5
    /// true
    /// "rack"
    /// ```
    Literal(Value),

    /// Variable reference
    ///
    /// # Examples
    /// ```text
    /// $x
    /// ${x}
    /// ```
    Symbol(String),

    /// Element of a vector variable
    ///
    /// # Example
    /// ```text
    /// $size[0]
    /// ```
    ArrayRef { name: String, index: Box<Node> },

    /// Vector literal, every element evaluates to a number
    ///
    /// # Example
    /// ```text
    /// [60, 120, $height]
    /// ```
    Array(Vec<Node>),

    /// Text with interpolated values.
    ///
    /// `template` holds one `%v` per argument; a literal `%` is written `%%`.
    ///
    /// # Examples
    /// ```text
    /// rack$i
    /// "R${n}-$((2 * $i))"
    /// ```
    Format { template: String, args: Vec<Node> },

    /// `format(fmt, args...)`, printf-style formatting
    Printf { format: Box<Node>, args: Vec<Node> },

    /// Path expression, resolved against the current path when evaluated
    Path(Box<Node>),

    Arith {
        op: ArithOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Compare {
        op: CompareOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Equality {
        op: EqualityOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Logic {
        op: LogicOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// Unary `-`
    Negate(Box<Node>),
    /// Unary `!`
    Not(Box<Node>),

    // Variables and aliases
    /// `.var:name=value`
    Assign { name: String, value: Box<Node> },
    /// `alias name { body }`
    FuncDef { name: String, body: Box<Node> },
    /// Invocation of an alias by its bare name
    FuncCall(String),
    /// `unset -v name`
    UnsetVar(String),
    /// `unset -f name`
    UnsetFunc(String),
    /// `unset path:attr` or `unset path:attr[index]`
    UnsetAttr {
        path: Box<Node>,
        attr: String,
        index: Option<Box<Node>>,
    },
    /// `len name`
    Len(String),
    Print(Box<Node>),
    /// `env` without arguments
    Env,
    /// `env name=value`
    SetEnv { name: String, value: Box<Node> },

    // Control flow
    /// Statements joined by `;`, only built for two or more statements
    Sequence(Vec<Node>),
    If {
        condition: Box<Node>,
        body: Box<Node>,
        otherwise: Option<Box<Node>>,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
    },
    /// `for (init; condition; step) { body }`
    For {
        init: Box<Node>,
        condition: Box<Node>,
        step: Box<Node>,
        body: Box<Node>,
    },
    /// `for i in start..end { body }`, both bounds included
    ForRange {
        var: String,
        start: Box<Node>,
        end: Box<Node>,
        body: Box<Node>,
    },
    /// `for v in $array { body }`
    ForArray {
        var: String,
        array: Box<Node>,
        body: Box<Node>,
    },

    // Navigation and inspection
    Cd(Box<Node>),
    Pwd,
    Ls(LsArgs),
    Tree { path: Box<Node>, depth: Option<Box<Node>> },
    Get(Box<Node>),
    GetU { path: Box<Node>, u: Box<Node> },
    GetSlot { path: Box<Node>, slot: Box<Node> },

    // Selection
    /// `=path`, or `=` alone to clear the selection
    Select(Option<Box<Node>>),
    /// `={path1, path2}`
    SelectChildren(Vec<Node>),
    /// `selection`
    PrintSelection,

    // Mutation
    Create(Box<CreateCommand>),
    /// `path:attr=value[@value...]`, `sharp` is set by a leading `#`
    Update {
        path: Box<Node>,
        attr: String,
        values: Vec<Node>,
        sharp: bool,
    },
    Delete(Box<Node>),
    DeleteSelection,
    Link {
        source: Box<Node>,
        dest: Box<Node>,
        slot: Option<Box<Node>>,
    },
    Unlink {
        source: Box<Node>,
        dest: Option<Box<Node>>,
    },
    /// `cp source dest`, a tag or template copied under a new slug
    Copy { source: Box<Node>, dest: Box<Node> },

    // 3D visualization
    Draw {
        path: Box<Node>,
        depth: Option<Box<Node>>,
        force: bool,
    },
    Undraw(Option<Box<Node>>),
    Drawable { path: Box<Node>, attr: Option<String> },
    Ui(UiCommand),
    Camera(CameraCommand),
    /// `>path`, or `>` alone to reset the focus
    Focus(Option<Box<Node>>),
    Connect3D(Option<Box<Node>>),
    Disconnect3D,

    // Scripting and session
    /// `.cmds:file.ocli`
    LoadScript(Box<Node>),
    /// `.dryrun:file.ocli`, syntax check without running
    DryRun(Box<Node>),
    /// `.template:file.json`
    LoadTemplate(Box<Node>),
    Man(Option<String>),
    Lsog,
    Clear,
    Exit,
}

impl Node {
    pub fn boxed(self) -> Box<Node> {
        Box::new(self)
    }

    pub fn string(s: impl Into<String>) -> Node {
        Node::Literal(Value::Str(s.into()))
    }

    /// Path node around a literal path.
    pub fn path(s: impl Into<String>) -> Node {
        Node::Path(Node::string(s).boxed())
    }
}
