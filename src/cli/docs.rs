//! Manual pages shown by `man`

use super::CliError;

/// Topics of the manual
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManPage {
    Navigation,
    Ls,
    Tree,
    Get,
    Select,
    Create,
    Update,
    Delete,
    Link,
    Copy,
    Draw,
    Ui,
    Camera,
    Focus,
    Variables,
    Alias,
    ControlFlow,
    Print,
    Env,
    Unset,
    Scripts,
    Ogree3D,
}

impl ManPage {
    /// Parse a topic name or command keyword
    pub fn from_str(s: &str) -> Option<Self> {
        let page = match s.to_lowercase().trim() {
            "cd" | "pwd" | "navigation" | "path" | "paths" => Self::Navigation,
            "ls" | "lssite" | "lsbldg" | "lsroom" | "lsrack" | "lsdev" | "lsac" | "lspanel"
            | "lscabinet" | "lscorridor" => Self::Ls,
            "tree" => Self::Tree,
            "get" | "getu" | "getslot" => Self::Get,
            "=" | "select" | "selection" => Self::Select,
            "+" | "create" => Self::Create,
            ":" | "update" => Self::Update,
            "-" | "delete" => Self::Delete,
            "link" | "unlink" => Self::Link,
            "cp" | "copy" => Self::Copy,
            "draw" | "undraw" | "drawable" => Self::Draw,
            "ui" => Self::Ui,
            "camera" => Self::Camera,
            ">" | "focus" => Self::Focus,
            ".var" | "var" | "variables" | "len" => Self::Variables,
            "alias" | "function" | "functions" => Self::Alias,
            "if" | "for" | "while" | "control" => Self::ControlFlow,
            "print" | "printf" | "format" => Self::Print,
            "env" => Self::Env,
            "unset" => Self::Unset,
            ".cmds" | "cmds" | ".dryrun" | "dryrun" | ".template" | "template" | "scripts" => {
                Self::Scripts
            }
            "lsog" | "connect3d" | "disconnect3d" | "ogree3d" => Self::Ogree3D,
            _ => return None,
        };
        Some(page)
    }
}

/// Overview listing every topic
pub fn get_manual_overview() -> &'static str {
    r#"OGREE CLI MANUAL

Commands address objects of the datacenter model by path. Paths are
absolute (/Physical/site/bldg) or relative to the current path; P, L and O
abbreviate Physical, Logical and Organisation, _ stands for the selection
and - for the previous path. Several commands are separated by ';', text
after // is a comment.

TOPICS

  cd pwd            Moving around the hierarchy
  ls                Listing children, with filters and sorting
  tree              Drawing a subtree
  get               Fetching objects, getu and getslot for devices
  select            Selecting objects with =
  create            Creating objects with +
  update            Setting attributes with path:attr=value
  delete            Deleting objects with -
  link              Linking and unlinking stray objects
  cp                Copying tags and templates
  draw              Sending objects to OGrEE-3D
  ui camera focus   Driving the OGrEE-3D view
  var               Variables and expressions
  alias             Reusable command blocks
  if for while      Control flow
  print             Printing values and format()
  env               Session settings
  unset             Removing variables, aliases and attributes
  cmds              Running scripts and loading templates
  lsog              OGrEE-3D connection

Run 'man <topic>' for details.
"#
}

/// Page for a topic or command keyword
pub fn get_manual_page(name: &str) -> Result<&'static str, CliError> {
    match ManPage::from_str(name) {
        Some(ManPage::Navigation) => Ok(NAVIGATION_PAGE),
        Some(ManPage::Ls) => Ok(LS_PAGE),
        Some(ManPage::Tree) => Ok(TREE_PAGE),
        Some(ManPage::Get) => Ok(GET_PAGE),
        Some(ManPage::Select) => Ok(SELECT_PAGE),
        Some(ManPage::Create) => Ok(CREATE_PAGE),
        Some(ManPage::Update) => Ok(UPDATE_PAGE),
        Some(ManPage::Delete) => Ok(DELETE_PAGE),
        Some(ManPage::Link) => Ok(LINK_PAGE),
        Some(ManPage::Copy) => Ok(COPY_PAGE),
        Some(ManPage::Draw) => Ok(DRAW_PAGE),
        Some(ManPage::Ui) => Ok(UI_PAGE),
        Some(ManPage::Camera) => Ok(CAMERA_PAGE),
        Some(ManPage::Focus) => Ok(FOCUS_PAGE),
        Some(ManPage::Variables) => Ok(VARIABLES_PAGE),
        Some(ManPage::Alias) => Ok(ALIAS_PAGE),
        Some(ManPage::ControlFlow) => Ok(CONTROL_FLOW_PAGE),
        Some(ManPage::Print) => Ok(PRINT_PAGE),
        Some(ManPage::Env) => Ok(ENV_PAGE),
        Some(ManPage::Unset) => Ok(UNSET_PAGE),
        Some(ManPage::Scripts) => Ok(SCRIPTS_PAGE),
        Some(ManPage::Ogree3D) => Ok(OGREE3D_PAGE),
        None => Err(CliError::UnknownTopic(name.to_string())),
    }
}

const NAVIGATION_PAGE: &str = r#"CD, PWD

  cd [path]         Change the current path, / when omitted
  cd -              Go back to the previous path
  pwd               Print the current path

The target must exist. Examples:

  cd /P/site/bldg
  cd ..
  cd -
"#;

const LS_PAGE: &str = r#"LS

  ls [-s attr] [-f a:b:c] [-r] [path] [key=value ...]
  lssite lsbldg lsroom lsrack lsdev lsac lspanel lscabinet lscorridor

  -s attr           Sort by an attribute, numerically when possible
  -f a:b            Show attributes next to each name
  -r                Whole subtree instead of direct children
  key=value         Keep children whose attribute matches, * is a wildcard

The lsXXX forms only list children of one category. Examples:

  ls -s height
  lsrack -r /P/site category=rack name=R*
"#;

const TREE_PAGE: &str = r#"TREE

  tree [path] [depth]

Draw the subtree under path, one level when depth is omitted.
"#;

const GET_PAGE: &str = r#"GET, GETU, GETSLOT

  get path          Print an object, * in the last segment matches several
  get _             Print the selected objects
  getu rack u       Device of rack occupying unit u
  getslot rack slot Device of rack installed in slot
"#;

const SELECT_PAGE: &str = r#"SELECT

  =path             Select one object and move to it
  ={a, b}           Select children of the current path
  =                 Clear the selection
  selection         Print the selection

Most commands accept _ as a path to act on every selected object.
"#;

const CREATE_PAGE: &str = r#"CREATE

  +domain:path@color
  +site:path
  +building:path@posXY@rotation@sizeOrTemplate
  +room:path@posXY@rotation@sizeOrTemplate[@axisOrientation[@floorUnit]]
  +rack:path@position@rotation@sizeOrTemplate
  +device:path@posUOrSlot@sizeUOrTemplate[@side]
  +group:path@{child1, child2}
  +corridor:path@{rack1, rack2}@temperature
  +tag:slug@color
  +orphan device:path@template

Short forms: do si bd ro rk dv co gr. Sizes are vectors, otherwise the
value names a template. Rack rotations are vectors or one of front, rear,
left, right, top, bottom. Colors are 6 hexadecimal digits.
"#;

const UPDATE_PAGE: &str = r#"UPDATE

  path:attribute=value[@value...]

  areas=[r1,r2,r3,r4]@[t1,t2,t3,t4]         Reserved and technical areas
  separators+=name@[x,y]@[x,y]@type         Add a separator
  pillars+=name@[x,y]@[w,h]@rotation        Add a pillar
  separators-=name, pillars-=name           Remove one
  tags+=slug, tags-=slug                    Tag or untag
  description=text, domain=name[@true]      Top-level fields
  label=text, label=#attribute              Label shown in OGrEE-3D
  labelFont=bold|italic|color@hex
  labelBackground=hex
  displayContent alpha tilesName tilesColor U slots localCS = true|false

Any other attribute is stored as given.
"#;

const DELETE_PAGE: &str = r#"DELETE

  -path             Delete an object and its subtree
  -selection        Delete the selected objects
"#;

const LINK_PAGE: &str = r#"LINK, UNLINK

  link:source@destination[@slot]    Move a stray object into the hierarchy
  unlink source[@destination]       Move an object out, to Stray by default
"#;

const DRAW_PAGE: &str = r#"DRAW, UNDRAW, DRAWABLE

  draw [-f] [path] [depth]
  undraw [path]
  drawable path [attribute]

draw refuses to send more objects than drawLimit unless -f is given.
Only categories listed in the drawable setting are sent.
"#;

const UI_PAGE: &str = r#"UI

  ui.delay=seconds
  ui.debug=bool, ui.infos=bool, ui.wireframe=bool
  ui.highlight=path, ui.hl=path
  ui.clearcache
"#;

const CAMERA_PAGE: &str = r#"CAMERA

  camera.move=[x,y,z]@[rx,ry]
  camera.translate=[x,y,z]@[rx,ry]
  camera.wait=seconds
"#;

const FOCUS_PAGE: &str = r#"FOCUS

  >path             Focus OGrEE-3D on an object and move to it
  >                 Reset the focus
"#;

const VARIABLES_PAGE: &str = r#"VARIABLES

  .var:name=value
  $name, ${name}, $name[index]
  $((expression))
  len name

Values are booleans, integers, floats, strings, vectors and objects.
Arithmetic: + - * / \ %, / always gives a float and \ is floor division.
Comparison: == != < <= > >=, logic: && || !.
"#;

const ALIAS_PAGE: &str = r#"ALIAS

  alias name { commands }
  name              Run the alias
"#;

const CONTROL_FLOW_PAGE: &str = r#"IF, FOR, WHILE

  if condition { ... } elif condition { ... } else { ... }
  while condition { ... }
  for i in 0..4 { ... }
  for v in $array { ... }
  for (init; condition; step) { ... }

Ranges include both bounds.
"#;

const PRINT_PAGE: &str = r#"PRINT, PRINTF

  print value
  printf format, args...
  format(format, args...)

Verbs: %v %s %d %f %.Nf %g, %% for a literal percent sign.
"#;

const ENV_PAGE: &str = r#"ENV

  env               Print variables and settings
  env updates=bool  Forward changes to OGrEE-3D
  env drawLimit=n   Objects draw sends without -f
  env drawable=a,b  Categories draw sends
"#;

const UNSET_PAGE: &str = r#"UNSET

  unset -v name     Remove a variable
  unset -f name     Remove an alias
  unset path:attr   Remove an attribute
  unset path:attr[i] Remove one element of a vector attribute
"#;

const COPY_PAGE: &str = r#"CP

  cp source destination

Copies a tag or a template. The destination is the new slug, or a path in
the same collection as the source.
"#;

const SCRIPTS_PAGE: &str = r#".CMDS, .DRYRUN, .TEMPLATE

  .cmds:file.ocli       Run every line of a script
  .dryrun:file.ocli     Report the syntax errors of a script without running it
  .template:file.json   Upload a template

Scripts keep going after a failing line and report every failure at the
end. A line ending with \ continues on the next one.
"#;

const OGREE3D_PAGE: &str = r#"LSOG, CONNECT3D

  lsog              Print the API and OGrEE-3D addresses
  connect3d [url]   Connect to OGrEE-3D
  disconnect3d      Close the connection
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_resolve_to_pages() {
        assert_eq!(ManPage::from_str("lsrack"), Some(ManPage::Ls));
        assert_eq!(ManPage::from_str("+"), Some(ManPage::Create));
        assert_eq!(ManPage::from_str("Camera"), Some(ManPage::Camera));
        assert!(get_manual_page("draw").unwrap().contains("drawLimit"));
    }

    #[test]
    fn test_unknown_topic() {
        assert!(matches!(
            get_manual_page("nope"),
            Err(CliError::UnknownTopic(t)) if t == "nope"
        ));
    }
}
