use std::collections::HashMap;

use super::{PResult, Parser, TextMode};
use crate::{
    ast::{CameraCommand, CreateCommand, EntityKind, LsArgs, Node, UiCommand},
    lexer::is_alphanumeric,
};

/// Every keyword that starts a command.
pub(crate) const KEYWORDS: &[&str] = &[
    // commands taking arguments
    "ls",
    "get",
    "getu",
    "getslot",
    "undraw",
    "draw",
    "drawable",
    "unset",
    "env",
    "+",
    "-",
    "=",
    ".var:",
    ".cmds:",
    ".dryrun:",
    ".template:",
    "len",
    "link:",
    "unlink",
    "cp",
    "print",
    "printf",
    "man",
    "cd",
    "tree",
    "ui.",
    "camera.",
    ">",
    "while",
    "for",
    "if",
    "alias",
    "connect3d",
    // commands without arguments
    "selection",
    "clear",
    "lsog",
    "pwd",
    "exit",
    "disconnect3d",
    // ls restricted to a category
    "lssite",
    "lsbldg",
    "lsroom",
    "lsrack",
    "lsdev",
    "lsac",
    "lspanel",
    "lscabinet",
    "lscorridor",
];

const CREATE_TYPES: &[&str] = &[
    "domain", "do", "site", "si", "building", "bldg", "bd", "room", "ro", "rack", "rk", "device",
    "dv", "corridor", "co", "group", "gr", "tag", "orphan",
];

const UI_COMMANDS: &[&str] = &[
    "clearcache",
    "delay",
    "debug",
    "infos",
    "wireframe",
    "highlight",
    "hl",
];

const CAMERA_COMMANDS: &[&str] = &["move", "translate", "wait"];

fn ls_category(keyword: &str) -> Option<EntityKind> {
    let kind = match keyword {
        "lssite" => EntityKind::Site,
        "lsbldg" => EntityKind::Building,
        "lsroom" => EntityKind::Room,
        "lsrack" => EntityKind::Rack,
        "lsdev" => EntityKind::Device,
        "lsac" => EntityKind::AirConditioner,
        "lspanel" => EntityKind::Panel,
        "lscabinet" => EntityKind::Cabinet,
        "lscorridor" => EntityKind::Corridor,
        _ => return None,
    };
    Some(kind)
}

type Args = HashMap<String, String>;

impl Parser {
    /// Statements separated by `;`. Empty statements are dropped.
    pub(crate) fn parse_command(&mut self, name: &str) -> PResult<Node> {
        self.traced(name, |p| {
            let mut statements = Vec::new();
            loop {
                let node = p.parse_single_command()?;
                if !matches!(node, Node::Nop) {
                    statements.push(node);
                }
                p.skip_whitespace();
                if !p.parse_exact(";") {
                    break;
                }
            }
            Ok(match statements.len() {
                0 => Node::Nop,
                1 => statements.remove(0),
                _ => Node::Sequence(statements),
            })
        })
    }

    fn parse_single_command(&mut self) -> PResult<Node> {
        self.traced("command", |p| {
            p.skip_whitespace();
            if p.command_end() {
                return Ok(Node::Nop);
            }
            let start = p.pos();
            if let Some(keyword) = p.parse_keyword(KEYWORDS) {
                let separated = p
                    .lexer
                    .current_char()
                    .is_none_or(|c| c.is_whitespace() || ";})".contains(c));
                if keyword.ends_with(is_alphanumeric) && !separated {
                    p.seek(start);
                    return p.error("unknown keyword");
                }
                return p.parse_keyword_command(&keyword);
            }

            let word = p.parse_simple_word("")?;
            if !word.is_empty() && p.command_end() {
                return Ok(Node::FuncCall(word));
            }
            p.seek(start);
            p.parse_update()
        })
    }

    fn parse_keyword_command(&mut self, keyword: &str) -> PResult<Node> {
        if let Some(category) = ls_category(keyword) {
            return self.traced(keyword, |p| p.parse_ls(Some(category)));
        }
        self.traced(keyword, |p| match keyword {
            "ls" => p.parse_ls(None),
            "get" => Ok(Node::Get(p.parse_path("")?.boxed())),
            "getu" => p.parse_getu(),
            "getslot" => p.parse_getslot(),
            "undraw" => p.parse_undraw(),
            "draw" => p.parse_draw(),
            "drawable" => p.parse_drawable(),
            "unset" => p.parse_unset(),
            "env" => p.parse_env(),
            "+" => p.parse_create(),
            "-" => p.parse_delete(),
            "=" => p.parse_select(),
            ".var:" => p.parse_assign(),
            ".cmds:" => Ok(Node::LoadScript(p.parse_string("script file")?.boxed())),
            ".dryrun:" => Ok(Node::DryRun(p.parse_string("script file")?.boxed())),
            ".template:" => Ok(Node::LoadTemplate(p.parse_string("template file")?.boxed())),
            "len" => p.parse_len(),
            "link:" => p.parse_link(),
            "unlink" => p.parse_unlink(),
            "cp" => p.parse_copy(),
            "print" => Ok(Node::Print(p.parse_string("")?.boxed())),
            "printf" => p.parse_printf(),
            "man" => p.parse_man(),
            "cd" => p.parse_cd(),
            "tree" => p.parse_tree(),
            "ui." => p.parse_ui(),
            "camera." => p.parse_camera(),
            ">" => p.parse_focus(),
            "while" => p.parse_while(),
            "for" => p.parse_for(),
            "if" => p.parse_if(),
            "alias" => p.parse_alias(),
            "connect3d" => p.parse_connect3d(),
            "selection" => Ok(Node::PrintSelection),
            "clear" => Ok(Node::Clear),
            "lsog" => Ok(Node::Lsog),
            "pwd" => Ok(Node::Pwd),
            "exit" => Ok(Node::Exit),
            "disconnect3d" => Ok(Node::Disconnect3D),
            _ => p.error(format!("unknown command {}", keyword)),
        })
    }

    // ------------------------------------------------------------------
    // Arguments
    // ------------------------------------------------------------------

    /// Leading `-x [value]` arguments. Stops at the first `-` that is not
    /// followed by a letter, so `-` (previous path) stays a path.
    fn parse_args(&mut self, with_value: &[&str], flags: &[&str]) -> PResult<Args> {
        self.traced("arguments", |p| {
            let mut args = Args::new();
            loop {
                p.skip_whitespace();
                let start = p.pos();
                if !(p.lexer.current_char() == Some('-')
                    && p.lexer.peek_char(1).is_some_and(|c| c.is_alphabetic()))
                {
                    return Ok(args);
                }
                p.lexer.advance();
                let name = p.parse_simple_word("")?;
                if flags.contains(&name.as_str()) {
                    args.insert(name, String::new());
                } else if with_value.contains(&name.as_str()) {
                    let value = p.parse_arg_value()?;
                    args.insert(name, value);
                } else {
                    return p.error_at(start, format!("unexpected argument : {}", name));
                }
            }
        })
    }

    /// A quoted string, or words joined by `:` (`-f name:height`).
    fn parse_arg_value(&mut self) -> PResult<String> {
        self.traced("argument value", |p| {
            p.skip_whitespace();
            if p.parse_exact("\"") {
                let start = p.pos();
                while p.lexer.current_char().is_some_and(|c| c != '"') {
                    p.lexer.advance();
                }
                let value = p.lexer.slice(start, p.pos());
                p.expect("\"")?;
                p.skip_whitespace();
                return Ok(value);
            }
            let mut words = Vec::new();
            loop {
                words.push(p.parse_complex_word("")?);
                if !p.parse_exact(":") {
                    break;
                }
            }
            if words.iter().all(String::is_empty) {
                return p.error("argument value expected");
            }
            Ok(words.join(":"))
        })
    }

    fn parse_at(&mut self) -> PResult<()> {
        self.skip_whitespace();
        self.expect("@")
    }

    fn parse_body(&mut self) -> PResult<Node> {
        self.traced("body", |p| {
            p.skip_whitespace();
            p.expect("{")?;
            let body = p.parse_command("")?;
            p.skip_whitespace();
            p.expect("}")?;
            Ok(body)
        })
    }

    /// Path up to the end of the command, `.` when there is none.
    fn parse_optional_path(&mut self) -> PResult<Option<Node>> {
        if self.command_end() {
            Ok(None)
        } else {
            self.parse_path("").map(Some)
        }
    }

    // ------------------------------------------------------------------
    // Navigation and inspection
    // ------------------------------------------------------------------

    fn parse_ls(&mut self, category: Option<EntityKind>) -> PResult<Node> {
        let args = self.parse_args(&["s", "f"], &["r"])?;

        // `ls category=rack` filters the current path
        let start = self.pos();
        let word = self.parse_simple_word("")?;
        let filters_only = !word.is_empty() && self.peek_is("=");
        self.seek(start);
        let path = if filters_only || self.command_end() {
            Node::path(".")
        } else {
            self.parse_path("")?
        };

        let mut filters = Vec::new();
        while !self.command_end() {
            let key = self.parse_complex_word("filter")?;
            if key.is_empty() {
                return self.error("filter expected");
            }
            self.expect("=")?;
            let value = self.parse_text(TextMode::Path, true)?;
            filters.push((key, value));
        }

        Ok(Node::Ls(LsArgs {
            path: path.boxed(),
            category,
            sort: args.get("s").cloned(),
            attrs: args
                .get("f")
                .map(|f| f.split(':').map(str::to_string).collect())
                .unwrap_or_default(),
            filters,
            recursive: args.contains_key("r"),
        }))
    }

    fn parse_cd(&mut self) -> PResult<Node> {
        let path = self.parse_optional_path()?.unwrap_or_else(|| Node::path("/"));
        Ok(Node::Cd(path.boxed()))
    }

    fn parse_tree(&mut self) -> PResult<Node> {
        let path = self.parse_optional_path()?.unwrap_or_else(|| Node::path("."));
        let depth = if self.command_end() {
            None
        } else {
            Some(self.parse_expr("depth")?.boxed())
        };
        Ok(Node::Tree {
            path: path.boxed(),
            depth,
        })
    }

    fn parse_getu(&mut self) -> PResult<Node> {
        let path = self.parse_path("rack")?;
        let u = self.parse_expr("u")?;
        Ok(Node::GetU {
            path: path.boxed(),
            u: u.boxed(),
        })
    }

    fn parse_getslot(&mut self) -> PResult<Node> {
        let path = self.parse_path("rack")?;
        let slot = self.parse_value()?;
        Ok(Node::GetSlot {
            path: path.boxed(),
            slot: slot.boxed(),
        })
    }

    fn parse_man(&mut self) -> PResult<Node> {
        if self.command_end() {
            return Ok(Node::Man(None));
        }
        let start = self.pos();
        while self
            .lexer
            .current_char()
            .is_some_and(|c| !c.is_whitespace() && !";})".contains(c))
        {
            self.lexer.advance();
        }
        Ok(Node::Man(Some(self.lexer.slice(start, self.pos()))))
    }

    // ------------------------------------------------------------------
    // Variables and aliases
    // ------------------------------------------------------------------

    fn parse_assign(&mut self) -> PResult<Node> {
        let name = self.parse_simple_word("variable name")?;
        if name.is_empty() {
            return self.error("variable name expected");
        }
        self.expect("=")?;
        let value = self.parse_value()?;
        Ok(Node::Assign {
            name,
            value: value.boxed(),
        })
    }

    fn parse_len(&mut self) -> PResult<Node> {
        let name = self.parse_simple_word("variable name")?;
        if name.is_empty() {
            return self.error("variable name expected");
        }
        Ok(Node::Len(name))
    }

    fn parse_env(&mut self) -> PResult<Node> {
        if self.command_end() {
            return Ok(Node::Env);
        }
        let name = self.parse_simple_word("setting")?;
        self.expect("=")?;
        let value = self.parse_value()?;
        Ok(Node::SetEnv {
            name,
            value: value.boxed(),
        })
    }

    fn parse_unset(&mut self) -> PResult<Node> {
        let args = self.parse_args(&["f", "v"], &[])?;
        if let Some(name) = args.get("f") {
            return Ok(Node::UnsetFunc(name.clone()));
        }
        if let Some(name) = args.get("v") {
            return Ok(Node::UnsetVar(name.clone()));
        }

        let path = self.parse_path("")?;
        self.expect(":")?;
        let attr = self.parse_complex_word("attribute")?;
        if attr.is_empty() {
            return self.error("attribute name expected");
        }
        let index = if self.parse_exact("[") {
            let index = self.parse_expr("index")?;
            self.expect("]")?;
            Some(index.boxed())
        } else {
            None
        };
        Ok(Node::UnsetAttr {
            path: path.boxed(),
            attr,
            index,
        })
    }

    fn parse_alias(&mut self) -> PResult<Node> {
        let name = self.parse_simple_word("alias name")?;
        if name.is_empty() {
            return self.error("alias name expected");
        }
        let body = self.parse_body()?;
        Ok(Node::FuncDef {
            name,
            body: body.boxed(),
        })
    }

    /// `printf "format", args...`
    fn parse_printf(&mut self) -> PResult<Node> {
        let mut args = Vec::new();
        loop {
            args.push(self.parse_expr("")?);
            if !self.parse_exact(",") {
                break;
            }
        }
        let mut args = args.into_iter();
        let Some(format) = args.next() else {
            return self.error("format expected");
        };
        Ok(Node::Print(
            Node::Printf {
                format: format.boxed(),
                args: args.collect(),
            }
            .boxed(),
        ))
    }

    // ------------------------------------------------------------------
    // Control flow
    // ------------------------------------------------------------------

    fn parse_while(&mut self) -> PResult<Node> {
        let condition = self.parse_expr("condition")?;
        let body = self.parse_body()?;
        Ok(Node::While {
            condition: condition.boxed(),
            body: body.boxed(),
        })
    }

    fn parse_if(&mut self) -> PResult<Node> {
        let condition = self.parse_expr("condition")?;
        let body = self.parse_body()?;
        self.skip_whitespace();
        let otherwise = if self.parse_exact("elif") {
            Some(self.traced("elif", |p| p.parse_if())?.boxed())
        } else if self.parse_exact("else") {
            Some(self.parse_body()?.boxed())
        } else {
            None
        };
        Ok(Node::If {
            condition: condition.boxed(),
            body: body.boxed(),
            otherwise,
        })
    }

    fn parse_for(&mut self) -> PResult<Node> {
        self.skip_whitespace();
        if self.parse_exact("(") {
            let init = self.parse_single_command()?;
            self.skip_whitespace();
            self.expect(";")?;
            let condition = self.parse_expr("condition")?;
            self.expect(";")?;
            let step = self.parse_single_command()?;
            self.skip_whitespace();
            self.expect(")")?;
            let body = self.parse_body()?;
            return Ok(Node::For {
                init: init.boxed(),
                condition: condition.boxed(),
                step: step.boxed(),
                body: body.boxed(),
            });
        }

        let var = self.parse_simple_word("loop variable")?;
        if var.is_empty() {
            return self.error("loop variable expected");
        }
        if !self.parse_exact("in") {
            return self.error("in expected");
        }
        if self.lexer.current_char().is_some_and(is_alphanumeric) {
            return self.error("in expected");
        }
        let start = self.parse_expr("")?;
        if self.parse_exact("..") {
            let end = self.parse_expr("range end")?;
            let body = self.parse_body()?;
            return Ok(Node::ForRange {
                var,
                start: start.boxed(),
                end: end.boxed(),
                body: body.boxed(),
            });
        }
        let body = self.parse_body()?;
        Ok(Node::ForArray {
            var,
            array: start.boxed(),
            body: body.boxed(),
        })
    }

    // ------------------------------------------------------------------
    // Selection and mutation
    // ------------------------------------------------------------------

    fn parse_select(&mut self) -> PResult<Node> {
        self.skip_whitespace();
        if self.peek_is("{") {
            return Ok(Node::SelectChildren(self.parse_path_group()?));
        }
        let path = self.parse_optional_path()?;
        Ok(Node::Select(path.map(Node::boxed)))
    }

    fn parse_delete(&mut self) -> PResult<Node> {
        let start = self.pos();
        if self.parse_exact("selection") && !self.lexer.current_char().is_some_and(is_alphanumeric) {
            return Ok(Node::DeleteSelection);
        }
        self.seek(start);
        Ok(Node::Delete(self.parse_path("")?.boxed()))
    }

    fn parse_create(&mut self) -> PResult<Node> {
        let start = self.pos();
        let Some(kind) = self.parse_keyword(CREATE_TYPES) else {
            return self.error_at(start, "unknown object type");
        };
        let command = self.traced(&kind, |p| {
            if kind == "orphan" {
                p.skip_whitespace();
                if p.parse_keyword(&["device", "dv"]).is_none() {
                    return p.error("only devices can be orphans");
                }
                p.expect(":")?;
                let path = p.parse_path("")?;
                p.parse_at()?;
                let template = p.parse_value()?;
                return Ok(CreateCommand::Orphan { path, template });
            }

            p.expect(":")?;
            match kind.as_str() {
                "domain" | "do" => {
                    let path = p.parse_path("")?;
                    p.parse_at()?;
                    let color = p.parse_value()?;
                    Ok(CreateCommand::Domain { path, color })
                }
                "site" | "si" => Ok(CreateCommand::Site {
                    path: p.parse_path("")?,
                }),
                "building" | "bldg" | "bd" => {
                    let path = p.parse_path("")?;
                    let [position, rotation, size_or_template] = p.parse_create_values()?;
                    Ok(CreateCommand::Building {
                        path,
                        position,
                        rotation,
                        size_or_template,
                    })
                }
                "room" | "ro" => {
                    let path = p.parse_path("")?;
                    let [position, rotation, size_or_template] = p.parse_create_values()?;
                    let axis_orientation = p.parse_optional_value()?;
                    let floor_unit = match axis_orientation {
                        Some(_) => p.parse_optional_value()?,
                        None => None,
                    };
                    Ok(CreateCommand::Room {
                        path,
                        position,
                        rotation,
                        size_or_template,
                        axis_orientation,
                        floor_unit,
                    })
                }
                "rack" | "rk" => {
                    let path = p.parse_path("")?;
                    let [position, rotation, size_or_template] = p.parse_create_values()?;
                    Ok(CreateCommand::Rack {
                        path,
                        position,
                        rotation,
                        size_or_template,
                    })
                }
                "device" | "dv" => {
                    let path = p.parse_path("")?;
                    p.parse_at()?;
                    let pos_u_or_slot = p.parse_value()?;
                    p.parse_at()?;
                    let size_u_or_template = p.parse_value()?;
                    let side = p.parse_optional_value()?;
                    Ok(CreateCommand::Device {
                        path,
                        pos_u_or_slot,
                        size_u_or_template,
                        side,
                    })
                }
                "corridor" | "co" => {
                    let path = p.parse_path("")?;
                    p.parse_at()?;
                    let racks_at = p.pos();
                    let racks: Result<[Node; 2], _> = p.parse_path_group()?.try_into();
                    let Ok([left_rack, right_rack]) = racks else {
                        return p.error_at(racks_at, "only 2 racks expected");
                    };
                    p.parse_at()?;
                    let temperature = p.parse_value()?;
                    Ok(CreateCommand::Corridor {
                        path,
                        left_rack,
                        right_rack,
                        temperature,
                    })
                }
                "group" | "gr" => {
                    let path = p.parse_path("")?;
                    p.parse_at()?;
                    let children = p.parse_path_group()?;
                    Ok(CreateCommand::Group { path, children })
                }
                "tag" => {
                    let slug = p.parse_string("slug")?;
                    p.parse_at()?;
                    let color = p.parse_value()?;
                    Ok(CreateCommand::Tag { slug, color })
                }
                _ => p.error_at(start, "unknown object type"),
            }
        })?;
        Ok(Node::Create(Box::new(command)))
    }

    /// `@position@rotation@sizeOrTemplate`
    fn parse_create_values(&mut self) -> PResult<[Node; 3]> {
        self.parse_at()?;
        let position = self.parse_value()?;
        self.parse_at()?;
        let rotation = self.parse_value()?;
        self.parse_at()?;
        let size = self.parse_value()?;
        Ok([position, rotation, size])
    }

    fn parse_optional_value(&mut self) -> PResult<Option<Node>> {
        self.skip_whitespace();
        if self.parse_exact("@") {
            self.parse_value().map(Some)
        } else {
            Ok(None)
        }
    }

    /// `path:attribute=[#]value[@value...]`
    fn parse_update(&mut self) -> PResult<Node> {
        self.traced("update", |p| {
            let path = p.parse_path("")?;
            if !p.parse_exact(":") {
                return p.error("unknown command");
            }
            let attr = p.parse_complex_word("attribute")?;
            if attr.is_empty() {
                return p.error("attribute name expected");
            }
            p.expect("=")?;
            p.skip_whitespace();
            let sharp = p.parse_exact("#");
            let mut values = Vec::new();
            loop {
                values.push(p.parse_value()?);
                p.skip_whitespace();
                if !p.parse_exact("@") {
                    break;
                }
            }
            Ok(Node::Update {
                path: path.boxed(),
                attr,
                values,
                sharp,
            })
        })
    }

    fn parse_link(&mut self) -> PResult<Node> {
        let source = self.parse_path("source")?;
        self.parse_at()?;
        let dest = self.parse_path("destination")?;
        let slot = self.parse_optional_value()?.map(Node::boxed);
        Ok(Node::Link {
            source: source.boxed(),
            dest: dest.boxed(),
            slot,
        })
    }

    fn parse_unlink(&mut self) -> PResult<Node> {
        let source = self.parse_path("source")?;
        self.skip_whitespace();
        let dest = if self.parse_exact("@") {
            Some(self.parse_path("destination")?.boxed())
        } else {
            None
        };
        Ok(Node::Unlink {
            source: source.boxed(),
            dest,
        })
    }

    fn parse_copy(&mut self) -> PResult<Node> {
        let source = self.parse_path("source")?;
        let dest = self.parse_string("destination")?;
        Ok(Node::Copy {
            source: source.boxed(),
            dest: dest.boxed(),
        })
    }

    // ------------------------------------------------------------------
    // 3D visualization
    // ------------------------------------------------------------------

    fn parse_draw(&mut self) -> PResult<Node> {
        let args = self.parse_args(&[], &["f"])?;
        let path = self.parse_optional_path()?.unwrap_or_else(|| Node::path("."));
        let depth = if self.command_end() {
            None
        } else {
            Some(self.parse_expr("depth")?.boxed())
        };
        Ok(Node::Draw {
            path: path.boxed(),
            depth,
            force: args.contains_key("f"),
        })
    }

    fn parse_undraw(&mut self) -> PResult<Node> {
        Ok(Node::Undraw(self.parse_optional_path()?.map(Node::boxed)))
    }

    fn parse_drawable(&mut self) -> PResult<Node> {
        let path = self.parse_path("")?;
        let attr = if self.command_end() {
            None
        } else {
            Some(self.parse_complex_word("attribute")?)
        };
        Ok(Node::Drawable {
            path: path.boxed(),
            attr,
        })
    }

    fn parse_ui(&mut self) -> PResult<Node> {
        let Some(command) = self.parse_keyword(UI_COMMANDS) else {
            return self.error("unknown ui command");
        };
        if command == "clearcache" {
            return Ok(Node::Ui(UiCommand::ClearCache));
        }
        self.skip_whitespace();
        self.expect("=")?;
        let ui = match command.as_str() {
            "delay" => UiCommand::Delay(self.parse_expr("delay")?.boxed()),
            "highlight" | "hl" => UiCommand::Highlight(self.parse_path("")?.boxed()),
            _ => UiCommand::Toggle {
                enable: self.parse_expr(&command)?.boxed(),
                feature: command,
            },
        };
        Ok(Node::Ui(ui))
    }

    fn parse_camera(&mut self) -> PResult<Node> {
        let Some(command) = self.parse_keyword(CAMERA_COMMANDS) else {
            return self.error("unknown camera command");
        };
        self.skip_whitespace();
        self.expect("=")?;
        if command == "wait" {
            let delay = self.parse_expr("delay")?;
            return Ok(Node::Camera(CameraCommand::Wait(delay.boxed())));
        }
        let position = self.parse_expr("position")?;
        self.parse_at()?;
        let rotation = self.parse_expr("rotation")?;
        Ok(Node::Camera(CameraCommand::Move {
            command,
            position: position.boxed(),
            rotation: rotation.boxed(),
        }))
    }

    fn parse_focus(&mut self) -> PResult<Node> {
        Ok(Node::Focus(self.parse_optional_path()?.map(Node::boxed)))
    }

    fn parse_connect3d(&mut self) -> PResult<Node> {
        if self.command_end() {
            return Ok(Node::Connect3D(None));
        }
        Ok(Node::Connect3D(Some(self.parse_string("url")?.boxed())))
    }
}
