use std::fmt;

use crate::ast::Node;

/// Category of an object of the infrastructure model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Site,
    Building,
    Room,
    Rack,
    Device,
    AirConditioner,
    Panel,
    Cabinet,
    Corridor,
    Group,
    Domain,
    Tag,
    ObjectTemplate,
    RoomTemplate,
    BldgTemplate,
    Stray,
}

impl EntityKind {
    /// Name of the category as used by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Site => "site",
            EntityKind::Building => "building",
            EntityKind::Room => "room",
            EntityKind::Rack => "rack",
            EntityKind::Device => "device",
            EntityKind::AirConditioner => "ac",
            EntityKind::Panel => "panel",
            EntityKind::Cabinet => "cabinet",
            EntityKind::Corridor => "corridor",
            EntityKind::Group => "group",
            EntityKind::Domain => "domain",
            EntityKind::Tag => "tag",
            EntityKind::ObjectTemplate => "obj_template",
            EntityKind::RoomTemplate => "room_template",
            EntityKind::BldgTemplate => "bldg_template",
            EntityKind::Stray => "stray_object",
        }
    }

    pub fn from_category(category: &str) -> Option<EntityKind> {
        let kind = match category {
            "site" => EntityKind::Site,
            "building" | "bldg" => EntityKind::Building,
            "room" => EntityKind::Room,
            "rack" => EntityKind::Rack,
            "device" => EntityKind::Device,
            "ac" => EntityKind::AirConditioner,
            "panel" => EntityKind::Panel,
            "cabinet" => EntityKind::Cabinet,
            "corridor" => EntityKind::Corridor,
            "group" => EntityKind::Group,
            "domain" => EntityKind::Domain,
            "tag" => EntityKind::Tag,
            "obj_template" => EntityKind::ObjectTemplate,
            "room_template" => EntityKind::RoomTemplate,
            "bldg_template" => EntityKind::BldgTemplate,
            "stray_object" => EntityKind::Stray,
            _ => return None,
        };
        Some(kind)
    }

    /// Kinds the 3D peer knows how to draw.
    pub fn is_drawable(&self) -> bool {
        matches!(
            self,
            EntityKind::Site
                | EntityKind::Building
                | EntityKind::Room
                | EntityKind::Rack
                | EntityKind::Device
                | EntityKind::AirConditioner
                | EntityKind::Panel
                | EntityKind::Cabinet
                | EntityKind::Corridor
                | EntityKind::Group
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments of `ls` and of the category-restricted `lsXXX` commands.
///
/// ```text
/// ls -s height -f name:height /P/site/bldg/room category=rack
/// lsrack -r /P/site
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LsArgs {
    pub path: Box<Node>,
    pub category: Option<EntityKind>,
    /// Attribute to sort by (`-s`)
    pub sort: Option<String>,
    /// Attributes displayed next to each name (`-f a:b`)
    pub attrs: Vec<String>,
    /// `key=value` filters
    pub filters: Vec<(String, Node)>,
    /// `-r`
    pub recursive: bool,
}

/// Object creation commands (`+type:path@arg...`).
///
/// Arguments that may be either a literal or a template name
/// (`size_or_template`, `size_u_or_template`) are only told apart during
/// evaluation, by probing the backend for a template of that name.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateCommand {
    /// `+domain:path@color`
    Domain { path: Node, color: Node },

    /// `+site:path`
    Site { path: Node },

    /// `+building:path@posXY@rotation@sizeOrTemplate`
    Building {
        path: Node,
        position: Node,
        rotation: Node,
        size_or_template: Node,
    },

    /// `+room:path@posXY@rotation@sizeOrTemplate[@axisOrientation[@floorUnit]]`
    Room {
        path: Node,
        position: Node,
        rotation: Node,
        size_or_template: Node,
        axis_orientation: Option<Node>,
        floor_unit: Option<Node>,
    },

    /// `+rack:path@position@rotation@sizeOrTemplate`
    Rack {
        path: Node,
        position: Node,
        rotation: Node,
        size_or_template: Node,
    },

    /// `+device:path@posUOrSlot@sizeUOrTemplate[@side]`
    Device {
        path: Node,
        pos_u_or_slot: Node,
        size_u_or_template: Node,
        side: Option<Node>,
    },

    /// `+group:path@{child1, child2}`
    Group { path: Node, children: Vec<Node> },

    /// `+corridor:path@{rack1, rack2}@temperature`
    Corridor {
        path: Node,
        left_rack: Node,
        right_rack: Node,
        temperature: Node,
    },

    /// `+tag:slug@color`
    Tag { slug: Node, color: Node },

    /// `+orphan device:path@template`
    Orphan { path: Node, template: Node },
}

/// Commands for the 3D peer user interface.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    /// `ui.delay=seconds`
    Delay(Box<Node>),
    /// `ui.debug=true`, `ui.infos=false`, `ui.wireframe=true`
    Toggle { feature: String, enable: Box<Node> },
    /// `ui.highlight=path` or `ui.hl=path`
    Highlight(Box<Node>),
    /// `ui.clearcache`
    ClearCache,
}

/// Camera commands for the 3D peer.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraCommand {
    /// `camera.move=[x,y,z]@[rx,ry]` or `camera.translate=...`
    Move {
        command: String,
        position: Box<Node>,
        rotation: Box<Node>,
    },
    /// `camera.wait=seconds`
    Wait(Box<Node>),
}
