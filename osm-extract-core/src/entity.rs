//! Owned OSM entities as delivered to the pass driver.
//!
//! Sources convert their native records into these types so that the
//! strategies stay independent of any particular file format.

use std::fmt;

use crate::Location;

/// Ordered key/value tags.
pub type Tags = Vec<(String, String)>;

/// The three OSM entity kinds, ordered the way sorted files deliver them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    /// A point with a location.
    Node,
    /// An ordered list of node references.
    Way,
    /// An ordered list of typed member references.
    Relation,
}

impl EntityKind {
    /// Single-letter prefix used by the OPL format and in log messages.
    #[must_use]
    pub const fn prefix(self) -> char {
        match self {
            Self::Node => 'n',
            Self::Way => 'w',
            Self::Relation => 'r',
        }
    }

    /// Lowercase name (`node`, `way`, `relation`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which entity kinds a pass needs the source to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindFilter {
    /// Deliver nodes.
    pub nodes: bool,
    /// Deliver ways.
    pub ways: bool,
    /// Deliver relations.
    pub relations: bool,
}

impl KindFilter {
    /// Every entity kind.
    pub const ALL: Self = Self {
        nodes: true,
        ways: true,
        relations: true,
    };

    /// Ways only.
    pub const WAYS: Self = Self {
        nodes: false,
        ways: true,
        relations: false,
    };

    /// Whether entities of `kind` pass the filter.
    #[must_use]
    pub const fn accepts(self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Node => self.nodes,
            EntityKind::Way => self.ways,
            EntityKind::Relation => self.relations,
        }
    }
}

/// A node record.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Signed OSM identifier.
    pub id: i64,
    /// Object version, when the source carries metadata.
    pub version: Option<u32>,
    /// Location, or `None` when the record has no usable coordinates.
    pub location: Option<Location>,
    /// Tags in file order.
    pub tags: Tags,
}

/// A way record.
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    /// Signed OSM identifier.
    pub id: i64,
    /// Object version, when the source carries metadata.
    pub version: Option<u32>,
    /// Referenced node identifiers in order.
    pub refs: Vec<i64>,
    /// Tags in file order.
    pub tags: Tags,
}

/// A member reference inside a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Kind of the referenced entity.
    pub kind: EntityKind,
    /// Identifier of the referenced entity.
    pub id: i64,
    /// Member role, possibly empty.
    pub role: String,
}

impl Member {
    /// Construct a member reference.
    pub fn new(kind: EntityKind, id: i64, role: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            role: role.into(),
        }
    }
}

/// A relation record.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Signed OSM identifier.
    pub id: i64,
    /// Object version, when the source carries metadata.
    pub version: Option<u32>,
    /// Members in order.
    pub members: Vec<Member>,
    /// Tags in file order.
    pub tags: Tags,
}

impl Relation {
    /// Value of the `type` tag, if present.
    #[must_use]
    pub fn relation_type(&self) -> Option<&str> {
        self.tags
            .iter()
            .find(|(key, _)| key == "type")
            .map(|(_, value)| value.as_str())
    }
}

/// Any entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// A node.
    Node(Node),
    /// A way.
    Way(Way),
    /// A relation.
    Relation(Relation),
}

impl Entity {
    /// Kind of the entity.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Node(_) => EntityKind::Node,
            Self::Way(_) => EntityKind::Way,
            Self::Relation(_) => EntityKind::Relation,
        }
    }

    /// Signed identifier of the entity.
    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Node(node) => node.id,
            Self::Way(way) => way.id,
            Self::Relation(relation) => relation.id,
        }
    }

    /// Version of the entity, if known.
    #[must_use]
    pub const fn version(&self) -> Option<u32> {
        match self {
            Self::Node(node) => node.version,
            Self::Way(way) => way.version,
            Self::Relation(relation) => relation.version,
        }
    }
}

impl From<Node> for Entity {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<Way> for Entity {
    fn from(way: Way) -> Self {
        Self::Way(way)
    }
}

impl From<Relation> for Entity {
    fn from(relation: Relation) -> Self {
        Self::Relation(relation)
    }
}
