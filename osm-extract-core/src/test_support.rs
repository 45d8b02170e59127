//! Builders and in-memory outputs for unit and behaviour tests.
//!
//! Compiled for this crate's own tests and behind the `test-support`
//! feature for dependants.
//!
//! Coordinates passed to the builders are raw fixed-point units, which keeps
//! fixtures short: `node(1, 5, 5)` sits at `(5e-7, 5e-7)` degrees.

use std::{
    cell::RefCell,
    io::{self, Write},
    rc::Rc,
};

use crate::{
    BoundingBox, EntityEncoder, EntityKind, Extract, ExtractOutput, Geometry, Location, Member,
    Node, Relation, Way,
};

/// Node at fixed-point `(x, y)` without tags.
#[must_use]
pub fn node(id: i64, x: i32, y: i32) -> Node {
    Node {
        id,
        version: None,
        location: Some(Location::new(x, y)),
        tags: Vec::new(),
    }
}

/// Way referencing `refs` without tags.
#[must_use]
pub fn way(id: i64, refs: &[i64]) -> Way {
    Way {
        id,
        version: None,
        refs: refs.to_vec(),
        tags: Vec::new(),
    }
}

/// Relation with empty-role members and no tags.
#[must_use]
pub fn relation_of(id: i64, members: &[(EntityKind, i64)]) -> Relation {
    Relation {
        id,
        version: None,
        members: members
            .iter()
            .map(|&(kind, member)| Member::new(kind, member, ""))
            .collect(),
        tags: Vec::new(),
    }
}

/// Relation of `relation_of` carrying a `type` tag.
#[must_use]
pub fn typed_relation(id: i64, relation_type: &str, members: &[(EntityKind, i64)]) -> Relation {
    let mut relation = relation_of(id, members);
    relation
        .tags
        .push(("type".to_owned(), relation_type.to_owned()));
    relation
}

/// Cloneable in-memory writer whose contents stay readable after the
/// output that owns a clone has been closed.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl SharedBuffer {
    /// Everything written so far, decoded lossily as UTF-8.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }

    /// Identifiers written so far, one `n1`/`w2`/`r3` token per line.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Encoder writing one `<kind prefix><id>` line per entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdListEncoder;

impl EntityEncoder for IdListEncoder {
    fn node(&mut self, node: &Node, out: &mut Vec<u8>) -> io::Result<()> {
        writeln!(out, "n{}", node.id)
    }

    fn way(&mut self, way: &Way, out: &mut Vec<u8>) -> io::Result<()> {
        writeln!(out, "w{}", way.id)
    }

    fn relation(&mut self, relation: &Relation, out: &mut Vec<u8>) -> io::Result<()> {
        writeln!(out, "r{}", relation.id)
    }
}

/// Extract over the fixed-point box `(left, bottom)`–`(right, top)` that
/// records written identifiers into `buffer`.
///
/// # Panics
/// Panics when the corners are reversed.
#[must_use]
pub fn bbox_extract(name: &str, corners: (i32, i32, i32, i32), buffer: &SharedBuffer) -> Extract {
    let (left, bottom, right, top) = corners;
    let bbox = BoundingBox::new(Location::new(left, bottom), Location::new(right, top))
        .unwrap_or_else(|err| panic!("invalid test bbox {corners:?}: {err}"));
    geometry_extract(name, Geometry::from(bbox), buffer)
}

/// Extract over `geometry` that records written identifiers into `buffer`.
#[must_use]
pub fn geometry_extract(name: &str, geometry: Geometry, buffer: &SharedBuffer) -> Extract {
    let output = ExtractOutput::new(Box::new(IdListEncoder), Box::new(buffer.clone()));
    Extract::new(name, geometry, output)
}
