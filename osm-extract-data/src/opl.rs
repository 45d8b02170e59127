//! OPL encoder: one line of space-separated fields per entity.

use std::{fmt::Write as _, io};

use osm_extract_core::{EntityEncoder, Location, Member, Node, Relation, Tags, Way};

use crate::format::push_coordinate;

/// Writes entities in the Object Per Line format.
///
/// # Examples
/// ```
/// use osm_extract_core::{EntityEncoder, Location, Node};
/// use osm_extract_data::OplEncoder;
///
/// let node = Node {
///     id: 7,
///     version: Some(2),
///     location: Some(Location::new(15_000_000, -2_500_000)),
///     tags: vec![("name".into(), "A B".into())],
/// };
/// let mut out = Vec::new();
/// OplEncoder.node(&node, &mut out)?;
/// assert_eq!(String::from_utf8(out)?, "n7 v2 Tname=A%20%B x1.5 y-0.25\n");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct OplEncoder;

impl EntityEncoder for OplEncoder {
    fn node(&mut self, node: &Node, out: &mut Vec<u8>) -> io::Result<()> {
        let mut line = String::new();
        push_common(&mut line, 'n', node.id, node.version, &node.tags);
        push_location(&mut line, node.location);
        finish(line, out);
        Ok(())
    }

    fn way(&mut self, way: &Way, out: &mut Vec<u8>) -> io::Result<()> {
        let mut line = String::new();
        push_common(&mut line, 'w', way.id, way.version, &way.tags);
        line.push_str(" N");
        for (index, id) in way.refs.iter().enumerate() {
            if index > 0 {
                line.push(',');
            }
            let _ = write!(line, "n{id}");
        }
        finish(line, out);
        Ok(())
    }

    fn relation(&mut self, relation: &Relation, out: &mut Vec<u8>) -> io::Result<()> {
        let mut line = String::new();
        push_common(&mut line, 'r', relation.id, relation.version, &relation.tags);
        line.push_str(" M");
        for (index, member) in relation.members.iter().enumerate() {
            if index > 0 {
                line.push(',');
            }
            push_member(&mut line, member);
        }
        finish(line, out);
        Ok(())
    }
}

fn push_common(line: &mut String, prefix: char, id: i64, version: Option<u32>, tags: &Tags) {
    let _ = write!(line, "{prefix}{id}");
    if let Some(version) = version {
        let _ = write!(line, " v{version}");
    }
    line.push_str(" T");
    for (index, (key, value)) in tags.iter().enumerate() {
        if index > 0 {
            line.push(',');
        }
        push_escaped(line, key);
        line.push('=');
        push_escaped(line, value);
    }
}

fn push_location(line: &mut String, location: Option<Location>) {
    match location {
        Some(location) if location.is_valid() => {
            line.push_str(" x");
            push_coordinate(line, location.x());
            line.push_str(" y");
            push_coordinate(line, location.y());
        }
        _ => line.push_str(" x y"),
    }
}

fn push_member(line: &mut String, member: &Member) {
    let _ = write!(line, "{}{}@", member.kind.prefix(), member.id);
    push_escaped(line, &member.role);
}

fn finish(mut line: String, out: &mut Vec<u8>) {
    line.push('\n');
    out.extend_from_slice(line.as_bytes());
}

/// Escape characters that would break field parsing as `%hex%`.
fn push_escaped(line: &mut String, text: &str) {
    for c in text.chars() {
        if c.is_control() || matches!(c, ' ' | ',' | '=' | '@' | '%') {
            let _ = write!(line, "%{:x}%", u32::from(c));
        } else {
            line.push(c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osm_extract_core::EntityKind;
    use rstest::rstest;

    fn encode(write: impl FnOnce(&mut OplEncoder, &mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        write(&mut OplEncoder, &mut out).expect("encode");
        String::from_utf8(out).expect("utf-8")
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case("a b", "a%20%b")]
    #[case("k=v,w@x%", "k%3d%v%2c%w%40%x%25%")]
    #[case("tab\there", "tab%9%here")]
    #[case("straße", "straße")]
    fn escapes_separators(#[case] text: &str, #[case] expected: &str) {
        let mut line = String::new();
        push_escaped(&mut line, text);
        assert_eq!(line, expected);
    }

    #[rstest]
    fn writes_nodes_without_location() {
        let node = Node {
            id: -3,
            version: None,
            location: None,
            tags: Vec::new(),
        };
        assert_eq!(encode(|e, out| e.node(&node, out)), "n-3 T x y\n");
    }

    #[rstest]
    fn writes_way_references() {
        let way = Way {
            id: 10,
            version: Some(1),
            refs: vec![1, 2, 3],
            tags: vec![("highway".into(), "path".into())],
        };
        assert_eq!(
            encode(|e, out| e.way(&way, out)),
            "w10 v1 Thighway=path Nn1,n2,n3\n"
        );
    }

    #[rstest]
    fn writes_relation_members_with_roles() {
        let relation = Relation {
            id: 5,
            version: None,
            members: vec![
                Member::new(EntityKind::Way, 10, "outer"),
                Member::new(EntityKind::Node, 1, ""),
                Member::new(EntityKind::Relation, 2, "sub area"),
            ],
            tags: vec![("type".into(), "multipolygon".into())],
        };
        assert_eq!(
            encode(|e, out| e.relation(&relation, out)),
            "r5 Ttype=multipolygon Mw10@outer,n1@,r2@sub%20%area\n"
        );
    }
}
