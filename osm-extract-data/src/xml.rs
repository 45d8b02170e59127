//! OSM XML 0.6 encoder on top of `quick-xml`.
//!
//! Each entity is encoded into the caller's buffer on its own, so the
//! writer never tracks nesting: every element goes on its own line with a
//! fixed indent for its depth.

use std::io;

use osm_extract_core::{BoundingBox, EntityEncoder, Location, Node, Relation, Tags, Way};
use quick_xml::{
    Writer,
    escape::escape,
    events::{BytesDecl, BytesEnd, BytesStart, Event},
};

use crate::format::{DEFAULT_GENERATOR, OutputHeader, push_coordinate};

type XmlWriter<'a> = Writer<&'a mut Vec<u8>>;

/// Writes an `<osm>` document with a `<bounds>` element for the extract.
#[derive(Debug, Clone)]
pub struct XmlEncoder {
    envelope: BoundingBox,
    header: OutputHeader,
}

impl XmlEncoder {
    /// Encoder whose header advertises `envelope` as the document bounds.
    #[must_use]
    pub const fn new(envelope: BoundingBox, header: OutputHeader) -> Self {
        Self { envelope, header }
    }
}

impl EntityEncoder for XmlEncoder {
    fn header(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        let mut writer = Writer::new(out);
        line(
            &mut writer,
            0,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
        let mut osm = BytesStart::new("osm");
        osm.push_attribute(("version", "0.6"));
        if self.header.get("generator").is_none() {
            push_text(&mut osm, "generator", DEFAULT_GENERATOR);
        }
        for (key, value) in self.header.iter() {
            push_text(&mut osm, key, value);
        }
        line(&mut writer, 0, Event::Start(osm))?;
        let mut bounds = BytesStart::new("bounds");
        push_location(&mut bounds, "minlat", "minlon", self.envelope.bottom_left());
        push_location(&mut bounds, "maxlat", "maxlon", self.envelope.top_right());
        line(&mut writer, 1, Event::Empty(bounds))
    }

    fn node(&mut self, node: &Node, out: &mut Vec<u8>) -> io::Result<()> {
        let mut writer = Writer::new(out);
        let mut element = BytesStart::new("node");
        push_identity(&mut element, node.id, node.version);
        if let Some(location) = node.location.filter(|location| location.is_valid()) {
            push_location(&mut element, "lat", "lon", location);
        }
        if node.tags.is_empty() {
            return line(&mut writer, 1, Event::Empty(element));
        }
        line(&mut writer, 1, Event::Start(element))?;
        write_tags(&mut writer, &node.tags)?;
        line(&mut writer, 1, Event::End(BytesEnd::new("node")))
    }

    fn way(&mut self, way: &Way, out: &mut Vec<u8>) -> io::Result<()> {
        let mut writer = Writer::new(out);
        let mut element = BytesStart::new("way");
        push_identity(&mut element, way.id, way.version);
        if way.refs.is_empty() && way.tags.is_empty() {
            return line(&mut writer, 1, Event::Empty(element));
        }
        line(&mut writer, 1, Event::Start(element))?;
        for id in &way.refs {
            let mut nd = BytesStart::new("nd");
            nd.push_attribute(("ref", id.to_string().as_str()));
            line(&mut writer, 2, Event::Empty(nd))?;
        }
        write_tags(&mut writer, &way.tags)?;
        line(&mut writer, 1, Event::End(BytesEnd::new("way")))
    }

    fn relation(&mut self, relation: &Relation, out: &mut Vec<u8>) -> io::Result<()> {
        let mut writer = Writer::new(out);
        let mut element = BytesStart::new("relation");
        push_identity(&mut element, relation.id, relation.version);
        if relation.members.is_empty() && relation.tags.is_empty() {
            return line(&mut writer, 1, Event::Empty(element));
        }
        line(&mut writer, 1, Event::Start(element))?;
        for member in &relation.members {
            let mut item = BytesStart::new("member");
            item.push_attribute(("type", member.kind.name()));
            item.push_attribute(("ref", member.id.to_string().as_str()));
            push_text(&mut item, "role", &member.role);
            line(&mut writer, 2, Event::Empty(item))?;
        }
        write_tags(&mut writer, &relation.tags)?;
        line(&mut writer, 1, Event::End(BytesEnd::new("relation")))
    }

    fn footer(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        line(&mut Writer::new(out), 0, Event::End(BytesEnd::new("osm")))
    }
}

/// Write `event` indented to `depth` and terminated by a newline.
fn line(writer: &mut XmlWriter<'_>, depth: usize, event: Event<'_>) -> io::Result<()> {
    for _ in 0..depth {
        writer.get_mut().extend_from_slice(b"  ");
    }
    writer.write_event(event).map_err(io::Error::other)?;
    writer.get_mut().push(b'\n');
    Ok(())
}

fn write_tags(writer: &mut XmlWriter<'_>, tags: &Tags) -> io::Result<()> {
    for (key, value) in tags {
        let mut tag = BytesStart::new("tag");
        push_text(&mut tag, "k", key);
        push_text(&mut tag, "v", value);
        line(writer, 2, Event::Empty(tag))?;
    }
    Ok(())
}

fn push_identity(element: &mut BytesStart<'_>, id: i64, version: Option<u32>) {
    element.push_attribute(("id", id.to_string().as_str()));
    if let Some(version) = version {
        element.push_attribute(("version", version.to_string().as_str()));
    }
}

fn push_location(element: &mut BytesStart<'_>, lat: &str, lon: &str, location: Location) {
    let mut text = String::new();
    push_coordinate(&mut text, location.y());
    element.push_attribute((lat, text.as_str()));
    text.clear();
    push_coordinate(&mut text, location.x());
    element.push_attribute((lon, text.as_str()));
}

/// Push a free-text attribute. Line breaks and tabs are written as
/// character references so readers do not normalise them to spaces.
fn push_text(element: &mut BytesStart<'_>, name: &str, value: &str) {
    let escaped = escape(value)
        .replace('\n', "&#xA;")
        .replace('\r', "&#xD;")
        .replace('\t', "&#x9;");
    element.push_attribute((name.as_bytes(), escaped.as_bytes()));
}
