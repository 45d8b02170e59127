//! Boundaries stored as OSM data, either PBF or XML.
//!
//! Every `multipolygon` or `boundary` relation contributes the ways it
//! references; without such relations every closed way is used instead.
//! Way node chains are joined end to end into closed rings.

use std::{collections::HashMap, io::BufRead, io::BufReader, str::FromStr};

use camino::Utf8Path;
use log::debug;
use osm_extract_core::{
    Entity, EntityKind, EntitySource, EntityVisitor, ExtractError, KindFilter, Location, Member,
    Node, Relation, Way,
};
use quick_xml::{
    Reader,
    events::{BytesStart, Event, attributes::AttrError},
};
use thiserror::Error;

use super::GeometryFileError;
use crate::PbfSource;

const BOUNDARY_TYPES: [&str; 2] = ["multipolygon", "boundary"];

/// Reasons OSM data cannot be assembled into a boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoundaryError {
    #[error("no multipolygon or boundary relation and no closed way found")]
    NoBoundary,
    #[error("relation {relation} references way {way}, which is missing")]
    MissingWay { relation: i64, way: i64 },
    #[error("node {node} is missing or has no valid location")]
    MissingNode { node: i64 },
    #[error("ring starting at node {start} is not closed; it ends at node {end}")]
    OpenRing { start: i64, end: i64 },
}

/// Reasons an OSM XML boundary file cannot be read.
#[derive(Debug, Error)]
pub enum OsmXmlError {
    #[error("malformed OSM XML")]
    Syntax(#[from] quick_xml::Error),
    #[error("<{element}> has a missing or invalid `{attribute}` attribute")]
    Attribute {
        element: &'static str,
        attribute: &'static str,
    },
}

impl From<AttrError> for OsmXmlError {
    fn from(source: AttrError) -> Self {
        Self::Syntax(source.into())
    }
}

/// Entities read from a boundary file.
#[derive(Debug, Default)]
struct BoundaryData {
    nodes: HashMap<i64, Location>,
    ways: Vec<(i64, Vec<i64>)>,
    relations: Vec<Relation>,
}

impl BoundaryData {
    fn accept(&mut self, entity: Entity) {
        match entity {
            Entity::Node(node) => {
                if let Some(location) = node.location.filter(|location| location.is_valid()) {
                    self.nodes.insert(node.id, location);
                }
            }
            Entity::Way(way) => self.ways.push((way.id, way.refs)),
            Entity::Relation(relation) => {
                if relation
                    .relation_type()
                    .is_some_and(|kind| BOUNDARY_TYPES.contains(&kind))
                {
                    self.relations.push(relation);
                }
            }
        }
    }
}

impl EntityVisitor for BoundaryData {
    fn visit(&mut self, entity: Entity) -> Result<(), ExtractError> {
        self.accept(entity);
        Ok(())
    }
}

/// Load a boundary from `path`. Names ending in `.pbf` are read as PBF,
/// anything else as OSM XML.
pub(super) fn load_boundary(path: &Utf8Path) -> Result<Vec<Vec<Location>>, GeometryFileError> {
    let is_pbf = path
        .file_name()
        .is_some_and(|name| name.to_ascii_lowercase().ends_with(".pbf"));
    let data = if is_pbf {
        read_pbf(path)?
    } else {
        read_xml_file(path)?
    };
    assemble_boundary(&data.nodes, &data.ways, &data.relations).map_err(|source| {
        GeometryFileError::Boundary {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn read_pbf(path: &Utf8Path) -> Result<BoundaryData, GeometryFileError> {
    let source = PbfSource::open(path).map_err(|source| GeometryFileError::OsmOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let mut data = BoundaryData::default();
    source
        .read(KindFilter::ALL, &mut data)
        .map_err(|source| GeometryFileError::OsmRead {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(data)
}

fn read_xml_file(path: &Utf8Path) -> Result<BoundaryData, GeometryFileError> {
    let file = osm_extract_fs::open_input(path).map_err(|source| GeometryFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut data = BoundaryData::default();
    read_xml(BufReader::new(file), &mut data).map_err(|source| GeometryFileError::OsmXml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(data)
}

/// Way or relation whose child elements are still being read.
enum Open {
    Way(Way),
    Relation(Relation),
}

fn read_xml<R: BufRead>(input: R, data: &mut BoundaryData) -> Result<(), OsmXmlError> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();
    let mut open = None;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(start) => open_element(&start, &mut open, data)?,
            Event::Empty(start) => {
                open_element(&start, &mut open, data)?;
                close_element(start.local_name().as_ref(), &mut open, data);
            }
            Event::End(end) => close_element(end.local_name().as_ref(), &mut open, data),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn open_element(
    start: &BytesStart<'_>,
    open: &mut Option<Open>,
    data: &mut BoundaryData,
) -> Result<(), OsmXmlError> {
    match start.local_name().as_ref() {
        b"node" => {
            let lon: Option<f64> = number(start, "node", "lon")?;
            let lat: Option<f64> = number(start, "node", "lat")?;
            data.accept(Entity::Node(Node {
                id: required(start, "node", "id")?,
                version: None,
                location: lon.zip(lat).and_then(|(x, y)| Location::from_degrees(x, y)),
                tags: Vec::new(),
            }));
        }
        b"way" => {
            *open = Some(Open::Way(Way {
                id: required(start, "way", "id")?,
                version: None,
                refs: Vec::new(),
                tags: Vec::new(),
            }));
        }
        b"relation" => {
            *open = Some(Open::Relation(Relation {
                id: required(start, "relation", "id")?,
                version: None,
                members: Vec::new(),
                tags: Vec::new(),
            }));
        }
        b"nd" => {
            if let Some(Open::Way(way)) = open {
                way.refs.push(required(start, "nd", "ref")?);
            }
        }
        b"member" => {
            if let Some(Open::Relation(relation)) = open {
                let kind = match attribute(start, "type")?.as_deref() {
                    Some("node") => EntityKind::Node,
                    Some("way") => EntityKind::Way,
                    Some("relation") => EntityKind::Relation,
                    _ => {
                        return Err(OsmXmlError::Attribute {
                            element: "member",
                            attribute: "type",
                        });
                    }
                };
                let id = required(start, "member", "ref")?;
                let role = attribute(start, "role")?.unwrap_or_default();
                relation.members.push(Member::new(kind, id, role));
            }
        }
        b"tag" => {
            if let Some(Open::Relation(relation)) = open
                && let (Some(key), Some(value)) = (attribute(start, "k")?, attribute(start, "v")?)
            {
                relation.tags.push((key, value));
            }
        }
        _ => {}
    }
    Ok(())
}

fn close_element(name: &[u8], open: &mut Option<Open>, data: &mut BoundaryData) {
    if !matches!(name, b"way" | b"relation") {
        return;
    }
    match open.take() {
        Some(Open::Way(way)) => data.accept(Entity::Way(way)),
        Some(Open::Relation(relation)) => data.accept(Entity::Relation(relation)),
        None => {}
    }
}

fn attribute(start: &BytesStart<'_>, name: &str) -> Result<Option<String>, OsmXmlError> {
    for item in start.attributes() {
        let attr = item?;
        if attr.key.as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn number<T: FromStr>(
    start: &BytesStart<'_>,
    element: &'static str,
    name: &'static str,
) -> Result<Option<T>, OsmXmlError> {
    attribute(start, name)?
        .map(|value| {
            value.parse().map_err(|_| OsmXmlError::Attribute {
                element,
                attribute: name,
            })
        })
        .transpose()
}

fn required<T: FromStr>(
    start: &BytesStart<'_>,
    element: &'static str,
    name: &'static str,
) -> Result<T, OsmXmlError> {
    number(start, element, name)?.ok_or(OsmXmlError::Attribute {
        element,
        attribute: name,
    })
}

/// Join boundary ways into closed rings of locations.
///
/// `ways` pairs each way id with its node references. When `relations` is
/// empty, closed ways form the boundary on their own.
///
/// # Errors
/// Returns a [`BoundaryError`] when no boundary is present, a referenced
/// way or node is missing, or a chain of ways does not close.
///
/// # Examples
/// ```
/// use std::collections::HashMap;
/// use osm_extract_core::Location;
/// use osm_extract_data::assemble_boundary;
///
/// let nodes = HashMap::from([
///     (1, Location::new(0, 0)),
///     (2, Location::new(10, 0)),
///     (3, Location::new(10, 10)),
/// ]);
/// let ways = vec![(7, vec![1, 2, 3, 1])];
/// let rings = assemble_boundary(&nodes, &ways, &[])?;
/// assert_eq!(rings.len(), 1);
/// # Ok::<(), osm_extract_data::BoundaryError>(())
/// ```
pub fn assemble_boundary(
    nodes: &HashMap<i64, Location>,
    ways: &[(i64, Vec<i64>)],
    relations: &[Relation],
) -> Result<Vec<Vec<Location>>, BoundaryError> {
    let chains = if relations.is_empty() {
        ways.iter()
            .filter(|(_, refs)| refs.len() >= 4 && refs.first() == refs.last())
            .map(|(_, refs)| refs.clone())
            .collect()
    } else {
        relation_chains(ways, relations)?
    };
    if chains.is_empty() {
        return Err(BoundaryError::NoBoundary);
    }
    let rings = join_rings(chains)?;
    debug!("assembled {} boundary rings", rings.len());
    rings
        .iter()
        .map(|ring| {
            ring.iter()
                .map(|node| {
                    nodes
                        .get(node)
                        .copied()
                        .ok_or(BoundaryError::MissingNode { node: *node })
                })
                .collect()
        })
        .collect()
}

fn relation_chains(
    ways: &[(i64, Vec<i64>)],
    relations: &[Relation],
) -> Result<Vec<Vec<i64>>, BoundaryError> {
    let by_id: HashMap<i64, &Vec<i64>> = ways.iter().map(|(id, refs)| (*id, refs)).collect();
    let mut chains = Vec::new();
    for relation in relations {
        for member in relation
            .members
            .iter()
            .filter(|member| member.kind == EntityKind::Way)
        {
            let refs = by_id.get(&member.id).ok_or(BoundaryError::MissingWay {
                relation: relation.id,
                way: member.id,
            })?;
            chains.push((*refs).clone());
        }
    }
    Ok(chains)
}

/// Join node chains sharing end points until every chain is closed.
fn join_rings(mut chains: Vec<Vec<i64>>) -> Result<Vec<Vec<i64>>, BoundaryError> {
    chains.retain(|chain| chain.len() > 1);
    chains.reverse();
    let mut rings = Vec::new();
    while let Some(mut ring) = chains.pop() {
        loop {
            let (Some(&start), Some(&end)) = (ring.first(), ring.last()) else {
                break;
            };
            if start == end {
                break;
            }
            let Some(index) = chains
                .iter()
                .position(|chain| chain.first() == Some(&end) || chain.last() == Some(&end))
            else {
                return Err(BoundaryError::OpenRing { start, end });
            };
            let mut next = chains.remove(index);
            if next.first() != Some(&end) {
                next.reverse();
            }
            ring.extend(next.into_iter().skip(1));
        }
        rings.push(ring);
    }
    Ok(rings)
}
