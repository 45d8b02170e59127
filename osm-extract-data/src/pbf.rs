//! Entity source reading OSM PBF files or standard input with `osmpbf`.

use std::{
    fs::File,
    io::{self, BufReader, Read},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use osm_extract_core::{
    Entity, EntitySource, EntityKind, EntityVisitor, ExtractError, KindFilter, Location, Member,
    Node, Relation, Tags, Way,
};
use osmpbf::{BlobReader, BlobType, Element, RelMemberType};
use thiserror::Error;

/// Required feature marking a file that carries several versions per object.
const HISTORY_FEATURE: &str = "HistoricalInformation";

/// Errors returned when reading an OSM PBF input.
#[derive(Debug, Error)]
pub enum PbfSourceError {
    #[error("failed to open OSM PBF input {input}")]
    Open {
        input: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode OSM PBF data in {input}")]
    Decode {
        input: String,
        #[source]
        source: osmpbf::Error,
    },
}

#[derive(Debug, Clone)]
enum PbfInput {
    File(Utf8PathBuf),
    Stdin,
}

/// OSM PBF input, decoded block by block on every read.
///
/// Files can be read any number of times; standard input only once.
///
/// # Examples
/// ```no_run
/// use camino::Utf8Path;
/// use osm_extract_core::EntitySource;
/// use osm_extract_data::PbfSource;
///
/// # fn main() -> Result<(), osm_extract_data::PbfSourceError> {
/// let source = PbfSource::open(Utf8Path::new("berlin.osm.pbf"))?;
/// println!("history: {}", source.has_history());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PbfSource {
    input: PbfInput,
    name: String,
    history: bool,
    size: Option<u64>,
}

impl PbfSource {
    /// Open a PBF file and inspect its header for history data.
    ///
    /// # Errors
    /// Returns [`PbfSourceError::Open`] when the file cannot be opened and
    /// [`PbfSourceError::Decode`] when its first block is corrupt.
    pub fn open(path: &Utf8Path) -> Result<Self, PbfSourceError> {
        let name = path.to_string();
        let open_error = |source| PbfSourceError::Open {
            input: name.clone(),
            source,
        };
        let file = osm_extract_fs::open_input(path).map_err(open_error)?;
        let size = file.metadata().map_err(open_error)?.len();
        let history = detect_history(BufReader::new(file)).map_err(|source| PbfSourceError::Decode {
            input: name.clone(),
            source,
        })?;
        debug!("{name}: {size} bytes, history: {history}");
        Ok(Self {
            input: PbfInput::File(path.to_path_buf()),
            name,
            history,
            size: Some(size),
        })
    }

    /// Read PBF data from standard input.
    ///
    /// The header is not inspected up front, so history input must be
    /// announced with [`PbfSource::with_history`].
    #[must_use]
    pub fn stdin() -> Self {
        Self {
            input: PbfInput::Stdin,
            name: "standard input".to_owned(),
            history: false,
            size: None,
        }
    }

    /// Treat the input as history data regardless of its header.
    #[must_use]
    pub fn with_history(mut self) -> Self {
        self.history = true;
        self
    }

    fn open_reader(&self) -> Result<Box<dyn Read + Send>, PbfSourceError> {
        match &self.input {
            PbfInput::File(path) => {
                let file: File =
                    osm_extract_fs::open_input(path).map_err(|source| PbfSourceError::Open {
                        input: self.name.clone(),
                        source,
                    })?;
                Ok(Box::new(BufReader::new(file)))
            }
            PbfInput::Stdin => Ok(Box::new(BufReader::new(io::stdin()))),
        }
    }

    fn decode_error(&self, source: osmpbf::Error) -> ExtractError {
        self.read_error(PbfSourceError::Decode {
            input: self.name.clone(),
            source,
        })
    }

    fn read_error(&self, error: PbfSourceError) -> ExtractError {
        ExtractError::Read {
            input: self.name.clone(),
            source: Box::new(error),
        }
    }
}

impl EntitySource for PbfSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_rereadable(&self) -> bool {
        matches!(self.input, PbfInput::File(_))
    }

    fn has_history(&self) -> bool {
        self.history
    }

    fn size(&self) -> Option<u64> {
        self.size
    }

    fn read(&self, kinds: KindFilter, visitor: &mut dyn EntityVisitor) -> Result<(), ExtractError> {
        let offset = Arc::new(AtomicU64::new(0));
        let reader = self.open_reader().map_err(|error| self.read_error(error))?;
        let counting = CountingReader {
            inner: reader,
            offset: Arc::clone(&offset),
        };
        for blob in BlobReader::new(counting) {
            let blob = blob.map_err(|source| self.decode_error(source))?;
            if matches!(blob.get_type(), BlobType::OsmData) {
                let block = blob
                    .to_primitiveblock()
                    .map_err(|source| self.decode_error(source))?;
                for element in block.elements() {
                    let entity = convert(element, kinds).map_err(|source| self.decode_error(source))?;
                    if let Some(entity) = entity {
                        visitor.visit(entity)?;
                    }
                }
            }
            visitor.bytes_read(offset.load(Ordering::Relaxed));
        }
        Ok(())
    }
}

/// Tracks how many bytes the blob reader has consumed.
struct CountingReader<R> {
    inner: R,
    offset: Arc<AtomicU64>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.offset
            .fetch_add(u64::try_from(read).unwrap_or(u64::MAX), Ordering::Relaxed);
        Ok(read)
    }
}

fn detect_history<R: Read + Send>(reader: R) -> Result<bool, osmpbf::Error> {
    let Some(first) = BlobReader::new(reader).next() else {
        return Ok(false);
    };
    let blob = first?;
    if !matches!(blob.get_type(), BlobType::OsmHeader) {
        return Ok(false);
    }
    let header = blob.to_headerblock()?;
    Ok(header
        .required_features()
        .iter()
        .any(|feature| feature == HISTORY_FEATURE))
}

fn convert(element: Element<'_>, kinds: KindFilter) -> Result<Option<Entity>, osmpbf::Error> {
    let entity = match element {
        Element::Node(node) if kinds.nodes => Entity::from(Node {
            id: node.id(),
            version: node.info().version().and_then(|version| u32::try_from(version).ok()),
            location: Some(Location::new(node.decimicro_lon(), node.decimicro_lat())),
            tags: owned_tags(node.tags()),
        }),
        Element::DenseNode(node) if kinds.nodes => Entity::from(Node {
            id: node.id(),
            version: node
                .info()
                .and_then(|info| u32::try_from(info.version()).ok()),
            location: Some(Location::new(node.decimicro_lon(), node.decimicro_lat())),
            tags: owned_tags(node.tags()),
        }),
        Element::Way(way) if kinds.ways => Entity::from(Way {
            id: way.id(),
            version: way.info().version().and_then(|version| u32::try_from(version).ok()),
            refs: way.refs().collect(),
            tags: owned_tags(way.tags()),
        }),
        Element::Relation(relation) if kinds.relations => {
            let members = relation
                .members()
                .map(|member| {
                    Ok(Member::new(
                        member_kind(&member.member_type),
                        member.member_id,
                        member.role()?,
                    ))
                })
                .collect::<Result<Vec<_>, osmpbf::Error>>()?;
            Entity::from(Relation {
                id: relation.id(),
                version: relation
                    .info()
                    .version()
                    .and_then(|version| u32::try_from(version).ok()),
                members,
                tags: owned_tags(relation.tags()),
            })
        }
        _ => return Ok(None),
    };
    Ok(Some(entity))
}

fn owned_tags<'a>(tags: impl Iterator<Item = (&'a str, &'a str)>) -> Tags {
    tags.map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

const fn member_kind(member_type: &RelMemberType) -> EntityKind {
    match member_type {
        RelMemberType::Node => EntityKind::Node,
        RelMemberType::Way => EntityKind::Way,
        RelMemberType::Relation => EntityKind::Relation,
    }
}
