//! Entity sources read by the pass driver.

use crate::{Entity, ExtractError, KindFilter};

/// Receives entities from a source during one pass.
pub trait EntityVisitor {
    /// Handle the next entity in file order.
    ///
    /// # Errors
    /// Returning an error stops the pass; the source passes it through.
    fn visit(&mut self, entity: Entity) -> Result<(), ExtractError>;

    /// Report how many bytes of the input have been consumed in this pass.
    fn bytes_read(&mut self, _offset: u64) {}
}

/// Sequential, read-to-exhaustion access to an ordered entity stream.
pub trait EntitySource {
    /// Human-readable name for log and error messages.
    fn name(&self) -> &str;

    /// Whether [`EntitySource::read`] can be called more than once.
    fn is_rereadable(&self) -> bool;

    /// Whether the stream may contain several versions of an object.
    fn has_history(&self) -> bool;

    /// Input size in bytes, when known.
    fn size(&self) -> Option<u64>;

    /// Deliver every entity accepted by `kinds` to `visitor`, in file order.
    ///
    /// # Errors
    /// Returns [`ExtractError::Read`] when the input cannot be opened or
    /// decoded, or whatever error the visitor raised.
    fn read(&self, kinds: KindFilter, visitor: &mut dyn EntityVisitor) -> Result<(), ExtractError>;
}

/// Source backed by an in-memory list of entities.
///
/// # Examples
/// ```
/// use osm_extract_core::{EntitySource, MemorySource};
///
/// let source = MemorySource::new("empty", Vec::new());
/// assert!(source.is_rereadable());
/// assert!(!source.has_history());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    entities: Vec<Entity>,
    history: bool,
}

impl MemorySource {
    /// Create a source delivering `entities` in the given order.
    pub fn new(name: impl Into<String>, entities: Vec<Entity>) -> Self {
        Self {
            name: name.into(),
            entities,
            history: false,
        }
    }

    /// Mark the source as containing history.
    #[must_use]
    pub fn with_history(mut self) -> Self {
        self.history = true;
        self
    }

    /// Entities held by the source.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }
}

impl EntitySource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_rereadable(&self) -> bool {
        true
    }

    fn has_history(&self) -> bool {
        self.history
    }

    fn size(&self) -> Option<u64> {
        None
    }

    fn read(&self, kinds: KindFilter, visitor: &mut dyn EntityVisitor) -> Result<(), ExtractError> {
        self.entities
            .iter()
            .filter(|entity| kinds.accepts(entity.kind()))
            .try_for_each(|entity| visitor.visit(entity.clone()))
    }
}
