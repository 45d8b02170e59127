//! Input order checking.
//!
//! Strategies assume nodes precede ways and ways precede relations, with
//! identifiers increasing inside each kind. History files repeat an
//! identifier once per version, so equal identifiers are accepted there as
//! long as versions increase.

use thiserror::Error;

use crate::{Entity, EntityKind};

/// Ways in which the input can be out of order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// An entity kind appeared after a later kind.
    #[error("{current} {current_id} follows {previous} {previous_id}")]
    Kind {
        /// Kind of the previous entity.
        previous: EntityKind,
        /// Identifier of the previous entity.
        previous_id: i64,
        /// Kind of the offending entity.
        current: EntityKind,
        /// Identifier of the offending entity.
        current_id: i64,
    },
    /// Identifiers within a kind did not increase.
    #[error("{kind} {current} follows {kind} {previous}")]
    Id {
        /// Entity kind.
        kind: EntityKind,
        /// Previous identifier.
        previous: i64,
        /// Offending identifier.
        current: i64,
    },
    /// Versions of one history object did not increase.
    #[error("{kind} {id} version {current} follows version {previous}")]
    Version {
        /// Entity kind.
        kind: EntityKind,
        /// Identifier of the object.
        id: i64,
        /// Previous version.
        previous: u32,
        /// Offending version.
        current: u32,
    },
}

#[derive(Debug, Clone, Copy)]
struct Seen {
    kind: EntityKind,
    id: i64,
    version: Option<u32>,
}

/// Tracks the last entity seen and rejects out-of-order successors.
#[derive(Debug, Default)]
pub struct OrderCheck {
    history: bool,
    last: Option<Seen>,
}

impl OrderCheck {
    /// Checker for plain (non-history) input.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checker that accepts repeated identifiers with increasing versions.
    #[must_use]
    pub fn with_history() -> Self {
        Self {
            history: true,
            last: None,
        }
    }

    /// Check `entity` against its predecessor.
    ///
    /// # Errors
    /// Returns an [`OrderError`] describing the first violation.
    pub fn check(&mut self, entity: &Entity) -> Result<(), OrderError> {
        self.check_parts(entity.kind(), entity.id(), entity.version())
    }

    /// Check an entity given by its parts.
    ///
    /// # Errors
    /// Returns an [`OrderError`] describing the first violation.
    pub fn check_parts(
        &mut self,
        kind: EntityKind,
        id: i64,
        version: Option<u32>,
    ) -> Result<(), OrderError> {
        let current = Seen { kind, id, version };
        if let Some(previous) = self.last {
            self.compare(previous, current)?;
        }
        self.last = Some(current);
        Ok(())
    }

    fn compare(&self, previous: Seen, current: Seen) -> Result<(), OrderError> {
        if current.kind < previous.kind {
            return Err(OrderError::Kind {
                previous: previous.kind,
                previous_id: previous.id,
                current: current.kind,
                current_id: current.id,
            });
        }
        if current.kind > previous.kind || current.id > previous.id {
            return Ok(());
        }
        if current.id == previous.id && self.history {
            return match (previous.version, current.version) {
                (Some(before), Some(after)) if after <= before => Err(OrderError::Version {
                    kind: current.kind,
                    id: current.id,
                    previous: before,
                    current: after,
                }),
                _ => Ok(()),
            };
        }
        Err(OrderError::Id {
            kind: current.kind,
            previous: previous.id,
            current: current.id,
        })
    }
}
