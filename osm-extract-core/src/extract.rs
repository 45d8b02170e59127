//! Extract targets: a region plus the output it feeds.

use log::info;

use crate::{
    ExtractError, ExtractOutput, Geometry, Location, Node, Relation, Way, output::WriteCounts,
};

/// One configured extract.
#[derive(Debug)]
pub struct Extract {
    name: String,
    geometry: Geometry,
    output: ExtractOutput,
}

/// Outcome of a closed extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    /// Extract name.
    pub name: String,
    /// Bytes written to the output.
    pub bytes_written: u64,
    /// Entities written per kind.
    pub counts: WriteCounts,
}

impl Extract {
    /// Create an extract named `name` selecting from `geometry`.
    pub fn new(name: impl Into<String>, geometry: Geometry, output: ExtractOutput) -> Self {
        Self {
            name: name.into(),
            geometry,
            output,
        }
    }

    /// Extract name, usually the output file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The extract's region.
    #[must_use]
    pub const fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Whether a node at `location` lies in the region.
    #[must_use]
    pub fn contains(&self, location: Option<Location>) -> bool {
        location.is_some_and(|location| self.geometry.contains(location))
    }

    /// Append a node to the output.
    ///
    /// # Errors
    /// Returns [`ExtractError::Write`] when the output fails.
    pub fn write_node(&mut self, node: &Node) -> Result<(), ExtractError> {
        let result = self.output.write_node(node);
        self.wrap(result)
    }

    /// Append a way to the output.
    ///
    /// # Errors
    /// Returns [`ExtractError::Write`] when the output fails.
    pub fn write_way(&mut self, way: &Way) -> Result<(), ExtractError> {
        let result = self.output.write_way(way);
        self.wrap(result)
    }

    /// Append a relation to the output.
    ///
    /// # Errors
    /// Returns [`ExtractError::Write`] when the output fails.
    pub fn write_relation(&mut self, relation: &Relation) -> Result<(), ExtractError> {
        let result = self.output.write_relation(relation);
        self.wrap(result)
    }

    /// Flush and close the output.
    ///
    /// # Errors
    /// Returns [`ExtractError::Write`] when the final flush fails.
    pub fn close(&mut self) -> Result<ExtractReport, ExtractError> {
        let result = self.output.close();
        let bytes_written = self.wrap(result)?;
        let counts = self.output.counts();
        info!(
            "Extract {}: wrote {} nodes, {} ways, {} relations ({} bytes)",
            self.name, counts.nodes, counts.ways, counts.relations, bytes_written
        );
        Ok(ExtractReport {
            name: self.name.clone(),
            bytes_written,
            counts,
        })
    }

    fn wrap<T>(&self, result: std::io::Result<T>) -> Result<T, ExtractError> {
        result.map_err(|source| ExtractError::Write {
            extract: self.name.clone(),
            source,
        })
    }
}
