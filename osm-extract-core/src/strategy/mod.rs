//! Extraction strategies.
//!
//! A strategy owns the extracts for the duration of one run, drives one to
//! three passes over the input and closes every output at the end. Each
//! variant keeps its selections in per-extract [`IdSet`]s that only grow.

mod complete_ways;
mod complete_ways_history;
mod options;
mod simple;
mod smart;

use std::{fmt, marker::PhantomData, str::FromStr};

use log::{debug, info};

pub use complete_ways::CompleteWays;
pub use complete_ways_history::CompleteWaysWithHistory;
pub use options::StrategyOptions;
pub use simple::Simple;
pub use smart::{Smart, SmartSettings, TagRule};

use crate::{
    EntityKind, EntitySource, Extract, ExtractError, ExtractReport, IdSet, Node, OptionError,
    OrderCheck, Pass, Progress, Relation, Way,
};

/// A complete extraction plan over a fixed set of extracts.
pub trait Strategy {
    /// Name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Number of passes [`Strategy::run`] makes over the input.
    fn passes(&self) -> usize;

    /// Run every pass and close all extract outputs.
    ///
    /// # Errors
    /// Returns the first read, order or write error; outputs are left as
    /// they were when the error occurred.
    fn run(
        &mut self,
        source: &dyn EntitySource,
        progress: &mut Progress,
    ) -> Result<Vec<ExtractReport>, ExtractError>;
}

/// Strategies selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    /// One pass, no completion.
    Simple,
    /// Two passes, ways completed and parent relations closed.
    #[default]
    CompleteWays,
    /// Three passes with type, tag and threshold driven relation adoption.
    Smart,
}

impl StrategyKind {
    /// Canonical name as accepted on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::CompleteWays => "complete_ways",
            Self::Smart => "smart",
        }
    }

    /// Passes the strategy makes over its input.
    #[must_use]
    pub const fn passes(self) -> usize {
        match self {
            Self::Simple => 1,
            Self::CompleteWays => 2,
            Self::Smart => 3,
        }
    }

    /// Whether the strategy accepts input carrying several object versions.
    #[must_use]
    pub const fn supports_history(self) -> bool {
        matches!(self, Self::CompleteWays)
    }

    /// Parse the options this strategy understands without building it, so
    /// callers can reject bad values before creating any output.
    ///
    /// # Errors
    /// Returns an [`ExtractError::Option`] for malformed option values.
    pub fn check_options(self, options: &StrategyOptions) -> Result<(), ExtractError> {
        self.settings(&mut options.clone())?;
        Ok(())
    }

    fn settings(self, options: &mut StrategyOptions) -> Result<Settings, OptionError> {
        Ok(match self {
            Self::Simple => Settings::Simple,
            Self::CompleteWays => Settings::CompleteWays {
                relations: options.take_bool("relations", true)?,
            },
            Self::Smart => Settings::Smart(SmartSettings::from_options(options)?),
        })
    }

    /// Reject `source` up front when this strategy cannot process it.
    ///
    /// # Errors
    /// Returns [`ExtractError::HistoryUnsupported`] or
    /// [`ExtractError::NotRereadable`].
    pub fn check_source(self, source: &dyn EntitySource, history: bool) -> Result<(), ExtractError> {
        if history && !self.supports_history() {
            return Err(ExtractError::HistoryUnsupported {
                strategy: self.name(),
            });
        }
        if self.passes() > 1 && !source.is_rereadable() {
            return Err(ExtractError::NotRereadable {
                strategy: self.name(),
                passes: self.passes(),
                input: source.name().to_owned(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Self::Simple),
            "complete_ways" => Ok(Self::CompleteWays),
            "smart" => Ok(Self::Smart),
            other => Err(ExtractError::UnknownStrategy {
                name: other.to_owned(),
            }),
        }
    }
}

/// Options consumed by one strategy kind.
enum Settings {
    Simple,
    CompleteWays { relations: bool },
    Smart(SmartSettings),
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Strategy name.
    pub strategy: &'static str,
    /// Passes made over the input.
    pub passes: usize,
    /// One report per extract, in configuration order.
    pub extracts: Vec<ExtractReport>,
}

/// Construct the strategy `kind` over `extracts`.
///
/// `history` states whether the input may repeat objects across versions;
/// `complete_ways` then switches to its history-aware variant while the
/// other strategies refuse to run. Options not consumed by the strategy are
/// logged and ignored.
///
/// # Errors
/// Returns [`ExtractError::NoExtracts`], [`ExtractError::HistoryUnsupported`]
/// or an [`ExtractError::Option`] for malformed option values.
pub fn build_strategy(
    kind: StrategyKind,
    mut options: StrategyOptions,
    extracts: Vec<Extract>,
    history: bool,
) -> Result<Box<dyn Strategy>, ExtractError> {
    if extracts.is_empty() {
        return Err(ExtractError::NoExtracts);
    }
    if history && !kind.supports_history() {
        return Err(ExtractError::HistoryUnsupported {
            strategy: kind.name(),
        });
    }
    let strategy: Box<dyn Strategy> = match kind.settings(&mut options)? {
        Settings::Simple => Box::new(Simple::new(extracts)),
        Settings::CompleteWays { relations } if history => {
            Box::new(CompleteWaysWithHistory::new(extracts, relations))
        }
        Settings::CompleteWays { relations } => Box::new(CompleteWays::new(extracts, relations)),
        Settings::Smart(settings) => Box::new(Smart::new(extracts, settings)),
    };
    options.warn_unused(strategy.name());
    Ok(strategy)
}

/// Run `strategy` against `source`.
///
/// # Errors
/// Returns [`ExtractError::NotRereadable`] before any pass when a
/// multi-pass strategy is given a read-once source, otherwise whatever the
/// strategy raises.
pub fn run_strategy(
    strategy: &mut dyn Strategy,
    source: &dyn EntitySource,
) -> Result<RunReport, ExtractError> {
    let passes = strategy.passes();
    if passes > 1 && !source.is_rereadable() {
        return Err(ExtractError::NotRereadable {
            strategy: strategy.name(),
            passes,
            input: source.name().to_owned(),
        });
    }
    info!(
        "Running strategy {} ({passes} passes) over {}",
        strategy.name(),
        source.name()
    );
    let mut progress = Progress::new(passes, source.size());
    let extracts = strategy.run(source, &mut progress)?;
    info!("Finished strategy {}", strategy.name());
    Ok(RunReport {
        strategy: strategy.name(),
        passes,
        extracts,
    })
}

/// Per-extract state owning the extract it selects for.
pub(crate) trait Selection {
    fn extract_mut(&mut self) -> &mut Extract;
}

/// Selection whose output is written by a final [`WritePass`].
pub(crate) trait WriteSelection: Selection {
    fn wants_node(&self, id: i64) -> bool;
    fn wants_way(&self, id: i64) -> bool;
    fn wants_relation(&self, id: i64) -> bool;
}

/// Final pass writing every wanted entity in file order.
pub(crate) struct WritePass<S> {
    selection: PhantomData<fn(&mut S)>,
}

impl<S> WritePass<S> {
    pub(crate) const fn new() -> Self {
        Self {
            selection: PhantomData,
        }
    }
}

impl<S: WriteSelection> Pass for WritePass<S> {
    type Extract = S;

    fn enode(&mut self, extract: &mut S, node: &Node) -> Result<(), ExtractError> {
        if extract.wants_node(node.id) {
            extract.extract_mut().write_node(node)?;
        }
        Ok(())
    }

    fn eway(&mut self, extract: &mut S, way: &Way) -> Result<(), ExtractError> {
        if extract.wants_way(way.id) {
            extract.extract_mut().write_way(way)?;
        }
        Ok(())
    }

    fn erelation(&mut self, extract: &mut S, relation: &Relation) -> Result<(), ExtractError> {
        if extract.wants_relation(relation.id) {
            extract.extract_mut().write_relation(relation)?;
        }
        Ok(())
    }
}

/// Close every extract output, collecting the reports.
pub(crate) fn close_all<S: Selection>(
    extracts: &mut [S],
) -> Result<Vec<ExtractReport>, ExtractError> {
    extracts
        .iter_mut()
        .map(|selection| selection.extract_mut().close())
        .collect()
}

/// Order check wired to the source name for error reporting.
#[derive(Debug)]
pub(crate) struct OrderGuard {
    check: OrderCheck,
    input: String,
}

impl OrderGuard {
    pub(crate) fn new(source: &dyn EntitySource, history: bool) -> Self {
        let check = if history {
            OrderCheck::with_history()
        } else {
            OrderCheck::new()
        };
        Self {
            check,
            input: source.name().to_owned(),
        }
    }

    pub(crate) fn check(
        &mut self,
        kind: EntityKind,
        id: i64,
        version: Option<u32>,
    ) -> Result<(), ExtractError> {
        self.check
            .check_parts(kind, id, version)
            .map_err(|source| ExtractError::Order {
                input: self.input.clone(),
                source,
            })
    }
}

/// Log the size and memory footprint of named ID sets.
pub(crate) fn log_sets(extract: &str, sets: &[(&str, &IdSet)]) {
    for (label, ids) in sets {
        debug!(
            "Extract {extract}: {label} holds {} ids in {} bytes",
            ids.len(),
            ids.used_memory()
        );
    }
}

/// Whether any node or way member of `relation` is selected.
pub(crate) fn has_selected_member(relation: &Relation, nodes: &IdSet, ways: &IdSet) -> bool {
    relation.members.iter().any(|member| match member.kind {
        EntityKind::Node => nodes.get(member.id),
        EntityKind::Way => ways.get(member.id),
        EntityKind::Relation => false,
    })
}
