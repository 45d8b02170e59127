//! Error types raised while configuring and running extract strategies.

use std::{error::Error as StdError, io};

use thiserror::Error;

use crate::order::OrderError;

/// Errors that abort an extraction run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractError {
    /// The strategy name is not recognised.
    #[error("unknown strategy `{name}` (expected simple, complete_ways or smart)")]
    UnknownStrategy {
        /// Name as supplied.
        name: String,
    },
    /// A strategy option could not be interpreted.
    #[error(transparent)]
    Option(#[from] OptionError),
    /// The strategy cannot handle history input.
    #[error("strategy `{strategy}` does not support input with history")]
    HistoryUnsupported {
        /// Strategy name.
        strategy: &'static str,
    },
    /// A multi-pass strategy was given an input that can only be read once.
    #[error("strategy `{strategy}` reads the input {passes} times but {input} cannot be reread")]
    NotRereadable {
        /// Strategy name.
        strategy: &'static str,
        /// Number of passes the strategy needs.
        passes: usize,
        /// Description of the input.
        input: String,
    },
    /// No extracts were configured.
    #[error("no extracts configured")]
    NoExtracts,
    /// The input violates the ordering the strategies rely on.
    #[error("input {input} is not ordered: {source}")]
    Order {
        /// Description of the input.
        input: String,
        /// Details of the violation.
        #[source]
        source: OrderError,
    },
    /// Reading or decoding the input failed.
    #[error("failed to read {input}")]
    Read {
        /// Description of the input.
        input: String,
        /// Underlying source error.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    /// Writing an extract output failed.
    #[error("failed to write extract {extract}")]
    Write {
        /// Extract name.
        extract: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Errors raised while parsing `name=value` strategy options.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionError {
    /// The option is not of the form `name=value` or `name`.
    #[error("strategy option `{option}` is malformed")]
    Malformed {
        /// Option as supplied.
        option: String,
    },
    /// The value does not parse for this option.
    #[error("invalid value `{value}` for strategy option `{name}`: expected {expected}")]
    InvalidValue {
        /// Option name.
        name: String,
        /// Value as supplied.
        value: String,
        /// Description of the accepted values.
        expected: &'static str,
    },
}
