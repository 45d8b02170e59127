//! `name=value` strategy options.

use log::warn;

use crate::OptionError;

/// Options passed to a strategy, consumed by name as the strategy is built.
///
/// A bare `name` is shorthand for `name=true`. When a name repeats, the last
/// value wins.
///
/// # Examples
/// ```
/// use osm_extract_core::StrategyOptions;
///
/// let mut options = StrategyOptions::parse(["relations=no"])?;
/// assert!(!options.take_bool("relations", true)?);
/// # Ok::<(), osm_extract_core::OptionError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyOptions {
    entries: Vec<(String, String)>,
}

impl StrategyOptions {
    /// Parse a list of `name=value` options.
    ///
    /// # Errors
    /// Returns [`OptionError::Malformed`] for an option with an empty name.
    pub fn parse<I, S>(options: I) -> Result<Self, OptionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = options
            .into_iter()
            .map(|option| {
                let option = option.as_ref().trim();
                let (name, value) = option.split_once('=').unwrap_or((option, "true"));
                let name = name.trim();
                if name.is_empty() {
                    return Err(OptionError::Malformed {
                        option: option.to_owned(),
                    });
                }
                Ok((name.to_owned(), value.trim().to_owned()))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { entries })
    }

    /// Whether no options remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every occurrence of `name`, returning the last value.
    pub fn take(&mut self, name: &str) -> Option<String> {
        let mut found = None;
        self.entries.retain(|(key, value)| {
            if key == name {
                found = Some(value.clone());
                false
            } else {
                true
            }
        });
        found
    }

    /// Take a boolean option (`true`/`false`/`yes`/`no`).
    ///
    /// # Errors
    /// Returns [`OptionError::InvalidValue`] for any other value.
    pub fn take_bool(&mut self, name: &str, default: bool) -> Result<bool, OptionError> {
        let Some(value) = self.take(name) else {
            return Ok(default);
        };
        match value.as_str() {
            "true" | "yes" => Ok(true),
            "false" | "no" => Ok(false),
            _ => Err(OptionError::InvalidValue {
                name: name.to_owned(),
                value,
                expected: "true, false, yes or no",
            }),
        }
    }

    /// Take a comma-separated list. An empty value yields an empty list.
    pub fn take_list(&mut self, name: &str) -> Option<Vec<String>> {
        self.take(name).map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_owned)
                .collect()
        })
    }

    /// Take an integer percentage between 0 and 100.
    ///
    /// # Errors
    /// Returns [`OptionError::InvalidValue`] when the value is not an
    /// integer in range.
    pub fn take_percentage(&mut self, name: &str, default: u8) -> Result<u8, OptionError> {
        let Some(value) = self.take(name) else {
            return Ok(default);
        };
        match value.parse::<u8>() {
            Ok(percent) if percent <= 100 => Ok(percent),
            _ => Err(OptionError::InvalidValue {
                name: name.to_owned(),
                value,
                expected: "an integer between 0 and 100",
            }),
        }
    }

    /// Log every option the strategy did not consume.
    pub fn warn_unused(self, strategy: &str) {
        for (name, value) in self.entries {
            warn!("Ignoring unknown option `{name}={value}` for strategy {strategy}");
        }
    }
}
