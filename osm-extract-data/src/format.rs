//! Output format selection and the header overrides shared by the encoders.

use std::{fmt, str::FromStr};

use camino::Utf8Path;
use osm_extract_core::{BoundingBox, COORDINATE_PRECISION, EntityEncoder};
use thiserror::Error;

use crate::{opl::OplEncoder, xml::XmlEncoder};

/// Generator name written when the header does not override it.
pub const DEFAULT_GENERATOR: &str = concat!("osm-extract/", env!("CARGO_PKG_VERSION"));

/// Errors raised while choosing an output format or validating its header.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("unknown output format `{format}` (expected opl or osm)")]
    Unknown { format: String },
    #[error("output format `{format}` cannot be written; use opl or osm")]
    Unsupported { format: String },
    #[error("`{key}` is not a valid output header key")]
    HeaderKey { key: String },
}

/// Encodings extracts can be written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One line per entity.
    #[default]
    Opl,
    /// OSM XML 0.6.
    Xml,
}

impl OutputFormat {
    /// Guess the format from a file name, looking only at the suffix.
    ///
    /// # Errors
    /// Returns [`FormatError::Unsupported`] for PBF outputs.
    ///
    /// # Examples
    /// ```
    /// use camino::Utf8Path;
    /// use osm_extract_data::OutputFormat;
    ///
    /// let format = OutputFormat::from_path(Utf8Path::new("out/berlin.osm"))?;
    /// assert_eq!(format, Some(OutputFormat::Xml));
    /// # Ok::<(), osm_extract_data::FormatError>(())
    /// ```
    pub fn from_path(path: &Utf8Path) -> Result<Option<Self>, FormatError> {
        let name = path.file_name().unwrap_or_default().to_ascii_lowercase();
        if name.ends_with(".pbf") {
            return Err(FormatError::Unsupported {
                format: "pbf".to_owned(),
            });
        }
        Ok(if name.ends_with(".opl") {
            Some(Self::Opl)
        } else if name.ends_with(".osm") || name.ends_with(".xml") {
            Some(Self::Xml)
        } else {
            None
        })
    }

    /// Conventional name of the format.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Opl => "opl",
            Self::Xml => "osm",
        }
    }

    /// Build an encoder for an extract covering `envelope`.
    #[must_use]
    pub fn encoder(self, envelope: BoundingBox, header: &OutputHeader) -> Box<dyn EntityEncoder> {
        match self {
            Self::Opl => Box::new(OplEncoder),
            Self::Xml => Box::new(XmlEncoder::new(envelope, header.clone())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "opl" => Ok(Self::Opl),
            "osm" | "xml" => Ok(Self::Xml),
            "pbf" | "osm.pbf" => Err(FormatError::Unsupported {
                format: value.to_owned(),
            }),
            _ => Err(FormatError::Unknown {
                format: value.to_owned(),
            }),
        }
    }
}

/// Attributes written on the output's root element.
///
/// Keys must be XML names; `version` is fixed by the format and cannot be
/// overridden.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputHeader {
    entries: Vec<(String, String)>,
}

impl OutputHeader {
    /// Set `key`, replacing an earlier value.
    ///
    /// # Errors
    /// Returns [`FormatError::HeaderKey`] when `key` is not usable as an
    /// attribute name.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), FormatError> {
        if key == "version" || !is_xml_name(key) {
            return Err(FormatError::HeaderKey {
                key: key.to_owned(),
            });
        }
        match self.entries.iter_mut().find(|(existing, _)| existing == key) {
            Some(entry) => entry.1 = value.to_owned(),
            None => self.entries.push((key.to_owned(), value.to_owned())),
        }
        Ok(())
    }

    /// Value stored for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

fn is_xml_name(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_' || first == ':')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
}

/// Append a fixed-point coordinate in degrees, without trailing zeros.
pub(crate) fn push_coordinate(out: &mut String, value: i32) {
    let precision = COORDINATE_PRECISION.unsigned_abs();
    let magnitude = value.unsigned_abs();
    if value < 0 {
        out.push('-');
    }
    out.push_str(&(magnitude / precision).to_string());
    let fraction = magnitude % precision;
    if fraction != 0 {
        let digits = format!("{fraction:07}");
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
}
