//! Changeset document reader
//!
//! Parses a changeset document into an ordered sequence of
//! [`ChangeRecord`]s plus the envelope timestamp. The document is an XML
//! envelope element `<osmChange timestamp="...">` containing `<create>`,
//! `<modify>`, and `<delete>` groups; each group child is a `<node>`,
//! `<way>`, or `<relation>` element carrying an `id` attribute. Wire
//! element names map onto the crate's element kinds: `node` → point,
//! `way` → line, `relation` → relation.
//!
//! Sources whose file name ends in `.gz` are decompressed transparently;
//! decompression is streaming, so large changesets never materialize
//! uncompressed in memory.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use flate2::read::GzDecoder;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use tracing::debug;

use crate::snapshot::{ElementId, ElementKind};

/// Timestamp format carried by the changeset envelope.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// The action a change record applies to its element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    /// The element exists only in the new snapshot.
    Create,
    /// The element exists in both snapshots; its geometry may have moved.
    Modify,
    /// The element exists only in the base snapshot.
    Delete,
}

/// One entry of a changeset: an action applied to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeRecord {
    /// The action performed.
    pub action: ChangeAction,
    /// Kind of the affected element.
    pub kind: ElementKind,
    /// Identifier of the affected element.
    pub id: ElementId,
}

/// A parsed changeset: envelope timestamp plus ordered change records.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    /// Envelope timestamp.
    pub timestamp: DateTime<Utc>,
    /// Change records in document order.
    pub records: Vec<ChangeRecord>,
}

impl ChangeSet {
    /// Read a changeset from a file, decompressing `.gz` sources.
    pub fn from_path(path: &Path) -> Result<Self, ChangesetError> {
        debug!(path = %path.display(), "reading changeset");
        let file = File::open(path)?;
        if path.extension().is_some_and(|ext| ext == "gz") {
            Self::from_reader(BufReader::new(GzDecoder::new(file)))
        } else {
            Self::from_reader(BufReader::new(file))
        }
    }

    /// Parse a changeset from any buffered byte stream.
    pub fn from_reader<R: BufRead>(source: R) -> Result<Self, ChangesetError> {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut timestamp: Option<DateTime<Utc>> = None;
        let mut action: Option<ChangeAction> = None;
        let mut records = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                    b"osmChange" => timestamp = Some(parse_timestamp(&e)?),
                    b"create" => action = Some(ChangeAction::Create),
                    b"modify" => action = Some(ChangeAction::Modify),
                    b"delete" => action = Some(ChangeAction::Delete),
                    name => {
                        // Elements outside any action group are not part
                        // of the changeset body.
                        if let Some(current) = action {
                            match element_kind(name) {
                                Some(kind) => records.push(ChangeRecord {
                                    action: current,
                                    kind,
                                    id: parse_id(&e)?,
                                }),
                                None => debug!(
                                    element = %String::from_utf8_lossy(name),
                                    "skipping unknown changeset element"
                                ),
                            }
                        }
                    }
                },
                Event::End(e) => {
                    if matches!(e.name().as_ref(), b"create" | b"modify" | b"delete") {
                        action = None;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let timestamp = timestamp.ok_or(ChangesetError::MissingEnvelope)?;
        debug!(records = records.len(), %timestamp, "changeset parsed");
        Ok(ChangeSet { timestamp, records })
    }

    /// Whether the changeset carries no change records.
    ///
    /// An empty changeset is not an error; analysis treats it as "no
    /// changes to process".
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn element_kind(name: &[u8]) -> Option<ElementKind> {
    match name {
        b"node" => Some(ElementKind::Point),
        b"way" => Some(ElementKind::Line),
        b"relation" => Some(ElementKind::Relation),
        _ => None,
    }
}

fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, ChangesetError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn parse_timestamp(e: &BytesStart<'_>) -> Result<DateTime<Utc>, ChangesetError> {
    let value = attribute(e, b"timestamp")?.ok_or(ChangesetError::MissingTimestamp)?;
    let parsed = NaiveDateTime::parse_from_str(&value, TIMESTAMP_FORMAT)
        .map_err(|source| ChangesetError::InvalidTimestamp { value, source })?;
    Ok(parsed.and_utc())
}

fn parse_id(e: &BytesStart<'_>) -> Result<ElementId, ChangesetError> {
    let element = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let value = attribute(e, b"id")?.ok_or_else(|| ChangesetError::MissingId {
        element: element.clone(),
    })?;
    value
        .parse()
        .map_err(|_| ChangesetError::InvalidId { element, value })
}

/// Errors surfaced while reading a changeset document.
#[derive(Debug, Error)]
pub enum ChangesetError {
    /// The source could not be opened or read.
    #[error("I/O error reading changeset: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not well-formed XML.
    #[error("malformed changeset document: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An attribute could not be decoded.
    #[error("malformed changeset attribute: {0}")]
    Attr(#[from] AttrError),

    /// No `osmChange` envelope element was found.
    #[error("changeset document has no osmChange envelope")]
    MissingEnvelope,

    /// The envelope carries no timestamp attribute.
    #[error("changeset envelope has no timestamp attribute")]
    MissingTimestamp,

    /// The envelope timestamp does not match `YYYY-MM-DDTHH:MM:SSZ`.
    #[error("malformed changeset timestamp {value:?}: {source}")]
    InvalidTimestamp {
        /// The offending attribute text.
        value: String,
        /// Underlying parse failure.
        source: chrono::ParseError,
    },

    /// A change element carries no id attribute.
    #[error("changeset element <{element}> has no id attribute")]
    MissingId {
        /// Wire name of the offending element.
        element: String,
    },

    /// A change element id is not an integer.
    #[error("changeset element <{element}> has malformed id {value:?}")]
    InvalidId {
        /// Wire name of the offending element.
        element: String,
        /// The offending attribute text.
        value: String,
    },
}
