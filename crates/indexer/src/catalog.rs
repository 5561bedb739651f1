use crate::{IndexerError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::iter::FusedIterator;

const COMPONENT_TAG: &[u8] = b"component";
const ID_TAG: &[u8] = b"id";
const CATEGORY_TAG: &[u8] = b"category";
const TYPE_ATTR: &[u8] = b"type";

/// One catalog component, as seen between its opening and closing tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Application identifier (first non-empty `<id>` in the component)
    pub id: String,

    /// Value of the component's `type` attribute
    pub component_type: String,

    /// Raw category values in document order
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Category,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            ID_TAG => Some(Self::Id),
            CATEGORY_TAG => Some(Self::Category),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Capture {
    field: Field,
    text: String,
}

#[derive(Debug)]
enum Scope {
    Outside,
    Inside(ComponentRecord),
}

/// Pull-based stream of [`ComponentRecord`]s over an AppStream XML buffer.
///
/// Holds at most one partially built record. After a tokenizer error the stream
/// yields that error once and then ends. Input without a root element, text outside
/// the root, or a document that ends with elements still open is a parse error.
pub struct ComponentStream<'a> {
    reader: Reader<&'a [u8]>,
    scope: Scope,
    capture: Option<Capture>,
    depth: usize,
    seen_root: bool,
    finished: bool,
}

/// Stream the components of an AppStream catalog.
pub fn stream_components(xml: &[u8]) -> ComponentStream<'_> {
    ComponentStream {
        reader: Reader::from_reader(xml),
        scope: Scope::Outside,
        capture: None,
        depth: 0,
        seen_root: false,
        finished: false,
    }
}

/// Parse every component eagerly. Mostly useful for small catalogs and tests.
pub fn collect_components(xml: &[u8]) -> Result<Vec<ComponentRecord>> {
    stream_components(xml).collect()
}

impl ComponentStream<'_> {
    fn next_record(&mut self) -> Result<Option<ComponentRecord>> {
        loop {
            let event = self.reader.read_event().map_err(|err| {
                IndexerError::parse(format!(
                    "{err} (near byte {})",
                    self.reader.buffer_position()
                ))
            })?;

            match event {
                Event::Start(start) => {
                    self.enter_element()?;
                    self.depth += 1;
                    self.open(&start);
                }
                Event::Empty(start) => {
                    self.enter_element()?;
                    if start.local_name().as_ref() == COMPONENT_TAG {
                        self.open(&start);
                        if let Some(record) = self.close(COMPONENT_TAG) {
                            return Ok(Some(record));
                        }
                    }
                }
                Event::Text(text) => {
                    if self.depth == 0 {
                        if !text.iter().all(u8::is_ascii_whitespace) {
                            return Err(self.structure_error("text outside the root element"));
                        }
                        continue;
                    }
                    if let Some(capture) = self.capture.as_mut() {
                        let value = text
                            .unescape()
                            .map_err(|err| IndexerError::parse(err.to_string()))?;
                        capture.text.push_str(&value);
                    }
                }
                Event::CData(data) => {
                    if self.depth == 0 {
                        return Err(self.structure_error("CDATA outside the root element"));
                    }
                    if let Some(capture) = self.capture.as_mut() {
                        capture.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::End(end) => {
                    self.depth = self.depth.saturating_sub(1);
                    if let Some(record) = self.close(end.local_name().as_ref()) {
                        return Ok(Some(record));
                    }
                }
                Event::Eof => {
                    if !self.seen_root {
                        return Err(IndexerError::parse("catalog has no root element"));
                    }
                    if self.depth > 0 {
                        return Err(self.structure_error(&format!(
                            "document ends with {} unclosed element(s)",
                            self.depth
                        )));
                    }
                    return Ok(None);
                }
                _ => {}
            }
        }
    }

    fn enter_element(&mut self) -> Result<()> {
        if self.depth == 0 {
            if self.seen_root {
                return Err(self.structure_error("more than one root element"));
            }
            self.seen_root = true;
        }
        Ok(())
    }

    fn structure_error(&self, what: &str) -> IndexerError {
        IndexerError::parse(format!(
            "{what} (near byte {})",
            self.reader.buffer_position()
        ))
    }

    fn open(&mut self, start: &BytesStart<'_>) {
        let name = start.local_name();
        let name = name.as_ref();

        if name == COMPONENT_TAG {
            if matches!(self.scope, Scope::Inside(_)) {
                log::debug!("Nested <component> opened; restarting the current record");
            }
            self.capture = None;
            self.scope = Scope::Inside(ComponentRecord {
                component_type: component_type(start),
                ..Default::default()
            });
            return;
        }

        if matches!(self.scope, Scope::Outside) {
            return;
        }
        if let Some(field) = Field::from_local_name(name) {
            self.capture = Some(Capture {
                field,
                text: String::new(),
            });
        }
    }

    fn close(&mut self, name: &[u8]) -> Option<ComponentRecord> {
        if name == COMPONENT_TAG {
            self.capture = None;
            return match std::mem::replace(&mut self.scope, Scope::Outside) {
                Scope::Inside(record) => Some(record),
                Scope::Outside => {
                    log::debug!(
                        "Skipping </component> without an open component (near byte {})",
                        self.reader.buffer_position()
                    );
                    None
                }
            };
        }

        let Scope::Inside(record) = &mut self.scope else {
            return None;
        };
        let field = Field::from_local_name(name)?;
        if self.capture.as_ref().map(|capture| capture.field) != Some(field) {
            return None;
        }
        let capture = self.capture.take()?;
        let value = capture.text.trim();

        match field {
            Field::Id => {
                if record.id.is_empty() && !value.is_empty() {
                    record.id = value.to_string();
                }
            }
            Field::Category => {
                if !value.is_empty() {
                    record.categories.push(value.to_string());
                }
            }
        }
        None
    }
}

impl Iterator for ComponentStream<'_> {
    type Item = Result<ComponentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

impl FusedIterator for ComponentStream<'_> {}

fn component_type(start: &BytesStart<'_>) -> String {
    start
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == TYPE_ATTR)
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
        .unwrap_or_default()
}
