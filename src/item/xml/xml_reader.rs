use crate::core::item::{ItemReader, ItemReaderResult};
use crate::error::BatchError;
use crate::record::{MetadataEntry, Record};
use log::{debug, error};
use quick_xml::encoding::Decoder;
use quick_xml::escape::{resolve_predefined_entity, unescape, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader as XmlReader;
use std::borrow::Cow;
use std::cell::Cell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Default tag of the elements turned into records.
pub const DEFAULT_RECORD_TAG: &str = "Record";

/// Default tag of the key/value children folded into a record.
pub const DEFAULT_METADATA_TAG: &str = "MetadataEntry";

/// An XML element with its attributes and child elements.
///
/// Text content is not kept: records carry their data in attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    fn from_start(
        start: &BytesStart,
        decoder: Decoder,
        entities: &HashMap<String, String>,
    ) -> Result<Self, BatchError> {
        let name = decoder
            .decode(start.name().as_ref())
            .map_err(|e| BatchError::XmlParse(format!("invalid element name: {}", e)))?
            .into_owned();

        let mut attributes: Vec<(String, String)> = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| {
                BatchError::XmlParse(format!("invalid attribute on <{}>: {}", name, e))
            })?;
            let key = decoder
                .decode(attr.key.as_ref())
                .map_err(|e| BatchError::XmlParse(format!("invalid attribute name: {}", e)))?
                .into_owned();
            let raw = decoder.decode(&attr.value).map_err(|e| {
                BatchError::XmlParse(format!("invalid value for attribute {}: {}", key, e))
            })?;
            // Literal whitespace is normalized before references are expanded,
            // so `&#10;` still yields a newline.
            let value = unescape_with(&normalize_whitespace(&raw), |entity| {
                match resolve_predefined_entity(entity) {
                    Some(value) => Some(value),
                    None => entities.get(entity).map(String::as_str),
                }
            })
            .map_err(|e| {
                BatchError::XmlParse(format!("invalid value for attribute {}: {}", key, e))
            })?
            .into_owned();
            attributes.push((key, value));
        }

        Ok(Element {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    /// Value of the attribute `name`, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Direct children named `name`, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }
}

/// A fully parsed XML document.
///
/// # Examples
///
/// ```
/// use record_flatten::item::xml::XmlDocument;
///
/// let document = XmlDocument::from_reader(
///     r#"<Export><Record id="1"/><Other/><Record id="2"/></Export>"#.as_bytes(),
/// )
/// .unwrap();
///
/// assert_eq!(document.root().name, "Export");
/// assert_eq!(document.root().children_named("Record").count(), 2);
/// ```
///
/// Malformed input is rejected as a whole:
///
/// ```
/// use record_flatten::{item::xml::XmlDocument, BatchError};
///
/// let result = XmlDocument::from_reader("<Export><Record id=\"1\"></Export>".as_bytes());
/// assert!(matches!(result, Err(BatchError::XmlParse(_))));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: Element,
}

impl XmlDocument {
    /// Parses the file at `path`. A missing or unreadable file is reported as
    /// a parse failure as well.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let file_path = path.as_ref();
        let file = File::open(file_path).map_err(|e| {
            error!("Failed to open XML file {}: {}", file_path.display(), e);
            BatchError::XmlParse(format!("{}: {}", file_path.display(), e))
        })?;

        debug!("Parsing XML document {}", file_path.display());
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<Self, BatchError> {
        Self::parse(XmlReader::from_reader(BufReader::new(rdr)))
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn into_root(self) -> Element {
        self.root
    }

    fn parse<B: BufRead>(mut reader: XmlReader<B>) -> Result<Self, BatchError> {
        reader.config_mut().trim_text(true);
        let decoder = reader.decoder();

        let mut buffer = Vec::with_capacity(1024);
        // Elements opened but not closed yet; the last one is the innermost.
        let mut open: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut entities: HashMap<String, String> = HashMap::new();

        loop {
            buffer.clear();
            let event = reader.read_event_into(&mut buffer).map_err(|e| {
                BatchError::XmlParse(format!(
                    "{} (at byte {})",
                    e,
                    reader.error_position()
                ))
            })?;

            match event {
                Event::Start(ref start) => {
                    let element = Element::from_start(start, decoder, &entities)?;
                    if open.is_empty() && root.is_some() {
                        return Err(junk_after_root(&element.name));
                    }
                    open.push(element);
                }
                Event::Empty(ref start) => {
                    let element = Element::from_start(start, decoder, &entities)?;
                    match open.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None if root.is_none() => root = Some(element),
                        None => return Err(junk_after_root(&element.name)),
                    }
                }
                Event::End(ref end) => {
                    let element = open.pop().ok_or_else(|| {
                        BatchError::XmlParse(format!(
                            "unexpected closing tag </{}>",
                            String::from_utf8_lossy(end.name().as_ref())
                        ))
                    })?;
                    match open.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Event::Text(ref text) if open.is_empty() => {
                    if !text.iter().all(u8::is_ascii_whitespace) {
                        return Err(BatchError::XmlParse(
                            "text content outside of the document element".to_string(),
                        ));
                    }
                }
                Event::CData(_) if open.is_empty() => {
                    return Err(BatchError::XmlParse(
                        "CDATA outside of the document element".to_string(),
                    ));
                }
                Event::GeneralRef(_) if open.is_empty() => {
                    return Err(BatchError::XmlParse(
                        "entity reference outside of the document element".to_string(),
                    ));
                }
                Event::DocType(ref doctype) => {
                    let declaration = decoder.decode(doctype).map_err(|e| {
                        BatchError::XmlParse(format!("invalid DOCTYPE declaration: {}", e))
                    })?;
                    entities = internal_entities(&declaration);
                    debug!("DOCTYPE declares {} internal entities", entities.len());
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(BatchError::XmlParse(format!(
                "unclosed element <{}> at end of input",
                unclosed.name
            )));
        }

        match root {
            Some(root) => {
                debug!(
                    "Parsed document <{}> with {} child elements",
                    root.name,
                    root.children.len()
                );
                Ok(XmlDocument { root })
            }
            None => Err(BatchError::XmlParse("no element found".to_string())),
        }
    }
}

/// Replaces each literal tab, line feed, carriage return and CRLF pair with a
/// single space, as XML requires for attribute values.
fn normalize_whitespace(raw: &str) -> Cow<'_, str> {
    if raw.contains(['\t', '\n', '\r']) {
        Cow::Owned(raw.replace("\r\n", " ").replace(['\t', '\n', '\r'], " "))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Collects the general entities declared with a quoted value in the internal
/// subset of a DOCTYPE. Parameter entities and external (`SYSTEM`/`PUBLIC`)
/// entities are skipped. The first declaration of a name wins.
fn internal_entities(doctype: &str) -> HashMap<String, String> {
    const DECLARATION: &str = "<!ENTITY";

    let mut entities = HashMap::new();
    let mut rest = doctype;
    while let Some(position) = rest.find(DECLARATION) {
        rest = rest[position + DECLARATION.len()..].trim_start();
        if rest.starts_with('%') {
            continue;
        }

        let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            continue;
        };
        let body = &rest[1..];
        let Some(end) = body.find(quote) else {
            break;
        };

        let value = normalize_whitespace(&body[..end]);
        let value = unescape(&value)
            .map(Cow::into_owned)
            .unwrap_or_else(|_| value.to_string());
        entities.entry(name.to_string()).or_insert(value);
        rest = &body[end + 1..];
    }
    entities
}

fn junk_after_root(name: &str) -> BatchError {
    BatchError::XmlParse(format!(
        "junk after document element: <{}> is a second top-level element",
        name
    ))
}

/// A builder for [`RecordItemReader`].
///
/// # Examples
///
/// ```
/// use record_flatten::item::xml::{RecordItemReaderBuilder, XmlDocument};
/// use record_flatten::core::item::ItemReader;
///
/// let xml = r#"
/// <Export>
///   <Record id="1" name="A">
///     <MetadataEntry key="color" value="red"/>
///   </Record>
///   <Record id="2" name="B"/>
/// </Export>"#;
///
/// let reader = RecordItemReaderBuilder::new()
///     .from_document(XmlDocument::from_reader(xml.as_bytes()).unwrap());
///
/// let first = reader.read().unwrap().unwrap();
/// assert_eq!(first.attributes[0], ("id".to_string(), "1".to_string()));
/// assert_eq!(first.metadata[0].key.as_deref(), Some("color"));
///
/// let second = reader.read().unwrap().unwrap();
/// assert!(second.metadata.is_empty());
///
/// assert!(reader.read().unwrap().is_none());
/// ```
pub struct RecordItemReaderBuilder {
    record_tag: String,
    metadata_tag: String,
}

impl Default for RecordItemReaderBuilder {
    fn default() -> Self {
        Self {
            record_tag: DEFAULT_RECORD_TAG.to_string(),
            metadata_tag: DEFAULT_METADATA_TAG.to_string(),
        }
    }
}

impl RecordItemReaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tag of the root's children that become records.
    pub fn record_tag<S: AsRef<str>>(mut self, tag: S) -> Self {
        self.record_tag = tag.as_ref().to_string();
        self
    }

    /// Sets the tag of the record children read as metadata entries.
    pub fn metadata_tag<S: AsRef<str>>(mut self, tag: S) -> Self {
        self.metadata_tag = tag.as_ref().to_string();
        self
    }

    pub fn from_document(self, document: XmlDocument) -> RecordItemReader {
        RecordItemReader {
            root: document.into_root(),
            record_tag: self.record_tag,
            metadata_tag: self.metadata_tag,
            position: Cell::new(0),
        }
    }

    /// Parses the file at `path` and creates a reader over its records.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<RecordItemReader, BatchError> {
        Ok(self.from_document(XmlDocument::from_path(path)?))
    }
}

/// Reads the root's direct record children of a parsed document, in document
/// order. Records nested deeper in the tree are not visited.
pub struct RecordItemReader {
    root: Element,
    record_tag: String,
    metadata_tag: String,
    /// Index of the next root child to examine.
    position: Cell<usize>,
}

impl RecordItemReader {
    fn to_record(&self, element: &Element) -> Record {
        Record {
            attributes: element.attributes.clone(),
            metadata: element
                .children_named(&self.metadata_tag)
                .map(|entry| MetadataEntry::new(entry.attribute("key"), entry.attribute("value")))
                .collect(),
        }
    }
}

impl ItemReader<Record> for RecordItemReader {
    fn read(&self) -> ItemReaderResult<Record> {
        let start = self.position.get();

        let found = self.root.children[start..]
            .iter()
            .enumerate()
            .find(|(_, child)| child.name == self.record_tag);

        match found {
            Some((offset, element)) => {
                self.position.set(start + offset + 1);
                Ok(Some(self.to_record(element)))
            }
            None => {
                self.position.set(self.root.children.len());
                debug!("No more <{}> elements", self.record_tag);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(xml: &str) -> Result<XmlDocument, BatchError> {
        XmlDocument::from_reader(xml.as_bytes())
    }

    fn read_all(reader: &RecordItemReader) -> Vec<Record> {
        let mut records = Vec::new();
        while let Some(record) = reader.read().unwrap() {
            records.push(record);
        }
        records
    }

    #[test]
    fn test_document_tree() {
        let document = parse(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <!-- export -->
            <Export version="2">
                <Record id="1">
                    <MetadataEntry key="a" value="b"/>
                    <MetadataEntry key="c" value="d"></MetadataEntry>
                </Record>
            </Export>"#,
        )
        .unwrap();

        let root = document.root();
        assert_eq!(root.name, "Export");
        assert_eq!(root.attribute("version"), Some("2"));
        assert_eq!(root.children.len(), 1);

        let record = &root.children[0];
        assert_eq!(record.children_named("MetadataEntry").count(), 2);
        assert_eq!(record.children[1].attribute("value"), Some("d"));
    }

    #[test]
    fn test_attribute_values_are_unescaped() {
        let document =
            parse(r#"<Export><Record note="a &amp; b &lt;c&gt; &quot;q&quot;"/></Export>"#).unwrap();

        assert_eq!(
            document.root().children[0].attribute("note"),
            Some(r#"a & b <c> "q""#)
        );
    }

    #[test]
    fn test_attribute_whitespace_is_normalized() {
        let document = parse("<E><Record a=\"x\ny\tz\r\nw\" b=\"one&#10;two&#9;three\"/></E>")
            .unwrap();
        let record = &document.root().children[0];

        assert_eq!(record.attribute("a"), Some("x y z w"));
        assert_eq!(record.attribute("b"), Some("one\ntwo\tthree"));
    }

    #[test]
    fn test_internal_entities_are_expanded() {
        let document = parse(
            r#"<!DOCTYPE Export [
  <!ENTITY co "Acme">
  <!ENTITY full 'Acme &amp; Sons'>
  <!ENTITY % param "ignored">
  <!ENTITY logo SYSTEM "logo.gif">
]>
<Export><Record company="&co;" name="&full;" plain="&lt;x&gt;"/></Export>"#,
        )
        .unwrap();
        let record = &document.root().children[0];

        assert_eq!(record.attribute("company"), Some("Acme"));
        assert_eq!(record.attribute("name"), Some("Acme & Sons"));
        assert_eq!(record.attribute("plain"), Some("<x>"));
    }

    #[test]
    fn test_undeclared_entity_is_rejected() {
        assert!(matches!(
            parse(r#"<!DOCTYPE Export><Export><Record a="&co;"/></Export>"#),
            Err(BatchError::XmlParse(_))
        ));
    }

    #[test]
    fn test_internal_entities_scan() {
        let entities = internal_entities(
            "E [ <!ENTITY a \"1\"> <!ENTITY a \"2\"> <!ENTITY %p \"x\"> <!ENTITY b 'two\nlines'> ]",
        );

        assert_eq!(entities.len(), 2);
        assert_eq!(entities["a"], "1");
        assert_eq!(entities["b"], "two lines");
        assert!(internal_entities("HealthData").is_empty());
    }

    #[test]
    fn test_attribute_order_is_kept() {
        let document = parse(r#"<Export><Record z="1" a="2" m="3"/></Export>"#).unwrap();

        let keys: Vec<&str> = document.root().children[0]
            .attributes
            .iter()
            .map(|(key, _)| key.as_str())
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_unclosed_tag_is_rejected() {
        let result = parse(r#"<Export><Record id="1">"#);
        assert!(matches!(result, Err(BatchError::XmlParse(_))));
    }

    #[test]
    fn test_mismatched_end_tag_is_rejected() {
        assert!(matches!(
            parse("<Export><Record></Export>"),
            Err(BatchError::XmlParse(_))
        ));
    }

    #[test]
    fn test_duplicate_attribute_is_rejected() {
        assert!(matches!(
            parse(r#"<Export><Record id="1" id="2"/></Export>"#),
            Err(BatchError::XmlParse(_))
        ));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(parse(""), Err(BatchError::XmlParse(msg)) if msg == "no element found"));
        assert!(matches!(parse("   \n"), Err(BatchError::XmlParse(_))));
    }

    #[test]
    fn test_second_root_is_rejected() {
        assert!(matches!(
            parse("<Export/><Export/>"),
            Err(BatchError::XmlParse(_))
        ));
        assert!(matches!(
            parse("<Export></Export><Other></Other>"),
            Err(BatchError::XmlParse(_))
        ));
    }

    #[test]
    fn test_text_outside_root_is_rejected() {
        assert!(matches!(
            parse("<Export></Export>trailing"),
            Err(BatchError::XmlParse(_))
        ));
        assert!(matches!(
            parse("<E><Record a=\"1\"/></E>&amp;"),
            Err(BatchError::XmlParse(_))
        ));
        assert!(matches!(
            parse("&#65;<E/>"),
            Err(BatchError::XmlParse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_a_parse_error() {
        let result = XmlDocument::from_path("/nonexistent/dir/export.xml");
        assert!(matches!(result, Err(BatchError::XmlParse(_))));
    }

    #[test]
    fn test_reader_from_path() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(br#"<Export><Record id="1"/><Record id="2"/></Export>"#)
            .unwrap();

        let reader = RecordItemReaderBuilder::new()
            .from_path(temp_file.path())
            .unwrap();

        let records = read_all(&reader);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].attributes, vec![("id".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_only_direct_children_are_records() {
        let document = parse(
            r#"<Export>
                <Record id="1"><Record id="nested"/></Record>
                <Group><Record id="deep"/></Group>
                <Record id="2"/>
            </Export>"#,
        )
        .unwrap();

        let reader = RecordItemReaderBuilder::new().from_document(document);
        let ids: Vec<String> = read_all(&reader)
            .into_iter()
            .map(|record| record.attributes[0].1.clone())
            .collect();

        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_metadata_entries_keep_missing_attributes() {
        let document = parse(
            r#"<Export><Record>
                <MetadataEntry key="k1" value="v1"/>
                <MetadataEntry key="k2"/>
                <MetadataEntry value="orphan"/>
                <Nested><MetadataEntry key="deep" value="x"/></Nested>
            </Record></Export>"#,
        )
        .unwrap();

        let reader = RecordItemReaderBuilder::new().from_document(document);
        let record = reader.read().unwrap().unwrap();

        assert!(record.attributes.is_empty());
        assert_eq!(
            record.metadata,
            vec![
                MetadataEntry::new(Some("k1"), Some("v1")),
                MetadataEntry::new(Some("k2"), None),
                MetadataEntry::new(None, Some("orphan")),
            ]
        );
    }

    #[test]
    fn test_custom_tags() {
        let document = parse(
            r#"<rows><row id="1"><meta key="a" value="b"/></row><Record id="x"/></rows>"#,
        )
        .unwrap();

        let reader = RecordItemReaderBuilder::new()
            .record_tag("row")
            .metadata_tag("meta")
            .from_document(document);

        let records = read_all(&reader);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metadata[0].value.as_deref(), Some("b"));
    }

    #[test]
    fn test_no_records() {
        let reader = RecordItemReaderBuilder::new().from_document(parse("<Export/>").unwrap());

        assert!(reader.read().unwrap().is_none());
        // Exhausted readers stay exhausted.
        assert!(reader.read().unwrap().is_none());
    }
}
