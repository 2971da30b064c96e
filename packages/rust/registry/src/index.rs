//! Bulk registry export decoding.
//!
//! The registry publishes its full company list as a ZIP archive holding one
//! XML document:
//!
//! ```xml
//! <result>
//!   <list>
//!     <corp_code>00126380</corp_code>
//!     <corp_name>삼성전자</corp_name>
//!     <stock_code>005930</stock_code>
//!     <modify_date>20240101</modify_date>
//!   </list>
//!   ...
//! </result>
//! ```

use std::io::{Cursor, Read};

use insightmatch_shared::{InsightMatchError, RegistryEntry, Result};
use quick_xml::Reader;
use quick_xml::events::Event;

/// Maximum decompressed bytes read from the archive's XML member.
const MAX_XML_ENTRY_BYTES: u64 = 256 * 1024 * 1024;

/// Decoded registry index, in the export's native order.
#[derive(Debug, Clone, Default)]
pub struct RegistryIndex {
    entries: Vec<RegistryEntry>,
}

impl RegistryIndex {
    pub fn new(entries: Vec<RegistryEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Unpack the export archive and parse its first `.xml` member.
pub fn decode_archive(bytes: &[u8]) -> Result<RegistryIndex> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| InsightMatchError::decode(format!("registry archive: {e}")))?;

    let member = archive
        .file_names()
        .find(|name| name.to_lowercase().ends_with(".xml"))
        .map(str::to_string)
        .ok_or_else(|| InsightMatchError::decode("registry archive has no .xml member"))?;

    let entry = archive
        .by_name(&member)
        .map_err(|e| InsightMatchError::decode(format!("registry archive member {member}: {e}")))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| InsightMatchError::decode(format!("registry archive member {member}: {e}")))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(InsightMatchError::decode(format!(
            "registry archive member {member} exceeds size limit ({MAX_XML_ENTRY_BYTES} bytes)"
        )));
    }

    Ok(RegistryIndex::new(parse_index_xml(&xml)?))
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Code,
    Name,
    StockCode,
}

#[derive(Debug, Default)]
struct Row {
    code: String,
    name: String,
    stock_code: String,
}

impl Row {
    fn set(&mut self, field: Field, text: &str) {
        let slot = match field {
            Field::Code => &mut self.code,
            Field::Name => &mut self.name,
            Field::StockCode => &mut self.stock_code,
        };
        slot.push_str(text);
    }

    fn build(self) -> Option<RegistryEntry> {
        let code = self.code.trim();
        let name = self.name.trim();
        if code.is_empty() || name.is_empty() {
            return None;
        }
        let stock_code = self.stock_code.trim();
        Some(RegistryEntry {
            registry_id: code.to_string(),
            legal_name: name.to_string(),
            stock_code: (!stock_code.is_empty()).then(|| stock_code.to_string()),
        })
    }
}

/// Parse the export XML into entries. Rows without a code or name are dropped.
pub fn parse_index_xml(xml: &[u8]) -> Result<Vec<RegistryEntry>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut row: Option<Row> = None;
    let mut field: Option<Field> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"list" => row = Some(Row::default()),
                b"corp_code" => field = Some(Field::Code),
                b"corp_name" => field = Some(Field::Name),
                b"stock_code" => field = Some(Field::StockCode),
                _ => field = None,
            },
            Ok(Event::Text(text)) => {
                if let (Some(row), Some(field)) = (row.as_mut(), field) {
                    let text = text.unescape().map_err(|e| {
                        InsightMatchError::decode(format!("registry index XML: {e}"))
                    })?;
                    row.set(field, &text);
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"list" {
                    if let Some(entry) = row.take().and_then(Row::build) {
                        entries.push(entry);
                    }
                }
                field = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(InsightMatchError::decode(format!(
                    "registry index XML at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}
