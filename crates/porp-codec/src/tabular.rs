//! Tabular payload codec (Grammar B)
//!
//! Data files carry a DataSet document with one embedded table:
//!
//! ```xml
//! <NewDataSet>
//!   <xs:schema id="NewDataSet" ...>          (optional, declares columns)
//!     ... <xs:element name="Table1"> ... <xs:sequence>
//!           <xs:element name="Q1" type="xs:string" minOccurs="0" />
//!   </xs:schema>
//!   <Table1><Q1>1</Q1><Q2>2</Q2></Table1>   (one element per row)
//! </NewDataSet>
//! ```
//!
//! Null cells are omitted from a row element. DiffGram documents
//! (`<diffgr:diffgram>`) are unwrapped, skipping their `before` and `errors`
//! sections. Element names use XmlConvert escaping (`_x0020_` for a space).
//!
//! Two matrix conversions exist and are intentionally distinct:
//! [`data_file_matrix`] keeps every data row, [`legacy_table_matrix`] drops
//! the first one.

use crate::error::PayloadError;
use porp_model::TabularMatrix;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Writer};
use std::fmt::Write as _;

/// Dataset element name written on encode
pub const DATASET_NAME: &str = "NewDataSet";

/// Table element name written on encode
pub const DEFAULT_TABLE_NAME: &str = "Table1";

const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
const MSDATA_NAMESPACE: &str = "urn:schemas-microsoft-com:xml-msdata";

/// One decoded table
///
/// Every row has exactly `columns.len()` cells; `None` marks a null cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataTable {
    /// Table element name
    pub name: String,
    /// Column names in declaration order
    pub columns: Vec<String>,
    /// Cells per row, `None` for null
    pub rows: Vec<Vec<Option<String>>>,
}

impl DataTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Index of `column`, appending it if unknown
    fn ensure_column(&mut self, column: &str) -> usize {
        if let Some(idx) = self.columns.iter().position(|c| c == column) {
            return idx;
        }
        self.columns.push(column.to_string());
        self.columns.len() - 1
    }

    fn pad_rows(&mut self) {
        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, None);
        }
    }

    fn header_row(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn string_row(row: &[Option<String>]) -> Vec<String> {
        row.iter().map(|c| c.clone().unwrap_or_default()).collect()
    }
}

/// Decode a data payload into a matrix keeping all data rows
///
/// # Errors
/// - `PayloadError::NoTableFound` if the document holds no table
/// - `PayloadError::MalformedPayload` if the markup is malformed
pub fn decode(xml: &str) -> Result<TabularMatrix, PayloadError> {
    data_file_matrix(&decode_table(xml)?)
}

/// Decode the first table of a dataset document
///
/// # Errors
/// - `PayloadError::NoTableFound` if the document holds no table
/// - `PayloadError::MalformedPayload` if the markup is malformed
pub fn decode_table(xml: &str) -> Result<DataTable, PayloadError> {
    let mut tables = decode_dataset(xml)?.into_iter();
    let first = tables.next().ok_or(PayloadError::NoTableFound)?;
    let extra: Vec<_> = tables.map(|t| t.name).collect();
    if !extra.is_empty() {
        tracing::warn!(table = %first.name, ignored = ?extra, "dataset holds more than one table");
    }
    Ok(first)
}

/// Decode every table of a dataset document, in document order
///
/// # Errors
/// Returns `PayloadError::MalformedPayload` if the markup is malformed.
pub fn decode_dataset(xml: &str) -> Result<Vec<DataTable>, PayloadError> {
    let mut reader = NsReader::from_str(xml);
    let mut parser = DatasetParser::default();

    loop {
        let event = reader.read_event().map_err(|e| {
            PayloadError::malformed(format!(
                "dataset markup error at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;
        match event {
            Event::Start(e) => {
                let xs = is_schema_namespace(&reader.resolve_element(e.name()).0);
                parser.open(&e, xs, false)?;
            }
            Event::Empty(e) => {
                let xs = is_schema_namespace(&reader.resolve_element(e.name()).0);
                parser.open(&e, xs, true)?;
            }
            Event::End(_) => parser.close_current(),
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|err| PayloadError::malformed(format!("bad cell text: {err}")))?;
                parser.text(&text);
            }
            Event::CData(e) => parser.text(&String::from_utf8_lossy(&e.into_inner())),
            Event::Eof => break,
            _ => {}
        }
    }

    parser.finish()
}

fn is_schema_namespace(ns: &ResolveResult<'_>) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == XS_NAMESPACE.as_bytes())
}

/// Convert a table to a matrix: header plus every data row
///
/// Used by the data-file read path.
///
/// # Errors
/// Returns `PayloadError::Shape` if the table rows are ragged.
pub fn data_file_matrix(table: &DataTable) -> Result<TabularMatrix, PayloadError> {
    let data = table.rows.iter().map(|r| DataTable::string_row(r)).collect();
    Ok(TabularMatrix::from_parts(table.header_row(), data)?)
}

/// Convert a table to a matrix: header plus data rows from index 1
///
/// Mirrors the generic table conversion of the surrounding application,
/// which never copies the first data row. Callers depend on the resulting
/// row count, so this is kept separate from [`data_file_matrix`].
///
/// # Errors
/// Returns `PayloadError::Shape` if the table rows are ragged.
pub fn legacy_table_matrix(table: &DataTable) -> Result<TabularMatrix, PayloadError> {
    let data = table
        .rows
        .iter()
        .skip(1)
        .map(|r| DataTable::string_row(r))
        .collect();
    Ok(TabularMatrix::from_parts(table.header_row(), data)?)
}

/// Encode a matrix as a dataset document with an inline schema
///
/// Every column is declared `xs:string`; empty cells are written as empty
/// elements.
///
/// # Errors
/// Returns `PayloadError::MalformedPayload` if a column name is empty or
/// duplicated, or writing fails.
pub fn encode(matrix: &TabularMatrix, table_name: &str) -> Result<String, PayloadError> {
    let columns = encoded_columns(matrix.header())?;
    let table = encode_local_name(table_name);
    if table.is_empty() {
        return Err(PayloadError::malformed("table name is empty"));
    }

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", None, Some("yes"))))?;
    emit(&mut writer, Event::Start(BytesStart::new(DATASET_NAME)))?;
    write_schema(&mut writer, &table, &columns)?;

    for row in matrix.data_rows() {
        emit(&mut writer, Event::Start(BytesStart::new(table.as_str())))?;
        for (column, cell) in columns.iter().zip(row) {
            if cell.is_empty() {
                emit(&mut writer, Event::Empty(BytesStart::new(column.as_str())))?;
            } else {
                emit(&mut writer, Event::Start(BytesStart::new(column.as_str())))?;
                emit(&mut writer, Event::Text(BytesText::new(cell)))?;
                emit(&mut writer, Event::End(BytesEnd::new(column.as_str())))?;
            }
        }
        emit(&mut writer, Event::End(BytesEnd::new(table.as_str())))?;
    }

    emit(&mut writer, Event::End(BytesEnd::new(DATASET_NAME)))?;
    String::from_utf8(writer.into_inner())
        .map_err(|e| PayloadError::malformed(format!("encoded dataset is not UTF-8: {e}")))
}

fn encoded_columns(header: &[String]) -> Result<Vec<String>, PayloadError> {
    let mut columns: Vec<String> = Vec::with_capacity(header.len());
    for (idx, name) in header.iter().enumerate() {
        if name.is_empty() {
            return Err(PayloadError::malformed(format!("column {idx} has an empty name")));
        }
        let encoded = encode_local_name(name);
        if columns.contains(&encoded) {
            return Err(PayloadError::malformed(format!("duplicate column name {name:?}")));
        }
        columns.push(encoded);
    }
    Ok(columns)
}

fn write_schema(writer: &mut Writer<Vec<u8>>, table: &str, columns: &[String]) -> Result<(), PayloadError> {
    let schema = BytesStart::new("xs:schema").with_attributes([
        ("id", DATASET_NAME),
        ("xmlns", ""),
        ("xmlns:xs", XS_NAMESPACE),
        ("xmlns:msdata", MSDATA_NAMESPACE),
    ]);
    emit(writer, Event::Start(schema))?;
    let dataset = BytesStart::new("xs:element").with_attributes([
        ("name", DATASET_NAME),
        ("msdata:IsDataSet", "true"),
        ("msdata:UseCurrentLocale", "true"),
    ]);
    emit(writer, Event::Start(dataset))?;
    emit(writer, Event::Start(BytesStart::new("xs:complexType")))?;
    emit(
        writer,
        Event::Start(
            BytesStart::new("xs:choice").with_attributes([("minOccurs", "0"), ("maxOccurs", "unbounded")]),
        ),
    )?;
    emit(
        writer,
        Event::Start(BytesStart::new("xs:element").with_attributes([("name", table)])),
    )?;
    emit(writer, Event::Start(BytesStart::new("xs:complexType")))?;
    emit(writer, Event::Start(BytesStart::new("xs:sequence")))?;
    for column in columns {
        let decl = BytesStart::new("xs:element").with_attributes([
            ("name", column.as_str()),
            ("type", "xs:string"),
            ("minOccurs", "0"),
        ]);
        emit(writer, Event::Empty(decl))?;
    }
    for end in [
        "xs:sequence",
        "xs:complexType",
        "xs:element",
        "xs:choice",
        "xs:complexType",
        "xs:element",
        "xs:schema",
    ] {
        emit(writer, Event::End(BytesEnd::new(end)))?;
    }
    Ok(())
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), PayloadError> {
    writer
        .write_event(event)
        .map_err(|e| PayloadError::malformed(format!("dataset write failed: {e}")))
}

#[derive(Debug)]
struct Frame {
    local: String,
    name_attr: Option<String>,
}

#[derive(Debug)]
struct RowState {
    table: usize,
    depth: usize,
    cells: Vec<Option<String>>,
}

#[derive(Debug)]
struct CellState {
    column: usize,
    depth: usize,
    text: String,
}

/// Streaming state for [`decode_dataset`]
///
/// Depth 0 is the document root. Rows sit at depth 1 below the dataset
/// element, or depth 2 inside a DiffGram. An inline schema is only an
/// `xs:schema` element directly below the root.
#[derive(Debug, Default)]
struct DatasetParser {
    stack: Vec<Frame>,
    tables: Vec<DataTable>,
    in_diffgram: bool,
    seen_root: bool,
    schema_depth: Option<usize>,
    row: Option<RowState>,
    cell: Option<CellState>,
}

impl DatasetParser {
    fn open(&mut self, e: &BytesStart<'_>, xs: bool, empty: bool) -> Result<(), PayloadError> {
        let local = decode_local_name(&String::from_utf8_lossy(e.local_name().as_ref()));
        let name_attr = e
            .try_get_attribute("name")
            .map_err(|err| PayloadError::malformed(format!("bad attribute: {err}")))?
            .map(|attr| attr.unescape_value().map(|v| decode_local_name(&v)))
            .transpose()
            .map_err(|err| PayloadError::malformed(format!("bad attribute value: {err}")))?;
        let depth = self.stack.len();

        if depth == 0 {
            self.seen_root = true;
            self.in_diffgram = local == "diffgram";
        }

        if self.schema_depth.is_some() {
            if local == "element" {
                self.declare_from_schema(name_attr.as_deref());
            }
        } else if depth == 1 && xs && local == "schema" {
            self.schema_depth = Some(depth);
        } else if !self.in_skipped_section() {
            let row_depth = if self.in_diffgram { 2 } else { 1 };
            if depth == row_depth && self.row.is_none() {
                let table = self.table_index(&local);
                self.row = Some(RowState {
                    table,
                    depth,
                    cells: Vec::new(),
                });
            } else if depth == row_depth + 1 && self.cell.is_none() {
                if let Some(row) = &self.row {
                    let column = self.tables[row.table].ensure_column(&local);
                    self.cell = Some(CellState {
                        column,
                        depth,
                        text: String::new(),
                    });
                }
            }
        }

        if empty {
            self.close(depth);
        } else {
            self.stack.push(Frame { local, name_attr });
        }
        Ok(())
    }

    fn close_current(&mut self) {
        if self.stack.pop().is_some() {
            let depth = self.stack.len();
            self.close(depth);
        }
    }

    fn close(&mut self, depth: usize) {
        if self.schema_depth == Some(depth) {
            self.schema_depth = None;
        } else if self.cell.as_ref().is_some_and(|c| c.depth == depth) {
            if let (Some(cell), Some(row)) = (self.cell.take(), self.row.as_mut()) {
                if cell.column >= row.cells.len() {
                    row.cells.resize(cell.column + 1, None);
                }
                row.cells[cell.column] = Some(cell.text);
            }
        } else if self.row.as_ref().is_some_and(|r| r.depth == depth) {
            if let Some(row) = self.row.take() {
                self.tables[row.table].rows.push(row.cells);
            }
        }
    }

    fn text(&mut self, text: &str) {
        let depth = self.stack.len();
        if let Some(cell) = self.cell.as_mut() {
            if depth == cell.depth + 1 {
                cell.text.push_str(text);
            }
        }
    }

    fn in_skipped_section(&self) -> bool {
        self.in_diffgram
            && self
                .stack
                .get(1)
                .is_some_and(|f| f.local == "before" || f.local == "errors")
    }

    /// Record a schema `element`: a table under `choice`, a column under
    /// a table's `sequence`
    fn declare_from_schema(&mut self, name: Option<&str>) {
        let Some(name) = name else { return };
        let Some(container) = self
            .stack
            .iter()
            .rposition(|f| f.local == "sequence" || f.local == "choice")
        else {
            return;
        };

        if self.stack[container].local == "choice" {
            self.table_index(name);
            return;
        }

        let owner = self.stack[..container]
            .iter()
            .rev()
            .find(|f| f.local == "element")
            .and_then(|f| f.name_attr.clone());
        if let Some(owner) = owner {
            let table = self.table_index(&owner);
            self.tables[table].ensure_column(name);
        }
    }

    fn table_index(&mut self, name: &str) -> usize {
        if let Some(idx) = self.tables.iter().position(|t| t.name == name) {
            return idx;
        }
        self.tables.push(DataTable::new(name));
        self.tables.len() - 1
    }

    fn finish(mut self) -> Result<Vec<DataTable>, PayloadError> {
        if !self.seen_root {
            return Err(PayloadError::malformed("dataset document has no root element"));
        }
        if let Some(open) = self.stack.last() {
            return Err(PayloadError::malformed(format!(
                "dataset document ends inside <{}>",
                open.local
            )));
        }
        for table in &mut self.tables {
            table.pad_rows();
        }
        Ok(self.tables)
    }
}

/// Escape a name for use as an element name (XmlConvert style)
///
/// Characters not allowed in an XML name become `_xHHHH_`; an underscore
/// followed by `x` is itself escaped so it cannot read as an escape.
#[must_use]
pub fn encode_local_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len());
    for (i, &c) in chars.iter().enumerate() {
        let valid = if i == 0 { is_name_start(c) } else { is_name_char(c) };
        let looks_escaped = c == '_' && chars.get(i + 1) == Some(&'x');
        if valid && !looks_escaped {
            out.push(c);
        } else if u32::from(c) > 0xFFFF {
            let _ = write!(out, "_x{:08X}_", u32::from(c));
        } else {
            let _ = write!(out, "_x{:04X}_", u32::from(c));
        }
    }
    out
}

/// Reverse [`encode_local_name`]
#[must_use]
pub fn decode_local_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len());
    let mut i = 0;
    while i < chars.len() {
        if let Some((len, decoded)) = escape_len(&chars[i..]) {
            out.push(decoded);
            i += len;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Length and value of an `_xHHHH_` / `_xHHHHHHHH_` escape at the start
fn escape_len(chars: &[char]) -> Option<(usize, char)> {
    if chars.len() < 7 || chars[0] != '_' || chars[1] != 'x' {
        return None;
    }
    for digits in [4, 8] {
        let end = 2 + digits;
        if chars.len() > end
            && chars[end] == '_'
            && chars[2..end].iter().all(char::is_ascii_hexdigit)
        {
            let hex: String = chars[2..end].iter().collect();
            if let Some(c) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                return Some((end + 1, c));
            }
        }
    }
    None
}

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic() || (!c.is_ascii() && c.is_alphabetic())
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-' || c == '.' || (!c.is_ascii() && c.is_alphanumeric())
}
