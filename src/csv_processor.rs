use crate::error::{BhavError, Result};

/// One row of the daily table, keyed by header field name.
pub type Record = std::collections::HashMap<String, String>;

/// Parsed contents of the tabular file.
///
/// `schema` is the header row in file order; every record carries exactly
/// these keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub schema: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parses comma-delimited text with standard quoting into a `Table`.
///
/// The first row is the schema; each following row is zipped positionally
/// against it. Blank lines are skipped by the reader.
///
/// # Arguments
/// * `content` - Full text of the extracted file.
///
/// # Returns
/// * `Result<Table>` - Schema plus one record per data row. Empty input
///   gives an empty table.
///
/// # Errors
/// * `BhavError::Parse` - a data row whose field count differs from the
///   schema, a duplicated header name, or malformed quoting. `row` is the
///   1-based row number including the header.
pub fn parse(content: &str) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut rows = reader.records();

    let schema: Vec<String> = match rows.next() {
        None => return Ok(Table::default()),
        Some(header) => header
            .map_err(|e| csv_error(1, e))?
            .iter()
            .map(|field| field.to_string())
            .collect(),
    };

    let mut seen = std::collections::HashSet::with_capacity(schema.len());
    for field in &schema {
        if !seen.insert(field.as_str()) {
            return Err(BhavError::Parse {
                row: 1,
                message: format!("duplicate header field `{}`", field),
            });
        }
    }

    let mut records = Vec::new();
    for (i, result) in rows.enumerate() {
        let row_no = i + 2;
        let row = result.map_err(|e| csv_error(row_no, e))?;
        if row.len() != schema.len() {
            return Err(BhavError::Parse {
                row: row_no,
                message: format!("expected {} fields, found {}", schema.len(), row.len()),
            });
        }
        let record: Record = schema
            .iter()
            .cloned()
            .zip(row.iter().map(|v| v.to_string()))
            .collect();
        records.push(record);
    }

    tracing::info!(fields = schema.len(), records = records.len(), "table parsed");
    Ok(Table { schema, records })
}

/// Serializes records back to comma-delimited text under `schema`.
///
/// Fields absent from a record are written empty.
pub fn write_table(schema: &[String], records: &[Record]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(schema).map_err(|e| csv_error(1, e))?;
    for (i, record) in records.iter().enumerate() {
        let row = schema
            .iter()
            .map(|field| record.get(field).map(String::as_str).unwrap_or(""));
        writer.write_record(row).map_err(|e| csv_error(i + 2, e))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| BhavError::Io(std::io::Error::other(e.to_string())))?;
    String::from_utf8(bytes).map_err(|e| BhavError::Io(std::io::Error::other(e)))
}

fn csv_error(row: usize, err: csv::Error) -> BhavError {
    BhavError::Parse {
        row,
        message: err.to_string(),
    }
}
