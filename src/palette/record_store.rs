use std::path::Path;

use log::debug;

use crate::error::{QuadMapError, QuadMapResult};
use crate::output::TextFile;

/// Key of the fallback row in every table
pub const DEFAULT_KEY: &str = "default";

/// One row type of a color table
pub trait TableRecord: Sized {
    /// Table name used in diagnostics
    const TABLE: &'static str;

    /// Parse one non-comment line; `None` if the line does not fit the row
    /// grammar.
    fn parse(line: &str) -> Option<Self>;

    /// True for the `default` row
    fn is_default(&self) -> bool;
}

/// Records of one table, in file order
#[derive(Debug, Clone)]
pub struct RecordStore<R> {
    records: Vec<R>,
}

impl<R: TableRecord> RecordStore<R> {
    /// Parse table text; any unparseable row fails the whole table
    pub fn from_text(text: &str) -> QuadMapResult<Self> {
        Self::from_lines(TextFile::filter_lines(text))
    }

    pub fn from_file(path: impl AsRef<Path>) -> QuadMapResult<Self> {
        Self::from_lines(TextFile::read(path)?)
    }

    fn from_lines(lines: Vec<String>) -> QuadMapResult<Self> {
        let records = lines
            .into_iter()
            .map(|line| {
                R::parse(&line).ok_or(QuadMapError::InvalidRecord {
                    table: R::TABLE,
                    line,
                })
            })
            .collect::<QuadMapResult<Vec<R>>>()?;
        debug!("[RecordStore::from_lines] {} {} records", records.len(), R::TABLE);
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// Split into the default row and the rest; the last default row wins
    pub fn split_default(self) -> QuadMapResult<(R, Vec<R>)> {
        let mut default = None;
        let mut rest = Vec::with_capacity(self.records.len());
        for record in self.records {
            if record.is_default() {
                default = Some(record);
            } else {
                rest.push(record);
            }
        }
        let default = default.ok_or(QuadMapError::MissingDefaultRecord { table: R::TABLE })?;
        Ok((default, rest))
    }
}

/// Split a row into its data part and its trailing `#` comment
pub fn split_comment(line: &str) -> (&str, Option<String>) {
    match line.split_once('#') {
        Some((data, comment)) => {
            let comment = comment.trim();
            (data, (!comment.is_empty()).then(|| comment.to_string()))
        }
        None => (line, None),
    }
}

/// Parse a hex id, with or without a `0x` prefix
pub fn parse_hex(s: &str) -> Option<u32> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u32::from_str_radix(digits, 16).ok()
}
