//! Section scanner
//!
//! Single pass over the lines of a model reply:
//! - a heading line containing the schema keyword opens a record
//! - field lines fill the open record, first matching binding wins
//! - the open record is closed by the next heading or the end of input
//!
//! Headings of other record types are ignored, so a reply that interleaves
//! several types is scanned once per type.

use tracing::debug;

use crate::record::apply_rule;
use crate::{CoreError, Extract, Record, RecordSchema};

/// In-progress state of one scan
#[derive(Debug)]
struct ExtractionContext<'s> {
    schema: &'s RecordSchema,
    current: Option<Record>,
    output: Vec<Record>,
}

impl<'s> ExtractionContext<'s> {
    fn new(schema: &'s RecordSchema) -> Self {
        Self {
            schema,
            current: None,
            output: Vec::new(),
        }
    }

    fn open(&mut self, heading: &str) {
        self.close();
        let id = self.schema.record_id(self.output.len() + 1);
        let title = heading_title(heading, self.schema);
        self.current = Some(Record::open(self.schema, id, title));
    }

    fn close(&mut self) {
        if let Some(record) = self.current.take() {
            self.output.push(record);
        }
    }

    fn absorb(&mut self, line: &str) {
        let Some(record) = self.current.as_mut() else {
            return;
        };

        let matched = self
            .schema
            .fields
            .iter()
            .find(|binding| line.contains(&format!("{}:", binding.label)));

        if let Some(binding) = matched {
            record.set(binding.key, apply_rule(&binding.rule, line, binding.label));
        }
    }

    fn finish(mut self) -> Vec<Record> {
        self.close();
        self.output
    }
}

/// Derive a record title from its heading line.
///
/// Drops the heading token and the first occurrence of the keyword, then
/// trims whitespace and stray separators: "### Login Risk" -> "Login".
fn heading_title(line: &str, schema: &RecordSchema) -> String {
    let without_token = line
        .strip_prefix(schema.heading)
        .unwrap_or(line)
        .trim_start_matches('#');

    without_token
        .replacen(schema.keyword, "", 1)
        .trim_matches(|c: char| c.is_whitespace() || c == ':' || c == '-')
        .to_string()
}

/// Scan lines for records of one schema
pub fn scan<S: AsRef<str>>(lines: &[S], schema: &RecordSchema) -> Vec<Record> {
    let mut ctx = ExtractionContext::new(schema);

    for line in lines {
        let line = line.as_ref().trim();

        if schema.is_heading(line) {
            ctx.open(line);
        } else {
            ctx.absorb(line);
        }
    }

    let records = ctx.finish();
    debug!(
        keyword = schema.keyword,
        count = records.len(),
        "scanned records"
    );
    records
}

/// Scan a whole reply for records of one schema
pub fn scan_text(text: &str, schema: &RecordSchema) -> Vec<Record> {
    let lines: Vec<&str> = text.lines().collect();
    scan(&lines, schema)
}

/// Scan a reply and convert each record into `T`
pub fn extract<T: Extract>(text: &str) -> Result<Vec<T>, CoreError> {
    scan_text(text, &T::SCHEMA)
        .into_iter()
        .map(Record::into_typed::<T>)
        .collect()
}
