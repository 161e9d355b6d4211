// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Comma-separated record exchange.
//!
//! Encoding writes a header line followed by one line per record. Decoding is
//! tolerant: lines whose cell count does not match the header are dropped,
//! and typing of list and numeric fields comes from a [`FieldTypes`] table
//! rather than from the cell contents.
//!
//! Splitting happens per line before quote handling, so a quoted cell that
//! contains a raw newline does not survive a round trip.

use std::collections::{BTreeMap, BTreeSet};

pub const CELL_SEPARATOR: char = ',';
pub const LIST_SEPARATOR: char = ';';
pub const LINE_SEPARATOR: char = '\n';

const QUOTE: char = '"';

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    List(Vec<String>),
}

impl FieldValue {
    /// Cell text before escaping. Lists are joined with `;`.
    pub fn render(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Number(value) => value.to_string(),
            Self::List(items) => items.join(";"),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

pub type Record = BTreeMap<String, FieldValue>;

/// Which decoded fields are split into lists and which are read as numbers.
/// A name listed as both is treated as a list. A blank numeric cell reads as
/// zero; any other cell that is not a finite number stays text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTypes {
    lists: BTreeSet<String>,
    numbers: BTreeSet<String>,
}

impl FieldTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list(mut self, field: &str) -> Self {
        self.lists.insert(field.to_owned());
        self
    }

    pub fn with_number(mut self, field: &str) -> Self {
        self.numbers.insert(field.to_owned());
        self
    }

    pub fn is_list(&self, field: &str) -> bool {
        self.lists.contains(field)
    }

    pub fn is_number(&self, field: &str) -> bool {
        self.numbers.contains(field)
    }

    pub fn coerce(&self, field: &str, raw: &str) -> FieldValue {
        if self.is_list(field) {
            if raw.is_empty() {
                return FieldValue::List(Vec::new());
            }
            return FieldValue::List(raw.split(LIST_SEPARATOR).map(str::to_owned).collect());
        }

        if self.is_number(field) {
            if raw.trim().is_empty() {
                return FieldValue::Number(0.0);
            }
            if let Some(number) = parse_number(raw) {
                return FieldValue::Number(number);
            }
        }

        FieldValue::Text(raw.to_owned())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    pub records: Vec<Record>,
    /// 1-based line numbers dropped because their cell count did not match
    /// the header.
    pub skipped_lines: Vec<usize>,
}

pub fn escape_cell(cell: &str) -> String {
    if cell.contains(CELL_SEPARATOR) || cell.contains(QUOTE) || cell.contains(LINE_SEPARATOR) {
        let doubled = cell.replace(QUOTE, "\"\"");
        return format!("{QUOTE}{doubled}{QUOTE}");
    }
    cell.to_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Unquoted,
    Quoted,
}

pub fn split_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut state = ScanState::Unquoted;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match (state, ch) {
            (ScanState::Quoted, QUOTE) if chars.peek() == Some(&QUOTE) => {
                current.push(QUOTE);
                chars.next();
            }
            (ScanState::Quoted, QUOTE) => state = ScanState::Unquoted,
            (ScanState::Unquoted, QUOTE) => state = ScanState::Quoted,
            (ScanState::Unquoted, CELL_SEPARATOR) => cells.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    cells.push(current);
    cells
}

pub fn encode<S: AsRef<str>>(records: &[Record], fields: &[S]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(
        fields
            .iter()
            .map(|field| -> &str { field.as_ref() })
            .collect::<Vec<_>>()
            .join(","),
    );

    for record in records {
        let row = fields
            .iter()
            .map(|field| {
                record
                    .get(field.as_ref())
                    .map(|value| escape_cell(&value.render()))
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join(",");
        lines.push(row);
    }

    lines.join("\n")
}

pub fn decode(text: &str, field_types: &FieldTypes) -> Vec<Record> {
    decode_with_report(text, field_types).records
}

pub fn decode_with_report(text: &str, field_types: &FieldTypes) -> Decoded {
    let normalized = text.replace('\r', "");
    let lines: Vec<&str> = normalized.split(LINE_SEPARATOR).collect();
    if lines.len() < 2 {
        return Decoded::default();
    }

    let header: Vec<String> = split_line(lines[0])
        .into_iter()
        .map(|name| name.trim().to_owned())
        .collect();

    let mut decoded = Decoded::default();
    for (index, raw_line) in lines.iter().enumerate().skip(1) {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let cells = split_line(line);
        if cells.len() != header.len() {
            decoded.skipped_lines.push(index + 1);
            continue;
        }

        let record = header
            .iter()
            .zip(cells)
            .map(|(field, cell)| (field.clone(), field_types.coerce(field, cell.trim())))
            .collect();
        decoded.records.push(record);
    }
    decoded
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|number| number.is_finite())
}
