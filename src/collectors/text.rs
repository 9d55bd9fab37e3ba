//! Line tokenizers for the human-oriented reports vendor tools print.

use super::ParseError;
use std::collections::HashMap;

/// Split `line` on the first `sep`, trimming both sides.
/// Returns None if `sep` does not occur.
pub fn split_key_value<'a>(line: &'a str, sep: &str) -> Option<(&'a str, &'a str)> {
    let (key, value) = line.split_once(sep)?;
    Some((key.trim(), value.trim()))
}

/// Value after the first `:` on `line`, trimmed.
pub fn value_after_colon(line: &str) -> Result<&str, ParseError> {
    line.split_once(':')
        .map(|(_, v)| v.trim())
        .ok_or_else(|| ParseError(format!("expected 'key: value', got '{}'", line.trim())))
}

/// `index`-th line of a report, or an error naming what was expected there.
pub fn line_at<'a>(report: &'a str, index: usize, what: &str) -> Result<&'a str, ParseError> {
    report
        .split('\n')
        .nth(index)
        .ok_or_else(|| ParseError(format!("report ended before line {} ({})", index, what)))
}

/// Last whitespace-separated token of `line`.
pub fn last_token<'a>(line: &'a str, what: &str) -> Result<&'a str, ParseError> {
    line.split_whitespace()
        .last()
        .ok_or_else(|| ParseError(format!("empty line where {} was expected", what)))
}

/// The `key : value` fields of one report block.
#[derive(Debug, Default, Clone)]
pub struct FieldMap {
    fields: HashMap<String, String>,
}

impl FieldMap {
    pub fn insert(&mut self, key: &str, value: &str) {
        self.fields.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Result<&str, ParseError> {
        self.fields
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ParseError(format!("missing field '{}'", key)))
    }
}

/// A record laid out as a fixed sequence of labelled lines.
///
/// Each pushed line must carry the label expected at its slot, so a report
/// that drops or reorders a line fails instead of shifting every field.
#[derive(Debug, Clone)]
pub struct PositionalRecord {
    labels: &'static [&'static str],
    values: Vec<String>,
}

impl PositionalRecord {
    pub fn new(labels: &'static [&'static str]) -> Self {
        Self { labels, values: Vec::with_capacity(labels.len()) }
    }

    pub fn push(&mut self, line: &str) -> Result<(), ParseError> {
        let slot = self.values.len();
        let expected = self.labels.get(slot).ok_or_else(|| {
            ParseError(format!("record already complete, extra line '{}'", line.trim()))
        })?;
        let (label, value) = line.split_once(':').ok_or_else(|| {
            ParseError(format!("expected '{}: ...', got '{}'", expected, line.trim()))
        })?;
        if !label.trim().eq_ignore_ascii_case(expected) {
            return Err(ParseError(format!(
                "expected '{}' at position {}, got '{}'",
                expected, slot, label.trim()
            )));
        }
        self.values.push(value.trim().to_string());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.values.len() == self.labels.len()
    }

    /// Value of the slot labelled `label`.
    pub fn get(&self, label: &str) -> Result<&str, ParseError> {
        self.labels
            .iter()
            .position(|l| *l == label)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
            .ok_or_else(|| ParseError(format!("missing field '{}'", label)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const LABELS: &[&str] = &["Slot Number", "PD Type"];

    #[test]
    fn test_split_key_value() {
        assert_eq!(
            split_key_value("   Serial number          : 0BH68ZVD", " : "),
            Some(("Serial number", "0BH68ZVD"))
        );
        assert_eq!(
            split_key_value("Reported Location : Enclosure 0, Slot 0(Connector 0)", " : "),
            Some(("Reported Location", "Enclosure 0, Slot 0(Connector 0)"))
        );
        assert_eq!(split_key_value("   Device Phy Information", " : "), None);
    }

    #[test]
    fn test_field_map_missing_key() {
        let mut fields = FieldMap::default();
        fields.insert("State", "Online");
        assert_eq!(fields.get("State"), Ok("Online"));
        assert_eq!(
            fields.get("Vendor"),
            Err(ParseError("missing field 'Vendor'".to_string()))
        );
    }

    #[test]
    fn test_positional_record() {
        let mut record = PositionalRecord::new(LABELS);
        assert!(record.is_empty());
        record.push("Slot Number: 3").unwrap();
        assert!(!record.is_complete());
        record.push("PD Type: SAS").unwrap();
        assert!(record.is_complete());
        assert_eq!(record.get("PD Type"), Ok("SAS"));
        assert!(record.push("Raw Size: 1 GB").is_err());
    }

    #[test]
    fn test_positional_record_rejects_reordered_lines() {
        let mut record = PositionalRecord::new(LABELS);
        let err = record.push("PD Type: SAS").unwrap_err();
        assert_eq!(
            err,
            ParseError("expected 'Slot Number' at position 0, got 'PD Type'".to_string())
        );
    }

    #[test]
    fn test_line_helpers() {
        let report = "Controllers found: 1\n\nCreating logical device: LogicalDrv 0\n";
        let line = line_at(report, 2, "created drive").unwrap();
        assert_eq!(last_token(line, "drive id"), Ok("0"));
        assert!(line_at(report, 9, "created drive").is_err());
        assert_eq!(value_after_colon("Controller Count: 1."), Ok("1."));
    }
}
