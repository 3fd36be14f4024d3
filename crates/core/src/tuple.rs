//! Tuple structure for pipedb.
//!
//! A `Tuple` is one row: a fixed-arity sequence of text fields. Tuples are
//! never mutated once an operator has produced them.

use crate::error::{Error, Result};

/// Field separator of the tuple line format.
pub const DELIMITER: char = '|';

/// Per-field bookkeeping added to the text length when estimating footprint.
const FIELD_OVERHEAD: usize = core::mem::size_of::<String>();

/// A row of text fields.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tuple {
    fields: Vec<String>,
}

impl Tuple {
    /// Creates a tuple from its fields.
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Creates a tuple from string slices.
    pub fn from_strs(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| (*f).to_string()).collect(),
        }
    }

    /// Decodes one `|`-separated line.
    ///
    /// The line must carry exactly `arity` fields; a trailing `\n` or `\r\n`
    /// is stripped first.
    pub fn decode(line: &str, arity: usize) -> Result<Self> {
        let line = line
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(line);
        if arity == 0 {
            return if line.is_empty() {
                Ok(Self { fields: Vec::new() })
            } else {
                Err(Error::invalid_tuple(format!(
                    "expected an empty line for a zero-column tuple, got {line:?}"
                )))
            };
        }

        let fields: Vec<String> = line.split(DELIMITER).map(str::to_string).collect();
        if fields.len() != arity {
            return Err(Error::invalid_tuple(format!(
                "expected {arity} fields, found {} in {line:?}",
                fields.len()
            )));
        }
        Ok(Self { fields })
    }

    /// Encodes the tuple as one `|`-separated line without a terminator.
    ///
    /// Fields holding the delimiter or a line break cannot be read back and
    /// are rejected.
    pub fn encode(&self) -> Result<String> {
        if let Some(field) = self.fields.iter().find(|f| f.contains(DELIMITER)) {
            return Err(Error::invalid_tuple(format!(
                "field {field:?} contains the reserved delimiter"
            )));
        }
        if let Some(field) = self.fields.iter().find(|f| f.contains(['\n', '\r'])) {
            return Err(Error::invalid_tuple(format!(
                "field {field:?} contains a line break"
            )));
        }
        Ok(self.fields.join("|"))
    }

    /// Concatenates two tuples (left fields first).
    pub fn concat(left: &Tuple, right: &Tuple) -> Self {
        let mut fields = Vec::with_capacity(left.len() + right.len());
        fields.extend(left.fields.iter().cloned());
        fields.extend(right.fields.iter().cloned());
        Self { fields }
    }

    /// Gets a field by position.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Returns the fields.
    #[inline]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Consumes the tuple, returning its fields.
    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }

    /// Returns the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the tuple has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Estimated in-memory footprint in bytes.
    pub fn estimated_bytes(&self) -> usize {
        core::mem::size_of::<Self>()
            + self
                .fields
                .iter()
                .map(|f| f.len() + FIELD_OVERHEAD)
                .sum::<usize>()
    }
}

impl From<Vec<String>> for Tuple {
    fn from(fields: Vec<String>) -> Self {
        Self::new(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_encode_line() {
        let tuple = Tuple::decode("1|Alice|30.5\n", 3).unwrap();
        assert_eq!(tuple.get(0), Some("1"));
        assert_eq!(tuple.get(1), Some("Alice"));
        assert_eq!(tuple.get(2), Some("30.5"));
        assert_eq!(tuple.get(3), None);
        assert_eq!(tuple.encode().unwrap(), "1|Alice|30.5");
    }

    #[test]
    fn test_decode_keeps_empty_fields() {
        let tuple = Tuple::decode("|x|", 3).unwrap();
        assert_eq!(tuple.fields(), &["", "x", ""]);

        let single = Tuple::decode("", 1).unwrap();
        assert_eq!(single.fields(), &[""]);
    }

    #[test]
    fn test_decode_rejects_wrong_arity() {
        assert!(Tuple::decode("1|2", 3).is_err());
        assert!(Tuple::decode("1|2|3|4", 3).is_err());
    }

    #[test]
    fn test_zero_arity() {
        let tuple = Tuple::decode("", 0).unwrap();
        assert!(tuple.is_empty());
        assert_eq!(tuple.encode().unwrap(), "");
        assert!(Tuple::decode("x", 0).is_err());
    }

    #[test]
    fn test_encode_rejects_delimiter() {
        let tuple = Tuple::from_strs(&["a|b", "c"]);
        assert!(matches!(tuple.encode(), Err(Error::InvalidTuple { .. })));
    }

    #[test]
    fn test_encode_rejects_line_breaks() {
        for field in ["x\r", "line1\nline2", "\r\n"] {
            let tuple = Tuple::from_strs(&["1", field]);
            assert!(matches!(tuple.encode(), Err(Error::InvalidTuple { .. })));
        }
    }

    #[test]
    fn test_decode_strips_one_terminator() {
        assert_eq!(Tuple::decode("1|a\r\n", 2).unwrap().fields(), &["1", "a"]);
        assert_eq!(Tuple::decode("1|a\n", 2).unwrap().fields(), &["1", "a"]);
        // Only a single terminator belongs to the line.
        assert_eq!(Tuple::decode("1|a\n\n", 2).unwrap().fields(), &["1", "a\n"]);
        assert_eq!(Tuple::decode("1|a\r", 2).unwrap().fields(), &["1", "a\r"]);
    }

    #[test]
    fn test_concat() {
        let left = Tuple::from_strs(&["1", "a"]);
        let right = Tuple::from_strs(&["2"]);
        let joined = Tuple::concat(&left, &right);
        assert_eq!(joined.fields(), &["1", "a", "2"]);
    }

    #[test]
    fn test_estimated_bytes_grows_with_content() {
        let small = Tuple::from_strs(&["a"]);
        let large = Tuple::from_strs(&["a".repeat(100).as_str()]);
        assert!(large.estimated_bytes() > small.estimated_bytes());
    }
}
