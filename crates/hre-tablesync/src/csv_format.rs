//! Delimited-text format options shared by import and export

use serde::{Deserialize, Serialize};

/// Field delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FieldDelimiter {
    /// `;`, what earlier HRE exports used
    #[default]
    Semicolon,
    Comma,
    Tab,
    Pipe,
    Custom(char),
}

impl FieldDelimiter {
    pub fn as_char(&self) -> char {
        match self {
            FieldDelimiter::Semicolon => ';',
            FieldDelimiter::Comma => ',',
            FieldDelimiter::Tab => '\t',
            FieldDelimiter::Pipe => '|',
            FieldDelimiter::Custom(c) => *c,
        }
    }

    pub fn from_char(c: char) -> Self {
        match c {
            ';' => FieldDelimiter::Semicolon,
            ',' => FieldDelimiter::Comma,
            '\t' => FieldDelimiter::Tab,
            '|' => FieldDelimiter::Pipe,
            other => FieldDelimiter::Custom(other),
        }
    }
}

/// Record delimiter written on export. Import accepts LF and CR+LF either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecordDelimiter {
    #[default]
    Lf,
    CrLf,
}

impl RecordDelimiter {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordDelimiter::Lf => "\n",
            RecordDelimiter::CrLf => "\r\n",
        }
    }
}

/// Text qualifier used to quote fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextQualifier {
    #[default]
    DoubleQuote,
    SingleQuote,
    None,
}

impl TextQualifier {
    pub fn as_char(&self) -> Option<char> {
        match self {
            TextQualifier::DoubleQuote => Some('"'),
            TextQualifier::SingleQuote => Some('\''),
            TextQualifier::None => None,
        }
    }
}

/// Options for reading and writing table CSV files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    pub field_delimiter: FieldDelimiter,
    pub record_delimiter: RecordDelimiter,
    pub text_qualifier: TextQualifier,
    /// Write a header row on export and skip the first record on import.
    /// Columns are matched by position either way.
    pub has_header: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            field_delimiter: FieldDelimiter::Semicolon,
            record_delimiter: RecordDelimiter::Lf,
            text_qualifier: TextQualifier::DoubleQuote,
            has_header: false,
        }
    }
}

impl CsvOptions {
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.field_delimiter = FieldDelimiter::from_char(delimiter);
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn delimiter(&self) -> char {
        self.field_delimiter.as_char()
    }

    pub fn qualifier(&self) -> Option<char> {
        self.text_qualifier.as_char()
    }

    /// Reject combinations that would make records ambiguous
    pub fn validate(&self) -> Result<(), String> {
        let delimiter = self.delimiter();
        if delimiter == '\n' || delimiter == '\r' {
            return Err("field delimiter cannot be a line break".into());
        }
        if self.qualifier() == Some(delimiter) {
            return Err(format!(
                "field delimiter '{}' cannot also be the text qualifier",
                delimiter
            ));
        }
        Ok(())
    }
}
