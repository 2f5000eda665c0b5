//! Record reader for delimited table files

use std::io::BufRead;

use crate::csv_format::CsvOptions;

/// One field of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvField {
    pub text: String,
    /// Whether the field was enclosed in the text qualifier. An empty
    /// unquoted field is NULL; an empty quoted field is the empty string.
    pub quoted: bool,
}

impl CsvField {
    pub fn is_null(&self) -> bool {
        !self.quoted && self.text.is_empty()
    }
}

/// One logical record; quoted fields may span several physical lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    /// 1-based physical line the record starts on
    pub line: usize,
    pub fields: Vec<CsvField>,
}

impl CsvRecord {
    /// A physically empty line
    pub fn is_blank(&self) -> bool {
        self.fields.len() == 1 && self.fields[0].is_null()
    }
}

#[derive(Debug)]
pub enum CsvReadError {
    Io(std::io::Error),
    Malformed { line: usize, message: String },
}

/// Streaming reader yielding [`CsvRecord`]s
pub struct CsvRecordReader<R> {
    reader: R,
    delimiter: char,
    qualifier: Option<char>,
    line: usize,
}

impl<R: BufRead> CsvRecordReader<R> {
    pub fn new(reader: R, options: &CsvOptions) -> Self {
        Self {
            reader,
            delimiter: options.delimiter(),
            qualifier: options.qualifier(),
            line: 0,
        }
    }

    fn read_physical_line(&mut self, buf: &mut String) -> Result<bool, CsvReadError> {
        buf.clear();
        match self.reader.read_line(buf) {
            Ok(0) => Ok(false),
            Ok(_) => {
                self.line += 1;
                if self.line == 1 && buf.starts_with('\u{feff}') {
                    buf.drain(..'\u{feff}'.len_utf8());
                }
                if buf.ends_with('\n') {
                    buf.pop();
                    if buf.ends_with('\r') {
                        buf.pop();
                    }
                }
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                Err(CsvReadError::Malformed {
                    line: self.line + 1,
                    message: "line is not valid UTF-8".into(),
                })
            }
            Err(e) => Err(CsvReadError::Io(e)),
        }
    }

    /// Read the next record, or `None` at end of input
    pub fn next_record(&mut self) -> Result<Option<CsvRecord>, CsvReadError> {
        let mut buf = String::new();
        if !self.read_physical_line(&mut buf)? {
            return Ok(None);
        }
        let start_line = self.line;

        let mut fields = Vec::new();
        let mut current = String::new();
        let mut quoted = false;
        let mut in_quotes = false;
        let mut after_quote = false;

        loop {
            let mut chars = buf.chars().peekable();
            while let Some(c) = chars.next() {
                if in_quotes {
                    if Some(c) == self.qualifier {
                        if chars.peek() == Some(&c) {
                            chars.next();
                            current.push(c);
                        } else {
                            in_quotes = false;
                            after_quote = true;
                        }
                    } else {
                        current.push(c);
                    }
                } else if c == self.delimiter {
                    fields.push(CsvField {
                        text: std::mem::take(&mut current),
                        quoted,
                    });
                    quoted = false;
                    after_quote = false;
                } else if after_quote {
                    return Err(CsvReadError::Malformed {
                        line: self.line,
                        message: format!("unexpected character '{}' after closing quote", c),
                    });
                } else if Some(c) == self.qualifier && current.is_empty() {
                    in_quotes = true;
                    quoted = true;
                } else {
                    current.push(c);
                }
            }

            if !in_quotes {
                break;
            }
            // The quoted field continues on the next physical line.
            current.push('\n');
            if !self.read_physical_line(&mut buf)? {
                return Err(CsvReadError::Malformed {
                    line: start_line,
                    message: "unterminated quoted field".into(),
                });
            }
        }

        fields.push(CsvField {
            text: current,
            quoted,
        });
        Ok(Some(CsvRecord {
            line: start_line,
            fields,
        }))
    }
}
