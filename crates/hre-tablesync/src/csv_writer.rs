//! Record writer for delimited table files

use std::io::Write;

use crate::csv_format::CsvOptions;

/// Writes records field by field, quoting only where needed
pub struct CsvRecordWriter<W> {
    writer: W,
    delimiter: char,
    qualifier: Option<char>,
    record_delimiter: &'static str,
}

impl<W: Write> CsvRecordWriter<W> {
    pub fn new(writer: W, options: &CsvOptions) -> Self {
        Self {
            writer,
            delimiter: options.delimiter(),
            qualifier: options.qualifier(),
            record_delimiter: options.record_delimiter.as_str(),
        }
    }

    /// Write one record. `None` fields are written empty and unquoted (NULL).
    pub fn write_record(&mut self, fields: &[Option<String>]) -> std::io::Result<()> {
        let mut line = String::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                line.push(self.delimiter);
            }
            if let Some(text) = field {
                self.qualify_value(text, &mut line);
            }
        }
        line.push_str(self.record_delimiter);
        self.writer.write_all(line.as_bytes())
    }

    fn qualify_value(&self, text: &str, out: &mut String) {
        let Some(q) = self.qualifier else {
            out.push_str(text);
            return;
        };

        let needs_quotes = text.is_empty()
            || text
                .chars()
                .any(|c| c == self.delimiter || c == q || c == '\n' || c == '\r');
        if !needs_quotes {
            out.push_str(text);
            return;
        }

        out.push(q);
        for c in text.chars() {
            if c == q {
                out.push(q);
            }
            out.push(c);
        }
        out.push(q);
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(records: &[Vec<Option<&str>>], options: &CsvOptions) -> String {
        let mut writer = CsvRecordWriter::new(Vec::new(), options);
        for record in records {
            let fields: Vec<Option<String>> =
                record.iter().map(|f| f.map(str::to_string)).collect();
            writer.write_record(&fields).unwrap();
        }
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_plain_fields_are_unquoted() {
        let out = write(
            &[
                vec![Some("1"), Some("Anna"), Some("1900")],
                vec![Some("2"), Some("Bo"), None],
            ],
            &CsvOptions::default(),
        );
        assert_eq!(out, "1;Anna;1900\n2;Bo;\n");
    }

    #[test]
    fn test_special_fields_are_quoted() {
        let out = write(
            &[vec![Some("a;b"), Some("say \"hi\""), Some("two\nlines"), Some("")]],
            &CsvOptions::default(),
        );
        assert_eq!(out, "\"a;b\";\"say \"\"hi\"\"\";\"two\nlines\";\"\"\n");
    }

    #[test]
    fn test_delimiter_only_quotes_its_own_char() {
        let options = CsvOptions::default().with_delimiter(',');
        let out = write(&[vec![Some("a;b"), Some("c,d")]], &options);
        assert_eq!(out, "a;b,\"c,d\"\n");
    }
}
