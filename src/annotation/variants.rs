use std::io::BufRead;

use crate::annotation::io::ParseError;
use crate::types::Variant;

/// Minimum columns of a variant line: chrom, pos, id, ref, alt.
pub const MIN_VARIANT_FIELDS: usize = 5;

/// Streaming reader for tab-separated variant records (VCF body or similar).
///
/// Only the first five columns are used; the third (ID) is ignored.
pub struct VariantReader<R: BufRead> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
}

impl<R: BufRead> VariantReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
        }
    }

    /// Iterator over variants. `#` header lines and blank lines are skipped;
    /// short, unparsable or non-UTF-8 lines surface as
    /// `ParseError::MalformedRecord` so the caller can skip them and carry on.
    pub fn records(mut self) -> impl Iterator<Item = Result<Variant, ParseError>> {
        std::iter::from_fn(move || loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    return Some(Err(ParseError::IoPath {
                        path: "<reader>".to_string(),
                        source: e,
                    }))
                }
            }
            self.line_no += 1;

            let line = match std::str::from_utf8(&self.buf) {
                Ok(l) => l.trim_end_matches(&['\n', '\r'][..]),
                Err(e) => {
                    return Some(Err(ParseError::MalformedRecord {
                        line_no: self.line_no,
                        problem: format!("line is not valid UTF-8: {e}"),
                    }))
                }
            };
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            return Some(parse_variant_line(line, self.line_no));
        })
    }
}

/// Parse one tab-separated variant line.
pub fn parse_variant_line(line: &str, line_no: usize) -> Result<Variant, ParseError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < MIN_VARIANT_FIELDS {
        return Err(ParseError::MalformedRecord {
            line_no,
            problem: format!(
                "expected at least {MIN_VARIANT_FIELDS} tab-separated fields, got {}",
                fields.len()
            ),
        });
    }

    let pos: u32 = fields[1].trim().parse().map_err(|_| ParseError::MalformedRecord {
        line_no,
        problem: format!("position '{}' is not a number", fields[1]),
    })?;

    Variant::new(fields[0].trim(), pos, fields[3].trim(), fields[4].trim()).ok_or_else(|| {
        ParseError::MalformedRecord {
            line_no,
            problem: "position 0 is not a valid 1-based position".to_string(),
        }
    })
}
