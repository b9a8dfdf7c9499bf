//! Reader for SVM-light style multi-label records:
//!
//! ```text
//! <header line, ignored>
//! label1,label2 idx1:val1 idx2:val2 ...
//! ```
//!
//! Any token that fails to parse aborts with `SlideError::MalformedRecord`.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::data::batch::{Batch, Example};
use crate::error::{SlideError, SlideResult};

/// Parses one record. `line_no` is 1-based and only used in error messages.
pub fn parse_line(line: &str, line_no: usize) -> SlideResult<Example> {
    let malformed = |message: String| SlideError::MalformedRecord { line: line_no, message };

    let mut tokens = line.split_whitespace();
    let label_token = tokens.next().ok_or_else(|| malformed("empty record".into()))?;

    let labels = label_token
        .split(',')
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| malformed(format!("label '{s}' is not a non-negative integer")))
        })
        .collect::<SlideResult<Vec<usize>>>()?;

    let mut indices = Vec::new();
    let mut values = Vec::new();
    for token in tokens {
        let (idx, val) = token
            .split_once(':')
            .ok_or_else(|| malformed(format!("feature '{token}' is not of the form index:value")))?;
        indices.push(
            idx.parse::<usize>()
                .map_err(|_| malformed(format!("feature index '{idx}' is not a non-negative integer")))?,
        );
        values.push(
            val.parse::<f64>()
                .map_err(|_| malformed(format!("feature value '{val}' is not a number")))?,
        );
    }

    Example::new(indices, values, labels)
}

/// Streams batches of parsed records, skipping the header line.
pub struct SvmReader<R: BufRead> {
    lines: Lines<R>,
    line_no: usize,
}

impl SvmReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> SlideResult<Self> {
        let file = File::open(path)?;
        SvmReader::new(BufReader::new(file))
    }
}

impl<R: BufRead> SvmReader<R> {
    /// Wraps `reader` and consumes its header line.
    pub fn new(reader: R) -> SlideResult<Self> {
        let mut lines = reader.lines();
        let mut line_no = 0;
        if let Some(header) = lines.next() {
            header?;
            line_no = 1;
        }
        Ok(SvmReader { lines, line_no })
    }

    /// Reads up to `batch_size` records. The returned batch is shorter than
    /// requested (possibly empty) once the input is exhausted. Blank lines
    /// are skipped.
    pub fn next_batch(&mut self, batch_size: usize) -> SlideResult<Batch> {
        let mut examples = Vec::with_capacity(batch_size);
        while examples.len() < batch_size {
            let Some(line) = self.lines.next() else {
                break;
            };
            let line = line?;
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            examples.push(parse_line(&line, self.line_no)?);
        }
        Ok(Batch::new(examples))
    }

    /// Number of the last line read (1-based; the header is line 1).
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_multi_label_record() {
        let ex = parse_line("3,17 0:1.5 42:-0.25", 2).unwrap();
        assert_eq!(ex.labels, vec![3, 17]);
        assert_eq!(ex.features.indices, vec![0, 42]);
        assert_eq!(ex.features.values, vec![1.5, -0.25]);
    }

    #[test]
    fn test_parse_record_without_features() {
        let ex = parse_line("4", 2).unwrap();
        assert!(ex.features.is_empty());
    }

    #[test]
    fn test_malformed_tokens_report_line() {
        for bad in ["x 1:2", "1 3", "1 a:2", "1 2:b", "1,,2 0:1"] {
            match parse_line(bad, 9) {
                Err(SlideError::MalformedRecord { line, .. }) => assert_eq!(line, 9),
                other => panic!("{bad}: expected malformed record, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_reader_skips_header_and_reports_short_batch() {
        let data = "header 3 4\n0 0:1.0\n1 1:1.0\n\n2 2:1.0\n";
        let mut reader = SvmReader::new(Cursor::new(data)).unwrap();

        let first = reader.next_batch(2).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first.examples[1].labels, vec![1]);

        let second = reader.next_batch(2).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second.examples[0].labels, vec![2]);

        assert!(reader.next_batch(2).unwrap().is_empty());
    }

    #[test]
    fn test_reader_fails_fast() {
        let data = "header\n0 0:1.0\n1 oops\n2 2:1.0\n";
        let mut reader = SvmReader::new(Cursor::new(data)).unwrap();
        match reader.next_batch(3) {
            Err(SlideError::MalformedRecord { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected malformed record, got {other:?}"),
        }
    }
}
