//! Line-oriented readers and writers for the tab-delimited files that flow
//! between pipeline stages.
//!
//! Malformed lines never abort a batch: they are logged with their line
//! number and skipped. Only I/O failures propagate.

use std::io::{BufRead, Write};

use crate::error::{Error, Result};
use crate::{DocumentRecord, WordDocStat};

/// Header row written by the corpus combining step.
pub const CORPUS_HEADER: &str = "Filename\tTitle\tContent";
/// Separator between context windows inside one aggregate record.
pub const CONTEXT_SEPARATOR: &str = " | ";

/// Numbered lines of `reader` with `\n` / `\r\n` stripped. Each line is decoded
/// on its own, so invalid UTF-8 surfaces as a [`Error::MalformedRecord`] for
/// that line while I/O failures stay fatal.
pub(crate) fn numbered_lines<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = std::io::Result<(usize, Result<String>)>> {
    reader.split(b'\n').enumerate().map(|(i, raw)| {
        let line_no = i + 1;
        raw.map(|mut bytes| {
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            let line = String::from_utf8(bytes).map_err(|_| Error::malformed(line_no, "invalid UTF-8"));
            (line_no, line)
        })
    })
}

/// Parse `documentId \t title \t content`.
pub fn parse_document(line: &str, line_no: usize) -> Result<DocumentRecord> {
    let mut parts = line.trim().splitn(3, '\t');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(id), Some(title), Some(content)) => Ok(DocumentRecord {
            document_id: id.trim().to_string(),
            title: title.trim().to_string(),
            content: content.trim().to_string(),
        }),
        _ => Err(Error::malformed(line_no, "expected 3 tab-separated fields")),
    }
}

/// Read every well-formed document from a combined corpus stream.
pub fn read_documents<R: BufRead>(reader: R) -> Result<Vec<DocumentRecord>> {
    let mut docs = Vec::new();
    let mut skipped = 0usize;
    for item in numbered_lines(reader) {
        let (line_no, line) = item?;
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                skipped += 1;
                tracing::warn!(error = %e, "skipping document");
                continue;
            }
        };
        if line.trim().is_empty() || (line_no == 1 && line.trim_end() == CORPUS_HEADER) {
            continue;
        }
        match parse_document(&line, line_no) {
            Ok(doc) => docs.push(doc),
            Err(e) => {
                skipped += 1;
                tracing::warn!(error = %e, %line, "skipping document");
            }
        }
    }
    tracing::info!(documents = docs.len(), skipped, "read corpus");
    Ok(docs)
}

/// Wire form of a [`WordDocStat`]: `documentId \t title \t word \t frequency \t contexts`.
pub fn encode_stat(stat: &WordDocStat) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        stat.document_id,
        stat.title,
        stat.word,
        stat.frequency,
        stat.contexts.join(CONTEXT_SEPARATOR)
    )
}

pub fn decode_stat(line: &str, line_no: usize) -> Result<WordDocStat> {
    let fields: Vec<&str> = line.splitn(5, '\t').collect();
    if fields.len() < 5 {
        return Err(Error::malformed(line_no, format!("expected 5 fields, found {}", fields.len())));
    }
    let frequency = fields[3]
        .trim()
        .parse::<u32>()
        .map_err(|_| Error::malformed(line_no, format!("invalid frequency '{}'", fields[3])))?;
    let contexts = fields[4]
        .split('|')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    Ok(WordDocStat {
        document_id: fields[0].to_string(),
        title: fields[1].to_string(),
        word: fields[2].to_string(),
        frequency,
        contexts,
    })
}

pub fn read_aggregate_records<R: BufRead>(reader: R) -> Result<Vec<WordDocStat>> {
    let mut stats = Vec::new();
    let mut skipped = 0usize;
    for item in numbered_lines(reader) {
        let (line_no, line) = item?;
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                skipped += 1;
                tracing::warn!(error = %e, "skipping aggregate record");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match decode_stat(&line, line_no) {
            Ok(stat) => stats.push(stat),
            Err(e) => {
                skipped += 1;
                tracing::warn!(error = %e, %line, "skipping aggregate record");
            }
        }
    }
    tracing::info!(records = stats.len(), skipped, "read aggregate records");
    Ok(stats)
}

pub fn write_aggregate_records<W: Write>(mut writer: W, stats: &[WordDocStat]) -> Result<()> {
    for stat in stats {
        writeln!(writer, "{}", encode_stat(stat))?;
    }
    writer.flush()?;
    Ok(())
}
