//! Intermediate similarity artifact
//!
//! Plain text, one record per line: `"<user1_id> <user2_id> <similarity>\n"`.
//! No header, no trailing metadata. Every append reopens the file, writes one
//! line and closes it again, so lines already written survive an aborted run.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use review_graph_core::validation::{validate_reviewer_id, validate_similarity};
use review_graph_core::{ReviewGraphError, Result};

/// Jaccard similarity between two reviewers
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityRecord {
    pub user1: String,
    pub user2: String,
    pub similarity: f64,
}

impl SimilarityRecord {
    pub fn new(user1: impl Into<String>, user2: impl Into<String>, similarity: f64) -> Self {
        Self {
            user1: user1.into(),
            user2: user2.into(),
            similarity,
        }
    }
}

impl fmt::Display for SimilarityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.user1, self.user2, self.similarity)
    }
}

/// Create the artifact, discarding any previous contents
pub fn truncate(path: &Path) -> Result<()> {
    File::create(path)?;
    Ok(())
}

/// Append a single record as its own open/write/close cycle
pub fn append_record(path: &Path, record: &SimilarityRecord) -> Result<()> {
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    writeln!(file, "{}", record)?;
    file.flush()?;
    Ok(())
}

/// Parse one artifact line
///
/// The line must split on whitespace into exactly three fields, the last one
/// a similarity in (0, 1].
pub fn parse_line(line: &str, line_number: usize) -> Result<SimilarityRecord> {
    let malformed = |message: String| ReviewGraphError::ArtifactFormat {
        line: line_number,
        message,
    };

    let fields: Vec<&str> = line.split_whitespace().collect();
    let [user1, user2, similarity] = fields.as_slice() else {
        return Err(malformed(format!(
            "expected 3 fields, found {}",
            fields.len()
        )));
    };

    let similarity: f64 = similarity
        .parse()
        .map_err(|e| malformed(format!("invalid similarity '{}': {}", similarity, e)))?;

    validate_reviewer_id(user1).map_err(|e| malformed(e.to_string()))?;
    validate_reviewer_id(user2).map_err(|e| malformed(e.to_string()))?;
    validate_similarity(similarity).map_err(|e| malformed(e.to_string()))?;

    Ok(SimilarityRecord::new(*user1, *user2, similarity))
}

/// Read every record from the artifact; blank lines are ignored
pub fn read_records(path: &Path) -> Result<Vec<SimilarityRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_line(&line, index + 1)?);
    }

    Ok(records)
}
