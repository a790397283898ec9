//! Raw review dataset parsing
//!
//! The dataset ships as one JSON-lines file per product category, named
//! `<Category>_5.json`. Categories get ids in file name order.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::DateTime;
use serde::Deserialize;
use tracing::{info, instrument};

use review_graph_core::{
    ItemKey, ProductType, Result, ReviewGraphError, ReviewRecord, ReviewerProfile,
};

use crate::store::{InMemoryItemCatalog, InMemoryReviewStore};

const CATEGORY_FILE_SUFFIX: &str = "_5.json";

/// Category name of a dataset file, e.g. `Musical_Instruments_5.json`
pub fn parse_category_name(file_name: &str) -> String {
    file_name.replace(CATEGORY_FILE_SUFFIX, "")
}

#[derive(Debug, Deserialize)]
struct RawReview {
    #[serde(rename = "reviewerID")]
    reviewer_id: String,
    asin: String,
    overall: f64,
    #[serde(default)]
    summary: Option<String>,
    #[serde(rename = "unixReviewTime", default)]
    unix_review_time: Option<i64>,
    #[serde(rename = "reviewerName", default)]
    reviewer_name: Option<String>,
}

/// One dataset line split into its store-bound parts
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReview {
    pub review: ReviewRecord,
    pub item: ItemKey,
    pub reviewer_name: Option<String>,
}

/// Parse one JSON line of a category file whose category has id `type_id`
pub fn parse_review_line(line: &str, type_id: i32) -> Result<ParsedReview> {
    let raw: RawReview = serde_json::from_str(line)?;

    let mut review = ReviewRecord::new(raw.reviewer_id, raw.asin, type_id, raw.overall)?;

    if let Some(seconds) = raw.unix_review_time {
        let time = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
            ReviewGraphError::validation_field(
                format!("timestamp {} out of range", seconds),
                "unixReviewTime",
            )
        })?;
        review = review.with_review_time(time);
    }
    if let Some(summary) = raw.summary {
        review = review.with_summary(summary);
    }

    Ok(ParsedReview {
        item: review.item_key(),
        review,
        reviewer_name: raw.reviewer_name,
    })
}

/// Parse every non-blank line of a category file
pub fn read_reviews(path: &Path, type_id: i32) -> Result<Vec<ParsedReview>> {
    let reader = BufReader::new(File::open(path)?);
    let mut reviews = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        reviews.push(parse_review_line(&line, type_id)?);
    }

    Ok(reviews)
}

/// A whole dataset directory split into store contents
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub product_types: Vec<ProductType>,
    pub reviews: Vec<ReviewRecord>,
    /// Distinct items, by type id then ASIN
    pub items: Vec<ItemKey>,
    /// One per reviewer id, keeping the first name seen
    pub reviewers: Vec<ReviewerProfile>,
}

impl Dataset {
    /// In-memory review collection and catalog holding this dataset
    pub fn into_stores(self) -> (InMemoryReviewStore, InMemoryItemCatalog) {
        let catalog = InMemoryItemCatalog::new(self.items)
            .with_product_types(self.product_types)
            .with_reviewers(self.reviewers);
        (InMemoryReviewStore::new(self.reviews), catalog)
    }
}

fn category_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_category = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(CATEGORY_FILE_SUFFIX));
        if is_category && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load every category file in `dir`
///
/// # Errors
///
/// Fails on the first unreadable file or malformed line. A directory without
/// category files is a `ValidationError`.
#[instrument(skip(dir), fields(dir = %dir.display()))]
pub fn load_dataset(dir: &Path) -> Result<Dataset> {
    let files = category_files(dir)?;
    if files.is_empty() {
        return Err(ReviewGraphError::validation(format!(
            "no *{} files in {}",
            CATEGORY_FILE_SUFFIX,
            dir.display()
        )));
    }

    let mut dataset = Dataset::default();
    let mut items = BTreeSet::new();
    let mut reviewers: BTreeMap<String, Option<String>> = BTreeMap::new();

    for (type_id, path) in (0i32..).zip(&files) {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        dataset
            .product_types
            .push(ProductType::new(type_id, parse_category_name(file_name)));

        for parsed in read_reviews(path, type_id)? {
            items.insert((parsed.item.type_id, parsed.item.asin));
            let name = reviewers
                .entry(parsed.review.reviewer_id.clone())
                .or_default();
            if name.is_none() {
                *name = parsed.reviewer_name;
            }
            dataset.reviews.push(parsed.review);
        }
    }

    dataset.items = items
        .into_iter()
        .map(|(type_id, asin)| ItemKey::new(asin, type_id))
        .collect();
    dataset.reviewers = reviewers
        .into_iter()
        .map(|(id, name)| ReviewerProfile::new(id, name))
        .collect();

    info!(
        categories = dataset.product_types.len(),
        reviews = dataset.reviews.len(),
        items = dataset.items.len(),
        reviewers = dataset.reviewers.len(),
        "Dataset loaded"
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LINE: &str = r#"{"reviewerID": "A2IBPI20UZIR0U", "asin": "1384719342", "reviewerName": "cassandra tu", "helpful": [0, 0], "reviewText": "Not much to write about here", "overall": 5.0, "summary": "good", "unixReviewTime": 1393545600, "reviewTime": "02 28, 2014"}"#;

    #[test]
    fn test_parse_category_name() {
        assert_eq!(parse_category_name("Musical_Instruments_5.json"), "Musical_Instruments");
        assert_eq!(parse_category_name("Video_Games"), "Video_Games");
    }

    #[test]
    fn test_parse_review_line() {
        let parsed = parse_review_line(LINE, 2).unwrap();

        assert_eq!(parsed.review.reviewer_id, "A2IBPI20UZIR0U");
        assert_eq!(parsed.review.overall, 5.0);
        assert_eq!(parsed.review.summary.as_deref(), Some("good"));
        assert_eq!(
            parsed.review.review_time.map(|t| t.timestamp()),
            Some(1393545600)
        );
        assert_eq!(parsed.item, ItemKey::new("1384719342", 2));
        assert_eq!(parsed.reviewer_name.as_deref(), Some("cassandra tu"));
    }

    #[test]
    fn test_parse_review_line_optional_fields() {
        let parsed =
            parse_review_line(r#"{"reviewerID": "R1", "asin": "B1", "overall": 3.0}"#, 0).unwrap();

        assert!(parsed.review.review_time.is_none());
        assert!(parsed.review.summary.is_none());
        assert!(parsed.reviewer_name.is_none());
    }

    #[test]
    fn test_parse_review_line_rejects_bad_rating() {
        let result = parse_review_line(r#"{"reviewerID": "R1", "asin": "B1", "overall": 9.0}"#, 0);
        assert!(matches!(result, Err(ReviewGraphError::ValidationError { .. })));
    }

    #[test]
    fn test_parse_review_line_rejects_malformed_json() {
        let result = parse_review_line("{not json", 0);
        assert!(matches!(result, Err(ReviewGraphError::Serialization(_))));
    }

    #[test]
    fn test_read_reviews_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", LINE).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"reviewerID": "R9", "asin": "B9", "overall": 1.0}}"#).unwrap();

        let reviews = read_reviews(file.path(), 4).unwrap();

        assert_eq!(reviews.len(), 2);
        assert!(reviews.iter().all(|r| r.item.type_id == 4));
    }

    #[test]
    fn test_load_dataset_assigns_type_ids_by_file_name() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(
            dir.path().join("Video_Games_5.json"),
            "{\"reviewerID\": \"R1\", \"asin\": \"B1\", \"overall\": 4.0}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("Digital_Music_5.json"),
            concat!(
                "{\"reviewerID\": \"R1\", \"asin\": \"B1\", \"overall\": 2.0}\n",
                "{\"reviewerID\": \"R2\", \"asin\": \"B2\", \"reviewerName\": \"bo\", \"overall\": 5.0}\n",
                "{\"reviewerID\": \"R1\", \"asin\": \"B2\", \"reviewerName\": \"al\", \"overall\": 3.0}\n",
            ),
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let dataset = load_dataset(dir.path()).unwrap();

        assert_eq!(
            dataset.product_types,
            vec![
                ProductType::new(0, "Digital_Music"),
                ProductType::new(1, "Video_Games"),
            ]
        );
        assert_eq!(dataset.reviews.len(), 4);
        assert_eq!(
            dataset.items,
            vec![
                ItemKey::new("B1", 0),
                ItemKey::new("B2", 0),
                ItemKey::new("B1", 1),
            ]
        );
        assert_eq!(
            dataset.reviewers,
            vec![
                ReviewerProfile::new("R1", Some("al".to_string())),
                ReviewerProfile::new("R2", Some("bo".to_string())),
            ]
        );
    }

    #[test]
    fn test_load_dataset_rejects_empty_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_dataset(dir.path()).unwrap_err();
        assert!(matches!(err, ReviewGraphError::ValidationError { .. }));
    }
}
