//! Review models
//!
//! Typed views of the records held by the document store (reviews), the
//! relational store (item identities) and the graph store (reviewers).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ReviewGraphError;
use crate::validation::{validate_asin, validate_rating, validate_reviewer_id};

/// Identity of a catalog item
///
/// The same ASIN may be listed under several product categories, so an item
/// is only unique together with its `type_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub asin: String,
    pub type_id: i32,
}

impl ItemKey {
    pub fn new(asin: impl Into<String>, type_id: i32) -> Self {
        Self {
            asin: asin.into(),
            type_id,
        }
    }
}

/// Formats as `"<asin>-<type_id>"`, the key used in per-user article sets
impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.asin, self.type_id)
    }
}

/// A single product review as stored in the document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub reviewer_id: String,
    pub asin: String,
    pub type_id: i32,
    /// Star rating, 1 to 5
    pub overall: f64,
    pub review_time: Option<DateTime<Utc>>,
    pub summary: Option<String>,
}

impl ReviewRecord {
    /// Build a record, validating it at the store boundary
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for an empty reviewer id or ASIN, or a
    /// rating outside `[1, 5]`.
    pub fn new(
        reviewer_id: impl Into<String>,
        asin: impl Into<String>,
        type_id: i32,
        overall: f64,
    ) -> Result<Self, ReviewGraphError> {
        let record = Self {
            reviewer_id: reviewer_id.into(),
            asin: asin.into(),
            type_id,
            overall,
            review_time: None,
            summary: None,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn with_review_time(mut self, review_time: DateTime<Utc>) -> Self {
        self.review_time = Some(review_time);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn item_key(&self) -> ItemKey {
        ItemKey::new(self.asin.clone(), self.type_id)
    }

    pub fn validate(&self) -> Result<(), ReviewGraphError> {
        validate_reviewer_id(&self.reviewer_id)?;
        validate_asin(&self.asin)?;
        validate_rating(self.overall)?;
        Ok(())
    }
}

/// Reviewer with the number of reviews they wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerSummary {
    pub reviewer_id: String,
    pub review_count: u64,
}

impl ReviewerSummary {
    pub fn new(reviewer_id: impl Into<String>, review_count: u64) -> Self {
        Self {
            reviewer_id: reviewer_id.into(),
            review_count,
        }
    }
}

/// Product category listed in the relational `types` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductType {
    pub id: i32,
    pub name: String,
}

impl ProductType {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Reviewer row of the relational store; the dataset does not always carry
/// a display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerProfile {
    pub reviewer_id: String,
    pub reviewer_name: Option<String>,
}

impl ReviewerProfile {
    pub fn new(reviewer_id: impl Into<String>, reviewer_name: Option<String>) -> Self {
        Self {
            reviewer_id: reviewer_id.into(),
            reviewer_name,
        }
    }
}

/// Reviews one reviewer wrote in one product category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeReviewCount {
    pub type_id: i32,
    pub count: u64,
}

/// Reviews of one ASIN, summed over every category it is listed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPopularity {
    pub asin: String,
    pub review_count: u64,
}

impl ItemPopularity {
    pub fn new(asin: impl Into<String>, review_count: u64) -> Self {
        Self {
            asin: asin.into(),
            review_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_key_display() {
        assert_eq!(ItemKey::new("B00004Y2UT", 3).to_string(), "B00004Y2UT-3");
    }

    #[test]
    fn test_same_asin_different_type_are_distinct() {
        let a = ItemKey::new("B00004Y2UT", 0);
        let b = ItemKey::new("B00004Y2UT", 1);
        assert_ne!(a, b);
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_review_record_valid() {
        let record = ReviewRecord::new("A1", "B01", 2, 4.0)
            .unwrap()
            .with_summary("Great");
        assert_eq!(record.item_key(), ItemKey::new("B01", 2));
        assert_eq!(record.summary.as_deref(), Some("Great"));
    }

    #[test]
    fn test_review_record_rejects_out_of_range_rating() {
        assert!(ReviewRecord::new("A1", "B01", 0, 0.0).is_err());
        assert!(ReviewRecord::new("A1", "B01", 0, 5.5).is_err());
        assert!(ReviewRecord::new("A1", "B01", 0, f64::NAN).is_err());
    }

    #[test]
    fn test_review_record_rejects_empty_ids() {
        assert!(ReviewRecord::new("", "B01", 0, 3.0).is_err());
        assert!(ReviewRecord::new("A1", "  ", 0, 3.0).is_err());
    }
}
