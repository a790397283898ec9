//! Validation utilities for review-graph records
//!
//! Applied when records cross a store boundary so that the algorithms only
//! ever see well-formed data.

use crate::error::ReviewGraphError;

/// Lowest star rating a review can carry
pub const MIN_RATING: f64 = 1.0;

/// Highest star rating a review can carry
pub const MAX_RATING: f64 = 5.0;

/// Validate a reviewer identifier
///
/// Identifiers are written to the whitespace-separated similarity artifact,
/// so they must be non-empty and contain no whitespace.
///
/// # Examples
///
/// ```
/// use review_graph_core::validation::validate_reviewer_id;
///
/// assert!(validate_reviewer_id("A2SUAM1J3GNN3B").is_ok());
/// assert!(validate_reviewer_id("").is_err());
/// assert!(validate_reviewer_id("A2 B").is_err());
/// ```
pub fn validate_reviewer_id(id: &str) -> Result<(), ReviewGraphError> {
    validate_token(id, "reviewer_id")
}

/// Validate an item ASIN
///
/// # Examples
///
/// ```
/// use review_graph_core::validation::validate_asin;
///
/// assert!(validate_asin("0528881469").is_ok());
/// assert!(validate_asin(" ").is_err());
/// ```
pub fn validate_asin(asin: &str) -> Result<(), ReviewGraphError> {
    validate_token(asin, "asin")
}

/// Validate a star rating is finite and within 1.0 to 5.0
///
/// # Examples
///
/// ```
/// use review_graph_core::validation::validate_rating;
///
/// assert!(validate_rating(1.0).is_ok());
/// assert!(validate_rating(4.5).is_ok());
/// assert!(validate_rating(0.0).is_err());
/// assert!(validate_rating(f64::NAN).is_err());
/// ```
pub fn validate_rating(rating: f64) -> Result<(), ReviewGraphError> {
    if rating.is_finite() && (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(ReviewGraphError::validation_field(
            format!(
                "Rating must be between {} and {}, got {}",
                MIN_RATING, MAX_RATING, rating
            ),
            "overall",
        ))
    }
}

/// Validate a Jaccard similarity weight lies in (0, 1]
///
/// # Examples
///
/// ```
/// use review_graph_core::validation::validate_similarity;
///
/// assert!(validate_similarity(0.25).is_ok());
/// assert!(validate_similarity(1.0).is_ok());
/// assert!(validate_similarity(0.0).is_err());
/// ```
pub fn validate_similarity(similarity: f64) -> Result<(), ReviewGraphError> {
    if similarity > 0.0 && similarity <= 1.0 {
        Ok(())
    } else {
        Err(ReviewGraphError::validation_field(
            format!("Similarity must be in (0, 1], got {}", similarity),
            "similarity",
        ))
    }
}

fn validate_token(value: &str, field: &str) -> Result<(), ReviewGraphError> {
    if value.is_empty() {
        return Err(ReviewGraphError::validation_field(
            format!("{} cannot be empty", field),
            field,
        ));
    }

    if value.chars().any(char::is_whitespace) {
        return Err(ReviewGraphError::validation_field(
            format!("{} cannot contain whitespace", field),
            field,
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds_inclusive() {
        assert!(validate_rating(MIN_RATING).is_ok());
        assert!(validate_rating(MAX_RATING).is_ok());
        assert!(validate_rating(0.99).is_err());
        assert!(validate_rating(5.01).is_err());
        assert!(validate_rating(f64::INFINITY).is_err());
    }

    #[test]
    fn test_token_field_names() {
        match validate_asin("").unwrap_err() {
            ReviewGraphError::ValidationError { field, .. } => {
                assert_eq!(field.as_deref(), Some("asin"));
            }
            _ => panic!("Expected ValidationError"),
        }
    }

    #[test]
    fn test_similarity_rejects_nan() {
        assert!(validate_similarity(f64::NAN).is_err());
        assert!(validate_similarity(1.0001).is_err());
    }
}
