//! Domain models for the review dataset

pub mod review;

pub use review::{
    ItemKey, ItemPopularity, ProductType, ReviewRecord, ReviewerProfile, ReviewerSummary,
    TypeReviewCount,
};
