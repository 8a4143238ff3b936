//! API request and response data models.
//!
//! API models are distinct from the database models in [`crate::db::models`] and convert from
//! them with `From` impls. All models carry `utoipa` annotations for the generated docs.
//!
//! - [`uploads`]: Upload results, row previews and history entries
//! - [`records`]: Query parameters selecting which records a read covers
//!
//! Summary responses use [`crate::summary::Aggregate`] directly.

pub mod records;
pub mod uploads;
