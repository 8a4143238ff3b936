//! Database record models matching table schemas.
//!
//! Models derive `sqlx::FromRow` and are kept separate from the API models in
//! [`crate::api::models`], which convert from them with `From` impls.

pub mod equipment;
pub mod uploads;
