//! Repository implementations for database access.
//!
//! Each repository wraps a borrowed SQLx connection or transaction, binds parameters for its
//! table and returns models from [`crate::db::models`].
//!
//! - [`Uploads`]: Upload batches (one per ingested CSV)
//! - [`EquipmentRecords`]: Equipment rows belonging to an upload
//!
//! ```ignore
//! use chemviz::db::handlers::{Repository, Uploads, uploads::UploadFilter};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let mut uploads = Uploads::new(&mut tx);
//!     let recent = uploads.list(&UploadFilter::new().limit(5)).await?;
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod equipment;
pub mod repository;
pub mod uploads;

pub use equipment::EquipmentRecords;
pub use repository::Repository;
pub use uploads::Uploads;
