//! Database layer for data persistence and access.
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers, ingest pipeline)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! Writes go through a transaction so an upload, its records and the retention prune land
//! together. Read-only paths may use a plain pooled connection.
//!
//! Migrations live in `migrations/` and are embedded via [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
