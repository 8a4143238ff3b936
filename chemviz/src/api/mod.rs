//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! All routes are served under `/api`:
//!
//! - `POST /api/upload/`: Ingest a CSV file
//! - `GET /api/summary/`: Summary statistics
//! - `GET /api/history/`, `DELETE /api/history/{upload_id}/`: Recent uploads
//! - `GET /api/pdf/`: PDF report
//!
//! OpenAPI documentation is served at `/docs`.

pub mod handlers;
pub mod models;
