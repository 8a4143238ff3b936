//! Shared helpers for handler and pipeline tests.

use crate::config::{Config, PoolSettings};
use axum_test::{
    TestResponse, TestServer,
    multipart::{MultipartForm, Part},
};
use sqlx::PgPool;

pub async fn create_test_app(pool: PgPool) -> TestServer {
    let config = create_test_config();

    let app = crate::Application::new_with_pool(config, Some(pool))
        .await
        .expect("Failed to create application");

    app.into_test_server()
}

pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..Default::default()
    };
    config.database.pool = PoolSettings {
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    config
}

/// Six well-formed rows across three equipment types
pub fn sample_csv() -> &'static str {
    "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
     Pump-1,Pump,120,5.2,110\n\
     Pump-2,Pump,135.5,5.6,115\n\
     Valve-1,Valve,60,4.1,105\n\
     Valve-2,Valve,65,4.3,102\n\
     Reactor-1,Reactor,150,7.8,180\n\
     Compressor-1,Compressor,98,9.5,95\n"
}

pub fn csv_part(content: &str, file_name: &str) -> Part {
    Part::bytes(content.as_bytes().to_vec())
        .file_name(file_name.to_string())
        .mime_type("text/csv")
}

pub async fn upload_csv_text(app: &TestServer, content: &str) -> TestResponse {
    app.post("/api/upload/")
        .multipart(MultipartForm::new().add_part("file", csv_part(content, "equipment.csv")))
        .await
}
