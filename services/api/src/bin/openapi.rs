//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document for the membership API to disk, so the web
//! client can generate its typed bindings without a running server.
//!
//! Usage: `openapi [OUTPUT_PATH]` (defaults to `openapi.json`).

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn generate_spec(
    mut api_doc: utoipa::openapi::OpenApi,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    api_doc.info.title = "Membership API".to_string();
    api_doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    let spec_json = api_doc.to_pretty_json()?;
    std::fs::write(path, spec_json)?;
    println!("OpenAPI document written to {} ({} paths)", path, api_doc.paths.paths.len());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());
    generate_spec(ApiDoc::openapi(), &path)?;
    Ok(())
}
