//! Static agent catalog.

use axum::Json;

use conductor_models::{builtin_catalog, CatalogEntry};

use crate::types::ApiResponse;

/// GET /api/catalog - Agents available for installation.
pub async fn catalog() -> Json<ApiResponse<Vec<CatalogEntry>>> {
    ApiResponse::ok(builtin_catalog())
}
