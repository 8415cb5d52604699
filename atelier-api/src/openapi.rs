//! OpenAPI documentation for the public surface.

use utoipa::OpenApi;

/// OpenAPI document covering the externally consumable routes. The chat
/// surface streams SSE and is documented separately for the first-party UI.
#[derive(OpenApi)]
#[openapi(
    paths(crate::routes::query::query, crate::routes::health::health),
    components(schemas(
        crate::error::ApiError,
        crate::error::ErrorCode,
        crate::routes::query::QueryRequest,
        crate::routes::query::QueryResponse,
        crate::routes::query::QueryMeta,
    )),
    tags(
        (name = "Query", description = "Read-only inventory queries"),
        (name = "Health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().unwrap();
        assert!(json.contains("/api/v1/query"));
        assert!(json.contains("INVALID_ACTION") || json.contains("ErrorCode"));
    }
}
