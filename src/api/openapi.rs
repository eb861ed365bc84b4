//! OpenAPI description of the REST surface.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::token::create,
        super::handlers::token::show,
        super::handlers::token::revoke,
        super::handlers::backends::list,
        super::handlers::health::health,
    ),
    components(schemas(super::handlers::health::Health)),
    tags(
        (name = "token", description = "Token issuance and validation"),
        (name = "backends", description = "Authentication backends"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
