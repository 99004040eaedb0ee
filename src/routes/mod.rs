/// Router Module Index
///
/// Splits routing by how a request proves who it is. Access control is
/// applied per module with Axum layers in `create_router`, so a handler can't
/// end up unprotected just because it was registered in the wrong place.

/// JSON API routes open to anyone: reads, tagging, and the token login.
pub mod public;

/// JSON API routes behind the bearer-token `AuthUser` extractor middleware.
pub mod authenticated;

/// Server-rendered pages, split into public pages and session-gated forms.
pub mod web;
