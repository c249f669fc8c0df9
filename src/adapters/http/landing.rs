//! Static landing page served at `/`.

use axum::response::Html;

/// Page compiled into the binary.
pub const HOME_PAGE: &str = include_str!("../../../static/home.html");

/// Serve the landing page.
///
/// Route: `GET /`
pub async fn landing_page() -> Html<&'static str> {
    Html(HOME_PAGE)
}
