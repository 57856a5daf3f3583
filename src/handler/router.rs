//! Request routing dispatch module
//!
//! Entry point for HTTP request processing. Every known path carries an
//! explicit allowed-method table checked before dispatch, so a wrong
//! verb produces a deterministic 405 with the permitted set in the
//! `Allow` header instead of falling through a catch-all.

use crate::config::AppState;
use crate::logger;
use crate::response;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::HeaderValue;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

use super::{inventory, static_files};

/// Logical route a request path resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<'a> {
    Register,
    Inventory,
    InventoryItem(&'a str),
    Search,
    Photo(&'a str),
    Page(&'a str),
    Unknown,
}

const REGISTER_METHODS: &[Method] = &[Method::POST];
const INVENTORY_METHODS: &[Method] = &[Method::GET];
const INVENTORY_ITEM_METHODS: &[Method] = &[Method::GET, Method::PUT, Method::DELETE];
const SEARCH_METHODS: &[Method] = &[Method::POST];

/// Resolve a request path to its route.
pub fn match_route(path: &str) -> Route<'_> {
    match path {
        "/register" => Route::Register,
        "/inventory" => Route::Inventory,
        "/search" => Route::Search,
        "/RegisterForm.html" | "/SearchForm.html" => Route::Page(path),
        _ => {
            if let Some(id) = path.strip_prefix("/inventory/") {
                if !id.is_empty() && !id.contains('/') {
                    return Route::InventoryItem(id);
                }
            }
            if let Some(filename) = path.strip_prefix("/photos/") {
                if !filename.is_empty() {
                    return Route::Photo(filename);
                }
            }
            Route::Unknown
        }
    }
}

/// Allowed-method table for routes under the 405 contract. Routes not
/// listed here (photos, pages, unknown paths) answer 404 to unmatched
/// methods instead.
pub fn allowed_methods(route: &Route<'_>) -> Option<&'static [Method]> {
    match route {
        Route::Register => Some(REGISTER_METHODS),
        Route::Inventory => Some(INVENTORY_METHODS),
        Route::InventoryItem(_) => Some(INVENTORY_ITEM_METHODS),
        Route::Search => Some(SEARCH_METHODS),
        Route::Photo(_) | Route::Page(_) | Route::Unknown => None,
    }
}

/// Main entry point for HTTP request handling.
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let access_log = state.config.logging.access_log;
    if access_log {
        logger::log_request(&method, req.uri(), req.version());
    }
    logger::log_headers_count(req.headers().len(), state.config.logging.show_headers);

    if let Some(resp) = check_body_size(&req, state.config.http.max_body_size) {
        return Ok(resp);
    }

    let mut response = dispatch(req, &method, &path, &state).await;

    if let Ok(value) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert("Server", value);
    }
    if state.config.http.enable_cors {
        response
            .headers_mut()
            .insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    }

    if access_log {
        logger::log_response(&method, &path, response.status().as_u16());
    }
    Ok(response)
}

async fn dispatch(
    req: Request<hyper::body::Incoming>,
    method: &Method,
    path: &str,
    state: &Arc<AppState>,
) -> Response<Full<Bytes>> {
    let route = match_route(path);

    // Method table first: wrong verb on a contract path is 405, always.
    if let Some(allowed) = allowed_methods(&route) {
        if !allowed.contains(method) {
            logger::log_warning(&format!("Method not allowed: {method} {path}"));
            return response::build_405_response(allowed);
        }
    }

    match route {
        Route::Register => inventory::register(req, state).await,
        Route::Inventory => inventory::list(state),
        Route::InventoryItem(id) => match *method {
            Method::GET => inventory::get(id, state),
            Method::PUT => inventory::update(req, id, state).await,
            Method::DELETE => inventory::delete(id, state),
            // Unreachable past the method table
            _ => response::build_405_response(INVENTORY_ITEM_METHODS),
        },
        Route::Search => inventory::search(req, state).await,
        Route::Photo(filename) => {
            if *method == Method::GET {
                static_files::serve_photo(filename, state).await
            } else {
                response::build_404_response()
            }
        }
        Route::Page(page) => {
            if *method == Method::GET {
                static_files::serve_page(page, state).await
            } else {
                response::build_404_response()
            }
        }
        Route::Unknown => response::build_404_response(),
    }
}

/// Validate Content-Length header and return 413 if exceeded.
fn check_body_size(
    req: &Request<hyper::body::Incoming>,
    max_body_size: u64,
) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(response::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_contract_paths() {
        assert_eq!(match_route("/register"), Route::Register);
        assert_eq!(match_route("/inventory"), Route::Inventory);
        assert_eq!(match_route("/inventory/abc-123"), Route::InventoryItem("abc-123"));
        assert_eq!(match_route("/search"), Route::Search);
    }

    #[test]
    fn test_match_supplemental_paths() {
        assert_eq!(match_route("/photos/123-a.png"), Route::Photo("123-a.png"));
        assert_eq!(
            match_route("/RegisterForm.html"),
            Route::Page("/RegisterForm.html")
        );
        assert_eq!(
            match_route("/SearchForm.html"),
            Route::Page("/SearchForm.html")
        );
    }

    #[test]
    fn test_match_unknown_paths() {
        assert_eq!(match_route("/"), Route::Unknown);
        assert_eq!(match_route("/inventory/"), Route::Unknown);
        assert_eq!(match_route("/inventory/a/b"), Route::Unknown);
        assert_eq!(match_route("/photos/"), Route::Unknown);
        assert_eq!(match_route("/registering"), Route::Unknown);
    }

    #[test]
    fn test_allowed_method_tables() {
        assert_eq!(
            allowed_methods(&Route::Register),
            Some(&[Method::POST][..])
        );
        assert_eq!(
            allowed_methods(&Route::Inventory),
            Some(&[Method::GET][..])
        );
        assert_eq!(
            allowed_methods(&Route::InventoryItem("x")),
            Some(&[Method::GET, Method::PUT, Method::DELETE][..])
        );
        assert_eq!(allowed_methods(&Route::Search), Some(&[Method::POST][..]));
    }

    #[test]
    fn test_no_method_table_outside_contract() {
        assert_eq!(allowed_methods(&Route::Photo("a.png")), None);
        assert_eq!(allowed_methods(&Route::Page("/RegisterForm.html")), None);
        assert_eq!(allowed_methods(&Route::Unknown), None);
    }

    #[test]
    fn test_405_allow_header_for_item_route() {
        let resp = response::build_405_response(
            allowed_methods(&Route::InventoryItem("x")).expect("table"),
        );
        assert_eq!(
            resp.headers().get("Allow").and_then(|v| v.to_str().ok()),
            Some("GET, PUT, DELETE")
        );
    }
}
