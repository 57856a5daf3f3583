//! Static file serving for uploaded photos and the form pages.

use crate::config::AppState;
use crate::response;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;

/// GET /photos/:filename — serve a stored upload.
pub async fn serve_photo(filename: &str, state: &Arc<AppState>) -> Response<Full<Bytes>> {
    match state.photos.load(filename).await {
        Some(data) => {
            let extension = Path::new(filename).extension().and_then(|ext| ext.to_str());
            response::file_response(data, response::content_type_for(extension))
        }
        None => response::build_404_response(),
    }
}

/// GET /RegisterForm.html or /SearchForm.html — serve a form page from
/// the configured pages directory.
pub async fn serve_page(page: &str, state: &Arc<AppState>) -> Response<Full<Bytes>> {
    let name = page.trim_start_matches('/');
    let path = Path::new(&state.config.uploads.pages_dir).join(name);

    match fs::read(&path).await {
        Ok(content) => {
            response::file_response(content, response::content_type_for(Some("html")))
        }
        Err(_) => response::build_404_response(),
    }
}
