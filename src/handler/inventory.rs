//! Inventory endpoint handlers.
//!
//! Decodes request bodies (multipart, urlencoded or JSON) into typed
//! payloads, drives the item store, and maps every store error onto the
//! wire contract.

use crate::config::AppState;
use crate::form::{self, FormBody, UploadedFile};
use crate::logger;
use crate::response::{html_response, json_response, message_response};
use crate::store::{Item, ItemDraft, ItemPatch, StoreError};
use crate::upload;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

const SEARCH_NOT_FOUND_HTML: &str = "<h2>Item not found by ID</h2>";

/// JSON body for POST /register.
#[derive(Debug, Default, Deserialize)]
struct RegisterRequest {
    inventory_name: Option<String>,
    description: Option<String>,
}

/// JSON body for PUT /inventory/:id.
#[derive(Debug, Default, Deserialize)]
struct UpdateRequest {
    name: Option<String>,
    description: Option<String>,
}

/// JSON body for POST /search.
#[derive(Debug, Default, Deserialize)]
struct SearchRequest {
    id: Option<String>,
    #[serde(rename = "includePhoto")]
    include_photo: Option<String>,
}

/// POST /register — validate, store an optional photo, mint the item.
pub async fn register(
    req: Request<hyper::body::Incoming>,
    state: &Arc<AppState>,
) -> Response<Full<Bytes>> {
    let (content_type, body) = match collect_body(req).await {
        Ok(parts) => parts,
        Err(resp) => return resp,
    };

    let (name, description, photo) = match parse_form(&content_type, &body) {
        Err(resp) => return resp,
        Ok(Some(mut form)) => (
            form.field("inventory_name").map(ToString::to_string),
            form.field("description").map(ToString::to_string),
            form.take_file("photo"),
        ),
        Ok(None) => match parse_json::<RegisterRequest>(&body) {
            Ok(request) => (request.inventory_name, request.description, None),
            Err(resp) => return resp,
        },
    };

    let photo_url = match photo {
        Some(file) => match save_photo(state, &file).await {
            Ok(url) => Some(url),
            Err(resp) => return resp,
        },
        None => None,
    };

    match state.store.create(ItemDraft {
        name,
        description,
        photo_url,
    }) {
        Ok(item) => json_response(StatusCode::CREATED, &item),
        Err(err) => store_error_response(&err),
    }
}

/// GET /inventory — full snapshot.
pub fn list(state: &Arc<AppState>) -> Response<Full<Bytes>> {
    match state.store.list() {
        Ok(items) => json_response(StatusCode::OK, &items),
        Err(err) => store_error_response(&err),
    }
}

/// GET /inventory/:id
pub fn get(id: &str, state: &Arc<AppState>) -> Response<Full<Bytes>> {
    match state.store.get(id) {
        Ok(item) => json_response(StatusCode::OK, &item),
        Err(err) => store_error_response(&err),
    }
}

/// PUT /inventory/:id — partial update, optional photo replacement.
pub async fn update(
    req: Request<hyper::body::Incoming>,
    id: &str,
    state: &Arc<AppState>,
) -> Response<Full<Bytes>> {
    let (content_type, body) = match collect_body(req).await {
        Ok(parts) => parts,
        Err(resp) => return resp,
    };

    let (name, description, photo) = match parse_form(&content_type, &body) {
        Err(resp) => return resp,
        Ok(Some(mut form)) => (
            form.field("name").map(ToString::to_string),
            form.field("description").map(ToString::to_string),
            form.take_file("photo"),
        ),
        Ok(None) => match parse_json::<UpdateRequest>(&body) {
            Ok(request) => (request.name, request.description, None),
            Err(resp) => return resp,
        },
    };

    // No file means the stored photoUrl stays as it is.
    let photo_url = match photo {
        Some(file) => match save_photo(state, &file).await {
            Ok(url) => Some(url),
            Err(resp) => return resp,
        },
        None => None,
    };

    match state.store.update(
        id,
        ItemPatch {
            name,
            description,
            photo_url,
        },
    ) {
        Ok(item) => json_response(StatusCode::OK, &item),
        Err(err) => store_error_response(&err),
    }
}

/// DELETE /inventory/:id
pub fn delete(id: &str, state: &Arc<AppState>) -> Response<Full<Bytes>> {
    match state.store.delete(id) {
        Ok(()) => message_response(StatusCode::OK, "Item deleted successfully"),
        Err(err) => store_error_response(&err),
    }
}

/// POST /search — lookup by id with an optional photo-link annotation.
///
/// The annotation lives in the response only; the stored description is
/// never touched. Not-found answers HTML here, unlike the JSON errors
/// everywhere else.
pub async fn search(
    req: Request<hyper::body::Incoming>,
    state: &Arc<AppState>,
) -> Response<Full<Bytes>> {
    let (content_type, body) = match collect_body(req).await {
        Ok(parts) => parts,
        Err(resp) => return resp,
    };

    let request = match parse_form(&content_type, &body) {
        Err(resp) => return resp,
        Ok(Some(form)) => SearchRequest {
            id: form.field("id").map(ToString::to_string),
            include_photo: form.field("includePhoto").map(ToString::to_string),
        },
        Ok(None) => match parse_json::<SearchRequest>(&body) {
            Ok(request) => request,
            Err(resp) => return resp,
        },
    };

    let id = request.id.unwrap_or_default();
    match state.store.get(&id) {
        Ok(mut item) => {
            if request.include_photo.as_deref() == Some("on") {
                annotate_photo_link(&mut item, &state.config.photo_base());
            }
            json_response(StatusCode::OK, &item)
        }
        Err(StoreError::NotFound) => {
            html_response(StatusCode::NOT_FOUND, SEARCH_NOT_FOUND_HTML)
        }
        Err(err) => store_error_response(&err),
    }
}

/// Append the constructed photo link to the response description.
fn annotate_photo_link(item: &mut Item, base: &str) {
    if let Some(url) = item.photo_url.clone() {
        item.description
            .push_str(&format!("\n\n[Photo Link: {base}{url}]"));
    }
}

fn store_error_response(err: &StoreError) -> Response<Full<Bytes>> {
    let status = match err {
        StoreError::EmptyName => StatusCode::BAD_REQUEST,
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Backend(message) => {
            logger::log_error(&format!("Store backend failure: {message}"));
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    message_response(status, &err.to_string())
}

async fn collect_body(
    req: Request<hyper::body::Incoming>,
) -> Result<(String, Bytes), Response<Full<Bytes>>> {
    let content_type = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    match req.collect().await {
        Ok(collected) => Ok((content_type, collected.to_bytes())),
        Err(e) => {
            logger::log_error(&format!("Failed to read request body: {e}"));
            Err(message_response(
                StatusCode::BAD_REQUEST,
                "Failed to read request body",
            ))
        }
    }
}

/// Decode multipart or urlencoded bodies; `Ok(None)` means the body is
/// not form-shaped and should be parsed as JSON.
fn parse_form(
    content_type: &str,
    body: &[u8],
) -> Result<Option<FormBody>, Response<Full<Bytes>>> {
    if content_type.starts_with("multipart/form-data") {
        let Some(boundary) = form::boundary(content_type) else {
            return Err(message_response(
                StatusCode::BAD_REQUEST,
                "Missing multipart boundary",
            ));
        };
        match form::parse_multipart(body, boundary) {
            Some(parsed) => Ok(Some(parsed)),
            None => Err(message_response(
                StatusCode::BAD_REQUEST,
                "Malformed multipart body",
            )),
        }
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let fields = form::parse_urlencoded(&String::from_utf8_lossy(body));
        Ok(Some(FormBody::from_fields(fields)))
    } else {
        Ok(None)
    }
}

/// Parse a JSON body into a typed request; an empty body decodes to the
/// all-absent default, matching how the original treated bodyless
/// requests.
fn parse_json<T: serde::de::DeserializeOwned + Default>(
    body: &[u8],
) -> Result<T, Response<Full<Bytes>>> {
    if body.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        message_response(StatusCode::BAD_REQUEST, &format!("Invalid JSON: {e}"))
    })
}

async fn save_photo(
    state: &Arc<AppState>,
    file: &UploadedFile,
) -> Result<String, Response<Full<Bytes>>> {
    match state.photos.save(&file.filename, &file.data).await {
        Ok(filename) => {
            logger::log_photo_stored(&filename);
            Ok(upload::public_path(&filename))
        }
        Err(e) => {
            logger::log_error(&format!("Failed to store photo: {e}"));
            Err(message_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Failed to store photo: {e}"),
            ))
        }
    }
}
