//! Form body parsing module
//!
//! Parses `multipart/form-data` (RFC 7578) and
//! `application/x-www-form-urlencoded` request bodies into text fields
//! plus at most one uploaded file per field name. Only the subset the
//! registration forms produce is supported: single-level parts, no
//! nested multipart, no content-transfer-encoding.

use std::collections::HashMap;

/// One uploaded file part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-supplied original filename, used only for its extension.
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Decoded form body: text fields plus named file parts.
#[derive(Debug, Default)]
pub struct FormBody {
    fields: HashMap<String, String>,
    files: Vec<(String, UploadedFile)>,
}

impl FormBody {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Take the first file uploaded under `name`, if any.
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        let index = self.files.iter().position(|(field, _)| field == name)?;
        Some(self.files.remove(index).1)
    }

    pub fn from_fields(fields: HashMap<String, String>) -> Self {
        Self {
            fields,
            files: Vec::new(),
        }
    }
}

/// Extract the boundary token from a `Content-Type` header value.
///
/// Handles both bare and quoted forms:
/// `multipart/form-data; boundary=xyz` and `...; boundary="xyz"`.
pub fn boundary(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("boundary="))
        .map(|token| token.trim_matches('"'))
        .filter(|token| !token.is_empty())
}

/// Parse a multipart body delimited by `boundary`.
///
/// Returns `None` when the body does not follow the multipart framing;
/// the caller maps that to a 400 response. File parts with an empty
/// filename (a form submitted with no file selected) are dropped, which
/// matches how browsers encode the "no file" case.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Option<FormBody> {
    let delimiter = format!("--{boundary}").into_bytes();
    let mut form = FormBody::default();

    let mut cursor = find_subslice(body, &delimiter, 0)? + delimiter.len();
    loop {
        let rest = &body[cursor..];
        if rest.starts_with(b"--") {
            // Closing delimiter
            return Some(form);
        }

        let next = find_subslice(body, &delimiter, cursor)?;
        let part = trim_crlf(&body[cursor..next]);
        parse_part(part, &mut form)?;
        cursor = next + delimiter.len();
    }
}

/// Parse one part: headers, blank line, payload.
fn parse_part(part: &[u8], form: &mut FormBody) -> Option<()> {
    let header_end = find_subslice(part, b"\r\n\r\n", 0)?;
    let headers = std::str::from_utf8(&part[..header_end]).ok()?;
    let data = &part[header_end + 4..];

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;

    for line in headers.split("\r\n") {
        let (key, value) = line.split_once(':')?;
        if key.eq_ignore_ascii_case("content-disposition") {
            for param in value.split(';').map(str::trim) {
                if let Some(v) = param.strip_prefix("name=") {
                    name = Some(v.trim_matches('"').to_string());
                } else if let Some(v) = param.strip_prefix("filename=") {
                    filename = Some(v.trim_matches('"').to_string());
                }
            }
        } else if key.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.trim().to_string());
        }
    }

    let name = name?;
    match filename {
        Some(filename) if !filename.is_empty() => {
            form.files.push((
                name,
                UploadedFile {
                    filename,
                    content_type,
                    data: data.to_vec(),
                },
            ));
        }
        Some(_) => {} // file input left empty
        None => {
            form.fields
                .insert(name, String::from_utf8_lossy(data).into_owned());
        }
    }
    Some(())
}

/// Decode an `application/x-www-form-urlencoded` body.
///
/// Lenient: malformed percent escapes pass through literally instead of
/// failing the whole body.
pub fn parse_urlencoded(body: &str) -> HashMap<String, String> {
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (percent_decode(key), percent_decode(value)),
            None => (percent_decode(pair), String::new()),
        })
        .collect()
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                if let Some(decoded) = bytes
                    .get(i + 1..i + 3)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                {
                    out.push(decoded);
                    i += 3;
                } else {
                    out.push(b'%');
                    i += 1;
                }
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

fn trim_crlf(part: &[u8]) -> &[u8] {
    let part = part.strip_prefix(b"\r\n").unwrap_or(part);
    part.strip_suffix(b"\r\n").unwrap_or(part)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "----test-boundary";

    fn body(parts: &str) -> Vec<u8> {
        parts.replace('\n', "\r\n").into_bytes()
    }

    #[test]
    fn test_boundary_extraction() {
        assert_eq!(
            boundary("multipart/form-data; boundary=----abc"),
            Some("----abc")
        );
        assert_eq!(
            boundary("multipart/form-data; boundary=\"quoted\""),
            Some("quoted")
        );
        assert_eq!(boundary("application/json"), None);
        assert_eq!(boundary("multipart/form-data; boundary="), None);
    }

    #[test]
    fn test_parse_fields_and_file() {
        let raw = body(
            "------test-boundary\n\
             Content-Disposition: form-data; name=\"inventory_name\"\n\
             \n\
             Drill\n\
             ------test-boundary\n\
             Content-Disposition: form-data; name=\"description\"\n\
             \n\
             Cordless, 18V\n\
             ------test-boundary\n\
             Content-Disposition: form-data; name=\"photo\"; filename=\"drill.png\"\n\
             Content-Type: image/png\n\
             \n\
             PNGDATA\n\
             ------test-boundary--\n",
        );

        let mut form = parse_multipart(&raw, BOUNDARY).expect("parse");
        assert_eq!(form.field("inventory_name"), Some("Drill"));
        assert_eq!(form.field("description"), Some("Cordless, 18V"));

        let file = form.take_file("photo").expect("file present");
        assert_eq!(file.filename, "drill.png");
        assert_eq!(file.content_type.as_deref(), Some("image/png"));
        assert_eq!(file.data, b"PNGDATA");
    }

    #[test]
    fn test_empty_filename_is_no_file() {
        let raw = body(
            "------test-boundary\n\
             Content-Disposition: form-data; name=\"inventory_name\"\n\
             \n\
             Drill\n\
             ------test-boundary\n\
             Content-Disposition: form-data; name=\"photo\"; filename=\"\"\n\
             Content-Type: application/octet-stream\n\
             \n\
             \n\
             ------test-boundary--\n",
        );

        let mut form = parse_multipart(&raw, BOUNDARY).expect("parse");
        assert_eq!(form.field("inventory_name"), Some("Drill"));
        assert!(form.take_file("photo").is_none());
    }

    #[test]
    fn test_binary_payload_preserved() {
        let mut raw = body(
            "------test-boundary\n\
             Content-Disposition: form-data; name=\"photo\"; filename=\"a.bin\"\n\
             \n",
        );
        raw.extend_from_slice(&[0x00, 0xFF, 0x0D, 0x0A, 0x7F]);
        raw.extend_from_slice(b"\r\n------test-boundary--\r\n");

        let mut form = parse_multipart(&raw, BOUNDARY).expect("parse");
        let file = form.take_file("photo").expect("file present");
        assert_eq!(file.data, vec![0x00, 0xFF, 0x0D, 0x0A, 0x7F]);
    }

    #[test]
    fn test_malformed_body() {
        assert!(parse_multipart(b"not multipart at all", BOUNDARY).is_none());

        // Missing closing delimiter
        let raw = body(
            "------test-boundary\n\
             Content-Disposition: form-data; name=\"x\"\n\
             \n\
             value\n",
        );
        assert!(parse_multipart(&raw, BOUNDARY).is_none());
    }

    #[test]
    fn test_urlencoded_decoding() {
        let fields = parse_urlencoded("id=abc-123&includePhoto=on");
        assert_eq!(fields.get("id").map(String::as_str), Some("abc-123"));
        assert_eq!(fields.get("includePhoto").map(String::as_str), Some("on"));

        let fields = parse_urlencoded("name=Power+drill&description=18V%20%2B%20charger");
        assert_eq!(fields.get("name").map(String::as_str), Some("Power drill"));
        assert_eq!(
            fields.get("description").map(String::as_str),
            Some("18V + charger")
        );
    }

    #[test]
    fn test_urlencoded_lenient_on_bad_escape() {
        let fields = parse_urlencoded("name=50%");
        assert_eq!(fields.get("name").map(String::as_str), Some("50%"));
    }
}
