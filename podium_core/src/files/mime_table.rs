use std::path::Path;

const EXTENSION_TABLE: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("flac", "audio/flac"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("mp4", "video/mp4"),
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("json", "application/json"),
];

pub fn mime_for_extension(extension: &str) -> String {
    EXTENSION_TABLE
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .map(|(_, mime_type)| mime_type.to_string())
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string())
}

pub fn mime_for_path(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(mime_for_extension)
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string())
}
