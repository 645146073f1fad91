//! # Tipos MIME
//! src/files/mime.rs
//!
//! Tipos MIME por extensión de archivo. Tabla fija, sin leer el contenido.

use std::path::Path;

/// Tipo usado cuando la extensión no es conocida
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Deduce el `Content-Type` a partir de la extensión (sin distinguir mayúsculas)
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        // Texto
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "webmanifest" => "application/manifest+json",
        "xml" => "application/xml",
        "txt" => "text/plain; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",
        "csv" => "text/csv",

        // Imágenes
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "avif" => "image/avif",

        // Audio/Video
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",

        // Fuentes
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",

        // Otros
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "wasm" => "application/wasm",

        _ => DEFAULT_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_types() {
        assert_eq!(content_type(Path::new("index.html")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("assets/app.js")), "text/javascript; charset=utf-8");
        assert_eq!(content_type(Path::new("style.css")), "text/css; charset=utf-8");
        assert_eq!(content_type(Path::new("logo.png")), "image/png");
        assert_eq!(content_type(Path::new("sw.js.map")), "application/json");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(content_type(Path::new("PHOTO.JPG")), "image/jpeg");
    }

    #[test]
    fn test_fallback() {
        assert_eq!(content_type(Path::new("unknown")), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type(Path::new("archive.xyz")), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type(Path::new(".hidden")), DEFAULT_CONTENT_TYPE);
    }
}
