//! # Listado de Directorios
//! src/files/listing.rs
//!
//! Página HTML con los hijos inmediatos de un directorio. Los enlaces son
//! relativos, así que el directorio debe pedirse con `/` final.

use std::fs;
use std::io;
use std::path::Path;
use tracing::warn;

/// Un hijo del directorio listado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
    pub is_symlink: bool,
}

impl ListingEntry {
    pub fn new(name: impl Into<String>, is_dir: bool) -> Self {
        Self {
            name: name.into(),
            is_dir,
            is_symlink: false,
        }
    }

    pub fn symlink(name: impl Into<String>, is_dir: bool) -> Self {
        Self {
            is_symlink: true,
            ..Self::new(name, is_dir)
        }
    }
}

/// Lee los hijos inmediatos de `dir`. Los symlinks se clasifican según su
/// destino; uno roto se lista como archivo.
///
/// Los nombres que no son UTF-8 no tendrían un enlace que los alcance, así
/// que se omiten.
pub fn read_entries(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut entries = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!(name = ?raw, "nombre no UTF-8 omitido del listado");
                continue;
            }
        };
        let is_symlink = entry.file_type().map(|t| t.is_symlink()).unwrap_or(false);
        let is_dir = fs::metadata(entry.path())
            .map(|m| m.is_dir())
            .unwrap_or(false);
        entries.push(ListingEntry {
            name,
            is_dir,
            is_symlink,
        });
    }

    Ok(entries)
}

/// Genera el HTML del listado, ordenado lexicográficamente por nombre.
///
/// # Ejemplo
/// ```
/// use file_server::files::listing::{render, ListingEntry};
///
/// let html = render("/sub/", &[ListingEntry::new("b.txt", false), ListingEntry::new("a", true)]);
/// assert!(html.find("href=\"a/\"").unwrap() < html.find("href=\"b.txt\"").unwrap());
/// ```
pub fn render(request_path: &str, entries: &[ListingEntry]) -> String {
    let mut sorted: Vec<&ListingEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let title = format!("Directory listing for {}", escape_html(request_path));

    let mut html = String::with_capacity(256 + sorted.len() * 64);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", title));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n<hr>\n<ul>\n", title));

    for entry in sorted {
        let link_suffix = if entry.is_dir { "/" } else { "" };
        // Un symlink se marca con `@` aunque apunte a un directorio
        let shown_suffix = if entry.is_symlink { "@" } else { link_suffix };
        html.push_str(&format!(
            "<li><a href=\"{}{}\">{}{}</a></li>\n",
            urlencoding::encode(&entry.name),
            link_suffix,
            escape_html(&entry.name),
            shown_suffix
        ));
    }

    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}
