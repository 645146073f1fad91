//! # Resolución de Paths
//! src/files/resolver.rs
//!
//! Mapea el path decodificado de un request a un destino dentro del
//! directorio raíz. Dos pasos:
//!
//! 1. [`confine`]: función pura que parte el path en segmentos, rechaza `..`
//!    y une el resto al directorio raíz.
//! 2. [`resolve`]: canonicaliza el resultado (sigue symlinks) y verifica
//!    componente a componente que siga dentro del directorio raíz.
//!
//! Invariante: `ResolvedTarget::absolute_path` siempre es el directorio raíz
//! o un descendiente suyo.

use crate::error::ResolveError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Archivos que se sirven en lugar del listado, en orden de preferencia
pub const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

/// Qué hay en el path resuelto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    File,
    Directory,
    NotFound,
    /// Sin permisos, o un symlink que apunta fuera del directorio raíz
    Forbidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub absolute_path: PathBuf,
    pub kind: TargetKind,
}

/// Une los segmentos de `request_path` a `root` sin tocar el filesystem.
///
/// Los segmentos vacíos y `.` se descartan. Un segmento `..` rechaza el
/// request completo en lugar de normalizarlo.
///
/// # Ejemplo
/// ```
/// use file_server::files::resolver::confine;
/// use std::path::Path;
///
/// let root = Path::new("/srv/www");
/// assert_eq!(confine(root, "/sub//./a.txt").unwrap(), Path::new("/srv/www/sub/a.txt"));
/// assert!(confine(root, "/sub/../../etc/passwd").is_err());
/// ```
pub fn confine(root: &Path, request_path: &str) -> Result<PathBuf, ResolveError> {
    let mut resolved = root.to_path_buf();

    for segment in request_path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(ResolveError::ParentSegment),
            s if s.contains('\0') || s.contains('\\') => {
                return Err(ResolveError::InvalidSegment(s.to_string()))
            }
            s if cfg!(windows) && s.contains(':') => {
                return Err(ResolveError::InvalidSegment(s.to_string()))
            }
            s => resolved.push(s),
        }
    }

    debug_assert!(resolved.starts_with(root));
    Ok(resolved)
}

/// Resuelve `request_path` contra `root`, que debe ser canónico.
pub fn resolve(root: &Path, request_path: &str) -> Result<ResolvedTarget, ResolveError> {
    let candidate = confine(root, request_path)?;

    let canonical = match candidate.canonicalize() {
        Ok(path) => path,
        Err(e) => {
            return Ok(ResolvedTarget {
                absolute_path: candidate,
                kind: kind_for_error(e.kind()),
            })
        }
    };

    if !canonical.starts_with(root) {
        warn!(path = %request_path, "symlink fuera del directorio raíz");
        return Ok(ResolvedTarget {
            absolute_path: candidate,
            kind: TargetKind::Forbidden,
        });
    }

    let kind = match fs::metadata(&canonical) {
        Ok(meta) if meta.is_dir() => TargetKind::Directory,
        Ok(meta) if meta.is_file() => TargetKind::File,
        // FIFOs, sockets y dispositivos no se sirven
        Ok(_) => TargetKind::Forbidden,
        Err(e) => kind_for_error(e.kind()),
    };

    Ok(ResolvedTarget {
        absolute_path: canonical,
        kind,
    })
}

/// Busca un archivo índice dentro de `dir` con la misma verificación de
/// confinamiento que [`resolve`].
pub fn find_index(root: &Path, dir: &Path) -> Option<PathBuf> {
    INDEX_FILES.iter().find_map(|name| {
        let canonical = dir.join(name).canonicalize().ok()?;
        (canonical.starts_with(root) && canonical.is_file()).then_some(canonical)
    })
}

fn kind_for_error(kind: ErrorKind) -> TargetKind {
    match kind {
        ErrorKind::PermissionDenied => TargetKind::Forbidden,
        _ => TargetKind::NotFound,
    }
}
