//! # Acceso al Directorio Servido
//! src/files/mod.rs
//!
//! - `resolver`: confinamiento de paths al directorio raíz
//! - `mime`: `Content-Type` por extensión
//! - `listing`: HTML de listado de directorios
//!
//! Todo lo que aquí toca el filesystem es de solo lectura.

pub mod listing;
pub mod mime;
pub mod resolver;

pub use resolver::{confine, resolve, ResolvedTarget, TargetKind};
