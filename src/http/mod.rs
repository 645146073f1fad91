//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Implementación mínima de HTTP/1.1 sobre TCP:
//!
//! - Lectura y parsing de requests (con límites de tamaño y tiempo)
//! - Construcción de responses con body en memoria o desde un archivo
//! - Códigos de estado
//!
//! Se aceptan clientes HTTP/1.0 y HTTP/1.1. Las respuestas siempre llevan
//! `Content-Length`, así que nunca hace falta chunked encoding.

pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ReadLimits, Request};
pub use response::{Body, Response};
pub use status::StatusCode;
