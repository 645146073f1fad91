//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones entrantes (un thread por conexión)
//! 3. Lee y parsea requests HTTP, con keep-alive
//! 4. Genera y envía responses HTTP
//! 5. Se apaga ordenadamente cuando se le pide

pub mod connection;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use tcp::{ConnectionTracker, Server, ShutdownHandle};
