//! # File Server
//! src/lib.rs
//!
//! Servidor HTTP/1.1 que expone el contenido de un único directorio local
//! como archivos estáticos.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `config`: puerto y directorio raíz (CLI / variables de entorno)
//! - `http`: parsing de requests y serialización de responses
//! - `files`: confinamiento de paths, tipos MIME y listados de directorio
//! - `handler`: de un request parseado a una respuesta
//! - `server`: listener TCP, un thread por conexión, apagado ordenado
//! - `error`: taxonomía de errores
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use file_server::config::ServerConfig;
//! use file_server::server::Server;
//!
//! let config = ServerConfig::new(8080, "dist").expect("directorio raíz inválido");
//! let server = Server::bind(config).expect("Error al iniciar servidor");
//! server.run().expect("Error en el servidor");
//! ```

pub mod config;
pub mod error;
pub mod files;
pub mod handler;
pub mod http;
pub mod server;
