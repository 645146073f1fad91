//! # Configuración del Servidor
//! src/config.rs
//!
//! Solo hay dos entradas: el puerto y el directorio a servir.
//!
//! ## Ejemplos de uso
//!
//! ### Variables de entorno
//! ```bash
//! PORT=3000 ./file_server
//! ```
//!
//! ### CLI
//! ```bash
//! ./file_server --port 8080 --root ./dist
//! ```

use crate::error::ServerError;
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directorio servido cuando no se indica `--root`
pub const DEFAULT_ROOT: &str = "dist";

/// Tiempo máximo sin recibir bytes del cliente
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Tiempo máximo para recibir un request completo
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Tamaño máximo del bloque de headers
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8 * 1024;

/// Espera máxima a las conexiones en curso al apagar
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Argumentos de línea de comandos
#[derive(Debug, Clone, Parser)]
#[command(name = "file_server")]
#[command(about = "Servidor HTTP de archivos estáticos para un único directorio")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(
        short,
        long,
        default_value = "8080",
        env = "PORT",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub port: u16,

    /// Directorio cuyos archivos se sirven
    #[arg(long, default_value = DEFAULT_ROOT)]
    pub root: PathBuf,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI y entorno
    pub fn new() -> Self {
        Config::parse()
    }

    /// Valida la configuración y resuelve el directorio raíz a un path absoluto
    pub fn into_server_config(self) -> Result<ServerConfig, ServerError> {
        ServerConfig::new(self.port, &self.root)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            root: PathBuf::from(DEFAULT_ROOT),
        }
    }
}

/// Configuración efectiva, inmutable durante la vida del proceso
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interfaz donde se escucha (todas por defecto)
    pub host: IpAddr,

    /// Puerto; `0` pide uno efímero al sistema (útil en tests)
    pub port: u16,

    /// Directorio raíz, absoluto y canónico
    pub root: PathBuf,

    pub read_timeout: Duration,
    pub request_timeout: Duration,
    pub max_header_bytes: usize,
    pub drain_timeout: Duration,
}

impl ServerConfig {
    /// Construye la configuración verificando que `root` sea un directorio.
    ///
    /// El path se canonicaliza aquí para que todas las verificaciones de
    /// confinamiento posteriores comparen paths absolutos sin symlinks.
    pub fn new(port: u16, root: impl AsRef<Path>) -> Result<Self, ServerError> {
        let root = root.as_ref();
        let canonical = root.canonicalize().map_err(|e| ServerError::Config {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !canonical.is_dir() {
            return Err(ServerError::Config {
                path: root.to_path_buf(),
                reason: "no es un directorio".to_string(),
            });
        }

        Ok(Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port,
            root: canonical,
            read_timeout: DEFAULT_READ_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        })
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    pub fn with_timeouts(mut self, read: Duration, request: Duration) -> Self {
        self.read_timeout = read;
        self.request_timeout = request;
        self
    }

    pub fn with_max_header_bytes(mut self, limit: usize) -> Self {
        self.max_header_bytes = limit;
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Dirección completa para bind (host:port)
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
