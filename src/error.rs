//! # Errores del Servidor
//! src/error.rs
//!
//! Taxonomía de errores en tres niveles:
//!
//! - [`ServerError`]: fatales, abortan el proceso antes de aceptar conexiones
//! - [`RequestError`]: por conexión, al leer o parsear un request
//! - [`ResolveError`]: el path pedido no puede mapearse al directorio raíz

use crate::http::StatusCode;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Errores fatales de arranque
#[derive(Debug, Error)]
pub enum ServerError {
    /// No se pudo escuchar en el puerto (ocupado o requiere privilegios)
    #[error("no se pudo escuchar en {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// El directorio raíz no existe o no es un directorio
    #[error("directorio raíz inválido {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("error de I/O: {0}")]
    Io(#[from] io::Error),
}

/// Errores al leer un request de la conexión
#[derive(Debug, Error)]
pub enum RequestError {
    /// El cliente cerró la conexión sin enviar nada
    #[error("conexión cerrada por el cliente")]
    Closed,

    /// Request line, versión o headers con formato inválido
    #[error("request malformado: {0}")]
    Malformed(String),

    /// El bloque de headers supera el límite configurado
    #[error("headers demasiado grandes (límite: {limit} bytes)")]
    HeaderTooLarge { limit: usize },

    /// El cliente tardó demasiado en enviar el request completo
    #[error("tiempo de espera agotado leyendo el request")]
    Timeout,

    #[error("error de I/O: {0}")]
    Io(#[from] io::Error),
}

impl RequestError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        RequestError::Malformed(reason.into())
    }

    /// Código de estado con el que se responde al cliente.
    ///
    /// `None` cuando ya no tiene sentido escribir nada en el socket.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RequestError::Closed | RequestError::Io(_) => None,
            RequestError::Malformed(_) | RequestError::HeaderTooLarge { .. } => {
                Some(StatusCode::BadRequest)
            }
            RequestError::Timeout => Some(StatusCode::RequestTimeout),
        }
    }
}

/// Rechazos del resolvedor de paths, antes de tocar el filesystem
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// El path contiene un segmento `..`
    #[error("el path contiene un segmento '..'")]
    ParentSegment,

    /// Segmento con un byte nulo o separador no permitido
    #[error("segmento inválido en el path: {0:?}")]
    InvalidSegment(String),
}
