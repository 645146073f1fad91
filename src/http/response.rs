//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! ## Formato de una respuesta
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/plain; charset=utf-8\r\n
//! Content-Length: 3\r\n
//! \r\n
//! abc
//! ```
//!
//! El body puede estar en memoria o ser un archivo abierto: en ese caso se
//! copia directamente del archivo al socket sin cargarlo entero.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use file_server::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .with_header("Content-Type", "text/plain")
//!     .with_body("Hello");
//!
//! let mut wire = Vec::new();
//! response.write_to(&mut wire, false).unwrap();
//! assert!(wire.ends_with(b"\r\n\r\nHello"));
//! ```

use super::StatusCode;
use std::fs::File;
use std::io::{self, Read, Write};

/// Valor del header `Server`
pub const SERVER_NAME: &str = concat!("file_server/", env!("CARGO_PKG_VERSION"));

/// Cuerpo de la respuesta
#[derive(Debug)]
pub enum Body {
    Empty,
    Bytes(Vec<u8>),
    /// Archivo abierto con su tamaño al momento de abrirlo
    File { file: File, len: u64 },
}

/// Representa una respuesta HTTP completa
#[derive(Debug)]
pub struct Response {
    status: StatusCode,

    /// Headers en orden de inserción; un nombre aparece una sola vez
    headers: Vec<(String, String)>,

    body: Body,
}

impl Response {
    /// Crea una respuesta vacía (`Content-Length: 0`)
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: vec![
                ("Server".to_string(), SERVER_NAME.to_string()),
                ("Content-Length".to_string(), "0".to_string()),
            ],
            body: Body::Empty,
        }
    }

    /// Agrega un header; si ya existe (sin distinguir mayúsculas) se sobrescribe
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Versión mutable de [`Response::with_header`]
    pub fn add_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    /// Establece el cuerpo desde un string y ajusta `Content-Length`
    pub fn with_body(self, body: &str) -> Self {
        self.with_body_bytes(body.as_bytes().to_vec())
    }

    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.add_header("Content-Length", &body.len().to_string());
        self.body = Body::Bytes(body);
        self
    }

    /// Usa un archivo abierto como cuerpo
    pub fn with_file(mut self, file: File, len: u64) -> Self {
        self.add_header("Content-Length", &len.to_string());
        self.body = Body::File { file, len };
        self
    }

    /// Página HTML (200 OK)
    pub fn html(body: String) -> Self {
        Self::new(StatusCode::Ok)
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_body_bytes(body.into_bytes())
    }

    /// Respuesta de error con un cuerpo de texto corto
    ///
    /// El mensaje nunca debe incluir paths del servidor.
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = format!("{}\n{}\n", status, message);
        Self::new(status)
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(&body)
    }

    /// 405 con la lista de métodos permitidos
    pub fn method_not_allowed() -> Self {
        Self::error(StatusCode::MethodNotAllowed, "Only GET and HEAD are supported")
            .with_header("Allow", "GET, HEAD")
    }

    /// 301 hacia `location`
    pub fn redirect(location: &str) -> Self {
        Self::error(StatusCode::MovedPermanently, "Moved")
            .with_header("Location", location)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Obtiene un header (el nombre no distingue mayúsculas)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Status line y headers serializados, incluida la línea vacía final
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(256);

        result.extend_from_slice(format!("HTTP/1.1 {}\r\n", self.status).as_bytes());

        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        result.extend_from_slice(b"\r\n");
        result
    }

    /// Escribe la respuesta en `out`. Con `head_only` (HEAD) se omite el body.
    ///
    /// Si el archivo entrega menos bytes que los anunciados en
    /// `Content-Length` se retorna error: quien llama debe cerrar la
    /// conexión, porque el framing ya quedó roto.
    pub fn write_to<W: Write>(self, out: &mut W, head_only: bool) -> io::Result<()> {
        out.write_all(&self.head_bytes())?;

        if !head_only {
            match self.body {
                Body::Empty => {}
                Body::Bytes(bytes) => out.write_all(&bytes)?,
                Body::File { file, len } => {
                    let copied = io::copy(&mut file.take(len), out)?;
                    if copied != len {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            format!("archivo truncado: {} de {} bytes", copied, len),
                        ));
                    }
                }
            }
        }

        out.flush()
    }
}
