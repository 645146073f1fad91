//! # Lectura y Parsing de Requests HTTP/1.1
//! src/http/request.rs
//!
//! ## Formato de un Request
//!
//! ```text
//! GET /docs/guia%20rapida.html?v=2 HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Connection: keep-alive\r\n
//! \r\n
//! ```
//!
//! La lectura ([`read_head`]) y el parsing ([`Request::parse`]) están
//! separados: el parsing es una función pura sobre los bytes del head y se
//! prueba sin sockets.

use crate::error::RequestError;
use std::collections::HashMap;
use std::io::{ErrorKind, Read};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Granularidad con la que una conexión ociosa revisa la señal de apagado
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Métodos HTTP
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Obtener un recurso
    GET,

    /// HEAD - Como GET pero solo retorna headers
    HEAD,

    /// Cualquier otro token válido (POST, PUT, ...). Se responde con 405.
    Other(String),
}

impl Method {
    /// Parsea un método HTTP. Los métodos distinguen mayúsculas.
    fn from_str(s: &str) -> Result<Self, RequestError> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            _ if is_token(s) => Ok(Method::Other(s.to_string())),
            _ => Err(RequestError::malformed("método inválido")),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::Other(m) => m,
        }
    }
}

/// Límites aplicados al leer un request de la conexión
#[derive(Debug, Clone, Copy)]
pub struct ReadLimits {
    /// Tiempo máximo sin recibir ningún byte
    pub read_timeout: Duration,
    /// Tiempo máximo para recibir el head completo
    pub request_timeout: Duration,
    pub max_header_bytes: usize,
}

/// Representa un request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Path tal como llegó, sin query (ej: "/docs/guia%20rapida.html")
    raw_path: String,

    /// Path decodificado (ej: "/docs/guia rapida.html")
    path: String,

    query: Option<String>,

    /// Headers con el nombre en minúsculas
    headers: HashMap<String, String>,

    /// "HTTP/1.0" o "HTTP/1.1"
    version: String,
}

impl Request {
    /// Parsea el head de un request (request line + headers)
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use file_server::http::Request;
    ///
    /// let raw = b"GET /sub/a%20b.txt?x=1 HTTP/1.1\r\nHost: localhost\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/sub/a b.txt");
    /// assert_eq!(request.query(), Some("x=1"));
    /// assert_eq!(request.header("host"), Some("localhost"));
    /// ```
    pub fn parse(head: &[u8]) -> Result<Self, RequestError> {
        let text = std::str::from_utf8(head)
            .map_err(|_| RequestError::malformed("el head no es UTF-8"))?;

        let mut lines = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));

        let request_line = lines
            .next()
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| RequestError::malformed("request vacío"))?;

        let (method, target, version) = Self::parse_request_line(request_line)?;
        let (raw_path, query) = split_target(target)?;
        let path = decode_path(&raw_path)?;
        let headers = Self::parse_headers(lines)?;

        Ok(Request {
            method,
            raw_path,
            path,
            query,
            headers,
            version,
        })
    }

    /// Formato: `GET /path?query HTTP/1.1`
    fn parse_request_line(line: &str) -> Result<(Method, &str, String), RequestError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.len() != 3 {
            return Err(RequestError::malformed("request line inválida"));
        }

        let method = Method::from_str(parts[0])?;

        let version = parts[2];
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(RequestError::malformed(format!(
                "versión HTTP no soportada: {}",
                version
            )));
        }

        Ok((method, parts[1], version.to_string()))
    }

    fn parse_headers<'a>(
        lines: impl Iterator<Item = &'a str>,
    ) -> Result<HashMap<String, String>, RequestError> {
        let mut headers = HashMap::new();

        for line in lines {
            if line.is_empty() {
                break;
            }

            // obs-fold (continuación con espacio inicial) ya no es válido
            if line.starts_with(' ') || line.starts_with('\t') {
                return Err(RequestError::malformed("header plegado"));
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| RequestError::malformed("header sin ':'"))?;

            if !is_token(name) {
                return Err(RequestError::malformed("nombre de header inválido"));
            }

            headers.insert(name.to_ascii_lowercase(), value.trim().to_string());
        }

        Ok(headers)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path decodificado, siempre comienza con `/`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path sin decodificar, apto para reenviarlo en un `Location`
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Obtiene un header (el nombre no distingue mayúsculas)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    /// HTTP/1.1 mantiene la conexión salvo `Connection: close`;
    /// HTTP/1.0 la cierra salvo `Connection: keep-alive`.
    pub fn wants_keep_alive(&self) -> bool {
        let has_token = |token: &str| {
            self.header("connection")
                .map(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
                .unwrap_or(false)
        };

        if has_token("close") {
            return false;
        }
        self.version == "HTTP/1.1" || has_token("keep-alive")
    }

    /// Bytes de body que siguen al head y que hay que descartar
    pub fn body_length(&self) -> Result<usize, RequestError> {
        if self.header("transfer-encoding").is_some() {
            return Err(RequestError::malformed("transfer-encoding no soportado"));
        }

        match self.header("content-length") {
            None => Ok(0),
            Some(v) => v
                .parse::<usize>()
                .map_err(|_| RequestError::malformed("content-length inválido")),
        }
    }
}

/// Lee de la conexión hasta tener un head completo en `buf`.
///
/// Retorna la longitud del head dentro de `buf`; los bytes siguientes
/// (body o requests en pipeline) quedan en el buffer.
pub fn read_head(
    stream: &mut TcpStream,
    buf: &mut Vec<u8>,
    limits: &ReadLimits,
    stop: &AtomicBool,
) -> Result<usize, RequestError> {
    let started = Instant::now();
    let mut last_progress = started;
    let mut chunk = [0u8; 4096];

    loop {
        // Líneas vacías antes de la request line se ignoran
        let blank = buf.iter().take_while(|b| **b == b'\r' || **b == b'\n').count();
        buf.drain(..blank);

        if let Some(end) = find_head_end(buf) {
            if end > limits.max_header_bytes {
                return Err(RequestError::HeaderTooLarge {
                    limit: limits.max_header_bytes,
                });
            }
            return Ok(end);
        }

        if buf.len() > limits.max_header_bytes {
            return Err(RequestError::HeaderTooLarge {
                limit: limits.max_header_bytes,
            });
        }

        if buf.is_empty() && stop.load(Ordering::SeqCst) {
            return Err(RequestError::Closed);
        }

        let now = Instant::now();
        let request_left = limits.request_timeout.saturating_sub(now - started);
        let read_left = limits.read_timeout.saturating_sub(now - last_progress);
        let wait = request_left.min(read_left);
        if wait.is_zero() {
            return Err(RequestError::Timeout);
        }

        stream.set_read_timeout(Some(wait.min(POLL_INTERVAL)))?;

        match stream.read(&mut chunk) {
            Ok(0) if buf.is_empty() => return Err(RequestError::Closed),
            Ok(0) => return Err(RequestError::malformed("conexión cerrada a mitad del request")),
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                last_progress = Instant::now();
            }
            Err(e) if is_retryable(&e) => continue,
            Err(e) => return Err(RequestError::Io(e)),
        }
    }
}

/// Consume `len` bytes de body, primero del buffer y luego del socket
pub fn discard_body(
    stream: &mut TcpStream,
    buf: &mut Vec<u8>,
    len: usize,
    limits: &ReadLimits,
) -> Result<(), RequestError> {
    let buffered = len.min(buf.len());
    buf.drain(..buffered);

    let mut remaining = len - buffered;
    if remaining == 0 {
        return Ok(());
    }

    let deadline = Instant::now() + limits.request_timeout;
    let mut chunk = [0u8; 4096];
    stream.set_read_timeout(Some(limits.read_timeout))?;

    while remaining > 0 {
        if Instant::now() >= deadline {
            return Err(RequestError::Timeout);
        }
        let want = remaining.min(chunk.len());
        match stream.read(&mut chunk[..want]) {
            Ok(0) => return Err(RequestError::malformed("body incompleto")),
            Ok(n) => remaining -= n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Err(RequestError::Timeout)
            }
            Err(e) => return Err(RequestError::Io(e)),
        }
    }

    Ok(())
}

fn is_retryable(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

/// Posición del primer byte después de la línea vacía (`\r\n\r\n` o `\n\n`)
fn find_head_end(buf: &[u8]) -> Option<usize> {
    for i in 0..buf.len() {
        if buf[i] != b'\n' {
            continue;
        }
        match &buf[i + 1..] {
            [b'\n', ..] => return Some(i + 2),
            [b'\r', b'\n', ..] => return Some(i + 3),
            _ => {}
        }
    }
    None
}

/// Separa el path de la query y acepta tanto `/path` como `http://host/path`
fn split_target(target: &str) -> Result<(String, Option<String>), RequestError> {
    let target = match target
        .strip_prefix("http://")
        .or_else(|| target.strip_prefix("https://"))
    {
        Some(rest) => rest.find('/').map(|i| &rest[i..]).unwrap_or("/"),
        None => target,
    };

    if !target.starts_with('/') {
        return Err(RequestError::malformed("el target debe comenzar con '/'"));
    }

    // `//host/x` en un `Location` sería relativo al protocolo: queda una sola `/`
    let target = &target[target.len() - target.trim_start_matches('/').len() - 1..];

    // El fragmento nunca debería llegar, pero si llega se ignora
    let target = target.split('#').next().unwrap_or(target);

    match target.split_once('?') {
        Some((path, query)) => Ok((path.to_string(), Some(query.to_string()))),
        None => Ok((target.to_string(), None)),
    }
}

/// Decodifica `%XX`. El resultado debe ser UTF-8 y no contener bytes nulos.
fn decode_path(raw: &str) -> Result<String, RequestError> {
    let decoded = urlencoding::decode(raw)
        .map_err(|_| RequestError::malformed("path con codificación inválida"))?;

    if decoded.contains('\0') {
        return Err(RequestError::malformed("byte nulo en el path"));
    }

    Ok(decoded.into_owned())
}

/// `token` de RFC 9110: caracteres visibles sin delimitadores
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}
