//! # Manejo de una Conexión
//! src/server/connection.rs
//!
//! Bucle keep-alive: leer request → responder → repetir mientras el cliente
//! y el servidor quieran mantener la conexión. Cualquier error de lectura o
//! parsing se convierte en una respuesta y cierra la conexión.

use crate::config::ServerConfig;
use crate::error::RequestError;
use crate::handler;
use crate::http::request::{self, ReadLimits, Request};
use crate::http::{Response, StatusCode};
use std::io::{self, Read};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Body más grande que se acepta descartar en un GET/HEAD/POST
const MAX_DISCARDED_BODY: usize = 64 * 1024;

const LINGER_TIMEOUT: Duration = Duration::from_millis(100);

impl From<&ServerConfig> for ReadLimits {
    fn from(config: &ServerConfig) -> Self {
        ReadLimits {
            read_timeout: config.read_timeout,
            request_timeout: config.request_timeout,
            max_header_bytes: config.max_header_bytes,
        }
    }
}

/// Atiende todos los requests de una conexión hasta cerrarla.
///
/// Los errores de un request nunca salen de aquí salvo los de I/O del
/// socket, que solo afectan a esta conexión.
pub fn handle_connection(
    mut stream: TcpStream,
    config: &ServerConfig,
    shutdown: &AtomicBool,
) -> io::Result<()> {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    stream.set_write_timeout(Some(config.read_timeout))?;
    stream.set_nodelay(true)?;

    let limits = ReadLimits::from(config);
    let mut buf: Vec<u8> = Vec::with_capacity(4096);
    let mut served = 0usize;

    loop {
        let head_len = match request::read_head(&mut stream, &mut buf, &limits, shutdown) {
            Ok(len) => len,
            Err(RequestError::Closed) => break,
            // Conexión keep-alive ociosa: se cierra sin responder
            Err(RequestError::Timeout) if served > 0 && buf.is_empty() => break,
            Err(e) => return reject(&mut stream, &peer, e),
        };

        let start = Instant::now();
        let head: Vec<u8> = buf.drain(..head_len).collect();

        let request = match Request::parse(&head) {
            Ok(request) => request,
            Err(e) => return reject(&mut stream, &peer, e),
        };

        let body_len = match request.body_length() {
            Ok(len) if len > MAX_DISCARDED_BODY => {
                return reject(&mut stream, &peer, RequestError::malformed("body demasiado grande"))
            }
            Ok(len) => len,
            Err(e) => return reject(&mut stream, &peer, e),
        };
        if let Err(e) = request::discard_body(&mut stream, &mut buf, body_len, &limits) {
            return reject(&mut stream, &peer, e);
        }

        let keep_alive = request.wants_keep_alive() && !shutdown.load(Ordering::SeqCst);

        let mut response = handler::handle(&request, config);
        response.add_header("Connection", if keep_alive { "keep-alive" } else { "close" });
        let status = response.status();

        if let Err(e) = response.write_to(&mut stream, request.is_head()) {
            // Los headers pueden haber salido ya: solo queda cerrar
            warn!(peer = %peer, path = %request.path(), error = %e, "respuesta interrumpida");
            return Err(e);
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        if status.is_server_error() {
            warn!(
                peer = %peer,
                method = %request.method().as_str(),
                path = %request.path(),
                status = status.as_u16(),
                elapsed_ms,
                "request fallido"
            );
        } else {
            info!(
                peer = %peer,
                method = %request.method().as_str(),
                path = %request.path(),
                status = status.as_u16(),
                elapsed_ms,
                "request atendido"
            );
        }

        served += 1;
        if !keep_alive {
            break;
        }
    }

    debug!(peer = %peer, served, "conexión cerrada");
    Ok(())
}

/// Responde con el error correspondiente (si aplica) y cierra la conexión
fn reject(stream: &mut TcpStream, peer: &str, err: RequestError) -> io::Result<()> {
    let status = match err.status() {
        Some(status) => status,
        None => {
            return match err {
                RequestError::Io(e) => Err(e),
                _ => Ok(()),
            }
        }
    };

    warn!(peer = %peer, error = %err, status = status.as_u16(), "request rechazado");

    let message = match status {
        StatusCode::RequestTimeout => "Timed out waiting for the request",
        _ => "Malformed request",
    };
    Response::error(status, message)
        .with_header("Connection", "close")
        .write_to(stream, false)?;

    // Que el cliente lea la respuesta antes de ver el cierre
    let _ = stream.shutdown(Shutdown::Write);
    linger(stream);
    Ok(())
}

/// Consume lo que el cliente siga enviando antes de cerrar. Cerrar con datos
/// sin leer provoca un RST que puede descartar la respuesta en el cliente.
fn linger(stream: &mut TcpStream) {
    if stream.set_read_timeout(Some(LINGER_TIMEOUT)).is_err() {
        return;
    }
    let mut sink = [0u8; 4096];
    let mut drained = 0usize;
    while drained < MAX_DISCARDED_BODY {
        match stream.read(&mut sink) {
            Ok(0) | Err(_) => break,
            Ok(n) => drained += n,
        }
    }
}
