//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Implementación del servidor TCP que maneja múltiples conexiones
//! simultáneas usando threads. Cada conexión se procesa en su propio thread;
//! lo único compartido es la configuración (solo lectura) y dos atómicos.
//!
//! ```no_run
//! use file_server::config::ServerConfig;
//! use file_server::server::Server;
//!
//! let config = ServerConfig::new(8080, "dist")?;
//! let server = Server::bind(config)?;
//! let handle = server.shutdown_handle();
//! // handle.shutdown() desde otro thread detiene run()
//! server.run()?;
//! # Ok::<(), file_server::error::ServerError>(())
//! ```

use super::connection;
use crate::config::ServerConfig;
use crate::error::ServerError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Servidor de archivos ligado a un puerto
pub struct Server {
    config: Arc<ServerConfig>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    tracker: Arc<ConnectionTracker>,
}

impl Server {
    /// Abre el socket de escucha. Falla con [`ServerError::Bind`] si el
    /// puerto está ocupado o requiere privilegios.
    pub fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let addr = config.address();
        let listener =
            TcpListener::bind(addr).map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config: Arc::new(config),
            listener,
            local_addr,
            shutdown: Arc::new(AtomicBool::new(false)),
            tracker: Arc::new(ConnectionTracker::new()),
        })
    }

    /// Dirección efectiva (con el puerto real si se pidió el 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            wake_addr: wake_address(self.local_addr),
        }
    }

    /// Acepta conexiones hasta que se pida el apagado; luego espera a las
    /// conexiones en curso como máximo `drain_timeout`.
    pub fn run(self) -> Result<(), ServerError> {
        println!(
            "Serving {} at port {}",
            self.config.root.display(),
            self.local_addr.port()
        );
        info!(addr = %self.local_addr, root = %self.config.root.display(), "servidor escuchando");

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            match stream {
                Ok(stream) => self.dispatch(stream),
                Err(e) => {
                    warn!(error = %e, "error al aceptar conexión");
                    // Evita girar en vacío si se agotaron los descriptores
                    thread::sleep(Duration::from_millis(10));
                }
            }
        }

        info!("apagando: no se aceptan más conexiones");
        self.drain();
        Ok(())
    }

    fn dispatch(&self, stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        debug!(peer = %peer, "nueva conexión");

        let config = Arc::clone(&self.config);
        let shutdown = Arc::clone(&self.shutdown);
        let guard = self.tracker.enter();

        let spawned = thread::Builder::new()
            .name("conn".to_string())
            .spawn(move || {
                let _guard = guard;
                if let Err(e) = connection::handle_connection(stream, &config, &shutdown) {
                    debug!(peer = %peer, error = %e, "conexión terminada con error");
                }
            });

        if let Err(e) = spawned {
            warn!(error = %e, "no se pudo crear el thread de la conexión");
        }
    }

    fn drain(&self) {
        let deadline = Instant::now() + self.config.drain_timeout;
        while self.tracker.count() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }

        let pending = self.tracker.count();
        if pending > 0 {
            warn!(pending, "se cierran conexiones todavía activas");
        }
    }
}

/// Permite detener [`Server::run`] desde otro thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    /// Marca el apagado y despierta el `accept()` bloqueado con una
    /// conexión propia. Llamarlo más de una vez no tiene efecto.
    pub fn shutdown(&self) {
        if self.flag.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = TcpStream::connect_timeout(&self.wake_addr, Duration::from_secs(1)) {
            warn!(error = %e, "no se pudo despertar el accept");
        }
    }
}

/// Con bind en todas las interfaces, la conexión de aviso va a loopback
fn wake_address(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}

/// Cuenta las conexiones activas para el apagado ordenado
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    active: AtomicU64,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra una conexión; se descuenta al soltar el guard
    pub fn enter(self: &Arc<Self>) -> ConnectionGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            tracker: Arc::clone(self),
        }
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }
}

/// Se descuenta también si el thread de la conexión entra en pánico
#[derive(Debug)]
pub struct ConnectionGuard {
    tracker: Arc<ConnectionTracker>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.tracker.active.fetch_sub(1, Ordering::SeqCst);
    }
}
