//! # File Server - Entry Point
//! src/main.rs
//!
//! Lee la configuración (`PORT`, `--root`), abre el puerto y atiende
//! conexiones hasta recibir SIGINT o SIGTERM.

use file_server::config::Config;
use file_server::server::{Server, ShutdownHandle};
use tracing::Level;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let config = match Config::new().into_server_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("💥 Error fatal: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("💥 Error fatal: {}", e);
            std::process::exit(1);
        }
    };

    signals::install(server.shutdown_handle());

    // Bloquea hasta que se pida el apagado
    if let Err(e) = server.run() {
        eprintln!("💥 Error fatal: {}", e);
        std::process::exit(1);
    }
}

#[cfg(unix)]
mod signals {
    use super::ShutdownHandle;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;
    use tracing::{info, warn};

    static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

    extern "C" fn on_signal(_sig: libc::c_int) {
        SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
    }

    /// El handler solo marca un atómico; un thread aparte hace el apagado
    pub fn install(handle: ShutdownHandle) {
        let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        unsafe {
            libc::signal(libc::SIGINT, handler);
            libc::signal(libc::SIGTERM, handler);
        }

        let watcher = thread::Builder::new()
            .name("signals".to_string())
            .spawn(move || {
                while !SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(100));
                }
                info!("señal recibida, apagando");
                handle.shutdown();
            });

        if let Err(e) = watcher {
            warn!(error = %e, "sin manejo de señales: no se pudo crear el thread");
        }
    }
}

#[cfg(not(unix))]
mod signals {
    use super::ShutdownHandle;

    pub fn install(_handle: ShutdownHandle) {}
}
