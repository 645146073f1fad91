//! # Despacho de Requests
//! src/handler.rs
//!
//! ```text
//! Request → método → resolver → archivo | índice | listado | error → Response
//! ```
//!
//! No escribe en el socket: solo construye la [`Response`]. Los archivos se
//! abren aquí y el handle viaja dentro de la respuesta, así que se cierra al
//! soltarla por cualquier camino.

use crate::config::ServerConfig;
use crate::files::{listing, mime, resolver, ResolvedTarget, TargetKind};
use crate::http::{Method, Request, Response, StatusCode};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{error, warn};

/// Construye la respuesta para un request ya parseado
pub fn handle(request: &Request, config: &ServerConfig) -> Response {
    if let Method::Other(_) = request.method() {
        return Response::method_not_allowed();
    }

    let target = match resolver::resolve(&config.root, request.path()) {
        Ok(target) => target,
        Err(e) => {
            warn!(path = %request.path(), error = %e, "path rechazado");
            return Response::error(StatusCode::BadRequest, "Invalid path");
        }
    };

    match target.kind {
        TargetKind::NotFound => not_found(),
        TargetKind::Forbidden => forbidden(),
        // `a.txt/` no es un directorio
        TargetKind::File if request.path().ends_with('/') => not_found(),
        TargetKind::File => serve_file(&target.absolute_path),
        TargetKind::Directory => serve_directory(request, config, &target),
    }
}

fn serve_directory(request: &Request, config: &ServerConfig, target: &ResolvedTarget) -> Response {
    // Sin `/` final los enlaces relativos del listado apuntarían al padre
    if !request.path().ends_with('/') {
        let location = match request.query() {
            Some(query) => format!("{}/?{}", request.raw_path(), query),
            None => format!("{}/", request.raw_path()),
        };
        return Response::redirect(&location);
    }

    if let Some(index) = resolver::find_index(&config.root, &target.absolute_path) {
        return serve_file(&index);
    }

    match listing::read_entries(&target.absolute_path) {
        Ok(entries) => Response::html(listing::render(request.path(), &entries)),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => forbidden(),
        Err(e) => {
            error!(error = %e, "no se pudo listar el directorio");
            internal_error()
        }
    }
}

fn serve_file(path: &Path) -> Response {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => return forbidden(),
        Err(e) => {
            // Existía al resolverlo: alguien lo movió o borró entre medio
            error!(error = %e, "no se pudo abrir el archivo");
            return internal_error();
        }
    };

    let len = match file.metadata() {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => return internal_error(),
        Err(e) => {
            error!(error = %e, "no se pudo leer la metadata del archivo");
            return internal_error();
        }
    };

    Response::new(StatusCode::Ok)
        .with_header("Content-Type", mime::content_type(path))
        .with_file(file, len)
}

fn not_found() -> Response {
    Response::error(StatusCode::NotFound, "File not found")
}

fn forbidden() -> Response {
    Response::error(StatusCode::Forbidden, "Access denied")
}

fn internal_error() -> Response {
    Response::error(StatusCode::InternalServerError, "Internal error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn fixture(name: &str) -> (PathBuf, ServerConfig) {
        let dir = std::env::temp_dir().join(format!(
            "file_server_handler_{}_{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("sub/deep")).unwrap();
        fs::write(dir.join("index.html"), b"<h1>hi</h1>").unwrap();
        fs::write(dir.join("sub/a.txt"), b"abc").unwrap();
        let config = ServerConfig::new(0, &dir).unwrap();
        (dir, config)
    }

    fn get(path: &str, config: &ServerConfig) -> Response {
        let raw = format!("GET {} HTTP/1.1\r\n\r\n", path);
        handle(&Request::parse(raw.as_bytes()).unwrap(), config)
    }

    fn body_of(response: Response) -> Vec<u8> {
        let mut out = Vec::new();
        response.write_to(&mut out, false).unwrap();
        let split = out.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
        out[split + 4..].to_vec()
    }

    #[test]
    fn test_root_serves_index() {
        let (_dir, config) = fixture("index");
        let response = get("/", &config);
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.header("Content-Type"), Some("text/html; charset=utf-8"));
        assert_eq!(body_of(response), b"<h1>hi</h1>");
    }

    #[test]
    fn test_file() {
        let (_dir, config) = fixture("file");
        let response = get("/sub/a.txt", &config);
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.header("Content-Length"), Some("3"));
        assert_eq!(body_of(response), b"abc");
    }

    #[test]
    fn test_listing_without_index() {
        let (_dir, config) = fixture("listing");
        let response = get("/sub/", &config);
        assert_eq!(response.status(), StatusCode::Ok);
        let html = String::from_utf8(body_of(response)).unwrap();
        assert!(html.contains("Directory listing for /sub/"));
        assert!(html.contains("href=\"a.txt\""));
        assert!(html.contains("href=\"deep/\""));
    }

    #[test]
    fn test_directory_without_slash_redirects() {
        let (_dir, config) = fixture("redirect");
        let response = get("/sub", &config);
        assert_eq!(response.status(), StatusCode::MovedPermanently);
        assert_eq!(response.header("Location"), Some("/sub/"));

        let response = get("/sub?x=1", &config);
        assert_eq!(response.header("Location"), Some("/sub/?x=1"));
    }

    #[test]
    fn test_redirect_never_leaves_host() {
        let (dir, config) = fixture("double_slash");
        fs::create_dir_all(dir.join("evil.example")).unwrap();

        let response = get("//sub", &config);
        assert_eq!(response.status(), StatusCode::MovedPermanently);
        assert_eq!(response.header("Location"), Some("/sub/"));

        let response = get("//evil.example", &config);
        assert_eq!(response.header("Location"), Some("/evil.example/"));
    }

    #[test]
    fn test_file_with_trailing_slash_not_found() {
        let (_dir, config) = fixture("trailing");
        assert_eq!(get("/sub/a.txt/", &config).status(), StatusCode::NotFound);
        assert_eq!(get("/index.html/", &config).status(), StatusCode::NotFound);
        assert_eq!(get("/sub/a.txt", &config).status(), StatusCode::Ok);
    }

    #[test]
    fn test_vanished_file_is_internal_error() {
        let (dir, _config) = fixture("vanished");
        let path = dir.join("sub/a.txt");
        fs::remove_file(&path).unwrap();

        let response = serve_file(&path);
        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert_eq!(response.header("Content-Type"), Some("text/plain; charset=utf-8"));
    }

    #[test]
    fn test_errors() {
        let (_dir, config) = fixture("errors");
        assert_eq!(get("/missing", &config).status(), StatusCode::NotFound);
        assert_eq!(get("/sub/a.txt/x", &config).status(), StatusCode::NotFound);
        assert_eq!(get("/sub/../../etc/passwd", &config).status(), StatusCode::BadRequest);
        assert_eq!(get("/%2e%2e/etc/passwd", &config).status(), StatusCode::BadRequest);

        let post = Request::parse(b"POST / HTTP/1.1\r\n\r\n").unwrap();
        let response = handle(&post, &config);
        assert_eq!(response.status(), StatusCode::MethodNotAllowed);
        assert_eq!(response.header("Allow"), Some("GET, HEAD"));
    }

    #[test]
    fn test_error_bodies_hide_paths() {
        let (dir, config) = fixture("hide");
        let body = body_of(get("/missing", &config));
        let text = String::from_utf8(body).unwrap();
        assert!(!text.contains(dir.to_str().unwrap()));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_outside_root_is_forbidden() {
        let (dir, config) = fixture("symlink");
        let outside = dir.with_extension("outside");
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("secret.txt"), b"secret").unwrap();
        let _ = std::os::unix::fs::symlink(&outside, dir.join("escape"));
        let _ = std::os::unix::fs::symlink(dir.join("sub/a.txt"), dir.join("alias.txt"));

        assert_eq!(get("/escape/secret.txt", &config).status(), StatusCode::Forbidden);
        assert_eq!(get("/escape/", &config).status(), StatusCode::Forbidden);

        let response = get("/alias.txt", &config);
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(body_of(response), b"abc");
    }

    #[cfg(unix)]
    #[test]
    fn test_fifo_is_forbidden() {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let (dir, config) = fixture("fifo");
        let fifo = CString::new(dir.join("pipe").as_os_str().as_bytes()).unwrap();
        assert_eq!(unsafe { libc::mkfifo(fifo.as_ptr(), 0o644) }, 0);

        // Abrir un FIFO sin escritor bloquearía: nunca debe llegar a abrirse
        assert_eq!(get("/pipe", &config).status(), StatusCode::Forbidden);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_entries_are_forbidden() {
        use std::os::unix::fs::PermissionsExt;

        // root ignora los permisos
        if unsafe { libc::geteuid() } == 0 {
            return;
        }

        let (dir, config) = fixture("unreadable");
        let secret = dir.join("sub/secret.txt");
        let locked = dir.join("locked");
        fs::write(&secret, b"secret").unwrap();
        fs::create_dir_all(&locked).unwrap();
        fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let file_status = get("/sub/secret.txt", &config).status();
        let dir_status = get("/locked/", &config).status();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        fs::remove_dir_all(&dir).ok();

        assert_eq!(file_status, StatusCode::Forbidden);
        assert_eq!(dir_status, StatusCode::Forbidden);
    }
}
