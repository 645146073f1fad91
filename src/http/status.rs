//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Códigos de estado que produce el servidor de archivos:
//!
//! - **2xx**: Éxito (200 OK)
//! - **3xx**: Redirección de directorios sin `/` final (301)
//! - **4xx**: Error del cliente (400, 403, 404, 405, 408)
//! - **5xx**: Error del servidor (500)

/// Representa los códigos de estado HTTP que soporta nuestro servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK - Archivo o listado servido
    Ok = 200,

    /// 301 Moved Permanently - Directorio pedido sin `/` final
    MovedPermanently = 301,

    /// 400 Bad Request - Request malformado o path con `..`
    BadRequest = 400,

    /// 403 Forbidden - Sin permisos o fuera del directorio raíz
    Forbidden = 403,

    /// 404 Not Found - El archivo no existe
    NotFound = 404,

    /// 405 Method Not Allowed - Solo se aceptan GET y HEAD
    MethodNotAllowed = 405,

    /// 408 Request Timeout - El cliente tardó demasiado en enviar el request
    RequestTimeout = 408,

    /// 500 Internal Server Error - Fallo de I/O inesperado
    InternalServerError = 500,
}

impl StatusCode {
    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use file_server::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Retorna el texto de razón (reason phrase) asociado al código
    ///
    /// # Ejemplo
    /// ```
    /// use file_server::http::StatusCode;
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }

    /// Verifica si el código indica error del servidor (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_values() {
        assert_eq!(StatusCode::Ok.as_u16(), 200);
        assert_eq!(StatusCode::MovedPermanently.as_u16(), 301);
        assert_eq!(StatusCode::Forbidden.as_u16(), 403);
        assert_eq!(StatusCode::MethodNotAllowed.as_u16(), 405);
        assert_eq!(StatusCode::RequestTimeout.as_u16(), 408);
    }

    #[test]
    fn test_classification() {
        assert!(StatusCode::InternalServerError.is_server_error());
        assert!(!StatusCode::RequestTimeout.is_server_error());
        assert!(!StatusCode::Ok.is_server_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(StatusCode::Ok.to_string(), "200 OK");
        assert_eq!(StatusCode::NotFound.to_string(), "404 Not Found");
        assert_eq!(StatusCode::MethodNotAllowed.to_string(), "405 Method Not Allowed");
    }
}
