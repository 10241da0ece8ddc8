use axum::http::{HeaderValue, Method, header};
use core_config::cors::CorsConfig;
use std::{io, time::Duration};
use tower_http::cors::CorsLayer;

/// Builds the CORS layer for the configured origins.
///
/// Returns `Ok(None)` when no origin is configured, in which case no CORS
/// headers are emitted. An origin that is not a valid header value is an error.
pub fn create_cors_layer(config: &CorsConfig) -> io::Result<Option<CorsLayer>> {
    if !config.is_enabled() {
        return Ok(None);
    }

    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Invalid CORS origin {:?}: {}", origin, e),
                )
            })
        })
        .collect::<io::Result<Vec<_>>>()?;

    let layer = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    Ok(Some(layer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_without_origins() {
        let layer = create_cors_layer(&CorsConfig::default()).unwrap();
        assert!(layer.is_none());
    }

    #[test]
    fn test_enabled_with_origin() {
        let config = CorsConfig::new(["http://localhost:3000"]);
        assert!(create_cors_layer(&config).unwrap().is_some());
    }

    #[test]
    fn test_invalid_origin_is_rejected() {
        let config = CorsConfig::new(["bad\norigin"]);
        assert!(create_cors_layer(&config).is_err());
    }
}
