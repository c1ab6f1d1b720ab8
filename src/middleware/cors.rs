use axum::{
    body::Body,
    extract::State,
    http::{
        header::{self, HeaderValue},
        Method, Request, Response, StatusCode,
    },
    middleware::Next,
};
use tracing::debug;

use crate::{app::AppState, app_config::AppConfig};

/// Origin to echo back, if any
///
/// A `*` entry reflects any origin outside production; otherwise the origin must be listed.
pub fn allowed_origin(config: &AppConfig, origin: Option<&str>) -> Option<String> {
    let origin = origin?;
    let has_wildcard = config.cors_allowed_origins.iter().any(|o| o == "*");

    if has_wildcard && !config.is_production() {
        debug!("CORS: Reflecting origin for non-production: {}", origin);
        Some(origin.to_string())
    } else if config.cors_allowed_origins.iter().any(|o| o == origin) {
        debug!("CORS: Origin allowed from whitelist: {}", origin);
        Some(origin.to_string())
    } else {
        debug!("CORS: Origin not in whitelist: {}", origin);
        None
    }
}

/// Dynamic CORS middleware for the wizard and payment portal front ends
pub async fn dynamic_cors_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response<Body>, StatusCode> {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let allowed = allowed_origin(&state.config, origin.as_deref())
        .and_then(|o| HeaderValue::from_str(&o).ok());

    // Preflight
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());

        if let Some(allowed) = allowed {
            let headers = response.headers_mut();
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(
                    "content-type, accept, origin, x-requested-with, x-paystack-signature",
                ),
            );
            headers.insert(
                header::ACCESS_CONTROL_MAX_AGE,
                HeaderValue::from_static("3600"),
            );
        }

        *response.status_mut() = StatusCode::OK;
        return Ok(response);
    }

    let mut response = next.run(req).await;

    if let Some(allowed) = allowed {
        response
            .headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
        response
            .headers_mut()
            .insert(header::VARY, HeaderValue::from_static("Origin"));
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::Environment;

    fn config(environment: Environment, origins: &[&str]) -> AppConfig {
        let mut config = AppConfig::in_memory();
        config.environment = environment;
        config.cors_allowed_origins = origins.iter().map(|o| o.to_string()).collect();
        config
    }

    #[test]
    fn test_wildcard_reflects_outside_production() {
        let dev = config(Environment::Development, &["*"]);
        assert_eq!(
            allowed_origin(&dev, Some("http://localhost:5173")).as_deref(),
            Some("http://localhost:5173")
        );

        let prod = config(Environment::Production, &["*"]);
        assert_eq!(allowed_origin(&prod, Some("http://evil.example")), None);
    }

    #[test]
    fn test_whitelist() {
        let prod = config(
            Environment::Production,
            &["https://apply.blactechafrica.com"],
        );
        assert!(allowed_origin(&prod, Some("https://apply.blactechafrica.com")).is_some());
        assert!(allowed_origin(&prod, Some("https://other.example")).is_none());
        assert!(allowed_origin(&prod, None).is_none());
    }
}
