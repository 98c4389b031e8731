use chat::{RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET};
use config::{AnyOrUrlArray, CorsConfig};
use http::{
    HeaderName, HeaderValue, Method,
    header::{CONTENT_TYPE, RETRY_AFTER},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Response headers browsers may read from cross-origin chat responses.
fn exposed_headers() -> [HeaderName; 4] {
    [RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET, RETRY_AFTER]
}

/// CORS for when nothing is configured: any origin, but still exposing the rate limit headers.
pub(super) fn permissive() -> CorsLayer {
    CorsLayer::permissive().expose_headers(exposed_headers())
}

pub(super) fn generate(
    CorsConfig {
        allow_credentials,
        allow_origins,
        max_age,
    }: &CorsConfig,
    api_key_header: &str,
) -> CorsLayer {
    let mut allow_headers = vec![CONTENT_TYPE];

    match HeaderName::from_bytes(api_key_header.as_bytes()) {
        Ok(name) => allow_headers.push(name),
        Err(e) => log::warn!("API key header '{api_key_header}' is not a valid header name: {e}"),
    }

    let mut cors_layer = CorsLayer::new()
        .allow_credentials(*allow_credentials)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(allow_headers)
        .expose_headers(exposed_headers());

    if let Some(allow_origins) = allow_origins {
        cors_layer = cors_layer.allow_origin(match allow_origins {
            AnyOrUrlArray::Any => AllowOrigin::any(),
            AnyOrUrlArray::Explicit(origins) => {
                let mut constants = Vec::new();
                let mut globs = Vec::new();

                for origin in origins {
                    let origin = &origin[..url::Position::BeforePath];

                    if origin.chars().any(|c| "?*[]{}!\\".contains(c)) {
                        globs.push(origin.to_owned());
                    } else {
                        match HeaderValue::from_str(origin) {
                            Ok(value) => constants.push(value),
                            Err(e) => log::warn!("Ignoring CORS origin '{origin}': {e}"),
                        }
                    }
                }

                if globs.is_empty() {
                    AllowOrigin::list(constants)
                } else {
                    AllowOrigin::predicate(move |origin, _| {
                        constants.iter().any(|constant| origin == constant)
                            || globs.iter().any(|glob| fast_glob::glob_match(glob, origin.as_bytes()))
                    })
                }
            }
        });
    }

    if let Some(max_age) = max_age {
        cors_layer = cors_layer.max_age(*max_age);
    }

    cors_layer
}
