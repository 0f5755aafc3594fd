use crate::config::RelayConfig;
use crate::io_struct::ChatRequest;
use crate::relay_state::{RelayOutcome, RelayState};
use actix_web::http::StatusCode;
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, HttpResponseBuilder, HttpServer, options, post, web};
use serde_json::json;
use std::io::Write;

fn request_origin(req: &HttpRequest) -> &str {
    req.headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Every response carries the CORS headers; disallowed origins get the
/// literal "null" value rather than a reflected origin or a missing header.
fn cors_response(status: StatusCode, allow_origin: &str) -> HttpResponseBuilder {
    let mut builder = HttpResponseBuilder::new(status);
    builder
        .insert_header((header::VARY, "Origin"))
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin))
        .insert_header((header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"))
        .insert_header((header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"));
    builder
}

#[options("/")]
pub async fn preflight(req: HttpRequest, app_state: web::Data<RelayState>) -> HttpResponse {
    let allow_origin = app_state
        .config
        .allowed_origins
        .allow_origin_value(request_origin(&req));
    cors_response(StatusCode::NO_CONTENT, allow_origin).finish()
}

#[post("/")]
pub async fn chat(
    req: HttpRequest,
    body: web::Bytes,
    app_state: web::Data<RelayState>,
) -> HttpResponse {
    let allow_origin = app_state
        .config
        .allowed_origins
        .allow_origin_value(request_origin(&req));

    if app_state.config.api_key.is_none() {
        return cors_response(StatusCode::INTERNAL_SERVER_ERROR, allow_origin)
            .json(json!({"error": "Missing OPENAI_API_KEY"}));
    }

    // Absent or malformed bodies fall back to an empty conversation.
    let request: ChatRequest = serde_json::from_slice(&body).unwrap_or_default();

    match app_state.open_stream(request).await {
        Ok(RelayOutcome::Stream(deltas)) => cors_response(StatusCode::OK, allow_origin)
            .content_type("text/plain; charset=utf-8")
            .streaming(deltas),
        Ok(RelayOutcome::UpstreamError { detail }) => {
            log::warn!("upstream rejected completion request: {}", detail);
            cors_response(StatusCode::BAD_GATEWAY, allow_origin)
                .json(json!({"error": "Upstream error", "detail": detail}))
        }
        Err(e) => {
            log::error!("relay failed: {:#}", e);
            cors_response(StatusCode::INTERNAL_SERVER_ERROR, allow_origin)
                .json(json!({"error": "Server error"}))
        }
    }
}

pub async fn method_not_allowed(req: HttpRequest, app_state: web::Data<RelayState>) -> HttpResponse {
    let allow_origin = app_state
        .config
        .allowed_origins
        .allow_origin_value(request_origin(&req));
    cors_response(StatusCode::METHOD_NOT_ALLOWED, allow_origin)
        .json(json!({"error": "Method not allowed"}))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(chat)
        .service(preflight)
        .default_service(web::route().to(method_not_allowed));
}

pub async fn startup(config: RelayConfig, relay_state: RelayState) -> std::io::Result<()> {
    let app_state = web::Data::new(relay_state);

    // default level is info
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, log::LevelFilter::Info)
        .init();

    log::info!(
        "Starting relay at {}:{} (model {})",
        config.host,
        config.port,
        config.model
    );
    let max_payload_size = config.max_payload_size;

    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(app_state.clone())
            .app_data(web::PayloadConfig::default().limit(max_payload_size))
            .configure(configure)
    })
    .bind((config.host, config.port))?
    .run()
    .await?;

    std::io::Result::Ok(())
}
