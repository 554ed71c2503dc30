use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::Server;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use serde_json::json;

use crate::service::{LookupError, LookupService};

// ============================================================================
// HTTP Read API
// ============================================================================
//
// GET /api/health           liveness, always ok
// GET /api/orders/          listing stub
// GET /api/orders/{uid}     cache-aside lookup
//
// ============================================================================

/// Register the API routes on an actix-web service config.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/orders")
                    .route("", web::get().to(list_orders))
                    .route("/", web::get().to(list_orders))
                    .route("/{order_uid}", web::get().to(get_order)),
            ),
    );
}

/// Build the read API server. Signal handling stays with the caller, which
/// stops the server through its handle.
pub fn api_server(
    lookup: Arc<LookupService>,
    port: u16,
    shutdown_timeout: Duration,
) -> std::io::Result<Server> {
    tracing::info!("Starting HTTP server on :{}", port);

    let lookup = web::Data::from(lookup);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(lookup.clone())
            .configure(configure)
    })
    .disable_signals()
    .shutdown_timeout(shutdown_timeout.as_secs())
    .bind(("0.0.0.0", port))?
    .run();

    Ok(server)
}

async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

async fn list_orders() -> impl Responder {
    HttpResponse::Ok().json(json!({ "message": "Not implemented yet" }))
}

async fn get_order(lookup: web::Data<LookupService>, path: web::Path<String>) -> HttpResponse {
    let order_uid = path.into_inner();
    if order_uid.trim().is_empty() {
        return error_response(HttpResponse::BadRequest(), "Order UID is required");
    }

    match lookup.get_order(&order_uid).await {
        Ok(order) => HttpResponse::Ok().json(order),
        Err(LookupError::NotFound(_)) => error_response(HttpResponse::NotFound(), "Order not found"),
    }
}

fn error_response(mut builder: actix_web::HttpResponseBuilder, message: &str) -> HttpResponse {
    builder.json(json!({ "error": message }))
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::OrderCache;
    use crate::domain::order::Order;
    use crate::metrics::Metrics;
    use crate::store::memory::{sample_order, MemoryOrderStore};
    use actix_web::http::StatusCode;
    use actix_web::test;

    fn lookup_with(cache: Arc<OrderCache>, store: Arc<MemoryOrderStore>) -> web::Data<LookupService> {
        web::Data::new(LookupService::new(cache, store, Arc::new(Metrics::new().unwrap())))
    }

    #[actix_web::test]
    async fn test_health() {
        let lookup = lookup_with(Arc::new(OrderCache::new()), Arc::new(MemoryOrderStore::new()));
        let app = test::init_service(App::new().app_data(lookup).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[actix_web::test]
    async fn test_get_cached_order() {
        let cache = Arc::new(OrderCache::new());
        cache.set("o-1", sample_order("o-1"));
        let lookup = lookup_with(cache, Arc::new(MemoryOrderStore::new()));
        let app = test::init_service(App::new().app_data(lookup).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/orders/o-1").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let order: Order = test::read_body_json(resp).await;
        assert_eq!(order, sample_order("o-1"));
    }

    #[actix_web::test]
    async fn test_get_falls_back_to_store() {
        let cache = Arc::new(OrderCache::new());
        let store = Arc::new(MemoryOrderStore::with_orders([sample_order("o-9")]));
        let lookup = lookup_with(cache.clone(), store);
        let app = test::init_service(App::new().app_data(lookup).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/orders/o-9").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(cache.get("o-9").is_some());
    }

    #[actix_web::test]
    async fn test_unknown_order_is_404() {
        let lookup = lookup_with(Arc::new(OrderCache::new()), Arc::new(MemoryOrderStore::new()));
        let app = test::init_service(App::new().app_data(lookup).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/orders/missing-id").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "Order not found" }));
    }

    #[actix_web::test]
    async fn test_blank_order_uid_is_400() {
        let lookup = lookup_with(Arc::new(OrderCache::new()), Arc::new(MemoryOrderStore::new()));
        let app = test::init_service(App::new().app_data(lookup).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/orders/%20").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_listing_is_a_stub() {
        let lookup = lookup_with(Arc::new(OrderCache::new()), Arc::new(MemoryOrderStore::new()));
        let app = test::init_service(App::new().app_data(lookup).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/orders/").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body, json!({ "message": "Not implemented yet" }));
    }
}
