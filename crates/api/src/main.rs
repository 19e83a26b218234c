use std::sync::Arc;

use payline_infra::PayoutEngine;
use payline_methods::MethodRegistry;

#[tokio::main]
async fn main() {
    payline_observability::init();

    let engine = Arc::new(PayoutEngine::new(MethodRegistry::builtin()));

    if let Ok(count) = std::env::var("PAYLINE_DEMO_SEED") {
        let count: usize = count.parse().unwrap_or(50);
        if let Err(err) = payline_api::app::seed::seed_demo(&engine, count, 0xD47A) {
            tracing::warn!("demo seeding failed: {err:#}");
        } else {
            tracing::info!("seeded {count} demo recipients");
        }
    }

    let app = payline_api::app::build_app(engine);

    let bind = std::env::var("PAYLINE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
