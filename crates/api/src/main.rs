use std::sync::Arc;

use fieldstock_infra::{InMemoryLedgerStore, LedgerStore, PostgresLedgerStore};

#[tokio::main]
async fn main() {
    fieldstock_observability::init_from_env();

    let store: Arc<dyn LedgerStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = PostgresLedgerStore::connect(&url)
                .await
                .expect("failed to connect to DATABASE_URL");
            tracing::info!("using postgres ledger store");
            Arc::new(store)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using in-memory ledger store");
            Arc::new(InMemoryLedgerStore::new())
        }
    };

    let app = fieldstock_api::app::build_app(store);

    let addr = std::env::var("FIELDSTOCK_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
