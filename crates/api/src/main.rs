use stockrec_api::config::ApiConfig;

#[tokio::main]
async fn main() {
    stockrec_observability::init();

    let config = ApiConfig::from_env().expect("invalid stockrec-api configuration");
    let bind_addr = config.bind_addr;

    let app = stockrec_api::app::build_app(config);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
