use axum::Router;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use parqueo_server::clock::SystemClock;
use parqueo_server::config::Config;
use parqueo_server::qr::SvgTicketRenderer;
use parqueo_server::routes::create_routes;
use parqueo_server::AppState;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let state = AppState::new(config, Arc::new(SystemClock), Arc::new(SvgTicketRenderer));
    let app: Router = create_routes(state);

    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
