use axum::Router;
use tokio::net::TcpListener;

/// Serves `app` on an ephemeral local port and returns its base url
pub(crate) async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Test server has no address");
    tokio::spawn(async move { axum::serve(listener, app).await });
    format!("http://{addr}")
}
