//! In-process HTTP servers standing in for the real providers.

#![allow(dead_code)]

use axum::Router;
use tokio::net::TcpListener;

/// PNG signature followed by a little payload.
pub const PNG_BYTES: [u8; 16] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H', b'D', b'R',
];

/// JPEG SOI marker followed by a little payload.
pub const JPEG_BYTES: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 16, b'J', b'F', b'I', b'F', 0, 1];

/// Binds a listener on a free local port and returns it with its base URL.
pub async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, format!("http://{addr}"))
}

/// Serves `router` on `listener` in the background.
pub fn serve(listener: TcpListener, router: Router) {
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
}

/// Binds, serves and returns the base URL.
pub async fn spawn(router: Router) -> String {
    let (listener, base) = bind().await;
    serve(listener, router);
    base
}

/// A URL nothing is listening on.
pub async fn dead_url() -> String {
    let (listener, base) = bind().await;
    drop(listener);
    base
}
