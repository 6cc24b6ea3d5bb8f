//! Tourism Portal Backend - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    tourism_portal_backend::run().await;
}
