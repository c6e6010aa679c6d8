use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

/// Dashboard assets compiled into the binary
#[derive(RustEmbed)]
#[folder = "src/interface/web/static/"]
struct Assets;

fn serve_asset(path: &str) -> Response {
    match Assets::get(path) {
        Some(file) => {
            let mime = file.metadata.mimetype().to_string();
            ([(header::CONTENT_TYPE, mime)], file.data).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Handler for GET /
pub async fn index_handler() -> Response {
    serve_asset("index.html")
}

/// Handler for GET /static/{*file}
pub async fn static_handler(Path(file): Path<String>) -> Response {
    serve_asset(&file)
}
