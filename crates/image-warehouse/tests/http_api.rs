//! End-to-end tests driving the HTTP router against a temp warehouse.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use axum_test::TestServer;
use image::{Rgb, RgbImage};
use serde_json::Value;

use image_warehouse::{
    cache::ImageCache,
    metrics::ServerMetrics,
    resize::Resampler,
    warehouse::WarehouseDecoder,
    web::{AppState, router},
};

fn write_jpeg(dir: &Path, name: &str, w: u32, h: u32, color: [u8; 3]) {
    let img = RgbImage::from_pixel(w, h, Rgb(color));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .unwrap();
    std::fs::write(dir.join(name), bytes).unwrap();
}

fn server_over(dir: &Path) -> TestServer {
    let state = AppState::new(
        Arc::new(ImageCache::new(8).unwrap()),
        Arc::new(WarehouseDecoder::new(dir)),
        Arc::new(Resampler::new(2)),
        Arc::new(ServerMetrics::new()),
    );
    TestServer::new(router(state)).unwrap()
}

fn decoded_dimensions(body: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(body).unwrap();
    (img.width(), img.height())
}

#[tokio::test]
async fn serves_an_image_as_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    write_jpeg(dir.path(), "photo.jpg", 64, 48, [180, 40, 40]);
    let server = server_over(dir.path());

    let response = server.get("/photo.jpg").await;
    response.assert_status_ok();
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/jpeg"
    );
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "max-age=604800, public"
    );
    assert!(response.headers().contains_key("last-modified"));
    assert!(response.headers().contains_key("expires"));
    assert_eq!(decoded_dimensions(response.as_bytes()), (64, 48));
}

#[tokio::test]
async fn resizes_to_explicit_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    write_jpeg(dir.path(), "photo.jpg", 64, 48, [180, 40, 40]);
    let server = server_over(dir.path());

    let response = server.get("/photo.jpg?w=32&h=24").await;
    response.assert_status_ok();
    assert_eq!(decoded_dimensions(response.as_bytes()), (32, 24));
}

#[tokio::test]
async fn zero_height_preserves_aspect_ratio() {
    let dir = tempfile::tempdir().unwrap();
    write_jpeg(dir.path(), "photo.jpg", 100, 100, [10, 200, 10]);
    let server = server_over(dir.path());

    let response = server.get("/photo.jpg?w=50").await;
    response.assert_status_ok();
    assert_eq!(decoded_dimensions(response.as_bytes()), (50, 50));
}

#[tokio::test]
async fn missing_image_is_a_404_and_counted() {
    let dir = tempfile::tempdir().unwrap();
    let server = server_over(dir.path());

    let response = server.get("/nope.jpg").await;
    response.assert_status_not_found();

    let status: Value = server.get("/status").await.json();
    assert_eq!(status["failed_queries"], 1);
    assert_eq!(status["queries"], 0);
}

#[tokio::test]
async fn repeat_requests_hit_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    write_jpeg(dir.path(), "photo.jpg", 16, 16, [1, 2, 3]);
    let server = server_over(dir.path());

    server.get("/photo.jpg").await.assert_status_ok();
    server.get("/photo.jpg").await.assert_status_ok();

    let status: Value = server.get("/status").await.json();
    assert_eq!(status["queries"], 2);
    assert_eq!(status["cache"]["len"], 1);
    // First request misses, second hits.
    assert_eq!(status["cache"]["misses"], 1);
    assert_eq!(status["cache"]["hits"], 1);
}

#[tokio::test]
async fn corrupt_file_is_a_404() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("junk.jpg"), b"not an image at all").unwrap();
    let server = server_over(dir.path());

    server.get("/junk.jpg").await.assert_status_not_found();
}

#[tokio::test]
async fn health_endpoint_answers() {
    let dir = tempfile::tempdir().unwrap();
    let server = server_over(dir.path());

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn status_reports_uptime_and_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let server = server_over(dir.path());

    let status: Value = server.get("/status").await.json();
    assert_eq!(status["cache"]["capacity"], 8);
    assert!(status["uptime_seconds"].as_i64().unwrap() >= 0);
    assert!(status["started_at"].is_string());
}
