mod common;

use axum::extract::{Json as JsonBody, Query};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use common::PNG_BYTES;
use imagegen::{
    Backend, BackendSelection, GeminiProvider, ImageConfig, ImageDispatcher, ImagePrompt,
    ImageResult, OpenAiImageProvider, PexelsProvider, PixabayProvider, PLACEHOLDER_IMAGE_PATH,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Captured<T> = Arc<Mutex<Vec<T>>>;

fn placeholder() -> ImageResult {
    ImageResult::Placeholder(PLACEHOLDER_IMAGE_PATH)
}

fn pexels(base: &str) -> Backend {
    Backend::Pexels(
        PexelsProvider::builder()
            .api_key("pexels-test-key")
            .base_url(base)
            .build()
            .unwrap(),
    )
}

fn pexels_router(response: Value, seen: Captured<(String, HashMap<String, String>)>) -> Router {
    Router::new().route(
        "/v1/search",
        get(
            move |headers: HeaderMap, Query(query): Query<HashMap<String, String>>| {
                let seen = seen.clone();
                let response = response.clone();
                async move {
                    let auth = headers
                        .get(header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    seen.lock().unwrap().push((auth, query));
                    Json(response)
                }
            },
        ),
    )
}

#[tokio::test]
async fn test_pexels_end_to_end_returns_remote_url() {
    let seen: Captured<(String, HashMap<String, String>)> = Arc::default();
    let router = pexels_router(
        json!({"photos": [{"src": {"large": "https://example.com/a.jpg"}}]}),
        seen.clone(),
    );
    let base = common::spawn(router).await;

    let dispatcher = ImageDispatcher::new("/nonexistent/output", pexels(&base));
    let result = dispatcher
        .generate(&ImagePrompt::new("sunset over mountains").with_theme("vaporwave, neon"))
        .await;

    assert_eq!(
        result,
        ImageResult::RemoteUrl("https://example.com/a.jpg".into())
    );

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (auth, query) = &seen[0];
    assert_eq!(auth, "pexels-test-key");
    // stock searches get the bare prompt
    assert_eq!(query["query"], "sunset over mountains");
    assert_eq!(query["per_page"], "1");
}

#[tokio::test]
async fn test_pexels_no_results_degrades_to_placeholder() {
    let router = pexels_router(json!({"photos": [], "total_results": 0}), Arc::default());
    let base = common::spawn(router).await;

    let dispatcher = ImageDispatcher::new("/nonexistent/output", pexels(&base));
    let result = dispatcher.generate(&ImagePrompt::new("qwzxv")).await;
    assert_eq!(result, placeholder());
}

#[tokio::test]
async fn test_pexels_empty_url_degrades_to_placeholder() {
    let router = pexels_router(json!({"photos": [{"src": {"large": ""}}]}), Arc::default());
    let base = common::spawn(router).await;

    let dispatcher = ImageDispatcher::new("/nonexistent/output", pexels(&base));
    let result = dispatcher.generate(&ImagePrompt::new("fox")).await;
    assert_eq!(result, placeholder());
}

#[tokio::test]
async fn test_pexels_http_error_degrades_to_placeholder() {
    let router = Router::new().route(
        "/v1/search",
        get(|| async { (StatusCode::UNAUTHORIZED, "{\"error\": \"bad key\"}") }),
    );
    let base = common::spawn(router).await;

    let dispatcher = ImageDispatcher::new("/nonexistent/output", pexels(&base));
    let result = dispatcher.generate(&ImagePrompt::new("fox")).await;
    assert_eq!(result, placeholder());
}

#[tokio::test]
async fn test_pixabay_takes_first_hit_without_theme() {
    let seen: Captured<HashMap<String, String>> = Arc::default();
    let captured = seen.clone();
    let router = Router::new().route(
        "/api/",
        get(move |Query(query): Query<HashMap<String, String>>| {
            let captured = captured.clone();
            async move {
                captured.lock().unwrap().push(query);
                Json(json!({
                    "total": 3,
                    "totalHits": 3,
                    "hits": [
                        {"largeImageURL": "https://pixabay.com/get/one.jpg"},
                        {"largeImageURL": "https://pixabay.com/get/two.jpg"},
                        {"largeImageURL": "https://pixabay.com/get/three.jpg"}
                    ]
                }))
            }
        }),
    );
    let base = common::spawn(router).await;

    let backend = Backend::Pixabay(
        PixabayProvider::builder()
            .api_key("pixabay-test-key")
            .base_url(&base)
            .build()
            .unwrap(),
    );
    let dispatcher = ImageDispatcher::new("/nonexistent/output", backend);
    let result = dispatcher
        .generate(&ImagePrompt::new("red fox").with_theme("minimal line art"))
        .await;

    assert_eq!(
        result,
        ImageResult::RemoteUrl("https://pixabay.com/get/one.jpg".into())
    );
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0]["q"], "red fox");
    assert_eq!(seen[0]["key"], "pixabay-test-key");
    assert_eq!(seen[0]["image_type"], "photo");
    assert_eq!(seen[0]["per_page"], "3");
}

fn gemini(base: &str) -> Backend {
    Backend::GeminiFlash(
        GeminiProvider::builder()
            .api_key("google-test-key")
            .base_url(base)
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn test_gemini_saves_inline_image_as_jpg() {
    let seen: Captured<(String, Value)> = Arc::default();
    let captured = seen.clone();
    let encoded = base64::engine::general_purpose::STANDARD.encode(PNG_BYTES);
    let router = Router::new().fallback(move |uri: Uri, JsonBody(body): JsonBody<Value>| {
        let captured = captured.clone();
        let encoded = encoded.clone();
        async move {
            captured.lock().unwrap().push((uri.path().to_string(), body));
            Json(json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [
                            {"text": "A fox in ink."},
                            {"inlineData": {"mimeType": "image/png", "data": encoded}}
                        ]
                    },
                    "finishReason": "STOP"
                }]
            }))
        }
    });
    let base = common::spawn(router).await;
    let dir = tempfile::tempdir().unwrap();

    let dispatcher = ImageDispatcher::new(dir.path(), gemini(&base));
    let result = dispatcher
        .generate(&ImagePrompt::new("fox").with_theme("ink wash"))
        .await;

    let (path, metadata) = match result {
        ImageResult::SavedFile { path, metadata } => (path, metadata),
        other => panic!("expected a saved file, got {other:?}"),
    };
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
    assert_eq!(std::fs::read(&path).unwrap(), PNG_BYTES.to_vec());
    assert_eq!(metadata.prompt, "fox");
    assert_eq!(metadata.theme_prompt.as_deref(), Some("ink wash"));

    let seen = seen.lock().unwrap();
    let (path, body) = &seen[0];
    assert_eq!(
        path,
        "/v1beta/models/gemini-2.5-flash-image-preview:generateContent"
    );
    // generative backends get the theme folded in
    assert_eq!(body["contents"][0]["parts"][0]["text"], "fox, ink wash");
}

#[tokio::test]
async fn test_gemini_without_image_part_degrades_to_placeholder() {
    let router = Router::new().fallback(|| async {
        Json(json!({
            "candidates": [{
                "content": {"parts": [{"text": "I cannot generate that image."}]},
                "finishReason": "STOP"
            }]
        }))
    });
    let base = common::spawn(router).await;
    let dir = tempfile::tempdir().unwrap();

    let dispatcher = ImageDispatcher::new(dir.path(), gemini(&base));
    let result = dispatcher.generate(&ImagePrompt::new("fox")).await;
    assert_eq!(result, placeholder());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_dalle3_downloads_and_saves() {
    let seen: Captured<Value> = Arc::default();
    let captured = seen.clone();
    let (listener, base) = common::bind().await;
    let image_url = format!("{base}/files/generated.png");

    let router = Router::new()
        .route(
            "/v1/images/generations",
            post(move |headers: HeaderMap, JsonBody(body): JsonBody<Value>| {
                let captured = captured.clone();
                let image_url = image_url.clone();
                async move {
                    assert_eq!(
                        headers
                            .get(header::AUTHORIZATION)
                            .and_then(|v| v.to_str().ok()),
                        Some("Bearer sk-test")
                    );
                    captured.lock().unwrap().push(body);
                    Json(json!({"created": 1, "data": [{"url": image_url}]}))
                }
            }),
        )
        .route(
            "/files/generated.png",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES.to_vec()) }),
        );
    common::serve(listener, router);
    let dir = tempfile::tempdir().unwrap();

    let backend = Backend::DallE3(
        OpenAiImageProvider::builder()
            .api_key("sk-test")
            .base_url(&base)
            .build()
            .unwrap(),
    );
    let dispatcher = ImageDispatcher::new(dir.path(), backend);
    let result = dispatcher
        .generate(&ImagePrompt::new("fox").with_theme("ink wash"))
        .await;

    let path = match result {
        ImageResult::SavedFile { path, .. } => path,
        other => panic!("expected a saved file, got {other:?}"),
    };
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
    assert_eq!(std::fs::read(&path).unwrap(), PNG_BYTES.to_vec());

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0]["model"], "dall-e-3");
    assert_eq!(seen[0]["prompt"], "fox, ink wash");
    assert_eq!(seen[0]["n"], 1);
    assert_eq!(seen[0]["size"], "1024x1024");
    assert_eq!(seen[0]["quality"], "standard");
}

#[tokio::test]
async fn test_dalle3_download_failure_degrades_to_placeholder() {
    let (listener, base) = common::bind().await;
    let missing = format!("{base}/files/missing.png");
    let router = Router::new().route(
        "/v1/images/generations",
        post(move || {
            let missing = missing.clone();
            async move { Json(json!({"data": [{"url": missing}]})) }
        }),
    );
    common::serve(listener, router);
    let dir = tempfile::tempdir().unwrap();

    let backend = Backend::DallE3(
        OpenAiImageProvider::builder()
            .api_key("sk-test")
            .base_url(&base)
            .build()
            .unwrap(),
    );
    let dispatcher = ImageDispatcher::new(dir.path(), backend);
    assert_eq!(
        dispatcher.generate(&ImagePrompt::new("fox")).await,
        placeholder()
    );
}

#[tokio::test]
async fn test_unwritable_output_dir_degrades_to_placeholder() {
    let router = Router::new().fallback(|| async {
        let encoded = base64::engine::general_purpose::STANDARD.encode(PNG_BYTES);
        Json(json!({
            "candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": encoded}}]}}]
        }))
    });
    let base = common::spawn(router).await;
    let dir = tempfile::tempdir().unwrap();
    let missing_dir = dir.path().join("does-not-exist");

    let dispatcher = ImageDispatcher::new(&missing_dir, gemini(&base));
    assert_eq!(
        dispatcher.generate(&ImagePrompt::new("fox")).await,
        placeholder()
    );
}

#[tokio::test]
async fn test_disabled_never_touches_network_or_disk() {
    let config = ImageConfig {
        disable_image_generation: true,
        image_provider: Some("pexels".into()),
        ..Default::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out");

    let dispatcher = ImageDispatcher::from_config(&output, &config).unwrap();
    assert_eq!(dispatcher.selection(), Some(BackendSelection::Disabled));

    let result = dispatcher
        .generate(&ImagePrompt::new("fox").with_theme("ink"))
        .await;
    assert_eq!(result, placeholder());
    assert!(!output.exists());

    let result = ImageDispatcher::disabled(&output)
        .generate(&ImagePrompt::new("fox"))
        .await;
    assert_eq!(result, placeholder());
}

#[tokio::test]
async fn test_unbound_returns_placeholder() {
    let dispatcher = ImageDispatcher::from_config("/nonexistent", &ImageConfig::default()).unwrap();
    assert_eq!(dispatcher.selection(), None);
    assert_eq!(
        dispatcher.generate(&ImagePrompt::new("fox")).await,
        placeholder()
    );
}

#[tokio::test]
async fn test_unreachable_stock_backend_degrades_to_placeholder() {
    let base = common::dead_url().await;
    let dispatcher = ImageDispatcher::new("/nonexistent/output", pexels(&base));
    assert_eq!(
        dispatcher.generate(&ImagePrompt::new("fox")).await,
        placeholder()
    );
}

#[tokio::test]
async fn test_pixabay_no_hits_degrades_to_placeholder() {
    let router = Router::new().route(
        "/api/",
        get(|| async { Json(json!({"total": 0, "totalHits": 0, "hits": []})) }),
    );
    let base = common::spawn(router).await;

    let backend = Backend::Pixabay(
        PixabayProvider::builder()
            .api_key("pixabay-test-key")
            .base_url(&base)
            .build()
            .unwrap(),
    );
    let dispatcher = ImageDispatcher::new("/nonexistent/output", backend);
    let result = dispatcher.generate(&ImagePrompt::new("qwzxv")).await;
    assert_eq!(result, placeholder());
}

#[tokio::test]
async fn test_pixabay_http_error_degrades_to_placeholder() {
    let router = Router::new().route(
        "/api/",
        get(|| async { (StatusCode::BAD_REQUEST, "[ERROR 400] Invalid or missing API key") }),
    );
    let base = common::spawn(router).await;

    let backend = Backend::Pixabay(
        PixabayProvider::builder()
            .api_key("wrong")
            .base_url(&base)
            .build()
            .unwrap(),
    );
    let dispatcher = ImageDispatcher::new("/nonexistent/output", backend);
    let result = dispatcher.generate(&ImagePrompt::new("fox")).await;
    assert_eq!(result, placeholder());
}

#[tokio::test]
async fn test_missing_api_key_degrades_to_placeholder_without_request() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().fallback(move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            StatusCode::OK
        }
    });
    let base = common::spawn(router).await;
    let dir = tempfile::tempdir().unwrap();

    let backends = vec![
        Backend::Pixabay(PixabayProvider::builder().base_url(&base).build().unwrap()),
        Backend::Pexels(PexelsProvider::builder().base_url(&base).build().unwrap()),
        Backend::GeminiFlash(GeminiProvider::builder().base_url(&base).build().unwrap()),
        Backend::DallE3(
            OpenAiImageProvider::builder()
                .base_url(&base)
                .build()
                .unwrap(),
        ),
    ];
    for backend in backends {
        let selection = backend.selection();
        let dispatcher = ImageDispatcher::new(dir.path(), backend);
        let result = dispatcher.generate(&ImagePrompt::new("fox")).await;
        assert_eq!(result, placeholder(), "{selection} without a key");
    }

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_keyless_config_binds_and_degrades_to_placeholder() {
    for name in ["pixabay", "pexels", "gemini_flash", "dall-e-3"] {
        let config = ImageConfig {
            image_provider: Some(name.into()),
            ..Default::default()
        };
        let dispatcher = ImageDispatcher::from_config("/nonexistent/output", &config).unwrap();
        assert!(dispatcher.backend().is_some());
        assert_eq!(
            dispatcher.generate(&ImagePrompt::new("fox")).await,
            placeholder()
        );
    }
}
