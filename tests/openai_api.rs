//! HTTP-level tests for the OpenAI video client.

use serde_json::json;
use sora_shorts::PipelineError;
use sora_shorts::api::{CreateVideo, OpenAiVideos, VideoApi, VideoStatus};
use sora_shorts::config::{Config, Settings};
use sora_shorts::storyboard::ClipSeconds;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{any, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "sk-test";

fn config_for(server: &MockServer) -> Config {
    let settings = Settings {
        api_base: format!("{}/v1/", server.uri()),
        ..Settings::default()
    };
    Config::from_lookup(settings, |_| Some(KEY.to_string())).unwrap()
}

#[tokio::test]
async fn create_posts_prompt_with_string_seconds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/videos"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "sora-2",
            "prompt": "STYLE\nscene",
            "seconds": "12",
            "size": "1280x720",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "video_abc",
            "object": "video",
            "status": "queued",
            "progress": 0,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = OpenAiVideos::new(&config_for(&server)).unwrap();
    let job = api
        .create(&CreateVideo {
            model: "sora-2".to_string(),
            prompt: "STYLE\nscene".to_string(),
            seconds: ClipSeconds::Twelve,
            size: "1280x720".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(job.id, "video_abc");
    assert_eq!(job.status, VideoStatus::Queued);
}

#[tokio::test]
async fn retrieve_reads_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/videos/video_abc"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "video_abc",
            "status": "in_progress",
            "progress": 42,
        })))
        .mount(&server)
        .await;

    let api = OpenAiVideos::new(&config_for(&server)).unwrap();
    let job = api.retrieve("video_abc").await.unwrap();

    assert_eq!(job.status, VideoStatus::InProgress);
    assert_eq!(job.progress, Some(42));
}

#[tokio::test]
async fn download_streams_body_to_file() {
    let server = MockServer::start().await;
    let body: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
    Mock::given(method("GET"))
        .and(path("/v1/videos/video_abc/content"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("clip01.mp4");
    let api = OpenAiVideos::new(&config_for(&server)).unwrap();

    let written = api.download_content("video_abc", &dest).await.unwrap();

    assert_eq!(written, body.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), body);
}

#[tokio::test]
async fn empty_download_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/videos/video_abc/content"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("clip01.mp4");
    let api = OpenAiVideos::new(&config_for(&server)).unwrap();

    let err = api.download_content("video_abc", &dest).await.unwrap_err();

    assert!(matches!(err, PipelineError::EmptyDownload(_)), "{err:?}");
    assert!(!dest.exists());
}

/// Accept one connection, read the request head, then hand the socket to `respond`.
async fn serve_once<F, Fut>(respond: F) -> String
where
    F: FnOnce(TcpStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = sock.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }
        respond(sock).await;
    });
    format!("http://{}/v1", addr)
}

fn config_with_base(api_base: String, download_timeout_secs: u64) -> Config {
    let settings = Settings {
        api_base,
        download_timeout_secs,
        ..Settings::default()
    };
    Config::from_lookup(settings, |_| Some(KEY.to_string())).unwrap()
}

#[tokio::test]
async fn slow_steady_download_outlives_the_read_timeout() {
    let base = serve_once(|mut sock| async move {
        sock.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 400\r\nContent-Type: video/mp4\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        for part in 0..4u8 {
            tokio::time::sleep(Duration::from_millis(700)).await;
            sock.write_all(&[part; 100]).await.unwrap();
            sock.flush().await.unwrap();
        }
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("clip01.mp4");
    let api = OpenAiVideos::new(&config_with_base(base, 2)).unwrap();

    let written = api.download_content("video_abc", &dest).await.unwrap();

    assert_eq!(written, 400);
    let bytes = std::fs::read(&dest).unwrap();
    assert_eq!(bytes.len(), 400);
    assert_eq!(&bytes[300..], &[3u8; 100][..]);
}

#[tokio::test]
async fn stalled_download_times_out_and_leaves_no_file() {
    let base = serve_once(|mut sock| async move {
        sock.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 400\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        sock.write_all(&[7u8; 100]).await.unwrap();
        sock.flush().await.unwrap();
        tokio::time::sleep(Duration::from_secs(4)).await;
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("clip01.mp4");
    let api = OpenAiVideos::new(&config_with_base(base, 1)).unwrap();

    let err = api.download_content("video_abc", &dest).await.unwrap_err();

    assert!(matches!(err, PipelineError::Stalled { .. }), "{err:?}");
    assert!(!dest.exists());
}

#[tokio::test]
async fn truncated_download_is_rejected() {
    let base = serve_once(|mut sock| async move {
        sock.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        sock.write_all(&[1u8; 10]).await.unwrap();
        sock.shutdown().await.ok();
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("clip01.mp4");
    let api = OpenAiVideos::new(&config_with_base(base, 5)).unwrap();

    let result = api.download_content("video_abc", &dest).await;

    assert!(result.is_err(), "{result:?}");
    assert!(!dest.exists());
}

#[tokio::test]
async fn http_errors_carry_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/videos/video_abc/content"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string(r#"{"error":{"message":"not ready"}}"#),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("clip01.mp4");
    let api = OpenAiVideos::new(&config_for(&server)).unwrap();

    let err = api.download_content("video_abc", &dest).await.unwrap_err();

    match err {
        PipelineError::Api { status, body, .. } => {
            assert_eq!(status, 404);
            assert!(body.contains("not ready"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!dest.exists());
}

#[tokio::test]
async fn delete_succeeds_and_tolerates_missing_video() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/videos/video_abc"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "video_abc",
            "deleted": true,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/videos/video_gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let api = OpenAiVideos::new(&config_for(&server)).unwrap();
    api.delete("video_abc").await.unwrap();
    api.delete("video_gone").await.unwrap();
}

#[tokio::test]
async fn delete_server_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let api = OpenAiVideos::new(&config_for(&server)).unwrap();
    let err = api.delete("video_abc").await.unwrap_err();

    assert!(matches!(err, PipelineError::Api { status: 500, .. }));
}

#[tokio::test]
async fn missing_credential_makes_no_requests() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let settings = Settings {
        api_base: format!("{}/v1", server.uri()),
        ..Settings::default()
    };
    let err = Config::from_lookup(settings, |_| None).unwrap_err();

    assert!(matches!(err, PipelineError::MissingCredential("OPENAI_API_KEY")));
    server.verify().await;
}
