/*
 *  tests/api_integration.rs
 *
 *  Integration tests for the request pipeline: decode -> display swap,
 *  crash log endpoints, auth, and the wire front-end.
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 */

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use trixel::bitmap::MIN_BMP_LEN;
use trixel::context::AppContext;
use trixel::crashlog::CrashLogger;
use trixel::display::DisplayManager;
use trixel::display::drivers::MockDriver;
use trixel::fetch::build_client;
use trixel::netlink::{LinkError, NetworkLink};
use trixel::routes;
use trixel::server::{API_KEY_HEADER, ApiRequest, HttpService, Method, Router};
use trixel::supervisor::Supervisor;

static NEXT: AtomicUsize = AtomicUsize::new(0);

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "trixel-api-{}-{}",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

struct Harness {
    ctx: AppContext,
    router: Router,
    mock_state: std::sync::Arc<std::sync::Mutex<trixel::display::drivers::mock::MockState>>,
}

fn harness() -> Harness {
    let dir = temp_dir();
    let driver = MockDriver::new_with_size(8, 8);
    let mock_state = driver.state();
    let ctx = AppContext::new(
        DisplayManager::new(Box::new(driver)).unwrap(),
        build_client(Duration::from_secs(2)).unwrap(),
        CrashLogger::new(dir.join("crash.log"), dir.join("crash.count"), 16),
    );
    let mut router = Router::new();
    routes::register_all(&mut router);
    Harness {
        ctx,
        router,
        mock_state,
    }
}

fn request(method: Method, path: &str, body: Vec<u8>) -> ApiRequest {
    ApiRequest {
        method,
        path: path.to_string(),
        query: HashMap::new(),
        headers: HashMap::new(),
        body,
    }
}

/// A 2x2 BMP at 24 bpp: red/green top row, blue/white bottom row.
fn sample_bmp() -> Vec<u8> {
    let mut buf = vec![0u8; MIN_BMP_LEN];
    buf[0] = b'B';
    buf[1] = b'M';
    buf[10..14].copy_from_slice(&(MIN_BMP_LEN as u32).to_le_bytes());
    buf[14..18].copy_from_slice(&40u32.to_le_bytes());
    buf[18..22].copy_from_slice(&2u32.to_le_bytes());
    buf[22..26].copy_from_slice(&2u32.to_le_bytes());
    buf[26..28].copy_from_slice(&1u16.to_le_bytes());
    buf[28..30].copy_from_slice(&24u16.to_le_bytes());
    // File rows bottom-up, stored B,G,R, padded to 8 bytes per row.
    // Bottom row: blue, white.
    buf.extend_from_slice(&[0xFF, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0, 0]);
    // Top row: red, green.
    buf.extend_from_slice(&[0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0, 0]);
    buf
}

#[tokio::test]
async fn display_upload_decodes_and_swaps() {
    let mut h = harness();
    let (response, fault) = h
        .router
        .dispatch(&mut h.ctx, request(Method::Post, "/display", sample_bmp()), None)
        .await;

    assert_eq!(response.status, 200);
    assert!(fault.is_none());
    assert_eq!(h.ctx.display.resident_frames(), 1);

    let state = h.mock_state.lock().unwrap();
    let frame = state.last_frame.as_ref().unwrap();
    assert_eq!((frame.width, frame.height), (2, 2));
    assert_eq!(frame.pixels, vec![0xF800, 0x07E0, 0x001F, 0xFFFF]);
}

#[tokio::test]
async fn undersized_display_body_is_rejected() {
    let mut h = harness();
    let (response, fault) = h
        .router
        .dispatch(
            &mut h.ctx,
            request(Method::Post, "/display", vec![0u8; MIN_BMP_LEN - 1]),
            None,
        )
        .await;

    assert_eq!(response.status, 400);
    assert!(fault.is_none());
    assert!(!h.ctx.display.has_frame());
}

#[tokio::test]
async fn malformed_display_body_is_500_but_not_a_fault() {
    let mut h = harness();
    let mut body = sample_bmp();
    body[0] = b'X';
    let (response, fault) = h
        .router
        .dispatch(&mut h.ctx, request(Method::Post, "/display", body), None)
        .await;

    assert_eq!(response.status, 500);
    assert!(response.body.contains("Error loading bitmap"));
    assert!(fault.is_none());
}

#[tokio::test]
async fn display_hardware_failure_counts_as_fault() {
    let mut h = harness();
    h.mock_state.lock().unwrap().simulate_write_failure = true;

    let (response, fault) = h
        .router
        .dispatch(&mut h.ctx, request(Method::Post, "/display", sample_bmp()), None)
        .await;

    assert_eq!(response.status, 500);
    assert!(fault.is_some());
}

#[tokio::test]
async fn repeated_uploads_keep_one_frame_resident() {
    let mut h = harness();
    for _ in 0..4 {
        let (response, _) = h
            .router
            .dispatch(&mut h.ctx, request(Method::Post, "/display", sample_bmp()), None)
            .await;
        assert_eq!(response.status, 200);
    }
    assert_eq!(h.ctx.display.resident_frames(), 1);
    assert_eq!(h.ctx.display.peak_resident_frames(), 1);
}

#[tokio::test]
async fn clear_blanks_panel() {
    let mut h = harness();
    h.router
        .dispatch(&mut h.ctx, request(Method::Post, "/display", sample_bmp()), None)
        .await;

    let (response, fault) = h
        .router
        .dispatch(&mut h.ctx, request(Method::Get, "/clear", Vec::new()), None)
        .await;

    assert_eq!(response.status, 200);
    assert!(fault.is_none());
    assert!(!h.ctx.display.has_frame());
    assert_eq!(h.mock_state.lock().unwrap().blank_count, 1);
}

#[tokio::test]
async fn empty_fetch_body_is_rejected() {
    let mut h = harness();
    let (response, fault) = h
        .router
        .dispatch(
            &mut h.ctx,
            request(Method::Post, "/fetch", b"   \n".to_vec()),
            None,
        )
        .await;

    assert_eq!(response.status, 400);
    assert!(fault.is_none());
}

#[tokio::test]
async fn unreachable_fetch_url_counts_as_fault() {
    let mut h = harness();
    // Nothing listens here; connection refused is environment trouble.
    let (response, fault) = h
        .router
        .dispatch(
            &mut h.ctx,
            request(
                Method::Post,
                "/fetch",
                b"http://127.0.0.1:1/image.bmp".to_vec(),
            ),
            None,
        )
        .await;

    assert_eq!(response.status, 500);
    assert!(fault.is_some());
}

#[tokio::test]
async fn crash_log_tail_and_invalid_lines() {
    let mut h = harness();
    h.ctx
        .crashlog
        .log_event("alpha", trixel::crashlog::LogLevel::Info);
    h.ctx
        .crashlog
        .log_event("beta", trixel::crashlog::LogLevel::Info);

    let mut req = request(Method::Get, "/crash", Vec::new());
    req.query.insert("lines".to_string(), "2".to_string());
    let (response, _) = h.router.dispatch(&mut h.ctx, req, None).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, "text/plain");
    let lines: Vec<&str> = response.body.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("alpha"));
    assert!(lines[1].contains("beta"));

    let mut bad = request(Method::Get, "/crash", Vec::new());
    bad.query.insert("lines".to_string(), "abc".to_string());
    let (response, _) = h.router.dispatch(&mut h.ctx, bad, None).await;
    assert_eq!(response.status, 400);
}

#[tokio::test]
async fn crash_clear_resets_log_and_counter() {
    let mut h = harness();
    assert_eq!(h.ctx.crashlog.crash_count(), 1);

    let mut req = request(Method::Get, "/crash", Vec::new());
    req.query.insert("clear".to_string(), "true".to_string());
    let (response, _) = h.router.dispatch(&mut h.ctx, req, None).await;

    assert_eq!(response.status, 200);
    assert!(response.body.contains("[Log cleared and crash counter reset]"));
    assert_eq!(h.ctx.crashlog.crash_count(), 0);
}

#[tokio::test]
async fn crash_counter_reports_status() {
    let mut h = harness();
    let (response, _) = h
        .router
        .dispatch(
            &mut h.ctx,
            request(Method::Get, "/crash/counter", Vec::new()),
            None,
        )
        .await;

    assert_eq!(response.status, 200);
    assert!(response.body.contains("Crash count: 1"));
    assert!(response.body.contains("Uptime: "));
    assert!(response.body.contains("Available memory: "));
}

#[tokio::test]
async fn crash_reset_endpoint_zeroes_counter() {
    let mut h = harness();
    let (response, _) = h
        .router
        .dispatch(
            &mut h.ctx,
            request(Method::Post, "/crash/reset", Vec::new()),
            None,
        )
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(h.ctx.crashlog.crash_count(), 0);
}

#[tokio::test]
async fn api_key_guards_every_route() {
    let mut h = harness();
    let (response, _) = h
        .router
        .dispatch(
            &mut h.ctx,
            request(Method::Post, "/display", sample_bmp()),
            Some("secret"),
        )
        .await;
    assert_eq!(response.status, 401);
    assert!(!h.ctx.display.has_frame());

    let mut authed = request(Method::Post, "/display", sample_bmp());
    authed
        .headers
        .insert(API_KEY_HEADER.to_string(), "secret".to_string());
    let (response, _) = h.router.dispatch(&mut h.ctx, authed, Some("secret")).await;
    assert_eq!(response.status, 200);
    assert!(h.ctx.display.has_frame());
}

/// Full stack: axum front-end, supervisor loop, mock panel. Exercises
/// the same path a real client takes.
#[tokio::test]
async fn end_to_end_upload_over_http() {
    struct UpLink;
    impl NetworkLink for UpLink {
        fn ensure_up(&mut self) -> Result<(), LinkError> {
            Ok(())
        }
    }

    let dir = temp_dir();
    let driver = MockDriver::new_with_size(8, 8);
    let mock_state = driver.state();
    let mut ctx = AppContext::new(
        DisplayManager::new(Box::new(driver)).unwrap(),
        build_client(Duration::from_secs(2)).unwrap(),
        CrashLogger::new(dir.join("crash.log"), dir.join("crash.count"), 16),
    );

    let mut router = Router::new();
    routes::register_all(&mut router);
    let service = HttpService::start("127.0.0.1:0".parse().unwrap(), None, router)
        .await
        .unwrap();
    let addr = service.local_addr();

    let supervisor_task = tokio::spawn(async move {
        let mut service = service;
        let mut supervisor = Supervisor::new(3);
        let _ = supervisor.run(&mut service, &mut UpLink, &mut ctx).await;
    });

    let client = build_client(Duration::from_secs(2)).unwrap();
    let response = client
        .post(format!("http://{}/display", addr))
        .body(sample_bmp())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "Bitmap displayed successfully");
    assert_eq!(mock_state.lock().unwrap().write_count, 1);

    let response = client
        .get(format!("http://{}/crash/counter", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert!(response.text().await.unwrap().contains("Crash count: 1"));

    let response = client
        .get(format!("http://{}/missing", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    supervisor_task.abort();
}
