//! End-to-end transport tests against the live page server.
//!
//! # Design
//! Starts the page server on a random port with temporary view and public
//! directories, then dispatches real requests through the default `ureq`
//! provider in both modes and checks which callback branch fires.

use std::net::SocketAddr;
use std::sync::mpsc;
use std::time::Duration;

use helper_core::{HttpMethod, Mode, Outcome, RequestDescriptor, Transport, TransportError, UreqProvider};
use page_server::Pages;
use tempfile::TempDir;

const LOGO: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0xff, 0xfe];

struct Server {
    addr: SocketAddr,
    _views: TempDir,
    _public: TempDir,
}

fn start_server() -> Server {
    let views = tempfile::tempdir().unwrap();
    let public = tempfile::tempdir().unwrap();
    std::fs::write(views.path().join("index.html"), "<h1>index</h1>").unwrap();
    std::fs::write(public.path().join("logo.png"), LOGO).unwrap();
    let pages = Pages {
        views_dir: views.path().to_path_buf(),
        public_dir: public.path().to_path_buf(),
    };

    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            page_server::run(listener, pages).await
        })
        .unwrap();
    });

    Server {
        addr,
        _views: views,
        _public: public,
    }
}

fn transport(server: &Server) -> Transport {
    Transport::builder()
        .provider(UreqProvider)
        .timeout(Some(Duration::from_secs(10)))
        .base_url(&format!("http://{}", server.addr))
        .build()
}

/// Descriptor whose callbacks report `(branch, status, body)` on a channel.
fn reporting(url: &str) -> (RequestDescriptor, mpsc::Receiver<(&'static str, u16, String)>) {
    let (tx, rx) = mpsc::channel();
    let err_tx = tx.clone();
    let descriptor = RequestDescriptor::new(url)
        .on_success(move |r| {
            let _ = tx.send(("success", r.status, r.body.clone()));
        })
        .on_error(move |r| {
            let _ = err_tx.send(("error", r.status, r.body.clone()));
        });
    (descriptor, rx)
}

#[test]
fn page_round_trip() {
    let server = start_server();
    let transport = transport(&server);

    // Step 1: template page, async, success branch.
    let (descriptor, rx) = reporting("/index");
    let pending = transport.dispatch(descriptor, Mode::Async).unwrap();
    let (branch, status, body) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!((branch, status, body.as_str()), ("success", 200, "<h1>index</h1>"));
    assert!(pending.wait().unwrap().is_success());

    // Step 2: missing page, sync, error branch.
    let (descriptor, rx) = reporting("/missing");
    let outcome = transport.dispatch(descriptor, Mode::Sync).unwrap().wait().unwrap();
    assert!(matches!(outcome, Outcome::Failure(ref r) if r.status == 404));
    assert_eq!(rx.try_recv().unwrap().0, "error");
    assert!(rx.try_recv().is_err(), "exactly one callback");

    // Step 3: no callbacks at all.
    let outcome = transport
        .dispatch(RequestDescriptor::new("/missing"), Mode::Sync)
        .unwrap()
        .wait()
        .unwrap();
    assert_eq!(outcome.response().status, 404);
}

#[test]
fn get_and_post_echo_names() {
    let server = start_server();
    let transport = transport(&server);

    let (descriptor, rx) = reporting("/name");
    transport
        .get(descriptor, [("firstname", "Jo Ann"), ("lastname", "O'Neil")], Mode::Sync)
        .unwrap();
    assert_eq!(rx.try_recv().unwrap(), ("success", 200, "Jo Ann O'Neil".to_string()));

    let (descriptor, rx) = reporting("/name");
    let pending = transport
        .post(descriptor, [("firstname", "Ada"), ("lastname", "Lovelace & co")], Mode::Async)
        .unwrap();
    pending.wait().unwrap();
    assert_eq!(rx.try_recv().unwrap(), ("success", 200, "Ada Lovelace & co".to_string()));

    let (descriptor, rx) = reporting("/name");
    transport.post(descriptor, [("firstname", "Ada")], Mode::Sync).unwrap();
    assert_eq!(rx.try_recv().unwrap().1, 400);
}

#[test]
fn binary_public_file_takes_success_branch() {
    let server = start_server();
    let transport = transport(&server);

    for mode in [Mode::Sync, Mode::Async] {
        let (descriptor, rx) = reporting("/logo.png");
        let outcome = transport.dispatch(descriptor, mode).unwrap().wait().unwrap();

        let (branch, status, body) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!((branch, status), ("success", 200), "{mode:?}");
        assert_eq!(body, String::from_utf8_lossy(LOGO), "{mode:?}");
        assert_eq!(outcome.response().header("content-type"), Some("image/png"));
    }
}

#[test]
fn time_and_head() {
    let server = start_server();
    let transport = transport(&server);

    let outcome = transport
        .dispatch(RequestDescriptor::new("/time"), Mode::Sync)
        .unwrap()
        .wait()
        .unwrap();
    assert!(outcome.is_success());
    assert!(!outcome.response().body.is_empty());

    let outcome = transport
        .dispatch(RequestDescriptor::new("/time").method(HttpMethod::Head), Mode::Sync)
        .unwrap()
        .wait()
        .unwrap();
    assert_eq!(outcome.response().status, 200);
    assert!(outcome.response().body.is_empty());
}

#[tokio::test]
async fn pending_awaits_inside_runtime() {
    let server = start_server();
    let outcome = transport(&server)
        .dispatch(RequestDescriptor::new("/index"), Mode::Async)
        .unwrap()
        .await
        .unwrap();
    assert_eq!(outcome.into_response().body, "<h1>index</h1>");
}

#[test]
fn silent_server_times_out_without_callbacks() {
    // Accepts connections but never answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });

    let transport = Transport::builder()
        .provider(UreqProvider)
        .timeout(Some(Duration::from_millis(300)))
        .build();
    let (descriptor, rx) = reporting(&format!("http://{addr}/slow"));
    let result = transport.dispatch(descriptor, Mode::Async).unwrap().wait();

    assert_eq!(result, Err(TransportError::Timeout));
    assert!(rx.try_recv().is_err());
}

#[test]
fn empty_provider_chain_is_unsupported() {
    let transport = Transport::builder().build();
    let err = transport
        .dispatch(RequestDescriptor::new("http://127.0.0.1:1/"), Mode::Async)
        .unwrap_err();
    assert_eq!(err, TransportError::Unsupported);
}
