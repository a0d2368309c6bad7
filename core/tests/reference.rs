//! Dispatch behavior checked through a transport that records every request
//! and answers with a canned response.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::task::{Context, Wake, Waker};

use rtdb_core::{
    factory, BindOptions, Binder, Error, HttpMethod, HttpRequest, HttpResponse, Logger, Query,
    Transport, TransportError,
};
use serde_json::json;

struct Canned {
    response: HttpResponse,
    seen: Mutex<Vec<HttpRequest>>,
}

impl Canned {
    fn new(status: u16, headers: &[(&str, &str)], body: &str) -> Arc<Self> {
        Arc::new(Self {
            response: HttpResponse {
                status,
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: body.to_string(),
            },
            seen: Mutex::new(Vec::new()),
        })
    }

    fn ok() -> Arc<Self> {
        Self::new(200, &[], "null")
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl Transport for Canned {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        Ok(self.response.clone())
    }
}

struct Failing;

impl Transport for Failing {
    fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "timed out",
        )))
    }
}

struct NoopWake;

impl Wake for NoopWake {
    fn wake(self: Arc<Self>) {}
}

#[derive(Default)]
struct Recorder(Mutex<Vec<String>>);

impl Logger for Recorder {
    fn warn(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

fn binder(transport: Arc<Canned>) -> Binder {
    factory("demo").unwrap().with_transport(transport)
}

#[tokio::test]
async fn update_targets_directory_for_every_path_form() {
    for path in ["foo/bar", "foo/bar.json", "foo/bar/.json", "foo/bar/"] {
        let transport = Canned::ok();
        binder(transport.clone())
            .reference(path)
            .update(&json!({"x": 1}), None)
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1, "{path}");
        assert_eq!(requests[0].method, HttpMethod::Patch, "{path}");
        assert_eq!(
            requests[0].url, "https://demo.firebaseio.com/foo/bar/.json",
            "{path}"
        );
    }
}

#[tokio::test]
async fn leaf_operations_use_json_suffixed_url() {
    let transport = Canned::ok();
    let reference = binder(transport.clone()).reference("foo/bar");

    reference.get(None).await.unwrap();
    reference.set(&1, None).await.unwrap();
    reference.push(&2, None).await.unwrap();
    reference.remove(None).await.unwrap();

    let seen: Vec<(HttpMethod, String)> = transport
        .requests()
        .into_iter()
        .map(|r| (r.method, r.url))
        .collect();
    let url = "https://demo.firebaseio.com/foo/bar.json".to_string();
    assert_eq!(
        seen,
        vec![
            (HttpMethod::Get, url.clone()),
            (HttpMethod::Put, url.clone()),
            (HttpMethod::Post, url.clone()),
            (HttpMethod::Delete, url),
        ]
    );
}

#[tokio::test]
async fn server_error_is_rejected_with_context() {
    let transport = Canned::new(500, &[], r#"{"error":"server down"}"#);
    let err = binder(transport)
        .reference("foo/bar")
        .get(None)
        .await
        .unwrap_err();

    let Error::Response(err) = err else {
        panic!("expected response error, got {err:?}");
    };
    assert_eq!(err.status, 500);
    assert_eq!(err.method, HttpMethod::Get);
    assert_eq!(err.body, json!({"error": "server down"}));
    assert_eq!(err.auth_debug, None);
}

#[tokio::test]
async fn auth_debug_header_warns_once_on_success_and_failure() {
    for status in [200, 403] {
        let transport = Canned::new(status, &[("X-Firebase-Auth-Debug", "msg")], "{}");
        let recorder = Arc::new(Recorder::default());
        let reference =
            binder(transport).bind(BindOptions::new().path("a").logger(recorder.clone()));

        let result = reference.get(None).await;
        assert_eq!(result.is_ok(), status == 200);
        assert_eq!(*recorder.0.lock().unwrap(), vec!["msg".to_string()], "{status}");
    }
}

#[tokio::test]
async fn rules_without_auth_never_reaches_transport() {
    let transport = Canned::ok();
    let reference = binder(transport.clone()).reference("a");

    assert!(matches!(reference.rules(None).await, Err(Error::AuthMissing)));
    assert!(matches!(
        reference.rules(Some("{}")).await,
        Err(Error::AuthMissing)
    ));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn rules_use_fixed_path_and_return_raw_body() {
    let raw = "{ /* comment */ \"rules\": {} }";
    let transport = Canned::new(200, &[], raw);
    let reference = binder(transport.clone()).bind(BindOptions::new().path("x/y").auth("admin"));

    assert_eq!(reference.rules(None).await.unwrap(), raw);

    let requests = transport.requests();
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(
        requests[0].url,
        "https://demo.firebaseio.com/.settings/rules.json"
    );
    assert_eq!(requests[0].query_param("auth"), Some("admin"));
}

#[tokio::test]
async fn auth_token_overrides_caller_query() {
    let transport = Canned::ok();
    let reference = binder(transport.clone()).bind(BindOptions::new().path("a").auth("mine"));

    let query = Query::new().param("auth", "theirs").order_by_key().limit_to_last(3);
    reference.get(Some(&query)).await.unwrap();

    let request = &transport.requests()[0];
    assert_eq!(
        request.query,
        vec![
            ("orderBy".to_string(), "\"$key\"".to_string()),
            ("limitToLast".to_string(), "3".to_string()),
            ("auth".to_string(), "mine".to_string()),
        ]
    );
}

#[tokio::test]
async fn non_json_success_body_is_a_deserialization_error() {
    let transport = Canned::new(200, &[], "<html>");
    let err = binder(transport).reference("a").get(None).await.unwrap_err();
    assert!(matches!(err, Error::Deserialization(_)));
}

#[tokio::test]
async fn transport_failure_keeps_source_error() {
    let reference = factory("demo")
        .unwrap()
        .with_transport(Arc::new(Failing))
        .reference("a");

    let err = reference.get(None).await.unwrap_err();
    let Error::Transport(source) = err else {
        panic!("expected transport error, got {err:?}");
    };
    let io = source.downcast_ref::<std::io::Error>().unwrap();
    assert_eq!(io.kind(), std::io::ErrorKind::TimedOut);
}

#[test]
fn current_thread_runtime_drives_operations() {
    let transport = Canned::new(200, &[], "7");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    let value = runtime
        .block_on(binder(transport.clone()).reference("n").get(None))
        .unwrap();

    assert_eq!(value, json!(7));
    assert_eq!(transport.requests().len(), 1);
}

#[test]
#[should_panic(expected = "Tokio 1.x runtime")]
fn polling_outside_a_runtime_panics() {
    let reference = binder(Canned::ok()).reference("n");
    let mut future = std::pin::pin!(reference.get(None));
    let waker = Waker::from(Arc::new(NoopWake));
    let mut cx = Context::from_waker(&waker);
    let _ = future.as_mut().poll(&mut cx);
}

#[test]
fn identifier_root_renders_root_document() {
    for id in ["ab", "my-app", "X-1-y"] {
        let reference = factory(id).unwrap().bind(BindOptions::new());
        assert_eq!(
            reference.to_string(),
            format!("https://{id}.firebaseio.com/.json")
        );
    }
}

#[test]
fn segment_list_and_slashed_path_render_the_same() {
    let db = factory("demo").unwrap();
    assert_eq!(
        db.bind(BindOptions::new().paths(["a", "b"])).to_string(),
        db.bind(BindOptions::new().path("a/b")).to_string()
    );
}

#[test]
fn set_url_to_directory_form_is_stable() {
    let mut reference = factory("demo").unwrap().reference("foo/bar");
    let directory = reference.location().directory_url();
    reference.set_url(&directory).unwrap();
    assert_eq!(reference.location().directory_url(), directory);
    assert_eq!(reference.to_string(), directory);
}
