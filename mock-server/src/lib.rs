use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use percent_encoding::percent_decode_str;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub mod tree;

pub const AUTH_DEBUG_HEADER: &str = "x-firebase-auth-debug";

const RULES_PATH: [&str; 2] = [".settings", "rules"];

const DEFAULT_RULES: &str = r#"{
  "rules": {
    ".read": "auth != null",
    ".write": "auth != null"
  }
}"#;

/// Server settings. With a `secret`, every request must carry
/// `auth=<secret>`; without one, data is open and rules need any credential.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub secret: Option<String>,
}

impl MockConfig {
    /// Reads `MOCK_SECRET`.
    pub fn from_env() -> Self {
        Self {
            secret: std::env::var("MOCK_SECRET").ok().filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug)]
pub struct Db {
    pub data: Value,
    pub rules: String,
    next_push: u64,
}

impl Default for Db {
    fn default() -> Self {
        Self {
            data: Value::Null,
            rules: DEFAULT_RULES.to_string(),
            next_push: 0,
        }
    }
}

impl Db {
    /// Keys sort in creation order, like the real service's push ids.
    fn push_key(&mut self) -> String {
        self.next_push += 1;
        let suffix = Uuid::new_v4().simple().to_string();
        format!("-{:010}{}", self.next_push, &suffix[..9])
    }
}

pub type SharedDb = Arc<RwLock<Db>>;

#[derive(Clone)]
struct AppState {
    db: SharedDb,
    config: Arc<MockConfig>,
}

pub fn app() -> Router {
    app_with_config(MockConfig::default())
}

pub fn app_with_config(config: MockConfig) -> Router {
    app_with_db(config, Arc::new(RwLock::new(Db::default())))
}

/// Build the router over an existing store, so tests can inspect it.
pub fn app_with_db(config: MockConfig, db: SharedDb) -> Router {
    let state = AppState {
        db,
        config: Arc::new(config),
    };
    Router::new().fallback(handle).with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_config(listener, MockConfig::default()).await
}

pub async fn run_with_config(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_config(config)).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Decide whether `auth` may perform the request, with a human-readable
/// reason for the debug header.
fn authorize(config: &MockConfig, auth: Option<&str>, rules: bool) -> (bool, String) {
    match (&config.secret, auth) {
        (Some(secret), Some(token)) if token == secret => {
            (true, "Auth granted: credential matches the database secret".to_string())
        }
        (Some(_), Some(_)) => (false, "Auth denied: credential does not match".to_string()),
        (Some(_), None) => (false, "Auth denied: no credential supplied".to_string()),
        (None, Some(_)) => (true, "Auth granted: database is open".to_string()),
        (None, None) if rules => (false, "Auth denied: rules require a credential".to_string()),
        (None, None) => (true, "Auth granted: database is open".to_string()),
    }
}

async fn handle(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    let Some(path) = uri.path().strip_suffix(".json") else {
        return error(StatusCode::NOT_FOUND, "Not found: paths must end in .json");
    };
    let segments: Vec<String> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .collect();
    let is_rules = segments == RULES_PATH;

    let (allowed, reason) = authorize(
        &state.config,
        params.get("auth").map(String::as_str),
        is_rules,
    );
    let mut response = if !allowed {
        error(StatusCode::UNAUTHORIZED, "Permission denied")
    } else if is_rules {
        handle_rules(&state.db, &method, body).await
    } else {
        handle_data(&state.db, &method, &segments, &params, &body).await
    };

    if params.get("debug").is_some_and(|v| v == "true") {
        if let Ok(value) = HeaderValue::from_str(&reason) {
            response.headers_mut().insert(AUTH_DEBUG_HEADER, value);
        }
    }
    response
}

async fn handle_rules(db: &SharedDb, method: &Method, body: String) -> Response {
    match *method {
        Method::GET => {
            let rules = db.read().await.rules.clone();
            ([(header::CONTENT_TYPE, "application/json")], rules).into_response()
        }
        Method::PUT => {
            if body.trim().is_empty() {
                return error(StatusCode::BAD_REQUEST, "Rules document is empty");
            }
            db.write().await.rules = body;
            Json(json!({ "status": "ok" })).into_response()
        }
        _ => error(StatusCode::METHOD_NOT_ALLOWED, "Rules support GET and PUT only"),
    }
}

async fn handle_data(
    db: &SharedDb,
    method: &Method,
    segments: &[String],
    params: &HashMap<String, String>,
    body: &str,
) -> Response {
    let result = match *method {
        Method::GET => {
            let value = tree::get(&db.read().await.data, segments);
            if params.get("shallow").is_some_and(|v| v == "true") {
                Ok(tree::shallow(value))
            } else {
                Ok(value)
            }
        }
        Method::PUT => match parse_body(body) {
            Ok(value) => {
                tree::set(&mut db.write().await.data, segments, value.clone());
                Ok(value)
            }
            Err(response) => Err(response),
        },
        Method::PATCH => match parse_body(body) {
            Ok(Value::Object(children)) => {
                let mut db = db.write().await;
                for (key, child) in &children {
                    let mut path = segments.to_vec();
                    path.extend(key.split('/').filter(|s| !s.is_empty()).map(str::to_string));
                    tree::set(&mut db.data, &path, child.clone());
                }
                Ok(Value::Object(children))
            }
            Ok(_) => Err(error(
                StatusCode::BAD_REQUEST,
                "Invalid data; PATCH requires a JSON object",
            )),
            Err(response) => Err(response),
        },
        Method::POST => match parse_body(body) {
            Ok(value) => {
                let mut db = db.write().await;
                let key = db.push_key();
                let mut path = segments.to_vec();
                path.push(key.clone());
                tree::set(&mut db.data, &path, value);
                Ok(json!({ "name": key }))
            }
            Err(response) => Err(response),
        },
        Method::DELETE => {
            tree::set(&mut db.write().await.data, segments, Value::Null);
            Ok(Value::Null)
        }
        _ => Err(error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")),
    };

    match result {
        Ok(_) if params.get("print").is_some_and(|v| v == "silent") => {
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(value) => Json(value).into_response(),
        Err(response) => response,
    }
}

fn parse_body(body: &str) -> Result<Value, Response> {
    serde_json::from_str(body).map_err(|_| {
        error(
            StatusCode::BAD_REQUEST,
            "Invalid data; couldn't parse JSON object, array, or value.",
        )
    })
}
