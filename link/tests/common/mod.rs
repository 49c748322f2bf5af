#![allow(dead_code)]

use actix_web::{web, App, HttpResponse, HttpServer};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Once};

static INIT_LOGGER: Once = Once::new();

/// Initialize `env_logger` once per test binary (honors `RUST_LOG`).
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// State behind the in-process key/value and asset server.
#[derive(Default)]
pub struct KvState {
    records: Mutex<HashMap<String, String>>,
    assets: Mutex<HashMap<String, Vec<u8>>>,
    next_id: AtomicU64,
    fail_writes: AtomicBool,
    blank_ids: AtomicBool,
    requests: Mutex<Vec<String>>,
}

impl KvState {
    pub fn record(&self, id: &str) -> Option<String> {
        self.records.lock().get(id).cloned()
    }

    pub fn insert_record(&self, id: &str, json: &str) {
        self.records.lock().insert(id.to_string(), json.to_string());
    }

    pub fn insert_asset(&self, name: &str, bytes: Vec<u8>) {
        self.assets.lock().insert(name.to_string(), bytes);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Accept writes but answer `200 OK` with an empty body.
    pub fn set_blank_ids(&self, blank: bool) {
        self.blank_ids.store(blank, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.starts_with("POST "))
            .count()
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

async fn write_record(state: web::Data<Arc<KvState>>, body: String) -> HttpResponse {
    state.requests.lock().push("POST /kv/".to_string());
    if state.fail_writes.load(Ordering::SeqCst) {
        return HttpResponse::ServiceUnavailable().body("kv is read-only");
    }
    if serde_json::from_str::<serde_json::Value>(&body).is_err() {
        return HttpResponse::BadRequest().body("body must be JSON");
    }
    if state.blank_ids.load(Ordering::SeqCst) {
        return HttpResponse::Ok().content_type("text/plain").body("  \n");
    }
    let id = format!("k{}", state.next_id.fetch_add(1, Ordering::SeqCst) + 1);
    state.records.lock().insert(id.clone(), body);
    HttpResponse::Ok().content_type("text/plain").body(id)
}

async fn read_record(state: web::Data<Arc<KvState>>, id: web::Path<String>) -> HttpResponse {
    state.requests.lock().push(format!("GET /kv/{}", id));
    match state.record(&id) {
        Some(json) => HttpResponse::Ok().content_type("application/json").body(json),
        None => HttpResponse::NotFound().body("no such record"),
    }
}

async fn read_asset(state: web::Data<Arc<KvState>>, name: web::Path<String>) -> HttpResponse {
    state.requests.lock().push(format!("GET /assets/{}", name));
    match state.assets.lock().get(name.as_str()) {
        Some(bytes) => HttpResponse::Ok()
            .content_type("application/octet-stream")
            .body(bytes.clone()),
        None => HttpResponse::NotFound().finish(),
    }
}

/// A running key/value server bound to an ephemeral port.
pub struct RunningKvServer {
    pub base_url: String,
    pub bind_addr: SocketAddr,
    pub state: Arc<KvState>,
    server_handle: actix_web::dev::ServerHandle,
    server_task: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl RunningKvServer {
    /// `POST` endpoint of the key/value worker.
    pub fn kv_url(&self) -> String {
        format!("{}/kv/", self.base_url)
    }

    /// Origin shard templates resolve against.
    pub fn asset_base_url(&self) -> String {
        format!("{}/", self.base_url)
    }

    pub async fn shutdown(self) {
        self.server_handle.stop(false).await;
        let _ = self.server_task.await;
    }
}

/// Start the key/value server on a random available port.
///
/// Caller must invoke `shutdown()` to stop the server.
pub async fn run_kv_server() -> std::io::Result<RunningKvServer> {
    init_logger();

    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    let bind_addr = listener.local_addr()?;
    let state = Arc::new(KvState::default());

    let state_for_app = state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state_for_app.clone()))
            .route("/kv/", web::post().to(write_record))
            .route("/kv/{id}", web::get().to(read_record))
            .route("/assets/{name}", web::get().to(read_asset))
    })
    .listen(listener)?
    .workers(1)
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    Ok(RunningKvServer {
        base_url: format!("http://{}", bind_addr),
        bind_addr,
        state,
        server_handle,
        server_task,
    })
}
