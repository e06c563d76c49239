#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use partyline::app::{Application, PartyRequest, PartyResponse, SharedApplication};
use partyline::connector::{PartylineApp, PartylineConnector};
use partyline::partyline::{Handler, Reply};
use serde_json::json;

/// Echoes which app saw the request and how the path was split.
pub fn echo(name: &'static str) -> SharedApplication {
    Arc::new(echo_fn(name))
}

/// Records every request it receives; answers 404 to everything, like an
/// application that knows nothing about partylines.
#[derive(Default)]
pub struct Recorder {
    pub seen: Mutex<Vec<PartyRequest>>,
    pub calls: AtomicUsize,
}

impl Recorder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.path_info.clone())
            .collect()
    }
}

impl Application for Recorder {
    fn call(&self, request: PartyRequest) -> anyhow::Result<PartyResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let path = request.path_info.clone();
        self.seen.lock().unwrap().push(request);
        Ok(PartyResponse::not_found(&path))
    }
}

/// A partyline-aware application answering `service` with its own name.
pub fn member(name: &'static str, service: &str) -> (Arc<PartylineConnector>, SharedApplication) {
    let connector = Arc::new(
        PartylineConnector::builder()
            .service(
                service,
                Handler::new(move |_| Ok(Reply::Answer(json!(name)))),
            )
            .build(),
    );
    let app = PartylineApp::with_shared(Arc::clone(&connector), echo_fn(name));
    (connector, Arc::new(app))
}

/// Unshared form of [`echo`], for wrapping in a `PartylineApp`.
pub fn echo_fn(
    name: &'static str,
) -> impl Fn(PartyRequest) -> anyhow::Result<PartyResponse> + Send + Sync {
    move |req: PartyRequest| {
        Ok(PartyResponse::ok_json(json!({
            "app": name,
            "script_name": req.script_name,
            "path_info": req.path_info,
        })))
    }
}
