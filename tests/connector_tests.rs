//! Tests for the application side of the invitation handshake

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use http::Method;
use partyline::app::{Application, PartyRequest};
use partyline::config::PartyConfig;
use partyline::connector::{JoinGate, JoinOutcome, PartylineApp, PartylineConnector};
use partyline::error::PartylineError;
use partyline::partyline::{Handler, Partyline, Reply};
use serde_json::json;

fn invitation(partyline: &Arc<Partyline>) -> PartyRequest {
    let mut request = PartyRequest::synthetic("/__invite__/", None);
    request.insert_context("partyline", partyline.operator());
    request
}

fn pong() -> Handler {
    Handler::new(|_| Ok(Reply::Answer(json!("pong"))))
}

#[test]
fn test_second_invitation_registers_nothing() {
    let partyline = Arc::new(Partyline::new());
    let connector = PartylineConnector::builder()
        .service("ping", pong())
        .service("status", pong())
        .build();

    let first = connector.join_party(&invitation(&partyline)).unwrap();
    assert_eq!(first, JoinOutcome::Joined);
    assert!(connector.is_joined());
    let joined_as = connector.operator().unwrap().id();
    assert_eq!(partyline.handler_count("ping"), 1);
    assert_eq!(partyline.handler_count("status"), 1);

    let second = connector.join_party(&invitation(&partyline)).unwrap();
    assert_eq!(second, JoinOutcome::AlreadyJoined);
    assert_eq!(partyline.handler_count("ping"), 1);
    assert_eq!(partyline.handler_count("status"), 1);
    assert_eq!(connector.operator().unwrap().id(), joined_as);
}

#[test]
fn test_invitation_response_reports_join() {
    let partyline = Arc::new(Partyline::new());
    let app = PartylineApp::new(
        PartylineConnector::builder().service("ping", pong()).build(),
        common::echo_fn("inner"),
    );

    let resp = app.call(invitation(&partyline)).unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, json!({"joined": true}));

    let resp = app.call(invitation(&partyline)).unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, json!({"joined": false}));

    let resp = app.call(PartyRequest::new(Method::GET, "/hello")).unwrap();
    assert_eq!(resp.body["app"], "inner");
}

#[test]
fn test_missing_operator_leaves_connector_unjoined() {
    let connector = PartylineConnector::builder().service("ping", pong()).build();
    let request = PartyRequest::synthetic("/__invite__/", None);

    let err = connector.join_party(&request).unwrap_err();
    assert!(matches!(err, PartylineError::MissingOperator { ref key } if key == "partyline"));
    assert!(!connector.is_joined());
    assert!(connector.operator().is_none());

    // A proper invitation still works afterwards.
    let partyline = Arc::new(Partyline::new());
    assert_eq!(
        connector.join_party(&invitation(&partyline)).unwrap(),
        JoinOutcome::Joined
    );
}

#[test]
fn test_missing_operator_is_an_error_response() {
    let app = PartylineApp::new(PartylineConnector::builder().build(), common::echo_fn("inner"));
    let err = app
        .call(PartyRequest::synthetic("/__invite__/", None))
        .unwrap_err();
    assert!(err.to_string().contains("partyline"));
}

#[test]
fn test_before_join_can_veto() {
    let partyline = Arc::new(Partyline::new());
    let connector = PartylineConnector::builder()
        .service("ping", pong())
        .before_join(|request| {
            if request.get_header("x-trusted").is_some() {
                JoinGate::Proceed
            } else {
                JoinGate::Veto
            }
        })
        .build();

    let outcome = connector.join_party(&invitation(&partyline)).unwrap();
    assert_eq!(outcome, JoinOutcome::AlreadyJoined);
    assert!(!connector.is_joined());
    assert_eq!(partyline.handler_count("ping"), 0);

    let mut trusted = invitation(&partyline);
    trusted.set_header("x-trusted", "yes".to_string());
    assert_eq!(connector.join_party(&trusted).unwrap(), JoinOutcome::Joined);
    assert_eq!(partyline.handler_count("ping"), 1);
}

#[test]
fn test_on_join_runs_once_before_registration() {
    let partyline = Arc::new(Partyline::new());
    let runs = Arc::new(AtomicUsize::new(0));
    let seen_handlers = Arc::new(Mutex::new(Vec::new()));

    let hook_runs = Arc::clone(&runs);
    let hook_seen = Arc::clone(&seen_handlers);
    let connector = PartylineConnector::builder()
        .service("ping", pong())
        .on_join(move |operator| {
            hook_runs.fetch_add(1, Ordering::SeqCst);
            hook_seen.lock().unwrap().push(operator.handler_count());
        })
        .build();

    connector.join_party(&invitation(&partyline)).unwrap();
    connector.join_party(&invitation(&partyline)).unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(*seen_handlers.lock().unwrap(), vec![0]);
    assert_eq!(connector.operator().unwrap().handler_count(), 1);
}

#[test]
fn test_ask_around_before_joining() {
    let connector = PartylineConnector::builder().build();
    let err = connector.ask_around("ping", json!(null)).err().unwrap();
    assert!(matches!(err, PartylineError::NotJoined));
}

#[test]
fn test_config_sets_invite_path_and_key() {
    let config = PartyConfig::default()
        .with_invite_path("/_join")
        .with_partyline_key("line");
    let connector = PartylineConnector::builder()
        .config(&config)
        .service("ping", pong())
        .build();
    let partyline = Arc::new(Partyline::new());

    let mut default_slot = PartyRequest::synthetic("/_join", None);
    default_slot.insert_context("partyline", partyline.operator());
    assert!(connector.is_invitation(&default_slot));
    assert!(matches!(
        connector.join_party(&default_slot),
        Err(PartylineError::MissingOperator { .. })
    ));

    let mut request = PartyRequest::synthetic("/_join", None);
    request.insert_context("line", partyline.operator());
    assert_eq!(connector.join_party(&request).unwrap(), JoinOutcome::Joined);
    assert!(!connector.is_invitation(&PartyRequest::synthetic("/__invite__/", None)));
}

#[test]
fn test_concurrent_invitations_join_once() {
    let partyline = Arc::new(Partyline::new());
    let connector = Arc::new(PartylineConnector::builder().service("ping", pong()).build());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let connector = Arc::clone(&connector);
            let request = invitation(&partyline);
            std::thread::spawn(move || connector.join_party(&request).unwrap())
        })
        .collect();
    let joined = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|outcome| *outcome == JoinOutcome::Joined)
        .count();

    assert_eq!(joined, 1);
    assert_eq!(partyline.handler_count("ping"), 1);
}
