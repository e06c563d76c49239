//! End-to-end ask-around tests through a dispatcher

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{echo, echo_fn, member};
use partyline::app::SharedApplication;
use partyline::config::PartyConfig;
use partyline::connector::{PartylineApp, PartylineConnector};
use partyline::dispatcher::Dispatcher;
use partyline::error::PartylineError;
use partyline::partyline::{Handler, Reply};
use serde_json::{json, Value};

#[test]
fn test_ping_reaches_everyone_but_the_asker() {
    let (a, a_app) = member("a", "ping");
    let (b, b_app) = member("b", "ping");
    let _dispatcher = Dispatcher::new(a_app, [("/b", b_app)], PartyConfig::default()).unwrap();

    let answers = a.ask_around("ping", json!({})).unwrap().answers().unwrap();
    assert_eq!(answers, vec![json!("b")]);

    let answers = b.ask_around("ping", json!({})).unwrap().answers().unwrap();
    assert_eq!(answers, vec![json!("a")]);
}

#[test]
fn test_answers_follow_mount_order() {
    let (root, root_app) = member("root", "ping");
    let (_x, x_app) = member("x", "ping");
    let (_y, y_app) = member("y", "ping");
    let (_z, z_app) = member("z", "ping");
    let _dispatcher = Dispatcher::new(
        root_app,
        [("/x", x_app), ("/y", y_app), ("/z", z_app)],
        PartyConfig::default(),
    )
    .unwrap();

    let answers = root.ask_around("ping", Value::Null).unwrap().answers().unwrap();
    assert_eq!(answers, vec![json!("x"), json!("y"), json!("z")]);
}

#[test]
fn test_unknown_service_is_empty() {
    let (a, a_app) = member("a", "ping");
    let _dispatcher =
        Dispatcher::new(a_app, [("/plain", echo("plain"))], PartyConfig::default()).unwrap();

    let mut broadcast = a.ask_around("nobody-offers-this", json!(1)).unwrap();
    assert!(broadcast.next().is_none());
}

fn declining_then_failing(calls: Arc<AtomicUsize>) -> (Arc<PartylineConnector>, SharedApplication) {
    let declines = Arc::clone(&calls);
    let fails = Arc::clone(&calls);
    let after = calls;
    let connector = Arc::new(
        PartylineConnector::builder()
            .service(
                "lookup",
                Handler::new(move |_| {
                    declines.fetch_add(1, Ordering::SeqCst);
                    Ok(Reply::NoAnswer)
                }),
            )
            .service(
                "lookup",
                Handler::new(move |_| {
                    fails.fetch_add(1, Ordering::SeqCst);
                    Err(anyhow::anyhow!("index corrupt"))
                }),
            )
            .service(
                "lookup",
                Handler::new(move |_| {
                    after.fetch_add(1, Ordering::SeqCst);
                    Ok(Reply::Answer(json!("too late")))
                }),
            )
            .build(),
    );
    let app = PartylineApp::with_shared(Arc::clone(&connector), echo_fn("helper"));
    (connector, Arc::new(app))
}

#[test]
fn test_decline_is_skipped_and_failure_propagates() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (asker, asker_app) = member("asker", "ping");
    let (_helper, helper_app) = declining_then_failing(Arc::clone(&calls));
    let _dispatcher =
        Dispatcher::new(asker_app, [("/helper", helper_app)], PartyConfig::default()).unwrap();

    let mut broadcast = asker.ask_around("lookup", json!({"key": 1})).unwrap();
    match broadcast.next() {
        Some(Err(PartylineError::Handler { service, source })) => {
            assert_eq!(service, "lookup");
            assert_eq!(source.to_string(), "index corrupt");
        }
        unexpected => panic!("expected handler failure, got {unexpected:?}"),
    }
    assert!(broadcast.next().is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_answers_surfaces_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (asker, asker_app) = member("asker", "ping");
    let (_helper, helper_app) = declining_then_failing(Arc::clone(&calls));
    let _dispatcher =
        Dispatcher::new(asker_app, [("/helper", helper_app)], PartyConfig::default()).unwrap();

    let err = asker.ask_around("lookup", Value::Null).unwrap().answers().unwrap_err();
    assert!(matches!(err, PartylineError::Handler { .. }));
}

#[test]
fn test_shared_partyline_across_dispatchers() {
    let partyline = Arc::new(partyline::partyline::Partyline::new());
    let (a, a_app) = member("a", "ping");
    let (_b, b_app) = member("b", "ping");

    let _first = Dispatcher::with_partyline(
        a_app,
        Vec::<(String, SharedApplication)>::new(),
        PartyConfig::default(),
        Arc::clone(&partyline),
    )
    .unwrap();
    let _second = Dispatcher::with_partyline(
        b_app,
        Vec::<(String, SharedApplication)>::new(),
        PartyConfig::default(),
        Arc::clone(&partyline),
    )
    .unwrap();

    assert_eq!(partyline.handler_count("ping"), 2);
    let answers = a.ask_around("ping", Value::Null).unwrap().answers().unwrap();
    assert_eq!(answers, vec![json!("b")]);
}
