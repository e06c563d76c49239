//! # CLI Module
//!
//! `partyline-demo` builds a small composition and lets you poke at it:
//! a root `main` application and a `blog` application mounted at `/blog`,
//! both joining the partyline and offering `ping` and `title` services.
//!
//! ```bash
//! partyline-demo route /blog/posts/hello
//! partyline-demo ask ping --from main
//! partyline-demo ask title '{"slug": "hello"}'
//! partyline-demo invitations --config partyline.yaml
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::app::{PartyRequest, PartyResponse, SharedApplication};
use crate::config::PartyConfig;
use crate::connector::{PartylineApp, PartylineConnector};
use crate::dispatcher::{Dispatcher, DEFAULT_TARGET};
use crate::ids::RequestId;
use crate::partyline::{Handler, Reply};

#[derive(Parser)]
#[command(name = "partyline-demo")]
#[command(about = "Route requests and ask around in a sample partyline", long_about = None)]
pub struct Cli {
    /// YAML partyline configuration (defaults, then PARTYLINE_* env, otherwise)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true, env = "PARTYLINE_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Route a request path and print where it landed
    Route {
        path: String,

        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Extra request header as `name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
    /// Broadcast a service request from one application
    Ask {
        service: String,

        /// JSON payload
        #[arg(default_value = "null")]
        payload: String,

        #[arg(long, value_enum, default_value_t = Member::Main)]
        from: Member,
    },
    /// Print the outcome of the start-up invitations
    Invitations,
}

/// Sample applications of the demo composition
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Member {
    Main,
    Blog,
}

#[derive(Debug, Deserialize)]
struct TitleQuery {
    slug: String,
}

#[derive(Debug, Serialize)]
struct TitleAnswer {
    app: &'static str,
    title: String,
}

/// The demo composition: the dispatcher plus each member's connector.
pub struct Demo {
    pub dispatcher: Dispatcher,
    pub members: HashMap<&'static str, Arc<PartylineConnector>>,
}

fn member_app(
    name: &'static str,
    posts: &[(&str, &str)],
    config: &PartyConfig,
) -> (Arc<PartylineConnector>, SharedApplication) {
    let posts: Arc<HashMap<String, String>> = Arc::new(
        posts
            .iter()
            .map(|(slug, title)| (slug.to_string(), title.to_string()))
            .collect(),
    );

    let titles = Arc::clone(&posts);
    let connector = Arc::new(
        PartylineConnector::builder()
            .config(config)
            .service("ping", Handler::new(move |_| Ok(Reply::Answer(json!(name)))))
            .service(
                "title",
                Handler::typed(move |query: TitleQuery| {
                    Ok(titles.get(&query.slug).map(|title| TitleAnswer {
                        app: name,
                        title: title.clone(),
                    }))
                }),
            )
            .on_join(move |operator| info!(app = name, operator_id = %operator.id(), "Demo member joined"))
            .build(),
    );

    let own = Arc::clone(&connector);
    let app = PartylineApp::with_shared(
        Arc::clone(&connector),
        move |req: PartyRequest| -> Result<PartyResponse> {
            let path = req.path_info.as_str();
            if let Some(slug) = path.strip_prefix("/posts/") {
                return Ok(match posts.get(slug) {
                    Some(title) => PartyResponse::ok_json(json!({ "app": name, "title": title })),
                    None => {
                        // Not ours: maybe another member has it.
                        let elsewhere = own.ask_around("title", json!({ "slug": slug }))?.next();
                        match elsewhere.transpose()? {
                            Some(found) => PartyResponse::ok_json(json!({ "app": name, "found_elsewhere": found })),
                            None => PartyResponse::not_found(path),
                        }
                    }
                });
            }
            Ok(PartyResponse::ok_json(json!({
                "app": name,
                "script_name": req.script_name,
                "path_info": req.path_info,
            })))
        },
    );
    (connector, Arc::new(app))
}

impl Demo {
    pub fn build(config: PartyConfig) -> crate::error::Result<Self> {
        let (main, main_app) = member_app("main", &[("welcome", "Welcome aboard")], &config);
        let (blog, blog_app) = member_app(
            "blog",
            &[("hello", "Hello, world"), ("partyline", "On partylines")],
            &config,
        );
        let dispatcher = Dispatcher::new(main_app, [("/blog", blog_app)], config)?;
        let members = HashMap::from([("main", main), ("blog", blog)]);
        Ok(Self {
            dispatcher,
            members,
        })
    }

    pub fn member(&self, member: Member) -> Result<&Arc<PartylineConnector>> {
        let name = match member {
            Member::Main => "main",
            Member::Blog => "blog",
        };
        self.members
            .get(name)
            .ok_or_else(|| anyhow!("unknown member {name}"))
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<PartyConfig> {
    match path {
        Some(path) => PartyConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => Ok(PartyConfig::from_env()),
    }
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    crate::logging::init_logging(&cli.log_level)?;

    let config = load_config(cli.config.as_ref())?;
    let demo = Demo::build(config)?;

    let output = match &cli.command {
        Commands::Route {
            path,
            method,
            headers,
        } => {
            let method = http::Method::from_bytes(method.as_bytes())
                .with_context(|| format!("invalid method {method}"))?;
            let mut request = PartyRequest::new(method, path);
            for header in headers {
                let (name, value) = header
                    .split_once(':')
                    .ok_or_else(|| anyhow!("header '{header}' is not 'name: value'"))?;
                request.set_header(name.trim(), value.trim().to_string());
            }
            request.request_id = RequestId::from_header_or_new(request.get_header("x-request-id"));
            let request_id = request.request_id;

            let resolution = demo.dispatcher.resolve(path);
            let response = demo.dispatcher.route(request)?;
            json!({
                "request_id": request_id,
                "mount": resolution.mount.as_deref().unwrap_or(DEFAULT_TARGET),
                "script_name": resolution.script,
                "path_info": resolution.path_info,
                "response": response,
            })
        }
        Commands::Ask {
            service,
            payload,
            from,
        } => {
            let payload: Value =
                serde_json::from_str(payload).context("payload must be valid JSON")?;
            let answers = demo.member(*from)?.ask_around(service, payload)?.answers()?;
            json!({ "service": service, "answers": answers })
        }
        Commands::Invitations => {
            let invitations: Vec<Value> = demo
                .dispatcher
                .invitations()
                .invitations
                .iter()
                .map(|i| json!({ "application": i.target, "outcome": format!("{:?}", i.outcome) }))
                .collect();
            json!({
                "invitations": invitations,
                "services": demo.dispatcher.partyline().services(),
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
