use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::mount::{MountTable, Resolution};
use crate::app::{Application, PartyRequest, PartyResponse, SharedApplication};
use crate::config::{InvitationPolicy, PartyConfig};
use crate::error::{PartylineError, Result};
use crate::partyline::Partyline;

/// Label used for the default application in invitation reports and errors.
pub const DEFAULT_TARGET: &str = "<default>";

/// How one application handled its invitation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvitationOutcome {
    /// Answered with a 2xx status
    Accepted(u16),
    /// Answered with any other status, typically 404 from an application
    /// that does not speak the partyline protocol
    Rejected(u16),
    /// Returned an error
    Failed(String),
}

/// One invitation sent during the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    /// Mount key, or [`DEFAULT_TARGET`]
    pub target: String,
    pub outcome: InvitationOutcome,
}

/// Everything that happened during one round of invitations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvitationReport {
    pub invitations: Vec<Invitation>,
}

impl InvitationReport {
    /// Number of invitations sent
    #[must_use]
    pub fn len(&self) -> usize {
        self.invitations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.invitations.is_empty()
    }

    /// Number of applications that accepted
    #[must_use]
    pub fn accepted(&self) -> usize {
        self.invitations
            .iter()
            .filter(|i| matches!(i.outcome, InvitationOutcome::Accepted(_)))
            .count()
    }

    #[must_use]
    pub fn all_accepted(&self) -> bool {
        self.accepted() == self.len()
    }

    /// Outcome for a mount key (or [`DEFAULT_TARGET`])
    #[must_use]
    pub fn outcome(&self, target: &str) -> Option<&InvitationOutcome> {
        self.invitations
            .iter()
            .find(|i| i.target == target)
            .map(|i| &i.outcome)
    }
}

/// Front door for a set of mounted applications.
///
/// Routes requests by path prefix and, on construction, invites every
/// application onto a shared [`Partyline`].
pub struct Dispatcher {
    app: SharedApplication,
    mounts: MountTable,
    partyline: Arc<Partyline>,
    config: PartyConfig,
    invitations: InvitationReport,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("mounts", &self.mounts)
            .field("partyline", &self.partyline)
            .field("config", &self.config)
            .field("invitations", &self.invitations)
            .finish()
    }
}

impl Dispatcher {
    /// Build a dispatcher and immediately send invitations.
    ///
    /// `app` serves every path no mount claims. Under
    /// [`InvitationPolicy::Strict`] the first refused invitation is returned
    /// as an error; otherwise refusals are logged and recorded in
    /// [`invitations`](Self::invitations).
    pub fn new<I, K>(app: SharedApplication, mounts: I, config: PartyConfig) -> Result<Self>
    where
        I: IntoIterator<Item = (K, SharedApplication)>,
        K: Into<String>,
    {
        Self::with_partyline(app, mounts, config, Arc::new(Partyline::new()))
    }

    /// Like [`new`](Self::new) but joins an existing broker.
    pub fn with_partyline<I, K>(
        app: SharedApplication,
        mounts: I,
        config: PartyConfig,
        partyline: Arc<Partyline>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (K, SharedApplication)>,
        K: Into<String>,
    {
        config.validate()?;
        let mounts = MountTable::new(mounts)?;
        let mut dispatcher = Dispatcher {
            app,
            mounts,
            partyline,
            config,
            invitations: InvitationReport::default(),
        };
        dispatcher.invitations = dispatcher.send_invitations()?;
        Ok(dispatcher)
    }

    /// The default application followed by every mounted one, in mount order.
    ///
    /// An application mounted twice appears twice.
    #[must_use]
    pub fn applications(&self) -> Vec<(String, SharedApplication)> {
        std::iter::once((DEFAULT_TARGET.to_string(), Arc::clone(&self.app)))
            .chain(
                self.mounts
                    .applications()
                    .map(|(key, app)| (key.to_string(), app)),
            )
            .collect()
    }

    /// Send one invitation to each application.
    ///
    /// Each gets its own synthetic request to the invite path carrying a fresh
    /// operator under the partyline key. Responses are only classified,
    /// never interpreted.
    pub fn send_invitations(&self) -> Result<InvitationReport> {
        let mut report = InvitationReport::default();
        let start = Instant::now();

        for (target, app) in self.applications() {
            let mut request =
                PartyRequest::synthetic(&self.config.invite_path, self.config.base_url.as_ref());
            let operator = self.partyline.operator();
            let operator_id = operator.id();
            request.insert_context(&self.config.partyline_key, operator);

            debug!(
                application = %target,
                operator_id = %operator_id,
                invite_path = %self.config.invite_path,
                "Sending invitation"
            );

            let outcome = match app.call(request) {
                Ok(resp) if resp.is_success() => InvitationOutcome::Accepted(resp.status),
                Ok(resp) => {
                    if self.config.invitation_policy == InvitationPolicy::Strict {
                        return Err(PartylineError::InvitationRejected {
                            target,
                            status: resp.status,
                        });
                    }
                    warn!(
                        application = %target,
                        status = resp.status,
                        "Application did not accept invitation - not partyline-aware?"
                    );
                    InvitationOutcome::Rejected(resp.status)
                }
                Err(source) => {
                    if self.config.invitation_policy == InvitationPolicy::Strict {
                        return Err(PartylineError::InvitationFailed { target, source });
                    }
                    warn!(
                        application = %target,
                        error = %source,
                        "Application failed its invitation - continuing"
                    );
                    InvitationOutcome::Failed(source.to_string())
                }
            };
            report.invitations.push(Invitation { target, outcome });
        }

        info!(
            sent = report.len(),
            accepted = report.accepted(),
            services = ?self.partyline.services(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Invitations complete"
        );
        Ok(report)
    }

    /// Resolve `path` against the mount table without calling anything.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Resolution {
        self.mounts.resolve(path)
    }

    /// Route a request to the application owning its path.
    ///
    /// The consumed prefix is appended to `script_name` and the remainder
    /// becomes `path_info`. Unmatched paths go to the default application.
    /// Errors from the application are returned unchanged.
    pub fn route(&self, mut request: PartyRequest) -> anyhow::Result<PartyResponse> {
        let resolution = self.mounts.resolve(&request.path_info);
        let app = resolution
            .mount
            .as_deref()
            .and_then(|key| self.mounts.get(key))
            .unwrap_or(&self.app);

        debug!(
            request_id = %request.request_id,
            method = %request.method,
            mount = resolution.mount.as_deref().unwrap_or(DEFAULT_TARGET),
            script = %resolution.script,
            path_info = %resolution.path_info,
            "Request routed"
        );

        request.script_name.push_str(&resolution.script);
        request.path_info = resolution.path_info;
        app.call(request)
    }

    /// The broker shared by every application behind this dispatcher
    #[must_use]
    pub fn partyline(&self) -> &Arc<Partyline> {
        &self.partyline
    }

    #[must_use]
    pub fn config(&self) -> &PartyConfig {
        &self.config
    }

    #[must_use]
    pub fn mounts(&self) -> &MountTable {
        &self.mounts
    }

    /// Report from the invitations sent at construction
    #[must_use]
    pub fn invitations(&self) -> &InvitationReport {
        &self.invitations
    }
}

impl Application for Dispatcher {
    fn call(&self, request: PartyRequest) -> anyhow::Result<PartyResponse> {
        self.route(request)
    }
}
