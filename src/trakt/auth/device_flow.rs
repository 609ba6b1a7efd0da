//! Device-code authorization with background polling.
//!
//! [`DeviceFlow::start`] returns the verification URL as soon as the device
//! code is issued. Polling continues on a spawned task whose outcome is only
//! observable through logs and [`DeviceFlow::subscribe`].

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use super::{AuthContext, DeviceCode, Error};

/// Upper bound on the server-provided poll interval.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60);
/// Upper bound on the server-provided device code lifetime.
pub const MAX_CODE_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationStatus {
    /// No attempt since startup or the last shutdown.
    Idle,
    Requesting,
    Pending {
        verification_url: String,
    },
    Approved,
    Expired,
    Failed {
        reason: String,
    },
}

impl AuthorizationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Expired | Self::Failed { .. })
    }
}

pub struct DeviceFlow {
    ctx: Arc<AuthContext>,
    status: Arc<watch::Sender<AuthorizationStatus>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DeviceFlow {
    pub fn new(ctx: Arc<AuthContext>) -> Self {
        let (status, _) = watch::channel(AuthorizationStatus::Idle);
        Self {
            ctx,
            status: Arc::new(status),
            task: Mutex::const_new(None),
        }
    }

    pub fn status(&self) -> AuthorizationStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthorizationStatus> {
        self.status.subscribe()
    }

    /// Request a device code and start polling for approval.
    ///
    /// Only one attempt may be pending at a time.
    pub async fn start(&self) -> Result<String, Error> {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|task| !task.is_finished()) {
            warn!(message = "Rejecting authorization request, one is already pending");
            return Err(Error::AuthorizationInProgress);
        }

        self.status.send_replace(AuthorizationStatus::Requesting);

        let code = match self.ctx.api.device_code(&self.ctx.credentials.client_id).await {
            Ok(code) => code,
            Err(err) => {
                error!(message = "Failed to get device code", error = %err);
                self.status.send_replace(AuthorizationStatus::Failed {
                    reason: err.to_string(),
                });
                return Err(Error::DeviceCodeRequest(err));
            }
        };

        let verification_url = code.user_url();
        info!(
            message = "Waiting for device authorization",
            verification_url = %verification_url,
            expires_in = code.expires_in,
            interval = code.interval,
        );
        self.status.send_replace(AuthorizationStatus::Pending {
            verification_url: verification_url.clone(),
        });

        let ctx = Arc::clone(&self.ctx);
        let status = Arc::clone(&self.status);
        *task = Some(tokio::spawn(async move {
            let outcome = poll_for_token(&ctx, &code).await;
            report(&status, outcome);
        }));

        Ok(verification_url)
    }

    /// Abort a pending poll, if any.
    pub async fn shutdown(&self) {
        if let Some(task) = self.task.lock().await.take() {
            if !task.is_finished() {
                info!(message = "Abandoning pending device authorization");
                task.abort();
                self.status.send_replace(AuthorizationStatus::Idle);
            }
        }
    }
}

async fn poll_for_token(ctx: &AuthContext, code: &DeviceCode) -> Result<(), Error> {
    let period = Duration::from_secs(code.interval.max(1)).min(MAX_POLL_INTERVAL);
    let lifetime = Duration::from_secs(code.expires_in).min(MAX_CODE_LIFETIME);
    let started = Instant::now();
    let deadline = started + lifetime;

    let mut ticks = time::interval_at(started + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticks.tick().await;

        if Instant::now() > deadline {
            return Err(Error::DeviceCodeExpired);
        }

        match ctx.api.device_token(&code.device_code, &ctx.credentials).await {
            Ok(record) => {
                let _writer = ctx.lock_writes().await;
                ctx.store.save(&record).await?;
                return Ok(());
            }
            Err(err) => debug!(message = "Authorization still pending", error = %err),
        }
    }
}

/// The spawned task has no caller, so its outcome goes to the log and the status channel.
fn report(status: &watch::Sender<AuthorizationStatus>, outcome: Result<(), Error>) {
    let next = match outcome {
        Ok(()) => {
            info!(message = "Authorization complete");
            AuthorizationStatus::Approved
        }
        Err(Error::DeviceCodeExpired) => {
            warn!(message = "Device flow failed", error = "device code expired");
            AuthorizationStatus::Expired
        }
        Err(err) => {
            error!(message = "Device flow failed", error = %err);
            AuthorizationStatus::Failed {
                reason: err.to_string(),
            }
        }
    };
    status.send_replace(next);
}
