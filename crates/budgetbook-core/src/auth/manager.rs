//! Authenticated request pipeline with single-flight token refresh.
//!
//! Every API call goes through [`SessionManager::execute`]. When a call comes
//! back unauthorized, exactly one refresh is started no matter how many calls
//! fail at the same time; the others park behind it and are retried once
//! with the new token, in the order they arrived. If the refresh fails, the
//! session is cleared and every parked call resolves with
//! [`SessionError::SessionExpired`].

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};

use crate::api::{
    ApiError, ApiResponse, AuthMode, ExecOutcome, RequestExecutor, RequestSpec, SessionError,
};

use super::credentials::{CredentialStore, StorageError};
use super::refresher::{RefreshError, TokenRefresher};
use super::session::Session;

type Reply = Result<ApiResponse, SessionError>;

/// Whether a token refresh is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

/// A call parked until the in-flight refresh resolves.
struct PendingRequest {
    spec: RequestSpec,
    reply: oneshot::Sender<Reply>,
}

enum Gate {
    Idle,
    Refreshing { queue: VecDeque<PendingRequest> },
}

struct Inner {
    session: Session,
    gate: Gate,
    /// Bumped whenever the session is replaced or ended, so a refresh or a
    /// 401 that arrives afterwards knows it belongs to a dead session. A
    /// successful refresh keeps the epoch.
    epoch: u64,
}

impl Inner {
    /// Reset the gate to idle and hand back whatever was parked.
    fn take_parked(&mut self) -> VecDeque<PendingRequest> {
        match std::mem::replace(&mut self.gate, Gate::Idle) {
            Gate::Refreshing { queue } => queue,
            Gate::Idle => VecDeque::new(),
        }
    }

    fn end_session(
        &mut self,
        store: &dyn CredentialStore,
    ) -> (VecDeque<PendingRequest>, Result<(), StorageError>) {
        self.epoch += 1;
        let parked = self.take_parked();
        let cleared = self.session.clear(store);
        (parked, cleared)
    }
}

struct Shared {
    inner: Mutex<Inner>,
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    executor: Arc<dyn RequestExecutor>,
}

fn expire_all(parked: VecDeque<PendingRequest>) {
    for pending in parked {
        let _ = pending.reply.send(Err(SessionError::SessionExpired));
    }
}

impl Shared {
    /// Resend a request with a renewed token. A second 401 ends the session.
    async fn retry(&self, spec: &RequestSpec, token: &str) -> Reply {
        match self.executor.send(spec, Some(token)).await {
            ExecOutcome::Success(response) => Ok(response),
            ExecOutcome::Failed(e) => Err(e.into()),
            ExecOutcome::AuthFailure => {
                warn!(path = %spec.path, "Request still unauthorized after token refresh");
                self.expire_if_current(token).await;
                Err(SessionError::SessionExpired)
            }
        }
    }

    /// End the session, unless it has already moved on to a different token.
    async fn expire_if_current(&self, token: &str) {
        let mut inner = self.inner.lock().await;
        if inner.session.token() != Some(token) {
            return;
        }
        let (parked, cleared) = inner.end_session(self.store.as_ref());
        drop(inner);
        if let Err(e) = cleared {
            warn!(error = %e, "Failed to clear stored credentials");
        }
        expire_all(parked);
    }

    async fn run_refresh(self: Arc<Self>, refresh_token: String, epoch: u64) {
        // A panicking refresher must still release the parked requests.
        let result = AssertUnwindSafe(self.refresher.refresh(&refresh_token))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!("Token refresher panicked");
                Err(RefreshError::Panicked)
            });

        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            debug!("Discarding refresh result for a session that has since ended");
            return;
        }
        let parked = inner.take_parked();

        match result {
            Ok(tokens) => {
                inner.session.access_token = Some(tokens.access.clone());
                if let Some(rotated) = tokens.refresh {
                    inner.session.refresh_token = Some(rotated);
                }
                if let Err(e) = inner.session.save(self.store.as_ref()) {
                    warn!(error = %e, "Failed to persist refreshed session");
                }
                drop(inner);

                info!(pending = parked.len(), "Access token refreshed");
                self.dispatch(parked, tokens.access).await;
            }
            Err(e) => {
                inner.epoch += 1;
                let cleared = inner.session.clear(self.store.as_ref());
                drop(inner);

                warn!(error = %e, pending = parked.len(), "Token refresh failed, ending session");
                if let Err(e) = cleared {
                    warn!(error = %e, "Failed to clear stored credentials");
                }
                expire_all(parked);
            }
        }
    }

    /// Retry parked calls with the new token, starting them in queue order.
    async fn dispatch(&self, parked: VecDeque<PendingRequest>, token: String) {
        let retries = parked
            .into_iter()
            .filter(|pending| {
                let abandoned = pending.reply.is_closed();
                if abandoned {
                    debug!(path = %pending.spec.path, "Skipping retry for abandoned request");
                }
                !abandoned
            })
            .map(|pending| {
                let token = token.as_str();
                async move {
                    let result = self.retry(&pending.spec, token).await;
                    let _ = pending.reply.send(result);
                }
            });
        futures::future::join_all(retries).await;
    }
}

/// Owner of the session tokens and gatekeeper for every API call.
///
/// Clone is cheap and every clone drives the same session.
#[derive(Clone)]
pub struct SessionManager {
    shared: Arc<Shared>,
}

impl SessionManager {
    /// Create a manager, picking up any tokens left in the store by a
    /// previous run.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
        executor: Arc<dyn RequestExecutor>,
    ) -> Result<Self, StorageError> {
        let session = Session::load(store.as_ref())?;
        debug!(has_session = session.access_token.is_some(), "Session loaded");

        Ok(Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    session,
                    gate: Gate::Idle,
                    epoch: 0,
                }),
                store,
                refresher,
                executor,
            }),
        })
    }

    /// Run a request with the current access token, refreshing it once if
    /// the backend rejects it.
    ///
    /// Failing to persist a refreshed token is only logged: the call still
    /// succeeds with the in-memory token. This is the one place a
    /// [`StorageError`] is not returned to the caller.
    ///
    /// A 401 for a request sent under a session that has since been logged
    /// out or replaced resolves with [`SessionError::SessionExpired`]; it is
    /// never resent with the new session's token.
    pub async fn execute(&self, spec: RequestSpec) -> Reply {
        if spec.auth == AuthMode::Public {
            return match self.shared.executor.send(&spec, None).await {
                ExecOutcome::Success(response) => Ok(response),
                ExecOutcome::Failed(e) => Err(e.into()),
                ExecOutcome::AuthFailure => Err(ApiError::Unauthorized.into()),
            };
        }

        let (token, epoch) = {
            let inner = self.shared.inner.lock().await;
            (inner.session.access_token.clone(), inner.epoch)
        };
        if token.is_none() && spec.auth == AuthMode::Required {
            return Err(SessionError::NotAuthenticated);
        }

        match self.shared.executor.send(&spec, token.as_deref()).await {
            ExecOutcome::Success(response) => Ok(response),
            ExecOutcome::Failed(e) => Err(e.into()),
            ExecOutcome::AuthFailure => match token {
                Some(sent_with) => self.recover(spec, sent_with, epoch).await,
                None => Err(SessionError::NotAuthenticated),
            },
        }
    }

    async fn recover(&self, spec: RequestSpec, sent_with: String, epoch: u64) -> Reply {
        let mut inner = self.shared.inner.lock().await;
        if inner.epoch != epoch {
            drop(inner);
            debug!(path = %spec.path, "Request belonged to an ended session, not retrying");
            return Err(SessionError::SessionExpired);
        }

        let (reply, receiver) = oneshot::channel();
        let pending = PendingRequest { spec, reply };
        if let Gate::Refreshing { queue } = &mut inner.gate {
            debug!(path = %pending.spec.path, position = queue.len(), "Refresh in flight, parking request");
            queue.push_back(pending);
        } else {
            if let Some(current) = inner.session.access_token.clone() {
                if current != sent_with {
                    // A refresh finished while this request was on the wire.
                    drop(inner);
                    debug!(path = %pending.spec.path, "Token already renewed, retrying");
                    return self.shared.retry(&pending.spec, &current).await;
                }
            }

            let Some(refresh_token) = inner.session.refresh_token.clone() else {
                let (parked, cleared) = inner.end_session(self.shared.store.as_ref());
                drop(inner);
                warn!("Access token rejected and no refresh token available");
                if let Err(e) = cleared {
                    warn!(error = %e, "Failed to clear stored credentials");
                }
                expire_all(parked);
                return Err(SessionError::SessionExpired);
            };

            debug!(path = %pending.spec.path, "Access token rejected, starting refresh");
            inner.gate = Gate::Refreshing {
                queue: VecDeque::from([pending]),
            };
            let epoch = inner.epoch;
            tokio::spawn(self.shared.clone().run_refresh(refresh_token, epoch));
        }
        drop(inner);

        // A dropped sender means the request was discarded without a result.
        receiver.await.unwrap_or(Err(SessionError::SessionExpired))
    }

    /// Start a new session with a freshly issued token pair.
    ///
    /// Requests still parked from the previous session are expired. If the
    /// new pair cannot be stored, the previous session stays in place and is
    /// written back over any half-saved pair.
    pub async fn login(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Result<(), SessionError> {
        let session = Session::new(access_token, refresh_token);

        let mut inner = self.shared.inner.lock().await;
        if let Err(e) = session.save(self.shared.store.as_ref()) {
            if let Err(restore) = inner.session.save(self.shared.store.as_ref()) {
                warn!(error = %restore, "Failed to restore previous credentials");
            }
            return Err(e.into());
        }
        inner.epoch += 1;
        let parked = inner.take_parked();
        inner.session = session;
        drop(inner);

        expire_all(parked);
        info!("Session started");
        Ok(())
    }

    /// Forget both tokens and expire any parked requests. Safe to repeat.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let mut inner = self.shared.inner.lock().await;
        let (parked, cleared) = inner.end_session(self.shared.store.as_ref());
        drop(inner);

        expire_all(parked);
        cleared?;
        info!("Session ended");
        Ok(())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.shared.inner.lock().await.session.access_token.is_some()
    }

    pub async fn refresh_state(&self) -> RefreshState {
        match self.shared.inner.lock().await.gate {
            Gate::Idle => RefreshState::Idle,
            Gate::Refreshing { .. } => RefreshState::Refreshing,
        }
    }
}
