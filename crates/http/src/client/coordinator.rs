//! Single-flight token refresh
//!
//! [`RefreshCoordinator`] owns the current access token and the refresh
//! state machine:
//!
//! ```text
//!            first token.expired              refresh ok / failed
//!   Idle ─────────────────────────▶ Refreshing ─────────────────────▶ Idle
//!                                    │     ▲
//!                                    └─────┘ later token.expired: enqueue
//! ```
//!
//! Every transition happens inside one short critical section that never
//! spans an `.await`, so two tasks that see an expired token at the same time
//! cannot both start a refresh. The network side of the refresh is driven by
//! the client (see `TodoClient::drive_refresh`); this type only decides who
//! leads, who waits, and who gets settled with what.
//!
//! The `persist` and `clear` callbacks run inside the critical section, so a
//! token and its stored credentials always change together. Store writes are
//! small local files; they block the calling worker for that long.

use super::ClientError;
use super::transport::{ApiRequest, ApiResponse};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use todo_core::{AccessToken, CoreResult};
use tokio::sync::oneshot;

/// Outcome delivered to a request parked behind a refresh
pub type Settlement = Result<ApiResponse, ClientError>;

/// Coordinator phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Refreshing,
}

/// A caller stalled behind an in-progress refresh
#[derive(Debug)]
pub struct PendingRequest {
    pub request: ApiRequest,
    completion: oneshot::Sender<Settlement>,
}

impl PendingRequest {
    /// Settle the caller. A caller that stopped listening is not an error.
    pub fn settle(self, outcome: Settlement) {
        let _ = self.completion.send(outcome);
    }
}

/// How an expired-token failure was admitted
#[derive(Debug)]
pub enum Admission {
    /// The caller triggered the refresh and must start driving it
    Lead {
        epoch: u64,
        receiver: oneshot::Receiver<Settlement>,
    },
    /// A refresh is already in flight; wait on the receiver
    Queued(oneshot::Receiver<Settlement>),
    /// The request carried a token that has since been replaced; retry with this one
    Retry(AccessToken),
}

/// What to do with the queue once the refresh settled
#[derive(Debug)]
pub enum Drain {
    /// Replay every request with the new token, in arrival order
    Replay {
        token: AccessToken,
        queue: Vec<PendingRequest>,
    },
    /// Reject every request with the shared refresh failure
    Reject {
        error: Arc<ClientError>,
        queue: Vec<PendingRequest>,
    },
    /// A sign-in or sign-out happened while the refresh was in flight; the
    /// credentials belong to that newer session and are left alone
    Superseded { queue: Vec<PendingRequest> },
}

#[derive(Debug)]
struct RefreshState {
    phase: Phase,
    queue: VecDeque<PendingRequest>,
    token: Option<AccessToken>,
    /// Bumped on every sign-out so a refresh started before it cannot revive the session
    epoch: u64,
}

/// Owner of the current access token and the refresh state machine
#[derive(Debug)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(token: Option<AccessToken>) -> Self {
        Self {
            state: Mutex::new(RefreshState {
                phase: Phase::Idle,
                queue: VecDeque::new(),
                token,
                epoch: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        // Nothing panics while the lock is held; a poisoned state is still consistent
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn queue_len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Token the transport attaches to the next request
    pub fn current_token(&self) -> Option<AccessToken> {
        self.lock().token.clone()
    }

    /// Install a freshly issued token after `persist` stored the credentials
    ///
    /// Starts a new epoch: a refresh still in flight for the previous session
    /// finishes as [`Drain::Superseded`].
    pub fn install<F>(&self, token: AccessToken, persist: F) -> CoreResult<()>
    where
        F: FnOnce() -> CoreResult<()>,
    {
        let mut state = self.lock();
        persist()?;
        state.token = Some(token);
        state.epoch += 1;
        Ok(())
    }

    /// Forget the token after `clear` removed the stored credentials
    ///
    /// A refresh still in flight keeps its queue; it notices the new epoch when
    /// it finishes and fails its callers.
    pub fn revoke<F>(&self, clear: F)
    where
        F: FnOnce(),
    {
        let mut state = self.lock();
        clear();
        state.token = None;
        state.epoch += 1;
    }

    /// Admit a request that failed with `token.expired`
    ///
    /// `sent_with` is the token the failed request carried.
    pub fn admit(&self, request: ApiRequest, sent_with: Option<&AccessToken>) -> Admission {
        let mut state = self.lock();

        match state.phase {
            Phase::Refreshing => {
                let (completion, receiver) = oneshot::channel();
                state.queue.push_back(PendingRequest {
                    request,
                    completion,
                });
                debug!(queued = state.queue.len(), "Request queued behind refresh");
                Admission::Queued(receiver)
            }
            Phase::Idle => {
                match &state.token {
                    Some(current) if sent_with != Some(current) => {
                        debug!("Expired token already replaced, retrying with current token");
                        return Admission::Retry(current.clone());
                    }
                    _ => {}
                }

                let (completion, receiver) = oneshot::channel();
                state.phase = Phase::Refreshing;
                state.queue.push_back(PendingRequest {
                    request,
                    completion,
                });
                info!(epoch = state.epoch, "Access token expired, starting refresh");
                Admission::Lead {
                    epoch: state.epoch,
                    receiver,
                }
            }
        }
    }

    /// Leave `Refreshing` with the outcome of the refresh call
    ///
    /// On success `persist` stores the new credentials before the token is
    /// installed. On failure `clear` removes the stored credentials. When the
    /// epoch moved on while the refresh was in flight, neither runs and the
    /// token is untouched. Either way the queue is handed back, fully drained,
    /// and the phase is `Idle` again.
    pub fn finish<P, C>(
        &self,
        epoch: u64,
        outcome: Result<AccessToken, ClientError>,
        persist: P,
        clear: C,
    ) -> Drain
    where
        P: FnOnce() -> CoreResult<()>,
        C: FnOnce(),
    {
        let mut state = self.lock();
        let queue: Vec<PendingRequest> = state.queue.drain(..).collect();
        state.phase = Phase::Idle;

        if state.epoch != epoch {
            info!(
                rejected = queue.len(),
                "Session changed during refresh, discarding result"
            );
            return Drain::Superseded { queue };
        }

        match outcome.and_then(|token| persist().map(|()| token).map_err(ClientError::from)) {
            Ok(token) => {
                state.token = Some(token.clone());
                info!(replaying = queue.len(), "Access token refreshed");
                Drain::Replay { token, queue }
            }
            Err(error) => {
                clear();
                state.token = None;
                state.epoch += 1;
                warn!(rejected = queue.len(), "Token refresh failed: {error}");
                Drain::Reject {
                    error: Arc::new(error),
                    queue,
                }
            }
        }
    }
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new(None)
    }
}
