//! Shared application state.

use crate::error::ServerError;
use chrono::Duration;
use qr_authenticator::{
    ApplicationAuthenticator, AuthenticationContext, AuthenticatorRegistry, Challenge,
};
use qr_authenticator_core::SessionKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// A login attempt between two requests.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// Handshake state.
    pub context: AuthenticationContext,
    /// Challenge issued for the current round, if any.
    pub challenge: Option<Challenge>,
}

#[derive(Debug)]
struct Slot {
    attempt: Attempt,
    leased: bool,
}

/// In-memory store of unfinished login attempts.
///
/// A request works on an attempt through an [`AttemptLease`]. The attempt
/// stays in the store while leased, so its challenge is still served, but a
/// second lease on the same key is refused until the first is settled.
pub struct AttemptStore {
    ttl: Duration,
    slots: Mutex<HashMap<SessionKey, Slot>>,
}

impl AttemptStore {
    /// Creates a store expiring attempts after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    // Slot updates never leave the map half-written, so a poisoned lock is
    // still usable.
    fn slots(&self) -> MutexGuard<'_, HashMap<SessionKey, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores an attempt under its session key.
    pub fn put(&self, attempt: Attempt) {
        let key = attempt.context.session_key().clone();
        self.slots().insert(
            key,
            Slot {
                attempt,
                leased: false,
            },
        );
    }

    /// Stores a new attempt and leases it to the caller.
    pub fn begin(&self, context: AuthenticationContext) -> AttemptLease<'_> {
        let key = context.session_key().clone();
        self.slots().insert(
            key.clone(),
            Slot {
                attempt: Attempt {
                    context: context.clone(),
                    challenge: None,
                },
                leased: true,
            },
        );
        AttemptLease {
            store: self,
            key,
            context,
            settled: false,
        }
    }

    /// Leases a live attempt.
    ///
    /// Expired attempts are dropped on the way.
    pub fn checkout(&self, key: &SessionKey) -> Result<AttemptLease<'_>, ServerError> {
        let mut slots = self.slots();
        let slot = slots
            .get_mut(key)
            .ok_or_else(|| ServerError::AttemptNotFound {
                session_key: key.clone(),
            })?;

        if slot.leased {
            return Err(ServerError::AttemptBusy {
                session_key: key.clone(),
            });
        }
        if slot.attempt.context.is_expired(self.ttl) {
            slots.remove(key);
            return Err(ServerError::AttemptExpired {
                session_key: key.clone(),
            });
        }

        slot.leased = true;
        Ok(AttemptLease {
            store: self,
            key: key.clone(),
            context: slot.attempt.context.clone(),
            settled: false,
        })
    }

    /// Returns the challenge of a live attempt, leased or not.
    pub fn challenge(&self, key: &SessionKey) -> Result<Challenge, ServerError> {
        let slots = self.slots();
        let slot = slots
            .get(key)
            .filter(|s| !s.attempt.context.is_expired(self.ttl))
            .ok_or_else(|| ServerError::AttemptNotFound {
                session_key: key.clone(),
            })?;

        slot.attempt
            .challenge
            .clone()
            .ok_or_else(|| ServerError::ChallengeNotIssued {
                session_key: key.clone(),
            })
    }

    /// Drops expired attempts that are not leased, returning how many were
    /// dropped.
    pub fn purge_expired(&self) -> usize {
        let mut slots = self.slots();
        let before = slots.len();
        slots.retain(|_, s| s.leased || !s.attempt.context.is_expired(self.ttl));
        before - slots.len()
    }

    /// Returns the number of stored attempts.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    /// Returns `true` if no attempts are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive hold on one attempt for the duration of a request.
///
/// Settle it with [`commit`](Self::commit) or [`finish`](Self::finish). A
/// lease dropped unsettled, for instance when the client disconnects
/// mid-request, releases the attempt unchanged.
#[must_use]
pub struct AttemptLease<'a> {
    store: &'a AttemptStore,
    key: SessionKey,
    context: AuthenticationContext,
    settled: bool,
}

impl AttemptLease<'_> {
    /// Returns the leased handshake state.
    pub fn context(&self) -> &AuthenticationContext {
        &self.context
    }

    /// Returns the leased handshake state for updating.
    pub fn context_mut(&mut self) -> &mut AuthenticationContext {
        &mut self.context
    }

    /// Writes the updated attempt back and releases it.
    pub fn commit(mut self, challenge: Option<Challenge>) {
        self.store.slots().insert(
            self.key.clone(),
            Slot {
                attempt: Attempt {
                    context: self.context.clone(),
                    challenge,
                },
                leased: false,
            },
        );
        self.settled = true;
    }

    /// Removes the attempt, returning its final state.
    pub fn finish(mut self) -> AuthenticationContext {
        self.store.slots().remove(&self.key);
        self.settled = true;
        self.context.clone()
    }
}

impl Drop for AttemptLease<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(slot) = self.store.slots().get_mut(&self.key) {
            slot.leased = false;
        }
        warn!(session_key = %self.key, "login attempt released without settling");
    }
}

/// Application state shared by all handlers.
pub struct AppState {
    /// Registered authenticators.
    pub registry: AuthenticatorRegistry,
    /// Authenticator that starts new attempts.
    pub default_authenticator: String,
    /// Unfinished attempts.
    pub attempts: AttemptStore,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        registry: AuthenticatorRegistry,
        default_authenticator: impl Into<String>,
        attempt_ttl: Duration,
    ) -> Self {
        Self {
            registry,
            default_authenticator: default_authenticator.into(),
            attempts: AttemptStore::new(attempt_ttl),
        }
    }

    /// Looks up a registered authenticator.
    pub fn authenticator(
        &self,
        name: &str,
    ) -> Result<Arc<dyn ApplicationAuthenticator>, ServerError> {
        self.registry
            .get(name)
            .ok_or_else(|| ServerError::AuthenticatorNotFound {
                name: name.to_string(),
            })
    }
}
