use crate::ballot::{self, Ballot};
use crate::messages::{Accept, Accepted, Decided, Prepare, Promise, Request, Response};
use crate::value::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Volatile acceptor memory for the current iteration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptorState {
    /// Highest ballot seen in a PREPARE or granted ACCEPT
    pub highest_seen: Ballot,
    /// Ballot of the last granted ACCEPT
    pub highest_accepted: Ballot,
    /// Value of the last granted ACCEPT
    pub accepted_value: Option<Value>,
}

impl AcceptorState {
    fn reset(&mut self, iteration: u64) {
        self.highest_seen = Ballot::initial(iteration);
        self.highest_accepted = Ballot::initial(iteration);
        self.accepted_value = None;
    }
}

impl Default for AcceptorState {
    fn default() -> AcceptorState {
        AcceptorState {
            highest_seen: Ballot::initial(0),
            highest_accepted: Ballot::initial(0),
            accepted_value: None,
        }
    }
}

/// Encoding of the Acceptor role.
///
/// State covers a single iteration. A PREPARE for a later iteration
/// discards everything learned about the earlier one; an ACCEPT never
/// triggers that reset.
#[derive(Default, Debug)]
pub struct Acceptor {
    state: AcceptorState,
    last_decided: Option<Value>,
}

impl Acceptor {
    pub fn new() -> Acceptor {
        Acceptor::default()
    }

    /// Current protocol state
    pub fn state(&self) -> &AcceptorState {
        &self.state
    }

    /// Value carried by the most recent DECIDED notification
    pub fn last_decided(&self) -> Option<&Value> {
        self.last_decided.as_ref()
    }

    /// Handler for a PREPARE message. The PROMISE reports the highest
    /// accepted ballot and value so the proposer can adopt it. Stale and
    /// duplicate PREPAREs are answered the same way.
    pub fn receive_prepare(&mut self, prepare: Prepare) -> Promise {
        let Prepare(ballot) = prepare;

        if ballot.iteration > self.state.highest_seen.iteration {
            debug!(
                "Observed iteration {} (was {}), resetting",
                ballot.iteration, self.state.highest_seen.iteration
            );
            self.state.reset(ballot.iteration);
        }

        self.state.highest_seen = ballot::max(self.state.highest_seen, ballot);
        trace!(
            "Promising {} with accepted {}",
            ballot,
            self.state.highest_accepted
        );

        Promise(
            self.state.highest_accepted,
            self.state.accepted_value.clone(),
        )
    }

    /// Handler for an ACCEPT message. The proposal is granted unless the
    /// ballot precedes the highest seen ballot. The reply always carries the
    /// highest accepted ballot, which equals the sent ballot only when granted.
    pub fn receive_accept(&mut self, accept: Accept) -> Accepted {
        let Accept(ballot, value) = accept;

        if !ballot.less(&self.state.highest_seen) {
            debug!("Accepting {} with value {}", ballot, value);
            self.state.highest_seen = ballot;
            self.state.highest_accepted = ballot;
            self.state.accepted_value = Some(value);
        } else {
            debug!(
                "Rejecting ACCEPT for {} because of greater {}",
                ballot, self.state.highest_seen
            );
        }

        Accepted(self.state.highest_accepted)
    }

    /// Handler for a DECIDED notification. Only recorded for observability.
    pub fn receive_decided(&mut self, decided: Decided) {
        let Decided(value) = decided;
        info!("Decided {}", value);
        self.last_decided = Some(value);
    }

    /// Dispatches a request to the matching handler.
    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::Prepare(prepare) => Response::Promise(self.receive_prepare(prepare)),
            Request::Accept(accept) => Response::Accepted(self.receive_accept(accept)),
            Request::Decided(decided) => {
                self.receive_decided(decided);
                Response::Ack
            }
        }
    }
}

/// Shared handle to an acceptor. Requests arriving from different
/// connections are serialized on the acceptor's lock.
#[derive(Clone, Default)]
pub struct SharedAcceptor {
    inner: Arc<Mutex<Acceptor>>,
}

impl SharedAcceptor {
    pub fn new(acceptor: Acceptor) -> SharedAcceptor {
        SharedAcceptor {
            inner: Arc::new(Mutex::new(acceptor)),
        }
    }

    /// Handles a single request under the lock.
    pub async fn handle(&self, request: Request) -> Response {
        self.inner.lock().await.handle(request)
    }

    /// Copy of the current protocol state
    pub async fn state(&self) -> AcceptorState {
        self.inner.lock().await.state().clone()
    }

    /// Value carried by the most recent DECIDED notification
    pub async fn last_decided(&self) -> Option<Value> {
        self.inner.lock().await.last_decided().cloned()
    }
}
