//! Messages exchanged between the proposer and the acceptors.
use crate::ballot::Ballot;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// `PREPARE` message is the Phase 1a message from the proposer sent
/// to acceptors to learn what, if anything, has been accepted for
/// the ballot's iteration.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug)]
pub struct Prepare(pub Ballot);

/// `PROMISE` is the Phase 1b reply to `PREPARE`. It carries the acceptor's
/// highest accepted ballot and the value accepted under it, if any.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Promise(pub Ballot, pub Option<Value>);

/// `ACCEPT` message is the Phase 2a message from the proposer sent
/// to acceptors to accept a value. The `ACCEPT` message is predicated
/// on the proposer receiving quorum from Phase 1.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Accept(pub Ballot, pub Value);

/// `ACCEPTED` is the Phase 2b reply to `ACCEPT`, carrying the acceptor's
/// highest accepted ballot after handling the request. A ballot different
/// from the one sent means the proposal was not granted.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug)]
pub struct Accepted(pub Ballot);

/// `DECIDED` is broadcast once a quorum accepted the value.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Decided(pub Value);

/// Remote procedure invoked on an acceptor.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub enum Request {
    Prepare(Prepare),
    Accept(Accept),
    Decided(Decided),
}

/// Reply from an acceptor, one variant per `Request` variant.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub enum Response {
    Promise(Promise),
    Accepted(Accepted),
    Ack,
}

impl Request {
    /// Name of the procedure, used in logs.
    pub fn name(&self) -> &'static str {
        match *self {
            Request::Prepare(_) => "Prepare",
            Request::Accept(_) => "Accept",
            Request::Decided(_) => "Decided",
        }
    }
}
