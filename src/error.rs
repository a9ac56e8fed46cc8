use crate::config::NodeId;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors surfaced by the proposer, the transports and configuration.
///
/// Rejections by acceptors are not errors; they surface as replies
/// that do not count toward a quorum.
#[derive(Error, Debug)]
pub enum Error {
    #[error("transport failure talking to acceptor {node}: {source}")]
    Io {
        node: NodeId,
        #[source]
        source: io::Error,
    },

    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("acceptor {node} answered {request} with an unexpected reply")]
    UnexpectedResponse { node: NodeId, request: &'static str },

    #[error("no acceptor with id {0} in the membership")]
    UnknownAcceptor(NodeId),

    #[error("fan-out task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("iteration {iteration} did not reach quorum after {attempts} attempts")]
    NoQuorum { iteration: u64, attempts: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
