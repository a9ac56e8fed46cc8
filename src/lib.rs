//! Iterated single-decree Paxos.
//!
//! A single proposer agrees with `2F+1` acceptors on one value per
//! iteration, then immediately starts the next iteration, for a configured
//! number of iterations. Acceptor state is kept in memory only and every
//! participant is assumed to stay reachable.
//!
//! # Examples
//!
//! ```rust,no_run
//! use iterpaxos::{Configuration, IterationDriver, RandomValues, TcpTransport};
//!
//! # async fn run() -> iterpaxos::Result<()> {
//! let config = Configuration::local(1, 9000)?.with_iterations(100);
//! let transport = TcpTransport::connect(&config).await?;
//!
//! let summary = IterationDriver::new(&config, transport, RandomValues).run().await?;
//! println!("{} decisions/s", summary.throughput());
//! # Ok(())
//! # }
//! ```
#[macro_use]
extern crate log;

pub mod acceptor;
pub mod ballot;
pub mod config;
pub mod driver;
mod error;
pub mod messages;
pub mod net;
pub mod proposer;
pub mod quorum;
pub mod transport;
pub mod value;

pub use acceptor::{Acceptor, AcceptorState, SharedAcceptor};
pub use ballot::Ballot;
pub use config::{Configuration, NodeId};
pub use driver::{IterationDriver, RunSummary};
pub use error::{Error, Result};
pub use net::TcpTransport;
pub use proposer::{Decision, Phase, Proposer};
pub use quorum::QuorumCollector;
pub use transport::{LocalTransport, Transport};
pub use value::{RandomValues, Value, ValueSource};
