use crate::error::{Error, Result};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// A `NodeId` is a unique value that identifies an acceptor
/// within the configuration.
pub type NodeId = u32;

/// First port used by `Configuration::local`.
pub const PORT_BASE: u16 = 9000;

/// Upper bound on the number of proposers sharing the acceptors.
pub const MAX_PROPOSERS: u64 = u32::MAX as u64;

/// Configuration holds the static membership of acceptors and the
/// parameters of a proposer run.
#[derive(Clone, Debug)]
pub struct Configuration {
    acceptors: Vec<(NodeId, SocketAddr)>,
    iterations: u64,
    first_iteration: u64,
    reply_timeout: Option<Duration>,
    max_attempts: u32,
    identity: (u64, u64),
}

impl Configuration {
    /// Creates a new configuration. The iteration order of `acceptors`
    /// is kept: the first `quorum_size()` entries are contacted first.
    pub fn new<I>(acceptors: I) -> Result<Configuration>
    where
        I: IntoIterator<Item = (NodeId, SocketAddr)>,
    {
        let acceptors: Vec<(NodeId, SocketAddr)> = acceptors.into_iter().collect();
        if acceptors.is_empty() {
            return Err(Error::Config("membership is empty".into()));
        }
        if acceptors.len() % 2 == 0 {
            return Err(Error::Config(format!(
                "membership must have 2F+1 acceptors, got {}",
                acceptors.len()
            )));
        }
        for (i, (id, _)) in acceptors.iter().enumerate() {
            if acceptors[..i].iter().any(|(other, _)| other == id) {
                return Err(Error::Config(format!("duplicate acceptor id {}", id)));
            }
        }

        Ok(Configuration {
            acceptors,
            iterations: 10_000,
            first_iteration: 1,
            reply_timeout: None,
            max_attempts: 16,
            identity: (0, 1),
        })
    }

    /// `2f+1` acceptors on consecutive localhost ports starting at `port_base`,
    /// with ids `0..2f+1`.
    pub fn local(f: u16, port_base: u16) -> Result<Configuration> {
        let n = f
            .checked_mul(2)
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| Error::Config(format!("{} tolerated failures is too many", f)))?;
        if port_base.checked_add(n - 1).is_none() {
            return Err(Error::Config(format!(
                "{} acceptors do not fit in ports from {}",
                n, port_base
            )));
        }
        let ip = Ipv4Addr::LOCALHOST.into();
        Configuration::new(
            (0..n).map(|i| (u32::from(i), SocketAddr::new(ip, port_base + i))),
        )
    }

    /// Sets the number of iterations to decide before the run ends.
    pub fn with_iterations(mut self, iterations: u64) -> Configuration {
        self.iterations = iterations;
        self
    }

    /// Sets the iteration of the first proposal.
    pub fn with_first_iteration(mut self, iteration: u64) -> Configuration {
        self.first_iteration = iteration;
        self
    }

    /// Bounds each awaited reply. Without a timeout the proposer waits
    /// indefinitely for every acceptor it has to hear from.
    pub fn with_reply_timeout(mut self, timeout: Option<Duration>) -> Configuration {
        self.reply_timeout = timeout;
        self
    }

    /// Sets the number of attempts per iteration before giving up.
    pub fn with_max_attempts(mut self, attempts: u32) -> Result<Configuration> {
        if attempts == 0 {
            return Err(Error::Config("max attempts must be at least 1".into()));
        }
        self.max_attempts = attempts;
        Ok(self)
    }

    /// Identifies this proposer as `index` out of `proposers` so that
    /// ballots of different proposers never collide.
    pub fn with_identity(mut self, index: u64, proposers: u64) -> Result<Configuration> {
        if proposers == 0 || proposers > MAX_PROPOSERS || index >= proposers {
            return Err(Error::Config(format!(
                "proposer index {} out of range for {} proposers",
                index, proposers
            )));
        }
        self.identity = (index, proposers);
        Ok(self)
    }

    /// Size of quorum
    pub fn quorum_size(&self) -> usize {
        1 + (self.acceptors.len() / 2)
    }

    /// Number of failures tolerated, the `F` in `2F+1`.
    pub fn fault_tolerance(&self) -> usize {
        self.acceptors.len() / 2
    }

    /// Acceptor ids in contact order
    pub fn acceptors(&self) -> Vec<NodeId> {
        self.acceptors.iter().map(|(id, _)| *id).collect()
    }

    /// Gets the address of an acceptor.
    pub fn address(&self, node: NodeId) -> Option<SocketAddr> {
        self.acceptors
            .iter()
            .find(|(id, _)| *id == node)
            .map(|(_, addr)| *addr)
    }

    /// Membership as `(id, address)` pairs
    pub fn members(&self) -> &[(NodeId, SocketAddr)] {
        &self.acceptors
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn first_iteration(&self) -> u64 {
        self.first_iteration
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `(index, proposers)` of this proposer
    pub fn identity(&self) -> (u64, u64) {
        self.identity
    }
}
