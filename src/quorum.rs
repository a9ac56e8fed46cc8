use crate::config::NodeId;
use crate::error::Result;
use crate::messages::{Request, Response};
use crate::transport::Transport;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Fans a request out to the membership and feeds replies to a handler
/// until the handler reports it is satisfied.
///
/// The first `quorum` targets are dispatched first, then the rest of the
/// membership. Replies are drained in dispatch order rather than arrival
/// order, so a slow early target delays the handling of faster later ones.
pub struct QuorumCollector<T> {
    transport: T,
    targets: Vec<NodeId>,
    quorum: usize,
    reply_timeout: Option<Duration>,
}

impl<T: Transport> QuorumCollector<T> {
    pub fn new(transport: T, targets: Vec<NodeId>, quorum: usize) -> QuorumCollector<T> {
        assert!(quorum > 0 && quorum <= targets.len());
        QuorumCollector {
            transport,
            targets,
            quorum,
            reply_timeout: None,
        }
    }

    /// Bounds the wait for each reply. An expired wait skips that target.
    pub fn with_reply_timeout(mut self, reply_timeout: Option<Duration>) -> QuorumCollector<T> {
        self.reply_timeout = reply_timeout;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn targets(&self) -> &[NodeId] {
        &self.targets
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    fn dispatch(&self, node: NodeId, request: Request) -> JoinHandle<Result<Response>> {
        let transport = self.transport.clone();
        tokio::spawn(async move { transport.call(node, request).await })
    }

    /// Sends `request` to every target and hands each reply to `on_reply`.
    ///
    /// Returns `Ok(true)` as soon as `on_reply` returns `Ok(true)`; requests
    /// still in flight at that point complete unobserved. Returns `Ok(false)`
    /// when every reply was drained (or timed out) without satisfying the
    /// handler. A transport failure on an awaited reply aborts the collection.
    pub async fn collect<F>(&self, request: Request, mut on_reply: F) -> Result<bool>
    where
        F: FnMut(NodeId, Response) -> Result<bool>,
    {
        let name = request.name();
        let (quorum, rest) = self.targets.split_at(self.quorum);
        let pending: Vec<(NodeId, JoinHandle<Result<Response>>)> = quorum
            .iter()
            .chain(rest.iter())
            .map(|&node| (node, self.dispatch(node, request.clone())))
            .collect();
        trace!("Dispatched {} to {} acceptors", name, pending.len());

        for (node, handle) in pending {
            let joined = match self.reply_timeout {
                Some(limit) => match timeout(limit, handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        warn!(
                            "Acceptor {} did not answer {} within {:?}",
                            node, name, limit
                        );
                        continue;
                    }
                },
                None => handle.await,
            };

            let response = joined??;
            trace!("Reply to {} from acceptor {}", name, node);
            if on_reply(node, response)? {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
