use crate::acceptor::SharedAcceptor;
use crate::config::NodeId;
use crate::error::{Error, Result};
use crate::messages::{Request, Response};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Request/response messaging to acceptors.
///
/// Awaiting `call` is a synchronous call; spawning the returned future
/// gives an asynchronous call whose reply is collected later.
pub trait Transport: Clone + Send + Sync + 'static {
    /// Invoke `request` on acceptor `node` and wait for its reply.
    fn call(&self, node: NodeId, request: Request)
        -> impl Future<Output = Result<Response>> + Send;
}

/// Transport to acceptors living in the same process.
#[derive(Clone, Default)]
pub struct LocalTransport {
    acceptors: Arc<HashMap<NodeId, SharedAcceptor>>,
}

impl LocalTransport {
    pub fn new<I>(acceptors: I) -> LocalTransport
    where
        I: IntoIterator<Item = (NodeId, SharedAcceptor)>,
    {
        LocalTransport {
            acceptors: Arc::new(acceptors.into_iter().collect()),
        }
    }

    /// Handle to an acceptor, for inspection.
    pub fn acceptor(&self, node: NodeId) -> Option<&SharedAcceptor> {
        self.acceptors.get(&node)
    }
}

impl Transport for LocalTransport {
    fn call(
        &self,
        node: NodeId,
        request: Request,
    ) -> impl Future<Output = Result<Response>> + Send {
        let acceptor = self.acceptors.get(&node).cloned();
        async move {
            match acceptor {
                Some(acceptor) => Ok(acceptor.handle(request).await),
                None => Err(Error::UnknownAcceptor(node)),
            }
        }
    }
}
