//! Acceptor RPC over TCP.
//!
//! Each frame is a big-endian `u32` length followed by a bincode encoded
//! `Request` or `Response`. A connection carries one request at a time.
use crate::acceptor::SharedAcceptor;
use crate::config::{Configuration, NodeId};
use crate::error::{Error, Result};
use crate::messages::{Request, Response};
use crate::transport::Transport;
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

/// Frames larger than this are treated as corrupt.
const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

async fn write_frame<W>(w: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "frame too large"))?;
    w.write_u32(len).await?;
    w.write_all(payload).await?;
    w.flush().await
}

async fn read_frame<R>(r: &mut R) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let len = r.read_u32().await?;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", len),
        ));
    }
    let mut buf = vec![0; len as usize];
    r.read_exact(&mut buf).await?;
    Ok(buf)
}

async fn round_trip(stream: &mut TcpStream, payload: &[u8]) -> io::Result<Vec<u8>> {
    write_frame(stream, payload).await?;
    read_frame(stream).await
}

/// Transport holding one connection per acceptor.
#[derive(Clone)]
pub struct TcpTransport {
    connections: Arc<HashMap<NodeId, Arc<Mutex<TcpStream>>>>,
}

impl TcpTransport {
    /// Dials every acceptor of the membership. Fails on the first
    /// acceptor that cannot be reached.
    pub async fn connect(config: &Configuration) -> Result<TcpTransport> {
        let mut connections = HashMap::new();
        for &(node, addr) in config.members() {
            let stream = TcpStream::connect(addr)
                .await
                .map_err(|source| Error::Io { node, source })?;
            stream
                .set_nodelay(true)
                .map_err(|source| Error::Io { node, source })?;
            debug!("Connected to acceptor {} at {}", node, addr);
            connections.insert(node, Arc::new(Mutex::new(stream)));
        }
        Ok(TcpTransport {
            connections: Arc::new(connections),
        })
    }
}

impl Transport for TcpTransport {
    fn call(
        &self,
        node: NodeId,
        request: Request,
    ) -> impl Future<Output = Result<Response>> + Send {
        let connection = self.connections.get(&node).cloned();
        async move {
            let connection = connection.ok_or(Error::UnknownAcceptor(node))?;
            let payload = bincode::serialize(&request)?;
            let reply = {
                let mut stream = connection.lock().await;
                round_trip(&mut stream, &payload)
                    .await
                    .map_err(|source| Error::Io { node, source })?
            };
            Ok(bincode::deserialize(&reply)?)
        }
    }
}

/// Binds the acceptor's listening socket.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })
}

/// Serves acceptor requests on every connection accepted by `listener`.
/// Never returns; failed accepts are logged and skipped.
pub async fn serve(listener: TcpListener, acceptor: SharedAcceptor) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Error accepting connection: {}", e);
                continue;
            }
        };
        debug!("Accepted connection from {}", peer);

        let acceptor = acceptor.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, acceptor).await {
                warn!("Connection from {} failed: {}", peer, e);
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, acceptor: SharedAcceptor) -> io::Result<()> {
    stream.set_nodelay(true)?;
    loop {
        let frame = match read_frame(&mut stream).await {
            Ok(frame) => frame,
            Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        };
        let request: Request = bincode::deserialize(&frame)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        trace!("Received {}", request.name());

        let response = acceptor.handle(request).await;
        let payload = bincode::serialize(&response)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        write_frame(&mut stream, &payload).await?;
    }
}
