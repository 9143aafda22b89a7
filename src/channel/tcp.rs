//! A [`Channel`] over a TCP stream using length-prefixed frames.
use std::{io, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tracing::trace;

use super::Channel;

/// A channel over a connected [`TcpStream`].
///
/// Every message is sent as a big-endian `u64` length followed by the payload.
#[derive(Debug)]
pub struct TcpChannel {
    stream: TcpStream,
    timeout: Option<Duration>,
}

/// The error raised by `recv` calls of a [`TcpChannel`].
#[derive(Debug)]
pub enum TcpRecvError {
    /// Reading from the socket failed.
    Io(io::Error),
    /// No message was received before the timeout.
    TimeoutElapsed,
}

impl TcpChannel {
    /// Wraps a connected stream. Receive calls fail after `timeout` if one is given.
    pub fn new(stream: TcpStream, timeout: Option<Duration>) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        Ok(Self { stream, timeout })
    }

    async fn read_frame(&mut self) -> io::Result<Vec<u8>> {
        let len = self.stream.read_u64().await?;
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "frame too large"))?;
        let mut msg = vec![0; len];
        self.stream.read_exact(&mut msg).await?;
        Ok(msg)
    }
}

impl Channel for TcpChannel {
    type SendError = io::Error;
    type RecvError = TcpRecvError;

    async fn send_bytes(&mut self, msg: Vec<u8>) -> Result<(), io::Error> {
        trace!(bytes = msg.len(), "sending tcp frame");
        self.stream.write_u64(msg.len() as u64).await?;
        self.stream.write_all(&msg).await?;
        self.stream.flush().await
    }

    async fn recv_bytes(&mut self) -> Result<Vec<u8>, TcpRecvError> {
        match self.timeout {
            Some(limit) => match timeout(limit, self.read_frame()).await {
                Ok(res) => res.map_err(TcpRecvError::Io),
                Err(_) => Err(TcpRecvError::TimeoutElapsed),
            },
            None => self.read_frame().await.map_err(TcpRecvError::Io),
        }
    }
}
