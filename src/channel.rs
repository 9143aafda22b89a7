//! Point-to-point communication channels used to send/receive messages to/from another party.
//!
//! A [`Channel`] connects exactly two parties and delivers whole messages in
//! order. The typed layer on top of it is the
//! [`CommunicationAgent`](crate::agent::CommunicationAgent).

use std::{fmt, future::Future, time::Duration};

use thiserror::Error;
use tokio::{
    sync::mpsc::{Receiver, Sender, channel, error::SendError},
    time::timeout,
};
use tracing::trace;

mod tcp;

pub use tcp::{TcpChannel, TcpRecvError};

/// Errors related to sending / receiving / (de-)serializing messages.
#[derive(Debug, Error)]
#[error("{reason} (during {phase})")]
pub struct Error {
    /// The protocol phase during which the error occurred.
    pub phase: String,
    /// The specific error that was raised.
    pub reason: ErrorKind,
}

/// The specific error that occurred when trying to send / receive a message.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// The (serialized) message could not be received over the channel.
    #[error("could not receive message: {0}")]
    RecvError(String),
    /// The (serialized) message could not be sent over the channel.
    #[error("could not send message: {0}")]
    SendError(String),
    /// The message could not be (de-)serialized.
    #[error("could not (de-)serialize message: {0}")]
    SerdeError(String),
    /// The message does not have the expected length.
    #[error("expected a message of length {expected}, got {actual}")]
    InvalidLength {
        /// The expected length.
        expected: usize,
        /// The length of the received message.
        actual: usize,
    },
    /// The message was well-formed but its contents are invalid for the protocol.
    #[error("received invalid protocol data")]
    InvalidData,
    /// No connection to the peer could be established.
    #[error("could not connect: {0}")]
    ConnectError(String),
}

/// A communication channel used to send/receive messages to/from one other party.
///
/// Implementations must deliver messages reliably and in order.
pub trait Channel {
    /// The error that can occur sending messages over the channel.
    type SendError: fmt::Debug;
    /// The error that can occur receiving messages over the channel.
    type RecvError: fmt::Debug;

    /// Sends a message to the other party.
    fn send_bytes(
        &mut self,
        msg: Vec<u8>,
    ) -> impl Future<Output = Result<(), Self::SendError>> + Send;

    /// Awaits the next message from the other party.
    fn recv_bytes(&mut self) -> impl Future<Output = Result<Vec<u8>, Self::RecvError>> + Send;
}

/// An in-process channel using [`Sender`] and [`Receiver`].
#[derive(Debug)]
pub struct MemoryChannel {
    s: Sender<Vec<u8>>,
    r: Receiver<Vec<u8>>,
    timeout: Option<Duration>,
}

impl MemoryChannel {
    /// Creates both ends of a connected channel.
    pub fn pair() -> (Self, Self) {
        Self::pair_with_timeout(None)
    }

    /// Creates both ends of a connected channel, receive calls fail after `timeout`.
    pub fn pair_with_timeout(timeout: Option<Duration>) -> (Self, Self) {
        let buffer_capacity = 1024;
        let (send_a_to_b, recv_a_to_b) = channel(buffer_capacity);
        let (send_b_to_a, recv_b_to_a) = channel(buffer_capacity);
        let a = MemoryChannel {
            s: send_a_to_b,
            r: recv_b_to_a,
            timeout,
        };
        let b = MemoryChannel {
            s: send_b_to_a,
            r: recv_a_to_b,
            timeout,
        };
        (a, b)
    }
}

#[derive(Debug)]
/// The error raised by `recv` calls of a [`MemoryChannel`].
pub enum AsyncRecvError {
    /// The channel has been closed.
    Closed,
    /// No message was received before the timeout.
    TimeoutElapsed,
}

impl Channel for MemoryChannel {
    type SendError = SendError<Vec<u8>>;
    type RecvError = AsyncRecvError;

    async fn send_bytes(&mut self, msg: Vec<u8>) -> Result<(), SendError<Vec<u8>>> {
        trace!(bytes = msg.len(), "sending in-memory message");
        self.s.send(msg).await
    }

    async fn recv_bytes(&mut self) -> Result<Vec<u8>, AsyncRecvError> {
        let msg = match self.timeout {
            Some(limit) => match timeout(limit, self.r.recv()).await {
                Ok(msg) => msg,
                Err(_) => return Err(AsyncRecvError::TimeoutElapsed),
            },
            None => self.r.recv().await,
        };
        msg.ok_or(AsyncRecvError::Closed)
    }
}
