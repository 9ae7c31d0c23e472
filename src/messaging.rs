//! Message queues and cross-thread delivery of low-level hook calls.

use std::sync::Weak;
use std::sync::mpsc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::handle_table::HookHandle;
use crate::hook_type::HookType;
use crate::param::HookParam;
use crate::process::Caller;
use crate::subsystem::HookSubsystem;

/// A hook call forwarded to the thread owning the target hook.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct HookRequest {
    pub target: HookHandle,
    pub hook_type: HookType,
    pub code: i32,
    pub w_param: usize,
    pub l_param: usize,
    /// Already marshalled from the original caller's memory.
    pub param: HookParam,
}

#[derive(Error, Copy, Clone, Eq, PartialEq, Debug)]
pub enum SendError {
    #[error("the receiving thread did not answer in time")]
    Timeout,
    #[error("the receiving message queue is gone")]
    QueueGone,
}

/// The message queue of a UI thread, as far as hook delivery is concerned.
pub trait MessageQueue: Send + Sync {
    /// Posts `request` to the queue's thread and blocks until it answers or `timeout` elapses.
    fn send_hook_request(
        &self,
        request: HookRequest,
        timeout: Duration,
    ) -> Result<isize, SendError>;
}

type Envelope = (HookRequest, mpsc::Sender<isize>);

/// Sending half of a channel based [`MessageQueue`].
#[derive(Debug)]
pub struct ChannelQueue {
    sender: mpsc::Sender<Envelope>,
}

impl MessageQueue for ChannelQueue {
    fn send_hook_request(
        &self,
        request: HookRequest,
        timeout: Duration,
    ) -> Result<isize, SendError> {
        let (reply_sender, reply_receiver) = mpsc::channel();
        self.sender
            .send((request, reply_sender))
            .map_err(|_| SendError::QueueGone)?;
        reply_receiver.recv_timeout(timeout).map_err(|err| match err {
            mpsc::RecvTimeoutError::Timeout => SendError::Timeout,
            mpsc::RecvTimeoutError::Disconnected => SendError::QueueGone,
        })
    }
}

/// Receiving half of a channel based [`MessageQueue`], serviced by the owning thread.
#[derive(Debug)]
pub struct HookRequestReceiver {
    receiver: mpsc::Receiver<Envelope>,
}

impl HookRequestReceiver {
    /// Answers forwarded hook requests until every [`ChannelQueue`] is dropped or the subsystem goes away.
    ///
    /// Must run on the thread identified by `owner`.
    pub fn run(self, subsystem: Weak<HookSubsystem>, owner: Caller) {
        while let Ok((request, reply)) = self.receiver.recv() {
            let Some(subsystem) = subsystem.upgrade() else {
                break;
            };
            answer(&subsystem, &owner, request, reply);
        }
    }

    /// Answers a single pending request without blocking. Returns whether one was handled.
    pub fn try_process_one(&self, subsystem: &HookSubsystem, owner: &Caller) -> bool {
        match self.receiver.try_recv() {
            Ok((request, reply)) => {
                answer(subsystem, owner, request, reply);
                true
            }
            Err(_) => false,
        }
    }
}

fn answer(
    subsystem: &HookSubsystem,
    owner: &Caller,
    request: HookRequest,
    reply: mpsc::Sender<isize>,
) {
    let target = request.target;
    let result = subsystem.process_hook_request(owner, request);
    if reply.send(result).is_err() {
        debug!(thread = %owner.thread, ?target, "hook request answered after sender gave up");
    }
}

/// Creates a message queue whose hook requests are answered through the returned receiver.
pub fn channel_queue() -> (ChannelQueue, HookRequestReceiver) {
    let (sender, receiver) = mpsc::channel();
    (
        ChannelQueue { sender },
        HookRequestReceiver { receiver },
    )
}
