//! In-process loopback channel.
//!
//! [`MemoryChannel`] is the kernel half, [`FrontendEnd`] the frontend half.
//! The frontend half can read what the kernel sent, deliver replies into the
//! kernel's handler, and close the channel the way a closed browser tab would.

use crate::channel::{KernelChannel, MessageHandler};
use crate::error::channel::ChannelError;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::{debug, trace};
use serde_json::Value;
use tokio::sync::mpsc;

type SharedHandler = Arc<dyn Fn(Value) + Send + Sync>;

struct Shared {
    attached: bool,
    open: AtomicBool,
    open_calls: AtomicUsize,
    sent: Mutex<Vec<Value>>,
    outbound_tx: mpsc::UnboundedSender<Value>,
    handler: RwLock<Option<SharedHandler>>,
}

/// Kernel half of an in-process channel.
#[derive(Clone)]
pub struct MemoryChannel {
    shared: Arc<Shared>,
}

/// Frontend half of an in-process channel.
pub struct FrontendEnd {
    shared: Arc<Shared>,
    outbound_rx: mpsc::UnboundedReceiver<Value>,
}

impl MemoryChannel {
    /// A connected kernel/frontend pair. The channel starts open.
    pub fn pair() -> (MemoryChannel, FrontendEnd) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            attached: true,
            open: AtomicBool::new(true),
            open_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            outbound_tx,
            handler: RwLock::new(None),
        });

        (
            MemoryChannel {
                shared: Arc::clone(&shared),
            },
            FrontendEnd {
                shared,
                outbound_rx,
            },
        )
    }

    /// A channel with no frontend counterpart (not running under a frontend).
    pub fn detached() -> MemoryChannel {
        let (outbound_tx, _) = mpsc::unbounded_channel();
        MemoryChannel {
            shared: Arc::new(Shared {
                attached: false,
                open: AtomicBool::new(true),
                open_calls: AtomicUsize::new(0),
                sent: Mutex::new(Vec::new()),
                outbound_tx,
                handler: RwLock::new(None),
            }),
        }
    }
}

impl KernelChannel for MemoryChannel {
    fn is_attached(&self) -> bool {
        self.shared.attached
    }

    async fn open(&self) -> Result<(), ChannelError> {
        self.shared.open_calls.fetch_add(1, Ordering::SeqCst);
        if !self.shared.open.swap(true, Ordering::SeqCst) {
            debug!("Memory channel reopened");
        }
        Ok(())
    }

    async fn send(&self, message: Value) -> Result<(), ChannelError> {
        if !self.shared.open.load(Ordering::SeqCst) {
            return Err(ChannelError::closed("memory channel closed by frontend"));
        }

        trace!("Memory channel send: {message}");
        self.shared
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());

        // Nobody listening on a detached channel; the message is dropped like a lost tab would.
        if self.shared.outbound_tx.send(message).is_err() {
            debug!("Memory channel has no frontend reader, message dropped");
        }
        Ok(())
    }

    fn on_message(&self, handler: MessageHandler) {
        *self
            .shared
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::from(handler));
    }
}

impl FrontendEnd {
    /// Next message the kernel sent, waiting if none is queued.
    pub async fn recv(&mut self) -> Option<Value> {
        self.outbound_rx.recv().await
    }

    /// Next queued message, if any.
    pub fn try_recv(&mut self) -> Option<Value> {
        self.outbound_rx.try_recv().ok()
    }

    /// Every message the kernel has sent so far, in order.
    pub fn sent_messages(&self) -> Vec<Value> {
        self.shared
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Deliver a payload to the kernel's handler.
    ///
    /// Returns `false` when no handler is registered (the message is dropped).
    pub fn deliver(&self, payload: Value) -> bool {
        let handler = self
            .shared
            .handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match handler {
            Some(handler) => {
                handler(payload);
                true
            }
            None => {
                debug!("No kernel handler registered, inbound message dropped");
                false
            }
        }
    }

    /// Close the channel, as when the frontend navigates away.
    pub fn close(&self) {
        self.shared.open.store(false, Ordering::SeqCst);
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    /// How many times the kernel called `open`.
    pub fn open_count(&self) -> usize {
        self.shared.open_calls.load(Ordering::SeqCst)
    }
}
