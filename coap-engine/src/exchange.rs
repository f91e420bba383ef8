// Copyright 2019 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The per-conversation state object and the key types used to look it up.

use crate::block::BlockInfo;
use crate::message::{MsgId, MsgToken, OwnedImmutableMessage};
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Opaque handle identifying one [`Exchange`] among all those an endpoint is
/// currently tracking. Only used for logging and test assertions; matching
/// itself always goes through [`KeyId`]/[`KeyToken`]/[`KeyUri`].
pub type ExchangeId = u64;

/// Identifies the underlying transport session a message traveled on, so
/// that message IDs from two different DTLS sessions (or two different
/// multicast groups) never collide in the matcher's tables. Plain UDP
/// channels use session `0` for every peer.
pub type SessionId = u64;

static NEXT_EXCHANGE_ID: AtomicU64 = AtomicU64::new(1);

fn next_exchange_id() -> ExchangeId {
    NEXT_EXCHANGE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Which side of the conversation minted this exchange.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Origin {
    /// This endpoint sent the first request.
    Local,
    /// A remote endpoint sent the first request; we are the server here.
    Remote,
}

/// Why an exchange completed without a normal response, so a caller can
/// tell a retransmit timeout, a peer-sent reset, and an ordinary multicast
/// completion apart instead of seeing the same bare `current_response() ==
/// None`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ExchangeFailure {
    /// `max_retransmit` confirmable retries were sent without an ACK, RST,
    /// or response ever arriving.
    TransmissionTimeout,
    /// The peer sent an RST, explicitly declining the exchange.
    Rejected,
}

/// Key identifying a specific wire message under reliability: ACK/RST are
/// matched back to a request by `(id, remote, session)`. `remote` is `None`
/// for IDs minted locally, since a locally-minted ID is matched against
/// whatever peer eventually replies.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct KeyId {
    pub id: MsgId,
    pub remote: Option<SocketAddr>,
    pub session: SessionId,
}

/// Key identifying the logical owner of a response: tokens are namespaced
/// per endpoint and unique among outstanding outbound exchanges.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct KeyToken {
    pub token: MsgToken,
}

/// Key identifying a blockwise transfer in progress across multiple request
/// blocks, scoped by request URI and remote address.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct KeyUri {
    pub uri: String,
    pub remote: SocketAddr,
}

/// Reassembly state for one direction (request or response) of a blockwise
/// transfer: the body bytes accumulated so far and the most recent block
/// descriptor seen, so the blockwise layer can tell whether the next
/// arriving block is the one it's expecting.
#[derive(Debug, Default)]
pub struct BlockAssembly {
    pub buffer: Vec<u8>,
    pub last_block: Option<BlockInfo>,
}

/// The per-conversation state object that ties together a request, its
/// response (or responses, if blockwise or observed), and the bookkeeping
/// the matcher and stack layers need to drive it to completion.
///
/// Exchanges are created by the [`crate::matcher::Matcher`] — either when a
/// fresh inbound request arrives with no match, or when a client initiates a
/// send — and are destroyed when a final response is delivered, the
/// exchange's lifetime expires, or an RST terminates it. "Destroyed" here
/// means de-indexed from the matcher's tables; the `Arc<Exchange>` itself is
/// dropped once the last reference (usually a timer future) goes away.
pub struct Exchange {
    id: ExchangeId,
    origin: Origin,
    request: Mutex<Option<OwnedImmutableMessage>>,
    current_request: Mutex<Option<OwnedImmutableMessage>>,
    current_response: Mutex<Option<OwnedImmutableMessage>>,
    request_block_assembly: Mutex<Option<BlockAssembly>>,
    response_block_assembly: Mutex<Option<BlockAssembly>>,
    observe_sequence: Mutex<Option<u32>>,
    observing: AtomicBool,
    created_at: Instant,
    complete: AtomicBool,
    multicast: AtomicBool,
    on_complete: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
    failure: Mutex<Option<ExchangeFailure>>,
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("complete", &self.is_complete())
            .field("age", &self.age())
            .finish()
    }
}

impl Exchange {
    /// Creates a fresh, incomplete exchange for the given origin, with no
    /// request attached yet.
    pub fn new(origin: Origin) -> Self {
        Exchange {
            id: next_exchange_id(),
            origin,
            request: Mutex::new(None),
            current_request: Mutex::new(None),
            current_response: Mutex::new(None),
            request_block_assembly: Mutex::new(None),
            response_block_assembly: Mutex::new(None),
            observe_sequence: Mutex::new(None),
            observing: AtomicBool::new(false),
            created_at: Instant::now(),
            complete: AtomicBool::new(false),
            multicast: AtomicBool::new(false),
            on_complete: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    /// Creates an exchange for the given origin with `request` as its first
    /// request already attached.
    pub fn new_with_request(origin: Origin, request: OwnedImmutableMessage) -> Self {
        let exchange = Exchange::new(origin);
        *exchange.request.lock().expect("request lock poisoned") = Some(request.clone());
        *exchange
            .current_request
            .lock()
            .expect("current_request lock poisoned") = Some(request);
        exchange
    }

    /// Convenience constructor for unit tests that don't care about the
    /// attached request, only about identity and completion semantics.
    #[doc(hidden)]
    pub fn new_for_test(origin: Origin) -> Self {
        Exchange::new(origin)
    }

    pub fn id(&self) -> ExchangeId {
        self.id
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }

    /// How long ago this exchange was created.
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// The first request of this exchange, if one has been attached.
    pub fn request(&self) -> Option<OwnedImmutableMessage> {
        self.request.lock().expect("request lock poisoned").clone()
    }

    /// The most recent request block (identical to `request()` for
    /// non-blockwise exchanges).
    pub fn current_request(&self) -> Option<OwnedImmutableMessage> {
        self.current_request
            .lock()
            .expect("current_request lock poisoned")
            .clone()
    }

    pub fn set_current_request(&self, request: OwnedImmutableMessage) {
        *self
            .current_request
            .lock()
            .expect("current_request lock poisoned") = Some(request);
    }

    /// The most recent response block sent or received on this exchange.
    pub fn current_response(&self) -> Option<OwnedImmutableMessage> {
        self.current_response
            .lock()
            .expect("current_response lock poisoned")
            .clone()
    }

    pub fn set_current_response(&self, response: OwnedImmutableMessage) {
        *self
            .current_response
            .lock()
            .expect("current_response lock poisoned") = Some(response);
    }

    pub fn clear_current_response(&self) {
        *self
            .current_response
            .lock()
            .expect("current_response lock poisoned") = None;
    }

    /// Runs `f` against this exchange's request-body reassembly state,
    /// creating it on first use.
    pub fn with_request_assembly<R>(&self, f: impl FnOnce(&mut BlockAssembly) -> R) -> R {
        let mut guard = self
            .request_block_assembly
            .lock()
            .expect("request_block_assembly lock poisoned");
        f(guard.get_or_insert_with(BlockAssembly::default))
    }

    /// Runs `f` against this exchange's response-body reassembly state,
    /// creating it on first use.
    pub fn with_response_assembly<R>(&self, f: impl FnOnce(&mut BlockAssembly) -> R) -> R {
        let mut guard = self
            .response_block_assembly
            .lock()
            .expect("response_block_assembly lock poisoned");
        f(guard.get_or_insert_with(BlockAssembly::default))
    }

    /// The observe notification sequence last assigned on this exchange, if
    /// it is bound to an observe relation.
    pub fn observe_sequence(&self) -> Option<u32> {
        *self
            .observe_sequence
            .lock()
            .expect("observe_sequence lock poisoned")
    }

    /// Assigns the next 24-bit observe sequence number, wrapping per RFC 7641.
    pub fn next_observe_sequence(&self) -> u32 {
        let mut guard = self
            .observe_sequence
            .lock()
            .expect("observe_sequence lock poisoned");
        let next = guard.map(|v| (v + 1) & 0x00FF_FFFF).unwrap_or(0);
        *guard = Some(next);
        next
    }

    /// True once this exchange has been bound to an observe relation by the
    /// resource tree. The stack's observe layer consults this to decide
    /// whether to stamp an outgoing response with a sequence number.
    pub fn is_observing(&self) -> bool {
        self.observing.load(Ordering::Acquire)
    }

    pub fn set_observing(&self, value: bool) {
        self.observing.store(value, Ordering::Release);
    }

    pub fn is_multicast(&self) -> bool {
        self.multicast.load(Ordering::Acquire)
    }

    pub fn set_multicast(&self, value: bool) {
        self.multicast.store(value, Ordering::Release);
    }

    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    /// Registers a callback to run exactly once, the first time this
    /// exchange completes. If the exchange is already complete, `hook` runs
    /// immediately instead of being queued.
    pub fn on_complete(&self, hook: impl FnOnce() + Send + 'static) {
        if self.is_complete() {
            hook();
            return;
        }
        self.on_complete
            .lock()
            .expect("on_complete lock poisoned")
            .push(Box::new(hook));
    }

    /// Marks this exchange complete and runs every registered completion
    /// hook exactly once. Calling this more than once is harmless; only the
    /// first call runs the hooks.
    pub fn complete(&self) {
        if self.complete.swap(true, Ordering::AcqRel) {
            return;
        }
        let hooks = std::mem::take(
            &mut *self.on_complete.lock().expect("on_complete lock poisoned"),
        );
        for hook in hooks {
            hook();
        }
    }

    /// The reason this exchange failed, if [`Exchange::fail`] was ever
    /// called on it. `None` for an exchange that is still open, or that
    /// completed normally via [`Exchange::complete`].
    pub fn failure_reason(&self) -> Option<ExchangeFailure> {
        *self.failure.lock().expect("failure lock poisoned")
    }

    /// Marks this exchange complete with an attached failure reason, for
    /// callers that need to tell a timeout from a rejection instead of just
    /// seeing a missing response. Only the first call's reason sticks;
    /// subsequent calls (to `fail` or `complete`) are the same no-op they
    /// always were.
    pub fn fail(&self, reason: ExchangeFailure) {
        let mut failure = self.failure.lock().expect("failure lock poisoned");
        if failure.is_none() {
            *failure = Some(reason);
        }
        drop(failure);
        self.complete();
    }

    /// Builds a fresh, independent exchange representing one multicast reply
    /// to this exchange's request. Per-reply state (current response, block
    /// assembly) starts empty; the request and origin are shared.
    pub fn clone_for_multicast_reply(&self) -> Exchange {
        let clone = Exchange::new(self.origin);
        *clone.request.lock().expect("request lock poisoned") = self.request();
        *clone
            .current_request
            .lock()
            .expect("current_request lock poisoned") = self.current_request();
        clone.set_multicast(true);
        clone
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_hooks_run_exactly_once() {
        let exchange = Exchange::new(Origin::Local);
        let count = std::sync::Arc::new(AtomicU64::new(0));
        let count_clone = std::sync::Arc::clone(&count);
        exchange.on_complete(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        exchange.complete();
        exchange.complete();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hook_registered_after_completion_runs_immediately() {
        let exchange = Exchange::new(Origin::Remote);
        exchange.complete();
        let ran = std::sync::Arc::new(AtomicBool::new(false));
        let ran_clone = std::sync::Arc::clone(&ran);
        exchange.on_complete(move || ran_clone.store(true, Ordering::SeqCst));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn fail_sets_reason_and_completes_exchange() {
        let exchange = Exchange::new(Origin::Local);
        assert_eq!(exchange.failure_reason(), None);
        exchange.fail(ExchangeFailure::TransmissionTimeout);
        assert!(exchange.is_complete());
        assert_eq!(exchange.failure_reason(), Some(ExchangeFailure::TransmissionTimeout));
    }

    #[test]
    fn first_failure_reason_wins() {
        let exchange = Exchange::new(Origin::Remote);
        exchange.fail(ExchangeFailure::Rejected);
        exchange.fail(ExchangeFailure::TransmissionTimeout);
        assert_eq!(exchange.failure_reason(), Some(ExchangeFailure::Rejected));
    }

    #[test]
    fn observe_sequence_wraps_at_24_bits() {
        let exchange = Exchange::new(Origin::Remote);
        assert_eq!(exchange.next_observe_sequence(), 0);
        assert_eq!(exchange.next_observe_sequence(), 1);
    }
}
