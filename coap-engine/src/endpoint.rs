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

//! Composes [`Channel`], [`Matcher`], [`Stack`], [`Executor`], and
//! [`ResourceTree`] into the single object applications drive: start it,
//! send requests through it, and let it route inbound datagrams to
//! resources on its own.

use crate::channel::Channel;
use crate::codec::{decode_message, encode_message, DecodedMessage};
use crate::config::Config;
use crate::exchange::{Exchange, Origin};
use crate::executor::Executor;
use crate::matcher::{Matcher, RequestDisposition};
use crate::message::{MessageRead, MsgCode, MsgToken, MsgType, OwnedImmutableMessage};
use crate::resource::{Delivery, Resource, ResourceTree};
use crate::stack::{ReceivedRequest, ReceivedResponse, Stack};
use crate::Error;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// A CoAP client/server endpoint bound to one [`Channel`].
///
/// `Endpoint` owns every long-lived collaborator (`Matcher`, `Stack`,
/// `Executor`, `ResourceTree`) and is the thing applications hold: resource
/// handlers, observers, and outbound requests all go through it. The
/// protocol-level bookkeeping itself lives one layer down, in [`Matcher`]
/// and [`Stack`], which `Endpoint` only orchestrates.
pub struct Endpoint {
    channel: Arc<dyn Channel>,
    matcher: Arc<Matcher>,
    stack: Stack,
    executor: Arc<dyn Executor>,
    resources: ResourceTree,
    dedup_sweep_interval: Duration,
    running: AtomicBool,
    receive_thread: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("matcher", &self.matcher)
            .field("stack", &self.stack)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Endpoint {
    /// Builds an endpoint over `channel`, not yet started. `resources` is
    /// the tree inbound requests are routed against; pass an empty
    /// [`Resource`] root for a client-only endpoint.
    pub fn new(
        channel: Arc<dyn Channel>,
        executor: Arc<dyn Executor>,
        config: &Config,
        root: Resource,
    ) -> Self {
        Endpoint {
            channel,
            matcher: Arc::new(Matcher::new(config)),
            stack: Stack::new(config),
            executor,
            resources: ResourceTree::new(root),
            dedup_sweep_interval: config.mark_and_sweep_interval,
            running: AtomicBool::new(false),
            receive_thread: Mutex::new(None),
        }
    }

    pub fn resources(&self) -> &ResourceTree {
        &self.resources
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        self.channel.local_addr()
    }

    /// Binds the channel and begins routing inbound datagrams on a
    /// dedicated thread that posts decoded work onto the executor. Calling
    /// `start` twice without an intervening `stop` is a no-op.
    pub fn start(self: &Arc<Self>) -> Result<(), Error> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.channel.start()?;

        let endpoint = Arc::clone(self);
        let handle = std::thread::Builder::new()
            .name("coap-engine-receive".into())
            .spawn(move || endpoint.receive_loop())
            .map_err(|_| Error::IOError)?;

        *self.receive_thread.lock().expect("receive_thread lock poisoned") = Some(handle);

        // Handed off to its own thread rather than spawned directly here: an
        // `Executor` is free to run a task inline on the calling thread (see
        // `InlineExecutor`), and this task runs for as long as the endpoint
        // does, so calling `executor.spawn` from `start` itself would block
        // the caller under that executor instead of returning.
        let endpoint = Arc::clone(self);
        let executor = Arc::clone(&self.executor);
        std::thread::Builder::new()
            .name("coap-engine-dedup-sweep".into())
            .spawn(move || {
                executor.spawn(Box::pin(async move {
                    endpoint.run_deduplicator_maintenance().await;
                }));
            })
            .map_err(|_| Error::IOError)?;

        Ok(())
    }

    /// Periodically evicts stale deduplicator entries so the matcher's
    /// tables don't grow without bound: `sweep_deduplicator` for
    /// `MarkAndSweep`, `rotate_deduplicator` for `CropRotation` (each is a
    /// no-op under the other's configured strategy, and under `Noop`).
    async fn run_deduplicator_maintenance(self: Arc<Self>) {
        while self.is_running() {
            futures_timer::Delay::new(self.dedup_sweep_interval).await;
            if !self.is_running() {
                break;
            }
            self.matcher.sweep_deduplicator();
            self.matcher.rotate_deduplicator();
        }
    }

    /// Stops accepting datagrams and joins the receive thread. Calling
    /// `stop` twice, or before `start`, is a no-op.
    pub fn stop(&self) -> Result<(), Error> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        self.channel.stop()?;

        if let Some(handle) = self.receive_thread.lock().expect("receive_thread lock poisoned").take() {
            let _ = handle.join();
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn receive_loop(self: Arc<Self>) {
        while self.is_running() {
            match self.channel.receive() {
                Ok(datagram) => {
                    let endpoint = Arc::clone(&self);
                    self.executor.spawn(Box::pin(async move {
                        endpoint.handle_datagram(datagram.bytes, datagram.remote);
                    }));
                }
                Err(_) if !self.is_running() => break,
                Err(error) => {
                    log::warn!("coap-engine: channel receive failed: {}", error);
                }
            }
        }
    }

    /// Sends a fresh request to `remote`, returning once it's handed to the
    /// channel (and, for a confirmable request, registered for retransmit).
    /// The eventual response arrives through the exchange returned here;
    /// callers poll or wait on it as their executor model allows.
    pub fn send_request(
        self: &Arc<Self>,
        request: OwnedImmutableMessage,
        remote: SocketAddr,
    ) -> Result<Arc<Exchange>, Error> {
        let exchange = Arc::new(Exchange::new_with_request(Origin::Local, request.clone()));
        self.stack.send_request(
            &self.matcher,
            &self.channel,
            &self.executor,
            &exchange,
            request,
            remote,
        )?;
        Ok(exchange)
    }

    /// Pushes a fresh notification to every observer of the resource at
    /// `path`, independent of any inbound request — the server-initiated
    /// half of RFC 7641. A resource whose state changes on its own (a
    /// sensor reading, a counter) calls this to reach observers that
    /// registered long ago, rather than waiting for them to poll again.
    pub fn notify(self: &Arc<Self>, path: &[&str]) -> Result<(), Error> {
        let resource = match self.resources.find(path) {
            Some(resource) => resource,
            None => return Err(Error::ResourceNotFound),
        };

        for (relation, response) in resource.notify()? {
            let exchange = match relation.exchange() {
                Some(exchange) => exchange,
                None => continue,
            };

            exchange.set_current_response(response.clone());
            if let Err(error) = self.stack.send_response(
                &self.matcher,
                &self.channel,
                &exchange,
                &relation.request(),
                response,
                None,
                relation.remote(),
            ) {
                log::warn!(
                    "coap-engine: failed to push notification to {}: {}",
                    relation.remote(),
                    error
                );
            }
        }

        Ok(())
    }

    fn handle_datagram(self: Arc<Self>, bytes: Vec<u8>, remote: SocketAddr) {
        match decode_message(&bytes) {
            Ok(DecodedMessage::Request(request)) => self.handle_request(request, remote),
            Ok(DecodedMessage::Response(response)) => self.handle_response(response, remote),
            Ok(DecodedMessage::Empty(message)) => self.handle_empty(message, remote),
            Ok(DecodedMessage::Signal(message)) => self.handle_signal(message, remote),
            Err(_) => {
                // A malformed reply is simply dropped; a malformed request gets an
                // RST bearing whatever message ID could still be salvaged. Since
                // the parse itself failed we have no message ID to salvage, so we
                // stay silent rather than guess at one, matching RFC 7252 §4.2's
                // allowance to simply ignore messages that cannot be parsed.
                log::debug!("coap-engine: dropping malformed datagram from {}", remote);
            }
        }
    }

    fn handle_request(self: Arc<Self>, request: OwnedImmutableMessage, remote: SocketAddr) {
        let request_uri = request_uri_string(&request);
        let (exchange, disposition) = self.matcher.receive_request(
            &self.matcher,
            &request,
            remote,
            request_uri.as_deref(),
        );

        if disposition == RequestDisposition::Duplicate {
            if let Some(cached) = exchange.current_response() {
                let _ = self.channel.send(
                    &encode_message(&cached).unwrap_or_default(),
                    self.channel.get_session(remote).unwrap_or(crate::channel::Session::UNAUTHENTICATED),
                    remote,
                );
            }
            return;
        }

        let complete_request = match self.stack.receive_request(&exchange, &request) {
            Ok(ReceivedRequest::Complete(msg)) => msg,
            Ok(ReceivedRequest::AwaitingMoreBlocks) => return,
            Err(error) => {
                log::debug!("coap-engine: rejecting request from {}: {}", remote, error);
                return;
            }
        };

        let delivery = match self.resources.deliver(&complete_request, &exchange, remote) {
            Ok(delivery) => delivery,
            Err(error) => {
                log::warn!("coap-engine: handler error for {}: {}", remote, error);
                Delivery::Response(error_response(&complete_request, MsgCode::ServerErrorInternalServerError))
            }
        };

        let response = match delivery {
            Delivery::Response(response) => response,
            Delivery::NotFound => error_response(&complete_request, MsgCode::ClientErrorNotFound),
            Delivery::MethodNotAllowed => {
                error_response(&complete_request, MsgCode::ClientErrorMethodNotAllowed)
            }
        };

        exchange.set_current_response(response.clone());
        if let Err(error) = self.stack.send_response(
            &self.matcher,
            &self.channel,
            &exchange,
            &complete_request,
            response,
            request_uri.as_deref(),
            remote,
        ) {
            log::warn!("coap-engine: failed to send response to {}: {}", remote, error);
        }
    }

    fn handle_response(self: Arc<Self>, response: OwnedImmutableMessage, remote: SocketAddr) {
        let (exchange, duplicate) = match self.matcher.receive_response(&response, remote) {
            Some(found) => found,
            None => {
                if response.msg_type() != MsgType::Ack {
                    self.send_reset(response.msg_id(), remote);
                }
                return;
            }
        };

        if duplicate {
            return;
        }

        match self.stack.receive_response(&exchange, &response) {
            Ok(ReceivedResponse::Complete(complete)) => {
                exchange.set_current_response(complete);
            }
            Ok(ReceivedResponse::AwaitingMoreBlocks) => {}
            Err(error) => {
                log::debug!("coap-engine: dropping malformed response from {}: {}", remote, error);
            }
        }
    }

    fn handle_empty(self: Arc<Self>, message: OwnedImmutableMessage, remote: SocketAddr) {
        match message.msg_type() {
            MsgType::Con | MsgType::Non => {
                // A CoAP ping: an empty CON/NON with no matching exchange is
                // answered with an RST, per RFC 7252 §4.3.
                self.send_reset(message.msg_id(), remote);
            }
            MsgType::Ack | MsgType::Res => {
                if let Some(exchange) = self.matcher.receive_empty_message(message.msg_id()) {
                    self.stack.receive_empty_message(&exchange, message.msg_type());
                }
            }
        }
    }

    fn handle_signal(self: Arc<Self>, message: OwnedImmutableMessage, remote: SocketAddr) {
        match message.msg_code() {
            MsgCode::SignalCsm => {
                log::debug!("coap-engine: received CSM from {}", remote);
            }
            MsgCode::SignalPing => {
                self.send_reset(message.msg_id(), remote);
            }
            MsgCode::SignalPong | MsgCode::SignalRelease => {
                log::debug!("coap-engine: received {:?} from {}", message.msg_code(), remote);
            }
            MsgCode::SignalAbort => {
                log::warn!("coap-engine: peer {} sent Abort", remote);
            }
            other => {
                log::warn!("coap-engine: unknown signal code {:?} from {}", other, remote);
            }
        }
    }

    fn send_reset(&self, msg_id: u16, remote: SocketAddr) {
        use crate::message::{MessageWrite, VecMessageEncoder};
        let mut encoder = VecMessageEncoder::default();
        encoder.set_msg_type(MsgType::Res);
        encoder.set_msg_code(MsgCode::Empty);
        encoder.set_msg_id(msg_id);
        encoder.set_msg_token(MsgToken::EMPTY);
        let bytes: Vec<u8> = encoder.into();

        if let Ok(session) = self.channel.get_session(remote) {
            let _ = self.channel.send(&bytes, session, remote);
        }
    }
}

fn request_uri_string(request: &OwnedImmutableMessage) -> Option<String> {
    let mut segments = Vec::new();
    for opt in request.options() {
        let (key, value) = opt.ok()?;
        if key == crate::option::OptionNumber::URI_PATH {
            segments.push(std::str::from_utf8(value).ok()?.to_string());
        }
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

fn error_response(request: &OwnedImmutableMessage, code: MsgCode) -> OwnedImmutableMessage {
    use crate::message::{MessageWrite, VecMessageEncoder};
    let mut encoder = VecMessageEncoder::default();
    let msg_type = if request.msg_type() == MsgType::Con {
        MsgType::Ack
    } else {
        MsgType::Non
    };
    encoder.set_msg_type(msg_type);
    encoder.set_msg_code(code);
    encoder.set_msg_id(request.msg_id());
    encoder.set_msg_token(request.msg_token());
    let bytes: Vec<u8> = encoder.into();
    OwnedImmutableMessage::new(bytes).unwrap_or_else(|_| {
        OwnedImmutableMessage::new(Vec::new()).expect("an empty message always parses")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::executor::InlineExecutor;
    use crate::message::{MessageWrite, MsgToken, VecMessageEncoder};

    #[test]
    fn start_is_idempotent_and_stop_reverses_it() {
        let channel: Arc<dyn Channel> =
            Arc::new(crate::channel::UdpChannel::bind("127.0.0.1:0").unwrap());
        let executor: Arc<dyn Executor> = Arc::new(InlineExecutor);
        let config = Config::default();
        let endpoint = Arc::new(Endpoint::new(channel, executor, &config, Resource::new("")));

        endpoint.start().unwrap();
        assert!(endpoint.is_running());
        endpoint.start().unwrap();
        assert!(endpoint.is_running());

        endpoint.stop().unwrap();
        assert!(!endpoint.is_running());
    }

    #[test]
    fn error_response_acks_a_confirmable_request() {
        let mut encoder = VecMessageEncoder::default();
        encoder.set_msg_type(MsgType::Con);
        encoder.set_msg_code(MsgCode::MethodGet);
        encoder.set_msg_id(5);
        encoder.set_msg_token(MsgToken::new(&[1]));
        let bytes: Vec<u8> = encoder.into();
        let request = OwnedImmutableMessage::new(bytes).unwrap();

        let response = error_response(&request, MsgCode::ClientErrorNotFound);
        assert_eq!(response.msg_type(), MsgType::Ack);
        assert_eq!(response.msg_code(), MsgCode::ClientErrorNotFound);
        assert_eq!(response.msg_id(), 5);
    }
}
