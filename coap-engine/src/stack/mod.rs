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

//! The protocol stack: an ordered chain of layers sitting between the
//! [`crate::Endpoint`] and the [`crate::Matcher`].
//!
//! Top to bottom (closest to the application first): [`observe`],
//! [`blockwise`], [`token`], [`reliability`]. Sends travel top-down, finally
//! reaching the wire through the reliability layer's retransmission driver;
//! receives travel bottom-up, with the reliability layer canceling timers
//! before anything else sees the message.

pub mod blockwise;
pub mod observe;
pub mod reliability;
pub mod token;

pub use blockwise::BlockwiseLayer;
pub use observe::ObserveLayer;
pub use reliability::ReliabilityLayer;
pub use token::TokenLayer;

use crate::channel::Channel;
use crate::config::Config;
use crate::exchange::Exchange;
use crate::executor::Executor;
use crate::matcher::Matcher;
use crate::message::{MessageRead, OwnedImmutableMessage};
use crate::Error;
use std::net::SocketAddr;
use std::sync::Arc;

/// Composes the four layers into the single entry point an [`crate::Endpoint`]
/// drives. Holds no mutable state of its own beyond what each layer needs;
/// all per-exchange state lives on the [`Exchange`] itself.
#[derive(Debug)]
pub struct Stack {
    pub observe: ObserveLayer,
    pub blockwise: BlockwiseLayer,
    pub token: TokenLayer,
    pub reliability: ReliabilityLayer,
}

impl Stack {
    pub fn new(config: &Config) -> Self {
        Stack {
            observe: ObserveLayer::new(),
            blockwise: BlockwiseLayer::new(config.blockwise_status_lifetime),
            token: TokenLayer::new(),
            reliability: ReliabilityLayer::new(config),
        }
    }

    /// Sends a request: top-down through Observe (no-op on the client send
    /// path for requests), Blockwise (fragments an oversized body), Token
    /// (ensures a non-null token), and finally Reliability, which registers
    /// the exchange with the matcher, writes the first block to the
    /// channel, and — for confirmable messages — arms the retransmit timer
    /// on the given executor.
    pub fn send_request(
        &self,
        matcher: &Arc<Matcher>,
        channel: &Arc<dyn Channel>,
        executor: &Arc<dyn Executor>,
        exchange: &Arc<Exchange>,
        request: OwnedImmutableMessage,
        remote: SocketAddr,
    ) -> Result<(), Error> {
        let request = self.token.ensure_request_token(request)?;
        let blocks = self.blockwise.fragment_request(&request);
        for block in blocks {
            self.reliability.send_request(
                matcher, channel, executor, exchange, block, remote,
            )?;
        }
        Ok(())
    }

    /// Sends a response: attaches an observe sequence number if the exchange
    /// has a relation, otherwise passes through unchanged; blockwise
    /// fragmentation happens lazily — `request` carries the Block2 option
    /// the peer asked for (absent on a fresh request, which means block 0),
    /// and the matching fragment of `response`'s body is what actually goes
    /// out, so a continuation GET advances instead of re-serving block 0.
    pub fn send_response(
        &self,
        matcher: &Arc<Matcher>,
        channel: &Arc<dyn Channel>,
        exchange: &Arc<Exchange>,
        request: &OwnedImmutableMessage,
        response: OwnedImmutableMessage,
        request_uri: Option<&str>,
        remote: SocketAddr,
    ) -> Result<(), Error> {
        let response = self.observe.stamp_response(exchange, response)?;
        let is_notification = exchange.observe_sequence().is_some();
        let block = self
            .blockwise
            .response_block(&response, request.block2());

        matcher.send_response(exchange, &block, request_uri, remote, is_notification);
        channel.send(&crate::codec::encode_message(&block)?, channel.get_session(remote)?, remote)
    }

    /// Receives a request: bottom-up from Reliability (nothing to do;
    /// reliability is a send-path-only concept for requests) through Token
    /// (rejects a missing token) and Blockwise (reassembles a fragmented
    /// request body) up to Observe (leaves Observe-option interpretation to
    /// the resource tree, since that needs the resource being addressed).
    pub fn receive_request(
        &self,
        exchange: &Arc<Exchange>,
        request: &OwnedImmutableMessage,
    ) -> Result<ReceivedRequest, Error> {
        self.token.validate_request_token(request)?;
        self.blockwise.reassemble_request(exchange, request)
    }

    /// Receives a response: cancels the exchange's retransmit timer (the
    /// response is proof of delivery), then reassembles a blockwise body if
    /// present.
    pub fn receive_response(
        &self,
        exchange: &Arc<Exchange>,
        response: &OwnedImmutableMessage,
    ) -> Result<ReceivedResponse, Error> {
        self.reliability.cancel(exchange);
        self.blockwise.reassemble_response(exchange, response)
    }

    /// Receives an empty message (ACK/RST): cancels the retransmit timer
    /// bound to the exchange. An RST completes the exchange as
    /// [`crate::exchange::ExchangeFailure::Rejected`] rather than an
    /// ordinary completion, since the peer explicitly declined it.
    pub fn receive_empty_message(&self, exchange: &Arc<Exchange>, msg_type: crate::message::MsgType) {
        if msg_type == crate::message::MsgType::Res {
            self.reliability.reject(exchange);
        } else {
            self.reliability.cancel(exchange);
        }
    }
}

/// The result of running an inbound request through the blockwise layer:
/// either the body is still incomplete (more blocks expected) or it's ready
/// to deliver upward.
#[derive(Debug)]
pub enum ReceivedRequest {
    Complete(OwnedImmutableMessage),
    AwaitingMoreBlocks,
}

/// The result of running an inbound response through the blockwise layer.
#[derive(Debug)]
pub enum ReceivedResponse {
    Complete(OwnedImmutableMessage),
    AwaitingMoreBlocks,
}
