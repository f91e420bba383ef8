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

//! Stamps outgoing notifications with an increasing Observe sequence
//! number.
//!
//! Attaching or canceling an observe relation itself is the resource tree's
//! job ([`crate::resource::ResourceTree`]): that decision needs to know
//! which resource is being addressed, which this layer does not. This layer
//! only does the one thing that belongs squarely in the stack: once an
//! exchange is known to be a notification, give it the next sequence
//! number.

use crate::message::{MessageWrite, OwnedImmutableMessage, VecMessageEncoder};
use crate::option::{OptionInsert, OptionNumber};
use crate::Error;
use crate::Exchange;

#[derive(Debug, Default)]
pub struct ObserveLayer;

impl ObserveLayer {
    pub fn new() -> Self {
        ObserveLayer
    }

    /// If `exchange` is bound to an observe relation, rewrites `response`
    /// with the next 24-bit Observe sequence number. Otherwise returns
    /// `response` unchanged.
    pub fn stamp_response(
        &self,
        exchange: &Exchange,
        response: OwnedImmutableMessage,
    ) -> Result<OwnedImmutableMessage, Error> {
        if !exchange.is_observing() {
            return Ok(response);
        }

        let sequence = exchange.next_observe_sequence();

        let mut encoder = VecMessageEncoder::default();
        encoder.set_msg_type(response.msg_type());
        encoder.set_msg_code(response.msg_code());
        if response.msg_id() != 0 {
            encoder.set_msg_id(response.msg_id());
        }
        encoder.set_msg_token(response.msg_token());
        encoder.insert_option_with_u32(OptionNumber::OBSERVE, sequence)?;
        for opt in response.options() {
            let (key, value) = opt?;
            if key == OptionNumber::OBSERVE {
                continue;
            }
            encoder.insert_option_with_bytes(key, value)?;
        }
        encoder.append_payload_bytes(response.payload())?;

        let bytes: Vec<u8> = encoder.into();
        OwnedImmutableMessage::new(bytes)
    }
}
