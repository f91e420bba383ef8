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

//! Fragments oversized message bodies into RFC 7959 blocks on send, and
//! reassembles block sequences back into a full body on receive.

use crate::block::BlockInfo;
use crate::exchange::Exchange;
use crate::message::{MessageRead, MessageWrite, OwnedImmutableMessage, VecMessageEncoder};
use crate::option::{OptionInsert, OptionNumber};
use crate::stack::{ReceivedRequest, ReceivedResponse};
use crate::Error;
use std::time::Duration;

/// The block size this engine prefers to use when it is the one fragmenting
/// a body, expressed as a `szx` exponent field (`6` = 1024 bytes).
const PREFERRED_SZX: u8 = 6;

#[derive(Debug)]
pub struct BlockwiseLayer {
    #[allow(dead_code)]
    status_lifetime: Duration,
}

impl BlockwiseLayer {
    pub fn new(status_lifetime: Duration) -> Self {
        BlockwiseLayer { status_lifetime }
    }

    /// Splits `request`'s payload into a sequence of Block1-bearing
    /// messages, or returns it unchanged (as the sole element) if it
    /// already fits in one block.
    pub fn fragment_request(&self, request: &OwnedImmutableMessage) -> Vec<OwnedImmutableMessage> {
        fragment(request, OptionNumber::BLOCK1)
    }

    /// Returns the block of `response`'s payload the peer asked for via
    /// `requested` (the inbound request's Block2 option, or `None` for a
    /// fresh, non-continuation request — which is block 0), tagged with
    /// Block2 if fragmentation is needed. Subsequent blocks are produced on
    /// demand as the peer requests them by resending the request with an
    /// incremented Block2 option — handled by the resource tree re-invoking
    /// the handler, not by this layer holding onto remaining blocks.
    pub fn response_block(
        &self,
        response: &OwnedImmutableMessage,
        requested: Option<BlockInfo>,
    ) -> OwnedImmutableMessage {
        let blocks = fragment(response, OptionNumber::BLOCK2);
        let index = requested.map(|block| block.num() as usize).unwrap_or(0);
        blocks
            .get(index)
            .cloned()
            .or_else(|| blocks.last().cloned())
            .unwrap_or_else(|| response.clone())
    }

    /// Feeds an inbound request block into `exchange`'s reassembly buffer.
    /// Returns the fully reassembled request once the last block (the one
    /// without the more-flag) arrives; otherwise reports that more blocks
    /// are expected.
    pub fn reassemble_request(
        &self,
        exchange: &Exchange,
        request: &OwnedImmutableMessage,
    ) -> Result<ReceivedRequest, Error> {
        let block1 = match request.block1() {
            None => return Ok(ReceivedRequest::Complete(request.clone())),
            Some(block) => block,
        };

        let finished = exchange.with_request_assembly(|assembly| {
            feed_block(assembly, block1, request.payload())
        })?;

        if !finished {
            return Ok(ReceivedRequest::AwaitingMoreBlocks);
        }

        let body = exchange.with_request_assembly(|assembly| std::mem::take(&mut assembly.buffer));
        Ok(ReceivedRequest::Complete(rebuild_with_payload(request, &body)?))
    }

    /// Feeds an inbound response block into `exchange`'s reassembly buffer,
    /// symmetric to [`BlockwiseLayer::reassemble_request`].
    pub fn reassemble_response(
        &self,
        exchange: &Exchange,
        response: &OwnedImmutableMessage,
    ) -> Result<ReceivedResponse, Error> {
        let block2 = match response.block2() {
            None => return Ok(ReceivedResponse::Complete(response.clone())),
            Some(block) => block,
        };

        let finished = exchange.with_response_assembly(|assembly| {
            feed_block(assembly, block2, response.payload())
        })?;

        if !finished {
            return Ok(ReceivedResponse::AwaitingMoreBlocks);
        }

        let body = exchange.with_response_assembly(|assembly| std::mem::take(&mut assembly.buffer));
        Ok(ReceivedResponse::Complete(rebuild_with_payload(response, &body)?))
    }
}

fn feed_block(
    assembly: &mut crate::exchange::BlockAssembly,
    block: BlockInfo,
    payload: &[u8],
) -> Result<bool, Error> {
    let expected_offset = assembly.last_block.map(|b| b.offset() + b.len()).unwrap_or(0);
    if block.offset() != expected_offset && block.offset() != 0 {
        return Err(Error::InvariantViolation);
    }

    if assembly.buffer.len() < block.offset() + payload.len() {
        assembly.buffer.resize(block.offset() + payload.len(), 0);
    }
    assembly.buffer[block.offset()..block.offset() + payload.len()].copy_from_slice(payload);
    assembly.last_block = Some(block);

    Ok(!block.more_flag())
}

fn rebuild_with_payload(
    original: &OwnedImmutableMessage,
    body: &[u8],
) -> Result<OwnedImmutableMessage, Error> {
    let mut encoder = VecMessageEncoder::default();
    encoder.set_msg_type(original.msg_type());
    encoder.set_msg_code(original.msg_code());
    if original.msg_id() != 0 {
        encoder.set_msg_id(original.msg_id());
    }
    encoder.set_msg_token(original.msg_token());
    for opt in original.options() {
        let (key, value) = opt?;
        if key == OptionNumber::BLOCK1 || key == OptionNumber::BLOCK2 {
            continue;
        }
        encoder.insert_option_with_bytes(key, value)?;
    }
    encoder.append_payload_bytes(body)?;
    let bytes: Vec<u8> = encoder.into();
    OwnedImmutableMessage::new(bytes)
}

fn fragment(message: &OwnedImmutableMessage, block_option: OptionNumber) -> Vec<OwnedImmutableMessage> {
    let payload = message.payload();
    let block_len = 1usize << (PREFERRED_SZX as usize + 4);

    if payload.len() <= block_len {
        return vec![message.clone()];
    }

    let mut blocks = Vec::new();
    let mut num = 0u32;
    for chunk in payload.chunks(block_len) {
        let more = (num as usize + 1) * block_len < payload.len();
        let block_info = match BlockInfo::new(num, more, PREFERRED_SZX) {
            Some(b) => b,
            None => break,
        };

        let mut encoder = VecMessageEncoder::default();
        encoder.set_msg_type(message.msg_type());
        encoder.set_msg_code(message.msg_code());
        if message.msg_id() != 0 {
            encoder.set_msg_id(message.msg_id());
        }
        encoder.set_msg_token(message.msg_token());
        for opt in message.options() {
            if let Ok((key, value)) = opt {
                if key == OptionNumber::BLOCK1 || key == OptionNumber::BLOCK2 {
                    continue;
                }
                let _ = encoder.insert_option_with_bytes(key, value);
            }
        }
        let _ = encoder.insert_option_with_u32(block_option, block_info.0);
        let _ = encoder.append_payload_bytes(chunk);

        let bytes: Vec<u8> = encoder.into();
        if let Ok(owned) = OwnedImmutableMessage::new(bytes) {
            blocks.push(owned);
        }

        num += 1;
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::Origin;
    use crate::message::{MsgCode, MsgToken, MsgType};

    fn build_message(code: MsgCode, payload: &[u8]) -> OwnedImmutableMessage {
        let mut encoder = VecMessageEncoder::default();
        encoder.set_msg_type(MsgType::Con);
        encoder.set_msg_code(code);
        encoder.set_msg_id(1);
        encoder.set_msg_token(MsgToken::new(&[9]));
        encoder.append_payload_bytes(payload).unwrap();
        let bytes: Vec<u8> = encoder.into();
        OwnedImmutableMessage::new(bytes).unwrap()
    }

    #[test]
    fn small_body_is_not_fragmented() {
        let layer = BlockwiseLayer::new(Duration::from_secs(60));
        let request = build_message(MsgCode::MethodPut, b"short");
        let blocks = layer.fragment_request(&request);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].block1().is_none());
    }

    #[test]
    fn large_body_is_fragmented_and_reassembles() {
        let layer = BlockwiseLayer::new(Duration::from_secs(60));
        let payload = vec![0xABu8; 3000];
        let request = build_message(MsgCode::MethodPut, &payload);
        let blocks = layer.fragment_request(&request);
        assert!(blocks.len() > 1);

        let exchange = Exchange::new(Origin::Remote);
        let mut reassembled = None;
        for block in &blocks {
            match layer.reassemble_request(&exchange, block).unwrap() {
                ReceivedRequest::Complete(msg) => reassembled = Some(msg),
                ReceivedRequest::AwaitingMoreBlocks => {}
            }
        }

        let reassembled = reassembled.expect("final block should complete reassembly");
        assert_eq!(reassembled.payload().len(), payload.len());
        assert_eq!(reassembled.payload(), payload.as_slice());
    }
}
