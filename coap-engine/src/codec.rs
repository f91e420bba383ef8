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

//! Whole-message encode/decode, built on top of the wire-level primitives in
//! [`crate::message`].
//!
//! [`crate::message::std_parser`] and [`crate::message::std_encoder`] already
//! handle the byte-level details of the RFC 7252 header, token, and option
//! list. This module adds the one thing they don't: classifying a decoded
//! message into the request/response/empty/signal shape the rest of the
//! engine reasons about.

use crate::message::{MessageRead, MsgCode, MsgCodeClass, OwnedImmutableMessage, VecMessageEncoder};
use crate::Error;

/// The result of decoding a datagram: which kind of message it turned out to
/// be, alongside the fully parsed message itself.
///
/// Matcher and endpoint code dispatch on this discriminant rather than
/// re-deriving it from `msg_code()` at every call site.
#[derive(Debug, Clone)]
pub enum DecodedMessage {
    /// A request: `msg_code()` is a method code.
    Request(OwnedImmutableMessage),
    /// A response: `msg_code()`'s class is 2 (success), 4 (client error), or
    /// 5 (server error).
    Response(OwnedImmutableMessage),
    /// A bare ACK, RST, or CoAP ping: `msg_code()` is empty.
    Empty(OwnedImmutableMessage),
    /// A reliable-transport signal message (CSM, Ping, Pong, Release, Abort).
    Signal(OwnedImmutableMessage),
}

impl DecodedMessage {
    /// Borrows the underlying message regardless of which variant this is.
    pub fn message(&self) -> &OwnedImmutableMessage {
        match self {
            DecodedMessage::Request(m)
            | DecodedMessage::Response(m)
            | DecodedMessage::Empty(m)
            | DecodedMessage::Signal(m) => m,
        }
    }
}

/// Parses a raw datagram into a classified [`DecodedMessage`].
///
/// Returns [`Error::ParseFailure`] for malformed headers/options and
/// [`Error::UnknownMessageCode`] for an unrecognized message code, matching
/// [`crate::message::std_parser::StandardMessageParser`]'s own error
/// reporting — this function does not invent new failure modes, it only adds
/// classification on top.
pub fn decode_message(bytes: &[u8]) -> Result<DecodedMessage, Error> {
    let owned = OwnedImmutableMessage::new(bytes.to_vec())?;
    let code = owned.msg_code();

    let decoded = if code.is_empty() {
        DecodedMessage::Empty(owned)
    } else if code.is_signal() {
        DecodedMessage::Signal(owned)
    } else if code.is_method() {
        DecodedMessage::Request(owned)
    } else if MsgCodeClass::Success.contains(code)
        || code.is_client_error()
        || code.is_server_error()
    {
        DecodedMessage::Response(owned)
    } else {
        return Err(Error::UnknownMessageCode);
    };

    Ok(decoded)
}

/// Serializes any [`MessageRead`] implementor to its RFC 7252 wire
/// representation.
pub fn encode_message(message: &dyn MessageRead) -> Result<Vec<u8>, Error> {
    let mut encoder = VecMessageEncoder::default();
    message.write_msg_to(&mut encoder)?;
    Ok(encoder.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageWrite, MsgToken, MsgType};
    use crate::option::OptionInsert;

    #[test]
    fn round_trips_a_request() {
        let mut encoder = VecMessageEncoder::default();
        encoder.set_msg_type(MsgType::Con);
        encoder.set_msg_code(MsgCode::MethodGet);
        encoder.set_msg_id(42);
        encoder.set_msg_token(MsgToken::new(&[1, 2, 3]));
        let bytes: Vec<u8> = encoder.into();

        let decoded = decode_message(&bytes).unwrap();
        match decoded {
            DecodedMessage::Request(msg) => {
                assert_eq!(msg.msg_id(), 42);
                assert_eq!(msg.msg_token().as_bytes(), &[1, 2, 3]);
            }
            other => panic!("expected Request, got {:?}", other),
        }
    }

    #[test]
    fn classifies_response_and_empty() {
        let mut response = VecMessageEncoder::default();
        response.set_msg_type(MsgType::Non);
        response.set_msg_code(MsgCode::SuccessContent);
        let bytes: Vec<u8> = response.into();
        assert!(matches!(
            decode_message(&bytes).unwrap(),
            DecodedMessage::Response(_)
        ));

        let mut empty = VecMessageEncoder::default();
        empty.set_msg_type(MsgType::Ack);
        empty.set_msg_code(MsgCode::Empty);
        let bytes: Vec<u8> = empty.into();
        assert!(matches!(
            decode_message(&bytes).unwrap(),
            DecodedMessage::Empty(_)
        ));
    }

    #[test]
    fn encode_then_decode_preserves_options() {
        let mut encoder = VecMessageEncoder::default();
        encoder.set_msg_type(MsgType::Con);
        encoder.set_msg_code(MsgCode::MethodGet);
        encoder.set_msg_id(7);
        encoder
            .insert_option_with_str(crate::option::OptionNumber::URI_PATH, "sensors")
            .unwrap();
        let bytes = encode_message(&encoder).unwrap();

        let decoded = decode_message(&bytes).unwrap();
        let msg = decoded.message();
        let has_path = msg
            .options()
            .any(|opt| matches!(opt, Ok((crate::option::OptionNumber::URI_PATH, v)) if v == b"sensors"));
        assert!(has_path);
    }
}
