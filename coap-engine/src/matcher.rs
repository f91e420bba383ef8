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

//! Owns the key-indexed tables that associate wire identifiers (message ID,
//! token, request URI) to logical [`Exchange`]s.
//!
//! This is the busiest component in the engine: every inbound and outbound
//! message passes through one of the `send_*`/`receive_*` methods here
//! before it reaches (or leaves from) the protocol stack.

use crate::config::Config;
use crate::dedup::Deduplicator;
use crate::exchange::{Exchange, ExchangeFailure, KeyId, KeyToken, KeyUri, Origin};
use crate::message::{MessageRead, MsgToken, MsgType, OwnedImmutableMessage};
use crate::Error;
use rand::RngCore;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

/// The outcome of handing a freshly decoded request to the matcher: either a
/// brand new exchange the caller should route to a resource, or a duplicate
/// whose previously computed response (if any) should simply be replayed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RequestDisposition {
    New,
    Duplicate,
}

struct Tables {
    by_id: HashMap<KeyId, Arc<Exchange>>,
    by_token: HashMap<KeyToken, Arc<Exchange>>,
    ongoing_blockwise: HashMap<KeyUri, Arc<Exchange>>,
}

/// Owns `byId`, `byToken`, and `ongoingBlockwise`, plus the deduplicator used
/// to recognize retransmissions. One `Matcher` belongs to exactly one
/// [`crate::Endpoint`].
#[derive(Debug)]
pub struct Matcher {
    tables: Mutex<Tables>,
    dedup: Deduplicator,
    next_id: AtomicU16,
    default_token_length: i8,
}

impl std::fmt::Debug for Tables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tables")
            .field("by_id", &self.by_id.len())
            .field("by_token", &self.by_token.len())
            .field("ongoing_blockwise", &self.ongoing_blockwise.len())
            .finish()
    }
}

impl Matcher {
    /// Builds a matcher from engine configuration. `use_random_id_start`
    /// seeds the message-ID counter with a random value rather than zero.
    pub fn new(config: &Config) -> Self {
        let start_id = if config.use_random_id_start {
            rand::thread_rng().next_u32() as u16
        } else {
            0
        };

        Matcher {
            tables: Mutex::new(Tables {
                by_id: HashMap::new(),
                by_token: HashMap::new(),
                ongoing_blockwise: HashMap::new(),
            }),
            dedup: Deduplicator::new(config.deduplicator, config.exchange_lifetime),
            next_id: AtomicU16::new(start_id),
            default_token_length: config.token_length,
        }
    }

    fn allocate_id(&self) -> u16 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn generate_token(&self, tables: &Tables) -> MsgToken {
        let mut rng = rand::thread_rng();
        let base_len = if self.default_token_length < 0 {
            4
        } else {
            self.default_token_length.min(8).max(0) as usize
        };

        for len in base_len..=8 {
            for _ in 0..8 {
                let mut bytes = [0u8; 8];
                rng.fill_bytes(&mut bytes[..len]);
                let candidate = MsgToken::new(&bytes[..len]);
                if !tables.by_token.contains_key(&KeyToken { token: candidate }) {
                    return candidate;
                }
            }
        }
        // Exhausted every length at 8 attempts each; fall back to a
        // full-width token, which has astronomically low collision odds.
        let mut bytes = [0u8; 8];
        rng.fill_bytes(&mut bytes);
        MsgToken::new(&bytes)
    }

    /// Registers a newly created local exchange's outgoing `request`,
    /// assigning an ID and token if the request doesn't already carry them.
    /// Returns the request, with ID/token filled in, ready for the stack to
    /// send.
    pub fn send_request(
        &self,
        matcher: &Arc<Matcher>,
        exchange: &Arc<Exchange>,
        mut request: OwnedImmutableMessage,
    ) -> Result<OwnedImmutableMessage, Error> {
        let mut tables = self.tables.lock().expect("matcher tables poisoned");

        let id = if request.msg_id() == 0 {
            self.allocate_id()
        } else {
            request.msg_id()
        };

        let token = if request.msg_token().is_empty() && self.default_token_length != 0 {
            self.generate_token(&tables)
        } else {
            request.msg_token()
        };

        if request.msg_id() != id || request.msg_token() != token {
            request = reencode_with_id_and_token(&request, id, token)?;
        }

        let key_id = KeyId {
            id,
            remote: None,
            session: 0,
        };
        let key_token = KeyToken { token };

        tables.by_id.insert(key_id, Arc::clone(exchange));
        tables.by_token.insert(key_token, Arc::clone(exchange));
        drop(tables);

        let matcher = Arc::clone(matcher);
        let exchange_for_hook = Arc::clone(exchange);
        exchange.on_complete(move || {
            let mut tables = matcher.tables.lock().expect("matcher tables poisoned");
            tables.by_id.remove(&key_id);
            tables.by_token.remove(&key_token);
            let _ = &exchange_for_hook;
        });

        Ok(request)
    }

    /// Registers an outgoing response. If it carries Block2, the exchange is
    /// upserted into `ongoing_blockwise` keyed by request URI — except for
    /// observe notifications, which send only their first block and must
    /// not be stored there. CON/NON responses are (re-)installed in `by_id`
    /// so a later ACK/RST can be matched back; ACK/RST or a final response
    /// marks the exchange complete.
    pub fn send_response(
        &self,
        exchange: &Arc<Exchange>,
        response: &OwnedImmutableMessage,
        request_uri: Option<&str>,
        remote: SocketAddr,
        is_observe_notification: bool,
    ) {
        let mut tables = self.tables.lock().expect("matcher tables poisoned");

        if let (Some(_block2), Some(uri)) = (response.block2(), request_uri) {
            if !is_observe_notification {
                tables.ongoing_blockwise.insert(
                    KeyUri {
                        uri: uri.to_string(),
                        remote,
                    },
                    Arc::clone(exchange),
                );
            }
        }

        let msg_type = response.msg_type();
        if msg_type == MsgType::Con || msg_type == MsgType::Non {
            tables.by_id.insert(
                KeyId {
                    id: response.msg_id(),
                    remote: Some(remote),
                    session: 0,
                },
                Arc::clone(exchange),
            );
        }

        drop(tables);

        if msg_type == MsgType::Ack || msg_type == MsgType::Res || response.block2().is_none() {
            exchange.complete();
        }
    }

    /// If `message` is an RST bound to a known exchange, marks that exchange
    /// failed with [`ExchangeFailure::Rejected`].
    pub fn send_empty_message(&self, exchange: &Arc<Exchange>, msg_type: MsgType) {
        if msg_type == MsgType::Res {
            exchange.fail(ExchangeFailure::Rejected);
        }
    }

    /// Handles an inbound request: looks up or creates the owning exchange,
    /// running it through the deduplicator. Returns the exchange to route
    /// plus whether this is a fresh request or a detected retransmission.
    pub fn receive_request(
        &self,
        matcher: &Arc<Matcher>,
        request: &OwnedImmutableMessage,
        remote: SocketAddr,
        request_uri: Option<&str>,
    ) -> (Arc<Exchange>, RequestDisposition) {
        let key_id = KeyId {
            id: request.msg_id(),
            remote: Some(remote),
            session: 0,
        };

        let has_block = request.block1().is_some() || request.block2().is_some();

        if !has_block {
            let new_exchange = Arc::new(Exchange::new_with_request(Origin::Remote, request.clone()));
            match self.dedup.find_previous(key_id, Arc::clone(&new_exchange)) {
                None => {
                    self.register_remote_completion(matcher, Arc::clone(&new_exchange), key_id);
                    (new_exchange, RequestDisposition::New)
                }
                Some(previous) => (previous, RequestDisposition::Duplicate),
            }
        } else {
            let uri_key = request_uri.map(|uri| KeyUri {
                uri: uri.to_string(),
                remote,
            });

            let existing = uri_key
                .as_ref()
                .and_then(|key| {
                    self.tables
                        .lock()
                        .expect("matcher tables poisoned")
                        .ongoing_blockwise
                        .get(key)
                        .cloned()
                });

            if let Some(existing) = existing {
                if self
                    .dedup
                    .find_previous(key_id, Arc::clone(&existing))
                    .is_some()
                {
                    (existing, RequestDisposition::Duplicate)
                } else {
                    existing.clear_current_response();
                    (existing, RequestDisposition::New)
                }
            } else {
                let new_exchange =
                    Arc::new(Exchange::new_with_request(Origin::Remote, request.clone()));
                self.dedup.find_previous(key_id, Arc::clone(&new_exchange));
                self.register_remote_completion(matcher, Arc::clone(&new_exchange), key_id);
                if let Some(uri_key) = uri_key {
                    self.tables
                        .lock()
                        .expect("matcher tables poisoned")
                        .ongoing_blockwise
                        .insert(uri_key, Arc::clone(&new_exchange));
                }
                (new_exchange, RequestDisposition::New)
            }
        }
    }

    fn register_remote_completion(&self, matcher: &Arc<Matcher>, exchange: Arc<Exchange>, key_id: KeyId) {
        let matcher = Arc::clone(matcher);
        exchange.on_complete(move || {
            let mut tables = matcher.tables.lock().expect("matcher tables poisoned");
            tables.by_id.remove(&key_id);
        });
    }

    /// Handles an inbound response: finds the owning exchange by token. For
    /// a multicast request, every reply gets its own cloned exchange. Runs
    /// the deduplicator keyed by ID; if the response is an ACK whose ID
    /// doesn't match the request's, logs a possible MID reuse but still
    /// returns the exchange, since token is authoritative.
    pub fn receive_response(
        &self,
        response: &OwnedImmutableMessage,
        remote: SocketAddr,
    ) -> Option<(Arc<Exchange>, bool)> {
        let key_token = KeyToken {
            token: response.msg_token(),
        };

        let tables = self.tables.lock().expect("matcher tables poisoned");
        let found = tables.by_token.get(&key_token).cloned();
        drop(tables);

        let exchange = match found {
            Some(exchange) if exchange.is_multicast() => Arc::new(exchange.clone_for_multicast_reply()),
            Some(exchange) => exchange,
            None => return None,
        };

        let key_id_remote = if response.msg_type() == MsgType::Ack {
            None
        } else {
            Some(remote)
        };
        let key_id = KeyId {
            id: response.msg_id(),
            remote: key_id_remote,
            session: 0,
        };

        let duplicate = self.dedup.find_previous(key_id, Arc::clone(&exchange)).is_some();

        if !duplicate {
            let mut tables = self.tables.lock().expect("matcher tables poisoned");
            tables.by_id.remove(&key_id);
            drop(tables);

            if response.msg_type() == MsgType::Ack {
                if let Some(request) = exchange.request() {
                    if request.msg_id() != response.msg_id() {
                        warn!(
                            "coap-engine: possible message-ID reuse, request id {} != ack id {}",
                            request.msg_id(),
                            response.msg_id()
                        );
                    }
                }
            }
        }

        Some((exchange, duplicate))
    }

    /// Handles an inbound empty message (bare ACK/RST): looks up the
    /// exchange waiting on this ID, removing it from `by_id` since it has
    /// now been delivered its piggyback target.
    pub fn receive_empty_message(&self, msg_id: u16) -> Option<Arc<Exchange>> {
        let mut tables = self.tables.lock().expect("matcher tables poisoned");
        tables.by_id.remove(&KeyId {
            id: msg_id,
            remote: None,
            session: 0,
        })
    }

    pub fn exchange_count(&self) -> usize {
        let tables = self.tables.lock().expect("matcher tables poisoned");
        tables.by_id.len() + tables.by_token.len()
    }

    pub fn sweep_deduplicator(&self) {
        self.dedup.sweep();
    }

    pub fn rotate_deduplicator(&self) {
        self.dedup.rotate();
    }
}

fn reencode_with_id_and_token(
    request: &OwnedImmutableMessage,
    id: u16,
    token: MsgToken,
) -> Result<OwnedImmutableMessage, Error> {
    use crate::message::{MessageWrite, VecMessageEncoder};
    let mut encoder = VecMessageEncoder::default();
    encoder.set_msg_type(request.msg_type());
    encoder.set_msg_code(request.msg_code());
    encoder.set_msg_id(id);
    encoder.set_msg_token(token);
    for opt in request.options() {
        let (key, value) = opt?;
        encoder.insert_option_with_bytes(key, value)?;
    }
    encoder.append_payload_bytes(request.payload())?;
    let bytes: Vec<u8> = encoder.into();
    OwnedImmutableMessage::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageWrite, MsgCode, MsgType, VecMessageEncoder};

    fn encode_request(id: u16, token: &[u8]) -> OwnedImmutableMessage {
        let mut encoder = VecMessageEncoder::default();
        encoder.set_msg_type(MsgType::Con);
        encoder.set_msg_code(MsgCode::MethodGet);
        encoder.set_msg_id(id);
        encoder.set_msg_token(MsgToken::new(token));
        let bytes: Vec<u8> = encoder.into();
        OwnedImmutableMessage::new(bytes).unwrap()
    }

    #[test]
    fn send_request_assigns_id_and_token_when_absent() {
        let config = Config::default();
        let matcher = Arc::new(Matcher::new(&config));
        let exchange = Arc::new(Exchange::new(Origin::Local));
        let mut encoder = VecMessageEncoder::default();
        encoder.set_msg_type(MsgType::Con);
        encoder.set_msg_code(MsgCode::MethodGet);
        let bytes: Vec<u8> = encoder.into();
        let request = OwnedImmutableMessage::new(bytes).unwrap();

        let sent = matcher.send_request(&matcher, &exchange, request).unwrap();
        assert_ne!(sent.msg_token().len(), 0);
        assert_eq!(matcher.exchange_count(), 2);
    }

    #[test]
    fn receive_request_twice_is_reported_as_duplicate() {
        let config = Config::default();
        let matcher = Arc::new(Matcher::new(&config));
        let remote: SocketAddr = "127.0.0.1:5683".parse().unwrap();
        let request = encode_request(10, &[1, 2]);

        let (first, disposition) = matcher.receive_request(&matcher, &request, remote, None);
        assert_eq!(disposition, RequestDisposition::New);

        let (second, disposition) = matcher.receive_request(&matcher, &request, remote, None);
        assert_eq!(disposition, RequestDisposition::Duplicate);
        assert_eq!(first.id(), second.id());
    }

    #[test]
    fn completion_removes_exchange_from_tables() {
        let config = Config::default();
        let matcher = Arc::new(Matcher::new(&config));
        let exchange = Arc::new(Exchange::new(Origin::Local));
        let mut encoder = VecMessageEncoder::default();
        encoder.set_msg_type(MsgType::Con);
        encoder.set_msg_code(MsgCode::MethodGet);
        let bytes: Vec<u8> = encoder.into();
        let request = OwnedImmutableMessage::new(bytes).unwrap();

        matcher.send_request(&matcher, &exchange, request).unwrap();
        assert!(matcher.exchange_count() > 0);
        exchange.complete();
        assert_eq!(matcher.exchange_count(), 0);
    }
}
