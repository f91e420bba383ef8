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

//! A message-exchange engine for the Constrained Application Protocol (CoAP, [RFC 7252]).
//!
//! This crate implements the hard part of a CoAP stack: matching responses to requests
//! by id and token, deduplicating retransmitted confirmables, driving per-message
//! reliability (retransmit / back-off / cancel), and routing inbound requests to
//! resource handlers through a URI tree with [observe] and [blockwise transfer] support.
//!
//! [RFC 7252]: https://tools.ietf.org/html/rfc7252
//! [observe]: https://tools.ietf.org/html/rfc7641
//! [blockwise transfer]: https://tools.ietf.org/html/rfc7959
//!
//! ## Design
//!
//! A [`Channel`] is the only thing this crate needs from the outside world: a place to
//! send datagrams and a place inbound datagrams come from. Everything above that —
//! matching, deduplication, retransmission, blockwise reassembly, observe — lives in
//! this crate as an ordered [`Stack`] of layers sitting between the [`Endpoint`] and
//! the [`Matcher`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use coap_engine::prelude::*;
//! use coap_engine::channel::{Channel, UdpChannel};
//! use coap_engine::executor::{Executor, InlineExecutor};
//! use coap_engine::{Config, Endpoint};
//! use coap_engine::resource::Resource;
//!
//! let channel: Arc<dyn Channel> = Arc::new(UdpChannel::bind("[::]:5683").expect("UDP bind failed"));
//! let executor: Arc<dyn Executor> = Arc::new(InlineExecutor);
//! let config = Config::default();
//! let endpoint = Arc::new(Endpoint::new(channel, executor, &config, Resource::new("")));
//! endpoint.start().expect("endpoint already started");
//! ```
//!
//! ## Layering
//!
//! Receive path: `Channel -> Endpoint::receive_data -> Codec::decode -> Matcher::receive_* ->
//! Stack::receive_* (bottom-up through layers) -> ServerMessageDeliverer -> Resource`.
//!
//! Send path: `Resource::respond / Client::send -> Stack::send_* (top-down) -> Matcher::send_* ->
//! Endpoint::outbox -> Codec::encode -> Channel::send`.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]
#![warn(clippy::all)]

#[macro_use]
extern crate log;

pub mod arc_guard;
use arc_guard::*;

#[doc(hidden)]
pub use coap_uri;

pub mod uri {
    //! A limited subset of items from the URI-handling [`coap_uri`] crate.
    //!
    //! See the [`coap_uri`] crate documentation for more details.
    pub use coap_uri::escape;

    pub use coap_uri::{rel_ref, uri, uri_ref};
    pub use coap_uri::{RelRef, Uri, UriRef};
    pub use coap_uri::{RelRefBuf, UriBuf, UriRefBuf};

    pub use coap_uri::{AnyUriRef, UriDisplay, UriType};

    pub use coap_uri::{ParseError, ResolveError};

    pub use coap_uri::UriRawComponents;

    #[doc(hidden)]
    pub(super) use coap_uri::prelude;

    #[doc(hidden)]
    pub use coap_uri::{assert_rel_ref_literal, assert_uri_literal, assert_uri_ref_literal};
}

pub mod message;
pub mod option;

mod response_status;
pub use response_status::ResponseStatus;

mod content_format;
pub use content_format::ContentFormat;

mod block;
pub use block::*;

mod trans_params;
pub use trans_params::*;

pub mod consts;
#[doc(hidden)]
pub use consts::*;

mod error;
pub use error::*;

mod util;
use util::*;

pub mod link_format;
#[doc(hidden)]
pub use link_format::*;

mod etag;
pub use etag::ETag;

pub mod config;
pub use config::{Config, DeduplicatorKind};

pub mod executor;
pub use executor::Executor;

pub mod channel;
pub use channel::{Channel, InboundDatagram, Session};

mod codec;
pub use codec::{decode_message, encode_message, DecodedMessage};

pub mod dedup;
pub use dedup::Deduplicator;

pub mod exchange;
pub use exchange::{Exchange, ExchangeFailure, ExchangeId, KeyId, KeyToken, KeyUri, Origin};

pub mod matcher;
pub use matcher::Matcher;

pub mod stack;
pub use stack::Stack;

pub mod resource;
pub use resource::{ObserveRelation, Resource, ResourceTree};

pub mod endpoint;
pub use endpoint::Endpoint;

use message::MessageRead;
use message::MessageWrite;

#[doc(hidden)]
pub mod prelude {
    pub use super::uri::prelude::*;

    pub use super::Channel;
    pub use super::Config;
    pub use super::Endpoint;
    pub use super::Executor;

    pub use super::ContentFormat;
    pub use super::ResponseStatus;

    pub use super::message::MsgCode;
    pub use super::message::MsgCodeClass;
    pub use super::message::MsgId;
    pub use super::message::MsgToken;
    pub use super::message::MsgType;

    pub use super::option;
    pub use option::OptionInsert;
    pub use option::OptionInsertExt;
    pub use option::OptionIterator;
    pub use option::OptionIteratorExt;
    pub use option::OptionKey;
    pub use option::OptionNumber;

    pub use super::Error;
}
