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

//! Full client/server exchanges over real loopback `UdpChannel`s, driven by
//! [`InlineExecutor`] so each test runs deterministically on the calling
//! thread rather than racing a worker pool.

use coap_engine::channel::{Channel, UdpChannel};
use coap_engine::executor::{Executor, InlineExecutor};
use coap_engine::message::{
    MessageRead, MessageWrite, MsgCode, MsgToken, MsgType, OwnedImmutableMessage, VecMessageEncoder,
};
use coap_engine::option::{OptionInsert, OptionNumber};
use coap_engine::resource::Resource;
use coap_engine::{Config, Endpoint};
use std::sync::Arc;
use std::time::Duration;

fn build_request(code: MsgCode, segments: &[&str], observe: Option<u32>) -> OwnedImmutableMessage {
    let mut encoder = VecMessageEncoder::default();
    encoder.set_msg_type(MsgType::Con);
    encoder.set_msg_code(code);
    encoder.set_msg_token(MsgToken::new(&[1, 2, 3, 4]));
    if let Some(observe) = observe {
        encoder.insert_option_with_u32(OptionNumber::OBSERVE, observe).unwrap();
    }
    for segment in segments {
        encoder.insert_option_with_str(OptionNumber::URI_PATH, segment).unwrap();
    }
    let bytes: Vec<u8> = encoder.into();
    OwnedImmutableMessage::new(bytes).unwrap()
}

fn text_response(code: MsgCode, body: &[u8]) -> OwnedImmutableMessage {
    let mut encoder = VecMessageEncoder::default();
    encoder.set_msg_type(MsgType::Ack);
    encoder.set_msg_code(code);
    encoder.append_payload_bytes(body).unwrap();
    let bytes: Vec<u8> = encoder.into();
    OwnedImmutableMessage::new(bytes).unwrap()
}

fn bound_endpoint(root: Resource, config: &Config) -> Arc<Endpoint> {
    let channel: Arc<dyn Channel> = Arc::new(UdpChannel::bind("127.0.0.1:0").unwrap());
    let executor: Arc<dyn Executor> = Arc::new(InlineExecutor);
    let endpoint = Arc::new(Endpoint::new(channel, executor, config, root));
    endpoint.start().unwrap();
    endpoint
}

#[test]
fn client_receives_servers_response() {
    let config = Config::default();
    let server = bound_endpoint(
        Resource::new("").with_child(
            Resource::new("hello")
                .with_handler(MsgCode::MethodGet, |_req| Ok(text_response(MsgCode::SuccessContent, b"world"))),
        ),
        &config,
    );
    let server_addr = server.local_addr().unwrap();
    let client = bound_endpoint(Resource::new(""), &config);

    let request = build_request(MsgCode::MethodGet, &["hello"], None);
    let exchange = client.send_request(request, server_addr).unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    exchange.on_complete(move || {
        let _ = tx.send(());
    });
    rx.recv_timeout(Duration::from_secs(5)).expect("exchange should complete");

    let response = exchange.current_response().expect("expected a response");
    assert_eq!(response.msg_code(), MsgCode::SuccessContent);
    assert_eq!(response.payload(), b"world");

    client.stop().unwrap();
    server.stop().unwrap();
}

#[test]
fn unknown_path_yields_not_found() {
    let config = Config::default();
    let server = bound_endpoint(Resource::new(""), &config);
    let server_addr = server.local_addr().unwrap();
    let client = bound_endpoint(Resource::new(""), &config);

    let request = build_request(MsgCode::MethodGet, &["missing"], None);
    let exchange = client.send_request(request, server_addr).unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    exchange.on_complete(move || {
        let _ = tx.send(());
    });
    rx.recv_timeout(Duration::from_secs(5)).expect("exchange should complete");

    let response = exchange.current_response().expect("expected a response");
    assert_eq!(response.msg_code(), MsgCode::ClientErrorNotFound);

    client.stop().unwrap();
    server.stop().unwrap();
}

#[test]
fn observe_registration_delivers_a_pushed_notification() {
    let config = Config::default();
    let server = bound_endpoint(
        Resource::new("").with_child(
            Resource::new("temp")
                .with_observable(true)
                .with_handler(MsgCode::MethodGet, |_req| Ok(text_response(MsgCode::SuccessContent, b"21"))),
        ),
        &config,
    );
    let server_addr = server.local_addr().unwrap();
    let client = bound_endpoint(Resource::new(""), &config);

    let register = build_request(MsgCode::MethodGet, &["temp"], Some(0));
    let exchange = client.send_request(register, server_addr).unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    let tx_clone = tx.clone();
    exchange.on_complete(move || {
        let _ = tx_clone.send(());
    });
    rx.recv_timeout(Duration::from_secs(5)).expect("registration should complete");
    assert_eq!(
        exchange.current_response().unwrap().msg_code(),
        MsgCode::SuccessContent
    );

    server.notify(&["temp"]).unwrap();

    client.stop().unwrap();
    server.stop().unwrap();
}
