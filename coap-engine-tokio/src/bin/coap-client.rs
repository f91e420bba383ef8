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

//! Sends a single CoAP request to a `coap://host[:port]/path` URI and
//! prints the response.

use clap::Parser;
use coap_engine::channel::{Channel, UdpChannel};
use coap_engine::executor::{Executor, InlineExecutor};
use coap_engine::message::{
    MessageRead, MessageWrite, MsgCode, MsgToken, MsgType, OwnedImmutableMessage, VecMessageEncoder,
};
use coap_engine::option::{OptionInsert, OptionNumber};
use coap_engine::resource::Resource;
use coap_engine::{Config, Endpoint, ExchangeFailure};
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    about = env!("CARGO_PKG_DESCRIPTION"),
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    /// Target URI, e.g. `coap://127.0.0.1:5683/sensors/temp`.
    uri: String,

    /// Request method.
    #[arg(long, default_value = "get")]
    method: String,

    /// Seconds to wait for a response before giving up.
    #[arg(long, default_value_t = 5)]
    timeout: u64,
}

fn method_code(method: &str) -> anyhow::Result<MsgCode> {
    match method.to_ascii_lowercase().as_str() {
        "get" => Ok(MsgCode::MethodGet),
        "post" => Ok(MsgCode::MethodPost),
        "put" => Ok(MsgCode::MethodPut),
        "delete" => Ok(MsgCode::MethodDelete),
        other => Err(anyhow::anyhow!("unsupported method: {}", other)),
    }
}

/// Splits `coap://host[:port]/a/b/c` into `(host:port, [a, b, c])`.
fn split_uri(uri: &str) -> anyhow::Result<(String, Vec<String>)> {
    let rest = uri
        .strip_prefix("coap://")
        .ok_or_else(|| anyhow::anyhow!("only coap:// URIs are supported"))?;
    let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
    let authority = if authority.contains(':') {
        authority.to_string()
    } else {
        format!("{}:5683", authority)
    };
    let segments = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();
    Ok((authority, segments))
}

fn fresh_token() -> MsgToken {
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u32)
        .unwrap_or(0);
    MsgToken::new(&nonce.to_be_bytes())
}

fn build_request(code: MsgCode, segments: &[String]) -> anyhow::Result<OwnedImmutableMessage> {
    let mut encoder = VecMessageEncoder::default();
    encoder.set_msg_type(MsgType::Con);
    encoder.set_msg_code(code);
    encoder.set_msg_token(fresh_token());
    for segment in segments {
        encoder.insert_option_with_str(OptionNumber::URI_PATH, segment)?;
    }
    let bytes: Vec<u8> = encoder.into();
    Ok(OwnedImmutableMessage::new(bytes)?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    simple_logger::SimpleLogger::new().init()?;

    let (authority, segments) = split_uri(&cli.uri)?;
    let remote = authority
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| anyhow::anyhow!("could not resolve {}", authority))?;

    let channel: Arc<dyn Channel> = Arc::new(UdpChannel::bind("0.0.0.0:0")?);
    let executor: Arc<dyn Executor> = Arc::new(InlineExecutor);
    let config = Config::default();
    let endpoint = Arc::new(Endpoint::new(channel, executor, &config, Resource::new("")));
    endpoint.start()?;

    let request = build_request(method_code(&cli.method)?, &segments)?;
    let exchange = endpoint.send_request(request, remote)?;

    let (tx, rx) = std::sync::mpsc::channel();
    exchange.on_complete(move || {
        let _ = tx.send(());
    });

    match rx.recv_timeout(Duration::from_secs(cli.timeout)) {
        Ok(()) => match exchange.current_response() {
            Some(response) => {
                println!("{:?} {:?}", response.msg_type(), response.msg_code());
                println!("{}", String::from_utf8_lossy(response.payload()));
            }
            None => match exchange.failure_reason() {
                Some(ExchangeFailure::TransmissionTimeout) => {
                    println!("no response: retransmit budget exhausted")
                }
                Some(ExchangeFailure::Rejected) => println!("no response: peer sent a reset"),
                None => println!("exchange completed without a response"),
            },
        },
        Err(_) => println!("timed out waiting for a response"),
    }

    endpoint.stop()?;
    Ok(())
}
