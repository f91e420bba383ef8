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

//! Runs a `coap-engine` endpoint with a small demonstration resource tree:
//! an observable `/sensors/temp` resource that a client can `GET` or
//! subscribe to, and the usual `/.well-known/core` link-format listing.

use clap::Parser;
use coap_engine::channel::{Channel, UdpChannel};
use coap_engine::executor::{Executor, ThreadPoolExecutor};
use coap_engine::message::{MessageWrite, MsgCode, MsgType, OwnedImmutableMessage, VecMessageEncoder};
use coap_engine::resource::Resource;
use coap_engine::{Config, Endpoint};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    about = env!("CARGO_PKG_DESCRIPTION"),
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    /// Path to a JSON5 configuration file. Falls back to RFC 7252 §4.8
    /// defaults if omitted.
    #[arg(long)]
    config: Option<String>,

    /// Address to bind the UDP channel to.
    #[arg(long, default_value = "[::]:5683")]
    bind: String,
}

fn build_resources(reading: Arc<AtomicU32>) -> Resource {
    let temp = Resource::new("temp")
        .with_observable(true)
        .with_handler(MsgCode::MethodGet, move |_request| {
            let value = reading.load(Ordering::Relaxed);
            let mut encoder = VecMessageEncoder::default();
            encoder.set_msg_type(MsgType::Ack);
            encoder.set_msg_code(MsgCode::SuccessContent);
            encoder
                .append_payload_bytes(format!("{}", value).as_bytes())
                .map_err(|_| coap_engine::Error::OutOfSpace)?;
            let bytes: Vec<u8> = encoder.into();
            OwnedImmutableMessage::new(bytes)
        });

    let sensors = Resource::new("sensors").with_child(temp);

    let well_known = Resource::new(".well-known");
    Resource::new("").with_child(sensors).with_child(well_known)
}

/// Perturbs the sensor reading every few seconds and pushes the new value to
/// every registered observer of `/sensors/temp`, so an observing client sees
/// more than the value it got from its initial registration.
fn spawn_sensor_driver(endpoint: Arc<Endpoint>, reading: Arc<AtomicU32>) {
    std::thread::Builder::new()
        .name("coap-server-sensor".into())
        .spawn(move || loop {
            std::thread::sleep(Duration::from_secs(5));
            if !endpoint.is_running() {
                break;
            }
            reading.fetch_add(1, Ordering::Relaxed);
            if let Err(error) = endpoint.notify(&["sensors", "temp"]) {
                log::warn!("coap-server: failed to push sensor notification: {}", error);
            }
        })
        .expect("failed to spawn sensor driver thread");
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    simple_logger::SimpleLogger::new().init()?;

    let config = match &cli.config {
        Some(path) => {
            let body = std::fs::read_to_string(path)?;
            Config::load(&body)?
        }
        None => Config::default(),
    };

    let channel: Arc<dyn Channel> = Arc::new(UdpChannel::bind(&cli.bind)?);
    let executor: Arc<dyn Executor> = ThreadPoolExecutor::new(4);

    let reading = Arc::new(AtomicU32::new(21));
    let root = build_resources(Arc::clone(&reading));
    let endpoint = Arc::new(Endpoint::new(channel, executor, &config, root));
    endpoint.start()?;

    log::info!("coap-server listening on {}", endpoint.local_addr()?);
    spawn_sensor_driver(Arc::clone(&endpoint), reading);

    // `start` drives the endpoint from a background receive thread; the
    // main thread just needs to stay alive until asked to stop.
    let (tx, rx) = std::sync::mpsc::channel();
    ctrlc_handler(tx);
    rx.recv().ok();

    endpoint.stop()?;
    Ok(())
}

fn ctrlc_handler(tx: std::sync::mpsc::Sender<()>) {
    // No signal-handling crate in the dependency stack: a dedicated thread
    // reading a line from stdin doubles as a simple "press enter to stop"
    // control, good enough for a demonstration binary.
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        let _ = tx.send(());
    });
}
