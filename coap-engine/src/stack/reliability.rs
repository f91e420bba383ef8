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

//! Drives RFC 7252 §4.2 confirmable retransmission: writes a request to the
//! channel, and for `CON` messages arms an exponential-backoff retransmit
//! timer on the engine's [`crate::Executor`] that keeps resending until an
//! ACK/RST completes the exchange, the retry budget is exhausted, or the
//! exchange completes for some other reason (e.g. an RST cancels it).

use crate::channel::Channel;
use crate::codec::encode_message;
use crate::config::Config;
use crate::exchange::{Exchange, ExchangeFailure};
use crate::executor::Executor;
use crate::matcher::Matcher;
use crate::message::{MessageRead, MsgType, OwnedImmutableMessage};
use crate::Error;
use rand::Rng;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
pub struct ReliabilityLayer {
    ack_timeout: Duration,
    ack_random_factor: f32,
    max_retransmit: u32,
}

impl ReliabilityLayer {
    pub fn new(config: &Config) -> Self {
        ReliabilityLayer {
            ack_timeout: config.ack_timeout,
            ack_random_factor: config.ack_random_factor,
            max_retransmit: config.max_retransmit,
        }
    }

    /// Registers `request` with the matcher, writes it to the channel, and
    /// for a confirmable message arms a retransmit timer on `executor`.
    /// `exchange` is already installed in the matcher's tables by the time
    /// this returns; cancellation of the timer happens via
    /// [`ReliabilityLayer::cancel`], driven by the matcher noticing an
    /// ACK/RST/response.
    pub fn send_request(
        &self,
        matcher: &Arc<Matcher>,
        channel: &Arc<dyn Channel>,
        executor: &Arc<dyn Executor>,
        exchange: &Arc<Exchange>,
        request: OwnedImmutableMessage,
        remote: SocketAddr,
    ) -> Result<(), Error> {
        let request = matcher.send_request(matcher, exchange, request)?;
        let is_con = request.msg_type() == MsgType::Con;

        let session = channel.get_session(remote)?;
        channel.send(&encode_message(&request)?, session, remote)?;

        if is_con {
            self.spawn_retransmit_timer(channel, executor, exchange, request, remote);
        }

        Ok(())
    }

    /// Marks `exchange` as no longer needing retransmission. The spawned
    /// timer task checks [`Exchange::is_complete`] before every retry, so
    /// simply completing the exchange (already done by the matcher on
    /// ACK/RST/response receipt) is sufficient; this method exists as the
    /// named seam the stack calls through and to document that fact.
    pub fn cancel(&self, exchange: &Arc<Exchange>) {
        exchange.complete();
    }

    /// Marks `exchange` complete with [`ExchangeFailure::Rejected`]: the
    /// peer sent an RST, explicitly declining it rather than merely timing
    /// out or answering normally.
    pub fn reject(&self, exchange: &Arc<Exchange>) {
        exchange.fail(ExchangeFailure::Rejected);
    }

    fn spawn_retransmit_timer(
        &self,
        channel: &Arc<dyn Channel>,
        executor: &Arc<dyn Executor>,
        exchange: &Arc<Exchange>,
        request: OwnedImmutableMessage,
        remote: SocketAddr,
    ) {
        let channel = Arc::clone(channel);
        let exchange = Arc::clone(exchange);
        let max_retransmit = self.max_retransmit;
        let mut timeout = jittered_timeout(self.ack_timeout, self.ack_random_factor);

        let task = Box::pin(async move {
            for _attempt in 0..max_retransmit {
                futures_timer::Delay::new(timeout).await;

                if exchange.is_complete() {
                    return;
                }

                let session = match channel.get_session(remote) {
                    Ok(session) => session,
                    Err(error) => {
                        log::warn!("retransmit: could not resolve session for {}: {}", remote, error);
                        return;
                    }
                };

                if let Ok(bytes) = encode_message(&request) {
                    if let Err(error) = channel.send(&bytes, session, remote) {
                        log::warn!("retransmit to {} failed: {}", remote, error);
                        return;
                    }
                }

                timeout *= 2;
            }

            if !exchange.is_complete() {
                log::debug!("exchange {:?} timed out after {} retransmits", exchange.id(), max_retransmit);
                exchange.fail(ExchangeFailure::TransmissionTimeout);
            }
        });

        executor.spawn(task);
    }
}

fn jittered_timeout(base: Duration, random_factor: f32) -> Duration {
    let factor = rand::thread_rng().gen_range(1.0..random_factor.max(1.0 + f32::EPSILON));
    base.mul_f32(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jittered_timeout_stays_within_bounds() {
        let base = Duration::from_secs(2);
        for _ in 0..100 {
            let timeout = jittered_timeout(base, 1.5);
            assert!(timeout >= base);
            assert!(timeout <= base.mul_f32(1.5));
        }
    }

    #[test]
    fn jittered_timeout_handles_unit_random_factor() {
        let base = Duration::from_secs(2);
        let timeout = jittered_timeout(base, 1.0);
        assert!(timeout >= base);
    }
}
