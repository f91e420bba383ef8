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

//! Engine configuration knobs, loadable from a JSON5 document or built in code.

use crate::trans_params::{StandardCoapConstants, TransParams};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Selects which [`crate::Deduplicator`] strategy an [`crate::Endpoint`] uses.
///
/// `CropRotation` also accepts the historical misspelling
/// `"DEDUPLICATOR_CROP_ROTATIO"` (missing trailing `N`) for compatibility with
/// configuration documents produced by older deployments; both spellings are
/// logged identically and neither is preferred.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DeduplicatorKind {
    /// Never reports a duplicate. Useful for testing or for transports that
    /// already guarantee exactly-once delivery.
    Noop,
    /// Insert-on-first-sight with a periodic sweep. The default.
    MarkAndSweep,
    /// Three rotating generations, oldest dropped wholesale on rotation.
    #[serde(alias = "DEDUPLICATOR_CROP_ROTATIO")]
    CropRotation,
}

impl Default for DeduplicatorKind {
    fn default() -> Self {
        DeduplicatorKind::MarkAndSweep
    }
}

impl DeduplicatorKind {
    /// Parses the configuration-file spelling of a deduplicator kind, accepting
    /// the documented legacy misspelling for `CropRotation`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Noop" => Some(DeduplicatorKind::Noop),
            "MarkAndSweep" => Some(DeduplicatorKind::MarkAndSweep),
            "CropRotation" | "DEDUPLICATOR_CROP_ROTATIO" => Some(DeduplicatorKind::CropRotation),
            _ => None,
        }
    }
}

fn default_ack_timeout() -> Duration {
    StandardCoapConstants::COAP_ACK_TIMEOUT
}

fn default_ack_random_factor() -> f32 {
    StandardCoapConstants::COAP_ACK_RANDOM_FACTOR
}

fn default_max_retransmit() -> u32 {
    StandardCoapConstants::COAP_MAX_RETRANSMIT
}

fn default_exchange_lifetime() -> Duration {
    StandardCoapConstants.coap_exchange_lifetime()
}

fn default_mark_and_sweep_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_token_length() -> i8 {
    -1
}

fn default_channel_buffer_size() -> usize {
    4096
}

fn default_blockwise_status_lifetime() -> Duration {
    Duration::from_secs(240)
}

/// Transmission and matching parameters for an [`crate::Endpoint`], mirroring the
/// knobs table of [RFC 7252 §4.8](https://tools.ietf.org/html/rfc7252#section-4.8).
///
/// `Config::default()` reproduces the values recommended there. Every field may
/// also be supplied from a JSON5 configuration document via [`Config::load`];
/// unrecognized keys are rejected rather than silently ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Base retransmit timeout for confirmable messages.
    #[serde(default = "default_ack_timeout", with = "duration_secs_f32")]
    pub ack_timeout: Duration,

    /// Upper bound of the jitter multiplier applied to `ack_timeout`; must be `>= 1.0`.
    #[serde(default = "default_ack_random_factor")]
    pub ack_random_factor: f32,

    /// Number of retransmit attempts before a confirmable exchange fails with
    /// [`crate::Error::TransmissionTimeout`].
    #[serde(default = "default_max_retransmit")]
    pub max_retransmit: u32,

    /// Window during which the deduplicator recognizes a repeated `KeyId` and
    /// the maximum age of an exchange.
    #[serde(default = "default_exchange_lifetime", with = "duration_secs_f32")]
    pub exchange_lifetime: Duration,

    /// Sweep period for the [`DeduplicatorKind::MarkAndSweep`] strategy.
    #[serde(
        default = "default_mark_and_sweep_interval",
        with = "duration_secs_f32"
    )]
    pub mark_and_sweep_interval: Duration,

    /// Which deduplication strategy the matcher uses.
    #[serde(default)]
    pub deduplicator: DeduplicatorKind,

    /// Default token length in bytes, `0..=8`. A value of `-1` requests a
    /// random length per request (matching the source's `TokenLength = -1`
    /// convention).
    #[serde(default = "default_token_length")]
    pub token_length: i8,

    /// Seed the message-ID counter with a random value at endpoint start,
    /// rather than starting at zero.
    #[serde(default)]
    pub use_random_id_start: bool,

    /// Datagram receive buffer size tuning, in bytes.
    #[serde(default = "default_channel_buffer_size")]
    pub channel_receive_buffer_size: usize,

    /// Datagram send buffer size tuning, in bytes.
    #[serde(default = "default_channel_buffer_size")]
    pub channel_send_buffer_size: usize,

    /// Maximum size of a single received datagram, in bytes.
    #[serde(default = "default_channel_buffer_size")]
    pub channel_receive_packet_size: usize,

    /// Maximum age of a partially-assembled blockwise body before it is discarded.
    #[serde(
        default = "default_blockwise_status_lifetime",
        with = "duration_secs_f32"
    )]
    pub blockwise_status_lifetime: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ack_timeout: default_ack_timeout(),
            ack_random_factor: default_ack_random_factor(),
            max_retransmit: default_max_retransmit(),
            exchange_lifetime: default_exchange_lifetime(),
            mark_and_sweep_interval: default_mark_and_sweep_interval(),
            deduplicator: DeduplicatorKind::default(),
            token_length: default_token_length(),
            use_random_id_start: false,
            channel_receive_buffer_size: default_channel_buffer_size(),
            channel_send_buffer_size: default_channel_buffer_size(),
            channel_receive_packet_size: default_channel_buffer_size(),
            blockwise_status_lifetime: default_blockwise_status_lifetime(),
        }
    }
}

impl Config {
    /// Loads a `Config` from a JSON5 document, falling back to [`Config::default`]
    /// field-by-field for anything the document omits.
    pub fn load(body: &str) -> Result<Self, serde_json5::Error> {
        serde_json5::from_str(body)
    }
}

mod duration_secs_f32 {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_f32(value.as_secs_f32())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        let secs = f32::deserialize(de)?;
        Ok(Duration::from_secs_f32(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_rfc7252_recommended_values() {
        let config = Config::default();
        assert_eq!(config.ack_timeout, Duration::from_secs(2));
        assert_eq!(config.ack_random_factor, 1.5);
        assert_eq!(config.max_retransmit, 4);
    }

    #[test]
    fn crop_rotation_misspelling_is_accepted() {
        assert_eq!(
            DeduplicatorKind::parse("DEDUPLICATOR_CROP_ROTATIO"),
            Some(DeduplicatorKind::CropRotation)
        );
        assert_eq!(
            DeduplicatorKind::parse("CropRotation"),
            Some(DeduplicatorKind::CropRotation)
        );
    }

    #[test]
    fn load_fills_in_defaults_for_omitted_fields() {
        let config = Config::load("{ max_retransmit: 6 }").unwrap();
        assert_eq!(config.max_retransmit, 6);
        assert_eq!(config.ack_timeout, Duration::from_secs(2));
    }

    #[test]
    fn load_rejects_unknown_fields() {
        assert!(Config::load("{ bogus_knob: 1 }").is_err());
    }

    #[test]
    fn load_accepts_legacy_crop_rotation_spelling() {
        let config = Config::load(r#"{ deduplicator: "DEDUPLICATOR_CROP_ROTATIO" }"#).unwrap();
        assert_eq!(config.deduplicator, DeduplicatorKind::CropRotation);
    }
}
