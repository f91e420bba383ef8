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

//! Short-term duplicate detection for retransmitted confirmables.

use crate::config::DeduplicatorKind;
use crate::exchange::{Exchange, KeyId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A mapping `KeyId -> Exchange` with a bounded lifetime, used to recognize a
/// retransmitted confirmable so the matcher can replay its stored response
/// instead of re-invoking a resource handler.
///
/// All three strategies share one entry point, [`Deduplicator::find_previous`]:
/// an atomic insert-or-return that is the sole primitive the matcher needs.
#[derive(Debug)]
pub enum Deduplicator {
    /// Never reports a duplicate.
    Noop,
    /// Insert-on-first-sight, evicted by a periodic sweep.
    MarkAndSweep(Mutex<MarkAndSweepState>),
    /// Three rotating generations; insertion always targets the youngest.
    CropRotation(Mutex<CropRotationState>),
}

#[derive(Debug)]
pub struct MarkAndSweepState {
    entries: HashMap<KeyId, (Arc<Exchange>, Instant)>,
    lifetime: Duration,
}

#[derive(Debug)]
pub struct CropRotationState {
    generations: [HashMap<KeyId, Arc<Exchange>>; 3],
}

impl Deduplicator {
    /// Builds a deduplicator of the requested kind.
    ///
    /// `exchange_lifetime` bounds how long an entry is considered a duplicate
    /// once inserted; for [`DeduplicatorKind::MarkAndSweep`] it is also the
    /// threshold a sweep uses to decide what to evict.
    pub fn new(kind: DeduplicatorKind, exchange_lifetime: Duration) -> Self {
        match kind {
            DeduplicatorKind::Noop => Deduplicator::Noop,
            DeduplicatorKind::MarkAndSweep => Deduplicator::MarkAndSweep(Mutex::new(MarkAndSweepState {
                entries: HashMap::new(),
                lifetime: exchange_lifetime,
            })),
            DeduplicatorKind::CropRotation => {
                Deduplicator::CropRotation(Mutex::new(CropRotationState {
                    generations: [HashMap::new(), HashMap::new(), HashMap::new()],
                }))
            }
        }
    }

    /// Inserts `exchange` under `key` if absent, returning `None` — this is
    /// the "first time we've seen this key" case. If an entry already exists
    /// under `key`, it is left untouched and returned instead: the caller has
    /// a duplicate on its hands.
    pub fn find_previous(&self, key: KeyId, exchange: Arc<Exchange>) -> Option<Arc<Exchange>> {
        match self {
            Deduplicator::Noop => None,
            Deduplicator::MarkAndSweep(state) => {
                let mut state = state.lock().expect("mark-and-sweep state poisoned");
                if let Some((existing, _)) = state.entries.get(&key) {
                    return Some(Arc::clone(existing));
                }
                state.entries.insert(key, (exchange, Instant::now()));
                None
            }
            Deduplicator::CropRotation(state) => {
                let mut state = state.lock().expect("crop-rotation state poisoned");
                for generation in state.generations.iter() {
                    if let Some(existing) = generation.get(&key) {
                        return Some(Arc::clone(existing));
                    }
                }
                state.generations[0].insert(key, exchange);
                None
            }
        }
    }

    /// Evicts entries older than this deduplicator's configured lifetime.
    ///
    /// Only meaningful for [`Deduplicator::MarkAndSweep`]; a no-op for the
    /// other two strategies, which manage their own eviction via
    /// [`Deduplicator::rotate`] or never evict at all.
    pub fn sweep(&self) {
        if let Deduplicator::MarkAndSweep(state) = self {
            let mut state = state.lock().expect("mark-and-sweep state poisoned");
            let lifetime = state.lifetime;
            let now = Instant::now();
            state
                .entries
                .retain(|_, (_, inserted_at)| now.duration_since(*inserted_at) < lifetime);
        }
    }

    /// Rotates the three generations, dropping the oldest wholesale.
    ///
    /// Only meaningful for [`Deduplicator::CropRotation`]; a no-op otherwise.
    pub fn rotate(&self) {
        if let Deduplicator::CropRotation(state) = self {
            let mut state = state.lock().expect("crop-rotation state poisoned");
            state.generations = [
                HashMap::new(),
                std::mem::take(&mut state.generations[0]),
                std::mem::take(&mut state.generations[1]),
            ];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{Exchange, Origin};

    fn test_exchange() -> Arc<Exchange> {
        Arc::new(Exchange::new_for_test(Origin::Remote))
    }

    #[test]
    fn noop_never_reports_a_duplicate() {
        let dedup = Deduplicator::new(DeduplicatorKind::Noop, Duration::from_secs(1));
        let key = KeyId {
            id: 1,
            remote: None,
            session: 0,
        };
        assert!(dedup.find_previous(key, test_exchange()).is_none());
        assert!(dedup.find_previous(key, test_exchange()).is_none());
    }

    #[test]
    fn mark_and_sweep_detects_a_repeat_and_sweep_evicts_it() {
        let dedup = Deduplicator::new(DeduplicatorKind::MarkAndSweep, Duration::from_millis(10));
        let key = KeyId {
            id: 2,
            remote: None,
            session: 0,
        };
        let first = test_exchange();
        assert!(dedup.find_previous(key, Arc::clone(&first)).is_none());
        let second = dedup.find_previous(key, test_exchange());
        assert!(Arc::ptr_eq(&second.unwrap(), &first));

        std::thread::sleep(Duration::from_millis(20));
        dedup.sweep();
        assert!(dedup.find_previous(key, test_exchange()).is_none());
    }

    #[test]
    fn crop_rotation_drops_oldest_generation() {
        let dedup = Deduplicator::new(DeduplicatorKind::CropRotation, Duration::from_secs(60));
        let key = KeyId {
            id: 3,
            remote: None,
            session: 0,
        };
        assert!(dedup.find_previous(key, test_exchange()).is_none());
        assert!(dedup.find_previous(key, test_exchange()).is_some());

        dedup.rotate();
        dedup.rotate();
        dedup.rotate();
        assert!(dedup.find_previous(key, test_exchange()).is_none());
    }
}
