//! Constant-rate consumer used to observe whether distributed content can be
//! fetched.

use std::collections::BTreeMap;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ConsumerConfig;
use crate::ndn::{EncodedData, Interest, Name, NameError};
use crate::sim::{FaceId, SimTime};

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumerStats {
    pub interests_sent: u64,
    pub data_received: u64,
    pub first_data_at: Option<SimTime>,
    /// Mean time between sending an interest and receiving its Data
    pub mean_delay: Option<f64>,
}

#[derive(Debug)]
pub struct Consumer {
    face: FaceId,
    prefix: Name,
    sequence: bool,
    next_seq: u64,
    start: Duration,
    interval: f64,
    lifetime: Duration,
    outstanding: BTreeMap<Name, SimTime>,
    total_delay: f64,
    stats: ConsumerStats,
}

impl Consumer {
    /// Build a consumer attached to `face`
    pub fn new(config: &ConsumerConfig, face: FaceId) -> Result<Self, NameError> {
        Ok(Self {
            face,
            prefix: Name::parse(&config.prefix)?,
            sequence: config.sequence,
            next_seq: 0,
            start: config.start,
            interval: 1.0 / config.frequency,
            lifetime: config.lifetime,
            outstanding: BTreeMap::new(),
            total_delay: 0.0,
            stats: ConsumerStats::default(),
        })
    }

    pub fn face(&self) -> FaceId {
        self.face
    }

    pub fn prefix(&self) -> &Name {
        &self.prefix
    }

    pub fn start(&self) -> Duration {
        self.start
    }

    /// Seconds between interests
    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn stats(&self) -> &ConsumerStats {
        &self.stats
    }

    /// Build the next interest to send
    pub fn next_interest<R: Rng + ?Sized>(&mut self, rng: &mut R, now: SimTime) -> Interest {
        let name = if self.sequence {
            let name = self.prefix.with_sequence(self.next_seq);
            self.next_seq += 1;
            name
        } else {
            self.prefix.clone()
        };

        // Drop interests that can no longer be satisfied
        let lifetime = self.lifetime.as_secs_f64();
        self.outstanding.retain(|_, sent_at| now - *sent_at < lifetime);
        self.outstanding.entry(name.clone()).or_insert(now);
        self.stats.interests_sent += 1;

        Interest::new(name, rng.gen::<u32>()).with_lifetime(self.lifetime)
    }

    /// Record Data delivered to the consumer face. Returns false for Data
    /// that matches no outstanding interest.
    pub fn on_data(&mut self, data: &EncodedData, now: SimTime) -> bool {
        let Some(sent_at) = self.outstanding.remove(&data.name) else {
            return false;
        };

        self.stats.data_received += 1;
        self.stats.first_data_at.get_or_insert(now);
        self.total_delay += now - sent_at;
        self.stats.mean_delay = Some(self.total_delay / self.stats.data_received as f64);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn consumer(sequence: bool) -> Consumer {
        let config = ConsumerConfig {
            prefix: "/criticalData/test".to_string(),
            start: Duration::from_secs(1),
            frequency: 4.0,
            sequence,
            lifetime: Duration::from_secs(2),
        };
        Consumer::new(&config, FaceId(258)).unwrap()
    }

    fn data(name: &Name) -> EncodedData {
        EncodedData { name: name.clone(), freshness: Duration::ZERO, wire: vec![] }
    }

    #[test]
    fn test_sequence_names() {
        let mut c = consumer(true);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(c.interval(), 0.25);
        assert_eq!(c.next_interest(&mut rng, 1.0).name.to_string(), "/criticalData/test/seq=0");
        assert_eq!(c.next_interest(&mut rng, 1.25).name.to_string(), "/criticalData/test/seq=1");
        assert_eq!(c.stats().interests_sent, 2);
    }

    #[test]
    fn test_data_tracking() {
        let mut c = consumer(false);
        let mut rng = StdRng::seed_from_u64(0);
        let interest = c.next_interest(&mut rng, 1.0);

        assert!(c.on_data(&data(&interest.name), 1.5));
        assert!(!c.on_data(&data(&interest.name), 1.6));

        let stats = c.stats();
        assert_eq!(stats.data_received, 1);
        assert_eq!(stats.first_data_at, Some(1.5));
        assert_eq!(stats.mean_delay, Some(0.5));
    }

    #[test]
    fn test_expired_interest_is_forgotten() {
        let mut c = consumer(true);
        let mut rng = StdRng::seed_from_u64(0);
        let old = c.next_interest(&mut rng, 1.0);
        c.next_interest(&mut rng, 5.0);
        assert!(!c.on_data(&data(&old.name), 5.1));
    }
}
