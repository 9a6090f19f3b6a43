//! Producer that distributes once after a fixed delay, with no trigger.

use std::time::Duration;

use rand::Rng;

use crate::config::ProactiveProducerConfig;
use crate::ndn::{Name, NameError};
use crate::sim::{FaceId, Forwarder, ForwardingError, SimTime};
use crate::trigger::distribution::PROACTIVE_INTEREST_LIFETIME;
use crate::trigger::{DistributionParams, DistributionState, Emission, ProactiveDistribution};

#[derive(Debug)]
pub struct ProactiveProducer {
    distribution: ProactiveDistribution,
    delay: Duration,
    state: DistributionState,
}

impl ProactiveProducer {
    pub fn new(config: &ProactiveProducerConfig) -> Result<Self, NameError> {
        let distribution = ProactiveDistribution::new(DistributionParams {
            prefix: Name::parse(&config.prefix)?,
            sequence: None,
            template: config.data.template()?,
            outbound_face: FaceId(config.outbound_face),
            interest_lifetime: PROACTIVE_INTEREST_LIFETIME,
        });

        Ok(Self {
            distribution,
            delay: config.delay,
            state: DistributionState::Pending,
        })
    }

    /// Delay after start at which the distribution fires
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn distribution(&self) -> &ProactiveDistribution {
        &self.distribution
    }

    pub fn state(&self) -> DistributionState {
        self.state
    }

    /// Fire the distribution. Later calls are no-ops.
    pub fn on_fire<R: Rng + ?Sized>(
        &mut self,
        forwarder: &mut dyn Forwarder,
        rng: &mut R,
        now: SimTime,
    ) -> Result<Option<Emission>, ForwardingError> {
        if !self.state.latch(now) {
            return Ok(None);
        }
        self.distribution.emit(forwarder, rng, now).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataConfig;
    use crate::sim::{NodeId, SimForwarder};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fires_once() {
        let config = ProactiveProducerConfig {
            prefix: "/proactiveDist".to_string(),
            data: DataConfig { payload_size: 8, ..DataConfig::default() },
            delay: Duration::from_secs(10),
            outbound_face: FaceId::NETWORK.0,
        };
        let mut producer = ProactiveProducer::new(&config).unwrap();
        let mut fwd = SimForwarder::new(NodeId(0), true);
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(producer.delay(), Duration::from_secs(10));
        let emission = producer.on_fire(&mut fwd, &mut rng, 10.0).unwrap().unwrap();
        assert_eq!(emission.data.name.to_string(), "/proactiveDist");
        assert_eq!(producer.state().distributed_at(), Some(10.0));

        assert!(producer.on_fire(&mut fwd, &mut rng, 11.0).unwrap().is_none());
        assert_eq!(fwd.content_store().len(), 1);
    }
}
