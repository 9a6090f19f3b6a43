//! Trigger-gated producer.
//!
//! Every tick the producer asks its [`ContentTriggerEvaluator`] whether
//! content is discovered, and fires the one-shot proactive distribution the
//! first time it is. Between ticks it answers interests under its prefix,
//! but only while content is discovered.

use log::debug;
use rand::Rng;

use crate::config::ProducerConfig;
use crate::ndn::{EncodedData, Interest, Name, NameError};
use crate::sim::{FaceId, Forwarder, ForwardingError, SimTime};
use crate::trigger::distribution::PROACTIVE_INTEREST_LIFETIME;
use crate::trigger::{
    ContentTriggerEvaluator, DataTemplate, DistributionParams, Emission, NodeRole, ProactiveDistribution,
    TickOutcome,
};

/// What happened during one producer tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub outcome: TickOutcome,
    pub emission: Option<Emission>,
}

#[derive(Debug)]
pub struct Producer {
    prefix: Name,
    template: DataTemplate,
    evaluator: ContentTriggerEvaluator,
    distribution: ProactiveDistribution,
    ticks_end: u64,
    interests_served: u64,
    interests_declined: u64,
}

impl Producer {
    /// Build a producer from its configuration.
    ///
    /// `stop_seconds` bounds the tick schedule when the config has no `sim_end`.
    pub fn new(
        config: &ProducerConfig,
        role: NodeRole,
        critical_name: Name,
        stop_seconds: u64,
    ) -> Result<Self, NameError> {
        let prefix = Name::parse(&config.prefix)?;
        let template = config.data.template()?;
        let distribution = ProactiveDistribution::new(DistributionParams {
            prefix: prefix.clone(),
            sequence: config.sequence,
            template: template.clone(),
            outbound_face: FaceId(config.outbound_face),
            interest_lifetime: PROACTIVE_INTEREST_LIFETIME,
        });

        Ok(Self {
            prefix,
            template,
            evaluator: ContentTriggerEvaluator::new(config.window(), role, critical_name),
            distribution,
            ticks_end: config.ticks_end(stop_seconds),
            interests_served: 0,
            interests_declined: 0,
        })
    }

    pub fn prefix(&self) -> &Name {
        &self.prefix
    }

    /// Exclusive bound of the 1-second tick schedule
    pub fn ticks_end(&self) -> u64 {
        self.ticks_end
    }

    pub fn evaluator(&self) -> &ContentTriggerEvaluator {
        &self.evaluator
    }

    pub fn distribution(&self) -> &ProactiveDistribution {
        &self.distribution
    }

    pub fn interests_served(&self) -> u64 {
        self.interests_served
    }

    pub fn interests_declined(&self) -> u64 {
        self.interests_declined
    }

    /// Periodic update: evaluate the trigger, then distribute if it just fired
    pub fn on_tick<R: Rng + ?Sized>(
        &mut self,
        forwarder: &mut dyn Forwarder,
        rng: &mut R,
        now: SimTime,
    ) -> Result<TickReport, ForwardingError> {
        let outcome = self.evaluator.evaluate_tick(now, forwarder.content_store());

        let emission = if outcome.distribute {
            Some(self.distribution.emit(forwarder, rng, now)?)
        } else {
            None
        };

        Ok(TickReport { outcome, emission })
    }

    /// Answer an interest with Data of the same name while content is discovered
    pub fn on_interest(&mut self, interest: &Interest) -> Option<EncodedData> {
        if !self.evaluator.state().content_discovered {
            debug!("producer {} declining {}: content not discovered", self.prefix, interest.name);
            self.interests_declined += 1;
            return None;
        }

        self.interests_served += 1;
        debug!("producer {} responding with Data {}", self.prefix, interest.name);
        Some(self.template.make_data(interest.name.clone()).wire_encode())
    }
}
