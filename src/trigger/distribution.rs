//! One-shot proactive distribution.
//!
//! Builds the Data packet for the discovered content, caches it locally as
//! unsolicited, then pushes a synthetic Interest for the same name through
//! the forwarder on a non-local face so the cached Data goes out onto the
//! network without waiting for a consumer.

use std::time::Duration;

use log::info;
use rand::Rng;

use crate::ndn::{Data, EncodedData, Interest, Name, SignatureInfo};
use crate::sim::{FaceId, FaceScope, Forwarder, ForwarderAction, ForwardingError, SimTime};

use super::PreconditionError;

/// Lifetime of the synthetic interest
pub const PROACTIVE_INTEREST_LIFETIME: Duration = Duration::from_secs(300);

/// What the producer puts into its Data packets
#[derive(Debug, Clone, PartialEq)]
pub struct DataTemplate {
    pub payload_size: usize,
    pub freshness: Duration,
    /// Placeholder signature value; not a real signature
    pub signature: u64,
    pub key_locator: Option<Name>,
}

impl DataTemplate {
    /// Build a Data packet named `name` with a zero-filled payload
    pub fn make_data(&self, name: Name) -> Data {
        Data {
            name,
            freshness: self.freshness,
            content: vec![0; self.payload_size],
            signature_info: SignatureInfo::fake(self.key_locator.clone()),
            signature_value: self.signature,
        }
    }
}

/// Parameters of a proactive distribution
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionParams {
    pub prefix: Name,
    /// Appended to the prefix as a sequence-number component when set
    pub sequence: Option<u64>,
    pub template: DataTemplate,
    pub outbound_face: FaceId,
    pub interest_lifetime: Duration,
}

/// Everything a distribution produced
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub data: EncodedData,
    pub interest: Interest,
    /// Transmissions the forwarder requested while processing the interest
    pub actions: Vec<ForwarderAction>,
}

/// Emits the proactive Data/Interest pair
#[derive(Debug, Clone)]
pub struct ProactiveDistribution {
    params: DistributionParams,
}

impl ProactiveDistribution {
    pub fn new(params: DistributionParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DistributionParams {
        &self.params
    }

    /// Name of the distributed Data
    pub fn data_name(&self) -> Name {
        match self.params.sequence {
            Some(seq) => self.params.prefix.with_sequence(seq),
            None => self.params.prefix.clone(),
        }
    }

    pub fn build_data(&self) -> Data {
        self.params.template.make_data(self.data_name())
    }

    /// Check that the outbound face exists and leads off the node
    pub fn check_preconditions(&self, forwarder: &dyn Forwarder) -> Result<(), PreconditionError> {
        let face_id = self.params.outbound_face;
        match forwarder.face(face_id) {
            None => Err(PreconditionError::MissingFace(face_id)),
            Some(face) if face.scope() == FaceScope::Local => Err(PreconditionError::LocalOutboundFace(face_id)),
            Some(_) => Ok(()),
        }
    }

    /// Encode and cache the Data, then process a synthetic Interest for it on
    /// the outbound face.
    ///
    /// The nonce is drawn uniformly from the full 32-bit range.
    pub fn emit<R: Rng + ?Sized>(
        &self,
        forwarder: &mut dyn Forwarder,
        rng: &mut R,
        now: SimTime,
    ) -> Result<Emission, ForwardingError> {
        let data = self.build_data().wire_encode();
        info!("proactively distributing Data {} ({} bytes) at t={}", data.name, data.wire.len(), now);

        forwarder.content_store_mut().insert(data.clone(), true, now);

        let interest = Interest::new(data.name.clone(), rng.gen::<u32>())
            .with_lifetime(self.params.interest_lifetime)
            .with_can_be_prefix(self.params.sequence.is_some());

        let actions = forwarder.begin_interest_processing(self.params.outbound_face, interest.clone(), now)?;

        Ok(Emission { data, interest, actions })
    }
}
