//! Per-node forwarding engine.
//!
//! A small NFD-like pipeline: content store lookup, a FIB for
//! routing interests to local producer faces or the network face, a PIT for
//! returning Data to the faces that asked for it, and a nonce list to drop
//! looping interests. The forwarder never transmits by itself; it returns
//! [`ForwarderAction`]s that the simulation delivers to whatever sits behind
//! each face.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::ndn::{EncodedData, Interest, Name};

use super::content_store::{ContentStore, MemoryContentStore};
use super::types::{FaceId, FaceScope, NodeId, SimTime};

/// Forwarding failures; all of them are fatal to the run
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForwardingError {
    #[error("{node}: no face with id {face}")]
    UnknownFace { node: NodeId, face: FaceId },
    #[error("{node}: face {face} already exists")]
    DuplicateFace { node: NodeId, face: FaceId },
}

/// A forwarder face
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    id: FaceId,
    scope: FaceScope,
    label: String,
}

impl Face {
    pub fn new(id: FaceId, scope: FaceScope, label: impl Into<String>) -> Self {
        Self { id, scope, label: label.into() }
    }

    pub fn id(&self) -> FaceId {
        self.id
    }

    pub fn scope(&self) -> FaceScope {
        self.scope
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Transmission requested by the forwarder
#[derive(Debug, Clone, PartialEq)]
pub enum ForwarderAction {
    SendInterest { face: FaceId, interest: Interest },
    SendData { face: FaceId, data: EncodedData },
}

/// Forwarding engine operations used by producer apps
pub trait Forwarder {
    fn face(&self, id: FaceId) -> Option<&Face>;

    fn content_store(&self) -> &dyn ContentStore;

    fn content_store_mut(&mut self) -> &mut dyn ContentStore;

    /// Run the incoming-interest pipeline as if `interest` arrived on `face`
    fn begin_interest_processing(
        &mut self,
        face: FaceId,
        interest: Interest,
        now: SimTime,
    ) -> Result<Vec<ForwarderAction>, ForwardingError>;

    /// Run the incoming-data pipeline as if `data` arrived on `face`
    fn on_incoming_data(
        &mut self,
        face: FaceId,
        data: EncodedData,
        now: SimTime,
    ) -> Result<Vec<ForwarderAction>, ForwardingError>;
}

#[derive(Debug, Clone)]
struct PitEntry {
    interest: Interest,
    downstreams: Vec<FaceId>,
    expires_at: SimTime,
}

/// Forwarder used by simulated nodes
#[derive(Debug)]
pub struct SimForwarder {
    node: NodeId,
    faces: BTreeMap<FaceId, Face>,
    cs: MemoryContentStore,
    fib: Vec<(Name, FaceId)>,
    pit: Vec<PitEntry>,
    /// Recently seen (name, nonce) pairs and when each stops counting as a loop
    seen_nonces: HashMap<(Name, u32), SimTime>,
    admit_unsolicited: bool,
    next_face_id: u64,
}

impl SimForwarder {
    /// Create a forwarder with the app face, the network face and a default
    /// route to the network.
    pub fn new(node: NodeId, admit_unsolicited: bool) -> Self {
        let mut faces = BTreeMap::new();
        faces.insert(FaceId::APP, Face::new(FaceId::APP, FaceScope::Local, "app"));
        faces.insert(FaceId::NETWORK, Face::new(FaceId::NETWORK, FaceScope::NonLocal, "net"));

        Self {
            node,
            faces,
            cs: MemoryContentStore::new(),
            fib: vec![(Name::root(), FaceId::NETWORK)],
            pit: Vec::new(),
            seen_nonces: HashMap::new(),
            admit_unsolicited,
            next_face_id: FaceId::FIRST_DYNAMIC,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Add a local face for an additional app and return its id
    pub fn add_app_face(&mut self, label: impl Into<String>) -> FaceId {
        let id = FaceId(self.next_face_id);
        self.next_face_id += 1;
        self.faces.insert(id, Face::new(id, FaceScope::Local, label));
        id
    }

    /// Add a face with a caller-chosen id
    pub fn add_face(&mut self, face: Face) -> Result<(), ForwardingError> {
        if self.faces.contains_key(&face.id) {
            return Err(ForwardingError::DuplicateFace { node: self.node, face: face.id });
        }
        self.faces.insert(face.id, face);
        Ok(())
    }

    /// Register a route; equal prefixes keep their first registration
    pub fn add_route(&mut self, prefix: Name, face: FaceId) -> Result<(), ForwardingError> {
        self.require_face(face)?;
        if !self.fib.iter().any(|(p, f)| *p == prefix && *f == face) {
            self.fib.push((prefix, face));
        }
        Ok(())
    }

    /// Number of unexpired PIT entries
    pub fn pit_len(&self) -> usize {
        self.pit.len()
    }

    fn require_face(&self, face: FaceId) -> Result<&Face, ForwardingError> {
        self.faces
            .get(&face)
            .ok_or(ForwardingError::UnknownFace { node: self.node, face })
    }

    /// Longest-prefix match, skipping the face the interest arrived on
    fn lookup_route(&self, name: &Name, exclude: FaceId) -> Option<FaceId> {
        self.fib
            .iter()
            .filter(|(prefix, face)| *face != exclude && prefix.is_prefix_of(name))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, face)| *face)
    }

    /// Drop PIT entries and remembered nonces whose interest lifetime has passed
    fn expire(&mut self, now: SimTime) {
        self.pit.retain(|entry| entry.expires_at > now);
        self.seen_nonces.retain(|_, expires_at| *expires_at > now);
    }
}

impl Forwarder for SimForwarder {
    fn face(&self, id: FaceId) -> Option<&Face> {
        self.faces.get(&id)
    }

    fn content_store(&self) -> &dyn ContentStore {
        &self.cs
    }

    fn content_store_mut(&mut self) -> &mut dyn ContentStore {
        &mut self.cs
    }

    fn begin_interest_processing(
        &mut self,
        face: FaceId,
        interest: Interest,
        now: SimTime,
    ) -> Result<Vec<ForwarderAction>, ForwardingError> {
        self.require_face(face)?;
        self.expire(now);

        let key = (interest.name.clone(), interest.nonce);
        if self.seen_nonces.contains_key(&key) {
            debug!("{} dropping duplicate interest {} nonce={}", self.node, interest.name, interest.nonce);
            return Ok(Vec::new());
        }
        self.seen_nonces.insert(key, now + interest.lifetime.as_secs_f64());

        let hit = if interest.can_be_prefix {
            self.cs.find_prefix(&interest.name)
        } else {
            self.cs.find_exact(&interest.name)
        };
        if let Some(entry) = hit {
            debug!("{} content store hit for {} on {}", self.node, interest.name, face);
            return Ok(vec![ForwarderAction::SendData { face, data: entry.data.clone() }]);
        }

        let Some(out_face) = self.lookup_route(&interest.name, face) else {
            debug!("{} no route for {} from {}", self.node, interest.name, face);
            return Ok(Vec::new());
        };

        let expires_at = now + interest.lifetime.as_secs_f64();
        match self.pit.iter_mut().find(|e| e.interest.name == interest.name) {
            Some(entry) => {
                if !entry.downstreams.contains(&face) {
                    entry.downstreams.push(face);
                }
                entry.expires_at = entry.expires_at.max(expires_at);
            }
            None => self.pit.push(PitEntry {
                interest: interest.clone(),
                downstreams: vec![face],
                expires_at,
            }),
        }

        Ok(vec![ForwarderAction::SendInterest { face: out_face, interest }])
    }

    fn on_incoming_data(
        &mut self,
        face: FaceId,
        data: EncodedData,
        now: SimTime,
    ) -> Result<Vec<ForwarderAction>, ForwardingError> {
        let scope = self.require_face(face)?.scope();
        self.expire(now);

        let mut downstreams = Vec::new();
        self.pit.retain(|entry| {
            if entry.interest.matches(&data.name) {
                downstreams.extend(entry.downstreams.iter().copied().filter(|f| *f != face));
                false
            } else {
                true
            }
        });
        downstreams.sort();
        downstreams.dedup();

        if downstreams.is_empty() {
            if scope == FaceScope::NonLocal && !self.admit_unsolicited {
                debug!("{} dropping unsolicited data {}", self.node, data.name);
                return Ok(Vec::new());
            }
            debug!("{} caching unsolicited data {} from {}", self.node, data.name, face);
            self.cs.insert(data, true, now);
            return Ok(Vec::new());
        }

        self.cs.insert(data.clone(), false, now);
        Ok(downstreams
            .into_iter()
            .map(|face| ForwarderAction::SendData { face, data: data.clone() })
            .collect())
    }
}
