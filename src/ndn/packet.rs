//! Data and Interest packets with their TLV wire encoding.

use std::time::Duration;

use super::name::Name;
use super::tlv::{self, types};

/// Signature type used for placeholder ("fake") signatures
pub const FAKE_SIGNATURE_TYPE: u64 = 255;

/// Default InterestLifetime; omitted from the wire when unchanged
pub const DEFAULT_INTEREST_LIFETIME: Duration = Duration::from_millis(4000);

/// SignatureInfo block of a Data packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    pub signature_type: u64,
    pub key_locator: Option<Name>,
}

impl SignatureInfo {
    /// Placeholder signature info (type 255), with a key locator when one is given
    pub fn fake(key_locator: Option<Name>) -> Self {
        Self {
            signature_type: FAKE_SIGNATURE_TYPE,
            key_locator: key_locator.filter(|name| !name.is_empty()),
        }
    }
}

/// A Data packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub name: Name,
    pub freshness: Duration,
    pub content: Vec<u8>,
    pub signature_info: SignatureInfo,
    /// Opaque placeholder written as a NonNegativeInteger SignatureValue
    pub signature_value: u64,
}

impl Data {
    /// Encode to the NDN TLV wire format.
    ///
    /// MetaInfo and Content are always present; FreshnessPeriod is omitted
    /// when zero.
    pub fn wire_encode(&self) -> EncodedData {
        let mut value = Vec::new();
        self.name.encode_into(&mut value);

        let mut meta = Vec::new();
        let freshness_ms = self.freshness.as_millis() as u64;
        if freshness_ms > 0 {
            tlv::write_non_negative_integer(&mut meta, types::FRESHNESS_PERIOD, freshness_ms);
        }
        tlv::write_tlv(&mut value, types::META_INFO, &meta);

        tlv::write_tlv(&mut value, types::CONTENT, &self.content);

        let mut sig_info = Vec::new();
        tlv::write_non_negative_integer(
            &mut sig_info,
            types::SIGNATURE_TYPE,
            self.signature_info.signature_type,
        );
        if let Some(key_locator) = &self.signature_info.key_locator {
            let mut locator = Vec::new();
            key_locator.encode_into(&mut locator);
            tlv::write_tlv(&mut sig_info, types::KEY_LOCATOR, &locator);
        }
        tlv::write_tlv(&mut value, types::SIGNATURE_INFO, &sig_info);

        tlv::write_non_negative_integer(&mut value, types::SIGNATURE_VALUE, self.signature_value);

        let mut wire = Vec::with_capacity(value.len() + 10);
        tlv::write_tlv(&mut wire, types::DATA, &value);

        EncodedData {
            name: self.name.clone(),
            freshness: self.freshness,
            wire,
        }
    }
}

/// A Data packet in wire form, with its name kept alongside for lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedData {
    pub name: Name,
    pub freshness: Duration,
    pub wire: Vec<u8>,
}

/// An Interest packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    pub name: Name,
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
    pub nonce: u32,
    pub lifetime: Duration,
}

impl Interest {
    pub fn new(name: Name, nonce: u32) -> Self {
        Self {
            name,
            can_be_prefix: false,
            must_be_fresh: false,
            nonce,
            lifetime: DEFAULT_INTEREST_LIFETIME,
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_can_be_prefix(mut self, can_be_prefix: bool) -> Self {
        self.can_be_prefix = can_be_prefix;
        self
    }

    /// True when `data_name` satisfies this interest
    pub fn matches(&self, data_name: &Name) -> bool {
        if self.can_be_prefix {
            self.name.is_prefix_of(data_name)
        } else {
            &self.name == data_name
        }
    }

    pub fn wire_encode(&self) -> Vec<u8> {
        let mut value = Vec::new();
        self.name.encode_into(&mut value);
        if self.can_be_prefix {
            tlv::write_tlv(&mut value, types::CAN_BE_PREFIX, &[]);
        }
        if self.must_be_fresh {
            tlv::write_tlv(&mut value, types::MUST_BE_FRESH, &[]);
        }
        tlv::write_tlv(&mut value, types::NONCE, &self.nonce.to_be_bytes());
        if self.lifetime != DEFAULT_INTEREST_LIFETIME {
            tlv::write_non_negative_integer(
                &mut value,
                types::INTEREST_LIFETIME,
                self.lifetime.as_millis() as u64,
            );
        }

        let mut wire = Vec::with_capacity(value.len() + 4);
        tlv::write_tlv(&mut wire, types::INTEREST, &value);
        wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data(freshness: Duration, key_locator: Option<Name>) -> Data {
        Data {
            name: Name::parse("/a").unwrap(),
            freshness,
            content: vec![0; 2],
            signature_info: SignatureInfo::fake(key_locator),
            signature_value: 0,
        }
    }

    #[test]
    fn test_data_encoding_layout() {
        let encoded = sample_data(Duration::ZERO, None).wire_encode();
        assert_eq!(
            encoded.wire,
            vec![
                0x06, 0x13, // Data
                0x07, 0x03, 0x08, 0x01, b'a', // Name
                0x14, 0x00, // MetaInfo (empty)
                0x15, 0x02, 0x00, 0x00, // Content
                0x16, 0x03, 0x1b, 0x01, 0xff, // SignatureInfo, type 255
                0x17, 0x01, 0x00, // SignatureValue
            ]
        );
        assert_eq!(encoded.name.to_string(), "/a");
    }

    #[test]
    fn test_data_encoding_freshness_and_key_locator() {
        let data = sample_data(Duration::from_secs(2), Some(Name::parse("/key").unwrap()));
        let wire = data.wire_encode().wire;
        // FreshnessPeriod 2000ms inside MetaInfo
        let meta = [0x14, 0x04, 0x19, 0x02, 0x07, 0xd0];
        assert!(wire.windows(meta.len()).any(|w| w == meta));
        // KeyLocator wrapping Name /key
        let locator = [0x1c, 0x07, 0x07, 0x05, 0x08, 0x03, b'k', b'e', b'y'];
        assert!(wire.windows(locator.len()).any(|w| w == locator));
    }

    #[test]
    fn test_root_key_locator_is_dropped() {
        let info = SignatureInfo::fake(Some(Name::root()));
        assert!(info.key_locator.is_none());
    }

    #[test]
    fn test_encoding_is_reproducible() {
        let a = sample_data(Duration::from_millis(10), None).wire_encode();
        let b = sample_data(Duration::from_millis(10), None).wire_encode();
        assert_eq!(a, b);
    }

    #[test]
    fn test_interest_encoding() {
        let interest = Interest::new(Name::parse("/a").unwrap(), 0x01020304)
            .with_lifetime(Duration::from_secs(300));
        assert_eq!(
            interest.wire_encode(),
            vec![
                0x05, 0x11, // Interest
                0x07, 0x03, 0x08, 0x01, b'a', // Name
                0x0a, 0x04, 0x01, 0x02, 0x03, 0x04, // Nonce
                0x0c, 0x04, 0x00, 0x04, 0x93, 0xe0, // InterestLifetime 300000ms
            ]
        );
    }

    #[test]
    fn test_interest_matching() {
        let prefix = Name::parse("/p").unwrap();
        let exact = Interest::new(prefix.clone(), 1);
        assert!(exact.matches(&prefix));
        assert!(!exact.matches(&prefix.with_sequence(0)));

        let loose = exact.with_can_be_prefix(true);
        assert!(loose.matches(&prefix.with_sequence(0)));
    }
}
