//! NDN names.
//!
//! A [`Name`] is an ordered list of components parsed from the URI form
//! (`/criticalData/test`). Generic components carry raw bytes; sequence-number
//! components (`seq=N`) follow the NDN naming conventions and encode as typed
//! components.

use std::fmt;

use super::tlv::{self, types};

/// Errors raised while parsing a name URI
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("Name '{0}' contains an empty component")]
    EmptyComponent(String),
    #[error("Name '{uri}' contains an invalid percent-escape at byte {offset}")]
    InvalidEscape { uri: String, offset: usize },
    #[error("Name '{0}' has an invalid sequence number component")]
    InvalidSequence(String),
}

/// A single name component
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    Generic(Vec<u8>),
    Sequence(u64),
}

impl Component {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Component::Generic(bytes) => tlv::write_tlv(buf, types::GENERIC_NAME_COMPONENT, bytes),
            Component::Sequence(seq) => {
                tlv::write_non_negative_integer(buf, types::SEQUENCE_NUM_NAME_COMPONENT, *seq)
            }
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Sequence(seq) => write!(f, "seq={}", seq),
            Component::Generic(bytes) => {
                for &b in bytes {
                    if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
                        write!(f, "{}", b as char)?;
                    } else {
                        write!(f, "%{:02X}", b)?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Hierarchical NDN name
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name {
    components: Vec<Component>,
}

impl Name {
    /// The root name `/`
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a name from its URI representation.
    ///
    /// An optional `ndn:` scheme and a single trailing slash are accepted;
    /// `//` inside a name is rejected.
    ///
    /// # Examples
    /// ```
    /// use pcdsim::ndn::Name;
    ///
    /// let name = Name::parse("/criticalData/test").unwrap();
    /// assert_eq!(name.len(), 2);
    /// assert_eq!(name.to_string(), "/criticalData/test");
    /// assert!(Name::parse("/a//b").is_err());
    /// ```
    pub fn parse(uri: &str) -> Result<Self, NameError> {
        let trimmed = uri.trim();
        let path = trimmed.strip_prefix("ndn:").unwrap_or(trimmed);
        let path = path.strip_prefix('/').unwrap_or(path);
        let path = path.strip_suffix('/').unwrap_or(path);

        let mut components = Vec::new();
        if path.is_empty() {
            return Ok(Self { components });
        }

        for part in path.split('/') {
            if part.is_empty() {
                return Err(NameError::EmptyComponent(uri.to_string()));
            }
            if let Some(seq) = part.strip_prefix("seq=") {
                let value = seq
                    .parse::<u64>()
                    .map_err(|_| NameError::InvalidSequence(uri.to_string()))?;
                components.push(Component::Sequence(value));
            } else {
                components.push(Component::Generic(percent_decode(part, uri)?));
            }
        }

        Ok(Self { components })
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Return a copy of this name with a sequence-number component appended
    pub fn with_sequence(&self, seq: u64) -> Self {
        let mut name = self.clone();
        name.components.push(Component::Sequence(seq));
        name
    }

    /// True when every component of `self` matches the leading components of `other`
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.components.len() <= other.components.len()
            && self.components.iter().zip(&other.components).all(|(a, b)| a == b)
    }

    /// Append the Name TLV to `buf`
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        let mut value = Vec::new();
        for component in &self.components {
            component.encode_into(&mut value);
        }
        tlv::write_tlv(buf, types::NAME, &value);
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Name::parse(s)
    }
}

fn percent_decode(part: &str, uri: &str) -> Result<Vec<u8>, NameError> {
    let bytes = part.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| NameError::InvalidEscape { uri: uri.to_string(), offset: i })?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}
