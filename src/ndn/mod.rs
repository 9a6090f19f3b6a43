//! Named Data Networking packet model: names, TLV encoding, Data and Interest.

pub mod name;
pub mod packet;
pub mod tlv;

pub use name::{Component, Name, NameError};
pub use packet::{Data, EncodedData, Interest, SignatureInfo};
