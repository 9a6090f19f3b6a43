//! NDN TLV primitives.
//!
//! Implements the VAR-NUMBER and NonNegativeInteger encodings from the NDN
//! packet format 0.3, plus the type numbers used by the Data and Interest
//! packets this crate produces. Encoding is deterministic: the same inputs
//! always produce the same bytes.

/// TLV type numbers (NDN packet format 0.3)
pub mod types {
    pub const INTEREST: u64 = 0x05;
    pub const DATA: u64 = 0x06;
    pub const NAME: u64 = 0x07;
    pub const GENERIC_NAME_COMPONENT: u64 = 0x08;
    pub const NONCE: u64 = 0x0a;
    pub const INTEREST_LIFETIME: u64 = 0x0c;
    pub const MUST_BE_FRESH: u64 = 0x12;
    pub const META_INFO: u64 = 0x14;
    pub const CONTENT: u64 = 0x15;
    pub const SIGNATURE_INFO: u64 = 0x16;
    pub const SIGNATURE_VALUE: u64 = 0x17;
    pub const FRESHNESS_PERIOD: u64 = 0x19;
    pub const SIGNATURE_TYPE: u64 = 0x1b;
    pub const KEY_LOCATOR: u64 = 0x1c;
    pub const CAN_BE_PREFIX: u64 = 0x21;
    pub const SEQUENCE_NUM_NAME_COMPONENT: u64 = 0x3a;
}

/// Append a VAR-NUMBER to `buf`
pub fn write_var_number(buf: &mut Vec<u8>, value: u64) {
    if value < 253 {
        buf.push(value as u8);
    } else if value <= u16::MAX as u64 {
        buf.push(253);
        buf.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= u32::MAX as u64 {
        buf.push(254);
        buf.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        buf.push(255);
        buf.extend_from_slice(&value.to_be_bytes());
    }
}

/// Minimal NonNegativeInteger encoding (1, 2, 4 or 8 bytes)
pub fn non_negative_integer_bytes(value: u64) -> Vec<u8> {
    if value <= u8::MAX as u64 {
        vec![value as u8]
    } else if value <= u16::MAX as u64 {
        (value as u16).to_be_bytes().to_vec()
    } else if value <= u32::MAX as u64 {
        (value as u32).to_be_bytes().to_vec()
    } else {
        value.to_be_bytes().to_vec()
    }
}

/// Append a complete TLV element (type, length, value)
pub fn write_tlv(buf: &mut Vec<u8>, tlv_type: u64, value: &[u8]) {
    write_var_number(buf, tlv_type);
    write_var_number(buf, value.len() as u64);
    buf.extend_from_slice(value);
}

/// Append a TLV element whose value is a NonNegativeInteger
pub fn write_non_negative_integer(buf: &mut Vec<u8>, tlv_type: u64, value: u64) {
    write_tlv(buf, tlv_type, &non_negative_integer_bytes(value));
}
