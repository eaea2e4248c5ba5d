//! Wire Notation
//!
//! The single-byte vocabulary of the output format. Booleans are the bare
//! characters `1` and `0`: a protocol compatibility requirement, not JSON.

pub const QUOTE: u8 = b'"';
pub const COLON: u8 = b':';
pub const TRUE: u8 = b'1';
pub const FALSE: u8 = b'0';
pub const COMMA: u8 = b',';
pub const OBJECT_START: u8 = b'{';
pub const OBJECT_END: u8 = b'}';
pub const ARRAY_START: u8 = b'[';
pub const ARRAY_END: u8 = b']';
