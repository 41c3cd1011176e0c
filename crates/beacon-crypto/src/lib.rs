/// Beacon Crypto Library
///
/// - Hex digests (SHA-1, MD5) over single-byte encoded text, used to sign
///   identifiers before they leave the device
/// - Synthetic, locally administered hardware addresses for installs that
///   cannot read a stable hardware identifier

pub mod address;
pub mod digest;

pub use address::{format_with_colons, generate_address, parse_address};
pub use digest::{Algorithm, digest, digest_named, latin1_bytes, md5, sha1};
