use rand_core::{OsRng, RngCore};

/// Address length in bytes.
pub const ADDRESS_LEN: usize = 6;

/// First byte of every synthetic address: locally administered, unicast.
pub const LOCALLY_ADMINISTERED_UNICAST: u8 = 0x02;

/// Mint a random hardware-shaped address.
///
/// Bytes 1..6 come from the OS CSPRNG; byte 0 is overwritten with the
/// locally administered unicast marker so the value can never collide with a
/// vendor-assigned address.
pub fn generate_address() -> [u8; ADDRESS_LEN] {
    let mut address = [0u8; ADDRESS_LEN];
    OsRng.fill_bytes(&mut address);
    address[0] = LOCALLY_ADMINISTERED_UNICAST;
    address
}

/// Lowercase hex octets joined with `:`.
pub fn format_with_colons(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Parse a colon separated address in either case.
pub fn parse_address(text: &str) -> Option<[u8; ADDRESS_LEN]> {
    let mut address = [0u8; ADDRESS_LEN];
    let mut octets = text.trim().split(':');
    for slot in address.iter_mut() {
        let octet = octets.next()?;
        if octet.len() != 2 {
            return None;
        }
        *slot = hex::decode(octet).ok()?[0];
    }
    if octets.next().is_some() {
        return None;
    }
    Some(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_canonical(text: &str) -> bool {
        let octets: Vec<&str> = text.split(':').collect();
        octets.len() == ADDRESS_LEN
            && octets.iter().all(|o| {
                o.len() == 2 && o.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
            })
    }

    #[test]
    fn marker_bits_are_set() {
        for _ in 0..64 {
            let address = generate_address();
            assert_eq!(address[0] & 0b11, 0b10);
        }
    }

    #[test]
    fn formatted_address_is_canonical() {
        for _ in 0..64 {
            let text = format_with_colons(&generate_address());
            assert!(is_canonical(&text), "not canonical: {}", text);
            assert!(text.starts_with("02:"));
        }
    }

    #[test]
    fn addresses_differ() {
        assert_ne!(generate_address(), generate_address());
    }

    #[test]
    fn parse_accepts_both_cases() {
        let bytes = [0x02, 0x3f, 0xa1, 0x9c, 0x44, 0x7b];
        assert_eq!(format_with_colons(&bytes), "02:3f:a1:9c:44:7b");
        assert_eq!(parse_address("02:3f:a1:9c:44:7b"), Some(bytes));
        assert_eq!(parse_address("02:3F:A1:9C:44:7B\n"), Some(bytes));
        assert_eq!(parse_address("02:3f:a1:9c:44"), None);
        assert_eq!(parse_address("02:3f:a1:9c:44:7b:00"), None);
        assert_eq!(parse_address("02:3f:a1:9c:44:zz"), None);
    }
}
