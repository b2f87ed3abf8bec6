use rand::RngCore;
use rand::rngs::OsRng;

/// Number of random bytes in an infra suffix
pub const SUFFIX_BYTES: usize = 6;

/// Generates a resource-name suffix from the operating system CSPRNG.
///
/// Returns the bytes hex-encoded (12 lowercase characters).
pub fn generate_suffix() -> Result<String, rand::Error> {
    let mut bytes = [0u8; SUFFIX_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn suffix_is_six_hex_encoded_bytes() {
        let suffix = generate_suffix().unwrap();
        assert_eq!(suffix.len(), SUFFIX_BYTES * 2);
        assert_eq!(hex::decode(&suffix).unwrap().len(), SUFFIX_BYTES);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn suffixes_do_not_repeat() {
        let suffixes: HashSet<String> = (0..1000).map(|_| generate_suffix().unwrap()).collect();
        assert_eq!(suffixes.len(), 1000);
    }
}
