// Cache bucket hash computation

use md5::{Digest, Md5};

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Compute the wrapper's cache bucket name for a distribution URL.
///
/// The algorithm must match the Gradle wrapper byte for byte, otherwise the wrapper
/// will not find the entries we create:
/// 1. MD5 over the UTF-8 bytes of the URL.
/// 2. Read the digest as an unsigned big-endian integer (leading zeros vanish).
/// 3. Render it in base 36 with lowercase letters.
pub fn dist_url_hash(url: &str) -> String {
    let digest = Md5::digest(url.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest);
    to_base36(u128::from_be_bytes(bytes))
}

fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }

    // 36^25 > 2^128, so 25 digits always suffice
    let mut buf = [0u8; 25];
    let mut pos = buf.len();
    while value > 0 {
        pos -= 1;
        buf[pos] = BASE36_DIGITS[(value % 36) as usize];
        value /= 36;
    }

    buf[pos..].iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_wrapper_buckets() {
        assert_eq!(
            dist_url_hash("https://services.gradle.org/distributions/gradle-7.4-bin.zip"),
            "c0gwcg53nkjbqw7r0h0umtfvt"
        );
        assert_eq!(
            dist_url_hash("https://services.gradle.org/distributions/gradle-7.4-all.zip"),
            "aadb4xli5jkdsnukm30eibyiu"
        );
        assert_eq!(
            dist_url_hash("https://services.gradle.org/distributions/gradle-7.4.2-bin.zip"),
            "48ivgl02cpt2ed3fh9dbalvx8"
        );
    }

    #[test]
    fn test_no_leading_zero_padding() {
        let hash = dist_url_hash("https://services.gradle.org/distributions/gradle-5.0-bin.zip");
        assert_eq!(hash, "pu5208521seraqlersebvqk");
        assert_eq!(hash.len(), 23);
    }

    #[test]
    fn test_hash_is_stable() {
        let url = "https://services.gradle.org/distributions/gradle-7.3-bin.zip";
        assert_eq!(dist_url_hash(url), dist_url_hash(url));
        assert_eq!(dist_url_hash(url), "ddwl0k7mt9g6ak16i1m905vyv");
    }

    #[test]
    fn test_base36_edges() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(u128::MAX), "f5lxx1zz5pnorynqglhzmsp33");
    }
}
