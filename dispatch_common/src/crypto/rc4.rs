//! RC4 stream cipher.
//!
//! Every message is processed with a freshly keyed state, so encrypting and
//! decrypting are the same call.

/// Keyed RC4 state.
pub struct Rc4 {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4 {
    /// Run the key schedule. An empty key leaves the identity permutation.
    pub fn new(key: &[u8]) -> Self {
        let mut s = [0u8; 256];
        for (slot, value) in s.iter_mut().zip(0u8..=255) {
            *slot = value;
        }

        if !key.is_empty() {
            let mut j: u8 = 0;
            for i in 0..256 {
                j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
                s.swap(i, j as usize);
            }
        }

        Self { s, i: 0, j: 0 }
    }

    /// XOR the keystream into `data` in place.
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data {
            self.i = self.i.wrapping_add(1);
            self.j = self.j.wrapping_add(self.s[self.i as usize]);
            self.s.swap(self.i as usize, self.j as usize);
            let idx = self.s[self.i as usize].wrapping_add(self.s[self.j as usize]);
            *byte ^= self.s[idx as usize];
        }
    }
}

/// Encrypt or decrypt `data` in place with a fresh state keyed by `key`.
pub fn rc4_crypt(data: &mut [u8], key: &[u8]) {
    Rc4::new(key).apply_keystream(data);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector_key() {
        // Published vector: key "Key", plaintext "Plaintext".
        let mut data = *b"Plaintext";
        rc4_crypt(&mut data, b"Key");
        assert_eq!(data, [0xBB, 0xF3, 0x16, 0xE8, 0xD9, 0x40, 0xAF, 0x0A, 0xD3]);
    }

    #[test]
    fn test_known_vector_wiki() {
        let mut data = *b"pedia";
        rc4_crypt(&mut data, b"Wiki");
        assert_eq!(data, [0x10, 0x21, 0xBF, 0x04, 0x20]);
    }

    #[test]
    fn test_self_inverse() {
        let original = b"Ride Confirmed! Driver ID: 1001".to_vec();
        let mut data = original.clone();
        rc4_crypt(&mut data, b"KEY_1_SECURE");
        assert_ne!(data, original);
        rc4_crypt(&mut data, b"KEY_1_SECURE");
        assert_eq!(data, original);
    }

    #[test]
    fn test_wrong_key_does_not_decrypt() {
        let original = b"Error: Blocked.".to_vec();
        let mut data = original.clone();
        rc4_crypt(&mut data, b"KEY_1_SECURE");
        rc4_crypt(&mut data, b"KEY_2_SECURE");
        assert_ne!(data, original);
    }

    #[test]
    fn test_empty_input() {
        let mut data: [u8; 0] = [];
        rc4_crypt(&mut data, b"KEY");
    }
}
