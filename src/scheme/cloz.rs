use crate::convert::ToOrderedInteger;
use crate::primitives::pph::{Pph, PphHash, PphTestKey, PphTester};
use crate::primitives::prf::Aes128Prf;
use crate::primitives::prp::TablePrp;
use crate::primitives::symmetric::{SealedPlaintext, SymmetricCipher};
use crate::primitives::{AesBlock, Prf};
use crate::scheme::tuple::{bit, prefix, prefix_block};
use crate::scheme::{CipherSize, OreScheme, SchemeError, SchemeKey, SchemeResult};
use crate::tracker::{Operation, Tracker};
use aes::cipher::generic_array::GenericArray;
use byteorder::{BigEndian, ByteOrder};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::cmp::Ordering;
use zeroize::{Zeroize, ZeroizeOnDrop};

/*
 * The Cash-Liu-O'Neill-Zhandry construction. Each bit contributes the
 * property-preserving hash of PRF(prefix) + bit, and the 32 hashes are
 * stored in a freshly permuted order, so a ciphertext does not even reveal
 * which bit position a tuple came from. Comparison probes every pair of
 * tuples for the successor relation; a hit in either direction decides the
 * order and the absence of hits means equality.
 */

const SEAL_TAG: u8 = 0x03;

/* 2^5 tuple positions to shuffle. */
const POSITION_BITS: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ClozKey {
    prf: SchemeKey,
    pph: SchemeKey,
}

impl CipherSize for ClozKey {
    fn size_bits(&self) -> usize {
        256
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClozCipherText {
    pub tuples: Vec<PphHash>,
    pub test_key: PphTestKey,
    pub sealed: SealedPlaintext,
}

impl CipherSize for ClozCipherText {
    fn size_bits(&self) -> usize {
        self.tuples.iter().map(|t| t.size_bits()).sum::<usize>()
            + 128
            + self.sealed.size_bits()
    }
}

pub struct ClozOre {
    rng: ChaCha20Rng,
    tracker: Tracker,
}

impl ClozOre {
    pub fn new(seed: u64) -> Self {
        ClozOre {
            rng: ChaCha20Rng::seed_from_u64(seed),
            tracker: Tracker::new(),
        }
    }

    fn prf(&self, key: &ClozKey) -> Aes128Prf {
        Aes128Prf::new(GenericArray::from_slice(key.prf.bytes()), self.tracker.clone())
    }

    fn pph(&self, key: &ClozKey) -> Pph {
        Pph::new(key.pph.bytes(), self.tracker.clone())
    }

    fn seal_cipher(&self, prf: &Aes128Prf) -> SymmetricCipher {
        SymmetricCipher::new(&prf.derive(SEAL_TAG), self.tracker.clone())
    }

    /* One hash per bit, in bit order. */
    fn hash_tuples(&self, prf: &Aes128Prf, pph: &Pph, value: u32) -> Vec<PphHash> {
        let mut blocks: Vec<AesBlock> = (0..32)
            .map(|i| prefix_block(i, prefix(value, i)))
            .collect();
        prf.encrypt_all(&mut blocks);

        blocks
            .iter()
            .enumerate()
            .map(|(i, block)| {
                let u = BigEndian::read_u128(block.as_slice())
                    .wrapping_add(bit(value, i as u32) as u128);
                pph.hash(u)
            })
            .collect()
    }
}

impl OreScheme for ClozOre {
    type Key = ClozKey;
    type CipherText = ClozCipherText;

    fn keygen(&mut self) -> ClozKey {
        self.tracker.record_operation(Operation::KeyGen);
        ClozKey {
            prf: SchemeKey::generate(&mut self.rng),
            pph: SchemeKey::generate(&mut self.rng),
        }
    }

    fn encrypt(&mut self, plaintext: i32, key: &ClozKey) -> SchemeResult<ClozCipherText> {
        self.tracker.record_operation(Operation::Encrypt);
        let value = plaintext.map_to();
        let prf = self.prf(key);
        let pph = self.pph(key);
        let hashes = self.hash_tuples(&prf, &pph, value);

        /* A throwaway permutation hides which bit each tuple encodes. */
        let mut prp_key = [0u8; 16];
        self.rng.fill(&mut prp_key[..]);
        let prp = TablePrp::new(&prp_key, POSITION_BITS, self.tracker.clone())?;
        let mut indexed = Vec::with_capacity(hashes.len());
        for (i, hash) in hashes.into_iter().enumerate() {
            indexed.push((prp.permute(i as u16)?, hash));
        }
        indexed.sort_by_key(|(position, _)| *position);

        let nonce: [u8; 16] = self.rng.gen();
        let sealed = self.seal_cipher(&prf).seal(nonce, plaintext);

        Ok(ClozCipherText {
            tuples: indexed.into_iter().map(|(_, hash)| hash).collect(),
            test_key: pph.test_key(),
            sealed,
        })
    }

    fn decrypt(&self, ciphertext: &ClozCipherText, key: &ClozKey) -> SchemeResult<i32> {
        self.tracker.record_operation(Operation::Decrypt);
        if ciphertext.tuples.len() != 32 {
            return Err(SchemeError::MalformedCipherText(
                "expected one tuple per plaintext bit",
            ));
        }

        let prf = self.prf(key);
        let pph = self.pph(key);
        if pph.test_key() != ciphertext.test_key {
            return Err(SchemeError::Authenticity);
        }

        let plaintext = self.seal_cipher(&prf).open(&ciphertext.sealed);

        /* The tuple multiset is deterministic even though its order is
         * not, so sort both sides before checking the seal was honest. */
        let mut expected = self.hash_tuples(&prf, &pph, plaintext.map_to());
        let mut actual = ciphertext.tuples.clone();
        expected.sort_by(|a, b| a.image.cmp(&b.image));
        actual.sort_by(|a, b| a.image.cmp(&b.image));
        if expected != actual {
            return Err(SchemeError::Authenticity);
        }
        Ok(plaintext)
    }

    fn compare(&self, a: &ClozCipherText, b: &ClozCipherText) -> SchemeResult<Ordering> {
        self.tracker.record_operation(Operation::Compare);
        if a.test_key != b.test_key {
            return Err(SchemeError::MalformedCipherText(
                "ciphertext test keys differ",
            ));
        }
        if a.tuples.len() != b.tuples.len() {
            return Err(SchemeError::MalformedCipherText(
                "ciphertext tuple counts differ",
            ));
        }

        let tester = PphTester::new(&a.test_key, self.tracker.clone());
        for x in &a.tuples {
            for y in &b.tuples {
                if tester.test(x, y) {
                    return Ok(Ordering::Greater);
                }
                if tester.test(y, x) {
                    return Ok(Ordering::Less);
                }
            }
        }
        Ok(Ordering::Equal)
    }

    fn tracker(&self) -> &Tracker {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    fn init_scheme() -> (ClozOre, ClozKey) {
        let mut ore = ClozOre::new(31);
        let key = ore.keygen();
        (ore, key)
    }

    quickcheck! {
        fn roundtrip(x: i32) -> bool {
            let (mut ore, key) = init_scheme();
            let ct = ore.encrypt(x, &key).unwrap();
            x == ore.decrypt(&ct, &key).unwrap()
        }

        fn reveals_order(x: i32, y: i32) -> bool {
            let (mut ore, key) = init_scheme();
            let cx = ore.encrypt(x, &key).unwrap();
            let cy = ore.encrypt(y, &key).unwrap();
            x.cmp(&y) == ore.compare(&cx, &cy).unwrap()
        }

        fn fresh_encryptions_compare_equal(x: i32) -> bool {
            let (mut ore, key) = init_scheme();
            let a = ore.encrypt(x, &key).unwrap();
            let b = ore.encrypt(x, &key).unwrap();
            ore.is_equal(&a, &b).unwrap()
        }
    }

    #[test]
    fn tuple_order_is_randomised_but_comparable() {
        let (mut ore, key) = init_scheme();
        let a = ore.encrypt(12345, &key).unwrap();
        let b = ore.encrypt(12345, &key).unwrap();

        /* Same multiset, almost surely a different permutation of it. */
        assert_ne!(a.tuples, b.tuples);
        assert_eq!(Ordering::Equal, ore.compare(&a, &b).unwrap());
    }

    #[test]
    fn ciphertexts_under_different_keys_do_not_compare() {
        let (mut ore, key_a) = init_scheme();
        let key_b = ore.keygen();
        let ca = ore.encrypt(1, &key_a).unwrap();
        let cb = ore.encrypt(1, &key_b).unwrap();
        assert!(matches!(
            ore.compare(&ca, &cb),
            Err(SchemeError::MalformedCipherText(_))
        ));
    }

    #[test]
    fn tampered_seal_fails_authentication() {
        let (mut ore, key) = init_scheme();
        let mut ct = ore.encrypt(7, &key).unwrap();
        ct.sealed.data[0] ^= 1;
        assert!(matches!(
            ore.decrypt(&ct, &key),
            Err(SchemeError::Authenticity)
        ));
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let (mut ore, key_a) = init_scheme();
        let key_b = ore.keygen();
        let ct = ore.encrypt(7, &key_a).unwrap();
        assert!(matches!(
            ore.decrypt(&ct, &key_b),
            Err(SchemeError::Authenticity)
        ));
    }

    #[test]
    fn ciphertext_size() {
        /* 32 hash pairs of 256 bits, a 128-bit test key, a 160-bit seal. */
        let (mut ore, key) = init_scheme();
        let ct = ore.encrypt(0, &key).unwrap();
        assert_eq!(32 * 256 + 128 + 160, ct.size_bits());
    }
}
