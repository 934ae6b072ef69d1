use crate::scheme::tuple::{TupleCipherText, TupleCore};
use crate::scheme::{OreScheme, SchemeError, SchemeKey, SchemeResult};
use crate::tracker::Tracker;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::cmp::Ordering;

/// The tuple scheme over a randomised modulus. A larger modulus hides the
/// "one above" relation from anyone who does not hold two ciphertexts of
/// adjacent plaintexts, at the cost of wider tuple entries.
pub struct PracticalOre {
    core: TupleCore,
}

const MIN_MODULUS: u16 = 4;
const MAX_MODULUS: u16 = 4096;

impl PracticalOre {
    /// Draws the modulus for this instance uniformly from [4, 4096].
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let modulus = rng.gen_range(MIN_MODULUS..=MAX_MODULUS);
        PracticalOre {
            core: TupleCore::with_rng(rng, modulus),
        }
    }

    pub fn with_modulus(seed: u64, modulus: u16) -> SchemeResult<Self> {
        if modulus < MIN_MODULUS {
            return Err(SchemeError::Configuration(format!(
                "modulus {} is too small, expected at least {}",
                modulus, MIN_MODULUS
            )));
        }
        Ok(PracticalOre {
            core: TupleCore::new(seed, modulus),
        })
    }

    pub fn modulus(&self) -> u16 {
        self.core.modulus()
    }
}

impl OreScheme for PracticalOre {
    type Key = SchemeKey;
    type CipherText = TupleCipherText;

    fn keygen(&mut self) -> SchemeKey {
        self.core.keygen()
    }

    fn encrypt(&mut self, plaintext: i32, key: &SchemeKey) -> SchemeResult<TupleCipherText> {
        self.core.encrypt(plaintext, key)
    }

    fn decrypt(&self, ciphertext: &TupleCipherText, key: &SchemeKey) -> SchemeResult<i32> {
        self.core.decrypt(ciphertext, key)
    }

    fn compare(&self, a: &TupleCipherText, b: &TupleCipherText) -> SchemeResult<Ordering> {
        self.core.compare(a, b)
    }

    fn tracker(&self) -> &Tracker {
        self.core.tracker()
    }
}
