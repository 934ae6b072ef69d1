use crate::scheme::tuple::{TupleCipherText, TupleCore};
use crate::scheme::{OreScheme, SchemeKey, SchemeResult};
use crate::tracker::Tracker;
use std::cmp::Ordering;

/// The Chenette-Lewi-Weis-Wu small-domain ORE with its canonical modulus
/// of three, the smallest that distinguishes "equal", "one above" and
/// everything else at each bit.
pub struct ClwwOre {
    core: TupleCore,
}

const MODULUS: u16 = 3;

impl ClwwOre {
    pub fn new(seed: u64) -> Self {
        ClwwOre {
            core: TupleCore::new(seed, MODULUS),
        }
    }
}

impl OreScheme for ClwwOre {
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
