use crate::convert::{FromOrderedInteger, ToOrderedInteger};
use crate::primitives::prg::Tape;
use crate::range::Range;
use crate::samplers::{HgSampler, UniformSampler};
use crate::scheme::{CipherSize, OreScheme, SchemeError, SchemeKey, SchemeResult};
use crate::tracker::{Operation, Tracker};
use byteorder::{BigEndian, ByteOrder};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::cmp::Ordering;

/*
 * The Boldyreva-Chenette-Lee-O'Neill order-preserving scheme. A plaintext
 * domain is mapped into a larger ciphertext range by recursively halving
 * the range at its midpoint y and splitting the domain with a
 * hypergeometric draw that says how many domain points fall at or below y.
 * All randomness comes from a tape keyed on the recursion state, so the
 * decryptor retraces the same path with the same coins.
 */

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OpeCipherText(pub u64);

impl CipherSize for OpeCipherText {
    fn size_bits(&self) -> usize {
        64
    }
}

const ROUND_FLAG: u8 = 0;
const TERMINAL_FLAG: u8 = 1;

pub struct BcloOpe {
    domain: Range,
    target: Range,
    rng: ChaCha20Rng,
    uniform: UniformSampler,
    hg: HgSampler,
    tracker: Tracker,
}

impl BcloOpe {
    /// Default parameters: 32-bit domain into a 48-bit range.
    pub fn new(seed: u64) -> Self {
        let domain = Range::new(0, u32::MAX as u64);
        let target = Range::new(0, (1u64 << 48) - 1);
        /* The defaults satisfy every with_ranges check. */
        Self::build(seed, domain, target)
    }

    pub fn with_ranges(seed: u64, domain: Range, target: Range) -> SchemeResult<Self> {
        if target.size() < domain.size() {
            return Err(SchemeError::Configuration(format!(
                "target range must be at least as large as the domain \
                 ({} < {})",
                target.size(),
                domain.size()
            )));
        }
        if target.size() > u64::MAX as u128 {
            return Err(SchemeError::Configuration(
                "target range must span fewer than 2^64 values".into(),
            ));
        }
        Ok(Self::build(seed, domain, target))
    }

    fn build(seed: u64, domain: Range, target: Range) -> Self {
        let tracker = Tracker::new();
        BcloOpe {
            domain,
            target,
            rng: ChaCha20Rng::seed_from_u64(seed),
            uniform: UniformSampler::new(tracker.clone()),
            hg: HgSampler::new(tracker.clone()),
            tracker,
        }
    }

    pub fn domain(&self) -> &Range {
        &self.domain
    }

    pub fn target(&self) -> &Range {
        &self.target
    }

    /* Tape keyed on the full recursion state so rounds never share coins. */
    fn tape(&self, key: &SchemeKey, domain: &Range, target: &Range, point: u64, flag: u8) -> Tape {
        let mut context = [0u8; 41];
        context[0..16].copy_from_slice(&domain.to_bytes());
        context[16..32].copy_from_slice(&target.to_bytes());
        BigEndian::write_u64(&mut context[32..40], point);
        context[40] = flag;
        Tape::new(key.bytes(), &context, self.tracker.clone())
    }

    /* Midpoint of the target range, the split point of this round. */
    fn midpoint(target: &Range) -> u64 {
        target.from + ((target.size() as u64 + 1) / 2 - 1)
    }

    fn round_draw(
        &self,
        key: &SchemeKey,
        domain: &Range,
        target: &Range,
        y: u64,
    ) -> SchemeResult<u64> {
        let mut tape = self.tape(key, domain, target, y, ROUND_FLAG);
        let population = target.size() as u64;
        let successes = y - target.from + 1;
        let draws = domain.size() as u64;
        Ok(self.hg.sample(&mut tape, population, successes, draws)?)
    }

    fn terminal_sample(&self, key: &SchemeKey, plaintext: u64, target: &Range) -> u64 {
        let domain = Range::new(plaintext, plaintext);
        let mut tape = self.tape(key, &domain, target, plaintext, TERMINAL_FLAG);
        self.uniform.sample(&mut tape, target)
    }

    /// Encrypts a value of the configured domain into the target range.
    pub fn encrypt_u64(&self, plaintext: u64, key: &SchemeKey) -> SchemeResult<u64> {
        if !self.domain.contains(plaintext) {
            return Err(SchemeError::PlaintextOutsideDomain(plaintext));
        }

        let mut domain = self.domain;
        let mut target = self.target;
        loop {
            debug_assert!(domain.size() <= target.size());
            if domain.size() == 1 {
                return Ok(self.terminal_sample(key, plaintext, &target));
            }

            let y = Self::midpoint(&target);
            let hg = self.round_draw(key, &domain, &target, y)?;

            /* hg of the domain points land at or below y. */
            if plaintext - domain.from < hg {
                domain = Range::new(domain.from, domain.from + hg - 1);
                target = Range::new(target.from, y);
            } else {
                domain = Range::new(domain.from + hg, domain.to);
                target = Range::new(y + 1, target.to);
            }
        }
    }

    /// Recovers the plaintext of a target-range value, verifying along the
    /// way that the ciphertext really is an encryption under this key.
    pub fn decrypt_u64(&self, ciphertext: u64, key: &SchemeKey) -> SchemeResult<u64> {
        if !self.target.contains(ciphertext) {
            return Err(SchemeError::CiphertextOutsideRange(ciphertext));
        }

        let mut domain = self.domain;
        let mut target = self.target;
        loop {
            debug_assert!(domain.size() <= target.size());
            if domain.size() == 1 {
                let plaintext = domain.from;
                if self.terminal_sample(key, plaintext, &target) == ciphertext {
                    return Ok(plaintext);
                }
                /* Not a point the encryptor could have produced. */
                return Err(SchemeError::Authenticity);
            }

            let y = Self::midpoint(&target);
            let hg = self.round_draw(key, &domain, &target, y)?;
            let draws = domain.size() as u64;

            if ciphertext <= y {
                if hg == 0 {
                    return Err(SchemeError::Authenticity);
                }
                domain = Range::new(domain.from, domain.from + hg - 1);
                target = Range::new(target.from, y);
            } else {
                if hg == draws {
                    return Err(SchemeError::Authenticity);
                }
                domain = Range::new(domain.from + hg, domain.to);
                target = Range::new(y + 1, target.to);
            }
        }
    }
}

impl OreScheme for BcloOpe {
    type Key = SchemeKey;
    type CipherText = OpeCipherText;

    fn keygen(&mut self) -> SchemeKey {
        self.tracker.record_operation(Operation::KeyGen);
        SchemeKey::generate(&mut self.rng)
    }

    fn encrypt(&mut self, plaintext: i32, key: &SchemeKey) -> SchemeResult<OpeCipherText> {
        self.tracker.record_operation(Operation::Encrypt);
        let value: u32 = plaintext.map_to();
        Ok(OpeCipherText(self.encrypt_u64(value as u64, key)?))
    }

    fn decrypt(&self, ciphertext: &OpeCipherText, key: &SchemeKey) -> SchemeResult<i32> {
        self.tracker.record_operation(Operation::Decrypt);
        let value = self.decrypt_u64(ciphertext.0, key)?;
        if value > u32::MAX as u64 {
            return Err(SchemeError::PlaintextOutsideDomain(value));
        }
        Ok(i32::map_from(value as u32))
    }

    fn compare(&self, a: &OpeCipherText, b: &OpeCipherText) -> SchemeResult<Ordering> {
        self.tracker.record_operation(Operation::Compare);
        Ok(a.0.cmp(&b.0))
    }

    fn tracker(&self) -> &Tracker {
        &self.tracker
    }
}
