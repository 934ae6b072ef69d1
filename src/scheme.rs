pub mod bclo;
pub mod cloz;
pub mod clww;
pub mod lewi;
pub mod practical;
pub mod tuple;

use crate::primitives::PrpError;
use crate::samplers::SamplerError;
use crate::tracker::Tracker;
use rand::Rng;
use std::cmp::Ordering;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Debug, Error)]
pub enum SchemeError {
    #[error("plaintext {0} is outside the scheme domain")]
    PlaintextOutsideDomain(u64),
    #[error("ciphertext {0} is outside the scheme range")]
    CiphertextOutsideRange(u64),
    #[error("ciphertext failed its authenticity check")]
    Authenticity,
    #[error("malformed ciphertext: {0}")]
    MalformedCipherText(&'static str),
    #[error("invalid scheme configuration: {0}")]
    Configuration(String),
    #[error(transparent)]
    Prp(#[from] PrpError),
    #[error(transparent)]
    Sampler(#[from] SamplerError),
}

pub type SchemeResult<T> = Result<T, SchemeError>;

/// Bit size of a ciphertext (or ciphertext component) as stored.
pub trait CipherSize {
    fn size_bits(&self) -> usize;
}

/// A 128-bit scheme key. Wiped on drop.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SchemeKey([u8; 16]);

impl SchemeKey {
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 16];
        rng.fill(&mut bytes[..]);
        SchemeKey(bytes)
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        SchemeKey(bytes)
    }

    pub fn bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl CipherSize for SchemeKey {
    fn size_bits(&self) -> usize {
        128
    }
}

/// The uniform interface every scheme in this crate implements.
///
/// `compare` is the order-revealing operation and must agree with the
/// plaintext order: for ciphertexts of x and y under the same key it
/// returns `x.cmp(&y)`. `decrypt` recovers the exact plaintext and fails
/// with an authenticity or malformed-ciphertext error rather than
/// returning a wrong value.
pub trait OreScheme {
    type Key;
    type CipherText: CipherSize;

    fn keygen(&mut self) -> Self::Key;
    fn encrypt(&mut self, plaintext: i32, key: &Self::Key) -> SchemeResult<Self::CipherText>;
    fn decrypt(&self, ciphertext: &Self::CipherText, key: &Self::Key) -> SchemeResult<i32>;
    fn compare(&self, a: &Self::CipherText, b: &Self::CipherText) -> SchemeResult<Ordering>;

    /// The accounting handle shared by every primitive this scheme owns.
    fn tracker(&self) -> &Tracker;

    fn is_less(&self, a: &Self::CipherText, b: &Self::CipherText) -> SchemeResult<bool> {
        Ok(self.compare(a, b)? == Ordering::Less)
    }

    fn is_greater(&self, a: &Self::CipherText, b: &Self::CipherText) -> SchemeResult<bool> {
        Ok(self.compare(a, b)? == Ordering::Greater)
    }

    fn is_equal(&self, a: &Self::CipherText, b: &Self::CipherText) -> SchemeResult<bool> {
        Ok(self.compare(a, b)? == Ordering::Equal)
    }

    fn is_less_or_equal(&self, a: &Self::CipherText, b: &Self::CipherText) -> SchemeResult<bool> {
        Ok(self.compare(a, b)? != Ordering::Greater)
    }

    fn is_greater_or_equal(
        &self,
        a: &Self::CipherText,
        b: &Self::CipherText,
    ) -> SchemeResult<bool> {
        Ok(self.compare(a, b)? != Ordering::Less)
    }
}
