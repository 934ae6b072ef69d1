pub mod hash;
pub mod pph;
pub mod prf;
pub mod prg;
pub mod prp;
pub mod symmetric;

use crate::tracker::Tracker;
use aes::cipher::{consts::U16, generic_array::GenericArray};
use aes::Block;
use thiserror::Error;

pub type AesBlock = Block;
pub type PrfKey = GenericArray<u8, U16>;
pub type HashKey = GenericArray<u8, U16>;

/// 128-bit security parameter; governs key and PRF output sizing.
pub const ALPHA: usize = 128;
pub const KEY_SIZE: usize = ALPHA / 8;
pub const NONCE_SIZE: usize = 16;

pub trait Prf {
    fn new(key: &PrfKey, tracker: Tracker) -> Self;
    fn encrypt_all(&self, data: &mut [AesBlock]);
}

pub trait Hash {
    fn new(key: &HashKey, tracker: Tracker) -> Self;
    fn hash(&self, data: &[u8]) -> u8;
    fn hash_mod(&self, data: &[u8], modulus: u16) -> u16;
    fn hash_all_mod(&self, data: &mut [AesBlock], modulus: u16) -> Vec<u16>;
}

#[derive(Debug, Error)]
pub enum PrpError {
    #[error("PRP bit width {0} is outside [1, 8]")]
    InvalidBits(u8),
    #[error("value {value} is outside the {bits}-bit PRP domain")]
    OutOfDomain { value: u16, bits: u8 },
}

pub type PrpResult<T> = Result<T, PrpError>;
