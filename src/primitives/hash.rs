use crate::primitives::{AesBlock, Hash, HashKey};
use crate::tracker::{Primitive, Tracker};
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use byteorder::{BigEndian, ByteOrder};
use zeroize::ZeroizeOnDrop;

/*
 * Models a Random Oracle by encrypting a data block with AES. `hash`
 * returns the least significant bit; `hash_mod` reduces the first 64 bits
 * into Z_m (the residual bias of the reduction is ~m/2^64).
 */
#[derive(ZeroizeOnDrop)]
pub struct Aes128Hash {
    cipher: Aes128,
    #[zeroize(skip)]
    tracker: Tracker,
}

impl Aes128Hash {
    fn digest(&self, data: &[u8]) -> [u8; 16] {
        /*
         * Slice size is not known at compile time so we assert here; all
         * callers pass one AES block.
         */
        assert_eq!(data.len(), 16);
        let mut output = AesBlock::default();
        output.clone_from_slice(data);
        self.cipher.encrypt_block(&mut output);
        output.into()
    }
}

impl Hash for Aes128Hash {
    fn new(key: &HashKey, tracker: Tracker) -> Self {
        let cipher = Aes128::new(key);
        Self { cipher, tracker }
    }

    fn hash(&self, data: &[u8]) -> u8 {
        self.tracker.record(Primitive::Hash);
        self.digest(data)[0] & 1u8
    }

    fn hash_mod(&self, data: &[u8], modulus: u16) -> u16 {
        self.tracker.record(Primitive::Hash);
        let digest = self.digest(data);
        (BigEndian::read_u64(&digest[0..8]) % modulus as u64) as u16
    }

    /* Hashes all data blocks in place, reducing each into Z_m. */
    fn hash_all_mod(&self, data: &mut [AesBlock], modulus: u16) -> Vec<u16> {
        self.tracker.record(Primitive::Hash);
        self.cipher.encrypt_blocks(data);

        data.iter()
            .map(|block| (BigEndian::read_u64(&block[0..8]) % modulus as u64) as u16)
            .collect()
    }
}
