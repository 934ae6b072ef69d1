use crate::primitives::{AesBlock, NONCE_SIZE};
use crate::scheme::CipherSize;
use crate::tracker::{Primitive, Tracker};
use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;
use byteorder::{BigEndian, ByteOrder};
use zeroize::ZeroizeOnDrop;

/// A sealed copy of the plaintext carried inside ORE ciphertexts so that
/// decryption does not have to invert the comparison structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPlaintext {
    pub nonce: [u8; NONCE_SIZE],
    pub data: [u8; 4],
}

impl CipherSize for SealedPlaintext {
    fn size_bits(&self) -> usize {
        (NONCE_SIZE + 4) * 8
    }
}

/*
 * One-block CTR mode: the keystream is AES_k(nonce) and only the first four
 * bytes are used, which is exactly enough for one 32-bit plaintext.
 */
#[derive(ZeroizeOnDrop)]
pub struct SymmetricCipher {
    cipher: Aes128,
    #[zeroize(skip)]
    tracker: Tracker,
}

impl SymmetricCipher {
    pub fn new(key: &[u8; 16], tracker: Tracker) -> Self {
        let cipher = Aes128::new(GenericArray::from_slice(key));
        Self { cipher, tracker }
    }

    fn keystream(&self, nonce: &[u8; NONCE_SIZE]) -> [u8; 16] {
        let mut mask = AesBlock::clone_from_slice(nonce);
        self.cipher.encrypt_block(&mut mask);
        mask.into()
    }

    pub fn seal(&self, nonce: [u8; NONCE_SIZE], plaintext: i32) -> SealedPlaintext {
        self.tracker.record(Primitive::Symmetric);
        let mask = self.keystream(&nonce);
        let mut data = [0u8; 4];
        BigEndian::write_i32(&mut data, plaintext);
        for (byte, m) in data.iter_mut().zip(mask.iter()) {
            *byte ^= m;
        }
        SealedPlaintext { nonce, data }
    }

    pub fn open(&self, sealed: &SealedPlaintext) -> i32 {
        self.tracker.record(Primitive::Symmetric);
        let mask = self.keystream(&sealed.nonce);
        let mut data = sealed.data;
        for (byte, m) in data.iter_mut().zip(mask.iter()) {
            *byte ^= m;
        }
        BigEndian::read_i32(&data)
    }
}
