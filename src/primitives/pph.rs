use crate::primitives::AesBlock;
use crate::scheme::CipherSize;
use crate::tracker::{Primitive, Tracker};
use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;
use byteorder::{BigEndian, ByteOrder};
use subtle_ng::ConstantTimeEq;
use zeroize::ZeroizeOnDrop;

/// A property-preserving hash of a 128-bit value: the keyed image of the
/// value alongside the keyed image of its successor. Two hashes h(x), h(y)
/// can be tested for the predicate x == y + 1 by whoever holds the test key,
/// and nothing else about x or y is revealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PphHash {
    pub image: [u8; 16],
    pub successor: [u8; 16],
}

impl CipherSize for PphHash {
    fn size_bits(&self) -> usize {
        256
    }
}

/// The key under which hash pairs can be compared. Carried inside CLOZ
/// ciphertexts; useless without a pair of hashes to test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PphTestKey([u8; 16]);

impl PphTestKey {
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/* Block fed to the hash key to derive the test key. */
const TEST_KEY_MARKER: [u8; 16] = [0x54u8; 16];

#[derive(ZeroizeOnDrop)]
pub struct Pph {
    cipher: Aes128,
    #[zeroize(skip)]
    tracker: Tracker,
}

impl Pph {
    pub fn new(key: &[u8; 16], tracker: Tracker) -> Self {
        let cipher = Aes128::new(GenericArray::from_slice(key));
        Self { cipher, tracker }
    }

    pub fn hash(&self, value: u128) -> PphHash {
        self.tracker.record(Primitive::Pph);
        let mut image = AesBlock::default();
        let mut successor = AesBlock::default();
        BigEndian::write_u128(&mut image, value);
        BigEndian::write_u128(&mut successor, value.wrapping_add(1));
        self.cipher.encrypt_block(&mut image);
        self.cipher.encrypt_block(&mut successor);
        PphHash {
            image: image.into(),
            successor: successor.into(),
        }
    }

    pub fn test_key(&self) -> PphTestKey {
        let mut block = AesBlock::from(TEST_KEY_MARKER);
        self.cipher.encrypt_block(&mut block);
        PphTestKey(block.into())
    }
}

/// Evaluates the successor predicate under a given test key.
pub struct PphTester {
    cipher: Aes128,
    tracker: Tracker,
}

impl PphTester {
    pub fn new(test_key: &PphTestKey, tracker: Tracker) -> Self {
        let cipher = Aes128::new(GenericArray::from_slice(&test_key.0));
        Self { cipher, tracker }
    }

    /// True iff the value hashed into `a` is one greater than the value
    /// hashed into `b`. Comparison of the re-keyed images is constant time.
    pub fn test(&self, a: &PphHash, b: &PphHash) -> bool {
        self.tracker.record(Primitive::Pph);
        let mut left = AesBlock::from(a.image);
        let mut right = AesBlock::from(b.successor);
        self.cipher.encrypt_block(&mut left);
        self.cipher.encrypt_block(&mut right);
        left.as_slice().ct_eq(right.as_slice()).into()
    }
}
