use crate::primitives::prf::Aes128Prf;
use crate::primitives::Prf;
use crate::tracker::{Primitive, Tracker};
use aes::cipher::{consts::U16, generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;
use byteorder::{BigEndian, ByteOrder};
use zeroize::Zeroize;

/*
 * AES-CTR pseudo-random generator. Keeps a buffer of 16 encrypted counter
 * blocks and regenerates it when exhausted, so long draws amortise to one
 * AES call per 16 bytes.
 */
pub struct Aes128Prng {
    cipher: Aes128,
    data: [GenericArray<u8, U16>; 16],
    ptr: (usize, usize), // ptr to block and byte within block
    ctr: u32,            // increments with each new encryption
    tracker: Tracker,
}

impl Zeroize for Aes128Prng {
    fn zeroize(&mut self) {
        for d in self.data.iter_mut() {
            d.as_mut_slice().zeroize();
        }
    }
}

impl Aes128Prng {
    pub fn init(key: &[u8; 16], tracker: Tracker) -> Self {
        let key_array = GenericArray::from_slice(key);
        let cipher = Aes128::new(key_array);
        let mut prng = Self {
            cipher,
            data: Default::default(),
            ctr: 0,
            ptr: (0, 0),
            tracker,
        };
        prng.generate();
        prng
    }

    /*
     * Generates the next byte of the random number sequence.
     */
    pub fn next_byte(&mut self) -> u8 {
        debug_assert!(self.ptr.0 < 16 && self.ptr.1 < 16);
        let value: u8 = self.data[self.ptr.0][self.ptr.1];
        self.inc_ptr();
        value
    }

    pub fn fill(&mut self, out: &mut [u8]) {
        for byte in out.iter_mut() {
            *byte = self.next_byte();
        }
    }

    /* Find a uniform random number up to and including max */
    pub fn gen_range(&mut self, max: u8) -> u8 {
        loop {
            let candidate = self.next_byte();

            if candidate <= max {
                return candidate;
            }
        }
    }

    fn generate(&mut self) {
        self.tracker.record(Primitive::Prg);
        self.ptr = (0, 0);
        for i in 0..16 {
            // Counter
            self.data[i][0..4].copy_from_slice(&self.ctr.to_be_bytes());
            self.ctr += 1;
        }
        self.cipher.encrypt_blocks(&mut self.data);
    }

    #[inline]
    fn inc_ptr(&mut self) {
        if self.ptr == (15, 15) {
            /* generate() already leaves ptr on the next byte. */
            self.generate();
            return;
        }
        if self.ptr.1 < 15 {
            self.ptr.1 += 1;
        } else {
            self.ptr.1 = 0;
            self.ptr.0 += 1;
        }
    }
}

/// A replayable stream of pseudo-random coins bound to a (key, context)
/// pair. The same key and context always yield the same stream, which is
/// what lets the OPE decryptor retrace the encryptor's sampling path.
pub struct Tape {
    prng: Aes128Prng,
    tracker: Tracker,
}

impl Tape {
    pub fn new(key: &[u8; 16], context: &[u8], tracker: Tracker) -> Self {
        /* Seeding goes through the PRF so it shows up as nested usage. */
        let prf = Aes128Prf::new(GenericArray::from_slice(key), tracker.nested());
        let seed: [u8; 16] = prf.chain(context).into();
        let prng = Aes128Prng::init(&seed, tracker.nested());
        Tape { prng, tracker }
    }

    pub fn next_byte(&mut self) -> u8 {
        self.prng.next_byte()
    }

    pub fn fill(&mut self, out: &mut [u8]) {
        self.prng.fill(out)
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill(&mut buf);
        BigEndian::read_u64(&buf)
    }

    /// Uniform double in [0, 1) with 53 bits of precision.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn init_prng() -> Aes128Prng {
        let key: [u8; 16] = hex!("00010203 04050607 08090a0b 0c0d0e0f");

        Aes128Prng::init(&key, Tracker::new())
    }

    #[test]
    fn prg_next_byte() {
        let mut prg = init_prng();
        assert_eq!(198, prg.next_byte());
        assert_eq!(161, prg.next_byte());

        for _i in 3..=255 {
            prg.next_byte();
        }
        assert_eq!((15, 15), prg.ptr);
    }

    #[test]
    fn prg_many_generations() {
        let mut prg = init_prng();

        /* Ask for enough bytes that more data needs to be generated */
        for _i in 0..=100_000 {
            prg.next_byte();
        }
    }

    #[test]
    fn prg_stream_is_contiguous_across_refills() {
        let key: [u8; 16] = hex!("00010203 04050607 08090a0b 0c0d0e0f");
        let mut prg = Aes128Prng::init(&key, Tracker::new());
        let mut stream = [0u8; 512];
        prg.fill(&mut stream);

        /* The stream must read back as plain AES-CTR over counters 0..32,
         * with no byte dropped when the block cache is refilled. */
        let cipher = Aes128::new(GenericArray::from_slice(&key));
        for (i, chunk) in stream.chunks(16).enumerate() {
            let mut block: GenericArray<u8, U16> = Default::default();
            block[0..4].copy_from_slice(&(i as u32).to_be_bytes());
            cipher.encrypt_block(&mut block);
            assert_eq!(chunk, block.as_slice());
        }
    }

    #[test]
    fn prg_usage_is_recorded() {
        let tracker = Tracker::new();
        let key: [u8; 16] = Default::default();
        let mut prg = Aes128Prng::init(&key, tracker.clone());
        for _i in 0..=256 {
            prg.next_byte();
        }

        /* One generation at init, one more after the buffer ran out. */
        assert_eq!(tracker.snapshot().primitive(Primitive::Prg).direct, 2);
    }

    #[test]
    fn tape_replays_for_same_context() {
        let key: [u8; 16] = hex!("00010203 04050607 08090a0b 0c0d0e0f");
        let mut a = Tape::new(&key, b"context", Tracker::new());
        let mut b = Tape::new(&key, b"context", Tracker::new());

        for _i in 0..100 {
            assert_eq!(a.next_byte(), b.next_byte());
        }
        assert_eq!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn tape_diverges_for_different_contexts() {
        let key: [u8; 16] = hex!("00010203 04050607 08090a0b 0c0d0e0f");
        let mut a = Tape::new(&key, b"context-a", Tracker::new());
        let mut b = Tape::new(&key, b"context-b", Tracker::new());

        let mut left = [0u8; 32];
        let mut right = [0u8; 32];
        a.fill(&mut left);
        b.fill(&mut right);
        assert_ne!(left, right);
    }

    #[test]
    fn tape_f64_is_unit_interval() {
        let key: [u8; 16] = Default::default();
        let mut tape = Tape::new(&key, b"f64", Tracker::new());
        for _i in 0..1000 {
            let x = tape.next_f64();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn tape_seeding_counts_as_nested() {
        let tracker = Tracker::new();
        let key: [u8; 16] = Default::default();
        let _tape = Tape::new(&key, b"ctx", tracker.clone());

        let report = tracker.snapshot();
        assert_eq!(report.primitive(Primitive::Prf).nested, 1);
        assert_eq!(report.primitive(Primitive::Prg).nested, 1);
        assert_eq!(report.primitive(Primitive::Prf).direct, 0);
    }
}
