use crate::convert::ToOrderedInteger;
use crate::primitives::hash::Aes128Hash;
use crate::primitives::prf::Aes128Prf;
use crate::primitives::prp::{PrpCache, TablePrp};
use crate::primitives::symmetric::{SealedPlaintext, SymmetricCipher};
use crate::primitives::{AesBlock, Hash, Prf};
use crate::scheme::{CipherSize, OreScheme, SchemeError, SchemeKey, SchemeResult};
use crate::tracker::{Operation, Tracker};
use aes::cipher::generic_array::GenericArray;
use byteorder::{BigEndian, ByteOrder};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;
use zeroize::{Zeroize, ZeroizeOnDrop};

/*
 * The Lewi-Wu block ORE. A plaintext is cut into n blocks. The left
 * ciphertext holds, per block, the PRP-permuted block value and a PRF tag;
 * the right ciphertext holds, per block, a d-entry table of nonce-masked
 * three-way comparison results. Comparing a left against a right only
 * reveals the outcome at the first divergent block, nothing about the
 * blocks below it.
 */

const SEAL_TAG: u8 = 0x02;

fn cmp3(a: u16, b: u16) -> u16 {
    match a.cmp(&b) {
        Ordering::Equal => 0,
        Ordering::Greater => 1,
        Ordering::Less => 2,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct LewiKey {
    left: SchemeKey,
    right: SchemeKey,
}

impl CipherSize for LewiKey {
    fn size_bits(&self) -> usize {
        256
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeftBlock {
    pub tag: [u8; 16],
    pub value: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LewiLeft {
    pub blocks: Vec<LeftBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LewiRight {
    pub nonce: [u8; 16],
    pub blocks: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LewiCipherText {
    pub left: Option<LewiLeft>,
    pub right: Option<LewiRight>,
    pub sealed: Option<SealedPlaintext>,
}

impl CipherSize for LewiCipherText {
    /* Size as stored: 16-byte tags and nonce, one u16 per left block,
     * two bits per right table entry. */
    fn size_bits(&self) -> usize {
        let mut bits = 0;
        if let Some(left) = &self.left {
            bits += left.blocks.len() * (128 + 16);
        }
        if let Some(right) = &self.right {
            bits += 128 + right.blocks.iter().map(|row| row.len() * 2).sum::<usize>();
        }
        if let Some(sealed) = &self.sealed {
            bits += sealed.size_bits();
        }
        bits
    }
}

pub struct LewiOre {
    blocks: usize,
    block_bits: u8,
    values_per_block: u16,
    rng: ChaCha20Rng,
    prp_cache: RefCell<PrpCache>,
    tracker: Tracker,
}

impl LewiOre {
    /// Default parameters: eight 4-bit blocks.
    pub fn new(seed: u64) -> Self {
        Self::build(seed, 8, 4)
    }

    pub fn with_blocks(seed: u64, blocks: usize) -> SchemeResult<Self> {
        let block_bits = match blocks {
            4 => 8,
            8 => 4,
            16 => 2,
            _ => {
                return Err(SchemeError::Configuration(format!(
                    "unsupported block count {}, expected 4, 8 or 16",
                    blocks
                )))
            }
        };
        Ok(Self::build(seed, blocks, block_bits))
    }

    fn build(seed: u64, blocks: usize, block_bits: u8) -> Self {
        LewiOre {
            blocks,
            block_bits,
            values_per_block: 1u16 << block_bits,
            rng: ChaCha20Rng::seed_from_u64(seed),
            prp_cache: RefCell::new(PrpCache::new()),
            tracker: Tracker::new(),
        }
    }

    fn prf(&self, key: &SchemeKey) -> Aes128Prf {
        Aes128Prf::new(GenericArray::from_slice(key.bytes()), self.tracker.clone())
    }

    fn block_value(&self, value: u32, i: usize) -> u16 {
        let shift = (self.blocks - 1 - i) as u32 * self.block_bits as u32;
        ((value >> shift) & (self.values_per_block as u32 - 1)) as u16
    }

    /* The bits of `value` strictly above block i. */
    fn prefix(&self, value: u32, i: usize) -> u32 {
        if i == 0 {
            0
        } else {
            value & (u32::MAX << (32 - i as u32 * self.block_bits as u32))
        }
    }

    fn ro_block(&self, i: usize, prefix: u32, permuted: u16) -> AesBlock {
        let mut block = AesBlock::default();
        block[0] = i as u8;
        BigEndian::write_u32(&mut block[1..5], prefix);
        BigEndian::write_u16(&mut block[5..7], permuted);
        block
    }

    /* Per-prefix PRP so equal blocks under different prefixes permute
     * independently. */
    fn prp_for(&self, prf_right: &Aes128Prf, i: usize, prefix: u32) -> SchemeResult<Rc<TablePrp>> {
        let mut seed_block = AesBlock::default();
        seed_block[0] = i as u8;
        BigEndian::write_u32(&mut seed_block[1..5], prefix);
        let prp_key: [u8; 16] = prf_right.chain(&seed_block).into();
        Ok(self
            .prp_cache
            .borrow_mut()
            .get(&prp_key, self.block_bits, &self.tracker)?)
    }

    fn left_of(&self, value: u32, key: &LewiKey) -> SchemeResult<LewiLeft> {
        let prf_left = self.prf(&key.left);
        let prf_right = self.prf(&key.right);

        let mut permuted = Vec::with_capacity(self.blocks);
        let mut tags: Vec<AesBlock> = Vec::with_capacity(self.blocks);
        for i in 0..self.blocks {
            let pfx = self.prefix(value, i);
            let prp = self.prp_for(&prf_right, i, pfx)?;
            let p = prp.permute(self.block_value(value, i))?;
            tags.push(self.ro_block(i, pfx, p));
            permuted.push(p);
        }
        prf_left.encrypt_all(&mut tags);

        Ok(LewiLeft {
            blocks: permuted
                .into_iter()
                .zip(tags)
                .map(|(value, tag)| LeftBlock {
                    tag: tag.into(),
                    value,
                })
                .collect(),
        })
    }

    fn right_of(&self, value: u32, key: &LewiKey, nonce: [u8; 16]) -> SchemeResult<LewiRight> {
        let prf_left = self.prf(&key.left);
        let prf_right = self.prf(&key.right);
        let hasher: Aes128Hash = Hash::new(GenericArray::from_slice(&nonce), self.tracker.clone());
        let d = self.values_per_block as usize;

        let mut rows = Vec::with_capacity(self.blocks);
        for i in 0..self.blocks {
            let pfx = self.prefix(value, i);
            let prp = self.prp_for(&prf_right, i, pfx)?;
            let xi = self.block_value(value, i);

            /* Tag every permuted slot, then mask the comparison results
             * with the nonce-keyed hash of each tag. */
            let mut tags: Vec<AesBlock> =
                (0..d).map(|j| self.ro_block(i, pfx, j as u16)).collect();
            prf_left.encrypt_all(&mut tags);
            let masks = hasher.hash_all_mod(&mut tags, 3);

            let mut row = Vec::with_capacity(d);
            for (j, mask) in masks.iter().enumerate() {
                let inverted = prp.invert(j as u16)?;
                row.push(((cmp3(inverted, xi) + mask) % 3) as u8);
            }
            rows.push(row);
        }

        Ok(LewiRight {
            nonce,
            blocks: rows,
        })
    }

    fn seal_cipher(&self, key: &LewiKey) -> SymmetricCipher {
        let prf_left = self.prf(&key.left);
        SymmetricCipher::new(&prf_left.derive(SEAL_TAG), self.tracker.clone())
    }

    /// Left component only: the half a querier sends along with a range
    /// predicate. Deterministic for a given key.
    pub fn encrypt_left(&self, plaintext: i32, key: &LewiKey) -> SchemeResult<LewiCipherText> {
        self.tracker.record_operation(Operation::Encrypt);
        Ok(LewiCipherText {
            left: Some(self.left_of(plaintext.map_to(), key)?),
            right: None,
            sealed: None,
        })
    }

    /// Right component only: the nonce-randomised half stored server side.
    pub fn encrypt_right(&mut self, plaintext: i32, key: &LewiKey) -> SchemeResult<LewiCipherText> {
        self.tracker.record_operation(Operation::Encrypt);
        let nonce: [u8; 16] = self.rng.gen();
        Ok(LewiCipherText {
            left: None,
            right: Some(self.right_of(plaintext.map_to(), key, nonce)?),
            sealed: None,
        })
    }
}

impl OreScheme for LewiOre {
    type Key = LewiKey;
    type CipherText = LewiCipherText;

    fn keygen(&mut self) -> LewiKey {
        self.tracker.record_operation(Operation::KeyGen);
        LewiKey {
            left: SchemeKey::generate(&mut self.rng),
            right: SchemeKey::generate(&mut self.rng),
        }
    }

    fn encrypt(&mut self, plaintext: i32, key: &LewiKey) -> SchemeResult<LewiCipherText> {
        self.tracker.record_operation(Operation::Encrypt);
        let value = plaintext.map_to();
        let left = self.left_of(value, key)?;
        let nonce: [u8; 16] = self.rng.gen();
        let right = self.right_of(value, key, nonce)?;
        let seal_nonce: [u8; 16] = self.rng.gen();
        let sealed = self.seal_cipher(key).seal(seal_nonce, plaintext);

        Ok(LewiCipherText {
            left: Some(left),
            right: Some(right),
            sealed: Some(sealed),
        })
    }

    fn decrypt(&self, ciphertext: &LewiCipherText, key: &LewiKey) -> SchemeResult<i32> {
        self.tracker.record_operation(Operation::Decrypt);
        let sealed = ciphertext
            .sealed
            .as_ref()
            .ok_or(SchemeError::MalformedCipherText("sealed plaintext missing"))?;
        let plaintext = self.seal_cipher(key).open(sealed);
        let value = plaintext.map_to();

        /* Re-derive a deterministic component to authenticate the seal. */
        if let Some(left) = &ciphertext.left {
            if self.left_of(value, key)? != *left {
                return Err(SchemeError::Authenticity);
            }
        } else if let Some(right) = &ciphertext.right {
            if self.right_of(value, key, right.nonce)? != *right {
                return Err(SchemeError::Authenticity);
            }
        } else {
            return Err(SchemeError::MalformedCipherText(
                "ciphertext has no comparable component",
            ));
        }
        Ok(plaintext)
    }

    fn compare(&self, a: &LewiCipherText, b: &LewiCipherText) -> SchemeResult<Ordering> {
        self.tracker.record_operation(Operation::Compare);

        let (left, right, flipped) = if let (Some(l), Some(r)) = (&a.left, &b.right) {
            (l, r, false)
        } else if let (Some(l), Some(r)) = (&b.left, &a.right) {
            (l, r, true)
        } else {
            return Err(SchemeError::MalformedCipherText(
                "comparison needs a left and a right component",
            ));
        };
        if left.blocks.len() != right.blocks.len() {
            return Err(SchemeError::MalformedCipherText(
                "ciphertext block counts differ",
            ));
        }

        let hasher: Aes128Hash =
            Hash::new(GenericArray::from_slice(&right.nonce), self.tracker.clone());

        let mut result = Ordering::Equal;
        for (lb, row) in left.blocks.iter().zip(right.blocks.iter()) {
            let entry = *row.get(lb.value as usize).ok_or(
                SchemeError::MalformedCipherText("left block value outside right table"),
            )? as u16;
            let mask = hasher.hash_mod(&lb.tag, 3);
            match (3 + entry - mask) % 3 {
                0 => continue,
                1 => {
                    result = Ordering::Greater;
                    break;
                }
                _ => {
                    result = Ordering::Less;
                    break;
                }
            }
        }
        Ok(if flipped { result.reverse() } else { result })
    }

    fn tracker(&self) -> &Tracker {
        &self.tracker
    }
}
