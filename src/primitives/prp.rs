use crate::primitives::prg::Aes128Prng;
use crate::primitives::{PrpError, PrpResult};
use crate::tracker::{Primitive, Tracker};
use std::rc::Rc;
use zeroize::Zeroize;

/*
 * Small-domain pseudo-random permutation over [0, 2^bits), realised as an
 * explicit permutation table built with a Fisher-Yates shuffle driven by the
 * keyed PRG. Forward lookups are O(1); inversion scans the table, which for
 * at most 256 entries beats maintaining a second table.
 */
pub struct TablePrp {
    bits: u8,
    table: Vec<u8>,
    tracker: Tracker,
}

impl Zeroize for TablePrp {
    fn zeroize(&mut self) {
        self.table.zeroize();
    }
}

impl TablePrp {
    pub fn new(key: &[u8; 16], bits: u8, tracker: Tracker) -> PrpResult<Self> {
        if !(1..=8).contains(&bits) {
            return Err(PrpError::InvalidBits(bits));
        }
        let size = 1usize << bits;
        let mut table: Vec<u8> = (0..size as u16).map(|x| x as u8).collect();

        let mut prng = Aes128Prng::init(key, tracker.nested());
        for i in (1..size).rev() {
            let j = prng.gen_range(i as u8);
            table.swap(i, j as usize);
        }

        Ok(TablePrp {
            bits,
            table,
            tracker,
        })
    }

    fn check_domain(&self, value: u16) -> PrpResult<()> {
        if value >= 1u16 << self.bits {
            return Err(PrpError::OutOfDomain {
                value,
                bits: self.bits,
            });
        }
        Ok(())
    }

    /* Forward permutation: x -> pi(x). */
    pub fn permute(&self, value: u16) -> PrpResult<u16> {
        self.tracker.record(Primitive::Prp);
        self.check_domain(value)?;
        Ok(self.table[value as usize] as u16)
    }

    /* Inverse permutation: y -> pi^-1(y). */
    pub fn invert(&self, value: u16) -> PrpResult<u16> {
        self.tracker.record(Primitive::Prp);
        self.check_domain(value)?;
        let target = value as u8;
        self.table
            .iter()
            .position(|&entry| entry == target)
            .map(|index| index as u16)
            .ok_or(PrpError::OutOfDomain {
                value,
                bits: self.bits,
            })
    }
}

/// One-slot cache over the most recently built permutation.
///
/// The block-ORE comparators look the same prefix key up for every block of
/// a ciphertext pair, so even a single slot removes almost all rebuilds.
#[derive(Default)]
pub struct PrpCache {
    slot: Option<([u8; 16], u8, Rc<TablePrp>)>,
}

impl PrpCache {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get(&mut self, key: &[u8; 16], bits: u8, tracker: &Tracker) -> PrpResult<Rc<TablePrp>> {
        if let Some((cached_key, cached_bits, prp)) = &self.slot {
            if cached_key == key && *cached_bits == bits {
                return Ok(Rc::clone(prp));
            }
        }
        let prp = Rc::new(TablePrp::new(key, bits, tracker.clone())?);
        self.slot = Some((*key, bits, Rc::clone(&prp)));
        Ok(prp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn init_prp(bits: u8) -> TablePrp {
        let key: [u8; 16] = hex!("00010203 04050607 08090a0b 0c0d0e0f");
        TablePrp::new(&key, bits, Tracker::new()).unwrap()
    }

    #[test]
    fn prp_inverts_for_every_width() {
        for bits in 1u8..=8 {
            let prp = init_prp(bits);
            for x in 0..(1u16 << bits) {
                let y = prp.permute(x).unwrap();
                assert!(y < 1u16 << bits);
                assert_eq!(x, prp.invert(y).unwrap());
            }
        }
    }

    #[test]
    fn prp_is_a_bijection() {
        let prp = init_prp(8);
        let mut seen = [false; 256];
        for x in 0u16..256 {
            let y = prp.permute(x).unwrap() as usize;
            assert!(!seen[y]);
            seen[y] = true;
        }
    }

    #[test]
    fn prp_rejects_invalid_widths() {
        let key: [u8; 16] = Default::default();
        assert!(matches!(
            TablePrp::new(&key, 0, Tracker::new()),
            Err(PrpError::InvalidBits(0))
        ));
        assert!(matches!(
            TablePrp::new(&key, 9, Tracker::new()),
            Err(PrpError::InvalidBits(9))
        ));
    }

    #[test]
    fn prp_rejects_out_of_domain_values() {
        let prp = init_prp(4);
        assert!(matches!(
            prp.permute(16),
            Err(PrpError::OutOfDomain { value: 16, bits: 4 })
        ));
        assert!(prp.invert(255).is_err());
    }

    #[test]
    fn cache_reuses_same_key_and_width() {
        let tracker = Tracker::new();
        let mut cache = PrpCache::new();
        let key: [u8; 16] = hex!("00010203 04050607 08090a0b 0c0d0e0f");

        let a = cache.get(&key, 5, &tracker).unwrap();
        let b = cache.get(&key, 5, &tracker).unwrap();
        assert!(Rc::ptr_eq(&a, &b));

        let other: [u8; 16] = Default::default();
        let c = cache.get(&other, 5, &tracker).unwrap();
        assert!(!Rc::ptr_eq(&a, &c));
    }

    #[test]
    fn table_build_counts_as_nested_prg() {
        let tracker = Tracker::new();
        let key: [u8; 16] = Default::default();
        let prp = TablePrp::new(&key, 8, tracker.clone()).unwrap();
        prp.permute(3).unwrap();

        let report = tracker.snapshot();
        assert!(report.primitive(Primitive::Prg).nested >= 1);
        assert_eq!(report.primitive(Primitive::Prp).direct, 1);
    }
}
