use crate::primitives::prg::Tape;
use crate::samplers::SamplerError;
use crate::tracker::{Primitive, Tracker};
use num::bigint::{BigInt, Sign};
use num::rational::BigRational;
use num::Zero;

/*
 * Hypergeometric sampler over deterministic tape coins.
 *
 * Two regimes. When the support of the distribution is small the sample is
 * drawn by exact CDF inversion over arbitrary-precision weights, so the
 * result is bias free. Larger supports use the H2PEC algorithm
 * (Kachitvichyanukul & Schmeiser, ACM TOMS 668): inverse transformation
 * near-degenerate cases, otherwise rectangle/exponential-tail rejection
 * with a squeeze acceptance test. H2PEC works in f64, which is the same
 * trade the reference implementations of this sampler make.
 */

const EXACT_SUPPORT: u128 = 256;
const MAX_REJECTIONS: u32 = 10_000;

const CON: f64 = 57.56462733;
const DELTAL: f64 = 0.0078;
const DELTAU: f64 = 0.0034;
const SCALE: f64 = 1.0e25;

/* ln(i!), exact for i <= 7, Stirling beyond. */
fn afc(i: f64) -> f64 {
    const TABLE: [f64; 8] = [
        0.0,
        0.0,
        0.6931471805599453,
        1.791759469228055,
        3.178053830347946,
        4.787491742782046,
        6.579251212010101,
        8.525161361065415,
    ];
    if i <= 7.0 {
        TABLE[i as usize]
    } else {
        (i + 0.5) * i.ln() - i + 0.08333333333333 / i - 0.00277777777777 / (i * i * i)
            + 0.9189385332
    }
}

pub struct HgSampler {
    tracker: Tracker,
}

impl HgSampler {
    pub fn new(tracker: Tracker) -> Self {
        HgSampler { tracker }
    }

    /// Number of successes in `draws` draws without replacement from a
    /// population of `population` items of which `successes` are marked.
    pub fn sample(
        &self,
        tape: &mut Tape,
        population: u64,
        successes: u64,
        draws: u64,
    ) -> Result<u64, SamplerError> {
        self.tracker.record(Primitive::HgSampler);

        if successes > population || draws > population {
            return Err(SamplerError::InvalidParameters {
                population,
                successes,
                draws,
            });
        }
        if draws == 0 || successes == 0 {
            return Ok(0);
        }
        if successes == population {
            return Ok(draws);
        }
        if draws == population {
            return Ok(successes);
        }

        let lo = (draws as u128 + successes as u128).saturating_sub(population as u128) as u64;
        let hi = draws.min(successes);

        let result = if (hi - lo) as u128 + 1 <= EXACT_SUPPORT {
            self.exact_inversion(tape, population, successes, draws, lo, hi)
        } else {
            self.h2pec(tape, population, successes, draws)
        };

        /* f64 rounding in the rejection path can step just outside. */
        Ok(result.clamp(lo, hi))
    }

    /*
     * CDF inversion with exact rational weights. Consecutive pmf values
     * obey p(x+1)/p(x) = (K-x)(n-x) / ((x+1)(N-K-n+x+1)), so the whole
     * (unnormalised) weight vector falls out of one pass.
     */
    fn exact_inversion(
        &self,
        tape: &mut Tape,
        population: u64,
        successes: u64,
        draws: u64,
        lo: u64,
        hi: u64,
    ) -> u64 {
        let n = population as u128;
        let k_pop = successes as u128;
        let k_draw = draws as u128;

        let mut weights: Vec<BigRational> = Vec::with_capacity((hi - lo) as usize + 1);
        let mut w = BigRational::from_integer(BigInt::from(1u8));
        weights.push(w.clone());
        for x in (lo as u128)..(hi as u128) {
            let numer = BigInt::from(k_pop - x) * BigInt::from(k_draw - x);
            /* x >= lo keeps n + x + 1 - K - n_draws non-negative. */
            let denom = BigInt::from(x + 1) * BigInt::from(n + x + 1 - k_pop - k_draw);
            w = w * BigRational::new(numer, denom);
            weights.push(w.clone());
        }

        let total = weights
            .iter()
            .fold(BigRational::zero(), |acc, w| acc + w);

        let mut coins = [0u8; 16];
        tape.fill(&mut coins);
        let numerator = BigInt::from_bytes_be(Sign::Plus, &coins);
        let target = total * BigRational::new(numerator, BigInt::from(1u8) << 128usize);

        let mut cumulative = BigRational::zero();
        for (offset, weight) in weights.iter().enumerate() {
            cumulative = cumulative + weight;
            if cumulative > target {
                return lo + offset as u64;
            }
        }
        hi
    }

    fn h2pec(&self, tape: &mut Tape, population: u64, successes: u64, draws: u64) -> u64 {
        let failures = population - successes;
        let swapped = 2 * (successes as u128) >= population as u128;
        let complemented = 2 * (draws as u128) >= population as u128;

        let tn = population as f64;
        let n1 = if swapped { failures } else { successes } as f64;
        let n2 = if swapped { successes } else { failures } as f64;
        let k = if complemented {
            (population - draws) as f64
        } else {
            draws as f64
        };

        let m = ((k + 1.0) * (n1 + 1.0) / (tn + 2.0)).trunc();
        let minjx = (k - n2).max(0.0).trunc();
        let maxjx = n1.min(k);

        let jx = if m - minjx < 10.0 {
            self.inverse_transform(tape, tn, n1, n2, k, m, minjx, maxjx)
        } else {
            self.rejection(tape, tn, n1, n2, k, m, minjx, maxjx)
        };

        /* Undo the swap/complement reductions. */
        let jx = jx as i128;
        let kk = draws as i128;
        let result = match (complemented, swapped) {
            (true, true) => kk - failures as i128 + jx,
            (true, false) => successes as i128 - jx,
            (false, true) => kk - jx,
            (false, false) => jx,
        };
        result.max(0) as u64
    }

    #[allow(clippy::too_many_arguments)]
    fn inverse_transform(
        &self,
        tape: &mut Tape,
        tn: f64,
        n1: f64,
        n2: f64,
        k: f64,
        m: f64,
        minjx: f64,
        maxjx: f64,
    ) -> f64 {
        let w = if minjx == 0.0 {
            (CON + afc(n2) + afc(tn - k) - afc(n2 - k) - afc(tn)).exp()
        } else {
            (CON + afc(n1) + afc(k) - afc(k - n2) - afc(tn)).exp()
        };

        let mut restarts = 0u32;
        'restart: loop {
            if restarts >= MAX_REJECTIONS {
                return m;
            }
            restarts += 1;

            let mut p = w;
            let mut ix = minjx;
            let mut u = tape.next_f64() * SCALE;
            while u > p {
                u -= p;
                p *= (n1 - ix) * (k - ix);
                ix += 1.0;
                p = p / ix / (n2 - k + ix);
                if ix > maxjx {
                    continue 'restart;
                }
            }
            return ix;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn rejection(
        &self,
        tape: &mut Tape,
        tn: f64,
        n1: f64,
        n2: f64,
        k: f64,
        m: f64,
        minjx: f64,
        maxjx: f64,
    ) -> f64 {
        let s = ((tn - k) * k * n1 * n2 / (tn - 1.0) / tn / tn).sqrt();
        let d = (1.5 * s).trunc() + 0.5;
        let xl = m - d + 0.5;
        let xr = m + d + 0.5;
        let a = afc(m) + afc(n1 - m) + afc(k - m) + afc(n2 - k + m);
        let kl = (a - afc(xl) - afc(n1 - xl) - afc(k - xl) - afc(n2 - k + xl)).exp();
        let kr = (a - afc(xr - 1.0)
            - afc(n1 - xr + 1.0)
            - afc(k - xr + 1.0)
            - afc(n2 - k + xr - 1.0))
        .exp();
        let lamdl = -(xl * (n2 - k + xl) / ((n1 - xl + 1.0) * (k - xl + 1.0))).ln();
        let lamdr = -((n1 - xr + 1.0) * (k - xr + 1.0) / (xr * (n2 - k + xr))).ln();
        let p1 = d + d;
        let p2 = p1 + kl / lamdl;
        let p3 = p2 + kr / lamdr;

        let mut rejections = 0u32;
        loop {
            if rejections >= MAX_REJECTIONS {
                return m;
            }
            rejections += 1;

            let u = tape.next_f64() * p3;
            let mut v = tape.next_f64();
            let ix;
            if u <= p1 {
                /* Rectangle over the mode. */
                ix = (xl + u).trunc();
            } else if u <= p2 {
                /* Left exponential tail. */
                ix = (xl + v.ln() / lamdl).trunc();
                if ix < minjx {
                    continue;
                }
                v = v * (u - p1) * lamdl;
            } else {
                /* Right exponential tail. */
                ix = (xr - v.ln() / lamdr).trunc();
                if ix > maxjx {
                    continue;
                }
                v = v * (u - p2) * lamdr;
            }

            let accept = if m < 100.0 || ix <= 50.0 {
                /* Explicit evaluation of pmf(ix)/pmf(m). */
                let mut f = 1.0;
                if m < ix {
                    let mut i = m + 1.0;
                    while i <= ix {
                        f = f * (n1 - i + 1.0) * (k - i + 1.0) / ((n2 - k + i) * i);
                        i += 1.0;
                    }
                } else if m > ix {
                    let mut i = ix + 1.0;
                    while i <= m {
                        f = f * i * (n2 - k + i) / ((n1 - i + 1.0) * (k - i + 1.0));
                        i += 1.0;
                    }
                }
                v <= f
            } else {
                /* Squeeze with a Stirling test as the last resort. */
                let y = ix;
                let y1 = y + 1.0;
                let ym = y - m;
                let yn = n1 - y + 1.0;
                let yk = k - y + 1.0;
                let nk = n2 - k + y1;
                let r = -ym / y1;
                let s2 = ym / yn;
                let t = ym / yk;
                let e = -ym / nk;
                let g = yn * yk / (y1 * nk) - 1.0;
                let dg = if g < 0.0 { 1.0 + g } else { 1.0 };
                let gu = g * (1.0 + g * (-0.5 + g / 3.0));
                let gl = gu - 0.25 * g.powi(4) / dg;
                let xm = m + 0.5;
                let xn = n1 - m + 0.5;
                let xk = k - m + 0.5;
                let nm = n2 - k + xm;
                let ub = y * gu - m * gl
                    + DELTAU
                    + xm * r * (1.0 + r * (-0.5 + r / 3.0))
                    + xn * s2 * (1.0 + s2 * (-0.5 + s2 / 3.0))
                    + xk * t * (1.0 + t * (-0.5 + t / 3.0))
                    + nm * e * (1.0 + e * (-0.5 + e / 3.0));
                let alv = v.ln();
                if alv > ub {
                    false
                } else {
                    let mut dr = xm * r.powi(4);
                    if r < 0.0 {
                        dr /= 1.0 + r;
                    }
                    let mut ds = xn * s2.powi(4);
                    if s2 < 0.0 {
                        ds /= 1.0 + s2;
                    }
                    let mut dt = xk * t.powi(4);
                    if t < 0.0 {
                        dt /= 1.0 + t;
                    }
                    let mut de = nm * e.powi(4);
                    if e < 0.0 {
                        de /= 1.0 + e;
                    }
                    if alv < ub - 0.25 * (dr + ds + dt + de) + (y + m) * (gl - gu) - DELTAL {
                        true
                    } else {
                        alv <= a - afc(ix) - afc(n1 - ix) - afc(k - ix) - afc(n2 - k + ix)
                    }
                }
            };

            if accept {
                return ix;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tape(context: &[u8]) -> Tape {
        let key: [u8; 16] = Default::default();
        Tape::new(&key, context, Tracker::new())
    }

    fn support(population: u64, successes: u64, draws: u64) -> (u64, u64) {
        let lo =
            (draws as u128 + successes as u128).saturating_sub(population as u128) as u64;
        (lo, draws.min(successes))
    }

    #[test]
    fn rejects_invalid_parameters() {
        let sampler = HgSampler::new(Tracker::new());
        let mut t = tape(b"invalid");
        assert!(sampler.sample(&mut t, 10, 11, 5).is_err());
        assert!(sampler.sample(&mut t, 10, 5, 11).is_err());
        assert!(sampler.sample(&mut t, 0, 0, 1).is_err());
    }

    #[test]
    fn degenerate_cases_consume_no_tape() {
        let sampler = HgSampler::new(Tracker::new());
        let mut t = tape(b"degenerate");
        let first = t.next_byte();

        let mut t = tape(b"degenerate");
        assert_eq!(Ok(0), sampler.sample(&mut t, 10, 5, 0));
        assert_eq!(Ok(0), sampler.sample(&mut t, 10, 0, 5));
        assert_eq!(Ok(5), sampler.sample(&mut t, 10, 10, 5));
        assert_eq!(Ok(5), sampler.sample(&mut t, 10, 5, 10));
        assert_eq!(first, t.next_byte());
    }

    #[test]
    fn exact_path_stays_in_support() {
        let sampler = HgSampler::new(Tracker::new());
        let (lo, hi) = support(100, 60, 70);
        let mut t = tape(b"exact-support");
        for _i in 0..500 {
            let x = sampler.sample(&mut t, 100, 60, 70).unwrap();
            assert!((lo..=hi).contains(&x));
        }
    }

    #[test]
    fn exact_path_mean_is_plausible() {
        /* N=10, K=5, n=5 has mean n*K/N = 2.5. */
        let sampler = HgSampler::new(Tracker::new());
        let mut t = tape(b"exact-mean");
        let mut sum = 0u64;
        for _i in 0..400 {
            sum += sampler.sample(&mut t, 10, 5, 5).unwrap();
        }
        let mean = sum as f64 / 400.0;
        assert!((1.5..=3.5).contains(&mean), "mean was {}", mean);
    }

    #[test]
    fn exact_path_matches_the_closed_form_pmf() {
        /* N=10, K=5, n=5: pmf is C(5,x) * C(5,5-x) / C(10,5). */
        let pmf = [1.0, 25.0, 100.0, 100.0, 25.0, 1.0].map(|w| w / 252.0);

        let sampler = HgSampler::new(Tracker::new());
        let mut t = tape(b"exact-pmf");
        let n = 5000u64;
        let mut counts = [0u64; 6];
        for _i in 0..n {
            counts[sampler.sample(&mut t, 10, 5, 5).unwrap() as usize] += 1;
        }

        for (x, &count) in counts.iter().enumerate() {
            let freq = count as f64 / n as f64;
            assert!(
                (freq - pmf[x]).abs() < 0.025,
                "x={} freq={} pmf={}",
                x,
                freq,
                pmf[x]
            );
        }
    }

    #[test]
    fn rejection_path_stays_in_support() {
        let sampler = HgSampler::new(Tracker::new());
        let (population, successes, draws) = (100_000, 50_000, 1_000);
        let (lo, hi) = support(population, successes, draws);
        let mut t = tape(b"h2pec-support");
        for _i in 0..200 {
            let x = sampler.sample(&mut t, population, successes, draws).unwrap();
            assert!((lo..=hi).contains(&x));
        }
    }

    #[test]
    fn rejection_path_mean_is_plausible() {
        /* Mean is n*K/N = 500, sd is about 15.8. */
        let sampler = HgSampler::new(Tracker::new());
        let mut t = tape(b"h2pec-mean");
        let mut sum = 0u64;
        for _i in 0..100 {
            sum += sampler.sample(&mut t, 100_000, 50_000, 1_000).unwrap();
        }
        let mean = sum as f64 / 100.0;
        assert!((400.0..=600.0).contains(&mean), "mean was {}", mean);
    }

    #[test]
    fn huge_population_stays_in_support() {
        let sampler = HgSampler::new(Tracker::new());
        let population = u64::MAX / 2;
        let successes = population / 2;
        let draws = 1_000;
        let mut t = tape(b"huge");
        for _i in 0..50 {
            let x = sampler.sample(&mut t, population, successes, draws).unwrap();
            assert!(x <= draws);
        }
    }

    #[test]
    fn draws_replay_from_the_same_tape() {
        let sampler = HgSampler::new(Tracker::new());
        let mut a = tape(b"replay");
        let mut b = tape(b"replay");
        for _i in 0..50 {
            assert_eq!(
                sampler.sample(&mut a, 1_000_000, 400_000, 2_000).unwrap(),
                sampler.sample(&mut b, 1_000_000, 400_000, 2_000).unwrap()
            );
        }
    }

    #[test]
    fn usage_is_recorded() {
        let tracker = Tracker::new();
        let sampler = HgSampler::new(tracker.clone());
        let mut t = tape(b"usage");
        sampler.sample(&mut t, 100, 50, 10).unwrap();

        assert_eq!(tracker.snapshot().primitive(Primitive::HgSampler).direct, 1);
    }
}
