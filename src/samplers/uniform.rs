use crate::primitives::prg::Tape;
use crate::range::Range;
use crate::tracker::{Primitive, Tracker};
use byteorder::{BigEndian, ByteOrder};

/// Draws uniformly from a closed interval by rejection sampling against the
/// smallest covering power of two, so every value in the interval is equally
/// likely and the draw consumes a whole number of tape bytes.
pub struct UniformSampler {
    tracker: Tracker,
}

impl UniformSampler {
    pub fn new(tracker: Tracker) -> Self {
        UniformSampler { tracker }
    }

    pub fn sample(&self, tape: &mut Tape, range: &Range) -> u64 {
        self.tracker.record(Primitive::UniformSampler);

        let span = range.size();
        if span == 1 {
            return range.from;
        }
        if span == (1u128 << 64) {
            return tape.next_u64();
        }
        let span = span as u64;

        let bits = 64 - (span - 1).leading_zeros();
        let bytes = ((bits + 7) / 8) as usize;
        let mask = if bits == 64 {
            u64::MAX
        } else {
            (1u64 << bits) - 1
        };

        loop {
            let mut buf = [0u8; 8];
            tape.fill(&mut buf[8 - bytes..]);
            let candidate = BigEndian::read_u64(&buf) & mask;
            if candidate < span {
                return range.from + candidate;
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

    #[test]
    fn sample_stays_in_range() {
        let sampler = UniformSampler::new(Tracker::new());
        let range = Range::new(100, 137);
        let mut t = tape(b"in-range");
        for _i in 0..1000 {
            assert!(range.contains(sampler.sample(&mut t, &range)));
        }
    }

    #[test]
    fn singleton_range_consumes_no_tape() {
        let sampler = UniformSampler::new(Tracker::new());
        let mut t = tape(b"singleton");
        let first = t.next_byte();

        let mut t = tape(b"singleton");
        assert_eq!(7, sampler.sample(&mut t, &Range::new(7, 7)));
        /* The next byte must be the one a fresh tape yields first. */
        assert_eq!(first, t.next_byte());
    }

    #[test]
    fn sample_replays_from_the_same_tape() {
        let sampler = UniformSampler::new(Tracker::new());
        let range = Range::new(0, 999);

        let mut a = tape(b"replay");
        let mut b = tape(b"replay");
        for _i in 0..100 {
            assert_eq!(
                sampler.sample(&mut a, &range),
                sampler.sample(&mut b, &range)
            );
        }
    }

    #[test]
    fn full_u64_range_does_not_loop() {
        let sampler = UniformSampler::new(Tracker::new());
        let mut t = tape(b"full");
        sampler.sample(&mut t, &Range::new(0, u64::MAX));
    }

    #[test]
    fn every_value_is_reachable() {
        let sampler = UniformSampler::new(Tracker::new());
        let range = Range::new(0, 3);
        let mut seen = [false; 4];
        let mut t = tape(b"coverage");
        for _i in 0..200 {
            seen[sampler.sample(&mut t, &range) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn sample_spread_matches_a_uniform_distribution() {
        /* Span 100: sd is sqrt((100^2 - 1) / 12), about 28.87. */
        let sampler = UniformSampler::new(Tracker::new());
        let range = Range::new(0, 99);
        let mut t = tape(b"spread");

        let n = 4000;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for _i in 0..n {
            let x = sampler.sample(&mut t, &range) as f64;
            sum += x;
            sum_sq += x * x;
        }
        let mean = sum / n as f64;
        let sd = (sum_sq / n as f64 - mean * mean).sqrt();

        let expected = ((100.0f64 * 100.0 - 1.0) / 12.0).sqrt();
        assert!((mean - 49.5).abs() < 1.5, "mean was {}", mean);
        assert!((sd - expected).abs() < 0.05 * expected, "sd was {}", sd);
    }

    #[test]
    fn usage_is_recorded() {
        let tracker = Tracker::new();
        let sampler = UniformSampler::new(tracker.clone());
        let mut t = tape(b"usage");
        sampler.sample(&mut t, &Range::new(0, 10));

        assert_eq!(
            tracker.snapshot().primitive(Primitive::UniformSampler).direct,
            1
        );
    }
}
