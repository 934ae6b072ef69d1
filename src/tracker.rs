use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// The keyed primitives a scheme can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Primitive {
    Prf,
    Prp,
    Prg,
    Hash,
    Symmetric,
    Pph,
    UniformSampler,
    HgSampler,
}

/// The operations of the uniform scheme interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Operation {
    KeyGen,
    Encrypt,
    Decrypt,
    Compare,
}

/// Invocation counts for one primitive kind. A call is `nested` when it was
/// made from inside another primitive rather than directly by a scheme.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub direct: u64,
    pub nested: u64,
}

impl Calls {
    pub fn total(&self) -> u64 {
        self.direct + self.nested
    }
}

/// A point-in-time view of everything recorded so far.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UsageReport {
    primitives: BTreeMap<Primitive, Calls>,
    operations: BTreeMap<Operation, u64>,
}

impl UsageReport {
    pub fn primitive(&self, kind: Primitive) -> Calls {
        self.primitives.get(&kind).copied().unwrap_or_default()
    }

    pub fn operation(&self, op: Operation) -> u64 {
        self.operations.get(&op).copied().unwrap_or(0)
    }

    pub fn primitives(&self) -> impl Iterator<Item = (&Primitive, &Calls)> {
        self.primitives.iter()
    }

    pub fn operations(&self) -> impl Iterator<Item = (&Operation, &u64)> {
        self.operations.iter()
    }
}

/// Cheap, cloneable accounting handle threaded into every primitive.
///
/// All clones of a tracker share one set of counters. A handle obtained via
/// [`Tracker::nested`] records its primitive calls as nested, which is how
/// the direct/nested ("impure") distinction of composed primitives survives
/// without any event bubbling. Single-threaded by design; schemes own one
/// tracker and hand clones down.
#[derive(Debug, Default, Clone)]
pub struct Tracker {
    shared: Rc<RefCell<UsageReport>>,
    nested: bool,
}

impl Tracker {
    pub fn new() -> Self {
        Default::default()
    }

    /// A handle whose recordings count as nested primitive usage.
    pub fn nested(&self) -> Self {
        Tracker {
            shared: Rc::clone(&self.shared),
            nested: true,
        }
    }

    pub fn record(&self, kind: Primitive) {
        let mut report = self.shared.borrow_mut();
        let calls = report.primitives.entry(kind).or_default();
        if self.nested {
            calls.nested += 1;
        } else {
            calls.direct += 1;
        }
    }

    pub fn record_operation(&self, op: Operation) {
        *self.shared.borrow_mut().operations.entry(op).or_insert(0) += 1;
    }

    /// Pull the counters accumulated so far.
    pub fn snapshot(&self) -> UsageReport {
        self.shared.borrow().clone()
    }

    pub fn reset(&self) {
        *self.shared.borrow_mut() = Default::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_and_nested_counts_are_separate() {
        let tracker = Tracker::new();
        tracker.record(Primitive::Prf);
        tracker.record(Primitive::Prf);
        tracker.nested().record(Primitive::Prf);

        let report = tracker.snapshot();
        assert_eq!(report.primitive(Primitive::Prf).direct, 2);
        assert_eq!(report.primitive(Primitive::Prf).nested, 1);
        assert_eq!(report.primitive(Primitive::Prf).total(), 3);
        assert_eq!(report.primitive(Primitive::Hash).total(), 0);
    }

    #[test]
    fn clones_share_counters() {
        let tracker = Tracker::new();
        let clone = tracker.clone();
        clone.record(Primitive::Prg);
        tracker.record_operation(Operation::Encrypt);

        assert_eq!(clone.snapshot().operation(Operation::Encrypt), 1);
        assert_eq!(tracker.snapshot().primitive(Primitive::Prg).direct, 1);
    }

    #[test]
    fn reset_clears_everything() {
        let tracker = Tracker::new();
        tracker.record(Primitive::Hash);
        tracker.record_operation(Operation::KeyGen);
        tracker.reset();

        assert_eq!(tracker.snapshot(), UsageReport::default());
    }
}
