use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Ballot numbers order proposals within and across iterations.
///
/// A ballot is the pair `(iteration, counter)`. Ballots from a later
/// iteration always order after any ballot from an earlier one;
/// within an iteration the counter decides.
#[derive(Serialize, Deserialize, PartialEq, Hash, Eq, Clone, Copy, Debug, Default)]
pub struct Ballot {
    /// Iteration (decree) the ballot belongs to
    pub iteration: u64,
    /// Proposal attempt within the iteration
    pub counter: u64,
}

impl Ballot {
    /// Creates a ballot from its parts.
    pub const fn new(iteration: u64, counter: u64) -> Ballot {
        Ballot { iteration, counter }
    }

    /// The lowest ballot of an iteration. Acceptors reset to this ballot
    /// when they first observe the iteration.
    pub const fn initial(iteration: u64) -> Ballot {
        Ballot {
            iteration,
            counter: 0,
        }
    }

    /// Flag indicating `self` strictly precedes `other`.
    pub fn less(&self, other: &Ballot) -> bool {
        self.iteration < other.iteration
            || (self.iteration == other.iteration && self.counter < other.counter)
    }

    /// Next ballot within the same iteration for a proposer identified by
    /// `index` out of `proposers`. The counter is the smallest value greater
    /// than the current counter that is congruent to `index`, which keeps
    /// counters of distinct proposers disjoint.
    pub fn next_counter(&self, index: u64, proposers: u64) -> Ballot {
        debug_assert!(proposers > 0 && index < proposers);
        let mut counter = self.counter + 1;
        let rem = counter % proposers;
        if rem != index {
            counter += (index + proposers - rem) % proposers;
        }
        Ballot {
            iteration: self.iteration,
            counter,
        }
    }

    /// Same counter, next iteration.
    ///
    /// The counter carries over, so the first attempt in the following
    /// iteration continues counting from where this one stopped.
    pub fn next_iteration(&self) -> Ballot {
        Ballot {
            iteration: self.iteration + 1,
            counter: self.counter,
        }
    }
}

/// Returns the greater ballot. Ties resolve to `a`.
pub fn max(a: Ballot, b: Ballot) -> Ballot {
    if a.less(&b) {
        b
    } else {
        a
    }
}

impl PartialOrd for Ballot {
    fn partial_cmp(&self, other: &Ballot) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ballot {
    fn cmp(&self, other: &Ballot) -> Ordering {
        match self.iteration.cmp(&other.iteration) {
            Ordering::Equal => self.counter.cmp(&other.counter),
            o => o,
        }
    }
}

impl fmt::Display for Ballot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.iteration, self.counter)
    }
}
