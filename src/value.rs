use crate::ballot::Ballot;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Opaque payload the acceptors agree upon for an iteration.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash)]
pub struct Value(pub Bytes);

impl From<Vec<u8>> for Value {
    fn from(vec: Vec<u8>) -> Value {
        Value(vec.into())
    }
}

impl From<&'static str> for Value {
    fn from(s: &'static str) -> Value {
        Value(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value(s.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Value {
        Value(Bytes::copy_from_slice(&n.to_be_bytes()))
    }
}

impl Deref for Value {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.0.deref()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Value({})", self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for b in self.0.iter() {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Source of fresh values for iterations in which no acceptor reports
/// a previously accepted one.
pub trait ValueSource {
    /// Invent a value to propose under `ballot`.
    fn next_value(&mut self, ballot: Ballot) -> Value;
}

impl<F> ValueSource for F
where
    F: FnMut(Ballot) -> Value,
{
    fn next_value(&mut self, ballot: Ballot) -> Value {
        self(ballot)
    }
}

/// Chooses uniformly random 63-bit integers.
#[derive(Default, Clone, Copy, Debug)]
pub struct RandomValues;

impl ValueSource for RandomValues {
    fn next_value(&mut self, ballot: Ballot) -> Value {
        let n = rand::random::<u64>() >> 1;
        trace!("Chose value {} for {}", n, ballot);
        Value::from(n)
    }
}
