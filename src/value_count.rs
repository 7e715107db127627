//! Multiplicity tally over any sequence of hashable values

use std::collections::HashMap;
use std::hash::Hash;

pub trait ValueCount: IntoIterator + Sized
where
    Self::Item: Eq + Hash,
{
    /// Maps each distinct value to how many times it occurs.
    /// Values that never occur are absent from the map.
    fn value_count(self) -> HashMap<Self::Item, usize> {
        let mut counts = HashMap::new();
        for value in self {
            *counts.entry(value).or_insert(0) += 1;
        }
        counts
    }
}

impl<I> ValueCount for I
where
    I: IntoIterator,
    I::Item: Eq + Hash,
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_count() {
        let counts = vec![1, 1, 2, 3].value_count();
        assert_eq!(counts[&1], 2);
        assert_eq!(counts[&2], 1);
        assert_eq!(counts[&3], 1);
        assert_eq!(counts.get(&4), None);
    }

    #[test]
    fn test_value_count_borrowed() {
        let words = ["a", "b", "a"];
        let counts = words.iter().value_count();
        assert_eq!(counts.get(&"a"), Some(&2));
        assert!(Vec::<u8>::new().value_count().is_empty());
    }
}
