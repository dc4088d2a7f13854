//! FILENAME: core/pivot-model/src/projector.rs
//! Ordered-index projection of keys.
//!
//! A `KeyProjector` stores a list of input positions and produces, for any
//! input sequence, the sequence of the values found at those positions.
//! It is computed once per pivot assignment and used both ways:
//! header keys + frozen value -> native key, and native key -> header key.

use smallvec::SmallVec;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyProjector {
    positions: SmallVec<[usize; 8]>,
}

impl KeyProjector {
    /// Output component `i` is input component `positions[i]`.
    pub fn new(positions: impl IntoIterator<Item = usize>) -> Self {
        KeyProjector {
            positions: positions.into_iter().collect(),
        }
    }

    /// The projector that undoes `order`: if `order[j] == d`, output
    /// component `d` is input component `j`.
    ///
    /// `order` must be a permutation of `0..order.len()`.
    pub fn inverse(order: &[usize]) -> Self {
        let mut positions: SmallVec<[usize; 8]> = SmallVec::from_elem(0, order.len());
        for (j, &d) in order.iter().enumerate() {
            positions[d] = j;
        }
        KeyProjector { positions }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Projects `input`. Every stored position must be in bounds.
    pub fn project<T: Clone>(&self, input: &[T]) -> SmallVec<[T; 4]> {
        self.positions.iter().map(|&p| input[p].clone()).collect()
    }

    /// True when the projection of `input` equals `expected`, without
    /// allocating.
    pub fn matches<T: PartialEq>(&self, input: &[T], expected: &[T]) -> bool {
        self.positions.len() == expected.len()
            && self
                .positions
                .iter()
                .zip(expected)
                .all(|(&p, e)| input[p] == *e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_selects_positions() {
        let projector = KeyProjector::new([2, 0]);
        let out = projector.project(&["a", "b", "c"]);
        assert_eq!(out.as_slice(), &["c", "a"]);
    }

    #[test]
    fn test_inverse_restores_native_order() {
        // Pivot input is (rows=[2], columns=[0], frozen=[1]).
        let order = [2, 0, 1];
        let projector = KeyProjector::inverse(&order);
        let pivoted = ["z", "x", "y"];
        assert_eq!(projector.project(&pivoted).as_slice(), &["x", "y", "z"]);
    }

    #[test]
    fn test_single_and_empty_projection() {
        assert_eq!(KeyProjector::new([1]).project(&[10, 20]).as_slice(), &[20]);
        let empty = KeyProjector::new([]);
        assert!(empty.is_empty());
        assert!(empty.project(&[1, 2]).is_empty());
        assert!(empty.matches(&[1, 2], &[]));
    }

    #[test]
    fn test_matches() {
        let projector = KeyProjector::new([0, 2]);
        assert!(projector.matches(&[1, 5, 3], &[1, 3]));
        assert!(!projector.matches(&[1, 5, 3], &[1, 5]));
    }
}
