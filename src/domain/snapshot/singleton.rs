//! Single-record slot for aggregates without an id.

/// Holds at most one record; every write replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct SingletonSlot<T> {
    value: Option<T>,
    revision: u64,
}

impl<T> Default for SingletonSlot<T> {
    fn default() -> Self {
        Self {
            value: None,
            revision: 0,
        }
    }
}

impl<T: Clone + PartialEq> SingletonSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the record. Returns false if it was already identical.
    pub fn replace(&mut self, value: T) -> bool {
        if self.value.as_ref() == Some(&value) {
            return false;
        }
        self.value = Some(value);
        self.revision += 1;
        true
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn clear(&mut self) {
        if self.value.take().is_some() {
            self.revision += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_overwrites_wholesale() {
        let mut slot = SingletonSlot::new();
        assert!(slot.replace(vec![1, 2]));
        assert!(slot.replace(vec![3]));
        assert_eq!(slot.get(), Some(&vec![3]));
        assert_eq!(slot.revision(), 2);
    }

    #[test]
    fn identical_replace_is_a_no_op() {
        let mut slot = SingletonSlot::new();
        slot.replace(7);
        assert!(!slot.replace(7));
        assert_eq!(slot.revision(), 1);
    }
}
