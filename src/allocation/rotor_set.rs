/// A fixed-width set of rotor indices, stored as a bitmask.
///
/// Bit `i` is set when rotor `i` is a member.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RotorSet(u32);

impl RotorSet {
    /// The number of indices a set can hold.
    pub const CAPACITY: usize = u32::BITS as usize;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Add a rotor index to the set. Indices past the capacity are ignored.
    pub fn insert(&mut self, index: usize) {
        if index < Self::CAPACITY {
            self.0 |= 1 << index;
        }
    }

    pub fn contains(self, index: usize) -> bool {
        index < Self::CAPACITY && self.0 & (1 << index) != 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the member indices in ascending order.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..Self::CAPACITY).filter(move |&index| self.contains(index))
    }
}

impl FromIterator<usize> for RotorSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = Self::empty();
        for index in iter {
            set.insert(index);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::RotorSet;

    #[test]
    fn it_tracks_members() {
        let mut set = RotorSet::empty();
        set.insert(0);
        set.insert(5);
        set.insert(40);

        assert!(set.contains(0));
        assert!(set.contains(5));
        assert!(!set.contains(1));
        assert!(!set.contains(40));
        assert_eq!(set.len(), 2);
        assert_eq!(set.bits(), 0b10_0001);
    }

    #[test]
    fn it_iterates_in_order() {
        let set: RotorSet = [7, 2, 3].into_iter().collect();
        let mut members = set.iter();
        assert_eq!(members.next(), Some(2));
        assert_eq!(members.next(), Some(3));
        assert_eq!(members.next(), Some(7));
        assert_eq!(members.next(), None);
    }
}
