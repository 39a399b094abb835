use std::hash::Hash;
use std::hash::Hasher;

use super::ConnectPoint;
use super::Link;
use super::Weight;

/// Ordered, contiguous sequence of links with its accumulated cost.
#[derive(Clone, Debug)]
pub struct Path {
    links: Vec<Link>,
    cost: Weight,
}

impl Path {
    /// `links` must be non-empty and contiguous; path search guarantees both.
    pub fn new(
        links: Vec<Link>,
        cost: Weight,
    ) -> Self {
        debug_assert!(!links.is_empty(), "path must contain at least one link");
        Self { links, cost }
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn cost(&self) -> Weight {
        self.cost
    }

    pub fn hop_count(&self) -> usize {
        self.links.len()
    }

    pub fn src(&self) -> &ConnectPoint {
        self.links[0].src()
    }

    pub fn dst(&self) -> &ConnectPoint {
        self.links[self.links.len() - 1].dst()
    }
}

impl PartialEq for Path {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.links == other.links && self.cost.value().to_bits() == other.cost.value().to_bits()
    }
}

impl Eq for Path {}

impl Hash for Path {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.links.hash(state);
        self.cost.value().to_bits().hash(state);
    }
}
