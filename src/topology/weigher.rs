use super::TopologyEdge;
use crate::net::LinkType;
use crate::net::Weight;

/// Assigns a traversal cost to each edge.
///
/// Returning [`Weight::NON_VIABLE`] (or any non-finite or negative weight)
/// excludes the edge from path search.
pub trait LinkWeigher: Send + Sync + 'static {
    fn weight(
        &self,
        edge: &TopologyEdge,
    ) -> Weight;
}

impl<F> LinkWeigher for F
where
    F: Fn(&TopologyEdge) -> Weight + Send + Sync + 'static,
{
    fn weight(
        &self,
        edge: &TopologyEdge,
    ) -> Weight {
        self(edge)
    }
}

/// One unit per active hop; indirect links cost more, inactive ones are
/// never traversed.
#[derive(Debug, Clone, Copy)]
pub struct HopCountLinkWeigher {
    indirect_link_cost: f64,
}

impl HopCountLinkWeigher {
    pub const DEFAULT_INDIRECT_LINK_COST: f64 = 5.0;

    pub fn new(indirect_link_cost: f64) -> Self {
        Self { indirect_link_cost }
    }
}

impl Default for HopCountLinkWeigher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INDIRECT_LINK_COST)
    }
}

impl LinkWeigher for HopCountLinkWeigher {
    fn weight(
        &self,
        edge: &TopologyEdge,
    ) -> Weight {
        let link = edge.link();
        if !link.is_active() {
            return Weight::NON_VIABLE;
        }
        match link.link_type() {
            LinkType::Indirect => Weight::new(self.indirect_link_cost),
            _ => Weight::new(1.0),
        }
    }
}
