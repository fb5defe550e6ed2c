use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::types::Resource;

/// Counts of each of the five resource card types. Cheap to copy; all the
/// engine's resource accounting funnels through this type so conservation
/// is easy to audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ResourceBundle {
    counts: [u8; Resource::ALL.len()],
}

impl ResourceBundle {
    pub const fn from_counts(counts: [u8; 5]) -> Self {
        Self { counts }
    }

    pub const fn zero() -> Self {
        Self { counts: [0; 5] }
    }

    pub fn single(resource: Resource, amount: u8) -> Self {
        let mut bundle = Self::zero();
        bundle.add(resource, amount);
        bundle
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().map(|&v| v as u32).sum()
    }

    pub fn get(&self, resource: Resource) -> u8 {
        self.counts[resource_index(resource)]
    }

    pub fn add(&mut self, resource: Resource, amount: u8) {
        let idx = resource_index(resource);
        self.counts[idx] = self.counts[idx].saturating_add(amount);
    }

    pub fn add_bundle(&mut self, other: &ResourceBundle) {
        for (idx, value) in other.counts.iter().enumerate() {
            self.counts[idx] = self.counts[idx].saturating_add(*value);
        }
    }

    pub fn remove(&mut self, resource: Resource, amount: u8) -> Result<(), ShortfallError> {
        let idx = resource_index(resource);
        if self.counts[idx] < amount {
            return Err(ShortfallError {
                resource: Some(resource),
                available: self.counts[idx],
                requested: amount,
            });
        }
        self.counts[idx] -= amount;
        Ok(())
    }

    pub fn remove_bundle(&mut self, other: &ResourceBundle) -> Result<(), ShortfallError> {
        if !self.covers(other) {
            return Err(ShortfallError {
                resource: None,
                available: 0,
                requested: 0,
            });
        }
        for (idx, value) in other.counts.iter().enumerate() {
            self.counts[idx] -= *value;
        }
        Ok(())
    }

    pub fn covers(&self, other: &ResourceBundle) -> bool {
        self.counts
            .iter()
            .zip(other.counts.iter())
            .all(|(have, need)| have >= need)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&value| value == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Resource, u8)> + '_ {
        Resource::ALL.into_iter().zip(self.counts.iter().copied())
    }

    /// One entry per physical card, for uniform random draws.
    pub fn flatten(&self) -> Vec<Resource> {
        let mut cards = Vec::with_capacity(self.total() as usize);
        for (resource, count) in self.iter() {
            cards.extend(std::iter::repeat(resource).take(count as usize));
        }
        cards
    }
}

impl Index<Resource> for ResourceBundle {
    type Output = u8;

    fn index(&self, resource: Resource) -> &u8 {
        &self.counts[resource_index(resource)]
    }
}

impl FromIterator<(Resource, u8)> for ResourceBundle {
    fn from_iter<I: IntoIterator<Item = (Resource, u8)>>(iter: I) -> Self {
        let mut bundle = Self::zero();
        for (resource, amount) in iter {
            bundle.add(resource, amount);
        }
        bundle
    }
}

impl fmt::Display for ResourceBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (resource, amount) in self.iter() {
            if amount == 0 {
                continue;
            }
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{amount}x{resource}")?;
            first = false;
        }
        if first {
            write!(f, "nothing")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("insufficient resources")]
pub struct ShortfallError {
    pub resource: Option<Resource>,
    pub available: u8,
    pub requested: u8,
}

const fn resource_index(resource: Resource) -> usize {
    match resource {
        Resource::Wood => 0,
        Resource::Brick => 1,
        Resource::Sheep => 2,
        Resource::Wheat => 3,
        Resource::Ore => 4,
    }
}

// Fixed building costs: wood, brick, sheep, wheat, ore.
pub const COST_ROAD: ResourceBundle = ResourceBundle::from_counts([1, 1, 0, 0, 0]);
pub const COST_SETTLEMENT: ResourceBundle = ResourceBundle::from_counts([1, 1, 1, 1, 0]);
pub const COST_CITY: ResourceBundle = ResourceBundle::from_counts([0, 0, 0, 2, 3]);
pub const COST_DEVELOPMENT: ResourceBundle = ResourceBundle::from_counts([0, 0, 1, 1, 1]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_rejects_shortfall_without_mutation() {
        let mut bundle = ResourceBundle::single(Resource::Wood, 2);
        assert!(bundle.remove(Resource::Wood, 3).is_err());
        assert_eq!(bundle.get(Resource::Wood), 2);
        assert!(bundle.remove_bundle(&COST_ROAD).is_err());
        assert_eq!(bundle.total(), 2);
    }

    #[test]
    fn covers_is_componentwise() {
        let mut hand = ResourceBundle::zero();
        hand.add(Resource::Wheat, 2);
        hand.add(Resource::Ore, 3);
        assert!(hand.covers(&COST_CITY));
        hand.remove(Resource::Ore, 1).unwrap();
        assert!(!hand.covers(&COST_CITY));
    }

    #[test]
    fn flatten_matches_total() {
        let mut hand = ResourceBundle::zero();
        hand.add(Resource::Brick, 2);
        hand.add(Resource::Sheep, 1);
        let cards = hand.flatten();
        assert_eq!(cards.len() as u32, hand.total());
    }
}
