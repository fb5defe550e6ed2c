use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::game::resources::{ResourceBundle, ShortfallError};
use crate::types::{DevCardKind, Resource};

/// Shared supply: resource cards plus the development card draw and
/// discard piles. Every card the players do not hold lives here, which is
/// what makes resource conservation checkable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bank {
    resources: ResourceBundle,
    draw_pile: Vec<DevCardKind>,
    discard_pile: Vec<DevCardKind>,
}

impl Bank {
    pub fn standard(rng: &mut impl rand::Rng) -> Self {
        let mut draw_pile = standard_development_deck();
        draw_pile.shuffle(rng);
        Self {
            resources: ResourceBundle::from_counts([19, 19, 19, 19, 19]),
            draw_pile,
            discard_pile: Vec::new(),
        }
    }

    pub fn resources(&self) -> &ResourceBundle {
        &self.resources
    }

    pub fn available(&self, resource: Resource) -> u8 {
        self.resources.get(resource)
    }

    pub fn receive(&mut self, bundle: &ResourceBundle) {
        self.resources.add_bundle(bundle);
    }

    /// Hand out a bundle from the supply, or fail without touching it.
    pub fn dispense(&mut self, bundle: &ResourceBundle) -> Result<(), ShortfallError> {
        self.resources.remove_bundle(bundle)
    }

    pub fn draw_development_card(&mut self) -> Option<DevCardKind> {
        self.draw_pile.pop()
    }

    pub fn discard_development_card(&mut self, kind: DevCardKind) {
        self.discard_pile.push(kind);
    }

    pub fn draw_pile_len(&self) -> usize {
        self.draw_pile.len()
    }

    pub fn discard_pile_len(&self) -> usize {
        self.discard_pile.len()
    }
}

fn standard_development_deck() -> Vec<DevCardKind> {
    use DevCardKind::*;
    const DISTRIBUTION: &[(DevCardKind, usize)] = &[
        (Knight, 14),
        (VictoryPoint, 5),
        (RoadBuilding, 2),
        (YearOfPlenty, 2),
        (Monopoly, 2),
    ];

    let mut deck = Vec::with_capacity(25);
    for (card, count) in DISTRIBUTION {
        deck.extend(std::iter::repeat(*card).take(*count));
    }
    deck
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn standard_bank_stock() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let bank = Bank::standard(&mut rng);
        for resource in Resource::ALL {
            assert_eq!(bank.available(resource), 19);
        }
        assert_eq!(bank.draw_pile_len(), 25);
        assert_eq!(bank.discard_pile_len(), 0);
    }

    #[test]
    fn dispense_fails_atomically() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut bank = Bank::standard(&mut rng);
        let mut ask = ResourceBundle::zero();
        ask.add(Resource::Wood, 20);
        assert!(bank.dispense(&ask).is_err());
        assert_eq!(bank.available(Resource::Wood), 19);
    }
}
