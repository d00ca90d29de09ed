//! Player decision policies used by the session controller.

use rand::{Rng, RngCore};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::card::{Card, CardId};
use crate::data::InsuranceTemplate;
use crate::game::Game;

/// Chance per turn that the random strategy visits the market.
const RANDOM_PURCHASE_CHANCE: f64 = 0.2;

/// Decision capability plugged into [`crate::GameSession::play_turn`].
pub trait TurnStrategy {
    /// Choose a challenge from a non-empty offer. `None` takes the first one.
    fn pick_challenge(&mut self, game: &Game, offer: &[Card], rng: &mut dyn RngCore)
    -> Option<CardId>;

    /// Index into `market` of an insurance to buy before drawing challenges.
    fn pick_insurance(
        &mut self,
        _game: &Game,
        _market: &[InsuranceTemplate],
        _rng: &mut dyn RngCore,
    ) -> Option<usize> {
        None
    }
}

/// Built-in strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyId {
    #[default]
    First,
    /// Lowest power first; insures itself when uncovered.
    Weakest,
    Strongest,
    Random,
}

impl StrategyId {
    pub const ALL: [Self; 4] = [Self::First, Self::Weakest, Self::Strongest, Self::Random];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Weakest => "weakest",
            Self::Strongest => "strongest",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "weakest" => Ok(Self::Weakest),
            "strongest" => Ok(Self::Strongest),
            "random" => Ok(Self::Random),
            _ => Err(()),
        }
    }
}

/// Market entries whose premium leaves the player alive.
fn affordable<'a>(
    game: &'a Game,
    market: &'a [InsuranceTemplate],
) -> impl Iterator<Item = (usize, i32)> + 'a {
    market.iter().enumerate().filter_map(move |(index, template)| {
        let premium = game.premium_for(template).ok()?.value();
        (premium < game.vitality().value()).then_some((index, premium))
    })
}

impl TurnStrategy for StrategyId {
    fn pick_challenge(
        &mut self,
        game: &Game,
        offer: &[Card],
        rng: &mut dyn RngCore,
    ) -> Option<CardId> {
        let card = match self {
            Self::First => offer.first(),
            Self::Weakest => offer.iter().min_by_key(|c| game.required_power_for(c)),
            Self::Strongest => offer.iter().max_by_key(|c| game.required_power_for(c)),
            Self::Random => offer.choose(rng),
        };
        card.map(|c| c.id)
    }

    fn pick_insurance(
        &mut self,
        game: &Game,
        market: &[InsuranceTemplate],
        rng: &mut dyn RngCore,
    ) -> Option<usize> {
        match self {
            Self::First | Self::Strongest => None,
            Self::Weakest => {
                if game.total_shield() > 0 {
                    return None;
                }
                let budget = game.vitality().value() / 4;
                affordable(game, market)
                    .filter(|(index, premium)| {
                        *premium <= budget && market[*index].to_card().shield_amount() > 0
                    })
                    .min_by_key(|(_, premium)| *premium)
                    .map(|(index, _)| index)
            }
            Self::Random => {
                if !rng.gen_bool(RANDOM_PURCHASE_CHANCE) {
                    return None;
                }
                let options: Vec<usize> = affordable(game, market).map(|(i, _)| i).collect();
                options.choose(rng).copied()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardEffect;
    use crate::config::GameConfig;
    use crate::data::CardCatalog;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::sync::Arc;

    fn game() -> Game {
        let mut game = Game::new(
            GameConfig::default(),
            Arc::new(CardCatalog::default_catalog()),
            11,
        )
        .unwrap();
        game.start().unwrap();
        game
    }

    fn offer() -> Vec<Card> {
        vec![
            Card::challenge("mid", 3),
            Card::challenge("low", 1),
            Card::challenge("high", 6),
        ]
    }

    #[test]
    fn strategies_pick_by_power() {
        let game = game();
        let offer = offer();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let pick = |mut s: StrategyId, rng: &mut ChaCha20Rng| {
            s.pick_challenge(&game, &offer, rng).unwrap()
        };
        assert_eq!(pick(StrategyId::First, &mut rng), offer[0].id);
        assert_eq!(pick(StrategyId::Weakest, &mut rng), offer[1].id);
        assert_eq!(pick(StrategyId::Strongest, &mut rng), offer[2].id);
        let random = pick(StrategyId::Random, &mut rng);
        assert!(offer.iter().any(|c| c.id == random));
    }

    #[test]
    fn weakest_buys_cheapest_shield_once() {
        let mut game = game();
        let market = vec![
            InsuranceTemplate {
                name: "heal".into(),
                description: String::new(),
                power: 1,
                premium: 2,
                term_turns: None,
                effects: vec![CardEffect::HealPerTurn { amount: 1 }],
            },
            InsuranceTemplate {
                name: "pricey shield".into(),
                description: String::new(),
                power: 1,
                premium: 20,
                term_turns: Some(3),
                effects: vec![CardEffect::ShieldDamage { amount: 2 }],
            },
            InsuranceTemplate {
                name: "cheap shield".into(),
                description: String::new(),
                power: 1,
                premium: 6,
                term_turns: Some(3),
                effects: vec![CardEffect::ShieldDamage { amount: 1 }],
            },
        ];
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let mut strategy = StrategyId::Weakest;
        let pick = strategy.pick_insurance(&game, &market, &mut rng);
        assert_eq!(pick, Some(2));

        game.buy_insurance(&market[2]).unwrap();
        assert_eq!(strategy.pick_insurance(&game, &market, &mut rng), None);
        assert_eq!(
            StrategyId::First.pick_insurance(&game, &market, &mut rng),
            None
        );
    }

    #[test]
    fn strategy_ids_parse() {
        for id in StrategyId::ALL {
            assert_eq!(id.as_str().parse::<StrategyId>(), Ok(id));
        }
        assert_eq!(" Random ".parse::<StrategyId>(), Ok(StrategyId::Random));
        assert!("greedy".parse::<StrategyId>().is_err());
    }
}
