//! Card entity and its per-type factories.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::values::CardPower;

pub const LIFE_CARD_COST: i32 = 0;
pub const CHALLENGE_CARD_COST: i32 = 0;
pub const INSURANCE_CARD_COST: i32 = 1;
pub const DREAM_CARD_COST: i32 = 0;

/// Opaque card identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(Uuid);

impl CardId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CardId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for CardId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Life,
    Challenge,
    Insurance,
    Dream,
}

impl CardType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Life => "life",
            Self::Challenge => "challenge",
            Self::Insurance => "insurance",
            Self::Dream => "dream",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effect descriptor carried by a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardEffect {
    /// Absorbs this much damage from each failed challenge.
    ShieldDamage { amount: i32 },
    /// Restores vitality at every turn advance.
    HealPerTurn { amount: i32 },
    /// Counts toward the final score.
    PowerBonus { amount: i32 },
    /// Records the challenge that earned this card.
    ChallengeReward {
        challenge_id: CardId,
        challenge_name: String,
    },
}

pub type Effects = SmallVec<[CardEffect; 2]>;

/// Coverage period of an insurance card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsuranceTerm {
    #[default]
    WholeLife,
    Term { remaining_turns: u32 },
}

impl InsuranceTerm {
    /// Count one turn down. Returns `true` once the coverage has lapsed.
    pub fn tick(&mut self) -> bool {
        match self {
            Self::WholeLife => false,
            Self::Term { remaining_turns } => {
                *remaining_turns = remaining_turns.saturating_sub(1);
                *remaining_turns == 0
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub card_type: CardType,
    pub power: i32,
    pub cost: i32,
    #[serde(default)]
    pub effects: Effects,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_term: Option<InsuranceTerm>,
    #[serde(default)]
    pub is_used: bool,
}

impl Card {
    fn build(name: impl Into<String>, card_type: CardType, power: i32, cost: i32) -> Self {
        Self {
            id: CardId::new(),
            name: name.into(),
            description: String::new(),
            card_type,
            power,
            cost,
            effects: Effects::new(),
            insurance_term: None,
            is_used: false,
        }
    }

    #[must_use]
    pub fn life(name: impl Into<String>, power: i32) -> Self {
        Self::build(name, CardType::Life, power, LIFE_CARD_COST)
    }

    #[must_use]
    pub fn challenge(name: impl Into<String>, power: i32) -> Self {
        Self::build(name, CardType::Challenge, power, CHALLENGE_CARD_COST)
    }

    #[must_use]
    pub fn dream(name: impl Into<String>, power: i32) -> Self {
        Self::build(name, CardType::Dream, power, DREAM_CARD_COST)
    }

    /// Whole-life insurance.
    #[must_use]
    pub fn insurance(
        name: impl Into<String>,
        power: i32,
        effects: impl IntoIterator<Item = CardEffect>,
    ) -> Self {
        let mut card = Self::build(name, CardType::Insurance, power, INSURANCE_CARD_COST);
        card.effects = effects.into_iter().collect();
        card.insurance_term = Some(InsuranceTerm::WholeLife);
        card
    }

    /// Insurance that lapses after `turns` turn advances.
    #[must_use]
    pub fn term_insurance(
        name: impl Into<String>,
        power: i32,
        turns: u32,
        effects: impl IntoIterator<Item = CardEffect>,
    ) -> Self {
        let mut card = Self::insurance(name, power, effects);
        card.insurance_term = Some(InsuranceTerm::Term {
            remaining_turns: turns.max(1),
        });
        card
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Power as a bounded value, clamping any out-of-range raw power.
    #[must_use]
    pub fn power_value(&self) -> CardPower {
        CardPower::saturating(self.power)
    }

    /// Whether this card can be offered as a challenge.
    #[must_use]
    pub const fn is_challenge_like(&self) -> bool {
        matches!(self.card_type, CardType::Challenge | CardType::Dream)
    }

    #[must_use]
    pub const fn is_term_insurance(&self) -> bool {
        matches!(self.insurance_term, Some(InsuranceTerm::Term { .. }))
    }

    /// Damage absorbed per failed challenge.
    #[must_use]
    pub fn shield_amount(&self) -> i32 {
        self.effects
            .iter()
            .map(|effect| match effect {
                CardEffect::ShieldDamage { amount } => (*amount).max(0),
                _ => 0,
            })
            .sum()
    }

    /// Vitality restored per turn advance.
    #[must_use]
    pub fn heal_amount(&self) -> i32 {
        self.effects
            .iter()
            .map(|effect| match effect {
                CardEffect::HealPerTurn { amount } => (*amount).max(0),
                _ => 0,
            })
            .sum()
    }

    /// Score contribution: raw power plus any power bonus effects.
    #[must_use]
    pub fn score_value(&self) -> i32 {
        let bonus: i32 = self
            .effects
            .iter()
            .map(|effect| match effect {
                CardEffect::PowerBonus { amount } => *amount,
                _ => 0,
            })
            .sum();
        self.power_value().value().saturating_add(bonus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factories_assign_type_and_cost() {
        let life = Card::life("努力", 2);
        assert_eq!(life.card_type, CardType::Life);
        assert_eq!(life.cost, LIFE_CARD_COST);

        let challenge = Card::challenge("就職活動", 3);
        assert_eq!(challenge.card_type, CardType::Challenge);
        assert!(challenge.is_challenge_like());
        assert!(!challenge.is_used);

        let insurance = Card::insurance("医療保険", 1, [CardEffect::ShieldDamage { amount: 2 }]);
        assert_eq!(insurance.cost, INSURANCE_CARD_COST);
        assert_eq!(insurance.insurance_term, Some(InsuranceTerm::WholeLife));
        assert_eq!(insurance.shield_amount(), 2);
    }

    #[test]
    fn every_factory_call_gets_a_fresh_id() {
        let a = Card::life("友情", 1);
        let b = Card::life("友情", 1);
        assert_ne!(a.id, b.id);
        let parsed: CardId = a.id.to_string().parse().unwrap();
        assert_eq!(parsed, a.id);
    }

    #[test]
    fn term_insurance_lapses_after_its_turns() {
        let mut card = Card::term_insurance("定期保険", 1, 2, []);
        let term = card.insurance_term.as_mut().unwrap();
        assert!(!term.tick());
        assert!(term.tick());

        let mut whole = InsuranceTerm::WholeLife;
        assert!(!whole.tick());
    }

    #[test]
    fn power_value_clamps_raw_power() {
        let card = Card::life("奇跡", 5_000);
        assert_eq!(card.power_value().value(), CardPower::MAX);
    }

    #[test]
    fn effects_serialize_with_kind_tag() {
        let card = Card::insurance("終身保険", 2, [CardEffect::HealPerTurn { amount: 1 }]);
        let json = serde_json::to_string(&card).unwrap();
        assert!(json.contains(r#""kind":"heal_per_turn""#));
        let back: Card = serde_json::from_str(&json).unwrap();
        assert_eq!(back.heal_amount(), 1);
        assert_eq!(back.score_value(), 2);
    }
}
