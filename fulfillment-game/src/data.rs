use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::card::{Card, CardEffect};
use crate::error::DomainError;
use crate::stage::Stage;
use crate::values::InsurancePremium;

const EMBEDDED_CATALOG_JSON: &str = include_str!("../assets/cards.json");

static DEFAULT_CATALOG: Lazy<Option<CardCatalog>> = Lazy::new(|| {
    CardCatalog::from_json(EMBEDDED_CATALOG_JSON)
        .map_err(|err| log::error!("bundled cards.json is malformed: {err}"))
        .ok()
});

/// Template for a challenge offered in one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub power: i32,
}

impl ChallengeTemplate {
    #[must_use]
    pub fn to_card(&self) -> Card {
        Card::challenge(self.name.clone(), self.power).with_description(self.description.clone())
    }
}

/// Weighted entry of the life-card pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeTemplate {
    pub name: String,
    pub power: i32,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl LifeTemplate {
    #[must_use]
    pub fn to_card(&self) -> Card {
        Card::life(self.name.clone(), self.power)
    }
}

/// Insurance offered for sale between turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub power: i32,
    pub premium: i32,
    /// `None` means whole-life coverage.
    #[serde(default)]
    pub term_turns: Option<u32>,
    #[serde(default)]
    pub effects: Vec<CardEffect>,
}

impl InsuranceTemplate {
    /// Premium after the difficulty multiplier.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the base premium is out of range or the
    /// multiplier is negative.
    pub fn premium(&self, multiplier: f64) -> Result<InsurancePremium, DomainError> {
        InsurancePremium::new(self.premium)?.apply_multiplier(multiplier)
    }

    #[must_use]
    pub fn to_card(&self) -> Card {
        let effects = self.effects.iter().cloned();
        let card = match self.term_turns {
            Some(turns) => Card::term_insurance(self.name.clone(), self.power, turns, effects),
            None => Card::insurance(self.name.clone(), self.power, effects),
        };
        card.with_description(self.description.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DreamTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub power: i32,
}

impl DreamTemplate {
    #[must_use]
    pub fn to_card(&self) -> Card {
        Card::dream(self.name.clone(), self.power).with_description(self.description.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StageChallenges {
    #[serde(default)]
    pub youth: Vec<ChallengeTemplate>,
    #[serde(default)]
    pub middle_age: Vec<ChallengeTemplate>,
    #[serde(default)]
    pub fulfillment: Vec<ChallengeTemplate>,
}

/// Container for all card data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CardCatalog {
    #[serde(default)]
    pub challenges: StageChallenges,
    #[serde(default)]
    pub life_cards: Vec<LifeTemplate>,
    #[serde(default)]
    pub insurance_market: Vec<InsuranceTemplate>,
    #[serde(default)]
    pub dreams: Vec<DreamTemplate>,
}

impl CardCatalog {
    /// Create an empty catalog (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load catalog data from JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a valid catalog.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The catalog bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the bundled asset is malformed.
    pub fn embedded() -> Result<Self, serde_json::Error> {
        match DEFAULT_CATALOG.as_ref() {
            Some(catalog) => Ok(catalog.clone()),
            None => Self::from_json(EMBEDDED_CATALOG_JSON),
        }
    }

    /// The bundled catalog, or an empty one if it failed to parse (logged once).
    #[must_use]
    pub fn default_catalog() -> Self {
        DEFAULT_CATALOG.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn challenges_for(&self, stage: Stage) -> &[ChallengeTemplate] {
        match stage {
            Stage::Youth => &self.challenges.youth,
            Stage::MiddleAge => &self.challenges.middle_age,
            Stage::Fulfillment => &self.challenges.fulfillment,
        }
    }

    /// Fresh challenge cards for a stage.
    #[must_use]
    pub fn challenge_cards(&self, stage: Stage) -> Vec<Card> {
        self.challenges_for(stage)
            .iter()
            .map(ChallengeTemplate::to_card)
            .collect()
    }

    /// The first `count` dreams as challenge-like cards.
    #[must_use]
    pub fn dream_cards(&self, count: usize) -> Vec<Card> {
        self.dreams
            .iter()
            .take(count)
            .map(DreamTemplate::to_card)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardType, InsuranceTerm};

    #[test]
    fn bundled_catalog_covers_every_stage() {
        let catalog = CardCatalog::embedded().unwrap();
        assert_eq!(catalog, CardCatalog::default_catalog());
        for stage in Stage::ALL {
            assert!(
                !catalog.challenges_for(stage).is_empty(),
                "no challenges for {stage}"
            );
        }
        assert!(catalog.life_cards.iter().any(|t| t.power > 0));
        assert!(catalog.life_cards.iter().any(|t| t.power < 0));
        assert_eq!(catalog.dreams.len(), 10);
    }

    #[test]
    fn catalog_from_json_applies_defaults() {
        let json = r#"{
            "challenges": { "youth": [ { "name": "Exam", "power": 3 } ] },
            "life_cards": [ { "name": "Grit", "power": 2 } ]
        }"#;
        let catalog = CardCatalog::from_json(json).unwrap();
        assert_eq!(catalog.challenges_for(Stage::Youth).len(), 1);
        assert!(catalog.challenges_for(Stage::Fulfillment).is_empty());
        assert_eq!(catalog.life_cards[0].weight, 1);
        assert!(catalog.insurance_market.is_empty());
    }

    #[test]
    fn insurance_template_builds_term_and_whole_life_cards() {
        let catalog = CardCatalog::default_catalog();
        let medical = catalog
            .insurance_market
            .iter()
            .find(|t| t.term_turns.is_some())
            .unwrap();
        let card = medical.to_card();
        assert_eq!(card.card_type, CardType::Insurance);
        assert!(card.is_term_insurance());

        let whole = catalog
            .insurance_market
            .iter()
            .find(|t| t.term_turns.is_none())
            .unwrap();
        assert_eq!(
            whole.to_card().insurance_term,
            Some(InsuranceTerm::WholeLife)
        );
    }

    #[test]
    fn premium_multiplier_applies() {
        let template = InsuranceTemplate {
            name: "Test".into(),
            description: String::new(),
            power: 1,
            premium: 10,
            term_turns: None,
            effects: Vec::new(),
        };
        assert_eq!(template.premium(1.5).unwrap().value(), 15);
        assert_eq!(template.premium(0.5).unwrap().value(), 5);
        assert!(template.premium(-1.0).is_err());
    }

    #[test]
    fn dream_cards_take_requested_count() {
        let catalog = CardCatalog::default_catalog();
        let dreams = catalog.dream_cards(3);
        assert_eq!(dreams.len(), 3);
        assert!(dreams.iter().all(|c| c.card_type == CardType::Dream));
        assert_eq!(catalog.dream_cards(0).len(), 0);
    }
}
