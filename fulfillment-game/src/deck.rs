//! Ordered card collections with draw / shuffle / refill semantics.
//!
//! A drawn card leaves the deck; a card marked used stays in place but is
//! invisible to `size`, `draw`, `offer` and `shuffle` until the next `refill`.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::card::{Card, CardId};
use crate::data::{CardCatalog, LifeTemplate};
use crate::stage::Stage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    #[must_use]
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// Number of cards still available to draw.
    #[must_use]
    pub fn size(&self) -> usize {
        self.cards.iter().filter(|c| !c.is_used).count()
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.size() == 0
    }

    /// Every card in the population, used or not.
    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn available(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter().filter(|c| !c.is_used)
    }

    #[must_use]
    pub fn find(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    /// Remove and return the top available card; `None` when exhausted.
    pub fn draw(&mut self) -> Option<Card> {
        let index = self.cards.iter().rposition(|c| !c.is_used)?;
        Some(self.cards.remove(index))
    }

    /// Fisher-Yates over the available cards. Used cards sink to the bottom.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let (mut available, used): (Vec<Card>, Vec<Card>) =
            self.cards.drain(..).partition(|c| !c.is_used);
        available.shuffle(rng);
        self.cards = used;
        self.cards.extend(available);
    }

    /// Replace the population and clear every used flag.
    pub fn refill(&mut self, cards: Vec<Card>) {
        self.cards = cards;
        for card in &mut self.cards {
            card.is_used = false;
        }
    }

    /// Mark a card used. Returns the card if it was available.
    pub fn mark_used(&mut self, id: CardId) -> Option<&Card> {
        let card = self.cards.iter_mut().find(|c| c.id == id && !c.is_used)?;
        card.is_used = true;
        Some(card)
    }

    /// Up to `count` distinct available cards chosen at random, left in place.
    pub fn offer<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<Card> {
        let available: Vec<&Card> = self.available().collect();
        available
            .choose_multiple(rng, count)
            .map(|card| (*card).clone())
            .collect()
    }
}

/// The challenge deck of the current stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChallengeDeck {
    stage: Stage,
    deck: Deck,
}

impl ChallengeDeck {
    #[must_use]
    pub fn for_stage(stage: Stage, catalog: &CardCatalog, dream_count: usize) -> Self {
        let mut deck = Self {
            stage,
            deck: Deck::default(),
        };
        deck.refill_for(stage, catalog, dream_count);
        deck
    }

    /// Repopulate from the stage templates. Dreams join the final stage only.
    pub fn refill_for(&mut self, stage: Stage, catalog: &CardCatalog, dream_count: usize) {
        let mut cards = catalog.challenge_cards(stage);
        if stage == Stage::Fulfillment {
            cards.extend(catalog.dream_cards(dream_count));
        }
        self.stage = stage;
        self.deck.refill(cards);
    }

    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.deck.size()
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.deck.is_exhausted()
    }

    #[must_use]
    pub const fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn offer<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<Card> {
        self.deck.offer(rng, count)
    }

    pub fn mark_used(&mut self, id: CardId) -> Option<Card> {
        self.deck.mark_used(id).cloned()
    }
}

/// Weighted life-card pool. Each template appears `weight` times per cycle;
/// an exhausted cycle is rebuilt and reshuffled on the next draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LifeDeck {
    templates: Vec<LifeTemplate>,
    deck: Deck,
    cycles: u32,
}

impl LifeDeck {
    #[must_use]
    pub fn new(templates: Vec<LifeTemplate>) -> Self {
        Self {
            templates,
            deck: Deck::default(),
            cycles: 0,
        }
    }

    #[must_use]
    pub fn from_catalog(catalog: &CardCatalog) -> Self {
        Self::new(catalog.life_cards.clone())
    }

    #[must_use]
    pub fn templates(&self) -> &[LifeTemplate] {
        &self.templates
    }

    /// Cards left in the current cycle.
    #[must_use]
    pub fn size(&self) -> usize {
        self.deck.size()
    }

    /// How many times the pool has been rebuilt.
    #[must_use]
    pub const fn cycles(&self) -> u32 {
        self.cycles
    }

    fn rebuild<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let cards = self
            .templates
            .iter()
            .flat_map(|t| (0..t.weight).map(move |_| t.to_card()))
            .collect();
        self.deck.refill(cards);
        self.deck.shuffle(rng);
        self.cycles = self.cycles.saturating_add(1);
    }

    /// Draw `count` cards. Returns fewer only when the pool has no templates.
    pub fn draw_hand<R: Rng + ?Sized>(&mut self, rng: &mut R, count: usize) -> Vec<Card> {
        let mut hand = Vec::with_capacity(count);
        while hand.len() < count {
            if let Some(card) = self.deck.draw() {
                hand.push(card);
                continue;
            }
            self.rebuild(rng);
            if self.deck.is_exhausted() {
                break;
            }
        }
        hand
    }
}
