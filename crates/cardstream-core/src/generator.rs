//! Simulated record generation.
//!
//! [`RecordGenerator::generate`] models a call to a slow upstream price feed:
//! it suspends on a tokio timer for the configured latency, then draws a card
//! from the catalog and two synthetic prices. The timer yields to the
//! scheduler, so a hundred generations in flight cost a hundred timers and no
//! blocked worker threads.

use crate::{
    catalog::Catalog,
    common::{
        error::{Error, Result},
        types::{CURRENT_PRICE_RANGE, GeneratorConfig, LISTING_PRICE_RANGE, SequenceId},
    },
    record::Record,
};
use core::time::Duration;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::sync::Arc;

/// Produces one [`Record`] per sequence id from a shared catalog.
///
/// Cloning is cheap: the catalog is behind an `Arc` and the config is `Copy`.
#[derive(Debug, Clone)]
pub struct RecordGenerator {
    catalog: Arc<Catalog>,
    config: GeneratorConfig,
}

impl RecordGenerator {
    pub const fn new(catalog: Arc<Catalog>, config: GeneratorConfig) -> Self {
        Self { catalog, config }
    }

    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Waits out the simulated latency and builds the record for
    /// `sequence_id`.
    ///
    /// # Errors
    ///
    /// Fails only when the catalog cannot answer the drawn position or lacks a
    /// name in the configured locale. Both mean the catalog is corrupt and the
    /// caller should treat them as fatal.
    pub async fn generate(&self, sequence_id: SequenceId) -> Result<Record> {
        let mut rng = self.rng_for(sequence_id);

        let delay = self.delay(&mut rng);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.build(sequence_id, &mut rng)
    }

    // Seeded runs derive one RNG per sequence id so results do not depend on
    // which task happens to finish first.
    fn rng_for(&self, sequence_id: SequenceId) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(sequence_id)),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }

    fn delay(&self, rng: &mut StdRng) -> Duration {
        let jitter = u64::try_from(self.config.jitter.as_micros()).unwrap_or(u64::MAX);
        if jitter == 0 {
            return self.config.latency;
        }
        self.config.latency + Duration::from_micros(rng.random_range(0..=jitter))
    }

    fn build(&self, sequence_id: SequenceId, rng: &mut StdRng) -> Result<Record> {
        let drawable = self.catalog.drawable();
        let size = self.catalog.size();
        if drawable.is_empty() {
            return Err(Error::CatalogIndex { index: 0, size });
        }

        let index = rng.random_range(drawable);
        let entry = self
            .catalog
            .get(index)
            .ok_or(Error::CatalogIndex { index, size })?;
        let locale = self.config.locale;
        let name = entry.name(locale).ok_or(Error::MissingName {
            id: entry.id,
            locale: locale.as_str(),
        })?;

        Ok(Record {
            sequence_id,
            name: name.to_string(),
            listing_price: rng.random_range(LISTING_PRICE_RANGE),
            current_price: rng.random_range(CURRENT_PRICE_RANGE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogEntry, Locale};

    fn catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::new(vec![
                CatalogEntry::new(
                    1,
                    [(Locale::English, "Bulbasaur"), (Locale::French, "Bulbizarre")],
                ),
                CatalogEntry::new(
                    2,
                    [(Locale::English, "Ivysaur"), (Locale::French, "Herbizarre")],
                ),
                CatalogEntry::new(3, [(Locale::English, "Venusaur")]),
            ])
            .unwrap(),
        )
    }

    fn config(seed: u64, locale: Locale) -> GeneratorConfig {
        GeneratorConfig {
            latency: Duration::ZERO,
            jitter: Duration::ZERO,
            locale,
            seed: Some(seed),
        }
    }

    #[tokio::test]
    async fn prices_stay_in_range_and_position_zero_is_never_drawn() {
        let generator = RecordGenerator::new(catalog(), config(7, Locale::English));
        for sequence_id in 1..=500 {
            let record = generator.generate(sequence_id).await.unwrap();
            assert_eq!(record.sequence_id, sequence_id);
            assert!(LISTING_PRICE_RANGE.contains(&record.listing_price));
            assert!(CURRENT_PRICE_RANGE.contains(&record.current_price));
            assert_ne!(record.name, "Bulbasaur");
        }
    }

    #[tokio::test]
    async fn seeded_generation_is_reproducible_per_sequence_id() {
        let a = RecordGenerator::new(catalog(), config(42, Locale::English));
        let b = RecordGenerator::new(catalog(), config(42, Locale::English));

        // Different call order, same answers.
        let forward: Vec<_> = {
            let mut out = Vec::new();
            for id in 1..=20 {
                out.push(a.generate(id).await.unwrap());
            }
            out
        };
        let mut backward = Vec::new();
        for id in (1..=20).rev() {
            backward.push(b.generate(id).await.unwrap());
        }
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[tokio::test]
    async fn missing_locale_is_a_generation_failure() {
        let catalog = Arc::new(
            Catalog::new(vec![
                CatalogEntry::new(1, [(Locale::French, "Bulbizarre")]),
                CatalogEntry::new(2, [(Locale::English, "Ivysaur")]),
            ])
            .unwrap(),
        );
        let generator = RecordGenerator::new(catalog, config(1, Locale::French));
        let err = generator.generate(1).await.unwrap_err();
        assert!(matches!(err, Error::MissingName { id: 2, locale: "french" }));
        assert!(err.is_generation_failure());
    }

    #[tokio::test(start_paused = true)]
    async fn latency_suspends_on_the_timer() {
        let generator = RecordGenerator::new(
            catalog(),
            GeneratorConfig {
                latency: Duration::from_millis(5),
                jitter: Duration::from_millis(5),
                locale: Locale::English,
                seed: Some(3),
            },
        );
        let start = tokio::time::Instant::now();
        generator.generate(1).await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(5));
        assert!(elapsed <= Duration::from_millis(11));
    }
}
