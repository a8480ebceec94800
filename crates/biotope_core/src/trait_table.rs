//! Named trait lookup, the configuration collaborator of the core.
//!
//! Every tunable is a named trait with an optional global value, an optional list of
//! eight per-species values and an optional `[min, max]` range. A per-species lookup
//! falls back to the global value when the trait has no entry for that species.
//!
//! ## Example `traits.toml`
//!
//! ```toml
//! [traits.MAX_FORCE]
//! global = 200
//! min = 0
//! max = 1000
//!
//! [traits.PREDATOR_SPECIES]
//! species = [2, 3, 4, 5, 6, 7, 8, 1]
//!
//! [traits.MASS]
//! global = 1.0
//! species = [1.0, 1.2, 1.4, 1.6, 1.8, 2.0, 2.2, 2.4]
//! ```

use crate::error::{CoreError, Result};
use biotope_data::{Species, SPECIES_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One named trait.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TraitEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl TraitEntry {
    #[must_use]
    pub fn global(value: f64) -> Self {
        Self {
            global: Some(value),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn ranged(value: f64, min: f64, max: f64) -> Self {
        Self {
            global: Some(value),
            species: None,
            min: Some(min),
            max: Some(max),
        }
    }

    #[must_use]
    pub fn per_species(values: [f64; SPECIES_COUNT]) -> Self {
        Self {
            species: Some(values.to_vec()),
            ..Default::default()
        }
    }

    fn range(&self) -> (f64, f64) {
        (
            self.min.unwrap_or(f64::NEG_INFINITY),
            self.max.unwrap_or(f64::INFINITY),
        )
    }
}

/// Read-only (from the core's point of view) table of named traits.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TraitTable {
    #[serde(default)]
    pub traits: BTreeMap<String, TraitEntry>,
}

impl TraitTable {
    /// The stock parameter set the simulation ships with.
    #[must_use]
    pub fn builtin() -> Self {
        let mut t = BTreeMap::new();
        let mut put = |name: &str, entry: TraitEntry| {
            t.insert(name.to_string(), entry);
        };

        // World
        put("WORLD_WIDTH", TraitEntry::ranged(2000.0, 1.0, 100_000.0));
        put("WORLD_HEIGHT", TraitEntry::ranged(2000.0, 1.0, 100_000.0));
        put("WORLD_RADIUS_MARGIN", TraitEntry::global(50.0));
        put("MAX_AGENTS_NUM", TraitEntry::ranged(3000.0, 0.0, 100_000.0));
        put("INITIAL_AGENTS_NUM", TraitEntry::ranged(1000.0, 0.0, 100_000.0));
        put("INITIAL_VELOCITY_MIN", TraitEntry::global(-200.0));
        put("INITIAL_VELOCITY_MAX", TraitEntry::global(200.0));

        // Flocking
        put("SEPARATION_DISTANCE", TraitEntry::ranged(20.0, 0.0, 1000.0));
        put("SEPARATION_WEIGHT", TraitEntry::ranged(50.0, 0.0, 1000.0));
        put("COHESION_DISTANCE", TraitEntry::ranged(300.0, 0.0, 1000.0));
        put("COHESION_WEIGHT", TraitEntry::ranged(400.0, 0.0, 1000.0));
        put("MAX_FORCE", TraitEntry::ranged(200.0, 0.0, 1000.0));
        put("MAX_ENVIRONMENT_FORCE", TraitEntry::ranged(200.0, 0.0, 1000.0));

        // Predation
        put("ESCAPE_DISTANCE", TraitEntry::ranged(100.0, 0.0, 1000.0));
        put("ESCAPE_WEIGHT", TraitEntry::ranged(150.0, 0.0, 1000.0));
        put("CHASE_DISTANCE", TraitEntry::ranged(150.0, 0.0, 1000.0));
        put("CHASE_WEIGHT", TraitEntry::ranged(100.0, 0.0, 1000.0));

        // Environment
        put("CENTER_ATTRACTION_WEIGHT", TraitEntry::ranged(0.0, 0.0, 1000.0));
        put("CONFINEMENT_WEIGHT", TraitEntry::ranged(80.0, 0.0, 1000.0));
        put("ROTATION_STRENGTH", TraitEntry::ranged(300.0, 0.0, 1000.0));

        // Pipeline cadence
        put("DT", TraitEntry::ranged(1.0 / 30.0, 1e-4, 1.0));
        put("ECOSYSTEM_HZ", TraitEntry::ranged(10.0, 0.1, 1000.0));
        put("RENDER_FPS", TraitEntry::ranged(60.0, 1.0, 1000.0));
        put("POLL_TIMEOUT_MS", TraitEntry::ranged(100.0, 1.0, 10_000.0));
        put("METRICS_LOG_INTERVAL", TraitEntry::ranged(1000.0, 1.0, 1e9));

        // Ecosystem churn
        put("BIRTH_RATE", TraitEntry::ranged(0.05, 0.0, 1.0));
        put("DEATH_RATE", TraitEntry::ranged(0.05, 0.0, 1.0));

        // Species relations: a cycle where each species hunts the one below it.
        put(
            "PREDATOR_SPECIES",
            TraitEntry::per_species([2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 1.0]),
        );
        put(
            "PREY_SPECIES",
            TraitEntry::per_species([8.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]),
        );

        // Physical traits, consumed by physics only
        put(
            "MASS",
            TraitEntry {
                global: Some(1.0),
                species: Some(vec![1.0, 1.2, 1.4, 1.6, 1.8, 2.0, 2.2, 2.4]),
                min: Some(0.01),
                max: Some(1000.0),
            },
        );
        put("RADIUS", TraitEntry::ranged(4.0, 0.1, 100.0));
        put("LINEAR_DAMPING", TraitEntry::ranged(0.5, 0.0, 100.0));

        Self { traits: t }
    }

    /// Parses and validates a trait table from TOML.
    pub fn from_toml(content: &str) -> Result<Self> {
        let table = toml::from_str::<Self>(content)?;
        table.validate()?;
        Ok(table)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::validation(e.to_string()))
    }

    /// Checks list lengths and ranges of every entry.
    pub fn validate(&self) -> Result<()> {
        for (name, entry) in &self.traits {
            let (min, max) = entry.range();
            if min > max {
                return Err(CoreError::validation(format!(
                    "Trait {name} has min {min} greater than max {max}"
                )));
            }
            if let Some(values) = &entry.species {
                if values.len() != SPECIES_COUNT {
                    return Err(CoreError::SpeciesTableLength {
                        name: name.clone(),
                        len: values.len(),
                        expected: SPECIES_COUNT,
                    });
                }
            }
            let all = entry.global.iter().chain(entry.species.iter().flatten());
            for &value in all {
                check_range(name, value, min, max)?;
            }
        }
        Ok(())
    }

    fn entry(&self, name: &str) -> Result<&TraitEntry> {
        self.traits
            .get(name)
            .ok_or_else(|| CoreError::unknown_trait(name))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.traits.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.traits.keys().map(String::as_str)
    }

    /// Global scalar value of a trait.
    pub fn get_trait_value(&self, name: &str) -> Result<f64> {
        self.entry(name)?
            .global
            .ok_or_else(|| CoreError::MissingGlobal(name.to_string()))
    }

    /// Like [`get_trait_value`](Self::get_trait_value) but an absent trait yields `None`.
    pub fn get_optional_trait_value(&self, name: &str) -> Result<Option<f64>> {
        match self.traits.get(name) {
            None => Ok(None),
            Some(_) => self.get_trait_value(name).map(Some),
        }
    }

    /// Per-species value, falling back to the global value.
    pub fn get_species_trait_value(&self, name: &str, species: Species) -> Result<f64> {
        let entry = self.entry(name)?;
        entry
            .species
            .as_ref()
            .and_then(|values| values.get(species.table_index()).copied())
            .or(entry.global)
            .ok_or_else(|| CoreError::MissingValue {
                name: name.to_string(),
                species: species.get(),
            })
    }

    /// Per-species value that names another species (e.g. `PREDATOR_SPECIES`).
    pub fn get_species_reference(&self, name: &str, species: Species) -> Result<Species> {
        let value = self.get_species_trait_value(name, species)?;
        if value.fract() != 0.0 || !value.is_finite() {
            return Err(CoreError::invalid_value(
                name,
                value,
                "species reference must be an integer",
            ));
        }
        u8::try_from(value as i64)
            .ok()
            .and_then(Species::new)
            .ok_or(CoreError::UnknownSpecies(value as i64))
    }

    /// Declared `[min, max]`, unbounded sides reported as infinities.
    pub fn get_trait_range(&self, name: &str) -> Result<(f64, f64)> {
        Ok(self.entry(name)?.range())
    }

    /// Overwrites the global value of an existing trait, honouring its range.
    pub fn set_trait_value(&mut self, name: &str, value: f64) -> Result<()> {
        let entry = self
            .traits
            .get_mut(name)
            .ok_or_else(|| CoreError::unknown_trait(name))?;
        let (min, max) = entry.range();
        check_range(name, value, min, max)?;
        entry.global = Some(value);
        Ok(())
    }
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_nan() || value < min || value > max {
        return Err(CoreError::OutOfRange {
            name: name.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn species(raw: u8) -> Species {
        Species::new(raw).unwrap()
    }

    #[test]
    fn test_builtin_validates() {
        assert!(TraitTable::builtin().validate().is_ok());
    }

    #[test]
    fn test_unknown_trait_is_an_error() {
        let table = TraitTable::builtin();
        assert!(matches!(
            table.get_trait_value("NOT_A_TRAIT"),
            Err(CoreError::UnknownTrait(_))
        ));
    }

    #[test]
    fn test_species_lookup_falls_back_to_global() {
        let table = TraitTable::builtin();
        assert_eq!(table.get_species_trait_value("RADIUS", species(5)).unwrap(), 4.0);
        assert_eq!(table.get_species_trait_value("MASS", species(3)).unwrap(), 1.4);
    }

    #[test]
    fn test_species_reference() {
        let table = TraitTable::builtin();
        assert_eq!(
            table.get_species_reference("PREDATOR_SPECIES", species(8)).unwrap(),
            species(1)
        );
        assert_eq!(
            table.get_species_reference("PREY_SPECIES", species(1)).unwrap(),
            species(8)
        );
    }

    #[test]
    fn test_species_reference_rejects_out_of_range() {
        let mut table = TraitTable::builtin();
        table.traits.insert(
            "PREDATOR_SPECIES".into(),
            TraitEntry::per_species([9.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.5]),
        );
        assert!(matches!(
            table.get_species_reference("PREDATOR_SPECIES", species(1)),
            Err(CoreError::UnknownSpecies(9))
        ));
        assert!(matches!(
            table.get_species_reference("PREDATOR_SPECIES", species(8)),
            Err(CoreError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
            [traits.MAX_FORCE]
            global = 150
            min = 0
            max = 1000

            [traits.PREY_SPECIES]
            species = [2, 3, 4, 5, 6, 7, 8, 1]
        "#;
        let table = TraitTable::from_toml(toml).unwrap();
        assert_eq!(table.get_trait_value("MAX_FORCE").unwrap(), 150.0);
        assert_eq!(table.get_trait_range("MAX_FORCE").unwrap(), (0.0, 1000.0));
        assert!(matches!(
            table.get_trait_value("PREY_SPECIES"),
            Err(CoreError::MissingGlobal(_))
        ));
    }

    #[test]
    fn test_from_toml_rejects_short_species_list() {
        let toml = r#"
            [traits.PREY_SPECIES]
            species = [2, 3, 4]
        "#;
        assert!(matches!(
            TraitTable::from_toml(toml),
            Err(CoreError::SpeciesTableLength { len: 3, .. })
        ));
    }

    #[test]
    fn test_from_toml_rejects_out_of_range() {
        let toml = r#"
            [traits.MAX_FORCE]
            global = 5000
            min = 0
            max = 1000
        "#;
        assert!(matches!(
            TraitTable::from_toml(toml),
            Err(CoreError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_set_trait_value_honours_range() {
        let mut table = TraitTable::builtin();
        assert!(table.set_trait_value("MAX_FORCE", 300.0).is_ok());
        assert_eq!(table.get_trait_value("MAX_FORCE").unwrap(), 300.0);
        assert!(table.set_trait_value("MAX_FORCE", -1.0).is_err());
        assert!(table.set_trait_value("NOPE", 1.0).is_err());
    }

    #[test]
    fn test_toml_roundtrip_preserves_table() {
        let table = TraitTable::builtin();
        let text = table.to_toml().unwrap();
        assert_eq!(TraitTable::from_toml(&text).unwrap(), table);
    }
}
