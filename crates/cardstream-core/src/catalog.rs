//! Read-only reference catalog of card names.
//!
//! The catalog is loaded once at process start from a JSON array of entries
//! shaped like a Pokédex dump:
//!
//! ```json
//! [
//!   { "id": 1, "name": { "english": "Bulbasaur", "french": "Bulbizarre" } },
//!   { "id": 2, "name": { "english": "Ivysaur", "french": "Herbizarre" } }
//! ]
//! ```
//!
//! Fields other than `id` and `name` are ignored. Once built, a [`Catalog`] is
//! never mutated; sessions share it through an `Arc` and read it without any
//! locking.
//!
//! Generation draws positions from [`Catalog::drawable`], which is
//! `1..size`. Position `0` is part of the table but is never drawn, so a
//! usable catalog holds at least two entries.

use crate::common::error::{Error, Result};
use core::{fmt, ops::Range, str::FromStr};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs::File, io::BufReader, io::Read, path::Path};

/// Languages a catalog entry may carry a name in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    English,
    Japanese,
    Chinese,
    #[default]
    French,
}

impl Locale {
    /// Key of this locale in a catalog entry's `name` object.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Japanese => "japanese",
            Self::Chinese => "chinese",
            Self::French => "french",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "english" | "en" => Ok(Self::English),
            "japanese" | "ja" => Ok(Self::Japanese),
            "chinese" | "zh" => Ok(Self::Chinese),
            "french" | "fr" => Ok(Self::French),
            other => Err(Error::InvalidConfig {
                reason: format!("unknown locale '{other}'"),
            }),
        }
    }
}

/// One catalog row: an id and its localized display names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    pub id: u32,
    #[serde(rename = "name")]
    names: HashMap<String, String>,
}

impl CatalogEntry {
    pub fn new<I, S>(id: u32, names: I) -> Self
    where
        I: IntoIterator<Item = (Locale, S)>,
        S: Into<String>,
    {
        Self {
            id,
            names: names
                .into_iter()
                .map(|(locale, name)| (locale.as_str().to_string(), name.into()))
                .collect(),
        }
    }

    /// Display name in `locale`, if the entry carries one.
    pub fn name(&self, locale: Locale) -> Option<&str> {
        self.names.get(locale.as_str()).map(String::as_str)
    }
}

/// Immutable lookup of catalog entries by position.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Builds a catalog from already parsed entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCatalog`] when fewer than two entries are given,
    /// since position `0` is never drawn.
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self> {
        if entries.len() < 2 {
            return Err(Error::InvalidCatalog {
                reason: format!("need at least 2 entries, found {}", entries.len()),
            });
        }
        Ok(Self { entries })
    }

    /// Parses a JSON catalog document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CatalogFormat`] for malformed JSON and
    /// [`Error::InvalidCatalog`] for a catalog too small to draw from.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let entries: Vec<CatalogEntry> =
            serde_json::from_reader(reader).map_err(Error::CatalogFormat)?;
        Self::new(entries)
    }

    /// Opens and parses the JSON catalog at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CatalogIo`] if the file cannot be opened, otherwise the
    /// same errors as [`Catalog::from_reader`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn get(&self, index: usize) -> Option<&CatalogEntry> {
        self.entries.get(index)
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Positions generation may draw from.
    pub fn drawable(&self) -> Range<usize> {
        1..self.entries.len()
    }
}
