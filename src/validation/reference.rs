use std::collections::BTreeSet;

use super::codes::{
    COUNTRY_CODES, CURRENCY_CODES, DOCUMENT_TYPES, FISCAL_REGIMES, TRANSMISSION_FORMATS,
};

/// Accepted code values, injected into [`FatturaValidator`](super::FatturaValidator).
///
/// [`ReferenceData::standard`] loads the built-in tables; tests and callers
/// with stricter rules can build their own sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceData {
    pub countries: BTreeSet<String>,
    pub currencies: BTreeSet<String>,
    pub fiscal_regimes: BTreeSet<String>,
    pub document_types: BTreeSet<String>,
    pub transmission_formats: BTreeSet<String>,
}

fn set(codes: &[&str]) -> BTreeSet<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

impl ReferenceData {
    /// Built-in ISO and Fattura Elettronica code tables.
    pub fn standard() -> Self {
        Self {
            countries: set(COUNTRY_CODES),
            currencies: set(CURRENCY_CODES),
            fiscal_regimes: set(FISCAL_REGIMES),
            document_types: set(DOCUMENT_TYPES),
            transmission_formats: set(TRANSMISSION_FORMATS),
        }
    }

    pub fn with_countries<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.countries = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_currencies<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.currencies = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fiscal_regimes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fiscal_regimes = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_document_types<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.document_types = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_transmission_formats<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transmission_formats = codes.into_iter().map(Into::into).collect();
        self
    }
}
