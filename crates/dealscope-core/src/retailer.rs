//! Retailer identities and their extraction profiles.
//!
//! The set of retailers is closed: adding one means adding a [`Retailer`]
//! variant and a profile in [`RetailerRegistry::builtin`]. Anything else
//! parses to [`Retailer::Unregistered`].

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Retailer {
    Nike,
    Rei,
    Patagonia,
    /// A retailer id with no registered profile. Holds the trimmed,
    /// lowercased id as given.
    Unregistered(String),
}

impl Retailer {
    /// Parses a retailer id case-insensitively. Never fails; unknown ids map
    /// to [`Retailer::Unregistered`].
    #[must_use]
    pub fn parse(id: &str) -> Self {
        let id = id.trim().to_lowercase();
        match id.as_str() {
            "nike" => Retailer::Nike,
            "rei" => Retailer::Rei,
            "patagonia" => Retailer::Patagonia,
            _ => Retailer::Unregistered(id),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Retailer::Nike => "nike",
            Retailer::Rei => "rei",
            Retailer::Patagonia => "patagonia",
            Retailer::Unregistered(id) => id,
        }
    }
}

impl fmt::Display for Retailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One of the alternative procedures that can produce canonical products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// schema.org JSON-LD blocks in the page HTML.
    StructuredData,
    /// A framework server-state blob (`__NEXT_DATA__`) in the page HTML.
    EmbeddedState,
    /// A retailer JSON feed fetched directly, bypassing HTML.
    DirectApi,
}

impl Strategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::StructuredData => "structured_data",
            Strategy::EmbeddedState => "embedded_state",
            Strategy::DirectApi => "direct_api",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalizers for embedded server-state roots. The normalizer for a page
/// is picked by which marker key its state root carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateNormalizer {
    /// Nike product wall: `Wall.productGroupings[].products[]`.
    NikeWall,
}

impl StateNormalizer {
    pub const ALL: [StateNormalizer; 1] = [StateNormalizer::NikeWall];

    /// Top-level key of the state root that identifies this shape.
    #[must_use]
    pub fn marker_key(self) -> &'static str {
        match self {
            StateNormalizer::NikeWall => "Wall",
        }
    }
}

/// Normalizers for direct retailer feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiNormalizer {
    /// Nike product feed: `data.products.products[]`.
    NikeProductFeed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiProfile {
    pub normalizer: ApiNormalizer,
    /// Scheme + host prepended to relative product URLs returned by the feed.
    pub site_origin: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetailerProfile {
    pub retailer: Retailer,
    /// Strategies in the order the dispatcher tries them.
    pub strategies: Vec<Strategy>,
    pub api: Option<ApiProfile>,
}

impl RetailerProfile {
    #[must_use]
    pub fn supports(&self, strategy: Strategy) -> bool {
        self.strategies.contains(&strategy)
    }
}

/// Immutable retailer → profile mapping, built once at startup and passed
/// explicitly to whatever needs it.
#[derive(Debug, Clone)]
pub struct RetailerRegistry {
    profiles: Vec<RetailerProfile>,
}

impl RetailerRegistry {
    /// The registry of retailers this build knows how to extract.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            profiles: vec![
                RetailerProfile {
                    retailer: Retailer::Nike,
                    strategies: vec![
                        Strategy::StructuredData,
                        Strategy::EmbeddedState,
                        Strategy::DirectApi,
                    ],
                    api: Some(ApiProfile {
                        normalizer: ApiNormalizer::NikeProductFeed,
                        site_origin: "https://www.nike.com".to_string(),
                    }),
                },
                RetailerProfile {
                    retailer: Retailer::Rei,
                    strategies: vec![Strategy::StructuredData],
                    api: None,
                },
                RetailerProfile {
                    retailer: Retailer::Patagonia,
                    strategies: vec![Strategy::StructuredData],
                    api: None,
                },
            ],
        }
    }

    #[must_use]
    pub fn profile(&self, retailer: &Retailer) -> Option<&RetailerProfile> {
        self.profiles.iter().find(|p| &p.retailer == retailer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(Retailer::parse("Nike"), Retailer::Nike);
        assert_eq!(Retailer::parse("  NIKE "), Retailer::Nike);
        assert_eq!(Retailer::parse("rei"), Retailer::Rei);
    }

    #[test]
    fn unknown_id_is_unregistered_and_lowercased() {
        let r = Retailer::parse("Acme Outlet");
        assert_eq!(r, Retailer::Unregistered("acme outlet".to_string()));
        assert_eq!(r.to_string(), "acme outlet");
    }

    #[test]
    fn builtin_nike_profile_orders_strategies() {
        let registry = RetailerRegistry::builtin();
        let nike = registry.profile(&Retailer::Nike).expect("nike registered");
        assert_eq!(
            nike.strategies,
            vec![
                Strategy::StructuredData,
                Strategy::EmbeddedState,
                Strategy::DirectApi
            ]
        );
        assert_eq!(
            nike.api.as_ref().map(|a| a.site_origin.as_str()),
            Some("https://www.nike.com")
        );
    }

    #[test]
    fn builtin_has_no_profile_for_unregistered() {
        let registry = RetailerRegistry::builtin();
        assert!(registry
            .profile(&Retailer::Unregistered("acme".to_string()))
            .is_none());
    }

    #[test]
    fn structured_only_retailers_have_no_feed() {
        let registry = RetailerRegistry::builtin();
        for retailer in [Retailer::Rei, Retailer::Patagonia] {
            let profile = registry.profile(&retailer).unwrap();
            assert_eq!(profile.strategies, vec![Strategy::StructuredData]);
            assert!(!profile.supports(Strategy::EmbeddedState));
            assert!(profile.api.is_none());
        }
    }

    #[test]
    fn strategy_serializes_snake_case() {
        let json = serde_json::to_string(&Strategy::EmbeddedState).unwrap();
        assert_eq!(json, "\"embedded_state\"");
        assert_eq!(Strategy::DirectApi.to_string(), "direct_api");
    }
}
