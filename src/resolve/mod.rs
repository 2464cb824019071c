//! Entity resolution: canonicalize free-text names into a stable vocabulary.
//!
//! Resolution walks a fixed hierarchy, first match wins:
//!
//! 1. **Exact**: the name is already a known canonical entity
//! 2. **Known variation**: case-insensitive hit in the curated synonym table
//! 3. **Abbreviation**: upper-cased hit in the abbreviation table
//! 4. **Plural/singular**: morphological variants of a known canonical name
//! 5. **Fuzzy**: best edit-distance ratio at or above the threshold
//! 6. **None**: the name becomes a new canonical entity
//!
//! Every result is memoized by original string. The cache and the growing
//! canonical set live in an explicit [`ResolverState`] value, so outcomes are
//! order-dependent but fully reproducible from a given state.

pub mod similarity;
pub mod vocabulary;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::durable::DurableStore;
use crate::store::StoreResult;

/// Durable key holding the bincode-encoded [`ResolverState`].
pub const RESOLVER_STATE_KEY: &[u8] = b"resolver:state";

/// Default minimum fuzzy score (0–100) for a fuzzy match to be accepted.
pub const DEFAULT_FUZZY_THRESHOLD: u8 = 80;

const VARIATION_CONFIDENCE: f32 = 0.98;
const ABBREVIATION_CONFIDENCE: f32 = 0.95;
const PLURAL_CONFIDENCE: f32 = 0.95;

/// How a name was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Fuzzy,
    Plural,
    Abbreviation,
    None,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Fuzzy => write!(f, "fuzzy"),
            Self::Plural => write!(f, "plural"),
            Self::Abbreviation => write!(f, "abbreviation"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Resolution result for one input string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMatch {
    pub original: String,
    pub canonical: String,
    pub confidence: f32,
    pub match_type: MatchType,
}

impl EntityMatch {
    fn new(original: &str, canonical: impl Into<String>, confidence: f32, match_type: MatchType) -> Self {
        Self {
            original: original.to_string(),
            canonical: canonical.into(),
            confidence,
            match_type,
        }
    }
}

/// Everything resolution outcomes depend on, besides the static tables.
///
/// This is also the persisted resolver snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolverState {
    /// Known canonical entity names.
    pub canonical: BTreeSet<String>,
    /// Memoized results keyed by original string.
    pub cache: HashMap<String, EntityMatch>,
    /// Abbreviation overrides layered over the built-in table.
    pub abbreviation_overrides: BTreeMap<String, String>,
}

/// An evaluated resolution plus the canonical name it admits, if any.
struct Evaluation {
    matched: EntityMatch,
    admit: Option<String>,
}

/// Stateful, memoizing entity resolver.
pub struct EntityResolver {
    state: ResolverState,
    /// Built-in abbreviations merged with overrides, keyed upper-case.
    abbreviations: HashMap<String, String>,
    fuzzy_threshold: u8,
    durable: Option<Arc<DurableStore>>,
}

impl EntityResolver {
    /// Create an empty resolver.
    pub fn new(fuzzy_threshold: u8) -> Self {
        Self::from_state(ResolverState::default(), fuzzy_threshold)
    }

    /// Create a resolver that continues from an existing state.
    pub fn from_state(state: ResolverState, fuzzy_threshold: u8) -> Self {
        let abbreviations = merged_abbreviations(&state.abbreviation_overrides);
        Self {
            state,
            abbreviations,
            fuzzy_threshold: fuzzy_threshold.min(100),
            durable: None,
        }
    }

    /// Load persisted state from the durable store.
    ///
    /// The resolver state is a pure optimization: a missing, unreadable, or
    /// malformed snapshot yields an empty resolver instead of an error.
    pub fn load(durable: Arc<DurableStore>, fuzzy_threshold: u8) -> Self {
        let state = match durable.get(RESOLVER_STATE_KEY) {
            Ok(Some(bytes)) => match bincode::deserialize::<ResolverState>(&bytes) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(error = %e, "discarding malformed resolver state");
                    ResolverState::default()
                }
            },
            Ok(None) => ResolverState::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read resolver state, starting empty");
                ResolverState::default()
            }
        };
        tracing::debug!(
            canonical = state.canonical.len(),
            cached = state.cache.len(),
            "loaded resolver state"
        );
        let mut resolver = Self::from_state(state, fuzzy_threshold);
        resolver.durable = Some(durable);
        resolver
    }

    /// Encode the current state for persistence.
    pub fn encode_state(&self) -> StoreResult<Vec<u8>> {
        bincode::serialize(&self.state).map_err(|e| StoreError::Serialization {
            message: format!("failed to serialize resolver state: {e}"),
        })
    }

    /// Persist the current state, if the resolver has a durable backend.
    pub fn persist(&self) -> StoreResult<()> {
        match &self.durable {
            Some(durable) => durable.put(RESOLVER_STATE_KEY, &self.encode_state()?),
            None => Ok(()),
        }
    }

    /// The current resolver state.
    pub fn state(&self) -> &ResolverState {
        &self.state
    }

    /// Consume the resolver, returning its state.
    pub fn into_state(self) -> ResolverState {
        self.state
    }

    pub fn fuzzy_threshold(&self) -> u8 {
        self.fuzzy_threshold
    }

    /// Whether `name` is a known canonical entity.
    pub fn is_canonical(&self, name: &str) -> bool {
        self.state.canonical.contains(name)
    }

    /// Add a canonical name without resolving anything.
    pub fn register_canonical(&mut self, name: impl Into<String>) {
        self.state.canonical.insert(name.into());
    }

    /// Record an abbreviation override. The key is stored upper-case.
    pub fn add_abbreviation(&mut self, abbreviation: &str, expansion: impl Into<String>) {
        let key = abbreviation.trim().to_uppercase();
        let expansion = expansion.into();
        self.state
            .abbreviation_overrides
            .insert(key.clone(), expansion.clone());
        self.abbreviations.insert(key, expansion);
    }

    /// The expansion for an abbreviation, overrides first.
    pub fn expand_abbreviation(&self, abbreviation: &str) -> Option<&str> {
        self.abbreviations
            .get(&abbreviation.to_uppercase())
            .map(String::as_str)
    }

    /// Drop all memoized results. The canonical set is kept.
    pub fn clear_cache(&mut self) {
        self.state.cache.clear();
    }

    /// Resolve a name, memoizing the result and growing the canonical set.
    pub fn resolve(&mut self, name: &str) -> EntityMatch {
        if let Some(cached) = self.state.cache.get(name) {
            return cached.clone();
        }
        let Evaluation { matched, admit } = self.evaluate(name);
        if let Some(canonical) = admit {
            self.state.canonical.insert(canonical);
        }
        self.state.cache.insert(name.to_string(), matched.clone());
        matched
    }

    /// Resolve a name against the current state without changing it.
    pub fn peek(&self, name: &str) -> EntityMatch {
        match self.state.cache.get(name) {
            Some(cached) => cached.clone(),
            None => self.evaluate(name).matched,
        }
    }

    /// Resolve a list of names in order, then persist the resolver state.
    pub fn batch_resolve<S: AsRef<str>>(&mut self, names: &[S]) -> StoreResult<Vec<EntityMatch>> {
        let matches: Vec<EntityMatch> = names.iter().map(|n| self.resolve(n.as_ref())).collect();
        self.persist()?;
        Ok(matches)
    }

    // -----------------------------------------------------------------------
    // Hierarchy
    // -----------------------------------------------------------------------

    fn evaluate(&self, name: &str) -> Evaluation {
        // Tier 1: exact canonical
        if self.state.canonical.contains(name) {
            return Evaluation {
                matched: EntityMatch::new(name, name, 1.0, MatchType::Exact),
                admit: None,
            };
        }

        // Tier 2: known variation
        if let Some(canonical) = vocabulary::lookup_variation(name) {
            return Evaluation {
                matched: EntityMatch::new(name, canonical, VARIATION_CONFIDENCE, MatchType::Exact),
                admit: Some(canonical.to_string()),
            };
        }

        // Tier 3: abbreviation
        if let Some(expansion) = self.expand_abbreviation(name) {
            return Evaluation {
                matched: EntityMatch::new(
                    name,
                    expansion,
                    ABBREVIATION_CONFIDENCE,
                    MatchType::Abbreviation,
                ),
                admit: None,
            };
        }

        // Tier 4: plural/singular
        if let Some(canonical) = self.plural_match(name) {
            return Evaluation {
                matched: EntityMatch::new(name, canonical, PLURAL_CONFIDENCE, MatchType::Plural),
                admit: None,
            };
        }

        // Tier 5: fuzzy
        if let Some((canonical, score)) = self.fuzzy_match(name) {
            return Evaluation {
                matched: EntityMatch::new(
                    name,
                    canonical.clone(),
                    f32::from(score) / 100.0,
                    MatchType::Fuzzy,
                ),
                admit: Some(canonical),
            };
        }

        // Tier 6: new canonical entity
        Evaluation {
            matched: EntityMatch::new(name, name, 1.0, MatchType::None),
            admit: Some(name.to_string()),
        }
    }

    /// Morphological variants, tried in a fixed order.
    fn plural_match(&self, name: &str) -> Option<String> {
        let mut candidates: Vec<String> = Vec::with_capacity(4);
        if let Some(stem) = name.strip_suffix('s') {
            candidates.push(stem.to_string());
        }
        candidates.push(format!("{name}s"));
        if let Some(stem) = name.strip_suffix('y') {
            candidates.push(format!("{stem}ies"));
        }
        if let Some(stem) = name.strip_suffix("ies") {
            candidates.push(format!("{stem}y"));
        }
        candidates
            .into_iter()
            .find(|c| !c.is_empty() && self.state.canonical.contains(c))
    }

    /// Best-scoring candidate from the canonical set and the variation table.
    fn fuzzy_match(&self, name: &str) -> Option<(String, u8)> {
        if similarity::normalize(name).is_empty() {
            return None;
        }
        let candidates: BTreeSet<&str> = self
            .state
            .canonical
            .iter()
            .map(String::as_str)
            .chain(vocabulary::KNOWN_VARIATIONS.iter().map(|v| v.canonical))
            .collect();

        let mut best: Option<(&str, u8)> = None;
        for candidate in candidates {
            let score = similarity::ratio(name, candidate);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((candidate, score));
            }
        }
        best.filter(|(_, score)| *score >= self.fuzzy_threshold)
            .map(|(c, score)| (c.to_string(), score))
    }
}

impl Default for EntityResolver {
    fn default() -> Self {
        Self::new(DEFAULT_FUZZY_THRESHOLD)
    }
}

impl std::fmt::Debug for EntityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityResolver")
            .field("canonical", &self.state.canonical.len())
            .field("cached", &self.state.cache.len())
            .field("fuzzy_threshold", &self.fuzzy_threshold)
            .finish()
    }
}

fn merged_abbreviations(overrides: &BTreeMap<String, String>) -> HashMap<String, String> {
    let mut table: HashMap<String, String> = vocabulary::DEFAULT_ABBREVIATIONS
        .iter()
        .map(|(abbr, expansion)| (abbr.to_string(), expansion.to_string()))
        .collect();
    for (abbr, expansion) in overrides {
        table.insert(abbr.to_uppercase(), expansion.clone());
    }
    table
}
