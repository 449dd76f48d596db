//! Question to collection routing by keyword detection.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use tracing::{debug, info};

use insu_core::registry::{normalize, Insurer, InsurerRegistry};
use insu_core::{Error, Result};

/// Any of these in the normalized question asks for a cross-insurer comparison.
pub const COMPARISON_KEYWORDS: &[&str] = &["비교", "차이", "다른", "다른점", "비교해", "비교해줘", "차이점", "뭐가더나은가"];

pub const INSURANCE_TYPE_KEYWORDS: &[&str] = &["암", "상해", "질병", "재물", "화재", "운전자", "자동차", "실손"];

/// Insurance types whose questions are answered across every insurer.
const WIDENING_TYPES: &[&str] = &["암"];

/// What the resolver detected and the collections it chose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub mentioned: Vec<Insurer>,
    pub comparison: bool,
    pub insurance_types: Vec<&'static str>,
    pub collections: BTreeSet<String>,
}

impl Resolution {
    /// True when the choice covers every available collection.
    pub fn is_fan_out(&self, available: &BTreeSet<String>) -> bool {
        &self.collections == available
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollectionResolver {
    registry: InsurerRegistry,
}

impl CollectionResolver {
    pub fn new(registry: InsurerRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &InsurerRegistry {
        &self.registry
    }

    pub fn resolve(&self, question: &str, available: &BTreeSet<String>) -> Result<BTreeSet<String>> {
        self.analyze(question, available).map(|r| r.collections)
    }

    /// Detect mentioned insurers, comparison intent and insurance types, then
    /// pick the collections to search:
    ///
    /// 1. several insurers, a comparison keyword or a widening type: all available;
    /// 2. the single mentioned insurer, if its collection is available;
    /// 3. otherwise all available.
    pub fn analyze(&self, question: &str, available: &BTreeSet<String>) -> Result<Resolution> {
        let q = normalize(question);
        if q.is_empty() || available.is_empty() {
            return Err(Error::NoCollectionsAvailable);
        }

        let mentioned: Vec<Insurer> = self.registry.mentioned_in(question).into_iter().cloned().collect();
        let comparison = COMPARISON_KEYWORDS.iter().any(|k| q.contains(k));
        let without_names = strip_insurer_names(&q, &mentioned);
        let insurance_types: Vec<&'static str> =
            INSURANCE_TYPE_KEYWORDS.iter().copied().filter(|k| without_names.contains(k)).collect();
        if !insurance_types.is_empty() {
            debug!(?insurance_types, "insurance type keywords detected");
        }
        let widening = insurance_types.iter().any(|t| WIDENING_TYPES.contains(t));

        let collections = if mentioned.len() > 1 || comparison || widening {
            available.clone()
        } else {
            let own: BTreeSet<String> = mentioned
                .iter()
                .map(|i| i.collection.to_string())
                .filter(|c| available.contains(c))
                .collect();
            if own.is_empty() {
                available.clone()
            } else {
                own
            }
        };

        info!(
            mentioned = ?mentioned.iter().map(|i| i.canonical).collect::<Vec<_>>(),
            comparison,
            collections = collections.len(),
            "resolved collections"
        );
        Ok(Resolution { mentioned, comparison, insurance_types, collections })
    }
}

/// Blank out every name of the mentioned insurers, longest first, so that
/// type keywords inside a name ("삼성화재") are not counted.
fn strip_insurer_names(normalized_question: &str, mentioned: &[Insurer]) -> String {
    let mut names: Vec<String> = mentioned
        .iter()
        .flat_map(|i| i.aliases.iter().copied().chain([i.canonical]))
        .map(normalize)
        .collect();
    names.sort_by_key(|n| Reverse(n.chars().count()));
    names
        .iter()
        .fold(normalized_question.to_string(), |acc, name| acc.replace(name.as_str(), " "))
}
