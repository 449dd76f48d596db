//! The single insurer table shared by the collection store and the resolver.
//!
//! Each insurer maps to exactly one collection directory and a list of alias
//! keywords (official name, short name, romanized name, common variants).

/// One insurer and the collection holding its policy documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insurer {
    pub canonical: &'static str,
    pub collection: &'static str,
    pub aliases: &'static [&'static str],
}

impl Insurer {
    fn matches_name(&self, normalized: &str) -> bool {
        normalize(self.collection) == normalized
            || normalize(self.canonical) == normalized
            || self.aliases.iter().any(|a| normalize(a) == normalized)
    }

    fn mentioned_in(&self, normalized_question: &str) -> bool {
        self.aliases.iter().any(|a| normalized_question.contains(&normalize(a)))
    }
}

const BUILTIN: &[Insurer] = &[
    Insurer {
        canonical: "DB손해보험",
        collection: "DBSonBo_YakMu20250123",
        aliases: &["db손해보험", "db손해", "db손보", "db보험", "db", "디비손해보험", "디비손보", "디비"],
    },
    Insurer {
        canonical: "삼성화재",
        collection: "Samsung_YakMu2404103NapHae20250113",
        aliases: &["삼성화재", "삼성", "samsung"],
    },
    Insurer {
        canonical: "하나손해보험",
        collection: "HaNa_YakMuHaGaengPyo20250101",
        aliases: &["하나손해보험", "하나손보", "hana"],
    },
    Insurer {
        canonical: "한화손해보험",
        collection: "HanWha_YakHan20250201",
        aliases: &["한화손해보험", "한화손보", "한화", "hanwha"],
    },
    Insurer {
        canonical: "흥국화재",
        collection: "Heung_YakMu250220250205",
        aliases: &["흥국화재", "흥국", "heung", "흥국생명"],
    },
    Insurer {
        canonical: "현대해상",
        collection: "HyunDai_YakMuSeH1Il2Nap20250213",
        aliases: &["현대해상", "현대", "hyundai"],
    },
    Insurer {
        canonical: "KB손해보험",
        collection: "KB_YakKSeHaeMu250120250214",
        aliases: &["kb손해보험", "kb손보", "kb", "케이비"],
    },
    Insurer {
        canonical: "롯데손해보험",
        collection: "LotteSonBo_YakMuLDeo25011220250101",
        aliases: &["롯데손해보험", "롯데손보", "롯데", "lotte"],
    },
    Insurer {
        canonical: "MG손해보험",
        collection: "MGSonBo_YakMuWon2404Se20250101",
        aliases: &["mg손해보험", "mg손보", "mg", "엠지"],
    },
    Insurer {
        canonical: "메리츠화재",
        collection: "Meritz_YakMu220250113",
        aliases: &["메리츠화재", "메리츠", "meritz"],
    },
    Insurer {
        canonical: "NH농협손해보험",
        collection: "NH_YakMuN5250120250101",
        aliases: &["nh농협손해보험", "nh손해보험", "농협손해보험", "nh손보", "농협손보", "nh", "농협"],
    },
];

#[derive(Debug, Clone)]
pub struct InsurerRegistry {
    insurers: Vec<Insurer>,
}

impl Default for InsurerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl InsurerRegistry {
    pub fn builtin() -> Self {
        Self { insurers: BUILTIN.to_vec() }
    }

    pub fn new(insurers: Vec<Insurer>) -> Self {
        Self { insurers }
    }

    pub fn insurers(&self) -> &[Insurer] {
        &self.insurers
    }

    /// Resolve a collection id, canonical name or alias to its insurer.
    pub fn lookup(&self, name: &str) -> Option<&Insurer> {
        let wanted = normalize(name);
        if wanted.is_empty() {
            return None;
        }
        self.insurers.iter().find(|i| i.matches_name(&wanted))
    }

    /// Insurers with at least one alias occurring in the question.
    pub fn mentioned_in(&self, question: &str) -> Vec<&Insurer> {
        let q = normalize(question);
        self.insurers.iter().filter(|i| i.mentioned_in(&q)).collect()
    }

    pub fn collections(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.insurers.iter().map(|i| i.collection)
    }

    pub fn canonical_for(&self, collection: &str) -> Option<&'static str> {
        self.insurers.iter().find(|i| i.collection == collection).map(|i| i.canonical)
    }
}

/// Lowercase and drop all whitespace.
pub fn normalize(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).flat_map(char::to_lowercase).collect()
}
