//! The insured person a premium comparison is computed for.
//!
//! Starts from the configured defaults; each question may override fields
//! ("40세 여성 무해지 20년/100세 ...") on a fresh copy.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use insu_core::config::ProfileSettings;
use insu_core::types::{ProductType, Sex};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuredProfile {
    pub custom_name: String,
    pub insured_age: u32,
    pub sex: Sex,
    pub product_type: ProductType,
    pub expiry: u32,
    pub duration: u32,
    pub default_insurer: Option<String>,
}

impl Default for InsuredProfile {
    fn default() -> Self {
        Self::from(&ProfileSettings::default())
    }
}

impl From<&ProfileSettings> for InsuredProfile {
    fn from(p: &ProfileSettings) -> Self {
        Self {
            custom_name: p.custom_name.clone(),
            insured_age: p.insured_age,
            sex: p.sex,
            product_type: p.product_type,
            expiry: p.expiry,
            duration: p.duration,
            default_insurer: p.default_insurer.clone(),
        }
    }
}

const AGE_PATTERN: &str = r"(\d+)세";
const PERIOD_PATTERN: &str = r"(\d+)년[/\s](\d+)세";

fn age_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(AGE_PATTERN).expect("age regex"))
}

fn period_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PERIOD_PATTERN).expect("period regex"))
}

impl InsuredProfile {
    /// Copy of `self` with whatever the question states about the insured.
    pub fn apply_question(&self, question: &str) -> InsuredProfile {
        let mut next = self.clone();

        // The period's "100세" is a coverage age, not the insured's.
        let without_period = period_re().replace_all(question, " ");
        if let Some(age) = age_re()
            .captures(&without_period)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
        {
            next.insured_age = age;
        }

        if question.contains("남성") || question.contains("남자") {
            next.sex = Sex::Male;
        } else if question.contains("여성") || question.contains("여자") {
            next.sex = Sex::Female;
        }

        if question.contains("무해지") {
            next.product_type = ProductType::NonRefund;
        } else if question.contains("해지환급") {
            next.product_type = ProductType::Refund;
        }

        if let Some(c) = period_re().captures(question) {
            if let (Some(expiry), Some(duration)) =
                (c.get(1).and_then(|m| m.as_str().parse().ok()), c.get(2).and_then(|m| m.as_str().parse().ok()))
            {
                next.expiry = expiry;
                next.duration = duration;
            }
        }
        next
    }

    /// Coverage period key used by the premium tables, e.g. `20y_100`.
    pub fn expiry_year(&self) -> String {
        format!("{}y_{}", self.expiry, self.duration)
    }
}

impl fmt::Display for InsuredProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[설정값]")?;
        writeln!(f, "이름: {}", self.custom_name)?;
        writeln!(f, "나이: {}세", self.insured_age)?;
        writeln!(f, "성별: {}", self.sex.label())?;
        writeln!(f, "상품유형: {}", self.product_type.label())?;
        write!(f, "보험기간: {}", self.expiry_year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_compile() {
        assert!(Regex::new(AGE_PATTERN).is_ok());
        assert!(Regex::new(PERIOD_PATTERN).is_ok());
    }

    #[test]
    fn period_age_is_not_the_insured_age() {
        let p = InsuredProfile::default().apply_question("20년/100세 만기 보험료");
        assert_eq!(p.insured_age, InsuredProfile::default().insured_age);
        assert_eq!(p.expiry_year(), "20y_100");
    }
}
