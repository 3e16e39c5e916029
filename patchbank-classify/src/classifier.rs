//! Instrument classifier
//!
//! Presets are scored: every matching category keyword adds the keyword
//! weight, and amplitude-envelope and oscillator threshold rules add their
//! bonuses. The strictly highest score wins, earlier categories winning
//! ties; all-zero scores fall back. Wavetables take the first matching
//! keyword group instead.

use crate::ruleset::Ruleset;
use patchbank_common::models::{EnvelopeSpec, OscillatorSpec};

/// Category and subcategory chosen for a preset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetClass {
    pub category: String,
    pub subcategory: String,
    /// Score of the chosen category (0 when the fallback was used)
    pub score: u32,
}

/// Applies a [`Ruleset`] to assets
#[derive(Debug, Clone)]
pub struct Classifier {
    ruleset: Ruleset,
}

impl Classifier {
    pub fn new(ruleset: Ruleset) -> Self {
        Self { ruleset }
    }

    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    /// Per-category scores, in ruleset category order
    pub fn score_preset(
        &self,
        search_text: &str,
        oscillators: &[OscillatorSpec],
        envelopes: &[EnvelopeSpec],
    ) -> Vec<u32> {
        let rules = &self.ruleset;
        let mut scores: Vec<u32> = rules
            .categories
            .iter()
            .map(|cat| {
                let hits = cat.patterns.iter().filter(|p| p.is_match(search_text)).count();
                u32::try_from(hits)
                    .unwrap_or(u32::MAX)
                    .saturating_mul(rules.keyword_weight)
            })
            .collect();

        for env in envelopes.iter().filter(|e| rules.is_amp_envelope(e)) {
            for resolved in rules.envelope_rules.iter().filter(|r| r.rule.matches(env)) {
                for &(index, weight) in &resolved.bonuses {
                    scores[index] = scores[index].saturating_add(weight);
                }
            }
        }

        for osc in oscillators {
            for resolved in rules.oscillator_rules.iter().filter(|r| r.rule.matches(osc)) {
                for &(index, weight) in &resolved.bonuses {
                    scores[index] = scores[index].saturating_add(weight);
                }
            }
        }

        scores
    }

    pub fn classify_preset(
        &self,
        name: &str,
        original_category: &str,
        oscillators: &[OscillatorSpec],
        envelopes: &[EnvelopeSpec],
    ) -> PresetClass {
        let text = search_text(name, original_category);
        let scores = self.score_preset(&text, oscillators, envelopes);

        // Strictly greater: the first category to reach the top score keeps it
        let mut best = self.ruleset.fallback;
        let mut best_score = 0;
        for (index, &score) in scores.iter().enumerate() {
            if score > best_score {
                best = index;
                best_score = score;
            }
        }

        let category = &self.ruleset.categories[best];
        let mut subcategory = category.default_subcategory.as_str();
        for group in &self.ruleset.subcategory_groups {
            if category.has_subcategory(&group.name) && group.matches(&text) {
                subcategory = group.name.as_str();
            }
        }

        PresetClass {
            category: category.id.clone(),
            subcategory: subcategory.to_string(),
            score: best_score,
        }
    }

    /// Sound category of a wavetable
    pub fn classify_wavetable(&self, name: &str, original_category: &str) -> String {
        let text = search_text(name, original_category);
        self.ruleset
            .wavetable_groups
            .iter()
            .find(|group| group.matches(&text))
            .map(|group| group.name.clone())
            .unwrap_or_else(|| self.ruleset.wavetable_fallback.clone())
    }
}

/// Lower-cased "name category" text the keyword patterns run against
pub fn search_text(name: &str, original_category: &str) -> String {
    format!("{} {}", name, original_category).to_lowercase()
}
