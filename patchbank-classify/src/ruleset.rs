//! Classification ruleset
//!
//! Everything the classifier knows lives in one immutable [`Ruleset`] value:
//! the category list (whose order is also the tie-break order), keyword
//! patterns, envelope/oscillator threshold bonuses, subcategory keyword
//! groups and the wavetable keyword groups. The built-in ruleset reproduces
//! the stock keyword tables; a TOML file of the same shape replaces it.

use patchbank_common::models::{EnvelopeSpec, OscillatorSpec};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Ruleset validation and loading failures
#[derive(Error, Debug)]
pub enum RulesetError {
    #[error("Read {path} failed: {reason}")]
    Read { path: String, reason: String },

    #[error("Parse {path} failed: {reason}")]
    Parse { path: String, reason: String },

    #[error("Pattern {pattern:?} in {context} does not compile: {source}")]
    Pattern {
        context: String,
        pattern: String,
        source: regex::Error,
    },

    #[error("Ruleset defines no categories")]
    NoCategories,

    #[error("Category '{0}' is defined twice")]
    DuplicateCategory(String),

    #[error("Subcategory '{0}' is registered more than once")]
    DuplicateSubcategory(String),

    #[error("{context} names unknown category '{category}'")]
    UnknownCategory { context: String, category: String },

    #[error("{context} names unregistered subcategory '{subcategory}'")]
    UnknownSubcategory {
        context: String,
        subcategory: String,
    },

    #[error("{0} has no conditions")]
    EmptyRule(String),
}

impl From<RulesetError> for patchbank_common::Error {
    fn from(err: RulesetError) -> Self {
        patchbank_common::Error::Config(err.to_string())
    }
}

// ============================================================================
// Serializable shape
// ============================================================================

/// Ruleset as written in a TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesetSpec {
    /// Score added per matching category keyword
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: u32,

    /// Category assigned when every score is zero
    #[serde(default = "default_fallback_category")]
    pub fallback_category: String,

    /// Envelope names treated as the amplitude envelope
    #[serde(default = "default_amp_envelope_names")]
    pub amp_envelope_names: Vec<String>,

    /// Categories in tie-break order
    pub categories: Vec<CategorySpec>,

    /// Subcategory keyword groups; a later match overrides an earlier one
    #[serde(default)]
    pub subcategory_keywords: Vec<KeywordGroupSpec>,

    #[serde(default)]
    pub envelope_rules: Vec<EnvelopeRule>,

    #[serde(default)]
    pub oscillator_rules: Vec<OscillatorRule>,

    #[serde(default)]
    pub wavetables: WavetableRulesSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpec {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub patterns: Vec<String>,

    /// Registered subcategories in display order
    pub subcategories: Vec<String>,

    /// Subcategory used when no keyword group overrides it
    /// (defaults to `generic-<id>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_subcategory: Option<String>,
}

/// Named list of keyword patterns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordGroupSpec {
    pub name: String,
    pub patterns: Vec<String>,
}

/// Score added to one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bonus {
    pub category: String,
    pub weight: u32,
}

/// Amplitude-envelope threshold rule; every present bound must hold
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_below: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_above: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decay_below: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sustain_below: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sustain_above: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_above: Option<f64>,
    pub bonuses: Vec<Bonus>,
}

impl EnvelopeRule {
    fn has_conditions(&self) -> bool {
        self.attack_below.is_some()
            || self.attack_above.is_some()
            || self.decay_below.is_some()
            || self.sustain_below.is_some()
            || self.sustain_above.is_some()
            || self.release_above.is_some()
    }

    pub fn matches(&self, env: &EnvelopeSpec) -> bool {
        self.attack_below.map_or(true, |t| env.attack < t)
            && self.attack_above.map_or(true, |t| env.attack > t)
            && self.decay_below.map_or(true, |t| env.decay < t)
            && self.sustain_below.map_or(true, |t| env.sustain < t)
            && self.sustain_above.map_or(true, |t| env.sustain > t)
            && self.release_above.map_or(true, |t| env.release > t)
    }
}

/// Oscillator threshold rule; every present bound must hold
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OscillatorRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unison_voices_above: Option<i64>,
    /// Transpose in octaves (`tune_semitones / 12`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub octaves_at_most: Option<f64>,
    pub bonuses: Vec<Bonus>,
}

impl OscillatorRule {
    fn has_conditions(&self) -> bool {
        self.unison_voices_above.is_some() || self.octaves_at_most.is_some()
    }

    pub fn matches(&self, osc: &OscillatorSpec) -> bool {
        self.unison_voices_above
            .map_or(true, |t| osc.unison_voices > t)
            && self
                .octaves_at_most
                .map_or(true, |t| osc.tune_semitones / 12.0 <= t)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WavetableRulesSpec {
    /// Sound category when no group matches
    #[serde(default = "default_wavetable_fallback")]
    pub fallback: String,

    /// Groups in priority order; the first matching group wins
    #[serde(default)]
    pub groups: Vec<KeywordGroupSpec>,
}

impl Default for WavetableRulesSpec {
    fn default() -> Self {
        Self {
            fallback: default_wavetable_fallback(),
            groups: Vec::new(),
        }
    }
}

fn default_keyword_weight() -> u32 {
    2
}

fn default_fallback_category() -> String {
    "other".to_string()
}

fn default_amp_envelope_names() -> Vec<String> {
    vec!["amp".to_string(), "env_1".to_string()]
}

fn default_wavetable_fallback() -> String {
    "general".to_string()
}

impl RulesetSpec {
    pub fn load(path: &Path) -> Result<Self, RulesetError> {
        let content = std::fs::read_to_string(path).map_err(|e| RulesetError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| RulesetError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// The stock keyword tables
    pub fn builtin() -> Self {
        let words = |list: &[&str]| list.iter().map(|w| word_pattern(w)).collect::<Vec<_>>();
        let names = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let categories = BUILTIN_CATEGORIES
            .iter()
            .map(|&(id, keywords, subcategories)| CategorySpec {
                id: id.to_string(),
                description: None,
                patterns: words(keywords),
                subcategories: names(subcategories),
                default_subcategory: (id == "other").then(|| "generic".to_string()),
            })
            .collect();

        let group = |&(name, keywords): &(&str, &[&str])| KeywordGroupSpec {
            name: name.to_string(),
            patterns: words(keywords),
        };

        let bonus = |category: &str, weight: u32| Bonus {
            category: category.to_string(),
            weight,
        };

        Self {
            keyword_weight: default_keyword_weight(),
            fallback_category: default_fallback_category(),
            amp_envelope_names: default_amp_envelope_names(),
            categories,
            subcategory_keywords: BUILTIN_SUBCATEGORY_KEYWORDS.iter().map(group).collect(),
            envelope_rules: vec![
                // Short attack, short decay, low sustain
                EnvelopeRule {
                    attack_below: Some(0.02),
                    decay_below: Some(0.3),
                    sustain_below: Some(0.3),
                    bonuses: vec![bonus("pluck", 2)],
                    ..Default::default()
                },
                // Short attack, held
                EnvelopeRule {
                    attack_below: Some(0.02),
                    sustain_above: Some(0.7),
                    bonuses: vec![bonus("lead", 1), bonus("bass", 1)],
                    ..Default::default()
                },
                EnvelopeRule {
                    attack_above: Some(0.1),
                    bonuses: vec![bonus("pad", 2)],
                    ..Default::default()
                },
                EnvelopeRule {
                    release_above: Some(1.0),
                    bonuses: vec![bonus("pad", 1), bonus("ambient", 1)],
                    ..Default::default()
                },
                // Very short everything
                EnvelopeRule {
                    attack_below: Some(0.01),
                    decay_below: Some(0.2),
                    sustain_below: Some(0.1),
                    bonuses: vec![bonus("drum", 2)],
                    ..Default::default()
                },
            ],
            oscillator_rules: vec![
                OscillatorRule {
                    unison_voices_above: Some(4),
                    bonuses: vec![bonus("lead", 2)],
                    ..Default::default()
                },
                OscillatorRule {
                    octaves_at_most: Some(-1.0),
                    bonuses: vec![bonus("bass", 2)],
                    ..Default::default()
                },
            ],
            wavetables: WavetableRulesSpec {
                fallback: default_wavetable_fallback(),
                groups: BUILTIN_WAVETABLE_GROUPS.iter().map(group).collect(),
            },
        }
    }
}

/// Whole-word pattern for a literal keyword
fn word_pattern(word: &str) -> String {
    format!(r"\b{}\b", regex::escape(word))
}

// ============================================================================
// Compiled ruleset
// ============================================================================

#[derive(Debug, Clone)]
pub struct Subcategory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub patterns: Vec<Regex>,
    pub subcategories: Vec<Subcategory>,
    pub default_subcategory: String,
}

impl Category {
    pub fn has_subcategory(&self, id: &str) -> bool {
        self.subcategories.iter().any(|s| s.id == id)
    }
}

#[derive(Debug, Clone)]
pub struct KeywordGroup {
    pub name: String,
    pub patterns: Vec<Regex>,
}

impl KeywordGroup {
    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }
}

/// Threshold rule with its bonuses resolved to category positions
#[derive(Debug, Clone)]
pub struct ResolvedRule<R> {
    pub rule: R,
    pub bonuses: Vec<(usize, u32)>,
}

/// Validated, compiled ruleset
#[derive(Debug, Clone)]
pub struct Ruleset {
    pub keyword_weight: u32,
    /// Tie-break order
    pub categories: Vec<Category>,
    /// Position of the fallback category
    pub fallback: usize,
    pub amp_envelope_names: Vec<String>,
    pub subcategory_groups: Vec<KeywordGroup>,
    pub envelope_rules: Vec<ResolvedRule<EnvelopeRule>>,
    pub oscillator_rules: Vec<ResolvedRule<OscillatorRule>>,
    pub wavetable_groups: Vec<KeywordGroup>,
    pub wavetable_fallback: String,
}

impl Ruleset {
    /// Compile the stock keyword tables
    pub fn builtin() -> Result<Self, RulesetError> {
        Self::compile(&RulesetSpec::builtin())
    }

    /// Load and compile a TOML ruleset
    pub fn load(path: &Path) -> Result<Self, RulesetError> {
        Self::compile(&RulesetSpec::load(path)?)
    }

    pub fn compile(spec: &RulesetSpec) -> Result<Self, RulesetError> {
        if spec.categories.is_empty() {
            return Err(RulesetError::NoCategories);
        }

        let mut category_ids = HashSet::new();
        let mut subcategory_ids = HashSet::new();
        let mut categories = Vec::with_capacity(spec.categories.len());

        for cat in &spec.categories {
            if !category_ids.insert(cat.id.as_str()) {
                return Err(RulesetError::DuplicateCategory(cat.id.clone()));
            }

            let mut subcategories = Vec::with_capacity(cat.subcategories.len());
            for sub in &cat.subcategories {
                if !subcategory_ids.insert(sub.as_str()) {
                    return Err(RulesetError::DuplicateSubcategory(sub.clone()));
                }
                subcategories.push(Subcategory {
                    id: sub.clone(),
                    name: display_name(sub),
                });
            }

            let default_subcategory = cat
                .default_subcategory
                .clone()
                .unwrap_or_else(|| format!("generic-{}", cat.id));
            if !cat.subcategories.contains(&default_subcategory) {
                return Err(RulesetError::UnknownSubcategory {
                    context: format!("default of category '{}'", cat.id),
                    subcategory: default_subcategory,
                });
            }

            categories.push(Category {
                id: cat.id.clone(),
                name: display_name(&cat.id),
                description: cat.description.clone(),
                patterns: compile_patterns(&format!("category '{}'", cat.id), &cat.patterns)?,
                subcategories,
                default_subcategory,
            });
        }

        let position = |context: &str, id: &str| {
            categories
                .iter()
                .position(|c| c.id == id)
                .ok_or_else(|| RulesetError::UnknownCategory {
                    context: context.to_string(),
                    category: id.to_string(),
                })
        };

        let fallback = position("fallback_category", &spec.fallback_category)?;

        let subcategory_groups = spec
            .subcategory_keywords
            .iter()
            .map(|group| {
                if !subcategory_ids.contains(group.name.as_str()) {
                    return Err(RulesetError::UnknownSubcategory {
                        context: "subcategory keyword group".to_string(),
                        subcategory: group.name.clone(),
                    });
                }
                compile_group("subcategory", group)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let resolve = |context: &str, bonuses: &[Bonus]| {
            bonuses
                .iter()
                .map(|b| Ok((position(context, &b.category)?, b.weight)))
                .collect::<Result<Vec<_>, RulesetError>>()
        };

        let mut envelope_rules = Vec::with_capacity(spec.envelope_rules.len());
        for (i, rule) in spec.envelope_rules.iter().enumerate() {
            let context = format!("envelope rule {}", i + 1);
            if !rule.has_conditions() {
                return Err(RulesetError::EmptyRule(context));
            }
            envelope_rules.push(ResolvedRule {
                bonuses: resolve(&context, &rule.bonuses)?,
                rule: rule.clone(),
            });
        }

        let mut oscillator_rules = Vec::with_capacity(spec.oscillator_rules.len());
        for (i, rule) in spec.oscillator_rules.iter().enumerate() {
            let context = format!("oscillator rule {}", i + 1);
            if !rule.has_conditions() {
                return Err(RulesetError::EmptyRule(context));
            }
            oscillator_rules.push(ResolvedRule {
                bonuses: resolve(&context, &rule.bonuses)?,
                rule: rule.clone(),
            });
        }

        let wavetable_groups = spec
            .wavetables
            .groups
            .iter()
            .map(|group| compile_group("wavetable", group))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            keyword_weight: spec.keyword_weight,
            categories,
            fallback,
            amp_envelope_names: spec.amp_envelope_names.clone(),
            subcategory_groups,
            envelope_rules,
            oscillator_rules,
            wavetable_groups,
            wavetable_fallback: spec.wavetables.fallback.clone(),
        })
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn is_amp_envelope(&self, env: &EnvelopeSpec) -> bool {
        self.amp_envelope_names.iter().any(|n| *n == env.name)
    }
}

fn compile_group(kind: &str, group: &KeywordGroupSpec) -> Result<KeywordGroup, RulesetError> {
    Ok(KeywordGroup {
        name: group.name.clone(),
        patterns: compile_patterns(&format!("{} group '{}'", kind, group.name), &group.patterns)?,
    })
}

fn compile_patterns(context: &str, patterns: &[String]) -> Result<Vec<Regex>, RulesetError> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|source| RulesetError::Pattern {
                    context: context.to_string(),
                    pattern: p.clone(),
                    source,
                })
        })
        .collect()
}

/// "pluck-bass" -> "Pluck Bass"
pub fn display_name(id: &str) -> String {
    id.split(['-', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

// ============================================================================
// Stock keyword tables
// ============================================================================

type CategoryRow = (&'static str, &'static [&'static str], &'static [&'static str]);

/// (category, keywords, subcategories) in tie-break order
const BUILTIN_CATEGORIES: &[CategoryRow] = &[
    (
        "bass",
        &[
            "bass", "sub", "reese", "growl", "wobble", "808", "low", "deep", "rumble", "thump",
            "boom", "heavy", "massive", "fat",
        ],
        &[
            "sub-bass", "reese", "growl", "wobble", "pluck-bass", "fm-bass", "acid-bass",
            "generic-bass",
        ],
    ),
    (
        "lead",
        &[
            "lead", "solo", "screech", "scream", "acid", "mono", "stab", "sharp", "cutting",
            "bright", "searing", "laser", "sync",
        ],
        &[
            "mono-lead", "poly-lead", "screech", "acid-lead", "saw-lead", "square-lead",
            "generic-lead",
        ],
    ),
    (
        "pad",
        &[
            "pad", "atmosphere", "ambient", "warm", "lush", "soft", "evolving", "sweep", "swell",
            "drift", "float", "cloud", "heaven", "space",
        ],
        &[
            "warm-pad", "evolving-pad", "ambient-pad", "dark-pad", "bright-pad", "string-pad",
            "generic-pad",
        ],
    ),
    (
        "pluck",
        &[
            "pluck", "bell", "mallet", "marimba", "vibes", "kalimba", "pizz", "guitar", "harp",
            "picked", "pling", "plink", "chime", "celeste",
        ],
        &["bell", "mallet", "pizzicato", "harpsichord", "guitar", "generic-pluck"],
    ),
    (
        "keys",
        &[
            "piano", "key", "organ", "clav", "rhodes", "wurli", "epiano", "ep", "tine", "hammer",
            "keyboard", "acoustic",
        ],
        &["piano", "electric-piano", "organ", "clav", "generic-keys"],
    ),
    (
        "brass",
        &["brass", "horn", "trumpet", "trombone", "blare", "fanfare", "section"],
        &["synth-brass", "horn", "generic-brass"],
    ),
    (
        "strings",
        &[
            "string", "violin", "cello", "orchestra", "ensemble", "section", "legato", "arco",
            "bowed",
        ],
        &["synth-strings", "orchestral", "generic-strings"],
    ),
    (
        "vocal",
        &[
            "vocal", "voice", "choir", "vox", "formant", "talk", "speech", "sing", "aah", "ooh",
            "human",
        ],
        &["choir", "formant", "talkbox", "generic-vocal"],
    ),
    (
        "fx",
        &[
            "fx", "effect", "sfx", "noise", "texture", "riser", "impact", "hit", "swoosh",
            "whoosh", "zap", "glitch", "stutter", "transition",
        ],
        &["riser", "impact", "texture", "noise", "generic-fx"],
    ),
    (
        "drum",
        &[
            "drum", "kick", "snare", "hihat", "hi-hat", "perc", "tom", "clap", "cymbal", "rim",
            "beat",
        ],
        &["kick", "snare", "hihat", "perc", "generic-drum"],
    ),
    (
        "arp",
        &[
            "arp", "arpegg", "sequence", "seq", "pattern", "pulse", "motion", "rhythmic", "tempo",
        ],
        &["sequence", "arp-lead", "arp-bass", "generic-arp"],
    ),
    (
        "ambient",
        &[
            "ambient", "drone", "soundscape", "ethereal", "cinematic", "film", "movie", "atmos",
        ],
        &["drone", "soundscape", "cinematic", "generic-ambient"],
    ),
    ("other", &[], &["generic"]),
];

/// Subcategory keyword groups; later matches override earlier ones
const BUILTIN_SUBCATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("sub-bass", &["sub", "808", "sine bass", "pure"]),
    ("reese", &["reese", "dnb", "neuro", "liquid"]),
    ("growl", &["growl", "dubstep", "brostep", "dirty", "filthy"]),
    ("wobble", &["wobble", "wub", "lfo bass"]),
    ("acid-bass", &["acid", "303", "squelch"]),
    ("fm-bass", &["fm", "dx", "digital bass"]),
    ("saw-lead", &["saw", "supersaw", "trance"]),
    ("square-lead", &["square", "pulse"]),
    ("warm-pad", &["warm", "analog", "vintage"]),
    ("evolving-pad", &["evolv", "morph", "moving"]),
    ("dark-pad", &["dark", "ominous", "sinister"]),
    ("bright-pad", &["bright", "airy", "light"]),
    ("bell", &["bell", "tubular", "glock"]),
    ("mallet", &["mallet", "marimba", "xylo", "vibes"]),
    ("electric-piano", &["ep", "rhodes", "wurli", "tine"]),
    ("organ", &["organ", "hammond", "b3", "drawbar"]),
    ("choir", &["choir", "chorus", "voices"]),
    ("formant", &["formant", "vowel", "talk"]),
    ("riser", &["riser", "build", "tension"]),
    ("impact", &["impact", "hit", "drop"]),
    ("drone", &["drone", "sustain", "held"]),
    ("soundscape", &["soundscape", "cinematic", "film"]),
];

/// Wavetable sound groups in priority order
const BUILTIN_WAVETABLE_GROUPS: &[(&str, &[&str])] = &[
    ("basic", &["sine", "saw", "square", "triangle", "pulse", "basic"]),
    ("analog", &["analog", "vintage", "classic", "warm", "fat"]),
    ("digital", &["digital", "fm", "harmonic", "additive", "spectral"]),
    ("vocal", &["vocal", "voice", "formant", "choir", "vowel"]),
    ("strings", &["string", "cello", "violin", "orchestra"]),
    ("keys", &["piano", "organ", "bell", "mallet", "clav"]),
    ("brass", &["brass", "horn", "trumpet"]),
    ("noise", &["noise", "texture", "grainy"]),
    ("evolving", &["evolv", "morph", "sweep", "moving"]),
    ("experimental", &["glitch", "weird", "experimental", "crazy"]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_shape() {
        let ruleset = Ruleset::builtin().unwrap();
        assert_eq!(ruleset.categories.len(), 13);
        assert_eq!(ruleset.subcategory_groups.len(), 22);
        assert_eq!(ruleset.wavetable_groups.len(), 10);
        assert_eq!(ruleset.categories[ruleset.fallback].id, "other");
        assert_eq!(ruleset.wavetable_fallback, "general");

        let order: Vec<&str> = ruleset.categories.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "bass", "lead", "pad", "pluck", "keys", "brass", "strings", "vocal", "fx",
                "drum", "arp", "ambient", "other"
            ]
        );
    }

    #[test]
    fn test_default_subcategories() {
        let ruleset = Ruleset::builtin().unwrap();
        assert_eq!(ruleset.category("bass").unwrap().default_subcategory, "generic-bass");
        assert_eq!(ruleset.category("other").unwrap().default_subcategory, "generic");
    }

    #[test]
    fn test_patterns_are_whole_word() {
        let ruleset = Ruleset::builtin().unwrap();
        let bass = ruleset.category("bass").unwrap();
        assert!(bass.patterns.iter().any(|p| p.is_match("deep sub")));
        assert!(!bass.patterns.iter().any(|p| p.is_match("subway")));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("pluck-bass"), "Pluck Bass");
        assert_eq!(display_name("fm-bass"), "Fm Bass");
        assert_eq!(display_name("bass"), "Bass");
    }

    #[test]
    fn test_unknown_bonus_category_rejected() {
        let mut spec = RulesetSpec::builtin();
        spec.envelope_rules[0].bonuses[0].category = "kazoo".to_string();
        let err = Ruleset::compile(&spec).unwrap_err();
        assert!(matches!(err, RulesetError::UnknownCategory { .. }));
    }

    #[test]
    fn test_unregistered_subcategory_group_rejected() {
        let mut spec = RulesetSpec::builtin();
        spec.subcategory_keywords.push(KeywordGroupSpec {
            name: "kazoo-lead".to_string(),
            patterns: vec![word_pattern("kazoo")],
        });
        let err = Ruleset::compile(&spec).unwrap_err();
        assert!(matches!(err, RulesetError::UnknownSubcategory { .. }));
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let mut spec = RulesetSpec::builtin();
        spec.categories[0].patterns.push("(unclosed".to_string());
        let err = Ruleset::compile(&spec).unwrap_err();
        assert!(matches!(err, RulesetError::Pattern { .. }));
    }

    #[test]
    fn test_empty_rule_rejected() {
        let mut spec = RulesetSpec::builtin();
        spec.oscillator_rules.push(OscillatorRule::default());
        assert!(matches!(
            Ruleset::compile(&spec).unwrap_err(),
            RulesetError::EmptyRule(_)
        ));
    }

    #[test]
    fn test_minimal_toml_ruleset() {
        let spec: RulesetSpec = toml::from_str(
            r#"
            fallback_category = "misc"

            [[categories]]
            id = "bass"
            patterns = ['\bbass\b']
            subcategories = ["generic-bass"]

            [[categories]]
            id = "misc"
            subcategories = ["generic-misc"]

            [[envelope_rules]]
            attack_below = 0.02
            bonuses = [{ category = "bass", weight = 3 }]

            [wavetables]
            groups = [{ name = "basic", patterns = ['\bsine\b'] }]
            "#,
        )
        .unwrap();

        let ruleset = Ruleset::compile(&spec).unwrap();
        assert_eq!(ruleset.keyword_weight, 2);
        assert_eq!(ruleset.categories.len(), 2);
        assert_eq!(ruleset.categories[ruleset.fallback].id, "misc");
        assert_eq!(ruleset.envelope_rules[0].bonuses, vec![(0, 3)]);
        assert_eq!(ruleset.wavetable_fallback, "general");
    }
}
