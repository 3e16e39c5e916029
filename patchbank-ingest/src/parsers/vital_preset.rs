//! Compressed-JSON preset parser (`.vital`)
//!
//! Parameters live in one flat settings map whose keys carry their slot as a
//! prefix (`osc_2_level`, `lfo_5_frequency`, `reverb_mix`). The map is
//! grouped into a [`SlotTable`] once; every section is then read from its
//! own slot without building key strings.

use super::decode::decode_json;
use super::path_convention::{file_stem, is_third_party_preset, parent_dir_name, UNCATEGORIZED};
use super::type_names::{vital_filter_model_name, vital_lfo_shape_name};
use crate::error::ParseError;
use patchbank_common::identity::AssetIdentity;
use patchbank_common::models::{
    EffectSpec, EnvelopeSpec, Ecosystem, FilterSpec, LfoSpec, ModulationRoute, OscillatorSpec,
    PresetAsset, DEFAULT_MASTER_TUNE,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Characters of decoded text kept as the raw excerpt
pub const RAW_EXCERPT_CHARS: usize = 10_000;
/// Polyphony recorded when the preset does not say
pub const VITAL_DEFAULT_POLYPHONY: u32 = 32;

/// Effect sections, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Chorus,
    Compressor,
    Delay,
    Distortion,
    Eq,
    FilterFx,
    Flanger,
    Phaser,
    Reverb,
}

impl EffectKind {
    pub const ALL: [EffectKind; 9] = [
        EffectKind::Chorus,
        EffectKind::Compressor,
        EffectKind::Delay,
        EffectKind::Distortion,
        EffectKind::Eq,
        EffectKind::FilterFx,
        EffectKind::Flanger,
        EffectKind::Phaser,
        EffectKind::Reverb,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Chorus => "chorus",
            EffectKind::Compressor => "compressor",
            EffectKind::Delay => "delay",
            EffectKind::Distortion => "distortion",
            EffectKind::Eq => "eq",
            EffectKind::FilterFx => "filter_fx",
            EffectKind::Flanger => "flanger",
            EffectKind::Phaser => "phaser",
            EffectKind::Reverb => "reverb",
        }
    }
}

/// A settings-map slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKey {
    Osc(u8),
    Filter(u8),
    Env(u8),
    Lfo(u8),
    Effect(EffectKind),
}

pub const OSC_SLOTS: u8 = 3;
pub const FILTER_SLOTS: u8 = 2;
pub const ENV_SLOTS: u8 = 6;
pub const LFO_SLOTS: u8 = 8;

/// Every recognized key prefix with its slot
static SLOT_PREFIXES: [(&str, SlotKey); 28] = [
    ("osc_1_", SlotKey::Osc(1)),
    ("osc_2_", SlotKey::Osc(2)),
    ("osc_3_", SlotKey::Osc(3)),
    ("filter_1_", SlotKey::Filter(1)),
    ("filter_2_", SlotKey::Filter(2)),
    ("env_1_", SlotKey::Env(1)),
    ("env_2_", SlotKey::Env(2)),
    ("env_3_", SlotKey::Env(3)),
    ("env_4_", SlotKey::Env(4)),
    ("env_5_", SlotKey::Env(5)),
    ("env_6_", SlotKey::Env(6)),
    ("lfo_1_", SlotKey::Lfo(1)),
    ("lfo_2_", SlotKey::Lfo(2)),
    ("lfo_3_", SlotKey::Lfo(3)),
    ("lfo_4_", SlotKey::Lfo(4)),
    ("lfo_5_", SlotKey::Lfo(5)),
    ("lfo_6_", SlotKey::Lfo(6)),
    ("lfo_7_", SlotKey::Lfo(7)),
    ("lfo_8_", SlotKey::Lfo(8)),
    ("chorus_", SlotKey::Effect(EffectKind::Chorus)),
    ("compressor_", SlotKey::Effect(EffectKind::Compressor)),
    ("delay_", SlotKey::Effect(EffectKind::Delay)),
    ("distortion_", SlotKey::Effect(EffectKind::Distortion)),
    ("eq_", SlotKey::Effect(EffectKind::Eq)),
    ("filter_fx_", SlotKey::Effect(EffectKind::FilterFx)),
    ("flanger_", SlotKey::Effect(EffectKind::Flanger)),
    ("phaser_", SlotKey::Effect(EffectKind::Phaser)),
    ("reverb_", SlotKey::Effect(EffectKind::Reverb)),
];

/// Fields of one slot, keyed by the part of the key after the prefix
#[derive(Debug, Default)]
pub struct Slot<'a> {
    fields: HashMap<&'a str, (&'a str, &'a Value)>,
}

impl<'a> Slot<'a> {
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    fn value(&self, field: &str) -> Option<&'a Value> {
        self.fields.get(field).map(|(_, v)| *v)
    }

    /// Numeric field, `default` when absent; booleans read as 0/1
    pub fn num(&self, field: &str, default: f64) -> Result<f64, ParseError> {
        match self.value(field) {
            None | Some(Value::Null) => Ok(default),
            Some(v) => as_number(v).ok_or_else(|| {
                ParseError::markup(format!("setting '{}' is not numeric: {}", field, v))
            }),
        }
    }

    pub fn int(&self, field: &str, default: i64) -> Result<i64, ParseError> {
        self.num(field, default as f64).map(|n| n as i64)
    }

    /// Every field of the slot under its full settings key
    pub fn params(&self) -> Map<String, Value> {
        self.fields
            .values()
            .map(|(key, value)| (key.to_string(), (*value).clone()))
            .collect()
    }
}

/// Settings map grouped by slot, built once per document
#[derive(Debug, Default)]
pub struct SlotTable<'a> {
    slots: HashMap<SlotKey, Slot<'a>>,
    empty: Slot<'a>,
}

impl<'a> SlotTable<'a> {
    pub fn build(settings: &'a Map<String, Value>) -> Self {
        let mut table = SlotTable::default();
        for (key, value) in settings {
            let matched = SLOT_PREFIXES
                .iter()
                .filter(|(prefix, _)| key.starts_with(prefix))
                .max_by_key(|(prefix, _)| prefix.len());
            if let Some((prefix, slot)) = matched {
                table
                    .slots
                    .entry(*slot)
                    .or_default()
                    .fields
                    .insert(&key[prefix.len()..], (key.as_str(), value));
            }
        }
        table
    }

    pub fn slot(&self, key: SlotKey) -> &Slot<'a> {
        self.slots.get(&key).unwrap_or(&self.empty)
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn non_empty_str<'a>(doc: &'a Value, key: &str) -> Option<&'a str> {
    doc.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Wavetable name referenced by oscillator slot `slot` (1-based)
///
/// Accepts a map keyed `osc_N` or a list indexed by slot.
fn wavetable_name(doc: &Value, settings: &Map<String, Value>, slot: u8) -> Option<String> {
    let tables = doc.get("wavetables").or_else(|| settings.get("wavetables"))?;
    let entry = match tables {
        Value::Object(map) => map.get(&format!("osc_{}", slot))?,
        Value::Array(list) => list.get(slot as usize - 1)?,
        _ => return None,
    };
    Some(
        entry
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Wavetable {}", slot)),
    )
}

fn parse_oscillators(
    table: &SlotTable,
    doc: &Value,
    settings: &Map<String, Value>,
) -> Result<Vec<OscillatorSpec>, ParseError> {
    let mut oscillators = Vec::new();
    for n in 1..=OSC_SLOTS {
        let slot = table.slot(SlotKey::Osc(n));
        if !slot.has("on") || slot.num("on", 0.0)? == 0.0 {
            continue;
        }
        let mut spec = OscillatorSpec::new(u32::from(n - 1), 2, "Wavetable");
        spec.wavetable_name = wavetable_name(doc, settings, n);
        spec.wavetable_position = slot.num("wave_frame", 0.0)?;
        spec.level = slot.num("level", 1.0)?;
        spec.pan = slot.num("pan", 0.0)?;
        spec.tune_semitones = slot.num("transpose", 0.0)?;
        spec.tune_cents = slot.num("tune", 0.0)?;
        spec.unison_voices = slot.int("unison_voices", 1)?;
        spec.unison_detune = slot.num("unison_detune", 0.0)?;
        spec.unison_blend = slot.num("unison_blend", 0.0)?;
        spec.phase = slot.num("phase", 0.0)?;
        spec.phase_randomize = slot.num("random_phase", 0.0)?;
        spec.distortion = slot.num("distortion_amount", 0.0)?;
        oscillators.push(spec);
    }
    Ok(oscillators)
}

fn parse_filters(table: &SlotTable) -> Result<Vec<FilterSpec>, ParseError> {
    let mut filters = Vec::new();
    for n in 1..=FILTER_SLOTS {
        let slot = table.slot(SlotKey::Filter(n));
        if !slot.has("on") {
            continue;
        }
        let model = slot.int("model", 0)?;
        let mut spec = FilterSpec::new(u32::from(n - 1), model, vital_filter_model_name(model));
        // Cutoff is in semitones for this format
        spec.cutoff = slot.num("cutoff", 60.0)?;
        spec.resonance = slot.num("resonance", 0.0)?;
        spec.drive = slot.num("drive", 0.0)?;
        spec.mix = slot.num("mix", 1.0)?;
        spec.keytrack = slot.num("keytrack", 0.0)?;
        filters.push(spec);
    }
    Ok(filters)
}

fn parse_envelopes(table: &SlotTable) -> Result<Vec<EnvelopeSpec>, ParseError> {
    let mut envelopes = Vec::new();
    for n in 1..=ENV_SLOTS {
        let slot = table.slot(SlotKey::Env(n));
        if !slot.has("attack") {
            continue;
        }
        envelopes.push(EnvelopeSpec {
            name: format!("env_{}", n),
            attack: slot.num("attack", 0.0)?,
            decay: slot.num("decay", 0.0)?,
            sustain: slot.num("sustain", 1.0)?,
            release: slot.num("release", 0.0)?,
            attack_curve: slot.num("attack_power", 0.0)?,
            decay_curve: slot.num("decay_power", 0.0)?,
            release_curve: slot.num("release_power", 0.0)?,
        });
    }
    Ok(envelopes)
}

fn parse_lfos(table: &SlotTable) -> Result<Vec<LfoSpec>, ParseError> {
    let mut lfos = Vec::new();
    for n in 1..=LFO_SLOTS {
        let slot = table.slot(SlotKey::Lfo(n));
        if !slot.has("frequency") {
            continue;
        }
        let shape = slot.int("shape", 0)?;
        let mut spec = LfoSpec::new(u32::from(n - 1), shape, vital_lfo_shape_name(shape));
        spec.rate = slot.num("frequency", 1.0)?;
        spec.sync = slot.num("sync", 0.0)? > 0.0;
        match slot.value("sync_type") {
            Some(Value::String(s)) => spec.sync_rate = s.clone(),
            Some(Value::Number(n)) => spec.sync_rate = n.to_string(),
            _ => {}
        }
        spec.phase = slot.num("phase", 0.0)?;
        spec.delay = slot.num("delay", 0.0)?;
        spec.fade_in = slot.num("fade", 0.0)?;
        lfos.push(spec);
    }
    Ok(lfos)
}

fn parse_effects(table: &SlotTable) -> Result<Vec<EffectSpec>, ParseError> {
    let mut effects = Vec::new();
    for kind in EffectKind::ALL {
        let slot = table.slot(SlotKey::Effect(kind));
        if !slot.has("on") {
            continue;
        }
        effects.push(EffectSpec {
            effect_type: kind.name().to_string(),
            enabled: slot.num("on", 0.0)? > 0.0,
            mix: if kind == EffectKind::Eq {
                1.0
            } else {
                slot.num("mix", 1.0)?
            },
            params: slot.params(),
        });
    }
    Ok(effects)
}

fn parse_modulations(doc: &Value, settings: &Map<String, Value>) -> Vec<ModulationRoute> {
    let list = doc
        .get("modulations")
        .or_else(|| settings.get("modulations"))
        .and_then(Value::as_array);

    list.into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .map(|m| ModulationRoute {
            source: m.get("source").and_then(Value::as_str).unwrap_or_default().to_string(),
            destination: m
                .get("destination")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            amount: m.get("amount").and_then(as_number).unwrap_or(0.0),
            bipolar: m.get("bipolar").map_or(true, |b| as_number(b) == Some(1.0)),
        })
        .collect()
}

pub fn parse(path: &str, raw: &[u8]) -> Result<PresetAsset, ParseError> {
    let (doc, text) = decode_json(raw)?;
    if !doc.is_object() {
        return Err(ParseError::structural("preset document is not an object"));
    }

    let settings = match doc.get("settings") {
        Some(Value::Object(map)) => map,
        Some(_) => return Err(ParseError::structural("settings is not an object")),
        None => doc.as_object().ok_or_else(|| ParseError::structural("no settings map"))?,
    };
    let table = SlotTable::build(settings);
    let master = |key: &str| settings.get(key).and_then(as_number);

    let name = non_empty_str(&doc, "preset_name")
        .map(str::to_string)
        .unwrap_or_else(|| file_stem(path).to_string());

    let category = non_empty_str(&doc, "preset_style")
        .or_else(|| parent_dir_name(path))
        .unwrap_or(UNCATEGORIZED)
        .to_string();

    let tags = doc
        .get("tags")
        .and_then(Value::as_array)
        .map(|t| t.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    let identity = AssetIdentity::derive(path, raw);

    Ok(PresetAsset {
        id: identity.id,
        content_hash: identity.content_hash,
        name,
        source: Ecosystem::Vital,
        category,
        path: path.to_string(),
        is_third_party: is_third_party_preset(path),
        author: non_empty_str(&doc, "author").map(str::to_string),
        description: non_empty_str(&doc, "comments").map(str::to_string),
        tags,
        oscillators: parse_oscillators(&table, &doc, settings)?,
        filters: parse_filters(&table)?,
        envelopes: parse_envelopes(&table)?,
        lfos: parse_lfos(&table)?,
        modulations: parse_modulations(&doc, settings),
        effects: parse_effects(&table)?,
        master_volume: master("volume").unwrap_or(1.0),
        master_tune: DEFAULT_MASTER_TUNE,
        polyphony: master("polyphony").map_or(VITAL_DEFAULT_POLYPHONY, |p| p.max(0.0) as u32),
        portamento: master("portamento_time").unwrap_or(0.0),
        raw_excerpt: Some(text.chars().take(RAW_EXCERPT_CHARS).collect()),
        file_size: raw.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_doc(path: &str, doc: Value) -> PresetAsset {
        parse(path, doc.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_absent_slots_are_skipped() {
        let p = parse_doc(
            "presets/Misc/Sparse.vital",
            json!({"settings": {
                "osc_2_on": 1.0,
                "filter_2_on": 1.0,
                "env_3_attack": 0.2,
                "lfo_4_frequency": 3.0
            }}),
        );

        assert_eq!(p.oscillators.len(), 1);
        assert_eq!(p.oscillators[0].index, 1);
        assert_eq!(p.filters.len(), 1);
        assert_eq!(p.filters[0].index, 1);
        assert_eq!(p.filters[0].cutoff, 60.0);
        assert_eq!(p.envelopes.len(), 1);
        assert_eq!(p.envelopes[0].name, "env_3");
        assert_eq!(p.envelopes[0].sustain, 1.0);
        assert_eq!(p.lfos.len(), 1);
        assert_eq!(p.lfos[0].index, 3);
        assert!(p.effects.is_empty());
        assert_eq!(p.polyphony, VITAL_DEFAULT_POLYPHONY);
    }

    #[test]
    fn test_switched_off_oscillators_are_skipped() {
        let p = parse_doc(
            "presets/Misc/Off.vital",
            json!({"settings": {
                "osc_1_on": 0.0,
                "osc_1_level": 0.9,
                "osc_2_on": 1.0,
                "osc_2_level": 0.4,
                "osc_3_level": 0.7
            }}),
        );

        assert_eq!(p.oscillators.len(), 1);
        assert_eq!(p.oscillators[0].index, 1);
        assert_eq!(p.oscillators[0].level, 0.4);
        assert_eq!(p.oscillators[0].osc_type_name, "Wavetable");
    }

    #[test]
    fn test_wavetable_names_come_from_wavetables_section() {
        let settings = json!({"osc_1_on": 1.0, "osc_2_on": 1.0, "osc_3_on": 1.0});
        let p = parse_doc(
            "presets/Lead/Tables.vital",
            json!({
                "settings": settings.clone(),
                "wavetables": {"osc_1": {"name": "Basic Shapes"}, "osc_2": {"groups": []}}
            }),
        );
        let names: Vec<Option<&str>> =
            p.oscillators.iter().map(|o| o.wavetable_name.as_deref()).collect();
        assert_eq!(names, vec![Some("Basic Shapes"), Some("Wavetable 2"), None]);

        let p = parse_doc(
            "presets/Lead/Tables.vital",
            json!({
                "settings": settings,
                "wavetables": [{"name": "Harmonic"}, {"name": "Vox"}]
            }),
        );
        let names: Vec<Option<&str>> =
            p.oscillators.iter().map(|o| o.wavetable_name.as_deref()).collect();
        assert_eq!(names, vec![Some("Harmonic"), Some("Vox"), None]);
    }

    #[test]
    fn test_category_falls_back_to_parent_directory() {
        let p = parse_doc("presets/Keys/A.vital", json!({"preset_style": "Bass", "settings": {}}));
        assert_eq!(p.category, "Bass");

        let p = parse_doc("presets/Keys/A.vital", json!({"preset_style": " ", "settings": {}}));
        assert_eq!(p.category, "Keys");

        let p = parse_doc("A.vital", json!({"settings": {}}));
        assert_eq!(p.category, UNCATEGORIZED);
        assert_eq!(p.name, "A");
    }

    #[test]
    fn test_eq_mix_is_fixed() {
        let p = parse_doc(
            "presets/Fx/Mix.vital",
            json!({"settings": {
                "eq_on": 1.0,
                "eq_mix": 0.2,
                "chorus_on": 0.0,
                "chorus_mix": 0.2
            }}),
        );

        let mix: Vec<(&str, bool, f64)> = p
            .effects
            .iter()
            .map(|e| (e.effect_type.as_str(), e.enabled, e.mix))
            .collect();
        assert_eq!(mix, vec![("chorus", false, 0.2), ("eq", true, 1.0)]);
    }

    #[test]
    fn test_third_party_location_is_flagged() {
        let doc = json!({"settings": {}});
        assert!(parse_doc("patches_3rdparty/Bob/Pads/A.vital", doc.clone()).is_third_party);
        assert!(!parse_doc("presets/Pads/A.vital", doc).is_third_party);
    }

    #[test]
    fn test_slot_table_longest_prefix() {
        let settings = json!({
            "filter_1_cutoff": 40.0,
            "filter_fx_cutoff": 80.0,
            "osc_1_distortion_amount": 0.5,
            "distortion_drive": 2.0,
            "volume": 0.8
        });
        let map = settings.as_object().unwrap();
        let table = SlotTable::build(map);

        assert_eq!(table.slot(SlotKey::Filter(1)).num("cutoff", 0.0).unwrap(), 40.0);
        let fx = table.slot(SlotKey::Effect(EffectKind::FilterFx));
        assert_eq!(fx.num("cutoff", 0.0).unwrap(), 80.0);
        assert!(table.slot(SlotKey::Osc(1)).has("distortion_amount"));
        assert!(!table.slot(SlotKey::Effect(EffectKind::Distortion)).has("amount"));
        assert!(!table.slot(SlotKey::Osc(2)).has("on"));
    }

    #[test]
    fn test_non_numeric_setting_is_markup_error() {
        let settings = json!({"osc_1_on": 1.0, "osc_1_level": "loud"});
        let table = SlotTable::build(settings.as_object().unwrap());
        assert!(matches!(
            table.slot(SlotKey::Osc(1)).num("level", 1.0),
            Err(ParseError::MalformedMarkup(_))
        ));
    }

    #[test]
    fn test_effect_params_use_full_keys() {
        let settings = json!({"reverb_on": 1.0, "reverb_mix": 0.3, "reverb_size": 0.9});
        let table = SlotTable::build(settings.as_object().unwrap());
        let effects = parse_effects(&table).unwrap();
        assert_eq!(effects.len(), 1);
        assert_eq!(effects[0].mix, 0.3);
        assert!(effects[0].params.contains_key("reverb_size"));
        assert_eq!(effects[0].params.len(), 3);
    }
}
