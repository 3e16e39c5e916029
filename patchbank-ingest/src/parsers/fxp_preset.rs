//! Binary-chunk preset parser (`.fxp`)
//!
//! ```text
//! 0   "CcnK"          container tag
//! 8   "FxCk" | "FPCh" variant (only FPCh carries a chunk)
//! 28  [u8; 28]        program name, null-terminated
//! 56  u32 BE          chunk length
//! 60  chunk           binary framing + XML patch document
//! ```
//!
//! The XML is found heuristically: the first `<?xml` / `<patch` token in the
//! first 1000 chunk bytes up to the last `>` of the chunk.

use super::path_convention::{
    file_stem, is_third_party_preset, preset_path_category, UNCATEGORIZED,
};
use super::type_names::{surge_filter_type_name, surge_lfo_shape_name, surge_osc_type_name};
use crate::error::ParseError;
use byteorder::{BigEndian, ByteOrder};
use patchbank_common::identity::AssetIdentity;
use patchbank_common::models::{
    EffectSpec, EnvelopeSpec, Ecosystem, FilterSpec, LfoSpec, ModulationRoute, OscillatorSpec,
    PresetAsset, DEFAULT_MASTER_TUNE, DEFAULT_MASTER_VOLUME, DEFAULT_POLYPHONY,
    DEFAULT_PORTAMENTO,
};
use roxmltree::{Document, Node};
use std::str::FromStr;

pub const MIN_FXP_LEN: usize = 60;
pub const CONTAINER_TAG: &[u8; 4] = b"CcnK";
pub const PARAM_VARIANT: &[u8; 4] = b"FxCk";
pub const CHUNK_VARIANT: &[u8; 4] = b"FPCh";
/// How far into the chunk the markup start token may appear
pub const MARKUP_SCAN_LIMIT: usize = 1000;
/// Characters of markup kept as the raw excerpt
pub const RAW_EXCERPT_CHARS: usize = 10_000;

const NAME_RANGE: std::ops::Range<usize> = 28..56;
const CHUNK_LEN_RANGE: std::ops::Range<usize> = 56..60;
const CHUNK_START: usize = 60;

pub fn parse(path: &str, raw: &[u8]) -> Result<PresetAsset, ParseError> {
    if raw.len() < MIN_FXP_LEN {
        return Err(ParseError::structural(format!(
            "{} bytes is shorter than an fxp header",
            raw.len()
        )));
    }
    if &raw[0..4] != CONTAINER_TAG {
        return Err(ParseError::structural("missing CcnK container tag"));
    }

    let variant = &raw[8..12];
    if variant == PARAM_VARIANT {
        return Err(ParseError::encoding("parameter-list fxp variant carries no patch chunk"));
    }
    if variant != CHUNK_VARIANT {
        return Err(ParseError::structural(format!(
            "unknown fxp variant {:?}",
            String::from_utf8_lossy(variant)
        )));
    }

    let header_name = read_name(&raw[NAME_RANGE]);
    let chunk_len = BigEndian::read_u32(&raw[CHUNK_LEN_RANGE]) as usize;
    let chunk_end = CHUNK_START.saturating_add(chunk_len).min(raw.len());
    let chunk = &raw[CHUNK_START..chunk_end];

    let markup = locate_markup(chunk).ok_or_else(|| ParseError::structural("no patch markup in chunk"))?;
    let xml = String::from_utf8_lossy(markup);

    let mut preset = parse_patch_xml(xml.trim(), path, &header_name)?;

    let identity = AssetIdentity::derive(path, raw);
    preset.id = identity.id;
    preset.content_hash = identity.content_hash;
    preset.file_size = raw.len() as u64;
    Ok(preset)
}

/// Null-terminated, lossily decoded name field
fn read_name(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).trim().to_string()
}

/// Slice of `chunk` holding the markup document, framing noise removed
pub fn locate_markup(chunk: &[u8]) -> Option<&[u8]> {
    let start = (0..chunk.len().min(MARKUP_SCAN_LIMIT)).find(|&i| {
        let rest = &chunk[i..];
        rest.starts_with(b"<?xml") || rest.starts_with(b"<patch")
    })?;

    let end = chunk[start + 1..]
        .iter()
        .rposition(|&b| b == b'>')
        .map(|i| start + 1 + i + 1)
        .unwrap_or(chunk.len());

    Some(&chunk[start..end])
}

/// Descendants of `node` (excluding itself) with the given tag
fn descendants_named<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.descendants().skip(1).filter(move |n| n.has_tag_name(name))
}

fn attr<T: FromStr>(node: Node, name: &str, default: T) -> Result<T, ParseError> {
    match node.attribute(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| {
            ParseError::markup(format!(
                "<{}> attribute {}={:?} is not a number",
                node.tag_name().name(),
                name,
                value
            ))
        }),
    }
}

fn parse_patch_xml(xml: &str, path: &str, header_name: &str) -> Result<PresetAsset, ParseError> {
    let doc = Document::parse(xml).map_err(|e| ParseError::markup(e.to_string()))?;
    let root = doc.root_element();

    let name = root
        .attribute("name")
        .map(str::to_string)
        .or_else(|| Some(header_name.to_string()).filter(|n| !n.is_empty()))
        .unwrap_or_else(|| file_stem(path).to_string());

    let category = preset_path_category(path).unwrap_or_else(|| {
        root.attribute("category")
            .unwrap_or(UNCATEGORIZED)
            .to_string()
    });

    let mut oscillators = Vec::new();
    let mut filters = Vec::new();
    let mut envelopes = Vec::new();
    let mut lfos = Vec::new();

    for scene in descendants_named(root, "scene") {
        for (i, osc) in descendants_named(scene, "osc").enumerate() {
            let osc_type = attr(osc, "type", 0i64)?;
            let mut spec = OscillatorSpec::new(i as u32, osc_type, surge_osc_type_name(osc_type));
            spec.wavetable_name = osc.attribute("wavetable").map(str::to_string);
            spec.wavetable_position = attr(osc, "morph", 0.0)?;
            spec.level = attr(osc, "level", 1.0)?;
            spec.pan = attr(osc, "pan", 0.0)?;
            spec.tune_semitones = attr(osc, "pitch", 0.0)?;
            spec.tune_cents = attr(osc, "detune", 0.0)?;
            spec.unison_voices = attr(osc, "unison_voices", 1i64)?;
            spec.unison_detune = attr(osc, "unison_detune", 0.0)?;
            oscillators.push(spec);
        }

        for (i, filt) in descendants_named(scene, "filter").enumerate() {
            let filter_type = attr(filt, "type", 0i64)?;
            let mut spec =
                FilterSpec::new(i as u32, filter_type, surge_filter_type_name(filter_type));
            spec.cutoff = attr(filt, "cutoff", 1000.0)?;
            spec.resonance = attr(filt, "resonance", 0.0)?;
            spec.drive = attr(filt, "drive", 0.0)?;
            spec.keytrack = attr(filt, "keytrack", 0.0)?;
            filters.push(spec);
        }

        for env in descendants_named(scene, "envelope") {
            let defaults = EnvelopeSpec::default();
            let mut spec = EnvelopeSpec::new(env.attribute("id").unwrap_or("amp"));
            spec.attack = attr(env, "attack", defaults.attack)?;
            spec.decay = attr(env, "decay", defaults.decay)?;
            spec.sustain = attr(env, "sustain", defaults.sustain)?;
            spec.release = attr(env, "release", defaults.release)?;
            envelopes.push(spec);
        }

        for (i, lfo) in descendants_named(scene, "lfo").enumerate() {
            let shape = attr(lfo, "shape", 0i64)?;
            let mut spec = LfoSpec::new(i as u32, shape, surge_lfo_shape_name(shape));
            spec.rate = attr(lfo, "rate", 1.0)?;
            spec.sync = lfo.attribute("temposync") == Some("1");
            spec.depth = attr(lfo, "magnitude", 1.0)?;
            lfos.push(spec);
        }
    }

    let modulations = descendants_named(root, "modrouting")
        .map(|m| {
            Ok(ModulationRoute {
                source: m.attribute("source").unwrap_or_default().to_string(),
                destination: m.attribute("destination").unwrap_or_default().to_string(),
                amount: attr(m, "depth", 0.0)?,
                ..Default::default()
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    let effects = descendants_named(root, "fx")
        .map(|fx| {
            let mut spec = EffectSpec::new(fx.attribute("type").unwrap_or("off"));
            spec.enabled = fx.attribute("enabled").unwrap_or("1") == "1";
            spec.mix = attr(fx, "mix", 1.0)?;
            Ok(spec)
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    Ok(PresetAsset {
        id: String::new(),
        content_hash: String::new(),
        name,
        source: Ecosystem::Surge,
        category,
        path: path.to_string(),
        is_third_party: is_third_party_preset(path),
        author: root.attribute("author").map(str::to_string),
        description: root.attribute("comment").map(str::to_string),
        tags: Vec::new(),
        oscillators,
        filters,
        envelopes,
        lfos,
        modulations,
        effects,
        master_volume: DEFAULT_MASTER_VOLUME,
        master_tune: DEFAULT_MASTER_TUNE,
        polyphony: DEFAULT_POLYPHONY,
        portamento: DEFAULT_PORTAMENTO,
        raw_excerpt: Some(xml.chars().take(RAW_EXCERPT_CHARS).collect()),
        file_size: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fxp(variant: &[u8; 4], name: &str, chunk: &[u8]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(CONTAINER_TAG);
        raw.extend_from_slice(&[0; 4]);
        raw.extend_from_slice(variant);
        raw.extend_from_slice(&[0; 16]);
        let mut name_field = [0u8; 28];
        name_field[..name.len()].copy_from_slice(name.as_bytes());
        raw.extend_from_slice(&name_field);
        raw.extend_from_slice(&(chunk.len() as u32).to_be_bytes());
        raw.extend_from_slice(chunk);
        raw
    }

    const TWO_SCENES: &str = r#"<patch name="Scene Test" category="Leads" author="Ann" comment="two scenes">
        <scene>
            <osc type="2" wavetable="Basic Shapes" pitch="-12" unison_voices="3"/>
            <osc type="0"/>
            <filter type="1" cutoff="500" resonance="0.3"/>
            <envelope id="amp" attack="0.01" decay="0.2" sustain="0.5" release="0.3"/>
            <envelope id="filter" attack="0.5"/>
            <lfo shape="1" rate="2.5" temposync="1"/>
            <modrouting source="lfo1" destination="cutoff" depth="0.25"/>
        </scene>
        <scene>
            <osc type="5"/>
            <filter type="2"/>
        </scene>
        <modrouting source="env2" destination="pitch" depth="-1"/>
        <fx type="reverb" enabled="0" mix="0.4"/>
        <fx type="delay"/>
    </patch>"#;

    #[test]
    fn test_scene_specs_are_extracted() {
        let p = parse_patch_xml(TWO_SCENES, "patches_factory/x.fxp", "").unwrap();
        assert_eq!(p.name, "Scene Test");
        assert_eq!(p.author.as_deref(), Some("Ann"));
        assert_eq!(p.description.as_deref(), Some("two scenes"));

        // Slot indices restart in every scene
        let osc: Vec<(u32, &str)> =
            p.oscillators.iter().map(|o| (o.index, o.osc_type_name.as_str())).collect();
        assert_eq!(osc, vec![(0, "Wavetable"), (1, "Classic"), (0, "FM3")]);
        assert_eq!(p.oscillators[0].wavetable_name.as_deref(), Some("Basic Shapes"));
        assert_eq!(p.oscillators[0].tune_semitones, -12.0);
        assert_eq!(p.oscillators[0].unison_voices, 3);
        assert_eq!(p.oscillators[1].wavetable_name, None);

        let filters: Vec<&str> = p.filters.iter().map(|f| f.filter_type_name.as_str()).collect();
        assert_eq!(filters, vec!["LP 12dB", "LP 24dB"]);
        assert_eq!(p.filters[0].cutoff, 500.0);
        assert_eq!(p.filters[1].cutoff, 1000.0);

        assert_eq!(p.envelopes.len(), 2);
        assert_eq!(p.envelopes[0].name, "amp");
        assert_eq!(p.envelopes[0].sustain, 0.5);
        assert_eq!(p.envelopes[1].name, "filter");
        assert_eq!(p.envelopes[1].sustain, EnvelopeSpec::default().sustain);

        assert_eq!(p.lfos.len(), 1);
        assert_eq!(p.lfos[0].waveform_name, "Triangle");
        assert_eq!(p.lfos[0].rate, 2.5);
        assert!(p.lfos[0].sync);
    }

    #[test]
    fn test_unknown_type_codes_keep_the_code() {
        let xml = r#"<patch><scene>
            <osc type="99"/><filter type="40"/><lfo shape="-1"/>
        </scene></patch>"#;
        let p = parse_patch_xml(xml, "patches_factory/x.fxp", "").unwrap();
        assert_eq!(p.oscillators[0].osc_type_name, "Unknown (99)");
        assert_eq!(p.oscillators[0].osc_type, 99);
        assert_eq!(p.filters[0].filter_type_name, "Unknown (40)");
        assert_eq!(p.lfos[0].waveform_name, "Unknown (-1)");
    }

    #[test]
    fn test_modrouting_and_fx_are_collected_globally() {
        let p = parse_patch_xml(TWO_SCENES, "patches_factory/x.fxp", "").unwrap();

        let routes: Vec<(&str, &str, f64)> = p
            .modulations
            .iter()
            .map(|m| (m.source.as_str(), m.destination.as_str(), m.amount))
            .collect();
        assert_eq!(routes, vec![("lfo1", "cutoff", 0.25), ("env2", "pitch", -1.0)]);

        assert_eq!(p.effects.len(), 2);
        assert_eq!(p.effects[0].effect_type, "reverb");
        assert!(!p.effects[0].enabled);
        assert_eq!(p.effects[0].mix, 0.4);
        assert_eq!(p.effects[1].effect_type, "delay");
        assert!(p.effects[1].enabled);
        assert_eq!(p.effects[1].mix, 1.0);
    }

    #[test]
    fn test_path_category_overrides_root_attribute() {
        let p = parse_patch_xml(TWO_SCENES, "patches_factory/Bass/Wobble.fxp", "").unwrap();
        assert_eq!(p.category, "Bass");
        assert!(!p.is_third_party);

        // No directory after the marker: the attribute stands
        let p = parse_patch_xml(TWO_SCENES, "patches_factory/Wobble.fxp", "").unwrap();
        assert_eq!(p.category, "Leads");

        let path = "patches_3rdparty/Alice/Pads/Wobble.fxp";
        let p = parse_patch_xml(TWO_SCENES, path, "").unwrap();
        assert_eq!(p.category, "Alice");
        assert!(p.is_third_party);

        let p = parse_patch_xml("<patch/>", "elsewhere/Wobble.fxp", "").unwrap();
        assert_eq!(p.category, UNCATEGORIZED);
    }

    #[test]
    fn test_full_container_uses_header_name() {
        let chunk =
            b"\x00\x00<?xml version=\"1.0\"?><patch category=\"Pads\"><scene/></patch>\x00";
        let raw = fxp(CHUNK_VARIANT, "Header Name", chunk);
        let p = parse("patches_factory/Pads/a.fxp", &raw).unwrap();
        assert_eq!(p.name, "Header Name");
        assert_eq!(p.category, "Pads");
        assert_eq!(p.file_size, raw.len() as u64);
        assert_eq!(p.id, AssetIdentity::derive("patches_factory/Pads/a.fxp", &raw).id);
    }

    #[test]
    fn test_parameter_variant_is_encoding_error() {
        let raw = fxp(PARAM_VARIANT, "Params", &[0; 64]);
        assert!(matches!(
            parse("patches_factory/a.fxp", &raw),
            Err(ParseError::Encoding(_))
        ));
    }

    #[test]
    fn test_unparsable_markup_is_markup_error() {
        let raw = fxp(CHUNK_VARIANT, "Broken", b"<patch><scene></patch>");
        assert!(matches!(
            parse("patches_factory/a.fxp", &raw),
            Err(ParseError::MalformedMarkup(_))
        ));
    }

    #[test]
    fn test_locate_markup_strips_framing() {
        let chunk = b"\x00\x01junk<?xml version=\"1.0\"?><patch/>\x00\xff>\x00";
        let found = locate_markup(chunk).unwrap();
        assert!(found.starts_with(b"<?xml"));
        // Ends at the last '>' of the chunk, noise in between is kept
        assert!(found.ends_with(b"\xff>"));
    }

    #[test]
    fn test_locate_markup_respects_scan_limit() {
        let mut chunk = vec![b' '; MARKUP_SCAN_LIMIT];
        chunk.extend_from_slice(b"<patch/>");
        assert!(locate_markup(&chunk).is_none());
    }

    #[test]
    fn test_locate_markup_without_closing_bracket() {
        let found = locate_markup(b"<patch name").unwrap();
        assert_eq!(found, b"<patch name");
    }

    #[test]
    fn test_read_name_stops_at_null() {
        assert_eq!(read_name(b"Warm Pad\0\0garbage"), "Warm Pad");
    }
}
