//! Enumerated type-code tables

const SURGE_OSC_TYPES: [&str; 13] = [
    "Classic",
    "Sine",
    "Wavetable",
    "SH Noise",
    "Audio Input",
    "FM3",
    "FM2",
    "Window",
    "Modern",
    "String",
    "Twist",
    "Alias",
    "Phase Mod",
];

const SURGE_FILTER_TYPES: [&str; 28] = [
    "Off",
    "LP 12dB",
    "LP 24dB",
    "LP Legacy",
    "HP 12dB",
    "HP 24dB",
    "BP 12dB",
    "BP 24dB",
    "Notch 12dB",
    "Notch 24dB",
    "Comb+",
    "Comb-",
    "Sample&Hold",
    "Vintage Ladder",
    "OB-Xd 12dB",
    "OB-Xd 24dB",
    "K35 LP",
    "K35 HP",
    "Diode Ladder",
    "Cutoff Warp LP",
    "Cutoff Warp HP",
    "Cutoff Warp BP",
    "Cutoff Warp N",
    "Resonance Warp LP",
    "Resonance Warp HP",
    "Resonance Warp BP",
    "Resonance Warp N",
    "Tri-Pole",
];

const SURGE_LFO_SHAPES: [&str; 10] = [
    "Sine", "Triangle", "Square", "Ramp", "Noise", "S&H", "Envelope", "Stepseq", "MSEG",
    "Function",
];

const VITAL_FILTER_MODELS: [&str; 8] = [
    "Analog", "Dirty", "Ladder", "Digital", "Diode", "Formant", "Comb", "Phaser",
];

const VITAL_LFO_SHAPES: [&str; 6] = ["Sine", "Triangle", "Saw Up", "Saw Down", "Square", "Random"];

fn lookup(table: &'static [&'static str], code: i64) -> Option<&'static str> {
    usize::try_from(code).ok().and_then(|i| table.get(i)).copied()
}

fn unknown(code: i64) -> String {
    format!("Unknown ({})", code)
}

pub fn surge_osc_type_name(code: i64) -> String {
    lookup(&SURGE_OSC_TYPES, code).map_or_else(|| unknown(code), str::to_string)
}

pub fn surge_filter_type_name(code: i64) -> String {
    lookup(&SURGE_FILTER_TYPES, code).map_or_else(|| unknown(code), str::to_string)
}

pub fn surge_lfo_shape_name(code: i64) -> String {
    lookup(&SURGE_LFO_SHAPES, code).map_or_else(|| unknown(code), str::to_string)
}

pub fn vital_filter_model_name(code: i64) -> String {
    lookup(&VITAL_FILTER_MODELS, code).map_or_else(|| unknown(code), str::to_string)
}

/// Vital allows user-drawn LFO shapes; anything past the presets is "Custom"
pub fn vital_lfo_shape_name(code: i64) -> String {
    lookup(&VITAL_LFO_SHAPES, code).unwrap_or("Custom").to_string()
}
