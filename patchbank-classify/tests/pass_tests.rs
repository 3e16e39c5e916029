//! Classification pass integration tests
//!
//! Populate an asset store, run the pass into a fresh instrument store and
//! inspect the derived rows.

use patchbank_classify::db::{
    connect_readonly, load_preset_class, load_wavetable_sound_category, open_instrument_store,
    preset_tags, preset_wavetable_refs, INSTRUMENT_SCHEMA_VERSION,
};
use patchbank_classify::{ClassificationPass, Classifier, Ruleset, RulesetSpec};
use patchbank_common::db::{self, metadata};
use patchbank_common::identity::AssetIdentity;
use patchbank_common::models::{
    Asset, Ecosystem, EnvelopeSpec, OscillatorSpec, PresetAsset, WavetableAsset,
    DEFAULT_MASTER_TUNE, DEFAULT_MASTER_VOLUME, DEFAULT_POLYPHONY, DEFAULT_PORTAMENTO,
    DEFAULT_SAMPLE_RATE,
};
use sqlx::SqlitePool;
use tempfile::TempDir;

struct Stores {
    _dir: TempDir,
    assets: SqlitePool,
    instruments: SqlitePool,
}

async fn stores_with(assets: Vec<Asset>) -> Stores {
    let dir = TempDir::new().unwrap();
    let asset_path = dir.path().join("synth-assets.db");

    let writer = db::open_store(&asset_path).await.unwrap();
    db::write_batch(&writer, &assets).await.unwrap();
    writer.close().await;

    let assets = connect_readonly(&asset_path).await.unwrap();
    let instruments = open_instrument_store(&dir.path().join("synth-instruments.db"))
        .await
        .unwrap();
    Stores {
        _dir: dir,
        assets,
        instruments,
    }
}

fn wavetable(path: &str, name: &str, category: &str) -> Asset {
    let identity = AssetIdentity::derive(path, name.as_bytes());
    Asset::Wavetable(WavetableAsset {
        id: identity.id,
        content_hash: identity.content_hash,
        name: name.to_string(),
        source: Ecosystem::Surge,
        category: category.to_string(),
        path: path.to_string(),
        contributor: None,
        frame_count: 2,
        frame_size: 4,
        sample_rate: DEFAULT_SAMPLE_RATE,
        bit_depth: 32,
        is_third_party: false,
        samples: vec![0.0, 0.5, 0.0, -0.5, 0.0, 1.0, 0.0, -1.0],
        file_size: 48,
    })
}

fn preset(path: &str, name: &str, category: &str) -> PresetAsset {
    let identity = AssetIdentity::derive(path, name.as_bytes());
    PresetAsset {
        id: identity.id,
        content_hash: identity.content_hash,
        name: name.to_string(),
        source: Ecosystem::Vital,
        category: category.to_string(),
        path: path.to_string(),
        is_third_party: path.contains("patches_3rdparty"),
        author: None,
        description: None,
        tags: Vec::new(),
        oscillators: Vec::new(),
        filters: Vec::new(),
        envelopes: Vec::new(),
        lfos: Vec::new(),
        modulations: Vec::new(),
        effects: Vec::new(),
        master_volume: DEFAULT_MASTER_VOLUME,
        master_tune: DEFAULT_MASTER_TUNE,
        polyphony: DEFAULT_POLYPHONY,
        portamento: DEFAULT_PORTAMENTO,
        raw_excerpt: None,
        file_size: 100,
    }
}

fn id_of(asset: &Asset) -> String {
    asset.id().to_string()
}

fn builtin() -> Classifier {
    Classifier::new(Ruleset::builtin().unwrap())
}

#[tokio::test]
async fn test_presets_and_wavetables_are_classified() {
    let mut pluck = preset("presets/Keys/untitled.vital", "Untitled", "Keys Misc");
    pluck.envelopes = vec![EnvelopeSpec {
        attack: 0.005,
        decay: 0.1,
        sustain: 0.1,
        release: 0.1,
        ..EnvelopeSpec::new("env_1")
    }];
    let pluck = Asset::Preset(pluck);
    let bass = Asset::Preset(preset("presets/x/deep.vital", "Deep Sub Bass", ""));
    let saw = wavetable("wavetables/basic/saw.wt", "Warm Saw", "basic");

    let stores = stores_with(vec![pluck.clone(), bass.clone(), saw.clone()]).await;
    let classifier = builtin();
    let summary = ClassificationPass::new(&stores.assets, &stores.instruments, &classifier)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.presets, 2);
    assert_eq!(summary.wavetables, 1);
    assert_eq!(summary.presets_in("pluck"), 1);
    assert_eq!(summary.presets_in("bass"), 1);
    assert_eq!(summary.presets_in("other"), 0);

    let class = load_preset_class(&stores.instruments, &id_of(&bass))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(class.category_id, "bass");
    assert_eq!(class.subcategory_id.as_deref(), Some("sub-bass"));
    assert_eq!(class.original_source, "vital");

    // "Keys Misc" has no whole-word keyword; the envelope decides
    let class = load_preset_class(&stores.instruments, &id_of(&pluck))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(class.category_id, "pluck");
    assert_eq!(class.original_category, "Keys Misc");

    let sound = load_wavetable_sound_category(&stores.instruments, &id_of(&saw))
        .await
        .unwrap();
    assert_eq!(sound.as_deref(), Some("basic"));
}

#[tokio::test]
async fn test_third_party_flag_is_carried_over() {
    let mut third = preset("patches_3rdparty/Alice/Bass/Growl.fxp", "Growl", "Alice");
    third.source = Ecosystem::Surge;
    let factory = preset("presets/Bass/Sub.vital", "Sub", "Bass");
    assert!(third.is_third_party);

    let stores =
        stores_with(vec![Asset::Preset(third.clone()), Asset::Preset(factory.clone())]).await;
    let classifier = builtin();
    ClassificationPass::new(&stores.assets, &stores.instruments, &classifier)
        .run()
        .await
        .unwrap();

    let class = load_preset_class(&stores.instruments, &third.id).await.unwrap().unwrap();
    assert!(class.is_third_party);
    assert_eq!(class.original_source, "surge");
    let class = load_preset_class(&stores.instruments, &factory.id).await.unwrap().unwrap();
    assert!(!class.is_third_party);
}

#[tokio::test]
async fn test_references_and_tags_are_derived() {
    let mut p = preset("presets/Lead/Stack.vital", "Stack", "Lead");
    let mut osc1 = OscillatorSpec::new(0, 2, "Wavetable");
    osc1.wavetable_name = Some("Basic Shapes".to_string());
    let osc2 = OscillatorSpec::new(1, 2, "Wavetable");
    let mut osc3 = OscillatorSpec::new(2, 2, "Wavetable");
    osc3.wavetable_name = Some("Harmonic Series".to_string());
    p.oscillators = vec![osc1, osc2, osc3];
    p.tags = vec!["Bright".to_string(), "bright".to_string(), "".to_string(), "Mono".to_string()];
    let id = p.id.clone();

    let stores = stores_with(vec![Asset::Preset(p)]).await;
    let classifier = builtin();
    let summary = ClassificationPass::new(&stores.assets, &stores.instruments, &classifier)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.wavetable_refs, 2);
    assert_eq!(summary.tags, 2);

    let refs = preset_wavetable_refs(&stores.instruments, &id).await.unwrap();
    assert_eq!(
        refs,
        vec![(0, "Basic Shapes".to_string()), (2, "Harmonic Series".to_string())]
    );
    let tags = preset_tags(&stores.instruments, &id).await.unwrap();
    assert_eq!(tags, vec!["bright".to_string(), "mono".to_string()]);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let mut p = preset("presets/Pad/Glass.vital", "Glass Pad", "Pad");
    let mut osc = OscillatorSpec::new(0, 2, "Wavetable");
    osc.wavetable_name = Some("Glass".to_string());
    p.oscillators = vec![osc];
    p.tags = vec!["Airy".to_string()];

    let stores = stores_with(vec![
        Asset::Preset(p),
        wavetable("wavetables/vox/choir.wt", "Choir", "vox"),
    ])
    .await;
    let classifier = builtin();
    let pass = ClassificationPass::new(&stores.assets, &stores.instruments, &classifier);

    let first = pass.run().await.unwrap();
    let snapshot = |pool: SqlitePool| async move {
        let presets: Vec<(String, String, Option<String>)> = sqlx::query_as(
            "SELECT id, category_id, subcategory_id FROM presets ORDER BY id",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let refs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM preset_wavetables")
            .fetch_one(&pool)
            .await
            .unwrap();
        let tags: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM preset_tags")
            .fetch_one(&pool)
            .await
            .unwrap();
        (presets, refs, tags)
    };
    let before = snapshot(stores.instruments.clone()).await;

    let second = pass.run().await.unwrap();
    let after = snapshot(stores.instruments.clone()).await;

    assert_eq!(first, second);
    assert_eq!(before, after);
    assert_eq!(after.1, 1);
    assert_eq!(after.2, 1);
}

#[tokio::test]
async fn test_provenance_is_recorded() {
    let stores = stores_with(vec![
        Asset::Preset(preset("presets/a.vital", "Lead One", "")),
        wavetable("wavetables/a.wt", "Sine", ""),
    ])
    .await;
    let classifier = builtin();
    ClassificationPass::new(&stores.assets, &stores.instruments, &classifier)
        .run()
        .await
        .unwrap();

    let get = |key| db::get_metadata(&stores.instruments, key);
    assert_eq!(
        get(metadata::KEY_VERSION).await.unwrap().as_deref(),
        Some(INSTRUMENT_SCHEMA_VERSION)
    );
    assert_eq!(get(metadata::KEY_TOTAL_PRESETS).await.unwrap().as_deref(), Some("1"));
    assert_eq!(get(metadata::KEY_TOTAL_WAVETABLES).await.unwrap().as_deref(), Some("1"));
    assert!(get(metadata::KEY_LAST_UPDATED).await.unwrap().is_some());
}

#[tokio::test]
async fn test_asset_store_is_left_untouched() {
    let stores = stores_with(vec![Asset::Preset(preset("presets/a.vital", "Lead One", ""))]).await;
    let classifier = builtin();
    ClassificationPass::new(&stores.assets, &stores.instruments, &classifier)
        .run()
        .await
        .unwrap();

    // Schema A has no taxonomy columns and still holds the original row
    let category: String = sqlx::query_scalar("SELECT category FROM presets")
        .fetch_one(&stores.assets)
        .await
        .unwrap();
    assert_eq!(category, "");
    let has_taxonomy: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE name = 'categories'")
            .fetch_one(&stores.assets)
            .await
            .unwrap();
    assert_eq!(has_taxonomy, 0);
}

#[tokio::test]
async fn test_custom_ruleset_drives_the_pass() {
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

        [wavetables]
        fallback = "unsorted"
        "#,
    )
    .unwrap();
    let classifier = Classifier::new(Ruleset::compile(&spec).unwrap());

    let bass = Asset::Preset(preset("presets/b.vital", "Big Bass", ""));
    let lead = Asset::Preset(preset("presets/l.vital", "Lead One", ""));
    let wt = wavetable("wavetables/s.wt", "Sine", "");
    let stores = stores_with(vec![bass.clone(), lead.clone(), wt.clone()]).await;

    let summary = ClassificationPass::new(&stores.assets, &stores.instruments, &classifier)
        .run()
        .await
        .unwrap();
    assert_eq!(summary.presets_in("bass"), 1);
    assert_eq!(summary.presets_in("misc"), 1);

    let class = load_preset_class(&stores.instruments, &id_of(&lead))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(class.subcategory_id.as_deref(), Some("generic-misc"));
    assert_eq!(
        load_wavetable_sound_category(&stores.instruments, &id_of(&wt))
            .await
            .unwrap()
            .as_deref(),
        Some("unsorted")
    );
}
