//! Path convention
//!
//! Category, contributor and third-party status are derived purely from the
//! segments of a logical path (always '/'-separated, relative to the source
//! root). Roots are located by the last occurrence of their marker, so a
//! path without any marker is treated as already relative to the root.

/// Marker of the third-party wavetable root
pub const THIRD_PARTY_WAVETABLES: &str = "wavetables_3rdparty";
/// Marker of the first-party wavetable root
pub const WAVETABLES: &str = "wavetables";
/// Marker of the third-party preset root
pub const THIRD_PARTY_PATCHES: &str = "patches_3rdparty";
/// Marker of the factory preset root
pub const FACTORY_PATCHES: &str = "patches_factory";

/// Category used for a first-party wavetable directly under the root
pub const ROOT_CATEGORY: &str = "root";
/// Category used when nothing better is known
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Where a wavetable sits in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavetablePlacement {
    pub category: String,
    pub contributor: Option<String>,
    pub is_third_party: bool,
}

/// Derive category and contributor of a wavetable from its path
///
/// Third-party: the first segment after the marker is the contributor; the
/// category is every directory segment after the marker (contributor
/// included), or "Uncategorized" for a file directly under the root.
/// First-party: no contributor; the category is every directory segment
/// after the plain root, or "root".
pub fn wavetable_placement(path: &str) -> WavetablePlacement {
    let is_third_party = path.contains(THIRD_PARTY_WAVETABLES);

    if is_third_party {
        let parts = segments_after(path, THIRD_PARTY_WAVETABLES);
        let (category, contributor) = match parts.split_last() {
            Some((_, dirs)) if !dirs.is_empty() => (dirs.join("/"), Some(dirs[0].to_string())),
            _ => (UNCATEGORIZED.to_string(), None),
        };
        WavetablePlacement {
            category,
            contributor,
            is_third_party,
        }
    } else {
        let parts = segments_after(path, WAVETABLES);
        let category = match parts.split_last() {
            Some((_, dirs)) if !dirs.is_empty() => dirs.join("/"),
            _ => ROOT_CATEGORY.to_string(),
        };
        WavetablePlacement {
            category,
            contributor: None,
            is_third_party,
        }
    }
}

/// Category implied by a preset's location under a patch root, if any
///
/// Only applies when the path is under a patch root and at least one
/// directory follows the marker.
pub fn preset_path_category(path: &str) -> Option<String> {
    let marker = if is_third_party_preset(path) {
        THIRD_PARTY_PATCHES
    } else if path.contains(FACTORY_PATCHES) {
        FACTORY_PATCHES
    } else {
        return None;
    };
    let parts = segments_after(path, marker);
    if parts.len() > 1 {
        Some(parts[0].to_string())
    } else {
        None
    }
}

pub fn is_third_party_preset(path: &str) -> bool {
    path.contains(THIRD_PARTY_PATCHES)
}

/// File name without its extension
pub fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    }
}

/// Lower-cased extension, if the file name has one
pub fn extension(path: &str) -> Option<String> {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(dot) => Some(name[dot + 1..].to_ascii_lowercase()),
    }
}

/// Name of the directory directly containing the file
pub fn parent_dir_name(path: &str) -> Option<&str> {
    let mut parts = path.rsplit('/');
    parts.next();
    parts.next().filter(|p| !p.is_empty())
}

/// Segments of `path` after the last `<marker>/`, or all segments when the
/// marker is absent
fn segments_after<'a>(path: &'a str, marker: &str) -> Vec<&'a str> {
    let needle = format!("{}/", marker);
    let rest = match path.rfind(&needle) {
        Some(pos) => &path[pos + needle.len()..],
        None => path,
    };
    rest.split('/').collect()
}
