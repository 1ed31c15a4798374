//! Engine-specific logical path normalisation.
//!
//! Every lookup against a mounted game goes through one of the normalisers in
//! this module before it touches disk or an archive table. All of them share
//! the same pre-step: fold to lowercase, unify separators and drop redundant
//! `.` / `..` segments. On top of that each engine family has its own quirks:
//!
//! - **Source engine** keeps a leading `..` (a deliberate root escape) and
//!   rewrites a leading `sounds` directory to `sound`. Output uses forward
//!   slashes.
//! - **Gamebryo / Creation Engine** remap the Source-style content folders
//!   (`sounds` → `sound`, `materials` → `textures`, `models` dropped) and
//!   emit backslash separators, because the Bethesda archive formats key
//!   their name tables on backslash-separated paths.
//!
//! Normalisation is a pure string transformation; it never touches the
//! filesystem. All three normalisers are idempotent.

use crate::mount::GameEngine;

/// Splits a path on both separator styles, lowercases each component and
/// resolves `.` / `..` segments. A `..` that cannot be resolved (nothing left
/// to pop) is kept, so root-escaping paths survive the round trip.
fn canonical_components(path: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for component in path.split(['/', '\\']) {
        if component.is_empty() || component == "." {
            continue;
        }
        if component == ".." {
            match out.last() {
                Some(last) if last != ".." => {
                    out.pop();
                }
                _ => out.push(String::from("..")),
            }
            continue;
        }
        out.push(component.to_ascii_lowercase());
    }
    out
}

/// Plain normalisation: lowercase, forward slashes, dot segments removed.
///
/// This is the form archive file tables are keyed on.
pub fn normalize_path(path: &str) -> String {
    canonical_components(path).join("/")
}

/// Source-engine normalisation.
///
/// A path whose first component is literally `..` escapes the game root; the
/// escape survives canonicalisation as exactly one `../` prefix, however
/// many levels the input had. A leading `sounds` directory is rewritten to
/// `sound`.
pub fn normalize_source_path(path: &str) -> String {
    let escapes_root = path
        .split(['/', '\\'])
        .find(|c| !c.is_empty())
        .is_some_and(|c| c == "..");
    let mut components = canonical_components(path);
    // Canonicalisation reduces: surplus leading escapes are dropped and the
    // single re-prefixed one below stands in for all of them.
    while components.first().map(String::as_str) == Some("..") {
        components.remove(0);
    }
    if escapes_root {
        components.insert(0, String::from(".."));
    }
    rewrite_front(&mut components, "sounds", "sound");
    components.join("/")
}

/// Gamebryo / Creation Engine normalisation.
///
/// Applies the Bethesda directory aliases and emits backslash separators.
#[cfg(feature = "bethesda")]
pub fn normalize_bethesda_path(path: &str) -> String {
    let mut components = canonical_components(path);
    match components.first().map(String::as_str) {
        Some("sounds") => components[0] = String::from("sound"),
        Some("materials") => components[0] = String::from("textures"),
        Some("models") => {
            components.remove(0);
        }
        _ => {}
    }
    components.join("\\")
}

/// Normalises a logical path for the given engine family.
///
/// `Other` and `Invalid` fall back to the plain normaliser.
pub fn normalize_for_engine(engine: GameEngine, path: &str) -> String {
    match engine {
        GameEngine::SourceEngine | GameEngine::Source2 => normalize_source_path(path),
        #[cfg(feature = "bethesda")]
        GameEngine::Gamebryo | GameEngine::CreationEngine => normalize_bethesda_path(path),
        _ => normalize_path(path),
    }
}

fn rewrite_front(components: &mut [String], from: &str, to: &str) {
    if let Some(first) = components.first_mut() {
        if first == from {
            *first = String::from(to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lowercases_and_unifies_separators() {
        assert_eq!(normalize_path("Materials\\Foo.VMT"), "materials/foo.vmt");
        assert_eq!(normalize_path("a//b/./c"), "a/b/c");
    }

    #[test]
    fn plain_resolves_dot_dot() {
        assert_eq!(normalize_path("a/b/../c"), "a/c");
        assert_eq!(normalize_path("../a"), "../a");
        assert_eq!(normalize_path("a/../../b"), "../b");
    }

    #[test]
    fn source_rewrites_leading_sounds() {
        assert_eq!(
            normalize_source_path("sounds/music/bar.wav"),
            "sound/music/bar.wav"
        );
        // Only the leading component is rewritten.
        assert_eq!(
            normalize_source_path("maps/sounds/x.wav"),
            "maps/sounds/x.wav"
        );
    }

    #[test]
    fn source_preserves_root_escape() {
        assert_eq!(normalize_source_path("../maps/a.bsp"), "../maps/a.bsp");
        assert_eq!(normalize_source_path("..\\Maps\\A.bsp"), "../maps/a.bsp");
    }

    #[test]
    fn source_collapses_multi_level_escapes() {
        assert_eq!(normalize_source_path("../../maps/a.bsp"), "../maps/a.bsp");
        assert_eq!(
            normalize_source_path("..\\..\\..\\materials\\b.vmt"),
            "../materials/b.vmt"
        );
        // Only a literal leading `..` marks a root escape; escapes that
        // merely bubble up to the front during reduction are dropped.
        assert_eq!(normalize_source_path("a/../../../b"), "b");
    }

    #[cfg(feature = "bethesda")]
    #[test]
    fn bethesda_applies_aliases() {
        assert_eq!(
            normalize_bethesda_path("materials/art/tree.dds"),
            "textures\\art\\tree.dds"
        );
        assert_eq!(
            normalize_bethesda_path("sounds/fx/hit.wav"),
            "sound\\fx\\hit.wav"
        );
        assert_eq!(
            normalize_bethesda_path("models/creatures/dog.nif"),
            "creatures\\dog.nif"
        );
    }

    #[cfg(feature = "bethesda")]
    #[test]
    fn bethesda_emits_backslashes_only() {
        let out = normalize_bethesda_path("Meshes/Landscape/Plants/Marshberry02.nif");
        assert!(!out.contains('/'));
        assert_eq!(out, "meshes\\landscape\\plants\\marshberry02.nif");
    }

    #[test]
    fn normalisers_are_idempotent() {
        let samples = [
            "Materials\\Foo.VMT",
            "sounds/music/bar.wav",
            "../maps/a.bsp",
            "models/props/x.mdl",
            "a/b/../c/./d",
        ];
        for sample in samples {
            let plain = normalize_path(sample);
            assert_eq!(normalize_path(&plain), plain);
            let source = normalize_source_path(sample);
            assert_eq!(normalize_source_path(&source), source);
            #[cfg(feature = "bethesda")]
            {
                let bethesda = normalize_bethesda_path(sample);
                assert_eq!(normalize_bethesda_path(&bethesda), bethesda);
            }
        }
    }

    #[test]
    fn engine_dispatch_matches_family() {
        assert_eq!(
            normalize_for_engine(GameEngine::Source2, "sounds/a.wav"),
            "sound/a.wav"
        );
        assert_eq!(
            normalize_for_engine(GameEngine::Other, "Sounds/A.wav"),
            "sounds/a.wav"
        );
        #[cfg(feature = "bethesda")]
        assert_eq!(
            normalize_for_engine(GameEngine::Gamebryo, "materials/a.dds"),
            "textures\\a.dds"
        );
    }
}
