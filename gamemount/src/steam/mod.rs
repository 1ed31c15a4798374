//! Steam installation discovery.
//!
//! Finds the primary Steam root (registry key on Windows, the
//! `~/.steam/root` symlink elsewhere) and any additional library locations
//! declared in `steamapps/libraryfolders.vdf`. Discovery is best-effort: a
//! missing installation or a malformed library file simply shrinks the
//! result, it never fails the caller.

pub mod vdf;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::host::HostFilesystem;

/// Resolves all Steam root directories: the primary installation followed by
/// any additional library locations it declares.
///
/// Returns an empty list when no Steam installation can be found. Paths are
/// returned as discovered; existence of game directories underneath them is
/// checked later by the mount worker.
pub fn locate_steam_roots(fs: &dyn HostFilesystem) -> Vec<PathBuf> {
    let Some(primary) = primary_steam_root(fs) else {
        debug!("no steam installation found");
        return Vec::new();
    };
    let mut roots = vec![primary.clone()];
    roots.extend(external_library_roots(fs, &primary));
    roots
}

/// Reads `steamapps/libraryfolders.vdf` under `steam_root` and returns the
/// additional library locations it lists. Parse failures are logged and
/// treated as "no additional roots".
pub fn external_library_roots(fs: &dyn HostFilesystem, steam_root: &Path) -> Vec<PathBuf> {
    let vdf_path = steam_root.join("steamapps").join("libraryfolders.vdf");
    let Some(contents) = fs.read_to_string(&vdf_path) else {
        return Vec::new();
    };
    match vdf::external_steam_locations(&contents) {
        Ok(locations) => locations.into_iter().map(PathBuf::from).collect(),
        Err(error) => {
            warn!(
                path = %vdf_path.display(),
                %error,
                "failed to parse steam library folders"
            );
            Vec::new()
        }
    }
}

#[cfg(target_os = "windows")]
fn primary_steam_root(_fs: &dyn HostFilesystem) -> Option<PathBuf> {
    use winreg::enums::HKEY_CURRENT_USER;
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let key = hkcu.open_subkey("SOFTWARE\\Valve\\Steam").ok()?;
    let path: String = key.get_value("SteamPath").ok()?;
    Some(PathBuf::from(path))
}

#[cfg(not(target_os = "windows"))]
fn primary_steam_root(fs: &dyn HostFilesystem) -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    fs.resolve_link(&home.join(".steam").join("root"))
}
