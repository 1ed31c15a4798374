//! The game mount manager.
//!
//! Owns the registered [`GameMountInfo`] list, runs all mount I/O on a
//! single background worker thread and serves lookups over the resulting
//! set of [`MountedGame`]s.
//!
//! # Lifecycle
//!
//! ```text
//! new() ──mount_game()*──▶ registered ──initialize()──▶ worker running
//!                                             │
//!                 lookups join the worker ◀───┘──▶ serving
//! ```
//!
//! `mount_game` is rejected once the worker has been dispatched; the info
//! list is frozen from that point on. Every lookup implicitly waits for the
//! worker, so callers never observe a half-initialised mount set. Dropping
//! the manager requests cancellation, joins the worker and shuts the archive
//! backends down.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveBackend, ArchiveOpener};
use crate::game::MountedGame;
use crate::host::{join_logical, HostFilesystem, LoadedFile, StdFilesystem, VirtualFileStore};
use crate::mount::{EngineSettings, GameEngine, GameMountInfo, SourceEngineSettings};
use crate::steam;

#[cfg(feature = "bethesda")]
use crate::archive::BethesdaArchive;
#[cfg(feature = "bethesda")]
use crate::normalize;
#[cfg(feature = "bethesda")]
use std::path::Path;

/// This basename is shared across many Source games with disjoint contents,
/// so it is exempt from VPK deduplication.
const SHARED_VPK_BASENAME: &str = "pak01_dir.vpk";

/// Errors surfaced by the registration API.
#[derive(Debug, Error)]
pub enum MountError {
    /// `mount_game` was called after `initialize`; the mount list is frozen
    /// once the worker is dispatched.
    #[error("games cannot be mounted after the mount manager has been initialized")]
    MountAfterStart,

    /// The engine settings variant does not match the declared engine.
    #[error("engine settings for game '{identifier}' do not match engine '{engine}'")]
    EngineSettingsMismatch {
        identifier: String,
        engine: GameEngine,
    },
}

enum WorkerHandle {
    Idle,
    Running(JoinHandle<()>),
    Done,
}

/// Shared state accessed by both the API surface and the worker thread.
struct ManagerState {
    fs: Arc<dyn HostFilesystem>,
    opener: Arc<dyn ArchiveOpener>,
    virtual_files: Arc<VirtualFileStore>,
    infos: RwLock<Vec<GameMountInfo>>,
    games: RwLock<Vec<MountedGame>>,
    steam_roots: RwLock<Vec<PathBuf>>,
    steam_root_override: RwLock<Option<Vec<PathBuf>>>,
    /// Lowercased VPK basename → the path that won the mount.
    vpk_dedup: Mutex<HashMap<String, PathBuf>>,
    started: AtomicBool,
    cancel: AtomicBool,
    verbose: AtomicBool,
}

impl ManagerState {
    fn chatter(&self, message: impl FnOnce() -> String) {
        if self.verbose.load(Ordering::Relaxed) {
            info!("{}", message());
        } else {
            debug!("{}", message());
        }
    }
}

pub struct GameMountManager {
    state: Arc<ManagerState>,
    worker: Mutex<WorkerHandle>,
}

impl GameMountManager {
    /// Creates a manager over the default host filesystem.
    pub fn new(opener: Arc<dyn ArchiveOpener>) -> Self {
        Self::with_filesystem(opener, Arc::new(StdFilesystem))
    }

    /// Creates a manager with an injected host filesystem.
    pub fn with_filesystem(opener: Arc<dyn ArchiveOpener>, fs: Arc<dyn HostFilesystem>) -> Self {
        Self {
            state: Arc::new(ManagerState {
                fs,
                opener,
                virtual_files: Arc::new(VirtualFileStore::new()),
                infos: RwLock::new(Vec::new()),
                games: RwLock::new(Vec::new()),
                steam_roots: RwLock::new(Vec::new()),
                steam_root_override: RwLock::new(None),
                vpk_dedup: Mutex::new(HashMap::new()),
                started: AtomicBool::new(false),
                cancel: AtomicBool::new(false),
                verbose: AtomicBool::new(false),
            }),
            worker: Mutex::new(WorkerHandle::Idle),
        }
    }

    /// Promotes per-archive mount chatter from `debug` to `info`.
    pub fn set_verbose(&self, verbose: bool) {
        self.state.verbose.store(verbose, Ordering::Relaxed);
    }

    pub fn is_verbose(&self) -> bool {
        self.state.verbose.load(Ordering::Relaxed)
    }

    /// Overrides Steam root auto-discovery with an explicit list.
    pub fn set_steam_root_paths(&self, roots: Vec<PathBuf>) {
        *self.state.steam_root_override.write().unwrap() = Some(roots);
    }

    /// Steam roots in effect after initialisation.
    pub fn steam_root_paths(&self) -> Vec<PathBuf> {
        self.wait_until_initialized();
        self.state.steam_roots.read().unwrap().clone()
    }

    /// Registers a game for mounting. Only valid before [`initialize`].
    ///
    /// [`initialize`]: GameMountManager::initialize
    pub fn mount_game(&self, info: GameMountInfo) -> Result<(), MountError> {
        if self.state.started.load(Ordering::Acquire) {
            return Err(MountError::MountAfterStart);
        }
        if !info.settings_match_engine() {
            return Err(MountError::EngineSettingsMismatch {
                identifier: info.identifier.clone(),
                engine: info.game_engine,
            });
        }
        self.state.infos.write().unwrap().push(info);
        Ok(())
    }

    /// Dispatches the initialisation worker; with `wait` the call blocks
    /// until all mount I/O has finished.
    pub fn initialize(&self, wait: bool) {
        self.start();
        if wait {
            self.wait_until_initialized();
        }
    }

    fn start(&self) {
        let mut worker = self.worker.lock().unwrap();
        if self.state.started.swap(true, Ordering::AcqRel) {
            return;
        }
        let state = Arc::clone(&self.state);
        let spawned = std::thread::Builder::new()
            .name(String::from("gamemount-init"))
            .spawn(move || run_initialization(&state));
        match spawned {
            Ok(handle) => *worker = WorkerHandle::Running(handle),
            Err(error) => {
                warn!(%error, "failed to spawn mount initialisation thread");
                *worker = WorkerHandle::Done;
            }
        }
    }

    /// Blocks until the worker has finished. A no-op when initialisation has
    /// already completed or was never started.
    pub fn wait_until_initialized(&self) {
        let mut worker = self.worker.lock().unwrap();
        match std::mem::replace(&mut *worker, WorkerHandle::Done) {
            WorkerHandle::Running(handle) => {
                let _ = handle.join();
            }
            WorkerHandle::Idle => *worker = WorkerHandle::Idle,
            WorkerHandle::Done => {}
        }
    }

    /// Opens a logical path as a readable stream, searching mounted games in
    /// priority order. `game_identifier` restricts the search to one game.
    pub fn load(&self, path: &str, game_identifier: Option<&str>) -> Option<LoadedFile> {
        self.initialize(true);
        let games = self.state.games.read().unwrap();
        match game_identifier {
            Some(identifier) => self
                .mounted_game_by_identifier(&games, identifier)?
                .load_stream(path),
            None => games.iter().find_map(|game| game.load_stream(path)),
        }
    }

    /// Loads a logical path's bytes from disk or archives across all games.
    pub fn load_bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.initialize(true);
        let games = self.state.games.read().unwrap();
        games.iter().find_map(|game| {
            game.load_stream(path)
                .and_then(|stream| stream.read_all().ok())
        })
    }

    /// Wildcard search over the union of the mounted games; see
    /// [`MountedGame::find_files`]. Returns `false` when `game_identifier`
    /// names an unknown game.
    pub fn find_files(
        &self,
        pattern: &str,
        mut files: Option<&mut Vec<String>>,
        mut dirs: Option<&mut Vec<String>>,
        keep_abs_paths: bool,
        game_identifier: Option<&str>,
    ) -> bool {
        self.initialize(true);
        let games = self.state.games.read().unwrap();
        match game_identifier {
            Some(identifier) => {
                let Some(game) = self.mounted_game_by_identifier(&games, identifier) else {
                    return false;
                };
                game.find_files(pattern, files, dirs, keep_abs_paths);
                true
            }
            None => {
                for game in games.iter() {
                    game.find_files(
                        pattern,
                        files.as_deref_mut(),
                        dirs.as_deref_mut(),
                        keep_abs_paths,
                    );
                }
                true
            }
        }
    }

    /// The loose search paths of one mounted game.
    pub fn get_mounted_game_paths(&self, game_identifier: &str) -> Option<Vec<PathBuf>> {
        self.initialize(true);
        let games = self.state.games.read().unwrap();
        let game = self.mounted_game_by_identifier(&games, game_identifier)?;
        Some(game.mounted_paths().to_vec())
    }

    /// Identifiers of the mounted games, in current lookup order.
    pub fn mounted_game_identifiers(&self) -> Vec<String> {
        self.initialize(true);
        let games = self.state.games.read().unwrap();
        games.iter().map(|g| g.identifier().to_string()).collect()
    }

    pub fn get_mounted_game_priority(&self, game_identifier: &str) -> Option<i32> {
        self.initialize(true);
        let games = self.state.games.read().unwrap();
        let index = self
            .mounted_game_by_identifier(&games, game_identifier)?
            .info_index();
        drop(games);
        self.state.infos.read().unwrap().get(index).map(|i| i.priority)
    }

    /// Changes a game's priority and re-sorts the lookup order. Unknown
    /// identifiers are ignored.
    pub fn set_mounted_game_priority(&self, game_identifier: &str, priority: i32) {
        self.initialize(true);
        {
            let mut infos = self.state.infos.write().unwrap();
            let Some(info) = infos
                .iter_mut()
                .find(|info| info.matches_identifier(game_identifier))
            else {
                return;
            };
            info.priority = priority;
        }
        self.update_game_priorities();
    }

    /// Re-sorts the mounted games by descending priority. Ties keep their
    /// registration order.
    pub fn update_game_priorities(&self) {
        sort_games_by_priority(&self.state);
    }

    /// Snapshot of the registered mount infos, in registration order.
    pub fn get_game_mount_infos(&self) -> Vec<GameMountInfo> {
        self.state.infos.read().unwrap().clone()
    }

    /// Case-insensitive lookup of a registered mount info.
    pub fn find_game_mount_info(&self, identifier: &str) -> Option<GameMountInfo> {
        self.state
            .infos
            .read()
            .unwrap()
            .iter()
            .find(|info| info.matches_identifier(identifier))
            .cloned()
    }

    /// Access to the virtual-file registry populated by archive loads.
    pub fn virtual_files(&self) -> &VirtualFileStore {
        &self.state.virtual_files
    }

    /// Tears the manager down: cancels and joins the worker, then shuts the
    /// archive backends down. Equivalent to dropping the manager.
    pub fn close(self) {}

    fn mounted_game_by_identifier<'a>(
        &self,
        games: &'a [MountedGame],
        identifier: &str,
    ) -> Option<&'a MountedGame> {
        let index = {
            let infos = self.state.infos.read().unwrap();
            infos.iter().position(|info| info.matches_identifier(identifier))?
        };
        games.iter().find(|game| game.info_index() == index)
    }
}

impl Drop for GameMountManager {
    fn drop(&mut self) {
        self.state.cancel.store(true, Ordering::SeqCst);
        if let Ok(mut worker) = self.worker.lock() {
            if let WorkerHandle::Running(handle) =
                std::mem::replace(&mut *worker, WorkerHandle::Done)
            {
                let _ = handle.join();
            }
        }
        self.state.opener.shutdown();
    }
}

/// Worker entry point: backend init, Steam root resolution, then one
/// `initialize_game` per registered info, and a final priority sort.
fn run_initialization(state: &Arc<ManagerState>) {
    state.opener.initialize();

    let roots = match state.steam_root_override.read().unwrap().clone() {
        Some(roots) => roots,
        None => steam::locate_steam_roots(state.fs.as_ref()),
    };
    let infos = state.infos.read().unwrap().clone();
    if roots.is_empty() && !infos.iter().any(|info| info.absolute_path.is_some()) {
        debug!("no steam installation and no absolute game paths; nothing to mount");
        return;
    }
    state.chatter(|| format!("found {} steam location(s)", roots.len()));
    for root in &roots {
        state.chatter(|| format!("steam location: {}", root.display()));
    }
    *state.steam_roots.write().unwrap() = roots;

    for (index, info) in infos.iter().enumerate() {
        if state.cancel.load(Ordering::SeqCst) {
            return;
        }
        if !info.enabled {
            debug!(game = %info.identifier, "game is disabled, skipping");
            continue;
        }
        initialize_game(state, info, index);
    }

    if state.cancel.load(Ordering::SeqCst) {
        return;
    }
    sort_games_by_priority(state);
}

/// Stable descending-priority sort; ties keep registration order.
fn sort_games_by_priority(state: &ManagerState) {
    let priorities: Vec<i32> = {
        let infos = state.infos.read().unwrap();
        infos.iter().map(|info| info.priority).collect()
    };
    let mut games = state.games.write().unwrap();
    games.sort_by_key(|game| {
        std::cmp::Reverse(priorities.get(game.info_index()).copied().unwrap_or(0))
    });
}

/// Locates a game on disk and commits a [`MountedGame`] with all of its
/// archives. A game that cannot be located is skipped with a warning;
/// individual archive failures only lose that archive.
fn initialize_game(state: &Arc<ManagerState>, info: &GameMountInfo, info_index: usize) {
    let mut game_paths: Vec<PathBuf> = Vec::new();
    if let Some(steam_settings) = &info.steam_settings {
        state.chatter(|| {
            format!(
                "locating steam game directories for '{}'",
                info.identifier
            )
        });
        for relative in &steam_settings.game_paths {
            game_paths.extend(find_steam_game_paths(state, relative));
        }
    }
    if game_paths.is_empty() {
        if let Some(absolute) = &info.absolute_path {
            if state.fs.is_dir(absolute) {
                game_paths.push(absolute.clone());
            } else {
                warn!(
                    game = %info.identifier,
                    path = %absolute.display(),
                    "configured game directory does not exist"
                );
            }
        }
    }
    if game_paths.is_empty() {
        warn!(game = %info.identifier, "unable to locate any game directory, skipping");
        return;
    }

    let mut game = MountedGame::new(
        &info.identifier,
        info.game_engine,
        Arc::clone(&state.fs),
        Arc::clone(&state.virtual_files),
    );
    for path in &game_paths {
        state.chatter(|| format!("mounting '{}' from {}", info.identifier, path.display()));
        game.mount_path(path.clone());
    }

    match &info.engine_settings {
        Some(EngineSettings::Source(settings)) => {
            mount_vpk_archives(state, info, settings, &game_paths, &mut game);
        }
        #[cfg(feature = "bethesda")]
        Some(EngineSettings::Gamebryo(settings)) => {
            mount_bethesda_archives(
                state,
                info,
                settings.bsas.keys(),
                &game_paths,
                &mut game,
                |opener, path| opener.open_bsa(path),
                ArchiveBackend::Bsa,
            );
        }
        #[cfg(feature = "bethesda")]
        Some(EngineSettings::Creation(settings)) => {
            mount_bethesda_archives(
                state,
                info,
                settings.ba2s.keys(),
                &game_paths,
                &mut game,
                |opener, path| opener.open_ba2(path),
                ArchiveBackend::Ba2,
            );
        }
        None => {}
    }

    if let Some(steam_settings) = &info.steam_settings {
        if steam_settings.mount_workshop {
            if let Some(app_id) = steam_settings.app_id {
                mount_workshop_addons(state, &mut game, app_id);
            }
        }
    }

    game.set_info_index(info_index);
    state.games.write().unwrap().push(game);
}

/// Tries `steamapps/<relative>` under every Steam root and keeps the
/// existing directories.
fn find_steam_game_paths(state: &ManagerState, relative: &str) -> Vec<PathBuf> {
    let roots = state.steam_roots.read().unwrap();
    let mut found = Vec::new();
    for root in roots.iter() {
        let candidate = join_logical(&root.join("steamapps"), relative);
        let exists = state.fs.is_dir(&candidate);
        state.chatter(|| {
            format!(
                "checking '{}': {}",
                candidate.display(),
                if exists { "found" } else { "not found" }
            )
        });
        if exists {
            found.push(candidate);
        }
    }
    found
}

/// Opens and mounts the VPK archives declared by a Source-family game.
///
/// Each declared file is tried under every located game path until one
/// opens. Basenames are deduplicated manager-wide, with `pak01_dir.vpk`
/// exempt because it legitimately recurs across games.
fn mount_vpk_archives(
    state: &Arc<ManagerState>,
    info: &GameMountInfo,
    settings: &SourceEngineSettings,
    game_paths: &[PathBuf],
    game: &mut MountedGame,
) {
    if settings.vpks.is_empty() {
        return;
    }
    state.chatter(|| {
        format!(
            "mounting {} vpk archive(s) for '{}'",
            settings.vpks.len(),
            info.identifier
        )
    });
    for (file_name, vpk) in &settings.vpks {
        if state.cancel.load(Ordering::SeqCst) {
            return;
        }
        let mut found = false;
        for game_path in game_paths {
            let vpk_path = join_logical(game_path, file_name);
            let base_name = vpk_path
                .file_name()
                .map(|name| name.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default();
            if base_name != SHARED_VPK_BASENAME
                && state.vpk_dedup.lock().unwrap().contains_key(&base_name)
            {
                debug!(archive = %base_name, "vpk already mounted, skipping");
                continue;
            }
            let Some(archive) = state.opener.open_vpk(&vpk_path) else {
                continue;
            };
            found = true;
            state
                .vpk_dedup
                .lock()
                .unwrap()
                .insert(base_name, vpk_path.clone());
            state.chatter(|| format!("mounted vpk '{}'", vpk_path.display()));
            archive.set_root_directory(&vpk.root_dir);
            let tree = archive.root_directory();
            let table = game.add_archive_table(
                vpk_path.to_string_lossy().into_owned(),
                ArchiveBackend::Vpk(archive),
            );
            table.populate_from(&tree);
            break;
        }
        if !found {
            warn!(
                game = %info.identifier,
                archive = %file_name,
                "unable to find vpk archive"
            );
        }
    }
}

/// Opens and mounts Bethesda archives (BSA or BA2) for a game. Unlike the
/// VPK path, every located game directory contributes its copy.
#[cfg(feature = "bethesda")]
fn mount_bethesda_archives<'a>(
    state: &Arc<ManagerState>,
    info: &GameMountInfo,
    declared: impl Iterator<Item = &'a String>,
    game_paths: &[PathBuf],
    game: &mut MountedGame,
    open: impl Fn(&dyn ArchiveOpener, &Path) -> Option<Arc<dyn BethesdaArchive>>,
    backend: impl Fn(Arc<dyn BethesdaArchive>) -> ArchiveBackend,
) {
    for file_name in declared {
        if state.cancel.load(Ordering::SeqCst) {
            return;
        }
        let mut found = false;
        for game_path in game_paths {
            let archive_path = join_logical(game_path, file_name);
            let Some(archive) = open(state.opener.as_ref(), &archive_path) else {
                continue;
            };
            found = true;
            state.chatter(|| format!("mounted archive '{}'", archive_path.display()));
            let assets = archive.asset_paths();
            let table = game.add_archive_table(
                archive_path.to_string_lossy().into_owned(),
                backend(archive),
            );
            for asset in assets {
                table
                    .root
                    .add(&normalize::normalize_bethesda_path(&asset), false);
            }
        }
        if !found {
            warn!(
                game = %info.identifier,
                archive = %file_name,
                "unable to find archive"
            );
        }
    }
}

/// Scans `steamapps/workshop/content/<app_id>/` under every Steam root and
/// mounts each addon's VPK archives into the owning game.
fn mount_workshop_addons(state: &Arc<ManagerState>, game: &mut MountedGame, app_id: u32) {
    let roots = state.steam_roots.read().unwrap().clone();
    for root in roots {
        let content_dir = root
            .join("steamapps")
            .join("workshop")
            .join("content")
            .join(app_id.to_string());
        let mut addon_dirs = Vec::new();
        state.fs.find(&content_dir, "*", None, Some(&mut addon_dirs));
        if addon_dirs.is_empty() {
            continue;
        }
        state.chatter(|| {
            format!(
                "mounting {} workshop addon(s) in '{}'",
                addon_dirs.len(),
                content_dir.display()
            )
        });
        for addon in addon_dirs {
            if state.cancel.load(Ordering::SeqCst) {
                return;
            }
            let addon_path = content_dir.join(&addon);
            let mut vpk_files = Vec::new();
            state.fs.find(&addon_path, "*.vpk", Some(&mut vpk_files), None);
            for vpk_file in vpk_files {
                let vpk_path = addon_path.join(&vpk_file);
                let Some(archive) = state.opener.open_vpk(&vpk_path) else {
                    continue;
                };
                state.chatter(|| format!("mounted workshop vpk '{}'", vpk_path.display()));
                let tree = archive.root_directory();
                let table = game.add_archive_table(
                    vpk_path.to_string_lossy().into_owned(),
                    ArchiveBackend::Vpk(archive),
                );
                table.populate_from(&tree);
            }
        }
    }
}
