//! End-to-end coverage of the theme/wallpaper state machine against a
//! real on-disk config document, with the compositor and notification
//! daemon replaced by recording fakes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use theming::error::{Error, Result};
use theming::{
    ConfigStore, Notify, Paths, SessionMode, Theme, ThemeManager, ThemeOption, WallpaperBackend,
};

#[derive(Clone, Default)]
struct RecordingBackend {
    applied: Arc<Mutex<Vec<PathBuf>>>,
}

impl WallpaperBackend for RecordingBackend {
    fn apply(&self, _session: SessionMode, wallpaper: &Path) -> Result<()> {
        self.applied.lock().unwrap().push(wallpaper.to_path_buf());
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl Notify for RecordingNotifier {
    fn send(&self, summary: &str, body: &str, _critical: bool) {
        self.messages
            .lock()
            .unwrap()
            .push(format!("{summary}: {body}"));
    }
}

impl RecordingNotifier {
    fn contains(&self, needle: &str) -> bool {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .any(|message| message.contains(needle))
    }
}

struct Fixture {
    tmp: TempDir,
    paths: Paths,
    backend: RecordingBackend,
    notifier: RecordingNotifier,
}

impl Fixture {
    fn new(config: &str, files: &[&str]) -> Self {
        let tmp = TempDir::new().unwrap();
        let paths = Paths::with_home(tmp.path().to_path_buf());
        fs::create_dir_all(&paths.meowrch_dir).unwrap();
        for file in files {
            let path = tmp.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"").unwrap();
        }
        fs::write(&paths.config_file, config).unwrap();
        Self {
            tmp,
            paths,
            backend: RecordingBackend::default(),
            notifier: RecordingNotifier::default(),
        }
    }

    fn store(&self) -> ConfigStore {
        ConfigStore::new(self.paths.clone(), SessionMode::X11)
    }

    fn manager(&self) -> Result<ThemeManager> {
        self.manager_with_options(Vec::new())
    }

    fn manager_with_options(&self, options: Vec<Box<dyn ThemeOption>>) -> Result<ThemeManager> {
        ThemeManager::new(
            self.store(),
            self.paths.clone(),
            options,
            Box::new(self.backend.clone()),
            Box::new(self.notifier.clone()),
        )
    }

    fn file(&self, rel: &str) -> PathBuf {
        self.tmp.path().join(rel)
    }

    fn applied(&self) -> Vec<PathBuf> {
        self.backend.applied.lock().unwrap().clone()
    }
}

const TWO_WALLPAPERS: &str = "\
current-xtheme: dark
current-xwallpaper: ~/walls/b.png
custom-wallpapers: []
themes:
  dark:
    available_wallpapers:
      - ~/walls/a.png
      - ~/walls/b.png
";

const SINGLE_WALLPAPER: &str = "\
current-xtheme: dark
current-xwallpaper: ~/walls/a.png
custom-wallpapers: []
themes:
  dark:
    available_wallpapers:
      - ~/walls/a.png
";

#[test]
fn adopts_valid_pointers_without_fallback() {
    let fixture = Fixture::new(TWO_WALLPAPERS, &["walls/a.png", "walls/b.png"]);
    let manager = fixture.manager().unwrap();

    assert_eq!(manager.current_theme().name, "dark");
    assert!(fixture.applied().is_empty());
    assert_eq!(
        fixture.store().current_wallpaper().unwrap(),
        Some(fixture.file("walls/b.png"))
    );
}

#[test]
fn stale_wallpaper_pointer_falls_back_to_the_only_survivor() {
    // b.png is the persisted pointer but no longer exists on disk.
    let fixture = Fixture::new(TWO_WALLPAPERS, &["walls/a.png"]);
    let manager = fixture.manager().unwrap();

    assert_eq!(manager.current_theme().name, "dark");
    assert_eq!(fixture.applied(), vec![fixture.file("walls/a.png")]);
    assert_eq!(
        fixture.store().current_wallpaper().unwrap(),
        Some(fixture.file("walls/a.png"))
    );
}

#[test]
fn unknown_theme_pointer_falls_back_to_a_random_theme() {
    let config = TWO_WALLPAPERS.replace("current-xtheme: dark", "current-xtheme: ghost");
    let fixture = Fixture::new(&config, &["walls/a.png", "walls/b.png"]);
    let manager = fixture.manager().unwrap();

    assert_eq!(manager.current_theme().name, "dark");
    assert_eq!(
        fixture.store().current_theme().unwrap(),
        Some("dark".to_string())
    );
    // The persisted wallpaper already belongs to the adopted theme.
    assert!(fixture.applied().is_empty());
}

#[test]
fn catalog_only_contains_existing_wallpapers() {
    let fixture = Fixture::new(TWO_WALLPAPERS, &["walls/a.png", "walls/b.png"]);
    let manager = fixture.manager().unwrap();

    for theme in manager.catalog() {
        assert!(!theme.available_wallpapers.is_empty());
        assert!(theme.available_wallpapers.iter().all(|w| w.exists()));
    }
}

#[test]
fn empty_catalog_is_fatal() {
    let fixture = Fixture::new(TWO_WALLPAPERS, &[]);
    assert!(matches!(
        fixture.manager(),
        Err(Error::NoThemesAvailable)
    ));
    assert!(fixture.notifier.contains("no themes available"));
}

#[test]
fn removing_the_last_wallpaper_is_refused() {
    let fixture = Fixture::new(SINGLE_WALLPAPER, &["walls/a.png"]);
    let mut manager = fixture.manager().unwrap();
    let before = fixture.store().load().unwrap();

    assert!(!manager.remove_wallpaper(&fixture.file("walls/a.png"), None));
    assert_eq!(
        manager.current_theme().available_wallpapers,
        vec![fixture.file("walls/a.png")]
    );
    assert_eq!(fixture.store().load().unwrap(), before);
    assert!(fixture.notifier.contains("Cannot remove the last wallpaper"));
}

#[test]
fn removing_one_of_two_wallpapers_succeeds() {
    let fixture = Fixture::new(TWO_WALLPAPERS, &["walls/a.png", "walls/b.png"]);
    let mut manager = fixture.manager().unwrap();

    assert!(manager.remove_wallpaper(&fixture.file("walls/a.png"), None));
    assert_eq!(
        manager.current_theme().available_wallpapers,
        vec![fixture.file("walls/b.png")]
    );
    let document = fixture.store().load().unwrap();
    assert_eq!(
        document.themes["dark"].available_wallpapers,
        vec!["~/walls/b.png".to_string()]
    );
    // The active wallpaper was b.png, so nothing was re-applied.
    assert!(fixture.applied().is_empty());
}

#[test]
fn removing_the_active_wallpaper_applies_a_random_replacement() {
    let fixture = Fixture::new(TWO_WALLPAPERS, &["walls/a.png", "walls/b.png"]);
    let mut manager = fixture.manager().unwrap();

    assert!(manager.remove_wallpaper(&fixture.file("walls/b.png"), None));
    assert_eq!(fixture.applied(), vec![fixture.file("walls/a.png")]);
    assert_eq!(
        fixture.store().current_wallpaper().unwrap(),
        Some(fixture.file("walls/a.png"))
    );
}

#[test]
fn add_then_remove_round_trips_the_wallpaper_set() {
    let fixture = Fixture::new(
        TWO_WALLPAPERS,
        &["walls/a.png", "walls/b.png", "walls/c.png"],
    );
    let mut manager = fixture.manager().unwrap();
    let document_before = fixture.store().load().unwrap();
    let wallpapers_before = manager.current_theme().available_wallpapers.clone();

    assert!(manager.add_wallpaper(&fixture.file("walls/c.png"), None));
    assert!(manager.remove_wallpaper(&fixture.file("walls/c.png"), None));

    assert_eq!(manager.current_theme().available_wallpapers, wallpapers_before);
    assert_eq!(fixture.store().load().unwrap(), document_before);
}

#[test]
fn adding_a_present_wallpaper_is_an_idempotent_success() {
    let fixture = Fixture::new(TWO_WALLPAPERS, &["walls/a.png", "walls/b.png"]);
    let mut manager = fixture.manager().unwrap();
    let document_before = fixture.store().load().unwrap();
    let wallpapers_before = manager.current_theme().available_wallpapers.clone();

    assert!(manager.add_wallpaper(&fixture.file("walls/a.png"), None));
    assert_eq!(manager.current_theme().available_wallpapers, wallpapers_before);
    assert_eq!(fixture.store().load().unwrap(), document_before);
}

#[test]
fn add_rejects_unknown_themes_and_bad_files() {
    let fixture = Fixture::new(TWO_WALLPAPERS, &["walls/a.png", "walls/b.png", "notes.txt"]);
    let mut manager = fixture.manager().unwrap();

    assert!(!manager.add_wallpaper(&fixture.file("walls/a.png"), Some("ghost")));
    assert!(fixture.notifier.contains("Theme 'ghost' not found"));

    assert!(!manager.add_wallpaper(&fixture.file("notes.txt"), None));
    assert!(fixture.notifier.contains("Invalid image format"));

    assert!(!manager.add_wallpaper(&fixture.file("walls/missing.png"), None));
    assert!(fixture.notifier.contains("Wallpaper file not found"));
}

#[test]
fn failed_persistence_rolls_back_the_in_memory_catalog() {
    let fixture = Fixture::new(
        TWO_WALLPAPERS,
        &["walls/a.png", "walls/b.png", "walls/c.png"],
    );
    let mut manager = fixture.manager().unwrap();
    let wallpapers_before = manager.current_theme().available_wallpapers.clone();

    // Sabotage persistence: the store refuses to write a missing file.
    fs::remove_file(&fixture.paths.config_file).unwrap();

    assert!(!manager.add_wallpaper(&fixture.file("walls/c.png"), None));
    assert_eq!(manager.current_theme().available_wallpapers, wallpapers_before);
    assert!(fixture.notifier.contains("Failed to update configuration"));
}

#[test]
fn random_pick_over_a_singleton_catalog_is_deterministic() {
    let fixture = Fixture::new(SINGLE_WALLPAPER, &["walls/a.png"]);
    let mut manager = fixture.manager().unwrap();

    manager.set_random_theme().unwrap();
    assert_eq!(manager.current_theme().name, "dark");

    manager.set_random_wallpaper();
    assert_eq!(fixture.applied(), vec![fixture.file("walls/a.png")]);
}

#[test]
fn unknown_theme_name_is_reported_and_leaves_state_unchanged() {
    let fixture = Fixture::new(TWO_WALLPAPERS, &["walls/a.png", "walls/b.png"]);
    let mut manager = fixture.manager().unwrap();

    manager.set_theme("ghost").unwrap();
    assert_eq!(manager.current_theme().name, "dark");
    assert_eq!(
        fixture.store().current_theme().unwrap(),
        Some("dark".to_string())
    );
    assert!(fixture.notifier.contains("Theme 'ghost' not found"));
}

#[test]
fn set_current_wallpaper_reapplies_a_valid_pointer() {
    let fixture = Fixture::new(TWO_WALLPAPERS, &["walls/a.png", "walls/b.png"]);
    let mut manager = fixture.manager().unwrap();

    manager.set_current_wallpaper().unwrap();
    assert_eq!(fixture.applied(), vec![fixture.file("walls/b.png")]);
}

struct FlakyOption {
    id: String,
    fail: bool,
    seen: Arc<Mutex<Vec<String>>>,
}

impl ThemeOption for FlakyOption {
    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&self, theme: &str) -> Result<()> {
        self.seen.lock().unwrap().push(format!("{}:{theme}", self.id));
        if self.fail {
            Err(Error::Validation(format!("{} exploded", self.id)))
        } else {
            Ok(())
        }
    }
}

#[test]
fn a_failing_option_does_not_block_the_others() {
    let fixture = Fixture::new(TWO_WALLPAPERS, &["walls/a.png", "walls/b.png"]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let options: Vec<Box<dyn ThemeOption>> = vec![
        Box::new(FlakyOption {
            id: "first".into(),
            fail: true,
            seen: seen.clone(),
        }),
        Box::new(FlakyOption {
            id: "second".into(),
            fail: false,
            seen: seen.clone(),
        }),
    ];
    let mut manager = fixture.manager_with_options(options).unwrap();

    manager.set_theme("dark").unwrap();
    assert_eq!(
        seen.lock().unwrap().clone(),
        vec!["first:dark".to_string(), "second:dark".to_string()]
    );
    assert_eq!(
        fixture.store().current_theme().unwrap(),
        Some("dark".to_string())
    );
}

#[test]
fn imported_wallpapers_get_a_collision_safe_name() {
    let fixture = Fixture::new(
        TWO_WALLPAPERS,
        &["walls/a.png", "walls/b.png", "downloads/cat.png", "other/cat.png"],
    );
    let manager = fixture.manager().unwrap();

    let first = manager
        .import_wallpaper_file(&fixture.file("downloads/cat.png"))
        .unwrap();
    let second = manager
        .import_wallpaper_file(&fixture.file("other/cat.png"))
        .unwrap();

    assert_eq!(first, fixture.paths.wallpapers_dir.join("cat.png"));
    assert_eq!(second, fixture.paths.wallpapers_dir.join("cat_1.png"));
    assert!(first.is_file());
    assert!(second.is_file());
}

#[test]
fn catalog_themes_expose_their_wallpapers() {
    let fixture = Fixture::new(TWO_WALLPAPERS, &["walls/a.png", "walls/b.png"]);
    let manager = fixture.manager().unwrap();
    let theme: &Theme = manager.current_theme();
    assert!(theme.has_wallpaper(&fixture.file("walls/a.png")));
    assert!(!theme.has_wallpaper(&fixture.file("walls/ghost.png")));
}
