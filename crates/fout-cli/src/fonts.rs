//! Native font detection: wait for a matching font file to show up in a set
//! of font directories.

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fout_core::{DetectionError, FontFace, FontWatcher};

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc", "woff", "woff2"];

/// Subdirectory depth searched below each font directory.
const MAX_DEPTH: usize = 6;

pub const DEFAULT_POLL: Duration = Duration::from_millis(50);

/// User font dir plus the platform's system font directories.
pub fn default_font_dirs() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = dirs::font_dir().into_iter().collect();
    if cfg!(target_os = "macos") {
        paths.push(PathBuf::from("/Library/Fonts"));
        paths.push(PathBuf::from("/System/Library/Fonts"));
    } else if cfg!(windows) {
        let windir = std::env::var_os("WINDIR").unwrap_or_else(|| "C:\\Windows".into());
        paths.push(PathBuf::from(windir).join("Fonts"));
    } else {
        paths.push(PathBuf::from("/usr/share/fonts"));
        paths.push(PathBuf::from("/usr/local/share/fonts"));
    }
    paths
}

/// Lowercase, with spaces, `-` and `_` removed: `"Source Sans 3"` and
/// `SourceSans3-Bold.ttf` both normalize to a `sourcesans3` prefix.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(*c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// First font file under `dirs` whose stem starts with `family`.
pub fn find_font(dirs: &[PathBuf], family: &str) -> Option<PathBuf> {
    let family = normalize(family);
    if family.is_empty() {
        return None;
    }
    dirs.iter().find_map(|dir| search(dir, &family, 0))
}

fn search(dir: &Path, family: &str, depth: usize) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if is_match(&path, family) {
            return Some(path);
        }
    }
    if depth >= MAX_DEPTH {
        return None;
    }
    subdirs.sort();
    subdirs.iter().find_map(|sub| search(sub, family, depth + 1))
}

fn is_match(path: &Path, family: &str) -> bool {
    let ext_ok = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| FONT_EXTENSIONS.iter().any(|f| f.eq_ignore_ascii_case(e)));
    ext_ok
        && path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|stem| normalize(stem).starts_with(family))
}

/// Polls the font directories until the family appears or the face's
/// timeout elapses.
///
/// Only the family is matched; weight, style and stretch are not inspected.
#[derive(Debug, Clone)]
pub struct FontDirWatcher {
    dirs: Vec<PathBuf>,
    face: FontFace,
    poll: Duration,
}

impl FontDirWatcher {
    pub fn new(dirs: Vec<PathBuf>, face: FontFace, poll: Duration) -> Self {
        Self { dirs, face, poll }
    }
}

impl FontWatcher for FontDirWatcher {
    fn load(self) -> impl Future<Output = Result<(), DetectionError>> {
        async move {
            let family = &self.face.family;
            let wait = async {
                loop {
                    if let Some(path) = find_font(&self.dirs, family) {
                        log::debug!("[fout] found '{family}' at {}", path.display());
                        return;
                    }
                    tokio::time::sleep(self.poll).await;
                }
            };
            tokio::time::timeout(self.face.timeout, wait)
                .await
                .map_err(|_| DetectionError::Timeout {
                    family: family.clone(),
                    timeout: self.face.timeout,
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fout_core::FoutOptions;

    fn face(family: &str, timeout_ms: u64) -> FontFace {
        FoutOptions::<()>::new(family, "loaded")
            .timeout(Duration::from_millis(timeout_ms))
            .font_face()
    }

    #[test]
    fn normalize_strips_separators() {
        assert_eq!(normalize("Source Sans 3"), "sourcesans3");
        assert_eq!(normalize("Fira_Code-Bold"), "firacodebold");
    }

    #[test]
    fn finds_nested_font_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("truetype").join("inter");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("Inter-Regular.ttf"), b"").unwrap();
        fs::write(dir.path().join("Inter.txt"), b"").unwrap();

        let found = find_font(&[dir.path().to_path_buf()], "Inter").unwrap();
        assert_eq!(found, nested.join("Inter-Regular.ttf"));
        assert!(find_font(&[dir.path().to_path_buf()], "Roboto").is_none());
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("SOURCESANS3.OTF"), b"").unwrap();
        assert!(find_font(&[dir.path().to_path_buf()], "Source Sans 3").is_some());
    }

    #[test]
    fn missing_dirs_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Inter.woff2"), b"").unwrap();
        let dirs = vec![dir.path().join("absent"), dir.path().to_path_buf()];
        assert!(find_font(&dirs, "Inter").is_some());
    }

    #[tokio::test]
    async fn resolves_when_present() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Inter.ttf"), b"").unwrap();
        let watcher = FontDirWatcher::new(vec![dir.path().to_path_buf()], face("Inter", 100), DEFAULT_POLL);
        watcher.load().await.unwrap();
    }

    #[tokio::test]
    async fn times_out_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = FontDirWatcher::new(vec![dir.path().to_path_buf()], face("Inter", 100), DEFAULT_POLL);
        let err = watcher.load().await.unwrap_err();
        assert_eq!(
            err,
            DetectionError::Timeout {
                family: "Inter".into(),
                timeout: Duration::from_millis(100),
            }
        );
    }
}
