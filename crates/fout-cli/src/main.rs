mod fonts;
mod platform;
mod store;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use fout_core::memory::MemoryElement;
use fout_core::{fout, FoutOptions, Loading};
use serde_json::json;

use crate::platform::NativePlatform;
use crate::store::JsonFileStore;

#[derive(Parser)]
#[command(name = "fout", about = "Apply a class once a webfont is available, remembering the result")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the loader once against the native platform.
    Apply(ApplyArgs),
    /// List recorded load markers.
    Status {
        /// Marker file (default: <data dir>/fout/markers.json).
        #[arg(long)]
        store: Option<PathBuf>,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct ApplyArgs {
    /// JSON options file (`{"fontName": ..., "fontLoadedClass": ...}`).
    /// Flags below override its fields.
    #[arg(long)]
    options: Option<PathBuf>,
    /// Font family to wait for.
    #[arg(long)]
    font: Option<String>,
    /// Class to add once the font is available.
    #[arg(long)]
    class: Option<String>,
    /// Marker key (default: fout-loader__<font>).
    #[arg(long)]
    key: Option<String>,
    /// Marker file (default: <data dir>/fout/markers.json).
    #[arg(long)]
    store: Option<PathBuf>,
    /// Behave as if persistent storage were unavailable.
    #[arg(long, conflicts_with = "store")]
    no_storage: bool,
    /// Directory to search for font files (repeatable; default: system dirs).
    #[arg(long = "font-dir")]
    font_dirs: Vec<PathBuf>,
    /// Give up after this many milliseconds (default: 3000).
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Interval between font directory scans, in milliseconds.
    #[arg(long, default_value_t = 50)]
    poll_ms: u64,
    #[arg(long)]
    weight: Option<String>,
    #[arg(long)]
    style: Option<String>,
    #[arg(long)]
    stretch: Option<String>,
    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
}

impl ApplyArgs {
    fn load_options(&self) -> Result<FoutOptions<MemoryElement>> {
        let mut options: FoutOptions<MemoryElement> = match &self.options {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => FoutOptions::default(),
        };
        if let Some(font) = &self.font {
            options.font_name = font.clone();
        }
        if let Some(class) = &self.class {
            options.font_loaded_class = class.clone();
        }
        if let Some(key) = &self.key {
            options = options.local_storage_key(key.clone());
        }
        if let Some(ms) = self.timeout_ms {
            options = options.timeout(Duration::from_millis(ms));
        }
        if let Some(weight) = &self.weight {
            options = options.weight(weight.clone());
        }
        if let Some(style) = &self.style {
            options = options.style(style.clone());
        }
        if let Some(stretch) = &self.stretch {
            options = options.stretch(stretch.clone());
        }
        Ok(options)
    }
}

fn store_at(path: Option<PathBuf>) -> Result<JsonFileStore> {
    match path.or_else(JsonFileStore::default_path) {
        Some(path) => Ok(JsonFileStore::new(path)),
        None => bail!("no data directory on this system; pass --store"),
    }
}

async fn apply(args: ApplyArgs) -> Result<()> {
    let options = args.load_options()?;
    let store = if args.no_storage {
        None
    } else {
        Some(store_at(args.store.clone())?)
    };
    let font_dirs = if args.font_dirs.is_empty() {
        fonts::default_font_dirs()
    } else {
        args.font_dirs.clone()
    };

    let font = options.font_name.clone();
    let key = options.stored_key();
    let platform = NativePlatform::new(store, font_dirs).with_poll(Duration::from_millis(args.poll_ms));

    let cached = match fout(&platform, options)? {
        Loading::Applied => true,
        Loading::Pending(load) => {
            load.await?;
            false
        }
    };

    let classes = platform.root.classes();
    if args.json {
        let out = json!({ "font": font, "key": key, "cached": cached, "classes": classes });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        let how = if cached { "marker present" } else { "font loaded" };
        println!("{font}: {how} ({key})");
        println!("classes: {}", classes.join(" "));
    }
    Ok(())
}

fn status(store: Option<PathBuf>, as_json: bool) -> Result<()> {
    let store = store_at(store)?;
    let records = store.records_or_empty()?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("no markers in {}", store.path().display());
        return Ok(());
    }
    for (key, record) in &records {
        println!("{key}\t{}\t{}", record.value, record.written_at.to_rfc3339());
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Apply(args) => apply(args).await,
        Command::Status { store, json } => status(store, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ApplyArgs {
        let mut argv = vec!["fout", "apply"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Apply(args) => args,
            Command::Status { .. } => panic!("expected apply"),
        }
    }

    #[test]
    fn flags_build_options() {
        let args = parse(&["--font", "Inter", "--class", "fonts-loaded", "--timeout-ms", "250", "--weight", "700"]);
        let options = args.load_options().unwrap();
        assert_eq!(options.font_name, "Inter");
        assert_eq!(options.font_loaded_class, "fonts-loaded");
        assert_eq!(options.stored_key(), "fout-loader__Inter");
        let face = options.font_face();
        assert_eq!(face.timeout, Duration::from_millis(250));
        assert_eq!(face.weight, "700");
        assert_eq!(args.poll_ms, 50);
        assert_eq!(parse(&["--font", "Inter", "--poll-ms", "5"]).poll_ms, 5);
    }

    #[test]
    fn status_survives_corrupt_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markers.json");
        fs::write(&path, "{ truncated").unwrap();
        status(Some(path), true).unwrap();
    }

    #[test]
    fn flags_override_options_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fout.json");
        fs::write(
            &path,
            r#"{"fontName": "Roboto", "fontLoadedClass": "roboto-loaded", "localStorageKey": "k"}"#,
        )
        .unwrap();

        let args = parse(&["--options", path.to_str().unwrap(), "--font", "Inter"]);
        let options = args.load_options().unwrap();
        assert_eq!(options.font_name, "Inter");
        assert_eq!(options.font_loaded_class, "roboto-loaded");
        assert_eq!(options.stored_key(), "k");
    }

    #[test]
    fn no_storage_conflicts_with_store() {
        let argv = ["fout", "apply", "--font", "Inter", "--class", "c", "--no-storage", "--store", "x.json"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[tokio::test]
    async fn apply_rejects_missing_class() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("markers.json");
        let args = parse(&["--font", "Inter", "--store", store.to_str().unwrap()]);
        let err = apply(args).await.unwrap_err();
        assert!(err.to_string().contains("invalid argument"));
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn apply_twice_uses_marker() {
        let fonts = tempfile::tempdir().unwrap();
        fs::write(fonts.path().join("Inter.ttf"), b"").unwrap();
        let data = tempfile::tempdir().unwrap();
        let store = data.path().join("markers.json");
        let argv = [
            "--font",
            "Inter",
            "--class",
            "fonts-loaded",
            "--store",
            store.to_str().unwrap(),
            "--font-dir",
            fonts.path().to_str().unwrap(),
        ];

        apply(parse(&argv)).await.unwrap();
        let records = JsonFileStore::new(&store).records().unwrap();
        assert_eq!(records["fout-loader__Inter"].value, "1");

        // Font gone: only the marker can satisfy the second run.
        fs::remove_file(fonts.path().join("Inter.ttf")).unwrap();
        apply(parse(&argv)).await.unwrap();
    }
}
