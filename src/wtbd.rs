//! The `.wtbd` save archive.
//!
//! A save file is a zip archive with two kinds of entries:
//! - `save.data`: a MessagePack blob of the whole document state
//! - `data/<sha256>.<ext>`: image payloads, one per distinct content hash
//!
//! Image shapes reference payloads by hash, so pasting the same bitmap
//! twice stores it once. The blob carries a version string compared
//! numerically against the application's own; opening a file written by
//! a newer version marks the document as downgraded, and the flag
//! survives subsequent saves.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::notebook::Notebook;
use crate::shapes::Shape;
use crate::sheet::Sheet;

/// Version string written into new save files.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const SAVE_ENTRY: &str = "save.data";
const DATA_DIR: &str = "data/";

/// A `major.minor[.patch]` save-format version, compared numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl FromStr for Version {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('.');
        let mut next = |name: &str| -> Result<u32> {
            parts
                .next()
                .ok_or_else(|| anyhow::anyhow!("version {s:?} is missing its {name} component"))?
                .parse::<u32>()
                .with_context(|| format!("bad {name} component in version {s:?}"))
        };
        let major = next("major")?;
        let minor = next("minor")?;
        let patch = match parts.next() {
            Some(p) => p
                .parse::<u32>()
                .with_context(|| format!("bad patch component in version {s:?}"))?,
            None => 0,
        };
        if parts.next().is_some() {
            bail!("version {s:?} has too many components");
        }
        Ok(Version { major, minor, patch })
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Content-addressed store of image payloads. Keys are the hex SHA-256
/// of the bytes, so identical images collapse into one entry.
#[derive(Debug, Clone, Default)]
pub struct ImageStore {
    entries: BTreeMap<String, StoredImage>,
}

#[derive(Debug, Clone)]
struct StoredImage {
    ext: String,
    bytes: Vec<u8>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a payload, returning its hash key. Re-inserting identical
    /// bytes is a no-op returning the same key.
    pub fn insert(&mut self, bytes: Vec<u8>, ext: &str) -> String {
        let hash = hex::encode(Sha256::digest(&bytes));
        self.entries
            .entry(hash.clone())
            .or_insert_with(|| StoredImage { ext: ext.to_string(), bytes });
        hash
    }

    pub fn get(&self, hash: &str) -> Option<&[u8]> {
        self.entries.get(hash).map(|e| e.bytes.as_slice())
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a save file captures.
#[derive(Debug, Default)]
pub struct Document {
    pub notebook: Notebook,
    pub images: ImageStore,
    pub settings: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SaveData {
    version: String,
    downgraded: bool,
    active_sheet: usize,
    settings: HashMap<String, String>,
    sheets: Vec<SheetData>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SheetData {
    name: String,
    canvas_size: (u32, u32),
    shapes: Vec<Shape>,
}

/// Write the document to `path` as a `.wtbd` archive.
pub fn save(path: &Path, doc: &Document) -> Result<()> {
    let data = SaveData {
        version: APP_VERSION.to_string(),
        downgraded: doc.notebook.downgraded,
        active_sheet: doc.notebook.active_index(),
        settings: doc.settings.clone(),
        sheets: doc
            .notebook
            .sheets()
            .iter()
            .map(|sheet| SheetData {
                name: sheet.name.clone(),
                canvas_size: sheet.canvas_size,
                shapes: sheet.shapes().to_vec(),
            })
            .collect(),
    };
    let blob = rmp_serde::to_vec(&data).context("failed to encode save data")?;

    let file = File::create(path)
        .with_context(|| format!("failed to create save file {}", path.display()))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.start_file(SAVE_ENTRY, options)?;
    writer.write_all(&blob)?;

    // One entry per referenced hash, written once regardless of how many
    // shapes point at it.
    for hash in referenced_hashes(&doc.notebook) {
        match doc.images.entries.get(&hash) {
            Some(stored) => {
                writer.start_file(format!("{DATA_DIR}{hash}.{}", stored.ext), options)?;
                writer.write_all(&stored.bytes)?;
            }
            None => warn!(%hash, "image shape references a payload not in the store"),
        }
    }

    writer.finish()?;
    debug!(path = %path.display(), sheets = data.sheets.len(), "saved document");
    Ok(())
}

/// Read a `.wtbd` archive back into a document.
///
/// A missing `save.data` entry or an undecodable blob is a hard error;
/// there is no partial recovery.
pub fn load(path: &Path) -> Result<Document> {
    let file = File::open(path)
        .with_context(|| format!("failed to open save file {}", path.display()))?;
    let mut archive =
        ZipArchive::new(file).with_context(|| format!("{} is not a valid archive", path.display()))?;

    let blob = {
        let mut entry = match archive.by_name(SAVE_ENTRY) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                bail!("{} has no {SAVE_ENTRY} entry; not a whiteboard save", path.display())
            }
            Err(e) => return Err(e.into()),
        };
        let mut blob = Vec::new();
        entry.read_to_end(&mut blob)?;
        blob
    };

    let data: SaveData = rmp_serde::from_slice(&blob)
        .with_context(|| format!("corrupt save data in {}", path.display()))?;

    let file_version = Version::from_str(&data.version)?;
    let app_version = Version::from_str(APP_VERSION)?;
    let mut downgraded = data.downgraded;
    if file_version > app_version {
        warn!(%file_version, %app_version, "save written by a newer version; marking downgraded");
        downgraded = true;
    }

    let sheets: Vec<Sheet> = data
        .sheets
        .into_iter()
        .map(|s| Sheet::from_parts(s.name, s.canvas_size, s.shapes))
        .collect();
    let mut notebook = Notebook::from_sheets(sheets, data.active_sheet);
    notebook.downgraded = downgraded;

    let mut images = ImageStore::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        let Some(file_name) = name.strip_prefix(DATA_DIR) else {
            continue;
        };
        if file_name.is_empty() {
            continue; // directory entry
        }
        let (hash, ext) = match file_name.rsplit_once('.') {
            Some((hash, ext)) => (hash.to_string(), ext.to_string()),
            None => (file_name.to_string(), String::new()),
        };
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        images.entries.insert(hash, StoredImage { ext, bytes });
    }

    for hash in referenced_hashes(&notebook) {
        if !images.contains(&hash) {
            warn!(%hash, "save references a missing image payload");
        }
    }

    debug!(path = %path.display(), sheets = notebook.sheets().len(), "loaded document");
    Ok(Document {
        notebook,
        images,
        settings: data.settings,
    })
}

/// Distinct image hashes referenced by any shape, in first-seen order.
fn referenced_hashes(notebook: &Notebook) -> Vec<String> {
    let mut seen = Vec::new();
    for sheet in notebook.sheets() {
        for shape in sheet.shapes() {
            if let Shape::Image { hash, .. } = shape {
                if !seen.contains(hash) {
                    seen.push(hash.clone());
                }
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parsing() {
        let v: Version = "0.40.1".parse().unwrap();
        assert_eq!(v, Version { major: 0, minor: 40, patch: 1 });
        let v: Version = "0.40".parse().unwrap();
        assert_eq!(v.patch, 0);
        assert!("".parse::<Version>().is_err());
        assert!("1".parse::<Version>().is_err());
        assert!("1.2.3.4".parse::<Version>().is_err());
        assert!("a.b".parse::<Version>().is_err());
    }

    #[test]
    fn version_ordering_is_numeric() {
        let a: Version = "0.40.1".parse().unwrap();
        let b: Version = "0.40".parse().unwrap();
        let c: Version = "0.9".parse().unwrap();
        assert!(a > b);
        // Numeric, not lexicographic: 0.40 > 0.9.
        assert!(b > c);
    }

    #[test]
    fn image_store_deduplicates() {
        let mut store = ImageStore::new();
        let h1 = store.insert(vec![1, 2, 3], "png");
        let h2 = store.insert(vec![1, 2, 3], "png");
        let h3 = store.insert(vec![9, 9], "png");
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&h1), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn app_version_is_parseable() {
        APP_VERSION.parse::<Version>().unwrap();
    }

    fn write_archive(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, bytes) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
    }

    fn blob_with_version(version: &str, downgraded: bool) -> Vec<u8> {
        let data = SaveData {
            version: version.to_string(),
            downgraded,
            active_sheet: 0,
            settings: HashMap::new(),
            sheets: vec![SheetData {
                name: "Sheet 1".into(),
                canvas_size: (100, 100),
                shapes: Vec::new(),
            }],
        };
        rmp_serde::to_vec(&data).unwrap()
    }

    #[test]
    fn newer_file_version_marks_downgraded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.wtbd");
        write_archive(&path, &[(SAVE_ENTRY, &blob_with_version("99.0.0", false))]);

        let doc = load(&path).unwrap();
        assert!(doc.notebook.downgraded);
    }

    #[test]
    fn downgraded_flag_survives_resave() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.wtbd");
        write_archive(&path, &[(SAVE_ENTRY, &blob_with_version("99.0.0", false))]);

        let doc = load(&path).unwrap();
        let resaved = dir.path().join("resaved.wtbd");
        save(&resaved, &doc).unwrap();
        assert!(load(&resaved).unwrap().notebook.downgraded);
    }

    #[test]
    fn older_file_version_loads_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.wtbd");
        write_archive(&path, &[(SAVE_ENTRY, &blob_with_version("0.1", false))]);
        assert!(!load(&path).unwrap().notebook.downgraded);
    }

    #[test]
    fn missing_save_data_entry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hollow.wtbd");
        write_archive(&path, &[("data/deadbeef.png", b"ignored")]);

        let err = load(&path).unwrap_err().to_string();
        assert!(err.contains("save.data"), "unexpected error: {err}");
    }

    #[test]
    fn corrupt_blob_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.wtbd");
        write_archive(&path, &[(SAVE_ENTRY, b"not messagepack at all")]);
        assert!(load(&path).is_err());
    }

    #[test]
    fn malformed_version_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("badver.wtbd");
        write_archive(&path, &[(SAVE_ENTRY, &blob_with_version("not.a.version", false))]);
        assert!(load(&path).is_err());
    }
}
