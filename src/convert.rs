//! PDF/PostScript rasterisation via ImageMagick, memoised on disk.
//!
//! Conversion results are keyed by (canonical source path, quality) and
//! recorded in a JSON index under the cache directory, so re-importing
//! the same document at the same quality never re-invokes the converter.
//! The index has no eviction; rendered pages are cheap and the original
//! application behaved the same way.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

/// Rasterisation quality, mapped to the `-density` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    Normal,
    High,
    Highest,
}

impl Quality {
    pub fn density(self) -> u32 {
        match self {
            Quality::Normal => 100,
            Quality::High => 200,
            Quality::Highest => 300,
        }
    }
}

impl FromStr for Quality {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(Quality::Normal),
            "high" => Ok(Quality::High),
            "highest" => Ok(Quality::Highest),
            other => bail!("unknown quality {other:?}; expected normal, high or highest"),
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Quality::Normal => "normal",
            Quality::High => "high",
            Quality::Highest => "highest",
        };
        f.write_str(s)
    }
}

/// Converts a PDF/PS file into per-page images under `out_dir`, either
/// synchronously or as a pollable background job. Behind a trait so
/// tests can substitute a recording fake.
pub trait Converter {
    fn convert(&self, source: &Path, quality: Quality, out_dir: &Path) -> Result<Vec<PathBuf>>;

    /// Start a conversion without blocking; the caller polls the job and
    /// may cancel it.
    fn spawn(&self, source: &Path, quality: Quality, out_dir: &Path)
        -> Result<Box<dyn ConversionJob>>;
}

/// The real converter: shells out to ImageMagick's `convert`.
#[derive(Debug, Default)]
pub struct ImageMagick;

impl ImageMagick {
    fn command(source: &Path, quality: Quality, out_dir: &Path) -> Command {
        let mut cmd = Command::new("convert");
        cmd.arg("-density")
            .arg(quality.density().to_string())
            .arg(source)
            .arg(out_dir.join("page-%03d.png"));
        cmd
    }
}

impl Converter for ImageMagick {
    fn convert(&self, source: &Path, quality: Quality, out_dir: &Path) -> Result<Vec<PathBuf>> {
        fresh_out_dir(out_dir)?;
        let output = Self::command(source, quality, out_dir)
            .output()
            .map_err(map_spawn_error)?;
        if !output.status.success() {
            bail!(
                "convert failed for {} (is Ghostscript installed?): {}",
                source.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        collect_pages(out_dir)
    }

    fn spawn(
        &self,
        source: &Path,
        quality: Quality,
        out_dir: &Path,
    ) -> Result<Box<dyn ConversionJob>> {
        fresh_out_dir(out_dir)?;
        let child = Self::command(source, quality, out_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(map_spawn_error)?;
        info!(source = %source.display(), %quality, "conversion started");
        Ok(Box::new(ConvertJob {
            child,
            out_dir: out_dir.to_path_buf(),
        }))
    }
}

fn map_spawn_error(e: std::io::Error) -> anyhow::Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        anyhow::anyhow!(
            "ImageMagick's `convert` binary was not found; install it from https://www.imagemagick.org"
        )
    } else {
        anyhow::Error::new(e).context("failed to run `convert`")
    }
}

/// Recreate `out_dir` empty so pages from an earlier render of a longer
/// document cannot leak into the result.
fn fresh_out_dir(out_dir: &Path) -> Result<()> {
    if out_dir.exists() {
        fs::remove_dir_all(out_dir)
            .with_context(|| format!("failed to clear {}", out_dir.display()))?;
    }
    fs::create_dir_all(out_dir)?;
    Ok(())
}

/// Rendered page files in page order.
fn collect_pages(out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pages: Vec<PathBuf> = fs::read_dir(out_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|e| e == "png"))
        .collect();
    pages.sort();
    Ok(pages)
}

/// An in-flight conversion, polled by the caller between other work.
pub trait ConversionJob {
    /// Non-blocking completion check. `Ok(Some(pages))` once the
    /// conversion has finished successfully, `Ok(None)` while it is
    /// still running.
    fn poll(&mut self) -> Result<Option<Vec<PathBuf>>>;

    /// Abort the conversion and discard any partial output.
    fn cancel(self: Box<Self>) -> Result<()>;
}

/// [`ConversionJob`] backed by a `convert` subprocess.
pub struct ConvertJob {
    child: Child,
    out_dir: PathBuf,
}

impl ConversionJob for ConvertJob {
    fn poll(&mut self) -> Result<Option<Vec<PathBuf>>> {
        match self.child.try_wait()? {
            Some(status) if status.success() => collect_pages(&self.out_dir).map(Some),
            Some(status) => bail!("convert exited with {status}"),
            None => Ok(None),
        }
    }

    fn cancel(mut self: Box<Self>) -> Result<()> {
        self.child.kill().context("failed to kill convert process")?;
        let _ = self.child.wait();
        if self.out_dir.exists() {
            fs::remove_dir_all(&self.out_dir)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    source: PathBuf,
    quality: Quality,
    pages: Vec<PathBuf>,
}

/// Memoised conversion results, persisted as `index.json` in the cache
/// directory with one subdirectory of rendered pages per entry.
pub struct ConversionCache {
    root: PathBuf,
    entries: Vec<CacheEntry>,
    converter: Box<dyn Converter>,
}

impl ConversionCache {
    const INDEX_FILE: &'static str = "index.json";

    /// Open (or create) a cache rooted at `root`.
    pub fn open(root: PathBuf, converter: Box<dyn Converter>) -> Result<Self> {
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create cache directory {}", root.display()))?;
        let index_path = root.join(Self::INDEX_FILE);
        let entries = if index_path.exists() {
            let content = fs::read_to_string(&index_path)?;
            match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    // A broken index just means a cold cache.
                    warn!(error = %e, "discarding unreadable conversion index");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        Ok(Self { root, entries, converter })
    }

    /// Rendered pages for `(source, quality)`, converting on a miss. A
    /// hit whose page files have vanished from disk is converted again.
    pub fn get_or_convert(&mut self, source: &Path, quality: Quality) -> Result<Vec<PathBuf>> {
        let source = fs::canonicalize(source)
            .with_context(|| format!("cannot resolve {}", source.display()))?;

        if let Some(pages) = self.cached_pages(&source, quality) {
            return Ok(pages);
        }

        let out_dir = self.root.join(entry_dir_name(&source, quality));
        fresh_out_dir(&out_dir)?;
        let pages = self.converter.convert(&source, quality, &out_dir)?;
        self.record(source, quality, pages.clone())?;
        Ok(pages)
    }

    /// Like [`get_or_convert`](Self::get_or_convert), but a miss starts a
    /// background job instead of blocking. The caller polls the returned
    /// [`RunningConversion`] and hands the finished pages back through
    /// [`complete`](Self::complete); a cancelled job leaves the cache
    /// untouched.
    pub fn start(&mut self, source: &Path, quality: Quality) -> Result<Conversion> {
        let source = fs::canonicalize(source)
            .with_context(|| format!("cannot resolve {}", source.display()))?;

        if let Some(pages) = self.cached_pages(&source, quality) {
            return Ok(Conversion::Ready(pages));
        }

        let out_dir = self.root.join(entry_dir_name(&source, quality));
        fresh_out_dir(&out_dir)?;
        let job = self.converter.spawn(&source, quality, &out_dir)?;
        Ok(Conversion::Running(RunningConversion { source, quality, job }))
    }

    /// Record the pages a finished background conversion produced, so
    /// later lookups for its key hit.
    pub fn complete(&mut self, conversion: RunningConversion, pages: Vec<PathBuf>) -> Result<()> {
        self.record(conversion.source, conversion.quality, pages)
    }

    fn cached_pages(&self, source: &Path, quality: Quality) -> Option<Vec<PathBuf>> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.source == source && e.quality == quality)?;
        if entry.pages.iter().all(|p| p.exists()) {
            debug!(source = %source.display(), %quality, "conversion cache hit");
            return Some(entry.pages.clone());
        }
        warn!(source = %source.display(), "cached pages missing on disk; reconverting");
        None
    }

    fn record(&mut self, source: PathBuf, quality: Quality, pages: Vec<PathBuf>) -> Result<()> {
        self.entries.retain(|e| !(e.source == source && e.quality == quality));
        self.entries.push(CacheEntry { source, quality, pages });
        self.persist()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(self.root.join(Self::INDEX_FILE), content)
            .context("failed to write conversion index")?;
        Ok(())
    }
}

/// Outcome of [`ConversionCache::start`]: either a cache hit or a job
/// still rendering.
pub enum Conversion {
    Ready(Vec<PathBuf>),
    Running(RunningConversion),
}

/// A background conversion the cache does not know the outcome of yet.
pub struct RunningConversion {
    source: PathBuf,
    quality: Quality,
    job: Box<dyn ConversionJob>,
}

impl RunningConversion {
    pub fn poll(&mut self) -> Result<Option<Vec<PathBuf>>> {
        self.job.poll()
    }

    pub fn cancel(self) -> Result<()> {
        self.job.cancel()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }
}

/// Stable per-entry directory name derived from the key.
fn entry_dir_name(source: &Path, quality: Quality) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.to_string_lossy().as_bytes());
    hasher.update(quality.density().to_le_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}

/// Default cache directory, XDG-aware.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("whyteboard")
        .join("converted")
}
