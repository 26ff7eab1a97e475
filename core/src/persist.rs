use crate::index::{IndexSnapshot, TermVectors};
use crate::models::Recipe;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const INDEX_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn recipes(&self) -> PathBuf { self.root.join("recipes.json") }
    fn vectors(&self) -> PathBuf { self.root.join("vectors.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Write `target` through a temp file in the index directory and rename it into place,
/// so readers see either the previous file or the complete new one.
fn replace_file(paths: &IndexPaths, target: &Path, fill: impl FnOnce(&mut dyn Write) -> Result<()>) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut tmp = NamedTempFile::new_in(&paths.root)?;
    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        fill(&mut w)?;
        w.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(target)?;
    Ok(())
}

pub fn save_corpus(paths: &IndexPaths, recipes: &[Recipe]) -> Result<()> {
    replace_file(paths, &paths.recipes(), |w| {
        serde_json::to_writer(w, recipes)?;
        Ok(())
    })
}

pub fn load_corpus(paths: &IndexPaths) -> Result<Vec<Recipe>> {
    let reader = BufReader::new(File::open(paths.recipes())?);
    let recipes = serde_json::from_reader(reader)?;
    Ok(recipes)
}

pub fn save_vectors(paths: &IndexPaths, vectors: &TermVectors) -> Result<()> {
    replace_file(paths, &paths.vectors(), |w| {
        bincode::serialize_into(w, vectors)?;
        Ok(())
    })
}

pub fn load_vectors(paths: &IndexPaths) -> Result<TermVectors> {
    let mut f = File::open(paths.vectors())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let vectors = bincode::deserialize(&buf)?;
    Ok(vectors)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    replace_file(paths, &paths.meta(), |w| {
        serde_json::to_writer_pretty(w, meta)?;
        Ok(())
    })
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Write every file of an index directory for `snapshot`. `meta.json` goes last.
pub fn save_index(paths: &IndexPaths, snapshot: &IndexSnapshot) -> Result<()> {
    save_corpus(paths, snapshot.recipes())?;
    save_vectors(paths, snapshot.vectors())?;
    let meta = MetaFile {
        num_docs: snapshot.len() as u32,
        num_terms: snapshot.num_terms() as u32,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: INDEX_VERSION,
    };
    save_meta(paths, &meta)
}

/// Load a previously saved index, checking that its parts agree with each other.
pub fn load_index(paths: &IndexPaths) -> Result<IndexSnapshot> {
    let meta = load_meta(paths)?;
    if meta.version != INDEX_VERSION {
        bail!("unsupported index version {} (expected {})", meta.version, INDEX_VERSION);
    }
    let recipes = load_corpus(paths)?;
    let vectors = load_vectors(paths)?;
    if recipes.len() != vectors.docs.len() || recipes.len() != meta.num_docs as usize {
        bail!(
            "index at {} is inconsistent: {} recipes, {} vectors, meta says {}",
            paths.root.display(),
            recipes.len(),
            vectors.docs.len(),
            meta.num_docs
        );
    }
    Ok(IndexSnapshot::from_parts(recipes, vectors))
}
