use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::{DocumentLengths, InvertedIndex};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: usize,
    pub num_terms: usize,
    pub context_size: usize,
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
    pub fn index(&self) -> PathBuf { self.root.join("index.bin") }
    pub fn lengths(&self) -> PathBuf { self.root.join("lengths.txt") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// An index and its length table, loaded together and never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSnapshot {
    pub index: InvertedIndex,
    pub lengths: DocumentLengths,
}

pub(crate) fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::MissingResource { path: path.to_path_buf() },
        _ => Error::Io(e),
    })
}

/// Write `path`'s contents into a sibling temp file and return that file's path.
fn write_temp(path: &Path, write: impl FnOnce(&mut BufWriter<File>) -> Result<()>) -> Result<PathBuf> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    let tmp = path.with_extension("tmp");
    let mut w = BufWriter::new(File::create(&tmp)?);
    write(&mut w)?;
    w.flush()?;
    Ok(tmp)
}

/// Write through a temp file and rename so readers never see a partial file.
fn write_atomic(path: &Path, write: impl FnOnce(&mut BufWriter<File>) -> Result<()>) -> Result<()> {
    let tmp = write_temp(path, write)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn write_index(w: &mut BufWriter<File>, index: &InvertedIndex) -> Result<()> {
    bincode::serialize_into(w, index)?;
    Ok(())
}

fn write_meta(w: &mut BufWriter<File>, meta: &MetaFile) -> Result<()> {
    serde_json::to_writer_pretty(w, meta)?;
    Ok(())
}

pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    write_atomic(&paths.index(), |w| write_index(w, index))
}

pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex> {
    let mut buf = Vec::new();
    open(&paths.index())?.read_to_end(&mut buf)?;
    Ok(bincode::deserialize(&buf)?)
}

pub fn save_lengths(paths: &IndexPaths, lengths: &DocumentLengths) -> Result<()> {
    write_atomic(&paths.lengths(), |w| lengths.write(w))
}

pub fn load_lengths(path: &Path) -> Result<DocumentLengths> {
    DocumentLengths::parse(BufReader::new(open(path)?))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    write_atomic(&paths.meta(), |w| write_meta(w, meta))
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut buf = String::new();
    open(&paths.meta())?.read_to_string(&mut buf)?;
    Ok(serde_json::from_str(&buf)?)
}

/// Persist a finished build. All three files are written to temp files first
/// and only renamed into place once every write succeeded, so a failed save
/// leaves the previous snapshot untouched.
pub fn save_snapshot(paths: &IndexPaths, snapshot: &IndexSnapshot, meta: &MetaFile) -> Result<()> {
    let targets = [paths.index(), paths.lengths(), paths.meta()];
    let mut staged: Vec<PathBuf> = Vec::with_capacity(targets.len());
    let written = (|| -> Result<()> {
        staged.push(write_temp(&targets[0], |w| write_index(w, &snapshot.index))?);
        staged.push(write_temp(&targets[1], |w| snapshot.lengths.write(w))?);
        staged.push(write_temp(&targets[2], |w| write_meta(w, meta))?);
        Ok(())
    })();
    if let Err(e) = written {
        for target in &targets {
            let _ = std::fs::remove_file(target.with_extension("tmp"));
        }
        return Err(e);
    }
    for (tmp, target) in staged.iter().zip(&targets) {
        std::fs::rename(tmp, target)?;
    }
    tracing::info!(root = %paths.root.display(), num_terms = meta.num_terms, num_docs = meta.num_docs, "index saved");
    Ok(())
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<IndexSnapshot> {
    let index = load_index(paths)?;
    let lengths = load_lengths(&paths.lengths())?;
    Ok(IndexSnapshot { index, lengths })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_index, StopWords, WordDocStat};
    use tempfile::tempdir;

    fn snapshot(doc: &str, word: &str) -> IndexSnapshot {
        let stat = WordDocStat {
            document_id: doc.into(),
            title: doc.into(),
            word: word.into(),
            frequency: 1,
            contexts: vec![word.into()],
        };
        let mut lengths = DocumentLengths::new();
        lengths.insert(doc.into(), 1);
        IndexSnapshot { index: build_index(vec![stat], &StopWords::none()).unwrap(), lengths }
    }

    fn meta(num_terms: usize) -> MetaFile {
        MetaFile { num_docs: 1, num_terms, context_size: 3, created_at: String::new(), version: FORMAT_VERSION }
    }

    #[test]
    fn failed_save_keeps_previous_snapshot() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let old = snapshot("a", "cat");
        save_snapshot(&paths, &old, &meta(1)).unwrap();

        // meta's temp file cannot be created, so the save fails after the
        // index and lengths temp files were already written
        std::fs::create_dir(paths.meta().with_extension("tmp")).unwrap();
        assert!(save_snapshot(&paths, &snapshot("b", "dog"), &meta(1)).is_err());

        assert_eq!(load_snapshot(&paths).unwrap(), old);
        assert!(!paths.index().with_extension("tmp").exists());
        assert!(!paths.lengths().with_extension("tmp").exists());
    }
}
