//! Generator driver.
//!
//! Every kind is resolved, rendered and checked in memory first; the first
//! error aborts the run before anything touches the output directory. Kinds
//! are processed in lexicographic order and files are written in
//! lexicographic order with the index last, so two runs over the same
//! catalog produce byte-identical trees.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write as _;
use std::path::Path;

use layoutgen_contracts::INDEX_FILE_NAME;
use layoutgen_targets::TargetConfig;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::check;
use crate::descriptor::LayoutDescriptor;
use crate::emit::{self, Artifact, Emitter, EmitterId};
use crate::error::LayoutError;
use crate::index::{GenerationIndex, IndexArtifact, IndexKind};
use crate::names;
use crate::offsets::{self, OffsetView};
use crate::target::{validate_target, TargetRecord};
use crate::util::sha256_hex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub name: String,
    pub contents: String,
}

#[derive(Debug, Clone)]
pub struct GeneratedKind {
    pub view: OffsetView,
    pub artifacts: Vec<Artifact>,
    pub files: Vec<OutputFile>,
}

#[derive(Debug, Clone)]
pub struct GeneratedSet {
    pub target: TargetConfig,
    pub kinds: Vec<GeneratedKind>,
    pub index: GenerationIndex,
    index_json: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Write,
    /// Compare against the files on disk; fail on the first difference.
    Check,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub written: Vec<String>,
    pub unchanged: usize,
    pub removed: Vec<String>,
}

pub struct Generator {
    target: TargetConfig,
    emitters: Vec<Box<dyn Emitter>>,
}

pub fn generate(catalog: &Catalog, target: &TargetConfig) -> Result<GeneratedSet, LayoutError> {
    Generator::new(*target)?.generate(&catalog.kinds)
}

impl Generator {
    pub fn new(target: TargetConfig) -> Result<Self, LayoutError> {
        validate_target(&target)?;
        Ok(Generator {
            target,
            emitters: emit::standard_emitters(),
        })
    }

    pub fn target(&self) -> &TargetConfig {
        &self.target
    }

    /// Replaces the emitter with the same id.
    pub fn replace_emitter(&mut self, emitter: Box<dyn Emitter>) {
        match self.emitters.iter_mut().find(|e| e.id() == emitter.id()) {
            Some(slot) => *slot = emitter,
            None => self.emitters.push(emitter),
        }
    }

    pub fn generate_kind(&self, desc: &LayoutDescriptor) -> Result<GeneratedKind, LayoutError> {
        let view = offsets::resolve(desc, &self.target)?;
        let artifacts = emit::render_all(&view, &self.emitters);
        check::verify(&view, &artifacts)?;

        let c_struct = artifact(&view, &artifacts, EmitterId::CStruct)?;
        let macros = artifact(&view, &artifacts, EmitterId::OffsetMacros)?;
        let scan = artifact(&view, &artifacts, EmitterId::ScanTable)?;
        let header = emit::header_file(&view, c_struct, macros);
        let scan = emit::scan_file(&view, scan);
        check::verify_files(&view, &header, &scan)?;
        let files = vec![
            OutputFile {
                name: names::header_file_name(&view.kind),
                contents: header,
            },
            OutputFile {
                name: names::scan_file_name(&view.kind),
                contents: scan,
            },
        ];

        Ok(GeneratedKind {
            view,
            artifacts,
            files,
        })
    }

    pub fn generate(&self, kinds: &[LayoutDescriptor]) -> Result<GeneratedSet, LayoutError> {
        let mut sorted: Vec<&LayoutDescriptor> = kinds.iter().collect();
        sorted.sort_by(|a, b| a.name().cmp(b.name()));
        check_global_names(&sorted)?;

        info!(
            target: "layoutgen",
            kinds = sorted.len(),
            word_bytes = self.target.word_bytes,
            lowtag_bits = self.target.lowtag_bits,
            alignment_words = self.target.alignment_words,
            "generating layouts"
        );

        let mut out = Vec::with_capacity(sorted.len());
        for desc in sorted {
            out.push(self.generate_kind(desc)?);
        }

        let index = GenerationIndex::new(
            TargetRecord::from(&self.target),
            out.iter()
                .map(|k| IndexKind {
                    name: k.view.kind.clone(),
                    lowtag: k.view.lowtag,
                    size_words: k.view.size_words,
                    artifacts: k
                        .files
                        .iter()
                        .map(|f| IndexArtifact {
                            file: f.name.clone(),
                            sha256: sha256_hex(f.contents.as_bytes()),
                        })
                        .collect(),
                })
                .collect(),
        );
        let index_json = index.to_json()?;

        Ok(GeneratedSet {
            target: self.target,
            kinds: out,
            index,
            index_json,
        })
    }
}

fn artifact<'a>(
    view: &OffsetView,
    artifacts: &'a [Artifact],
    id: EmitterId,
) -> Result<&'a Artifact, LayoutError> {
    emit::find(artifacts, id).ok_or_else(|| LayoutError::LayoutDivergence {
        kind: view.kind.clone(),
        emitter: id,
        slot: "(artifact)".to_string(),
        expected: "a rendered artifact".to_string(),
        found: "none".to_string(),
    })
}

/// All headers may be included into one translation unit, so struct names
/// and constants must be unique across kinds, not just within one.
fn check_global_names(sorted: &[&LayoutDescriptor]) -> Result<(), LayoutError> {
    let mut structs: BTreeMap<String, &str> = BTreeMap::new();
    let mut constants: BTreeMap<String, &str> = BTreeMap::new();
    for desc in sorted {
        let kind = desc.name();
        if let Some(prev) = structs.insert(names::c_ident(kind), kind) {
            if prev == kind {
                return Err(LayoutError::DuplicateKind {
                    kind: kind.to_string(),
                });
            }
            return Err(LayoutError::malformed(
                kind,
                None,
                format!("struct name collides with kind {prev}"),
            ));
        }

        let mut claim = |constant: String, slot: Option<&str>| {
            match constants.insert(constant.clone(), kind) {
                Some(prev) => Err(LayoutError::malformed(
                    kind,
                    slot,
                    format!("constant {constant} collides with kind {prev}"),
                )),
                None => Ok(()),
            }
        };
        claim(names::size_macro(kind), None)?;
        for slot in desc.slots() {
            claim(names::offset_macro(kind, &slot.name), Some(slot.name.as_str()))?;
        }
    }
    Ok(())
}

impl GeneratedSet {
    /// Artifact files in write order (lexicographic), without the index.
    pub fn artifact_files(&self) -> Vec<&OutputFile> {
        let mut files: Vec<&OutputFile> = self.kinds.iter().flat_map(|k| k.files.iter()).collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        files
    }

    pub fn index_json(&self) -> &str {
        &self.index_json
    }

    pub fn kind(&self, name: &str) -> Option<&GeneratedKind> {
        self.kinds.iter().find(|k| k.view.kind == name)
    }

    pub fn write_to(&self, dir: &Path, mode: WriteMode) -> Result<WriteSummary, LayoutError> {
        match mode {
            WriteMode::Check => self.check_against(dir),
            WriteMode::Write => self.write_files(dir),
        }
    }

    fn check_against(&self, dir: &Path) -> Result<WriteSummary, LayoutError> {
        let mut summary = WriteSummary::default();
        let index = (INDEX_FILE_NAME, self.index_json.as_str());
        let files = self
            .artifact_files()
            .into_iter()
            .map(|f| (f.name.as_str(), f.contents.as_str()))
            .chain(std::iter::once(index));
        for (name, contents) in files {
            let path = dir.join(name);
            let current = match std::fs::read_to_string(&path) {
                Ok(current) => current,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(LayoutError::StaleArtifact {
                        path,
                        reason: "missing".to_string(),
                    })
                }
                Err(e) => return Err(LayoutError::io("read", path, e)),
            };
            if current != contents {
                return Err(LayoutError::StaleArtifact {
                    path,
                    reason: "differs from generated output".to_string(),
                });
            }
            debug!(target: "layoutgen", file = name, "artifact up to date");
            summary.unchanged += 1;
        }
        info!(target: "layoutgen", files = summary.unchanged, "artifacts verified");
        Ok(summary)
    }

    fn write_files(&self, dir: &Path) -> Result<WriteSummary, LayoutError> {
        std::fs::create_dir_all(dir).map_err(|e| LayoutError::io("create output dir", dir, e))?;
        let previous = read_previous_index(dir)?;

        let mut summary = WriteSummary::default();
        for file in self.artifact_files() {
            write_if_changed(dir, &file.name, &file.contents, &mut summary)?;
        }

        if let Some(previous) = previous {
            let current: BTreeSet<&str> = self.index.files().collect();
            let stale: BTreeSet<&str> = previous
                .files()
                .filter(|f| !current.contains(f) && names::is_artifact_file_name(f))
                .collect();
            for name in stale {
                let path = dir.join(name);
                match std::fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(e) => return Err(LayoutError::io("remove stale artifact", path, e)),
                }
                info!(target: "layoutgen", file = name, "removed stale artifact");
                summary.removed.push(name.to_string());
            }
        }

        write_if_changed(dir, INDEX_FILE_NAME, &self.index_json, &mut summary)?;
        info!(
            target: "layoutgen",
            written = summary.written.len(),
            unchanged = summary.unchanged,
            removed = summary.removed.len(),
            "artifacts written"
        );
        Ok(summary)
    }
}

fn read_previous_index(dir: &Path) -> Result<Option<GenerationIndex>, LayoutError> {
    let path = dir.join(INDEX_FILE_NAME);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(LayoutError::io("read", path, e)),
    };
    let index = GenerationIndex::parse(&bytes);
    if index.is_none() {
        warn!(
            target: "layoutgen",
            path = %path.display(),
            "ignoring unreadable previous index; stale artifacts will not be removed"
        );
    }
    Ok(index)
}

fn write_if_changed(
    dir: &Path,
    name: &str,
    contents: &str,
    summary: &mut WriteSummary,
) -> Result<(), LayoutError> {
    let path = dir.join(name);
    if let Ok(current) = std::fs::read_to_string(&path) {
        if current == contents {
            debug!(target: "layoutgen", file = name, "artifact unchanged");
            summary.unchanged += 1;
            return Ok(());
        }
    }
    write_atomic(dir, name, contents)?;
    debug!(target: "layoutgen", file = name, bytes = contents.len(), "wrote artifact");
    summary.written.push(name.to_string());
    Ok(())
}

/// Writes through a temporary file in `dir` that is renamed into place only
/// once complete; on any error the temporary file is deleted.
fn write_atomic(dir: &Path, name: &str, contents: &str) -> Result<(), LayoutError> {
    let path = dir.join(name);
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| LayoutError::io("create temporary file in", dir, e))?;
    tmp.write_all(contents.as_bytes())
        .and_then(|()| tmp.flush())
        .map_err(|e| LayoutError::io("write", &path, e))?;
    tmp.persist(&path)
        .map_err(|e| LayoutError::io("persist", &path, e.error))?;
    Ok(())
}
