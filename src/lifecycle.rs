// File lifecycle for a run: discover schema files, convert them into a
// staging dir, back up the originals, promote the converted files, and
// the inverse recovery path. No original file moves until every
// conversion has succeeded.

use crate::error::{ConvertError, Result};
use crate::logger;
use crate::progress::ProgressManager;
use crate::rewrite::SchemaRewriter;
use glob::Pattern;
use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

// Directory and filename conventions shared with the dump producer.
pub const BACKUP_DIR_NAME: &str = "_obschema2mysql_";
pub const STAGING_PREFIX: &str = "_staging_";
pub const TABLE_SCHEMA_GLOB: &str = "*-schema.sql";
pub const DATABASE_SCHEMA_GLOB: &str = "*-schema-create.sql";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    Table,
    Database,
}

// Per-file outcome for the run report. Row sizes are only known for
// table schemas.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub file: String,
    pub kind: SchemaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_size_before: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_size_after: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub mode: &'static str,
    pub work_dir: String,
    pub files: Vec<FileReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_left: Option<String>,
    pub duration_ms: u128,
}

#[derive(Debug)]
pub struct FileSet {
    pub table_files: Vec<PathBuf>,
    pub database_files: Vec<PathBuf>,
}

impl FileSet {
    pub fn len(&self) -> usize {
        self.table_files.len() + self.database_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table_files.is_empty() && self.database_files.is_empty()
    }
}

// One discovery pass over a directory, non-recursive. The returned set
// stays frozen for the whole run so staged or backed up outputs can
// never re-enter the pipeline.
pub fn discover(dir: &Path) -> Result<FileSet> {
    let table_glob = Pattern::new(TABLE_SCHEMA_GLOB).expect("valid table schema glob");
    let database_glob = Pattern::new(DATABASE_SCHEMA_GLOB).expect("valid database schema glob");

    let mut table_files = Vec::new();
    let mut database_files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if database_glob.matches(name) {
            database_files.push(entry.path());
        } else if table_glob.matches(name) {
            table_files.push(entry.path());
        }
    }
    table_files.sort();
    database_files.sort();
    Ok(FileSet {
        table_files,
        database_files,
    })
}

// Copy-then-delete move that works across filesystems. The source is
// only deleted after the full copy succeeded.
pub fn move_file(src: &Path, dst: &Path) -> Result<()> {
    let move_err = |source: io::Error| ConvertError::Move {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source,
    };
    let mut input = File::open(src).map_err(move_err)?;
    let mut output = File::create(dst).map_err(move_err)?;
    io::copy(&mut input, &mut output).map_err(move_err)?;
    drop(input);
    drop(output);
    fs::remove_file(src).map_err(move_err)?;
    Ok(())
}

// Convert mode: rewrite every schema file in work, keeping the
// originals under the backup dir.
pub fn run_convert(
    work: &Path,
    rewriter: &SchemaRewriter,
    progress: &ProgressManager,
) -> Result<RunReport> {
    let start = Instant::now();
    let backup = work.join(BACKUP_DIR_NAME);
    ensure_backup_dir(&backup)?;

    let files = discover(work)?;
    logger::debug(&format!(
        "run_convert: {} table schema file(s), {} database schema file(s) in {}",
        files.table_files.len(),
        files.database_files.len(),
        work.display()
    ));
    if files.is_empty() {
        logger::warn(&format!(
            "run_convert: no schema files found in {}",
            work.display()
        ));
    }

    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(work)?
        .keep();
    logger::debug(&format!("run_convert: staging dir {}", staging.display()));

    let mut reports = Vec::with_capacity(files.len());

    // Convert everything into staging before a single original moves.
    let bar = progress.new_file_bar("Converting tables", files.table_files.len() as u64);
    for path in &files.table_files {
        let name = base_name(path);
        let schema = read_schema(path, &name)?;
        let conv = rewriter
            .convert_table(&schema)
            .map_err(|e| e.in_file(&name))?;
        write_schema(&staging.join(&name), &name, &conv.sql)?;
        logger::debug(&format!(
            "run_convert: staged table schema {} (row size {} -> {})",
            name, conv.initial_size, conv.final_size
        ));
        reports.push(FileReport {
            file: name,
            kind: SchemaKind::Table,
            row_size_before: Some(conv.initial_size),
            row_size_after: Some(conv.final_size),
        });
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish();
    }

    let bar = progress.new_file_bar("Converting databases", files.database_files.len() as u64);
    for path in &files.database_files {
        let name = base_name(path);
        let schema = read_schema(path, &name)?;
        write_schema(&staging.join(&name), &name, &rewriter.convert_database(&schema))?;
        logger::debug(&format!("run_convert: staged database schema {}", name));
        reports.push(FileReport {
            file: name,
            kind: SchemaKind::Database,
            row_size_before: None,
            row_size_after: None,
        });
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish();
    }

    // Move the originals aside, then promote the converted files into
    // the vacated names.
    let bar = progress.new_file_bar("Backing up", files.len() as u64);
    for path in files.table_files.iter().chain(&files.database_files) {
        let name = base_name(path);
        move_file(path, &backup.join(&name))?;
        logger::debug(&format!("run_convert: backed up {}", name));
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish();
    }

    let bar = progress.new_file_bar("Promoting", files.len() as u64);
    for path in files.table_files.iter().chain(&files.database_files) {
        let name = base_name(path);
        move_file(&staging.join(&name), path)?;
        logger::debug(&format!("run_convert: promoted {}", name));
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish();
    }

    let staging_left = if is_empty_dir(&staging) {
        fs::remove_dir(&staging)?;
        None
    } else {
        logger::warn(&format!(
            "run_convert: staging dir {} is not empty, leaving it for inspection",
            staging.display()
        ));
        Some(staging.display().to_string())
    };

    Ok(RunReport {
        mode: "convert",
        work_dir: work.display().to_string(),
        files: reports,
        staging_left,
        duration_ms: start.elapsed().as_millis(),
    })
}

// Recovery mode: move every backed up schema file back into work. The
// emptied backup dir is left in place.
pub fn run_recover(work: &Path, progress: &ProgressManager) -> Result<RunReport> {
    let start = Instant::now();
    let backup = work.join(BACKUP_DIR_NAME);
    if !backup.is_dir() {
        return Err(ConvertError::BackupMissing(backup));
    }

    let files = discover(&backup)?;
    logger::debug(&format!(
        "run_recover: {} table schema file(s), {} database schema file(s) in {}",
        files.table_files.len(),
        files.database_files.len(),
        backup.display()
    ));
    if files.is_empty() {
        logger::warn(&format!(
            "run_recover: no schema files found in {}",
            backup.display()
        ));
    }

    let mut reports = Vec::with_capacity(files.len());
    let bar = progress.new_file_bar("Recovering", files.len() as u64);
    let tagged = files
        .table_files
        .iter()
        .map(|p| (SchemaKind::Table, p))
        .chain(files.database_files.iter().map(|p| (SchemaKind::Database, p)));
    for (kind, path) in tagged {
        let name = base_name(path);
        move_file(path, &work.join(&name))?;
        logger::debug(&format!("run_recover: restored {}", name));
        reports.push(FileReport {
            file: name,
            kind,
            row_size_before: None,
            row_size_after: None,
        });
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish();
    }

    Ok(RunReport {
        mode: "recover",
        work_dir: work.display().to_string(),
        files: reports,
        staging_left: None,
        duration_ms: start.elapsed().as_millis(),
    })
}

// The backup dir must be absent or an empty leftover from a recovered
// run; anything else means unrecovered originals could be clobbered.
fn ensure_backup_dir(backup: &Path) -> Result<()> {
    if backup.is_dir() {
        if !is_empty_dir(backup) {
            return Err(ConvertError::BackupNotEmpty(backup.to_path_buf()));
        }
    } else if backup.exists() {
        return Err(ConvertError::BackupNotDir(backup.to_path_buf()));
    } else {
        fs::create_dir(backup)?;
    }
    Ok(())
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

fn read_schema(path: &Path, name: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|e| ConvertError::from(e).in_file(name))
}

fn write_schema(path: &Path, name: &str, sql: &str) -> Result<()> {
    fs::write(path, sql).map_err(|e| ConvertError::from(e).in_file(name))
}
