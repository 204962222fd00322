use anyhow::{bail, Context, Result};
use solmove_transform::SourceFile;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Reads every `.sol` file named directly or found under a named directory, sorted by path.
pub fn collect(paths: &[PathBuf]) -> Result<Vec<SourceFile>> {
    let mut found = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.with_context(|| format!("walking {}", path.display()))?;
                if entry.file_type().is_file() && is_solidity(entry.path()) {
                    found.push(entry.into_path());
                }
            }
        } else if path.is_file() {
            found.push(path.clone());
        } else {
            bail!("{} does not exist", path.display());
        }
    }
    found.sort();
    found.dedup();

    found
        .into_iter()
        .map(|path| {
            let source = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok(SourceFile::new(path.display().to_string(), source))
        })
        .collect()
}

fn is_solidity(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("sol")
}
