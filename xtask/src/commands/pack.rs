// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::commands::pack_config::PackManifest;
use crate::helpers::*;
use anyhow::{Context, Result};
use sil_io::PackBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn pack(manifest_path: &Path) -> Result<()> {
    print_task_start("Packing Assets", PACKAGE, MAGENTA);

    let manifest = load_manifest(manifest_path)?;
    if !manifest.source.is_dir() {
        print_error(&format!(
            "Source directory '{}' not found. Nothing to pack.",
            manifest.source.display()
        ));
        return Ok(());
    }

    let files = find_source_files(&manifest.source)?;
    println!(
        "{}🔎 Found:{} {} file(s) under '{}'.",
        BOLD,
        RESET,
        files.len(),
        manifest.source.display()
    );

    let stats = build_pack(&manifest, &files)?;
    print_success(&format!(
        "Wrote {} entries ({} compressed) to '{}' ({:.2} MB of source data)",
        stats.entries,
        stats.compressed,
        manifest.output.display(),
        stats.bytes as f64 / (1024.0 * 1024.0)
    ));
    Ok(())
}

#[derive(Debug, Default, PartialEq)]
struct PackStats {
    entries: usize,
    compressed: usize,
    bytes: u64,
}

/// Writes every file in `files` to the manifest's output archive.
fn build_pack(manifest: &PackManifest, files: &[PathBuf]) -> Result<PackStats> {
    let mut builder = PackBuilder::new().with_block_size(manifest.block_size);
    let mut stats = PackStats::default();

    for path in files {
        let name = entry_name(&manifest.source, path)?;
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read source file '{}'", path.display()))?;
        stats.bytes += bytes.len() as u64;

        let compress = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| manifest.compresses(ext));
        if compress {
            builder.add_compressed(&name, &bytes)?;
            stats.compressed += 1;
        } else {
            builder.add(&name, bytes)?;
        }
        stats.entries += 1;
    }

    if let Some(parent) = manifest.output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create '{}'", parent.display()))?;
    }
    builder
        .write_file(&manifest.output)
        .with_context(|| format!("Failed to write pack '{}'", manifest.output.display()))?;
    Ok(stats)
}

/// The `/`-separated name of `path` relative to `source`.
fn entry_name(source: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(source)
        .with_context(|| format!("'{}' is outside the source directory", path.display()))?;
    let parts = relative
        .components()
        .map(|part| part.as_os_str().to_str().context("Invalid path encoding"))
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join("/"))
}

/// Loads the pack manifest, or the default configuration if it does not exist.
fn load_manifest(manifest_path: &Path) -> Result<PackManifest> {
    if !manifest_path.exists() {
        println!(
            "{}💡 Info:{} No '{}' found. Using default configuration.",
            BOLD,
            RESET,
            manifest_path.display()
        );
        return Ok(PackManifest::default());
    }
    let source = fs::read_to_string(manifest_path).with_context(|| {
        format!(
            "Failed to read manifest file at '{}'",
            manifest_path.display()
        )
    })?;
    toml::from_str(&source)
        .with_context(|| format!("Failed to parse TOML from '{}'", manifest_path.display()))
}

/// Recursively finds all files under `source`, sorted for reproducible packs.
fn find_source_files(source: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk '{}'", source.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
