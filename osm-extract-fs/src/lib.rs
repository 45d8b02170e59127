//! Filesystem helpers for extract inputs and outputs, built on `cap-std`
//! and `camino`.
//!
//! Every path is resolved against an ambient directory handle: absolute
//! paths against their root, relative paths against the working directory.
#![forbid(unsafe_code)]

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cap_std::{
    ambient_authority,
    fs::{Metadata, OpenOptions},
    fs_utf8::{Dir, File},
};
use std::io;

/// Open an input file for reading.
///
/// # Errors
/// Propagates the I/O error when the file cannot be opened.
pub fn open_input(path: &Utf8Path) -> io::Result<std::fs::File> {
    File::open_ambient(path, ambient_authority()).map(File::into_std)
}

/// Size of the file at `path` in bytes.
///
/// # Errors
/// Propagates the I/O error when the file cannot be inspected.
pub fn file_size(path: &Utf8Path) -> io::Result<u64> {
    let (dir, name) = parent_dir_and_name(path)?;
    dir.metadata(name.as_str()).map(|meta| meta.len())
}

/// Whether `path` exists and is a regular file.
///
/// # Errors
/// Propagates I/O errors other than the file or its directory being absent.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    metadata_if_present(path).map(|meta| meta.is_some_and(|meta| meta.is_file()))
}

/// Whether anything, file or directory, exists at `path`.
///
/// # Errors
/// Propagates I/O errors other than the entry or its directory being absent.
pub fn path_exists(path: &Utf8Path) -> io::Result<bool> {
    metadata_if_present(path).map(|meta| meta.is_some())
}

fn metadata_if_present(path: &Utf8Path) -> io::Result<Option<Metadata>> {
    let (dir, name) = match parent_dir_and_name(path) {
        Ok(found) => found,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    match dir.metadata(name.as_str()) {
        Ok(meta) => Ok(Some(meta)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Create the output file at `path`, creating missing parent directories.
///
/// Unless `overwrite` is set, an existing file is left untouched and the
/// call fails with [`io::ErrorKind::AlreadyExists`].
///
/// # Errors
/// Propagates I/O errors from creating directories or the file.
pub fn create_output(path: &Utf8Path, overwrite: bool) -> io::Result<std::fs::File> {
    ensure_parent_dir(path)?;
    let (dir, name) = parent_dir_and_name(path)?;
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    dir.open_with(name.as_str(), &options).map(File::into_std)
}

/// Create every missing directory above `path`.
///
/// # Errors
/// Propagates I/O errors from opening the root or creating directories.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    let (root, relative) = split_root(parent);
    if relative.as_str().is_empty() {
        return Ok(());
    }
    Dir::open_ambient_dir(&root, ambient_authority())?.create_dir_all(&relative)
}

fn parent_dir_and_name(path: &Utf8Path) -> io::Result<(Dir, String)> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("{path} does not name a file")))?
        .to_owned();
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, name))
}

/// Split `path` into the directory it is anchored at and the rest.
fn split_root(path: &Utf8Path) -> (Utf8PathBuf, Utf8PathBuf) {
    let mut root = Utf8PathBuf::new();
    let mut relative = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::Prefix(_) | Utf8Component::RootDir if relative.as_str().is_empty() => {
                root.push(component);
            }
            other => relative.push(other),
        }
    }
    if root.as_str().is_empty() {
        root.push(".");
    }
    (root, relative)
}
