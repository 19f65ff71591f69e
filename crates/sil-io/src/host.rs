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

//! The host filesystem backend.

use sil_core::{FileRegion, RandomAccess, ResourceError};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// An open file shared between readers, supporting positioned reads.
#[derive(Debug)]
pub struct SharedFile {
    file: Mutex<File>,
}

impl SharedFile {
    /// Opens `path` for reading.
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self::new(File::open(path)?))
    }

    /// Wraps an already open file.
    pub fn new(file: File) -> Self {
        Self {
            file: Mutex::new(file),
        }
    }

    /// Returns the current length of the file.
    pub fn len(&self) -> io::Result<u64> {
        let file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("file lock poisoned"))?;
        Ok(file.metadata()?.len())
    }
}

impl RandomAccess for SharedFile {
    fn read_at(&self, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("file lock poisoned"))?;
        file.seek(SeekFrom::Start(pos))?;
        file.read(buf)
    }
}

pub(crate) fn exists(path: &Path) -> bool {
    path.is_file()
}

pub(crate) fn size(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .ok()
        .filter(|meta| meta.is_file())
        .map(|meta| meta.len())
}

pub(crate) fn open(path: &Path) -> Result<Box<dyn Read + Send>, ResourceError> {
    let file = File::open(path).map_err(|e| map_open_error(path, e))?;
    Ok(Box::new(file))
}

pub(crate) fn file_region(path: &Path) -> Result<FileRegion, ResourceError> {
    let file = SharedFile::open(path).map_err(|e| map_open_error(path, e))?;
    let len = file.len()?;
    Ok(FileRegion::new(Arc::new(file), 0, len))
}

fn map_open_error(path: &Path, err: io::Error) -> ResourceError {
    if err.kind() == io::ErrorKind::NotFound {
        ResourceError::NotFound(path.display().to_string())
    } else {
        ResourceError::from(err)
    }
}
