// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use std::fs;
use std::io::Write as _;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Replace `path` with `data` through a sibling temporary file, so a
/// crash leaves either the old or the new content behind.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|err| Error::io(dir, err))?;
    let mut file = NamedTempFile::new_in(dir).map_err(|err| Error::io(dir, err))?;
    file.write_all(data).map_err(|err| Error::io(file.path(), err))?;
    file.as_file()
        .sync_all()
        .map_err(|err| Error::io(file.path(), err))?;
    file.persist(path).map_err(|err| Error::io(path, err.error))?;
    Ok(())
}
