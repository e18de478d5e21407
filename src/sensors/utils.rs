use crate::errors::PowercapReadError;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Reads a sysfs file holding a single microjoule value.
pub fn read_microjoules(path: &Path) -> Result<u64, PowercapReadError> {
    let content = fs::read_to_string(path).map_err(|e| PowercapReadError::from_io(e, path))?;
    parse_microjoules(&content, path)
}

/// Parses the content of an energy_uj-like file.
/// Anything else than a non-negative integer is a malformed reading.
pub fn parse_microjoules(content: &str, path: &Path) -> Result<u64, PowercapReadError> {
    content
        .trim()
        .parse::<u64>()
        .map_err(|_| PowercapReadError::MalformedReading {
            path: path.to_path_buf(),
            content: String::from(content.trim()),
        })
}

/// Reads a sysfs file and returns its trimmed content.
pub fn read_trimmed(path: &Path) -> Result<String, PowercapReadError> {
    fs::read_to_string(path)
        .map(|s| String::from(s.trim()))
        .map_err(|e| PowercapReadError::from_io(e, path))
}

pub fn current_system_time_since_epoch() -> Duration {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
}


//  Copyright 2020 The rapl-exporter authors.
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
