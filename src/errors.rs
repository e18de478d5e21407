use std::convert;
use std::io;
use std::path::{Path, PathBuf};
use std::{error::Error, fmt};

/// Everything that can go wrong while reading the powercap sysfs tree.
///
/// Only [`PowercapReadError::InvalidRoot`] is meant to stop the program,
/// at startup. Every other variant is recovered at the domain or sample level.
#[derive(Debug)]
pub enum PowercapReadError {
    /// The platform exposes no power-capping files at this path.
    InterfaceAbsent(PathBuf),
    /// The files exist but can't be read by this process.
    PermissionDenied(PathBuf),
    /// A counter file was read but doesn't hold a non-negative integer.
    MalformedReading { path: PathBuf, content: String },
    /// One nested entry couldn't be enumerated and has been skipped.
    EnumerationPartialFailure {
        path: PathBuf,
        cause: Box<PowercapReadError>,
    },
    /// The root path can't be used at all (empty or relative).
    InvalidRoot(PathBuf),
    IoError(io::Error),
}

impl PowercapReadError {
    /// Classifies an I/O error met while reading `path`.
    pub fn from_io(error: io::Error, path: &Path) -> PowercapReadError {
        match error.kind() {
            io::ErrorKind::NotFound => PowercapReadError::InterfaceAbsent(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => {
                PowercapReadError::PermissionDenied(path.to_path_buf())
            }
            _ => PowercapReadError::IoError(error),
        }
    }

    /// True when the error means "no data on this host" rather than a defect.
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            PowercapReadError::InterfaceAbsent(_) | PowercapReadError::PermissionDenied(_)
        )
    }
}

impl Error for PowercapReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PowercapReadError::IoError(error) => Some(error),
            PowercapReadError::EnumerationPartialFailure { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for PowercapReadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PowercapReadError::InterfaceAbsent(path) => {
                write!(f, "No powercap files present at {}", path.display())
            }
            PowercapReadError::PermissionDenied(path) => {
                write!(f, "Can't access powercap files at {}", path.display())
            }
            PowercapReadError::MalformedReading { path, content } => write!(
                f,
                "Couldn't parse {:?} from {} as microjoules",
                content,
                path.display()
            ),
            PowercapReadError::EnumerationPartialFailure { path, cause } => {
                write!(f, "Skipped powercap entry {}: {}", path.display(), cause)
            }
            PowercapReadError::InvalidRoot(path) => write!(
                f,
                "Invalid powercap root {:?}, an absolute path is required",
                path
            ),
            PowercapReadError::IoError(error) => {
                write!(f, "Couldn't read from powercap sysfs: {}", error)
            }
        }
    }
}

impl convert::From<io::Error> for PowercapReadError {
    fn from(error: io::Error) -> Self {
        PowercapReadError::IoError(error)
    }
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
