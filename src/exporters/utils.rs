//! # utils
//!
//! The utils module provides common functions used by the exporters.
use clap::crate_version;

/// Returns a label value filtered from characters that
/// could break exporters output.
///
/// Here we escape:
/// 1. Backslash by double backslash.
/// 2. Double quote by backslash double quote.
/// 3. Carriage return and line feed by `\n`.
pub fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\"', "\\\"")
        .replace('\r', "")
        .replace('\n', "\\n")
}

/// Returns rapl-exporter version represented as a float ("0.1.0" gives "0.10"),
/// so it can be exposed as a metric value.
pub fn get_version() -> String {
    let mut version_parts = crate_version!().split('.');
    let major_version = version_parts.next().unwrap_or("0");
    let minor_version = version_parts.next().unwrap_or("0");
    let patch_version = version_parts.next().unwrap_or("0");
    format!("{major_version}.{minor_version}{patch_version}")
}

/// Returns the hostname of the system, used as the `instance` label.
/// Falls back to "localhost" when it can't be resolved.
pub fn get_hostname() -> String {
    match hostname::get() {
        Ok(name) => match name.into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!("Hostname {:?} isn't valid UTF-8, using localhost", raw);
                String::from("localhost")
            }
        },
        Err(error) => {
            warn!("Couldn't resolve hostname, using localhost: {}", error);
            String::from("localhost")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_quotes_and_backslashes() {
        assert_eq!(escape_label_value(r#"a"b\c"#), r#"a\"b\\c"#);
    }

    #[test]
    fn escape_newlines() {
        assert_eq!(escape_label_value("node\r\n1"), "node\\n1");
    }

    #[test]
    fn hostname_is_never_empty() {
        assert!(!get_hostname().is_empty());
    }

    #[test]
    fn version_is_a_float() {
        let version = get_version();
        assert_eq!(version.matches('.').count(), 1);
        assert!(version.parse::<f64>().is_ok());
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
