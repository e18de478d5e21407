use std::fmt;

// !!!!!!!!!!!!!!!!! Unit !!!!!!!!!!!!!!!!!!!!!!!
/// Energy units handled by the sampler. Powercap counters are in microjoules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Joule,
    MilliJoule,
    MicroJoule,
}

impl Unit {
    const ORDER: [Unit; 3] = [Unit::Joule, Unit::MilliJoule, Unit::MicroJoule];

    /// Converts `measure` from `source_unit` to `dest_unit`.
    pub fn to(measure: f64, source_unit: &Unit, dest_unit: &Unit) -> f64 {
        let pos_source = Unit::position(source_unit);
        let pos_dest = Unit::position(dest_unit);
        measure * Unit::get_mult(pos_source, pos_dest)
    }

    fn position(unit: &Unit) -> usize {
        Unit::ORDER
            .iter()
            .position(|x| x == unit)
            .unwrap_or_default()
    }

    fn get_mult(pos_source: usize, pos_dest: usize) -> f64 {
        let mut mult: f64 = 1.0;
        if pos_dest > pos_source {
            // source is the bigger unit
            for _ in 0..(pos_dest - pos_source) {
                mult *= 1000.0;
            }
        } else if pos_dest < pos_source {
            for _ in 0..(pos_source - pos_dest) {
                mult /= 1000.0;
            }
        }
        mult
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Joule => write!(f, "Joules"),
            Unit::MilliJoule => write!(f, "MilliJoules"),
            Unit::MicroJoule => write!(f, "MicroJoules"),
        }
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
