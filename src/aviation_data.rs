// Copyright 2025 Chris Custine
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

//! Airport reference data loading.
//!
//! The catalog comes from the OurAirports `airports.csv` table. The file is
//! downloaded into the data directory on first use and only large airports
//! with coordinates are kept.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use traffic_engine::{AirportCatalog, AirportRecord};

pub const AIRPORTS_URL: &str = "https://davidmegginson.github.io/ourairports-data/airports.csv";
pub const AIRPORTS_FILE: &str = "airports.csv";

/// Parse an airports table, skipping rows that fail to deserialize
pub fn read_airports<R: Read>(reader: R) -> AirportCatalog {
    let mut csv_reader = csv::Reader::from_reader(reader);

    let mut records = Vec::new();
    let mut unreadable = 0;
    for result in csv_reader.deserialize::<AirportRecord>() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                debug!("Skipping unreadable airport row: {}", e);
                unreadable += 1;
            }
        }
    }

    if unreadable > 0 {
        warn!("Skipped {} unreadable rows in airport table", unreadable);
    }
    AirportCatalog::from_records(records)
}

/// Load airports from CSV file
pub fn load_airports<P: AsRef<Path>>(path: P) -> Result<AirportCatalog, Box<dyn std::error::Error>> {
    let file = File::open(path.as_ref())?;
    info!("Reading airports from {}", path.as_ref().display());
    Ok(read_airports(BufReader::new(file)))
}

/// Download the airports table if it doesn't exist yet
pub async fn download_airports(data_dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(data_dir)?;

    let file_path = data_dir.join(AIRPORTS_FILE);
    if file_path.exists() {
        debug!("{} already exists, skipping download", AIRPORTS_FILE);
        return Ok(file_path);
    }

    info!("Downloading {} from {}...", AIRPORTS_FILE, AIRPORTS_URL);
    let response = reqwest::get(AIRPORTS_URL).await?.error_for_status()?;
    let bytes = response.bytes().await?;

    std::fs::write(&file_path, &bytes)?;
    info!("Downloaded {} ({} bytes)", AIRPORTS_FILE, bytes.len());
    Ok(file_path)
}

/// Load the catalog from `data_dir`, downloading the table if needed
pub async fn load_or_download(data_dir: &Path) -> Result<AirportCatalog, Box<dyn std::error::Error>> {
    let path = download_airports(data_dir).await?;
    load_airports(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
\"id\",\"ident\",\"type\",\"name\",\"latitude_deg\",\"longitude_deg\",\"elevation_ft\",\"continent\",\"iso_country\",\"iso_region\",\"municipality\",\"scheduled_service\",\"gps_code\",\"iata_code\",\"local_code\"
3682,\"KATL\",\"large_airport\",\"Hartsfield-Jackson Atlanta International Airport\",33.6367,-84.428101,1026,\"NA\",\"US\",\"US-GA\",\"Atlanta\",\"yes\",\"KATL\",\"ATL\",\"ATL\"
5388,\"RJAA\",\"large_airport\",\"Narita International Airport\",35.764702,140.386002,141,\"AS\",\"JP\",\"JP-12\",\"Tokyo\",\"yes\",\"RJAA\",\"NRT\",\"\"
6523,\"00A\",\"heliport\",\"Total RF Heliport\",40.070985,-74.933689,11,\"NA\",\"US\",\"US-PA\",\"Bensalem\",\"no\",\"K00A\",\"\",\"00A\"
9999,\"XXXX\",\"large_airport\",\"Nowhere International\",,,,\"NA\",\"US\",\"US-XX\",\"Nowhere\",\"yes\",\"\",\"\",\"\"
";

    #[test]
    fn test_read_keeps_large_airports_with_coordinates() {
        let catalog = read_airports(SAMPLE.as_bytes());
        assert_eq!(catalog.len(), 2);

        let atlanta = catalog.get("KATL").unwrap();
        assert_eq!(atlanta.iata_code.as_deref(), Some("ATL"));
        assert_eq!(atlanta.elevation_ft, Some(1026));
        assert_eq!(atlanta.iso_country, "US");

        let narita = catalog.lookup("nrt").unwrap();
        assert_eq!(narita.ident, "RJAA");
        assert!(catalog.get("00A").is_none());
        assert!(catalog.get("XXXX").is_none());
    }

    #[test]
    fn test_unreadable_rows_are_skipped() {
        let csv = "\
ident,type,name,latitude_deg,longitude_deg
KATL,large_airport,Atlanta,33.6367,-84.4281
BAD1,large_airport,Broken,not-a-number,10.0
EGLL,large_airport,Heathrow,51.4706,-0.461941
";
        let catalog = read_airports(csv.as_bytes());
        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("BAD1").is_none());
        assert!(catalog.get("EGLL").is_some());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_airports("/nonexistent/airports.csv").is_err());
    }
}
