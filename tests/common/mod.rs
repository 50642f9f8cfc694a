use std::fs;
use tempfile::TempDir;

pub const U12: &str = r#"[
    {"Rank": 1, "Name": "Anna Berg", "Team": "TSV", "100m": 12.5, "Long Jump": 0, "Total Point": 12.5},
    {"Rank": 2, "Name": "John Doe", "Team": "LG Nord", "100m": 0, "Long Jump": 8.25, "Total Point": 8.25},
    {"Rank": 3, "Name": "Cleo", "Team": "TSV", "100m": "", "Long Jump": "x", "Total Point": 0}
]"#;

pub const U14: &str = r#"[
    {"Rank": 1, "Name": "Mats", "Team": "TSV", "100m": 3, "Shot Put": 7.125, "Total Point": 10.125},
    {"Rank": 2, "Name": "Ida", "Team": "LG Nord", "100m": -1, "Shot Put": 2, "Total Point": 1}
]"#;

/// A data directory with the sheets U12 and U14.
pub fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("manifest.json"),
        r#"{"sheets": ["U12", "U14"]}"#,
    )
    .unwrap();
    fs::write(dir.path().join("U12.json"), U12).unwrap();
    fs::write(dir.path().join("U14.json"), U14).unwrap();
    dir
}
