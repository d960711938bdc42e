// src/migrate/archive.rs

//! Archive naming in the migration directory
//!
//! Volume archives are `<prefix>_<volume>_<YYYYMMDD>.tar` and image archives
//! `<prefix>_img_<image>_<YYYYMMDD>.tar`. The volume name is recovered
//! from an archive name by anchoring on the fixed-width date suffix, so a
//! volume named `data` never matches the archive of `data2`.

use chrono::Local;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Today's date stamp used in archive names
pub fn date_stamp() -> String {
    Local::now().format("%Y%m%d").to_string()
}

pub fn volume_archive_name(prefix: &str, volume: &str, date: &str) -> String {
    format!("{}_{}_{}.tar", prefix, volume, date)
}

pub fn volume_archive_path(dir: &Path, prefix: &str, volume: &str, date: &str) -> PathBuf {
    dir.join(volume_archive_name(prefix, volume, date))
}

/// Recover `(volume, date)` from a volume archive file name
pub fn parse_volume_archive(prefix: &str, file_name: &str) -> Option<(String, String)> {
    let pattern = format!(r"^{}_(.+)_(\d{{8}})\.tar$", regex::escape(prefix));
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(file_name)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Image reference with separators replaced so it is a single path component
pub fn sanitize_image_ref(image: &str) -> String {
    image
        .chars()
        .map(|c| match c {
            '/' | ':' | '.' | '@' => '_',
            other => other,
        })
        .collect()
}

pub fn image_archive_name(prefix: &str, image: &str, date: &str) -> String {
    format!("{}_img_{}_{}.tar", prefix, sanitize_image_ref(image), date)
}

pub fn image_archive_path(dir: &Path, prefix: &str, image: &str, date: &str) -> PathBuf {
    dir.join(image_archive_name(prefix, image, date))
}
