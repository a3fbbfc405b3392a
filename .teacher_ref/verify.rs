// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::collections::{BTreeMap, HashMap};

use crate::songs::{Song, Songs};

/// Severity level for a verification issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A single verification issue found during checking.
#[derive(Debug, Clone)]
pub struct Issue {
    pub severity: Severity,
    pub category: &'static str,
    pub song_name: String,
    pub message: String,
}

/// Result of verifying a set of songs.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    pub issues: Vec<Issue>,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: VerificationReport) {
        self.issues.extend(other.issues);
    }
}

/// Checks a single song's tracks against the provided track mappings.
/// Returns an issue for each track that has no entry in the mappings.
pub fn check_track_mappings(song: &Song, track_mappings: &HashMap<String, Vec<u16>>) -> Vec<Issue> {
    song.tracks()
        .iter()
        .filter(|track| !track_mappings.contains_key(track.name()))
        .map(|track| Issue {
            severity: Severity::Warning,
            category: "track-mappings",
            song_name: song.name().to_string(),
            message: format!("track \"{}\" has no entry in track_mappings", track.name()),
        })
        .collect()
}

/// Checks all songs in a registry against the provided track mappings.
pub fn check_all_track_mappings(
    songs: &Songs,
    track_mappings: &HashMap<String, Vec<u16>>,
) -> VerificationReport {
    let mut report = VerificationReport::default();
    for song in songs.sorted_list() {
        report
            .issues
            .extend(check_track_mappings(&song, track_mappings));
    }
    report
}

/// Logs warnings for any tracks in the song that are missing from the track mappings.
/// Intended to be called right before playback starts.
pub fn warn_unmapped_tracks(song: &Song, track_mappings: &HashMap<String, Vec<u16>>) {
    let unmapped: Vec<&str> = song
        .tracks()
        .iter()
        .filter(|track| !track_mappings.contains_key(track.name()))
        .map(|track| track.name())
        .collect();

    if !unmapped.is_empty() {
        tracing::warn!(
            song = song.name(),
            tracks = ?unmapped,
            "Song has {} track(s) with no track mapping; these tracks will be silent",
            unmapped.len()
        );
    }
}

/// Prints a verification report grouped by song name.
pub fn print_report(report: &VerificationReport, songs: &Songs) {
    if report.is_clean() {
        println!("\u{2705} All {} song(s) passed verification.", songs.len());
        return;
    }

    // Group issues by song name.
    let mut by_song: BTreeMap<&str, Vec<&Issue>> = BTreeMap::new();
    for issue in &report.issues {
        by_song.entry(&issue.song_name).or_default().push(issue);
    }

    let clean_count = songs
        .sorted_list()
        .iter()
        .filter(|song| !by_song.contains_key(song.name()))
        .count();

    for (song_name, issues) in &by_song {
        let has_errors = issues.iter().any(|i| i.severity == Severity::Error);
        let icon = if has_errors {
            "\u{274c}"
        } else {
            "\u{26a0}\u{fe0f} "
        };
        println!("{} {}", icon, song_name);
        for issue in issues {
            let severity_icon = match issue.severity {
                Severity::Warning => "\u{26a0}\u{fe0f} ",
                Severity::Error => "\u{274c}",
            };
            println!(
                "   {} [{}] {}",
                severity_icon, issue.category, issue.message
            );
        }
    }

    if clean_count > 0 {
        println!("\n\u{2705} {} song(s) passed all checks.", clean_count);
    }

    println!(
        "\nSummary: {} issue(s) found across {} song(s).",
        report.issues.len(),
        by_song.len()
    );
}
