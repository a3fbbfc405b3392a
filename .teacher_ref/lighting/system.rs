// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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

use std::collections::HashMap;
use std::error::Error;
use std::path::Path;

use tracing::info;

use super::parser::{parse_fixture_types, parse_venues};
use super::types::{Fixture, FixtureType, Group, Venue};
use crate::config::lighting::{GroupConstraint, LogicalGroup};
use crate::config::Lighting;

/// The lighting system configuration.
pub struct LightingSystem {
    /// Global fixture types.
    fixture_types: HashMap<String, FixtureType>,

    /// Venues.
    venues: HashMap<String, Venue>,

    /// Current venue.
    current_venue: Option<String>,

    /// Inline fixtures.
    inline_fixtures: HashMap<String, String>,

    /// Inline groups.

    /// Logical groups with role-based constraints.
    logical_groups: HashMap<String, LogicalGroup>,

    /// Cached group resolutions per venue.
    group_cache: HashMap<String, HashMap<String, Vec<String>>>,
}

impl LightingSystem {
    /// Creates a new lighting system.
    pub fn new() -> LightingSystem {
        LightingSystem {
            fixture_types: HashMap::new(),
            venues: HashMap::new(),
            current_venue: None,
            inline_fixtures: HashMap::new(),
            logical_groups: HashMap::new(),
            group_cache: HashMap::new(),
        }
    }

    /// Loads the lighting configuration.
    pub fn load(&mut self, config: &Lighting, base_path: &Path) -> Result<(), Box<dyn Error>> {
        info!(
            "Loading lighting system from base path: {}",
            base_path.display()
        );

        // Set current venue
        if let Some(venue) = config.current_venue() {
            self.current_venue = Some(venue.to_string());
        }

        // Load inline fixtures and groups
        self.inline_fixtures = config.fixtures();
        self.logical_groups = config.groups();

        // Load directories if configured
        if let Some(dirs) = config.directories() {
            if let Some(fixture_types_dir) = dirs.fixture_types() {
                let path = base_path.join(fixture_types_dir);
                self.load_fixture_types_directory(&path)?;
            }

            if let Some(venues_dir) = dirs.venues() {
                let path = base_path.join(venues_dir);
                self.load_venues_directory(&path)?;
            }
        }

        Ok(())
    }

    /// Loads fixture types from a directory.
    fn load_fixture_types_directory(&mut self, dir: &Path) -> Result<(), Box<dyn Error>> {
        if !dir.exists() {
            return Ok(()); // Directory doesn't exist, skip
        }

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                // Recursively load subdirectories
                self.load_fixture_types_directory(&path)?;
            } else if path.extension().is_some_and(|ext| ext == "light") {
                // Load .light files
                self.load_fixture_types_file(&path)?;
            }
        }
        Ok(())
    }

    /// Loads venues from a directory.
    fn load_venues_directory(&mut self, dir: &Path) -> Result<(), Box<dyn Error>> {
        if !dir.exists() {
            return Ok(()); // Directory doesn't exist, skip
        }

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                // Recursively load subdirectories
                self.load_venues_directory(&path)?;
            } else if path.extension().is_some_and(|ext| ext == "light") {
                // Load .light files
                self.load_venue_file(&path)?;
            }
        }
        Ok(())
    }

    /// Loads fixture types from a file.
    fn load_fixture_types_file(&mut self, path: &Path) -> Result<(), Box<dyn Error>> {
        let content = std::fs::read_to_string(path)?;

        // Parse fixture types from DSL content
        match parse_fixture_types(&content) {
            Ok(types) => {
                for (name, fixture_type) in types {
                    info!(fixture_type = name, "Loading fixture type");
                    self.fixture_types.insert(name, fixture_type);
                }
            }
            Err(_e) => {
                // Failed to parse fixture types, continue loading other files
            }
        }

        Ok(())
    }

    /// Loads venues from a file.
    fn load_venue_file(&mut self, path: &Path) -> Result<(), Box<dyn Error>> {
        let content = std::fs::read_to_string(path)?;

        match parse_venues(&content) {
            Ok(venues) => {
                for (name, venue) in venues {
                    info!(fixture_type = name, "Loading venue");
                    self.venues.insert(name, venue);
                }
            }
            Err(_e) => {
                // Failed to parse venues, continue loading other files
            }
        }

        Ok(())
    }

    /// Gets the current venue.
    pub fn current_venue(&self) -> Option<&str> {
        self.current_venue.as_deref()
    }

    /// Gets a group by name from the current venue.
    pub fn get_group(&self, group_name: &str) -> Result<&Group, Box<dyn Error>> {
        if let Some(venue_name) = self.current_venue() {
            if let Some(venue) = self.venues.get(venue_name) {
                if let Some(group) = venue.groups().get(group_name) {
                    return Ok(group);
                }
            }
        }
        Err(format!("Group '{}' not found in current venue", group_name).into())
    }

    /// Resolves a logical group to concrete fixture names for the current venue.
    /// Returns an empty vector if the group cannot be resolved (graceful fallback).
    pub fn resolve_logical_group(
        &mut self,
        group_name: &str,
    ) -> Result<Vec<String>, Box<dyn Error>> {
        let venue_name = self.current_venue().ok_or("No current venue selected")?;

        // Check cache first
        if let Some(cached) = self
            .group_cache
            .get(venue_name)
            .and_then(|venue_cache| venue_cache.get(group_name))
        {
            return Ok(cached.clone());
        }

        // Get the logical group definition
        let logical_group = self
            .logical_groups
            .get(group_name)
            .ok_or_else(|| format!("Logical group '{}' not found", group_name))?;

        // Get the current venue
        let venue = self
            .venues
            .get(venue_name)
            .ok_or_else(|| format!("Venue '{}' not found", venue_name))?;

        // Resolve fixtures based on constraints
        let resolved_fixtures = self.resolve_group_constraints(logical_group, venue)?;

        // Cache the result
        self.group_cache
            .entry(venue_name.to_string())
            .or_default()
            .insert(group_name.to_string(), resolved_fixtures.clone());

        Ok(resolved_fixtures)
    }

    /// Resolves a logical group with graceful fallback - returns empty vector if group cannot be resolved.
    /// This allows songs to work even when some groups aren't available at the current venue.
    pub fn resolve_logical_group_graceful(&mut self, group_name: &str) -> Vec<String> {
        match self.resolve_logical_group(group_name) {
            Ok(fixtures) => fixtures,
            Err(_) => {
                // Check if the group has a FallbackTo constraint
                let fallback_group =
                    if let Some(logical_group) = self.logical_groups.get(group_name) {
                        logical_group.constraints().iter().find_map(|constraint| {
                            if let GroupConstraint::FallbackTo(fallback_group) = constraint {
                                Some(fallback_group.clone())
                            } else {
                                None
                            }
                        })
                    } else {
                        None
                    };

                if let Some(fallback_group) = fallback_group {
                    return self.resolve_logical_group_graceful(&fallback_group);
                }

                // Try legacy group system as final fallback
                if let Ok(legacy_group) = self.get_group(group_name) {
                    return legacy_group.fixtures().clone();
                }
                Vec::new()
            }
        }
    }

    /// Gets all fixtures from the current venue for effects engine registration
    pub fn get_current_venue_fixtures(
        &self,
    ) -> Result<Vec<crate::lighting::effects::FixtureInfo>, Box<dyn Error>> {
        let venue_name = self.current_venue().ok_or("No current venue selected")?;
        let venue = self
            .venues
            .get(venue_name)
            .ok_or_else(|| format!("Venue '{}' not found", venue_name))?;

        let mut fixture_infos = Vec::new();

        for (name, fixture) in venue.fixtures() {
            // Get the fixture type to determine channel mapping
            let fixture_type = self
                .fixture_types
                .get(fixture.fixture_type())
                .ok_or_else(|| format!("Fixture type '{}' not found", fixture.fixture_type()))?;

            let fixture_info = crate::lighting::effects::FixtureInfo {
                name: name.clone(),
                universe: fixture.universe() as u16,
                address: fixture.start_channel(),
                fixture_type: fixture.fixture_type().to_string(),
                channels: fixture_type.channels().clone(),
                max_strobe_frequency: fixture_type.max_strobe_frequency(),
            };

            fixture_infos.push(fixture_info);
        }

        Ok(fixture_infos)
    }

    /// Resolves group constraints to fixture names.
    fn resolve_group_constraints(
        &self,
        logical_group: &LogicalGroup,
        venue: &Venue,
    ) -> Result<Vec<String>, Box<dyn Error>> {
        let mut candidates: Vec<&Fixture> = venue.fixtures().values().collect();
        let mut min_count = 1;
        let mut max_count = candidates.len();
        let mut allow_empty = false;
        let mut preferred_tags: Vec<String> = Vec::new();

        // Apply constraints
        for constraint in logical_group.constraints() {
            match constraint {
                GroupConstraint::AllOf(required_tags) => {
                    candidates.retain(|fixture| {
                        required_tags.iter().all(|tag| fixture.tags().contains(tag))
                    });
                }
                GroupConstraint::AnyOf(any_tags) => {
                    candidates
                        .retain(|fixture| any_tags.iter().any(|tag| fixture.tags().contains(tag)));
                }
                GroupConstraint::Prefer(tags) => {
                    // Store preferred tags for later sorting (after count constraints)
                    preferred_tags = tags.clone();
                }
                GroupConstraint::MinCount(count) => {
                    min_count = *count;
                }
                GroupConstraint::MaxCount(count) => {
                    max_count = *count;
                }
                GroupConstraint::AllowEmpty(allow) => {
                    allow_empty = *allow;
                }
                GroupConstraint::FallbackTo(_) => {
                    // FallbackTo is handled at a higher level in resolve_logical_group_graceful
                    // This constraint is processed during group resolution, not constraint resolution
                }
            }
        }

        // Apply count constraints
        if candidates.len() < min_count {
            if allow_empty {
                return Ok(Vec::new());
            } else {
                return Err(format!(
                    "Not enough fixtures found for group '{}': found {}, required {}",
                    logical_group.name(),
                    candidates.len(),
                    min_count
                )
                .into());
            }
        }

        // Sort fixtures: first by preference (if Prefer constraint exists), then by name
        // This ensures preferred fixtures are selected first, but within each preference level,
        // fixtures are sorted lexicographically for consistent chase ordering
        if !preferred_tags.is_empty() {
            // Sort by preference score first, then by name
            candidates.sort_by(|a, b| {
                let a_score = preferred_tags
                    .iter()
                    .filter(|tag| a.tags().contains(tag))
                    .count();
                let b_score = preferred_tags
                    .iter()
                    .filter(|tag| b.tags().contains(tag))
                    .count();
                // First compare by preference score (higher is better)
                match b_score.cmp(&a_score) {
                    std::cmp::Ordering::Equal => {
                        // Tiebreaker: sort by name
                        a.name().cmp(b.name())
                    }
                    other => other,
                }
            });
        } else {
            // No preference constraint - just sort by name
            candidates.sort_by(|a, b| a.name().cmp(b.name()));
        }

        // Take up to max_count fixtures
        let selected: Vec<String> = candidates
            .iter()
            .take(max_count)
            .map(|fixture| fixture.name().to_string())
            .collect();

        Ok(selected)
    }
}
