use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use game_space_snake::{GridConfig, GridPos, GridSize, PlacementRule};
use serde::Deserialize;

const SUPPORTED_SETTINGS_VERSION: u32 = 1;
pub(crate) const DEFAULT_MULTI_MAX_POINTS: u32 = 3;

/// Loads grid demo settings from `path`, overlaying them onto the default
/// grid configuration.
pub(crate) fn load_grid_config(path: impl AsRef<Path>) -> Result<GridConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read demo settings from {}", path.display()))?;
    parse_grid_config(&contents)
}

fn parse_grid_config(contents: &str) -> Result<GridConfig> {
    let file: SettingsFile =
        toml::from_str(contents).context("failed to parse demo settings toml contents")?;
    if file.version != SUPPORTED_SETTINGS_VERSION {
        bail!(
            "unsupported demo settings version {}; expected {}",
            file.version,
            SUPPORTED_SETTINGS_VERSION
        );
    }

    let mut config = GridConfig::default();
    let grid = file.grid;
    if let Some(size) = grid.size {
        apply_grid_size(&mut config, size)?;
    }
    if let Some(seed) = grid.seed {
        config.rng_seed = seed;
    }
    if let Some(ms) = grid.base_step_interval_ms {
        config.base_step_interval = nonzero_millis(ms, "base_step_interval_ms")?;
    }
    if let Some(ms) = grid.speedup_per_point_ms {
        // A zero speed-up keeps the cadence fixed, which is valid.
        config.speedup_per_point = Duration::from_millis(ms);
    }
    if let Some(ms) = grid.min_step_interval_ms {
        config.min_step_interval = nonzero_millis(ms, "min_step_interval_ms")?;
    }
    let max_points = grid.multi_max_points.unwrap_or(DEFAULT_MULTI_MAX_POINTS);
    if let Some(name) = grid.placement.as_deref() {
        config.placement = parse_placement(name, max_points)?;
    }
    Ok(config)
}

/// Replaces the playfield bound and recenters the starting snake on it.
pub(crate) fn apply_grid_size(config: &mut GridConfig, size: u32) -> Result<()> {
    if size == 0 {
        bail!("grid size must be at least 1");
    }
    config.grid_size = GridSize::new(size);
    config.initial_snake = vec![GridPos::new(size / 2, size / 2)];
    Ok(())
}

/// Parses a placement rule name: `single`, `multi` or `auto`.
pub(crate) fn parse_placement(name: &str, multi_max_points: u32) -> Result<PlacementRule> {
    if multi_max_points == 0 {
        bail!("multi_max_points must be at least 1");
    }
    match name.trim().to_ascii_lowercase().as_str() {
        "single" => Ok(PlacementRule::SingleSlot),
        "multi" => Ok(PlacementRule::MultiSlot {
            max_points: multi_max_points,
        }),
        "auto" => Ok(PlacementRule::AutoRespawn),
        other => bail!("unknown placement rule `{other}`; expected single, multi or auto"),
    }
}

fn nonzero_millis(ms: u64, field: &str) -> Result<Duration> {
    if ms == 0 {
        bail!("{field} must be greater than zero");
    }
    Ok(Duration::from_millis(ms))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    version: u32,
    #[serde(default)]
    grid: GridSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GridSection {
    size: Option<u32>,
    seed: Option<u64>,
    base_step_interval_ms: Option<u64>,
    speedup_per_point_ms: Option<u64>,
    min_step_interval_ms: Option<u64>,
    placement: Option<String>,
    multi_max_points: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_settings_file() {
        let settings = r#"
            version = 1

            [grid]
            size = 12
            seed = 7
            base_step_interval_ms = 150
            speedup_per_point_ms = 4
            min_step_interval_ms = 40
            placement = "multi"
            multi_max_points = 5
        "#;

        let config = parse_grid_config(settings).expect("settings parse");

        assert_eq!(config.grid_size, GridSize::new(12));
        assert_eq!(config.initial_snake, vec![GridPos::new(6, 6)]);
        assert_eq!(config.rng_seed, 7);
        assert_eq!(config.base_step_interval, Duration::from_millis(150));
        assert_eq!(config.speedup_per_point, Duration::from_millis(4));
        assert_eq!(config.min_step_interval, Duration::from_millis(40));
        assert_eq!(config.placement, PlacementRule::MultiSlot { max_points: 5 });
    }

    #[test]
    fn a_bare_version_keeps_the_defaults() {
        let config = parse_grid_config("version = 1").expect("settings parse");
        assert_eq!(config, GridConfig::default());
    }

    #[test]
    fn rejects_future_versions() {
        let result = parse_grid_config("version = 2");
        assert!(result.is_err(), "version 2 settings should fail");
    }

    #[test]
    fn rejects_unknown_keys() {
        let settings = r#"
            version = 1

            [grid]
            sizee = 12
        "#;

        assert!(parse_grid_config(settings).is_err());
    }

    #[test]
    fn rejects_a_zero_step_interval() {
        let settings = r#"
            version = 1

            [grid]
            base_step_interval_ms = 0
        "#;

        assert!(parse_grid_config(settings).is_err());
    }

    #[test]
    fn rejects_unknown_placement_names() {
        let settings = r#"
            version = 1

            [grid]
            placement = "sprinkle"
        "#;

        assert!(parse_grid_config(settings).is_err());
    }

    #[test]
    fn resizing_recenters_the_starting_snake() {
        let mut config = GridConfig::default();
        apply_grid_size(&mut config, 9).expect("valid size");

        assert_eq!(config.grid_size, GridSize::new(9));
        assert_eq!(config.initial_snake, vec![GridPos::new(4, 4)]);
    }

    #[test]
    fn a_zero_grid_is_refused() {
        let mut config = GridConfig::default();
        assert!(apply_grid_size(&mut config, 0).is_err());
    }
}
