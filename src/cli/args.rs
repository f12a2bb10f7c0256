//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use archive_stats::{ConfigError, EntityKind, SnapshotDate};

/// Load Bangumi archive statistics into a relational store
#[derive(Parser, Debug)]
#[command(name = "archive-stats", version, about)]
pub struct Cli {
    /// Entity kind (character, person, subject, all) or a record limit
    pub target: Option<String>,

    /// Maximum number of lines to read per file
    pub limit: Option<String>,

    /// Replay every dump from this date onwards (YYYY-MM-DD); overrides DATA_START_DATE
    #[arg(long, value_name = "DATE", value_parser = parse_date)]
    pub start_date: Option<SnapshotDate>,

    /// TOML configuration file; environment variables still take precedence
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

fn parse_date(value: &str) -> Result<SnapshotDate, String> {
    SnapshotDate::parse(value).map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

/// Entity kinds and line limit selected on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub kinds: Vec<EntityKind>,
    pub limit: Option<usize>,
}

/// Interpret the positional arguments
///
/// A numeric first argument is a limit applied to every kind. An unparseable
/// limit falls back to reading everything.
pub fn resolve_selection(
    target: Option<&str>,
    limit: Option<&str>,
) -> Result<Selection, ConfigError> {
    let Some(target) = target.map(str::trim) else {
        info!("No entity kind given, processing all kinds");
        return Ok(Selection {
            kinds: EntityKind::ALL.to_vec(),
            limit: None,
        });
    };

    if let Ok(limit) = target.parse::<usize>() {
        info!(limit, "No entity kind given, processing all kinds with a line limit");
        return Ok(Selection {
            kinds: EntityKind::ALL.to_vec(),
            limit: Some(limit),
        });
    }

    let kinds = if target.eq_ignore_ascii_case("all") {
        EntityKind::ALL.to_vec()
    } else {
        let kind = target
            .parse::<EntityKind>()
            .map_err(|_| ConfigError::UnsupportedKind(target.to_string()))?;
        vec![kind]
    };

    let limit = match limit.map(str::trim) {
        None => None,
        Some(raw) => match raw.parse::<usize>() {
            Ok(limit) => {
                info!(limit, "Limiting lines read per file");
                Some(limit)
            }
            Err(_) => {
                warn!(limit = raw, "Invalid limit, processing all records");
                None
            }
        },
    };

    Ok(Selection { kinds, limit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_all() {
        let selection = resolve_selection(None, None).unwrap();
        assert_eq!(selection.kinds, EntityKind::ALL.to_vec());
        assert_eq!(selection.limit, None);
    }

    #[test]
    fn test_numeric_first_argument_is_limit() {
        let selection = resolve_selection(Some("100"), None).unwrap();
        assert_eq!(selection.kinds.len(), 3);
        assert_eq!(selection.limit, Some(100));
    }

    #[test]
    fn test_kind_and_limit() {
        let selection = resolve_selection(Some("Subject"), Some("25")).unwrap();
        assert_eq!(selection.kinds, vec![EntityKind::Subject]);
        assert_eq!(selection.limit, Some(25));
    }

    #[test]
    fn test_invalid_limit_means_unlimited() {
        let selection = resolve_selection(Some("person"), Some("lots")).unwrap();
        assert_eq!(selection.kinds, vec![EntityKind::Person]);
        assert_eq!(selection.limit, None);
    }

    #[test]
    fn test_unsupported_kind() {
        let err = resolve_selection(Some("episode"), None).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedKind(ref k) if k == "episode"));
    }

    #[test]
    fn test_cli_parses_start_date() {
        let cli = Cli::try_parse_from(["archive-stats", "all", "--start-date", "2024-02-01"]).unwrap();
        assert_eq!(cli.target.as_deref(), Some("all"));
        assert_eq!(cli.start_date.map(|d| d.to_string()).as_deref(), Some("2024-02-01"));
        assert!(Cli::try_parse_from(["archive-stats", "--start-date", "Feb 1"]).is_err());
    }
}
