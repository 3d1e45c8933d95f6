// Player pool loading from CSV.
//
// Columns: id,name,position,team,salary,points[,std_dev]. Extra columns are
// ignored; `projected_points` is accepted as an alias for `points`.

use serde::Deserialize;
use slateforge_core::{Player, PlayerId};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV row (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawPlayer {
    id: u64,
    #[serde(default)]
    name: String,
    position: String,
    #[serde(default)]
    team: String,
    salary: u32,
    #[serde(alias = "projected_points")]
    points: f64,
    #[serde(default)]
    std_dev: Option<f64>,
}

// ---------------------------------------------------------------------------
// Reader-based loader (enables testing without temp files)
// ---------------------------------------------------------------------------

/// Parse players from CSV. Malformed rows, rows with non-finite numbers and
/// repeated ids are skipped with a warning; the first occurrence of an id wins.
pub fn load_players_from_reader<R: Read>(rdr: R) -> Result<Vec<Player>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(rdr);
    let mut players = Vec::new();
    let mut seen = HashSet::new();

    for result in reader.deserialize::<RawPlayer>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
                continue;
            }
        };

        let name = raw.name.trim();
        if !raw.points.is_finite() {
            warn!("skipping player {} '{}': non-finite points value", raw.id, name);
            continue;
        }
        if let Some(sd) = raw.std_dev {
            if !sd.is_finite() || sd < 0.0 {
                warn!("skipping player {} '{}': invalid std_dev {}", raw.id, name, sd);
                continue;
            }
        }
        if !seen.insert(raw.id) {
            warn!("skipping player {} '{}': duplicate id", raw.id, name);
            continue;
        }

        players.push(Player {
            id: PlayerId(raw.id),
            name: name.to_string(),
            position: raw.position.trim().to_string(),
            team: raw.team.trim().to_string(),
            salary: raw.salary,
            projected_points: raw.points,
            std_dev: raw.std_dev,
        });
    }

    Ok(players)
}

// ---------------------------------------------------------------------------
// Public path-based loader
// ---------------------------------------------------------------------------

/// Load the player pool from a CSV file. An empty pool is an error.
pub fn load_players(path: &Path) -> Result<Vec<Player>, PoolError> {
    let file = std::fs::File::open(path).map_err(|e| PoolError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let players = load_players_from_reader(file).map_err(|e| PoolError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;

    if players.is_empty() {
        return Err(PoolError::Validation(format!(
            "{} produced zero valid player rows",
            path.display()
        )));
    }

    Ok(players)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_csv_roundtrip() {
        let csv_data = "\
id,name,position,team,salary,points,std_dev
1,Josh Allen,QB,BUF,8000,25.0,7.5
21,CMC,RB,SF,9000,28.0,";

        let players = load_players_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(players.len(), 2);

        assert_eq!(players[0].id, PlayerId(1));
        assert_eq!(players[0].name, "Josh Allen");
        assert_eq!(players[0].position, "QB");
        assert_eq!(players[0].team, "BUF");
        assert_eq!(players[0].salary, 8000);
        assert!((players[0].projected_points - 25.0).abs() < f64::EPSILON);
        assert_eq!(players[0].std_dev, Some(7.5));

        assert_eq!(players[1].id, PlayerId(21));
        assert_eq!(players[1].std_dev, None);
    }

    #[test]
    fn std_dev_column_is_optional() {
        let csv_data = "\
id,name,position,team,salary,points
20,Tyreek Hill,WR,MIA,7500,22.0";

        let players = load_players_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].std_dev, None);
    }

    #[test]
    fn projected_points_alias() {
        let csv_data = "\
id,name,position,team,salary,projected_points
12,Travis Kelce,TE,KC,6500,16.0";

        let players = load_players_from_reader(csv_data.as_bytes()).unwrap();
        assert!((players[0].projected_points - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn extra_columns_ignored() {
        let csv_data = "\
id,name,position,team,salary,points,opponent,ownership
2,Stefon Diggs,WR,BUF,7000,20.0,MIA,0.18";

        let players = load_players_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "Stefon Diggs");
    }

    #[test]
    fn fields_and_headers_trimmed() {
        let csv_data = "\
id, name ,position,team,salary,points
3,  Dalton Kincaid  , TE , BUF ,5000,12.0";

        let players = load_players_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(players[0].name, "Dalton Kincaid");
        assert_eq!(players[0].position, "TE");
        assert_eq!(players[0].team, "BUF");
    }

    #[test]
    fn malformed_rows_skipped() {
        let csv_data = "\
id,name,position,team,salary,points
1,Josh Allen,QB,BUF,8000,25.0
x,Bad Id,WR,NYG,3000,8.0
4,James Cook,RB,BUF,lots,15.0
11,P. Mahomes,QB,KC,7800,24.0";

        let players = load_players_from_reader(csv_data.as_bytes()).unwrap();
        let ids: Vec<u64> = players.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![1, 11]);
    }

    #[test]
    fn non_finite_and_negative_values_skipped() {
        let csv_data = "\
id,name,position,team,salary,points,std_dev
1,Josh Allen,QB,BUF,8000,NaN,
2,Stefon Diggs,WR,BUF,7000,20.0,-1.0
3,Dalton Kincaid,TE,BUF,5000,12.0,inf
4,James Cook,RB,BUF,6000,15.0,4.0";

        let players = load_players_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].id, PlayerId(4));
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let csv_data = "\
id,name,position,team,salary,points
1,Josh Allen,QB,BUF,8000,25.0
1,Josh Allen (late swap),QB,BUF,8100,26.0";

        let players = load_players_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].salary, 8000);
    }

    #[test]
    fn empty_csv_returns_empty_vec() {
        let csv_data = "id,name,position,team,salary,points\n";
        let players = load_players_from_reader(csv_data.as_bytes()).unwrap();
        assert!(players.is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_players(Path::new("/nonexistent/players.csv")).unwrap_err();
        assert!(matches!(err, PoolError::Io { .. }));
    }
}
