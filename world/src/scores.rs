//! Best results per level, kept in a JSON file between runs.

use std::{fs, io, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::LevelFileError;

/// Best results on one level. Time and distance are tracked separately, so
/// the fastest run need not be the shortest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HighScore {
    /// Fastest completion in seconds.
    pub time: Option<f64>,
    /// Shortest distance walked to completion, in tiles.
    pub moves: Option<f64>,
}

/// High scores indexed by level.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighScores {
    levels: Vec<HighScore>,
}

impl HighScores {
    /// Creates an empty table for `level_count` levels.
    #[must_use]
    pub fn new(level_count: usize) -> Self {
        Self {
            levels: vec![HighScore::default(); level_count],
        }
    }

    /// Number of levels the table covers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the table covers no level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Best results on the level at `index`; empty for unknown levels.
    #[must_use]
    pub fn level(&self, index: usize) -> HighScore {
        self.levels.get(index).copied().unwrap_or_default()
    }

    /// Records a completed run, keeping whichever of each score is better.
    ///
    /// Returns whether either score improved.
    pub fn record(&mut self, index: usize, time: Duration, moves: f64) -> bool {
        if self.levels.len() <= index {
            self.levels.resize(index + 1, HighScore::default());
        }
        let Some(best) = self.levels.get_mut(index) else {
            return false;
        };
        let time = time.as_secs_f64();
        let mut improved = false;
        if best.time.map_or(true, |best| time < best) {
            best.time = Some(time);
            improved = true;
        }
        if best.moves.map_or(true, |best| moves < best) {
            best.moves = Some(moves);
            improved = true;
        }
        improved
    }
}

/// Reads the high score file, padded to `level_count` levels. A missing file
/// is an empty table.
pub fn load_high_scores(path: &Path, level_count: usize) -> Result<HighScores, LevelFileError> {
    let mut scores = match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents)?,
        Err(source) if source.kind() == io::ErrorKind::NotFound => HighScores::default(),
        Err(source) => {
            return Err(LevelFileError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if scores.levels.len() < level_count {
        scores.levels.resize(level_count, HighScore::default());
    }
    Ok(scores)
}

/// Writes the high score file.
pub fn save_high_scores(path: &Path, scores: &HighScores) -> Result<(), LevelFileError> {
    let json = serde_json::to_string_pretty(scores)?;
    fs::write(path, json).map_err(|source| LevelFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_better_scores_replace_the_record() {
        let mut scores = HighScores::new(2);

        assert!(scores.record(1, Duration::from_secs(40), 30.0));
        assert!(!scores.record(1, Duration::from_secs(45), 35.0));
        assert!(scores.record(1, Duration::from_secs(38), 31.5));

        assert_eq!(
            scores.level(1),
            HighScore {
                time: Some(38.0),
                moves: Some(30.0)
            }
        );
        assert_eq!(scores.level(0), HighScore::default());
    }

    #[test]
    fn recording_an_unknown_level_grows_the_table() {
        let mut scores = HighScores::default();

        assert!(scores.record(2, Duration::from_millis(1_500), 4.0));

        assert_eq!(scores.len(), 3);
        assert_eq!(scores.level(2).time, Some(1.5));
    }

    #[test]
    fn scores_survive_a_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "maze-hunt-scores-{}.json",
            std::process::id()
        ));
        let mut scores = HighScores::new(1);
        let _ = scores.record(0, Duration::from_secs(12), 20.25);

        save_high_scores(&path, &scores).expect("save");
        let loaded = load_high_scores(&path, 3).expect("load");
        let _ = fs::remove_file(&path);

        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.level(0), scores.level(0));
        assert_eq!(loaded.level(2), HighScore::default());
    }

    #[test]
    fn missing_file_is_an_empty_table() {
        let scores = load_high_scores(Path::new("/definitely/not/here/scores.json"), 2)
            .expect("missing file is fine");

        assert_eq!(scores, HighScores::new(2));
    }
}
