//! Parser for tab-separated game header files.
//!
//! One game per line, eight tab-separated fields:
//!
//! ```text
//! white<TAB>black<TAB>whiteElo<TAB>blackElo<TAB>result<TAB>year<TAB>eco<TAB>plies
//! ```
//!
//! Missing optional fields are written as `?`. Results use conventional
//! notation (`1-0`, `1/2-1/2`, `0-1`, `*`). Blank lines and lines starting
//! with `#` are skipped.

use crate::error::{CollectionError, Result};
use crate::types::{GameHeader, GameResult};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const FIELDS_PER_LINE: usize = 8;

/// Reads a file tolerating ISO-8859-1 (Latin-1) content.
///
/// Older chess exports predate UTF-8 and store player names in Latin-1; each
/// byte maps directly to the Unicode code point of the same value.
fn read_lines_latin1(path: &Path) -> Result<Vec<String>> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let content: String = bytes.iter().map(|&b| b as char).collect();
    Ok(content.lines().map(|s| s.to_string()).collect())
}

/// Load all game headers from `path`, in file order.
pub fn load_game_file(path: &Path) -> Result<Vec<GameHeader>> {
    let file_name = path.display().to_string();
    let mut games = Vec::new();

    for (lineno, line) in read_lines_latin1(path)?.iter().enumerate() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        games.push(parse_game_line(&file_name, lineno + 1, line)?);
    }

    Ok(games)
}

/// Write game headers to `path` in the format `load_game_file` reads.
pub fn write_game_file(path: &Path, games: &[GameHeader]) -> Result<()> {
    let mut file = File::create(path)?;
    for game in games {
        writeln!(file, "{}", format_game_line(game))?;
    }
    Ok(())
}

fn parse_game_line(file: &str, lineno: usize, line: &str) -> Result<GameHeader> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != FIELDS_PER_LINE {
        return Err(CollectionError::FieldCountMismatch {
            expected: FIELDS_PER_LINE,
            found: fields.len(),
            line: lineno,
        });
    }

    if fields[0].is_empty() || fields[1].is_empty() {
        return Err(CollectionError::ParseError {
            file: file.to_string(),
            line: lineno,
            reason: "player name may not be empty".to_string(),
        });
    }

    Ok(GameHeader {
        white: fields[0].to_string(),
        black: fields[1].to_string(),
        white_elo: parse_optional_u16("whiteElo", fields[2])?,
        black_elo: parse_optional_u16("blackElo", fields[3])?,
        result: parse_result(fields[4])?,
        year: parse_optional_u16("year", fields[5])?,
        eco: match fields[6] {
            "?" => None,
            eco => Some(eco.to_string()),
        },
        ply_count: fields[7]
            .parse()
            .map_err(|_| CollectionError::InvalidValue {
                field: "plies".to_string(),
                value: fields[7].to_string(),
            })?,
    })
}

fn format_game_line(game: &GameHeader) -> String {
    fn opt(value: Option<u16>) -> String {
        value.map_or_else(|| "?".to_string(), |v| v.to_string())
    }

    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        game.white,
        game.black,
        opt(game.white_elo),
        opt(game.black_elo),
        game.result.as_str(),
        opt(game.year),
        game.eco.as_deref().unwrap_or("?"),
        game.ply_count,
    )
}

fn parse_result(s: &str) -> Result<GameResult> {
    match s {
        "1-0" => Ok(GameResult::WhiteWin),
        "1/2-1/2" => Ok(GameResult::Draw),
        "0-1" => Ok(GameResult::BlackWin),
        "*" => Ok(GameResult::Unknown),
        _ => Err(CollectionError::InvalidValue {
            field: "result".to_string(),
            value: s.to_string(),
        }),
    }
}

fn parse_optional_u16(field: &str, s: &str) -> Result<Option<u16>> {
    if s == "?" {
        return Ok(None);
    }
    s.parse()
        .map(Some)
        .map_err(|_| CollectionError::InvalidValue {
            field: field.to_string(),
            value: s.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_complete_line() {
        let game =
            parse_game_line("test", 1, "Fischer\tSpassky\t2785\t2660\t1-0\t1972\tD59\t81").unwrap();
        assert_eq!(game.white, "Fischer");
        assert_eq!(game.black, "Spassky");
        assert_eq!(game.white_elo, Some(2785));
        assert_eq!(game.result, GameResult::WhiteWin);
        assert_eq!(game.eco.as_deref(), Some("D59"));
        assert_eq!(game.ply_count, 81);
    }

    #[test]
    fn test_parse_missing_optionals() {
        let game = parse_game_line("test", 1, "A\tB\t?\t?\t*\t?\t?\t0").unwrap();
        assert_eq!(game.white_elo, None);
        assert_eq!(game.black_elo, None);
        assert_eq!(game.year, None);
        assert_eq!(game.eco, None);
        assert_eq!(game.result, GameResult::Unknown);
    }

    #[test]
    fn test_parse_rejects_bad_field_count() {
        let err = parse_game_line("test", 3, "A\tB\t2000").unwrap_err();
        match err {
            CollectionError::FieldCountMismatch {
                expected,
                found,
                line,
            } => {
                assert_eq!(expected, 8);
                assert_eq!(found, 3);
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_result() {
        let err = parse_game_line("test", 1, "A\tB\t?\t?\t2-0\t?\t?\t10").unwrap_err();
        assert!(matches!(err, CollectionError::InvalidValue { .. }));
    }

    #[test]
    fn test_format_round_trips() {
        let game = GameHeader {
            white: "Karpov".to_string(),
            black: "Kasparov".to_string(),
            white_elo: Some(2700),
            black_elo: None,
            result: GameResult::Draw,
            year: Some(1984),
            eco: Some("C42".to_string()),
            ply_count: 120,
        };
        let line = format_game_line(&game);
        let parsed = parse_game_line("test", 1, &line).unwrap();
        assert_eq!(parsed, game);
    }
}
