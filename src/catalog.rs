//! Built-in Marvel dataset plan.
//!
//! These are the defaults for every config section that the TOML file
//! leaves out: the source file list, the three lookup views, the three
//! materialized merges, and the comic/character linkage check.

use tabsync_core::{JoinHow, JoinSpec, LookupStep, MergePlan};

use crate::config::{FileSpec, LinkageSpec, ViewSpec};

pub const CHARACTER_INFO: &str = "marvel_characters_info";
pub const CHARACTER_STATS: &str = "charcters_stats";
pub const POWER_MATRIX: &str = "superheroes_power_matrix";
pub const CHARACTERS: &str = "characters";
pub const COMICS: &str = "comics";
pub const CHARACTERS_TO_COMICS: &str = "charactersToComics";

pub fn default_files() -> Vec<FileSpec> {
    [
        "charcters_stats.csv",
        "superheroes_power_matrix.csv",
        "charactersToComics.csv",
        "characters.csv",
        "marvel_characters_info.csv",
        "comics.csv",
        "marvel_dc_characters.xlsx",
    ]
    .into_iter()
    .map(|path| FileSpec {
        path: path.into(),
        collection: None,
    })
    .collect()
}

pub fn default_views() -> Vec<ViewSpec> {
    vec![
        ViewSpec {
            name: "characters_sheet_view".to_string(),
            spec: JoinSpec {
                base: CHARACTER_INFO.to_string(),
                lookups: vec![
                    LookupStep::new(CHARACTER_STATS, "Name", "Name", "Stats"),
                    LookupStep::new(POWER_MATRIX, "Name", "Name", "Powers"),
                ],
            },
        },
        ViewSpec {
            name: "comics_and_characters_view".to_string(),
            spec: JoinSpec {
                base: COMICS.to_string(),
                lookups: vec![
                    LookupStep::new(CHARACTERS_TO_COMICS, "comicID", "comicID", "characters"),
                    LookupStep::new(
                        CHARACTERS,
                        "characters.characterID",
                        "characterID",
                        "characters",
                    ),
                ],
            },
        },
        ViewSpec {
            name: "characters_and_comics_view".to_string(),
            spec: JoinSpec {
                base: CHARACTERS.to_string(),
                lookups: vec![
                    LookupStep::new(CHARACTERS_TO_COMICS, "characterID", "characterID", "comics"),
                    LookupStep::new(COMICS, "comics.comicID", "comicID", "comics"),
                ],
            },
        },
    ]
}

pub fn default_merges() -> Vec<MergePlan> {
    vec![
        MergePlan {
            output: "characters_sheet".to_string(),
            tables: vec![
                CHARACTER_INFO.to_string(),
                CHARACTER_STATS.to_string(),
                POWER_MATRIX.to_string(),
            ],
            on: vec!["Name".to_string(), "Name".to_string()],
            how: JoinHow::Outer,
        },
        MergePlan {
            output: "comics_and_characters".to_string(),
            tables: vec![
                COMICS.to_string(),
                CHARACTERS_TO_COMICS.to_string(),
                CHARACTERS.to_string(),
            ],
            on: vec!["comicID".to_string(), "characterID".to_string()],
            how: JoinHow::Left,
        },
        MergePlan {
            output: "characters_and_comics".to_string(),
            tables: vec![
                CHARACTERS.to_string(),
                CHARACTERS_TO_COMICS.to_string(),
                COMICS.to_string(),
            ],
            on: vec!["characterID".to_string(), "comicID".to_string()],
            how: JoinHow::Left,
        },
    ]
}

pub fn default_linkages() -> Vec<LinkageSpec> {
    vec![LinkageSpec {
        name: "comics_characters".to_string(),
        left: COMICS.to_string(),
        left_key: "comicID".to_string(),
        right: CHARACTERS.to_string(),
        right_key: "characterID".to_string(),
        link: CHARACTERS_TO_COMICS.to_string(),
    }]
}
