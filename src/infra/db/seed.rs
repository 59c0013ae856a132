//! Deterministic sample catalog for local development.
//!
//! Rows are generated from fixed word banks and index arithmetic, so the
//! same counts always produce the same catalog. Everything goes through the
//! regular write repositories rather than bulk inserts.

use time::{Date, macros::date};
use tracing::info;

use crate::application::repos::{
    AuthorsWriteRepo, BooksWriteRepo, CreateAuthorParams, CreateBookParams, RepoError,
};

use super::SqliteRepositories;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Bram", "Clara", "Dexter", "Elena", "Festus", "Greta", "Hugo", "Iris", "Jonas",
];
const LAST_NAMES: &[&str] = &[
    "Andersen",
    "Blackwood",
    "Calloway",
    "Duarte",
    "Ellington",
    "Fontaine",
    "Gallagher",
    "Holloway",
    "Ivanova",
    "Jennings",
];
const TITLE_MOODS: &[&str] = &[
    "Silent",
    "Borrowed",
    "Restless",
    "Gilded",
    "Hollow",
    "Distant",
    "Patient",
    "Unfinished",
    "Forgotten",
    "Midnight",
];
const SUBJECTS: &[&str] = &[
    "Harbor",
    "Archive",
    "Orchard",
    "Lighthouse",
    "Monsoon",
    "Cartographer",
    "Winter",
    "Meridian",
    "Ledger",
    "Garden",
];
const WORDS: &[&str] = &[
    "the",
    "quiet",
    "river",
    "keeps",
    "its",
    "own",
    "ledger",
    "of",
    "seasons",
    "while",
    "every",
    "harbor",
    "town",
    "remembers",
    "a",
    "different",
    "winter",
    "and",
    "letters",
    "arrive",
    "years",
    "after",
    "being",
    "written",
];

/// Populate the catalog with `author_count` authors and `book_count` books.
pub async fn run(
    db: &SqliteRepositories,
    author_count: u32,
    book_count: u32,
) -> Result<(), RepoError> {
    if author_count == 0 && book_count > 0 {
        return Err(RepoError::integrity("books require at least one author"));
    }

    let mut author_ids = Vec::with_capacity(author_count as usize);
    for index in 0..author_count as usize {
        let author = db.create_author(author_params(index)).await?;
        author_ids.push(author.id);
    }

    for index in 0..book_count as usize {
        let author_id = author_ids[index % author_ids.len()];
        db.create_book(book_params(index, author_id)).await?;
    }

    info!(
        target = "biblio::seed",
        authors = author_count,
        books = book_count,
        "Seeded sample catalog"
    );
    Ok(())
}

fn author_params(index: usize) -> CreateAuthorParams {
    let name = format!(
        "{} {}",
        FIRST_NAMES[index % FIRST_NAMES.len()],
        LAST_NAMES[(index / FIRST_NAMES.len()) % LAST_NAMES.len()]
    );

    // Every fifth author has no bio, every seventh no birth date, so the
    // optional shapes show up in listings right away.
    let bio = if index % 5 == 0 {
        None
    } else {
        Some(passage(index, 24))
    };
    let birth_date = if index % 7 == 0 {
        None
    } else {
        Some(date_offset(date!(1920 - 01 - 01), (index * 211) % 25_000))
    };

    CreateAuthorParams {
        name,
        bio,
        birth_date,
    }
}

fn book_params(index: usize, author_id: i64) -> CreateBookParams {
    let mut title = format!(
        "The {} {}",
        TITLE_MOODS[index % TITLE_MOODS.len()],
        SUBJECTS[(index / TITLE_MOODS.len()) % SUBJECTS.len()]
    );
    let volume = index / (TITLE_MOODS.len() * SUBJECTS.len());
    if volume > 0 {
        title.push_str(&format!(", Volume {}", volume + 1));
    }

    let description = if index % 4 == 0 {
        None
    } else {
        Some(passage(index + 13, 60))
    };

    CreateBookParams {
        title,
        description,
        publish_date: date_offset(date!(1950 - 01 - 01), (index * 97) % 27_000),
        author_id,
    }
}

fn passage(seed: usize, words: usize) -> String {
    (0..words)
        .map(|position| WORDS[(seed * 31 + position * 7) % WORDS.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

fn date_offset(base: Date, days: usize) -> Date {
    Date::from_julian_day(base.to_julian_day() + days as i32).unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_rows_are_stable_across_runs() {
        assert_eq!(author_params(3).name, author_params(3).name);
        assert_eq!(book_params(41, 7).title, book_params(41, 7).title);
        assert_eq!(
            author_params(12).birth_date,
            author_params(12).birth_date
        );
    }

    #[test]
    fn optional_fields_cycle_through_absent_values() {
        assert!(author_params(0).bio.is_none());
        assert!(author_params(1).bio.is_some());
        assert!(author_params(7).birth_date.is_none());
        assert!(book_params(4, 1).description.is_none());
        assert!(book_params(5, 1).description.is_some());
    }

    #[test]
    fn long_descriptions_exceed_the_listing_cutoff() {
        let description = book_params(5, 1).description.expect("description is set");
        assert!(description.split_whitespace().count() > 50);
    }

    #[test]
    fn titles_grow_a_volume_suffix_after_the_first_hundred() {
        assert!(!book_params(99, 1).title.contains("Volume"));
        assert!(book_params(150, 1).title.ends_with(", Volume 2"));
    }
}
