//! Request validation for the catalog API.
//!
//! Bodies arrive as raw JSON values and query strings as ordered key/value
//! pairs; each endpoint function applies its field rules, collects every
//! failure into a per-field message list and either returns the parsed input
//! or a 422 carrying all of them. Message wording follows the conventions
//! well-known web frameworks trained API clients on, so swapping the backend
//! does not break client-side error rendering: empty strings count as absent,
//! attribute names are humanized (`perPage` reads "per page") and each rule
//! has a fixed sentence.

use serde_json::Value;
use time::Date;

use crate::application::columns;
use crate::application::pagination::{BookCursor, DEFAULT_PER_PAGE, OffsetRequest};
use crate::application::repos::{
    CreateAuthorParams, CreateBookParams, UpdateAuthorParams, UpdateBookParams,
};
use crate::domain::catalog::DATE_FORMAT;

use super::error::{ApiError, FieldErrors};

const MAX_NAME_LEN: usize = 255;
const MAX_TITLE_LEN: usize = 255;
const MIN_AUTHOR_SEARCH_LEN: usize = 3;
const MIN_BOOK_SEARCH_LEN: usize = 5;
const MAX_SEARCH_LEN: usize = 20;

#[derive(Debug, Default)]
struct Ruleset {
    errors: FieldErrors,
}

impl Ruleset {
    fn fail(&mut self, field: &str, message: String) {
        self.errors.entry(field.to_string()).or_default().push(message);
    }

    fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(self.errors))
        }
    }
}

/// Build a 422 for a single field, used when a rule can only be checked
/// after validation proper (the author referenced by a book, for example).
pub fn single_field_error(field: &str, message: String) -> ApiError {
    let mut errors = FieldErrors::new();
    errors.insert(field.to_string(), vec![message]);
    ApiError::validation(errors)
}

pub fn selected_invalid_message(field: &str) -> String {
    format!("The selected {} is invalid.", display_name(field))
}

// ---- request bodies ----

pub fn author_store(body: &Value) -> Result<CreateAuthorParams, ApiError> {
    let mut rules = Ruleset::default();
    let name = required_string(body, "name", MAX_NAME_LEN, &mut rules);
    let bio = optional_string(body, "bio", &mut rules);
    let birth_date = optional_date(body, "birth_date", &mut rules);
    rules.finish()?;

    // finish() proved every required field present and well formed
    Ok(CreateAuthorParams {
        name: name.unwrap_or_default(),
        bio,
        birth_date,
    })
}

pub fn author_update(body: &Value) -> Result<UpdateAuthorParams, ApiError> {
    let mut rules = Ruleset::default();
    let name = patch_required_string(body, "name", MAX_NAME_LEN, &mut rules);
    let bio = patch_nullable_string(body, "bio", &mut rules);
    let birth_date = patch_nullable_date(body, "birth_date", &mut rules);
    rules.finish()?;

    Ok(UpdateAuthorParams {
        name,
        bio,
        birth_date,
    })
}

pub fn book_store(body: &Value) -> Result<CreateBookParams, ApiError> {
    let mut rules = Ruleset::default();
    let title = required_string(body, "title", MAX_TITLE_LEN, &mut rules);
    let description = optional_string(body, "description", &mut rules);
    let publish_date = required_date(body, "publish_date", &mut rules);
    let author_id = required_integer(body, "author_id", &mut rules);
    rules.finish()?;

    // finish() proved every required field present and well formed
    Ok(CreateBookParams {
        title: title.unwrap_or_default(),
        description,
        publish_date: publish_date.unwrap_or(Date::MIN),
        author_id: author_id.unwrap_or_default(),
    })
}

pub fn book_update(body: &Value) -> Result<UpdateBookParams, ApiError> {
    let mut rules = Ruleset::default();
    let title = patch_required_string(body, "title", MAX_TITLE_LEN, &mut rules);
    let description = patch_nullable_string(body, "description", &mut rules);
    let publish_date = patch_required_date(body, "publish_date", &mut rules);
    let author_id = patch_required_integer(body, "author_id", &mut rules);
    rules.finish()?;

    Ok(UpdateBookParams {
        title,
        description,
        publish_date,
        author_id,
    })
}

// ---- query strings ----

#[derive(Debug)]
pub struct AuthorIndexQuery {
    pub search: Option<String>,
    pub page: OffsetRequest,
}

pub fn author_index(params: &[(String, String)]) -> Result<AuthorIndexQuery, ApiError> {
    let mut rules = Ruleset::default();
    let search = query_string_length(
        params,
        "search",
        MIN_AUTHOR_SEARCH_LEN,
        MAX_SEARCH_LEN,
        &mut rules,
    );
    let per_page = query_integer_min(params, "perPage", 1, &mut rules);
    let page = query_integer_min(params, "page", 1, &mut rules);
    rules.finish()?;

    Ok(AuthorIndexQuery {
        search,
        page: OffsetRequest::new(page.unwrap_or(1), per_page.unwrap_or(DEFAULT_PER_PAGE)),
    })
}

#[derive(Debug)]
pub struct BookIndexQuery {
    pub search: Option<String>,
    pub publish_date: Option<Date>,
    pub per_page: u32,
    pub cursor: Option<BookCursor>,
    pub columns: Option<Vec<&'static str>>,
}

pub fn book_index(params: &[(String, String)]) -> Result<BookIndexQuery, ApiError> {
    let mut rules = Ruleset::default();
    let search = query_string_length(
        params,
        "search",
        MIN_BOOK_SEARCH_LEN,
        MAX_SEARCH_LEN,
        &mut rules,
    );
    let publish_date = query_date(params, "publish_date", &mut rules);
    let per_page = query_integer_min(params, "perPage", 1, &mut rules);
    let cursor_raw = query_string(params, "cursor", &mut rules);
    let columns = query_columns(params, columns::BOOK_COLUMNS, &mut rules);
    rules.finish()?;

    // A cursor that fails to decode means a stale or hand-edited link; the
    // listing restarts from the first page instead of erroring.
    let cursor = cursor_raw
        .as_deref()
        .and_then(|raw| BookCursor::decode(raw).ok());

    Ok(BookIndexQuery {
        search,
        publish_date,
        per_page: per_page.unwrap_or(DEFAULT_PER_PAGE),
        cursor,
        columns,
    })
}

#[derive(Debug)]
pub struct AuthorBooksQuery {
    pub page: OffsetRequest,
    pub page_name: String,
    pub total: Option<u64>,
    pub columns: Option<Vec<&'static str>>,
}

pub fn author_books(params: &[(String, String)]) -> Result<AuthorBooksQuery, ApiError> {
    let mut rules = Ruleset::default();
    let per_page = query_integer_min(params, "perPage", 1, &mut rules);
    let page_name = query_string(params, "pageName", &mut rules);
    let columns = query_columns(params, columns::BOOK_COLUMNS, &mut rules);
    rules.finish()?;

    let page_name = page_name.unwrap_or_else(|| "page".to_string());

    // The page number under the chosen name is read the way paginator front
    // ends read it: anything unusable falls back to page one.
    let page = query_value(params, &page_name)
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|page| *page >= 1)
        .unwrap_or(1);
    let total = query_value(params, "total").and_then(|raw| raw.parse::<u64>().ok());

    Ok(AuthorBooksQuery {
        page: OffsetRequest::new(page, per_page.unwrap_or(DEFAULT_PER_PAGE)),
        page_name,
        total,
        columns,
    })
}

// ---- body field rules ----

enum Field<'a> {
    Absent,
    /// Explicit null, or an empty string, which counts as null.
    Empty,
    Present(&'a Value),
}

fn body_field<'a>(body: &'a Value, name: &str) -> Field<'a> {
    match body.get(name) {
        None => Field::Absent,
        Some(Value::Null) => Field::Empty,
        Some(Value::String(s)) if s.is_empty() => Field::Empty,
        Some(value) => Field::Present(value),
    }
}

fn required_string(body: &Value, name: &str, max: usize, rules: &mut Ruleset) -> Option<String> {
    match body_field(body, name) {
        Field::Absent | Field::Empty => {
            rules.fail(name, required_message(name));
            None
        }
        Field::Present(value) => string_value(value, name, max, rules),
    }
}

fn patch_required_string(
    body: &Value,
    name: &str,
    max: usize,
    rules: &mut Ruleset,
) -> Option<String> {
    match body_field(body, name) {
        Field::Absent => None,
        Field::Empty => {
            rules.fail(name, required_message(name));
            None
        }
        Field::Present(value) => string_value(value, name, max, rules),
    }
}

fn optional_string(body: &Value, name: &str, rules: &mut Ruleset) -> Option<String> {
    match body_field(body, name) {
        Field::Absent | Field::Empty => None,
        Field::Present(value) => string_value(value, name, usize::MAX, rules),
    }
}

fn patch_nullable_string(body: &Value, name: &str, rules: &mut Ruleset) -> Option<Option<String>> {
    match body_field(body, name) {
        Field::Absent => None,
        Field::Empty => Some(None),
        Field::Present(value) => string_value(value, name, usize::MAX, rules).map(Some),
    }
}

fn string_value(value: &Value, name: &str, max: usize, rules: &mut Ruleset) -> Option<String> {
    match value {
        Value::String(s) if s.chars().count() > max => {
            rules.fail(name, max_message(name, max));
            None
        }
        Value::String(s) => Some(s.clone()),
        _ => {
            rules.fail(name, string_message(name));
            None
        }
    }
}

fn required_date(body: &Value, name: &str, rules: &mut Ruleset) -> Option<Date> {
    match body_field(body, name) {
        Field::Absent | Field::Empty => {
            rules.fail(name, required_message(name));
            None
        }
        Field::Present(value) => date_value(value, name, rules),
    }
}

fn optional_date(body: &Value, name: &str, rules: &mut Ruleset) -> Option<Date> {
    match body_field(body, name) {
        Field::Absent | Field::Empty => None,
        Field::Present(value) => date_value(value, name, rules),
    }
}

fn patch_required_date(body: &Value, name: &str, rules: &mut Ruleset) -> Option<Date> {
    match body_field(body, name) {
        Field::Absent => None,
        Field::Empty => {
            rules.fail(name, required_message(name));
            None
        }
        Field::Present(value) => date_value(value, name, rules),
    }
}

fn patch_nullable_date(body: &Value, name: &str, rules: &mut Ruleset) -> Option<Option<Date>> {
    match body_field(body, name) {
        Field::Absent => None,
        Field::Empty => Some(None),
        Field::Present(value) => date_value(value, name, rules).map(Some),
    }
}

fn date_value(value: &Value, name: &str, rules: &mut Ruleset) -> Option<Date> {
    let parsed = value
        .as_str()
        .and_then(|raw| Date::parse(raw, &DATE_FORMAT).ok());
    if parsed.is_none() {
        rules.fail(name, date_message(name));
    }
    parsed
}

fn required_integer(body: &Value, name: &str, rules: &mut Ruleset) -> Option<i64> {
    match body_field(body, name) {
        Field::Absent | Field::Empty => {
            rules.fail(name, required_message(name));
            None
        }
        Field::Present(value) => integer_value(value, name, rules),
    }
}

fn patch_required_integer(body: &Value, name: &str, rules: &mut Ruleset) -> Option<i64> {
    match body_field(body, name) {
        Field::Absent => None,
        Field::Empty => {
            rules.fail(name, required_message(name));
            None
        }
        Field::Present(value) => integer_value(value, name, rules),
    }
}

fn integer_value(value: &Value, name: &str, rules: &mut Ruleset) -> Option<i64> {
    // Numeric strings are accepted alongside JSON numbers; floats are not.
    let parsed = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(raw) => raw.parse::<i64>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        rules.fail(name, integer_message(name));
    }
    parsed
}

// ---- query string rules ----

fn query_value<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    // The last occurrence wins, matching form-style parsing.
    params
        .iter()
        .rev()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn query_string(params: &[(String, String)], name: &str, rules: &mut Ruleset) -> Option<String> {
    match query_value(params, name) {
        None => None,
        Some("") => {
            // An empty value reads as null, and null is not a string.
            rules.fail(name, string_message(name));
            None
        }
        Some(value) => Some(value.to_string()),
    }
}

fn query_string_length(
    params: &[(String, String)],
    name: &str,
    min: usize,
    max: usize,
    rules: &mut Ruleset,
) -> Option<String> {
    let value = query_string(params, name, rules)?;
    let length = value.chars().count();
    if length < min {
        rules.fail(name, min_chars_message(name, min));
        return None;
    }
    if length > max {
        rules.fail(name, max_message(name, max));
        return None;
    }
    Some(value)
}

fn query_integer_min(
    params: &[(String, String)],
    name: &str,
    min: i64,
    rules: &mut Ruleset,
) -> Option<u32> {
    let raw = query_value(params, name)?;
    match raw.parse::<i64>() {
        Err(_) => {
            rules.fail(name, integer_message(name));
            None
        }
        Ok(value) if value < min => {
            rules.fail(name, min_message(name, min));
            None
        }
        Ok(value) => Some(u32::try_from(value).unwrap_or(u32::MAX)),
    }
}

fn query_date(params: &[(String, String)], name: &str, rules: &mut Ruleset) -> Option<Date> {
    let raw = query_value(params, name)?;
    match Date::parse(raw, &DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            rules.fail(name, date_message(name));
            None
        }
    }
}

fn query_columns(
    params: &[(String, String)],
    known: &'static [&'static str],
    rules: &mut Ruleset,
) -> Option<Vec<&'static str>> {
    if query_value(params, "columns").is_some() {
        rules.fail("columns", array_message("columns"));
        return None;
    }

    let requested: Vec<String> = params
        .iter()
        .filter(|(key, _)| key == "columns[]")
        .map(|(_, value)| value.clone())
        .collect();
    if requested.is_empty() {
        return None;
    }
    columns::normalize(&requested, known)
}

// ---- message templates ----

/// Humanize a field name: underscores become spaces and camel humps are
/// split, so `perPage` reads "per page" and `birth_date` "birth date".
fn display_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    for ch in field.chars() {
        if ch == '_' {
            out.push(' ');
        } else if ch.is_ascii_uppercase() {
            out.push(' ');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn required_message(field: &str) -> String {
    format!("The {} field is required.", display_name(field))
}

fn string_message(field: &str) -> String {
    format!("The {} field must be a string.", display_name(field))
}

fn max_message(field: &str, max: usize) -> String {
    format!(
        "The {} field must not be greater than {max} characters.",
        display_name(field)
    )
}

fn min_chars_message(field: &str, min: usize) -> String {
    format!(
        "The {} field must be at least {min} characters.",
        display_name(field)
    )
}

fn date_message(field: &str) -> String {
    format!("The {} field must be a valid date.", display_name(field))
}

fn integer_message(field: &str) -> String {
    format!("The {} field must be an integer.", display_name(field))
}

fn min_message(field: &str, min: i64) -> String {
    format!("The {} field must be at least {min}.", display_name(field))
}

fn array_message(field: &str) -> String {
    format!("The {} field must be an array.", display_name(field))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::date;

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn author_store_accepts_a_full_payload() {
        let body = json!({
            "name": "Clarice Lispector",
            "bio": "Wrote near the edge of language.",
            "birth_date": "1920-12-10",
        });
        let params = author_store(&body).unwrap();
        assert_eq!(params.name, "Clarice Lispector");
        assert_eq!(params.birth_date, Some(date!(1920 - 12 - 10)));
    }

    #[test]
    fn missing_name_is_reported_as_required() {
        let err = author_store(&json!({})).unwrap_err();
        let body = format!("{err:?}");
        assert!(body.contains("The name field is required."));
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let err = author_store(&json!({"name": ""})).unwrap_err();
        assert!(format!("{err:?}").contains("The name field is required."));

        let params = author_store(&json!({"name": "N", "bio": ""})).unwrap();
        assert_eq!(params.bio, None);
    }

    #[test]
    fn non_string_name_fails_the_string_rule() {
        let err = author_store(&json!({"name": 12})).unwrap_err();
        assert!(format!("{err:?}").contains("The name field must be a string."));
    }

    #[test]
    fn overlong_name_fails_the_max_rule() {
        let body = json!({"name": "x".repeat(256)});
        let err = author_store(&body).unwrap_err();
        assert!(
            format!("{err:?}")
                .contains("The name field must not be greater than 255 characters.")
        );
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let cleared = author_update(&json!({"bio": null})).unwrap();
        assert_eq!(cleared.bio, Some(None));
        assert_eq!(cleared.name, None);

        let untouched = author_update(&json!({})).unwrap();
        assert_eq!(untouched.bio, None);
        assert!(untouched.is_empty());
    }

    #[test]
    fn update_rejects_clearing_the_name() {
        let err = author_update(&json!({"name": null})).unwrap_err();
        assert!(format!("{err:?}").contains("The name field is required."));
    }

    #[test]
    fn book_store_collects_every_failure() {
        let err = book_store(&json!({
            "publish_date": "14-03-1953",
            "author_id": "abc",
        }))
        .unwrap_err();
        let rendered = format!("{err:?}");
        assert!(rendered.contains("The title field is required."));
        assert!(rendered.contains("The publish date field must be a valid date."));
        assert!(rendered.contains("The author id field must be an integer."));
    }

    #[test]
    fn book_store_accepts_numeric_author_id_strings() {
        let params = book_store(&json!({
            "title": "Hour of the Star",
            "publish_date": "1977-10-26",
            "author_id": "7",
        }))
        .unwrap();
        assert_eq!(params.author_id, 7);
    }

    #[test]
    fn author_index_validates_paging_parameters() {
        let err = author_index(&params(&[("perPage", "0")])).unwrap_err();
        assert!(format!("{err:?}").contains("The per page field must be at least 1."));

        let err = author_index(&params(&[("page", "soon")])).unwrap_err();
        assert!(format!("{err:?}").contains("The page field must be an integer."));

        let query = author_index(&params(&[("page", "3"), ("perPage", "5")])).unwrap();
        assert_eq!(query.page.page, 3);
        assert_eq!(query.page.per_page, 5);
    }

    #[test]
    fn empty_search_fails_the_string_rule() {
        let err = author_index(&params(&[("search", "")])).unwrap_err();
        assert!(format!("{err:?}").contains("The search field must be a string."));
    }

    #[test]
    fn search_length_bounds_differ_per_entity() {
        let err = author_index(&params(&[("search", "Jo")])).unwrap_err();
        assert!(format!("{err:?}").contains("The search field must be at least 3 characters."));
        assert!(author_index(&params(&[("search", "Joy")])).is_ok());

        let err = book_index(&params(&[("search", "dune")])).unwrap_err();
        assert!(format!("{err:?}").contains("The search field must be at least 5 characters."));
        assert!(book_index(&params(&[("search", "dunes")])).is_ok());

        let err = author_index(&params(&[("search", &"x".repeat(21))])).unwrap_err();
        assert!(
            format!("{err:?}")
                .contains("The search field must not be greater than 20 characters.")
        );
    }

    #[test]
    fn unknown_parameters_are_ignored() {
        let query = author_index(&params(&[("flavor", "vanilla")])).unwrap();
        assert_eq!(query.search, None);
        assert_eq!(query.page.page, 1);
        assert_eq!(query.page.per_page, DEFAULT_PER_PAGE);
    }

    #[test]
    fn undecodable_cursor_restarts_from_the_first_page() {
        let query = book_index(&params(&[("cursor", "!!not-a-cursor!!")])).unwrap();
        assert!(query.cursor.is_none());

        let encoded = BookCursor::after(42).encode();
        let query = book_index(&params(&[("cursor", encoded.as_str())])).unwrap();
        assert_eq!(query.cursor.map(|c| c.id()), Some(42));
    }

    #[test]
    fn columns_must_use_the_array_form() {
        let err = book_index(&params(&[("columns", "title")])).unwrap_err();
        assert!(format!("{err:?}").contains("The columns field must be an array."));

        let query = book_index(&params(&[("columns[]", "title"), ("columns[]", "id")])).unwrap();
        assert_eq!(query.columns, Some(vec!["id", "title"]));
    }

    #[test]
    fn unknown_columns_fall_back_to_every_field() {
        let query = book_index(&params(&[("columns[]", "ghost")])).unwrap();
        assert_eq!(query.columns, None);
    }

    #[test]
    fn author_books_reads_the_page_under_its_configured_name() {
        let query = author_books(&params(&[("pageName", "p"), ("p", "3")])).unwrap();
        assert_eq!(query.page.page, 3);
        assert_eq!(query.page_name, "p");

        let query = author_books(&params(&[("pageName", "p"), ("p", "junk")])).unwrap();
        assert_eq!(query.page.page, 1);
    }

    #[test]
    fn author_books_passes_a_caller_supplied_total_through() {
        let query = author_books(&params(&[("total", "412")])).unwrap();
        assert_eq!(query.total, Some(412));

        let query = author_books(&params(&[("total", "-1")])).unwrap();
        assert_eq!(query.total, None);
    }

    #[test]
    fn repeated_scalar_parameters_keep_the_last_value() {
        let query = author_index(&params(&[("page", "2"), ("page", "5")])).unwrap();
        assert_eq!(query.page.page, 5);
    }
}
