//! Dictionary-encoded string column.
//!
//! Cells are `u32` codes into a per-column dictionary. Code `0` is always
//! the empty string, which is the missing value for this type. Every
//! transform builds a new column named `<name>[tag]`.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::Range;

use ck_selection::Selection;
use ck_types::{ColumnType, ParseOptions, Scalar};
use regex::Regex;
use tracing::debug;

use crate::{
    AnyColumn, BooleanColumn, Column, ColumnError, ColumnId, IntColumn, Summary, check_lengths,
    check_rows, clamp_range,
};

const MISSING_CODE: u32 = 0;

#[derive(Debug, Clone)]
struct Dictionary {
    values: Vec<String>,
    codes: HashMap<String, u32>,
}

impl Dictionary {
    fn new() -> Self {
        Self {
            values: vec![String::new()],
            codes: HashMap::from([(String::new(), MISSING_CODE)]),
        }
    }

    fn code_for(&mut self, value: &str) -> u32 {
        if let Some(code) = self.codes.get(value) {
            return *code;
        }
        let code = self.values.len() as u32;
        self.values.push(value.to_owned());
        self.codes.insert(value.to_owned(), code);
        code
    }

    fn value(&self, code: u32) -> &str {
        &self.values[code as usize]
    }
}

#[derive(Debug, Clone)]
pub struct CategoryColumn {
    id: ColumnId,
    name: String,
    codes: Vec<u32>,
    dictionary: Dictionary,
}

impl CategoryColumn {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::with_capacity(name, ParseOptions::standard().default_capacity)
    }

    #[must_use]
    pub fn with_capacity(name: &str, capacity: usize) -> Self {
        Self {
            id: ColumnId::fresh(),
            name: name.to_owned(),
            codes: Vec::with_capacity(capacity),
            dictionary: Dictionary::new(),
        }
    }

    /// Builds a column from strings; empty strings are missing cells.
    pub fn from_values<I, S>(name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut column = Self::new(name);
        for value in values {
            column.append(value.as_ref());
        }
        column
    }

    fn derived<I, S>(&self, tag: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_values(&format!("{}[{tag}]", self.name), values)
    }

    /// Appends `value` verbatim (no trimming); `""` appends a missing cell.
    pub fn append(&mut self, value: &str) {
        let code = self.dictionary.code_for(value);
        self.codes.push(code);
    }

    /// Value at `row`; `None` when missing or out of bounds.
    #[must_use]
    pub fn get(&self, row: usize) -> Option<&str> {
        self.codes
            .get(row)
            .filter(|code| **code != MISSING_CODE)
            .map(|code| self.dictionary.value(*code))
    }

    #[must_use]
    pub fn get_scalar(&self, row: usize) -> Scalar {
        self.get(row).map_or(Scalar::Missing, Scalar::from)
    }

    /// Every cell in row order, missing cells as `""`.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.codes.iter().map(|code| self.dictionary.value(*code))
    }

    fn value_at(&self, row: usize) -> &str {
        self.dictionary.value(self.codes[row])
    }

    fn map_values<F: Fn(&str) -> String>(&self, tag: &str, f: F) -> Self {
        self.derived(
            tag,
            self.iter()
                .map(|value| if value.is_empty() { String::new() } else { f(value) }),
        )
    }

    fn zip_values<F: Fn(&str, &str) -> String>(
        &self,
        other: &Self,
        tag: &str,
        f: F,
    ) -> Result<Self, ColumnError> {
        check_lengths(self.size(), other.size())?;
        Ok(self.derived(tag, self.iter().zip(other.iter()).map(|(a, b)| f(a, b))))
    }

    // ── Predicates ─────────────────────────────────────────────────────

    /// Rows whose non-missing value satisfies `predicate`.
    pub fn select<F: Fn(&str) -> bool>(&self, predicate: F) -> Selection {
        self.codes
            .iter()
            .enumerate()
            .filter(|(_, code)| {
                **code != MISSING_CODE && predicate(self.dictionary.value(**code))
            })
            .map(|(row, _)| row)
            .collect()
    }

    /// New column with the non-missing values that satisfy `predicate`.
    pub fn select_if<F: Fn(&str) -> bool>(&self, predicate: F) -> Self {
        let rows = self.select(predicate);
        Self::from_values(&self.name, rows.iter().map(|row| self.value_at(row)))
    }

    pub fn is_equal_to(&self, value: &str) -> Selection {
        self.select(|v| v == value)
    }

    pub fn is_not_equal_to(&self, value: &str) -> Selection {
        self.select(|v| v != value)
    }

    pub fn is_in<I, S>(&self, values: I) -> Selection
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted: HashSet<String> = values.into_iter().map(|v| v.as_ref().to_owned()).collect();
        self.select(|v| wanted.contains(v))
    }

    pub fn is_not_in<I, S>(&self, values: I) -> Selection
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unwanted: HashSet<String> =
            values.into_iter().map(|v| v.as_ref().to_owned()).collect();
        self.select(|v| !unwanted.contains(v))
    }

    pub fn starts_with(&self, prefix: &str) -> Selection {
        self.select(|v| v.starts_with(prefix))
    }

    pub fn ends_with(&self, suffix: &str) -> Selection {
        self.select(|v| v.ends_with(suffix))
    }

    pub fn contains_string(&self, needle: &str) -> Selection {
        self.select(|v| v.contains(needle))
    }

    pub fn matches_regex(&self, pattern: &str) -> Result<Selection, ColumnError> {
        let regex = Regex::new(pattern)?;
        Ok(self.select(|v| regex.is_match(v)))
    }

    // ── Transforms ─────────────────────────────────────────────────────

    #[must_use]
    pub fn upper_case(&self) -> Self {
        self.map_values("ucase", str::to_uppercase)
    }

    #[must_use]
    pub fn lower_case(&self) -> Self {
        self.map_values("lcase", str::to_lowercase)
    }

    #[must_use]
    pub fn trim(&self) -> Self {
        self.map_values("trim", |v| v.trim().to_owned())
    }

    pub fn replace_all(&self, pattern: &str, replacement: &str) -> Result<Self, ColumnError> {
        self.replace_all_patterns(&[pattern], replacement)
    }

    /// Applies each pattern in turn to every value.
    pub fn replace_all_patterns(
        &self,
        patterns: &[&str],
        replacement: &str,
    ) -> Result<Self, ColumnError> {
        let regexes = patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.map_values("repl", |value| {
            regexes.iter().fold(value.to_owned(), |acc, regex| {
                regex.replace_all(&acc, replacement).into_owned()
            })
        }))
    }

    pub fn replace_first(&self, pattern: &str, replacement: &str) -> Result<Self, ColumnError> {
        let regex = Regex::new(pattern)?;
        Ok(self.map_values("repl", |value| {
            regex.replace(value, replacement).into_owned()
        }))
    }

    /// Characters `start..end` of each value, clamped to its length.
    #[must_use]
    pub fn substring(&self, start: usize, end: usize) -> Self {
        self.map_values("sub", |value| {
            value
                .chars()
                .skip(start)
                .take(end.saturating_sub(start))
                .collect()
        })
    }

    #[must_use]
    pub fn substring_from(&self, start: usize) -> Self {
        self.map_values("sub", |value| value.chars().skip(start).collect())
    }

    /// Shortens values longer than `max_width` characters to
    /// `max_width - 3` characters followed by `...`.
    pub fn abbreviate(&self, max_width: usize) -> Result<Self, ColumnError> {
        if max_width < 4 {
            return Err(ColumnError::InvalidArgument(format!(
                "abbreviation width must be at least 4, got {max_width}"
            )));
        }
        Ok(self.map_values("abbr", |value| {
            if value.chars().count() <= max_width {
                value.to_owned()
            } else {
                let mut short: String = value.chars().take(max_width - 3).collect();
                short.push_str("...");
                short
            }
        }))
    }

    #[must_use]
    pub fn pad_start(&self, min_length: usize, pad: char) -> Self {
        self.map_values("pad", |value| {
            let missing = min_length.saturating_sub(value.chars().count());
            let mut padded: String = std::iter::repeat_n(pad, missing).collect();
            padded.push_str(value);
            padded
        })
    }

    #[must_use]
    pub fn pad_end(&self, min_length: usize, pad: char) -> Self {
        self.map_values("pad", |value| {
            let missing = min_length.saturating_sub(value.chars().count());
            let mut padded = value.to_owned();
            padded.extend(std::iter::repeat_n(pad, missing));
            padded
        })
    }

    /// Splits each value into tokens, sorts them and joins with a space.
    /// `None` splits on whitespace.
    #[must_use]
    pub fn tokenize_and_sort(&self, separator: Option<&str>) -> Self {
        self.map_values("sorted", |value| {
            let mut tokens = tokens(value, separator);
            tokens.sort_unstable();
            tokens.join(" ")
        })
    }

    #[must_use]
    pub fn tokenize_and_remove_duplicates(&self, separator: Option<&str>) -> Self {
        self.map_values("without duplicates", |value| {
            let mut seen = HashSet::new();
            tokens(value, separator)
                .into_iter()
                .filter(|token| seen.insert(*token))
                .collect::<Vec<_>>()
                .join(" ")
        })
    }

    pub fn common_prefix(&self, other: &Self) -> Result<Self, ColumnError> {
        self.zip_values(other, "prefix", |a, b| {
            a.chars()
                .zip(b.chars())
                .take_while(|(x, y)| x == y)
                .map(|(x, _)| x)
                .collect()
        })
    }

    pub fn common_suffix(&self, other: &Self) -> Result<Self, ColumnError> {
        self.zip_values(other, "suffix", |a, b| {
            let mut reversed: Vec<char> = a
                .chars()
                .rev()
                .zip(b.chars().rev())
                .take_while(|(x, y)| x == y)
                .map(|(x, _)| x)
                .collect();
            reversed.reverse();
            reversed.into_iter().collect()
        })
    }

    /// Levenshtein distance per row; missing when either side is missing.
    pub fn distance(&self, other: &Self) -> Result<IntColumn, ColumnError> {
        check_lengths(self.size(), other.size())?;
        let cells = self.iter().zip(other.iter()).map(|(a, b)| {
            if a.is_empty() || b.is_empty() {
                None
            } else {
                Some(levenshtein(a, b) as i32)
            }
        });
        Ok(IntColumn::from_options(
            &format!("{}[distance]", self.name),
            cells,
        ))
    }

    pub fn join(&self, other: &Self, delimiter: &str) -> Result<Self, ColumnError> {
        self.zip_values(other, "join", |a, b| {
            if a.is_empty() && b.is_empty() {
                String::new()
            } else {
                format!("{a}{delimiter}{b}")
            }
        })
    }

    // ── Dictionary views ───────────────────────────────────────────────

    /// Dictionary codes as integers; missing cells stay missing.
    #[must_use]
    pub fn to_int_column(&self) -> IntColumn {
        IntColumn::from_options(
            &format!("{}: codes", self.name),
            self.codes
                .iter()
                .map(|code| (*code != MISSING_CODE).then_some(*code as i32)),
        )
    }

    /// Non-missing dictionary entries in code order.
    #[must_use]
    pub fn dictionary(&self) -> Vec<&str> {
        self.dictionary.values[1..].iter().map(String::as_str).collect()
    }

    #[must_use]
    pub fn count_occurrences(&self, value: &str) -> usize {
        if value.is_empty() {
            return self.count_missing();
        }
        self.dictionary
            .codes
            .get(value)
            .map_or(0, |code| self.codes.iter().filter(|c| *c == code).count())
    }

    /// One boolean column per distinct value, named after the value.
    #[must_use]
    pub fn get_dummies(&self) -> Vec<BooleanColumn> {
        self.unique()
            .iter()
            .map(|value| BooleanColumn::from_values(value, self.iter().map(|v| v == value)))
            .collect()
    }

    #[must_use]
    pub fn as_set(&self) -> BTreeSet<String> {
        self.iter()
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

fn tokens<'a>(value: &'a str, separator: Option<&str>) -> Vec<&'a str> {
    let raw: Vec<&str> = match separator {
        Some(separator) => value.split(separator).collect(),
        None => value.split_whitespace().collect(),
    };
    raw.into_iter()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

impl Column for CategoryColumn {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        name.clone_into(&mut self.name);
    }

    fn column_type(&self) -> ColumnType {
        ColumnType::Category
    }

    fn id(&self) -> ColumnId {
        self.id
    }

    fn size(&self) -> usize {
        self.codes.len()
    }

    fn count_missing(&self) -> usize {
        self.codes.iter().filter(|code| **code == MISSING_CODE).count()
    }

    fn count_unique(&self) -> usize {
        self.codes
            .iter()
            .filter(|code| **code != MISSING_CODE)
            .collect::<HashSet<_>>()
            .len()
    }

    fn get_string(&self, row: usize) -> String {
        self.value_at(row).to_owned()
    }

    fn is_missing_at(&self, row: usize) -> bool {
        self.codes[row] == MISSING_CODE
    }

    /// Stores `text` verbatim, surrounding whitespace included. Text equal
    /// to one of the missing tokens loads as missing, so a value such as
    /// `"NA"` does not survive a text round trip under the standard options.
    fn append_cell_with(&mut self, text: &str, options: &ParseOptions) -> Result<(), ColumnError> {
        if options.is_missing_token(text) {
            self.append_missing();
        } else {
            self.append(text);
        }
        Ok(())
    }

    fn append_missing(&mut self) {
        self.codes.push(MISSING_CODE);
    }

    fn clear(&mut self) {
        self.codes.clear();
        self.dictionary = Dictionary::new();
    }

    fn sort_ascending(&mut self) {
        debug!(column = %self.name, rows = self.codes.len(), "sort ascending");
        let dictionary = &self.dictionary;
        self.codes
            .sort_by(|a, b| dictionary.value(*a).cmp(dictionary.value(*b)));
    }

    fn sort_descending(&mut self) {
        debug!(column = %self.name, rows = self.codes.len(), "sort descending");
        let dictionary = &self.dictionary;
        self.codes
            .sort_by(|a, b| dictionary.value(*b).cmp(dictionary.value(*a)));
    }

    fn compare_rows(&self, a: usize, b: usize) -> Ordering {
        self.value_at(a).cmp(self.value_at(b))
    }

    /// Count per category, in sorted order.
    fn summary(&self) -> Summary {
        let mut counts: HashMap<&str, i32> = HashMap::new();
        for value in self.iter().filter(|value| !value.is_empty()) {
            *counts.entry(value).or_default() += 1;
        }
        let mut entries: Vec<(&str, i32)> = counts.into_iter().collect();
        entries.sort_unstable();
        let (labels, numbers): (Vec<&str>, Vec<i32>) = entries.into_iter().unzip();
        Summary::titled(
            &self.name,
            Self::from_values("Category", labels),
            AnyColumn::Int(IntColumn::from_values("Count", numbers)),
        )
    }

    fn copy(&self) -> Self {
        self.clone()
    }

    fn empty_copy(&self, row_size_hint: usize) -> Self {
        Self::with_capacity(&self.name, row_size_hint)
    }

    fn unique(&self) -> Self {
        let mut seen = HashSet::new();
        let values = self
            .codes
            .iter()
            .filter(|code| **code != MISSING_CODE && seen.insert(**code))
            .map(|code| self.dictionary.value(*code));
        Self::from_values(&format!("{} Unique values", self.name), values)
    }

    fn take(&self, rows: &[usize]) -> Result<Self, ColumnError> {
        check_rows(rows, self.codes.len())?;
        Ok(Self::from_values(
            &self.name,
            rows.iter().map(|row| self.value_at(*row)),
        ))
    }

    fn slice(&self, range: Range<usize>) -> Self {
        let range = clamp_range(range, self.codes.len());
        Self::from_values(&self.name, range.map(|row| self.value_at(row)))
    }

    fn append_column(&mut self, other: &Self) -> Result<(), ColumnError> {
        for value in other.iter() {
            self.append(value);
        }
        Ok(())
    }
}
