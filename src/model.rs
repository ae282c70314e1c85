use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// one harvested record, whichever repository it came from.

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Paper {
    pub id: String,
    pub title: String,
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub set_spec: Vec<String>,
    pub categories: Vec<String>,
    pub created: Option<NaiveDate>,
    pub updated: Option<NaiveDate>,
    pub datestamp: Option<NaiveDate>,
    pub comments: Option<String>,
    pub doi: Option<String>,
    pub journal_ref: Option<String>,
    pub report_no: Option<String>,
    pub license: Option<String>,
    pub inspire_id: Option<u64>,
    pub citation_count: Option<u64>,
}

impl Paper {
    pub fn n_authors(&self) -> usize {
        self.authors.len()
    }

    /// arXiv identifier without its version suffix, e.g. `2101.00001v3` -> `2101.00001`.
    pub fn base_arxiv_id(&self) -> &str {
        strip_version(&self.id)
    }

    pub fn abs_link(&self) -> String {
        format!("https://arxiv.org/abs/{}", self.id)
    }
}

pub(crate) fn strip_version(id: &str) -> &str {
    match id.rfind('v') {
        Some(pos) if pos + 1 < id.len() && id[pos + 1..].bytes().all(|b| b.is_ascii_digit()) => {
            &id[..pos]
        }
        _ => id,
    }
}

/// Collapse every whitespace run (newlines included) to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleaned text, or `None` when nothing is left.
pub fn non_empty(text: &str) -> Option<String> {
    let cleaned = collapse_whitespace(text);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Title,
    Abstract,
    Author,
    SetSpec,
    Categories,
    Created,
    Updated,
    Comments,
    Doi,
    Datestamp,
    AuthorCount,
    JournalRef,
    ReportNo,
    License,
    InspireId,
    CitationCount,
}

impl Field {
    pub const ALL: [Field; 17] = [
        Field::Id,
        Field::Title,
        Field::Abstract,
        Field::Author,
        Field::SetSpec,
        Field::Categories,
        Field::Created,
        Field::Updated,
        Field::Comments,
        Field::Doi,
        Field::Datestamp,
        Field::AuthorCount,
        Field::JournalRef,
        Field::ReportNo,
        Field::License,
        Field::InspireId,
        Field::CitationCount,
    ];

    /// Columns produced when everything is requested.
    pub const TEMPLATE: [Field; 12] = [
        Field::Id,
        Field::Title,
        Field::Abstract,
        Field::Author,
        Field::SetSpec,
        Field::Categories,
        Field::Created,
        Field::Updated,
        Field::Comments,
        Field::Doi,
        Field::Datestamp,
        Field::AuthorCount,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Title => "title",
            Field::Abstract => "abstract",
            Field::Author => "author",
            Field::SetSpec => "setSpec",
            Field::Categories => "categories",
            Field::Created => "created",
            Field::Updated => "updated",
            Field::Comments => "comments",
            Field::Doi => "doi",
            Field::Datestamp => "datestamp",
            Field::AuthorCount => "n_authors",
            Field::JournalRef => "journal_ref",
            Field::ReportNo => "report_no",
            Field::License => "license",
            Field::InspireId => "inspire_id",
            Field::CitationCount => "citation_count",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.column() == name)
            .ok_or_else(|| Error::InvalidField(name.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldSelection {
    #[default]
    Everything,
    Only(Vec<Field>),
}

impl FieldSelection {
    /// Accepts `everything` or a comma separated list of column names.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input == "everything" {
            return Ok(FieldSelection::Everything);
        }
        let mut fields: Vec<Field> = Vec::new();
        for name in input.split(',').filter(|s| !s.trim().is_empty()) {
            let field = name.parse::<Field>()?;
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        if fields.is_empty() {
            return Err(Error::InvalidField(input.to_string()));
        }
        Ok(FieldSelection::Only(fields))
    }

    pub fn fields(&self) -> Vec<Field> {
        match self {
            FieldSelection::Everything => Field::TEMPLATE.to_vec(),
            FieldSelection::Only(fields) => fields.clone(),
        }
    }

    /// Like `fields`, but `Everything` also carries the INSPIRE columns.
    pub fn fields_with_inspire(&self) -> Vec<Field> {
        match self {
            FieldSelection::Everything => Field::TEMPLATE
                .iter()
                .chain(&[Field::InspireId, Field::CitationCount])
                .copied()
                .collect(),
            FieldSelection::Only(fields) => fields.clone(),
        }
    }
}

impl FromStr for FieldSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(field.column().parse::<Field>().unwrap(), field);
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(matches!("authors".parse::<Field>(), Err(Error::InvalidField(_))));
    }

    #[test]
    fn test_everything_uses_template_order() {
        let fields = FieldSelection::parse("everything").unwrap().fields();
        assert_eq!(fields.first(), Some(&Field::Id));
        assert_eq!(fields.last(), Some(&Field::AuthorCount));
        assert_eq!(fields.len(), 12);
    }

    #[test]
    fn test_selection_keeps_order_and_drops_duplicates() {
        let selection = FieldSelection::parse("title, id,title,doi").unwrap();
        assert_eq!(selection.fields(), vec![Field::Title, Field::Id, Field::Doi]);
    }

    #[test]
    fn test_inspire_columns_added_to_everything() {
        let fields = FieldSelection::Everything.fields_with_inspire();
        assert_eq!(fields.len(), Field::TEMPLATE.len() + 2);
        assert_eq!(&fields[..12], &Field::TEMPLATE[..]);
        assert_eq!(&fields[12..], &[Field::InspireId, Field::CitationCount]);

        let only = FieldSelection::parse("id,title").unwrap();
        assert_eq!(only.fields_with_inspire(), vec![Field::Id, Field::Title]);
    }

    #[test]
    fn test_empty_selection_rejected() {
        assert!(FieldSelection::parse(" , ").is_err());
    }

    #[test]
    fn test_strip_version() {
        assert_eq!(strip_version("2101.00001v12"), "2101.00001");
        assert_eq!(strip_version("hep-th/9901001v1"), "hep-th/9901001");
        assert_eq!(strip_version("2101.00001"), "2101.00001");
        assert_eq!(strip_version("inspire:123"), "inspire:123");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Dark\n  matter \t halos "), "Dark matter halos");
        assert_eq!(non_empty(" \n "), None);
    }
}
