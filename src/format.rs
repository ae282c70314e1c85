use std::{fmt, str::FromStr};

use serde_json::{Map, Value};

use crate::{
    error::{Error, Result},
    model::{Field, Paper},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Jsonl,
    Markdown,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Jsonl => "jsonl",
            ExportFormat::Markdown => "md",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Jsonl => "application/x-ndjson",
            ExportFormat::Markdown => "text/markdown",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "jsonl" | "json" => Ok(ExportFormat::Jsonl),
            "md" | "markdown" | "readme" => Ok(ExportFormat::Markdown),
            other => Err(Error::InvalidFormat(other.to_string())),
        }
    }
}

pub struct Formatter;

impl Formatter {
    pub fn render(papers: &[Paper], format: ExportFormat, fields: &[Field]) -> Result<String> {
        match format {
            ExportFormat::Csv => Ok(Self::to_csv(papers, fields)),
            ExportFormat::Jsonl => papers
                .iter()
                .map(|paper| Self::to_jsonl(paper, fields))
                .collect::<Result<Vec<_>>>()
                .map(|lines| lines.concat()),
            ExportFormat::Markdown => Ok(papers.iter().map(Self::to_readme).collect()),
        }
    }

    /// Index column first, then one column per field.
    pub fn to_csv(papers: &[Paper], fields: &[Field]) -> String {
        let mut out = String::new();
        let header = std::iter::once(String::new())
            .chain(fields.iter().map(|f| csv_escape(f.column())))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&header);
        out.push('\n');
        for (row, paper) in papers.iter().enumerate() {
            let line = std::iter::once(row.to_string())
                .chain(fields.iter().map(|f| csv_escape(&csv_value(*f, paper))))
                .collect::<Vec<_>>()
                .join(",");
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    pub fn to_jsonl(paper: &Paper, fields: &[Field]) -> Result<String> {
        let object = fields
            .iter()
            .map(|f| (f.column().to_string(), json_value(*f, paper)))
            .collect::<Map<_, _>>();
        let mut line = serde_json::to_string(&Value::Object(object))?;
        line.push('\n');
        Ok(line)
    }

    pub fn to_readme(paper: &Paper) -> String {
        let date = paper
            .created
            .or(paper.datestamp)
            .map(|d| d.format("%Y.%m.%d").to_string())
            .unwrap_or_default();
        let link = paper.abs_link();
        format!(
            "### {}\n_{}_<br/>\n{}<br/>\n_Created: {}_, [{}]({})\n\n",
            paper.title,
            paper.authors.join(", "),
            paper.abstract_text,
            date,
            link,
            link
        )
    }
}

fn csv_value(field: Field, paper: &Paper) -> String {
    match json_value(field, paper) {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Array(items) => items
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

fn json_value(field: Field, paper: &Paper) -> Value {
    let opt_str = |v: &Option<String>| v.clone().map(Value::String).unwrap_or(Value::Null);
    let opt_date = |v: &Option<chrono::NaiveDate>| {
        v.map(|d| Value::String(d.to_string())).unwrap_or(Value::Null)
    };
    match field {
        Field::Id => Value::String(paper.id.clone()),
        Field::Title => Value::String(paper.title.clone()),
        Field::Abstract => Value::String(paper.abstract_text.clone()),
        Field::Author => Value::from(paper.authors.clone()),
        Field::SetSpec => Value::from(paper.set_spec.clone()),
        Field::Categories => Value::from(paper.categories.clone()),
        Field::Created => opt_date(&paper.created),
        Field::Updated => opt_date(&paper.updated),
        Field::Datestamp => opt_date(&paper.datestamp),
        Field::Comments => opt_str(&paper.comments),
        Field::Doi => opt_str(&paper.doi),
        Field::JournalRef => opt_str(&paper.journal_ref),
        Field::ReportNo => opt_str(&paper.report_no),
        Field::License => opt_str(&paper.license),
        Field::AuthorCount => Value::from(paper.n_authors()),
        Field::InspireId => paper.inspire_id.map(Value::from).unwrap_or(Value::Null),
        Field::CitationCount => paper.citation_count.map(Value::from).unwrap_or(Value::Null),
    }
}

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
