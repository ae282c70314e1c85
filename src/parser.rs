use chrono::NaiveDate;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    model::{collapse_whitespace, non_empty, Paper},
};

pub const NO_RECORDS_MATCH: &str = "noRecordsMatch";

/// One `ListRecords` response: its papers plus the token for the next page.
#[derive(Debug, Default, PartialEq)]
pub struct Page {
    pub papers: Vec<Paper>,
    pub token: Option<ResumptionToken>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResumptionToken {
    pub value: String,
    pub cursor: Option<u64>,
    pub complete_list_size: Option<u64>,
}

pub fn parse_page(xml: &str) -> Result<Page> {
    let document: OaiDocument = from_str(xml)?;

    if let Some(error) = document.errors.into_iter().next() {
        if error.code == NO_RECORDS_MATCH {
            tracing::info!("no records match the request");
            return Ok(Page::default());
        }
        return Err(Error::Oai {
            code: error.code,
            message: collapse_whitespace(&error.message),
        });
    }

    let list = document.list_records.unwrap_or_default();
    let papers = list
        .records
        .into_iter()
        .filter_map(|record| match record.into_paper() {
            Ok(paper) => paper,
            Err(e) => {
                tracing::warn!("skipping record: {}", e);
                None
            }
        })
        .collect::<Vec<_>>();

    let token = list.token.and_then(|token| {
        let value = token.value.trim();
        if value.is_empty() {
            None
        } else {
            Some(ResumptionToken {
                value: value.to_string(),
                cursor: token.cursor,
                complete_list_size: token.complete_list_size,
            })
        }
    });

    Ok(Page { papers, token })
}

fn parse_oai_date(field: &str, raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    // datestamps may carry a time component at second granularity.
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| tracing::warn!(field, value = raw, "unparseable date: {}", e))
        .ok()
}

// OAI-PMH raw XML model

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OaiDocument {
    #[serde(rename = "ListRecords")]
    list_records: Option<ListRecordsField>,
    #[serde(rename = "error")]
    errors: Vec<ErrorField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorField {
    #[serde(rename = "@code")]
    code: String,
    #[serde(rename = "$text")]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListRecordsField {
    #[serde(rename = "record")]
    records: Vec<RecordField>,
    #[serde(rename = "resumptionToken")]
    token: Option<TokenField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TokenField {
    #[serde(rename = "$text")]
    value: String,
    #[serde(rename = "@cursor")]
    cursor: Option<u64>,
    #[serde(rename = "@completeListSize")]
    complete_list_size: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RecordField {
    header: HeaderField,
    metadata: Option<MetadataField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HeaderField {
    #[serde(rename = "@status")]
    status: Option<String>,
    identifier: String,
    datestamp: String,
    #[serde(rename = "setSpec")]
    set_spec: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetadataField {
    #[serde(rename = "arXiv")]
    arxiv: Option<ArxivMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArxivMetadata {
    id: String,
    created: String,
    updated: String,
    authors: AuthorsField,
    title: String,
    categories: String,
    comments: String,
    #[serde(rename = "report-no")]
    report_no: String,
    #[serde(rename = "journal-ref")]
    journal_ref: String,
    doi: String,
    license: String,
    #[serde(rename = "abstract")]
    abstract_text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AuthorsField {
    #[serde(rename = "author")]
    authors: Vec<AuthorField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AuthorField {
    keyname: String,
    forenames: String,
    suffix: String,
}

impl AuthorField {
    fn display_name(&self) -> String {
        [&self.forenames, &self.keyname, &self.suffix]
            .iter()
            .map(|part| collapse_whitespace(part))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl RecordField {
    /// `Ok(None)` for deleted or metadata-less records.
    fn into_paper(self) -> Result<Option<Paper>> {
        let header = self.header;
        if header.status.as_deref() == Some("deleted") {
            tracing::debug!(identifier = %header.identifier, "deleted record");
            return Ok(None);
        }
        let Some(meta) = self.metadata.and_then(|m| m.arxiv) else {
            tracing::debug!(identifier = %header.identifier, "record without arXiv metadata");
            return Ok(None);
        };
        let datestamp = parse_oai_date("datestamp", &header.datestamp).ok_or_else(|| {
            Error::Xml(format!(
                "record {} has bad datestamp `{}`",
                header.identifier, header.datestamp
            ))
        })?;

        Ok(Some(Paper {
            id: collapse_whitespace(&meta.id),
            title: collapse_whitespace(&meta.title),
            abstract_text: collapse_whitespace(&meta.abstract_text),
            authors: meta
                .authors
                .authors
                .iter()
                .map(AuthorField::display_name)
                .filter(|name| !name.is_empty())
                .collect(),
            set_spec: header
                .set_spec
                .iter()
                .filter_map(|s| non_empty(s))
                .collect(),
            categories: meta.categories.split_whitespace().map(String::from).collect(),
            created: parse_oai_date("created", &meta.created),
            updated: parse_oai_date("updated", &meta.updated),
            datestamp: Some(datestamp),
            comments: non_empty(&meta.comments),
            doi: non_empty(&meta.doi),
            journal_ref: non_empty(&meta.journal_ref),
            report_no: non_empty(&meta.report_no),
            license: non_empty(&meta.license),
            inspire_id: None,
            citation_count: None,
        }))
    }
}

// end OAI-PMH raw XML model

#[cfg(test)]
pub(crate) mod fixtures {
    pub const FIRST_PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<responseDate>2019-01-04T10:11:12Z</responseDate>
<request verb="ListRecords" from="2019-01-01" until="2019-01-03" metadataPrefix="arXiv" set="physics:astro-ph">http://export.arxiv.org/oai2</request>
<ListRecords>
<record>
<header>
 <identifier>oai:arXiv.org:1901.00001</identifier>
 <datestamp>2019-01-02</datestamp>
 <setSpec>physics:astro-ph</setSpec>
</header>
<metadata>
 <arXiv xmlns="http://arxiv.org/OAI/arXiv/" xsi:schemaLocation="http://arxiv.org/OAI/arXiv/ http://arxiv.org/OAI/arXiv.xsd">
 <id>1901.00001</id><created>2018-12-31</created><updated>2019-01-01</updated>
 <authors>
  <author><keyname>Hubble</keyname><forenames>Edwin P.</forenames></author>
  <author><keyname>Smith</keyname><forenames>John</forenames><suffix>Jr</suffix><affiliation>Caltech</affiliation></author>
 </authors>
 <title>Dark matter
  halos &amp; galaxies</title>
 <categories>astro-ph.CO astro-ph.GA</categories>
 <comments>12 pages, 3 figures</comments>
 <doi>10.1000/xyz123</doi>
 <license>http://arxiv.org/licenses/nonexclusive-distrib/1.0/</license>
 <abstract>  We study halos.
  Many of them.
 </abstract>
 </arXiv>
</metadata>
</record>
<record>
<header status="deleted">
 <identifier>oai:arXiv.org:1901.00002</identifier>
 <datestamp>2019-01-02</datestamp>
 <setSpec>physics:astro-ph</setSpec>
</header>
</record>
<record>
<header>
 <identifier>oai:arXiv.org:astro-ph/9901003</identifier>
 <datestamp>2019-01-03</datestamp>
 <setSpec>physics:astro-ph</setSpec>
 <setSpec>physics:gr-qc</setSpec>
</header>
<metadata>
 <arXiv xmlns="http://arxiv.org/OAI/arXiv/">
 <id>astro-ph/9901003</id><created>1999-01-01</created>
 <authors><author><keyname>Einstein</keyname><forenames>A.</forenames></author></authors>
 <title>Lensing</title>
 <categories>astro-ph gr-qc</categories>
 <comments></comments>
 <journal-ref>ApJ 1 (1999) 1</journal-ref>
 <report-no>CERN-TH-1</report-no>
 <abstract>Light bends.</abstract>
 </arXiv>
</metadata>
</record>
<resumptionToken cursor="0" completeListSize="4">4242|1001</resumptionToken>
</ListRecords>
</OAI-PMH>"#;

    pub const LAST_PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
<responseDate>2019-01-04T10:11:13Z</responseDate>
<request verb="ListRecords" resumptionToken="4242|1001">http://export.arxiv.org/oai2</request>
<ListRecords>
<record>
<header>
 <identifier>oai:arXiv.org:1901.00004</identifier>
 <datestamp>2019-01-03</datestamp>
 <setSpec>physics:astro-ph</setSpec>
</header>
<metadata>
 <arXiv xmlns="http://arxiv.org/OAI/arXiv/">
 <id>1901.00004</id><created>2019-01-03</created>
 <authors><author><keyname>Rubin</keyname><forenames>Vera</forenames></author></authors>
 <title>Rotation curves</title>
 <categories>astro-ph.GA</categories>
 <abstract>Flat.</abstract>
 </arXiv>
</metadata>
</record>
<resumptionToken cursor="1001" completeListSize="4"/>
</ListRecords>
</OAI-PMH>"#;

    pub const NO_MATCH: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
<responseDate>2019-01-04T10:11:12Z</responseDate>
<request verb="ListRecords">http://export.arxiv.org/oai2</request>
<error code="noRecordsMatch">The combination of the values of the from, until, set and metadataPrefix arguments results in an empty list.</error>
</OAI-PMH>"#;

    pub const BAD_TOKEN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
<responseDate>2019-01-04T10:11:12Z</responseDate>
<request verb="ListRecords">http://export.arxiv.org/oai2</request>
<error code="badResumptionToken">Invalid or expired
 resumption token</error>
</OAI-PMH>"#;
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_first_page() {
        let page = parse_page(FIRST_PAGE).unwrap();
        assert_eq!(page.papers.len(), 2, "deleted record must be skipped");

        let first = &page.papers[0];
        assert_eq!(first.id, "1901.00001");
        assert_eq!(first.title, "Dark matter halos & galaxies");
        assert_eq!(first.abstract_text, "We study halos. Many of them.");
        assert_eq!(first.authors, vec!["Edwin P. Hubble", "John Smith Jr"]);
        assert_eq!(first.n_authors(), 2);
        assert_eq!(first.categories, vec!["astro-ph.CO", "astro-ph.GA"]);
        assert_eq!(first.set_spec, vec!["physics:astro-ph"]);
        assert_eq!(first.created, Some(date(2018, 12, 31)));
        assert_eq!(first.updated, Some(date(2019, 1, 1)));
        assert_eq!(first.datestamp, Some(date(2019, 1, 2)));
        assert_eq!(first.doi.as_deref(), Some("10.1000/xyz123"));
        assert_eq!(first.comments.as_deref(), Some("12 pages, 3 figures"));
        assert_eq!(first.journal_ref, None);

        let second = &page.papers[1];
        assert_eq!(second.id, "astro-ph/9901003");
        assert_eq!(second.set_spec, vec!["physics:astro-ph", "physics:gr-qc"]);
        assert_eq!(second.updated, None);
        assert_eq!(second.comments, None);
        assert_eq!(second.journal_ref.as_deref(), Some("ApJ 1 (1999) 1"));
        assert_eq!(second.report_no.as_deref(), Some("CERN-TH-1"));

        let token = page.token.unwrap();
        assert_eq!(token.value, "4242|1001");
        assert_eq!(token.cursor, Some(0));
        assert_eq!(token.complete_list_size, Some(4));
    }

    #[test]
    fn test_empty_token_ends_harvest() {
        let page = parse_page(LAST_PAGE).unwrap();
        assert_eq!(page.papers.len(), 1);
        assert_eq!(page.token, None);
    }

    #[test]
    fn test_no_records_match_is_empty() {
        assert_eq!(parse_page(NO_MATCH).unwrap(), Page::default());
    }

    #[test]
    fn test_other_oai_errors_propagate() {
        match parse_page(BAD_TOKEN).unwrap_err() {
            Error::Oai { code, message } => {
                assert_eq!(code, "badResumptionToken");
                assert_eq!(message, "Invalid or expired resumption token");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_malformed_xml() {
        assert!(matches!(parse_page("<OAI-PMH><ListRecords>"), Err(Error::Xml(_))));
    }

    #[test]
    fn test_bad_datestamp_skips_only_that_record() {
        let xml = r#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
<ListRecords>
<record>
<header><identifier>oai:arXiv.org:1</identifier><datestamp>garbage</datestamp></header>
<metadata><arXiv><id>1</id><title>Broken</title></arXiv></metadata>
</record>
<record>
<header><identifier>oai:arXiv.org:2</identifier><datestamp>2019-01-02</datestamp></header>
<metadata><arXiv><id>2</id><title>Fine</title></arXiv></metadata>
</record>
<resumptionToken cursor="0">   </resumptionToken>
</ListRecords>
</OAI-PMH>"#;
        let page = parse_page(xml).unwrap();
        let ids = page.papers.iter().map(|p| p.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["2"]);
        assert_eq!(page.papers[0].datestamp, Some(date(2019, 1, 2)));
        assert_eq!(page.token, None);
    }

    #[test]
    fn test_datestamp_with_time() {
        assert_eq!(parse_oai_date("datestamp", "2019-01-02T03:04:05Z"), Some(date(2019, 1, 2)));
        assert_eq!(parse_oai_date("created", "  "), None);
        assert_eq!(parse_oai_date("created", "Jan 2"), None);
    }
}
