//! Record extraction from fetched documents
//!
//! Each record field is located with a CSS selector. Extraction never fails:
//! a missing element, an unparsable document, or an empty body all produce
//! empty field values, so "no such ID" pages flow through a batch like any
//! other result.

use crate::config::FieldSelectors;
use crate::record::Record;
use crate::ConfigError;
use scraper::{Html, Selector};

/// Compiled selector-to-field map
#[derive(Debug, Clone)]
pub struct Extractor {
    first_name: Selector,
    middle_name: Selector,
    last_name: Selector,
    first_date: Selector,
    second_date: Selector,
    category: Selector,
}

impl Extractor {
    /// Compiles the configured selectors
    ///
    /// # Returns
    ///
    /// * `Ok(Extractor)` - All selectors parsed
    /// * `Err(ConfigError::InvalidSelector)` - A selector failed to parse
    pub fn new(fields: &FieldSelectors) -> Result<Self, ConfigError> {
        Ok(Self {
            first_name: compile("first_name", &fields.first_name)?,
            middle_name: compile("middle_name", &fields.middle_name)?,
            last_name: compile("last_name", &fields.last_name)?,
            first_date: compile("first_date", &fields.first_date)?,
            second_date: compile("second_date", &fields.second_date)?,
            category: compile("category", &fields.category)?,
        })
    }

    /// Builds a record for `id` from a raw HTML document
    ///
    /// # Example
    ///
    /// ```
    /// use seq_harvest::config::FieldSelectors;
    /// use seq_harvest::record::Extractor;
    ///
    /// let extractor = Extractor::new(&FieldSelectors::default()).unwrap();
    /// let record = extractor.extract(7, r#"<span id="first_name">Ana</span>"#);
    /// assert_eq!(record.first_name, "Ana");
    /// assert_eq!(record.last_name, "");
    /// ```
    pub fn extract(&self, id: u64, document: &str) -> Record {
        if document.trim().is_empty() {
            return Record::empty(id);
        }

        let html = Html::parse_document(document);

        Record {
            id,
            first_name: text_of(&html, &self.first_name),
            middle_name: text_of(&html, &self.middle_name),
            last_name: text_of(&html, &self.last_name),
            first_date: text_of(&html, &self.first_date),
            second_date: text_of(&html, &self.second_date),
            category: text_of(&html, &self.category),
        }
    }
}

fn compile(field: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field: field.to_string(),
        selector: selector.to_string(),
    })
}

/// Text content of the first match, trimmed; empty when nothing matches
fn text_of(html: &Html, selector: &Selector) -> String {
    html.select(selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}
