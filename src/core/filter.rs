use bon::Builder;
use chrono::{NaiveDate, NaiveDateTime};

use crate::core::record::{Consumer, ConsumptionRecord};

/// Optional record constraints; an absent field does not constrain anything.
///
/// Identifiers match by case-sensitive substring, dates are inclusive bounds.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Eq, Builder)]
pub struct FilterCriteria {
    #[builder(into)]
    pub consumer_id: Option<String>,

    #[builder(into)]
    pub postcode: Option<String>,

    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl FilterCriteria {
    /// Drop the blank and `All` identifiers, which the dashboard uses to mean «no filter».
    pub fn normalized(self) -> Self {
        Self {
            consumer_id: self.consumer_id.and_then(normalize_identifier),
            postcode: self.postcode.and_then(normalize_identifier),
            ..self
        }
    }

    #[must_use]
    pub fn matches(&self, subject: &impl Filterable) -> bool {
        self.consumer_id.as_deref().is_none_or(|needle| subject.consumer_id().contains(needle))
            && self.postcode.as_deref().is_none_or(|needle| subject.postcode().contains(needle))
            && subject.timestamp().is_none_or(|timestamp| self.contains_date(timestamp.date()))
    }

    fn contains_date(&self, date: NaiveDate) -> bool {
        self.start_date.is_none_or(|start_date| start_date <= date)
            && self.end_date.is_none_or(|end_date| date <= end_date)
    }
}

fn normalize_identifier(identifier: String) -> Option<String> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        None
    } else if trimmed.len() == identifier.len() {
        Some(identifier)
    } else {
        Some(trimmed.to_owned())
    }
}

/// Anything the criteria can be evaluated against.
pub trait Filterable {
    fn consumer_id(&self) -> &str;

    fn postcode(&self) -> &str;

    /// Subjects without a timestamp are not constrained by the date bounds.
    fn timestamp(&self) -> Option<NaiveDateTime> {
        None
    }
}

impl Filterable for ConsumptionRecord {
    fn consumer_id(&self) -> &str {
        &self.consumer_id
    }

    fn postcode(&self) -> &str {
        &self.postcode
    }

    fn timestamp(&self) -> Option<NaiveDateTime> {
        Some(self.timestamp)
    }
}

impl Filterable for Consumer {
    fn consumer_id(&self) -> &str {
        &self.consumer_id
    }

    fn postcode(&self) -> &str {
        &self.postcode
    }
}

/// Select the subjects matching the criteria, leaving the source intact.
pub fn evaluate<T: Filterable + Clone>(subjects: &[T], criteria: &FilterCriteria) -> Vec<T> {
    subjects.iter().filter(|subject| criteria.matches(*subject)).cloned().collect()
}
