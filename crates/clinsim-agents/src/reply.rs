//! Parsing of marked spans in oracle responses.
//!
//! Agents ask the oracle to wrap the payload of a response in doubled
//! markers: `**...**` for the utterance itself and `##...##` for side
//! channels such as the question category or a referral office list.

/// Extracts the first span delimited by a doubled `marker`, with all
/// marker characters stripped from the content. Spans may span lines.
pub fn extract_span(text: &str, marker: char) -> Option<String> {
    let delim: String = [marker, marker].iter().collect();
    let start = text.find(&delim)? + delim.len();
    let end = text[start..].find(&delim)? + start;
    let inner: String = text[start..end].chars().filter(|c| *c != marker).collect();
    Some(inner)
}

/// Extracts the widest `**...**` span, i.e. from the first opening pair
/// to the last closing pair. Used for requirements extraction where the
/// payload may itself contain starred emphasis.
pub fn extract_requirements(text: &str) -> Option<String> {
    let start = text.find("**")? + 2;
    let end = text.rfind("**")?;
    if end <= start {
        return None;
    }
    let inner: String = text[start..end].chars().filter(|c| *c != '*').collect();
    if inner.is_empty() { None } else { Some(inner) }
}

/// Splits an office list on Chinese or ASCII commas.
pub fn split_offices(input: &str) -> Vec<String> {
    input
        .split(['，', ','])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// A doctor's parsed reply for one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum DoctorReply {
    /// A follow-up question for the patient, with its question category.
    Question { text: String, category: String },
    /// The doctor has nothing to ask this turn.
    Skip,
    /// The doctor has gathered enough information.
    Conclusion,
}

impl DoctorReply {
    /// Parses a raw oracle response. A missing or `NO` span means skip;
    /// a span mentioning `conclusion` ends the consultation.
    pub fn parse(response: &str) -> Self {
        let span = match extract_span(response, '*') {
            Some(span) => span,
            None => return DoctorReply::Skip,
        };
        if span.contains("NO") {
            return DoctorReply::Skip;
        }
        if span.contains("conclusion") {
            return DoctorReply::Conclusion;
        }
        let category = extract_span(response, '#').unwrap_or_default();
        DoctorReply::Question {
            text: span,
            category,
        }
    }
}
