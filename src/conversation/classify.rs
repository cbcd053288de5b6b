//! Clinical-intent classifier.
//!
//! A message is clinical when any vocabulary term starts a word in it. The
//! vocabulary is plain data grouped by topic so each group can be tested on
//! its own.

use crate::models::ClinicalTopic;

/// Result of classifying one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Topics in vocabulary order, deduplicated.
    Clinical(Vec<ClinicalTopic>),
    Administrative,
}

impl Intent {
    pub fn is_clinical(&self) -> bool {
        matches!(self, Intent::Clinical(_))
    }

    pub fn topics(&self) -> &[ClinicalTopic] {
        match self {
            Intent::Clinical(topics) => topics,
            Intent::Administrative => &[],
        }
    }
}

/// Lowercase term prefixes per topic. A term matches at the start of a word,
/// so "test" matches "tests" but not "contest".
pub const CLINICAL_VOCABULARY: &[(ClinicalTopic, &[&str])] = &[
    (
        ClinicalTopic::Symptom,
        &[
            "symptom", "pain", "ache", "hurt", "swelling", "swollen", "dizz", "nause", "vomit",
            "fatigue", "tired", "fever", "itch", "cramp", "headache", "shortness of breath",
            "short of breath", "bleeding", "urine", "urinat",
        ],
    ),
    (
        ClinicalTopic::Medication,
        &[
            "medication", "medicine", "meds", "pill", "tablet", "dose", "dosage", "side effect",
            "drug", "prescription", "prescribed", "refill", "lisinopril", "losartan",
            "furosemide", "amlodipine", "metformin", "insulin", "tacrolimus", "prednison",
            "erythropoietin",
        ],
    ),
    (
        ClinicalTopic::Diagnosis,
        &[
            "diagnos", "kidney", "renal", "dialysis", "transplant", "ckd", "disease", "condition",
            "blood", "pressure", "creatinine", "gfr", "test", "lab", "treatment", "doctor",
            "medical", "diabet", "hypertens", "anemi", "anaemi",
        ],
    ),
    (
        ClinicalTopic::Diet,
        &[
            "diet", "food", "eat", "sodium", "salt", "potassium", "phosph", "protein", "fluid",
            "drink", "water intake",
        ],
    ),
    (
        ClinicalTopic::FollowUp,
        &["follow-up", "follow up", "followup", "appointment", "clinic", "check-up", "checkup"],
    ),
    (
        ClinicalTopic::WarningSign,
        &["warning", "emergency", "urgent", "worse", "worsening", "danger"],
    ),
];

/// Classify `text` as clinical (with its topics) or administrative.
pub fn classify_message(text: &str) -> Intent {
    let lower = text.to_lowercase();
    let topics: Vec<ClinicalTopic> = CLINICAL_VOCABULARY
        .iter()
        .filter(|(_, terms)| terms.iter().any(|term| starts_word(&lower, term)))
        .map(|(topic, _)| *topic)
        .collect();

    if topics.is_empty() {
        Intent::Administrative
    } else {
        Intent::Clinical(topics)
    }
}

/// Whether `text` contains any clinical term.
pub fn has_clinical_terms(text: &str) -> bool {
    classify_message(text).is_clinical()
}

/// `term` occurs in `haystack` at a position not preceded by an alphanumeric char.
fn starts_word(haystack: &str, term: &str) -> bool {
    haystack.match_indices(term).any(|(pos, _)| {
        haystack[..pos]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medication_question_is_clinical() {
        let intent = classify_message("What are the side effects of my medication?");
        assert_eq!(intent, Intent::Clinical(vec![ClinicalTopic::Medication]));
    }

    #[test]
    fn introductions_and_pleasantries_are_administrative() {
        for text in [
            "Hello, my name is John Smith",
            "Thank you so much!",
            "ok",
            "Can you explain that again?",
        ] {
            assert_eq!(classify_message(text), Intent::Administrative, "{text}");
        }
    }

    #[test]
    fn every_topic_has_a_trigger() {
        let samples = [
            (ClinicalTopic::Symptom, "my ankles are swollen"),
            (ClinicalTopic::Medication, "should I take the pills at night"),
            (ClinicalTopic::Diagnosis, "what does CKD stage 3 mean"),
            (ClinicalTopic::Diet, "can I eat bananas"),
            (ClinicalTopic::FollowUp, "when is my follow-up"),
            (ClinicalTopic::WarningSign, "it is getting worse"),
        ];
        for (topic, text) in samples {
            assert!(classify_message(text).topics().contains(&topic), "{text}");
        }
    }

    #[test]
    fn matches_only_at_word_start() {
        assert!(!has_clinical_terms("I won the contest"));
        assert!(!has_clinical_terms("please explain"));
        assert!(has_clinical_terms("Lab results came back"));
        assert!(has_clinical_terms("are my tests normal?"));
    }

    #[test]
    fn multiple_topics_keep_vocabulary_order() {
        let intent = classify_message("Is swelling a side effect of my kidney medication?");
        assert_eq!(
            intent.topics(),
            &[ClinicalTopic::Symptom, ClinicalTopic::Medication, ClinicalTopic::Diagnosis]
        );
    }

    #[test]
    fn vocabulary_is_lowercase() {
        for (_, terms) in CLINICAL_VOCABULARY {
            for term in *terms {
                assert_eq!(*term, term.to_lowercase());
            }
        }
    }
}
