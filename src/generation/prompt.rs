use crate::conversation::session::HistoryEntry;
use crate::conversation::types::RoutingDecision;
use crate::models::{Role, Speaker};

/// Appended to every clinical answer.
pub const DISCLAIMER: &str =
    "This is for educational purposes. Consult your healthcare professionals for medical advice.";

/// History entries included in a prompt.
const HISTORY_WINDOW: usize = 6;
/// Evidence text is cut to this many chars in the prompt.
const EVIDENCE_CHARS: usize = 500;

pub const RECEPTIONIST_SYSTEM_PROMPT: &str = r#"You are the receptionist of a post-discharge nephrology follow-up service.

RULES:
1. Greet the patient warmly and keep replies short.
2. If no patient record is attached, ask for the patient's full name exactly as it appears on their discharge papers.
3. If a patient record is attached, confirm their name and discharge date, and ask how their recovery is going.
4. Do NOT answer medical questions yourself. Say the clinical team will help once the patient is identified.
5. Never invent patient details. Only use the PATIENT RECORD section."#;

pub const CLINICAL_SYSTEM_PROMPT: &str = r#"You are the clinical information assistant of a post-discharge nephrology follow-up service. You are NOT a doctor.

RULES:
1. Ground every statement in the PATIENT RECORD and EVIDENCE sections below.
2. Cite evidence by its number, e.g. [1], and mention when an item comes from the web.
3. NEVER diagnose, prescribe, or change a treatment plan.
4. If the patient describes any of their listed warning signs, tell them to contact their care team or emergency services now.
5. Use plain, patient-friendly language.
6. End with this disclaimer: "This is for educational purposes. Consult your healthcare professionals for medical advice.""#;

/// System prompt for the role that handles the turn.
pub fn system_prompt(role: Role) -> &'static str {
    match role {
        Role::Identifying => RECEPTIONIST_SYSTEM_PROMPT,
        Role::Informational => CLINICAL_SYSTEM_PROMPT,
    }
}

/// User prompt: recent transcript, patient record, numbered evidence, then
/// the message itself.
pub fn build_prompt(decision: &RoutingDecision, message: &str, history: &[HistoryEntry]) -> String {
    let mut prompt = String::new();

    let spoken: Vec<&HistoryEntry> = history
        .iter()
        .filter(|h| h.speaker != Speaker::Router)
        .collect();
    let recent = &spoken[spoken.len().saturating_sub(HISTORY_WINDOW)..];
    if !recent.is_empty() {
        prompt.push_str("<CONVERSATION_HISTORY>\n");
        for entry in recent.iter() {
            let who = match entry.speaker {
                Speaker::Patient => "Patient",
                _ => "Assistant",
            };
            prompt.push_str(&format!("{who}: {}\n", entry.text));
        }
        prompt.push_str("</CONVERSATION_HISTORY>\n\n");
    }

    prompt.push_str("<PATIENT_RECORD>\n");
    match &decision.patient {
        Some(patient) => prompt.push_str(&patient.summary()),
        None => prompt.push_str("No patient identified yet."),
    }
    prompt.push_str("\n</PATIENT_RECORD>\n\n");

    if decision.role == Role::Informational {
        prompt.push_str("<EVIDENCE>\n");
        if decision.evidence.is_empty() {
            prompt.push_str("No specific nephrology information found.\n");
        }
        for (i, item) in decision.evidence.iter().enumerate() {
            let text: String = item.text.chars().take(EVIDENCE_CHARS).collect();
            prompt.push_str(&format!("[{}] ({}: {}) {}\n", i + 1, item.source, item.label, text));
        }
        prompt.push_str("</EVIDENCE>\n\n");
    }

    if let Some(lookup) = decision.lookup.as_ref().filter(|l| !l.found) {
        prompt.push_str(&format!(
            "Note: no discharge report matched the name \"{}\".\n\n",
            lookup.query
        ));
    }

    prompt.push_str(&format!("Patient message: {message}\n"));
    prompt
}
