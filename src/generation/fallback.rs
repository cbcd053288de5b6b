//! Canned replies used when no generator is configured or generation fails.

use super::prompt::DISCLAIMER;
use crate::conversation::types::RoutingDecision;
use crate::models::Role;

/// Evidence excerpts are cut to this many chars.
const EXCERPT_CHARS: usize = 300;

/// Deterministic reply built from the decision alone.
pub fn fallback_reply(decision: &RoutingDecision) -> String {
    match decision.role {
        Role::Identifying => receptionist_reply(decision),
        Role::Informational => clinical_reply(decision),
    }
}

fn receptionist_reply(decision: &RoutingDecision) -> String {
    match (&decision.patient, &decision.lookup) {
        (Some(patient), _) => format!(
            "Welcome, {}. I found your discharge report from {} ({}). How is your recovery going? \
             If you have questions about your condition or medications, just ask.",
            patient.full_name, patient.discharge_date, patient.primary_diagnosis
        ),
        (None, Some(lookup)) if !lookup.found => format!(
            "I couldn't find a discharge report for \"{}\". Could you give me your full name \
             exactly as it appears on your discharge papers?",
            lookup.query
        ),
        (None, _) => "Hello! I'm the follow-up receptionist. To get started, could you tell me \
                      your full name?"
            .to_string(),
    }
}

fn clinical_reply(decision: &RoutingDecision) -> String {
    let mut reply = String::new();

    if decision.evidence.is_empty() {
        if decision.is_clinical() {
            reply.push_str(
                "I couldn't find specific information about that in our nephrology references. \
                 Please ask your care team.",
            );
        } else {
            reply.push_str("You're welcome. Is there anything else about your recovery I can help with?");
            return reply;
        }
    } else {
        reply.push_str("Here is what our nephrology references say:\n");
        for (i, item) in decision.evidence.iter().enumerate() {
            let excerpt: String = item.text.chars().take(EXCERPT_CHARS).collect();
            let ellipsis = if item.text.chars().count() > EXCERPT_CHARS { "..." } else { "" };
            reply.push_str(&format!("[{}] {excerpt}{ellipsis} ({})\n", i + 1, item.label));
        }
    }

    if let Some(patient) = &decision.patient {
        reply.push_str(&format!(
            "\nYour discharge report lists these warning signs: {}. If you notice any of them, \
             contact your care team right away.",
            patient.warning_signs
        ));
    }

    reply.push_str("\n\n");
    reply.push_str(DISCLAIMER);
    reply
}
