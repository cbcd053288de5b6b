//! Conversation Orchestrator: the two-role routing state machine.
//!
//! `Identifying` binds a patient through the directory. A bound patient with
//! a clinical question moves the session to `Informational`, where clinical
//! questions get evidence from the retrieval service. Only an explicit
//! introduction cue ("my name is ...") leads back to `Identifying`.
//!
//! Turns for one session are serialised by the session's mutex, held from
//! validation to commit, and by `handle_turn` until the reply is appended.
//! The turn works on local copies and writes them back only once nothing can
//! fail, so a rejected turn leaves the session untouched.

use std::future::Future;
use std::sync::Arc;

use uuid::Uuid;

use super::classify::{classify_message, Intent};
use super::names::{extract_candidate, NameCandidate};
use super::session::{HistoryEntry, Session, SessionStore};
use super::types::{LookupOutcome, RoutingDecision};
use super::RoutingError;
use crate::directory::PatientDirectory;
use crate::models::{PatientRecord, Role, Speaker};
use crate::pipeline::rag::retrieval::RetrievalService;

pub struct Orchestrator {
    directory: Arc<PatientDirectory>,
    retrieval: Option<Arc<RetrievalService>>,
    sessions: SessionStore,
    max_message_chars: usize,
}

impl Orchestrator {
    /// `retrieval` is `None` when the knowledge index failed to build; the
    /// orchestrator then serves identification only.
    pub fn new(
        directory: Arc<PatientDirectory>,
        retrieval: Option<Arc<RetrievalService>>,
        max_message_chars: usize,
    ) -> Self {
        Self {
            directory,
            retrieval,
            sessions: SessionStore::new(),
            max_message_chars,
        }
    }

    // ═══════════════════════════════════════════════════════════
    // Inbound operations
    // ═══════════════════════════════════════════════════════════

    /// Route one patient message. An empty `session_id` starts a new session
    /// under a generated id, echoed in the decision.
    pub async fn submit_message(
        &self,
        session_id: &str,
        text: &str,
        patient_hint: Option<&str>,
    ) -> Result<RoutingDecision, RoutingError> {
        let text = validate_message(text, self.max_message_chars).inspect_err(|e| {
            tracing::debug!(session_id, error = %e, "Message rejected");
        })?;
        let session_id = resolve_session_id(session_id);

        let handle = self.sessions.get_or_create(&session_id);
        let mut session = handle.lock().await;
        self.route(&mut session, session_id, text, patient_hint).await
    }

    /// Route a message and produce its reply inside one exclusive scope for
    /// the session. `respond` gets the decision and the transcript from
    /// before this turn; its reply is appended before the lock is released,
    /// so concurrent turns on one session never interleave.
    pub async fn handle_turn<F, Fut>(
        &self,
        session_id: &str,
        text: &str,
        patient_hint: Option<&str>,
        respond: F,
    ) -> Result<(RoutingDecision, String), RoutingError>
    where
        F: FnOnce(RoutingDecision, Vec<HistoryEntry>) -> Fut,
        Fut: Future<Output = String>,
    {
        let text = validate_message(text, self.max_message_chars).inspect_err(|e| {
            tracing::debug!(session_id, error = %e, "Message rejected");
        })?;
        let session_id = resolve_session_id(session_id);

        let handle = self.sessions.get_or_create(&session_id);
        let mut session = handle.lock().await;
        let prior = session.history.clone();
        let decision = self.route(&mut session, session_id, text, patient_hint).await?;

        let reply = respond(decision.clone(), prior).await;
        session.push(Speaker::Assistant, reply.as_str());
        Ok((decision, reply))
    }

    /// One turn against a locked session. Writes back only on success.
    async fn route(
        &self,
        session: &mut Session,
        session_id: String,
        text: &str,
        patient_hint: Option<&str>,
    ) -> Result<RoutingDecision, RoutingError> {
        let start_role = session.role;

        let intent = classify_message(text);
        let candidate = extract_candidate(text, session.patient.is_none());
        let hint = patient_hint.map(str::trim).filter(|h| !h.is_empty());

        let plan = plan_turn(
            start_role,
            session.patient.clone(),
            &intent,
            candidate,
            hint,
            |name| self.directory.find(name),
        );

        let evidence = if plan.role == Role::Informational {
            let Some(retrieval) = &self.retrieval else {
                tracing::warn!(session_id = %session_id, "Clinical turn refused, knowledge index unavailable");
                return Err(RoutingError::KnowledgeUnavailable);
            };
            if plan.retrieve {
                retrieval.retrieve(text).await
            } else {
                Vec::new()
            }
        } else {
            Vec::new()
        };

        let decision = RoutingDecision {
            session_id: session_id.clone(),
            role: plan.role,
            patient: plan.patient.clone(),
            evidence,
            handoff: plan.role != start_role,
            topics: intent.topics().to_vec(),
            lookup: plan.lookup,
        };

        if decision.handoff {
            tracing::info!(
                session_id = %session_id,
                from = %start_role,
                to = %decision.role,
                "Role handoff"
            );
        }

        session.role = plan.role;
        session.patient = plan.patient;
        session.push(Speaker::Patient, text);
        session.push(Speaker::Router, decision.summary());

        Ok(decision)
    }

    /// Direct directory lookup, outside any session.
    pub fn get_patient(&self, name: &str) -> Option<PatientRecord> {
        self.directory.find(name)
    }

    pub async fn history(&self, session_id: &str) -> Option<Vec<HistoryEntry>> {
        let handle = self.sessions.get(session_id)?;
        let session = handle.lock().await;
        Some(session.history.clone())
    }

    pub fn evict_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id);
        if removed {
            tracing::debug!(session_id, "Session evicted");
        }
        removed
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn knowledge_available(&self) -> bool {
        self.retrieval.is_some()
    }

    pub fn directory(&self) -> &PatientDirectory {
        &self.directory
    }

    pub fn retrieval(&self) -> Option<&RetrievalService> {
        self.retrieval.as_deref()
    }
}

// ═══════════════════════════════════════════════════════════
// Turn planning (pure)
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
struct TurnPlan {
    role: Role,
    patient: Option<PatientRecord>,
    lookup: Option<LookupOutcome>,
    retrieve: bool,
}

/// Resolve role, binding and retrieval for one turn from the session state,
/// the message classification and the lookup outcome.
fn plan_turn<F>(
    start: Role,
    bound: Option<PatientRecord>,
    intent: &Intent,
    candidate: Option<NameCandidate>,
    hint: Option<&str>,
    lookup: F,
) -> TurnPlan
where
    F: Fn(&str) -> Option<PatientRecord>,
{
    let clinical = intent.is_clinical();

    let query = match start {
        Role::Identifying => candidate.map(|c| c.name).or_else(|| {
            if bound.is_none() {
                hint.map(str::to_string)
            } else {
                None
            }
        }),
        // Only an explicit introduction re-identifies
        Role::Informational => candidate.filter(|c| c.explicit).map(|c| c.name),
    };

    let Some(query) = query else {
        return plan_without_lookup(start, bound, clinical);
    };

    let found = lookup(&query);
    let outcome = Some(LookupOutcome {
        query,
        found: found.is_some(),
    });
    match found {
        Some(record) if clinical => TurnPlan {
            role: Role::Informational,
            patient: Some(record),
            lookup: outcome,
            retrieve: true,
        },
        Some(record) => TurnPlan {
            role: Role::Identifying,
            patient: Some(record),
            lookup: outcome,
            retrieve: false,
        },
        // A failed re-identification keeps the bound patient
        None if bound.is_some() => TurnPlan {
            lookup: outcome,
            ..plan_without_lookup(start, bound, clinical)
        },
        None => TurnPlan {
            role: Role::Identifying,
            patient: None,
            lookup: outcome,
            retrieve: false,
        },
    }
}

/// Turn with no directory lookup: the binding is unchanged and a clinical
/// question from a bound patient goes to the clinical role.
fn plan_without_lookup(start: Role, bound: Option<PatientRecord>, clinical: bool) -> TurnPlan {
    match start {
        Role::Identifying if bound.is_some() && clinical => TurnPlan {
            role: Role::Informational,
            patient: bound,
            lookup: None,
            retrieve: true,
        },
        Role::Identifying => TurnPlan {
            role: Role::Identifying,
            patient: bound,
            lookup: None,
            retrieve: false,
        },
        Role::Informational => TurnPlan {
            role: Role::Informational,
            patient: bound,
            lookup: None,
            retrieve: clinical,
        },
    }
}

fn resolve_session_id(session_id: &str) -> String {
    match session_id.trim() {
        "" => Uuid::new_v4().to_string(),
        id => id.to_string(),
    }
}

/// Trimmed message, or `MalformedInput` when it is empty, too long, or has
/// nothing but whitespace and control characters.
fn validate_message(text: &str, max_chars: usize) -> Result<&str, RoutingError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(RoutingError::MalformedInput("message is empty".into()));
    }
    if trimmed.chars().all(|c| c.is_control() || c.is_whitespace()) {
        return Err(RoutingError::MalformedInput("message contains no text".into()));
    }
    let len = trimmed.chars().count();
    if len > max_chars {
        return Err(RoutingError::MalformedInput(format!(
            "message is {len} characters, limit is {max_chars}"
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::seed::demo_records;
    use crate::models::EvidenceSource;
    use crate::pipeline::rag::gateway::MockGateway;
    use crate::pipeline::rag::types::WebResult;
    use crate::pipeline::storage::corpus::fallback_corpus;
    use crate::pipeline::storage::embedder::HashingEmbedder;
    use crate::pipeline::storage::vectordb::KnowledgeIndex;
    use std::time::Duration;

    fn directory() -> Arc<PatientDirectory> {
        Arc::new(PatientDirectory::from_records(demo_records()).unwrap())
    }

    fn index() -> Arc<KnowledgeIndex> {
        Arc::new(KnowledgeIndex::build(fallback_corpus().chunks, Arc::new(HashingEmbedder::new())).unwrap())
    }

    fn orchestrator() -> Orchestrator {
        let retrieval = RetrievalService::new(index(), 3);
        Orchestrator::new(directory(), Some(Arc::new(retrieval)), 2000)
    }

    /// Plain and web-enabled orchestrators over a one-chunk index, so the
    /// knowledge base leaves room for web items.
    fn orchestrators_over_small_index() -> (Orchestrator, Orchestrator) {
        let chunks = fallback_corpus().chunks.into_iter().take(1).collect();
        let small = Arc::new(KnowledgeIndex::build(chunks, Arc::new(HashingEmbedder::new())).unwrap());
        let gateway = MockGateway::with_results(vec![WebResult {
            title: "KDIGO summary".into(),
            url: "https://example.org/kdigo".into(),
            content: "ACE inhibitors may raise potassium.".into(),
        }]);
        let plain = RetrievalService::new(small.clone(), 3);
        let web = RetrievalService::new(small, 3).with_gateway(Arc::new(gateway), 3, Duration::from_secs(5));
        (
            Orchestrator::new(directory(), Some(Arc::new(plain)), 2000),
            Orchestrator::new(directory(), Some(Arc::new(web)), 2000),
        )
    }

    #[tokio::test]
    async fn identify_then_ask_hands_off_to_clinical_role() {
        let orch = orchestrator();

        let first = orch
            .submit_message("s1", "Hello, my name is John Smith,", None)
            .await
            .unwrap();
        assert_eq!(first.role, Role::Identifying);
        assert!(!first.handoff);
        assert_eq!(first.patient.as_ref().unwrap().full_name, "John Smith");
        assert!(first.evidence.is_empty());

        let second = orch
            .submit_message("s1", "What are the side effects of my medication?", None)
            .await
            .unwrap();
        assert_eq!(second.role, Role::Informational);
        assert!(second.handoff);
        assert_eq!(second.patient.as_ref().unwrap().full_name, "John Smith");
        assert!(!second.evidence.is_empty());
        assert!(second.evidence.len() <= 3);
    }

    #[tokio::test]
    async fn unknown_name_stays_identifying() {
        let orch = orchestrator();
        let decision = orch
            .submit_message("s1", "my name is Zelda Quigley", None)
            .await
            .unwrap();
        assert_eq!(decision.role, Role::Identifying);
        assert!(decision.patient.is_none());
        assert!(!decision.handoff);
        assert!(decision.evidence.is_empty());
        assert_eq!(
            decision.lookup,
            Some(LookupOutcome { query: "Zelda Quigley".into(), found: false })
        );

        let bare = orch.submit_message("s2", "no-such-person-xyz", None).await.unwrap();
        assert!(bare.patient.is_none());
        assert_eq!(bare.role, Role::Identifying);
    }

    #[tokio::test]
    async fn name_and_question_in_one_message() {
        let orch = orchestrator();
        let decision = orch
            .submit_message("s1", "Hi, I'm Linda Chen and my ankles are swelling", None)
            .await
            .unwrap();
        assert_eq!(decision.role, Role::Informational);
        assert!(decision.handoff);
        assert_eq!(decision.patient.unwrap().full_name, "Linda Chen");
        assert!(!decision.evidence.is_empty());
    }

    #[tokio::test]
    async fn explicit_new_name_returns_to_identifying() {
        let orch = orchestrator();
        orch.submit_message("s1", "I am John Smith", None).await.unwrap();
        orch.submit_message("s1", "Is my kidney getting better?", None).await.unwrap();

        let decision = orch
            .submit_message("s1", "Sorry, my name is Maria Garcia", None)
            .await
            .unwrap();
        assert_eq!(decision.role, Role::Identifying);
        assert!(decision.handoff);
        assert_eq!(decision.patient.unwrap().full_name, "Maria Garcia");

        let decision = orch
            .submit_message("s1", "This is Nobody Atall.", None)
            .await
            .unwrap();
        assert_eq!(decision.role, Role::Identifying);
        assert!(!decision.handoff);
        assert_eq!(decision.patient.unwrap().full_name, "Maria Garcia");
        assert_eq!(
            decision.lookup,
            Some(LookupOutcome { query: "Nobody Atall".into(), found: false })
        );
    }

    #[tokio::test]
    async fn clinical_question_after_cue_word_keeps_binding() {
        let orch = orchestrator();
        orch.submit_message("s1", "my name is John Smith", None).await.unwrap();
        orch.submit_message("s1", "what about my blood pressure?", None).await.unwrap();

        for question in [
            "I'm Diabetic, so what can I eat?",
            "This is Lisinopril right? does it hurt my kidney",
        ] {
            let decision = orch.submit_message("s1", question, None).await.unwrap();
            assert_eq!(decision.role, Role::Informational, "{question}");
            assert!(!decision.handoff);
            assert_eq!(decision.patient.unwrap().full_name, "John Smith");
            assert!(!decision.evidence.is_empty());
            assert!(decision.lookup.is_none());
        }
    }

    #[tokio::test]
    async fn failed_explicit_lookup_while_bound_keeps_answering() {
        let orch = orchestrator();
        orch.submit_message("s1", "my name is John Smith", None).await.unwrap();
        orch.submit_message("s1", "what should I eat?", None).await.unwrap();

        let decision = orch
            .submit_message("s1", "My name is Zed Quill, is my kidney test normal?", None)
            .await
            .unwrap();
        assert_eq!(decision.role, Role::Informational);
        assert_eq!(decision.patient.unwrap().full_name, "John Smith");
        assert!(!decision.evidence.is_empty());
        assert_eq!(decision.lookup.map(|l| l.found), Some(false));
    }

    #[tokio::test]
    async fn name_like_token_in_clinical_question_keeps_clinical_role() {
        let orch = orchestrator();
        orch.submit_message("s1", "my name is John Smith", None).await.unwrap();
        orch.submit_message("s1", "what about my blood pressure?", None).await.unwrap();

        let decision = orch
            .submit_message("s1", "Is Lisinopril safe for my kidney?", None)
            .await
            .unwrap();
        assert_eq!(decision.role, Role::Informational);
        assert!(!decision.handoff);
        assert_eq!(decision.patient.unwrap().full_name, "John Smith");
        assert!(decision.lookup.is_none());
    }

    #[tokio::test]
    async fn administrative_message_in_clinical_role_has_no_evidence() {
        let orch = orchestrator();
        orch.submit_message("s1", "my name is John Smith", None).await.unwrap();
        orch.submit_message("s1", "what should I eat?", None).await.unwrap();

        let decision = orch.submit_message("s1", "Thank you!", None).await.unwrap();
        assert_eq!(decision.role, Role::Informational);
        assert!(!decision.handoff);
        assert!(decision.evidence.is_empty());
    }

    #[tokio::test]
    async fn patient_hint_used_only_without_candidate() {
        let orch = orchestrator();
        let decision = orch
            .submit_message("s1", "hello", Some("Robert Johnson"))
            .await
            .unwrap();
        assert_eq!(decision.patient.unwrap().full_name, "Robert Johnson");

        let decision = orch
            .submit_message("s2", "my name is Grace Thompson", Some("Robert Johnson"))
            .await
            .unwrap();
        assert_eq!(decision.patient.unwrap().full_name, "Grace Thompson");
    }

    #[tokio::test]
    async fn malformed_messages_are_rejected_before_any_state_change() {
        let orch = orchestrator();
        for text in ["", "   \n\t", "\u{7}\u{8}"] {
            assert!(matches!(
                orch.submit_message("s1", text, None).await,
                Err(RoutingError::MalformedInput(_))
            ));
        }
        let long = "a".repeat(2001);
        assert!(matches!(
            orch.submit_message("s1", &long, None).await,
            Err(RoutingError::MalformedInput(_))
        ));
        assert_eq!(orch.active_sessions(), 0);
    }

    #[tokio::test]
    async fn empty_session_id_gets_generated_one() {
        let orch = orchestrator();
        let decision = orch.submit_message("", "John Smith", None).await.unwrap();
        assert!(Uuid::parse_str(&decision.session_id).is_ok());
        assert!(orch.history(&decision.session_id).await.is_some());
    }

    #[tokio::test]
    async fn clinical_turn_without_index_is_refused_and_state_kept() {
        let orch = Orchestrator::new(directory(), None, 2000);
        let first = orch.submit_message("s1", "my name is John Smith", None).await.unwrap();
        assert_eq!(first.patient.unwrap().full_name, "John Smith");

        let result = orch.submit_message("s1", "what are my medication side effects?", None).await;
        assert_eq!(result, Err(RoutingError::KnowledgeUnavailable));

        let history = orch.history("s1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|h| h.role == Role::Identifying));
    }

    #[tokio::test]
    async fn gateway_adds_web_items_after_knowledge_items() {
        let (plain, web) = orchestrators_over_small_index();
        for orch in [&plain, &web] {
            orch.submit_message("s1", "my name is John Smith", None).await.unwrap();
        }
        let question = "What are the side effects of my medication?";
        let a = plain.submit_message("s1", question, None).await.unwrap();
        let b = web.submit_message("s1", question, None).await.unwrap();

        let kb: Vec<_> = b
            .evidence
            .iter()
            .filter(|e| e.source == EvidenceSource::KnowledgeBase)
            .cloned()
            .collect();
        assert_eq!(a.evidence, kb);
        assert_eq!(b.evidence.last().unwrap().source, EvidenceSource::Web);
        assert!(b.evidence.len() <= 3);
    }

    #[tokio::test]
    async fn history_records_turns_and_replies() {
        let orch = orchestrator();
        let (_, reply) = orch
            .handle_turn("s1", "my name is John Smith", None, |_, _| async {
                "Welcome back, John.".to_string()
            })
            .await
            .unwrap();
        assert_eq!(reply, "Welcome back, John.");
        assert!(orch.history("missing").await.is_none());

        let history = orch.history("s1").await.unwrap();
        let speakers: Vec<Speaker> = history.iter().map(|h| h.speaker).collect();
        assert_eq!(speakers, vec![Speaker::Patient, Speaker::Router, Speaker::Assistant]);
        assert_eq!(history[0].text, "my name is John Smith");
        assert_eq!(history[2].text, "Welcome back, John.");

        assert!(orch.evict_session("s1"));
        assert!(orch.history("s1").await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_turns_on_one_session_never_interleave() {
        let orch = Arc::new(orchestrator());
        orch.submit_message("shared", "my name is John Smith", None).await.unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let orch = orch.clone();
                tokio::spawn(async move {
                    let session = if i % 2 == 0 { "shared" } else { "other" };
                    orch.submit_message(session, "What does my kidney diet allow?", None).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let history = orch.history("shared").await.unwrap();
        assert_eq!(history.len(), 2 + 4 * 2);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].speaker, Speaker::Patient);
            assert_eq!(pair[1].speaker, Speaker::Router);
        }
        assert_eq!(orch.active_sessions(), 2);
    }

    #[tokio::test]
    async fn handle_turn_keeps_each_turn_contiguous() {
        let orch = Arc::new(orchestrator());
        let turn = |text: &'static str, delay_ms: u64| {
            let orch = orch.clone();
            async move {
                orch.handle_turn("s1", text, None, |decision, prior| async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    format!("{} reply after {} entries", decision.role, prior.len())
                })
                .await
                .unwrap()
            }
        };

        let (slow, fast) = tokio::join!(turn("Hello", 50), turn("my name is John Smith", 0));
        assert_ne!(slow.0.session_id, "");
        assert_eq!(fast.0.patient.unwrap().full_name, "John Smith");

        let history = orch.history("s1").await.unwrap();
        assert_eq!(history.len(), 6);
        for triple in history.chunks(3) {
            assert_eq!(triple[0].speaker, Speaker::Patient);
            assert_eq!(triple[1].speaker, Speaker::Router);
            assert_eq!(triple[2].speaker, Speaker::Assistant);
        }
        assert!(history[2].text.ends_with("after 0 entries"));
        assert!(history[5].text.ends_with("after 3 entries"));
    }

    #[tokio::test]
    async fn rejected_turn_skips_reply() {
        let orch = orchestrator();
        let result = orch
            .handle_turn("s1", "   ", None, |_, _| async { "unused".to_string() })
            .await;
        assert!(matches!(result, Err(RoutingError::MalformedInput(_))));
        assert!(orch.history("s1").await.is_none());
    }

    #[test]
    fn plan_is_pure_function_of_state_intent_and_lookup() {
        let john = demo_records().remove(0);
        let clinical = classify_message("my medication makes me dizzy");
        let plan = plan_turn(Role::Identifying, Some(john.clone()), &clinical, None, None, |_| None);
        assert_eq!(plan.role, Role::Informational);
        assert!(plan.retrieve);
        assert!(plan.lookup.is_none());

        let plan = plan_turn(
            Role::Informational,
            Some(john.clone()),
            &Intent::Administrative,
            Some(NameCandidate { name: "Nobody".into(), explicit: true }),
            None,
            |_| None,
        );
        assert_eq!(plan.role, Role::Informational);
        assert_eq!(plan.patient, Some(john));
        assert!(!plan.retrieve);
        assert_eq!(plan.lookup.map(|l| l.found), Some(false));

        let plan = plan_turn(
            Role::Identifying,
            None,
            &Intent::Administrative,
            Some(NameCandidate { name: "Nobody".into(), explicit: true }),
            None,
            |_| None,
        );
        assert_eq!(plan.role, Role::Identifying);
        assert!(plan.patient.is_none());
    }
}
