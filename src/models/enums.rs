use serde::{Deserialize, Serialize};

/// Unknown string value for one of the enums below.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid value for {field}: {value}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(
    /// Which conversational role handles a turn.
    Role {
        Identifying => "identifying",
        Informational => "informational",
    }
);

impl Role {
    /// Name of the agent persona shown to the patient for this role.
    pub fn agent_name(&self) -> &'static str {
        match self {
            Role::Identifying => "receptionist",
            Role::Informational => "clinical",
        }
    }
}

str_enum!(
    /// Where an evidence item came from.
    EvidenceSource {
        KnowledgeBase => "knowledge-base",
        Web => "web",
    }
);

str_enum!(
    /// Author of a session history entry.
    Speaker {
        Patient => "patient",
        Router => "router",
        Assistant => "assistant",
    }
);

str_enum!(
    /// Clinical vocabulary groups recognised by the intent classifier.
    ClinicalTopic {
        Symptom => "symptom",
        Medication => "medication",
        Diagnosis => "diagnosis",
        Diet => "diet",
        FollowUp => "follow_up",
        WarningSign => "warning_sign",
    }
);

str_enum!(
    /// Where the knowledge chunks were loaded from.
    CorpusOrigin {
        Document => "document",
        Fallback => "fallback",
    }
);
