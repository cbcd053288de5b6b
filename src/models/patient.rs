use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A patient's discharge report. Immutable once loaded into the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(rename = "patient_name")]
    pub full_name: String,
    pub discharge_date: NaiveDate,
    pub primary_diagnosis: String,
    pub medications: Vec<String>,
    pub dietary_restrictions: String,
    pub follow_up: String,
    pub warning_signs: String,
    pub discharge_instructions: String,
}

impl PatientRecord {
    /// Final whitespace-delimited token of the full name.
    pub fn last_name(&self) -> &str {
        self.full_name.split_whitespace().last().unwrap_or("")
    }

    /// Multi-line summary used when handing the record to the generation step.
    pub fn summary(&self) -> String {
        let medications = if self.medications.is_empty() {
            "none listed".to_string()
        } else {
            self.medications.join(", ")
        };
        format!(
            "Patient: {}\nDischarged: {}\nDiagnosis: {}\nMedications: {}\nDiet: {}\nFollow-up: {}\nWarning signs: {}\nInstructions: {}",
            self.full_name,
            self.discharge_date,
            self.primary_diagnosis,
            medications,
            self.dietary_restrictions,
            self.follow_up,
            self.warning_signs,
            self.discharge_instructions,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PatientRecord {
        PatientRecord {
            full_name: "Maria  Elena Garcia".into(),
            discharge_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            primary_diagnosis: "Acute Kidney Injury".into(),
            medications: vec!["Furosemide 20mg daily".into()],
            dietary_restrictions: "Low sodium".into(),
            follow_up: "Nephrology in 1 week".into(),
            warning_signs: "Decreased urine output".into(),
            discharge_instructions: "Daily weights".into(),
        }
    }

    #[test]
    fn last_name_ignores_extra_spaces() {
        assert_eq!(record().last_name(), "Garcia");
    }

    #[test]
    fn serializes_with_patient_name_key() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["patient_name"], "Maria  Elena Garcia");
        assert_eq!(json["discharge_date"], "2024-03-02");
    }

    #[test]
    fn summary_lists_medications() {
        let summary = record().summary();
        assert!(summary.contains("Furosemide 20mg daily"));
        assert!(summary.contains("Acute Kidney Injury"));
    }
}
