//! Demo discharge reports written to a fresh data directory so the assistant
//! is usable before a real patient export is dropped in.

use chrono::NaiveDate;

use crate::models::PatientRecord;

struct Demo {
    name: &'static str,
    discharged: (i32, u32, u32),
    diagnosis: &'static str,
    medications: &'static [&'static str],
    diet: &'static str,
    follow_up: &'static str,
    warning_signs: &'static str,
    instructions: &'static str,
}

const DEMO_PATIENTS: &[Demo] = &[
    Demo {
        name: "John Smith",
        discharged: (2024, 1, 15),
        diagnosis: "Chronic Kidney Disease Stage 3",
        medications: &["Lisinopril 10mg daily", "Furosemide 20mg twice daily"],
        diet: "Low sodium (2g/day), fluid restriction (1.5L/day)",
        follow_up: "Nephrology clinic in 2 weeks",
        warning_signs: "Swelling, shortness of breath, decreased urine output",
        instructions: "Monitor blood pressure daily, weigh yourself every morning",
    },
    Demo {
        name: "Maria Garcia",
        discharged: (2024, 2, 3),
        diagnosis: "Acute Kidney Injury (resolving)",
        medications: &["Sodium bicarbonate 650mg three times daily"],
        diet: "Moderate protein, avoid NSAIDs and herbal supplements",
        follow_up: "Repeat creatinine and electrolytes in 1 week",
        warning_signs: "Confusion, nausea, urine output below 400 mL/day",
        instructions: "Drink fluids as directed and keep a urine output log",
    },
    Demo {
        name: "Robert Johnson",
        discharged: (2024, 1, 28),
        diagnosis: "Diabetic Nephropathy",
        medications: &[
            "Losartan 50mg daily",
            "Empagliflozin 10mg daily",
            "Insulin glargine 20 units at bedtime",
        ],
        diet: "Diabetic diet, protein 0.8 g/kg/day, low potassium",
        follow_up: "Endocrinology and nephrology in 4 weeks",
        warning_signs: "Blood sugar above 300, foamy urine, leg swelling",
        instructions: "Check blood glucose before meals and at bedtime",
    },
    Demo {
        name: "Linda Chen",
        discharged: (2024, 2, 12),
        diagnosis: "Nephrotic Syndrome (minimal change disease)",
        medications: &["Prednisone 60mg daily", "Atorvastatin 20mg daily"],
        diet: "Low sodium, low saturated fat",
        follow_up: "Urine protein check in 2 weeks",
        warning_signs: "Rapid weight gain, calf pain, fever",
        instructions: "Do not stop prednisone abruptly",
    },
    Demo {
        name: "David Okafor",
        discharged: (2024, 3, 1),
        diagnosis: "End-Stage Renal Disease on hemodialysis",
        medications: &["Sevelamer 800mg with meals", "Epoetin alfa per dialysis unit"],
        diet: "Low potassium, low phosphorus, fluid limit 1L/day",
        follow_up: "Dialysis Monday, Wednesday, Friday",
        warning_signs: "Fistula without thrill, chest pain, muscle weakness",
        instructions: "Protect the fistula arm, no blood pressure cuffs on that arm",
    },
    Demo {
        name: "Emily Nowak",
        discharged: (2024, 2, 20),
        diagnosis: "Kidney transplant recipient, stable graft",
        medications: &[
            "Tacrolimus 3mg twice daily",
            "Mycophenolate 500mg twice daily",
            "Prednisone 5mg daily",
        ],
        diet: "Food safety precautions, avoid grapefruit",
        follow_up: "Transplant clinic weekly for 1 month",
        warning_signs: "Fever, pain over the graft, reduced urine output",
        instructions: "Take tacrolimus at the same times every day",
    },
    Demo {
        name: "Ahmed Hassan",
        discharged: (2024, 1, 9),
        diagnosis: "IgA Nephropathy",
        medications: &["Ramipril 5mg daily", "Omega-3 fatty acids 4g daily"],
        diet: "Low sodium",
        follow_up: "Nephrology in 6 weeks with urinalysis",
        warning_signs: "Visible blood in urine after a cold, headache with high blood pressure",
        instructions: "Record home blood pressure twice daily",
    },
    Demo {
        name: "Grace Thompson",
        discharged: (2024, 3, 5),
        diagnosis: "Polycystic Kidney Disease",
        medications: &["Tolvaptan 45mg morning and 15mg afternoon", "Amlodipine 5mg daily"],
        diet: "High water intake (3L/day), low sodium",
        follow_up: "Liver function tests monthly",
        warning_signs: "Flank pain with fever, yellowing of the skin",
        instructions: "Drink water before bed and overnight when awake",
    },
];

/// Bundled demo records in stable order.
pub fn demo_records() -> Vec<PatientRecord> {
    DEMO_PATIENTS
        .iter()
        .filter_map(|demo| {
            let (y, m, d) = demo.discharged;
            Some(PatientRecord {
                full_name: demo.name.to_string(),
                discharge_date: NaiveDate::from_ymd_opt(y, m, d)?,
                primary_diagnosis: demo.diagnosis.to_string(),
                medications: demo.medications.iter().map(|m| m.to_string()).collect(),
                dietary_restrictions: demo.diet.to_string(),
                follow_up: demo.follow_up.to_string(),
                warning_signs: demo.warning_signs.to_string(),
                discharge_instructions: demo.instructions.to_string(),
            })
        })
        .collect()
}
