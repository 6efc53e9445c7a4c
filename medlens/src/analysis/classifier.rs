//! Keyword gate for the chat endpoint.
//!
//! Membership is a plain case-insensitive substring test. There is no
//! stemming and no negation handling, so "I don't have a fever" is still
//! in scope and an unlisted condition may be refused.

use crate::models::ChatReply;

pub const MEDICAL_KEYWORDS: &[&str] = &[
    // General
    "health", "medical", "medicine", "medication", "doctor", "physician", "nurse",
    "hospital", "clinic", "patient", "symptom", "diagnos", "treatment", "therapy",
    "disease", "illness", "disorder", "syndrome", "infection", "prescription",
    "dosage", "vaccine", "surgery", "emergency",
    // Symptoms
    "pain", "fever", "cough", "headache", "migraine", "nausea", "vomit", "dizz",
    "fatigue", "swelling", "itching", "bleeding", "short of breath", "sore throat",
    "diarrhea", "constipation", "insomnia", "common cold", "influenza",
    // Anatomy
    "heart", "lung", "liver", "kidney", "brain", "stomach", "bone", "muscle",
    "joint", "skin", "blood", "chest", "spine", "throat", "tooth", "teeth",
    // Conditions and tests
    "diabetes", "cancer", "tumor", "asthma", "allergy", "allergic", "cholesterol",
    "fracture", "injury", "wound", "anxiety", "depression", "pregnan", "x-ray",
    "xray", "mri", "ct scan", "ecg", "ekg", "ultrasound", "lab test", "antibiotic",
    "covid", "virus",
    // Arabic
    "صحة", "طبيب", "دكتور", "مستشفى", "مريض", "مرض", "ألم", "وجع", "حمى", "حرارة",
    "صداع", "سعال", "كحة", "أعراض", "اعراض", "دواء", "علاج", "تشخيص", "قلب", "الدم",
    "ضغط الدم", "سكري", "سرطان", "أشعة", "اشعة", "حساسية",
];

/// Fixed reply for out-of-scope chat messages, in both languages.
pub const REFUSAL_ENGLISH: &str = "I'm sorry, but I can only help with medical and health-related questions. Please ask me about symptoms, conditions, medications, test results, or other health concerns.";
pub const REFUSAL_ARABIC: &str = "عذراً، يمكنني فقط المساعدة في الأسئلة الطبية والمتعلقة بالصحة. يرجى سؤالي عن الأعراض أو الحالات المرضية أو الأدوية أو نتائج الفحوصات أو أي مخاوف صحية أخرى.";

/// Confidence attached to the refusal, on the chat 0..=100 scale.
pub const REFUSAL_CONFIDENCE: f64 = 100.0;

/// True when `text` mentions any medical keyword.
pub fn is_medical_topic(text: &str) -> bool {
    let lowered = text.to_lowercase();
    MEDICAL_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

pub fn refusal_reply() -> ChatReply {
    ChatReply {
        response_english: REFUSAL_ENGLISH.to_string(),
        response_arabic: REFUSAL_ARABIC.to_string(),
        is_medical: false,
        confidence_score: REFUSAL_CONFIDENCE,
    }
}
