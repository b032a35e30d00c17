//! Prompt templates for the two analysis stages and report reading.
//!
//! Templates are plain `format!()` strings. The model is expected to answer
//! with a JSON object, but nothing here assumes it will.

use crate::models::Record;

/// Stage A: identify the medicine shown in an image.
///
/// # Example
/// ```
/// use aarogya::llm::prompts::medicine_extraction_prompt;
///
/// let prompt = medicine_extraction_prompt();
/// assert!(prompt.contains("drug_name"));
/// assert!(prompt.contains("prescription_drug"));
/// ```
pub fn medicine_extraction_prompt() -> String {
    r#"Analyze this medicine image.
Extract the following in JSON format:
- drug_name
- strength
- indications
- prescription_drug (Yes/No)

If the medicine cannot be identified, set "drug_name" to "Unknown"."#
        .to_string()
}

/// Stage B instructions: assess a drug against the patient history.
///
/// The patient context and the drug details travel as separate text blocks
/// ahead of these instructions.
pub fn risk_assessment_prompt() -> String {
    r#"You are a Clinical Decision Support System. Output ONLY valid JSON.
Analyze the NEW DRUG against the PATIENT HISTORY for safety.
Required JSON Output Format:
{
  "interactions": [
    {
      "type": "Drug-Allergy" or "Drug-Condition" or "Drug-Drug",
      "severity": "High" or "Medium" or "Low",
      "warning": "Short description of the risk (e.g., 'Patient has penicillin allergy')"
    }
  ],
  "side_effects": ["Likely side effect 1", "Likely side effect 2"],
  "final_recommendation": "Proceed with caution" or "Do not take" or "Safe"
}
If no interactions are found, return an empty list [] for "interactions".
Do not output thinking or explanations. Start with {."#
        .to_string()
}

/// Single-stage report reading for lab report images.
///
/// # Example
/// ```
/// use aarogya::llm::prompts::report_analysis_prompt;
///
/// let prompt = report_analysis_prompt();
/// assert!(prompt.contains("abnormalities"));
/// ```
pub fn report_analysis_prompt() -> String {
    r#"You are a helpful medical API. Analyze the image and return a valid JSON object.

Rules:
1. Extract 'patient_name' and 'report_date'.
2. 'patient_summary': Write a polite, 2-sentence summary for the patient (e.g., "Your blood count shows low iron levels.").
3. 'abnormalities': List ONLY test results that are marked High or Low. Ignore normal results.
4. 'recommendations': Provide 3 simple, patient-friendly health tips based on the abnormalities.
5. ONLY return the JSON response, nothing else.

Output Format (Strict JSON):
{
  "patient_name": "string",
  "report_date": "string",
  "patient_summary": "string",
  "abnormalities": [
    {"test": "string", "value": "string", "status": "High/Low"}
  ],
  "recommendations": ["string", "string", "string"]
}"#
    .to_string()
}

/// Drug details block for stage B: the lookup result followed by the stage-A record.
///
/// # Example
/// ```
/// use aarogya::llm::prompts::drug_details_block;
/// use aarogya::models::Record;
/// use serde_json::json;
///
/// let mut fda = Record::new();
/// fda.insert("generic_name".into(), json!("ibuprofen"));
/// let mut extracted = Record::new();
/// extracted.insert("drug_name".into(), json!("Advil"));
///
/// let block = drug_details_block(&fda, &extracted);
/// assert_eq!(
///     block,
///     "FDA Info: {\"generic_name\":\"ibuprofen\"}\nExtracted Details: {\"drug_name\":\"Advil\"}"
/// );
/// ```
pub fn drug_details_block(drug_info: &Record, extracted: &Record) -> String {
    format!(
        "FDA Info: {}\nExtracted Details: {}",
        serde_json::Value::Object(drug_info.clone()),
        serde_json::Value::Object(extracted.clone())
    )
}
