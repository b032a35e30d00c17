use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MedicalField;

/// One per user. Created lazily by the first profile update or history append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalProfile {
    pub user_id: String,
    pub email: String,
    pub allergy: MedicalField,
    pub chronic_condition: MedicalField,
    pub current_medication: MedicalField,
    /// History entry ids in append order.
    pub history: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MedicalProfile {
    pub fn new(user_id: String, email: String) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            email,
            allergy: MedicalField::default(),
            chronic_condition: MedicalField::default(),
            current_medication: MedicalField::default(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial profile update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub allergy: Option<MedicalField>,
    #[serde(default)]
    pub chronic_condition: Option<MedicalField>,
    #[serde(default)]
    pub current_medication: Option<MedicalField>,
}
