use std::sync::Arc;

use crate::db::DatabaseBackend;
use crate::error::Result;
use crate::models::MedicalProfile;

pub const NO_HISTORY: &str = "Patient has no known medical history.";

/// The patient summary handed to risk assessment, and nothing else from the profile.
///
/// Non-empty fields only, in a fixed order, joined by `". "`.
pub fn patient_context(profile: Option<&MedicalProfile>) -> String {
    let Some(profile) = profile else {
        return NO_HISTORY.to_string();
    };

    let parts: Vec<String> = [
        ("Allergies", &profile.allergy),
        ("Chronic Conditions", &profile.chronic_condition),
        ("Current Medications", &profile.current_medication),
    ]
    .into_iter()
    .filter(|(_, field)| !field.is_empty())
    .map(|(label, field)| format!("{label}: {}", field.joined()))
    .collect();

    if parts.is_empty() {
        NO_HISTORY.to_string()
    } else {
        parts.join(". ")
    }
}

pub struct ContextBuilder {
    db: Arc<dyn DatabaseBackend>,
}

impl ContextBuilder {
    pub fn new(db: Arc<dyn DatabaseBackend>) -> Self {
        Self { db }
    }

    pub async fn for_user(&self, user_id: &str) -> Result<String> {
        let profile = self.db.get_profile(user_id).await?;
        Ok(patient_context(profile.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::{Database, LibSqlBackend};
    use crate::models::{MedicalField, UpdateProfileRequest};
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    fn profile() -> MedicalProfile {
        MedicalProfile::new("u1".to_string(), "a@b.c".to_string())
    }

    #[test]
    fn test_no_profile() {
        assert_eq!(patient_context(None), NO_HISTORY);
    }

    #[test]
    fn test_all_fields_empty() {
        assert_eq!(patient_context(Some(&profile())), NO_HISTORY);
    }

    #[test]
    fn test_only_allergy() {
        let mut p = profile();
        p.allergy = MedicalField::from_text("penicillin");
        assert_eq!(patient_context(Some(&p)), "Allergies: penicillin");
    }

    #[test]
    fn test_fixed_order_and_list_join() {
        let mut p = profile();
        p.current_medication = MedicalField::from_items(["metformin", "lisinopril"]);
        p.allergy = MedicalField::from_text("penicillin");
        p.chronic_condition = MedicalField::from_items(["diabetes"]);

        assert_eq!(
            patient_context(Some(&p)),
            "Allergies: penicillin. Chronic Conditions: diabetes. \
             Current Medications: metformin, lisinopril"
        );
    }

    #[tokio::test]
    async fn test_for_user_reads_stored_profile() {
        let temp_file = NamedTempFile::new().unwrap();
        let config = DatabaseConfig {
            url: format!("file:{}", temp_file.path().display()),
            auth_token: None,
            local_path: None,
        };
        let db: Arc<dyn DatabaseBackend> =
            Arc::new(LibSqlBackend::new(Database::new(&config).await.unwrap()));
        let builder = ContextBuilder::new(db.clone());

        assert_eq!(builder.for_user("u1").await.unwrap(), NO_HISTORY);

        let update = UpdateProfileRequest {
            chronic_condition: Some(MedicalField::from_text("asthma")),
            ..Default::default()
        };
        db.upsert_profile_fields("u1", "a@b.c", &update)
            .await
            .unwrap();

        assert_eq!(
            builder.for_user("u1").await.unwrap(),
            "Chronic Conditions: asthma"
        );
    }
}
