use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::context::ContextBuilder;
use super::extract::{extract_json_object, is_sentinel};
use super::normalize::{conforms, normalize, RecordSchema};
use crate::db::DatabaseBackend;
use crate::drugs::DrugLookup;
use crate::error::Result;
use crate::llm::{prompts, ChatMessage, ContentBlock, VisionModel};
use crate::models::{
    AnalysisOutcome, EntryKind, Record, Upload, User, NOT_A_PDF, UNDECODABLE_IMAGE,
    UNPROCESSABLE_PDF, UNREADABLE_IMAGE,
};
use crate::processing::{self, PdfRasterizer};
use crate::services::HistoryLedger;
use crate::storage::ImageStore;

const PDF_CONTENT_TYPE: &str = "application/pdf";
const UNKNOWN_DRUG: &str = "Unknown";

/// Runs uploads through the vision model and records what comes out.
///
/// Expected failures (unreadable image, wrong file type, broken PDF) are
/// returned as failure outcomes. Errors are reserved for infrastructure:
/// the database and image storage.
#[derive(Clone)]
pub struct AnalysisService {
    model: Arc<dyn VisionModel>,
    drugs: Arc<dyn DrugLookup>,
    images: Arc<dyn ImageStore>,
    rasterizer: Arc<dyn PdfRasterizer>,
    context: Arc<ContextBuilder>,
    ledger: HistoryLedger,
}

impl AnalysisService {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        model: Arc<dyn VisionModel>,
        drugs: Arc<dyn DrugLookup>,
        images: Arc<dyn ImageStore>,
        rasterizer: Arc<dyn PdfRasterizer>,
    ) -> Self {
        Self {
            model,
            drugs,
            images,
            rasterizer,
            context: Arc::new(ContextBuilder::new(db.clone())),
            ledger: HistoryLedger::new(db),
        }
    }

    /// Identify a medicine, then assess it against the user's medical profile.
    ///
    /// The caller sees the stage-A record overlaid with the risk assessment;
    /// the history keeps only the risk assessment.
    pub async fn analyze_medicine(&self, user: &User, upload: Upload) -> Result<AnalysisOutcome> {
        let Some(model_image) = model_image(&upload.bytes) else {
            return Ok(AnalysisOutcome::failure(UNDECODABLE_IMAGE));
        };

        let stage_a = self
            .generate(vec![ChatMessage::user(vec![
                ContentBlock::image(model_image),
                ContentBlock::text(prompts::medicine_extraction_prompt()),
            ])])
            .await;
        let medicine = normalize(extract_json_object(&stage_a), RecordSchema::Medicine);

        let Some(drug_name) = readable_drug_name(&medicine) else {
            info!(user_id = %user.id, "Medicine not identified");
            return Ok(AnalysisOutcome::failure(UNREADABLE_IMAGE));
        };
        info!(user_id = %user.id, drug_name = %drug_name, "Medicine identified");

        let drug_info = self.drugs.lookup(&drug_name).await;
        let patient = self.context.for_user(&user.id).await?;

        let stage_b = self
            .generate(vec![ChatMessage::user(vec![
                ContentBlock::text(patient),
                ContentBlock::text(prompts::drug_details_block(&drug_info, &medicine)),
                ContentBlock::text(prompts::risk_assessment_prompt()),
            ])])
            .await;
        let assessment = extract_json_object(&stage_b);
        if is_sentinel(&assessment) {
            warn!(user_id = %user.id, drug_name = %drug_name, "Risk assessment was not parseable");
        }

        let mut merged = medicine;
        merged.extend(assessment.clone());

        let image_ref = self.images.save(&upload.file_name, &upload.bytes).await?;
        self.ledger
            .append(user, image_ref, Some(assessment), EntryKind::Med)
            .await?;

        Ok(AnalysisOutcome::success(merged))
    }

    pub async fn analyze_report_image(
        &self,
        user: &User,
        upload: Upload,
    ) -> Result<AnalysisOutcome> {
        let Some(model_image) = model_image(&upload.bytes) else {
            return Ok(AnalysisOutcome::failure(UNDECODABLE_IMAGE));
        };

        self.analyze_report(user, model_image, &upload.file_name, &upload.bytes)
            .await
    }

    /// Render every page, stack them into one tall image and read that as a report.
    pub async fn analyze_report_pdf(&self, user: &User, upload: Upload) -> Result<AnalysisOutcome> {
        if upload.content_type.as_deref() != Some(PDF_CONTENT_TYPE) {
            return Ok(AnalysisOutcome::failure(NOT_A_PDF));
        }

        let rasterizer = self.rasterizer.clone();
        let bytes = upload.bytes;
        let rendered = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
            let pages = rasterizer.rasterize(&bytes)?;
            let stitched = processing::stitch_pages(&pages)?;
            processing::image::encode_jpeg(&stitched.into())
        })
        .await;

        let jpeg = match rendered {
            Ok(Ok(jpeg)) => jpeg,
            Ok(Err(e)) => {
                warn!(user_id = %user.id, error = %e, "PDF conversion failed");
                return Ok(AnalysisOutcome::failure(UNPROCESSABLE_PDF));
            }
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "PDF conversion task aborted");
                return Ok(AnalysisOutcome::failure(UNPROCESSABLE_PDF));
            }
        };

        let file_name = jpeg_file_name(&upload.file_name);
        self.analyze_report(user, jpeg.clone(), &file_name, &jpeg)
            .await
    }

    async fn analyze_report(
        &self,
        user: &User,
        model_image: Vec<u8>,
        file_name: &str,
        stored_bytes: &[u8],
    ) -> Result<AnalysisOutcome> {
        let raw = self
            .generate(vec![ChatMessage::user(vec![
                ContentBlock::image(model_image),
                ContentBlock::text(prompts::report_analysis_prompt()),
            ])])
            .await;
        // Stored as extracted; the report schema only flags the fit.
        let report = extract_json_object(&raw);
        let fits_schema = conforms(&report, RecordSchema::Report);

        let image_ref = self.images.save(file_name, stored_bytes).await?;
        self.ledger
            .append(user, image_ref, Some(report.clone()), EntryKind::Report)
            .await?;

        info!(user_id = %user.id, fits_schema, "Report analysed");
        Ok(AnalysisOutcome::success(report))
    }

    /// Model failures read as empty output, which the extractor turns into
    /// its sentinel mapping.
    async fn generate(&self, messages: Vec<ChatMessage>) -> String {
        match self.model.generate(&messages).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Model call failed");
                String::new()
            }
        }
    }
}

/// Decoded and re-encoded as RGB JPEG, or `None` when the bytes are not an image.
fn model_image(bytes: &[u8]) -> Option<Vec<u8>> {
    match processing::image::decode(bytes).and_then(|img| processing::image::encode_jpeg(&img)) {
        Ok(jpeg) => Some(jpeg),
        Err(e) => {
            warn!(error = %e, "Upload is not a usable image");
            None
        }
    }
}

/// The stage-A drug name, unless it is missing, blank or the model's "Unknown".
fn readable_drug_name(record: &Record) -> Option<String> {
    match record.get("drug_name") {
        Some(Value::String(name)) => {
            let name = name.trim();
            (!name.is_empty() && name != UNKNOWN_DRUG).then(|| name.to_string())
        }
        _ => None,
    }
}

/// Every `.pdf` becomes `.jpg`; a `.jpg` suffix is added if none results.
fn jpeg_file_name(file_name: &str) -> String {
    let renamed = file_name.replace(".pdf", ".jpg");
    if renamed.to_ascii_lowercase().ends_with(".jpg") {
        renamed
    } else {
        format!("{renamed}.jpg")
    }
}
