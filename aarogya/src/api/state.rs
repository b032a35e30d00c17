use std::sync::Arc;

use crate::analysis::AnalysisService;
use crate::auth::AuthService;
use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::drugs::DrugLookup;
use crate::llm::{LlmProvider, VisionModel};
use crate::processing::PdfRasterizer;
use crate::services::HistoryLedger;
use crate::storage::ImageStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    /// Reported by `/health`. Analysis goes through `analysis`, which may
    /// hold a different model handle.
    pub llm: LlmProvider,
    pub auth: AuthService,
    pub analysis: AnalysisService,
    pub history: HistoryLedger,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        db: Arc<dyn DatabaseBackend>,
        llm: LlmProvider,
        model: Arc<dyn VisionModel>,
        drugs: Arc<dyn DrugLookup>,
        images: Arc<dyn ImageStore>,
        rasterizer: Arc<dyn PdfRasterizer>,
    ) -> Self {
        let config = Arc::new(config);
        let auth = AuthService::new(db.clone(), &config.auth);
        let analysis = AnalysisService::new(db.clone(), model, drugs, images, rasterizer);
        let history = HistoryLedger::new(db.clone());

        Self {
            config,
            db,
            llm,
            auth,
            analysis,
            history,
        }
    }
}
