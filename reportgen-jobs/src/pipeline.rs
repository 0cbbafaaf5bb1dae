//! Submit → wait → render: one report end to end.
//!
//! The brand profile is fetched while the job runs. A brand source that
//! fails never fails the report; the product defaults are used instead.

use reportgen_core::{BrandProfile, GenerationRequest, GenerationResult, JobId, Phase};
use reportgen_renderer::{PageSelection, RenderedPage, ReportContext, Renderer, Theme};

use crate::error::OrchestratorError;
use crate::orchestrator::OrchestratorHandle;
use crate::service::BrandSource;

/// Everything one finished report produced.
#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub job_id: JobId,
    pub result: GenerationResult,
    pub brand: BrandProfile,
    pub pages: Vec<RenderedPage>,
}

/// Run `request` through the orchestrator and render the selected pages of
/// `theme` from the result. The orchestrator is left in its terminal phase.
pub async fn generate_report(
    orchestrator: &OrchestratorHandle,
    brand_source: &dyn BrandSource,
    renderer: &Renderer,
    request: GenerationRequest,
    theme: Theme,
    selection: &PageSelection,
) -> Result<ReportOutput, OrchestratorError> {
    let submitted = request.clone();

    let job = async {
        let job_id = orchestrator.submit(request).await?;
        let snapshot = orchestrator.wait_terminal().await?;
        Ok::<_, OrchestratorError>((job_id, snapshot.phase))
    };
    let brand = async {
        match brand_source.brand().await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(error = %err, "brand profile unavailable; using defaults");
                BrandProfile::default()
            }
        }
    };
    let (job, brand) = tokio::join!(job, brand);
    let (job_id, phase) = job?;

    let result = match phase {
        Phase::Succeeded { result } => result,
        Phase::Failed { error } => return Err(OrchestratorError::Failed(error)),
        Phase::Cancelled => return Err(OrchestratorError::Cancelled),
        Phase::Idle | Phase::Generating { .. } => return Err(OrchestratorError::ActorGone),
    };

    let context = ReportContext::new(&submitted, &result);
    let pages = renderer.render_report(&context, &brand, theme, selection)?;
    tracing::info!(
        job_id = %job_id,
        theme = theme.name(),
        pages = pages.len(),
        "report rendered"
    );
    Ok(ReportOutput {
        job_id,
        result,
        brand,
        pages,
    })
}
