//! Debounced live preview of a single page.
//!
//! Editors send a [`PreviewRequest`] on every keystroke; the session waits
//! until input has been quiet for the debounce window, renders only the most
//! recent request, and publishes the result as a [`PreviewFrame`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use reportgen_core::BrandProfile;
use reportgen_renderer::{PageId, ReportContext, Renderer, TemplateId, Theme};

use crate::error::PreviewError;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// What the editor currently shows.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewRequest {
    pub theme: Theme,
    pub page: PageId,
    pub brand: BrandProfile,
}

/// One published render. `revision` counts renders, starting at 1; the
/// initial frame before any render has revision 0 and an empty body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreviewFrame {
    pub revision: u64,
    pub template: Option<TemplateId>,
    pub body: String,
    /// Render failure for this revision; `body` keeps the last good render.
    pub error: Option<String>,
}

pub struct PreviewSession {
    updates: mpsc::Sender<PreviewRequest>,
    frames: watch::Receiver<PreviewFrame>,
}

impl PreviewSession {
    /// Start a session rendering against `context` (sample or real metrics).
    pub fn spawn(renderer: Arc<Renderer>, context: ReportContext, debounce: Duration) -> Self {
        let (updates, updates_rx) = mpsc::channel(64);
        let (frames_tx, frames) = watch::channel(PreviewFrame::default());
        tokio::spawn(run(renderer, context, debounce, updates_rx, frames_tx));
        Self { updates, frames }
    }

    /// Queue an edit. Only the last edit inside a debounce window renders.
    pub async fn update(&self, request: PreviewRequest) -> Result<(), PreviewError> {
        self.updates
            .send(request)
            .await
            .map_err(|_| PreviewError::Closed)
    }

    pub fn subscribe(&self) -> watch::Receiver<PreviewFrame> {
        self.frames.clone()
    }

    pub fn latest(&self) -> PreviewFrame {
        self.frames.borrow().clone()
    }

    /// Stop the session; edits still waiting for the window are dropped.
    ///
    /// Equivalent to dropping the session: the update channel closes and the
    /// worker exits. This only spells the intent out at call sites.
    pub fn close(self) {}
}

async fn run(
    renderer: Arc<Renderer>,
    context: ReportContext,
    debounce: Duration,
    mut updates: mpsc::Receiver<PreviewRequest>,
    frames: watch::Sender<PreviewFrame>,
) {
    let mut pending: Option<PreviewRequest> = None;
    let deadline = tokio::time::sleep(debounce);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(request) => {
                    pending = Some(request);
                    deadline.as_mut().reset(Instant::now() + debounce);
                }
                None => break,
            },
            _ = &mut deadline, if pending.is_some() => {
                if let Some(request) = pending.take() {
                    publish(&renderer, &context, request, &frames);
                }
            }
        }
    }
    tracing::debug!("preview session closed");
}

fn publish(
    renderer: &Renderer,
    context: &ReportContext,
    request: PreviewRequest,
    frames: &watch::Sender<PreviewFrame>,
) {
    let template = TemplateId::new(request.theme, request.page);
    let rendered = renderer.render_page(context, &request.brand, request.theme, request.page);
    frames.send_modify(|frame| {
        frame.revision += 1;
        frame.template = Some(template);
        match rendered {
            Ok(page) => {
                frame.body = page.body;
                frame.error = None;
            }
            Err(err) => {
                tracing::debug!(template = %template, error = %err, "preview render failed");
                frame.error = Some(err.to_string());
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use reportgen_core::{GenerationRequest, GenerationResult, GeoScope, Metrics, ReportKind};
    use reportgen_renderer::BrandDefaults;

    fn session() -> PreviewSession {
        let renderer = Arc::new(Renderer::new(BrandDefaults::default()).expect("renderer"));
        let request = GenerationRequest::new(ReportKind::MarketSnapshot, GeoScope::area("Austin"));
        let result = GenerationResult {
            metrics: Metrics::default(),
            artifacts: vec![],
            generated_at: Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap(),
        };
        PreviewSession::spawn(
            renderer,
            ReportContext::new(&request, &result),
            DEFAULT_DEBOUNCE,
        )
    }

    fn named(name: &str) -> PreviewRequest {
        PreviewRequest {
            theme: Theme::Modern,
            page: PageId::Cover,
            brand: BrandProfile {
                display_name: Some(name.to_string()),
                ..BrandProfile::default()
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_renders_once_with_the_last_one() {
        let session = session();
        let mut frames = session.subscribe();

        for name in ["A", "Ac", "Acm", "Acme Homes"] {
            session.update(named(name)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(session.latest().revision, 0);

        frames.changed().await.unwrap();
        let frame = frames.borrow_and_update().clone();
        assert_eq!(frame.revision, 1);
        assert_eq!(
            frame.template,
            Some(TemplateId::new(Theme::Modern, PageId::Cover))
        );
        assert!(frame.body.contains("Acme Homes"));
        assert!(frame.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unsupported_page_keeps_previous_body() {
        let session = session();
        let mut frames = session.subscribe();

        session.update(named("Acme Homes")).await.unwrap();
        frames.changed().await.unwrap();
        let good = frames.borrow_and_update().body.clone();

        let mut bad = named("Acme Homes");
        bad.theme = Theme::Social;
        session.update(bad).await.unwrap();
        frames.changed().await.unwrap();
        let frame = frames.borrow_and_update().clone();
        assert_eq!(frame.revision, 2);
        assert_eq!(frame.body, good);
        assert!(frame.error.is_some());
    }

    #[tokio::test]
    async fn close_ends_the_frame_stream() {
        let session = session();
        let mut frames = session.subscribe();
        session.close();
        assert!(frames.changed().await.is_err());
    }
}
