//! The per-search state machine.
//!
//! ```text
//! launch ─▶ NavigateForm ─▶ FillForm ─▶ Captcha{1} ─▶ ... ─▶ Captcha{N}
//!                                          │                    │
//!                                          ▼                    ▼
//!                                     ParseSuccess       AttemptsExhausted
//!                                          │                    │
//!                                          └──────▶ Done ◀──────┘ ─▶ close
//! ```
//!
//! Every state has exactly one way out. Attempt-local failures (unreadable
//! CAPTCHA, rejected answer, no response before the submit timeout) move to
//! the next `Captcha` state after reloading the image. Structural failures
//! go straight to `Done`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::session::{DriverError, PortalSession, SessionLauncher};
use crate::extract::{ExtractError, PageSignal, ResponseExtractor};
use crate::models::{CaptchaAttempt, CaseQuery, SearchOutcome};
use crate::ocr::CaptchaSolver;

/// Bounds on a single search call.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverPolicy {
    pub max_attempts: u32,
    /// How long to wait for the portal to answer a submission.
    pub submit_timeout: Duration,
    /// Pause after requesting a new CAPTCHA so the image can load.
    pub reload_delay: Duration,
    pub poll_interval: Duration,
    /// Hard limit on the whole call, teardown included.
    pub deadline: Duration,
}

impl Default for DriverPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            submit_timeout: Duration::from_secs(10),
            reload_delay: Duration::from_millis(1500),
            poll_interval: Duration::from_millis(250),
            deadline: Duration::from_secs(30 + 10 * 3 + 30),
        }
    }
}

enum State {
    NavigateForm,
    FillForm,
    Captcha { attempt: u32 },
    ParseSuccess { html: String },
    AttemptsExhausted,
    Done(SearchOutcome),
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::NavigateForm => "navigate_form",
            State::FillForm => "fill_form",
            State::Captcha { .. } => "captcha",
            State::ParseSuccess { .. } => "parse_success",
            State::AttemptsExhausted => "attempts_exhausted",
            State::Done(_) => "done",
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

fn driver_failure(err: DriverError) -> SearchOutcome {
    if err.is_retryable() {
        SearchOutcome::transient(err.to_string())
    } else {
        SearchOutcome::fatal(err.to_string())
    }
}

/// Drives one browser session per search through the portal form.
pub struct PortalDriver {
    launcher: Arc<dyn SessionLauncher>,
    solver: Arc<dyn CaptchaSolver>,
    extractor: ResponseExtractor,
    policy: DriverPolicy,
}

impl PortalDriver {
    pub fn new(
        launcher: Arc<dyn SessionLauncher>,
        solver: Arc<dyn CaptchaSolver>,
        extractor: ResponseExtractor,
        policy: DriverPolicy,
    ) -> Self {
        Self {
            launcher,
            solver,
            extractor,
            policy,
        }
    }

    pub fn policy(&self) -> &DriverPolicy {
        &self.policy
    }

    /// Run one search end to end.
    ///
    /// A session that was launched is closed exactly once, whichever state
    /// the search ends in, even when the deadline fires or a step panics.
    pub async fn run(&self, query: &CaseQuery) -> SearchOutcome {
        let search_id = Uuid::new_v4();
        let span = info_span!(
            "search",
            %search_id,
            case_type = %query.case_type().site_label(),
            case_number = %query.case_number(),
            filing_year = %query.filing_year(),
        );

        async move {
            let started = Instant::now();
            let mut session = match self.launcher.launch().await {
                Ok(session) => session,
                Err(e) => {
                    warn!("Browser launch failed: {}", e);
                    return driver_failure(e);
                }
            };

            let drive = AssertUnwindSafe(self.drive(session.as_mut(), query)).catch_unwind();
            let outcome = match tokio::time::timeout(self.policy.deadline, drive).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(payload)) => {
                    let message = panic_message(payload.as_ref());
                    error!("Search aborted by panic: {}", message);
                    SearchOutcome::fatal(format!("Search aborted: {}", message))
                }
                Err(_) => {
                    warn!("Search deadline of {:?} exceeded", self.policy.deadline);
                    SearchOutcome::transient(format!(
                        "Search did not finish within {} seconds",
                        self.policy.deadline.as_secs()
                    ))
                }
            };

            session.close().await;
            info!(
                outcome = outcome.kind(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Search finished"
            );
            outcome
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, session: &mut dyn PortalSession, query: &CaseQuery) -> SearchOutcome {
        let max = self.policy.max_attempts;
        let mut state = State::NavigateForm;

        loop {
            debug!(state = state.name(), "Driver state");
            state = match state {
                State::NavigateForm => match session.open_form().await {
                    Ok(()) => State::FillForm,
                    Err(e) => State::Done(driver_failure(e)),
                },
                State::FillForm => match session.fill_form(query).await {
                    Ok(()) => State::Captcha { attempt: 1 },
                    Err(e) => State::Done(driver_failure(e)),
                },
                State::Captcha { attempt } if attempt > max => State::AttemptsExhausted,
                State::Captcha { attempt } => self.captcha_attempt(session, attempt).await,
                State::ParseSuccess { html } => match self.extractor.extract(&html, query) {
                    Ok(record) => State::Done(SearchOutcome::Success(record)),
                    Err(ExtractError::NotFound(reason)) => {
                        State::Done(SearchOutcome::not_found(reason))
                    }
                    Err(e) => State::Done(SearchOutcome::fatal(e.to_string())),
                },
                State::AttemptsExhausted => State::Done(SearchOutcome::transient(format!(
                    "CAPTCHA not solved after {} attempts",
                    max
                ))),
                State::Done(outcome) => return outcome,
            };
        }
    }

    async fn captcha_attempt(&self, session: &mut dyn PortalSession, attempt: u32) -> State {
        let image = match session.captcha_image().await {
            Ok(image) => image,
            Err(e) => return State::Done(driver_failure(e)),
        };

        let solver = Arc::clone(&self.solver);
        let solved = tokio::task::spawn_blocking(move || {
            let mut captcha = CaptchaAttempt::new(image);
            let result = solver.solve(&captcha.image_bytes);
            if let Ok(answer) = &result {
                captcha.ocr_text = Some(answer.clone());
            }
            (captcha, result)
        })
        .await;

        let (mut captcha, answer) = match solved {
            Ok((captcha, Ok(answer))) => (captcha, answer),
            Ok((_, Err(e))) if e.is_fatal() => {
                warn!("CAPTCHA solver unusable: {}", e);
                return State::Done(SearchOutcome::fatal(e.to_string()));
            }
            Ok((_, Err(e))) => {
                debug!(attempt, "CAPTCHA unreadable: {}", e);
                return self.next_captcha(session, attempt).await;
            }
            Err(e) => {
                return State::Done(SearchOutcome::fatal(format!(
                    "CAPTCHA solver panicked: {}",
                    e
                )))
            }
        };

        debug!(attempt, answer = %answer, "Submitting CAPTCHA answer");
        let (signal, html) = match self.submit_answer(session, &answer).await {
            Ok(response) => response,
            Err(e) => return State::Done(driver_failure(e)),
        };

        captcha.accepted = matches!(signal, PageSignal::Results | PageSignal::NoRecord);
        debug!(
            attempt,
            answer = captcha.ocr_text.as_deref().unwrap_or_default(),
            accepted = captcha.accepted,
            ?signal,
            "Portal answered"
        );

        match signal {
            PageSignal::Results => State::ParseSuccess { html },
            PageSignal::NoRecord => {
                info!("Portal reports no matching case");
                State::Done(SearchOutcome::not_found("No record found on the portal"))
            }
            PageSignal::Rejected | PageSignal::Pending => self.next_captcha(session, attempt).await,
        }
    }

    async fn next_captcha(&self, session: &mut dyn PortalSession, attempt: u32) -> State {
        if attempt >= self.policy.max_attempts {
            return State::Captcha {
                attempt: attempt + 1,
            };
        }
        if let Err(e) = session.reload_captcha().await {
            return State::Done(driver_failure(e));
        }
        tokio::time::sleep(self.policy.reload_delay).await;
        State::Captcha {
            attempt: attempt + 1,
        }
    }

    async fn submit_answer(
        &self,
        session: &mut dyn PortalSession,
        answer: &str,
    ) -> Result<(PageSignal, String), DriverError> {
        let before = session.page_content().await?;
        session.submit(answer).await?;
        self.await_response(session, &before).await
    }

    /// Poll until the page changes into something conclusive or the submit
    /// timeout passes. Only a page that differs from `before` is ever
    /// classified; a timeout is always `Pending`.
    async fn await_response(
        &self,
        session: &mut dyn PortalSession,
        before: &str,
    ) -> Result<(PageSignal, String), DriverError> {
        let give_up = Instant::now() + self.policy.submit_timeout;
        loop {
            let html = session.page_content().await?;
            if html != before {
                let signal = self.extractor.classify(&html);
                if signal != PageSignal::Pending {
                    return Ok((signal, html));
                }
            }
            if Instant::now() >= give_up {
                debug!(changed = (html != before), "No response before submit timeout");
                return Ok((PageSignal::Pending, html));
            }
            tokio::time::sleep(self.policy.poll_interval).await;
        }
    }
}
