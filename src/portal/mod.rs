//! Browser automation against the case-status portal.
//!
//! [`PortalDriver`] owns the per-search state machine and talks to the site
//! only through the [`PortalSession`] capability, so the retry and teardown
//! rules can be exercised without Chrome. [`ChromiumLauncher`] provides the
//! real sessions.

mod browser;
mod driver;
mod session;
mod site;

pub use browser::{BrowserSettings, ChromiumLauncher};
#[cfg(feature = "browser")]
pub use browser::ChromiumSession;
pub use driver::{DriverPolicy, PortalDriver};
pub use session::{DriverError, PortalSession, SessionLauncher};
pub use site::{SiteProfile, DEFAULT_BASE_URL, DEFAULT_CASE_STATUS_URL};
