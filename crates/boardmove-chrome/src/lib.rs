//! Drives the real destination board in Chrome over the DevTools protocol.

pub mod detect;
mod prelude;
pub mod selectors;
pub mod session;
pub mod surface;

pub use detect::{find_chrome, ChromeLocation, CHROME_ENV};
pub use selectors::SelectorProfile;
pub use session::{BrowserSession, BrowserTarget, LaunchOptions};
pub use surface::ChromeSurface;
