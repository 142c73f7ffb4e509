//! Locating a Chrome or Chromium executable to launch.

use std::path::PathBuf;

/// Environment variable that overrides executable discovery.
pub const CHROME_ENV: &str = "BOARDMOVE_CHROME";

const BINARY_NAMES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Where a browser executable was found, or every place that was tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromeLocation {
    pub path: Option<PathBuf>,
    /// How the executable was found.
    pub source: Option<&'static str>,
    pub checked: Vec<PathBuf>,
}

impl ChromeLocation {
    pub fn found(&self) -> bool {
        self.path.is_some()
    }

    /// Human-readable explanation of a failed lookup.
    pub fn describe_failure(&self) -> String {
        let mut message = format!(
            "No Chrome or Chromium executable found ({} locations checked).",
            self.checked.len()
        );
        for path in &self.checked {
            message.push_str(&format!("\n  - {}", path.display()));
        }
        message.push_str(&format!(
            "\nInstall Chrome or Chromium, set {} to its path, or attach to a running browser with --connect.",
            CHROME_ENV
        ));
        message
    }
}

/// Look for a browser: the override variable first, then `PATH`, then the
/// platform's usual install locations.
pub fn find_chrome() -> ChromeLocation {
    let mut checked = Vec::new();

    if let Some(path) = std::env::var_os(CHROME_ENV).map(PathBuf::from) {
        checked.push(path.clone());
        if path.exists() {
            return located(path, "environment", checked);
        }
    }

    for name in BINARY_NAMES {
        if let Ok(path) = which::which(name) {
            checked.push(path.clone());
            return located(path, "PATH", checked);
        }
    }

    for path in install_locations() {
        checked.push(path.clone());
        if path.exists() {
            return located(path, "install location", checked);
        }
    }

    tracing::debug!("Chrome lookup failed after {} candidates", checked.len());
    ChromeLocation {
        path: None,
        source: None,
        checked,
    }
}

fn located(path: PathBuf, source: &'static str, checked: Vec<PathBuf>) -> ChromeLocation {
    tracing::debug!("Using browser at {} ({})", path.display(), source);
    ChromeLocation {
        path: Some(path),
        source: Some(source),
        checked,
    }
}

fn install_locations() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ]
        .iter()
        .map(PathBuf::from)
        .collect()
    }
    #[cfg(target_os = "linux")]
    {
        [
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
        .iter()
        .map(PathBuf::from)
        .collect()
    }
    #[cfg(target_os = "windows")]
    {
        let roots = ["ProgramFiles", "ProgramFiles(x86)", "LOCALAPPDATA"];
        roots
            .iter()
            .filter_map(|var| std::env::var_os(var).map(PathBuf::from))
            .map(|root| root.join("Google\\Chrome\\Application\\chrome.exe"))
            .collect()
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_consistent() {
        let location = find_chrome();
        assert_eq!(location.found(), location.source.is_some());
        if let Some(path) = &location.path {
            assert!(location.checked.contains(path));
        }
    }

    #[test]
    fn test_failure_lists_checked_paths() {
        let location = ChromeLocation {
            path: None,
            source: None,
            checked: vec![PathBuf::from("/nowhere/chrome")],
        };
        let message = location.describe_failure();
        assert!(message.contains("1 locations checked"));
        assert!(message.contains("/nowhere/chrome"));
        assert!(message.contains(CHROME_ENV));
    }

    #[cfg(any(target_os = "macos", target_os = "linux"))]
    #[test]
    fn test_install_locations_known() {
        assert!(!install_locations().is_empty());
    }
}
