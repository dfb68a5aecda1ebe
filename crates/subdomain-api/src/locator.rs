use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, instrument, warn};

const PIP_PACKAGE: &str = "sublist3r";
const TOOL_ENTRYPOINT: &str = "sublist3r.py";

/// Query pip metadata for the Sublist3r install location and derive the
/// script path from it. Runs once at startup, the result is injected into
/// the runner. `None` when pip is unusable or the package is not installed,
/// the runner reports the missing dependency on the first request.
#[instrument(name = "locate_tool", level = "info")]
pub async fn locate_tool() -> Option<PathBuf> {
    let output = match Command::new("pip").args(["show", PIP_PACKAGE]).output().await {
        Ok(output) => output,
        Err(err) => {
            warn!("{:12} - pip not runnable: {}", "LOCATOR", err);
            return None;
        }
    };

    if !output.status.success() {
        warn!(
            "{:12} - pip show {} exited with {}",
            "LOCATOR", PIP_PACKAGE, output.status
        );
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    match script_path(&stdout) {
        Some(path) => {
            info!("{:12} - Sublist3r found at: {}", "LOCATOR", path.display());
            Some(path)
        }
        None => {
            warn!("{:12} - no Location line in pip metadata", "LOCATOR");
            None
        }
    }
}

/// Pure extraction of the script path from `pip show` output.
fn script_path(pip_stdout: &str) -> Option<PathBuf> {
    pip_stdout.lines().find_map(|line| {
        line.strip_prefix("Location:")
            .map(|location| Path::new(location.trim()).join(TOOL_ENTRYPOINT))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_path_from_pip_metadata() {
        let stdout = "Name: Sublist3r\nVersion: 1.1\nLocation: /usr/lib/python3/site-packages\nRequires: requests\n";

        assert_eq!(
            script_path(stdout),
            Some(PathBuf::from("/usr/lib/python3/site-packages/sublist3r.py"))
        );
    }

    #[test]
    fn no_location_line_yields_none() {
        let stdout = "Name: Sublist3r\nVersion: 1.1\n";

        assert_eq!(script_path(stdout), None);
    }
}
