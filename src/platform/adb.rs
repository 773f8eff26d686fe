//! Device collaborators reached through the `adb` command-line tool.
//!
//! `adb shell` runs with the shell uid, so input injection is always
//! available. There is no accessibility bridge over adb; structural
//! perception needs an on-device bridge.

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::DeviceConfig;
use crate::errors::{DroidClawError, DroidClawResult};
use crate::platform::{
    AppCatalog, AppEntry, CaptureMode, ImageRef, LaunchEntry, ScreenCapturer, ShellBridge,
};

#[derive(Debug, Clone)]
pub struct AdbDevice {
    adb_path: String,
    serial: Option<String>,
}

impl AdbDevice {
    pub fn new(adb_path: impl Into<String>, serial: Option<String>) -> Self {
        Self { adb_path: adb_path.into(), serial }
    }

    pub fn from_config(cfg: &DeviceConfig) -> Self {
        Self::new(cfg.adb_path.clone(), cfg.serial.clone())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.adb_path);
        if let Some(serial) = &self.serial {
            cmd.args(["-s", serial]);
        }
        cmd
    }

    async fn run(&self, args: &[&str]) -> DroidClawResult<Vec<u8>> {
        let output = self
            .command()
            .args(args)
            .output()
            .await
            .map_err(|e| DroidClawError::Platform(format!("failed to spawn {}: {e}", self.adb_path)))?;

        if !output.status.success() {
            return Err(DroidClawError::Platform(format!(
                "adb {} exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl ShellBridge for AdbDevice {
    async fn is_elevated(&self) -> bool {
        true
    }

    async fn exec(&self, command: &str) -> DroidClawResult<String> {
        tracing::debug!(command, "adb shell");
        let out = self.run(&["shell", command]).await?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

#[async_trait]
impl ScreenCapturer for AdbDevice {
    async fn capture(&self, _mode: CaptureMode) -> DroidClawResult<ImageRef> {
        let png = self.run(&["exec-out", "screencap", "-p"]).await?;
        if png.is_empty() {
            return Err(DroidClawError::Perception("screencap returned no data".into()));
        }
        Ok(ImageRef::Memory(png))
    }
}

#[async_trait]
impl AppCatalog for AdbDevice {
    /// Packages with a launcher activity; every package when the query
    /// is unsupported.
    async fn installed_apps(&self) -> DroidClawResult<Vec<AppEntry>> {
        let launchers = self
            .exec("cmd package query-activities --brief -a android.intent.action.MAIN -c android.intent.category.LAUNCHER")
            .await?;
        let apps = parse_launcher_activities(&launchers);
        if !apps.is_empty() {
            return Ok(apps);
        }
        let listing = self.exec("pm list packages").await?;
        Ok(parse_package_list(&listing))
    }

    async fn launch_entry(&self, package: &str) -> DroidClawResult<Option<LaunchEntry>> {
        let out = self
            .exec(&format!(
                "cmd package resolve-activity --brief -c android.intent.category.LAUNCHER {package}"
            ))
            .await?;
        Ok(parse_resolved_activity(package, &out))
    }

    async fn launch(&self, entry: &LaunchEntry) -> DroidClawResult<()> {
        let out = self
            .exec(&format!("am start -W -n {} -f 0x10000000", entry.component))
            .await?;
        if out.contains("Error") {
            return Err(DroidClawError::Platform(out.trim().to_string()));
        }
        Ok(())
    }
}

/// `pm list packages` prints `package:<name>` per line. adb exposes no
/// labels, so the package name doubles as the label.
fn parse_package_list(listing: &str) -> Vec<AppEntry> {
    listing
        .lines()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .filter(|pkg| !pkg.is_empty())
        .map(|pkg| AppEntry { label: pkg.to_string(), package: pkg.to_string() })
        .collect()
}

fn parse_launcher_activities(out: &str) -> Vec<AppEntry> {
    let mut apps: Vec<AppEntry> = Vec::new();
    for component in out.lines().map(str::trim).filter(|l| l.contains('/') && !l.contains(' ')) {
        let Some((pkg, _)) = component.split_once('/') else { continue };
        if !pkg.is_empty() && !apps.iter().any(|a| a.package == pkg) {
            apps.push(AppEntry { label: pkg.to_string(), package: pkg.to_string() });
        }
    }
    apps
}

fn parse_resolved_activity(package: &str, out: &str) -> Option<LaunchEntry> {
    out.lines()
        .rev()
        .map(str::trim)
        .find(|line| line.contains('/') && !line.contains(' '))
        .map(|component| LaunchEntry {
            package: package.to_string(),
            component: component.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_listing_is_parsed() {
        let apps = parse_package_list("package:com.android.settings\npackage:com.tencent.mm\r\n\nnoise\n");
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[1].package, "com.tencent.mm");
        assert_eq!(apps[1].label, "com.tencent.mm");
    }

    #[test]
    fn launcher_query_keeps_one_entry_per_package() {
        let out = "3 activities found:\n\
                   priority=0 preferredOrder=0 match=0x108000 specificIndex=-1 isDefault=false\n\
                   com.android.settings/.Settings\n\
                   com.android.settings/.SubSettings\n\
                   com.tencent.mm/.ui.LauncherUI\n";
        let apps = parse_launcher_activities(out);
        let packages: Vec<&str> = apps.iter().map(|a| a.package.as_str()).collect();
        assert_eq!(packages, vec!["com.android.settings", "com.tencent.mm"]);
        assert!(parse_launcher_activities("Error: unknown command").is_empty());
    }

    #[test]
    fn resolve_activity_picks_component_line() {
        let out = "priority=0 preferredOrder=0 match=0x108000 specificIndex=-1 isDefault=true\n\
                   com.android.settings/.Settings\n";
        let entry = parse_resolved_activity("com.android.settings", out).unwrap();
        assert_eq!(entry.component, "com.android.settings/.Settings");

        assert!(parse_resolved_activity("com.x", "No activity found\n").is_none());
    }
}
