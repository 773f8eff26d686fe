use std::sync::OnceLock;

use regex::Regex;

use crate::executor::{ActionExecutor, ActionOutcome};
use crate::platform::AppEntry;

static PACKAGE_IN_PARENS: OnceLock<Regex> = OnceLock::new();

/// Package name embedded as `Label (com.example.app)`; full-width
/// parentheses are accepted too.
pub fn extract_package(name: &str) -> Option<&str> {
    let re = PACKAGE_IN_PARENS
        .get_or_init(|| Regex::new(r"[(（]([a-zA-Z0-9_.]+)[)）]").expect("static regex compiles"));
    re.captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|pkg| pkg.contains('.'))
}

/// Case-insensitive label lookup: an exact label wins over a substring hit.
pub fn find_by_label<'a>(apps: &'a [AppEntry], name: &str) -> Option<&'a AppEntry> {
    let wanted = name.to_lowercase();
    apps.iter()
        .find(|a| a.label.to_lowercase() == wanted)
        .or_else(|| apps.iter().find(|a| a.label.to_lowercase().contains(&wanted)))
}

impl ActionExecutor {
    pub async fn launch_app(&self, app_name: &str) -> ActionOutcome {
        let name = app_name.trim();
        if name.is_empty() {
            return ActionOutcome::error("launch_app needs an app name or package");
        }
        let Some(catalog) = self.handles.apps.as_ref() else {
            return ActionOutcome::error("app catalog unavailable on this device");
        };

        let mut package = extract_package(name).unwrap_or(name).to_string();
        if !package.contains('.') {
            let apps = match catalog.installed_apps().await {
                Ok(apps) => apps,
                Err(e) => return ActionOutcome::failure(format!("could not list installed apps: {e}")),
            };
            match find_by_label(&apps, &package) {
                Some(app) => package = app.package.clone(),
                None => {
                    return ActionOutcome::failure(format!("no installed app matches '{name}' (not found)."))
                }
            }
        }

        let entry = match catalog.launch_entry(&package).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                return ActionOutcome::failure(format!("{package} has no launch entry."));
            }
            Err(e) => return ActionOutcome::failure(format!("could not resolve launch entry for {package}: {e}")),
        };

        tracing::info!(package = %package, component = %entry.component, "launching app");
        match catalog.launch(&entry).await {
            Ok(()) => ActionOutcome::success(format!("Launched {package}.")),
            Err(e) => ActionOutcome::failure(format!("launch of {package} failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_is_extracted_from_parentheses() {
        assert_eq!(extract_package("Settings (com.android.settings)"), Some("com.android.settings"));
        assert_eq!(extract_package("微信（com.tencent.mm）"), Some("com.tencent.mm"));
        assert_eq!(extract_package("Camera (beta)"), None);
        assert_eq!(extract_package("Camera"), None);
    }

    #[test]
    fn exact_label_beats_substring() {
        let apps = vec![
            AppEntry { label: "Settings Extras".into(), package: "com.vendor.extras".into() },
            AppEntry { label: "Settings".into(), package: "com.android.settings".into() },
        ];
        assert_eq!(find_by_label(&apps, "settings").unwrap().package, "com.android.settings");
        assert_eq!(find_by_label(&apps, "extras").unwrap().package, "com.vendor.extras");
        assert!(find_by_label(&apps, "camera").is_none());
    }
}
