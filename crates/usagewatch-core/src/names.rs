//! Display names for application ids.

use std::collections::HashMap;

use crate::error::NameResolutionError;

/// Looks up a human-readable name for an application id
pub trait NameResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns `NameResolutionError::Unresolvable` when no name is known.
    fn resolve_display_name(&self, application_id: &str) -> Result<String, NameResolutionError>;
}

/// Well known package identifiers and their store names
const BUILTIN_NAMES: &[(&str, &str)] = &[
    ("com.ss.android.ugc.trill", "TikTok"),
    ("com.twitter.android", "Twitter"),
    ("com.whatsapp", "WhatsApp"),
    ("com.instagram.android", "Instagram"),
    ("com.miui.home", "System launcher"),
    ("com.android.chrome", "Chrome"),
    ("com.google.android.apps.docs.editors.sheets", "Google Sheets"),
    ("com.google.android.apps.tachyon", "Google Meet"),
    ("com.miui.securitycenter", "Security"),
    ("com.google.android.youtube", "YouTube"),
    ("com.android.vending", "Google Play Store"),
    ("com.miui.gallery", "Gallery"),
    ("com.facebook.katana", "Facebook"),
    ("org.telegram.messenger", "Telegram"),
    ("com.google.android.packageinstaller", "Package Installer"),
    ("com.google.android.apps.wellbeing", "Digital Wellbeing"),
    ("com.google.android.permissioncontroller", "Permission Controller"),
    ("com.miui.cleaner", "Cleaner"),
    ("com.xiaomi.account", "Xiaomi Account"),
    ("com.mi.android.globalFileexplorer", "File Manager"),
    ("com.android.systemui", "System UI"),
    ("com.miui.aod", "Always-on display"),
];

/// Resolver backed by the built-in catalog plus user overrides
pub struct CatalogNameResolver {
    names: HashMap<String, String>,
}

impl CatalogNameResolver {
    /// Built-in catalog, with `overrides` taking precedence
    #[must_use]
    pub fn new(overrides: &HashMap<String, String>) -> Self {
        let mut names: HashMap<String, String> = BUILTIN_NAMES
            .iter()
            .map(|(id, name)| ((*id).to_string(), (*name).to_string()))
            .collect();

        for (id, name) in overrides {
            let name = name.trim();
            if !name.is_empty() {
                names.insert(id.clone(), name.to_string());
            }
        }

        Self { names }
    }
}

impl Default for CatalogNameResolver {
    fn default() -> Self {
        Self::new(&HashMap::new())
    }
}

impl NameResolver for CatalogNameResolver {
    fn resolve_display_name(&self, application_id: &str) -> Result<String, NameResolutionError> {
        self.names
            .get(application_id)
            .cloned()
            .ok_or_else(|| NameResolutionError::Unresolvable(application_id.to_string()))
    }
}
