use fluent_templates::fluent_bundle::FluentValue;
use fluent_templates::{Loader, static_loader};
use std::borrow::Cow;
use std::collections::HashMap;
use std::str::FromStr;
use unic_langid::LanguageIdentifier;

const FALLBACK_LANG: &str = "en";

/// Languages shipped under `locales/`.
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "uz"];

static_loader! {
    static LOCALES = {
        locales: "./locales",
        fallback_language: "en",
        customise: |bundle| bundle.set_use_isolating(false),
    };
}

fn langid(lang: &str) -> LanguageIdentifier {
    LanguageIdentifier::from_str(lang)
        .or_else(|_| LanguageIdentifier::from_str(FALLBACK_LANG))
        .unwrap_or_default()
}

/// Whether `lang` has its own resource bundle.
pub fn is_supported(lang: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&lang)
}

/// Translate `key`, falling back to English and then to the key itself.
pub fn t(lang: &str, key: &str) -> String {
    LOCALES
        .try_lookup(&langid(lang), key)
        .unwrap_or_else(|| key.to_string())
}

/// Translate `key` with named arguments.
pub fn t_args(lang: &str, key: &str, args: &HashMap<String, String>) -> String {
    let fluent_args: HashMap<Cow<'static, str>, FluentValue<'static>> = args
        .iter()
        .map(|(k, v)| (Cow::Owned(k.clone()), FluentValue::from(v.clone())))
        .collect();
    LOCALES
        .try_lookup_with_args(&langid(lang), key, &fluent_args)
        .unwrap_or_else(|| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_both_bundles() {
        assert_eq!(t("uz", "btn-messages"), "💬 Xabarlar");
        assert_eq!(t("en", "btn-messages"), "💬 Messages");
    }

    #[test]
    fn substitutes_arguments_without_isolation_marks() {
        let args = HashMap::from([
            ("attempt".to_string(), "2".to_string()),
            ("max".to_string(), "3".to_string()),
        ]);
        assert_eq!(
            t_args("en", "wrong-password", &args),
            "❌ Wrong password. Attempt: 2/3"
        );
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        assert_eq!(t("de", "btn-main-menu"), "🏠 Main menu");
        assert!(!is_supported("de"));
        assert!(is_supported("uz"));
    }

    #[test]
    fn unknown_key_is_returned_verbatim() {
        assert_eq!(t("en", "no-such-key"), "no-such-key");
    }
}
