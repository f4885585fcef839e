//! Localized labels written into items
//!
//! Only the handful of words the generator itself writes are localized; everything else is
//! author text. Unknown language codes fall back to English.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    pub code: &'static str,
    pub true_label: &'static str,
    pub false_label: &'static str,
    pub section: &'static str,
}

const LABELS: [Labels; 6] = [
    Labels {
        code: "en",
        true_label: "True",
        false_label: "False",
        section: "Section",
    },
    Labels {
        code: "sv",
        true_label: "Sant",
        false_label: "Falskt",
        section: "Avsnitt",
    },
    Labels {
        code: "no",
        true_label: "Sant",
        false_label: "Usant",
        section: "Del",
    },
    Labels {
        code: "da",
        true_label: "Sand",
        false_label: "Falsk",
        section: "Afsnit",
    },
    Labels {
        code: "fi",
        true_label: "Tosi",
        false_label: "Epätosi",
        section: "Osio",
    },
    Labels {
        code: "de",
        true_label: "Wahr",
        false_label: "Falsch",
        section: "Abschnitt",
    },
];

/// Labels for `language`, matched on the primary subtag (`sv-SE` → `sv`).
pub fn labels(language: &str) -> &'static Labels {
    let primary = language
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let primary = match primary.as_str() {
        "nb" | "nn" => "no",
        other => other,
    };
    LABELS
        .iter()
        .find(|l| l.code == primary)
        .unwrap_or(&LABELS[0])
}

pub fn is_supported(language: &str) -> bool {
    let found = labels(language);
    found.code != "en" || language.trim().to_ascii_lowercase().starts_with("en")
}
