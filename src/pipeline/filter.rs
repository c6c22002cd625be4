//! Artifact filter: strip digital-signature stamp noise from raw OCR text.
//!
//! ## Why a denylist?
//!
//! OCR over PDF pages that carry a digital-signature visual stamp reliably
//! produces a small, recurring vocabulary of garbled tokens — provider names,
//! signer names, serial numbers, validity ranges — sprinkled across otherwise
//! good text. An ordered denylist of substring regexes is the simplest robust
//! strategy: because each pattern targets a sub-phrase rather than a full
//! line, it still fires when the OCR engine mangles part of the stamp.
//!
//! ## Guarantees
//!
//! * Filtering never fails; a line is retained unless a rule matches.
//! * Relative order of retained lines is preserved.
//! * Idempotent: patterns only match stamp phrases or degenerate lines, so
//!   re-filtering already-filtered text is a no-op.
//! * Every discard goes to the [`AuditLog`] with the verbatim line and a
//!   [`RemovalReason`] category.
//!
//! The default catalogue below is empirically tuned against one signing
//! provider's stamp format and its observed OCR misreadings. It is data, not
//! logic: build a [`StampFilter`] from any other ordered pattern list to
//! target a different provider.

use crate::audit::{AuditLog, RemovalReason};
use crate::error::MillError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Default stamp pattern catalogue.
///
/// Ordered: the first matching entry decides the (logged) match, so put the
/// most specific garbles before the generic keyword patterns. All entries are
/// case-insensitive except the bare serial-run pattern, which must not match
/// ordinary lowercase Latin prose.
pub const DEFAULT_STAMP_PATTERNS: &[&str] = &[
    // Crypto-provider name and OCR misreadings ("Контур Крипто", "Ковтур Криптопро", "Ко тур Крипта").
    r"(?i)к[оа]?[нв]?тур\s*крипт(?:опро|о|а)",
    // Organization-name stamp, with the legal form often misread as digits.
    r#"(?i)владелец\s*(?:ооо|000|ч00)?\s*"?академия\s*дпо"?"#,
    // Signer name and its truncated misreadings.
    r"(?i)мандажи\s*иван\s*анатольевич|аки\s*иван\s*анатольевич",
    // "Document signed with a qualified electronic signature" boilerplate;
    // a prefix match so truncated variants are caught too.
    r"(?i)документ\s*подписан\s*квалифицированн",
    // Serial-number label, with or without the value on the same line.
    r"(?i)серийный\s*номер",
    // Validity date range, e.g. "14.12.2024 - 14.03.2026".
    r"\d{2}\.\d{2}\.\d{4}\s*-\s*\d{2}\.\d{2}\.\d{4}",
    // Long runs of uppercase letters/digits/slashes: serial-number debris.
    // Case-sensitive so lowercase Latin prose survives.
    r"[A-Z0-9\s/]{10,}",
    // Certification-authority and signature vocabulary, any inflection.
    r"(?i)удостоверяющий\s*центр",
    r"(?i)электронная\s*подпись",
    r"(?i)сертификат",
    r"(?i)подпис[ьаи]",
    // Validity-period stamp line.
    r"(?i)срок\s*действия",
    // Catalogued OCR garbles observed in harvested stamps.
    r"(?i)нной\s*е",
    r"(?i)владелецсерийный\s*номер",
    r"(?i)блеелеч\s*оо\s*акад",
    r"(?i)й\s*йный\s*номе",
    r"(?i)крипто\s*(?:внелен|еелд\s*сы)",
    r"(?i)[оа]?нтур\s*кри",
    r"(?i)в39а372321\s*вааореровае",
    r"(?i)ю\s*-\s*\d{2}\.\d{2}\.\d{4}",
    r"(?i)владелец",
    r"(?i)н{10,}.*оивержде",
];

static DEFAULT_COMPILED: Lazy<Vec<Regex>> = Lazy::new(|| {
    DEFAULT_STAMP_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("default stamp pattern must compile"))
        .collect()
});

/// Line-by-line OCR noise filter.
#[derive(Debug)]
pub struct StampFilter {
    patterns: Vec<Regex>,
}

impl Default for StampFilter {
    /// Filter carrying [`DEFAULT_STAMP_PATTERNS`].
    fn default() -> Self {
        Self {
            patterns: DEFAULT_COMPILED.clone(),
        }
    }
}

impl StampFilter {
    /// Compile an ordered pattern catalogue into a filter.
    ///
    /// Patterns are applied as substring searches, in the given order, to
    /// each line. An invalid pattern is a configuration error.
    pub fn new<I, S>(patterns: I) -> Result<Self, MillError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| {
                    MillError::InvalidConfig(format!("bad stamp pattern '{}': {e}", p.as_ref()))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Remove noise lines from one page of raw OCR text.
    ///
    /// A line is discarded when it is blank, a lone character, or matched by
    /// any catalogue entry; everything else is retained verbatim, in order.
    /// Discards are recorded on `audit`.
    pub fn clean(&self, raw_text: &str, audit: &AuditLog) -> String {
        let mut kept: Vec<&str> = Vec::new();
        for line in raw_text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                audit.record(RemovalReason::BlankLine, line);
                continue;
            }
            if trimmed.chars().count() == 1 {
                audit.record(RemovalReason::SingleChar, line);
                continue;
            }
            if self.patterns.iter().any(|p| p.is_match(line)) {
                audit.record(RemovalReason::StampPattern, line);
                continue;
            }
            kept.push(line);
        }
        kept.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> StampFilter {
        StampFilter::default()
    }

    fn audit() -> AuditLog {
        AuditLog::disabled()
    }

    #[test]
    fn stamp_lines_between_content_are_removed() {
        let raw = "Контур Крипто\nПривет мир\nвладелец ООО АКАДЕМИЯ ДПО";
        assert_eq!(filter().clean(raw, &audit()), "Привет мир");
    }

    #[test]
    fn noise_only_input_yields_empty_string() {
        let raw = "Контур Крипто\n\
                   Документ подписан квалифицированной электронной подписью\n\
                   серийный номер 00 AB 39 F1\n\
                   14.12.2024 - 14.03.2026\n\
                   удостоверяющий центр\n\
                   ё\n\
                   \n\
                   ";
        assert_eq!(filter().clean(raw, &audit()), "");
    }

    #[test]
    fn clean_text_passes_through_unchanged() {
        let raw = "Общие положения\nНастоящий устав утверждён общим собранием.\nРаздел 2";
        assert_eq!(filter().clean(raw, &audit()), raw);
    }

    #[test]
    fn filtering_is_idempotent() {
        let raw = "Ковтур Криптопро\nГлава 1. Общие положения\nй\n\nсрок действия ООО АКАДЕМИЯ ДПО";
        let once = filter().clean(raw, &audit());
        let twice = filter().clean(&once, &audit());
        assert_eq!(once, twice);
        assert_eq!(once, "Глава 1. Общие положения");
    }

    #[test]
    fn blank_and_single_char_lines_are_dropped() {
        let raw = "  \n\nа\n x \nнормальная строка";
        assert_eq!(filter().clean(raw, &audit()), "нормальная строка");
    }

    #[test]
    fn uppercase_serial_runs_are_dropped_but_lowercase_prose_survives() {
        let raw = "ABC123/DEF456 GH789\nthe quick brown fox reads documents";
        assert_eq!(
            filter().clean(raw, &audit()),
            "the quick brown fox reads documents"
        );
    }

    #[test]
    fn garbled_signer_and_provider_fragments_are_dropped() {
        let raw = "Блеелеч оО АКАДЕМИЯ\nонтур Кри\nвладелецсерийный номер 12\nполезный текст остаётся";
        assert_eq!(filter().clean(raw, &audit()), "полезный текст остаётся");
    }

    #[test]
    fn retained_order_is_preserved() {
        let raw = "первая строка\nэлектронная подпись\nвторая строка\nтретья строка";
        assert_eq!(
            filter().clean(raw, &audit()),
            "первая строка\nвторая строка\nтретья строка"
        );
    }

    #[test]
    fn custom_catalogue_replaces_default() {
        let f = StampFilter::new(["(?i)confidential"]).expect("valid pattern");
        let raw = "CONFIDENTIAL draft\nвладелец ООО\nreal content";
        // Only the custom pattern applies; the default catalogue is gone.
        assert_eq!(f.clean(raw, &audit()), "владелец ООО\nreal content");
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let err = StampFilter::new(["(unclosed"]).unwrap_err();
        assert!(matches!(err, MillError::InvalidConfig(_)), "got: {err:?}");
    }

    #[test]
    fn removals_are_audited_with_reasons() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("removed.log");
        let log = AuditLog::open(&path).expect("open audit log");

        filter().clean("сертификат\n\nя\nоставить", &log);
        drop(log);

        let contents = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.contains("stamp pattern"));
        assert!(contents.contains("blank line"));
        assert!(contents.contains("single character"));
        assert!(!contents.contains("оставить"));
    }
}
