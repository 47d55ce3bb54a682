//! Decides whether a rule clause reads as French or English by a marker-
//! token majority vote, tries that language's path first, and falls back to
//! the other path on failure.

use crate::error::ScheduleResult;
use crate::ir::Rule;
use crate::parser::{en, fr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Language {
    En,
    Fr,
}

const FR_MARKERS: &[&str] = &[
    "tous", "toutes", "les", "le", "la", "lundi", "lundis", "mardi", "mardis", "mercredi",
    "mercredis", "jeudi", "jeudis", "vendredi", "vendredis", "samedi", "samedis", "dimanche",
    "dimanches", "janvier", "fevrier", "février", "mars", "avril", "mai", "juin", "juillet",
    "aout", "août", "septembre", "octobre", "novembre", "decembre", "décembre", "sauf", "entre",
    "et", "jusqu", "jusquau", "mois", "ans", "annee", "année", "annees", "années", "heures",
    "heure", "minutes", "minute", "semaines", "semaine", "jours", "jour", "dernier", "derniere",
    "dernière", "premier", "premiere", "première", "deuxieme", "deuxième", "troisieme",
    "troisième", "quatrieme", "quatrième", "cinquieme", "cinquième", "suivant", "prochain",
    "ouvre", "ouvré", "ouvres", "ouvrés",
];

const EN_MARKERS: &[&str] = &[
    "every", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "except", "between", "and", "until", "month", "months",
    "year", "years", "hour", "hours", "minute", "minutes", "week", "weeks", "day", "days",
    "last", "first", "second", "third", "fourth", "fifth", "weekend", "next", "business", "on",
    "at",
];

fn count_markers(text: &str, markers: &[&str]) -> usize {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|tok| !tok.is_empty())
        .filter(|tok| {
            let lower = tok.to_ascii_lowercase();
            markers.contains(&lower.as_str())
        })
        .count()
}

fn detect_language(text: &str) -> Language {
    let fr = count_markers(text, FR_MARKERS);
    let en = count_markers(text, EN_MARKERS);
    if fr > en {
        Language::Fr
    } else {
        Language::En
    }
}

fn try_as(lang: Language, rule_text: &str) -> ScheduleResult<Rule> {
    match lang {
        Language::En => en::parse_rule_text(rule_text),
        Language::Fr => en::parse_rule_text(&fr::transliterate(rule_text)),
    }
}

/// Parses one rule clause (already split out of a composed schedule string).
/// Tries the marker-vote winner first; the loser is attempted only as a
/// fallback, and its error is what surfaces if both fail.
pub fn parse_rule_clause(rule_text: &str) -> ScheduleResult<Rule> {
    let primary = detect_language(rule_text);
    let fallback = match primary {
        Language::En => Language::Fr,
        Language::Fr => Language::En,
    };
    match try_as(primary, rule_text) {
        Ok(rule) => Ok(rule),
        Err(_) => try_as(fallback, rule_text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_french_by_marker_majority() {
        assert_eq!(
            detect_language("tous les dimanches à 10h"),
            Language::Fr
        );
    }

    #[test]
    fn detects_english_by_marker_majority() {
        assert_eq!(detect_language("every sunday at 10am"), Language::En);
    }

    #[test]
    fn french_clause_parses_via_fallback_path() {
        let rule = parse_rule_clause("tous les dimanches à 10h").unwrap();
        match rule {
            Rule::Recurring(r) => assert_eq!(r.byweekday, Some(std::collections::BTreeSet::from([6]))),
            _ => panic!("expected recurring rule"),
        }
    }

    #[test]
    fn english_clause_parses_directly() {
        let rule = parse_rule_clause("every sunday at 10am").unwrap();
        match rule {
            Rule::Recurring(r) => assert_eq!(r.byweekday, Some(std::collections::BTreeSet::from([6]))),
            _ => panic!("expected recurring rule"),
        }
    }

    #[test]
    fn unparseable_in_either_language_surfaces_fallback_error() {
        assert!(parse_rule_clause("zzz not a schedule zzz").is_err());
    }
}
