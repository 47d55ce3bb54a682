//! Rewrites French rule text into the EN grammar (`parser::en`), word by
//! word and phrase by phrase, then hands off unchanged. Never emits partial
//! tokens: every substitution below is anchored on whole words so that, for
//! instance, `sauf` survives the `au` → `at`-adjacent substitutions intact.

use once_cell::sync::Lazy;
use regex::Regex;

static TZ_PARENS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(([A-Za-z_]+/[A-Za-z_]+)\)\s*$").expect("tz parens regex"));

/// Applied in order: phrase-level frequency idioms first (so a bare `tous
/// les`/`toutes les` fallback doesn't eat tokens a more specific rule needs),
/// then lexical items (time, weekdays, months, ordinals), then connective
/// and structural fixups.
static SUBSTITUTIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        // --- frequency phrases (most specific first) ---
        (re(r"tous les jours ouvr[ée]s"), "every weekday"),
        (re(r"tous les jours"), "every day"),
        (re(r"tous les mois"), "every month"),
        (re(r"tous les an(?:n[ée]e)?s?\b"), "every year"),
        (re(r"toutes les (\d+) heures?"), "every $1 hours"),
        (re(r"toutes les (\d+) minutes?"), "every $1 minutes"),
        (re(r"tous les (\d+) jours"), "every $1 days"),
        (re(r"toutes les (\d+) semaines?"), "every $1 weeks"),
        (re(r"tous les|toutes les"), "every"),
        // --- time: \d{1,2}h(\d{2})? -> HH:MM ---
        (re(r"(\d{1,2})h(\d{2})"), "$1:$2"),
        (re(r"(\d{1,2})h\b"), "$1:00"),
        // --- "dernier jour" before the generic ordinal pass ---
        (re(r"dernier jour"), "last day"),
        // --- weekend-shift phrases, before the per-weekday block below
        // consumes "lundi" out from under them ---
        (
            re(r"si week-end alors lundi suivant"),
            "if weekend then next monday",
        ),
        (
            re(r"si week-end alors prochain jour ouvr[ée]"),
            "if weekend then next business day",
        ),
        // --- weekdays, longest (plural) forms first ---
        (re(r"\blundis\b"), "monday"),
        (re(r"\blundi\b"), "monday"),
        (re(r"\bmardis\b"), "tuesday"),
        (re(r"\bmardi\b"), "tuesday"),
        (re(r"\bmercredis\b"), "wednesday"),
        (re(r"\bmercredi\b"), "wednesday"),
        (re(r"\bjeudis\b"), "thursday"),
        (re(r"\bjeudi\b"), "thursday"),
        (re(r"\bvendredis\b"), "friday"),
        (re(r"\bvendredi\b"), "friday"),
        (re(r"\bsamedis\b"), "saturday"),
        (re(r"\bsamedi\b"), "saturday"),
        (re(r"\bdimanches\b"), "sunday"),
        (re(r"\bdimanche\b"), "sunday"),
        // --- "d'<month>" / "de <month>" -> "of <month>", before month names translate ---
        (re(r"d['’](\w+)"), "of $1"),
        (
            re(r"\bde\s+(janvier|f[ée]vrier|mars|avril|mai|juin|juillet|ao[uû]t|septembre|octobre|novembre|d[ée]cembre)\b"),
            "of $1",
        ),
        // --- months ---
        (re(r"\bjanvier\b"), "january"),
        (re(r"\bf[ée]vrier\b"), "february"),
        (re(r"\bmars\b"), "march"),
        (re(r"\bavril\b"), "april"),
        (re(r"\bmai\b"), "may"),
        (re(r"\bjuin\b"), "june"),
        (re(r"\bjuillet\b"), "july"),
        (re(r"\bao[uû]t\b"), "august"),
        (re(r"\bseptembre\b"), "september"),
        (re(r"\boctobre\b"), "october"),
        (re(r"\bnovembre\b"), "november"),
        (re(r"\bd[ée]cembre\b"), "december"),
        // --- ordinals ---
        (re(r"\b1er\b"), "1st"),
        (re(r"\bpremi[èe]re?\b"), "first"),
        (re(r"\bdeuxi[èe]me\b"), "second"),
        (re(r"\btroisi[èe]me\b"), "third"),
        (re(r"\bquatri[èe]me\b"), "fourth"),
        (re(r"\bcinqui[èe]me\b"), "fifth"),
        (re(r"\bderni[èe]re?\b"), "last"),
        // --- windows / exceptions ---
        (
            re(r"entre le (\d{4}-\d{2}-\d{2}) et le (\d{4}-\d{2}-\d{2})"),
            "between $1 and $2",
        ),
        (re(r"entre (\S+) et (\S+)"), "between $1 and $2"),
        (re(r"jusqu['’]?\s*au\s+(\d{4}-\d{2}-\d{2})"), "until $1"),
        (re(r"\bsauf\b"), "except"),
        // --- structural fixups: insert "on" after "every month"/"every year"/"every N weeks" ---
        (re(r"(every (?:month|year|\d+ weeks)) le\s+"), "$1 on the "),
        // --- conjunctions ---
        (re(r",\s*et\b"), ", and"),
        (re(r"\bet\b"), "and"),
        (re(r"\bà\b"), "at"),
        // --- leftover stray "le" the structural fixup above didn't consume ---
        (re(r"\ble\s+"), ""),
    ]
});

fn re(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("valid FR transliteration regex")
}

/// Rewrites `text` from French surface grammar into EN grammar. The result
/// is fed to `parser::en::parse_rule_text`/`split_rules` unchanged; this
/// function performs no IR-level interpretation of its own.
pub fn transliterate(text: &str) -> String {
    let mut out = TZ_PARENS_RE.replace(text, " in $1").to_string();
    for (pattern, replacement) in SUBSTITUTIONS.iter() {
        out = pattern.replace_all(&out, *replacement).to_string();
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
