//! German cardinal numbers written out in words.

const ONES: [&str; 20] = [
    "null", "eins", "zwei", "drei", "vier", "fünf", "sechs", "sieben", "acht", "neun", "zehn",
    "elf", "zwölf", "dreizehn", "vierzehn", "fünfzehn", "sechzehn", "siebzehn", "achtzehn",
    "neunzehn",
];

const TENS: [&str; 10] = [
    "", "", "zwanzig", "dreißig", "vierzig", "fünfzig", "sechzig", "siebzig", "achtzig", "neunzig",
];

/// Singular and plural of each power of a million, lowest first.
const SCALES: [(&str, &str); 5] = [
    ("Million", "Millionen"),
    ("Milliarde", "Milliarden"),
    ("Billion", "Billionen"),
    ("Billiarde", "Billiarden"),
    ("Trillion", "Trillionen"),
];

/// Spells out `n`, e.g. `180` as `einhundertachtzig` and `2_000_000` as `zwei Millionen`.
pub fn cardinal(n: i64) -> String {
    if n < 0 {
        return format!("minus {}", unsigned(n.unsigned_abs()));
    }
    unsigned(n.unsigned_abs())
}

fn unsigned(n: u64) -> String {
    if n == 0 {
        return ONES[0].to_owned();
    }
    let mut parts = Vec::new();
    let mut rest = n / 1_000_000;
    let mut groups = Vec::new();
    while rest > 0 {
        groups.push(rest % 1000);
        rest /= 1000;
    }
    for (scale, count) in groups.iter().enumerate().rev() {
        let (singular, plural) = SCALES[scale];
        match count {
            0 => {}
            1 => parts.push(format!("eine {singular}")),
            count => {
                // "einhunderteine Millionen"
                let count = below_thousand(*count);
                let count = match count.strip_suffix("eins") {
                    Some(head) => format!("{head}eine"),
                    None => count,
                };
                parts.push(format!("{count} {plural}"));
            }
        }
    }
    let low = n % 1_000_000;
    if low > 0 {
        parts.push(below_million(low));
    }
    parts.join(" ")
}

fn below_million(n: u64) -> String {
    let (thousands, rest) = (n / 1000, n % 1000);
    let mut words = String::new();
    if thousands > 0 {
        let prefix = below_thousand(thousands);
        // "eintausend", "einhunderteintausend"
        match prefix.strip_suffix("eins") {
            Some(head) => {
                words.push_str(head);
                words.push_str("ein");
            }
            None => words.push_str(&prefix),
        }
        words.push_str("tausend");
    }
    if rest > 0 {
        words.push_str(&below_thousand(rest));
    }
    words
}

fn below_thousand(n: u64) -> String {
    let (hundreds, rest) = (n / 100, n % 100);
    let mut words = String::new();
    if hundreds > 0 {
        words.push_str(unit_prefix(hundreds));
        words.push_str("hundert");
    }
    if rest >= 20 {
        let (tens, units) = (rest / 10, rest % 10);
        if units > 0 {
            words.push_str(unit_prefix(units));
            words.push_str("und");
        }
        words.push_str(TENS[tens as usize]);
    } else if rest > 0 {
        words.push_str(ONES[rest as usize]);
    }
    words
}

/// Form of a digit used in front of another word: `ein` rather than `eins`.
fn unit_prefix(n: u64) -> &'static str {
    if n == 1 { "ein" } else { ONES[n as usize] }
}
