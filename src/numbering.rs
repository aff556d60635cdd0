//! Counter numbering systems.

const MAX_REPEAT: i64 = 20;

const ROMAN: &[(i64, &str)] = &[
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

const ARMENIAN: &[(i64, &str)] = &[
    (9000, "Ք"),
    (8000, "Փ"),
    (7000, "Ւ"),
    (6000, "Ց"),
    (5000, "Ր"),
    (4000, "Տ"),
    (3000, "Վ"),
    (2000, "Ս"),
    (1000, "Ռ"),
    (900, "Ջ"),
    (800, "Պ"),
    (700, "Չ"),
    (600, "Ո"),
    (500, "Շ"),
    (400, "Ն"),
    (300, "Յ"),
    (200, "Մ"),
    (100, "Ճ"),
    (90, "Ղ"),
    (80, "Ձ"),
    (70, "Հ"),
    (60, "Կ"),
    (50, "Ծ"),
    (40, "Խ"),
    (30, "Լ"),
    (20, "Ի"),
    (10, "Ժ"),
    (9, "Թ"),
    (8, "Ը"),
    (7, "Է"),
    (6, "Զ"),
    (5, "Ե"),
    (4, "Դ"),
    (3, "Գ"),
    (2, "Բ"),
    (1, "Ա"),
];

const GEORGIAN: &[(i64, &str)] = &[
    (10000, "ჵ"),
    (9000, "ჰ"),
    (8000, "ჯ"),
    (7000, "ჴ"),
    (6000, "ხ"),
    (5000, "ჭ"),
    (4000, "წ"),
    (3000, "ძ"),
    (2000, "ც"),
    (1000, "ჩ"),
    (900, "შ"),
    (800, "ყ"),
    (700, "ღ"),
    (600, "ქ"),
    (500, "ფ"),
    (400, "ჳ"),
    (300, "ტ"),
    (200, "ს"),
    (100, "რ"),
    (90, "ჟ"),
    (80, "პ"),
    (70, "ო"),
    (60, "ჲ"),
    (50, "ნ"),
    (40, "მ"),
    (30, "ლ"),
    (20, "კ"),
    (10, "ი"),
    (9, "თ"),
    (8, "ჱ"),
    (7, "ზ"),
    (6, "ვ"),
    (5, "ე"),
    (4, "დ"),
    (3, "გ"),
    (2, "ბ"),
    (1, "ა"),
];

const HEBREW: &[(i64, &str)] = &[
    (400, "ת"),
    (300, "ש"),
    (200, "ר"),
    (100, "ק"),
    (90, "צ"),
    (80, "פ"),
    (70, "ע"),
    (60, "ס"),
    (50, "נ"),
    (40, "מ"),
    (30, "ל"),
    (20, "כ"),
    (19, "יט"),
    (18, "יח"),
    (17, "יז"),
    (16, "טז"),
    (15, "טו"),
    (10, "י"),
    (9, "ט"),
    (8, "ח"),
    (7, "ז"),
    (6, "ו"),
    (5, "ה"),
    (4, "ד"),
    (3, "ג"),
    (2, "ב"),
    (1, "א"),
];

const LATIN: &str = "a-z";
const GREEK: &str = "α-ρσ-ω";
const RUSSIAN: &str = "а-ик-щэ-я";

struct CjkInfo {
    digits: [char; 10],
    markers: [char; 4],
    negative: &'static str,
}

const CJK_TRADITIONAL: CjkInfo = CjkInfo {
    digits: ['零', '一', '二', '三', '四', '五', '六', '七', '八', '九'],
    markers: ['\0', '十', '百', '千'],
    negative: "負",
};

const CJK_SIMPLIFIED: CjkInfo = CjkInfo {
    digits: ['零', '一', '二', '三', '四', '五', '六', '七', '八', '九'],
    markers: ['\0', '十', '百', '千'],
    negative: "负",
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Case {
    Upper,
    Lower,
    AsIs,
}

/// Formats `num` in the numbering system named by `style`. Values the
/// system cannot represent yield an empty string.
pub fn format_counter(num: i64, style: &str) -> String {
    let style = style.trim().to_ascii_lowercase();
    let (case, base) = if let Some(rest) = style.strip_prefix("upper-") {
        (Case::Upper, rest)
    } else if let Some(rest) = style.strip_prefix("lower-") {
        (Case::Lower, rest)
    } else {
        (Case::AsIs, style.as_str())
    };
    let formatted = match base {
        "none" => Some(String::new()),
        "disc" => Some("\u{2022}".to_string()),
        "circle" => Some("\u{25E6}".to_string()),
        "square" => Some("\u{25A0}".to_string()),
        "decimal-leading-zero" => Some(if (0..10).contains(&num) {
            format!("0{num}")
        } else if (-9..0).contains(&num) {
            format!("-0{}", -num)
        } else {
            num.to_string()
        }),
        "roman" => additive(num, ROMAN),
        "armenian" => additive(num, ARMENIAN),
        "georgian" => additive(num, GEORGIAN),
        "hebrew" => additive(num, HEBREW),
        "latin" | "alpha" => alphabetic(num, LATIN),
        "greek" => alphabetic(num, GREEK),
        "russian" => alphabetic(num, RUSSIAN),
        "cjk-ideographic" | "trad-chinese-informal" => cjk(num, &CJK_TRADITIONAL),
        "simp-chinese-informal" => cjk(num, &CJK_SIMPLIFIED),
        _ => Some(num.to_string()),
    };
    let formatted = formatted.unwrap_or_default();
    match case {
        Case::Upper => formatted.to_uppercase(),
        Case::Lower => formatted.to_lowercase(),
        Case::AsIs => formatted,
    }
}

fn additive(mut num: i64, symbols: &[(i64, &str)]) -> Option<String> {
    if num <= 0 {
        return None;
    }
    let mut out = String::new();
    for (weight, symbol) in symbols {
        let count = num / weight;
        if count > MAX_REPEAT {
            return None;
        }
        for _ in 0..count {
            out.push_str(symbol);
        }
        num -= count * weight;
    }
    Some(out)
}

/// Expands `a-z` style ranges into the full alphabet.
fn expand_alphabet(spec: &str) -> Vec<char> {
    let chars: Vec<char> = spec.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if i + 2 < chars.len() && chars[i + 1] == '-' {
            let (first, last) = (chars[i] as u32, chars[i + 2] as u32);
            out.extend((first..=last).filter_map(char::from_u32));
            i += 3;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

// Bijective base-N.
fn alphabetic(mut num: i64, spec: &str) -> Option<String> {
    if num <= 0 {
        return None;
    }
    let alphabet = expand_alphabet(spec);
    let base = alphabet.len() as i64;
    let mut out = Vec::new();
    while num > 0 {
        num -= 1;
        out.push(*alphabet.get((num % base) as usize)?);
        num /= base;
    }
    Some(out.iter().rev().collect())
}

fn cjk(num: i64, info: &CjkInfo) -> Option<String> {
    if !(-9999..=9999).contains(&num) {
        return None;
    }
    if num == 0 {
        return Some(info.digits[0].to_string());
    }
    let mut out = String::new();
    if num < 0 {
        out.push_str(info.negative);
    }
    let value = num.unsigned_abs() as usize;
    if (10..20).contains(&value) {
        // Informal style drops the leading one: 十二, not 一十二.
        out.push(info.markers[1]);
        if value > 10 {
            out.push(info.digits[value - 10]);
        }
        return Some(out);
    }
    let places = [value / 1000, value / 100 % 10, value / 10 % 10, value % 10];
    let mut pending_zero = false;
    let mut written = false;
    for (idx, digit) in places.iter().enumerate() {
        let marker = 3 - idx;
        if *digit == 0 {
            pending_zero = written;
            continue;
        }
        if pending_zero {
            out.push(info.digits[0]);
            pending_zero = false;
        }
        out.push(info.digits[*digit]);
        if marker > 0 {
            out.push(info.markers[marker]);
        }
        written = true;
    }
    Some(out)
}
