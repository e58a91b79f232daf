//! JVM internal type signatures to Java source names.

use std::sync::OnceLock;

use regex::Regex;

fn pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\[*)(?:([BCDFIJSZ])|L([^;]+);)$").ok())
        .as_ref()
}

fn primitive(code: &str) -> Option<&'static str> {
    let name = match code {
        "Z" => "boolean",
        "B" => "byte",
        "C" => "char",
        "D" => "double",
        "F" => "float",
        "I" => "int",
        "J" => "long",
        "S" => "short",
        _ => return None,
    };
    Some(name)
}

/// `Ljava/lang/String;` becomes `java.lang.String`, `[[Z` becomes
/// `boolean[][]`. Anything that is not a field descriptor is returned as is.
pub fn java_name(signature: &str) -> String {
    let Some(caps) = pattern().and_then(|p| p.captures(signature)) else {
        return signature.to_string();
    };

    let mut name = match (caps.get(2), caps.get(3)) {
        (Some(code), _) => match primitive(code.as_str()) {
            Some(p) => p.to_string(),
            None => return signature.to_string(),
        },
        (None, Some(class)) => class.as_str().replace('/', "."),
        (None, None) => return signature.to_string(),
    };

    let dimensions = caps.get(1).map_or(0, |m| m.as_str().len());
    for _ in 0..dimensions {
        name.push_str("[]");
    }
    name
}
