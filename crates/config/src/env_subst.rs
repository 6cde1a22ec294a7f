/// Expand `${NAME}` and `${NAME:-fallback}` placeholders from the process
/// environment.
///
/// A placeholder whose variable is unset and has no fallback is kept
/// verbatim, as is an unterminated `${`.
pub fn substitute_env(input: &str) -> String {
    expand(input, |name| std::env::var(name).ok())
}

pub(crate) fn expand(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let body = &after[..end];
        let (name, fallback) = match body.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (body, None),
        };

        match (name.is_empty(), lookup(name), fallback) {
            (false, Some(value), _) => out.push_str(&value),
            (false, None, Some(fallback)) => out.push_str(fallback),
            _ => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "FRESHET_NICK" => Some("recorder".into()),
            "EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[rstest]
    #[case("nick = \"${FRESHET_NICK}\"", "nick = \"recorder\"")]
    #[case("${FRESHET_NICK}-${FRESHET_NICK}", "recorder-recorder")]
    #[case("${EMPTY}x", "x")]
    #[case("${MISSING}", "${MISSING}")]
    #[case("${MISSING:-6697}", "6697")]
    #[case("${FRESHET_NICK:-other}", "recorder")]
    #[case("${}", "${}")]
    #[case("price: $5 ${unterminated", "price: $5 ${unterminated")]
    #[case("no placeholders", "no placeholders")]
    #[case("ünï ${FRESHET_NICK} ✓", "ünï recorder ✓")]
    fn expands_placeholders(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(expand(input, lookup), expected);
    }

    #[test]
    fn reads_the_process_environment() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
