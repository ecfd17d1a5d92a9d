// Cell value types, their validity predicates, and their single-letter tags.
use std::fmt;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ValueType {
    Int,
    Bool,
    #[default]
    String,
}

impl ValueType {
    pub fn tag(self) -> char {
        match self {
            ValueType::Int => 'i',
            ValueType::Bool => 'b',
            ValueType::String => 's',
        }
    }

    /// Unknown tags fall back to `String`, matching how untagged tokens load.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "i" => ValueType::Int,
            "b" => ValueType::Bool,
            _ => ValueType::String,
        }
    }

    pub fn accepts(self, value: &str) -> bool {
        match self {
            ValueType::Int => {
                let digits = value.strip_prefix('-').unwrap_or(value);
                !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
            }
            ValueType::Bool => value == "0" || value == "1",
            ValueType::String => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Int => "INT",
            ValueType::Bool => "BOOL",
            ValueType::String => "STRING",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::ValueType;

    #[test]
    fn int_accepts_optional_sign_and_digits() {
        assert!(ValueType::Int.accepts("123"));
        assert!(ValueType::Int.accepts("-123"));
        assert!(ValueType::Int.accepts("0"));
        assert!(!ValueType::Int.accepts("12a"));
        assert!(!ValueType::Int.accepts(""));
        assert!(!ValueType::Int.accepts("-"));
        assert!(!ValueType::Int.accepts("--1"));
        assert!(!ValueType::Int.accepts("+1"));
    }

    #[test]
    fn bool_accepts_single_bit() {
        assert!(ValueType::Bool.accepts("0"));
        assert!(ValueType::Bool.accepts("1"));
        assert!(!ValueType::Bool.accepts("2"));
        assert!(!ValueType::Bool.accepts("true"));
        assert!(!ValueType::Bool.accepts("01"));
        assert!(!ValueType::Bool.accepts(""));
    }

    #[test]
    fn string_accepts_anything() {
        for value in ["", "x", "12a", "with%percent", "-"] {
            assert!(ValueType::String.accepts(value));
        }
    }

    #[test]
    fn tags_map_both_ways() {
        for ty in [ValueType::Int, ValueType::Bool, ValueType::String] {
            assert_eq!(ValueType::from_tag(&ty.tag().to_string()), ty);
        }
        assert_eq!(ValueType::from_tag("q"), ValueType::String);
    }
}
