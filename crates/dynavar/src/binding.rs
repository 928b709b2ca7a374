//! Binding-string parsing and canonical normalization.
//!
//! A binding string is the text a record's hardware link carries: a function
//! name followed by whitespace-delimited arguments, e.g. `TEMP 3 filtered`.
//! Parsing splits the tokens; [`Binding::normalized`] collapses irregular
//! spacing so that equivalent bindings share one host-side parameter.

use smol_str::SmolStr;

use crate::error::BindingError;

/// A parsed binding string: function name plus argument tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    function: SmolStr,
    arguments: Vec<SmolStr>,
    raw: SmolStr,
}

impl Binding {
    /// Parse a raw binding string.
    ///
    /// The first whitespace-delimited token is the function name, every
    /// following token an argument. Leading and trailing whitespace is
    /// ignored. Arguments must not begin with `{` or `[`: that prefix is
    /// reserved for a structured argument syntax.
    pub fn parse(raw: &str) -> Result<Self, BindingError> {
        let mut tokens = raw.split_ascii_whitespace();
        let function = tokens.next().ok_or(BindingError::EmptyBinding)?;
        let mut arguments = Vec::new();
        for token in tokens {
            if token.starts_with(['{', '[']) {
                return Err(BindingError::ReservedArgument(token.into()));
            }
            arguments.push(SmolStr::new(token));
        }
        Ok(Self {
            function: function.into(),
            arguments,
            raw: raw.into(),
        })
    }

    /// Function name, the dispatch key for handler lookup.
    #[must_use]
    pub fn function(&self) -> &str {
        self.function.as_str()
    }

    /// Argument tokens in binding order.
    #[must_use]
    pub fn arguments(&self) -> &[SmolStr] {
        &self.arguments
    }

    /// The binding text exactly as written in the record configuration.
    #[must_use]
    pub fn raw(&self) -> &str {
        self.raw.as_str()
    }

    /// Canonical form: function and arguments joined by single spaces.
    ///
    /// Bindings are interchangeable at the host boundary iff their
    /// normalized forms are byte-identical. Normalization is idempotent:
    /// re-parsing a normalized string yields the same tokens.
    #[must_use]
    pub fn normalized(&self) -> String {
        let mut out = String::from(self.function.as_str());
        for arg in &self.arguments {
            out.push(' ');
            out.push_str(arg);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;

    #[test]
    fn splits_function_and_arguments() {
        let binding = Binding::parse("MOTOR speed rpm").unwrap();
        assert_eq!(binding.function(), "MOTOR");
        assert_eq!(binding.arguments(), ["speed", "rpm"]);
        assert_eq!(binding.raw(), "MOTOR speed rpm");
    }

    #[test]
    fn collapses_irregular_whitespace() {
        let binding = Binding::parse("  TEMP \t 3   filtered ").unwrap();
        expect![[r#"TEMP 3 filtered"#]].assert_eq(&binding.normalized());
    }

    #[test]
    fn function_without_arguments() {
        let binding = Binding::parse("COUNT").unwrap();
        assert!(binding.arguments().is_empty());
        assert_eq!(binding.normalized(), "COUNT");
    }

    #[test]
    fn empty_and_blank_rejected() {
        assert_eq!(Binding::parse("").unwrap_err(), BindingError::EmptyBinding);
        assert_eq!(
            Binding::parse(" \t ").unwrap_err(),
            BindingError::EmptyBinding
        );
    }

    #[test]
    fn reserved_prefix_rejected_anywhere() {
        let err = Binding::parse("F a {b} c").unwrap_err();
        assert_eq!(err, BindingError::ReservedArgument("{b}".into()));
        let err = Binding::parse("F [0]").unwrap_err();
        assert_eq!(err, BindingError::ReservedArgument("[0]".into()));
    }

    #[test]
    fn reserved_prefix_allowed_in_function_position() {
        // Only arguments carry the reservation.
        let binding = Binding::parse("{odd} 1").unwrap();
        assert_eq!(binding.function(), "{odd}");
    }

    #[test]
    fn normalization_is_idempotent() {
        let first = Binding::parse("AVG   7  slow").unwrap();
        let normalized = first.normalized();
        let second = Binding::parse(&normalized).unwrap();
        assert_eq!(second.normalized(), normalized);
        assert_eq!(second, Binding::parse("AVG 7 slow").unwrap());
    }
}
