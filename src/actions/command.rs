//! Workflow command formatting

use std::fmt;

/// A `::name key=value::message` workflow command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command<'a> {
    pub name: &'a str,
    pub properties: Vec<(&'a str, &'a str)>,
    pub message: &'a str,
}

impl<'a> Command<'a> {
    pub fn new(name: &'a str, message: &'a str) -> Self {
        Self {
            name,
            properties: Vec::new(),
            message,
        }
    }

    pub fn property(mut self, key: &'a str, value: &'a str) -> Self {
        self.properties.push((key, value));
        self
    }
}

impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "::{}", self.name)?;
        for (i, (key, value)) in self.properties.iter().enumerate() {
            let sep = if i == 0 { " " } else { "," };
            write!(f, "{}{}={}", sep, key, escape_property(value))?;
        }
        write!(f, "::{}", escape_data(self.message))
    }
}

pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

pub fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_command() {
        let cmd = Command::new("add-mask", "secret");
        assert_eq!(cmd.to_string(), "::add-mask::secret");
    }

    #[test]
    fn test_properties_and_escaping() {
        let cmd = Command::new("set-output", "line1\nline2 100%").property("name", "a:b,c");
        assert_eq!(
            cmd.to_string(),
            "::set-output name=a%3Ab%2Cc::line1%0Aline2 100%25"
        );
    }
}
