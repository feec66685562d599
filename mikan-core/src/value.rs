use anyhow::{bail, Result};

/// One numeric field of a command, fixed at load time. A leading `+` in the
/// source token marks the field as a relative delta; otherwise the value is
/// applied absolutely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Value {
    pub amount: i32,
    pub relative: bool,
}

impl Value {
    pub fn absolute(amount: i32) -> Self {
        Self { amount, relative: false }
    }

    pub fn relative(amount: i32) -> Self {
        Self { amount, relative: true }
    }

    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        let (body, relative) = match token.strip_prefix('+') {
            Some(rest) => (rest, true),
            None => (token, false),
        };
        let amount = match body.parse::<i32>() {
            Ok(v) => v,
            Err(_) => bail!("invalid numeric value {:?}", token),
        };
        Ok(Self { amount, relative })
    }

    pub fn apply(self, current: i32) -> i32 {
        if self.relative {
            current + self.amount
        } else {
            self.amount
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute() {
        assert_eq!(Value::parse("12").unwrap(), Value::absolute(12));
        assert_eq!(Value::parse("-3").unwrap(), Value::absolute(-3));
        assert_eq!(Value::parse(" 7 ").unwrap(), Value::absolute(7));
    }

    #[test]
    fn test_parse_relative() {
        assert_eq!(Value::parse("+5").unwrap(), Value::relative(5));
        assert_eq!(Value::parse("+-4").unwrap(), Value::relative(-4));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Value::parse("abc").is_err());
        assert!(Value::parse("").is_err());
        assert!(Value::parse("+").is_err());
    }

    #[test]
    fn test_apply() {
        assert_eq!(Value::absolute(10).apply(3), 10);
        assert_eq!(Value::relative(10).apply(3), 13);
        assert_eq!(Value::relative(-10).apply(3), -7);
    }
}
