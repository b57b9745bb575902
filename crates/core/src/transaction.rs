use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A mining symbol. The derived order (kind, then label) is the canonical
/// order used for itemsets and rule output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "label", rename_all = "snake_case")]
pub enum Token {
    Group(String),
    Payment(String),
    Status(String),
}

impl Token {
    pub fn group(label: &str) -> Self {
        Token::Group(label.to_string())
    }

    pub fn payment(method: &str) -> Self {
        Token::Payment(method.to_string())
    }

    pub fn status(status: &str) -> Self {
        Token::Status(status.to_string())
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Token::Group(_))
    }

    pub fn label(&self) -> &str {
        match self {
            Token::Group(s) | Token::Payment(s) | Token::Status(s) => s,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Group(s) => write!(f, "{s}"),
            Token::Payment(s) => write!(f, "{s}"),
            Token::Status(s) => write!(f, "status:{s}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiningMode {
    /// Category groups only.
    #[default]
    Plain,
    /// Category groups plus the payment method.
    WithPayment,
    /// Category groups plus a watched payment status.
    WithOutcome,
}

impl fmt::Display for MiningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiningMode::Plain => write!(f, "plain"),
            MiningMode::WithPayment => write!(f, "with_payment"),
            MiningMode::WithOutcome => write!(f, "with_outcome"),
        }
    }
}

impl std::str::FromStr for MiningMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "plain" => Ok(MiningMode::Plain),
            "with_payment" | "payment" => Ok(MiningMode::WithPayment),
            "with_outcome" | "outcome" => Ok(MiningMode::WithOutcome),
            other => Err(format!("Unknown mining mode: '{other}'")),
        }
    }
}

/// Deduplicated token set derived from one purchase event. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    tokens: BTreeSet<Token>,
}

impl Transaction {
    /// Returns `None` when no tokens are supplied: an empty transaction
    /// carries no signal and is never part of a corpus.
    pub fn from_tokens<I: IntoIterator<Item = Token>>(tokens: I) -> Option<Transaction> {
        let tokens: BTreeSet<Token> = tokens.into_iter().collect();
        if tokens.is_empty() {
            None
        } else {
            Some(Transaction { tokens })
        }
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.tokens.contains(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn from_tokens_deduplicates() {
        let tx = Transaction::from_tokens(vec![
            Token::group("食品"),
            Token::group("食品"),
            Token::payment("支付宝"),
        ])
        .unwrap();
        assert_eq!(tx.len(), 2);
        assert!(tx.contains(&Token::payment("支付宝")));
    }

    #[test]
    fn empty_token_list_yields_none() {
        assert!(Transaction::from_tokens(Vec::new()).is_none());
    }

    #[test]
    fn canonical_order_is_kind_then_label() {
        let tx = Transaction::from_tokens(vec![
            Token::status("已退款"),
            Token::group("b"),
            Token::payment("a"),
            Token::group("a"),
        ])
        .unwrap();
        let order: Vec<String> = tx.tokens().map(|t| t.to_string()).collect();
        assert_eq!(order, vec!["a", "b", "a", "status:已退款"]);
    }

    #[test]
    fn token_display_and_label() {
        assert_eq!(Token::status("部分退款").to_string(), "status:部分退款");
        assert_eq!(Token::status("部分退款").label(), "部分退款");
        assert!(Token::group("家居").is_group());
        assert!(!Token::payment("现金").is_group());
    }

    #[test]
    fn mining_mode_from_str() {
        assert_eq!(MiningMode::from_str("plain").unwrap(), MiningMode::Plain);
        assert_eq!(MiningMode::from_str("with-payment").unwrap(), MiningMode::WithPayment);
        assert_eq!(MiningMode::from_str("OUTCOME").unwrap(), MiningMode::WithOutcome);
        assert!(MiningMode::from_str("sequence").is_err());
    }

    #[test]
    fn mining_mode_display_roundtrip() {
        for mode in [MiningMode::Plain, MiningMode::WithPayment, MiningMode::WithOutcome] {
            assert_eq!(MiningMode::from_str(&mode.to_string()).unwrap(), mode);
        }
    }
}
