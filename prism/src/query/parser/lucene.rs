use super::ast::*;
use super::{QueryError, Result};

pub struct LuceneParser;

impl LuceneParser {
    pub fn parse(query: &str) -> Result<QueryNode> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(QueryError::ParseError("Empty query".to_string()));
        }

        Self::parse_or(trimmed)
    }

    // Precedence: OR (lowest) > AND > NOT > primary (highest)
    fn parse_or(input: &str) -> Result<QueryNode> {
        let parts = Self::split_by_operator(input, " OR ");
        if parts.len() > 1 {
            let children: Result<Vec<_>> = parts.iter().map(|p| Self::parse_and(p)).collect();
            return Ok(QueryNode::Or(children?));
        }
        Self::parse_and(input)
    }

    fn parse_and(input: &str) -> Result<QueryNode> {
        let parts = Self::split_by_operator(input, " AND ");
        if parts.len() > 1 {
            let children: Result<Vec<_>> = parts.iter().map(|p| Self::parse_not(p)).collect();
            return Ok(QueryNode::And(children?));
        }
        Self::parse_not(input)
    }

    fn parse_not(input: &str) -> Result<QueryNode> {
        let trimmed = input.trim();
        if trimmed.starts_with("NOT ") {
            let rest = trimmed.strip_prefix("NOT ").unwrap();
            let child = Self::parse_primary(rest)?;
            return Ok(QueryNode::Not(Box::new(child)));
        }
        Self::parse_primary(input)
    }

    fn parse_primary(input: &str) -> Result<QueryNode> {
        let trimmed = input.trim();

        // Handle parentheses
        if trimmed.starts_with('(') && trimmed.ends_with(')') {
            let inner = &trimmed[1..trimmed.len() - 1];
            return Self::parse_or(inner);
        }

        // Handle boost (term^2.0)
        if let Some((term_part, boost_part)) = trimmed.rsplit_once('^') {
            if let Ok(boost) = boost_part.parse::<f32>() {
                let query = Self::parse_term(term_part)?;
                return Ok(QueryNode::Boost {
                    query: Box::new(query),
                    boost,
                });
            }
        }

        Self::parse_term(trimmed)
    }

    fn parse_term(input: &str) -> Result<QueryNode> {
        let trimmed = input.trim();

        // Handle field:value
        if let Some((field, value)) = trimmed.split_once(':') {
            if !value.contains(' ') {
                return Ok(QueryNode::field_term(field, value));
            }
        }

        // Simple term
        if !trimmed.contains(' ') {
            return Ok(QueryNode::term(trimmed));
        }

        // Multi-word phrase
        let words: Vec<String> = trimmed.split_whitespace().map(|s| s.to_string()).collect();
        Ok(QueryNode::phrase(words))
    }

    // Split by operator, respecting parentheses
    fn split_by_operator(input: &str, operator: &str) -> Vec<String> {
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut paren_depth = 0;
        let bytes = input.as_bytes();
        let op_bytes = operator.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] == b'(' {
                paren_depth += 1;
                current.push('(');
                i += 1;
            } else if bytes[i] == b')' {
                paren_depth -= 1;
                current.push(')');
                i += 1;
            } else if paren_depth == 0 && i + op_bytes.len() <= bytes.len() {
                // Check if we're at the operator
                if &bytes[i..i + op_bytes.len()] == op_bytes {
                    // Found operator
                    if !current.trim().is_empty() {
                        parts.push(current.trim().to_string());
                    }
                    current = String::new();
                    i += op_bytes.len();
                } else {
                    current.push(bytes[i] as char);
                    i += 1;
                }
            } else {
                current.push(bytes[i] as char);
                i += 1;
            }
        }

        if !current.trim().is_empty() {
            parts.push(current.trim().to_string());
        }

        if parts.is_empty() {
            vec![input.to_string()]
        } else {
            parts
        }
    }
}
