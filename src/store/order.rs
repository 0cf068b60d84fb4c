//! Parse the free-text `order` query parameter into checked sort terms.

use crate::config::ResourceDescriptor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// One `column [asc|desc]` term. `column` is a real column name of the resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderTerm {
    pub column: String,
    pub direction: Direction,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("unknown column in order: {0}")]
    UnknownColumn(String),
    #[error("malformed order term: {0}")]
    Malformed(String),
}

/// Empty input means natural order (no terms).
pub fn parse_order(desc: &ResourceDescriptor, raw: &str) -> Result<Vec<OrderTerm>, OrderError> {
    let mut terms = Vec::new();
    if raw.trim().is_empty() {
        return Ok(terms);
    }
    for part in raw.split(',') {
        let mut words = part.split_whitespace();
        let Some(column) = words.next() else {
            return Err(OrderError::Malformed(part.to_string()));
        };
        let column = column.trim_matches(|c| c == '`' || c == '"');
        let direction = match words.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => Direction::Asc,
            Some("desc") => Direction::Desc,
            Some(_) => return Err(OrderError::Malformed(part.trim().to_string())),
        };
        if words.next().is_some() {
            return Err(OrderError::Malformed(part.trim().to_string()));
        }
        // Either the column or its JSON field name may be used.
        let col = desc
            .column(column)
            .or_else(|| desc.column_by_json(column))
            .ok_or_else(|| OrderError::UnknownColumn(column.to_string()))?;
        terms.push(OrderTerm {
            column: col.name.clone(),
            direction,
        });
    }
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{builtin, resolve};

    fn news() -> ResourceDescriptor {
        resolve(&builtin().unwrap())
            .unwrap()
            .into_iter()
            .find(|d| d.name == "news")
            .unwrap()
    }

    #[test]
    fn parses_terms_with_directions() {
        let terms = parse_order(&news(), "create_time DESC, `title`,\"id\" asc").unwrap();
        assert_eq!(
            terms,
            vec![
                OrderTerm { column: "create_time".into(), direction: Direction::Desc },
                OrderTerm { column: "title".into(), direction: Direction::Asc },
                OrderTerm { column: "id".into(), direction: Direction::Asc },
            ]
        );
        assert!(parse_order(&news(), "  ").unwrap().is_empty());
    }

    #[test]
    fn rejects_unknown_columns_and_injection() {
        assert_eq!(
            parse_order(&news(), "secret desc"),
            Err(OrderError::UnknownColumn("secret".into()))
        );
        assert!(matches!(parse_order(&news(), "id; drop table news"), Err(_)));
        assert!(matches!(parse_order(&news(), "id sideways"), Err(OrderError::Malformed(_))));
        assert!(matches!(parse_order(&news(), "id,"), Err(OrderError::Malformed(_))));
    }
}
