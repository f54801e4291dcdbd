//! Translation from docmapper filter expressions to MongoDB query documents.

use bson::{Bson, Document, doc};

use docmapper_core::{
    error::DocumentStoreError,
    query::{Expr, FieldOp, QueryVisitor, Sort, SortDirection},
};

/// Translates filter expressions into MongoDB's native query syntax.
///
/// An empty `And` becomes `{}`, which matches every document. `Not` becomes `$nor`
/// since `$not` is only valid on a single field.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    pub fn translate(expr: Option<&Expr>) -> Result<Document, DocumentStoreError> {
        match expr {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }

    /// Builds a sort document with the keys in order of significance.
    pub fn sort(sort: &[Sort]) -> Option<Document> {
        if sort.is_empty() {
            return None;
        }

        Some(
            sort.iter()
                .map(|key| {
                    let direction = match key.direction {
                        SortDirection::Asc => 1,
                        SortDirection::Desc => -1,
                    };
                    (key.field.clone(), Bson::Int32(direction))
                })
                .collect(),
        )
    }
}

fn escape_regex(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

fn string_operand<'v>(op: &str, value: &'v Bson) -> Result<&'v str, DocumentStoreError> {
    match value {
        Bson::String(s) => Ok(s),
        _ => Err(DocumentStoreError::InvalidDocument(format!(
            "{} operator requires a string value",
            op
        ))),
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        match exprs {
            [] => Ok(doc! {}),
            [expr] => self.visit_expr(expr),
            _ => Ok(doc! {
                "$and": exprs
                    .iter()
                    .map(|expr| self.visit_expr(expr))
                    .collect::<Result<Vec<_>, _>>()?,
            }),
        }
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        match exprs {
            // the server rejects an empty `$or`; nothing matches an empty disjunction
            [] => Ok(doc! { "$nor": [{}] }),
            [expr] => self.visit_expr(expr),
            _ => Ok(doc! {
                "$or": exprs
                    .iter()
                    .map(|expr| self.visit_expr(expr))
                    .collect::<Result<Vec<_>, _>>()?,
            }),
        }
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(if should_exist {
            doc! { field: { "$exists": true, "$ne": Bson::Null } }
        } else {
            doc! { "$or": [{ field: { "$exists": false } }, { field: Bson::Null }] }
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::Contains => match value {
                    Bson::String(s) => doc! { "$regex": escape_regex(s) },
                    other => doc! { "$elemMatch": { "$eq": other } },
                },
                FieldOp::NotContains => match value {
                    Bson::String(s) => doc! { "$not": { "$regex": escape_regex(s) } },
                    other => doc! { "$not": { "$elemMatch": { "$eq": other } } },
                },
                FieldOp::StartsWith => {
                    doc! { "$regex": format!("^{}", escape_regex(string_operand("StartsWith", value)?)) }
                }
                FieldOp::EndsWith => {
                    doc! { "$regex": format!("{}$", escape_regex(string_operand("EndsWith", value)?)) }
                }
                FieldOp::AnyOf => doc! { "$in": value },
                FieldOp::NoneOf => doc! { "$nin": value },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmapper_core::query::Filter;

    #[test]
    fn example_filters_translate_to_equalities() {
        let filter = Filter::and([Filter::eq("name", "ann"), Filter::eq("age", 30)]);

        assert_eq!(
            MongoQueryTranslator::translate(Some(&filter)).unwrap(),
            doc! { "$and": [{ "name": { "$eq": "ann" } }, { "age": { "$eq": 30 } }] }
        );
        assert_eq!(MongoQueryTranslator::translate(Some(&Filter::all())).unwrap(), doc! {});
        assert_eq!(MongoQueryTranslator::translate(None).unwrap(), doc! {});
    }

    #[test]
    fn negation_uses_nor() {
        let filter = Filter::eq("a", 1).not();

        assert_eq!(
            MongoQueryTranslator::translate(Some(&filter)).unwrap(),
            doc! { "$nor": [{ "a": { "$eq": 1 } }] }
        );
    }

    #[test]
    fn empty_disjunctions_match_nothing() {
        assert_eq!(
            MongoQueryTranslator::translate(Some(&Filter::or([]))).unwrap(),
            doc! { "$nor": [{}] }
        );
        assert_eq!(
            MongoQueryTranslator::translate(Some(&Filter::or([Filter::eq("a", 1)]))).unwrap(),
            doc! { "a": { "$eq": 1 } }
        );
    }

    #[test]
    fn string_operators_escape_patterns() {
        let filter = Filter::starts_with("path", "a.b");

        assert_eq!(
            MongoQueryTranslator::translate(Some(&filter)).unwrap(),
            doc! { "path": { "$regex": "^a\\.b" } }
        );
        assert!(MongoQueryTranslator::translate(Some(&Filter::ends_with("n", 3))).is_err());
    }

    #[test]
    fn sort_documents_keep_key_order() {
        let sort = vec![Sort::parse("-age"), Sort::parse("name")];

        assert_eq!(MongoQueryTranslator::sort(&sort), Some(doc! { "age": -1, "name": 1 }));
        assert_eq!(MongoQueryTranslator::sort(&[]), None);
    }
}
