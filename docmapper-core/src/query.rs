//! Query construction and filtering API.
//!
//! Filters are expression trees ([`Expr`]) that each backend translates with a
//! [`QueryVisitor`]. Most filters are built from an *example* record: every field the
//! record emits when encoded becomes an equality constraint.
//!
//! # Query Building
//!
//! ```ignore
//! use docmapper::query::{Filter, Query, Sort, SortDirection};
//!
//! let query = Query::builder()
//!     .filter(Filter::eq("status", "active"))
//!     .sort_key("-created")
//!     .sort("name", SortDirection::Asc)
//!     .skip(20)
//!     .limit(10)
//!     .build();
//! ```
//!
//! # Filter Expression API
//!
//! The [`Filter`] struct provides static methods for building filter expressions:
//!
//! - Example records: `example`, `identity`, `all`
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - String: `starts_with`, `ends_with`, `contains`, `not_contains`
//! - Existence: `exists`, `not_exists`
//! - Array: `any_of`, `none_of`
//! - Logical: `and`, `or`

use bson::Bson;

use crate::{
    encoding::{emitted_fields, to_document},
    error::{DocumentStoreError, DocumentStoreResult},
    record::Record,
};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// One sort key of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Sort { field: field.into(), direction }
    }

    /// Parses a sort key. A leading `-` means descending, anything else ascending.
    ///
    /// ```ignore
    /// assert_eq!(Sort::parse("-created"), Sort::new("created", SortDirection::Desc));
    /// ```
    pub fn parse(key: &str) -> Self {
        match key.strip_prefix('-') {
            Some(field) => Sort::new(field, SortDirection::Desc),
            None => Sort::new(key, SortDirection::Asc),
        }
    }

    /// One sort key per field the example emits, all in `direction`.
    ///
    /// Only the field names of the example are used, never its values.
    pub fn from_example<R: Record>(
        example: &R,
        direction: SortDirection,
    ) -> DocumentStoreResult<Vec<Sort>> {
        Ok(emitted_fields(example)?
            .into_iter()
            .map(|field| Sort::new(field, direction))
            .collect())
    }

    /// The key in `-field` form.
    pub fn to_key(&self) -> String {
        match self.direction {
            SortDirection::Asc => self.field.clone(),
            SortDirection::Desc => format!("-{}", self.field),
        }
    }
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Equal to (exact match).
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// String or array contains value.
    Contains,
    /// String or array does not contain value.
    NotContains,
    /// String starts with value.
    StartsWith,
    /// String ends with value.
    EndsWith,
    /// Field value is one of the values.
    AnyOf,
    /// Field value is none of the values.
    NoneOf,
}

/// A filter expression for querying documents.
///
/// An empty `And` matches every document.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression (inverts the result).
    Not(Box<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        /// The field name to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Whether this expression matches every document.
    pub fn matches_all(&self) -> bool {
        matches!(self, Expr::And(exprs) if exprs.is_empty())
    }
}

/// Anything a filter can be built from: a raw [`Expr`] or an example record.
pub trait IntoFilter {
    fn into_filter(self) -> DocumentStoreResult<Expr>;
}

impl IntoFilter for Expr {
    /// Raw filters are used verbatim.
    fn into_filter(self) -> DocumentStoreResult<Expr> {
        Ok(self)
    }
}

impl<R: Record> IntoFilter for &R {
    fn into_filter(self) -> DocumentStoreResult<Expr> {
        Filter::example(self)
    }
}

/// A structured query for retrieving documents.
///
/// Use [`QueryBuilder`] for ergonomic construction. Sort keys apply in order; the
/// first key is the primary one.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Optional filter expression to match documents.
    pub filter: Option<Expr>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of documents to skip.
    pub skip: Option<usize>,
    /// Sort keys, most significant first.
    pub sort: Vec<Sort>,
}

impl Query {
    /// Creates a new empty query with no filters or limits.
    pub fn new() -> Self {
        Query::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Returns the query with `filter` ANDed onto its own filter.
    pub fn and_filter(mut self, filter: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) if !existing.matches_all() => filter.and(existing),
            _ => filter,
        });
        self
    }
}

/// Helper struct for constructing filter expressions.
///
/// All methods accept field names and values as `Into<String>` and `Into<Bson>`.
pub struct Filter;

impl Filter {
    /// Builds an equality filter from every field the example emits.
    ///
    /// A record whose encoding leaves out zero-valued fields (through serde's
    /// `skip_serializing_if`) only constrains the fields that were set. An example
    /// that emits nothing matches every document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Precondition`] when the example does not encode
    /// to a document.
    pub fn example<R: Record>(example: &R) -> DocumentStoreResult<Expr> {
        Ok(Expr::And(
            to_document(example)?
                .into_iter()
                .map(|(field, value)| Expr::field(field, FieldOp::Eq, value))
                .collect(),
        ))
    }

    /// Matches the document whose `identity_field` equals `id`.
    pub fn identity(identity_field: impl Into<String>, id: impl Into<Bson>) -> Expr {
        Filter::eq(identity_field, id)
    }

    /// Matches every document.
    pub fn all() -> Expr {
        Expr::And(Vec::new())
    }

    /// Matches documents where the field equals the value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Matches documents where the field does not equal the value.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    /// Matches documents where the string field starts with the value.
    pub fn starts_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::StartsWith, value.into())
    }

    /// Matches documents where the string field ends with the value.
    pub fn ends_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::EndsWith, value.into())
    }

    /// Matches documents where the string or array field contains the value.
    pub fn contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Contains, value.into())
    }

    pub fn not_contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NotContains, value.into())
    }

    /// Matches documents where the field is present and not null.
    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }

    /// Matches documents where the field equals one of the values in the array.
    pub fn any_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::AnyOf, value.into())
    }

    /// Matches documents where the field equals none of the values in the array.
    pub fn none_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NoneOf, value.into())
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new() -> Self {
        QueryBuilder::default()
    }

    /// Sets the filter expression for this query.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    /// Sets the filter from an example record.
    pub fn example<R: Record>(mut self, example: &R) -> DocumentStoreResult<Self> {
        self.query.filter = Some(Filter::example(example)?);
        Ok(self)
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip.
    pub fn skip(mut self, skip: usize) -> Self {
        self.query.skip = Some(skip);
        self
    }

    /// Appends a sort key.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort.push(Sort::new(field, direction));
        self
    }

    /// Appends a sort key in `-field` form.
    pub fn sort_key(mut self, key: &str) -> Self {
        self.query.sort.push(Sort::parse(key));
        self
    }

    /// Appends one sort key per field the example emits.
    pub fn sort_by<R: Record>(
        mut self,
        example: &R,
        direction: SortDirection,
    ) -> DocumentStoreResult<Self> {
        self.query.sort.extend(Sort::from_example(example, direction)?);
        Ok(self)
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Person {
        #[serde(skip_serializing_if = "String::is_empty", default)]
        name: String,
        #[serde(skip_serializing_if = "String::is_empty", default)]
        city: String,
        #[serde(skip_serializing_if = "is_zero", default)]
        age: i32,
    }

    fn is_zero(value: &i32) -> bool {
        *value == 0
    }

    impl Record for Person {}

    #[test]
    fn example_filter_holds_exactly_the_set_fields() {
        let example = Person { name: "ann".into(), city: "Oslo".into(), age: 0 };

        let filter = Filter::example(&example).unwrap();

        assert_eq!(
            filter,
            Expr::And(vec![Filter::eq("name", "ann"), Filter::eq("city", "Oslo")])
        );
    }

    #[test]
    fn empty_example_matches_everything() {
        assert!(Filter::example(&Person::default()).unwrap().matches_all());
    }

    #[test]
    fn raw_filters_pass_through() {
        let raw = Filter::gt("age", 18);

        assert_eq!(raw.clone().into_filter().unwrap(), raw);
    }

    #[test]
    fn sort_keys() {
        assert_eq!(Sort::parse("-age"), Sort::new("age", SortDirection::Desc));
        assert_eq!(Sort::parse("name"), Sort::new("name", SortDirection::Asc));
        assert_eq!(Sort::new("age", SortDirection::Desc).to_key(), "-age");
    }

    #[test]
    fn sort_from_example_uses_field_names_only() {
        let example = Person { city: "x".into(), age: 1, ..Default::default() };

        let query = Query::builder()
            .sort_by(&example, SortDirection::Desc)
            .unwrap()
            .sort_key("name")
            .build();

        assert_eq!(
            query.sort,
            vec![
                Sort::new("city", SortDirection::Desc),
                Sort::new("age", SortDirection::Desc),
                Sort::new("name", SortDirection::Asc),
            ]
        );
    }

    #[test]
    fn and_filter_combines_with_existing_filter() {
        let query = Query::builder()
            .filter(Filter::gt("age", 18))
            .build()
            .and_filter(Filter::eq("city", "Oslo"));

        assert_eq!(
            query.filter,
            Some(Expr::And(vec![Filter::eq("city", "Oslo"), Filter::gt("age", 18)]))
        );

        let query = Query::new().and_filter(Filter::eq("city", "Oslo"));
        assert_eq!(query.filter, Some(Filter::eq("city", "Oslo")));
    }
}
